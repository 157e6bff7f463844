use std::process::ExitCode;

fn main() -> ExitCode {
    lucy_cli::run()
}
