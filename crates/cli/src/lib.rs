pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lucy_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "lucy",
    about = "Lucy onboarding agent CLI",
    long_about = "Talk to Lucy, replay scripted conversations, price offers, and manage storage.",
    after_help = "Examples:\n  lucy chat\n  lucy replay onboarding.json --json\n  \
                  lucy offer --daily-sales 3000 --daily-customers 25\n  lucy migrate"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive conversation on stdin")]
    Chat {
        #[arg(long, help = "Resume or name a session")]
        session: Option<String>,
        #[arg(long, help = "Persist sessions and decisions in the configured database")]
        database: bool,
    },
    #[command(about = "Run a JSON conversation script and print each turn")]
    Replay {
        file: PathBuf,
        #[arg(long, help = "Emit turns inside the JSON result instead of as text")]
        json: bool,
    },
    #[command(about = "Compute the loan offer for a sales profile")]
    Offer {
        #[arg(long)]
        daily_sales: u64,
        #[arg(long, default_value_t = 0)]
        daily_customers: u64,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Chat { session, database } => {
            commands::chat::run(commands::chat::ChatOptions { session, database })
        }
        Command::Replay { file, json } => commands::replay::run(&file, json),
        Command::Offer { daily_sales, daily_customers } => {
            commands::offer::run(daily_sales, daily_customers)
        }
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command payloads on stdout stay machine-readable.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
