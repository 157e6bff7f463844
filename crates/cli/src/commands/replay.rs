use std::fs;
use std::path::Path;

use lucy_core::domain::task::Task;
use lucy_core::extraction::normalize_photos;
use lucy_core::flows::ResponsibilityDomain;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::commands::chat::{conversation_runtime, memory_ledger, template_responder};
use crate::commands::{build_runtime, load_config, CommandResult, Failure};

/// Fixed so that replays of the same script print the same tips.
const REPLAY_SEED: u64 = 7;

#[derive(Debug, Deserialize)]
pub struct ScriptTurn {
    pub message: String,
    #[serde(default)]
    pub photos: Value,
}

#[derive(Debug, Serialize)]
pub struct ReplayedTurn {
    pub turn: usize,
    pub route: ResponsibilityDomain,
    pub task: Task,
    pub outcome: &'static str,
    pub reply: String,
    pub degraded: bool,
}

pub fn run(path: &Path, json: bool) -> CommandResult {
    let result = load_config().and_then(|config| {
        let script = read_script(path)?;
        let runtime = build_runtime()?;
        runtime.block_on(replay(&config, &script))
    });

    let turns = match result {
        Ok(turns) => turns,
        Err(failure) => return CommandResult::from_failure("replay", failure),
    };

    let message = match turns.last() {
        Some(last) => format!("replayed {} turns, ended at {}", turns.len(), last.task),
        None => "script had no turns".to_string(),
    };
    if json {
        let details = serde_json::json!({ "turns": turns });
        CommandResult::success_with_details("replay", message, details)
    } else {
        CommandResult::success("replay", message).with_preamble(&render_transcript(&turns))
    }
}

/// Plays a script against a fresh session with template replies and an in-memory ledger.
pub async fn replay(
    config: &lucy_core::config::AppConfig,
    script: &[ScriptTurn],
) -> Result<Vec<ReplayedTurn>, Failure> {
    let responder = template_responder(config, Some(REPLAY_SEED))?;
    let agent = conversation_runtime(config, responder)?.with_ledger(memory_ledger(config));

    let mut state = None;
    let mut turns = Vec::with_capacity(script.len());
    for (index, step) in script.iter().enumerate() {
        let photos = normalize_photos(&step.photos);
        let reply = agent.handle_turn(&step.message, &photos, state.take()).await;
        turns.push(ReplayedTurn {
            turn: index + 1,
            route: reply.route,
            task: reply.state.current_task,
            outcome: reply.outcome.kind(),
            reply: reply.reply,
            degraded: reply.degraded,
        });
        state = Some(reply.state);
    }
    Ok(turns)
}

fn read_script(path: &Path) -> Result<Vec<ScriptTurn>, Failure> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ("script_input", format!("could not read `{}`: {error}", path.display()), 2u8)
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        ("script_input", format!("invalid script `{}`: {error}", path.display()), 2u8)
    })
}

fn render_transcript(turns: &[ReplayedTurn]) -> String {
    turns
        .iter()
        .map(|turn| {
            format!(
                "[{}] {} | {} | {}\nlucy> {}",
                turn.turn, turn.route, turn.task, turn.outcome, turn.reply
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
