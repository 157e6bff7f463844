use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use lucy_agent::{
    HttpLlmClient, LlmResponder, LucyRuntime, Responder, ResponseRequest, TemplateCatalog,
    TemplateResponder,
};
use lucy_core::config::{AppConfig, LlmProvider};
use lucy_core::domain::conversation::{ConversationState, SessionId};
use lucy_core::domain::offer::OfferStatus;
use lucy_core::domain::task::Task;
use lucy_core::flows::ConversationTracker;
use lucy_core::ledger::{AcceptanceLedger, LedgerService};
use lucy_db::{
    connect_with_settings, migrations, InMemorySessionRepository, SessionRepository,
    SqlAcceptanceRepository, SqlSessionRepository,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::commands::{build_runtime, load_config, CommandResult, Failure};

#[derive(Clone, Debug, Default)]
pub struct ChatOptions {
    pub session: Option<String>,
    pub database: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatSummary {
    pub session_id: Option<String>,
    pub turns: usize,
    pub current_task: Option<Task>,
    pub offer_status: Option<OfferStatus>,
}

/// Template replies unless a model provider is configured.
pub enum ChatResponder {
    Template(TemplateResponder),
    Llm(LlmResponder<HttpLlmClient>),
}

#[async_trait]
impl Responder for ChatResponder {
    async fn respond(&self, request: &ResponseRequest<'_>) -> Result<String> {
        match self {
            Self::Template(responder) => responder.respond(request).await,
            Self::Llm(responder) => responder.respond(request).await,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Quit,
    State,
    Photo(&'a str),
    Message(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    if line == "/quit" {
        return ChatInput::Quit;
    }
    if line == "/state" {
        return ChatInput::State;
    }
    match line.strip_prefix("/photo ") {
        Some(reference) => ChatInput::Photo(reference.trim()),
        _ => ChatInput::Message(line),
    }
}

pub fn run(options: ChatOptions) -> CommandResult {
    let result = load_config().and_then(|config| {
        let runtime = build_runtime()?;
        runtime.block_on(async {
            let input = BufReader::new(tokio::io::stdin());
            run_session(&config, &options, input, tokio::io::stdout()).await
        })
    });

    match result {
        Ok(summary) => {
            let message = match (&summary.session_id, summary.current_task) {
                (Some(id), Some(task)) => format!("session {id} paused at {task}"),
                _ => "no conversation started".to_string(),
            };
            let details = serde_json::to_value(&summary).unwrap_or_default();
            CommandResult::success_with_details("chat", message, details)
        }
        Err(failure) => CommandResult::from_failure("chat", failure),
    }
}

/// Drives one conversation from `input` until `/quit` or end of input.
pub async fn run_session<I, O>(
    config: &AppConfig,
    options: &ChatOptions,
    input: I,
    mut output: O,
) -> Result<ChatSummary, Failure>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let store = open_store(config, options.database).await?;
    let agent = conversation_runtime(config, chat_responder(config)?)?.with_ledger(store.ledger);

    let mut state = match &options.session {
        Some(id) => store.sessions.load(&SessionId(id.clone())).await.map_err(|error| {
            ("persistence", format!("could not load session `{id}`: {error}"), 4u8)
        })?,
        None => None,
    };
    if let Some(resumed) = &state {
        let line = format!(
            "resuming session {} at {} ({})",
            resumed.session_id,
            resumed.current_task,
            resumed.current_task.description()
        );
        write_line(&mut output, &line).await?;
    }

    let mut pending_photos = Vec::new();
    let mut turns = 0;
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.map_err(io_failure)? {
        match parse_input(&line) {
            ChatInput::Quit => break,
            ChatInput::State => {
                let text = match &state {
                    Some(current) => serde_json::to_string_pretty(current)
                        .map_err(|error| ("serialization", error.to_string(), 3u8))?,
                    None => "no conversation yet".to_string(),
                };
                write_line(&mut output, &text).await?;
            }
            ChatInput::Photo(reference) => {
                pending_photos.push(reference.to_string());
                write_line(&mut output, &format!("queued photo {reference}")).await?;
            }
            ChatInput::Message(message) => {
                let fresh = state.is_none();
                let reply = agent.handle_turn(message, &pending_photos, state.take()).await;
                if !reply.degraded {
                    pending_photos.clear();
                }
                turns += 1;

                let mut next = reply.state;
                if let (true, Some(id)) = (fresh, &options.session) {
                    next.session_id = SessionId(id.clone());
                }
                save_session(store.sessions.as_ref(), &next).await;
                write_line(&mut output, &format!("lucy> {}", reply.reply)).await?;
                state = Some(next);
            }
        }
    }

    if let Some(pool) = store.pool {
        pool.close().await;
    }

    Ok(ChatSummary {
        session_id: state.as_ref().map(|current| current.session_id.to_string()),
        turns,
        current_task: state.as_ref().map(|current| current.current_task),
        offer_status: state.as_ref().map(|current| current.offer_status),
    })
}

pub(crate) fn template_responder(
    config: &AppConfig,
    seed: Option<u64>,
) -> Result<TemplateResponder, Failure> {
    let catalog = TemplateCatalog::embedded()
        .map_err(|error| ("template_load", error.to_string(), 3u8))?;
    Ok(match seed {
        Some(seed) => TemplateResponder::with_seed(catalog, config.offer.clone(), seed),
        None => TemplateResponder::new(catalog, config.offer.clone()),
    })
}

pub(crate) fn conversation_runtime<R: Responder>(
    config: &AppConfig,
    responder: R,
) -> Result<LucyRuntime<R>, Failure> {
    let greeting = template_responder(config, None)?
        .greeting()
        .map_err(|error| ("template_render", error.to_string(), 3u8))?;
    let tracker = ConversationTracker::new(config.offer.clone());
    Ok(LucyRuntime::new(tracker, responder, greeting)
        .with_reply_timeout(Duration::from_secs(config.llm.timeout_secs.max(1))))
}

pub(crate) fn memory_ledger(config: &AppConfig) -> Arc<dyn AcceptanceLedger> {
    Arc::new(LedgerService::new(config.ledger.signing_key.expose_secret()))
}

fn chat_responder(config: &AppConfig) -> Result<ChatResponder, Failure> {
    let templates = template_responder(config, None)?;
    if config.llm.provider == LlmProvider::Template {
        return Ok(ChatResponder::Template(templates));
    }
    let client = HttpLlmClient::from_config(&config.llm)
        .map_err(|error| ("llm_client", error.to_string(), 3u8))?;
    Ok(ChatResponder::Llm(LlmResponder::new(client, templates)))
}

struct ChatStore {
    sessions: Arc<dyn SessionRepository>,
    ledger: Arc<dyn AcceptanceLedger>,
    pool: Option<lucy_db::DbPool>,
}

async fn open_store(config: &AppConfig, database: bool) -> Result<ChatStore, Failure> {
    if !database {
        return Ok(ChatStore {
            sessions: Arc::new(InMemorySessionRepository::default()),
            ledger: memory_ledger(config),
            pool: None,
        });
    }

    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;

    Ok(ChatStore {
        sessions: Arc::new(SqlSessionRepository::new(pool.clone())),
        ledger: Arc::new(SqlAcceptanceRepository::new(pool.clone())),
        pool: Some(pool),
    })
}

async fn save_session(sessions: &dyn SessionRepository, state: &ConversationState) {
    if let Err(error) = sessions.save(state).await {
        tracing::warn!(
            event_name = "cli.session_save_failed",
            session_id = %state.session_id,
            error = %error,
            "session state was not persisted"
        );
    }
}

async fn write_line<O: AsyncWrite + Unpin>(output: &mut O, text: &str) -> Result<(), Failure> {
    output.write_all(text.as_bytes()).await.map_err(io_failure)?;
    output.write_all(b"\n").await.map_err(io_failure)?;
    output.flush().await.map_err(io_failure)
}

fn io_failure(error: std::io::Error) -> Failure {
    ("io", error.to_string(), 3)
}
