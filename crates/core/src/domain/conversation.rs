use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::CustomerRecord;
use crate::domain::offer::OfferStatus;
use crate::domain::task::Task;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Customer,
    Lucy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

/// Per-session conversation state. Owned by one session; the caller persists it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: SessionId,
    pub current_task: Task,
    pub customer: CustomerRecord,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    #[serde(default)]
    pub offer_status: OfferStatus,
}

impl ConversationState {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            current_task: Task::B1,
            customer: CustomerRecord::new(),
            history: Vec::new(),
            offer_status: OfferStatus::NotReached,
        }
    }

    pub fn start() -> Self {
        Self::new(SessionId::generate())
    }

    pub fn is_task_complete(&self, task: Task) -> bool {
        self.customer.completed_tasks.contains(task)
    }

    pub fn record_customer_message(&mut self, text: impl Into<String>) {
        self.push_turn(Speaker::Customer, text.into());
    }

    pub fn record_reply(&mut self, text: impl Into<String>) {
        self.push_turn(Speaker::Lucy, text.into());
    }

    /// Moves a freshly computed offer into the awaiting-response state once it has been shown.
    pub fn mark_offer_presented(&mut self) {
        if self.offer_status == OfferStatus::Presenting {
            self.offer_status = OfferStatus::AwaitingResponse;
        }
    }

    pub fn last_customer_message(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|turn| turn.speaker == Speaker::Customer)
            .map(|turn| turn.text.as_str())
    }

    fn push_turn(&mut self, speaker: Speaker, text: String) {
        self.history.push(ConversationTurn { speaker, text, recorded_at: Utc::now() });
    }
}
