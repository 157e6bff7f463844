use async_trait::async_trait;
use thiserror::Error;

use lucy_core::domain::conversation::{ConversationState, SessionId};
use lucy_core::domain::offer::AcceptanceRecord;
use lucy_core::errors::ApplicationError;

pub mod acceptance;
pub mod memory;
pub mod session;

pub use acceptance::SqlAcceptanceRepository;
pub use memory::{InMemoryAcceptanceRepository, InMemorySessionRepository};
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        Self::Persistence(error.to_string())
    }
}

/// Stores the serialized conversation state per session. The caller serialises access.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<ConversationState>, RepositoryError>;
    async fn save(&self, state: &ConversationState) -> Result<(), RepositoryError>;
}

/// Append-only store of settled offers. At most one record per session.
#[async_trait]
pub trait AcceptanceRepository: Send + Sync {
    async fn append(&self, record: &AcceptanceRecord) -> Result<(), RepositoryError>;
    async fn list_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<AcceptanceRecord>, RepositoryError>;
}
