use std::collections::HashMap;

use tokio::sync::RwLock;

use lucy_core::domain::conversation::{ConversationState, SessionId};
use lucy_core::domain::offer::AcceptanceRecord;

use super::{AcceptanceRepository, RepositoryError, SessionRepository};

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, ConversationState>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load(&self, id: &SessionId) -> Result<Option<ConversationState>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&id.0).cloned())
    }

    async fn save(&self, state: &ConversationState) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(state.session_id.0.clone(), state.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAcceptanceRepository {
    records: RwLock<HashMap<String, AcceptanceRecord>>,
}

#[async_trait::async_trait]
impl AcceptanceRepository for InMemoryAcceptanceRepository {
    async fn append(&self, record: &AcceptanceRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.session_id) {
            return Err(RepositoryError::Conflict(format!(
                "session `{}` already has a settled offer",
                record.session_id
            )));
        }
        records.insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn list_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<AcceptanceRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(session_id).cloned().into_iter().collect())
    }
}
