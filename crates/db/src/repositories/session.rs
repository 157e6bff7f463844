use chrono::Utc;
use sqlx::Row;

use lucy_core::domain::conversation::{ConversationState, SessionId};

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn load(&self, id: &SessionId) -> Result<Option<ConversationState>, RepositoryError> {
        let row = sqlx::query("SELECT state_json FROM conversation_sessions WHERE session_id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let raw = row.try_get::<String, _>("state_json")?;
            serde_json::from_str::<ConversationState>(&raw).map_err(|error| {
                RepositoryError::Decode(format!("session `{}` state: {error}", id.0))
            })
        })
        .transpose()
    }

    async fn save(&self, state: &ConversationState) -> Result<(), RepositoryError> {
        let state_json = serde_json::to_string(state).map_err(|error| {
            RepositoryError::Decode(format!("session `{}` state: {error}", state.session_id))
        })?;
        let offer_status = serde_json::to_value(state.offer_status)
            .ok()
            .and_then(|value| value.as_str().map(str::to_owned))
            .unwrap_or_default();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO conversation_sessions (
                session_id,
                current_task,
                offer_status,
                state_json,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(session_id) DO UPDATE SET
                current_task = excluded.current_task,
                offer_status = excluded.offer_status,
                state_json = excluded.state_json,
                updated_at = excluded.updated_at",
        )
        .bind(&state.session_id.0)
        .bind(state.current_task.as_str())
        .bind(offer_status)
        .bind(state_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            event_name = "db.session_saved",
            session_id = %state.session_id,
            current_task = state.current_task.as_str(),
            "conversation state saved"
        );
        Ok(())
    }
}
