use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use lucy_core::domain::offer::{AcceptanceRecord, AcceptanceStatus, LoanType};
use lucy_core::ledger::{content_hash, AcceptanceLedger, AcceptanceReceipt, LedgerError};

use super::{AcceptanceRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAcceptanceRepository {
    pool: DbPool,
}

impl SqlAcceptanceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, id: &str, record: &AcceptanceRecord) -> Result<String, RepositoryError> {
        if record.loan_amount <= 0 {
            return Err(RepositoryError::Conflict(format!(
                "loan amount must be positive, got {}",
                record.loan_amount
            )));
        }

        let hash = content_hash(record);
        let result = sqlx::query(
            "INSERT INTO acceptance_records (
                id,
                session_id,
                loan_amount,
                tenure_days,
                repayment_frequency,
                accepted,
                interest_rate,
                loan_type,
                status,
                content_hash,
                recorded_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&record.session_id)
        .bind(record.loan_amount)
        .bind(i64::from(record.tenure_days))
        .bind(&record.repayment_frequency)
        .bind(record.accepted)
        .bind(record.interest_rate.to_string())
        .bind(record.loan_type.as_str())
        .bind(record.status.as_str())
        .bind(&hash)
        .bind(record.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(hash),
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                Err(RepositoryError::Conflict(format!(
                    "session `{}` already has a settled offer",
                    record.session_id
                )))
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[async_trait::async_trait]
impl AcceptanceRepository for SqlAcceptanceRepository {
    async fn append(&self, record: &AcceptanceRecord) -> Result<(), RepositoryError> {
        self.insert(&Uuid::new_v4().to_string(), record).await.map(|_| ())
    }

    async fn list_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<AcceptanceRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                session_id,
                loan_amount,
                tenure_days,
                repayment_frequency,
                accepted,
                interest_rate,
                loan_type,
                status,
                recorded_at
             FROM acceptance_records
             WHERE session_id = ?
             ORDER BY recorded_at ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }
}

#[async_trait::async_trait]
impl AcceptanceLedger for SqlAcceptanceRepository {
    async fn record_acceptance(
        &self,
        record: &AcceptanceRecord,
    ) -> Result<AcceptanceReceipt, LedgerError> {
        let receipt_id = Uuid::new_v4().to_string();
        let entry_hash = self.insert(&receipt_id, record).await.map_err(|error| match error {
            RepositoryError::Conflict(message) => LedgerError::Rejected(message),
            other => LedgerError::Unavailable(other.to_string()),
        })?;

        tracing::info!(
            event_name = "db.acceptance_recorded",
            session_id = %record.session_id,
            status = record.status.as_str(),
            loan_amount = record.loan_amount,
            "acceptance record stored"
        );

        Ok(AcceptanceReceipt {
            receipt_id,
            session_id: record.session_id.clone(),
            status: record.status,
            entry_hash,
            recorded_at: record.recorded_at,
        })
    }
}

fn record_from_row(row: SqliteRow) -> Result<AcceptanceRecord, RepositoryError> {
    let loan_type_raw = row.try_get::<String, _>("loan_type")?;
    let loan_type = LoanType::parse(&loan_type_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown loan type `{loan_type_raw}`")))?;

    let status_raw = row.try_get::<String, _>("status")?;
    let status = AcceptanceStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{status_raw}`")))?;

    let rate_raw = row.try_get::<String, _>("interest_rate")?;
    let interest_rate = Decimal::from_str(&rate_raw)
        .map_err(|error| RepositoryError::Decode(format!("interest_rate `{rate_raw}`: {error}")))?;

    let tenure_days = row.try_get::<i64, _>("tenure_days")?;
    let tenure_days = u32::try_from(tenure_days)
        .map_err(|_| RepositoryError::Decode(format!("tenure_days out of range: {tenure_days}")))?;

    Ok(AcceptanceRecord {
        session_id: row.try_get("session_id")?,
        loan_amount: row.try_get("loan_amount")?,
        tenure_days,
        repayment_frequency: row.try_get("repayment_frequency")?,
        accepted: row.try_get("accepted")?,
        interest_rate,
        loan_type,
        status,
        recorded_at: parse_timestamp("recorded_at", row.try_get("recorded_at")?)?,
    })
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{column} `{value}`: {error}")))
}
