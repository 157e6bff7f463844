//! Acceptance ledger: where a customer's final decision on an offer is recorded.
//!
//! [`LedgerService`] keeps one HMAC-signed entry per session in memory. Durable
//! implementations live in the persistence crate.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::offer::{AcceptanceRecord, AcceptanceStatus};

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("acceptance ledger unavailable: {0}")]
    Unavailable(String),
    #[error("acceptance rejected: {0}")]
    Rejected(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceReceipt {
    pub receipt_id: String,
    pub session_id: String,
    pub status: AcceptanceStatus,
    pub entry_hash: String,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait AcceptanceLedger: Send + Sync {
    async fn record_acceptance(
        &self,
        record: &AcceptanceRecord,
    ) -> Result<AcceptanceReceipt, LedgerError>;
}

/// One settled decision. `entry_hash` binds the record to its session and timestamp and
/// `signature` is the HMAC of that hash under the service key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: String,
    pub session_id: String,
    pub content_hash: String,
    pub entry_hash: String,
    pub recorded_at: DateTime<Utc>,
    pub record: AcceptanceRecord,
    pub signature: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub session_id: String,
    pub valid: bool,
    pub entry_hash: Option<String>,
    pub failure_reason: Option<String>,
}

impl VerificationResult {
    fn failed(session_id: &str, reason: String) -> Self {
        Self {
            session_id: session_id.to_string(),
            valid: false,
            entry_hash: None,
            failure_reason: Some(reason),
        }
    }
}

#[derive(Debug)]
pub struct LedgerService {
    signing_key: Vec<u8>,
    entries_by_session: Mutex<HashMap<String, LedgerEntry>>,
}

impl LedgerService {
    pub fn new(signing_key: impl AsRef<[u8]>) -> Self {
        Self {
            signing_key: signing_key.as_ref().to_vec(),
            entries_by_session: Mutex::new(HashMap::new()),
        }
    }

    /// Signs and stores a decision. A session settles at most once.
    pub fn append_entry(&self, record: &AcceptanceRecord) -> Result<LedgerEntry, LedgerError> {
        if record.loan_amount <= 0 {
            return Err(LedgerError::Rejected(format!(
                "loan amount must be positive, got {}",
                record.loan_amount
            )));
        }

        let mut sessions = match self.entries_by_session.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(existing) = sessions.get(&record.session_id) {
            return Err(LedgerError::Rejected(format!(
                "session {} already settled as {}",
                record.session_id,
                existing.record.status.as_str()
            )));
        }

        let recorded_at = Utc::now();
        let content_hash = content_hash(record);
        let entry_hash =
            hash_entry_material(&record.session_id, &content_hash, recorded_at, record.status);
        let signature = hmac_hex(&self.signing_key, entry_hash.as_bytes());

        let entry = LedgerEntry {
            entry_id: Uuid::new_v4().to_string(),
            session_id: record.session_id.clone(),
            content_hash,
            entry_hash,
            recorded_at,
            record: record.clone(),
            signature,
        };
        sessions.insert(record.session_id.clone(), entry.clone());
        Ok(entry)
    }

    /// Recomputes the stored entry's hashes and signature for a session.
    pub fn verify_entry(&self, session_id: &str) -> VerificationResult {
        let Some(entry) = self.entry_for_session(session_id) else {
            return VerificationResult::failed(
                session_id,
                "no ledger entry found for session".to_string(),
            );
        };

        if content_hash(&entry.record) != entry.content_hash {
            return VerificationResult::failed(
                session_id,
                format!("content hash mismatch at entry {}", entry.entry_id),
            );
        }

        let computed_entry_hash = hash_entry_material(
            &entry.session_id,
            &entry.content_hash,
            entry.recorded_at,
            entry.record.status,
        );
        if computed_entry_hash != entry.entry_hash {
            return VerificationResult::failed(
                session_id,
                format!("entry hash mismatch at entry {}", entry.entry_id),
            );
        }

        let expected_signature = hmac_hex(&self.signing_key, entry.entry_hash.as_bytes());
        if expected_signature != entry.signature {
            return VerificationResult::failed(
                session_id,
                format!("signature mismatch at entry {}", entry.entry_id),
            );
        }

        VerificationResult {
            session_id: session_id.to_string(),
            valid: true,
            entry_hash: Some(entry.entry_hash),
            failure_reason: None,
        }
    }

    pub fn entry_for_session(&self, session_id: &str) -> Option<LedgerEntry> {
        let sessions = match self.entries_by_session.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.get(session_id).cloned()
    }
}

#[async_trait]
impl AcceptanceLedger for LedgerService {
    async fn record_acceptance(
        &self,
        record: &AcceptanceRecord,
    ) -> Result<AcceptanceReceipt, LedgerError> {
        let entry = self.append_entry(record)?;
        Ok(AcceptanceReceipt {
            receipt_id: entry.entry_id,
            session_id: entry.session_id,
            status: entry.record.status,
            entry_hash: entry.entry_hash,
            recorded_at: entry.recorded_at,
        })
    }
}

pub fn content_hash(record: &AcceptanceRecord) -> String {
    let canonical_payload = match serde_json::to_vec(record) {
        Ok(payload) => payload,
        Err(_) => record.session_id.as_bytes().to_vec(),
    };
    sha256_hex(&canonical_payload)
}

fn hash_entry_material(
    session_id: &str,
    content_hash: &str,
    recorded_at: DateTime<Utc>,
    status: AcceptanceStatus,
) -> String {
    let material = format!(
        "{}|{}|{}|{}",
        session_id,
        content_hash,
        recorded_at.to_rfc3339(),
        status.as_str(),
    );
    sha256_hex(material.as_bytes())
}

fn hmac_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return sha256_hex(payload),
    };
    mac.update(payload);
    encode_hex(mac.finalize().into_bytes().as_slice())
}

fn sha256_hex(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    encode_hex(digest.as_slice())
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{content_hash, hash_entry_material, AcceptanceLedger, LedgerError, LedgerService};
    use crate::domain::offer::{AcceptanceRecord, AcceptanceStatus, LoanType};

    fn record(session_id: &str, accepted: bool) -> AcceptanceRecord {
        AcceptanceRecord {
            session_id: session_id.to_string(),
            loan_amount: 10_000,
            tenure_days: 30,
            repayment_frequency: "One-time".to_string(),
            accepted,
            interest_rate: Decimal::new(6, 3),
            loan_type: LoanType::ShortTerm,
            status: if accepted {
                AcceptanceStatus::DisbursementInitiated
            } else {
                AcceptanceStatus::OfferDeclined
            },
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn identical_records_hash_identically() {
        let record = record("s-hash", true);
        assert_eq!(content_hash(&record), content_hash(&record.clone()));
    }

    #[test]
    fn untampered_entry_verifies() {
        let service = LedgerService::new("secret-key");
        let entry = service.append_entry(&record("s-verify", true)).expect("append");

        let result = service.verify_entry("s-verify");
        assert!(result.valid, "{:?}", result.failure_reason);
        assert_eq!(result.entry_hash, Some(entry.entry_hash));
    }

    #[test]
    fn edited_record_fails_content_hash() {
        let service = LedgerService::new("secret-key");
        service.append_entry(&record("s-tamper", true)).expect("append");

        {
            let mut sessions = service.entries_by_session.lock().expect("lock");
            let entry = sessions.get_mut("s-tamper").expect("entry");
            entry.record.loan_amount = 50_000;
        }

        let result = service.verify_entry("s-tamper");
        assert!(!result.valid);
        assert!(result.failure_reason.unwrap_or_default().contains("content hash mismatch"));
    }

    #[test]
    fn rehashed_entry_without_the_key_fails_signature() {
        let service = LedgerService::new("secret-key");
        service.append_entry(&record("s-forged", true)).expect("append");

        {
            let mut sessions = service.entries_by_session.lock().expect("lock");
            let entry = sessions.get_mut("s-forged").expect("entry");
            entry.record.loan_amount = 50_000;
            entry.content_hash = content_hash(&entry.record);
            entry.entry_hash = hash_entry_material(
                &entry.session_id,
                &entry.content_hash,
                entry.recorded_at,
                entry.record.status,
            );
        }

        let result = service.verify_entry("s-forged");
        assert!(!result.valid);
        assert!(result.failure_reason.unwrap_or_default().contains("signature mismatch"));
    }

    #[test]
    fn a_different_key_does_not_verify() {
        let signer = LedgerService::new("secret-key");
        let entry = signer.append_entry(&record("s-key", true)).expect("append");

        let other = LedgerService::new("another-key");
        other
            .entries_by_session
            .lock()
            .expect("lock")
            .insert("s-key".to_string(), entry);

        let result = other.verify_entry("s-key");
        assert!(!result.valid);
        assert!(result.failure_reason.unwrap_or_default().contains("signature mismatch"));
    }

    #[test]
    fn unknown_session_does_not_verify() {
        let service = LedgerService::new("secret-key");
        let result = service.verify_entry("missing");
        assert!(!result.valid);
        assert_eq!(result.entry_hash, None);
    }

    #[tokio::test]
    async fn a_session_can_only_settle_once() {
        let service = LedgerService::new("secret-key");
        let receipt = service.record_acceptance(&record("s-once", false)).await.expect("first");
        assert_eq!(receipt.status, AcceptanceStatus::OfferDeclined);

        let second = service.record_acceptance(&record("s-once", true)).await;
        assert!(matches!(second, Err(LedgerError::Rejected(_))));
        let kept = service.entry_for_session("s-once").expect("first decision kept");
        assert_eq!(kept.record.status, AcceptanceStatus::OfferDeclined);
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let service = LedgerService::new("secret-key");
        let mut zero = record("s-zero", true);
        zero.loan_amount = 0;
        assert!(matches!(
            service.record_acceptance(&zero).await,
            Err(LedgerError::Rejected(_))
        ));
    }
}
