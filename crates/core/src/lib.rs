//! Conversation state tracking, extraction heuristics and loan offer arithmetic for Lucy, a
//! conversational onboarding agent for micro-business loans.
//!
//! Everything here is synchronous and free of I/O except the [`ledger::AcceptanceLedger`]
//! seam. Callers own session storage and pass state in and out of
//! [`flows::ConversationTracker::process_turn`].

pub mod audit;
pub mod coaching;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extraction;
pub mod flows;
pub mod ledger;
pub mod offer;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use coaching::{AssetKind, CoachingAsset};
pub use domain::conversation::{ConversationState, ConversationTurn, SessionId, Speaker};
pub use domain::customer::{CompletedTasks, CustomerRecord, TaskProgress};
pub use domain::offer::{AcceptanceRecord, AcceptanceStatus, LoanOffer, LoanType, OfferStatus};
pub use domain::task::Task;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{ConversationTracker, ResponsibilityDomain, TurnOutcome, TurnResult};
pub use ledger::{AcceptanceLedger, AcceptanceReceipt, LedgerError, LedgerService};
pub use offer::{calculate_offer, sales_analysis, OfferPolicy, SalesAnalysis};
