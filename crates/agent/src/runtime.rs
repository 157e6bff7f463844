use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use lucy_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink,
};
use lucy_core::domain::conversation::ConversationState;
use lucy_core::domain::offer::{AcceptanceRecord, LoanOffer};
use lucy_core::errors::ApplicationError;
use lucy_core::flows::{ConversationTracker, ResponsibilityDomain, TurnOutcome, TurnResult};
use lucy_core::ledger::{AcceptanceLedger, AcceptanceReceipt};

use crate::responder::{fallback_line, Responder, ResponseRequest, TemplateResponder};
use crate::templates::TemplateError;

const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct TurnReply {
    pub reply: String,
    pub route: ResponsibilityDomain,
    pub outcome: TurnOutcome,
    pub state: ConversationState,
    /// Set when the responder failed and the turn was rolled back.
    pub degraded: bool,
    pub receipt: Option<AcceptanceReceipt>,
}

/// Runs one customer turn end to end: tracker, responder, acceptance ledger.
///
/// The caller owns session storage and must not run two turns of the same session
/// concurrently.
pub struct LucyRuntime<R> {
    tracker: ConversationTracker,
    responder: R,
    greeting: String,
    ledger: Option<Arc<dyn AcceptanceLedger>>,
    audit: Arc<dyn AuditSink>,
    reply_timeout: Duration,
}

impl<R> LucyRuntime<R>
where
    R: Responder,
{
    pub fn new(tracker: ConversationTracker, responder: R, greeting: String) -> Self {
        Self {
            tracker,
            responder,
            greeting,
            ledger: None,
            audit: Arc::new(TracingAuditSink),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }

    /// Builds a runtime whose greeting comes from a template responder.
    pub fn with_template_greeting(
        tracker: ConversationTracker,
        responder: R,
        templates: &TemplateResponder,
    ) -> Result<Self, TemplateError> {
        Ok(Self::new(tracker, responder, templates.greeting()?))
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn AcceptanceLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub fn tracker(&self) -> &ConversationTracker {
        &self.tracker
    }

    pub async fn handle_turn(
        &self,
        message: &str,
        photos: &[String],
        previous: Option<ConversationState>,
    ) -> TurnReply {
        let audit = AuditContext::for_turn(
            previous.as_ref().map(|state| state.session_id.clone()),
            "customer",
        );

        let Some(previous) = previous else {
            let TurnResult { route, outcome, mut state } =
                self.tracker.process_turn_with_audit(message, photos, None, &*self.audit, &audit);
            state.record_reply(self.greeting.clone());
            return TurnReply {
                reply: self.greeting.clone(),
                route,
                outcome,
                state,
                degraded: false,
                receipt: None,
            };
        };

        let TurnResult { route, outcome, mut state } = self.tracker.process_turn_with_audit(
            message,
            photos,
            Some(previous.clone()),
            &*self.audit,
            &audit,
        );

        let request = ResponseRequest { message, route, outcome: &outcome, state: &state };
        let reply = match tokio::time::timeout(self.reply_timeout, self.responder.respond(&request))
            .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(error)) => {
                return self.rolled_back(previous, route, outcome, &audit, error.to_string());
            }
            Err(_) => {
                let reason = format!("responder timed out after {:?}", self.reply_timeout);
                return self.rolled_back(previous, route, outcome, &audit, reason);
            }
        };

        let receipt = self.record_decision(&outcome, &state, &audit).await;
        if outcome.offer().is_some() {
            state.mark_offer_presented();
        }
        state.record_reply(reply.clone());

        TurnReply { reply, route, outcome, state, degraded: false, receipt }
    }

    fn rolled_back(
        &self,
        previous: ConversationState,
        route: ResponsibilityDomain,
        outcome: TurnOutcome,
        audit: &AuditContext,
        reason: String,
    ) -> TurnReply {
        let task = previous.current_task;
        tracing::warn!(
            event_name = "agent.turn_rolled_back",
            session_id = %previous.session_id,
            correlation_id = %audit.correlation_id,
            task = %task,
            error = %reason,
            "responder failed; keeping previous state"
        );
        self.audit.emit(
            AuditEvent::from_context(
                audit,
                "conversation.turn_rolled_back",
                AuditCategory::Flow,
                AuditOutcome::Failed,
            )
            .with_metadata("task", task.as_str())
            .with_metadata("discarded_outcome", outcome.kind())
            .with_metadata("reason", reason.clone()),
        );

        let interface =
            ApplicationError::Integration(reason).into_interface(audit.correlation_id.clone());
        let reply = format!("{}\n\n{}", interface.user_message(), fallback_line(task));

        TurnReply { reply, route, outcome, state: previous, degraded: true, receipt: None }
    }

    async fn record_decision(
        &self,
        outcome: &TurnOutcome,
        state: &ConversationState,
        audit: &AuditContext,
    ) -> Option<AcceptanceReceipt> {
        let (offer, accepted): (&LoanOffer, bool) = match outcome {
            TurnOutcome::OfferAccepted { offer } => (offer, true),
            TurnOutcome::OfferDeclined { offer } => (offer, false),
            _ => return None,
        };
        let ledger = self.ledger.as_ref()?;
        let record =
            AcceptanceRecord::from_offer(state.session_id.0.clone(), offer, accepted, Utc::now());

        match tokio::time::timeout(self.reply_timeout, ledger.record_acceptance(&record)).await {
            Ok(Ok(receipt)) => {
                tracing::info!(
                    event_name = "agent.acceptance_recorded",
                    session_id = %state.session_id,
                    correlation_id = %audit.correlation_id,
                    status = receipt.status.as_str(),
                    loan_amount = record.loan_amount,
                    "offer decision recorded"
                );
                Some(receipt)
            }
            Ok(Err(error)) => {
                self.ledger_failed(state, audit, error.to_string());
                None
            }
            Err(_) => {
                self.ledger_failed(state, audit, "ledger call timed out".to_owned());
                None
            }
        }
    }

    fn ledger_failed(&self, state: &ConversationState, audit: &AuditContext, reason: String) {
        tracing::warn!(
            event_name = "agent.acceptance_failed",
            session_id = %state.session_id,
            correlation_id = %audit.correlation_id,
            error = %reason,
            "acceptance ledger call failed; reply unaffected"
        );
        self.audit.emit(
            AuditEvent::from_context(
                audit,
                "offer.ledger_failed",
                AuditCategory::Persistence,
                AuditOutcome::Failed,
            )
            .with_metadata("reason", reason),
        );
    }
}
