use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::coaching::create_asset;
use crate::domain::conversation::ConversationState;
use crate::domain::offer::OfferStatus;
use crate::domain::task::Task;
use crate::extraction::{self, OfferReply, SalesExtraction};
use crate::flows::states::{next_task, route_for, ResponsibilityDomain, TurnOutcome};
use crate::offer::{calculate_offer, OfferPolicy};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub route: ResponsibilityDomain,
    pub outcome: TurnOutcome,
    pub state: ConversationState,
}

/// Applies one customer turn to the conversation state.
///
/// The tracker owns no session data. Callers hand in the previous state and persist the
/// returned one, serialising turns per session.
#[derive(Clone, Debug, Default)]
pub struct ConversationTracker {
    policy: OfferPolicy,
}

impl ConversationTracker {
    pub fn new(policy: OfferPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &OfferPolicy {
        &self.policy
    }

    pub fn process_turn(
        &self,
        message: &str,
        photos: &[String],
        previous: Option<ConversationState>,
    ) -> TurnResult {
        self.process_turn_on(message, photos, previous, Utc::now().date_naive())
    }

    /// Same as [`Self::process_turn`] with an explicit date for offer due dates.
    pub fn process_turn_on(
        &self,
        message: &str,
        photos: &[String],
        previous: Option<ConversationState>,
        today: NaiveDate,
    ) -> TurnResult {
        let Some(mut state) = previous else {
            let mut state = ConversationState::start();
            state.record_customer_message(message);
            state.customer.add_photos(photos.iter().cloned());
            return TurnResult {
                route: ResponsibilityDomain::Greeting,
                outcome: TurnOutcome::Greeting,
                state,
            };
        };

        state.record_customer_message(message);
        let task = state.current_task;
        let route = route_for(task);

        if message.trim().is_empty() {
            if task == Task::B1 {
                state.customer.add_photos(photos.iter().cloned());
            }
            return TurnResult { route, outcome: TurnOutcome::EmptyMessage { task }, state };
        }

        let outcome = match task {
            Task::Offer => self.offer_turn(message, &mut state, today),
            _ => {
                if capture(task, message, photos, &mut state) {
                    self.complete(task, &mut state, today)
                } else {
                    TurnOutcome::Stayed { task }
                }
            }
        };

        TurnResult { route, outcome, state }
    }

    pub fn process_turn_with_audit<S>(
        &self,
        message: &str,
        photos: &[String],
        previous: Option<ConversationState>,
        sink: &S,
        audit: &AuditContext,
    ) -> TurnResult
    where
        S: AuditSink + ?Sized,
    {
        self.process_turn_with_audit_on(
            message,
            photos,
            previous,
            sink,
            audit,
            Utc::now().date_naive(),
        )
    }

    pub fn process_turn_with_audit_on<S>(
        &self,
        message: &str,
        photos: &[String],
        previous: Option<ConversationState>,
        sink: &S,
        audit: &AuditContext,
        today: NaiveDate,
    ) -> TurnResult
    where
        S: AuditSink + ?Sized,
    {
        let result = self.process_turn_on(message, photos, previous, today);
        emit_turn_events(&result, sink, audit);
        result
    }

    fn complete(&self, task: Task, state: &mut ConversationState, today: NaiveDate) -> TurnOutcome {
        state.customer.completed_tasks.insert(task);
        let next = next_task(task);
        if let Some(next) = next {
            state.current_task = next;
        }
        tracing::debug!(
            event_name = "conversation.task_completed",
            session_id = %state.session_id,
            task = %task,
            "task completed"
        );

        let offer = if next == Some(Task::Offer) {
            state.offer_status = OfferStatus::Presenting;
            Some(calculate_offer(&state.customer, &self.policy, today))
        } else {
            None
        };
        TurnOutcome::TaskCompleted { task, next, offer }
    }

    fn offer_turn(
        &self,
        message: &str,
        state: &mut ConversationState,
        today: NaiveDate,
    ) -> TurnOutcome {
        if state.offer_status.is_settled() {
            return TurnOutcome::OfferSettled { status: state.offer_status };
        }

        let offer = calculate_offer(&state.customer, &self.policy, today);
        if !state.offer_status.is_open() {
            state.offer_status = OfferStatus::Presenting;
            return TurnOutcome::OfferPresented { offer };
        }

        match extraction::offer_reply(message) {
            OfferReply::Accept => {
                state.offer_status = OfferStatus::Accepted;
                state.customer.completed_tasks.insert(Task::Offer);
                TurnOutcome::OfferAccepted { offer }
            }
            OfferReply::Decline => {
                state.offer_status = OfferStatus::Declined;
                TurnOutcome::OfferDeclined { offer }
            }
            OfferReply::Other => TurnOutcome::OfferPresented { offer },
        }
    }
}

/// Writes whatever the message yields for `task` into the record and reports whether the
/// task is now complete.
fn capture(task: Task, message: &str, photos: &[String], state: &mut ConversationState) -> bool {
    let customer = &mut state.customer;
    match task {
        Task::B1 => {
            if !customer.has_location() {
                if let Some(location) = extraction::extract_location(message) {
                    customer.location = location;
                }
            }
            customer.add_photos(photos.iter().cloned());
            customer.has_photos() && customer.has_location()
        }
        Task::E4a => {
            if !extraction::is_business_description(message) {
                return false;
            }
            customer.business_type = extraction::extract_business_type(message);
            true
        }
        Task::E4b => {
            if !extraction::expresses_affect(message) {
                return false;
            }
            customer.what_they_love = message.to_string();
            true
        }
        Task::B4 => match extraction::extract_sales(message) {
            SalesExtraction::NoMatch => false,
            SalesExtraction::CustomersOnly { customers } => {
                customer.daily_customers = customers;
                false
            }
            SalesExtraction::Complete(figures) => {
                if !(figures.customers_assumed && customer.daily_customers > 0) {
                    customer.daily_customers = figures.customers;
                }
                customer.daily_sales = figures.sales;
                customer.weekly_sales = Some(figures.weekly_sales);
                true
            }
        },
        Task::E6 => {
            if !extraction::describes_challenge(message) {
                return false;
            }
            customer.challenge = extraction::challenge_text(message);
            customer.created_asset =
                Some(create_asset(&customer.challenge, &customer.business_type));
            true
        }
        Task::L3 => {
            let uses = extraction::extract_loan_uses(message);
            if uses.is_empty() {
                return false;
            }
            customer.loan_uses = uses;
            true
        }
        Task::L5 => extraction::is_affirmative_readiness(message),
        Task::Offer => false,
    }
}

fn emit_turn_events<S>(result: &TurnResult, sink: &S, audit: &AuditContext)
where
    S: AuditSink + ?Sized,
{
    let mut context = audit.clone();
    context.session_id = Some(result.state.session_id.clone());

    sink.emit(
        AuditEvent::from_context(
            &context,
            "conversation.turn_routed",
            AuditCategory::Ingress,
            AuditOutcome::Success,
        )
        .with_metadata("route", result.route.label())
        .with_metadata("task", result.state.current_task.as_str())
        .with_metadata("outcome", result.outcome.kind()),
    );

    if let TurnOutcome::TaskCompleted { task, next, .. } = &result.outcome {
        sink.emit(
            AuditEvent::from_context(
                &context,
                "conversation.task_completed",
                AuditCategory::Flow,
                AuditOutcome::Success,
            )
            .with_metadata("task", task.as_str())
            .with_metadata("next", next.map(|next| next.as_str()).unwrap_or("none"))
            .with_metadata("progress", result.state.customer.progress().percentage.to_string()),
        );
    }

    match &result.outcome {
        TurnOutcome::OfferAccepted { offer } => sink.emit(
            AuditEvent::from_context(
                &context,
                "offer.accepted",
                AuditCategory::Offer,
                AuditOutcome::Success,
            )
            .with_metadata("amount", offer.amount.to_string())
            .with_metadata("tenure_days", offer.tenure_days.to_string()),
        ),
        TurnOutcome::OfferDeclined { offer } => sink.emit(
            AuditEvent::from_context(
                &context,
                "offer.declined",
                AuditCategory::Offer,
                AuditOutcome::Rejected,
            )
            .with_metadata("amount", offer.amount.to_string()),
        ),
        _ => {}
    }
}
