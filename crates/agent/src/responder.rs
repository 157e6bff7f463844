use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use tera::Context;

use lucy_core::coaching::business_tip;
use lucy_core::domain::conversation::ConversationState;
use lucy_core::domain::offer::LoanOffer;
use lucy_core::domain::task::Task;
use lucy_core::extraction::{self, keywords};
use lucy_core::flows::{ResponsibilityDomain, TurnOutcome};
use lucy_core::offer::{format_amount, format_rate, sales_analysis, OfferPolicy, SalesAnalysis};

use crate::guardrails::{ReplyDecision, ReplyGuard};
use crate::llm::LlmClient;
use crate::templates::{TemplateCatalog, TemplateError};

/// Everything a responder may look at. `state` is the state after the turn was applied.
#[derive(Clone, Copy, Debug)]
pub struct ResponseRequest<'a> {
    pub message: &'a str,
    pub route: ResponsibilityDomain,
    pub outcome: &'a TurnOutcome,
    pub state: &'a ConversationState,
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: &ResponseRequest<'_>) -> Result<String>;
}

/// Short re-prompt for a task, used when a turn yields nothing new.
pub fn fallback_line(task: Task) -> &'static str {
    match task {
        Task::B1 => "I'd love to see your business! Please share 2 photos and your location.",
        Task::E4a => "Tell me about your business. What type of business do you run?",
        Task::E4b => "What do you love most about your business?",
        Task::B4 => "How many customers do you serve a day, and what are your daily sales in KES?",
        Task::E6 => "What's your biggest business challenge right now?",
        Task::L3 => "What would you use the loan for?",
        Task::L5 => "Are you ready to see your loan offer?",
        Task::Offer => {
            "Would you like to take this offer? Reply \"Yes\" to accept or \"No\" to decline."
        }
    }
}

/// Deterministic replies rendered from the embedded templates.
pub struct TemplateResponder {
    catalog: TemplateCatalog,
    policy: OfferPolicy,
    rng: Mutex<StdRng>,
}

impl TemplateResponder {
    pub fn new(catalog: TemplateCatalog, policy: OfferPolicy) -> Self {
        Self { catalog, policy, rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Fixes the business-tip choice, for reproducible transcripts.
    pub fn with_seed(catalog: TemplateCatalog, policy: OfferPolicy, seed: u64) -> Self {
        Self { catalog, policy, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn greeting(&self) -> Result<String, TemplateError> {
        self.catalog.reply("greeting", &Context::new())
    }

    pub fn draft(&self, request: &ResponseRequest<'_>) -> Result<String, TemplateError> {
        let context = self.context_for(request);
        let mut sections = Vec::new();

        match request.outcome {
            TurnOutcome::Greeting => sections.push(self.catalog.reply("greeting", &context)?),
            TurnOutcome::EmptyMessage { task } => sections.push(fallback_line(*task).to_owned()),
            TurnOutcome::Stayed { task } => sections.push(self.stayed(*task, request, &context)?),
            TurnOutcome::TaskCompleted { task, next, .. } => {
                if let Some(name) = acknowledgement(*task, request.state) {
                    sections.push(self.catalog.reply(name, &context)?);
                }
                if let Some(next) = next {
                    sections.push(self.catalog.reply(prompt_for(*next), &context)?);
                }
            }
            TurnOutcome::OfferPresented { .. } => {
                sections.push(self.catalog.reply("offer", &context)?)
            }
            TurnOutcome::OfferAccepted { .. } => {
                sections.push(self.catalog.reply("accepted", &context)?)
            }
            TurnOutcome::OfferDeclined { .. } => {
                sections.push(self.catalog.reply("declined", &context)?)
            }
            TurnOutcome::OfferSettled { .. } => sections.push(self.tip()?),
        }

        Ok(sections.join("\n\n"))
    }

    /// Template variables derived from the record, the sales analysis and any offer on the turn.
    pub fn context_for(&self, request: &ResponseRequest<'_>) -> Context {
        let state = request.state;
        let customer = &state.customer;
        let mut context = Context::new();

        context.insert("message", request.message);
        context.insert("route", request.route.label());
        context.insert("task", state.current_task.as_str());
        context.insert("task_description", state.current_task.description());
        context.insert("location", &customer.location);
        context.insert("photo_count", &customer.photos.len());
        context.insert("business_label", business_label(&customer.business_type));
        context.insert("what_they_love", &customer.what_they_love);
        context.insert("daily_customers", &customer.daily_customers);
        context.insert("has_sales", &(customer.daily_sales > 0));
        context.insert("daily_sales", &format_amount(Decimal::from(customer.daily_sales)));
        context.insert("challenge", &customer.challenge);
        context.insert("loan_uses", &customer.loan_uses.join(", "));
        context.insert("photo_income_note", customer.photo_income_note.as_deref().unwrap_or(""));

        match sales_analysis(customer, &self.policy) {
            SalesAnalysis::Estimated { average_per_customer, monthly_gross } => {
                context.insert("average_per_customer", &format_amount(average_per_customer));
                context.insert("monthly_gross", &format_amount(monthly_gross));
            }
            SalesAnalysis::InsufficientData => {
                context.insert("average_per_customer", "");
                context.insert("monthly_gross", "");
            }
        }

        match &customer.created_asset {
            Some(asset) => {
                context.insert("asset_label", asset.kind.label());
                context.insert("asset_body", &asset.body);
            }
            None => {
                context.insert("asset_label", "");
                context.insert("asset_body", "");
            }
        }

        if let Some(offer) = request.outcome.offer() {
            insert_offer(&mut context, offer);
        }
        context
    }

    fn stayed(
        &self,
        task: Task,
        request: &ResponseRequest<'_>,
        context: &Context,
    ) -> Result<String, TemplateError> {
        if extraction::is_role_question(request.message) {
            let mut context = context.clone();
            context.insert("next_prompt", fallback_line(task));
            return self.catalog.reply("role", &context);
        }
        if extraction::is_business_view_question(request.message) {
            return self.catalog.reply("business_view", context);
        }

        let customer = &request.state.customer;
        match task {
            Task::B1 => match (customer.has_photos(), customer.has_location()) {
                (false, true) => self.catalog.reply("photo_need_photos", context),
                (true, false) => self.catalog.reply("photo_need_location", context),
                _ => self.catalog.reply("photo_prompt", context),
            },
            Task::B4 => self.catalog.reply("sales_prompt", context),
            other => Ok(fallback_line(other).to_owned()),
        }
    }

    fn tip(&self) -> Result<String, TemplateError> {
        let tip = {
            let mut rng = match self.rng.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            business_tip(&mut *rng)
        };
        let mut context = Context::new();
        context.insert("tip", tip.tip);
        context.insert("follow_up", tip.follow_up);
        self.catalog.reply("tip", &context)
    }
}

#[async_trait]
impl Responder for TemplateResponder {
    async fn respond(&self, request: &ResponseRequest<'_>) -> Result<String> {
        Ok(self.draft(request)?)
    }
}

/// Asks the language model to rephrase the deterministic draft in Lucy's voice. Replies that
/// fail the guard fall back to the draft.
pub struct LlmResponder<L> {
    client: L,
    templates: TemplateResponder,
    guard: ReplyGuard,
}

impl<L> LlmResponder<L>
where
    L: LlmClient,
{
    pub fn new(client: L, templates: TemplateResponder) -> Self {
        Self { client, templates, guard: ReplyGuard::default() }
    }
}

#[async_trait]
impl<L> Responder for LlmResponder<L>
where
    L: LlmClient,
{
    async fn respond(&self, request: &ResponseRequest<'_>) -> Result<String> {
        let draft = self.templates.draft(request)?;
        let mut context = self.templates.context_for(request);
        context.insert("draft", &draft);

        let Some(prompt) = self.templates.catalog().prompt(request.route, &context)? else {
            return Ok(draft);
        };

        let reply = self.client.complete(&prompt).await?;
        match self.guard.review(request.outcome.offer(), &reply) {
            ReplyDecision::Allow => Ok(reply.trim().to_owned()),
            ReplyDecision::Replace { reason_code } => {
                tracing::warn!(
                    event_name = "agent.reply_replaced",
                    session_id = %request.state.session_id,
                    reason_code,
                    "collaborator reply failed review; using template reply"
                );
                Ok(draft)
            }
        }
    }
}

fn acknowledgement(task: Task, state: &ConversationState) -> Option<&'static str> {
    match task {
        Task::B1 => Some("photo_received"),
        Task::E4b => Some("passion"),
        Task::B4 => Some("sales_analysis"),
        Task::E6 if state.customer.created_asset.is_some() => Some("asset"),
        _ => None,
    }
}

fn prompt_for(task: Task) -> &'static str {
    match task {
        Task::B1 => "photo_prompt",
        Task::E4a => "business_prompt",
        Task::E4b => "love_prompt",
        Task::B4 => "sales_prompt",
        Task::E6 => "challenge_prompt",
        Task::L3 => "loan_use_prompt",
        Task::L5 => "readiness",
        Task::Offer => "offer",
    }
}

fn business_label(business_type: &str) -> &str {
    keywords::BUSINESS_TYPES
        .iter()
        .copied()
        .find(|known| *known == business_type)
        .unwrap_or("business")
}

fn insert_offer(context: &mut Context, offer: &LoanOffer) {
    context.insert("amount", &format_amount(offer.amount));
    context.insert("total_due", &format_amount(offer.total_due));
    context.insert("total_interest", &format_amount(offer.total_interest));
    context.insert("monthly_net", &format_amount(offer.monthly_net));
    context.insert("due_date", &offer.due_date.to_string());
    context.insert("daily_rate", &format_rate(offer.daily_rate));
    context.insert("late_fee", &format_rate(offer.late_fee_rate));
    context.insert("tenure_days", &offer.tenure_days);
    context.insert("repayment_frequency", &offer.repayment_frequency);
    context.insert("loan_type", offer.loan_type.as_str());
}
