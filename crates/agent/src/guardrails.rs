//! Checks applied to collaborator-written replies. The language model rephrases; it never
//! decides loan terms.

use lucy_core::domain::offer::LoanOffer;
use lucy_core::offer::format_amount;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyDecision {
    Allow,
    Replace { reason_code: &'static str },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyGuard {
    pub max_reply_chars: usize,
}

impl Default for ReplyGuard {
    fn default() -> Self {
        Self { max_reply_chars: 4_000 }
    }
}

impl ReplyGuard {
    /// A reply that accompanies an offer must quote the computed amount and total due verbatim.
    pub fn review(&self, offer: Option<&LoanOffer>, reply: &str) -> ReplyDecision {
        let trimmed = reply.trim();
        if trimmed.is_empty() {
            return ReplyDecision::Replace { reason_code: "empty_reply" };
        }
        if trimmed.chars().count() > self.max_reply_chars {
            return ReplyDecision::Replace { reason_code: "reply_too_long" };
        }
        if let Some(offer) = offer {
            let amount = format_amount(offer.amount);
            let total_due = format_amount(offer.total_due);
            if !trimmed.contains(&amount) || !trimmed.contains(&total_due) {
                return ReplyDecision::Replace { reason_code: "offer_terms_altered" };
            }
        }
        ReplyDecision::Allow
    }
}
