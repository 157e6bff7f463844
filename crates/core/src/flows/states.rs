use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::offer::{LoanOffer, OfferStatus};
use crate::domain::task::Task;

/// Collaborator responsible for producing the reply to a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponsibilityDomain {
    #[serde(rename = "greeting")]
    Greeting,
    #[serde(rename = "photo-domain")]
    Photo,
    #[serde(rename = "coaching-domain")]
    Coaching,
    #[serde(rename = "underwriting-domain")]
    Underwriting,
}

impl ResponsibilityDomain {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Photo => "photo-domain",
            Self::Coaching => "coaching-domain",
            Self::Underwriting => "underwriting-domain",
        }
    }
}

impl fmt::Display for ResponsibilityDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionRule {
    pub task: Task,
    pub next: Option<Task>,
    pub domain: ResponsibilityDomain,
}

pub const CRITICAL_PATH: [TransitionRule; 8] = [
    TransitionRule { task: Task::B1, next: Some(Task::E4a), domain: ResponsibilityDomain::Photo },
    TransitionRule {
        task: Task::E4a,
        next: Some(Task::E4b),
        domain: ResponsibilityDomain::Coaching,
    },
    TransitionRule {
        task: Task::E4b,
        next: Some(Task::B4),
        domain: ResponsibilityDomain::Coaching,
    },
    TransitionRule {
        task: Task::B4,
        next: Some(Task::E6),
        domain: ResponsibilityDomain::Underwriting,
    },
    TransitionRule {
        task: Task::E6,
        next: Some(Task::L3),
        domain: ResponsibilityDomain::Coaching,
    },
    TransitionRule {
        task: Task::L3,
        next: Some(Task::L5),
        domain: ResponsibilityDomain::Underwriting,
    },
    TransitionRule {
        task: Task::L5,
        next: Some(Task::Offer),
        domain: ResponsibilityDomain::Underwriting,
    },
    TransitionRule { task: Task::Offer, next: None, domain: ResponsibilityDomain::Underwriting },
];

pub fn rule_for(task: Task) -> Option<&'static TransitionRule> {
    CRITICAL_PATH.iter().find(|rule| rule.task == task)
}

/// Domain for a task. Tasks without a rule go to coaching.
pub fn route_for(task: Task) -> ResponsibilityDomain {
    rule_for(task).map(|rule| rule.domain).unwrap_or(ResponsibilityDomain::Coaching)
}

pub fn next_task(task: Task) -> Option<Task> {
    rule_for(task).and_then(|rule| rule.next)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// First message of a session. Nothing is extracted from it.
    Greeting,
    EmptyMessage { task: Task },
    Stayed { task: Task },
    /// `offer` is set when completing `task` opened the offer.
    TaskCompleted { task: Task, next: Option<Task>, offer: Option<LoanOffer> },
    OfferPresented { offer: LoanOffer },
    OfferAccepted { offer: LoanOffer },
    OfferDeclined { offer: LoanOffer },
    OfferSettled { status: OfferStatus },
}

impl TurnOutcome {
    pub fn offer(&self) -> Option<&LoanOffer> {
        match self {
            Self::TaskCompleted { offer, .. } => offer.as_ref(),
            Self::OfferPresented { offer }
            | Self::OfferAccepted { offer }
            | Self::OfferDeclined { offer } => Some(offer),
            Self::Greeting
            | Self::EmptyMessage { .. }
            | Self::Stayed { .. }
            | Self::OfferSettled { .. } => None,
        }
    }

    pub fn completed_task(&self) -> Option<Task> {
        match self {
            Self::TaskCompleted { task, .. } => Some(*task),
            Self::OfferAccepted { .. } => Some(Task::Offer),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::EmptyMessage { .. } => "empty_message",
            Self::Stayed { .. } => "stayed",
            Self::TaskCompleted { .. } => "task_completed",
            Self::OfferPresented { .. } => "offer_presented",
            Self::OfferAccepted { .. } => "offer_accepted",
            Self::OfferDeclined { .. } => "offer_declined",
            Self::OfferSettled { .. } => "offer_settled",
        }
    }
}
