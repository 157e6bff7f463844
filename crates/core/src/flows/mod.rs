pub mod engine;
pub mod states;

pub use engine::{ConversationTracker, TurnResult};
pub use states::{
    next_task, route_for, rule_for, ResponsibilityDomain, TransitionRule, TurnOutcome,
    CRITICAL_PATH,
};
