use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// One stage of Lucy's onboarding sequence.
///
/// Variants are declared in critical-path order, so the derived `Ord` matches
/// the order in which tasks are completed.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Task {
    #[default]
    #[serde(rename = "B1")]
    B1,
    #[serde(rename = "E4a")]
    E4a,
    #[serde(rename = "E4b")]
    E4b,
    #[serde(rename = "B4")]
    B4,
    #[serde(rename = "E6")]
    E6,
    #[serde(rename = "L3")]
    L3,
    #[serde(rename = "L5")]
    L5,
    #[serde(rename = "OFFER")]
    Offer,
}

impl Task {
    pub const ALL: [Task; 8] = [
        Task::B1,
        Task::E4a,
        Task::E4b,
        Task::B4,
        Task::E6,
        Task::L3,
        Task::L5,
        Task::Offer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::B1 => "B1",
            Self::E4a => "E4a",
            Self::E4b => "E4b",
            Self::B4 => "B4",
            Self::E6 => "E6",
            Self::L3 => "L3",
            Self::L5 => "L5",
            Self::Offer => "OFFER",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::B1 => "photos & location",
            Self::E4a => "business identity",
            Self::E4b => "short-term goal",
            Self::B4 => "sales triangulation",
            Self::E6 => "challenge & asset",
            Self::L3 => "loan use",
            Self::L5 => "readiness",
            Self::Offer => "loan offer",
        }
    }

    pub fn position(&self) -> usize {
        Self::ALL.iter().position(|task| task == self).unwrap_or(Self::ALL.len())
    }

    /// Fixed successor on the critical path. `Offer` is terminal.
    pub fn successor(&self) -> Option<Task> {
        Self::ALL.get(self.position() + 1).copied()
    }

    pub fn is_terminal(&self) -> bool {
        self.successor().is_none()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|task| task.as_str().to_ascii_uppercase() == normalized)
            .ok_or_else(|| DomainError::UnknownTask(value.to_string()))
    }
}
