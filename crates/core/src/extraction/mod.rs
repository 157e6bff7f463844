//! Stateless heuristics that pull structured fields out of a single free-text message.
//!
//! None of these functions fail: a message that matches nothing yields the "not found" value
//! for the extractor, and the tracker treats that as a reason to stay on the current task.

pub mod keywords;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use self::keywords::contains_any;

/// Sales below this are read as thousands of shillings ("8" means 8000).
const THOUSANDS_SCALE_BELOW: u64 = 100;
/// A lone number above this is read as a sales figure even without a currency word.
const LONE_SALES_THRESHOLD: u64 = 50;
/// Customer count used when only a sales figure was given.
pub const PLACEHOLDER_CUSTOMERS: u64 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFigures {
    pub customers: u64,
    pub sales: u64,
    pub weekly_sales: u64,
    pub customers_assumed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SalesExtraction {
    NoMatch,
    CustomersOnly { customers: u64 },
    Complete(SalesFigures),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferReply {
    Accept,
    Decline,
    Other,
}

pub fn extract_location(message: &str) -> Option<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return None;
    }
    if contains_any(&trimmed.to_lowercase(), keywords::LOCATION_INDICATORS) {
        return Some(trimmed.to_string());
    }
    if trimmed.split_whitespace().count() <= 4 && trimmed.chars().count() > 2 {
        return Some(trimmed.to_string());
    }
    None
}

/// First known business type mentioned, else the message itself.
pub fn extract_business_type(message: &str) -> String {
    let lowered = message.to_lowercase();
    keywords::BUSINESS_TYPES
        .iter()
        .find(|business| lowered.contains(*business))
        .map(|business| (*business).to_string())
        .unwrap_or_else(|| message.trim().to_string())
}

pub fn extract_sales(message: &str) -> SalesExtraction {
    let numbers = digit_runs(message);
    let lowered = message.to_lowercase();

    match numbers.as_slice() {
        [] => SalesExtraction::NoMatch,
        [customers, sales, ..] => {
            let sales = scale_thousands(*sales);
            SalesExtraction::Complete(SalesFigures {
                customers: *customers,
                sales,
                weekly_sales: sales.saturating_mul(7),
                customers_assumed: false,
            })
        }
        [only] => {
            if lowered.contains(keywords::CUSTOMER) {
                SalesExtraction::CustomersOnly { customers: *only }
            } else if contains_any(&lowered, keywords::CURRENCY) || *only > LONE_SALES_THRESHOLD {
                let sales = scale_thousands(*only);
                SalesExtraction::Complete(SalesFigures {
                    customers: PLACEHOLDER_CUSTOMERS,
                    sales,
                    weekly_sales: sales.saturating_mul(7),
                    customers_assumed: true,
                })
            } else {
                SalesExtraction::NoMatch
            }
        }
    }
}

/// Loan-use categories in table order, without duplicates. Never empty.
pub fn extract_loan_uses(message: &str) -> Vec<String> {
    let lowered = message.to_lowercase();
    let mut uses: Vec<String> = Vec::new();
    for (keyword, category) in keywords::LOAN_USES {
        if lowered.contains(keyword) && !uses.iter().any(|existing| existing == category) {
            uses.push((*category).to_string());
        }
    }

    if uses.is_empty() {
        let fallback = if lowered.contains(keywords::LOAN) || message.chars().count() > 3 {
            keywords::LOAN_USE_FALLBACK
        } else {
            keywords::LOAN_USE_GENERAL
        };
        uses.push(fallback.to_string());
    }
    uses
}

pub fn is_business_description(message: &str) -> bool {
    contains_any(&message.to_lowercase(), keywords::BUSINESS_DESCRIPTION)
}

pub fn expresses_affect(message: &str) -> bool {
    contains_any(&message.to_lowercase(), keywords::AFFECT)
}

/// Accepts almost any real answer: a challenge word, a loan mention, or two or more words.
pub fn describes_challenge(message: &str) -> bool {
    let lowered = message.to_lowercase();
    contains_any(&lowered, keywords::CHALLENGE)
        || lowered.contains(keywords::LOAN)
        || message.split_whitespace().count() >= 2
}

/// The stored challenge text: the message as sent when it is over ten characters, else a
/// placeholder. Surrounding whitespace counts toward the length and is kept.
pub fn challenge_text(message: &str) -> String {
    if message.chars().count() > 10 {
        message.to_string()
    } else {
        keywords::CHALLENGE_PLACEHOLDER.to_string()
    }
}

pub fn is_affirmative_readiness(message: &str) -> bool {
    contains_any(&message.to_lowercase(), keywords::READINESS)
}

/// Acceptance is checked first, so a message matching both tables counts as acceptance.
pub fn offer_reply(message: &str) -> OfferReply {
    let lowered = message.to_lowercase();
    if contains_any(&lowered, keywords::OFFER_ACCEPT) {
        OfferReply::Accept
    } else if contains_any(&lowered, keywords::OFFER_DECLINE) {
        OfferReply::Decline
    } else {
        OfferReply::Other
    }
}

pub fn is_role_question(message: &str) -> bool {
    contains_any(&message.to_lowercase(), keywords::ROLE_QUESTIONS)
}

pub fn is_business_view_question(message: &str) -> bool {
    contains_any(&message.to_lowercase(), keywords::BUSINESS_VIEW_QUESTIONS)
}

/// Photo references from an untyped payload. Non-arrays yield nothing; blank or
/// non-string entries are dropped.
pub fn normalize_photos(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(serde_json::Value::as_str)
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn scale_thousands(value: u64) -> u64 {
    if value > 0 && value < THOUSANDS_SCALE_BELOW {
        value.saturating_mul(1000)
    } else {
        value
    }
}

fn digit_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[0-9]+").ok()).as_ref()
}

fn digit_runs(message: &str) -> Vec<u64> {
    let Some(pattern) = digit_pattern() else {
        return Vec::new();
    };
    pattern.find_iter(message).filter_map(|found| found.as_str().parse::<u64>().ok()).collect()
}
