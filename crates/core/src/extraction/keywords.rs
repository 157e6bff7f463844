//! Keyword tables for the extraction heuristics.
//!
//! Every entry is matched as a lower-case substring of the lower-cased message, so short
//! entries such as `"in"` or `"no"` also match inside longer words.

pub const LOCATION_INDICATORS: &[&str] =
    &["market", "lane", "street", "road", "avenue", "in", "at", "near", "area", "estate", "mall"];

pub const BUSINESS_TYPES: &[&str] =
    &["shop", "kiosk", "restaurant", "salon", "grocery", "boutique", "hardware"];

pub const BUSINESS_DESCRIPTION: &[&str] = &["business", "shop", "sell", "kiosk", "market"];

pub const AFFECT: &[&str] = &["love", "enjoy", "like", "passion"];

pub const CHALLENGE: &[&str] =
    &["challenge", "problem", "difficult", "struggle", "need", "want", "lack", "require"];

pub const LOAN: &str = "loan";

pub const CUSTOMER: &str = "customer";

pub const CURRENCY: &[&str] = &["kes", "shilling"];

pub const READINESS: &[&str] = &["yes", "ready", "confirm", "proceed"];

pub const OFFER_ACCEPT: &[&str] = &["yes", "accept", "agree", "take"];

pub const OFFER_DECLINE: &[&str] = &["no", "reject", "decline"];

pub const ROLE_QUESTIONS: &[&str] = &["what is your job", "who are you", "what do you do"];

pub const BUSINESS_VIEW_QUESTIONS: &[&str] =
    &["what business", "what do you see", "see my business"];

/// Ordered keyword to loan-use category table. Several keywords share a category.
pub const LOAN_USES: &[(&str, &str)] = &[
    ("stock", "Purchase inventory/stock"),
    ("inventory", "Purchase inventory/stock"),
    ("expand", "Business expansion"),
    ("equipment", "Buy equipment"),
    ("rent", "Pay rent"),
    ("supplies", "Buy supplies"),
    ("meat", "Add new product lines"),
    ("products", "Expand product range"),
    ("grow", "Business growth"),
    ("capital", "Working capital"),
    ("money", "Working capital"),
];

pub const LOAN_USE_FALLBACK: &str = "Business expansion and growth";

pub const LOAN_USE_GENERAL: &str = "General business needs";

pub const CHALLENGE_PLACEHOLDER: &str = "Need capital for business growth";

/// True when any entry of `table` occurs in `lowered`.
pub fn contains_any(lowered: &str, table: &[&str]) -> bool {
    table.iter().any(|keyword| lowered.contains(keyword))
}
