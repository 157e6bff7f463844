use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanType {
    ShortTerm,
    LongTerm,
}

impl LoanType {
    pub const SHORT_TERM_MAX_DAYS: u32 = 60;

    pub fn for_tenure(tenure_days: u32) -> Self {
        if tenure_days <= Self::SHORT_TERM_MAX_DAYS {
            Self::ShortTerm
        } else {
            Self::LongTerm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTerm => "SHORT_TERM",
            Self::LongTerm => "LONG_TERM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SHORT_TERM" => Some(Self::ShortTerm),
            "LONG_TERM" => Some(Self::LongTerm),
            _ => None,
        }
    }
}

/// A computed loan offer. Derived from the customer record every time it is needed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanOffer {
    pub monthly_gross: Decimal,
    pub monthly_net: Decimal,
    pub base_amount: Decimal,
    pub amount: Decimal,
    pub tenure_days: u32,
    pub daily_rate: Decimal,
    pub total_interest: Decimal,
    pub total_due: Decimal,
    pub due_date: NaiveDate,
    pub loan_type: LoanType,
    pub repayment_frequency: String,
    pub late_fee_rate: Decimal,
}

impl LoanOffer {
    /// Whole-shilling loan amount. Amounts are always multiples of the rounding step.
    pub fn amount_kes(&self) -> i64 {
        self.amount.trunc().to_i64().unwrap_or(i64::MAX)
    }
}

/// Progress of the terminal OFFER task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    #[default]
    NotReached,
    Presenting,
    AwaitingResponse,
    Accepted,
    Declined,
}

impl OfferStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Accepted | Self::Declined)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Presenting | Self::AwaitingResponse)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceStatus {
    DisbursementInitiated,
    OfferDeclined,
}

impl AcceptanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DisbursementInitiated => "disbursement_initiated",
            Self::OfferDeclined => "offer_declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "disbursement_initiated" => Some(Self::DisbursementInitiated),
            "offer_declined" => Some(Self::OfferDeclined),
            _ => None,
        }
    }
}

/// What the customer decided about an offer, as handed to the acceptance ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceRecord {
    pub session_id: String,
    pub loan_amount: i64,
    pub tenure_days: u32,
    pub repayment_frequency: String,
    pub accepted: bool,
    pub interest_rate: Decimal,
    pub loan_type: LoanType,
    pub status: AcceptanceStatus,
    pub recorded_at: DateTime<Utc>,
}

impl AcceptanceRecord {
    pub fn from_offer(
        session_id: impl Into<String>,
        offer: &LoanOffer,
        accepted: bool,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            loan_amount: offer.amount_kes(),
            tenure_days: offer.tenure_days,
            repayment_frequency: offer.repayment_frequency.clone(),
            accepted,
            interest_rate: offer.daily_rate,
            loan_type: offer.loan_type,
            status: if accepted {
                AcceptanceStatus::DisbursementInitiated
            } else {
                AcceptanceStatus::OfferDeclined
            },
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{AcceptanceRecord, AcceptanceStatus, LoanOffer, LoanType, OfferStatus};

    fn offer() -> LoanOffer {
        LoanOffer {
            monthly_gross: Decimal::from(78_000),
            monthly_net: Decimal::from(46_800),
            base_amount: Decimal::from(10_000),
            amount: Decimal::from(10_000),
            tenure_days: 30,
            daily_rate: Decimal::new(6, 3),
            total_interest: Decimal::from(1_800),
            total_due: Decimal::from(11_800),
            due_date: NaiveDate::from_ymd_opt(2026, 11, 15).expect("date"),
            loan_type: LoanType::ShortTerm,
            repayment_frequency: "One-time".to_string(),
            late_fee_rate: Decimal::new(6, 2),
        }
    }

    #[test]
    fn loan_type_switches_after_sixty_days() {
        assert_eq!(LoanType::for_tenure(30), LoanType::ShortTerm);
        assert_eq!(LoanType::for_tenure(60), LoanType::ShortTerm);
        assert_eq!(LoanType::for_tenure(61), LoanType::LongTerm);
        assert_eq!(LoanType::parse("LONG_TERM"), Some(LoanType::LongTerm));
        assert_eq!(LoanType::parse("long_term"), None);
    }

    #[test]
    fn acceptance_record_carries_offer_terms_and_status() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).single().expect("timestamp");
        let accepted = AcceptanceRecord::from_offer("session-1", &offer(), true, at);
        let declined = AcceptanceRecord::from_offer("session-1", &offer(), false, at);

        assert_eq!(accepted.loan_amount, 10_000);
        assert_eq!(accepted.tenure_days, 30);
        assert_eq!(accepted.interest_rate, Decimal::new(6, 3));
        assert_eq!(accepted.status, AcceptanceStatus::DisbursementInitiated);
        assert_eq!(declined.status, AcceptanceStatus::OfferDeclined);
        assert!(!declined.accepted);
    }

    #[test]
    fn status_tags_round_trip_through_parse() {
        for status in [AcceptanceStatus::DisbursementInitiated, AcceptanceStatus::OfferDeclined] {
            assert_eq!(AcceptanceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AcceptanceStatus::parse("pending"), None);
    }

    #[test]
    fn offer_status_settled_and_open_are_disjoint() {
        assert!(OfferStatus::Accepted.is_settled());
        assert!(OfferStatus::Declined.is_settled());
        assert!(OfferStatus::AwaitingResponse.is_open());
        assert!(!OfferStatus::NotReached.is_open());
        assert!(!OfferStatus::Presenting.is_settled());
    }
}
