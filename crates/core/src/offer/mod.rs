//! Deterministic loan offer arithmetic.
//!
//! Every figure is derived from the customer record and an explicit `today`, so the same inputs
//! always produce the same offer. Money is carried as [`Decimal`] in whole Kenyan shillings.

use chrono::{Days, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerRecord;
use crate::domain::offer::{LoanOffer, LoanType};
use crate::errors::DomainError;

pub const REPAYMENT_FREQUENCY: &str = "One-time";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferPolicy {
    pub trading_days_per_month: u32,
    pub net_margin: Decimal,
    pub affordability_ratio: Decimal,
    pub minimum_amount: Decimal,
    pub maximum_amount: Decimal,
    pub rounding_step: Decimal,
    pub tenure_days: u32,
    pub daily_rate: Decimal,
    /// Used instead of `daily_sales * trading_days_per_month` when no sales were captured.
    pub default_monthly_gross: Decimal,
    pub late_fee_rate: Decimal,
}

impl Default for OfferPolicy {
    fn default() -> Self {
        Self {
            trading_days_per_month: 26,
            net_margin: Decimal::new(6, 1),
            affordability_ratio: Decimal::new(2, 1),
            minimum_amount: Decimal::from(10_000),
            maximum_amount: Decimal::from(50_000),
            rounding_step: Decimal::from(500),
            tenure_days: 30,
            daily_rate: Decimal::new(6, 3),
            default_monthly_gross: Decimal::from(20_000),
            late_fee_rate: Decimal::new(6, 2),
        }
    }
}

impl OfferPolicy {
    pub fn validate(&self) -> Result<(), DomainError> {
        let positive = [
            ("net_margin", self.net_margin),
            ("affordability_ratio", self.affordability_ratio),
            ("daily_rate", self.daily_rate),
            ("rounding_step", self.rounding_step),
            ("minimum_amount", self.minimum_amount),
            ("default_monthly_gross", self.default_monthly_gross),
        ];
        for (name, value) in positive {
            if value <= Decimal::ZERO {
                return Err(DomainError::InvariantViolation(format!(
                    "offer.{name} must be greater than zero"
                )));
            }
        }
        if self.net_margin > Decimal::ONE || self.affordability_ratio > Decimal::ONE {
            return Err(DomainError::InvariantViolation(
                "offer.net_margin and offer.affordability_ratio must not exceed 1".to_owned(),
            ));
        }
        if self.late_fee_rate < Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "offer.late_fee_rate must not be negative".to_owned(),
            ));
        }
        if self.minimum_amount > self.maximum_amount {
            return Err(DomainError::InvariantViolation(
                "offer.minimum_amount must not exceed offer.maximum_amount".to_owned(),
            ));
        }
        if self.tenure_days == 0 || self.trading_days_per_month == 0 {
            return Err(DomainError::InvariantViolation(
                "offer.tenure_days and offer.trading_days_per_month must be greater than zero"
                    .to_owned(),
            ));
        }
        Ok(())
    }

    pub fn monthly_gross(&self, daily_sales: u64) -> Decimal {
        if daily_sales == 0 {
            return self.default_monthly_gross;
        }
        Decimal::from(daily_sales) * Decimal::from(self.trading_days_per_month)
    }

    /// Rounds to the nearest step, ties to the even multiple.
    pub fn round_to_step(&self, amount: Decimal) -> Decimal {
        if self.rounding_step <= Decimal::ZERO {
            return amount;
        }
        (amount / self.rounding_step)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            * self.rounding_step
    }
}

pub fn calculate_offer(
    record: &CustomerRecord,
    policy: &OfferPolicy,
    today: NaiveDate,
) -> LoanOffer {
    let monthly_gross = policy.monthly_gross(record.daily_sales);
    let monthly_net = monthly_gross * policy.net_margin;
    let base_amount = (monthly_net * policy.affordability_ratio).floor().max(policy.minimum_amount);
    let amount = policy.round_to_step(base_amount.min(policy.maximum_amount));

    let tenure = Decimal::from(policy.tenure_days);
    let total_interest = (amount * policy.daily_rate * tenure).normalize();
    let total_due = (amount + total_interest).normalize();
    let due_date = today
        .checked_add_days(Days::new(u64::from(policy.tenure_days)))
        .unwrap_or(NaiveDate::MAX);

    LoanOffer {
        monthly_gross: monthly_gross.normalize(),
        monthly_net: monthly_net.normalize(),
        base_amount: base_amount.normalize(),
        amount: amount.normalize(),
        tenure_days: policy.tenure_days,
        daily_rate: policy.daily_rate,
        total_interest,
        total_due,
        due_date,
        loan_type: LoanType::for_tenure(policy.tenure_days),
        repayment_frequency: REPAYMENT_FREQUENCY.to_owned(),
        late_fee_rate: policy.late_fee_rate,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SalesAnalysis {
    InsufficientData,
    Estimated { average_per_customer: Decimal, monthly_gross: Decimal },
}

pub fn sales_analysis(record: &CustomerRecord, policy: &OfferPolicy) -> SalesAnalysis {
    if record.daily_sales == 0 || record.daily_customers == 0 {
        return SalesAnalysis::InsufficientData;
    }
    let average = Decimal::from(record.daily_sales) / Decimal::from(record.daily_customers);
    SalesAnalysis::Estimated {
        average_per_customer: average.round_dp(0),
        monthly_gross: policy.monthly_gross(record.daily_sales),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnderwritingSummary {
    pub offer_sequence: u32,
    pub estimated_monthly_income: Decimal,
    pub income_justification: String,
    pub loan_amount_offered: Decimal,
    pub tenure_days: u32,
    pub interest_rate: Decimal,
    pub decision_summary: String,
    pub improvement_reason: String,
    pub photo_income_note: Option<String>,
}

/// Narrative that accompanies a first offer.
pub fn underwriting_summary(record: &CustomerRecord, offer: &LoanOffer) -> UnderwritingSummary {
    UnderwritingSummary {
        offer_sequence: 1,
        estimated_monthly_income: offer.monthly_net,
        income_justification: format!(
            "Based on daily sales of {} KES with {} customers",
            record.daily_sales, record.daily_customers
        ),
        loan_amount_offered: offer.amount,
        tenure_days: offer.tenure_days,
        interest_rate: offer.daily_rate,
        decision_summary: format!(
            "Approved based on estimated monthly income of {} KES and a clear business growth \
             plan. The amount is a conservative share of monthly net income to keep repayment \
             affordable.",
            format_amount(offer.monthly_net)
        ),
        improvement_reason: "First loan offer based on initial assessment".to_owned(),
        photo_income_note: record.photo_income_note.clone(),
    }
}

/// Whole-unit amount with thousands separators, e.g. `11,800`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp(0).normalize();
    let digits = rounded.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.insert(0, '-');
    }
    grouped
}

/// Daily rate as a percentage string, e.g. `0.6%`.
pub fn format_rate(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{
        calculate_offer, format_amount, format_rate, sales_analysis, underwriting_summary,
        OfferPolicy, SalesAnalysis,
    };
    use crate::domain::customer::CustomerRecord;
    use crate::domain::offer::LoanType;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
    }

    fn record_with_sales(daily_sales: u64) -> CustomerRecord {
        CustomerRecord { daily_sales, daily_customers: 25, ..CustomerRecord::default() }
    }

    #[test]
    fn floor_amount_applies_to_modest_sales() {
        let offer = calculate_offer(&record_with_sales(3_000), &OfferPolicy::default(), today());

        assert_eq!(offer.monthly_gross, Decimal::from(78_000));
        assert_eq!(offer.monthly_net, Decimal::from(46_800));
        assert_eq!(offer.base_amount, Decimal::from(10_000));
        assert_eq!(offer.amount, Decimal::from(10_000));
        assert_eq!(offer.total_interest, Decimal::from(1_800));
        assert_eq!(offer.total_due, Decimal::from(11_800));
        assert_eq!(offer.due_date, NaiveDate::from_ymd_opt(2026, 11, 15).expect("valid date"));
        assert_eq!(offer.loan_type, LoanType::ShortTerm);
        assert_eq!(offer.repayment_frequency, "One-time");
    }

    #[test]
    fn cap_applies_to_large_sales() {
        let offer = calculate_offer(&record_with_sales(20_000), &OfferPolicy::default(), today());
        assert_eq!(offer.base_amount, Decimal::from(62_400));
        assert_eq!(offer.amount, Decimal::from(50_000));
        assert_eq!(offer.total_due, Decimal::from(59_000));
    }

    #[test]
    fn rounding_is_half_to_even_on_the_step() {
        let policy = OfferPolicy::default();
        let tie = calculate_offer(&record_with_sales(9_375), &policy, today());
        assert_eq!(tie.base_amount, Decimal::from(29_250));
        assert_eq!(tie.amount, Decimal::from(29_000));

        let below = calculate_offer(&record_with_sales(3_400), &policy, today());
        assert_eq!(below.base_amount, Decimal::from(10_608));
        assert_eq!(below.amount, Decimal::from(10_500));

        assert_eq!(policy.round_to_step(Decimal::from(29_750)), Decimal::from(30_000));
    }

    #[test]
    fn missing_sales_use_default_gross() {
        let offer = calculate_offer(&CustomerRecord::default(), &OfferPolicy::default(), today());
        assert_eq!(offer.monthly_gross, Decimal::from(20_000));
        assert_eq!(offer.amount, Decimal::from(10_000));
    }

    #[test]
    fn offer_is_deterministic_for_the_same_inputs() {
        let record = record_with_sales(7_250);
        let policy = OfferPolicy::default();
        assert_eq!(
            calculate_offer(&record, &policy, today()),
            calculate_offer(&record, &policy, today())
        );
    }

    #[test]
    fn long_tenure_policies_produce_long_term_loans() {
        let policy = OfferPolicy {
            tenure_days: 90,
            daily_rate: Decimal::new(2, 3),
            ..OfferPolicy::default()
        };
        let offer = calculate_offer(&record_with_sales(3_000), &policy, today());
        assert_eq!(offer.loan_type, LoanType::LongTerm);
        assert_eq!(offer.total_interest, Decimal::from(1_800));
    }

    #[test]
    fn sales_analysis_guards_against_zero_division() {
        let policy = OfferPolicy::default();
        let no_customers = CustomerRecord { daily_sales: 3_000, ..CustomerRecord::default() };
        assert_eq!(sales_analysis(&no_customers, &policy), SalesAnalysis::InsufficientData);
        assert_eq!(
            sales_analysis(&CustomerRecord::default(), &policy),
            SalesAnalysis::InsufficientData
        );

        assert_eq!(
            sales_analysis(&record_with_sales(3_000), &policy),
            SalesAnalysis::Estimated {
                average_per_customer: Decimal::from(120),
                monthly_gross: Decimal::from(78_000),
            }
        );
    }

    #[test]
    fn underwriting_summary_passes_photo_note_through() {
        let mut record = record_with_sales(3_000);
        record.photo_income_note = Some("Stock: medium density".to_owned());
        let offer = calculate_offer(&record, &OfferPolicy::default(), today());
        let summary = underwriting_summary(&record, &offer);

        assert_eq!(summary.estimated_monthly_income, Decimal::from(46_800));
        assert_eq!(
            summary.income_justification,
            "Based on daily sales of 3000 KES with 25 customers"
        );
        assert!(summary.decision_summary.contains("46,800 KES"));
        assert_eq!(summary.photo_income_note.as_deref(), Some("Stock: medium density"));
    }

    #[test]
    fn policy_validation_rejects_inverted_bounds() {
        assert!(OfferPolicy::default().validate().is_ok());
        let inverted =
            OfferPolicy { minimum_amount: Decimal::from(60_000), ..OfferPolicy::default() };
        assert!(inverted.validate().is_err());
        let zero_step = OfferPolicy { rounding_step: Decimal::ZERO, ..OfferPolicy::default() };
        assert!(zero_step.validate().is_err());
        let no_tenure = OfferPolicy { tenure_days: 0, ..OfferPolicy::default() };
        assert!(no_tenure.validate().is_err());
    }

    #[test]
    fn amounts_and_rates_format_for_display() {
        assert_eq!(format_amount(Decimal::from(11_800)), "11,800");
        assert_eq!(format_amount(Decimal::from(500)), "500");
        assert_eq!(format_amount(Decimal::new(1_234_567_4, 1)), "1,234,567");
        assert_eq!(format_rate(Decimal::new(6, 3)), "0.6%");
    }
}
