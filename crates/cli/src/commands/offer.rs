use chrono::Utc;
use lucy_core::domain::customer::CustomerRecord;
use lucy_core::offer::{calculate_offer, format_amount, sales_analysis, underwriting_summary};

use crate::commands::{load_config, CommandResult};

/// Prices an offer for a sales profile without running a conversation.
pub fn run(daily_sales: u64, daily_customers: u64) -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("offer", failure),
    };

    let record = CustomerRecord { daily_sales, daily_customers, ..CustomerRecord::default() };
    let offer = calculate_offer(&record, &config.offer, Utc::now().date_naive());
    let details = serde_json::json!({
        "offer": offer,
        "sales_analysis": sales_analysis(&record, &config.offer),
        "underwriting": underwriting_summary(&record, &offer),
    });

    CommandResult::success_with_details(
        "offer",
        format!(
            "{} KES for {} days, {} KES due on {}",
            format_amount(offer.amount),
            offer.tenure_days,
            format_amount(offer.total_due),
            offer.due_date
        ),
        details,
    )
}
