use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use lucy_core::audit::InMemoryAuditSink;
use lucy_core::flows::{ConversationTracker, TurnOutcome};
use lucy_core::ledger::{AcceptanceLedger, LedgerService};
use lucy_core::{
    AcceptanceRecord, AcceptanceStatus, AuditContext, ConversationState, OfferStatus,
    ResponsibilityDomain, Task,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
}

type Turn = (ResponsibilityDomain, TurnOutcome, ConversationState);

fn run_script(tracker: &ConversationTracker, script: &[(&str, &[&str])]) -> Vec<Turn> {
    let mut state: Option<ConversationState> = None;
    let mut turns = Vec::new();
    for (message, photos) in script {
        let photos = photos.iter().map(|photo| (*photo).to_string()).collect::<Vec<_>>();
        let result = tracker.process_turn_on(message, &photos, state.take(), today());
        state = Some(result.state.clone());
        turns.push((result.route, result.outcome, result.state));
    }
    turns
}

const ONBOARDING: &[(&str, &[&str])] = &[
    ("Hi", &[]),
    ("Kawangware Market, Lane 3", &["inside.jpg", "outside.jpg"]),
    ("I run a grocery shop", &[]),
    ("I love serving my community", &[]),
    ("25 customers, 3000 sales", &[]),
    ("running out of popular items", &[]),
    ("buy more stock", &[]),
    ("yes I'm ready", &[]),
];

#[test]
fn onboarding_script_reaches_the_offer() {
    let tracker = ConversationTracker::default();
    let turns = run_script(&tracker, ONBOARDING);

    let routes = turns.iter().map(|(route, _, _)| *route).collect::<Vec<_>>();
    assert_eq!(
        routes,
        vec![
            ResponsibilityDomain::Greeting,
            ResponsibilityDomain::Photo,
            ResponsibilityDomain::Coaching,
            ResponsibilityDomain::Coaching,
            ResponsibilityDomain::Underwriting,
            ResponsibilityDomain::Coaching,
            ResponsibilityDomain::Underwriting,
            ResponsibilityDomain::Underwriting,
        ]
    );

    let (_, outcome, state) = turns.last().expect("turns");
    assert_eq!(state.current_task, Task::Offer);
    assert_eq!(state.offer_status, OfferStatus::Presenting);
    assert_eq!(state.customer.location, "Kawangware Market, Lane 3");
    assert_eq!(state.customer.photos.len(), 2);
    assert_eq!(state.customer.business_type, "shop");
    assert_eq!(state.customer.daily_customers, 25);
    assert_eq!(state.customer.daily_sales, 3_000);
    assert_eq!(state.customer.weekly_sales, Some(21_000));
    assert_eq!(state.customer.challenge, "running out of popular items");
    assert!(state.customer.loan_uses.contains(&"Purchase inventory/stock".to_string()));
    assert_eq!(
        state.customer.completed_tasks.tags(),
        vec!["B1", "E4a", "E4b", "B4", "E6", "L3", "L5"]
    );
    assert_eq!(state.history.len(), ONBOARDING.len());

    let offer = outcome.offer().expect("offer shown on readiness");
    assert_eq!(offer.amount, Decimal::from(10_000));
    assert_eq!(offer.total_due, Decimal::from(11_800));
}

#[test]
fn restored_state_continues_identically() {
    let tracker = ConversationTracker::default();
    let turns = run_script(&tracker, &ONBOARDING[..5]);
    let (_, _, state) = turns.last().expect("turns");

    let persisted = serde_json::to_string(state).expect("serialize");
    let restored: ConversationState = serde_json::from_str(&persisted).expect("restore");
    assert_eq!(&restored, state);

    let message = "running out of popular items";
    let direct = tracker.process_turn_on(message, &[], Some(state.clone()), today());
    let resumed = tracker.process_turn_on(message, &[], Some(restored), today());
    assert_eq!(direct.outcome, resumed.outcome);
    assert_eq!(direct.state.customer, resumed.state.customer);
}

#[tokio::test]
async fn accepted_offer_is_recorded_on_the_ledger() {
    let tracker = ConversationTracker::default();
    let sink = InMemoryAuditSink::default();
    let turns = run_script(&tracker, ONBOARDING);
    let (_, _, mut state) = turns.last().cloned().expect("turns");
    state.mark_offer_presented();

    let audit = AuditContext::new(None, "turn-accept", "integration-test");
    let result = tracker.process_turn_with_audit("Yes, I accept", &[], Some(state), &sink, &audit);
    let TurnOutcome::OfferAccepted { offer } = &result.outcome else {
        panic!("expected acceptance, got {:?}", result.outcome);
    };
    assert!(sink.event_types().contains(&"offer.accepted".to_string()));

    let at = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).single().expect("timestamp");
    let record = AcceptanceRecord::from_offer(result.state.session_id.0.clone(), offer, true, at);
    let ledger = LedgerService::new("integration-key");
    let receipt = ledger.record_acceptance(&record).await.expect("recorded");

    assert_eq!(receipt.status, AcceptanceStatus::DisbursementInitiated);
    assert!(ledger.verify_entry(&result.state.session_id.0).valid);
}
