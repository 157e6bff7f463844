use lucy_core::flows::{ConversationTracker, ResponsibilityDomain};
use lucy_core::{AcceptanceLedger, AcceptanceRecord, OfferStatus, Task};
use lucy_db::migrations::run_pending;
use lucy_db::{
    connect_with_settings, AcceptanceRepository, SessionRepository, SqlAcceptanceRepository,
    SqlSessionRepository,
};

type StoreTestResult<T = ()> = Result<T, String>;

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

const SCRIPT: &[&str] = &[
    "Hi",
    "Kawangware Market, Lane 3",
    "I run a grocery shop",
    "I love serving my community",
    "25 customers, 3000 sales",
    "running out of popular items",
    "buy more stock",
    "yes I'm ready",
];

#[tokio::test]
async fn sessions_survive_a_reload_between_every_turn() -> StoreTestResult {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
    run_pending(&pool).await.map_err(|e| e.to_string())?;
    let sessions = SqlSessionRepository::new(pool.clone());
    let tracker = ConversationTracker::default();
    let photos = vec!["inside.jpg".to_string(), "outside.jpg".to_string()];

    let mut session_id = None;
    let mut last_route = ResponsibilityDomain::Greeting;
    for (index, message) in SCRIPT.iter().enumerate() {
        let previous = match &session_id {
            Some(id) => sessions.load(id).await.map_err(|e| e.to_string())?,
            None => None,
        };
        let turn_photos = if index == 1 { photos.as_slice() } else { &[] };
        let result = tracker.process_turn(message, turn_photos, previous);

        sessions.save(&result.state).await.map_err(|e| e.to_string())?;
        session_id = Some(result.state.session_id.clone());
        last_route = result.route;
    }

    let id = session_id.ok_or("no session was created")?;
    let state = sessions.load(&id).await.map_err(|e| e.to_string())?.ok_or("state missing")?;

    require_eq!(state.current_task, Task::Offer);
    require_eq!(state.offer_status, OfferStatus::Presenting);
    require_eq!(state.customer.daily_sales, 3000);
    require_eq!(state.customer.photos, photos);
    require_eq!(last_route, ResponsibilityDomain::Underwriting);

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn accepted_offer_is_stored_once() -> StoreTestResult {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
    run_pending(&pool).await.map_err(|e| e.to_string())?;
    let ledger = SqlAcceptanceRepository::new(pool.clone());

    let tracker = ConversationTracker::default();
    let mut state = None;
    for (index, message) in SCRIPT.iter().enumerate() {
        let photos = if index == 1 { vec!["stall.jpg".to_string()] } else { Vec::new() };
        state = Some(tracker.process_turn(message, &photos, state).state);
    }
    let mut state = state.ok_or("no state")?;
    state.mark_offer_presented();

    let result = tracker.process_turn("yes, I accept", &[], Some(state));
    let offer = result.outcome.offer().cloned().ok_or("accepted turn carries the offer")?;
    require_eq!(result.state.offer_status, OfferStatus::Accepted);

    let record = AcceptanceRecord::from_offer(
        result.state.session_id.0.clone(),
        &offer,
        true,
        chrono::Utc::now(),
    );
    ledger.record_acceptance(&record).await.map_err(|e| e.to_string())?;

    let stored = ledger.list_for_session(&record.session_id).await.map_err(|e| e.to_string())?;
    require_eq!(stored.len(), 1);
    require_eq!(stored[0].loan_amount, 10_000);

    if ledger.record_acceptance(&record).await.is_ok() {
        return Err("second settlement should be rejected".to_string());
    }

    pool.close().await;
    Ok(())
}
