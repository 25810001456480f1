//! Behavioural tests for the reconciler pool, driven against the in-memory storage adapter and a scripted
//! accrual authority.
use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType, OrderUpdate, Points, ReconcileOutcome},
    reconciler::{ReconcilerConfig, ReconcilerPool},
    test_utils::{init_test_logging, MemoryDatabase, ScriptedAccrual},
    traits::{
        AccrualSource, AccrualSourceError, AccrualVerdict, ReconciliationDatabase,
        ReconciliationError, VerdictStatus,
    },
};

fn num(s: &str) -> OrderNumber {
    OrderNumber::new(s).expect("test order number must be Luhn-valid")
}

/// Builds a Luhn-valid order number from an arbitrary seed by brute-forcing the check digit.
fn order_number(seed: u64) -> OrderNumber {
    let base = format!("{seed:010}");
    (0..10)
        .map(|check| format!("{base}{check}"))
        .find_map(|candidate| OrderNumber::new(candidate).ok())
        .expect("one of the ten check digits must satisfy the Luhn checksum")
}

fn verdict(status: VerdictStatus) -> Result<AccrualVerdict, AccrualSourceError> {
    Ok(AccrualVerdict { status, accrual: None })
}

fn scored(status: VerdictStatus, points: f64) -> Result<AccrualVerdict, AccrualSourceError> {
    Ok(AccrualVerdict { status, accrual: Some(Points::from(points)) })
}

fn fast_config(worker_count: usize) -> ReconcilerConfig {
    ReconcilerConfig { worker_count, poll_interval: Duration::from_millis(25) }
}

/// Polls `condition` every 10ms until it holds or `timeout` elapses.
async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn order_reaches_processed_through_successive_scans() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let accrual = ScriptedAccrual::new();
    let number = num("12345678903");
    db.upload_order(&number, "alice");
    accrual.script(&number, vec![verdict(VerdictStatus::Processing), scored(VerdictStatus::Processed, 500.0)]);

    let pool = ReconcilerPool::start(fast_config(2), db.clone(), accrual.clone());
    let done = wait_for(
        || {
            let db = db.clone();
            let number = number.clone();
            async move { db.order(&number).map(|o| o.status == OrderStatusType::Processed).unwrap_or(false) }
        },
        Duration::from_secs(3),
    )
    .await;
    assert!(done, "order never reached PROCESSED");

    let order = db.order(&number).unwrap();
    assert_eq!(order.status, OrderStatusType::Processed);
    assert_eq!(order.accrual, Some(Points::from(500.0)));

    // Terminal stability: once PROCESSED, the order drops out of discovery and the authority is not asked again.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let calls = accrual.calls_for(&number);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(accrual.calls_for(&number), calls);
    assert_eq!(db.order(&number).unwrap().status, OrderStatusType::Processed);

    pool.shutdown().await;
}

#[tokio::test]
async fn registered_verdict_keeps_order_pending_as_new() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let accrual = ScriptedAccrual::new();
    let number = num("79927398713");
    db.upload_order(&number, "bob");
    accrual.script(&number, vec![verdict(VerdictStatus::Registered)]);

    let pool = ReconcilerPool::start(fast_config(1), db.clone(), accrual.clone());
    let rediscovered = wait_for(
        || {
            let accrual = accrual.clone();
            let number = number.clone();
            async move { accrual.calls_for(&number) >= 3 }
        },
        Duration::from_secs(3),
    )
    .await;
    assert!(rediscovered, "a still-pending order must be rediscovered on every scan");
    // No regression, no spurious terminal transition: REGISTERED persists as NEW.
    assert_eq!(db.order(&number).unwrap().status, OrderStatusType::New);
    pool.shutdown().await;
}

#[tokio::test]
async fn processing_order_is_never_downgraded_by_a_stale_verdict() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let accrual = ScriptedAccrual::new();
    let number = num("4561261212345467");
    db.upload_order(&number, "carol");
    db.set_status(&number, OrderStatusType::Processing);
    accrual.script(&number, vec![verdict(VerdictStatus::Registered)]);

    let pool = ReconcilerPool::start(fast_config(1), db.clone(), accrual.clone());
    let queried = wait_for(
        || {
            let accrual = accrual.clone();
            let number = number.clone();
            async move { accrual.calls_for(&number) >= 2 }
        },
        Duration::from_secs(3),
    )
    .await;
    assert!(queried);
    assert_eq!(db.order(&number).unwrap().status, OrderStatusType::Processing);
    pool.shutdown().await;
}

#[tokio::test]
async fn failed_lookup_is_retried_on_the_next_scan() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let accrual = ScriptedAccrual::new();
    let number = order_number(42);
    db.upload_order(&number, "dave");
    accrual.script(
        &number,
        vec![
            Err(AccrualSourceError::Unavailable("connection refused".into())),
            Err(AccrualSourceError::MalformedResponse("unexpected end of input".into())),
            scored(VerdictStatus::Processed, 10.0),
        ],
    );

    let pool = ReconcilerPool::start(fast_config(1), db.clone(), accrual.clone());
    let done = wait_for(
        || {
            let db = db.clone();
            let number = number.clone();
            async move { db.order(&number).map(|o| o.status == OrderStatusType::Processed).unwrap_or(false) }
        },
        Duration::from_secs(3),
    )
    .await;
    assert!(done, "the order must converge once the authority recovers");
    assert!(accrual.calls_for(&number) >= 3);
    pool.shutdown().await;
}

#[tokio::test]
async fn failed_scan_skips_the_tick_without_killing_the_loop() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let accrual = ScriptedAccrual::new();
    let number = order_number(7);
    db.upload_order(&number, "erin");
    db.fail_next_scans(2);
    accrual.script(&number, vec![verdict(VerdictStatus::Invalid)]);

    let pool = ReconcilerPool::start(fast_config(1), db.clone(), accrual.clone());
    let done = wait_for(
        || {
            let db = db.clone();
            let number = number.clone();
            async move { db.order(&number).map(|o| o.status == OrderStatusType::Invalid).unwrap_or(false) }
        },
        Duration::from_secs(3),
    )
    .await;
    assert!(done, "the scheduler must survive failed scans and reconcile on a later tick");
    assert!(db.scan_count() >= 3);
    pool.shutdown().await;
}

#[tokio::test]
async fn zero_poll_interval_is_clamped_and_still_scans() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let accrual = ScriptedAccrual::new();
    let number = order_number(31);
    db.upload_order(&number, "heidi");
    accrual.script(&number, vec![scored(VerdictStatus::Processed, 42.0)]);

    // A degenerate interval must not kill the scheduler; it is clamped to the minimum period.
    let config = ReconcilerConfig { worker_count: 1, poll_interval: Duration::from_millis(0) };
    let pool = ReconcilerPool::start(config, db.clone(), accrual.clone());
    let done = wait_for(
        || {
            let db = db.clone();
            let number = number.clone();
            async move { db.order(&number).map(|o| o.status == OrderStatusType::Processed).unwrap_or(false) }
        },
        Duration::from_secs(3),
    )
    .await;
    assert!(done, "the scheduler must keep scanning with a zero configured interval");
    assert!(db.scan_count() >= 1);
    pool.shutdown().await;
}

#[tokio::test]
async fn rate_limited_worker_backs_off_before_taking_more_work() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let accrual = ScriptedAccrual::new();
    let number = order_number(77);
    db.upload_order(&number, "ivan");
    let backoff = Duration::from_millis(300);
    accrual.script(
        &number,
        vec![
            Err(AccrualSourceError::RateLimited { retry_after: Some(backoff) }),
            scored(VerdictStatus::Processed, 25.0),
        ],
    );

    let started = tokio::time::Instant::now();
    let pool = ReconcilerPool::start(fast_config(1), db.clone(), accrual.clone());
    let done = wait_for(
        || {
            let db = db.clone();
            let number = number.clone();
            async move { db.order(&number).map(|o| o.status == OrderStatusType::Processed).unwrap_or(false) }
        },
        Duration::from_secs(3),
    )
    .await;
    assert!(done, "the order must converge once the rate limit lifts");
    // The sole worker slept for the advertised window before asking again, so the second lookup cannot have
    // landed inside it.
    assert!(started.elapsed() >= backoff, "the worker must honour the Retry-After window");
    assert!(accrual.calls_for(&number) >= 2);
    pool.shutdown().await;
}

/// Counts concurrent in-flight lookups so the test can assert the backpressure bound.
#[derive(Clone, Default)]
struct GatedAccrual {
    in_flight: Arc<AtomicUsize>,
    max_seen: Arc<AtomicUsize>,
}

#[async_trait]
impl AccrualSource for GatedAccrual {
    async fn order_status(&self, _number: &OrderNumber) -> Result<AccrualVerdict, AccrualSourceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(AccrualVerdict { status: VerdictStatus::Processed, accrual: None })
    }
}

#[tokio::test]
async fn at_most_worker_count_lookups_are_in_flight() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let accrual = GatedAccrual::default();
    let numbers: Vec<OrderNumber> = (100..106).map(order_number).collect();
    for number in &numbers {
        db.upload_order(number, "frank");
    }

    let pool = ReconcilerPool::start(fast_config(2), db.clone(), accrual.clone());
    let done = wait_for(
        || {
            let db = db.clone();
            let numbers = numbers.clone();
            async move { numbers.iter().all(|n| db.order(n).map(|o| o.status.is_terminal()).unwrap_or(false)) }
        },
        Duration::from_secs(5),
    )
    .await;
    assert!(done, "all six orders must eventually reach a terminal state");
    assert!(
        accrual.max_seen.load(Ordering::SeqCst) <= 2,
        "with 2 workers, no more than 2 lookups may ever be in flight"
    );
    pool.shutdown().await;
}

/// An accrual source slow enough that shutdown always catches a lookup mid-flight.
#[derive(Clone, Default)]
struct SlowAccrual;

#[async_trait]
impl AccrualSource for SlowAccrual {
    async fn order_status(&self, _number: &OrderNumber) -> Result<AccrualVerdict, AccrualSourceError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(AccrualVerdict { status: VerdictStatus::Processed, accrual: Some(Points::from(1.0)) })
    }
}

#[tokio::test]
async fn shutdown_drains_in_flight_work() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let number = order_number(999);
    db.upload_order(&number, "grace");

    let pool = ReconcilerPool::start(fast_config(1), db.clone(), SlowAccrual);
    // Give the first scan time to hand the order to the worker, then stop while the lookup is still running.
    tokio::time::sleep(Duration::from_millis(75)).await;
    pool.shutdown().await;

    let order = db.order(&number).unwrap();
    assert_eq!(order.status, OrderStatusType::Processed, "the in-flight order must be reconciled before shutdown returns");
}

#[tokio::test]
async fn reconciliation_is_idempotent_and_owner_bound() {
    init_test_logging();
    let db = MemoryDatabase::new();
    let number = num("12345678903");
    db.upload_order(&number, "alice");

    let update = OrderUpdate::new(number.clone(), OrderStatusType::Processed).with_accrual(Points::from(500.0));
    assert_eq!(db.reconcile_order("alice", update.clone()).await.unwrap(), ReconcileOutcome::Updated);
    let first = db.order(&number).unwrap();

    // Applying the same verdict twice yields the same stored state as applying it once.
    assert_eq!(db.reconcile_order("alice", update).await.unwrap(), ReconcileOutcome::Updated);
    let second = db.order(&number).unwrap();
    assert_eq!(first.status, second.status);
    assert_eq!(first.accrual, second.accrual);

    // A different login can neither change the status nor steal the order.
    let theft = OrderUpdate::new(number.clone(), OrderStatusType::Invalid);
    let err = db.reconcile_order("mallory", theft).await.unwrap_err();
    assert!(matches!(err, ReconciliationError::OwnerConflict { .. }));
    assert_eq!(db.owner_of(&number).as_deref(), Some("alice"));
    assert_eq!(db.order(&number).unwrap().status, OrderStatusType::Processed);

    // No status supplied means nothing to change.
    let noop = OrderUpdate { number: number.clone(), status: None, accrual: None };
    assert_eq!(db.reconcile_order("alice", noop).await.unwrap(), ReconcileOutcome::Unchanged);

    // An unseen number is created as NEW, bound to the caller.
    let fresh = order_number(12345);
    let created = OrderUpdate { number: fresh.clone(), status: None, accrual: None };
    assert_eq!(db.reconcile_order("bob", created).await.unwrap(), ReconcileOutcome::Created);
    assert_eq!(db.owner_of(&fresh).as_deref(), Some("bob"));
    assert_eq!(db.order(&fresh).unwrap().status, OrderStatusType::New);
}
