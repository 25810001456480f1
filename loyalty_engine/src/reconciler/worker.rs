use std::time::Duration;

use log::*;

use crate::{
    db_types::{Order, OrderStatusType, OrderUpdate},
    traits::{AccrualSource, AccrualSourceError, ReconciliationDatabase, ReconciliationError},
};

const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(1);

/// Reconcile a single order against the accrual authority.
///
/// Every failure in here is logged and dropped rather than escalated: the order stays non-terminal in storage and
/// will be rediscovered by the next scan, at most one poll interval later. The one exception is an ownership
/// conflict, which indicates a data integrity problem upstream and is logged as an anomaly since retrying cannot
/// fix it.
pub(super) async fn reconcile_one<B, A>(worker_id: usize, order: Order, db: &B, accrual: &A)
where
    B: ReconciliationDatabase,
    A: AccrualSource,
{
    let number = order.number.clone();
    let verdict = match accrual.order_status(&number).await {
        Ok(verdict) => verdict,
        Err(AccrualSourceError::RateLimited { retry_after }) => {
            let pause = retry_after.unwrap_or(DEFAULT_RATE_LIMIT_BACKOFF);
            warn!("🔧️ Worker {worker_id}: accrual authority is rate limiting; backing off for {pause:?}");
            tokio::time::sleep(pause).await;
            return;
        },
        Err(e) => {
            warn!("🔧️ Worker {worker_id}: accrual lookup for order {number} failed, retrying on the next scan. {e}");
            return;
        },
    };

    let new_status = verdict.status.as_order_status();
    // A REGISTERED verdict persists as NEW. Applying it to an order already observed at PROCESSING would move the
    // order backwards, so the verdict is ignored until the authority catches up.
    if order.status == OrderStatusType::Processing && new_status == OrderStatusType::New {
        debug!("🔧️ Worker {worker_id}: ignoring stale {:?} verdict for order {number} already in PROCESSING", verdict.status);
        return;
    }

    let owner = match db.fetch_order_owner(&number).await {
        Ok(owner) => owner,
        Err(e) => {
            warn!("🔧️ Worker {worker_id}: could not resolve the owner of order {number}. {e}");
            return;
        },
    };

    let mut update = OrderUpdate::new(number.clone(), new_status);
    if let Some(accrued) = verdict.accrual {
        update = update.with_accrual(accrued);
    }
    match db.reconcile_order(&owner, update).await {
        Ok(outcome) => {
            debug!("🔧️ Worker {worker_id}: order {number} reconciled to {new_status} ({outcome:?})");
        },
        Err(ReconciliationError::OwnerConflict { .. }) => {
            error!("🔧️ Worker {worker_id}: order {number} is bound to an owner other than {owner}; refusing to overwrite");
        },
        Err(e) => {
            warn!("🔧️ Worker {worker_id}: could not store the verdict for order {number}, retrying on the next scan. {e}");
        },
    }
}
