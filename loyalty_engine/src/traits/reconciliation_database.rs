use async_trait::async_trait;
use thiserror::Error;

use crate::db_types::{Order, OrderNumber, OrderUpdate, ReconcileOutcome};

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Order {number} is bound to a different owner")]
    OwnerConflict { number: OrderNumber },
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Storage is unavailable: {0}")]
    StorageUnavailable(String),
}

/// The narrow storage interface consumed by the reconciliation engine.
///
/// Implementations are shared between the engine's workers and the web tier, so every method must be safe to call
/// concurrently. The ownership invariant is enforced here rather than with row locks: an order number, once created,
/// is permanently bound to one login, and [`Self::reconcile_order`] refuses to write under any other login.
#[async_trait]
pub trait ReconciliationDatabase: Clone + Send + Sync {
    /// All orders still awaiting a terminal verdict, i.e. with status `NEW` or `PROCESSING`, oldest first.
    ///
    /// Zero pending orders is an ordinary empty result, never an error.
    async fn fetch_pending_orders(&self) -> Result<Vec<Order>, ReconciliationError>;

    /// The login that first registered the order number.
    async fn fetch_order_owner(&self, number: &OrderNumber) -> Result<String, ReconciliationError>;

    /// Merge an externally reported verdict into the stored order record.
    ///
    /// * An unseen order number is created as `NEW` under `login` ([`ReconcileOutcome::Created`]).
    /// * If `login` matches the bound owner and a status is supplied, the stored status and accrual are replaced
    ///   ([`ReconcileOutcome::Updated`]). Applying the same update twice yields the same stored state, so callers
    ///   may safely retry.
    /// * If `login` matches but no status is supplied, nothing is written ([`ReconcileOutcome::Unchanged`]).
    /// * If `login` does not match the bound owner, the row is left untouched and
    ///   [`ReconciliationError::OwnerConflict`] is returned.
    async fn reconcile_order(&self, login: &str, update: OrderUpdate) -> Result<ReconcileOutcome, ReconciliationError>;
}
