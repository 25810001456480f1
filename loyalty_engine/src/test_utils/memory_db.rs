use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    db_types::{Order, OrderNumber, OrderStatusType, OrderUpdate, ReconcileOutcome},
    traits::{ReconciliationDatabase, ReconciliationError},
};

/// An in-memory implementation of the storage adapter.
///
/// Enforces the same ownership invariant as the SQLite backend, and can inject scan failures to exercise the
/// engine's skip-a-tick behaviour.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    orders: HashMap<OrderNumber, OwnedOrder>,
    fail_next_scans: usize,
    scan_count: usize,
}

#[derive(Clone)]
struct OwnedOrder {
    owner: String,
    order: Order,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a `NEW` order owned by `login`, as the web tier would on upload.
    pub fn upload_order(&self, number: &OrderNumber, login: &str) {
        let order = Order {
            number: number.clone(),
            status: OrderStatusType::New,
            accrual: None,
            uploaded_at: Utc::now(),
        };
        let owned = OwnedOrder { owner: login.to_string(), order };
        self.inner.lock().unwrap().orders.insert(number.clone(), owned);
    }

    pub fn set_status(&self, number: &OrderNumber, status: OrderStatusType) {
        if let Some(entry) = self.inner.lock().unwrap().orders.get_mut(number) {
            entry.order.status = status;
        }
    }

    pub fn order(&self, number: &OrderNumber) -> Option<Order> {
        self.inner.lock().unwrap().orders.get(number).map(|o| o.order.clone())
    }

    pub fn owner_of(&self, number: &OrderNumber) -> Option<String> {
        self.inner.lock().unwrap().orders.get(number).map(|o| o.owner.clone())
    }

    /// Makes the next `n` pending-order scans fail.
    pub fn fail_next_scans(&self, n: usize) {
        self.inner.lock().unwrap().fail_next_scans = n;
    }

    /// How many times the scheduler has scanned for pending orders.
    pub fn scan_count(&self) -> usize {
        self.inner.lock().unwrap().scan_count
    }
}

#[async_trait]
impl ReconciliationDatabase for MemoryDatabase {
    async fn fetch_pending_orders(&self) -> Result<Vec<Order>, ReconciliationError> {
        let mut inner = self.inner.lock().unwrap();
        inner.scan_count += 1;
        if inner.fail_next_scans > 0 {
            inner.fail_next_scans -= 1;
            return Err(ReconciliationError::StorageUnavailable("scan failure injected by test".into()));
        }
        let mut pending: Vec<Order> =
            inner.orders.values().filter(|o| !o.order.status.is_terminal()).map(|o| o.order.clone()).collect();
        pending.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(pending)
    }

    async fn fetch_order_owner(&self, number: &OrderNumber) -> Result<String, ReconciliationError> {
        self.inner
            .lock()
            .unwrap()
            .orders
            .get(number)
            .map(|o| o.owner.clone())
            .ok_or_else(|| ReconciliationError::OrderNotFound(number.clone()))
    }

    async fn reconcile_order(&self, login: &str, update: OrderUpdate) -> Result<ReconcileOutcome, ReconciliationError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.orders.entry(update.number.clone()) {
            Entry::Vacant(vacant) => {
                let order = Order {
                    number: update.number.clone(),
                    status: OrderStatusType::New,
                    accrual: None,
                    uploaded_at: Utc::now(),
                };
                vacant.insert(OwnedOrder { owner: login.to_string(), order });
                Ok(ReconcileOutcome::Created)
            },
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.owner != login {
                    return Err(ReconciliationError::OwnerConflict { number: update.number });
                }
                match update.status {
                    Some(status) => {
                        entry.order.status = status;
                        entry.order.accrual = update.accrual;
                        Ok(ReconcileOutcome::Updated)
                    },
                    None => Ok(ReconcileOutcome::Unchanged),
                }
            },
        }
    }
}
