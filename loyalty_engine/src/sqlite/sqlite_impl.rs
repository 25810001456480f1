//! `SqliteDatabase` is a concrete implementation of the reconciliation storage adapter.
//!
//! Unsurprisingly, it uses SQLite as the backend. The same pool is intended to be shared with the web tier, so all
//! methods tolerate concurrent callers; the owner check inside [`reconcile_order`] runs in a transaction together
//! with the write it guards.
//!
//! [`reconcile_order`]: crate::traits::ReconciliationDatabase::reconcile_order
use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use sqlx::SqlitePool;

use super::db::{new_pool, orders};
use crate::{
    db_types::{Order, OrderNumber, OrderUpdate, ReconcileOutcome},
    traits::{ReconciliationDatabase, ReconciliationError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url`, creating it and its schema if missing.
    pub async fn new(url: &str, max_connections: u32) -> Result<Self, ReconciliationError> {
        let pool = new_pool(url, max_connections).await?;
        let mut conn = pool.acquire().await?;
        orders::ensure_schema(&mut conn).await?;
        info!("🗃️ Connected to database at {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ReconciliationDatabase for SqliteDatabase {
    async fn fetch_pending_orders(&self) -> Result<Vec<Order>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_orders(&mut conn).await?;
        Ok(orders)
    }

    async fn fetch_order_owner(&self, number: &OrderNumber) -> Result<String, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_owner(number, &mut conn)
            .await?
            .ok_or_else(|| ReconciliationError::OrderNotFound(number.clone()))
    }

    async fn reconcile_order(&self, login: &str, update: OrderUpdate) -> Result<ReconcileOutcome, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let outcome = match orders::fetch_order_owner(&update.number, &mut tx).await? {
            None => {
                orders::insert_as_new(&update.number, login, &mut tx).await?;
                ReconcileOutcome::Created
            },
            Some(owner) if owner != login => {
                // Rolls back on drop; the stored row is never touched.
                return Err(ReconciliationError::OwnerConflict { number: update.number });
            },
            Some(_) => match update.status {
                Some(status) => {
                    orders::update_status(&update, status, &mut tx).await?;
                    debug!("🗃️ Order {} updated to {status}", update.number);
                    ReconcileOutcome::Updated
                },
                None => ReconcileOutcome::Unchanged,
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }
}
