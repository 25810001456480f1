//! The order status reconciliation pool.
//!
//! One scheduler task scans storage on a fixed interval for orders still awaiting a terminal verdict and feeds them
//! into a shared work channel. A fixed pool of worker tasks drains the channel, queries the accrual authority for
//! each order, and merges the answer back into storage. The channel holds a single order, so the scan can never run
//! ahead of the workers: a slow authority throttles discovery instead of flooding memory.
//!
//! The pool owns the channel, the timer and the shutdown signal. [`ReconcilerPool::shutdown`] stops new scans,
//! closes the channel and waits for the workers to drain in-flight orders before returning.
mod worker;

use std::{sync::Arc, time::Duration};

use log::*;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    db_types::Order,
    traits::{AccrualSource, ReconciliationDatabase},
};

pub const DEFAULT_WORKER_COUNT: usize = 8;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Tuning knobs for the reconciler pool.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    /// Number of update workers. A value of zero is treated as one.
    pub worker_count: usize,
    /// Time between two scans for pending orders. An order whose reconciliation fails is retried at most one
    /// interval after the failure. A zero interval is treated as [`MIN_POLL_INTERVAL`]; the timer requires a
    /// non-zero period.
    pub poll_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self { worker_count: DEFAULT_WORKER_COUNT, poll_interval: DEFAULT_POLL_INTERVAL }
    }
}

/// A running reconciliation engine: `worker_count` update workers plus one poll scheduler.
pub struct ReconcilerPool {
    shutdown: CancellationToken,
    scheduler: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl ReconcilerPool {
    /// Start the scheduler and the worker pool against the given storage adapter and accrual source.
    pub fn start<B, A>(config: ReconcilerConfig, db: B, accrual: A) -> Self
    where
        B: ReconciliationDatabase + 'static,
        A: AccrualSource + Clone + 'static,
    {
        let worker_count = config.worker_count.max(1);
        let poll_interval = config.poll_interval.max(MIN_POLL_INTERVAL);
        let shutdown = CancellationToken::new();
        let (tx, rx) = mpsc::channel::<Order>(1);
        let rx = Arc::new(Mutex::new(rx));
        let workers =
            (0..worker_count).map(|id| spawn_worker(id, Arc::clone(&rx), db.clone(), accrual.clone())).collect();
        let scheduler = spawn_scheduler(poll_interval, tx, db, shutdown.clone());
        info!("⚙️ Reconciler pool started: {worker_count} workers, scanning every {poll_interval:?}");
        Self { shutdown, scheduler, workers }
    }

    /// Orderly shutdown.
    ///
    /// Stops the scan timer first (no new work is discovered), then closes the work channel and waits for every
    /// worker to finish the order it is holding. No in-flight reconciliation is abandoned.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.scheduler.await {
            error!("⚙️ Scheduler task panicked: {e}");
        }
        for handle in self.workers {
            if let Err(e) = handle.await {
                error!("⚙️ Worker task panicked: {e}");
            }
        }
        info!("⚙️ Reconciler pool stopped");
    }
}

fn spawn_scheduler<B>(
    poll_interval: Duration,
    tx: mpsc::Sender<Order>,
    db: B,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    B: ReconciliationDatabase + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(poll_interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {},
            }
            let orders = match db.fetch_pending_orders().await {
                Ok(orders) => orders,
                Err(e) => {
                    // A failed scan must never kill the engine; the next tick simply retries.
                    warn!("🔁️ Pending order scan failed, skipping this tick: {e}");
                    continue;
                },
            };
            trace!("🔁️ Scan found {} pending orders", orders.len());
            for order in orders {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    sent = tx.send(order) => {
                        if sent.is_err() {
                            return;
                        }
                    },
                }
            }
        }
        // The sender is dropped here, closing the channel; workers exit once it is drained.
    })
}

fn spawn_worker<B, A>(id: usize, rx: Arc<Mutex<mpsc::Receiver<Order>>>, db: B, accrual: A) -> JoinHandle<()>
where
    B: ReconciliationDatabase + 'static,
    A: AccrualSource + 'static,
{
    tokio::spawn(async move {
        debug!("🔧️ Update worker {id} started");
        loop {
            let next = { rx.lock().await.recv().await };
            match next {
                Some(order) => worker::reconcile_one(id, order, &db, &accrual).await,
                None => break,
            }
        }
        debug!("🔧️ Update worker {id} stopped");
    })
}
