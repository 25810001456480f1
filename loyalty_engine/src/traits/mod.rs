//! The seams of the reconciliation engine.
//!
//! The engine deliberately knows nothing about Postgres, SQLite or HTTP. It talks to the world through two narrow
//! interfaces:
//!
//! * [`ReconciliationDatabase`] is the storage adapter: the durable record of orders, owners and statuses. The web
//!   tier shares the same adapter, so implementations must tolerate concurrent callers.
//! * [`AccrualSource`] is the external accrual authority: the sole source of truth for an order's final scoring
//!   outcome.
//!
//! Both traits use `async_trait` so that generic implementations produce `Send` futures and can be driven from
//! spawned worker tasks.
mod accrual_source;
mod reconciliation_database;

pub use accrual_source::{AccrualSource, AccrualSourceError, AccrualVerdict, VerdictStatus};
pub use reconciliation_database::{ReconciliationDatabase, ReconciliationError};
