//! Loyalty Points Reconciliation Engine
//!
//! The web tier of the loyalty points gateway accepts order uploads and balance queries, but it never decides an
//! order's fate. That verdict belongs to an external accrual authority, and this library contains the background
//! engine that keeps local storage converged with it:
//!
//! 1. A **poll scheduler** periodically asks storage for every order still awaiting a terminal verdict.
//! 2. A fixed pool of **update workers** drains those orders from a shared work channel, queries the accrual
//!    authority for each one, and merges the answer back into storage under the ownership invariant.
//!
//! The engine is backend-agnostic. Storage backends implement [`traits::ReconciliationDatabase`] (a SQLite
//! implementation ships behind the `sqlite` feature) and accrual transports implement [`traits::AccrualSource`].
//! Failures while handling a single order are logged and dropped: the order stays non-terminal and is rediscovered
//! on the next scan, so every transient error is retried at most one poll interval later.
pub mod db_types;
pub mod reconciler;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use reconciler::{ReconcilerConfig, ReconcilerPool};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
