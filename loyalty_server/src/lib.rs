//! The reconciliation daemon: wires the SQLite backend and the accrual service client into the reconciler pool and
//! runs it until interrupted.
pub mod accrual;
pub mod config;
pub mod errors;
