//! HTTP client for the external accrual calculation service.
//!
//! The accrual service is the authority on how many loyalty points an order earns. It exposes a single read-only
//! endpoint, `GET /api/orders/{number}`, and this crate wraps it behind [`AccrualApi`].
mod api;
mod config;
mod data_objects;
mod error;

pub use api::AccrualApi;
pub use config::AccrualConfig;
pub use data_objects::{ExternalStatus, OrderAccrualResult};
pub use error::AccrualApiError;
