use std::time::Duration;

use async_trait::async_trait;
use lpg_common::Points;
use thiserror::Error;

use crate::db_types::{OrderNumber, OrderStatusType};

//--------------------------------------    VerdictStatus    ---------------------------------------------------------
/// The status vocabulary of the external accrual authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    Registered,
    Processing,
    Processed,
    Invalid,
}

impl VerdictStatus {
    /// The internal status this verdict persists as.
    ///
    /// The authority uses `REGISTERED` to mean "accepted but not yet scored", which the engine records as
    /// still-pending `NEW` rather than introducing a fourth pending state in storage.
    pub fn as_order_status(self) -> OrderStatusType {
        match self {
            VerdictStatus::Registered => OrderStatusType::New,
            VerdictStatus::Processing => OrderStatusType::Processing,
            VerdictStatus::Processed => OrderStatusType::Processed,
            VerdictStatus::Invalid => OrderStatusType::Invalid,
        }
    }
}

//--------------------------------------    AccrualVerdict    --------------------------------------------------------
/// The authority's answer for a single order.
#[derive(Debug, Clone)]
pub struct AccrualVerdict {
    pub status: VerdictStatus,
    /// Points awarded, present once the authority has scored the order.
    pub accrual: Option<Points>,
}

//--------------------------------------  AccrualSourceError  --------------------------------------------------------
/// Everything that can go wrong when asking the authority about an order.
///
/// With the sole exception of a verdict of `INVALID` (which is a *successful* answer), nothing the authority does is
/// terminal: every variant here means "unknown, try again later", and the worker that hits one logs it and drops the
/// order so the next scan rediscovers it.
#[derive(Debug, Clone, Error)]
pub enum AccrualSourceError {
    #[error("The accrual authority could not be reached: {0}")]
    Unavailable(String),
    #[error("The accrual authority has no record of the order yet")]
    OrderUnknown,
    #[error("The accrual authority is rate limiting requests")]
    RateLimited { retry_after: Option<Duration> },
    #[error("The accrual response could not be decoded: {0}")]
    MalformedResponse(String),
    #[error("The accrual authority reported a status this engine does not recognize: {0}")]
    UnrecognizedStatus(String),
}

/// A read-only lookup against the external accrual authority.
#[async_trait]
pub trait AccrualSource: Send + Sync {
    /// Ask the authority for its verdict on one order.
    async fn order_status(&self, number: &OrderNumber) -> Result<AccrualVerdict, AccrualSourceError>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registered_verdicts_persist_as_new() {
        assert_eq!(VerdictStatus::Registered.as_order_status(), OrderStatusType::New);
        assert_eq!(VerdictStatus::Processing.as_order_status(), OrderStatusType::Processing);
        assert_eq!(VerdictStatus::Processed.as_order_status(), OrderStatusType::Processed);
        assert_eq!(VerdictStatus::Invalid.as_order_status(), OrderStatusType::Invalid);
    }
}
