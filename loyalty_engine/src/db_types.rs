use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use lpg_common::luhn_valid;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub use lpg_common::Points;

//--------------------------------------    OrderNumber    -----------------------------------------------------------
/// A Luhn-validated order number.
///
/// Order numbers are globally unique across all owners; the web tier validates them on upload and this type enforces
/// the same checksum at every other entry point into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

#[derive(Debug, Clone, Error)]
#[error("{0} is not a valid order number")]
pub struct InvalidOrderNumber(String);

impl OrderNumber {
    pub fn new<S: Into<String>>(number: S) -> Result<Self, InvalidOrderNumber> {
        let number = number.into();
        if luhn_valid(&number) {
            Ok(Self(number))
        } else {
            Err(InvalidOrderNumber(number))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = InvalidOrderNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = InvalidOrderNumber;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
/// The lifecycle status of an order.
///
/// `Registered` only ever appears on the wire: the accrual authority uses it to mean "accepted but not yet scored",
/// and the engine remaps it to `New` before anything is persisted. Stored rows therefore only hold `New`,
/// `Processing`, `Processed` or `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been uploaded, and no verdict has been received yet.
    New,
    /// The accrual authority has accepted the order but not yet scored it.
    Registered,
    /// The accrual authority is busy scoring the order.
    Processing,
    /// The order has been scored and points have been awarded.
    Processed,
    /// The accrual authority rejected the order. No points will ever be awarded.
    Invalid,
}

impl OrderStatusType {
    /// Terminal orders have received their final verdict and are never revisited by the engine.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Processed | OrderStatusType::Invalid)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Registered => write!(f, "REGISTERED"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "REGISTERED" => Ok(Self::Registered),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// A stored order as seen by the reconciliation engine.
///
/// The owning login is deliberately absent: workers resolve it separately through
/// [`crate::traits::ReconciliationDatabase::fetch_order_owner`] so that every write goes through the ownership check.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub number: OrderNumber,
    pub status: OrderStatusType,
    /// Points awarded for the order, once the accrual authority has reported them.
    pub accrual: Option<Points>,
    pub uploaded_at: DateTime<Utc>,
}

//--------------------------------------     OrderUpdate     ---------------------------------------------------------
/// A reconciliation request against a single order number.
#[derive(Debug, Clone)]
pub struct OrderUpdate {
    pub number: OrderNumber,
    /// The status to persist. `None` means "nothing to change" and yields [`ReconcileOutcome::Unchanged`];
    /// the web tier uses this form on re-upload of an already known order.
    pub status: Option<OrderStatusType>,
    pub accrual: Option<Points>,
}

impl OrderUpdate {
    pub fn new(number: OrderNumber, status: OrderStatusType) -> Self {
        Self { number, status: Some(status), accrual: None }
    }

    pub fn with_accrual(mut self, accrual: Points) -> Self {
        self.accrual = Some(accrual);
        self
    }
}

//--------------------------------------   ReconcileOutcome  ---------------------------------------------------------
/// What a successful [`crate::traits::ReconciliationDatabase::reconcile_order`] call actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order number was unseen and has been created as `NEW`, bound to the caller's login.
    Created,
    /// The stored status and accrual were overwritten with the supplied values.
    Updated,
    /// The caller owns the order but supplied no status; nothing was written.
    Unchanged,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_numbers_must_pass_the_luhn_check() {
        assert!(OrderNumber::new("12345678903").is_ok());
        assert!(OrderNumber::new("12345678904").is_err());
        assert!(OrderNumber::new("not-a-number").is_err());
        assert_eq!(OrderNumber::new("12345678903").unwrap().as_str(), "12345678903");
    }

    #[test]
    fn order_number_deserialization_validates() {
        let number: OrderNumber = serde_json::from_str("\"79927398713\"").unwrap();
        assert_eq!(number.as_str(), "79927398713");
        assert!(serde_json::from_str::<OrderNumber>("\"79927398710\"").is_err());
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            OrderStatusType::New,
            OrderStatusType::Registered,
            OrderStatusType::Processing,
            OrderStatusType::Processed,
            OrderStatusType::Invalid,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("PAID".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn only_processed_and_invalid_are_terminal() {
        assert!(!OrderStatusType::New.is_terminal());
        assert!(!OrderStatusType::Registered.is_terminal());
        assert!(!OrderStatusType::Processing.is_terminal());
        assert!(OrderStatusType::Processed.is_terminal());
        assert!(OrderStatusType::Invalid.is_terminal());
    }
}
