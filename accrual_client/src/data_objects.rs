use lpg_common::Points;
use serde::{Deserialize, Serialize};

/// An order's calculation state as reported by the accrual service.
///
/// `Unknown` preserves the raw status string so a misbehaving service can be logged verbatim rather than failing
/// deserialization of the whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum ExternalStatus {
    Registered,
    Processing,
    Processed,
    Invalid,
    Unknown(String),
}

impl From<String> for ExternalStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "REGISTERED" => Self::Registered,
            "PROCESSING" => Self::Processing,
            "PROCESSED" => Self::Processed,
            "INVALID" => Self::Invalid,
            _ => Self::Unknown(value),
        }
    }
}

/// The body of a successful `GET /api/orders/{number}` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAccrualResult {
    pub order: String,
    pub status: ExternalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}
