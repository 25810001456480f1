//! Bridges the HTTP accrual client into the engine's [`AccrualSource`] seam.
use std::time::Duration;

use accrual_client::{AccrualApi, AccrualApiError, ExternalStatus};
use async_trait::async_trait;
use loyalty_engine::{
    db_types::OrderNumber,
    traits::{AccrualSource, AccrualSourceError, AccrualVerdict, VerdictStatus},
};

#[derive(Debug, Clone)]
pub struct RemoteAccrual {
    api: AccrualApi,
}

impl RemoteAccrual {
    pub fn new(api: AccrualApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AccrualSource for RemoteAccrual {
    async fn order_status(&self, number: &OrderNumber) -> Result<AccrualVerdict, AccrualSourceError> {
        let result = self.api.order_status(number.as_str()).await.map_err(map_error)?;
        let status = match result.status {
            ExternalStatus::Registered => VerdictStatus::Registered,
            ExternalStatus::Processing => VerdictStatus::Processing,
            ExternalStatus::Processed => VerdictStatus::Processed,
            ExternalStatus::Invalid => VerdictStatus::Invalid,
            ExternalStatus::Unknown(raw) => return Err(AccrualSourceError::UnrecognizedStatus(raw)),
        };
        Ok(AccrualVerdict { status, accrual: result.accrual })
    }
}

fn map_error(err: AccrualApiError) -> AccrualSourceError {
    match err {
        AccrualApiError::OrderUnknown => AccrualSourceError::OrderUnknown,
        AccrualApiError::RateLimited { retry_after_secs } => {
            AccrualSourceError::RateLimited { retry_after: retry_after_secs.map(Duration::from_secs) }
        },
        AccrualApiError::ResponseFormat(msg) => AccrualSourceError::MalformedResponse(msg),
        other => AccrualSourceError::Unavailable(other.to_string()),
    }
}
