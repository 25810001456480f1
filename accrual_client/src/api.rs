use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{Client, StatusCode};

use crate::{config::AccrualConfig, data_objects::OrderAccrualResult, error::AccrualApiError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AccrualApi {
    config: AccrualConfig,
    client: Arc<Client>,
}

impl AccrualApi {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AccrualApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Asks the accrual service for the calculation state of `number`.
    ///
    /// A `204 No Content` means the service has never heard of the order and maps to
    /// [`AccrualApiError::OrderUnknown`]; a `429` surfaces as [`AccrualApiError::RateLimited`] with the
    /// `Retry-After` header when the service sent one.
    pub async fn order_status(&self, number: &str) -> Result<OrderAccrualResult, AccrualApiError> {
        let url = self.config.order_url(number);
        trace!("🧮️ Querying accrual status: {url}");
        let response = self.client.get(&url).send().await.map_err(|e| AccrualApiError::Transport(e.to_string()))?;
        match response.status() {
            StatusCode::OK => {
                let result = response
                    .json::<OrderAccrualResult>()
                    .await
                    .map_err(|e| AccrualApiError::ResponseFormat(e.to_string()))?;
                trace!("🧮️ Accrual status for order {number}: {:?}", result.status);
                Ok(result)
            },
            StatusCode::NO_CONTENT => Err(AccrualApiError::OrderUnknown),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                debug!("🧮️ Accrual service is rate limiting. Retry-After: {retry_after_secs:?}");
                Err(AccrualApiError::RateLimited { retry_after_secs })
            },
            other => {
                let status = other.as_u16();
                let message = response.text().await.map_err(|e| AccrualApiError::Transport(e.to_string()))?;
                Err(AccrualApiError::QueryError { status, message })
            },
        }
    }
}
