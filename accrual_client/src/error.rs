use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccrualApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the accrual service: {0}")]
    Transport(String),
    #[error("The accrual service has not registered this order")]
    OrderUnknown,
    #[error("The accrual service is rate limiting us. Retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not deserialize the accrual response: {0}")]
    ResponseFormat(String),
}
