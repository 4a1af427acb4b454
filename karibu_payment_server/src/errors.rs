use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use karibu_payment_engine::traits::PaymentPipelineError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An IO error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid request body. {0}")]
    InvalidRequestBody(String),
    #[error("Backend storage error: {0}")]
    BackendError(String),
    #[error("Unspecified error: {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let msg = self.to_string();
        HttpResponse::build(self.status_code()).json(json!({ "error": msg }))
    }
}

impl From<PaymentPipelineError> for ServerError {
    fn from(e: PaymentPipelineError) -> Self {
        ServerError::BackendError(e.to_string())
    }
}
