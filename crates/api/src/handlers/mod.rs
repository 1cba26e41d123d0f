pub mod metrics;
pub mod monitor;

pub use metrics::metrics_handler;
pub use monitor::{
    account_status_handler, overview_handler, start_monitoring_handler, stop_monitoring_handler,
};

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use denywatch_monitor::SupervisorError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown account")]
    UnknownAccount,
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownAccount => StatusCode::NOT_FOUND,
            ApiError::Supervisor(SupervisorError::AlreadyRunning) => StatusCode::CONFLICT,
            ApiError::Supervisor(SupervisorError::NoActiveAccounts) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
