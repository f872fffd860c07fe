//! Market-data HTTP API.
//!
//! - `GET /`                              : service status
//! - `GET /stock/:ticker/price`           : latest close and volume
//! - `GET /stock/:ticker/historical`      : bars (`interval`, `period`)
//! - `GET /stock/:ticker/options`         : expirations, or one chain (`date`)
//! - `GET /stock/:ticker/dividends`       : dividend history

pub mod stock;

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use stockwatch_core::error::{ErrorKind, StockwatchError};

/// Handler error. Rendered as `{"code", "detail"}` JSON with a status
/// picked from its [`ErrorKind`], which is also left in the response
/// extensions for the request middleware.
#[derive(Debug)]
pub struct ApiError(pub StockwatchError);

impl From<StockwatchError> for ApiError {
    fn from(e: StockwatchError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    detail: String,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Cancelled | ErrorKind::Panic | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        if kind == ErrorKind::Internal {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            code: kind.as_str(),
            detail: self.0.to_string(),
        };
        let mut res = (status_for(kind), Json(body)).into_response();
        res.extensions_mut().insert(kind);
        res
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Serialize)]
pub struct Status {
    pub status: &'static str,
    pub timestamp: u64,
}

pub async fn root() -> Json<Status> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Json(Status {
        status: "online",
        timestamp,
    })
}

pub async fn not_found() -> ApiError {
    ApiError(StockwatchError::NotFound("no such route".into()))
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError(StockwatchError::MethodNotAllowed(method.to_string()))
}
