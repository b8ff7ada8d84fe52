//! Wire envelopes of the backend endpoints

use serde::{Deserialize, Serialize};

/// `{status, data|message}` envelope returned by the dashboard endpoint.
///
/// Every local failure is folded into the `Error` shape as well, so callers
/// handle one outcome type regardless of where the failure happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success {
        data: T,
    },
    Error {
        #[serde(default)]
        message: String,
    },
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Success { .. })
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            ApiResponse::Success { data } => Ok(data),
            ApiResponse::Error { message } => Err(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            ApiResponse::Success { data } => ApiResponse::Success { data: f(data) },
            ApiResponse::Error { message } => ApiResponse::Error { message },
        }
    }
}

/// Response of the API configuration endpoint (tunnel base URL discovery)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfigResponse {
    pub status: String,
    #[serde(rename = "BASE_URL", default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}
