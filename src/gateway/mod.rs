pub mod http;

use crate::core::model::{
    BrowseTarget, JobId, JobResult, OperationOutcome, OperationRequest, PreviewPayload, ProgressSnapshot,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx answer. The body is kept when it decoded as JSON.
    #[error("http status error: {status}")]
    Status { status: StatusCode, body: Option<Value> },

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    Request(String),
}

impl GatewayError {
    /// The endpoint does not exist on this backend.
    pub fn is_route_missing(&self) -> bool {
        matches!(
            self,
            GatewayError::Status { status, .. }
                if *status == StatusCode::NOT_FOUND || *status == StatusCode::METHOD_NOT_ALLOWED
        )
    }
}

#[derive(Debug, Clone)]
pub struct GatewayContext {
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GatewayContext {
    fn default() -> Self {
        Self { user_agent: concat!("undelete-client/", env!("CARGO_PKG_VERSION")).to_string(), timeout_secs: 30 }
    }
}

/// Everything the client needs from the recovery backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Asks the backend host to open a folder picker. `None` when the user cancelled.
    async fn browse(&self, target: BrowseTarget) -> Result<Option<String>, GatewayError>;

    /// Starts an operation. The answer is sniffed into an [`OperationOutcome`].
    async fn submit(&self, req: &OperationRequest) -> Result<OperationOutcome, GatewayError>;

    async fn progress(&self) -> Result<ProgressSnapshot, GatewayError>;

    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, GatewayError>;

    async fn preview(&self, path: &str) -> Result<PreviewPayload, GatewayError>;
}
