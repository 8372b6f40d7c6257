use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::core::model::{
    BrowseTarget, FileRef, JobId, JobResult, OperationOutcome, OperationRequest, PreviewPayload,
    ProgressSnapshot,
};
use crate::gateway::{Backend, GatewayContext, GatewayError};

/// JSON-over-HTTP access to the recovery backend.
///
/// Speaks both the job-based endpoints (`/scan`, `/recover`) and the older
/// synchronous ones (`/scan_files`, `/recover_files`, `/delete_files`).
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
    ctx: GatewayContext,
}

impl HttpGateway {
    pub fn new(base_url: &str, ctx: GatewayContext) -> Result<Self, GatewayError> {
        let mut base = Url::parse(base_url).map_err(|e| GatewayError::Request(format!("base url {base_url}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client, base, ctx })
    }

    fn url(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url, GatewayError> {
        let mut url = self
            .base
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| GatewayError::Request(format!("endpoint {endpoint}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// One request, one decoded JSON body. No retries here.
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, GatewayError> {
        let url = self.url(endpoint, query)?;
        debug!(%method, %url, "backend call");

        let mut req = self
            .client
            .request(method, url.clone())
            .header(USER_AGENT, &self.ctx.user_agent)
            .timeout(Duration::from_secs(self.ctx.timeout_secs));
        if let Some(b) = body {
            req = req.header(CONTENT_TYPE, "application/json").body(serde_json::to_vec(b)?);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            debug!(%url, %status, "backend call rejected");
            return Err(GatewayError::Status { status, body: serde_json::from_str(&text).ok() });
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn submit_raw(&self, req: &OperationRequest) -> Result<Value, GatewayError> {
        match req {
            OperationRequest::Scan(s) => {
                let body = json!({
                    "drive": s.drive,
                    "file_type": s.file_type,
                    "min_size": s.min_size,
                    "max_size": s.max_size,
                    "start_date": s.start_date,
                    "end_date": s.end_date,
                });
                match self.call(Method::POST, "scan", &[], Some(&body)).await {
                    Err(e) if e.is_route_missing() => {
                        warn!("POST /scan unavailable ({e}), using /scan_files");
                        let query = [("drive", s.drive.as_str()), ("fileType", s.file_type.as_str())];
                        self.call(Method::GET, "scan_files", &query, None).await
                    }
                    other => other,
                }
            }
            OperationRequest::Recover(r) => {
                let body = json!({ "save_dir": r.save_dir, "files": r.files });
                match self.call(Method::POST, "recover", &[], Some(&body)).await {
                    Err(e) if e.is_route_missing() => {
                        warn!("POST /recover unavailable ({e}), using /recover_files");
                        let body = json!({ "saveDir": r.save_dir, "files": legacy_labels(&r.files)? });
                        self.call(Method::POST, "recover_files", &[], Some(&body)).await
                    }
                    other => other,
                }
            }
            OperationRequest::Delete(d) => {
                let body = json!({ "files": legacy_labels(d.files())? });
                self.call(Method::POST, "delete_files", &[], Some(&body)).await
            }
        }
    }
}

/// `"file - <path> (selected)"`, the row label the synchronous endpoints read
/// back with `split(" - ")[1].split(" (")[0]`. Paths that would not survive that
/// parse are refused instead of sent.
fn legacy_labels(files: &[FileRef]) -> Result<Vec<String>, GatewayError> {
    files
        .iter()
        .map(|f| {
            if f.path.contains(" - ") || f.path.contains(" (") {
                return Err(GatewayError::Request(format!(
                    "path cannot be sent to the legacy endpoint: {}",
                    f.path
                )));
            }
            Ok(format!("file - {} (selected)", f.path))
        })
        .collect()
}

#[async_trait]
impl Backend for HttpGateway {
    async fn browse(&self, target: BrowseTarget) -> Result<Option<String>, GatewayError> {
        let v = self.call(Method::GET, target.endpoint(), &[], None).await?;
        Ok(v.get("path")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(str::to_string))
    }

    async fn submit(&self, req: &OperationRequest) -> Result<OperationOutcome, GatewayError> {
        let v = self.submit_raw(req).await?;
        Ok(OperationOutcome::from_value(v)?)
    }

    async fn progress(&self) -> Result<ProgressSnapshot, GatewayError> {
        let v = self.call(Method::GET, "progress", &[], None).await?;
        Ok(serde_json::from_value(v)?)
    }

    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, GatewayError> {
        let v = self.call(Method::GET, "job_result", &[("job_id", job_id.0.as_str())], None).await?;
        Ok(serde_json::from_value(v)?)
    }

    async fn preview(&self, path: &str) -> Result<PreviewPayload, GatewayError> {
        match self.call(Method::GET, "preview", &[("path", path)], None).await {
            Ok(v) => Ok(PreviewPayload::from_value(&v)),
            // The preview endpoint reports missing/unsupported files with an error body.
            Err(GatewayError::Status { body: Some(v), .. }) => Ok(PreviewPayload::from_value(&v)),
            Err(e) => Err(e),
        }
    }
}
