//! In-memory backend with scripted answers, shared by the unit tests.

use crate::core::model::{
    BrowseTarget, JobId, JobResult, OperationOutcome, OperationRequest, PreviewPayload, ProgressSnapshot,
};
use crate::gateway::{Backend, GatewayError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Browse(BrowseTarget),
    Submit(&'static str),
    Progress,
    JobResult(String),
    Preview(String),
}

#[derive(Default)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<Call>>,
    progress: Mutex<VecDeque<Option<ProgressSnapshot>>>,
    fallback_progress: Mutex<Option<ProgressSnapshot>>,
    submit: Mutex<VecDeque<Option<Value>>>,
    job_result: Mutex<Option<JobResult>>,
    preview: Mutex<Option<PreviewPayload>>,
    browse: Mutex<Option<String>>,
    browse_fails: Mutex<bool>,
}

pub fn scan_at(percent: f64) -> ProgressSnapshot {
    ProgressSnapshot { scan: Some(percent), recover: None }
}

pub fn recover_at(percent: f64) -> ProgressSnapshot {
    ProgressSnapshot { scan: None, recover: Some(percent) }
}

fn scripted_failure() -> GatewayError {
    GatewayError::Request("scripted failure".to_string())
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn push_progress(&self, snap: ProgressSnapshot) {
        self.progress.lock().unwrap().push_back(Some(snap));
    }

    pub fn push_progress_failure(&self) {
        self.progress.lock().unwrap().push_back(None);
    }

    /// Answer used once the progress script runs dry. Without one, queries fail.
    pub fn set_fallback_progress(&self, snap: ProgressSnapshot) {
        *self.fallback_progress.lock().unwrap() = Some(snap);
    }

    /// Raw JSON the next `submit` answers with; it goes through the real shape sniffing.
    pub fn push_submit(&self, value: Value) {
        self.submit.lock().unwrap().push_back(Some(value));
    }

    pub fn push_submit_failure(&self) {
        self.submit.lock().unwrap().push_back(None);
    }

    pub fn set_job_result(&self, result: JobResult) {
        *self.job_result.lock().unwrap() = Some(result);
    }

    pub fn fail_job_result(&self) {
        *self.job_result.lock().unwrap() = None;
    }

    pub fn set_preview(&self, payload: PreviewPayload) {
        *self.preview.lock().unwrap() = Some(payload);
    }

    pub fn set_browse(&self, path: Option<&str>) {
        *self.browse.lock().unwrap() = path.map(str::to_string);
    }

    pub fn fail_browse(&self) {
        *self.browse_fails.lock().unwrap() = true;
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn browse(&self, target: BrowseTarget) -> Result<Option<String>, GatewayError> {
        self.record(Call::Browse(target));
        if *self.browse_fails.lock().unwrap() {
            return Err(scripted_failure());
        }
        Ok(self.browse.lock().unwrap().clone())
    }

    async fn submit(&self, req: &OperationRequest) -> Result<OperationOutcome, GatewayError> {
        let label = match req {
            OperationRequest::Scan(_) => "scan",
            OperationRequest::Recover(_) => "recover",
            OperationRequest::Delete(_) => "delete",
        };
        self.record(Call::Submit(label));
        let next = self.submit.lock().unwrap().pop_front().flatten();
        match next {
            Some(v) => Ok(OperationOutcome::from_value(v)?),
            None => Err(scripted_failure()),
        }
    }

    async fn progress(&self) -> Result<ProgressSnapshot, GatewayError> {
        self.record(Call::Progress);
        let next = self.progress.lock().unwrap().pop_front();
        match next {
            Some(Some(snap)) => Ok(snap),
            Some(None) => Err(scripted_failure()),
            None => self.fallback_progress.lock().unwrap().clone().ok_or_else(scripted_failure),
        }
    }

    async fn job_result(&self, job_id: &JobId) -> Result<JobResult, GatewayError> {
        self.record(Call::JobResult(job_id.0.clone()));
        self.job_result.lock().unwrap().clone().ok_or_else(scripted_failure)
    }

    async fn preview(&self, path: &str) -> Result<PreviewPayload, GatewayError> {
        self.record(Call::Preview(path.to_string()));
        self.preview.lock().unwrap().clone().ok_or_else(scripted_failure)
    }
}
