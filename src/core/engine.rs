use crate::core::events::UiEvent;
use crate::core::model::*;
use crate::core::modal::ModalController;
use crate::core::poller::{JobPoller, PollError, PollPolicy};
use crate::core::presenter::{recovered_count, recovery_outcome, render_preview, render_results};
use crate::core::selection::ResultsView;
use crate::core::status::StatusReporter;
use crate::gateway::{Backend, GatewayError};
use crate::i18n::Messages;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// Missing input; raised before any request is made.
    #[error("{0}")]
    Validation(&'static str),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("backend reported failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("a {0} operation is already in progress")]
    Busy(JobKind),

    #[error("declined by user")]
    Declined,
}

/// Asks the user before irreversible actions.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// What a finished operation left on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Rendered { files: usize },
    Recovered { count: Option<usize> },
    Deleted { count: Option<usize> },
    /// The backend accepted the request but gave nothing to track.
    Started,
}

/// Display regions the controller drives, handed over at construction.
#[derive(Clone)]
pub struct Regions {
    pub status: StatusReporter,
    pub results: ResultsView,
    pub modal: Arc<Mutex<ModalController>>,
}

#[derive(Debug, Clone, Default)]
struct Fields {
    drive: String,
    save_dir: String,
}

/// Marks a job kind busy until dropped.
struct InFlight {
    set: Arc<std::sync::Mutex<HashSet<JobKind>>>,
    kind: JobKind,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set.lock().unwrap_or_else(|e| e.into_inner()).remove(&self.kind);
    }
}

#[derive(Clone)]
pub struct Controller {
    backend: Arc<dyn Backend>,
    poller: JobPoller,
    regions: Regions,
    msg: &'static Messages,
    in_flight: Arc<std::sync::Mutex<HashSet<JobKind>>>,
    fields: Arc<Mutex<Fields>>,
}

impl Controller {
    pub fn new(backend: Arc<dyn Backend>, regions: Regions, policy: PollPolicy, msg: &'static Messages) -> Self {
        let poller = JobPoller::new(backend.clone(), regions.status.clone(), policy);
        Self {
            backend,
            poller,
            regions,
            msg,
            in_flight: Arc::new(std::sync::Mutex::new(HashSet::new())),
            fields: Arc::new(Mutex::new(Fields::default())),
        }
    }

    pub fn regions(&self) -> &Regions {
        &self.regions
    }

    fn enter(&self, kind: JobKind) -> Option<InFlight> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(kind) {
            return None;
        }
        Some(InFlight { set: self.in_flight.clone(), kind })
    }

    async fn busy(&self, kind: JobKind) -> ClientError {
        self.regions
            .status
            .set_status(format!("{} ({})", self.msg.already_running, kind))
            .await;
        ClientError::Busy(kind)
    }

    async fn reject(&self, message: &'static str) -> ClientError {
        self.regions.status.notify(message).await;
        ClientError::Validation(message)
    }

    /// Terminating failure: status line, blocking notification, log.
    async fn fail(&self, scope: &str, phrase: &str, err: &(dyn std::fmt::Display + Sync)) {
        error!(scope, "{err}");
        let status = &self.regions.status;
        status.spinner(false).await;
        status.set_status(phrase).await;
        status.error(scope, err.to_string());
        status.notify(phrase).await;
    }

    async fn poll_failed(&self, kind: JobKind, err: PollError) -> ClientError {
        match &err {
            PollError::TimedOut { .. } => self.fail(kind.as_str(), self.msg.tracking_timed_out, &err).await,
            // The newer loop owns the status line now.
            PollError::Superseded { .. } => info!("{err}"),
        }
        ClientError::Poll(err)
    }

    pub async fn field(&self, target: BrowseTarget) -> String {
        let f = self.fields.lock().await;
        match target {
            BrowseTarget::Drive => f.drive.clone(),
            BrowseTarget::SaveDir => f.save_dir.clone(),
        }
    }

    /// Opens the backend's folder picker; a cancelled pick leaves the field as it was.
    pub async fn browse(&self, target: BrowseTarget) -> Result<String, ClientError> {
        match self.backend.browse(target).await {
            Ok(Some(path)) => {
                let mut f = self.fields.lock().await;
                match target {
                    BrowseTarget::Drive => f.drive = path.clone(),
                    BrowseTarget::SaveDir => f.save_dir = path.clone(),
                }
                Ok(path)
            }
            Ok(None) => Ok(self.field(target).await),
            Err(e) => {
                self.fail(target.endpoint(), self.msg.browse_failed, &e).await;
                Err(e.into())
            }
        }
    }

    pub async fn scan(&self, req: ScanRequest) -> Result<Completion, ClientError> {
        if req.drive.trim().is_empty() {
            return Err(self.reject(self.msg.select_drive).await);
        }
        let Some(_busy) = self.enter(JobKind::Scan) else {
            return Err(self.busy(JobKind::Scan).await);
        };
        let status = &self.regions.status;
        status.begin(Some(JobKind::Scan), self.msg.starting_scan).await;
        info!(drive = %req.drive, file_type = %req.file_type, "starting scan");

        let outcome = match self.backend.submit(&OperationRequest::Scan(req)).await {
            Ok(o) => o,
            Err(e) => {
                self.fail("scan", self.msg.scan_failed_logs, &e).await;
                return Err(e.into());
            }
        };
        status.spinner(false).await;

        match outcome {
            OperationOutcome::Deferred(job_id) => {
                status.set_status(self.msg.scan_waiting).await;
                match self.poller.track(JobKind::Scan, job_id).await {
                    Ok(job) => self.finish_scan(job).await,
                    Err(e) => Err(self.poll_failed(JobKind::Scan, e).await),
                }
            }
            OperationOutcome::Immediate(ImmediateResult { files: Some(files), .. }) => {
                let n = self.show_files(&files).await;
                status.set_status(self.msg.scan_complete).await;
                Ok(Completion::Rendered { files: n })
            }
            OperationOutcome::Immediate(_) | OperationOutcome::Started => {
                status.set_status(self.msg.scan_started).await;
                Ok(Completion::Started)
            }
        }
    }

    async fn show_files(&self, files: &[FileEntry]) -> usize {
        let rendered = render_results(files, self.msg);
        let _ = self.regions.status.events().send(UiEvent::ResultsRendered {
            rows: rendered.rows.len(),
            summary: rendered.summary.clone(),
        });
        self.regions.results.show(rendered).await;
        info!(files = files.len(), "results rendered");
        files.len()
    }

    async fn finish_scan(&self, job: JobResult) -> Result<Completion, ClientError> {
        let status = &self.regions.status;
        if let Some(files) = &job.files {
            let n = self.show_files(files).await;
            status.set_status(self.msg.scan_complete).await;
            return Ok(Completion::Rendered { files: n });
        }
        if job.is_error() {
            let reason = job.error.clone().unwrap_or_else(|| "unknown".to_string());
            status.set_status(self.msg.scan_failed).await;
            status.notify(format!("{}: {}", self.msg.scan_error, reason)).await;
            error!("scan job failed: {reason}");
            return Err(ClientError::Backend(reason));
        }
        status.set_status(self.msg.scan_complete).await;
        Ok(Completion::Started)
    }

    /// Recovers the rows currently checked in the result list.
    pub async fn recover(&self, save_dir: &str) -> Result<Completion, ClientError> {
        if save_dir.trim().is_empty() {
            return Err(self.reject(self.msg.select_save_dir).await);
        }
        let files = self.regions.results.selected().await;
        if files.is_empty() {
            return Err(self.reject(self.msg.select_files).await);
        }
        let Some(_busy) = self.enter(JobKind::Recover) else {
            return Err(self.busy(JobKind::Recover).await);
        };
        let status = &self.regions.status;
        status.begin(Some(JobKind::Recover), self.msg.starting_recovery).await;
        info!(save_dir, files = files.len(), "starting recovery");

        let req = OperationRequest::Recover(RecoverRequest { save_dir: save_dir.to_string(), files });
        let outcome = match self.backend.submit(&req).await {
            Ok(o) => o,
            Err(e) => {
                self.fail("recover", self.msg.recovery_failed_logs, &e).await;
                return Err(e.into());
            }
        };
        status.spinner(false).await;

        match outcome {
            OperationOutcome::Deferred(job_id) => {
                status.set_status(self.msg.recovery_waiting).await;
                match self.poller.track(JobKind::Recover, job_id).await {
                    Ok(job) => self.finish_recovery(job).await,
                    Err(e) => Err(self.poll_failed(JobKind::Recover, e).await),
                }
            }
            OperationOutcome::Immediate(ImmediateResult { recovered: Some(r), .. }) => {
                status
                    .notify(format!("{}: {}", self.msg.recovery_finished, recovered_count(Some(r.as_slice()))))
                    .await;
                status.set_status(self.msg.recovery_complete).await;
                Ok(Completion::Recovered { count: Some(r.len()) })
            }
            OperationOutcome::Immediate(_) | OperationOutcome::Started => {
                status.set_status(self.msg.recovery_sent).await;
                Ok(Completion::Started)
            }
        }
    }

    async fn finish_recovery(&self, job: JobResult) -> Result<Completion, ClientError> {
        let status = &self.regions.status;
        if job.is_error() {
            let reason = job.error.clone().unwrap_or_else(|| "unknown".to_string());
            status.set_status(self.msg.recovery_failed_logs).await;
            status.notify(format!("{}: {}", self.msg.recovery_error, reason)).await;
            error!("recovery job failed: {reason}");
            return Err(ClientError::Backend(reason));
        }
        status.notify(recovery_outcome(&job, self.msg)).await;
        status.set_status(self.msg.recovery_complete).await;
        Ok(Completion::Recovered { count: job.recovered.as_ref().map(Vec::len) })
    }

    /// Permanently deletes the checked rows. Nothing is sent unless `confirm` agrees.
    pub async fn delete(&self, confirm: &dyn Confirm) -> Result<Completion, ClientError> {
        let files = self.regions.results.selected().await;
        if files.is_empty() {
            return Err(self.reject(self.msg.select_files).await);
        }
        let status = &self.regions.status;
        let prompt = self.msg.delete_confirm.replace("{count}", &files.len().to_string());
        if !confirm.confirm(&prompt) {
            status.set_status(self.msg.delete_declined).await;
            return Err(ClientError::Declined);
        }
        let req = DeleteRequest::confirmed(files, Confirmation(()));

        status.begin(None, self.msg.starting_delete).await;
        info!(files = req.files().len(), "deleting permanently");
        let outcome = match self.backend.submit(&OperationRequest::Delete(req)).await {
            Ok(o) => o,
            Err(e) => {
                self.fail("delete", self.msg.delete_failed_logs, &e).await;
                return Err(e.into());
            }
        };
        status.spinner(false).await;

        match outcome {
            OperationOutcome::Immediate(ImmediateResult { deleted: Some(d), .. }) => {
                status.notify(format!("{}: {}", self.msg.delete_complete, d.len())).await;
                status.set_status(format!("{}: {}", self.msg.delete_complete, d.len())).await;
                Ok(Completion::Deleted { count: Some(d.len()) })
            }
            _ => {
                status.set_status(self.msg.delete_sent).await;
                Ok(Completion::Deleted { count: None })
            }
        }
    }

    /// Attaches to a job started elsewhere and finishes it like a fresh submission.
    pub async fn wait(&self, kind: JobKind, job_id: JobId) -> Result<Completion, ClientError> {
        let Some(_busy) = self.enter(kind) else {
            return Err(self.busy(kind).await);
        };
        let waiting = match kind {
            JobKind::Scan => self.msg.scan_waiting,
            JobKind::Recover => self.msg.recovery_waiting,
        };
        self.regions.status.set_status(waiting).await;
        let job = match self.poller.track(kind, job_id).await {
            Ok(job) => job,
            Err(e) => return Err(self.poll_failed(kind, e).await),
        };
        match kind {
            JobKind::Scan => self.finish_scan(job).await,
            JobKind::Recover => self.finish_recovery(job).await,
        }
    }

    /// Opens the preview modal and fills it once the backend answers.
    pub async fn preview(&self, path: &str) -> Result<PreviewPayload, ClientError> {
        {
            let loading = format!("<p>{}</p>", self.msg.preview_loading);
            self.regions.modal.lock().await.open_with(loading);
        }
        match self.backend.preview(path).await {
            Ok(payload) => {
                let html = render_preview(&payload, self.msg);
                self.regions.modal.lock().await.set_content(html);
                Ok(payload)
            }
            Err(e) => {
                {
                    let html = format!("<p>{}</p>", self.msg.preview_failed);
                    self.regions.modal.lock().await.set_content(html);
                }
                self.fail("preview", self.msg.preview_failed, &e).await;
                Err(e.into())
            }
        }
    }

    pub async fn progress(&self) -> Result<ProgressSnapshot, ClientError> {
        Ok(self.backend.progress().await?)
    }
}
