use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque identifier handed out by the backend for a deferred operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobKind {
    Scan,
    Recover,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::Scan, JobKind::Recover];

    /// Key used by the progress endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Scan => "scan",
            JobKind::Recover => "recover",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scan" => Some(JobKind::Scan),
            "recover" | "recovery" => Some(JobKind::Recover),
            _ => None,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a file by its full original path.
///
/// The backend emits these either as `{"path": ...}` objects or as bare strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRef {
    pub path: String,
}

impl FileRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl<'de> Deserialize<'de> for FileRef {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(String),
            Object { path: String },
        }
        Ok(match Repr::deserialize(d)? {
            Repr::Bare(path) | Repr::Object { path } => FileRef { path },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(default, alias = "size", skip_serializing_if = "Option::is_none")]
    pub size_kb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, size_kb: Option<f64>) -> Self {
        Self { path: path.into(), size_kb, modified_time: None }
    }

    /// Last path segment, splitting on both `/` and `\`.
    pub fn display_name(&self) -> &str {
        display_name(&self.path)
    }

    /// Lower-cased extension of the last path segment, if it has one.
    pub fn extension(&self) -> Option<String> {
        let (_, ext) = self.display_name().rsplit_once('.')?;
        (!ext.is_empty()).then(|| ext.to_lowercase())
    }

    pub fn to_ref(&self) -> FileRef {
        FileRef::new(self.path.clone())
    }
}

pub fn display_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanRequest {
    pub drive: String,
    pub file_type: String,
    pub min_size: Option<String>,
    pub max_size: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoverRequest {
    pub save_dir: String,
    pub files: Vec<FileRef>,
}

/// Proof that the user agreed to an irreversible action.
///
/// Only [`crate::core::engine::Confirm`] implementations hand these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation(pub(crate) ());

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    files: Vec<FileRef>,
}

impl DeleteRequest {
    pub fn confirmed(files: Vec<FileRef>, _proof: Confirmation) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[FileRef] {
        &self.files
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    Scan(ScanRequest),
    Recover(RecoverRequest),
    Delete(DeleteRequest),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ImmediateResult {
    #[serde(default)]
    pub files: Option<Vec<FileEntry>>,
    #[serde(default)]
    pub recovered: Option<Vec<FileRef>>,
    #[serde(default)]
    pub deleted: Option<Vec<FileRef>>,
}

/// Decoded answer to an initiation call. Downstream code matches on this,
/// never on raw field presence.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Deferred(JobId),
    Immediate(ImmediateResult),
    /// Neither a job handle nor a result list was present.
    Started,
}

impl OperationOutcome {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if let Some(id) = job_id_of(&value) {
            return Ok(OperationOutcome::Deferred(id));
        }
        let has_result = ["files", "recovered", "deleted"]
            .iter()
            .any(|k| value.get(k).map_or(false, |v| !v.is_null()));
        if !has_result {
            return Ok(OperationOutcome::Started);
        }
        Ok(OperationOutcome::Immediate(serde_json::from_value(value)?))
    }
}

fn job_id_of(value: &Value) -> Option<JobId> {
    let raw = value.get("jobId").or_else(|| value.get("job_id"))?;
    match raw {
        Value::String(s) if !s.is_empty() => Some(JobId(s.clone())),
        Value::Number(n) => Some(JobId(n.to_string())),
        _ => None,
    }
}

/// Per-kind percentages reported by the progress endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub scan: Option<f64>,
    #[serde(default)]
    pub recover: Option<f64>,
}

impl ProgressSnapshot {
    /// Raw reported value; missing kinds read as 0 (not started yet).
    pub fn raw(&self, kind: JobKind) -> f64 {
        let v = match kind {
            JobKind::Scan => self.scan,
            JobKind::Recover => self.recover,
        };
        v.filter(|v| v.is_finite()).unwrap_or(0.0)
    }

    /// True once the backend itself reports 100 or more.
    pub fn is_done(&self, kind: JobKind) -> bool {
        self.raw(kind) >= 100.0
    }

    /// Rounded and clamped for display only.
    pub fn percent(&self, kind: JobKind) -> u8 {
        self.raw(kind).round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobResult {
    #[serde(default)]
    pub files: Option<Vec<FileEntry>>,
    #[serde(default)]
    pub recovered: Option<Vec<FileRef>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobResult {
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some("error")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewPayload {
    Image { src: String },
    Text { content: String },
    Error { message: String },
    Unavailable,
}

impl PreviewPayload {
    pub fn from_value(value: &Value) -> Self {
        let kind = value.get("type").and_then(Value::as_str);
        let content = value
            .get("content")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        match (kind, content) {
            (Some("image"), Some(c)) => return PreviewPayload::Image { src: c.to_string() },
            (Some("text"), Some(c)) => return PreviewPayload::Text { content: c.to_string() },
            _ => {}
        }
        match value.get("error").and_then(Value::as_str) {
            Some(e) if !e.is_empty() => PreviewPayload::Error { message: e.to_string() },
            _ => PreviewPayload::Unavailable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseTarget {
    Drive,
    SaveDir,
}

impl BrowseTarget {
    pub fn endpoint(self) -> &'static str {
        match self {
            BrowseTarget::Drive => "browse_drive",
            BrowseTarget::SaveDir => "browse_save",
        }
    }
}
