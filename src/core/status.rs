use crate::core::events::UiEvent;
use crate::core::model::JobKind;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Mirror of the status line, spinner and per-kind progress bars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusState {
    pub text: String,
    pub spinner: bool,
    pub progress: BTreeMap<JobKind, u8>,
    /// Blocking notifications raised so far, oldest first.
    pub notifications: Vec<String>,
}

impl StatusState {
    /// CSS width of the bar for `kind`, e.g. `"40%"`.
    pub fn bar_width(&self, kind: JobKind) -> String {
        format!("{}%", self.progress.get(&kind).copied().unwrap_or(0))
    }
}

#[derive(Clone)]
pub struct StatusReporter {
    state: Arc<Mutex<StatusState>>,
    event_tx: broadcast::Sender<UiEvent>,
}

impl StatusReporter {
    pub fn new(event_tx: broadcast::Sender<UiEvent>) -> Self {
        Self { state: Arc::new(Mutex::new(StatusState::default())), event_tx }
    }

    pub fn events(&self) -> broadcast::Sender<UiEvent> {
        self.event_tx.clone()
    }

    pub async fn set_status(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.lock().await.text = text.clone();
        let _ = self.event_tx.send(UiEvent::StatusChanged { text });
    }

    pub async fn spinner(&self, visible: bool) {
        {
            let mut s = self.state.lock().await;
            if s.spinner == visible {
                return;
            }
            s.spinner = visible;
        }
        let _ = self.event_tx.send(UiEvent::SpinnerToggled { visible });
    }

    pub async fn progress(&self, kind: JobKind, percent: u8) {
        let percent = percent.min(100);
        self.state.lock().await.progress.insert(kind, percent);
        let _ = self.event_tx.send(UiEvent::Progress { kind, percent });
    }

    /// Fresh state for a new operation of `kind`.
    pub async fn begin(&self, kind: Option<JobKind>, text: impl Into<String>) {
        if let Some(kind) = kind {
            self.progress(kind, 0).await;
        }
        self.set_status(text).await;
        self.spinner(true).await;
    }

    pub async fn notify(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.lock().await.notifications.push(message.clone());
        let _ = self.event_tx.send(UiEvent::Notify { message });
    }

    pub fn error(&self, scope: impl Into<String>, message: impl Into<String>) {
        let _ = self.event_tx.send(UiEvent::Error { scope: scope.into(), message: message.into() });
    }

    pub async fn snapshot(&self) -> StatusState {
        self.state.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mirrors_state_and_emits_events() {
        let (tx, mut rx) = broadcast::channel(16);
        let reporter = StatusReporter::new(tx);

        reporter.begin(Some(JobKind::Scan), "Starting scan...").await;
        reporter.progress(JobKind::Scan, 40).await;
        reporter.spinner(false).await;

        let s = reporter.snapshot().await;
        assert_eq!(s.text, "Starting scan...");
        assert!(!s.spinner);
        assert_eq!(s.bar_width(JobKind::Scan), "40%");
        assert_eq!(s.bar_width(JobKind::Recover), "0%");

        assert_eq!(rx.recv().await.unwrap(), UiEvent::Progress { kind: JobKind::Scan, percent: 0 });
        assert_eq!(rx.recv().await.unwrap(), UiEvent::StatusChanged { text: "Starting scan...".into() });
        assert_eq!(rx.recv().await.unwrap(), UiEvent::SpinnerToggled { visible: true });
    }

    #[tokio::test]
    async fn repeated_spinner_toggle_is_quiet() {
        let (tx, mut rx) = broadcast::channel(16);
        let reporter = StatusReporter::new(tx);
        reporter.spinner(false).await;
        reporter.notify("done").await;
        assert_eq!(rx.recv().await.unwrap(), UiEvent::Notify { message: "done".into() });
        assert_eq!(reporter.snapshot().await.notifications, vec!["done".to_string()]);
    }
}
