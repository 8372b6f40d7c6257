use crate::core::model::{JobId, JobKind, JobResult};
use crate::core::status::StatusReporter;
use crate::gateway::Backend;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between progress queries while the job is running.
    pub interval: Duration,
    /// Delay after a failed progress query.
    pub retry_delay: Duration,
    /// Consecutive failed progress queries tolerated before giving up. `None` retries forever.
    pub max_retries: Option<u32>,
    /// Overall ceiling on tracking time. `None` for no ceiling.
    pub max_elapsed: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(600),
            retry_delay: Duration::from_millis(1000),
            max_retries: Some(120),
            max_elapsed: None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("stopped tracking {kind} job {job_id}: {reason}")]
    TimedOut { kind: JobKind, job_id: JobId, reason: String },

    #[error("{kind} job {job_id} was superseded by a newer {kind} job")]
    Superseded { kind: JobKind, job_id: JobId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollState {
    Polling,
    Completing,
}

#[derive(Default)]
struct Tickets {
    next: u64,
    active: HashMap<JobKind, u64>,
}

/// Follows a backend job from its handle to its terminal payload.
///
/// Progress queries for one job are strictly sequential. Only the most
/// recently started loop of a kind may touch that kind's progress bar; an
/// older loop notices at its next wake-up and stops with
/// [`PollError::Superseded`].
#[derive(Clone)]
pub struct JobPoller {
    backend: Arc<dyn Backend>,
    reporter: StatusReporter,
    policy: PollPolicy,
    tickets: Arc<Mutex<Tickets>>,
}

impl JobPoller {
    pub fn new(backend: Arc<dyn Backend>, reporter: StatusReporter, policy: PollPolicy) -> Self {
        Self { backend, reporter, policy, tickets: Arc::new(Mutex::new(Tickets::default())) }
    }

    pub(crate) async fn claim(&self, kind: JobKind) -> u64 {
        let mut t = self.tickets.lock().await;
        t.next += 1;
        let ticket = t.next;
        t.active.insert(kind, ticket);
        ticket
    }

    async fn is_current(&self, kind: JobKind, ticket: u64) -> bool {
        self.tickets.lock().await.active.get(&kind) == Some(&ticket)
    }

    async fn release(&self, kind: JobKind, ticket: u64) {
        let mut t = self.tickets.lock().await;
        if t.active.get(&kind) == Some(&ticket) {
            t.active.remove(&kind);
        }
    }

    pub async fn is_tracking(&self, kind: JobKind) -> bool {
        self.tickets.lock().await.active.contains_key(&kind)
    }

    /// Polls until the job reports 100%, then fetches its result exactly once.
    ///
    /// A failed result fetch completes with an empty [`JobResult`]; callers
    /// must treat missing fields defensively.
    pub async fn track(&self, kind: JobKind, job_id: JobId) -> Result<JobResult, PollError> {
        let ticket = self.claim(kind).await;
        let started = Instant::now();
        let mut failures: u32 = 0;
        let mut state = PollState::Polling;
        info!(%kind, %job_id, "tracking job");

        loop {
            match state {
                PollState::Polling => {
                    let delay = match self.backend.progress().await {
                        Ok(snap) => {
                            failures = 0;
                            if !self.is_current(kind, ticket).await {
                                return Err(PollError::Superseded { kind, job_id });
                            }
                            let percent = snap.percent(kind);
                            debug!(%kind, %job_id, percent, "progress");
                            self.reporter.progress(kind, percent).await;
                            if snap.is_done(kind) {
                                state = PollState::Completing;
                                continue;
                            }
                            self.policy.interval
                        }
                        Err(e) => {
                            failures += 1;
                            warn!(%kind, %job_id, failures, "progress query failed: {e}");
                            if let Some(max) = self.policy.max_retries {
                                if failures > max {
                                    self.release(kind, ticket).await;
                                    return Err(PollError::TimedOut {
                                        kind,
                                        job_id,
                                        reason: format!("{failures} consecutive failed progress queries"),
                                    });
                                }
                            }
                            self.policy.retry_delay
                        }
                    };

                    if let Some(limit) = self.policy.max_elapsed {
                        if started.elapsed() + delay > limit {
                            self.release(kind, ticket).await;
                            return Err(PollError::TimedOut {
                                kind,
                                job_id,
                                reason: format!("no completion within {}s", limit.as_secs()),
                            });
                        }
                    }

                    sleep(delay).await;
                    if !self.is_current(kind, ticket).await {
                        debug!(%kind, %job_id, "superseded while waiting");
                        return Err(PollError::Superseded { kind, job_id });
                    }
                }
                PollState::Completing => {
                    let result = match self.backend.job_result(&job_id).await {
                        Ok(r) => r,
                        Err(e) => {
                            warn!(%kind, %job_id, "job result fetch failed, completing empty: {e}");
                            JobResult::default()
                        }
                    };
                    self.release(kind, ticket).await;
                    info!(%kind, %job_id, elapsed_ms = started.elapsed().as_millis() as u64, "job finished");
                    return Ok(result);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{FileEntry, ProgressSnapshot};
    use crate::test_helpers::{scan_at, Call, ScriptedBackend};
    use tokio::sync::broadcast;

    fn poller(backend: Arc<ScriptedBackend>, policy: PollPolicy) -> (JobPoller, StatusReporter) {
        let (tx, _) = broadcast::channel(64);
        let reporter = StatusReporter::new(tx);
        (JobPoller::new(backend, reporter.clone(), policy), reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_result_once_after_reaching_100() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_progress(scan_at(0.0));
        backend.push_progress(scan_at(40.0));
        backend.push_progress(scan_at(100.0));
        backend.set_job_result(JobResult {
            files: Some(vec![FileEntry::new("/mnt/usb/a.jpg", Some(12.0))]),
            ..Default::default()
        });

        let (p, reporter) = poller(backend.clone(), PollPolicy::default());
        let t0 = Instant::now();
        let res = p.track(JobKind::Scan, JobId("42".into())).await.unwrap();

        assert_eq!(res.files.unwrap().len(), 1);
        assert_eq!(
            backend.calls(),
            vec![Call::Progress, Call::Progress, Call::Progress, Call::JobResult("42".into())]
        );
        assert_eq!(t0.elapsed(), Duration::from_millis(1200));
        assert_eq!(reporter.snapshot().await.bar_width(JobKind::Scan), "100%");
        assert!(!p.is_tracking(JobKind::Scan).await);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_fires_once_for_any_progress_sequence() {
        let sequences: Vec<Vec<f64>> = vec![
            vec![100.0],
            vec![0.0, 0.0, 99.0, 100.0],
            vec![10.0, 5.0, 150.0],
            vec![99.4, 99.6],
        ];
        for seq in sequences {
            let backend = Arc::new(ScriptedBackend::new());
            for v in &seq {
                backend.push_progress(scan_at(*v));
            }
            backend.push_progress(scan_at(100.0));
            let (p, _) = poller(backend.clone(), PollPolicy::default());
            p.track(JobKind::Scan, JobId("j".into())).await.unwrap();

            let calls = backend.calls();
            let fetches: Vec<usize> = calls
                .iter()
                .enumerate()
                .filter(|(_, c)| matches!(c, Call::JobResult(_)))
                .map(|(i, _)| i)
                .collect();
            let first_done = seq
                .iter()
                .position(|v| *v >= 100.0)
                .unwrap_or(seq.len());
            assert_eq!(fetches, vec![first_done + 1], "sequence {:?}", seq);
            assert_eq!(calls.len(), first_done + 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn value_rounding_to_100_keeps_polling() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_progress(scan_at(99.6));
        backend.set_fallback_progress(scan_at(100.0));
        let (p, reporter) = poller(backend.clone(), PollPolicy::default());
        p.track(JobKind::Scan, JobId("j".into())).await.unwrap();
        assert_eq!(backend.calls(), vec![Call::Progress, Call::Progress, Call::JobResult("j".into())]);
        assert_eq!(reporter.snapshot().await.bar_width(JobKind::Scan), "100%");
    }

    #[tokio::test(start_paused = true)]
    async fn absent_kind_counts_as_not_started() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_progress(ProgressSnapshot { scan: None, recover: Some(100.0) });
        backend.push_progress(ProgressSnapshot { scan: Some(100.0), recover: None });
        let (p, _) = poller(backend.clone(), PollPolicy::default());
        p.track(JobKind::Scan, JobId("s".into())).await.unwrap();
        assert_eq!(backend.calls().iter().filter(|c| **c == Call::Progress).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_and_recover() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_progress_failure();
        backend.push_progress_failure();
        backend.push_progress(ProgressSnapshot { recover: Some(50.0), ..Default::default() });
        backend.push_progress(ProgressSnapshot { recover: Some(100.0), ..Default::default() });

        let (p, _) = poller(backend.clone(), PollPolicy::default());
        let t0 = Instant::now();
        p.track(JobKind::Recover, JobId("r".into())).await.unwrap();
        assert_eq!(t0.elapsed(), Duration::from_millis(1000 + 1000 + 600));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_result_fetch_completes_empty() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_progress(scan_at(100.0));
        backend.fail_job_result();
        let (p, _) = poller(backend, PollPolicy::default());
        let res = p.track(JobKind::Scan, JobId("x".into())).await.unwrap();
        assert_eq!(res, JobResult::default());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let backend = Arc::new(ScriptedBackend::new());
        let policy = PollPolicy { max_retries: Some(3), ..PollPolicy::default() };
        let (p, _) = poller(backend.clone(), policy);
        let err = p.track(JobKind::Scan, JobId("dead".into())).await.unwrap_err();
        assert!(matches!(err, PollError::TimedOut { kind: JobKind::Scan, .. }));
        assert_eq!(backend.calls(), vec![Call::Progress; 4]);
        assert!(!p.is_tracking(JobKind::Scan).await);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_elapsed_ceiling() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_fallback_progress(scan_at(10.0));
        let policy = PollPolicy { max_elapsed: Some(Duration::from_secs(3)), ..PollPolicy::default() };
        let (p, _) = poller(backend.clone(), policy);
        let err = p.track(JobKind::Scan, JobId("slow".into())).await.unwrap_err();
        assert!(matches!(err, PollError::TimedOut { .. }));
        assert!(!backend.calls().iter().any(|c| matches!(c, Call::JobResult(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_loop_supersedes_older_one() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_fallback_progress(scan_at(10.0));
        let (p, _) = poller(backend.clone(), PollPolicy::default());

        let old = {
            let p = p.clone();
            tokio::spawn(async move { p.track(JobKind::Scan, JobId("old".into())).await })
        };
        sleep(Duration::from_millis(100)).await;
        p.claim(JobKind::Scan).await;

        let err = old.await.unwrap().unwrap_err();
        assert_eq!(err, PollError::Superseded { kind: JobKind::Scan, job_id: JobId("old".into()) });
        assert!(!backend.calls().iter().any(|c| matches!(c, Call::JobResult(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn different_kinds_poll_independently() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_fallback_progress(ProgressSnapshot { scan: Some(100.0), recover: Some(100.0) });
        let (p, _) = poller(backend.clone(), PollPolicy::default());
        let (a, b) = tokio::join!(
            p.track(JobKind::Scan, JobId("s".into())),
            p.track(JobKind::Recover, JobId("r".into()))
        );
        assert!(a.is_ok() && b.is_ok());
    }
}
