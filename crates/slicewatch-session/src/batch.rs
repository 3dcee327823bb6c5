//! Many sessions on a worker pool.
//!
//! Sessions share nothing, so a batch simply fans them out: each worker
//! pulls the next session off a bounded job channel, builds a transport
//! for it and runs it to completion. The calling thread works the queue
//! too, so a batch makes progress even if no worker thread could be
//! spawned. Reports come back in push order regardless of which worker
//! ran what.

use std::collections::BTreeMap;
use std::fmt;
use std::thread;

use slicewatch_transport::Transport;

use crate::config::{ConfigError, SessionConfig};
use crate::report::SessionReport;
use crate::session::Session;
use crate::state::SessionState;

/// A set of sessions to run concurrently.
#[derive(Debug, Default)]
pub struct SessionBatch {
    sessions: Vec<Session>,
    /// Worker threads. `None` = auto-detect
    /// (`available_parallelism / 2`, clamped to `[2, 16]`).
    pub workers: Option<usize>,
}

impl SessionBatch {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and queue a session for it.
    pub fn push(&mut self, config: SessionConfig) -> Result<(), ConfigError> {
        self.sessions.push(Session::new(config)?);
        Ok(())
    }

    /// Queue one session per seed, each a copy of `base` with that seed.
    pub fn seeds(
        base: &SessionConfig,
        seeds: impl IntoIterator<Item = u64>,
    ) -> Result<Self, ConfigError> {
        let mut batch = Self::new();
        for seed in seeds {
            batch.push(SessionConfig {
                seed,
                ..base.clone()
            })?;
        }
        Ok(batch)
    }

    /// Number of queued sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Resolve the worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`.
    pub fn resolved_workers(&self) -> usize {
        match self.workers {
            Some(n) => n.clamp(1, 64),
            None => {
                let cpus = thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4);
                (cpus / 2).clamp(2, 16)
            }
        }
    }

    /// Run every session. `make_transport` is called once per session with
    /// its index and config.
    pub fn run<F, T>(self, make_transport: F) -> BatchReport
    where
        F: Fn(usize, &SessionConfig) -> T + Sync,
        T: Transport,
    {
        let total = self.sessions.len();
        let workers = self.resolved_workers().min(total.max(1));
        tracing::debug!(sessions = total, workers, "batch start");

        let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, Session)>(total.max(1));
        let (report_tx, report_rx) = crossbeam_channel::unbounded::<(usize, SessionReport)>();
        for job in self.sessions.into_iter().enumerate() {
            // Capacity covers every job and the receiver is alive.
            let _ = job_tx.send(job);
        }
        drop(job_tx);

        let work = |jobs: &crossbeam_channel::Receiver<(usize, Session)>,
                    reports: &crossbeam_channel::Sender<(usize, SessionReport)>| {
            while let Ok((index, session)) = jobs.recv() {
                let mut transport = make_transport(index, session.config());
                let report = session.run(&mut transport);
                if reports.send((index, report)).is_err() {
                    break;
                }
            }
        };

        thread::scope(|scope| {
            for i in 0..workers.saturating_sub(1) {
                let (jobs, reports, work) = (job_rx.clone(), report_tx.clone(), &work);
                let spawned = thread::Builder::new()
                    .name(format!("slicewatch-batch-{i}"))
                    .spawn_scoped(scope, move || work(&jobs, &reports));
                if let Err(e) = spawned {
                    tracing::warn!(worker = i, error = %e, "batch worker spawn failed");
                    break;
                }
            }
            work(&job_rx, &report_tx);
        });
        drop(report_tx);

        let mut reports: Vec<(usize, SessionReport)> = report_rx.iter().collect();
        reports.sort_by_key(|(index, _)| *index);
        let batch = BatchReport {
            reports: reports.into_iter().map(|(_, r)| r).collect(),
        };
        tracing::debug!(
            sessions = total, passed = batch.passed(), failed = batch.failed(),
            timed_out = batch.timed_out(), "batch done"
        );
        batch
    }
}

/// Reports of a finished batch, in push order.
#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    /// One report per session.
    pub reports: Vec<SessionReport>,
}

impl BatchReport {
    /// Sessions that verified.
    pub fn passed(&self) -> usize {
        self.count(SessionState::Verified)
    }

    /// Sessions that failed for a reason other than the deadline.
    pub fn failed(&self) -> usize {
        self.count(SessionState::Failed)
    }

    /// Sessions that hit the deadline.
    pub fn timed_out(&self) -> usize {
        self.count(SessionState::TimedOut)
    }

    /// Reports of sessions that did not verify.
    pub fn failures(&self) -> impl Iterator<Item = &SessionReport> {
        self.reports.iter().filter(|r| !r.is_ok())
    }

    /// Failure count per error kind.
    pub fn by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut kinds = BTreeMap::new();
        for e in self.reports.iter().filter_map(SessionReport::error) {
            *kinds.entry(e.kind()).or_insert(0) += 1;
        }
        kinds
    }

    fn count(&self, state: SessionState) -> usize {
        self.reports.iter().filter(|r| r.state() == state).count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sessions: {} verified, {} failed, {} timed out",
            self.reports.len(),
            self.passed(),
            self.failed(),
            self.timed_out()
        )?;
        for (kind, n) in self.by_kind() {
            write!(f, "; {kind}: {n}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicewatch_sched::JitterRange;
    use slicewatch_transport::{FifoTransport, SimConfig, SimTransport};

    fn small() -> SessionConfig {
        SessionConfig::new(0)
            .with_chunks(2, 500)
            .with_slice_size(128)
            .with_jitter(JitterRange::new(0, 20))
    }

    #[test]
    fn explicit_workers_are_clamped() {
        let mut batch = SessionBatch::new();
        batch.workers = Some(0);
        assert_eq!(batch.resolved_workers(), 1);
        batch.workers = Some(1000);
        assert_eq!(batch.resolved_workers(), 64);
        batch.workers = None;
        assert!((2..=16).contains(&batch.resolved_workers()));
    }

    #[test]
    fn push_validates() {
        let mut batch = SessionBatch::new();
        assert!(batch.push(small().with_slice_size(0)).is_err());
        assert!(batch.is_empty());
    }

    #[test]
    fn reports_come_back_in_push_order() {
        let mut batch = SessionBatch::seeds(&small(), 100..120).unwrap();
        batch.workers = Some(4);
        let report = batch.run(|_, _| SimTransport::new(SimConfig::default()));
        assert_eq!(report.reports.len(), 20);
        for (i, r) in report.reports.iter().enumerate() {
            assert_eq!(r.config.seed, 100 + i as u64);
        }
        assert_eq!(report.passed(), 20, "{report}");
        assert!(report.by_kind().is_empty());
    }

    #[test]
    fn single_worker_runs_inline() {
        let mut batch = SessionBatch::seeds(&small(), [1, 2]).unwrap();
        batch.workers = Some(1);
        let report = batch.run(|_, _| FifoTransport);
        assert_eq!(report.passed(), 2);
    }

    #[test]
    fn empty_batch_reports_nothing() {
        let report = SessionBatch::new().run(|_, _| FifoTransport);
        assert!(report.reports.is_empty());
        assert_eq!(report.to_string(), "0 sessions: 0 verified, 0 failed, 0 timed out");
    }
}
