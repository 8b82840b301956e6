//! Scheduling coordinator: the single owner of job state.
//!
//! UI collaborators in the same process reach it through a cloneable
//! [`SchedulerHandle`]; collaborators in other processes share the persisted
//! store, which the run loop reconciles against on a short poll. The firing
//! path re-reads the persisted store immediately before acting, so a cancel
//! that lands before the re-read always wins and a timer firing for a job
//! that is already gone is a normal no-op.

pub mod error;
pub mod store;
pub mod timer;
pub mod types;

use crate::config::AppConfig;
use crate::deliver::{Deliver, DeliveryError};
use crate::settings::{clamp_endpoint_index, SettingsStore};
use error::{Result, SchedulerError};
use store::JobStore;
use timer::TimerEngine;
use types::{Job, JobDraft, MIN_DELAY_SECS};

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Duration};
use tracing::{debug, info, warn};

/// How often the run loop reconciles timers against the persisted store, so
/// jobs created or canceled by another process context gain or lose their
/// timer without any IPC.
const RECONCILE_INTERVAL: Duration = Duration::from_secs(1);

enum SchedulerRequest {
    Create {
        draft: JobDraft,
        reply: oneshot::Sender<Result<Job>>,
    },
    Cancel {
        id: String,
        reply: oneshot::Sender<()>,
    },
}

/// Message-passing front door to the coordinator loop.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<SchedulerRequest>,
}

impl SchedulerHandle {
    pub async fn create(&self, draft: JobDraft) -> Result<Job> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SchedulerRequest::Create { draft, reply })
            .await
            .map_err(|_| SchedulerError::Closed)?;
        rx.await.map_err(|_| SchedulerError::Closed)?
    }

    /// Idempotent: canceling an id that is already gone still succeeds.
    pub async fn cancel(&self, id: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SchedulerRequest::Cancel {
                id: id.to_string(),
                reply,
            })
            .await
            .map_err(|_| SchedulerError::Closed)?;
        rx.await.map_err(|_| SchedulerError::Closed)
    }
}

pub fn validate_draft(draft: &JobDraft) -> Result<()> {
    if draft.text.trim().is_empty() {
        return Err(SchedulerError::EmptyMessage);
    }
    if draft.delay_secs < MIN_DELAY_SECS {
        return Err(SchedulerError::DelayTooShort { min: MIN_DELAY_SECS });
    }
    Ok(())
}

pub struct Scheduler {
    store: JobStore,
    settings: SettingsStore,
    timers: TimerEngine,
    dispatcher: Arc<dyn Deliver>,
    request_rx: mpsc::Receiver<SchedulerRequest>,
    fired_rx: mpsc::Receiver<String>,
}

impl Scheduler {
    pub fn new(cfg: &AppConfig, dispatcher: Arc<dyn Deliver>) -> (Self, SchedulerHandle) {
        let (tx, request_rx) = mpsc::channel(32);
        let (fired_tx, fired_rx) = mpsc::channel(32);
        let scheduler = Self {
            store: JobStore::new(&cfg.data_dir),
            settings: SettingsStore::new(&cfg.data_dir),
            timers: TimerEngine::new(fired_tx),
            dispatcher,
            request_rx,
            fired_rx,
        };
        (scheduler, SchedulerHandle { tx })
    }

    /// Main loop. Re-arms a timer for every persisted job (timers do not
    /// survive a process restart; past-due jobs fire after the guard
    /// interval), then serves requests and firings until `shutdown` flips.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.store.load();
        for job in self.store.jobs.clone() {
            self.timers.arm(&job.id, job.send_at);
        }
        info!("Scheduler started with {} jobs", self.store.jobs.len());

        let mut reconcile = time::interval(RECONCILE_INTERVAL);
        loop {
            tokio::select! {
                Some(req) = self.request_rx.recv() => self.handle_request(req),
                Some(id) = self.fired_rx.recv() => self.on_fire(&id).await,
                _ = reconcile.tick() => self.reconcile(),
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn handle_request(&mut self, req: SchedulerRequest) {
        match req {
            SchedulerRequest::Create { draft, reply } => {
                let _ = reply.send(self.create(draft));
            }
            SchedulerRequest::Cancel { id, reply } => {
                self.cancel(&id);
                let _ = reply.send(());
            }
        }
    }

    /// Validate, persist, arm. Reloads the store first so writes from other
    /// process contexts are not clobbered.
    pub fn create(&mut self, draft: JobDraft) -> Result<Job> {
        validate_draft(&draft)?;
        self.store.load();
        let job = self.store.create(&draft, Utc::now().timestamp())?;
        self.timers.arm(&job.id, job.send_at);
        info!(
            "Scheduled job {} (fires in {}s)",
            job.id,
            job.remaining_secs(Utc::now().timestamp())
        );
        Ok(job)
    }

    pub fn cancel(&mut self, id: &str) {
        self.store.load();
        match self.store.remove(id) {
            Ok(true) => info!("Canceled job {}", id),
            Ok(false) => {}
            Err(e) => warn!("Failed to persist cancel of job {}: {}", id, e),
        }
        self.timers.disarm(id);
    }

    /// Timer callback. The persisted store, not any cached copy, is ground
    /// truth here; whatever the delivery outcome, the job is terminal and the
    /// timer is cleared. A failing job is dropped rather than retried, so it
    /// can never re-fire forever.
    async fn on_fire(&mut self, id: &str) {
        self.store.load();
        let Some(job) = self.store.get(id).cloned() else {
            debug!("Orphan timer fired for absent job {}", id);
            self.timers.disarm(id);
            return;
        };

        let settings = self.settings.load();
        let index = clamp_endpoint_index(job.endpoint_index);
        let url = settings.endpoints[index].url.trim().to_string();

        let outcome = if url.is_empty() {
            Err(DeliveryError::Unconfigured)
        } else {
            self.dispatcher.send(&url, &job.text).await
        };

        match outcome {
            Ok(()) => info!("Delivered job {} to endpoint {}", id, index + 1),
            Err(e) => warn!("Delivery failed for job {}, dropping it: {}", id, e),
        }

        if let Err(e) = self.store.remove(id) {
            warn!("Failed to prune job {} after firing: {}", id, e);
        }
        self.timers.disarm(id);
    }

    /// Pick up job-table changes made by other process contexts: arm timers
    /// for jobs that appeared, drop timers for jobs that vanished.
    fn reconcile(&mut self) {
        self.store.load();
        for job in &self.store.jobs {
            if !self.timers.is_armed(&job.id) {
                self.timers.arm(&job.id, job.send_at);
            }
        }

        let live: HashSet<&str> = self.store.jobs.iter().map(|j| j.id.as_str()).collect();
        for id in self.timers.armed_ids() {
            if !live.contains(id.as_str()) {
                self.timers.disarm(&id);
            }
        }
    }
}
