//! hookpost: schedule short text messages for best-effort webhook delivery.
//!
//! # Overview
//!
//! Jobs are persisted to a small JSON table. The [`jobs::Scheduler`] owns
//! that table while running: it arms a one-shot timer per live job, re-reads
//! the persisted store immediately before every firing (so a cancel from any
//! other context wins the race), dispatches a single JSON POST per fired job
//! and then drops the job whatever the outcome; failed deliveries are never
//! retried.
//!
//! In-process collaborators talk to the running coordinator through a
//! [`jobs::SchedulerHandle`]; other processes share the persisted store,
//! which the run loop reconciles against once a second.

pub mod compose;
pub mod config;
pub mod configure;
pub mod deliver;
pub mod jobs;
pub mod settings;
