//! One-shot timers, one per live job.
//!
//! Each armed timer is a spawned sleep that reports the job id on the fired
//! channel. Timer identity is derived from the job id (`job:{id}`), so a
//! timer can always be re-addressed for disarm without a side table of
//! handles beyond the engine's own map.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

/// Minimum look-ahead. The deadline must land strictly in the future even
/// after message-passing latency, or an already-due job would never wake.
pub const FIRE_GUARD: Duration = Duration::from_millis(250);

pub fn timer_key(id: &str) -> String {
    format!("job:{id}")
}

pub struct TimerEngine {
    fired_tx: mpsc::Sender<String>,
    timers: HashMap<String, JoinHandle<()>>,
}

impl TimerEngine {
    pub fn new(fired_tx: mpsc::Sender<String>) -> Self {
        Self {
            fired_tx,
            timers: HashMap::new(),
        }
    }

    /// Schedule a one-shot wake-up no earlier than `max(now + guard, send_at)`.
    /// Arming an id that already has a live timer replaces it, so a job can
    /// never fire twice.
    pub fn arm(&mut self, id: &str, send_at: i64) {
        if let Some(old) = self.timers.remove(id) {
            old.abort();
        }

        let until_due = Duration::from_secs(send_at.saturating_sub(Utc::now().timestamp()).max(0) as u64);
        let deadline = Instant::now() + until_due.max(FIRE_GUARD);

        let tx = self.fired_tx.clone();
        let job_id = id.to_string();
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = tx.send(job_id).await;
        });

        debug!(timer = %timer_key(id), send_at, "armed");
        self.timers.insert(id.to_string(), handle);
    }

    /// Clear any pending timer for the id; unknown ids are a no-op.
    pub fn disarm(&mut self, id: &str) {
        if let Some(handle) = self.timers.remove(id) {
            handle.abort();
            debug!(timer = %timer_key(id), "disarmed");
        }
    }

    pub fn is_armed(&self, id: &str) -> bool {
        self.timers.contains_key(id)
    }

    pub fn armed_ids(&self) -> Vec<String> {
        self.timers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn past_due_timer_fires_after_guard() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut engine = TimerEngine::new(tx);
        engine.arm("a", 0);

        let fired = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert_eq!(fired.as_deref(), Some("a"));
        assert!(engine.is_armed("a"), "engine keeps the entry until disarmed");
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_and_fires_once() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut engine = TimerEngine::new(tx);
        engine.arm("a", 0);
        engine.arm("a", 0);

        let first = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert_eq!(first.as_deref(), Some("a"));
        let second = timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(second.is_err(), "replaced timer must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_prevents_firing_and_is_idempotent() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut engine = TimerEngine::new(tx);
        engine.arm("a", 0);
        engine.disarm("a");
        engine.disarm("a");
        engine.disarm("never-armed");

        let fired = timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(fired.is_err());
        assert!(!engine.is_armed("a"));
    }

    #[test]
    fn timer_keys_are_deterministic() {
        assert_eq!(timer_key("abc"), "job:abc");
        assert_eq!(timer_key("abc"), timer_key("abc"));
    }
}
