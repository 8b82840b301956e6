//! Persisted job table.
//!
//! The on-disk shape has gone through two generations: a dynamic list of live
//! jobs (canonical) and an older fixed slot table whose rows carry a `status`
//! discriminant. [`normalize_job_table`] accepts either, plus bare arrays and
//! arbitrary garbage, and always yields a well-formed live-job list; the next
//! save rewrites the file in the current shape.

use crate::jobs::error::{Result, SchedulerError};
use crate::jobs::types::{Job, JobDraft, JobStoreData, JOB_CAPACITY};
use crate::settings::clamp_endpoint_index;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const STORE_VERSION: i32 = 2;

pub struct JobStore {
    path: PathBuf,
    pub jobs: Vec<Job>,
}

impl JobStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("jobs.json"),
            jobs: Vec::new(),
        }
    }

    /// Reload from disk. Never fails: missing files and malformed payloads
    /// degrade to an empty table.
    pub fn load(&mut self) {
        let raw = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => {
                self.jobs = Vec::new();
                return;
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => self.jobs = normalize_job_table(&value),
            Err(e) => {
                warn!("malformed job table at {}: {e}", self.path.display());
                self.jobs = Vec::new();
            }
        }
    }

    /// Persist the full table. Written to a temp file and renamed into place
    /// so a concurrent reader never observes a partial write.
    pub fn save(&self) -> Result<()> {
        let data = JobStoreData {
            version: STORE_VERSION,
            jobs: self.jobs.clone(),
        };
        let content = serde_json::to_string_pretty(&data)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Mint and insert a job from a validated draft. Fails without touching
    /// the table when it is already at capacity.
    pub fn create(&mut self, draft: &JobDraft, now: i64) -> Result<Job> {
        if self.jobs.len() >= JOB_CAPACITY {
            return Err(SchedulerError::CapacityExceeded { cap: JOB_CAPACITY });
        }
        let job = Job {
            id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
            text: draft.text.trim().to_string(),
            endpoint_index: clamp_endpoint_index(draft.endpoint_index),
            kind: draft.kind,
            created_at: now,
            send_at: now + draft.delay_secs,
        };
        self.jobs.push(job.clone());
        self.jobs.sort_by_key(|j| j.send_at);
        self.save()?;
        Ok(job)
    }

    /// Remove by id. Removing an absent id is a no-op, not an error.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let len_before = self.jobs.len();
        self.jobs.retain(|j| j.id != id);
        let removed = self.jobs.len() < len_before;
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }
}

/// Reduce any historical persisted shape to the live-job list: sorted by
/// ascending send time, capped at [`JOB_CAPACITY`].
pub fn normalize_job_table(raw: &Value) -> Vec<Job> {
    let arr = match raw {
        Value::Object(map) => match map.get("jobs").and_then(|j| j.as_array()) {
            Some(a) => a,
            None => return Vec::new(),
        },
        Value::Array(a) => a,
        _ => return Vec::new(),
    };

    let mut jobs: Vec<Job> = arr.iter().filter_map(normalize_job).collect();
    jobs.sort_by_key(|j| j.send_at);
    jobs.truncate(JOB_CAPACITY);
    jobs
}

fn normalize_job(raw: &Value) -> Option<Job> {
    let obj = raw.as_object()?;

    // Slot-table rows carry a status discriminant; only scheduled rows hold a
    // live job. Empty, sent and canceled slots have no runtime counterpart.
    if let Some(status) = obj.get("status").and_then(|s| s.as_str()) {
        if status != "scheduled" {
            return None;
        }
    }

    let job = Job {
        id: obj
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        text: obj
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        endpoint_index: obj
            .get("webhookIndex")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(0),
        kind: obj
            .get("kind")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default(),
        created_at: obj.get("createdAt").and_then(|v| v.as_i64()).unwrap_or(0),
        send_at: obj.get("sendAt").and_then(|v| v.as_i64()).unwrap_or(0),
    };

    if job.id.is_empty() || job.text.is_empty() || job.send_at == 0 {
        return None;
    }
    Some(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobKind;
    use serde_json::json;
    use tempfile::TempDir;

    fn draft(text: &str, delay_secs: i64) -> JobDraft {
        JobDraft {
            text: text.to_string(),
            endpoint_index: 0,
            kind: JobKind::Scheduled,
            delay_secs,
        }
    }

    #[test]
    fn create_caps_at_capacity_without_mutation() {
        let dir = TempDir::new().unwrap();
        let mut store = JobStore::new(dir.path());
        for i in 0..JOB_CAPACITY {
            store.create(&draft(&format!("m{i}"), 60 + i as i64), 1_000).unwrap();
        }
        assert_eq!(store.jobs.len(), JOB_CAPACITY);

        let before = store.jobs.clone();
        let err = store.create(&draft("overflow", 60), 1_000).unwrap_err();
        assert!(matches!(err, SchedulerError::CapacityExceeded { cap: JOB_CAPACITY }));
        assert_eq!(store.jobs, before);

        store.load();
        assert_eq!(store.jobs, before);
    }

    #[test]
    fn create_sorts_by_send_time_and_clamps_endpoint() {
        let dir = TempDir::new().unwrap();
        let mut store = JobStore::new(dir.path());
        store.create(&draft("later", 300), 1_000).unwrap();
        store.create(&draft("sooner", 30), 1_000).unwrap();
        assert_eq!(store.jobs[0].text, "sooner");
        assert_eq!(store.jobs[1].text, "later");

        let mut wild = draft("wild", 60);
        wild.endpoint_index = 42;
        let job = store.create(&wild, 1_000).unwrap();
        assert_eq!(job.endpoint_index, 4);
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = JobStore::new(dir.path());
        let job = store.create(&draft("hi", 60), 1_000).unwrap();

        assert!(store.remove(&job.id).unwrap());
        assert!(!store.remove(&job.id).unwrap());
        assert!(!store.remove("never-existed").unwrap());
        assert!(store.jobs.is_empty());
    }

    #[test]
    fn garbage_input_degrades_to_empty() {
        for raw in [
            json!(null),
            json!("nope"),
            json!(17),
            json!({"version": 2}),
            json!([1, "two", null, {"id": 3}]),
            json!([{"id": "", "text": "x", "sendAt": 5}]),
            json!([{"id": "a", "text": "", "sendAt": 5}]),
            json!([{"id": "a", "text": "x", "sendAt": 0}]),
        ] {
            assert!(normalize_job_table(&raw).is_empty(), "raw: {raw}");
        }
    }

    #[test]
    fn oversized_table_is_capped() {
        let arr: Vec<Value> = (0..25)
            .map(|i| json!({"id": format!("j{i}"), "text": "x", "sendAt": 100 + i}))
            .collect();
        let jobs = normalize_job_table(&Value::Array(arr));
        assert_eq!(jobs.len(), JOB_CAPACITY);
        // Kept jobs are the soonest ones.
        assert_eq!(jobs[0].id, "j0");
        assert_eq!(jobs[9].id, "j9");
    }

    #[test]
    fn slot_table_generation_imports_only_scheduled_rows() {
        let raw = json!({
            "version": 1,
            "jobs": [
                {"status": "empty", "id": "", "text": "", "sendAt": 0, "delaySeconds": 0},
                {"status": "scheduled", "id": "a", "text": "hi", "webhookIndex": 2,
                 "sendAt": 500, "createdAt": 400, "delaySeconds": 100},
                {"status": "sent", "id": "b", "text": "old", "sendAt": 200},
                {"status": "canceled", "id": "c", "text": "gone", "sendAt": 300}
            ]
        });
        let jobs = normalize_job_table(&raw);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "a");
        assert_eq!(jobs[0].endpoint_index, 2);
        assert_eq!(jobs[0].send_at, 500);
    }

    #[test]
    fn dynamic_list_generation_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = JobStore::new(dir.path());
        store.create(&draft("keep me", 120), 2_000).unwrap();
        store.save().unwrap();

        let mut reread = JobStore::new(dir.path());
        reread.load();
        assert_eq!(reread.jobs, store.jobs);
        assert_eq!(reread.jobs[0].kind, JobKind::Scheduled);
    }

    #[test]
    fn bare_array_without_wrapper_is_accepted() {
        let raw = json!([
            {"id": "a", "text": "hi", "sendAt": 100, "kind": "reminder"},
            {"id": "b", "text": "yo", "sendAt": 50}
        ]);
        let jobs = normalize_job_table(&raw);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, "b");
        assert_eq!(jobs[1].kind, JobKind::Reminder);
    }
}
