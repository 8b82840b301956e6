use serde::{Deserialize, Serialize};

/// Hard ceiling on live jobs; the create path rejects the 11th.
pub const JOB_CAPACITY: usize = 10;
pub const MIN_DELAY_SECS: i64 = 10;
pub const REMINDER_DELAY_SECS: i64 = 60;
pub const REMINDER_PREFIX: &str = "@everyone Reminder: ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    #[default]
    Scheduled,
    /// System-generated follow-up to an immediate send.
    Reminder,
}

/// One pending scheduled message. Terminal jobs are removed from the table
/// rather than marked, so every persisted job is live. Field names keep the
/// historical camelCase store spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub text: String,
    #[serde(rename = "webhookIndex", default)]
    pub endpoint_index: usize,
    #[serde(default)]
    pub kind: JobKind,
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
    #[serde(rename = "sendAt")]
    pub send_at: i64,
}

impl Job {
    /// Derived, never persisted.
    pub fn remaining_secs(&self, now: i64) -> i64 {
        (self.send_at - now).max(0)
    }
}

/// What a collaborator submits to schedule a message; the coordinator mints
/// the id and absolute fire instant.
#[derive(Debug, Clone)]
pub struct JobDraft {
    pub text: String,
    pub endpoint_index: usize,
    pub kind: JobKind,
    pub delay_secs: i64,
}

impl JobDraft {
    /// The +60s echo that follows an immediate send.
    pub fn reminder(text: &str, endpoint_index: usize) -> Self {
        Self {
            text: format!("{REMINDER_PREFIX}{text}"),
            endpoint_index,
            kind: JobKind::Reminder,
            delay_secs: REMINDER_DELAY_SECS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobStoreData {
    pub version: i32,
    pub jobs: Vec<Job>,
}
