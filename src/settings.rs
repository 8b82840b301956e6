//! Persisted settings: the endpoint table, the last-used endpoint index and
//! the quick-action presets.
//!
//! Loading is raw-first: the file is parsed as loose JSON and every key is
//! normalized independently, so a malformed or legacy-shaped file degrades to
//! defaults instead of failing. Saving is all-or-nothing: every endpoint slot
//! must validate before anything is written.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

pub const ENDPOINT_SLOTS: usize = 5;
pub const QUICK_ACTION_SLOTS: usize = 9;

const ALLOWED_HOSTS: [&str; 2] = ["discord.com", "discordapp.com"];
const REQUIRED_PATH_PREFIX: &str = "/api/webhooks/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAction {
    pub label: String,
    pub message: String,
    #[serde(rename = "webhookIndex")]
    pub endpoint_index: usize,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoints: Vec<Endpoint>,
    pub last_index: usize,
    pub quick_actions: Vec<QuickAction>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoints: vec![Endpoint::default(); ENDPOINT_SLOTS],
            last_index: 0,
            quick_actions: (0..QUICK_ACTION_SLOTS).map(default_quick_action).collect(),
        }
    }
}

fn default_quick_action(i: usize) -> QuickAction {
    QuickAction {
        label: format!("{}", i + 1),
        message: String::new(),
        endpoint_index: 0,
    }
}

pub fn clamp_endpoint_index(i: usize) -> usize {
    i.min(ENDPOINT_SLOTS - 1)
}

/// Display label for a slot: the configured name or `Endpoint {i+1}`, with a
/// check mark when the URL is set.
pub fn endpoint_label(index: usize, endpoint: &Endpoint) -> String {
    let base = if endpoint.name.is_empty() {
        format!("Endpoint {}", index + 1)
    } else {
        endpoint.name.clone()
    };
    if endpoint.url.is_empty() {
        base
    } else {
        format!("{base} ✓")
    }
}

/// An empty URL marks an intentionally unset slot and is valid. A non-empty
/// URL must be HTTPS, point at an allowed host and carry the webhook path
/// prefix.
pub fn validate_endpoint_url(url: &str) -> bool {
    if url.is_empty() {
        return true;
    }
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    parsed.scheme() == "https"
        && ALLOWED_HOSTS.contains(&host)
        && parsed.path().starts_with(REQUIRED_PATH_PREFIX)
}

/// Accepts the current `{name, url}` object shape or the legacy bare-URL
/// string shape per slot; anything else becomes the empty endpoint. Always
/// returns exactly [`ENDPOINT_SLOTS`] entries.
pub fn normalize_endpoints(raw: &Value) -> Vec<Endpoint> {
    let mut out = Vec::with_capacity(ENDPOINT_SLOTS);
    let arr = raw.as_array();
    for i in 0..ENDPOINT_SLOTS {
        let entry = arr.and_then(|a| a.get(i));
        out.push(match entry {
            Some(Value::String(url)) => Endpoint {
                name: String::new(),
                url: url.trim().to_string(),
            },
            Some(Value::Object(obj)) => Endpoint {
                name: str_field(obj, "name"),
                url: str_field(obj, "url"),
            },
            _ => Endpoint::default(),
        });
    }
    out
}

/// Always returns exactly [`QUICK_ACTION_SLOTS`] entries; unset labels fall
/// back to the 1-based slot number.
pub fn normalize_quick_actions(raw: &Value) -> Vec<QuickAction> {
    let mut out = Vec::with_capacity(QUICK_ACTION_SLOTS);
    let arr = raw.as_array();
    for i in 0..QUICK_ACTION_SLOTS {
        let entry = arr.and_then(|a| a.get(i)).and_then(|v| v.as_object());
        out.push(match entry {
            Some(obj) => {
                let label = str_field(obj, "label");
                QuickAction {
                    label: if label.is_empty() {
                        format!("{}", i + 1)
                    } else {
                        label
                    },
                    message: str_field(obj, "message"),
                    endpoint_index: index_field(obj, "webhookIndex"),
                }
            }
            None => default_quick_action(i),
        });
    }
    out
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn index_field(obj: &serde_json::Map<String, Value>, key: &str) -> usize {
    obj.get(key)
        .and_then(|v| v.as_u64())
        .map(|n| clamp_endpoint_index(n as usize))
        .unwrap_or(0)
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("settings.json"),
        }
    }

    /// Load and normalize. Never fails: a missing or malformed file degrades
    /// to defaults.
    pub fn load(&self) -> Settings {
        let raw = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Settings::default(),
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("malformed settings at {}: {e}", self.path.display());
                return Settings::default();
            }
        };

        Settings {
            endpoints: normalize_endpoints(value.get("webhooks").unwrap_or(&Value::Null)),
            last_index: value
                .get("lastWebhookIndex")
                .and_then(|v| v.as_u64())
                .map(|n| clamp_endpoint_index(n as usize))
                .unwrap_or(0),
            quick_actions: normalize_quick_actions(
                value.get("quickActions").unwrap_or(&Value::Null),
            ),
        }
    }

    /// Validate every endpoint slot, then persist the whole settings object.
    /// No partial save: the first invalid slot aborts with its 1-based index.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        for (i, endpoint) in settings.endpoints.iter().enumerate().take(ENDPOINT_SLOTS) {
            if !validate_endpoint_url(endpoint.url.trim()) {
                return Err(anyhow!(
                    "endpoint {} is not a valid Discord webhook URL",
                    i + 1
                ));
            }
        }

        let value = json!({
            "webhooks": settings.endpoints,
            "lastWebhookIndex": clamp_endpoint_index(settings.last_index),
            "quickActions": settings.quick_actions,
        });

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&value)?)?;
        Ok(())
    }

    /// Persist a new last-used index, leaving everything else untouched.
    pub fn save_last_index(&self, index: usize) -> Result<()> {
        let mut settings = self.load();
        settings.last_index = clamp_endpoint_index(index);
        self.save(&settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_url_is_valid() {
        assert!(validate_endpoint_url(""));
    }

    #[test]
    fn discord_webhook_url_is_valid() {
        assert!(validate_endpoint_url("https://discord.com/api/webhooks/1/x"));
        assert!(validate_endpoint_url(
            "https://discordapp.com/api/webhooks/123/abc"
        ));
    }

    #[test]
    fn wrong_scheme_host_or_path_is_rejected() {
        assert!(!validate_endpoint_url("http://example.com/x"));
        assert!(!validate_endpoint_url("http://discord.com/api/webhooks/1/x"));
        assert!(!validate_endpoint_url("https://evil.com/api/webhooks/1/x"));
        assert!(!validate_endpoint_url("https://discord.com/other/1/x"));
        assert!(!validate_endpoint_url("not a url"));
    }

    #[test]
    fn legacy_string_entries_are_wrapped() {
        let raw = json!(["https://discord.com/api/webhooks/1/a", 42, null]);
        let endpoints = normalize_endpoints(&raw);
        assert_eq!(endpoints.len(), ENDPOINT_SLOTS);
        assert_eq!(endpoints[0].url, "https://discord.com/api/webhooks/1/a");
        assert_eq!(endpoints[0].name, "");
        assert_eq!(endpoints[1], Endpoint::default());
        assert_eq!(endpoints[4], Endpoint::default());
    }

    #[test]
    fn garbage_endpoint_input_degrades_to_empty_table() {
        for raw in [json!(null), json!("nope"), json!({"a": 1}), json!(7)] {
            let endpoints = normalize_endpoints(&raw);
            assert_eq!(endpoints.len(), ENDPOINT_SLOTS);
            assert!(endpoints.iter().all(|e| e.name.is_empty() && e.url.is_empty()));
        }
    }

    #[test]
    fn quick_actions_fill_defaults() {
        let raw = json!([{"label": "", "message": "ping", "webhookIndex": 99}]);
        let actions = normalize_quick_actions(&raw);
        assert_eq!(actions.len(), QUICK_ACTION_SLOTS);
        assert_eq!(actions[0].label, "1");
        assert_eq!(actions[0].message, "ping");
        assert_eq!(actions[0].endpoint_index, ENDPOINT_SLOTS - 1);
        assert_eq!(actions[8].label, "9");
        assert!(actions[8].message.is_empty());
    }

    #[test]
    fn save_rejects_invalid_slot_by_one_based_index() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        let mut settings = Settings::default();
        settings.endpoints[2].url = "http://example.com/x".to_string();

        let err = store.save(&settings).unwrap_err();
        assert!(err.to_string().contains("endpoint 3"), "got: {err}");
        assert!(!dir.path().join("settings.json").exists());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        let mut settings = Settings::default();
        settings.endpoints[0] = Endpoint {
            name: "ops".to_string(),
            url: "https://discord.com/api/webhooks/123/abc".to_string(),
        };
        settings.last_index = 3;
        settings.quick_actions[1].message = "standup".to_string();

        store.save(&settings).unwrap();
        let loaded = store.load();
        assert_eq!(loaded.endpoints[0], settings.endpoints[0]);
        assert_eq!(loaded.last_index, 3);
        assert_eq!(loaded.quick_actions[1].message, "standup");
    }

    #[test]
    fn load_of_missing_or_broken_file_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.load().endpoints.len(), ENDPOINT_SLOTS);

        fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        let loaded = store.load();
        assert_eq!(loaded.endpoints.len(), ENDPOINT_SLOTS);
        assert_eq!(loaded.last_index, 0);
    }

    #[test]
    fn labels_fall_back_to_slot_number() {
        let unset = Endpoint::default();
        assert_eq!(endpoint_label(0, &unset), "Endpoint 1");
        let named = Endpoint {
            name: "ops".to_string(),
            url: "https://discord.com/api/webhooks/1/x".to_string(),
        };
        assert_eq!(endpoint_label(4, &named), "ops ✓");
    }
}
