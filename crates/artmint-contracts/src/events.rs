use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

const OMITTED: &str = "<omitted>";
const REDACTED: &str = "<redacted>";

/// Append-only JSONL log of workflow stage transitions.
///
/// Every line carries `type`, `session_id` and `ts`; those keys cannot be
/// overridden by the payload. Image bytes and credential-looking keys are
/// scrubbed before anything touches disk.
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: Arc<PathBuf>,
    session_id: Arc<str>,
    lock: Arc<Mutex<()>>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl AsRef<str>) -> Self {
        Self {
            path: Arc::new(path.into()),
            session_id: Arc::from(session_id.as_ref()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Writer for another session on the same file and lock.
    pub fn for_session(&self, session_id: impl AsRef<str>) -> Self {
        Self {
            path: Arc::clone(&self.path),
            session_id: Arc::from(session_id.as_ref()),
            lock: Arc::clone(&self.lock),
        }
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let event = Value::Object(self.record(event_type, payload));
        self.append(&event)?;
        Ok(event)
    }

    fn record(&self, event_type: &str, payload: EventPayload) -> EventPayload {
        let mut event: EventPayload = payload
            .into_iter()
            .map(|(key, value)| {
                let value = scrub(&key, value);
                (key, value)
            })
            .collect();
        event.insert("type".to_string(), Value::from(event_type));
        event.insert("session_id".to_string(), Value::from(self.session_id()));
        event.insert(
            "ts".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        event
    }

    fn append(&self, event: &Value) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .with_context(|| format!("failed to append to {}", self.path.display()))
    }
}

fn scrub(key: &str, value: Value) -> Value {
    let lowered = key.to_ascii_lowercase();
    if matches!(lowered.as_str(), "bytes" | "image_bytes" | "data") {
        return Value::from(OMITTED);
    }
    if is_secret_key(&lowered) {
        return Value::from(REDACTED);
    }
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    let value = scrub(&key, value);
                    (key, value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(_) => scrub("", item),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

fn is_secret_key(lowered: &str) -> bool {
    lowered == "authorization"
        || lowered.ends_with("token")
        || lowered.ends_with("api_key")
        || lowered.ends_with("secret")
}
