//! Event recorder
//!
//! Append-only log of tracked actions, persisted as one JSON array. Each
//! append re-reads the array, pushes one timestamped record, and rewrites
//! the whole array with earlier entries exactly as they were stored. The log
//! is never trimmed or rotated, so it grows with every tracked action until
//! a console reset.
//!
//! The typed view is lenient: a `null` or missing payload reads as empty and
//! a missing or unparseable timestamp reads as `None`.

use crate::capability::SharedClock;
use crate::error::StoreError;
use crate::storage::{append_json, read_json_array, SharedStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One persisted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event type tag
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    /// Small structured payload
    #[serde(default, deserialize_with = "lenient_object")]
    pub payload: Map<String, Value>,
    /// When it was recorded
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub at: Option<DateTime<Utc>>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_object<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_str()
        .and_then(|s| s.parse().ok()))
}

impl EventRecord {
    /// Typed view of one stored entry, `None` unless it is a JSON object
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Self::deserialize(value).ok()
    }

    /// Decode into a known event, `None` for foreign types or shapes
    #[must_use]
    pub fn decode(&self) -> Option<TrackedEvent> {
        let tagged = serde_json::json!({
            "type": self.kind,
            "payload": self.payload,
        });
        serde_json::from_value(tagged).ok()
    }
}

/// Events the landing page emits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TrackedEvent {
    /// Page loaded with both assignments resolved
    PageView {
        /// Pricing key
        variant: String,
        /// Messaging key
        message: String,
    },
    /// Call-to-action clicked
    CtaClick {
        /// CTA identifier from the page markup
        cta: String,
    },
    /// Waitlist form submitted
    WaitlistSubmit {
        /// Pricing key captured with the submission
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variant: Option<String>,
    },
}

impl TrackedEvent {
    /// Type tag as persisted
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TrackedEvent::PageView { .. } => "page_view",
            TrackedEvent::CtaClick { .. } => "cta_click",
            TrackedEvent::WaitlistSubmit { .. } => "waitlist_submit",
        }
    }

    /// Payload map as persisted
    #[must_use]
    pub fn payload(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            TrackedEvent::PageView { variant, message } => {
                map.insert("variant".to_string(), Value::from(variant.as_str()));
                map.insert("message".to_string(), Value::from(message.as_str()));
            }
            TrackedEvent::CtaClick { cta } => {
                map.insert("cta".to_string(), Value::from(cta.as_str()));
            }
            TrackedEvent::WaitlistSubmit { variant } => {
                if let Some(variant) = variant {
                    map.insert("variant".to_string(), Value::from(variant.as_str()));
                }
            }
        }
        map
    }
}

/// Appends timestamped events to the persisted log
#[derive(Debug, Clone)]
pub struct EventRecorder {
    store: SharedStore,
    key: String,
    clock: SharedClock,
}

impl EventRecorder {
    /// Recorder for the log stored under `key`
    #[inline]
    #[must_use]
    pub fn new(store: SharedStore, key: impl Into<String>, clock: SharedClock) -> Self {
        Self {
            store,
            key: key.into(),
            clock,
        }
    }

    /// Append an arbitrary typed event
    pub fn record(
        &self,
        kind: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Result<EventRecord, StoreError> {
        let record = EventRecord {
            kind: kind.into(),
            payload,
            at: Some(self.clock.now()),
        };
        let total = append_json(self.store.as_ref(), &self.key, &record)?;
        tracing::debug!(kind = %record.kind, total, "event recorded");
        Ok(record)
    }

    /// Append one of the page's known events
    pub fn record_event(&self, event: &TrackedEvent) -> Result<EventRecord, StoreError> {
        self.record(event.kind(), event.payload())
    }

    /// Stored entries exactly as persisted, in insertion order
    pub fn read_raw(&self) -> Result<Vec<Value>, StoreError> {
        read_json_array(self.store.as_ref(), &self.key)
    }

    /// Typed log in insertion order; entries that are not objects are skipped
    pub fn read_all(&self) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self
            .read_raw()?
            .iter()
            .filter_map(EventRecord::from_value)
            .collect())
    }

    /// Remove the persisted log
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }

    /// Storage key of this log
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::SystemClock;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    const KEY: &str = "mergeguard_events";

    fn recorder(store: Arc<MemoryStore>) -> EventRecorder {
        EventRecorder::new(store, KEY, Arc::new(SystemClock))
    }

    #[test]
    fn page_view_payload_shape() {
        let event = TrackedEvent::PageView {
            variant: "b".to_string(),
            message: "speed".to_string(),
        };
        assert_eq!(event.kind(), "page_view");
        assert_eq!(
            Value::Object(event.payload()),
            serde_json::json!({"variant": "b", "message": "speed"})
        );
    }

    #[test]
    fn decode_known_and_foreign_events() {
        let store = Arc::new(MemoryStore::new());
        let rec = recorder(store);

        let known = rec
            .record_event(&TrackedEvent::CtaClick {
                cta: "hero".to_string(),
            })
            .unwrap();
        assert_eq!(
            known.decode(),
            Some(TrackedEvent::CtaClick {
                cta: "hero".to_string()
            })
        );

        let foreign = rec.record("scroll_depth", Map::new()).unwrap();
        assert_eq!(foreign.decode(), None);
    }

    #[test]
    fn submit_without_variant_omits_field() {
        let event = TrackedEvent::WaitlistSubmit { variant: None };
        assert!(event.payload().is_empty());

        let record = EventRecord {
            kind: event.kind().to_string(),
            payload: event.payload(),
            at: Some(Utc::now()),
        };
        assert_eq!(record.decode(), Some(event));
    }

    #[test]
    fn corrupt_log_restarts_empty() {
        let store = Arc::new(MemoryStore::with_entries([(KEY, "not an array")]));
        let rec = recorder(store);
        assert!(rec.read_all().unwrap().is_empty());

        rec.record("page_view", Map::new()).unwrap();
        assert_eq!(rec.read_all().unwrap().len(), 1);
    }

    #[test]
    fn persisted_shape() {
        let store = Arc::new(MemoryStore::new());
        let rec = recorder(store.clone());
        rec.record_event(&TrackedEvent::CtaClick {
            cta: "pricing".to_string(),
        })
        .unwrap();

        let raw: Value = serde_json::from_str(&store.get(KEY).unwrap().unwrap()).unwrap();
        let first = &raw[0];
        assert_eq!(first["type"], "cta_click");
        assert_eq!(first["payload"], serde_json::json!({"cta": "pricing"}));
        assert!(first["at"].is_string());
    }

    #[test]
    fn off_shape_entries_survive_an_append() {
        let stored = r#"[{"type":"page_view","payload":{"variant":"a","message":"clarity"},"at":"2026-01-01T00:00:00Z"},{"type":"cta_click","payload":null},7]"#;
        let store = Arc::new(MemoryStore::with_entries([(KEY, stored)]));
        let rec = recorder(store);

        rec.record_event(&TrackedEvent::CtaClick {
            cta: "hero".to_string(),
        })
        .unwrap();

        let raw = rec.read_raw().unwrap();
        assert_eq!(raw.len(), 4);
        assert_eq!(raw[1], serde_json::json!({"type": "cta_click", "payload": null}));
        assert_eq!(raw[2], serde_json::json!(7));

        let typed = rec.read_all().unwrap();
        assert_eq!(typed.len(), 3);
        assert!(typed[1].payload.is_empty());
        assert_eq!(typed[1].at, None);
        assert_eq!(typed[2].payload["cta"], "hero");
    }
}
