//! Waitlist form capture
//!
//! Turns a submit into: a persisted submission record, a `submits`
//! increment, a `waitlist_submit` event, a confirmation message, and a
//! cleared form. Repeated submits are never deduplicated; each one is an
//! independent pilot request.

use crate::capability::SharedClock;
use crate::catalog::PRICING_FORM_FIELD;
use crate::error::StoreError;
use crate::events::{EventRecorder, TrackedEvent};
use crate::metrics::{MetricField, MetricsLedger};
use crate::storage::{append_json, read_json_array, SharedStore};
use crate::surface::{DisplaySurface, FormSurface, Region};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Name of the timestamp appended to every submission
pub const SUBMITTED_AT_FIELD: &str = "submittedAt";

/// One captured submission: the raw form fields plus a timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    /// Form fields in form order
    #[serde(flatten)]
    pub fields: IndexMap<String, String>,
    /// When it was captured
    #[serde(rename = "submittedAt", skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl SubmissionRecord {
    /// Typed view of one stored entry, `None` unless it is a JSON object
    ///
    /// Non-string field values keep their JSON text; `null` fields are
    /// dropped. A missing or unparseable `submittedAt` reads as `None`.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut fields = IndexMap::with_capacity(object.len());
        let mut submitted_at = None;
        for (name, value) in object {
            if name == SUBMITTED_AT_FIELD {
                submitted_at = value.as_str().and_then(|s| s.parse().ok());
                continue;
            }
            match value {
                Value::Null => {}
                Value::String(s) => {
                    fields.insert(name.clone(), s.clone());
                }
                other => {
                    fields.insert(name.clone(), other.to_string());
                }
            }
        }
        Some(Self {
            fields,
            submitted_at,
        })
    }

    /// Value of one field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Host submit event; capture always cancels the default navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitEvent {
    default_prevented: bool,
}

impl SubmitEvent {
    /// Fresh, uncancelled event
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the host's default page navigation
    #[inline]
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Whether navigation was cancelled
    #[inline]
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Captures waitlist submissions
#[derive(Debug, Clone)]
pub struct FormCapture {
    store: SharedStore,
    key: String,
    ledger: MetricsLedger,
    recorder: EventRecorder,
    clock: SharedClock,
    confirmation: String,
}

impl FormCapture {
    /// Capture into the submissions log stored under `key`
    #[must_use]
    pub fn new(
        store: SharedStore,
        key: impl Into<String>,
        ledger: MetricsLedger,
        recorder: EventRecorder,
        clock: SharedClock,
        confirmation: impl Into<String>,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            ledger,
            recorder,
            clock,
            confirmation: confirmation.into(),
        }
    }

    /// Handle one submit
    ///
    /// `assigned_variant` is the page's pricing key; it is reported in the
    /// event when the form's hidden field is missing or empty.
    pub fn submit(
        &self,
        form: &mut dyn FormSurface,
        event: &mut SubmitEvent,
        display: &mut dyn DisplaySurface,
        assigned_variant: Option<&str>,
    ) -> Result<SubmissionRecord, StoreError> {
        event.prevent_default();

        let mut fields: IndexMap<String, String> = form.entries().into_iter().collect();
        fields.shift_remove(SUBMITTED_AT_FIELD);
        let record = SubmissionRecord {
            fields,
            submitted_at: Some(self.clock.now()),
        };
        let total = append_json(self.store.as_ref(), &self.key, &record)?;

        self.ledger.increment(MetricField::Submits, display)?;

        let variant = record
            .field(PRICING_FORM_FIELD)
            .filter(|v| !v.is_empty())
            .or(assigned_variant)
            .map(str::to_string);
        self.recorder
            .record_event(&TrackedEvent::WaitlistSubmit { variant })?;

        display.set_text(Region::FormStatus, &self.confirmation);
        form.clear_inputs();

        tracing::info!(total, "waitlist submission captured");
        Ok(record)
    }

    /// Stored submissions exactly as persisted, in insertion order
    pub fn read_raw(&self) -> Result<Vec<Value>, StoreError> {
        read_json_array(self.store.as_ref(), &self.key)
    }

    /// Typed submissions log; entries that are not objects are skipped
    pub fn read_all(&self) -> Result<Vec<SubmissionRecord>, StoreError> {
        Ok(self
            .read_raw()?
            .iter()
            .filter_map(SubmissionRecord::from_value)
            .collect())
    }

    /// Remove the persisted submissions log
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }

    /// Storage key of the submissions log
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}
