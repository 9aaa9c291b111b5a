//! Metrics ledger
//!
//! Aggregate funnel counters persisted as one JSON record. Every increment is
//! a full read-modify-write; the single-threaded page model makes that
//! sequence atomic relative to other handlers. Separate processes or tabs
//! sharing a store are not coordinated (last write wins).

use crate::error::StoreError;
use crate::render;
use crate::storage::{read_json, write_json, SharedStore};
use crate::surface::DisplaySurface;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Aggregate counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsRecord {
    /// Page views
    pub views: u64,
    /// Call-to-action clicks
    pub cta_clicks: u64,
    /// Waitlist submissions
    pub submits: u64,
}

impl MetricsRecord {
    /// The zero record
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            views: 0,
            cta_clicks: 0,
            submits: 0,
        }
    }

    /// Value of one counter
    #[must_use]
    pub fn get(&self, field: MetricField) -> u64 {
        match field {
            MetricField::Views => self.views,
            MetricField::CtaClicks => self.cta_clicks,
            MetricField::Submits => self.submits,
        }
    }

    fn bump(&mut self, field: MetricField) {
        let slot = match field {
            MetricField::Views => &mut self.views,
            MetricField::CtaClicks => &mut self.cta_clicks,
            MetricField::Submits => &mut self.submits,
        };
        *slot = slot.saturating_add(1);
    }

    /// `submits / views` as a fraction, 0 when there are no views
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn conversion_rate(&self) -> f64 {
        if self.views == 0 {
            0.0
        } else {
            self.submits as f64 / self.views as f64
        }
    }

    /// Conversion rate as a percentage with one decimal, e.g. `25.0%`
    #[must_use]
    pub fn conversion_rate_label(&self) -> String {
        format_rate(self.conversion_rate())
    }

    /// Counters from a stored object; each field is read on its own
    ///
    /// A field that is missing, `null`, or not a count reads as 0 without
    /// disturbing the others.
    #[must_use]
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let count = |field: MetricField| object.get(field.key()).map_or(0, lenient_count);
        Self {
            views: count(MetricField::Views),
            cta_clicks: count(MetricField::CtaClicks),
            submits: count(MetricField::Submits),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_count(value: &Value) -> u64 {
    let from_float = |f: f64| if f.is_finite() && f > 0.0 { f as u64 } else { 0 };
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(from_float)).unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map_or(0, from_float),
        Value::Bool(b) => u64::from(*b),
        _ => 0,
    }
}

/// Format a fraction as a one-decimal percentage, halves rounding up
#[must_use]
pub fn format_rate(fraction: f64) -> String {
    let tenths = (fraction * 1000.0).round() / 10.0;
    format!("{tenths:.1}%")
}

/// Counter names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricField {
    /// Page views
    Views,
    /// Call-to-action clicks
    CtaClicks,
    /// Waitlist submissions
    Submits,
}

impl MetricField {
    /// JSON key of this counter
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            MetricField::Views => "views",
            MetricField::CtaClicks => "ctaClicks",
            MetricField::Submits => "submits",
        }
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Persisted counters with read/increment/reset
#[derive(Debug, Clone)]
pub struct MetricsLedger {
    store: SharedStore,
    key: String,
}

impl MetricsLedger {
    /// Ledger stored under `key`
    #[inline]
    #[must_use]
    pub fn new(store: SharedStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Current counters; missing or corrupt data reads as the zero record
    pub fn read(&self) -> Result<MetricsRecord, StoreError> {
        Ok(match read_json(self.store.as_ref(), &self.key)? {
            Some(Value::Object(object)) => MetricsRecord::from_object(&object),
            Some(_) | None => MetricsRecord::zero(),
        })
    }

    /// Persist the full record
    pub fn write(&self, record: &MetricsRecord) -> Result<(), StoreError> {
        write_json(self.store.as_ref(), &self.key, record)
    }

    /// Add exactly one to `field`, persist, and repaint the summary
    pub fn increment(
        &self,
        field: MetricField,
        display: &mut dyn DisplaySurface,
    ) -> Result<MetricsRecord, StoreError> {
        let mut record = self.read()?;
        record.bump(field);
        self.write(&record)?;
        tracing::debug!(%field, value = record.get(field), "metric incremented");
        render::paint_metrics(&record, display);
        Ok(record)
    }

    /// Repaint the summary from persisted state
    pub fn render(&self, display: &mut dyn DisplaySurface) -> Result<MetricsRecord, StoreError> {
        let record = self.read()?;
        render::paint_metrics(&record, display);
        Ok(record)
    }

    /// Remove the persisted record
    pub fn reset(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key)
    }

    /// Storage key of this ledger
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::surface::{Region, RegionMap};
    use std::sync::Arc;

    const KEY: &str = "mergeguard_metrics";

    #[test]
    fn rate_labels() {
        assert_eq!(MetricsRecord::zero().conversion_rate_label(), "0.0%");
        let r = MetricsRecord {
            views: 4,
            cta_clicks: 0,
            submits: 1,
        };
        assert_eq!(r.conversion_rate_label(), "25.0%");
        let r = MetricsRecord {
            views: 3,
            cta_clicks: 0,
            submits: 2,
        };
        assert_eq!(r.conversion_rate_label(), "66.7%");
        let r = MetricsRecord {
            views: 16,
            cta_clicks: 0,
            submits: 1,
        };
        assert_eq!(r.conversion_rate_label(), "6.3%");
        assert_eq!(format_rate(0.0005), "0.1%");
        assert_eq!(format_rate(0.00049), "0.0%");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let r = MetricsRecord {
            views: 1,
            cta_clicks: 2,
            submits: 3,
        };
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            r#"{"views":1,"ctaClicks":2,"submits":3}"#
        );
    }

    #[test]
    fn partial_record_fills_missing_fields() {
        let store = Arc::new(MemoryStore::with_entries([(KEY, r#"{"views":5}"#)]));
        let ledger = MetricsLedger::new(store, KEY);
        assert_eq!(
            ledger.read().unwrap(),
            MetricsRecord {
                views: 5,
                cta_clicks: 0,
                submits: 0
            }
        );
    }

    #[test]
    fn off_shape_counter_keeps_the_others() {
        let store = Arc::new(MemoryStore::with_entries([(
            KEY,
            r#"{"views":7,"ctaClicks":null,"submits":"2"}"#,
        )]));
        let ledger = MetricsLedger::new(store.clone(), KEY);
        assert_eq!(
            ledger.read().unwrap(),
            MetricsRecord {
                views: 7,
                cta_clicks: 0,
                submits: 2
            }
        );

        ledger
            .increment(MetricField::CtaClicks, &mut RegionMap::new())
            .unwrap();
        assert_eq!(
            store.get(KEY).unwrap().as_deref(),
            Some(r#"{"views":7,"ctaClicks":1,"submits":2}"#)
        );
    }

    #[test]
    fn non_object_record_reads_as_zero() {
        let store = Arc::new(MemoryStore::with_entries([(KEY, "[1,2,3]")]));
        let ledger = MetricsLedger::new(store, KEY);
        assert_eq!(ledger.read().unwrap(), MetricsRecord::zero());
    }

    #[test]
    fn corrupt_record_reads_as_zero() {
        let store = Arc::new(MemoryStore::with_entries([(KEY, "{{{")]));
        let ledger = MetricsLedger::new(store, KEY);
        assert_eq!(ledger.read().unwrap(), MetricsRecord::zero());
    }

    #[test]
    fn increment_persists_and_repaints() {
        let store = Arc::new(MemoryStore::new());
        let ledger = MetricsLedger::new(store.clone(), KEY);
        let mut display = RegionMap::new();

        ledger.increment(MetricField::Views, &mut display).unwrap();
        ledger.increment(MetricField::Views, &mut display).unwrap();
        let after = ledger.increment(MetricField::Submits, &mut display).unwrap();

        assert_eq!(after.views, 2);
        assert_eq!(after.submits, 1);
        assert_eq!(
            store.get(KEY).unwrap().as_deref(),
            Some(r#"{"views":2,"ctaClicks":0,"submits":1}"#)
        );
        assert_eq!(display.text(Region::MetricRate), Some("50.0%"));
    }

    #[test]
    fn reset_returns_to_zero() {
        let store = Arc::new(MemoryStore::new());
        let ledger = MetricsLedger::new(store.clone(), KEY);
        let mut display = RegionMap::new();
        ledger.increment(MetricField::CtaClicks, &mut display).unwrap();

        ledger.reset().unwrap();
        assert_eq!(store.get(KEY).unwrap(), None);
        assert_eq!(ledger.read().unwrap(), MetricsRecord::zero());
    }
}
