//! Experiment console: export, reset, and a per-variant summary

use crate::error::{ExportError, ResetError, StoreError};
use crate::events::{EventRecord, EventRecorder, TrackedEvent};
use crate::form::FormCapture;
use crate::metrics::{format_rate, MetricsLedger, MetricsRecord};
use crate::storage::SharedStore;
use crate::surface::DisplaySurface;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// MIME type of the export artifact
pub const EXPORT_MIME: &str = "application/json";

/// Everything the experiment has recorded
///
/// Logs are carried exactly as stored, including entries this page would
/// not have written itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    /// Aggregate counters
    pub metrics: MetricsRecord,
    /// Event log in insertion order
    pub events: Vec<Value>,
    /// Waitlist submissions in insertion order
    pub submissions: Vec<Value>,
}

/// Receives the export artifact; stands in for a browser download
pub trait DownloadSink {
    /// Deliver `bytes` under `file_name`
    fn deliver(&mut self, file_name: &str, mime: &str, bytes: &[u8]) -> std::io::Result<()>;
}

/// Writes artifacts into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    last: Option<PathBuf>,
}

impl DirectorySink {
    /// Sink writing into `dir`, created on first delivery
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last: None,
        }
    }

    /// Path of the most recently delivered file
    #[must_use]
    pub fn last_path(&self) -> Option<&Path> {
        self.last.as_deref()
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&mut self, file_name: &str, _mime: &str, bytes: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)?;
        self.last = Some(path);
        Ok(())
    }
}

/// Funnel counts attributed to one variant key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStats {
    /// Page views
    pub views: u64,
    /// CTA clicks
    pub cta_clicks: u64,
    /// Waitlist submits
    pub submits: u64,
    /// `submits / views` as a one-decimal percentage
    pub rate: String,
}

/// Descriptive roll-up of the event log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSummary {
    /// Aggregate counters
    pub metrics: MetricsRecord,
    /// Aggregate conversion rate label
    pub conversion_rate: String,
    /// Events in the log
    pub total_events: usize,
    /// Submissions captured
    pub total_submissions: usize,
    /// Events with a type this page does not emit
    pub foreign_events: usize,
    /// Funnel per pricing key
    pub by_pricing: BTreeMap<String, VariantStats>,
    /// Funnel per messaging key
    pub by_message: BTreeMap<String, VariantStats>,
}

/// Export/reset/summary over the persisted experiment state
#[derive(Debug, Clone)]
pub struct ExperimentConsole {
    store: SharedStore,
    ledger: MetricsLedger,
    recorder: EventRecorder,
    capture: FormCapture,
    file_name: String,
}

impl ExperimentConsole {
    /// Console over the given components
    #[must_use]
    pub fn new(
        store: SharedStore,
        ledger: MetricsLedger,
        recorder: EventRecorder,
        capture: FormCapture,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            ledger,
            recorder,
            capture,
            file_name: file_name.into(),
        }
    }

    /// Current state, read fresh from the store
    pub fn bundle(&self) -> Result<ExportBundle, StoreError> {
        Ok(ExportBundle {
            metrics: self.ledger.read()?,
            events: self.recorder.read_raw()?,
            submissions: self.capture.read_raw()?,
        })
    }

    /// Current state as pretty-printed JSON
    pub fn export_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(&self.bundle()?)?)
    }

    /// Serialize current state and hand it to `sink` under the fixed name
    pub fn export_all(&self, sink: &mut dyn DownloadSink) -> Result<ExportBundle, ExportError> {
        let bundle = self.bundle()?;
        let json = serde_json::to_string_pretty(&bundle)?;
        sink.deliver(&self.file_name, EXPORT_MIME, json.as_bytes())
            .map_err(|source| ExportError::Delivery {
                file_name: self.file_name.clone(),
                source,
            })?;
        tracing::info!(
            file = %self.file_name,
            events = bundle.events.len(),
            submissions = bundle.submissions.len(),
            "experiment exported"
        );
        Ok(bundle)
    }

    /// Clear metrics, events, and submissions, then repaint the summary
    ///
    /// Values are snapshotted first. If a deletion fails, keys already
    /// cleared are restored and [`ResetError::PartialReset`] names any key
    /// that could not be restored. Assignments are left alone.
    pub fn reset_all(&self, display: &mut dyn DisplaySurface) -> Result<(), ResetError> {
        let keys = [self.ledger.key(), self.recorder.key(), self.capture.key()];

        let mut snapshot = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.store.get(key).map_err(ResetError::Snapshot)?;
            snapshot.push((key, value));
        }

        for (index, (key, _)) in snapshot.iter().enumerate() {
            if let Err(source) = self.store.remove(key) {
                let rollback_failures = self.restore(&snapshot[..index]);
                tracing::error!(key, error = %source, ?rollback_failures, "reset aborted");
                return Err(ResetError::PartialReset {
                    failed_key: (*key).to_string(),
                    source,
                    rollback_failures,
                });
            }
        }

        if let Err(e) = self.ledger.render(display) {
            tracing::warn!(error = %e, "could not repaint metrics after reset");
        }
        tracing::info!("experiment state reset");
        Ok(())
    }

    fn restore(&self, cleared: &[(&str, Option<String>)]) -> Vec<String> {
        cleared
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (*key, v)))
            .filter(|(key, value)| self.store.set(key, value).is_err())
            .map(|(key, _)| key.to_string())
            .collect()
    }

    /// Per-variant roll-up of the current log
    ///
    /// Page views carry both keys. CTA clicks carry neither, so they are
    /// attributed to the most recent page view before them; submits use
    /// their own pricing key when present.
    pub fn summary(&self) -> Result<ExperimentSummary, StoreError> {
        let bundle = self.bundle()?;
        let mut by_pricing: BTreeMap<String, VariantStats> = BTreeMap::new();
        let mut by_message: BTreeMap<String, VariantStats> = BTreeMap::new();
        let mut foreign_events = 0;
        let mut current: Option<(String, String)> = None;

        for raw in &bundle.events {
            match EventRecord::from_value(raw).and_then(|record| record.decode()) {
                Some(TrackedEvent::PageView { variant, message }) => {
                    by_pricing.entry(variant.clone()).or_default().views += 1;
                    by_message.entry(message.clone()).or_default().views += 1;
                    current = Some((variant, message));
                }
                Some(TrackedEvent::CtaClick { .. }) => {
                    if let Some((variant, message)) = &current {
                        by_pricing.entry(variant.clone()).or_default().cta_clicks += 1;
                        by_message.entry(message.clone()).or_default().cta_clicks += 1;
                    }
                }
                Some(TrackedEvent::WaitlistSubmit { variant }) => {
                    let pricing = variant.or_else(|| current.as_ref().map(|(v, _)| v.clone()));
                    if let Some(pricing) = pricing {
                        by_pricing.entry(pricing).or_default().submits += 1;
                    }
                    if let Some((_, message)) = &current {
                        by_message.entry(message.clone()).or_default().submits += 1;
                    }
                }
                None => foreign_events += 1,
            }
        }

        for stats in by_pricing.values_mut().chain(by_message.values_mut()) {
            stats.rate = MetricsRecord {
                views: stats.views,
                cta_clicks: stats.cta_clicks,
                submits: stats.submits,
            }
            .conversion_rate_label();
        }

        Ok(ExperimentSummary {
            conversion_rate: format_rate(bundle.metrics.conversion_rate()),
            metrics: bundle.metrics,
            total_events: bundle.events.len(),
            total_submissions: bundle.submissions.len(),
            foreign_events,
            by_pricing,
            by_message,
        })
    }

    /// Fixed export file name
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}
