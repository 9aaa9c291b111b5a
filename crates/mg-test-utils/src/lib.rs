//! Testing utilities for the MergeGuard Lab workspace
//!
//! Shared fakes for the host capabilities plus page fixtures.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use mg_experiment::{
    Clock, DownloadSink, ExperimentConfig, KeyValueStore, LandingPage, MemoryStore, RandomSource,
    SharedStore, StoreError, WaitlistForm,
};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Random source that replays a fixed sequence, cycling when exhausted
#[derive(Debug)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    next: Mutex<usize>,
}

impl ScriptedRandom {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values.into();
        assert!(!values.is_empty(), "scripted random needs at least one value");
        Self {
            values,
            next: Mutex::new(0),
        }
    }

    /// Always draws the first catalog variant
    pub fn always_first() -> Self {
        Self::new([0.0])
    }

    /// Always draws the second catalog variant
    pub fn always_second() -> Self {
        Self::new([0.99])
    }

    /// Draws consumed so far
    pub fn draws(&self) -> usize {
        *self.next.lock()
    }
}

impl RandomSource for ScriptedRandom {
    fn unit(&self) -> f64 {
        let mut next = self.next.lock();
        let value = self.values[*next % self.values.len()];
        *next += 1;
        value
    }
}

/// Clock that starts at a fixed instant and advances by `step` per read
#[derive(Debug)]
pub struct SteppingClock {
    current: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            current: Mutex::new(start),
            step,
        }
    }

    /// Starts at 2026-01-01T00:00:00Z
    pub fn standard() -> Self {
        Self::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            Duration::seconds(1),
        )
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut current = self.current.lock();
        let now = *current;
        *current = now + self.step;
        now
    }
}

/// Store whose writes or removals fail for chosen keys
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_sets: Mutex<BTreeSet<String>>,
    failing_removes: Mutex<BTreeSet<String>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_set(&self, key: &str) {
        self.failing_sets.lock().insert(key.to_string());
    }

    pub fn fail_remove(&self, key: &str) {
        self.failing_removes.lock().insert(key.to_string());
    }

    pub fn heal(&self) {
        self.failing_sets.lock().clear();
        self.failing_removes.lock().clear();
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.failing_sets.lock().contains(key) {
            return Err(StoreError::WriteRejected {
                key: key.to_string(),
                reason: "quota exceeded".to_string(),
            });
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.failing_removes.lock().contains(key) {
            return Err(StoreError::RemoveRejected {
                key: key.to_string(),
                reason: "storage locked".to_string(),
            });
        }
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys()
    }
}

/// One delivered download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime: String,
    pub body: String,
}

/// Download sink that keeps every artifact in memory
#[derive(Debug, Default)]
pub struct CapturingSink {
    pub downloads: Vec<Download>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Download> {
        self.downloads.last()
    }
}

impl DownloadSink for CapturingSink {
    fn deliver(&mut self, file_name: &str, mime: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.downloads.push(Download {
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            body: String::from_utf8_lossy(bytes).into_owned(),
        });
        Ok(())
    }
}

/// Page over `store` with scripted randomness and a stepping clock
pub fn page_with(store: SharedStore, random: ScriptedRandom) -> LandingPage {
    page_with_config(ExperimentConfig::default(), store, random)
}

pub fn page_with_config(
    config: ExperimentConfig,
    store: SharedStore,
    random: ScriptedRandom,
) -> LandingPage {
    LandingPage::new(
        config,
        store,
        Arc::new(random),
        Arc::new(SteppingClock::standard()),
    )
    .unwrap()
}

/// Page over a fresh in-memory profile, drawing the first variants
pub fn fresh_page() -> (Arc<MemoryStore>, LandingPage) {
    let store = Arc::new(MemoryStore::new());
    let page = page_with(store.clone(), ScriptedRandom::always_first());
    (store, page)
}

/// The production waitlist form inputs
pub fn waitlist_form() -> WaitlistForm {
    WaitlistForm::with_inputs(["name", "email", "company", "team_size"])
}
