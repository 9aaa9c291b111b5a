//! MergeGuard landing-page experiment engine
//!
//! Assigns each visitor a pricing variant and a messaging variant, keeps the
//! assignment sticky in profile-local storage, paints the matching copy, and
//! records engagement into a local ledger:
//! - aggregate counters (views, CTA clicks, submits) with a conversion rate
//! - an append-only event log
//! - a waitlist submissions log
//!
//! Every host facility (storage, randomness, clock, query string, display,
//! form, download) is a capability handed in by the caller.
//!
//! # Example
//!
//! ```rust
//! use mg_experiment::prelude::*;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), mg_experiment::ExperimentError> {
//! let page = LandingPage::new(
//!     ExperimentConfig::new(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(ThreadRandom),
//!     Arc::new(SystemClock),
//! )?;
//!
//! let mut display = RegionMap::new();
//! let mut form = WaitlistForm::with_inputs(["email"]);
//! let session = page.load(&QueryParams::parse("?variant=b"), &mut display, &mut form)?;
//! assert_eq!(session.pricing.key, "b");
//! assert_eq!(display.text(Region::PlanPrice), Some("$99 / seat / month"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod assignment;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod form;
pub mod logging;
pub mod metrics;
pub mod render;
pub mod simulation;
pub mod site;
pub mod storage;
pub mod surface;

// Re-exports for convenience
pub use assignment::{Assignment, AssignmentResolver, AssignmentSource};
pub use capability::{
    Clock, QueryParams, RandomSource, SeededRandom, SharedClock, SharedRandom, SystemClock,
    ThreadRandom,
};
pub use catalog::{Catalog, HeroMessage, PricingPlan, Variant, VariantPayload, MESSAGING, PRICING};
pub use config::{ExperimentConfig, OverrideParams};
pub use console::{
    DirectorySink, DownloadSink, ExperimentConsole, ExperimentSummary, ExportBundle,
    VariantStats,
};
pub use error::{
    CatalogError, ConfigError, ExperimentError, ExportError, ResetError, StoreError,
};
pub use events::{EventRecord, EventRecorder, TrackedEvent};
pub use form::{FormCapture, SubmissionRecord, SubmitEvent};
pub use metrics::{MetricField, MetricsLedger, MetricsRecord};
pub use simulation::{run_simulation, SimulationConfig, SimulationReport};
pub use site::{LandingPage, PageSession};
pub use storage::{FileStore, KeyValueStore, MemoryStore, SharedStore, StorageKeys};
pub use surface::{DisplaySurface, FormSurface, Region, RegionMap, WaitlistForm};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the landing page
    pub use crate::{
        DisplaySurface, ExperimentConfig, FormSurface, KeyValueStore, LandingPage, MemoryStore,
        MetricField, QueryParams, Region, RegionMap, SubmitEvent, SystemClock, ThreadRandom,
        WaitlistForm,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
