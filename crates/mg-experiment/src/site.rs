//! Landing page orchestration
//!
//! Wires the components together the way the page runs them: resolve both
//! dimensions, paint them, count the view, log it, then route clicks and
//! submits through the ledger, recorder, and form capture.

use crate::assignment::{Assignment, AssignmentResolver};
use crate::capability::{QueryParams, SharedClock, SharedRandom};
use crate::catalog::{MESSAGING, PRICING};
use crate::config::ExperimentConfig;
use crate::console::{DownloadSink, ExperimentConsole, ExportBundle, ExperimentSummary};
use crate::error::{ConfigError, Result};
use crate::events::{EventRecorder, TrackedEvent};
use crate::form::{FormCapture, SubmissionRecord, SubmitEvent};
use crate::metrics::{MetricField, MetricsLedger, MetricsRecord};
use crate::render;
use crate::storage::SharedStore;
use crate::surface::{DisplaySurface, FormSurface};
use serde::Serialize;

/// Assignments resolved for one page load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSession {
    /// Pricing dimension
    pub pricing: Assignment,
    /// Messaging dimension
    pub messaging: Assignment,
}

/// The landing page experiment
#[derive(Debug, Clone)]
pub struct LandingPage {
    config: ExperimentConfig,
    resolver: AssignmentResolver,
    ledger: MetricsLedger,
    recorder: EventRecorder,
    capture: FormCapture,
    console: ExperimentConsole,
}

impl LandingPage {
    /// Build every component over one store
    pub fn new(
        config: ExperimentConfig,
        store: SharedStore,
        random: SharedRandom,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let keys = &config.storage_keys;

        let resolver = AssignmentResolver::new(store.clone(), random)
            .with_persist_override(config.persist_override);
        let ledger = MetricsLedger::new(store.clone(), keys.metrics.clone());
        let recorder = EventRecorder::new(store.clone(), keys.events.clone(), clock.clone());
        let capture = FormCapture::new(
            store.clone(),
            keys.submissions.clone(),
            ledger.clone(),
            recorder.clone(),
            clock,
            config.confirmation_message.clone(),
        );
        let console = ExperimentConsole::new(
            store,
            ledger.clone(),
            recorder.clone(),
            capture.clone(),
            config.export_file_name.clone(),
        );

        Ok(Self {
            config,
            resolver,
            ledger,
            recorder,
            capture,
            console,
        })
    }

    /// Page-load flow
    pub fn load(
        &self,
        query: &QueryParams,
        display: &mut dyn DisplaySurface,
        form: &mut dyn FormSurface,
    ) -> Result<PageSession> {
        let keys = &self.config.storage_keys;
        let params = &self.config.override_params;

        let pricing = self.resolver.resolve(
            &PRICING,
            query.get(&params.pricing),
            &keys.pricing_assignment,
        )?;
        let messaging = self.resolver.resolve(
            &MESSAGING,
            query.get(&params.messaging),
            &keys.messaging_assignment,
        )?;

        render::apply(&PRICING, pricing.key, display, form);
        render::apply(&MESSAGING, messaging.key, display, form);

        self.ledger.increment(MetricField::Views, display)?;
        self.recorder.record_event(&TrackedEvent::PageView {
            variant: pricing.key.to_string(),
            message: messaging.key.to_string(),
        })?;

        tracing::info!(
            pricing = pricing.key,
            pricing_source = %pricing.source,
            message = messaging.key,
            message_source = %messaging.source,
            "page loaded"
        );
        Ok(PageSession { pricing, messaging })
    }

    /// CTA click handler
    pub fn click_cta(&self, cta: &str, display: &mut dyn DisplaySurface) -> Result<MetricsRecord> {
        let record = self.ledger.increment(MetricField::CtaClicks, display)?;
        self.recorder.record_event(&TrackedEvent::CtaClick {
            cta: cta.to_string(),
        })?;
        Ok(record)
    }

    /// Waitlist submit handler
    pub fn submit(
        &self,
        session: &PageSession,
        form: &mut dyn FormSurface,
        event: &mut SubmitEvent,
        display: &mut dyn DisplaySurface,
    ) -> Result<SubmissionRecord> {
        Ok(self
            .capture
            .submit(form, event, display, Some(session.pricing.key))?)
    }

    /// Export button handler
    pub fn export(&self, sink: &mut dyn DownloadSink) -> Result<ExportBundle> {
        Ok(self.console.export_all(sink)?)
    }

    /// Reset button handler
    pub fn reset(&self, display: &mut dyn DisplaySurface) -> Result<()> {
        Ok(self.console.reset_all(display)?)
    }

    /// Per-variant roll-up
    pub fn summary(&self) -> Result<ExperimentSummary> {
        Ok(self.console.summary()?)
    }

    /// Repaint the metrics panel from persisted state
    pub fn render_metrics(&self, display: &mut dyn DisplaySurface) -> Result<MetricsRecord> {
        Ok(self.ledger.render(display)?)
    }

    /// Metrics ledger
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> &MetricsLedger {
        &self.ledger
    }

    /// Event recorder
    #[inline]
    #[must_use]
    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    /// Form capture
    #[inline]
    #[must_use]
    pub fn capture(&self) -> &FormCapture {
        &self.capture
    }

    /// Experiment console
    #[inline]
    #[must_use]
    pub fn console(&self) -> &ExperimentConsole {
        &self.console
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }
}
