//! Subcommand handlers over a file-backed visitor profile

use anyhow::{bail, Context, Result};
use mg_experiment::{
    DirectorySink, ExperimentConfig, ExperimentSummary, FileStore, LandingPage, MetricsRecord,
    PageSession, QueryParams, Region, RegionMap, SharedRandom, SubmissionRecord, SubmitEvent,
    SystemClock, WaitlistForm,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Waitlist inputs on the production page
const FORM_INPUTS: [&str; 4] = ["name", "email", "company", "team_size"];

/// One visitor profile backed by a JSON file
pub(crate) struct Lab {
    page: LandingPage,
}

/// What a single page load painted
pub(crate) struct Visit {
    pub(crate) session: PageSession,
    pub(crate) display: RegionMap,
    pub(crate) form: WaitlistForm,
}

impl Lab {
    /// Open the profile at `store`, with an optional TOML config
    pub(crate) fn open(store: &Path, config: Option<&Path>, random: SharedRandom) -> Result<Self> {
        let config = match config {
            Some(path) => ExperimentConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ExperimentConfig::default(),
        };
        let page = LandingPage::new(
            config,
            Arc::new(FileStore::open(store)),
            random,
            Arc::new(SystemClock),
        )?;
        tracing::debug!(store = %store.display(), "profile opened");
        Ok(Self { page })
    }

    pub(crate) fn visit(&self, query: &str) -> Result<Visit> {
        let mut display = RegionMap::new();
        let mut form = WaitlistForm::with_inputs(FORM_INPUTS);
        let session = self
            .page
            .load(&QueryParams::parse(query), &mut display, &mut form)?;
        Ok(Visit {
            session,
            display,
            form,
        })
    }

    /// Load the page, then click `cta`
    pub(crate) fn click(&self, cta: &str, query: &str) -> Result<MetricsRecord> {
        let mut visit = self.visit(query)?;
        Ok(self.page.click_cta(cta, &mut visit.display)?)
    }

    /// Load the page, fill the form, submit it
    pub(crate) fn submit(
        &self,
        fields: &[(String, String)],
        query: &str,
    ) -> Result<(SubmissionRecord, String)> {
        let mut visit = self.visit(query)?;
        for (name, value) in fields {
            visit.form.fill(name, value);
        }
        let record = self.page.submit(
            &visit.session,
            &mut visit.form,
            &mut SubmitEvent::new(),
            &mut visit.display,
        )?;
        let status = visit
            .display
            .text(Region::FormStatus)
            .unwrap_or_default()
            .to_string();
        Ok((record, status))
    }

    pub(crate) fn stats(&self) -> Result<ExperimentSummary> {
        Ok(self.page.summary()?)
    }

    /// Write the export artifact into `out_dir`
    pub(crate) fn export(&self, out_dir: &Path) -> Result<PathBuf> {
        let mut sink = DirectorySink::new(out_dir);
        self.page.export(&mut sink)?;
        sink.last_path()
            .map(Path::to_path_buf)
            .context("export produced no file")
    }

    pub(crate) fn reset(&self) -> Result<MetricsRecord> {
        let mut display = RegionMap::new();
        self.page.reset(&mut display)?;
        Ok(self.page.render_metrics(&mut display)?)
    }
}

/// Parse a `name=value` form field
pub(crate) fn parse_field(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => bail!("expected NAME=VALUE, got '{raw}'"),
    }
}

/// Plain-text rendering of the painted regions
pub(crate) fn render_visit(visit: &Visit) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Pricing: {} ({})",
        visit.session.pricing.key, visit.session.pricing.source
    );
    let _ = writeln!(
        out,
        "Message: {} ({})",
        visit.session.messaging.key, visit.session.messaging.source
    );
    let _ = writeln!(out);
    for (region, text) in visit.display.iter() {
        let _ = writeln!(out, "  #{:<20} {text}", region.element_id());
    }
    out
}

/// Plain-text rendering of the experiment summary
pub(crate) fn render_summary(summary: &ExperimentSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Experiment Summary");
    let _ = writeln!(out, "==================");
    let _ = writeln!(out, "Views: {}", summary.metrics.views);
    let _ = writeln!(out, "CTA clicks: {}", summary.metrics.cta_clicks);
    let _ = writeln!(out, "Submits: {}", summary.metrics.submits);
    let _ = writeln!(out, "Conversion: {}", summary.conversion_rate);
    let _ = writeln!(
        out,
        "Events: {} ({} foreign)",
        summary.total_events, summary.foreign_events
    );
    let _ = writeln!(out, "Submissions: {}", summary.total_submissions);
    for (title, groups) in [("By pricing", &summary.by_pricing), ("By message", &summary.by_message)] {
        let _ = writeln!(out);
        let _ = writeln!(out, "{title}:");
        for (key, stats) in groups {
            let _ = writeln!(
                out,
                "  {key}: views={} cta={} submits={} rate={}",
                stats.views, stats.cta_clicks, stats.submits, stats.rate
            );
        }
    }
    out
}
