//! Synthetic traffic simulator
//!
//! Replays seeded visitors against fresh in-memory profiles. Each visitor
//! loads the page one or more times, may click a CTA, may join the waitlist.
//! The run checks that assignments stay sticky across a visitor's reloads
//! and reports how traffic and conversions split across variants.

use crate::capability::{QueryParams, SeededRandom, SharedClock, SystemClock};
use crate::config::ExperimentConfig;
use crate::console::VariantStats;
use crate::error::Result;
use crate::form::SubmitEvent;
use crate::metrics::{format_rate, MetricsRecord};
use crate::site::LandingPage;
use crate::storage::MemoryStore;
use crate::surface::{RegionMap, WaitlistForm};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Distinct visitor profiles
    pub visitors: u64,
    /// Page loads per visitor
    pub visits_per_visitor: u32,
    /// Probability of a CTA click per page load
    pub cta_rate: f64,
    /// Probability of a waitlist submit per page load
    pub submit_rate: f64,
    /// Engine configuration for every profile
    pub experiment: ExperimentConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            visitors: 1_000,
            visits_per_visitor: 2,
            cta_rate: 0.3,
            submit_rate: 0.1,
            experiment: ExperimentConfig::default(),
        }
    }
}

/// A visitor whose reload resolved to a different variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StickyViolation {
    /// Visitor index
    pub visitor: u64,
    /// First resolved `(pricing, message)`
    pub first: (String, String),
    /// Later resolved `(pricing, message)`
    pub later: (String, String),
}

/// Outcome of a simulation run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Seed used
    pub seed: u64,
    /// Visitors simulated
    pub visitors: u64,
    /// Visitors per pricing key
    pub pricing_assignments: BTreeMap<String, u64>,
    /// Visitors per messaging key
    pub message_assignments: BTreeMap<String, u64>,
    /// Funnel per pricing key
    pub pricing_funnel: BTreeMap<String, VariantStats>,
    /// Reloads that broke stickiness
    pub violations: Vec<StickyViolation>,
}

impl SimulationReport {
    /// Share of visitors assigned pricing `key`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pricing_share(&self, key: &str) -> f64 {
        if self.visitors == 0 {
            return 0.0;
        }
        self.pricing_assignments.get(key).copied().unwrap_or(0) as f64 / self.visitors as f64
    }

    /// Whether every visitor stayed in their variant
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Plain-text rendering
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Simulation Report");
        let _ = writeln!(out, "=================");
        let _ = writeln!(out, "Seed: {}", self.seed);
        let _ = writeln!(out, "Visitors: {}", self.visitors);
        let _ = writeln!(out);
        let _ = writeln!(out, "Pricing split:");
        for (key, count) in &self.pricing_assignments {
            let _ = writeln!(out, "  {key}: {count} ({})", format_rate(self.pricing_share(key)));
        }
        let _ = writeln!(out, "Message split:");
        for (key, count) in &self.message_assignments {
            let _ = writeln!(out, "  {key}: {count}");
        }
        let _ = writeln!(out, "Pricing funnel:");
        for (key, stats) in &self.pricing_funnel {
            let _ = writeln!(
                out,
                "  {key}: views={} cta={} submits={} rate={}",
                stats.views, stats.cta_clicks, stats.submits, stats.rate
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Sticky assignment: {}",
            if self.passed() { "PASS" } else { "FAIL" }
        );
        for v in &self.violations {
            let _ = writeln!(out, "  visitor {}: {:?} -> {:?}", v.visitor, v.first, v.later);
        }
        out
    }
}

/// Run the simulator
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationReport> {
    let assignment_rng = Arc::new(SeededRandom::new(config.seed));
    let behaviour = SeededRandom::new(config.seed.rotate_left(32) ^ 0x9E37_79B9_7F4A_7C15);
    let clock: SharedClock = Arc::new(SystemClock);
    let query = QueryParams::default();

    let mut report = SimulationReport {
        seed: config.seed,
        visitors: config.visitors,
        pricing_assignments: BTreeMap::new(),
        message_assignments: BTreeMap::new(),
        pricing_funnel: BTreeMap::new(),
        violations: Vec::new(),
    };

    for visitor in 0..config.visitors {
        let store = Arc::new(MemoryStore::new());
        let page = LandingPage::new(
            config.experiment.clone(),
            store,
            assignment_rng.clone(),
            clock.clone(),
        )?;

        let mut first: Option<(String, String)> = None;
        for _ in 0..config.visits_per_visitor.max(1) {
            let mut display = RegionMap::new();
            let mut form = WaitlistForm::with_inputs(["email", "company"]);
            let session = page.load(&query, &mut display, &mut form)?;
            let resolved = (
                session.pricing.key.to_string(),
                session.messaging.key.to_string(),
            );

            match &first {
                None => first = Some(resolved),
                Some(f) if *f != resolved => report.violations.push(StickyViolation {
                    visitor,
                    first: f.clone(),
                    later: resolved,
                }),
                Some(_) => {}
            }

            if behaviour.chance(config.cta_rate) {
                page.click_cta("pricing", &mut display)?;
            }
            if behaviour.chance(config.submit_rate) {
                form.fill("email", &format!("visitor{visitor}@example.com"));
                page.submit(&session, &mut form, &mut SubmitEvent::new(), &mut display)?;
            }
        }

        if let Some((pricing, message)) = first {
            *report.pricing_assignments.entry(pricing.clone()).or_default() += 1;
            *report.message_assignments.entry(message).or_default() += 1;

            let metrics = page.ledger().read()?;
            let funnel = report.pricing_funnel.entry(pricing).or_default();
            funnel.views += metrics.views;
            funnel.cta_clicks += metrics.cta_clicks;
            funnel.submits += metrics.submits;
        }
    }

    for stats in report.pricing_funnel.values_mut() {
        stats.rate = MetricsRecord {
            views: stats.views,
            cta_clicks: stats.cta_clicks,
            submits: stats.submits,
        }
        .conversion_rate_label();
    }

    tracing::info!(
        visitors = report.visitors,
        violations = report.violations.len(),
        "simulation finished"
    );
    Ok(report)
}
