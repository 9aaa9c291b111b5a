//! Display and form surfaces
//!
//! The page markup is external; the engine only needs to set text on named
//! regions and to read/clear the waitlist form. [`RegionMap`] and
//! [`WaitlistForm`] are in-memory surfaces used by the CLI and tests.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named display slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    /// Pricing plan name
    PlanName,
    /// Pricing price line
    PlanPrice,
    /// Pricing fine print
    PlanNote,
    /// Pricing experiment badge
    PricingBadge,
    /// Hero headline
    HeroTitle,
    /// Hero supporting line
    HeroSubtitle,
    /// Messaging experiment badge
    MessageBadge,
    /// Metrics panel: views
    MetricViews,
    /// Metrics panel: CTA clicks
    MetricCta,
    /// Metrics panel: submits
    MetricSubmits,
    /// Metrics panel: conversion rate
    MetricRate,
    /// Waitlist form status line
    FormStatus,
}

impl Region {
    /// Every region, in page order
    pub const ALL: [Region; 12] = [
        Region::PlanName,
        Region::PlanPrice,
        Region::PlanNote,
        Region::PricingBadge,
        Region::HeroTitle,
        Region::HeroSubtitle,
        Region::MessageBadge,
        Region::MetricViews,
        Region::MetricCta,
        Region::MetricSubmits,
        Region::MetricRate,
        Region::FormStatus,
    ];

    /// Element identifier used by the page markup
    #[must_use]
    pub fn element_id(self) -> &'static str {
        match self {
            Region::PlanName => "plan-name",
            Region::PlanPrice => "plan-price",
            Region::PlanNote => "plan-note",
            Region::PricingBadge => "variant-badge",
            Region::HeroTitle => "hero-title",
            Region::HeroSubtitle => "hero-subtitle",
            Region::MessageBadge => "message-badge",
            Region::MetricViews => "metric-views",
            Region::MetricCta => "metric-cta",
            Region::MetricSubmits => "metric-submits",
            Region::MetricRate => "metric-rate",
            Region::FormStatus => "form-status",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_id())
    }
}

/// Text-only display surface
pub trait DisplaySurface {
    /// Replace the text content of `region`
    fn set_text(&mut self, region: Region, text: &str);
}

/// Waitlist form surface
pub trait FormSurface {
    /// Set a hidden field's value
    fn set_hidden(&mut self, name: &str, value: &str);

    /// All named fields in form order, hidden fields included
    fn entries(&self) -> Vec<(String, String)>;

    /// Clear user-entered values; hidden fields keep their values
    fn clear_inputs(&mut self);
}

/// In-memory display surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionMap {
    texts: BTreeMap<Region, String>,
}

impl RegionMap {
    /// Empty surface
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text of `region`
    #[must_use]
    pub fn text(&self, region: Region) -> Option<&str> {
        self.texts.get(&region).map(String::as_str)
    }

    /// Painted regions in page order
    pub fn iter(&self) -> impl Iterator<Item = (Region, &str)> {
        self.texts.iter().map(|(r, t)| (*r, t.as_str()))
    }
}

impl DisplaySurface for RegionMap {
    fn set_text(&mut self, region: Region, text: &str) {
        self.texts.insert(region, text.to_string());
    }
}

/// In-memory waitlist form
///
/// Inputs and hidden fields keep their declaration order, so entries come
/// out the way a browser serializes the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitlistForm {
    fields: IndexMap<String, Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    value: String,
    hidden: bool,
}

impl WaitlistForm {
    /// Empty form
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Form with the given input names, all empty
    #[must_use]
    pub fn with_inputs<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut form = Self::new();
        for name in names {
            form.fields.insert(
                name.into(),
                Field {
                    value: String::new(),
                    hidden: false,
                },
            );
        }
        form
    }

    /// Type into an input, declaring it if needed
    pub fn fill(&mut self, name: &str, value: &str) -> &mut Self {
        let field = self.fields.entry(name.to_string()).or_insert(Field {
            value: String::new(),
            hidden: false,
        });
        field.value = value.to_string();
        self
    }

    /// Current value of a field
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|f| f.value.as_str())
    }
}

impl FormSurface for WaitlistForm {
    fn set_hidden(&mut self, name: &str, value: &str) {
        let field = self.fields.entry(name.to_string()).or_insert(Field {
            value: String::new(),
            hidden: true,
        });
        field.hidden = true;
        field.value = value.to_string();
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(name, field)| (name.clone(), field.value.clone()))
            .collect()
    }

    fn clear_inputs(&mut self) {
        for field in self.fields.values_mut().filter(|f| !f.hidden) {
            field.value.clear();
        }
    }
}
