//! Experiment catalogs
//!
//! Each experiment dimension is a binary catalog: exactly two variants, each
//! a key plus a typed display payload. The built-in pricing and messaging
//! catalogs are compiled in.

use crate::error::CatalogError;
use crate::surface::Region;
use serde::Serialize;

/// Display payload of one variant
pub trait VariantPayload: Send + Sync + std::fmt::Debug {
    /// Region that shows which variant is active
    const BADGE_REGION: Region;

    /// `(region, text)` pairs to paint
    fn fields(&self) -> Vec<(Region, &str)>;

    /// Badge text for the active variant
    fn badge(key: &str) -> String;

    /// Hidden form field that carries the active key, if any
    fn form_field() -> Option<&'static str> {
        None
    }
}

/// Pricing treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricingPlan {
    /// Plan name
    pub plan: &'static str,
    /// Price line
    pub price: &'static str,
    /// Fine print
    pub note: &'static str,
}

impl VariantPayload for PricingPlan {
    const BADGE_REGION: Region = Region::PricingBadge;

    fn fields(&self) -> Vec<(Region, &str)> {
        vec![
            (Region::PlanName, self.plan),
            (Region::PlanPrice, self.price),
            (Region::PlanNote, self.note),
        ]
    }

    fn badge(key: &str) -> String {
        format!("Pricing experiment: Variant {}", key.to_uppercase())
    }

    fn form_field() -> Option<&'static str> {
        Some(PRICING_FORM_FIELD)
    }
}

/// Hero messaging treatment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeroMessage {
    /// Headline
    pub title: &'static str,
    /// Supporting line
    pub subtitle: &'static str,
}

impl VariantPayload for HeroMessage {
    const BADGE_REGION: Region = Region::MessageBadge;

    fn fields(&self) -> Vec<(Region, &str)> {
        vec![
            (Region::HeroTitle, self.title),
            (Region::HeroSubtitle, self.subtitle),
        ]
    }

    fn badge(key: &str) -> String {
        format!("Message experiment: {key}")
    }
}

/// Hidden waitlist field that records the pricing variant
pub const PRICING_FORM_FIELD: &str = "variant";

/// One variant: key plus payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant<P> {
    /// Key, unique within its catalog
    pub key: &'static str,
    /// Display content
    pub payload: P,
}

/// Binary catalog for one experiment dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog<P> {
    variants: [Variant<P>; 2],
}

impl<P> Catalog<P> {
    /// Build without validation; used for the compiled-in catalogs
    #[must_use]
    pub const fn from_pair(first: Variant<P>, second: Variant<P>) -> Self {
        Self {
            variants: [first, second],
        }
    }

    /// Build a catalog, rejecting empty or duplicate keys
    pub fn new(first: Variant<P>, second: Variant<P>) -> Result<Self, CatalogError> {
        if first.key.is_empty() || second.key.is_empty() {
            return Err(CatalogError::EmptyKey);
        }
        if first.key == second.key {
            return Err(CatalogError::DuplicateKey(first.key.to_string()));
        }
        Ok(Self::from_pair(first, second))
    }

    /// Look up a variant by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Variant<P>> {
        self.variants.iter().find(|v| v.key == key)
    }

    /// The catalog's own `&'static` key equal to `key`
    #[must_use]
    pub fn canonical_key(&self, key: &str) -> Option<&'static str> {
        self.get(key).map(|v| v.key)
    }

    /// Whether `key` names a variant
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Both keys in catalog order
    #[must_use]
    pub fn keys(&self) -> [&'static str; 2] {
        [self.variants[0].key, self.variants[1].key]
    }

    /// Pick by a uniform draw: first key below one half, second otherwise
    #[must_use]
    pub fn pick(&self, unit: f64) -> &'static str {
        if unit < 0.5 {
            self.variants[0].key
        } else {
            self.variants[1].key
        }
    }

    /// Iterate variants in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Variant<P>> {
        self.variants.iter()
    }
}

/// Built-in pricing catalog
pub const PRICING: Catalog<PricingPlan> = Catalog::from_pair(
    Variant {
        key: "a",
        payload: PricingPlan {
            plan: "Variant A - Seat Plan",
            price: "$49 / seat / month",
            note: "14-day free trial. Best for teams validating AI coding workflows.",
        },
    },
    Variant {
        key: "b",
        payload: PricingPlan {
            plan: "Variant B - Hybrid Plan",
            price: "$99 / seat / month",
            note: "Includes usage-based compute pool for heavy test generation.",
        },
    },
);

/// Built-in messaging catalog
pub const MESSAGING: Catalog<HeroMessage> = Catalog::from_pair(
    Variant {
        key: "clarity",
        payload: HeroMessage {
            title: "Ship AI-assisted code with confidence, not guesswork.",
            subtitle: "MergeGuard catches risky AI-generated diffs before merge with automated test generation, PR risk heatmaps, and trust scoring.",
        },
    },
    Variant {
        key: "speed",
        payload: HeroMessage {
            title: "Cut AI PR review time before regressions hit production.",
            subtitle: "MergeGuard prioritizes risky AI-generated diffs so reviewers focus on the few changes most likely to break quality.",
        },
    },
);
