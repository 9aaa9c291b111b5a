//! Renderer: paints variant payloads and the metrics summary
//!
//! One-directional and stateless. Payloads come only from catalogs, so
//! painting cannot fail.

use crate::catalog::{Catalog, VariantPayload};
use crate::metrics::MetricsRecord;
use crate::surface::{DisplaySurface, FormSurface, Region};

/// Paint one resolved variant
///
/// Writes every payload field, the badge, and the hidden form field when the
/// payload declares one. An unknown key paints nothing.
pub fn apply<P: VariantPayload>(
    catalog: &Catalog<P>,
    key: &str,
    display: &mut dyn DisplaySurface,
    form: &mut dyn FormSurface,
) {
    let Some(variant) = catalog.get(key) else {
        tracing::warn!(key, "no catalog entry to render");
        return;
    };

    for (region, text) in variant.payload.fields() {
        display.set_text(region, text);
    }
    display.set_text(P::BADGE_REGION, &P::badge(variant.key));

    if let Some(field) = P::form_field() {
        form.set_hidden(field, variant.key);
    }
}

/// Paint the metrics summary panel
pub fn paint_metrics(metrics: &MetricsRecord, display: &mut dyn DisplaySurface) {
    display.set_text(Region::MetricViews, &metrics.views.to_string());
    display.set_text(Region::MetricCta, &metrics.cta_clicks.to_string());
    display.set_text(Region::MetricSubmits, &metrics.submits.to_string());
    display.set_text(Region::MetricRate, &metrics.conversion_rate_label());
}
