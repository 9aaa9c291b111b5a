//! Counter, event log, and corrupt-storage behaviour through the page

use mg_experiment::prelude::*;
use mg_experiment::{FileStore, MetricsRecord};
use mg_test_utils::{fresh_page, page_with, waitlist_form, ScriptedRandom};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Action {
    Load,
    Click,
    Submit,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Load), Just(Action::Click), Just(Action::Submit)]
}

proptest! {
    #[test]
    fn counters_match_call_counts(actions in prop::collection::vec(action(), 1..40)) {
        let (_store, page) = fresh_page();
        let mut display = RegionMap::new();
        let mut form = waitlist_form();
        let session = page.load(&QueryParams::default(), &mut display, &mut form).unwrap();

        let mut expected = MetricsRecord { views: 1, cta_clicks: 0, submits: 0 };
        let mut previous = page.ledger().read().unwrap();
        for action in actions {
            match action {
                Action::Load => {
                    page.load(&QueryParams::default(), &mut display, &mut form).unwrap();
                    expected.views += 1;
                }
                Action::Click => {
                    page.click_cta("hero", &mut display).unwrap();
                    expected.cta_clicks += 1;
                }
                Action::Submit => {
                    page.submit(&session, &mut form, &mut SubmitEvent::new(), &mut display)
                        .unwrap();
                    expected.submits += 1;
                }
            }
            let current = page.ledger().read().unwrap();
            prop_assert!(current.views >= previous.views);
            prop_assert!(current.cta_clicks >= previous.cta_clicks);
            prop_assert!(current.submits >= previous.submits);
            prop_assert_eq!(
                current.views + current.cta_clicks + current.submits,
                previous.views + previous.cta_clicks + previous.submits + 1
            );
            previous = current;
        }
        prop_assert_eq!(previous, expected);
    }

    #[test]
    fn event_log_is_append_only(ctas in prop::collection::vec("[a-z]{1,8}", 0..25)) {
        let (_store, page) = fresh_page();
        let mut display = RegionMap::new();
        page.load(&QueryParams::default(), &mut display, &mut waitlist_form()).unwrap();

        let mut seen = page.recorder().read_all().unwrap();
        for cta in &ctas {
            page.click_cta(cta, &mut display).unwrap();
            let now = page.recorder().read_all().unwrap();
            prop_assert_eq!(now.len(), seen.len() + 1);
            prop_assert_eq!(&now[..seen.len()], &seen[..]);
            prop_assert_eq!(now.last().unwrap().payload["cta"].as_str(), Some(cta.as_str()));
            prop_assert!(now.last().unwrap().at >= seen.last().unwrap().at);
            seen = now;
        }
    }
}

#[test]
fn test_corrupt_values_read_as_defaults() {
    let store = Arc::new(MemoryStore::with_entries([
        ("mergeguard_metrics", "{not json"),
        ("mergeguard_events", "\"a string\""),
        ("mergeguard_waitlist", "null"),
    ]));
    let page = page_with(store, ScriptedRandom::always_first());
    let mut display = RegionMap::new();

    assert_eq!(page.ledger().read().unwrap(), MetricsRecord::zero());
    assert!(page.recorder().read_all().unwrap().is_empty());
    assert!(page.capture().read_all().unwrap().is_empty());

    page.load(&QueryParams::default(), &mut display, &mut waitlist_form())
        .unwrap();
    assert_eq!(page.ledger().read().unwrap().views, 1);
    assert_eq!(page.recorder().read_all().unwrap().len(), 1);
}

#[test]
fn test_unknown_sticky_value_is_replaced() {
    let store = Arc::new(MemoryStore::with_entries([
        ("mergeguard_variant", "z"),
        ("mergeguard_message", ""),
    ]));
    let page = page_with(store.clone(), ScriptedRandom::always_second());

    let session = page
        .load(&QueryParams::default(), &mut RegionMap::new(), &mut waitlist_form())
        .unwrap();

    assert_eq!(session.pricing.key, "b");
    assert_eq!(session.messaging.key, "speed");
    assert_eq!(store.get("mergeguard_variant").unwrap().as_deref(), Some("b"));
    assert_eq!(store.get("mergeguard_message").unwrap().as_deref(), Some("speed"));
}

#[test]
fn test_partial_metrics_record_fills_missing_counters() {
    let store = Arc::new(MemoryStore::with_entries([(
        "mergeguard_metrics",
        r#"{"views":4}"#,
    )]));
    let page = page_with(store, ScriptedRandom::always_first());
    let mut display = RegionMap::new();

    let record = page.click_cta("pricing", &mut display).unwrap();
    assert_eq!(
        record,
        MetricsRecord {
            views: 4,
            cta_clicks: 1,
            submits: 0
        }
    );
    assert_eq!(display.text(Region::MetricViews), Some("4"));
}

#[test]
fn test_file_store_survives_page_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profile.json");

    let first = {
        let page = page_with(Arc::new(FileStore::open(&path)), ScriptedRandom::always_second());
        let mut display = RegionMap::new();
        let mut form = waitlist_form();
        let session = page
            .load(&QueryParams::default(), &mut display, &mut form)
            .unwrap();
        form.fill("email", "ops@example.com");
        page.submit(&session, &mut form, &mut SubmitEvent::new(), &mut display)
            .unwrap();
        session
    };

    let page = page_with(Arc::new(FileStore::open(&path)), ScriptedRandom::always_first());
    let mut display = RegionMap::new();
    let second = page
        .load(&QueryParams::default(), &mut display, &mut waitlist_form())
        .unwrap();

    assert_eq!(first.pricing.key, second.pricing.key);
    assert_eq!(first.messaging.key, second.messaging.key);
    let metrics = page.render_metrics(&mut display).unwrap();
    assert_eq!(metrics.views, 2);
    assert_eq!(metrics.submits, 1);
    assert_eq!(display.text(Region::MetricRate), Some("50.0%"));
    assert_eq!(
        page.capture().read_all().unwrap()[0].field("email"),
        Some("ops@example.com")
    );
}

#[test]
fn test_off_shape_event_survives_a_click() {
    let store = Arc::new(MemoryStore::with_entries([(
        "mergeguard_events",
        r#"[{"type":"page_view","payload":{"variant":"a","message":"clarity"},"at":"2026-01-01T00:00:00Z"},{"type":"cta_click","payload":null,"at":"2026-01-01T00:00:01Z"}]"#,
    )]));
    let page = page_with(store, ScriptedRandom::always_first());

    page.click_cta("hero", &mut RegionMap::new()).unwrap();

    let raw = page.recorder().read_raw().unwrap();
    assert_eq!(raw.len(), 3);
    assert_eq!(raw[1]["payload"], serde_json::Value::Null);
    assert_eq!(raw[2]["payload"]["cta"], "hero");
    assert_eq!(page.summary().unwrap().total_events, 3);
}

#[test]
fn test_untimestamped_submission_survives_a_submit() {
    let store = Arc::new(MemoryStore::with_entries([(
        "mergeguard_waitlist",
        r#"[{"email":"old@example.com","variant":"a"}]"#,
    )]));
    let page = page_with(store, ScriptedRandom::always_first());
    let mut display = RegionMap::new();
    let mut form = waitlist_form();
    let session = page
        .load(&QueryParams::default(), &mut display, &mut form)
        .unwrap();
    form.fill("email", "new@example.com");
    page.submit(&session, &mut form, &mut SubmitEvent::new(), &mut display)
        .unwrap();

    let submissions = page.capture().read_all().unwrap();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].field("email"), Some("old@example.com"));
    assert_eq!(submissions[0].submitted_at, None);
    assert_eq!(submissions[1].field("email"), Some("new@example.com"));
    assert_eq!(page.summary().unwrap().total_submissions, 2);
}

#[test]
fn test_null_counter_keeps_the_other_counters() {
    let store = Arc::new(MemoryStore::with_entries([(
        "mergeguard_metrics",
        r#"{"views":7,"ctaClicks":null,"submits":2}"#,
    )]));
    let page = page_with(store, ScriptedRandom::always_first());

    let record = page.click_cta("hero", &mut RegionMap::new()).unwrap();
    assert_eq!(
        record,
        MetricsRecord {
            views: 7,
            cta_clicks: 1,
            submits: 2
        }
    );
}
