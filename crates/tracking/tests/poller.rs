#![allow(missing_docs)]


use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::time;
use tracking::{Error, FleetView, Poller, TrackingConfig, ViewContext};

use self::provider::{MockProvider, bus, settle};

fn ids(poller: &Poller<MockProvider>) -> Vec<String> {
    poller.snapshot().buses.into_iter().map(|bus| bus.id).collect()
}

// Should keep showing the previous fleet when a fetch fails.
#[tokio::test]
async fn failed_fetch_keeps_snapshot() {
    let provider = Arc::new(MockProvider::new());
    provider.set_fleet(json!([
        bus("1", Some((12.97, 77.59))),
        bus("2", Some((13.03, 77.62))),
        bus("3", None),
    ]));
    let poller = Poller::new(Arc::clone(&provider));
    assert_eq!(poller.snapshot().fetched_at, None);

    poller.refresh().await.expect("should fetch");
    assert_eq!(poller.markers(None, ViewContext::Admin).len(), 2);
    let fetched_at = poller.snapshot().fetched_at;
    assert!(fetched_at.is_some());

    provider.fail_fleet();
    let Err(Error::ServerError(_)) = poller.refresh().await else {
        panic!("should fail with ServerError");
    };
    assert_eq!(poller.markers(None, ViewContext::Admin).len(), 2);
    assert_eq!(poller.snapshot().fetched_at, fetched_at);
}

// Should narrow markers to the focused bus.
#[tokio::test]
async fn focused_markers() {
    let provider = Arc::new(MockProvider::new());
    provider.set_fleet(json!([bus("1", Some((12.97, 77.59))), bus("2", None)]));
    let poller = Poller::new(Arc::clone(&provider));
    poller.refresh().await.expect("should fetch");

    let markers = poller.markers(Some("1"), ViewContext::Admin);
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].popup_text, "🚍 Bus: KA-1 - 500D");

    assert!(poller.markers(Some("2"), ViewContext::Admin).is_empty());
    assert!(poller.markers(Some("missing"), ViewContext::Admin).is_empty());
}

// Should fetch immediately, then once per interval until stopped.
#[tokio::test(start_paused = true)]
async fn polls_on_interval() {
    let provider = Arc::new(MockProvider::new());
    provider.set_fleet(json!([bus("1", Some((12.97, 77.59)))]));
    let mut poller = Poller::new(Arc::clone(&provider));
    let mut updates = poller.subscribe();

    poller.start(Duration::from_secs(5));
    assert!(poller.is_running());
    settle().await;
    assert_eq!(provider.fleet_fetches(), 1);
    assert!(updates.has_changed().expect("sender alive"));
    assert_eq!(updates.borrow_and_update().buses.len(), 1);

    time::sleep(Duration::from_millis(5500)).await;
    assert_eq!(provider.fleet_fetches(), 2);

    poller.stop();
    assert!(!poller.is_running());
    time::sleep(Duration::from_secs(20)).await;
    assert_eq!(provider.fleet_fetches(), 2);
}

// Should cancel the timer when the poller is dropped.
#[tokio::test(start_paused = true)]
async fn drop_cancels_timer() {
    let provider = Arc::new(MockProvider::new());
    provider.set_fleet(json!([bus("1", Some((12.97, 77.59)))]));
    let mut poller = Poller::new(Arc::clone(&provider));

    poller.start(Duration::from_secs(5));
    settle().await;
    assert_eq!(provider.fleet_fetches(), 1);

    drop(poller);
    settle().await;
    time::sleep(Duration::from_secs(20)).await;
    assert_eq!(provider.fleet_fetches(), 1);
}

// Should cancel the view's timer when the view is dropped.
#[tokio::test(start_paused = true)]
async fn dropped_view_stops_polling() {
    let provider = Arc::new(MockProvider::new());
    provider.set_fleet(json!([bus("1", Some((12.97, 77.59)))]));
    let mut view = FleetView::rider(Arc::clone(&provider), &TrackingConfig::default());

    view.start();
    assert!(view.updated().await);
    time::sleep(Duration::from_millis(5500)).await;
    assert_eq!(provider.fleet_fetches(), 2);

    drop(view);
    settle().await;
    time::sleep(Duration::from_secs(20)).await;
    assert_eq!(provider.fleet_fetches(), 2);
}

// Should keep retrying on the timer while the backend is down.
#[tokio::test(start_paused = true)]
async fn retries_after_failure() {
    let provider = Arc::new(MockProvider::new());
    let mut poller = Poller::new(Arc::clone(&provider));

    poller.start(Duration::from_secs(5));
    settle().await;
    assert_eq!(provider.fleet_fetches(), 1);
    assert!(poller.snapshot().buses.is_empty());

    provider.set_fleet(json!([bus("1", None)]));
    time::sleep(Duration::from_millis(5500)).await;
    assert_eq!(ids(&poller), vec!["1"]);
}

// Should keep whichever overlapping response resolves last.
#[tokio::test(start_paused = true)]
async fn last_response_wins() {
    let provider = Arc::new(MockProvider::new());
    provider.script(Duration::from_secs(3), Some(json!([bus("slow", None)])));
    provider.script(Duration::ZERO, Some(json!([bus("fast", None)])));
    let mut poller = Poller::new(Arc::clone(&provider));

    poller.start(Duration::from_secs(1));
    time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(ids(&poller), vec!["fast"]);

    // later ticks fail, so only the slow response can change the snapshot
    time::sleep(Duration::from_secs(2)).await;
    assert_eq!(ids(&poller), vec!["slow"]);
    poller.stop();
}

// Should replace the running timer when restarted.
#[tokio::test(start_paused = true)]
async fn restart_replaces_timer() {
    let provider = Arc::new(MockProvider::new());
    provider.set_fleet(json!([]));
    let mut poller = Poller::new(Arc::clone(&provider));

    poller.start(Duration::from_secs(5));
    settle().await;
    poller.start(Duration::from_secs(5));
    settle().await;
    assert_eq!(provider.fleet_fetches(), 2);

    time::sleep(Duration::from_millis(5500)).await;
    assert_eq!(provider.fleet_fetches(), 3);
}
