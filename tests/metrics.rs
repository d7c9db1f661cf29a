mod support;

use support::{ScriptedFetch, harness, paris_raw};
use tastegraph::RawSignals;

#[tokio::test]
async fn resolution_metrics_reconcile() {
    let h = harness(ScriptedFetch::succeeding());
    h.resolver.resolve_raw(&paris_raw()).await.expect("resolved");

    let snapshot = h.metrics.get_metrics();
    // 10 batch units + 1 social call + 1 aggregate resolution record.
    assert_eq!(snapshot.api_calls.total, 12);
    assert_eq!(
        snapshot.api_calls.total,
        snapshot.api_calls.successes + snapshot.api_calls.errors
    );
    assert_eq!(snapshot.api_calls.errors, 0);
    assert_eq!(snapshot.api_calls.success_rate, 100);
    assert!(snapshot.api_calls.max_concurrent_requests >= 1);
    assert!(snapshot.health.is_healthy);
}

#[tokio::test]
async fn outage_is_visible_in_error_taxonomy() {
    let h = harness(ScriptedFetch::failing());
    h.resolver.resolve_raw(&paris_raw()).await.expect("resolved");

    let snapshot = h.metrics.get_metrics();
    // Every category call failed with a network error; the aggregate
    // resolution record still succeeded thanks to fallback injection.
    assert_eq!(snapshot.errors.total_errors, 11);
    assert_eq!(snapshot.errors.by_type["network"], 11);
    assert_eq!(snapshot.errors.most_common[0].error_type, "network");
    assert!(!snapshot.health.is_healthy);

    // Per-endpoint breakdown carries the failing categories.
    assert!(snapshot.errors.by_endpoint.contains_key("music"));
    assert!(snapshot.errors.by_endpoint.contains_key("social_platforms"));
}

#[tokio::test]
async fn recovery_restores_health() {
    let h = harness(ScriptedFetch::succeeding());
    // Unhealthy only when the rolling error rate crosses the threshold;
    // a clean follow-up resolution pulls it back under and reconnects.
    h.resolver.resolve_raw(&paris_raw()).await.expect("first");
    let later = RawSignals {
        location: "Berlin".into(),
        ..paris_raw()
    };
    h.resolver.resolve_raw(&later).await.expect("second");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    let snapshot = h.metrics.get_metrics();
    assert_eq!(snapshot.api_calls.error_rate, 0);
    assert!(snapshot.health.is_healthy);
    assert!(snapshot.health.uptime_ms > 0);
}

#[tokio::test]
async fn snapshot_serializes_for_dashboards() {
    let h = harness(ScriptedFetch::succeeding());
    h.resolver.resolve_raw(&paris_raw()).await.expect("resolved");

    let json = serde_json::to_value(h.metrics.get_metrics()).expect("serializable");
    assert!(json["api_calls"]["p50_response_time_ms"].is_u64());
    assert!(json["api_calls"]["p99_response_time_ms"].is_u64());
    assert!(json["cache"]["by_endpoint"].is_object());
    assert!(json["errors"]["most_common"].is_array());
    assert!(json["health"]["is_healthy"].is_boolean());
}

#[tokio::test]
async fn period_query_scopes_the_window() {
    let h = harness(ScriptedFetch::succeeding());
    let before = chrono::Utc::now();
    h.resolver.resolve_raw(&paris_raw()).await.expect("resolved");
    let after = chrono::Utc::now();

    let inside = h.metrics.metrics_for_period(before, after);
    assert_eq!(inside.api_calls.total, 12);

    let outside = h
        .metrics
        .metrics_for_period(before - chrono::Duration::hours(2), before - chrono::Duration::hours(1));
    assert_eq!(outside.api_calls.total, 0);
}

#[tokio::test]
async fn reset_clears_the_window() {
    let h = harness(ScriptedFetch::succeeding());
    h.resolver.resolve_raw(&paris_raw()).await.expect("resolved");
    h.metrics.reset_metrics();

    let snapshot = h.metrics.get_metrics();
    assert_eq!(snapshot.api_calls.total, 0);
    assert_eq!(snapshot.cache.total_requests, 0);
    assert_eq!(snapshot.errors.total_errors, 0);
}
