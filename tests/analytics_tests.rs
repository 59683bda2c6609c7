//! Analytics 模块测试
//!
//! 覆盖 summarize、Aggregator、Recorder 与 Enricher 的组合行为。

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use linkpulse::analytics::{
    Aggregator, ClickEvent, DeviceClass, NewClickEvent, PAGE_VISIT_SLUG, RecordOutcome, Recorder,
    TodayWindow, summarize,
};
use linkpulse::errors::{LinkpulseError, Result};
use linkpulse::services::{ClientContext, Enricher, GeoInfo, GeoIpLookup, GeoIpProvider};
use linkpulse::storage::{EventStore, MemoryEventStore};

// =============================================================================
// 测试数据
// =============================================================================

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, h, m, 0).unwrap()
}

fn event(id: i64, slug: &str, created_at: DateTime<Utc>) -> ClickEvent {
    ClickEvent {
        id,
        created_at,
        slug: slug.to_string(),
        url: format!("https://example.com/{}", slug),
        referrer: "direct".to_string(),
        browser: "Chrome".to_string(),
        os: "Windows".to_string(),
        device: DeviceClass::Desktop,
        country: "CL".to_string(),
        ip: Some("203.0.113.7".to_string()),
        isp: Some("Example ISP".to_string()),
    }
}

/// 3 次访问，store 点击 2 次，music 点击 1 次，全部来自 CL
fn scenario() -> Vec<ClickEvent> {
    vec![
        event(1, PAGE_VISIT_SLUG, at(9, 0)),
        event(2, "store", at(9, 1)),
        event(3, PAGE_VISIT_SLUG, at(10, 0)),
        event(4, "music", at(10, 5)),
        event(5, PAGE_VISIT_SLUG, at(11, 0)),
        event(6, "store", at(11, 2)),
    ]
}

fn newest_first(mut events: Vec<ClickEvent>) -> Vec<ClickEvent> {
    events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    events
}

// =============================================================================
// summarize
// =============================================================================

mod summarize_tests {
    use super::*;

    #[test]
    fn test_scenario_counts() {
        let events = newest_first(scenario());
        let today = TodayWindow::containing(&at(12, 0));
        let summary = summarize(&events, &today, 25);

        assert_eq!(summary.today_total_visits, 3);
        assert_eq!(summary.today_total_clicks, 3);
        assert_eq!(summary.overall_total_visits, 3);
        assert_eq!(summary.overall_total_clicks, 3);

        let links: Vec<(&str, usize)> = summary
            .top_links
            .iter()
            .map(|g| (g.key.as_str(), g.count))
            .collect();
        assert_eq!(links, vec![("store", 2), ("music", 1)]);

        assert_eq!(summary.by_country.len(), 1);
        assert_eq!(summary.by_country[0].key, "CL");
        assert_eq!(summary.by_country[0].count, 6);
        assert_eq!(summary.country_count(), 1);
    }

    #[test]
    fn test_groups_partition_all_events() {
        let mut events = scenario();
        events[1].country = "AR".to_string();
        events[3].device = DeviceClass::Mobile;
        events[4].referrer = "https://t.co/abc".to_string();
        let events = newest_first(events);

        let summary = summarize(&events, &TodayWindow::containing(&at(12, 0)), 25);
        let total = summary.total_events();
        assert_eq!(total, events.len());

        for groups in [
            &summary.by_country,
            &summary.by_device,
            &summary.by_referrer,
            &summary.by_browser,
        ] {
            assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), total);
            assert!(groups.windows(2).all(|w| w[0].count >= w[1].count));
        }

        // top_links 只统计点击
        assert_eq!(
            summary.top_links.iter().map(|g| g.count).sum::<usize>(),
            summary.overall_total_clicks
        );
        assert!(summary.top_links.iter().all(|g| g.key != PAGE_VISIT_SLUG));
    }

    #[test]
    fn test_today_excludes_yesterday() {
        let mut events = scenario();
        events.push(event(7, "store", at(9, 0) - chrono::TimeDelta::days(1)));
        events.push(event(8, PAGE_VISIT_SLUG, at(9, 0) - chrono::TimeDelta::days(1)));
        let events = newest_first(events);

        let summary = summarize(&events, &TodayWindow::containing(&at(12, 0)), 25);
        assert_eq!(summary.today_total_visits, 3);
        assert_eq!(summary.today_total_clicks, 3);
        assert_eq!(summary.overall_total_visits, 4);
        assert_eq!(summary.overall_total_clicks, 4);
    }

    #[test]
    fn test_today_follows_local_midnight() {
        // UTC-4: 本地 5 月 10 日 00:00 = UTC 04:00
        let offset = FixedOffset::west_opt(4 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap();
        let events = newest_first(vec![
            event(1, PAGE_VISIT_SLUG, at(3, 59)),
            event(2, PAGE_VISIT_SLUG, at(4, 0)),
        ]);

        let summary = summarize(&events, &TodayWindow::containing(&now), 25);
        assert_eq!(summary.today_total_visits, 1);
        assert_eq!(summary.overall_total_visits, 2);
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let events = newest_first(scenario());
        let summary = summarize(&events, &TodayWindow::containing(&at(12, 0)), 2);

        let ids: Vec<i64> = summary.recent.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![6, 5]);
    }

    #[test]
    fn test_empty_history() {
        let summary = summarize(&[], &TodayWindow::containing(&at(12, 0)), 25);
        assert_eq!(summary.total_events(), 0);
        assert!(summary.top_links.is_empty());
        assert!(summary.recent.is_empty());
    }
}

// =============================================================================
// Aggregator
// =============================================================================

mod aggregator_tests {
    use super::*;

    #[tokio::test]
    async fn test_aggregator_reads_store() {
        let store = Arc::new(MemoryEventStore::with_events(scenario()));
        let aggregator = Aggregator::new(store, 25);

        let summary = aggregator.compute_summary_at(&at(12, 0)).await.unwrap();
        assert_eq!(summary.overall_total_visits, 3);
        assert_eq!(summary.top_links[0].key, "store");
        // 倒序
        assert_eq!(summary.recent.first().map(|e| e.id), Some(6));
    }

    #[tokio::test]
    async fn test_aggregator_is_idempotent() {
        let store = Arc::new(MemoryEventStore::with_events(scenario()));
        let aggregator = Aggregator::new(store, 25);

        let first = aggregator.compute_summary_at(&at(12, 0)).await.unwrap();
        let second = aggregator.compute_summary_at(&at(12, 0)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_aggregator_propagates_store_failure() {
        let aggregator = Aggregator::new(Arc::new(BrokenStore), 25);
        let err = aggregator.compute_summary_at(&at(12, 0)).await.unwrap_err();
        assert!(matches!(err, LinkpulseError::StoreUnavailable(_)));
    }
}

// =============================================================================
// Recorder
// =============================================================================

struct BrokenStore;

#[async_trait]
impl EventStore for BrokenStore {
    async fn insert(&self, _event: NewClickEvent) -> Result<()> {
        Err(LinkpulseError::store_unavailable("disk full"))
    }
    async fn query_all(&self) -> Result<Vec<ClickEvent>> {
        Err(LinkpulseError::store_unavailable("disk full"))
    }
    async fn count(&self) -> Result<u64> {
        Err(LinkpulseError::store_unavailable("disk full"))
    }
    fn backend_name(&self) -> &str {
        "broken"
    }
}

fn public_ip() -> IpAddr {
    "203.0.113.7".parse().unwrap()
}

mod recorder_tests {
    use super::*;

    fn recorder(store: Arc<MemoryEventStore>) -> Recorder {
        Recorder::new(Enricher::without_geoip(), store)
    }

    #[tokio::test]
    async fn test_visit_is_recorded_with_defaults() {
        let store = Arc::new(MemoryEventStore::new());
        let recorder = recorder(store.clone());

        let ctx = ClientContext {
            page_url: Some("https://bio.example/me".to_string()),
            user_agent: Some(CHROME_UA.to_string()),
            ..Default::default()
        };
        assert_eq!(recorder.record_visit(&ctx).await, RecordOutcome::Recorded);

        let events = store.query_all().await.unwrap();
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert!(e.is_page_visit());
        assert_eq!(e.url, "https://bio.example/me");
        assert_eq!(e.referrer, "direct");
        assert_eq!(e.browser, "Chrome");
        assert_eq!(e.os, "Windows");
        assert_eq!(e.device, DeviceClass::Desktop);
        assert_eq!(e.country, "Unknown");
        assert_eq!(e.ip.as_deref(), Some("Unknown"));
    }

    #[tokio::test]
    async fn test_click_is_recorded() {
        let store = Arc::new(MemoryEventStore::new());
        let recorder = recorder(store.clone());

        let ctx = ClientContext {
            referrer: Some("https://t.co/abc".to_string()),
            ..Default::default()
        };
        let outcome = recorder
            .record_click(&ctx, "store", "https://shop.example")
            .await;
        assert_eq!(outcome, RecordOutcome::Recorded);

        let events = store.query_all().await.unwrap();
        assert_eq!(events[0].slug, "store");
        assert_eq!(events[0].url, "https://shop.example");
        assert_eq!(events[0].referrer, "https://t.co/abc");
        assert_eq!(events[0].browser, "Unknown");
    }

    #[tokio::test]
    async fn test_placeholder_click_writes_nothing() {
        let store = Arc::new(MemoryEventStore::new());
        let recorder = recorder(store.clone());
        let ctx = ClientContext::default();

        assert_eq!(
            recorder.record_click(&ctx, "soon", "#").await,
            RecordOutcome::Skipped
        );
        assert_eq!(
            recorder.record_click(&ctx, "soon", "  ").await,
            RecordOutcome::Skipped
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_reserved_slug_is_refused() {
        let store = Arc::new(MemoryEventStore::new());
        let recorder = recorder(store.clone());

        let outcome = recorder
            .record_click(&ClientContext::default(), PAGE_VISIT_SLUG, "https://x.example")
            .await;
        assert_eq!(outcome, RecordOutcome::Skipped);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let recorder = Recorder::new(Enricher::without_geoip(), Arc::new(BrokenStore));
        let outcome = recorder.record_visit(&ClientContext::default()).await;
        assert_eq!(outcome, RecordOutcome::Failed);

        let handle = recorder.dispatch_click(
            ClientContext::default(),
            "store".to_string(),
            "https://shop.example".to_string(),
        );
        assert_eq!(handle.await.unwrap(), RecordOutcome::Failed);
    }

    #[tokio::test]
    async fn test_dispatch_visit_runs_in_background() {
        let store = Arc::new(MemoryEventStore::new());
        let recorder = recorder(store.clone());

        let handle = recorder.dispatch_visit(ClientContext::default());
        assert_eq!(handle.await.unwrap(), RecordOutcome::Recorded);
        assert_eq!(store.len(), 1);
    }
}

// =============================================================================
// Enricher + GeoIP 链
// =============================================================================

struct SlowLookup {
    calls: AtomicUsize,
}

#[async_trait]
impl GeoIpLookup for SlowLookup {
    async fn lookup(&self, _ip: &str) -> Option<GeoInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        Some(GeoInfo {
            country: Some("US".to_string()),
            ..Default::default()
        })
    }
    fn name(&self) -> &str {
        "slow"
    }
}

struct CountryOnly {
    calls: AtomicUsize,
}

#[async_trait]
impl GeoIpLookup for CountryOnly {
    async fn lookup(&self, _ip: &str) -> Option<GeoInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(GeoInfo {
            country: Some("CL".to_string()),
            ..Default::default()
        })
    }
    fn name(&self) -> &str {
        "country-only"
    }
}

struct AlwaysFails;

#[async_trait]
impl GeoIpLookup for AlwaysFails {
    async fn lookup(&self, _ip: &str) -> Option<GeoInfo> {
        None
    }
    fn name(&self) -> &str {
        "fails"
    }
}

mod enricher_tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_provider_falls_back() {
        let slow = Arc::new(SlowLookup {
            calls: AtomicUsize::new(0),
        });
        let fallback = Arc::new(CountryOnly {
            calls: AtomicUsize::new(0),
        });
        let chain = GeoIpProvider::with_providers(
            vec![
                slow.clone() as Arc<dyn GeoIpLookup>,
                fallback.clone() as Arc<dyn GeoIpLookup>,
            ],
            Duration::from_secs(3),
        );
        let store = Arc::new(MemoryEventStore::new());
        let recorder = Recorder::new(Enricher::with_geoip(chain), store.clone());

        let ctx = ClientContext {
            user_agent: Some(CHROME_UA.to_string()),
            client_ip: Some(public_ip()),
            ..Default::default()
        };
        let started = tokio::time::Instant::now();
        assert_eq!(recorder.record_visit(&ctx).await, RecordOutcome::Recorded);
        assert!(started.elapsed() < Duration::from_secs(60));

        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);

        let events = store.query_all().await.unwrap();
        assert_eq!(events[0].country, "CL");
        assert_eq!(events[0].ip.as_deref(), Some("Unknown"));
        assert_eq!(events[0].isp.as_deref(), Some("Unknown"));
    }

    #[tokio::test]
    async fn test_all_providers_fail() {
        let chain = GeoIpProvider::with_providers(
            vec![
                Arc::new(AlwaysFails) as Arc<dyn GeoIpLookup>,
                Arc::new(AlwaysFails) as Arc<dyn GeoIpLookup>,
            ],
            Duration::from_secs(1),
        );
        let enricher = Enricher::with_geoip(chain);
        let ctx = ClientContext {
            client_ip: Some(public_ip()),
            ..Default::default()
        };

        let enrichment = enricher.enrich(&ctx).await;
        assert_eq!(enrichment.network.country, "Unknown");
        assert_eq!(enrichment.network.ip, "Unknown");
        assert_eq!(enrichment.network.isp, "Unknown");
    }

    #[tokio::test]
    async fn test_private_address_skips_lookup() {
        let lookup = Arc::new(CountryOnly {
            calls: AtomicUsize::new(0),
        });
        let chain = GeoIpProvider::with_providers(
            vec![lookup.clone() as Arc<dyn GeoIpLookup>],
            Duration::from_secs(1),
        );
        let enricher = Enricher::with_geoip(chain);

        for ip in ["127.0.0.1", "192.168.1.20", "::1"] {
            let ctx = ClientContext {
                client_ip: Some(ip.parse().unwrap()),
                ..Default::default()
            };
            assert_eq!(enricher.enrich(&ctx).await.network.country, "Unknown");
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }
}
