//! Page view and event reporting.
//!
//! Tracking is best effort. A hit that the endpoint rejects or never receives
//! is logged once at `info` and reported back as a [`Delivery`], never as an
//! error, so a storefront request is not disrupted by analytics. The only
//! error surfaced is a failure of the host configuration store while
//! resolving the client id.

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::config::CollectorConfig;
use crate::error::StoreError;
use crate::hit::{Event, HitParams, PageView};
use crate::http::HttpClient;
use crate::identity::ClientIdentity;
use crate::stats::{BeaconStats, StatsSnapshot};
use crate::store::ConfigStore;

const FORM_CONTENT_TYPE: &str = "Content-type: application/x-www-form-urlencoded";

/// What happened to a hit after it was handed to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Endpoint answered 200.
    Delivered,
    /// Endpoint answered with some other status.
    Rejected { status: u16 },
    /// No response was received.
    Unreachable,
}

impl Delivery {
    fn from_code(code: u16) -> Self {
        match code {
            200 => Delivery::Delivered,
            0 => Delivery::Unreachable,
            status => Delivery::Rejected { status },
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

struct ReporterInner<S> {
    http: HttpClient,
    store: S,
    identity: ClientIdentity,
    endpoint: String,
    tracking_id: String,
    stats: BeaconStats,
}

/// Sends hits for one installation. Cheap to clone (Arc); clones share the
/// cached client id and counters.
pub struct Reporter<S> {
    inner: Arc<ReporterInner<S>>,
}

impl<S> Clone for Reporter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: ConfigStore> Reporter<S> {
    pub fn new(http: HttpClient, store: S, collector: &CollectorConfig) -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                http,
                store,
                identity: ClientIdentity::new(),
                endpoint: collector.endpoint.clone(),
                tracking_id: collector.tracking_id.clone(),
                stats: BeaconStats::new(),
            }),
        }
    }

    /// The installation's client id, created and persisted on first use.
    pub async fn client_id(&self) -> Result<&str, StoreError> {
        self.inner.identity.get(&self.inner.store).await
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Report a page view.
    pub async fn track_page_view(&self, page: &PageView) -> Result<Delivery, StoreError> {
        let client_id = self.client_id().await?;
        let hit = HitParams::page_view(page, &self.inner.tracking_id, client_id);
        Ok(self
            .send_hit(
                hit,
                client_id,
                "Reporter::track_page_view",
                "Page view was not tracked by the measurement endpoint",
            )
            .await)
    }

    /// Report an event.
    pub async fn track_event(&self, event: &Event) -> Result<Delivery, StoreError> {
        let client_id = self.client_id().await?;
        let hit = HitParams::event(event, &self.inner.tracking_id, client_id);
        Ok(self
            .send_hit(
                hit,
                client_id,
                "Reporter::track_event",
                "Event was not tracked by the measurement endpoint",
            )
            .await)
    }

    async fn send_hit(
        &self,
        hit: HitParams,
        client_id: &str,
        caller: &'static str,
        failure_message: &'static str,
    ) -> Delivery {
        let span = beacon_tracing::hit_span!(hit.hit_type(), client_id);

        async {
            let stats = &self.inner.stats;

            let code = match hit.to_form() {
                Ok(body) => {
                    stats.inc_sent();
                    let start = Instant::now();
                    let response = self
                        .inner
                        .http
                        .post(&self.inner.endpoint, &[FORM_CONTENT_TYPE], body)
                        .await;
                    tracing::Span::current()
                        .record("latency_ms", start.elapsed().as_millis() as u64);
                    response.code()
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to encode hit parameters");
                    0
                }
            };

            tracing::Span::current().record("status", code);

            let delivery = Delivery::from_code(code);
            match delivery {
                Delivery::Delivered => {
                    stats.inc_delivered();
                    tracing::debug!(status = code, "Hit delivered");
                }
                Delivery::Rejected { .. } => stats.inc_rejected(),
                Delivery::Unreachable => stats.inc_unreachable(),
            }

            if code != 200 {
                tracing::info!(caller = caller, status = code, "{}", failure_message);
            }

            delivery
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::future::IntoFuture;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU16, Ordering};

    use axum::http::{HeaderMap, StatusCode};
    use tokio::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::identity::CLIENT_ID_KEY;
    use crate::store::MemoryStore;

    /// Captured `(content-type, body)` pairs.
    type Hits = Arc<Mutex<Vec<(Option<String>, String)>>>;

    struct MockCollector {
        addr: SocketAddr,
        status: Arc<AtomicU16>,
        hits: Hits,
    }

    impl MockCollector {
        fn endpoint(&self) -> String {
            format!("http://{}/collect", self.addr)
        }

        fn set_status(&self, status: u16) {
            self.status.store(status, Ordering::Relaxed);
        }
    }

    async fn spawn_collector(status: u16) -> MockCollector {
        let hits: Hits = Arc::new(Mutex::new(Vec::new()));
        let status = Arc::new(AtomicU16::new(status));
        let hits_clone = hits.clone();
        let status_clone = status.clone();

        let app = axum::Router::new().route(
            "/collect",
            axum::routing::post(move |headers: HeaderMap, body: String| {
                let hits = hits_clone.clone();
                let status = status_clone.clone();
                async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    hits.lock().await.push((content_type, body));
                    StatusCode::from_u16(status.load(Ordering::Relaxed)).unwrap()
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, app).into_future());

        MockCollector { addr, status, hits }
    }

    async fn refused_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}/collect")
    }

    fn build_reporter<S: ConfigStore>(store: S, endpoint: String) -> Reporter<S> {
        let collector = CollectorConfig {
            endpoint,
            ..CollectorConfig::default()
        };
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        Reporter::new(HttpClient::new(client), store, &collector)
    }

    /// One captured event at INFO or above, from any target.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct LogRecord {
        level: tracing::Level,
        target: String,
        status: Option<u64>,
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<LogRecord>>>);

    impl CapturedLogs {
        fn records(&self) -> Vec<LogRecord> {
            self.0.lock().unwrap().clone()
        }
    }

    struct StatusVisitor(Option<u64>);

    impl tracing::field::Visit for StatusVisitor {
        fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
            if field.name() == "status" {
                self.0 = Some(value);
            }
        }

        fn record_debug(&mut self, _field: &tracing::field::Field, _value: &dyn fmt::Debug) {}
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CapturedLogs {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let meta = event.metadata();
            // Level ordering: more verbose levels compare greater.
            if *meta.level() > tracing::Level::INFO {
                return;
            }
            let mut visitor = StatusVisitor(None);
            event.record(&mut visitor);
            self.0.lock().unwrap().push(LogRecord {
                level: *meta.level(),
                target: meta.target().to_string(),
                status: visitor.0,
            });
        }
    }

    fn failure_record(status: u64) -> LogRecord {
        LogRecord {
            level: tracing::Level::INFO,
            target: "storefront_beacon::reporter".to_string(),
            status: Some(status),
        }
    }

    struct BrokenStore;

    impl ConfigStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn update_global(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[tokio::test]
    async fn test_event_body_matches_measurement_protocol() {
        let collector = spawn_collector(200).await;
        let store = MemoryStore::new().with(CLIENT_ID_KEY, "fixed-cid");
        let reporter = build_reporter(store, collector.endpoint());

        let event = Event::new("cart", "add").with_label("sku123").with_value(2);
        let delivery = reporter.track_event(&event).await.unwrap();
        assert_eq!(delivery, Delivery::Delivered);

        let hits = collector.hits.lock().await;
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].0.as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(
            hits[0].1,
            "v=1&t=event&tid=UA-54881067-1&cid=fixed-cid&ec=cart&ea=add&el=sku123&ev=2"
        );
    }

    #[tokio::test]
    async fn test_page_view_body() {
        let collector = spawn_collector(200).await;
        let store = MemoryStore::new().with(CLIENT_ID_KEY, "fixed-cid");
        let reporter = build_reporter(store, collector.endpoint());

        let page = PageView::new("/en/3-clothes", "shop.example.com");
        assert!(reporter.track_page_view(&page).await.unwrap().is_delivered());

        let hits = collector.hits.lock().await;
        assert_eq!(
            hits[0].1,
            "v=1&t=pageview&tid=UA-54881067-1&cid=fixed-cid\
             &dh=shop.example.com&dp=%2Fen%2F3-clothes&dt=unknown"
        );
    }

    #[tokio::test]
    async fn test_tracking_never_errors_on_delivery_failure() {
        let collector = spawn_collector(200).await;
        let ok = build_reporter(MemoryStore::new(), collector.endpoint());
        let page = PageView::new("/", "shop.example.com");
        let event = Event::new("cart", "add");

        assert_eq!(ok.track_page_view(&page).await.unwrap(), Delivery::Delivered);
        assert_eq!(ok.track_event(&event).await.unwrap(), Delivery::Delivered);

        collector.set_status(404);
        assert_eq!(
            ok.track_page_view(&page).await.unwrap(),
            Delivery::Rejected { status: 404 }
        );
        assert_eq!(
            ok.track_event(&event).await.unwrap(),
            Delivery::Rejected { status: 404 }
        );

        let down = build_reporter(MemoryStore::new(), refused_endpoint().await);
        assert_eq!(
            down.track_page_view(&page).await.unwrap(),
            Delivery::Unreachable
        );
        assert_eq!(down.track_event(&event).await.unwrap(), Delivery::Unreachable);
    }

    #[tokio::test]
    async fn test_non_200_logs_once_with_status() {
        let logs = CapturedLogs::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(logs.clone()));

        let collector = spawn_collector(200).await;
        let reporter = build_reporter(MemoryStore::new(), collector.endpoint());
        let event = Event::new("cart", "add");

        // First hit also generates the client id; that must stay below INFO.
        reporter.track_event(&event).await.unwrap();
        assert_eq!(logs.records(), Vec::<LogRecord>::new(), "200 must not log");

        collector.set_status(404);
        reporter.track_event(&event).await.unwrap();
        assert_eq!(logs.records(), vec![failure_record(404)]);
    }

    #[tokio::test]
    async fn test_unreachable_logs_once_across_all_targets() {
        let logs = CapturedLogs::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(logs.clone()));

        let reporter = build_reporter(MemoryStore::new(), refused_endpoint().await);
        reporter
            .track_page_view(&PageView::new("/", "shop.example.com"))
            .await
            .unwrap();

        reporter.track_event(&Event::new("cart", "add")).await.unwrap();

        assert_eq!(logs.records(), vec![failure_record(0), failure_record(0)]);
    }

    #[tokio::test]
    async fn test_client_id_created_once_and_reused() {
        let collector = spawn_collector(200).await;
        let store = Arc::new(MemoryStore::new());
        let reporter = build_reporter(store.clone(), collector.endpoint());

        reporter.track_event(&Event::new("a", "b")).await.unwrap();
        reporter
            .clone()
            .track_page_view(&PageView::new("/", "shop.example.com"))
            .await
            .unwrap();

        assert_eq!(store.writes(), 1);
        let cid = store.get(CLIENT_ID_KEY).unwrap().unwrap();
        let expected = format!("cid={cid}&");
        let hits = collector.hits.lock().await;
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|(_, body)| body.contains(&expected)));
    }

    #[tokio::test]
    async fn test_store_failure_propagates_without_sending() {
        let collector = spawn_collector(200).await;
        let reporter = build_reporter(BrokenStore, collector.endpoint());

        let err = reporter
            .track_event(&Event::new("cart", "add"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Poisoned));
        assert!(collector.hits.lock().await.is_empty());
        assert_eq!(reporter.stats().hits_sent, 0);
    }

    #[tokio::test]
    async fn test_stats_count_each_outcome() {
        let collector = spawn_collector(200).await;
        let reporter = build_reporter(MemoryStore::new(), collector.endpoint());
        let event = Event::new("cart", "add");

        reporter.track_event(&event).await.unwrap();
        collector.set_status(500);
        reporter.track_event(&event).await.unwrap();

        let down = build_reporter(MemoryStore::new(), refused_endpoint().await);
        down.track_event(&event).await.unwrap();

        assert_eq!(
            reporter.stats(),
            StatsSnapshot {
                hits_sent: 2,
                delivered: 1,
                rejected: 1,
                unreachable: 0,
            }
        );
        assert_eq!(down.stats().unreachable, 1);
    }
}
