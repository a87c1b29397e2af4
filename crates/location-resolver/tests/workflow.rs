//! End-to-end tests for `LocationWorkflow`.
//!
//! The primary geocoder, secondary geocoder and IP geolocation service each
//! get their own `wiremock` server; device positions come from in-process
//! sources.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use geocoding_client::HouseNumberPolicy;
use location_resolver::filler::shared_form;
use location_resolver::{
    AddressSource, BoundingBox, Config, LocationError, LocationSource, LocationStrategy,
    LocationWorkflow, PositionError, PositionOptions, PositionSample, PositionSource,
    ReportedPositionSource, WorkflowSettings,
};

struct Services {
    primary: MockServer,
    secondary: MockServer,
    ip: MockServer,
    cache_dir: TempDir,
}

impl Services {
    async fn start() -> Self {
        Self {
            primary: MockServer::start().await,
            secondary: MockServer::start().await,
            ip: MockServer::start().await,
            cache_dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self) -> Config {
        Config {
            primary_geocoder_url: self.primary.uri(),
            secondary_geocoder_url: self.secondary.uri(),
            ip_geolocation_url: self.ip.uri(),
            user_agent: "location-resolver-test/0.1".to_string(),
            http_timeout: Duration::from_secs(5),
            geocoder_request_interval: Duration::ZERO,
            cache_dir: self.cache_dir.path().to_path_buf(),
            cache_ttl: Duration::from_secs(60),
            bounds: BoundingBox::THAILAND,
            house_number_policy: HouseNumberPolicy::Omit,
        }
    }

    async fn workflow(&self, source: Arc<dyn PositionSource>) -> LocationWorkflow {
        LocationWorkflow::from_config(&self.config(), source, shared_form())
            .await
            .expect("failed to build test workflow")
    }
}

/// Counts watch subscriptions on top of a reported fix
struct CountingSource {
    inner: ReportedPositionSource,
    watches: AtomicUsize,
}

impl CountingSource {
    fn new(sample: Option<PositionSample>) -> Self {
        Self {
            inner: ReportedPositionSource::new(sample),
            watches: AtomicUsize::new(0),
        }
    }
}

impl PositionSource for CountingSource {
    fn watch(
        &self,
        options: PositionOptions,
    ) -> BoxStream<'static, Result<PositionSample, PositionError>> {
        self.watches.fetch_add(1, Ordering::SeqCst);
        self.inner.watch(options)
    }

    fn current_position(
        &self,
        options: PositionOptions,
    ) -> BoxFuture<'_, Result<PositionSample, PositionError>> {
        self.inner.current_position(options)
    }
}

/// A device that never produces a reading
struct SilentSource;

impl PositionSource for SilentSource {
    fn watch(
        &self,
        _options: PositionOptions,
    ) -> BoxStream<'static, Result<PositionSample, PositionError>> {
        stream::pending().boxed()
    }

    fn current_position(
        &self,
        _options: PositionOptions,
    ) -> BoxFuture<'_, Result<PositionSample, PositionError>> {
        Box::pin(futures::future::pending())
    }
}

fn bangkok() -> Arc<dyn PositionSource> {
    Arc::new(ReportedPositionSource::new(Some(PositionSample::new(
        13.7563, 100.5018, 12.0,
    ))))
}

async fn mount_primary(server: &MockServer, address: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "address": address })))
        .mount(server)
        .await;
}

async fn mount_failure(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

#[tokio::test]
async fn bangkok_address_fills_form_in_order() {
    let services = Services::start().await;
    mount_primary(
        &services.primary,
        json!({
            "road": "ถนนสุขุมวิท",
            "suburb": "คลองเตย",
            "state": "กรุงเทพมหานคร",
            "postcode": "10110"
        }),
    )
    .await;

    let workflow = services.workflow(bangkok()).await;
    let resolution = workflow.resolve_and_fill(false).await.unwrap();

    assert_eq!(resolution.address.source_service, AddressSource::Primary);
    assert_eq!(resolution.location.source, LocationSource::DeviceHighAccuracy);
    assert!(!resolution.from_cache);

    let form = workflow.form();
    let form = form.read().await;
    assert!(form.filled_from_location);

    let full = &form.full_address;
    let positions: Vec<usize> = ["ถนนสุขุมวิท", "คลองเตย", "กรุงเทพมหานคร", "10110"]
        .iter()
        .map(|part| full.find(part).unwrap_or_else(|| panic!("{part} missing from {full}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "out of order: {full}");
}

#[tokio::test]
async fn soi_road_is_not_prefixed() {
    let services = Services::start().await;
    mount_primary(
        &services.primary,
        json!({ "road": "ซอยสุขใจ", "suburb": "บางพูด", "postcode": "11120" }),
    )
    .await;

    let workflow = services.workflow(bangkok()).await;
    workflow.resolve_and_fill(false).await.unwrap();

    let form = workflow.form();
    let form = form.read().await;
    assert!(form.address_line.contains("ซอยสุขใจ"));
    assert!(!form.address_line.contains("ถนน"));
}

#[tokio::test]
async fn postcode_is_copied_exactly() {
    let services = Services::start().await;
    mount_primary(
        &services.primary,
        json!({ "road": "พหลโยธิน", "county": "คลองหลวง", "province": "ปทุมธานี", "postcode": "13260" }),
    )
    .await;

    let workflow = services.workflow(bangkok()).await;
    let resolution = workflow.resolve_and_fill(false).await.unwrap();

    assert_eq!(resolution.address.postal_code, "13260");
    assert_eq!(resolution.address.address_line, "ถนนพหลโยธิน");
}

#[tokio::test]
async fn second_run_within_freshness_window_reuses_location() {
    let services = Services::start().await;
    mount_primary(&services.primary, json!({ "road": "สีลม", "postcode": "10500" })).await;

    let source = Arc::new(CountingSource::new(Some(PositionSample::new(
        13.7563, 100.5018, 8.0,
    ))));
    let workflow = services.workflow(source.clone()).await;

    let first = workflow.resolve_and_fill(false).await.unwrap();
    let second = workflow.resolve_and_fill(false).await.unwrap();

    assert_eq!(source.watches.load(Ordering::SeqCst), 1);
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.location, first.location);
}

#[tokio::test]
async fn ended_session_forgets_cached_location() {
    let services = Services::start().await;
    mount_primary(&services.primary, json!({ "road": "สีลม" })).await;

    let source = Arc::new(CountingSource::new(Some(PositionSample::new(
        13.7563, 100.5018, 8.0,
    ))));
    let workflow = services.workflow(source.clone()).await;

    workflow.resolve_and_fill(false).await.unwrap();
    workflow.end_session().await.unwrap();
    assert!(workflow.debug_log().is_empty());

    workflow.resolve_and_fill(false).await.unwrap();
    assert_eq!(source.watches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn secondary_geocoder_used_when_primary_fails() {
    let services = Services::start().await;
    mount_failure(&services.primary).await;
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "display_name": "ถนนสุขุมวิท, คลองเตย, เขตคลองเตย, กรุงเทพมหานคร, 10110, ประเทศไทย"
        })))
        .expect(1)
        .mount(&services.secondary)
        .await;

    let workflow = services.workflow(bangkok()).await;
    let resolution = workflow.resolve_and_fill(false).await.unwrap();

    assert_eq!(resolution.address.source_service, AddressSource::Secondary);
    assert_eq!(resolution.address.postal_code, "10110");
    assert_eq!(resolution.address.district, "เขตคลองเตย");

    let messages: Vec<String> = workflow
        .debug_log()
        .entries()
        .into_iter()
        .map(|entry| entry.message)
        .collect();
    assert!(messages.iter().any(|m| m == "Primary geocoder failed"));
    assert!(messages.iter().any(|m| m == "Secondary geocoder succeeded"));
}

#[tokio::test]
async fn geocoder_failures_degrade_to_coordinate_address() {
    let services = Services::start().await;
    mount_failure(&services.primary).await;
    mount_failure(&services.secondary).await;

    let workflow = services.workflow(bangkok()).await;
    let resolution = workflow.resolve_and_fill(false).await.unwrap();

    assert!(resolution.address.fallback);
    assert_eq!(resolution.address.source_service, AddressSource::Fallback);
    assert!(resolution.address.address_line.contains("13.7563"));
    assert!(resolution.address.address_line.contains("100.5018"));

    let form = workflow.form();
    assert!(form.read().await.filled_from_location);
}

#[tokio::test]
async fn invalid_device_fix_falls_through_to_ip_lookup() {
    let services = Services::start().await;
    mount_primary(&services.primary, json!({ "state": "กรุงเทพมหานคร" })).await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 13.75,
            "longitude": 100.4667
        })))
        .expect(1)
        .mount(&services.ip)
        .await;

    let source = Arc::new(CountingSource::new(Some(PositionSample::new(0.0, 0.0, 5.0))));
    let workflow = services.workflow(source.clone()).await;

    let first = workflow.resolve_and_fill(false).await.unwrap();
    assert_eq!(first.location.source, LocationSource::Ip);
    assert_eq!(first.location.coordinate.latitude, 13.75);
    assert!(!first.address.fallback);
    assert_eq!(first.address.province, "กรุงเทพมหานคร");

    // Only the IP fix was cached
    let second = workflow.resolve_and_fill(false).await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.location.source, LocationSource::Ip);
    assert_eq!(second.location.coordinate.latitude, 13.75);
    assert_ne!(second.location.coordinate.latitude, 0.0);
}

#[tokio::test]
async fn out_of_bounds_fixes_from_every_method_are_reported() {
    let services = Services::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 48.8566,
            "longitude": 2.3522
        })))
        .mount(&services.ip)
        .await;
    for server in [&services.primary, &services.secondary] {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    let source = Arc::new(ReportedPositionSource::new(Some(PositionSample::new(0.0, 0.0, 5.0))));
    let workflow = services.workflow(source).await;

    let err = workflow.resolve_and_fill(false).await.unwrap_err();
    let LocationError::AllLocationMethodsFailed(failures) = &err else {
        panic!("expected every method to fail, got {err:?}");
    };
    assert_eq!(failures.len(), LocationStrategy::CHAIN.len());
    assert!(failures
        .iter()
        .all(|f| matches!(f.error, LocationError::InvalidCoordinate(..))));
    assert!(workflow.form().read().await.address_line.is_empty());
}

#[tokio::test]
async fn ip_lookup_used_when_device_has_no_position() {
    let services = Services::start().await;
    mount_primary(&services.primary, json!({ "state": "กรุงเทพมหานคร" })).await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 13.75,
            "longitude": 100.4667,
            "city": "Bangkok",
            "region": "Bangkok",
            "country_name": "Thailand"
        })))
        .expect(1)
        .mount(&services.ip)
        .await;

    let workflow = services
        .workflow(Arc::new(ReportedPositionSource::default()))
        .await;
    let resolution = workflow.resolve_and_fill(false).await.unwrap();

    assert_eq!(resolution.location.source, LocationSource::Ip);
    assert_eq!(resolution.location.coordinate.accuracy_meters, 5_000.0);
    assert_eq!(resolution.address.province, "กรุงเทพมหานคร");
}

#[tokio::test]
async fn every_location_method_failing_is_reported() {
    let services = Services::start().await;
    mount_failure(&services.ip).await;

    let workflow = services
        .workflow(Arc::new(ReportedPositionSource::default()))
        .await;
    let err = workflow.resolve_and_fill(false).await.unwrap_err();

    let LocationError::AllLocationMethodsFailed(failures) = &err else {
        panic!("unexpected error: {err}");
    };
    let strategies: Vec<LocationStrategy> = failures.iter().map(|f| f.strategy).collect();
    assert_eq!(strategies, LocationStrategy::CHAIN.to_vec());
    assert!(matches!(failures[2].error, LocationError::Network(_)));

    let form = workflow.form();
    assert!(!form.read().await.filled_from_location);
    assert!(!workflow.is_in_progress());
}

#[tokio::test]
async fn concurrent_resolution_is_rejected() {
    let services = Services::start().await;
    mount_failure(&services.ip).await;

    let workflow = services
        .workflow(Arc::new(SilentSource))
        .await
        .with_settings(WorkflowSettings {
            standard_watch_timeout: Duration::from_millis(300),
            single_read_timeout: Duration::from_millis(100),
            ..WorkflowSettings::default()
        });

    let (first, second) = tokio::join!(
        workflow.resolve_and_fill(false),
        workflow.resolve_and_fill(false)
    );

    let results = [first, second];
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(LocationError::AlreadyInProgress)))
        .count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(LocationError::AllLocationMethodsFailed(_))))
        .count();

    assert_eq!(rejected, 1);
    assert_eq!(exhausted, 1);
    assert!(!workflow.is_in_progress());
}
