//! The location resolution session
//!
//! Finds a location by trying each [`LocationStrategy`] in order, turns it
//! into an address and writes the address into the shared form once.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use geocoding_client::{ClientConfig, DisplayNameClient, NominatimClient};
use location_cache::LocationCache;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::constants::{
    EXTENDED_WATCH_TIMEOUT_MS, LOCATION_CACHE_KEY, SINGLE_READ_MAX_AGE_MS, SINGLE_READ_TIMEOUT_MS,
    STANDARD_WATCH_TIMEOUT_MS, TARGET_ACCURACY_METERS,
};
use crate::debug_log::DebugLog;
use crate::error::{LocationError, MethodFailure, Result};
use crate::filler::{self, FormUpdate, SharedForm};
use crate::geocoder::ReverseGeocoder;
use crate::ip::IpLocator;
use crate::position::{AcquisitionOutcome, PositionAcquirer, PositionSource};
use crate::types::{Coordinate, LocationResult, LocationSource, ResolvedAddress};
use crate::validation::CoordinateValidator;

/// One way of finding the current location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationStrategy {
    /// High-accuracy watch, best sample wins
    DeviceWatch,
    /// Low-accuracy single read, device cache allowed
    DeviceSingleRead,
    /// Coarse location from the public IP
    IpLookup,
}

impl LocationStrategy {
    /// Order in which strategies are tried
    pub const CHAIN: [LocationStrategy; 3] = [
        LocationStrategy::DeviceWatch,
        LocationStrategy::DeviceSingleRead,
        LocationStrategy::IpLookup,
    ];
}

impl fmt::Display for LocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceWatch => write!(f, "device watch"),
            Self::DeviceSingleRead => write!(f, "device single read"),
            Self::IpLookup => write!(f, "IP lookup"),
        }
    }
}

/// Timing and accuracy knobs of the strategies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkflowSettings {
    pub target_accuracy_meters: f64,
    pub standard_watch_timeout: Duration,
    pub extended_watch_timeout: Duration,
    pub single_read_timeout: Duration,
    pub single_read_max_age: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            target_accuracy_meters: TARGET_ACCURACY_METERS,
            standard_watch_timeout: Duration::from_millis(STANDARD_WATCH_TIMEOUT_MS),
            extended_watch_timeout: Duration::from_millis(EXTENDED_WATCH_TIMEOUT_MS),
            single_read_timeout: Duration::from_millis(SINGLE_READ_TIMEOUT_MS),
            single_read_max_age: Duration::from_millis(SINGLE_READ_MAX_AGE_MS),
        }
    }
}

/// Everything one successful run produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub location: LocationResult,
    pub address: ResolvedAddress,
    pub full_address: String,
    pub from_cache: bool,
}

/// Resets the in-progress flag when the run ends, however it ends
struct InProgressGuard<'a>(&'a AtomicBool);

impl<'a> InProgressGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LocationError::AlreadyInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct LocationWorkflow {
    position_source: Arc<dyn PositionSource>,
    ip_locator: IpLocator,
    geocoder: ReverseGeocoder,
    cache: LocationCache,
    debug_log: DebugLog,
    form: SharedForm,
    settings: WorkflowSettings,
    in_progress: AtomicBool,
}

impl LocationWorkflow {
    pub fn new(
        position_source: Arc<dyn PositionSource>,
        ip_locator: IpLocator,
        geocoder: ReverseGeocoder,
        cache: LocationCache,
        form: SharedForm,
    ) -> Self {
        Self {
            position_source,
            ip_locator,
            geocoder,
            cache,
            debug_log: DebugLog::new(),
            form,
            settings: WorkflowSettings::default(),
            in_progress: AtomicBool::new(false),
        }
    }

    /// Build every client from configuration and initialise the cache
    pub async fn from_config(
        config: &Config,
        position_source: Arc<dyn PositionSource>,
        form: SharedForm,
    ) -> Result<Self> {
        let primary = NominatimClient::with_config(
            ClientConfig::new(&config.primary_geocoder_url)
                .with_user_agent(&config.user_agent)
                .with_timeout(config.http_timeout)
                .with_request_interval(config.geocoder_request_interval),
            config.house_number_policy,
        )?;
        let secondary = DisplayNameClient::with_config(
            ClientConfig::new(&config.secondary_geocoder_url)
                .with_user_agent(&config.user_agent)
                .with_timeout(config.http_timeout),
            config.house_number_policy,
        )?;
        let geocoder = ReverseGeocoder::new(
            primary,
            secondary,
            CoordinateValidator::new(config.bounds),
        );

        let ip_locator = IpLocator::new(
            &config.ip_geolocation_url,
            &config.user_agent,
            config.http_timeout,
        )?;

        let cache = LocationCache::new(
            config.cache_dir.clone(),
            LOCATION_CACHE_KEY,
            config.cache_ttl,
        );
        cache.init().await?;

        Ok(Self::new(position_source, ip_locator, geocoder, cache, form))
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn ip_locator(&self) -> &IpLocator {
        &self.ip_locator
    }

    pub fn geocoder(&self) -> &ReverseGeocoder {
        &self.geocoder
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.debug_log
    }

    pub fn form(&self) -> SharedForm {
        self.form.clone()
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Find the current location, reusing a fresh cached one
    pub async fn locate(&self, extended_accuracy: bool) -> Result<LocationResult> {
        let _guard = InProgressGuard::acquire(&self.in_progress)?;
        self.debug_log.clear();
        let (location, _) = self.find_location(extended_accuracy).await?;
        Ok(location)
    }

    /// Locate, reverse geocode and fill the form
    ///
    /// Only fails when no location could be found at all; geocoding problems
    /// degrade to a coordinate-only address.
    pub async fn resolve_and_fill(&self, extended_accuracy: bool) -> Result<Resolution> {
        let _guard = InProgressGuard::acquire(&self.in_progress)?;
        self.debug_log.clear();
        info!(extended_accuracy, "Resolving address from location");

        let (location, from_cache) = self.find_location(extended_accuracy).await?;
        let address = self
            .geocoder
            .reverse_geocode(&location.coordinate, &self.debug_log)
            .await;

        let FormUpdate { full_address, .. } = filler::fill(&self.form, &address).await;
        self.debug_log.record(
            "Address form filled",
            Some(json!({ "source": address.source_service, "fallback": address.fallback })),
        );

        info!(
            source = ?address.source_service,
            fallback = address.fallback,
            from_cache,
            "Address resolved"
        );

        Ok(Resolution {
            location,
            address,
            full_address,
            from_cache,
        })
    }

    /// Drop session state: the debug log and the cached location
    pub async fn end_session(&self) -> Result<()> {
        self.debug_log.clear();
        self.cache.clear().await?;
        Ok(())
    }

    async fn find_location(&self, extended_accuracy: bool) -> Result<(LocationResult, bool)> {
        let validator = self.geocoder.validator();

        if let Some(cached) = self
            .cache
            .load::<LocationResult>()
            .await
            .filter(|c| validator.is_valid(c.coordinate.latitude, c.coordinate.longitude))
        {
            self.debug_log.record(
                "Using cached location",
                Some(json!({
                    "lat": cached.coordinate.latitude,
                    "lon": cached.coordinate.longitude,
                    "capturedAt": cached.captured_at,
                })),
            );
            return Ok((cached, true));
        }

        let mut failures = Vec::new();

        for strategy in LocationStrategy::CHAIN {
            self.debug_log.record(format!("Trying {strategy}"), None);

            // Flaky hardware reports garbage instead of failing
            let attempt = self
                .attempt(strategy, extended_accuracy)
                .await
                .and_then(|location| {
                    let Coordinate { latitude, longitude, .. } = location.coordinate;
                    validator.validate(latitude, longitude)?;
                    Ok(location)
                });

            match attempt {
                Ok(location) => {
                    self.debug_log.record(
                        format!("{strategy} succeeded"),
                        Some(json!({
                            "lat": location.coordinate.latitude,
                            "lon": location.coordinate.longitude,
                            "accuracy": location.coordinate.accuracy_meters,
                            "timedOut": location.timed_out,
                        })),
                    );
                    if let Err(e) = self.cache.store(&location).await {
                        warn!(error = %e, "Failed to cache location");
                    }
                    return Ok((location, false));
                }
                Err(e) => {
                    warn!(%strategy, error = %e, "Location method failed");
                    self.debug_log.record(
                        format!("{strategy} failed"),
                        Some(json!({ "error": e.to_string() })),
                    );
                    failures.push(MethodFailure { strategy, error: e });
                }
            }
        }

        error!(attempts = failures.len(), "All location methods failed");
        Err(LocationError::AllLocationMethodsFailed(failures))
    }

    async fn attempt(
        &self,
        strategy: LocationStrategy,
        extended_accuracy: bool,
    ) -> Result<LocationResult> {
        let acquirer = PositionAcquirer::new(self.position_source.as_ref())
            .with_target_accuracy(self.settings.target_accuracy_meters);

        match strategy {
            LocationStrategy::DeviceWatch => {
                let timeout = if extended_accuracy {
                    self.settings.extended_watch_timeout
                } else {
                    self.settings.standard_watch_timeout
                };
                let acquired = acquirer.acquire(true, timeout).await?;
                Ok(LocationResult {
                    coordinate: acquired.sample.coordinate(),
                    source: LocationSource::DeviceHighAccuracy,
                    captured_at: acquired.sample.timestamp,
                    timed_out: acquired.outcome == AcquisitionOutcome::TimedOut,
                })
            }
            LocationStrategy::DeviceSingleRead => {
                let sample = acquirer
                    .read_once(
                        self.settings.single_read_timeout,
                        self.settings.single_read_max_age,
                    )
                    .await?;
                Ok(LocationResult {
                    coordinate: sample.coordinate(),
                    source: LocationSource::DeviceStandard,
                    captured_at: sample.timestamp,
                    timed_out: false,
                })
            }
            LocationStrategy::IpLookup => self.ip_locator.locate().await,
        }
    }
}
