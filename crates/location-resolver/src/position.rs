//! Device position acquisition
//!
//! A [`PositionSource`] exposes the device capability in its two modes: a
//! continuous watch (a stream of samples) and a single read. The
//! [`PositionAcquirer`] drives a watch until a sample is accurate enough or a
//! deadline passes, keeping the best sample seen.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::TARGET_ACCURACY_METERS;
use crate::error::PositionError;
use crate::types::Coordinate;

/// Parameters for either positioning mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest device-cached position that may be returned
    pub maximum_age: Duration,
}

/// One reading from the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, accuracy_meters: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_meters,
            timestamp: Utc::now(),
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude, self.accuracy_meters)
    }
}

/// Device positioning capability
pub trait PositionSource: Send + Sync {
    /// Subscribe to position updates. Dropping the stream ends the subscription.
    fn watch(&self, options: PositionOptions)
        -> BoxStream<'static, Result<PositionSample, PositionError>>;

    /// Read the position once
    fn current_position(
        &self,
        options: PositionOptions,
    ) -> BoxFuture<'_, Result<PositionSample, PositionError>>;
}

/// Why a watch stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// A sample met the target accuracy
    AccuracyReached,
    /// The deadline passed; the best sample so far is returned
    TimedOut,
    /// The source closed the watch on its own
    StreamEnded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquiredPosition {
    pub sample: PositionSample,
    pub outcome: AcquisitionOutcome,
    pub samples_seen: usize,
}

/// Samples a [`PositionSource`] until the fix is good enough
pub struct PositionAcquirer<'a> {
    source: &'a dyn PositionSource,
    target_accuracy_meters: f64,
}

impl<'a> PositionAcquirer<'a> {
    pub fn new(source: &'a dyn PositionSource) -> Self {
        Self {
            source,
            target_accuracy_meters: TARGET_ACCURACY_METERS,
        }
    }

    pub fn with_target_accuracy(mut self, meters: f64) -> Self {
        self.target_accuracy_meters = meters;
        self
    }

    /// Watch the device position until a sample within the target accuracy
    /// arrives or `timeout` elapses.
    ///
    /// The watch is dropped before returning on every path.
    pub async fn acquire(
        &self,
        high_accuracy: bool,
        timeout: Duration,
    ) -> Result<AcquiredPosition, PositionError> {
        let options = PositionOptions {
            enable_high_accuracy: high_accuracy,
            timeout,
            maximum_age: Duration::ZERO,
        };

        let mut samples = self.source.watch(options);
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut best: Option<PositionSample> = None;
        let mut samples_seen = 0usize;
        let mut last_error: Option<PositionError> = None;

        let finished = loop {
            tokio::select! {
                _ = &mut deadline => break Ok(AcquisitionOutcome::TimedOut),
                next = samples.next() => match next {
                    Some(Ok(sample)) => {
                        samples_seen += 1;
                        debug!(
                            lat = sample.latitude,
                            lon = sample.longitude,
                            accuracy = sample.accuracy_meters,
                            samples_seen,
                            "Position sample"
                        );
                        if best
                            .as_ref()
                            .map_or(true, |b| sample.accuracy_meters < b.accuracy_meters)
                        {
                            best = Some(sample);
                        }
                        if sample.accuracy_meters <= self.target_accuracy_meters {
                            break Ok(AcquisitionOutcome::AccuracyReached);
                        }
                    }
                    Some(Err(PositionError::PermissionDenied)) => {
                        break Err(PositionError::PermissionDenied);
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Position watch reported an error");
                        last_error = Some(e);
                    }
                    None => break Ok(AcquisitionOutcome::StreamEnded),
                },
            }
        };

        // Cancel the subscription
        drop(samples);

        let outcome = finished?;
        match best {
            Some(sample) => Ok(AcquiredPosition {
                sample,
                outcome,
                samples_seen,
            }),
            None => Err(match outcome {
                AcquisitionOutcome::TimedOut => PositionError::Unavailable(format!(
                    "no position samples within {} ms",
                    timeout.as_millis()
                )),
                _ => last_error.unwrap_or_else(|| {
                    PositionError::Unavailable("position watch ended without samples".to_string())
                }),
            }),
        }
    }

    /// Single low-accuracy read that may return a device-cached position
    pub async fn read_once(
        &self,
        timeout: Duration,
        maximum_age: Duration,
    ) -> Result<PositionSample, PositionError> {
        let options = PositionOptions {
            enable_high_accuracy: false,
            timeout,
            maximum_age,
        };

        match tokio::time::timeout(timeout, self.source.current_position(options)).await {
            Ok(result) => result,
            Err(_) => Err(PositionError::Timeout),
        }
    }
}

/// A position reported from outside the process, such as a client-supplied fix
#[derive(Debug, Clone, Default)]
pub struct ReportedPositionSource {
    sample: Option<PositionSample>,
}

impl ReportedPositionSource {
    pub fn new(sample: Option<PositionSample>) -> Self {
        Self { sample }
    }

    fn reading(&self) -> Result<PositionSample, PositionError> {
        self.sample
            .ok_or_else(|| PositionError::Unavailable("no device position reported".to_string()))
    }
}

impl PositionSource for ReportedPositionSource {
    fn watch(
        &self,
        _options: PositionOptions,
    ) -> BoxStream<'static, Result<PositionSample, PositionError>> {
        stream::iter([self.reading()]).boxed()
    }

    fn current_position(
        &self,
        _options: PositionOptions,
    ) -> BoxFuture<'_, Result<PositionSample, PositionError>> {
        let reading = self.reading();
        Box::pin(async move { reading })
    }
}
