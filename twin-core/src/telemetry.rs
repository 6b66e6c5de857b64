//! Live telemetry cache.
//!
//! The hub keeps a last-value cache per telemetry key (battery charge,
//! solar output, tank levels) with the timestamp of each write. Refreshes
//! are driven by the session clock through an accumulator, never by a
//! background thread. Two modes:
//!
//! - **Mock**: every refresh draws a uniform random value per configured
//!   channel. The twin is designed for air-gap operation, so this is the
//!   default.
//! - **Live**: a refresh interval elapsing signals the driver to poll the
//!   backend ([`telemetry_rest::TelemetryClient`]); a failed poll falls
//!   back to mock generation for that refresh.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use telemetry_rest::TelemetryClient;

/// Default refresh interval in seconds.
const DEFAULT_UPDATE_INTERVAL: f32 = 5.0;

/// A cached telemetry reading. Value and timestamp are always written
/// together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Channel key (e.g. "BatteryCharge").
    pub key: String,

    /// Latest numeric reading.
    pub value: f64,

    /// Session-clock time of the write, in seconds.
    pub timestamp: f64,
}

/// Telemetry operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TelemetryMode {
    /// Synthesize random values per channel.
    #[default]
    Mock,

    /// Poll a configured backend; fall back to mock on failure.
    Live,
}

/// A mock telemetry channel with its value range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockChannel {
    pub key: String,
    pub min: f64,
    pub max: f64,
}

impl MockChannel {
    pub fn new(key: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            key: key.into(),
            min,
            max,
        }
    }
}

/// Channels for the systems modeled on the homestead.
pub fn default_mock_channels() -> Vec<MockChannel> {
    vec![
        MockChannel::new("BatteryCharge", 20.0, 100.0),
        MockChannel::new("SolarOutputWatts", 0.0, 3200.0),
        MockChannel::new("WaterTankLevel", 10.0, 100.0),
        MockChannel::new("GreenhouseTempC", 12.0, 38.0),
        MockChannel::new("GeneratorFuelPct", 0.0, 100.0),
    ]
}

/// Status color for a displayed telemetry value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusColor {
    Green,
    Yellow,
    Red,
}

/// Thresholds mapping a value to a status color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    /// Threshold for green (normal).
    pub green: f64,

    /// Threshold for yellow (warning).
    pub yellow: f64,

    /// Threshold for red (critical); lower bound of the display scale.
    pub red: f64,

    /// Whether lower values are better (e.g. temperature vs. charge).
    pub lower_is_better: bool,
}

impl StatusThresholds {
    pub fn new(green: f64, yellow: f64, red: f64, lower_is_better: bool) -> Self {
        Self {
            green,
            yellow,
            red,
            lower_is_better,
        }
    }

    /// Classify a value monotonically against the thresholds.
    pub fn classify(&self, value: f64) -> StatusColor {
        if self.lower_is_better {
            if value <= self.green {
                StatusColor::Green
            } else if value <= self.yellow {
                StatusColor::Yellow
            } else {
                StatusColor::Red
            }
        } else if value >= self.green {
            StatusColor::Green
        } else if value >= self.yellow {
            StatusColor::Yellow
        } else {
            StatusColor::Red
        }
    }
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            green: 80.0,
            yellow: 60.0,
            red: 30.0,
            lower_is_better: false,
        }
    }
}

type SampleObserver = Box<dyn FnMut(&TelemetrySample) + Send>;

/// Last-value telemetry cache with tick-driven refresh.
pub struct TelemetryHub {
    mode: TelemetryMode,
    channels: Vec<MockChannel>,
    cache: HashMap<String, TelemetrySample>,
    update_interval: f32,
    accumulator: f32,
    clock: f64,
    active: bool,
    observers: Vec<SampleObserver>,
}

impl TelemetryHub {
    /// Create a hub with the default channels and refresh interval.
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_UPDATE_INTERVAL)
    }

    pub fn with_interval(update_interval: f32) -> Self {
        Self {
            mode: TelemetryMode::Mock,
            channels: default_mock_channels(),
            cache: HashMap::new(),
            update_interval,
            accumulator: 0.0,
            clock: 0.0,
            active: false,
            observers: Vec::new(),
        }
    }

    pub fn set_channels(&mut self, channels: Vec<MockChannel>) {
        self.channels = channels;
    }

    pub fn channels(&self) -> &[MockChannel] {
        &self.channels
    }

    pub fn mode(&self) -> TelemetryMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TelemetryMode) {
        self.mode = mode;
    }

    pub fn update_interval(&self) -> f32 {
        self.update_interval
    }

    /// Current session-clock time in seconds.
    pub fn now(&self) -> f64 {
        self.clock
    }

    /// Begin periodic refresh. Idempotent; the first refresh fires
    /// immediately in mock mode so displays have data from the start.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.accumulator = 0.0;
        tracing::info!(mode = ?self.mode, interval = self.update_interval, "telemetry started");
        if self.mode == TelemetryMode::Mock {
            self.refresh_mock();
        }
    }

    /// Cancel periodic refresh. Idempotent. The cache keeps its last
    /// values; they will go stale.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        tracing::info!("telemetry stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advance the session clock and fire a refresh when the interval
    /// has elapsed.
    ///
    /// Returns true when a refresh interval elapsed this tick; in live
    /// mode that is the signal to call [`Self::poll_live`].
    pub fn tick(&mut self, dt: f32) -> bool {
        self.clock += dt as f64;
        if !self.active {
            return false;
        }

        self.accumulator += dt;
        if self.accumulator < self.update_interval {
            return false;
        }
        self.accumulator = 0.0;

        if self.mode == TelemetryMode::Mock {
            self.refresh_mock();
        }
        true
    }

    /// Draw a fresh mock value for every channel.
    pub fn refresh_mock(&mut self) {
        let mut rng = rand::thread_rng();
        let drawn: Vec<(String, f64)> = self
            .channels
            .iter()
            .map(|channel| {
                (
                    channel.key.clone(),
                    rng.gen_range(channel.min..=channel.max),
                )
            })
            .collect();
        for (key, value) in drawn {
            self.write_sample(key, value);
        }
    }

    /// Poll the backend for every configured channel and ingest the
    /// readings. A failed poll falls back to mock generation so displays
    /// keep moving while the backend is unreachable.
    pub async fn poll_live(&mut self, client: &TelemetryClient) {
        let keys: Vec<String> = self.channels.iter().map(|c| c.key.clone()).collect();
        match client.poll(&keys).await {
            Ok(readings) => {
                for (key, value) in readings {
                    self.write_sample(key, value);
                }
            }
            Err(error) => {
                tracing::warn!(%error, "telemetry poll failed; generating mock data");
                self.refresh_mock();
            }
        }
    }

    /// Write a single reading at the current clock, e.g. from a custom
    /// backend integration.
    pub fn ingest(&mut self, key: impl Into<String>, value: f64) {
        self.write_sample(key.into(), value);
    }

    /// Latest value for a key, if the key has ever been populated.
    pub fn value(&self, key: &str) -> Option<f64> {
        self.cache.get(key).map(|s| s.value)
    }

    /// Latest full sample for a key.
    pub fn sample(&self, key: &str) -> Option<&TelemetrySample> {
        self.cache.get(key)
    }

    /// All keys with cached readings.
    pub fn keys(&self) -> Vec<&str> {
        self.cache.keys().map(String::as_str).collect()
    }

    /// Whether a key's reading is stale: never populated, or older than
    /// twice the update interval. A reading exactly 2x the interval old
    /// is still fresh.
    pub fn is_stale(&self, key: &str) -> bool {
        match self.cache.get(key) {
            Some(sample) => self.clock - sample.timestamp > 2.0 * self.update_interval as f64,
            None => true,
        }
    }

    /// Register an observer called for every written sample.
    pub fn on_sample(&mut self, observer: impl FnMut(&TelemetrySample) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn write_sample(&mut self, key: String, value: f64) {
        let sample = TelemetrySample {
            key: key.clone(),
            value,
            timestamp: self.clock,
        };
        self.cache.insert(key, sample.clone());
        for observer in &mut self.observers {
            observer(&sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_start_stop_idempotent() {
        let mut hub = TelemetryHub::with_interval(1.0);
        assert!(!hub.is_active());

        hub.start();
        hub.start();
        assert!(hub.is_active());

        hub.stop();
        hub.stop();
        assert!(!hub.is_active());
    }

    #[test]
    fn test_mock_refresh_populates_channels_in_range() {
        let mut hub = TelemetryHub::with_interval(1.0);
        hub.set_channels(vec![MockChannel::new("BatteryCharge", 20.0, 100.0)]);
        hub.start();

        let value = hub.value("BatteryCharge").expect("channel populated on start");
        assert!((20.0..=100.0).contains(&value));
        assert!(hub.value("SolarOutputWatts").is_none());
    }

    #[test]
    fn test_tick_fires_on_interval() {
        let mut hub = TelemetryHub::with_interval(1.0);
        hub.start();

        assert!(!hub.tick(0.4));
        assert!(!hub.tick(0.4));
        assert!(hub.tick(0.4));

        // No refresh while stopped, but the clock still advances
        hub.stop();
        assert!(!hub.tick(2.0));
        assert!(hub.now() > 3.0);
    }

    #[test]
    fn test_value_and_timestamp_written_together() {
        let mut hub = TelemetryHub::with_interval(1.0);
        hub.tick(7.5);
        hub.ingest("BatteryCharge", 88.0);

        let sample = hub.sample("BatteryCharge").unwrap();
        assert_eq!(sample.value, 88.0);
        assert_eq!(sample.timestamp, 7.5);
    }

    #[test]
    fn test_staleness_boundary() {
        let mut hub = TelemetryHub::with_interval(1.0);
        hub.ingest("BatteryCharge", 50.0);

        // 1.5s old: fresh (boundary is strictly greater than 2x interval)
        hub.tick(1.5);
        assert!(!hub.is_stale("BatteryCharge"));

        // Exactly 2.0s old: still fresh
        hub.tick(0.5);
        assert!(!hub.is_stale("BatteryCharge"));

        // 3.0s old: stale
        hub.tick(1.0);
        assert!(hub.is_stale("BatteryCharge"));

        // Never-populated keys are always stale
        assert!(hub.is_stale("WaterTankLevel"));
    }

    #[test]
    fn test_classify_higher_is_better() {
        let thresholds = StatusThresholds::new(80.0, 60.0, 30.0, false);
        assert_eq!(thresholds.classify(85.0), StatusColor::Green);
        assert_eq!(thresholds.classify(80.0), StatusColor::Green);
        assert_eq!(thresholds.classify(70.0), StatusColor::Yellow);
        assert_eq!(thresholds.classify(10.0), StatusColor::Red);
    }

    #[test]
    fn test_classify_lower_is_better() {
        // Lower-is-better channels assign the smaller number to green
        let thresholds = StatusThresholds::new(60.0, 80.0, 95.0, true);
        assert_eq!(thresholds.classify(10.0), StatusColor::Green);
        assert_eq!(thresholds.classify(60.0), StatusColor::Green);
        assert_eq!(thresholds.classify(70.0), StatusColor::Yellow);
        assert_eq!(thresholds.classify(85.0), StatusColor::Red);
    }

    #[test]
    fn test_sample_observers() {
        let mut hub = TelemetryHub::with_interval(1.0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        hub.on_sample(move |sample| {
            sink.lock().unwrap().push(sample.key.clone());
        });

        hub.ingest("BatteryCharge", 90.0);
        hub.ingest("WaterTankLevel", 40.0);

        assert_eq!(*seen.lock().unwrap(), vec!["BatteryCharge", "WaterTankLevel"]);
    }

    #[test]
    fn test_live_mode_signals_poll_without_generating() {
        let mut hub = TelemetryHub::with_interval(1.0);
        hub.set_mode(TelemetryMode::Live);
        hub.start();

        assert!(hub.tick(1.0));
        // Live refreshes come from the driver; nothing was generated
        assert!(hub.value("BatteryCharge").is_none());
    }
}
