//! Occupancy sources: where per-lane "vehicle present" readings come from.
//!
//! The control loop polls an [`OccupancySource`] once per tick. Real
//! deployments plug a vision pipeline in behind this trait; the built-in
//! sources cover testing and simulation:
//!
//! - [`NoTraffic`] -- never reports a vehicle.
//! - [`ScriptedOccupancy`] -- fixed time windows from configuration.
//! - [`RandomArrivals`] -- seeded random arrivals with a random dwell time.
//!
//! Sources report raw lane ids. Validation is the scheduler's job, so a
//! misbehaving source surfaces as a rejected tick rather than a panic.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crossroads_types::Lane;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::clock::Timestamp;
use crate::config::{OccupancyConfig, OccupancyWindowConfig};
use crate::layout::{ConfigurationError, positive_duration};

/// A source failed to produce a reading for this tick.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OccupancyError {
    /// The source could not be read (camera offline, detector stalled).
    #[error("occupancy source unavailable: {reason}")]
    Unavailable {
        /// Description of the failure.
        reason: String,
    },
}

/// A source of per-lane occupancy readings.
pub trait OccupancySource: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return the raw ids of the lanes that currently hold a vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`OccupancyError`] if no reading is available for this tick.
    fn poll(&mut self, now: Timestamp) -> Result<Vec<u8>, OccupancyError>;
}

/// Build the source named in configuration.
///
/// # Errors
///
/// Returns [`ConfigurationError`] for an unknown source kind or invalid
/// source parameters.
pub fn from_config(config: &OccupancyConfig) -> Result<Box<dyn OccupancySource>, ConfigurationError> {
    let source: Box<dyn OccupancySource> = match config.source.as_str() {
        "none" => Box::new(NoTraffic),
        "scripted" => Box::new(ScriptedOccupancy::from_config(&config.script)?),
        "random" => Box::new(RandomArrivals::from_config(config)?),
        other => {
            return Err(ConfigurationError::UnknownOccupancySource {
                name: other.to_owned(),
            });
        }
    };
    info!(source = source.name(), "Occupancy source ready");
    Ok(source)
}

// ---------------------------------------------------------------------------
// NoTraffic
// ---------------------------------------------------------------------------

/// An empty intersection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTraffic;

impl OccupancySource for NoTraffic {
    fn name(&self) -> &'static str {
        "none"
    }

    fn poll(&mut self, _now: Timestamp) -> Result<Vec<u8>, OccupancyError> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// ScriptedOccupancy
// ---------------------------------------------------------------------------

/// An interval `[from, until)` during which some lanes are occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyWindow {
    /// Raw lane ids reported during the window.
    pub lanes: Vec<u8>,
    /// Window start (inclusive).
    pub from: Timestamp,
    /// Window end (exclusive).
    pub until: Timestamp,
}

impl OccupancyWindow {
    fn contains(&self, now: Timestamp) -> bool {
        self.from <= now && now < self.until
    }
}

/// Replays fixed occupancy windows.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOccupancy {
    windows: Vec<OccupancyWindow>,
}

impl ScriptedOccupancy {
    /// A source that replays the given windows.
    pub const fn new(windows: Vec<OccupancyWindow>) -> Self {
        Self { windows }
    }

    /// Build from the configured script.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidWindow`] if a window is empty,
    /// reversed, negative, or non-finite.
    pub fn from_config(script: &[OccupancyWindowConfig]) -> Result<Self, ConfigurationError> {
        let windows = script
            .iter()
            .map(|w| {
                let invalid = || ConfigurationError::InvalidWindow {
                    from: w.from_seconds,
                    until: w.until_seconds,
                };
                let from = Timestamp::from_secs_f64(w.from_seconds).ok_or_else(invalid)?;
                let until = Timestamp::from_secs_f64(w.until_seconds).ok_or_else(invalid)?;
                if until <= from {
                    return Err(invalid());
                }
                Ok(OccupancyWindow {
                    lanes: w.lanes.clone(),
                    from,
                    until,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(windows))
    }
}

impl OccupancySource for ScriptedOccupancy {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn poll(&mut self, now: Timestamp) -> Result<Vec<u8>, OccupancyError> {
        let occupied: BTreeSet<u8> = self
            .windows
            .iter()
            .filter(|w| w.contains(now))
            .flat_map(|w| w.lanes.iter().copied())
            .collect();
        Ok(occupied.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// RandomArrivals
// ---------------------------------------------------------------------------

/// Simulated traffic: vehicles arrive at random and stay for a random time.
///
/// On every poll, each empty lane gains a vehicle with probability
/// `arrival_probability`. The vehicle then stays for a dwell time drawn
/// uniformly from the configured range. The generator is seeded, so a run
/// is reproducible for a given seed and poll sequence.
#[derive(Debug, Clone)]
pub struct RandomArrivals {
    rng: StdRng,
    arrival_probability: f64,
    min_dwell_ms: u64,
    max_dwell_ms: u64,
    present_until: BTreeMap<Lane, Timestamp>,
}

impl RandomArrivals {
    /// A seeded generator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the probability is outside
    /// `[0, 1]` or the dwell range is empty.
    pub fn new(
        seed: u64,
        arrival_probability: f64,
        min_dwell: Duration,
        max_dwell: Duration,
    ) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&arrival_probability) {
            return Err(ConfigurationError::InvalidProbability {
                value: arrival_probability,
            });
        }
        if min_dwell > max_dwell || min_dwell.is_zero() {
            return Err(ConfigurationError::InvalidDwell {
                min: min_dwell.as_secs_f64(),
                max: max_dwell.as_secs_f64(),
            });
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            arrival_probability,
            min_dwell_ms: duration_millis(min_dwell),
            max_dwell_ms: duration_millis(max_dwell),
            present_until: BTreeMap::new(),
        })
    }

    /// Build from the occupancy configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for an invalid probability or dwell
    /// range.
    pub fn from_config(config: &OccupancyConfig) -> Result<Self, ConfigurationError> {
        let dwell = |name, secs| positive_duration(name, secs).ok();
        let (min, max) = dwell("min_dwell_seconds", config.min_dwell_seconds)
            .zip(dwell("max_dwell_seconds", config.max_dwell_seconds))
            .ok_or(ConfigurationError::InvalidDwell {
                min: config.min_dwell_seconds,
                max: config.max_dwell_seconds,
            })?;
        Self::new(config.seed, config.arrival_probability, min, max)
    }
}

impl OccupancySource for RandomArrivals {
    fn name(&self) -> &'static str {
        "random"
    }

    fn poll(&mut self, now: Timestamp) -> Result<Vec<u8>, OccupancyError> {
        self.present_until.retain(|_, until| now < *until);

        for lane in Lane::ALL {
            if self.present_until.contains_key(&lane) {
                continue;
            }
            if self.rng.random_bool(self.arrival_probability) {
                let dwell = self.rng.random_range(self.min_dwell_ms..=self.max_dwell_ms);
                let until = now.saturating_add(Duration::from_millis(dwell));
                debug!(%lane, %now, %until, "Vehicle arrived");
                self.present_until.insert(lane, until);
            }
        }

        Ok(self.present_until.keys().map(|lane| lane.id()).collect())
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    fn window(lanes: &[u8], from: f64, until: f64) -> OccupancyWindowConfig {
        OccupancyWindowConfig {
            lanes: lanes.to_vec(),
            from_seconds: from,
            until_seconds: until,
        }
    }

    #[test]
    fn no_traffic_is_always_empty() {
        let mut source = NoTraffic;
        assert!(source.poll(Timestamp::from_secs(100)).unwrap().is_empty());
    }

    #[test]
    fn scripted_windows_are_half_open() {
        let mut source =
            ScriptedOccupancy::from_config(&[window(&[1], 0.0, 10.0), window(&[4, 1], 5.0, 6.0)])
                .unwrap();
        assert_eq!(source.poll(Timestamp::ZERO).unwrap(), vec![1]);
        assert_eq!(source.poll(Timestamp::from_secs(5)).unwrap(), vec![1, 4]);
        assert_eq!(source.poll(Timestamp::from_secs(6)).unwrap(), vec![1]);
        assert!(source.poll(Timestamp::from_secs(10)).unwrap().is_empty());
    }

    #[test]
    fn scripted_rejects_reversed_window() {
        let result = ScriptedOccupancy::from_config(&[window(&[1], 5.0, 1.0)]);
        assert!(matches!(result, Err(ConfigurationError::InvalidWindow { .. })));
        // [5, 5) can never contain a tick.
        let result = ScriptedOccupancy::from_config(&[window(&[1], 5.0, 5.0)]);
        assert!(matches!(result, Err(ConfigurationError::InvalidWindow { .. })));
        let result = ScriptedOccupancy::from_config(&[window(&[1], -1.0, 1.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn scripted_passes_raw_ids_through() {
        let mut source = ScriptedOccupancy::from_config(&[window(&[9], 0.0, 1.0)]).unwrap();
        assert_eq!(source.poll(Timestamp::ZERO).unwrap(), vec![9]);
    }

    #[test]
    fn random_arrivals_are_reproducible() {
        let make = || RandomArrivals::new(7, 0.3, Duration::from_secs(1), Duration::from_secs(4)).unwrap();
        let (mut a, mut b) = (make(), make());
        for step in 0..200 {
            let now = Timestamp::from_millis(step * 100);
            assert_eq!(a.poll(now).unwrap(), b.poll(now).unwrap());
        }
    }

    #[test]
    fn random_arrivals_stay_for_their_dwell() {
        let mut source =
            RandomArrivals::new(1, 1.0, Duration::from_secs(2), Duration::from_secs(2)).unwrap();
        assert_eq!(source.poll(Timestamp::ZERO).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(source.poll(Timestamp::from_millis(1999)).unwrap().len(), 4);
        // All leave at t=2 and, with probability 1, new vehicles arrive at once.
        assert_eq!(source.poll(Timestamp::from_secs(2)).unwrap().len(), 4);
    }

    #[test]
    fn random_with_zero_probability_never_arrives() {
        let mut source =
            RandomArrivals::new(1, 0.0, Duration::from_secs(1), Duration::from_secs(2)).unwrap();
        for step in 0..50 {
            assert!(source.poll(Timestamp::from_secs(step)).unwrap().is_empty());
        }
    }

    #[test]
    fn random_rejects_bad_parameters() {
        let one = Duration::from_secs(1);
        assert!(matches!(
            RandomArrivals::new(1, 1.5, one, one),
            Err(ConfigurationError::InvalidProbability { .. })
        ));
        assert!(matches!(
            RandomArrivals::new(1, 0.5, Duration::from_secs(3), one),
            Err(ConfigurationError::InvalidDwell { .. })
        ));
    }

    #[test]
    fn from_config_picks_source_kind() {
        let mut config = OccupancyConfig {
            source: "none".to_owned(),
            ..OccupancyConfig::default()
        };
        assert_eq!(from_config(&config).unwrap().name(), "none");
        config.source = "random".to_owned();
        assert_eq!(from_config(&config).unwrap().name(), "random");
        config.source = "scripted".to_owned();
        assert_eq!(from_config(&config).unwrap().name(), "scripted");
        config.source = "camera".to_owned();
        assert!(matches!(
            from_config(&config),
            Err(ConfigurationError::UnknownOccupancySource { .. })
        ));
    }
}
