//! Scope parameters that change while the engine runs
//!
//! The control peer replaces the whole [`ScopeParameters`] value at once; the
//! acquisition loop takes a snapshot at the top of each cycle and never sees
//! a half-applied update.
//!
//! # Main Types
//!
//! - [`ScopeParameters`] - time/volt scales, trigger setup, calibration, averaging
//! - [`TriggerSettings`] - the trigger slice of the parameters
//!
//! # Units
//!
//! Trigger level and the per-division scales are expressed in the units the
//! display uses for that channel: raw sample units when the calibration
//! factor is `1.0`, volts otherwise. The trigger level is always compared
//! against raw samples.

use serde::{Deserialize, Serialize};

use super::HORIZ_DIVS;
use crate::error::{Result, ScopeError};
use crate::types::{Channel, TriggerEdge};

/// Live oscilloscope settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScopeParameters {
    /// Seconds per horizontal division
    pub tdiv: f64,

    /// Channel 1 units per vertical division
    pub y1div: f64,

    /// Channel 2 units per vertical division
    pub y2div: f64,

    /// Trigger setup
    pub trigger: TriggerSettings,

    /// Channel 1 calibration (volts per sample unit, 1.0 = uncalibrated)
    pub y1_vps: f64,

    /// Channel 2 calibration (volts per sample unit, 1.0 = uncalibrated)
    pub y2_vps: f64,

    /// Number of frames averaged together (analog mode)
    pub navg: u32,
}

impl Default for ScopeParameters {
    fn default() -> Self {
        Self {
            tdiv: 1e-4,
            y1div: 1e4,
            y2div: 1e4,
            trigger: TriggerSettings::default(),
            y1_vps: 1.0,
            y2_vps: 1.0,
            navg: 1,
        }
    }
}

impl ScopeParameters {
    /// Check the parameter invariants
    ///
    /// `navg >= 1`, calibration factors and scales strictly positive and
    /// finite, trigger level finite.
    pub fn validate(&self) -> Result<()> {
        if self.navg < 1 {
            return Err(ScopeError::InvalidParameters(
                "averaging depth must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("tdiv", self.tdiv),
            ("y1div", self.y1div),
            ("y2div", self.y2div),
            ("y1_vps", self.y1_vps),
            ("y2_vps", self.y2_vps),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScopeError::InvalidParameters(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.trigger.level.is_finite() {
            return Err(ScopeError::InvalidParameters(
                "trigger level must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of samples in one trace: `ceil(tdiv * HORIZ_DIVS * rate)`
    pub fn trace_size(&self, sample_rate_hz: u32) -> usize {
        (self.tdiv * HORIZ_DIVS as f64 * sample_rate_hz as f64).ceil() as usize
    }

    /// Sample spacing in seconds
    pub fn dt(sample_rate_hz: u32) -> f64 {
        1.0 / sample_rate_hz as f64
    }

    /// Calibration factor for a channel
    pub fn calibration(&self, channel: Channel) -> f64 {
        match channel {
            Channel::One => self.y1_vps,
            Channel::Two => self.y2_vps,
        }
    }

    /// Units per division for a channel
    pub fn ydiv(&self, channel: Channel) -> f64 {
        match channel {
            Channel::One => self.y1div,
            Channel::Two => self.y2div,
        }
    }

    /// Whether a channel is displayed in volts rather than raw units
    pub fn is_calibrated(&self, channel: Channel) -> bool {
        self.calibration(channel) != 1.0
    }

    /// Builder-style helper for the time scale
    pub fn with_tdiv(mut self, tdiv: f64) -> Self {
        self.tdiv = tdiv;
        self
    }

    /// Builder-style helper for the averaging depth
    pub fn with_navg(mut self, navg: u32) -> Self {
        self.navg = navg;
        self
    }

    /// Builder-style helper for the trigger setup
    pub fn with_trigger(mut self, channel: Channel, edge: TriggerEdge, level: f64) -> Self {
        self.trigger = TriggerSettings {
            channel,
            edge,
            level,
        };
        self
    }

    /// Builder-style helper for both calibration factors
    pub fn with_calibration(mut self, y1_vps: f64, y2_vps: f64) -> Self {
        self.y1_vps = y1_vps;
        self.y2_vps = y2_vps;
        self
    }
}

/// Trigger configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerSettings {
    /// Channel the trigger watches
    pub channel: Channel,

    /// Edge direction
    pub edge: TriggerEdge,

    /// Level in raw sample units
    pub level: f64,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            channel: Channel::One,
            edge: TriggerEdge::Rising,
            level: 0.0,
        }
    }
}

impl TriggerSettings {
    /// Level crossing between two consecutive values
    ///
    /// Rising: `previous < level && current >= level`.
    /// Falling: `previous > level && current <= level`.
    pub fn crosses_level(&self, previous: f64, current: f64) -> bool {
        match self.edge {
            TriggerEdge::Rising => previous < self.level && current >= self.level,
            TriggerEdge::Falling => previous > self.level && current <= self.level,
        }
    }

    /// Logic transition between two consecutive logic levels
    ///
    /// Rising: `0 -> 1`. Falling: `1 -> 0`.
    pub fn crosses_logic(&self, previous: f64, current: f64) -> bool {
        match self.edge {
            TriggerEdge::Rising => previous == 0.0 && current == 1.0,
            TriggerEdge::Falling => previous == 1.0 && current == 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = ScopeParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.navg, 1);
        assert_eq!(params.trigger.channel, Channel::One);
        assert!(!params.is_calibrated(Channel::One));
    }

    #[test]
    fn test_trace_size() {
        let params = ScopeParameters::default().with_tdiv(1e-3);
        assert_eq!(params.trace_size(44100), 618);

        let params = ScopeParameters::default();
        assert_eq!(params.trace_size(44100), 62);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ScopeParameters::default().with_navg(0).validate().is_err());
        assert!(ScopeParameters::default()
            .with_calibration(0.0, 1.0)
            .validate()
            .is_err());
        assert!(ScopeParameters::default()
            .with_calibration(1.0, -2.0)
            .validate()
            .is_err());
        assert!(ScopeParameters::default().with_tdiv(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_trigger_rising_edge() {
        let trigger = TriggerSettings {
            level: 1.0,
            ..Default::default()
        };

        // Should not trigger when below threshold
        assert!(!trigger.crosses_level(0.0, 0.5));
        // Should trigger when crossing threshold
        assert!(trigger.crosses_level(0.5, 1.5));
        // Landing exactly on the level counts
        assert!(trigger.crosses_level(0.5, 1.0));
        // Starting on the level does not
        assert!(!trigger.crosses_level(1.0, 1.5));
    }

    #[test]
    fn test_trigger_falling_edge() {
        let trigger = TriggerSettings {
            level: 1.0,
            edge: TriggerEdge::Falling,
            ..Default::default()
        };

        // Should not trigger when above threshold
        assert!(!trigger.crosses_level(2.0, 1.5));
        // Should trigger when crossing threshold going down
        assert!(trigger.crosses_level(1.5, 0.5));
        assert!(trigger.crosses_level(1.5, 1.0));
        assert!(!trigger.crosses_level(0.5, 1.5));
    }

    #[test]
    fn test_logic_edges() {
        let rising = TriggerSettings::default();
        assert!(rising.crosses_logic(0.0, 1.0));
        assert!(!rising.crosses_logic(1.0, 1.0));
        assert!(!rising.crosses_logic(1.0, 0.0));

        let falling = TriggerSettings {
            edge: TriggerEdge::Falling,
            ..Default::default()
        };
        assert!(falling.crosses_logic(1.0, 0.0));
        assert!(!falling.crosses_logic(0.0, 1.0));
    }
}
