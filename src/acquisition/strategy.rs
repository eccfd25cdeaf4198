//! Per-mode acquisition strategies
//!
//! The engine runs one shared skeleton for every mode. A strategy supplies
//! the parts that differ:
//!
//! - how a raw device sample is conditioned before buffering
//! - whether the window is filled around a trigger point or rolled
//! - how the filled window becomes a [`Frame`]
//!
//! | Mode | Conditioning | Fill | Output |
//! |---|---|---|---|
//! | Analog | raw | triggered, level crossing | calibrated trace, optional averaging |
//! | XY | raw | rolling | calibrated trace |
//! | Digital | [`DigitalConditioner`] | triggered, logic edge | logic levels |
//! | Voltmeter | raw | rolling | zero trace + [`VoltmeterReadout`] |

use crate::config::ScopeParameters;
use crate::types::{Channel, Frame, Mode, RawSample, Sample, Trace, VoltmeterReadout};

use super::averaging::AveragingAccumulator;
use super::buffer::SlidingWindowBuffer;
use super::digital::DigitalConditioner;
use super::trigger::TriggerKind;

/// How the engine fills the sample window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    /// Half a trace of lookback, trigger search, then fill to a full trace
    Triggered(TriggerKind),
    /// A full trace of the newest samples, no trigger
    Rolling,
}

/// Mode-specific steps of the acquisition skeleton
pub trait ModeStrategy {
    /// The mode this strategy implements
    fn mode(&self) -> Mode;

    fn fill_policy(&self) -> FillPolicy;

    /// Convert a raw device sample into the value stored in the window
    fn condition(&mut self, raw: RawSample) -> Sample {
        raw.to_sample()
    }

    /// Build the output frame from a filled window
    fn finish(
        &mut self,
        window: &SlidingWindowBuffer,
        params: &ScopeParameters,
        dt: f64,
        triggered: bool,
    ) -> Frame;

    /// Drop averaged history (parameter updates)
    fn clear_history(&mut self) {}
}

/// Create the strategy for a mode with empty history
pub fn strategy_for(mode: Mode) -> Box<dyn ModeStrategy> {
    match mode {
        Mode::Analog => Box::new(AnalogStrategy::default()),
        Mode::Xy => Box::new(XyStrategy),
        Mode::Digital => Box::new(DigitalStrategy::default()),
        Mode::Voltmeter => Box::new(VoltmeterStrategy),
    }
}

fn calibrated_trace(window: &SlidingWindowBuffer, params: &ScopeParameters, dt: f64) -> Trace {
    let (k1, k2) = (params.y1_vps, params.y2_vps);
    Trace::centered(window.iter().map(|s| (s.ch1 * k1, s.ch2 * k2)), dt)
}

// ==================== Analog ====================

/// Triggered two-channel display with optional averaging
#[derive(Debug, Default)]
pub struct AnalogStrategy {
    ch1: AveragingAccumulator,
    ch2: AveragingAccumulator,
}

impl AnalogStrategy {
    /// Frames currently held for averaging
    pub fn averaged_frames(&self) -> usize {
        self.ch1.depth()
    }
}

impl ModeStrategy for AnalogStrategy {
    fn mode(&self) -> Mode {
        Mode::Analog
    }

    fn fill_policy(&self) -> FillPolicy {
        FillPolicy::Triggered(TriggerKind::Level)
    }

    fn finish(
        &mut self,
        window: &SlidingWindowBuffer,
        params: &ScopeParameters,
        dt: f64,
        triggered: bool,
    ) -> Frame {
        let trace = if params.navg > 1 {
            let depth = params.navg as usize;
            self.ch1
                .push(window.iter().map(|s| s.ch1 * params.y1_vps).collect(), depth);
            self.ch2
                .push(window.iter().map(|s| s.ch2 * params.y2_vps).collect(), depth);

            let (m1, m2) = (self.ch1.mean(), self.ch2.mean());
            Trace::centered(m1.into_iter().zip(m2), dt)
        } else {
            calibrated_trace(window, params, dt)
        };

        Frame {
            trace,
            readout: None,
            triggered,
        }
    }

    fn clear_history(&mut self) {
        self.ch1.clear();
        self.ch2.clear();
    }
}

// ==================== XY ====================

/// Channel 1 against channel 2, untriggered
#[derive(Debug, Default)]
pub struct XyStrategy;

impl ModeStrategy for XyStrategy {
    fn mode(&self) -> Mode {
        Mode::Xy
    }

    fn fill_policy(&self) -> FillPolicy {
        FillPolicy::Rolling
    }

    fn finish(
        &mut self,
        window: &SlidingWindowBuffer,
        params: &ScopeParameters,
        dt: f64,
        _triggered: bool,
    ) -> Frame {
        Frame {
            trace: calibrated_trace(window, params, dt),
            readout: None,
            triggered: false,
        }
    }
}

// ==================== Digital ====================

/// Triggered logic-level display
#[derive(Debug, Default)]
pub struct DigitalStrategy {
    conditioner: DigitalConditioner,
}

impl ModeStrategy for DigitalStrategy {
    fn mode(&self) -> Mode {
        Mode::Digital
    }

    fn fill_policy(&self) -> FillPolicy {
        FillPolicy::Triggered(TriggerKind::Logic)
    }

    fn condition(&mut self, raw: RawSample) -> Sample {
        self.conditioner.condition(raw)
    }

    fn finish(
        &mut self,
        window: &SlidingWindowBuffer,
        _params: &ScopeParameters,
        dt: f64,
        triggered: bool,
    ) -> Frame {
        Frame {
            trace: Trace::centered(window.iter().map(|s| (s.ch1, s.ch2)), dt),
            readout: None,
            triggered,
        }
    }
}

// ==================== Voltmeter ====================

/// Mean-rectified amplitude readout
#[derive(Debug, Default)]
pub struct VoltmeterStrategy;

impl VoltmeterStrategy {
    /// `2 * calibration * mean(|x|)` for one channel of the window
    pub fn estimate(window: &SlidingWindowBuffer, channel: Channel, calibration: f64) -> f64 {
        if window.is_empty() {
            return 0.0;
        }
        let sum: f64 = window.iter().map(|s| s.channel(channel).abs()).sum();
        2.0 * calibration * sum / window.len() as f64
    }
}

impl ModeStrategy for VoltmeterStrategy {
    fn mode(&self) -> Mode {
        Mode::Voltmeter
    }

    fn fill_policy(&self) -> FillPolicy {
        FillPolicy::Rolling
    }

    fn finish(
        &mut self,
        window: &SlidingWindowBuffer,
        params: &ScopeParameters,
        dt: f64,
        _triggered: bool,
    ) -> Frame {
        let readout = VoltmeterReadout {
            ch1: Self::estimate(window, Channel::One, params.y1_vps),
            ch2: Self::estimate(window, Channel::Two, params.y2_vps),
            ch1_calibrated: params.is_calibrated(Channel::One),
            ch2_calibrated: params.is_calibrated(Channel::Two),
        };

        Frame {
            trace: Trace::centered(window.iter().map(|_| (0.0, 0.0)), dt),
            readout: Some(readout),
            triggered: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of(values: &[(f64, f64)]) -> SlidingWindowBuffer {
        let mut window = SlidingWindowBuffer::new(values.len());
        for &(a, b) in values {
            window.push(Sample::new(a, b));
        }
        window
    }

    #[test]
    fn test_strategy_for_each_mode() {
        for mode in Mode::all() {
            assert_eq!(strategy_for(*mode).mode(), *mode);
        }
        assert_eq!(
            strategy_for(Mode::Digital).fill_policy(),
            FillPolicy::Triggered(TriggerKind::Logic)
        );
        assert_eq!(strategy_for(Mode::Xy).fill_policy(), FillPolicy::Rolling);
    }

    #[test]
    fn test_analog_calibration() {
        let params = ScopeParameters::default().with_calibration(0.5, 2.0);
        let window = window_of(&[(2.0, 3.0), (4.0, 5.0)]);
        let frame = AnalogStrategy::default().finish(&window, &params, 1.0, true);

        assert!(frame.triggered);
        assert_eq!(frame.trace.points()[0].ch1, 1.0);
        assert_eq!(frame.trace.points()[0].ch2, 6.0);
        assert_eq!(frame.trace.points()[1].time, 0.0);
    }

    #[test]
    fn test_analog_averaging() {
        let params = ScopeParameters::default().with_navg(2);
        let mut strategy = AnalogStrategy::default();

        strategy.finish(&window_of(&[(0.0, 0.0)]), &params, 1.0, true);
        let frame = strategy.finish(&window_of(&[(10.0, 20.0)]), &params, 1.0, true);
        assert_eq!(frame.trace.points()[0].ch1, 5.0);
        assert_eq!(frame.trace.points()[0].ch2, 10.0);

        let frame = strategy.finish(&window_of(&[(30.0, 40.0)]), &params, 1.0, true);
        assert_eq!(frame.trace.points()[0].ch1, 20.0);
        assert_eq!(strategy.averaged_frames(), 2);

        strategy.clear_history();
        assert_eq!(strategy.averaged_frames(), 0);
    }

    #[test]
    fn test_digital_is_uncalibrated() {
        let params = ScopeParameters::default().with_calibration(3.0, 3.0);
        let window = window_of(&[(1.0, 0.0)]);
        let frame = DigitalStrategy::default().finish(&window, &params, 1.0, false);
        assert_eq!(frame.trace.points()[0].ch1, 1.0);
        assert!(!frame.triggered);
    }

    #[test]
    fn test_voltmeter_readout() {
        let params = ScopeParameters::default().with_calibration(0.001, 1.0);
        let window = window_of(&[(100.0, -50.0), (-100.0, 50.0)]);
        let frame = VoltmeterStrategy.finish(&window, &params, 1.0, false);

        let readout = frame.readout.unwrap();
        assert!((readout.ch1 - 0.2).abs() < 1e-12);
        assert!((readout.ch2 - 100.0).abs() < 1e-12);
        assert!(readout.ch1_calibrated);
        assert!(!readout.ch2_calibrated);
        assert!(frame.trace.iter().all(|p| p.ch1 == 0.0 && p.ch2 == 0.0));
    }
}
