//! The acquisition state machine
//!
//! [`AcquisitionEngine::step`] runs one full acquisition for the active mode:
//!
//! 1. **Triggered modes** fill half a trace of lookback, slide it forward
//!    until the trigger fires or the search budget is spent, then fill
//!    forward to a full trace.
//! 2. **Rolling modes** read one full trace of the newest samples.
//! 3. The mode strategy turns the window into a [`Frame`].
//!
//! Capture is consumed in whole blocks. Every cycle starts on a fresh
//! block, and the lookback and rolling fills run to the end of the last
//! block they touch, keeping only the newest samples. Whatever is left of
//! a block when the frame is complete is dropped. This keeps the engine at
//! or ahead of the device rate instead of replaying a growing backlog.
//!
//! While paused the engine only drains whole blocks through
//! [`AcquisitionEngine::pause_fill`] so capture stays alive.
//!
//! The engine takes a [`ScopeParameters`] snapshot per call and never holds
//! on to it between cycles.

use tracing::{debug, warn};

use crate::capture::{CaptureDevice, SampleReader};
use crate::config::{EngineConfig, ScopeParameters};
use crate::error::Result;
use crate::types::{Frame, Mode};

use super::buffer::SlidingWindowBuffer;
use super::strategy::{strategy_for, FillPolicy, ModeStrategy};
use super::trigger::{TriggerDetector, TriggerOutcome};

/// Tuning knobs taken from [`EngineConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionSettings {
    /// Trigger search budget as a multiple of the trace size
    pub trigger_budget_factor: f64,
    /// Maximum samples drained per paused cycle
    pub pause_fill_cap: usize,
}

impl AcquisitionSettings {
    /// Samples the trigger search may inspect for a trace of `trace_size`
    pub fn trigger_budget(&self, trace_size: usize) -> usize {
        (self.trigger_budget_factor * trace_size as f64) as usize
    }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for AcquisitionSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            trigger_budget_factor: config.trigger_budget_factor,
            pause_fill_cap: config.pause_fill_cap,
        }
    }
}

/// Mode state machine over a capture device
pub struct AcquisitionEngine<D: CaptureDevice> {
    reader: SampleReader<D>,
    strategy: Box<dyn ModeStrategy>,
    settings: AcquisitionSettings,
}

impl<D: CaptureDevice> AcquisitionEngine<D> {
    /// Create an engine in analog mode
    pub fn new(reader: SampleReader<D>, settings: AcquisitionSettings) -> Self {
        Self {
            reader,
            strategy: strategy_for(Mode::Analog),
            settings,
        }
    }

    /// Active mode
    pub fn mode(&self) -> Mode {
        self.strategy.mode()
    }

    /// Switch modes, dropping all per-mode history
    pub fn set_mode(&mut self, mode: Mode) {
        debug!("Switching acquisition mode: {} -> {}", self.mode(), mode);
        self.strategy = strategy_for(mode);
    }

    /// Drop averaged frames (called after a parameter update)
    pub fn clear_history(&mut self) {
        self.strategy.clear_history();
    }

    /// Negotiated sample rate
    pub fn sample_rate(&self) -> u32 {
        self.reader.sample_rate()
    }

    /// Borrow the sample reader
    pub fn reader(&self) -> &SampleReader<D> {
        &self.reader
    }

    /// Close the device and give back the reader's device
    pub fn into_device(self) -> D {
        self.reader.into_inner()
    }

    /// Acquire one frame for the active mode
    pub fn step(&mut self, params: &ScopeParameters) -> Result<Frame> {
        let rate = self.reader.sample_rate();
        let size = params.trace_size(rate);
        let dt = ScopeParameters::dt(rate);
        self.reader.discard_buffered();

        let (window, triggered) = match self.strategy.fill_policy() {
            FillPolicy::Triggered(kind) => {
                let budget = self.settings.trigger_budget(size);
                let detector = TriggerDetector::new(params.trigger, kind, budget);
                self.fill_triggered(&detector, size)?
            }
            FillPolicy::Rolling => (self.fill_rolling(size)?, false),
        };

        Ok(self.strategy.finish(&window, params, dt, triggered))
    }

    /// Drain whole blocks until at least `min(trace_size, pause_fill_cap)`
    /// samples are gone, without producing a frame
    ///
    /// Returns the number of samples drained.
    pub fn pause_fill(&mut self, params: &ScopeParameters) -> Result<usize> {
        let target = params
            .trace_size(self.reader.sample_rate())
            .min(self.settings.pause_fill_cap);
        self.reader.discard_buffered();

        let mut drained = 0;
        while drained < target || self.reader.buffered() > 0 {
            self.reader.next_sample()?;
            drained += 1;
        }
        Ok(drained)
    }

    fn fill_triggered(
        &mut self,
        detector: &TriggerDetector,
        size: usize,
    ) -> Result<(SlidingWindowBuffer, bool)> {
        let Self {
            reader, strategy, ..
        } = self;

        let half = size / 2;
        let mut window = SlidingWindowBuffer::new(half);
        while window.len() < half || reader.buffered() > 0 {
            let raw = reader.next_sample()?;
            window.push(strategy.condition(raw));
        }

        let outcome = detector.search(&mut window, || {
            let raw = reader.next_sample()?;
            Ok(strategy.condition(raw))
        })?;

        let triggered = match outcome {
            TriggerOutcome::Triggered { searched } => {
                tracing::trace!("Triggered after {} samples", searched);
                true
            }
            TriggerOutcome::Abandoned { .. } => {
                warn!("Trigger? (graphing anyway...)");
                false
            }
        };

        window.set_cap(size);
        while window.len() < size {
            let raw = reader.next_sample()?;
            window.push(strategy.condition(raw));
        }
        Ok((window, triggered))
    }

    fn fill_rolling(&mut self, size: usize) -> Result<SlidingWindowBuffer> {
        let mut window = SlidingWindowBuffer::new(size);
        while window.len() < size || self.reader.buffered() > 0 {
            let raw = self.reader.next_sample()?;
            window.push(self.strategy.condition(raw));
        }
        Ok(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockCaptureDevice, MockPattern, MockSignal};
    use crate::types::RawSample;

    fn ramp_engine(start: f64) -> AcquisitionEngine<MockCaptureDevice> {
        let signal = MockSignal::new(
            MockPattern::Ramp { start, step: 1.0 },
            MockPattern::Constant(0.0),
        );
        let device = MockCaptureDevice::new(signal, 44_100, 441);
        AcquisitionEngine::new(SampleReader::new(device), AcquisitionSettings::default())
    }

    #[test]
    fn test_analog_trigger_lands_at_time_zero() {
        // Ramp crosses zero at sample 500, inside the second block
        let mut engine = ramp_engine(-500.0);
        let params = ScopeParameters::default().with_tdiv(1e-3);

        let frame = engine.step(&params).unwrap();
        assert!(frame.triggered);
        assert_eq!(frame.trace.len(), 618);

        let zero = frame.trace.index_nearest(0.0).unwrap();
        assert_eq!(frame.trace.points()[zero].ch1, 0.0);
    }

    #[test]
    fn test_untriggered_frame_still_full() {
        let signal = MockSignal::new(MockPattern::Constant(5.0), MockPattern::Constant(0.0));
        let device = MockCaptureDevice::new(signal, 44_100, 441);
        let mut engine =
            AcquisitionEngine::new(SampleReader::new(device), AcquisitionSettings::default());
        let params = ScopeParameters::default();

        let frame = engine.step(&params).unwrap();
        assert!(!frame.triggered);
        assert_eq!(frame.trace.len(), params.trace_size(44_100));
    }

    #[test]
    fn test_xy_reads_one_trace() {
        let mut engine = ramp_engine(0.0);
        engine.set_mode(Mode::Xy);
        let params = ScopeParameters::default();

        // Newest 62 samples of the block
        let frame = engine.step(&params).unwrap();
        assert_eq!(frame.trace.len(), 62);
        assert_eq!(frame.trace.points()[0].ch1, 379.0);
        assert_eq!(frame.trace.points()[61].ch1, 440.0);
        assert_eq!(engine.reader().device().position(), 441);
    }

    #[test]
    fn test_pause_fill_drains_whole_blocks() {
        let mut engine = ramp_engine(0.0);
        let params = ScopeParameters::default().with_tdiv(1.0);
        assert_eq!(engine.pause_fill(&params).unwrap(), 4410);

        let params = ScopeParameters::default();
        assert_eq!(engine.pause_fill(&params).unwrap(), 441);
        assert_eq!(engine.reader().device().position(), 4851);
    }

    #[test]
    fn test_each_cycle_reads_fresh_blocks() {
        let signal = MockSignal::new(
            MockPattern::Sine {
                frequency: 1000.0,
                amplitude: 12000.0,
                offset: 0.0,
            },
            MockPattern::Constant(0.0),
        );
        let device = MockCaptureDevice::new(signal, 44_100, 441);
        let mut engine =
            AcquisitionEngine::new(SampleReader::new(device), AcquisitionSettings::default());
        let params = ScopeParameters::default();

        for mode in Mode::all() {
            engine.set_mode(*mode);
            for _ in 0..25 {
                let before = engine.reader().device().stats().frames_read;
                engine.step(&params).unwrap();
                let consumed = engine.reader().device().stats().frames_read - before;
                assert!(consumed >= 441, "{} consumed {} frames", mode, consumed);
            }
        }

        // Lookback and trigger search never share a block
        engine.set_mode(Mode::Analog);
        let before = engine.reader().device().stats().blocks_read;
        engine.step(&params).unwrap();
        assert!(engine.reader().device().stats().blocks_read - before >= 2);
    }

    #[test]
    fn test_digital_trigger_on_burst() {
        // Silence past the first block, then a full-scale burst
        let mut samples = vec![RawSample::new(0, 0); 150];
        samples.extend((0..400).map(|i| {
            let v = if i % 2 == 0 { i16::MAX } else { i16::MIN };
            RawSample::new(v, 0)
        }));
        let device = MockCaptureDevice::scripted(samples, 100);
        let mut engine =
            AcquisitionEngine::new(SampleReader::new(device), AcquisitionSettings::default());
        engine.set_mode(Mode::Digital);

        let params = ScopeParameters::default();
        let frame = engine.step(&params).unwrap();
        assert!(frame.triggered);

        let zero = frame.trace.index_nearest(0.0).unwrap();
        assert_eq!(frame.trace.points()[zero - 1].ch1, 0.0);
        assert_eq!(frame.trace.points()[zero].ch1, 1.0);
    }

    #[test]
    fn test_mode_switch_resets_averaging() {
        let mut engine = ramp_engine(-441.0);
        let params = ScopeParameters::default().with_navg(4);

        // Triggers on the first sample after the lookback: centre value 0
        let frame = engine.step(&params).unwrap();
        assert!(frame.triggered);

        engine.set_mode(Mode::Xy);
        engine.set_mode(Mode::Analog);
        assert_eq!(engine.mode(), Mode::Analog);

        // The ramp never crosses again; the centre of the second window
        // reads 944. Averaged with the first frame it would read 472.
        let frame = engine.step(&params).unwrap();
        assert!(!frame.triggered);
        let zero = frame.trace.index_nearest(0.0).unwrap();
        assert_eq!(frame.trace.points()[zero].ch1, 944.0);
    }

    #[test]
    fn test_trigger_budget_scales_with_trace() {
        let settings = AcquisitionSettings::default();
        assert_eq!(settings.trigger_budget(618), 618);

        let settings = AcquisitionSettings {
            trigger_budget_factor: 2.0,
            ..settings
        };
        assert_eq!(settings.trigger_budget(618), 1236);
    }
}
