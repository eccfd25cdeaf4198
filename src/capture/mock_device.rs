//! Mock capture device for testing
//!
//! This module provides a capture device that needs no sound card. Samples
//! come either from a per-channel signal pattern evaluated on the sample
//! clock, or from a fixed script of raw samples.
//!
//! # Data Patterns
//!
//! - [`MockPattern::Constant`] - Fixed value
//! - [`MockPattern::Sine`] - Sinusoid with frequency, amplitude and offset
//! - [`MockPattern::Square`] - Alternates between `+amplitude` and `-amplitude`
//! - [`MockPattern::Sawtooth`] - Linear ramp from `-amplitude` to `+amplitude`
//! - [`MockPattern::Triangle`] - Triangle wave
//! - [`MockPattern::Ramp`] - Unbounded linear ramp (saturates at the `i16` range)
//! - [`MockPattern::Noise`] - Uniform pseudo-random noise
//!
//! Patterns are evaluated at `t = n / sample_rate` for the `n`-th frame, so
//! the output is fully deterministic.
//!
//! # Example
//!
//! ```ignore
//! use scope_engine::capture::{MockCaptureDevice, MockPattern, MockSignal};
//!
//! let signal = MockSignal::new(
//!     MockPattern::Sine { frequency: 1000.0, amplitude: 8000.0, offset: 0.0 },
//!     MockPattern::Square { frequency: 250.0, amplitude: 16000.0 },
//! );
//! let device = MockCaptureDevice::new(signal, 44_100, 441).with_realtime(true);
//! ```

use crate::error::{Result, ScopeError};
use crate::types::RawSample;
use std::time::{Duration, Instant};

use super::{CaptureDevice, CaptureStats};

/// Pattern for generating one channel of mock data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockPattern {
    /// Constant value
    Constant(f64),
    /// Sine wave
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Square wave
    Square { frequency: f64, amplitude: f64 },
    /// Sawtooth wave
    Sawtooth { frequency: f64, amplitude: f64 },
    /// Triangle wave
    Triangle { frequency: f64, amplitude: f64 },
    /// `start + step * n`
    Ramp { start: f64, step: f64 },
    /// Uniform noise in `[-amplitude, amplitude]`
    Noise { amplitude: f64 },
}

impl Default for MockPattern {
    fn default() -> Self {
        MockPattern::Sine {
            frequency: 1000.0,
            amplitude: 8000.0,
            offset: 0.0,
        }
    }
}

impl MockPattern {
    /// Value of frame `n` at time `t` seconds
    fn value(&self, n: u64, t: f64, rng: &mut XorShift) -> f64 {
        match *self {
            MockPattern::Constant(v) => v,
            MockPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin(),
            MockPattern::Square {
                frequency,
                amplitude,
            } => {
                if (t * frequency).fract() < 0.5 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            MockPattern::Sawtooth {
                frequency,
                amplitude,
            } => amplitude * (2.0 * (t * frequency).fract() - 1.0),
            MockPattern::Triangle {
                frequency,
                amplitude,
            } => {
                let phase = (t * frequency).fract();
                if phase < 0.5 {
                    amplitude * (4.0 * phase - 1.0)
                } else {
                    amplitude * (3.0 - 4.0 * phase)
                }
            }
            MockPattern::Ramp { start, step } => start + step * n as f64,
            MockPattern::Noise { amplitude } => (rng.next_f64() * 2.0 - 1.0) * amplitude,
        }
    }
}

/// Two-channel signal description
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MockSignal {
    pub ch1: MockPattern,
    pub ch2: MockPattern,
}

impl MockSignal {
    /// Create a signal from two channel patterns
    pub fn new(ch1: MockPattern, ch2: MockPattern) -> Self {
        Self { ch1, ch2 }
    }
}

/// Small deterministic PRNG for the noise pattern
#[derive(Debug, Clone)]
struct XorShift(u64);

impl XorShift {
    fn next_f64(&mut self) -> f64 {
        let mut s = self.0;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.0 = s;
        (s as f64) / (u64::MAX as f64)
    }
}

#[derive(Debug, Clone)]
enum Source {
    Pattern(MockSignal),
    Script { samples: Vec<RawSample>, looping: bool },
}

/// Capture device backed by patterns or a sample script
pub struct MockCaptureDevice {
    source: Source,
    sample_rate: u32,
    block_frames: usize,
    /// Frames produced so far
    position: u64,
    /// Sleep one block period per read so `--mock` runs at device speed
    realtime: bool,
    last_read: Option<Instant>,
    rng: XorShift,
    closed: bool,
    stats: CaptureStats,
}

impl MockCaptureDevice {
    /// Create a pattern-driven device
    pub fn new(signal: MockSignal, sample_rate: u32, block_frames: usize) -> Self {
        Self {
            source: Source::Pattern(signal),
            sample_rate,
            block_frames,
            position: 0,
            realtime: false,
            last_read: None,
            rng: XorShift(12345),
            closed: false,
            stats: CaptureStats::default(),
        }
    }

    /// Create a device that replays `samples` once, then fails
    pub fn scripted(samples: Vec<RawSample>, block_frames: usize) -> Self {
        Self {
            source: Source::Script {
                samples,
                looping: false,
            },
            ..Self::new(MockSignal::default(), crate::config::DEFAULT_SAMPLE_RATE_HZ, block_frames)
        }
    }

    /// Restart the script from the beginning when it runs out
    pub fn looping(mut self) -> Self {
        if let Source::Script { looping, .. } = &mut self.source {
            *looping = true;
        }
        self
    }

    /// Override the reported sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Pace reads at the real block rate
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Frames produced so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether [`CaptureDevice::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn next_frame(&mut self) -> Result<RawSample> {
        let n = self.position;
        let frame = match &self.source {
            Source::Pattern(signal) => {
                let t = n as f64 / self.sample_rate as f64;
                let signal = *signal;
                RawSample::new(
                    to_i16(signal.ch1.value(n, t, &mut self.rng)),
                    to_i16(signal.ch2.value(n, t, &mut self.rng)),
                )
            }
            Source::Script { samples, looping } => {
                if samples.is_empty() {
                    return Err(ScopeError::Device("mock script is empty".to_string()));
                }
                let index = if *looping {
                    (n % samples.len() as u64) as usize
                } else {
                    n as usize
                };
                match samples.get(index) {
                    Some(sample) => *sample,
                    None => {
                        return Err(ScopeError::Device(format!(
                            "mock script exhausted after {} frames",
                            samples.len()
                        )))
                    }
                }
            }
        };
        self.position += 1;
        Ok(frame)
    }

    fn pace(&mut self) {
        let period =
            Duration::from_secs_f64(self.block_frames as f64 / self.sample_rate as f64);
        if let Some(last) = self.last_read {
            let elapsed = last.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
        }
        self.last_read = Some(Instant::now());
    }
}

fn to_i16(value: f64) -> i16 {
    value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

impl CaptureDevice for MockCaptureDevice {
    fn name(&self) -> &str {
        match self.source {
            Source::Pattern(_) => "mock pattern device",
            Source::Script { .. } => "mock scripted device",
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn block_frames(&self) -> usize {
        self.block_frames
    }

    fn read_block(&mut self, block: &mut Vec<RawSample>) -> Result<()> {
        if self.closed {
            return Err(ScopeError::Device("mock device is closed".to_string()));
        }
        if self.realtime {
            self.pace();
        }

        block.clear();
        for _ in 0..self.block_frames {
            block.push(self.next_frame()?);
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            tracing::info!("Mock capture device closed after {} frames", self.position);
        }
    }

    fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut CaptureStats {
        &mut self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_patterns() {
        let mut rng = XorShift(1);

        assert_eq!(MockPattern::Constant(42.0).value(7, 0.3, &mut rng), 42.0);

        let sine = MockPattern::Sine {
            frequency: 1.0,
            amplitude: 100.0,
            offset: 0.0,
        };
        assert!((sine.value(0, 0.25, &mut rng) - 100.0).abs() < 1e-9);

        let square = MockPattern::Square {
            frequency: 1.0,
            amplitude: 5.0,
        };
        assert_eq!(square.value(0, 0.1, &mut rng), 5.0);
        assert_eq!(square.value(0, 0.6, &mut rng), -5.0);

        let ramp = MockPattern::Ramp {
            start: -10.0,
            step: 2.0,
        };
        assert_eq!(ramp.value(5, 0.0, &mut rng), 0.0);

        let noise = MockPattern::Noise { amplitude: 3.0 };
        for _ in 0..100 {
            assert!(noise.value(0, 0.0, &mut rng).abs() <= 3.0);
        }
    }

    #[test]
    fn test_block_size_and_saturation() {
        let signal = MockSignal::new(MockPattern::Constant(1e9), MockPattern::Constant(-1e9));
        let mut device = MockCaptureDevice::new(signal, 44_100, 441);
        let mut block = Vec::new();

        device.read_block(&mut block).unwrap();
        assert_eq!(block.len(), 441);
        assert!(block.iter().all(|s| s.ch1 == i16::MAX && s.ch2 == i16::MIN));
        assert_eq!(device.position(), 441);
    }

    #[test]
    fn test_script_exhaustion() {
        let samples = vec![RawSample::new(1, 2); 6];
        let mut device = MockCaptureDevice::scripted(samples, 4);
        let mut block = Vec::new();

        assert!(device.read_block(&mut block).is_ok());
        assert!(device.read_block(&mut block).is_err());
    }

    #[test]
    fn test_script_looping() {
        let samples = vec![RawSample::new(1, 0), RawSample::new(2, 0), RawSample::new(3, 0)];
        let mut device = MockCaptureDevice::scripted(samples, 4).looping();
        let mut block = Vec::new();

        device.read_block(&mut block).unwrap();
        let ch1: Vec<i16> = block.iter().map(|s| s.ch1).collect();
        assert_eq!(ch1, vec![1, 2, 3, 1]);
    }

    #[test]
    fn test_closed_device_fails() {
        let mut device = MockCaptureDevice::new(MockSignal::default(), 44_100, 16);
        device.close();
        assert!(device.is_closed());
        assert!(device.read_block(&mut Vec::new()).is_err());
    }
}
