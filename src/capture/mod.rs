//! Capture devices
//!
//! A capture device delivers fixed-size blocks of interleaved two-channel
//! 16-bit samples at a fixed rate. Reads block until a whole block is ready;
//! there is no read timeout.
//!
//! # Main Types
//!
//! - [`CaptureDevice`] - Unified interface over the sound card and the mock device
//! - [`CaptureStats`] - Block throughput and latency counters
//! - [`SampleReader`] - Per-sample cursor over device blocks
//!
//! # Implementations
//!
//! - [`cpal_device::CpalCaptureDevice`] - Real capture through `cpal`
//! - [`mock_device::MockCaptureDevice`] - Pattern or scripted samples for tests and `--mock`

pub mod cpal_device;
pub mod mock_device;

pub use cpal_device::CpalCaptureDevice;
pub use mock_device::{MockCaptureDevice, MockPattern, MockSignal};

use crate::error::{Result, ScopeError};
use crate::shutdown::ShutdownToken;
use crate::types::RawSample;
use std::collections::VecDeque;
use std::time::Instant;

/// Size of the rolling window for recent block latencies
const RECENT_WINDOW_SIZE: usize = 100;

/// Statistics for capture operations
#[derive(Debug, Clone)]
pub struct CaptureStats {
    /// Blocks delivered to the engine
    pub blocks_read: u64,
    /// Frames delivered to the engine
    pub frames_read: u64,
    /// Blocks the device produced while the engine was not reading
    pub overruns: u64,
    /// Total time spent blocked in reads, in microseconds
    pub total_wait_us: u64,
    /// Longest single blocked read, in microseconds
    pub max_wait_us: u64,
    /// Rolling window of recent wait times
    pub recent_wait_us: VecDeque<u64>,
}

impl Default for CaptureStats {
    fn default() -> Self {
        Self {
            blocks_read: 0,
            frames_read: 0,
            overruns: 0,
            total_wait_us: 0,
            max_wait_us: 0,
            recent_wait_us: VecDeque::with_capacity(RECENT_WINDOW_SIZE),
        }
    }
}

impl CaptureStats {
    /// Record one delivered block
    pub fn record_block(&mut self, frames: usize, wait_us: u64) {
        self.blocks_read += 1;
        self.frames_read += frames as u64;
        self.total_wait_us += wait_us;
        self.max_wait_us = self.max_wait_us.max(wait_us);

        self.recent_wait_us.push_back(wait_us);
        if self.recent_wait_us.len() > RECENT_WINDOW_SIZE {
            self.recent_wait_us.pop_front();
        }
    }

    /// Average blocked time per read in microseconds
    pub fn avg_wait_us(&self) -> f64 {
        if self.blocks_read == 0 {
            0.0
        } else {
            self.total_wait_us as f64 / self.blocks_read as f64
        }
    }

    /// Jitter (max - min) over the recent window in microseconds
    pub fn jitter_us(&self) -> u64 {
        let min = self.recent_wait_us.iter().min().copied().unwrap_or(0);
        let max = self.recent_wait_us.iter().max().copied().unwrap_or(0);
        max.saturating_sub(min)
    }
}

/// Unified interface for capture devices
///
/// Implementations are driven from the single acquisition thread, so no
/// `Send` bound is required (a `cpal` stream is not `Send` on every host).
pub trait CaptureDevice {
    /// Human readable device name
    fn name(&self) -> &str;

    /// Negotiated sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Frames per block
    fn block_frames(&self) -> usize;

    /// Block until one full block is available and copy it into `block`
    ///
    /// `block` is cleared first and holds exactly [`Self::block_frames`]
    /// frames on success.
    fn read_block(&mut self, block: &mut Vec<RawSample>) -> Result<()>;

    /// Stop capturing and release the device
    fn close(&mut self);

    /// Get capture statistics
    fn stats(&self) -> &CaptureStats;

    /// Get mutable capture statistics
    fn stats_mut(&mut self) -> &mut CaptureStats;
}

impl<D: CaptureDevice + ?Sized> CaptureDevice for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn block_frames(&self) -> usize {
        (**self).block_frames()
    }

    fn read_block(&mut self, block: &mut Vec<RawSample>) -> Result<()> {
        (**self).read_block(block)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn stats(&self) -> &CaptureStats {
        (**self).stats()
    }

    fn stats_mut(&mut self) -> &mut CaptureStats {
        (**self).stats_mut()
    }
}

/// Per-sample cursor over a block device
///
/// The acquisition phases consume samples one at a time. A phase boundary
/// inside a block leaves the remainder buffered; callers decide whether to
/// keep going or drop it with [`SampleReader::discard_buffered`].
pub struct SampleReader<D: CaptureDevice> {
    device: D,
    block: Vec<RawSample>,
    cursor: usize,
    shutdown: Option<ShutdownToken>,
}

impl<D: CaptureDevice> SampleReader<D> {
    /// Wrap a device
    pub fn new(device: D) -> Self {
        let capacity = device.block_frames();
        Self {
            device,
            block: Vec::with_capacity(capacity),
            cursor: 0,
            shutdown: None,
        }
    }

    /// Check a shutdown token before every blocking read
    pub fn with_shutdown(mut self, token: ShutdownToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Next sample, reading a new block when the current one is used up
    pub fn next_sample(&mut self) -> Result<RawSample> {
        if self.cursor >= self.block.len() {
            self.refill()?;
        }
        let sample = self.block[self.cursor];
        self.cursor += 1;
        Ok(sample)
    }

    /// Samples left in the current block
    pub fn buffered(&self) -> usize {
        self.block.len() - self.cursor
    }

    /// Drop whatever is left of the current block
    pub fn discard_buffered(&mut self) {
        self.cursor = self.block.len();
    }

    /// Negotiated sample rate of the underlying device
    pub fn sample_rate(&self) -> u32 {
        self.device.sample_rate()
    }

    /// Borrow the underlying device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutably borrow the underlying device
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Close the device and give it back
    pub fn into_inner(mut self) -> D {
        self.device.close();
        self.device
    }

    fn refill(&mut self) -> Result<()> {
        if let Some(token) = &self.shutdown {
            if token.is_cancelled() {
                return Err(ScopeError::Cancelled);
            }
        }

        let start = Instant::now();
        if let Err(e) = self.device.read_block(&mut self.block) {
            self.block.clear();
            self.cursor = 0;
            return Err(e);
        }
        let wait_us = start.elapsed().as_micros() as u64;

        if self.block.is_empty() {
            return Err(ScopeError::Device(format!(
                "{} returned an empty block",
                self.device.name()
            )));
        }
        self.cursor = 0;

        let frames = self.block.len();
        self.device.stats_mut().record_block(frames, wait_us);
        tracing::trace!("Read block of {} frames in {} us", frames, wait_us);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_spans_blocks() {
        let samples: Vec<RawSample> = (0..10).map(|i| RawSample::new(i, -i)).collect();
        let device = MockCaptureDevice::scripted(samples, 4);
        let mut reader = SampleReader::new(device);

        for i in 0..10 {
            let sample = reader.next_sample().unwrap();
            assert_eq!(sample, RawSample::new(i, -i));
        }
        // 10 samples in blocks of 4 took three reads
        assert_eq!(reader.device().stats().blocks_read, 3);
        assert_eq!(reader.buffered(), 2);
    }

    #[test]
    fn test_reader_discard() {
        let samples: Vec<RawSample> = (0..8).map(|i| RawSample::new(i, 0)).collect();
        let mut reader = SampleReader::new(MockCaptureDevice::scripted(samples, 4));

        assert_eq!(reader.next_sample().unwrap().ch1, 0);
        reader.discard_buffered();
        assert_eq!(reader.next_sample().unwrap().ch1, 4);
    }

    #[test]
    fn test_reader_honours_shutdown() {
        let token = ShutdownToken::new();
        let device = MockCaptureDevice::new(MockSignal::default(), 44_100, 441);
        let mut reader = SampleReader::new(device).with_shutdown(token.clone());

        assert!(reader.next_sample().is_ok());
        token.cancel();
        // The rest of the current block is still served
        for _ in 0..440 {
            assert!(reader.next_sample().is_ok());
        }
        assert!(matches!(reader.next_sample(), Err(ScopeError::Cancelled)));
    }

    #[test]
    fn test_capture_stats() {
        let mut stats = CaptureStats::default();
        assert_eq!(stats.avg_wait_us(), 0.0);

        stats.record_block(441, 100);
        stats.record_block(441, 300);
        assert_eq!(stats.blocks_read, 2);
        assert_eq!(stats.frames_read, 882);
        assert_eq!(stats.max_wait_us, 300);
        assert!((stats.avg_wait_us() - 200.0).abs() < 1e-9);
        assert_eq!(stats.jitter_us(), 200);
    }
}
