//! Sound card capture through `cpal`
//!
//! The `cpal` input callback runs on the audio thread. It converts incoming
//! interleaved samples into [`RawSample`] frames, cuts them into fixed-size
//! blocks and pushes each block into a bounded crossbeam channel. The engine
//! thread pops one block per [`CaptureDevice::read_block`] call and blocks
//! while the channel is empty.
//!
//! When the engine falls behind and the channel is full, the callback drops
//! the newest block and counts an overrun instead of blocking the audio
//! thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, error, info, warn};

use crate::error::{Result, ScopeError};
use crate::types::RawSample;

use super::{CaptureDevice, CaptureStats};

/// Blocks the audio thread may queue ahead of the engine (about 1.5 s at 441 frames / 44.1 kHz)
const RING_BUFFER_BLOCKS: usize = 150;

/// How often a blocked read wakes up to check for stream failure
const STREAM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Capture device backed by a `cpal` input stream
pub struct CpalCaptureDevice {
    /// The input stream (keeps the audio thread alive)
    stream: Option<Stream>,
    receiver: Receiver<Vec<RawSample>>,
    /// Set by the stream error callback
    failed: Arc<AtomicBool>,
    /// Blocks dropped by the callback because the channel was full
    overruns: Arc<AtomicU64>,
    name: String,
    sample_rate: u32,
    block_frames: usize,
    stats: CaptureStats,
}

impl CpalCaptureDevice {
    /// Open an input device and start capturing
    ///
    /// `device_name` selects an input device by name; `"default"` uses the
    /// host's default input. The requested rate is negotiated to the nearest
    /// rate the device supports with at least two channels.
    pub fn open(device_name: &str, sample_rate_hz: u32, block_frames: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = if device_name == "default" {
            host.default_input_device()
                .ok_or_else(|| ScopeError::Device("No audio input device found".to_string()))?
        } else {
            host.input_devices()
                .map_err(|e| ScopeError::Device(format!("Failed to list input devices: {e}")))?
                .find(|d| d.name().map(|n| n == device_name).unwrap_or(false))
                .ok_or_else(|| {
                    ScopeError::Device(format!("Input device '{}' not found", device_name))
                })?
        };

        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        info!(device = name.as_str(), "Using audio input device");

        let (channels, rate, format) = negotiate(&device, sample_rate_hz)?;
        if rate != sample_rate_hz {
            warn!(
                requested = sample_rate_hz,
                negotiated = rate,
                "Sample rate adjusted to the nearest supported rate"
            );
        }

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (sender, receiver) = bounded::<Vec<RawSample>>(RING_BUFFER_BLOCKS);
        let failed = Arc::new(AtomicBool::new(false));
        let overruns = Arc::new(AtomicU64::new(0));

        let stream = match format {
            SampleFormat::I16 => build_stream::<i16, _>(
                &device,
                &config,
                block_frames,
                sender,
                Arc::clone(&failed),
                Arc::clone(&overruns),
                |s| s,
            ),
            SampleFormat::F32 => build_stream::<f32, _>(
                &device,
                &config,
                block_frames,
                sender,
                Arc::clone(&failed),
                Arc::clone(&overruns),
                |s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16,
            ),
            other => {
                return Err(ScopeError::DeviceConfig(format!(
                    "Unsupported sample format {:?}",
                    other
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| ScopeError::Device(format!("Failed to start capture stream: {e}")))?;

        debug!(
            sample_rate = rate,
            channels = channels,
            block_frames = block_frames,
            "Audio input stream started"
        );

        Ok(Self {
            stream: Some(stream),
            receiver,
            failed,
            overruns,
            name,
            sample_rate: rate,
            block_frames,
            stats: CaptureStats::default(),
        })
    }
}

/// Pick channel count, sample rate and sample format for the stream
fn negotiate(device: &cpal::Device, requested: u32) -> Result<(u16, u32, SampleFormat)> {
    let ranges = device.supported_input_configs().map_err(|e| {
        ScopeError::DeviceConfig(format!("Failed to query input configurations: {e}"))
    })?;

    let mut best: Option<(u16, u32, SampleFormat, u32)> = None;
    for range in ranges {
        let format = range.sample_format();
        if range.channels() < 2 || !matches!(format, SampleFormat::I16 | SampleFormat::F32) {
            continue;
        }
        let rate = requested.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
        let distance = rate.abs_diff(requested);

        let better = match best {
            None => true,
            Some((_, _, best_format, best_distance)) => {
                distance < best_distance
                    || (distance == best_distance
                        && format == SampleFormat::I16
                        && best_format != SampleFormat::I16)
            }
        };
        if better {
            best = Some((range.channels(), rate, format, distance));
        }
    }

    best.map(|(channels, rate, format, _)| (channels, rate, format))
        .ok_or_else(|| {
            ScopeError::DeviceConfig(
                "Device has no two-channel 16-bit or float input configuration".to_string(),
            )
        })
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &StreamConfig,
    block_frames: usize,
    sender: Sender<Vec<RawSample>>,
    failed: Arc<AtomicBool>,
    overruns: Arc<AtomicU64>,
    convert: F,
) -> Result<Stream>
where
    T: SizedSample,
    F: Fn(T) -> i16 + Send + 'static,
{
    let channels = config.channels as usize;
    let mut pending: Vec<RawSample> = Vec::with_capacity(block_frames);
    let failed_cb = Arc::clone(&failed);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Extra channels beyond the first two are ignored
                for frame in data.chunks_exact(channels) {
                    pending.push(RawSample::new(convert(frame[0]), convert(frame[1])));
                    if pending.len() == block_frames {
                        let block =
                            std::mem::replace(&mut pending, Vec::with_capacity(block_frames));
                        match sender.try_send(block) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => {
                                overruns.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(TrySendError::Disconnected(_)) => return,
                        }
                    }
                }
            },
            move |err| {
                error!(error = %err, "Audio input stream error");
                failed_cb.store(true, Ordering::Relaxed);
            },
            None,
        )
        .map_err(|e| ScopeError::DeviceConfig(format!("Failed to build input stream: {e}")))
}

impl CaptureDevice for CpalCaptureDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn block_frames(&self) -> usize {
        self.block_frames
    }

    fn read_block(&mut self, block: &mut Vec<RawSample>) -> Result<()> {
        if self.stream.is_none() {
            return Err(ScopeError::Device("Capture stream is closed".to_string()));
        }

        loop {
            match self.receiver.recv_timeout(STREAM_POLL_INTERVAL) {
                Ok(frames) => {
                    *block = frames;
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.failed.load(Ordering::Relaxed) {
                        return Err(ScopeError::Device(
                            "Capture stream stopped after an error".to_string(),
                        ));
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ScopeError::Device("Capture stream ended".to_string()));
                }
            }
        }

        let overruns = self.overruns.swap(0, Ordering::Relaxed);
        if overruns > 0 {
            warn!("Capture overrun: {} blocks dropped", overruns);
            self.stats.overruns += overruns;
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                warn!("Failed to pause capture stream: {}", e);
            }
            drop(stream);
            info!("Audio input device closed");
        }
    }

    fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut CaptureStats {
        &mut self.stats
    }
}

impl Drop for CpalCaptureDevice {
    fn drop(&mut self) {
        self.close();
    }
}
