//! Configuration module for the scope engine
//!
//! This module handles engine configuration including:
//! - Static engine settings (device, socket, renderer, timing) from a TOML file
//! - The live [`ScopeParameters`] the control peer updates while running
//! - Display geometry constants shared by acquisition and rendering
//!
//! # Files
//!
//! The engine reads an optional TOML file passed with `--config`. Every key is
//! optional; missing keys fall back to [`EngineConfig::default`].
//!
//! ```toml
//! socket_path = "xoscilloscope.socket"
//! device = "default"
//! sample_rate_hz = 44100
//! refresh_cycles = 5000
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Horizontal divisions on the time axis
pub const HORIZ_DIVS: u32 = 14;

/// Vertical divisions in analog mode
pub const VERTC_DIVS: u32 = 8;

/// Divisions per axis in XY mode
pub const XY_DIVS: u32 = 6;

/// Frames per capture block
pub const DEFAULT_BLOCK_FRAMES: usize = 441;

/// Requested capture rate in Hz
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

/// Cycles between full renderer redraws
pub const DEFAULT_REFRESH_CYCLES: u32 = 5000;

/// Shift register length of the digital conditioner
pub const DIG_SR_SIZE: usize = 24;

/// RMS threshold (raw units) separating logic 0 from logic 1
pub const DIG_SIG_THR: f64 = 8192.0;

/// Upper bound on samples drained per cycle while paused
pub const DEFAULT_PAUSE_FILL_CAP: usize = 4410;

/// Default control socket path
pub const DEFAULT_SOCKET_PATH: &str = "xoscilloscope.socket";

/// Default side data file the renderer reads point sets from
pub const DEFAULT_DATA_FILE: &str = "scope.fifo";

// ==================== Engine Config ====================

/// Static engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path of the control peer's Unix socket
    pub socket_path: PathBuf,

    /// Capture device name (`"default"` picks the host default input)
    pub device: String,

    /// Requested sample rate; the device may negotiate a nearby rate
    pub sample_rate_hz: u32,

    /// Frames per capture block
    pub block_frames: usize,

    /// Cycles between full renderer redraws
    pub refresh_cycles: u32,

    /// In voltmeter mode, refresh cycles are fast-forwarded so the renderer
    /// is rebuilt at most this many cycles apart
    pub voltmeter_refresh_window: u32,

    /// Pause after each render call, in milliseconds
    pub frame_delay_ms: u64,

    /// Pause after a malformed control response, in milliseconds
    pub malformed_backoff_ms: u64,

    /// Maximum samples drained per cycle while paused
    pub pause_fill_cap: usize,

    /// Trigger search budget as a multiple of the trace size
    pub trigger_budget_factor: f64,

    /// Side data file shared with the renderer
    pub data_file: PathBuf,

    /// Renderer executable
    pub renderer_command: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            device: "default".to_string(),
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            block_frames: DEFAULT_BLOCK_FRAMES,
            refresh_cycles: DEFAULT_REFRESH_CYCLES,
            voltmeter_refresh_window: 250,
            frame_delay_ms: 10,
            malformed_backoff_ms: 1000,
            pause_fill_cap: DEFAULT_PAUSE_FILL_CAP,
            trigger_budget_factor: 1.0,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            renderer_command: "gnuplot".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScopeError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            ScopeError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load engine config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Serialize the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ScopeError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate_hz == 0 {
            return Err(ScopeError::Config("sample rate must be non-zero".to_string()));
        }
        if self.block_frames == 0 {
            return Err(ScopeError::Config("block size must be non-zero".to_string()));
        }
        if self.refresh_cycles < 2 {
            return Err(ScopeError::Config(
                "refresh_cycles must be at least 2".to_string(),
            ));
        }
        if !(self.trigger_budget_factor.is_finite() && self.trigger_budget_factor >= 0.0) {
            return Err(ScopeError::Config(
                "trigger_budget_factor must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Tests ====================
