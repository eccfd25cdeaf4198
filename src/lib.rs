//! # scope-engine: two-channel software oscilloscope
//!
//! The acquisition core of a sound-card oscilloscope. A capture device
//! delivers interleaved stereo samples; the engine aligns them on a trigger,
//! conditions them for the active display mode and hands the resulting
//! point sets to an external plotting program. A separate control panel
//! process steers it over a local socket.
//!
//! ## Architecture
//!
//! - **Capture**: blocking block reads from a sound card (`cpal`) or a mock
//!   pattern generator, consumed one sample at a time
//! - **Acquisition**: one shared pre-fill / trigger / fill skeleton driving a
//!   per-mode strategy (analog, XY, digital, voltmeter)
//! - **Control**: a fixed-width request/response protocol, polled once per
//!   cycle
//! - **Render**: line commands to `gnuplot` plus a side data file, on a
//!   full-redraw / refresh cadence
//!
//! Everything runs on one thread. The interrupt handler only flips a
//! [`ShutdownToken`] that the loop checks cooperatively.
//!
//! ## Example
//!
//! ```ignore
//! use scope_engine::{
//!     acquisition::{AcquisitionEngine, AcquisitionSettings},
//!     capture::{MockCaptureDevice, MockSignal, SampleReader},
//!     config::EngineConfig,
//!     control::ControlChannel,
//!     render::{NullBackend, RenderAdapter},
//!     ScopeRunner, ShutdownToken,
//! };
//!
//! let config = EngineConfig::default();
//! let token = ShutdownToken::new();
//! let device = MockCaptureDevice::new(MockSignal::default(), 44_100, 441);
//! let engine = AcquisitionEngine::new(
//!     SampleReader::new(device).with_shutdown(token.clone()),
//!     AcquisitionSettings::from(&config),
//! );
//! let channel = ControlChannel::connect(&config.socket_path)?;
//! let renderer = RenderAdapter::new(NullBackend::new(), &config);
//!
//! let mut runner = ScopeRunner::new(engine, channel, renderer, &config, token)?;
//! let result = runner.run();
//! runner.shutdown(result.is_ok());
//! ```

pub mod acquisition;
pub mod capture;
pub mod config;
pub mod control;
pub mod error;
pub mod export;
pub mod render;
pub mod runner;
pub mod shutdown;
pub mod types;

// Re-export commonly used types
pub use config::{EngineConfig, ScopeParameters};
pub use error::{Result, ScopeError};
pub use runner::{RunnerParts, ScopeRunner};
pub use shutdown::ShutdownToken;
pub use types::{Frame, Mode, Trace};
