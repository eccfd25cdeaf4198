//! Acquisition pipeline
//!
//! Turns the raw sample stream into renderable frames.
//!
//! # Main Types
//!
//! - [`SlidingWindowBuffer`] - Bounded FIFO of sample pairs
//! - [`TriggerDetector`] - Level-crossing / logic-edge detection with a search budget
//! - [`DigitalConditioner`] - Rolling RMS to logic level conversion
//! - [`AveragingAccumulator`] - Mean over the most recent frames
//! - [`ModeStrategy`] - Per-mode conditioning, fill policy and post-processing
//! - [`AcquisitionEngine`] - The shared fill/trigger skeleton driving a strategy

pub mod averaging;
pub mod buffer;
pub mod digital;
pub mod engine;
pub mod strategy;
pub mod trigger;

pub use averaging::AveragingAccumulator;
pub use buffer::SlidingWindowBuffer;
pub use digital::DigitalConditioner;
pub use engine::{AcquisitionEngine, AcquisitionSettings};
pub use strategy::{
    strategy_for, AnalogStrategy, DigitalStrategy, FillPolicy, ModeStrategy, VoltmeterStrategy,
    XyStrategy,
};
pub use trigger::{TriggerDetector, TriggerKind, TriggerOutcome};
