//! Core data types for the scope engine
//!
//! This module contains the fundamental data structures shared by the
//! capture, acquisition, control and render layers.
//!
//! # Main Types
//!
//! - [`RawSample`] - One interleaved frame from the capture device (two `i16`)
//! - [`Sample`] - A two-channel value pair as stored in the sliding window
//! - [`TracePoint`] / [`Trace`] - Time-centered `(t, ch1, ch2)` rows
//! - [`Mode`] - The active acquisition mode
//! - [`Frame`] - The renderable output of one acquisition cycle
//!
//! # Time Axis
//!
//! Every trace is centered on zero: for a trace of `n` samples spaced `dt`
//! apart, the first point sits at `-n/2 * dt` and each following point is one
//! `dt` later. The trigger point (when one was found) lands on `t = 0`.

use serde::{Deserialize, Serialize};

/// One interleaved frame as delivered by the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSample {
    /// Left / channel 1
    pub ch1: i16,
    /// Right / channel 2
    pub ch2: i16,
}

impl RawSample {
    /// Create a raw sample pair
    pub const fn new(ch1: i16, ch2: i16) -> Self {
        Self { ch1, ch2 }
    }

    /// Widen into the floating point pair used by the acquisition buffers
    pub fn to_sample(self) -> Sample {
        Sample::new(self.ch1 as f64, self.ch2 as f64)
    }
}

/// A two-channel sample pair
///
/// Depending on the mode this holds raw sample units (analog, XY, voltmeter)
/// or logic levels `0.0` / `1.0` (digital).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub ch1: f64,
    pub ch2: f64,
}

impl Sample {
    /// Create a sample pair
    pub const fn new(ch1: f64, ch2: f64) -> Self {
        Self { ch1, ch2 }
    }

    /// Value on the given channel
    pub fn channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::One => self.ch1,
            Channel::Two => self.ch2,
        }
    }
}

/// Input channel selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Channel {
    /// Channel 1 (left)
    #[default]
    One,
    /// Channel 2 (right)
    Two,
}

impl Channel {
    /// Parse a 1-based channel number
    pub fn from_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(Channel::One),
            2 => Some(Channel::Two),
            _ => None,
        }
    }

    /// The 1-based channel number
    pub fn number(&self) -> u32 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ch{}", self.number())
    }
}

/// Edge direction the trigger waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TriggerEdge {
    /// Trigger when the signal goes up through the level
    #[default]
    Rising,
    /// Trigger when the signal goes down through the level
    Falling,
}

impl TriggerEdge {
    /// Parse the wire character (`'r'` or `'f'`)
    pub fn from_wire(c: char) -> Option<Self> {
        match c {
            'r' => Some(TriggerEdge::Rising),
            'f' => Some(TriggerEdge::Falling),
            _ => None,
        }
    }

    /// The wire character
    pub fn wire_char(&self) -> char {
        match self {
            TriggerEdge::Rising => 'r',
            TriggerEdge::Falling => 'f',
        }
    }
}

impl std::fmt::Display for TriggerEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerEdge::Rising => write!(f, "Rising Edge"),
            TriggerEdge::Falling => write!(f, "Falling Edge"),
        }
    }
}

/// Acquisition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mode {
    /// Triggered two-channel time display
    #[default]
    Analog,
    /// Channel 1 against channel 2
    Xy,
    /// Triggered logic-level display
    Digital,
    /// Mean-rectified amplitude readout
    Voltmeter,
}

impl Mode {
    /// All modes, in panel cycling order
    pub fn all() -> &'static [Mode] {
        &[Mode::Analog, Mode::Xy, Mode::Digital, Mode::Voltmeter]
    }

    /// Parse the wire character used by the `m` command
    pub fn from_wire(c: char) -> Option<Self> {
        match c {
            'a' => Some(Mode::Analog),
            'x' => Some(Mode::Xy),
            'd' => Some(Mode::Digital),
            'v' => Some(Mode::Voltmeter),
            _ => None,
        }
    }

    /// The wire character used by the `m` command
    pub fn wire_char(&self) -> char {
        match self {
            Mode::Analog => 'a',
            Mode::Xy => 'x',
            Mode::Digital => 'd',
            Mode::Voltmeter => 'v',
        }
    }

    /// Whether frames in this mode are anchored on a trigger search
    pub fn is_triggered(&self) -> bool {
        matches!(self, Mode::Analog | Mode::Digital)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Analog => write!(f, "Analog"),
            Mode::Xy => write!(f, "XY"),
            Mode::Digital => write!(f, "Digital"),
            Mode::Voltmeter => write!(f, "Voltmeter"),
        }
    }
}

/// A single `(time, ch1, ch2)` row of a trace
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TracePoint {
    /// Seconds relative to the trace center
    pub time: f64,
    pub ch1: f64,
    pub ch2: f64,
}

impl TracePoint {
    /// Create a trace point
    pub const fn new(time: f64, ch1: f64, ch2: f64) -> Self {
        Self { time, ch1, ch2 }
    }
}

/// An ordered, time-centered sequence of trace points
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trace {
    points: Vec<TracePoint>,
}

impl Trace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trace from per-sample channel values
    ///
    /// `values` yields `(ch1, ch2)` pairs; the time axis starts at
    /// `-len/2 * dt` and advances by `dt` per point.
    pub fn centered<I>(values: I, dt: f64) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
        I::IntoIter: ExactSizeIterator,
    {
        let values = values.into_iter();
        let start = -0.5 * values.len() as f64 * dt;
        let points = values
            .enumerate()
            .map(|(j, (ch1, ch2))| TracePoint::new(start + j as f64 * dt, ch1, ch2))
            .collect();
        Self { points }
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the trace holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Borrow the points
    pub fn points(&self) -> &[TracePoint] {
        &self.points
    }

    /// Iterate over the points
    pub fn iter(&self) -> std::slice::Iter<'_, TracePoint> {
        self.points.iter()
    }

    /// Index of the point whose time is closest to `t`
    pub fn index_nearest(&self, t: f64) -> Option<usize> {
        self.points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.time - t)
                    .abs()
                    .partial_cmp(&(b.time - t).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }
}

impl From<Vec<TracePoint>> for Trace {
    fn from(points: Vec<TracePoint>) -> Self {
        Self { points }
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a TracePoint;
    type IntoIter = std::slice::Iter<'a, TracePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Voltmeter result for both channels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VoltmeterReadout {
    /// Channel 1 estimate (volts if calibrated, sample units otherwise)
    pub ch1: f64,
    /// Channel 2 estimate
    pub ch2: f64,
    /// Whether channel 1 carries a calibration factor
    pub ch1_calibrated: bool,
    /// Whether channel 2 carries a calibration factor
    pub ch2_calibrated: bool,
}

impl VoltmeterReadout {
    /// Human readable readout, e.g. `Ch1 = 0.1234 V` or `Ch2 = 812 (a.u.)`
    pub fn text(&self, channel: Channel) -> String {
        let (value, calibrated) = match channel {
            Channel::One => (self.ch1, self.ch1_calibrated),
            Channel::Two => (self.ch2, self.ch2_calibrated),
        };
        if calibrated {
            format!("{} = {:.4} V", channel, value)
        } else {
            format!("{} = {:.0} (a.u.)", channel, value)
        }
    }
}

/// Output of one acquisition cycle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// The trace to draw
    pub trace: Trace,
    /// Voltmeter readings (voltmeter mode only)
    pub readout: Option<VoltmeterReadout>,
    /// Whether a trigger crossing anchored this frame
    pub triggered: bool,
}

/// Counters describing the engine's run so far
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    /// Completed loop iterations
    pub cycles: u64,
    /// Frames anchored on a trigger crossing
    pub triggered_frames: u64,
    /// Frames rendered after the trigger budget ran out
    pub untriggered_frames: u64,
    /// Control responses that could not be decoded
    pub malformed_responses: u64,
    /// Traces written to disk
    pub saves: u64,
}

impl CycleStats {
    /// Percentage of triggered-mode frames that found a crossing
    pub fn trigger_rate(&self) -> f64 {
        let total = self.triggered_frames + self.untriggered_frames;
        if total == 0 {
            100.0
        } else {
            (self.triggered_frames as f64 / total as f64) * 100.0
        }
    }
}
