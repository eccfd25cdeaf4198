//! Control protocol wire format
//!
//! The engine sends the single byte `g`; the peer answers with one
//! NUL-padded frame of [`FRAME_SIZE`] bytes whose leading byte selects the
//! response:
//!
//! | Leading byte | Payload | Meaning |
//! |---|---|---|
//! | `y` | 44 bytes of fixed-width fields | Replace the scope parameters |
//! | `p` | - | Pause acquisition |
//! | `s` | file path | Save the current trace |
//! | `m` | `a`, `x`, `d` or `v` | Switch mode |
//! | `n` | - | Nothing to do (resume) |
//!
//! # Parameter payload
//!
//! | Offset | Width | Field | Example |
//! |---|---|---|---|
//! | 0 | 4 | tdiv | `1e-3` |
//! | 4 | 4 | y1div | `2e+3` |
//! | 8 | 4 | y2div | `5e-1` |
//! | 12 | 1 | trigger edge | `r` / `f` |
//! | 13 | 1 | trigger channel | `1` / `2` |
//! | 14 | 9 | trigger level | `+0.00e+00` |
//! | 23 | 9 | ch1 calibration | `+1.00e+00` |
//! | 32 | 9 | ch2 calibration | `+2.50e-04` |
//! | 41 | 3 | averaging depth | `004` |

use std::path::PathBuf;

use crate::config::{ScopeParameters, TriggerSettings};
use crate::error::{Result, ScopeError};
use crate::types::{Channel, Mode, TriggerEdge};

/// Request byte sent once per cycle
pub const REQUEST: u8 = b'g';

/// Size of every response frame written by the peer
pub const FRAME_SIZE: usize = 126;

/// Length of the parameter payload after the leading `y`
pub const UPDATE_PAYLOAD_LEN: usize = 44;

const SCALE_WIDTH: usize = 4;
const FLOAT_WIDTH: usize = 9;
const NAVG_WIDTH: usize = 3;

/// A decoded peer response
#[derive(Debug, Clone, PartialEq)]
pub enum ControlResponse {
    /// New parameter snapshot
    Update(ScopeParameters),
    /// Suspend trigger and trace logic
    Pause,
    /// Write the current trace to a file
    Save(PathBuf),
    /// Switch acquisition mode
    SetMode(Mode),
    /// Nothing to do
    NoOp,
}

impl ControlResponse {
    /// Decode one frame
    ///
    /// Everything from the first NUL byte on is padding.
    pub fn parse(frame: &[u8]) -> Result<Self> {
        let end = frame.iter().position(|&b| b == 0).unwrap_or(frame.len());
        let text = std::str::from_utf8(&frame[..end])
            .map_err(|e| ScopeError::Protocol(format!("response is not UTF-8: {}", e)))?;

        let mut chars = text.chars();
        let Some(lead) = chars.next() else {
            return Err(ScopeError::Protocol("empty response".to_string()));
        };
        let rest = chars.as_str();

        match lead {
            'y' => parse_update(rest).map(ControlResponse::Update),
            'p' => Ok(ControlResponse::Pause),
            'n' => Ok(ControlResponse::NoOp),
            's' => {
                let path = rest.trim_end();
                if path.is_empty() {
                    return Err(ScopeError::Protocol("save request without a path".to_string()));
                }
                Ok(ControlResponse::Save(PathBuf::from(path)))
            }
            'm' => {
                let c = rest.chars().next().ok_or_else(|| {
                    ScopeError::Protocol("mode request without a mode".to_string())
                })?;
                Mode::from_wire(c)
                    .map(ControlResponse::SetMode)
                    .ok_or_else(|| ScopeError::Protocol(format!("unknown mode {:?}", c)))
            }
            other => Err(ScopeError::Protocol(format!(
                "unexpected leading byte {:?}",
                other
            ))),
        }
    }

    /// Encode as a NUL-padded frame, the way the peer writes it
    pub fn encode(&self) -> Result<Vec<u8>> {
        let text = match self {
            ControlResponse::Update(params) => params.to_update_message()?,
            ControlResponse::Pause => "p".to_string(),
            ControlResponse::NoOp => "n".to_string(),
            ControlResponse::Save(path) => format!("s{}", path.display()),
            ControlResponse::SetMode(mode) => format!("m{}", mode.wire_char()),
        };

        // Keep at least one NUL so the reader finds the end
        if text.len() >= FRAME_SIZE {
            return Err(ScopeError::Protocol(format!(
                "message of {} bytes does not fit a {}-byte frame",
                text.len(),
                FRAME_SIZE
            )));
        }
        let mut frame = text.into_bytes();
        frame.resize(FRAME_SIZE, 0);
        Ok(frame)
    }
}

fn parse_update(payload: &str) -> Result<ScopeParameters> {
    if payload.len() < UPDATE_PAYLOAD_LEN || !payload.is_char_boundary(UPDATE_PAYLOAD_LEN) {
        return Err(ScopeError::Protocol(format!(
            "parameter update has {} payload bytes, expected {}",
            payload.len(),
            UPDATE_PAYLOAD_LEN
        )));
    }

    let field = |start: usize, len: usize| field_at(payload, start, len);

    let edge_field = field(12, 1)?;
    let edge = edge_field
        .chars()
        .next()
        .and_then(TriggerEdge::from_wire)
        .ok_or_else(|| ScopeError::Protocol(format!("invalid trigger edge {:?}", edge_field)))?;

    let chan_field = field(13, 1)?;
    let channel = chan_field
        .parse::<u32>()
        .ok()
        .and_then(Channel::from_number)
        .ok_or_else(|| {
            ScopeError::Protocol(format!("invalid trigger channel {:?}", chan_field))
        })?;

    let navg_field = field(41, NAVG_WIDTH)?;
    let navg = navg_field
        .parse::<u32>()
        .map_err(|_| ScopeError::Protocol(format!("invalid averaging depth {:?}", navg_field)))?;

    let params = ScopeParameters {
        tdiv: parse_number("tdiv", field(0, SCALE_WIDTH)?)?,
        y1div: parse_number("y1div", field(4, SCALE_WIDTH)?)?,
        y2div: parse_number("y2div", field(8, SCALE_WIDTH)?)?,
        trigger: TriggerSettings {
            channel,
            edge,
            level: parse_number("trigger level", field(14, FLOAT_WIDTH)?)?,
        },
        y1_vps: parse_number("y1_vps", field(23, FLOAT_WIDTH)?)?,
        y2_vps: parse_number("y2_vps", field(32, FLOAT_WIDTH)?)?,
        navg,
    };
    params.validate()?;
    Ok(params)
}

fn field_at(payload: &str, start: usize, len: usize) -> Result<&str> {
    payload
        .get(start..start + len)
        .map(|s| s.trim())
        .ok_or_else(|| ScopeError::Protocol(format!("field at offset {} is not ASCII", start)))
}

fn parse_number(name: &str, text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| ScopeError::Protocol(format!("invalid {} {:?}", name, text)))
}

impl ScopeParameters {
    /// The `y...` message a control peer sends for these parameters
    ///
    /// Scales are written as one-digit exponentials (`1e-3`), level and
    /// calibration with two decimals and a signed two-digit exponent
    /// (`+1.00e+00`), the averaging depth zero-padded to three digits.
    /// Scales with more than one significant digit and values that do not
    /// fit their field width are rejected.
    pub fn to_update_message(&self) -> Result<String> {
        let message = format!(
            "y{}{}{}{}{}{}{}{}{}",
            scale_field("tdiv", self.tdiv)?,
            scale_field("y1div", self.y1div)?,
            scale_field("y2div", self.y2div)?,
            self.trigger.edge.wire_char(),
            self.trigger.channel.number(),
            fixed("trigger level", signed_exp(self.trigger.level), FLOAT_WIDTH)?,
            fixed("y1_vps", signed_exp(self.y1_vps), FLOAT_WIDTH)?,
            fixed("y2_vps", signed_exp(self.y2_vps), FLOAT_WIDTH)?,
            fixed("navg", format!("{:03}", self.navg), NAVG_WIDTH)?,
        );
        Ok(message)
    }
}

fn fixed(name: &str, text: String, width: usize) -> Result<String> {
    if text.len() == width {
        Ok(text)
    } else {
        Err(ScopeError::InvalidParameters(format!(
            "{} encodes as {:?}, which is not {} characters wide",
            name, text, width
        )))
    }
}

fn scale_field(name: &str, value: f64) -> Result<String> {
    let text = fixed(name, scale_exp(value), SCALE_WIDTH)?;
    let exact = text
        .parse::<f64>()
        .map(|parsed| (parsed - value).abs() <= 1e-9 * value.abs())
        .unwrap_or(false);
    if exact {
        Ok(text)
    } else {
        Err(ScopeError::InvalidParameters(format!(
            "{} = {} has no one-digit exponential form",
            name, value
        )))
    }
}

/// `1e-3`, `2e+4`
fn scale_exp(value: f64) -> String {
    let text = format!("{:.0e}", value);
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => text,
    }
}

/// `+1.00e+00`, `-2.50e-03`
fn signed_exp(value: f64) -> String {
    let sign = if value.is_sign_negative() { '-' } else { '+' };
    let text = format!("{:.2e}", value.abs());
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let exp_sign = if exp < 0 { '-' } else { '+' };
            format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exp.abs())
        }
        None => format!("{}{}", sign, text),
    }
}
