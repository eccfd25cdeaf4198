//! Control channel to the parameter panel
//!
//! The engine is the client: once per acquisition cycle it sends a request
//! byte and reads back one response frame. The channel is generic over any
//! `Read + Write` stream so tests can drive it through
//! [`UnixStream::pair`].
//!
//! # Main Types
//!
//! - [`ControlChannel`] - Request/response client
//! - [`ControlResponse`] - Decoded peer response
//! - [`ChannelStats`] - Round-trip counters

pub mod codec;

pub use codec::{ControlResponse, FRAME_SIZE, REQUEST, UPDATE_PAYLOAD_LEN};

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use crate::error::{Result, ResultExt, ScopeError};

/// Bytes reserved for one frame plus headroom
pub const READ_BUFFER_SIZE: usize = 128;

/// Counters for the control round trips
#[derive(Debug, Clone, Default)]
pub struct ChannelStats {
    /// Requests sent
    pub requests: u64,
    /// Responses that decoded cleanly
    pub responses: u64,
    /// Responses that failed to decode
    pub malformed: u64,
}

/// Request/response client over a byte stream
pub struct ControlChannel<S: Read + Write> {
    stream: S,
    buffer: [u8; READ_BUFFER_SIZE],
    stats: ChannelStats,
}

impl ControlChannel<UnixStream> {
    /// Connect to the peer's Unix socket
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| {
            ScopeError::ChannelConnect(format!("Failed to connect to {:?}: {}", path, e))
        })?;
        tracing::debug!("Connected to control socket {:?}", path);
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> ControlChannel<S> {
    /// Wrap an already connected stream
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: [0; READ_BUFFER_SIZE],
            stats: ChannelStats::default(),
        }
    }

    /// One round trip: send the request, read and decode one response
    ///
    /// Reads until a whole [`FRAME_SIZE`] frame has arrived, so a frame
    /// split across several reads is put back together. A hang-up before
    /// the first byte is the fatal [`ScopeError::PeerDisconnected`]; a
    /// hang-up mid-frame decodes whatever arrived. Decoding failures come
    /// back as continuable [`ScopeError::Protocol`] /
    /// [`ScopeError::InvalidParameters`].
    pub fn poll(&mut self) -> Result<ControlResponse> {
        self.stream
            .write_all(&[REQUEST])
            .context("Failed to send control request")?;
        self.stats.requests += 1;

        let n = self.read_frame()?;
        if n == 0 {
            return Err(ScopeError::PeerDisconnected);
        }

        match ControlResponse::parse(&self.buffer[..n]) {
            Ok(response) => {
                self.stats.responses += 1;
                tracing::trace!("Control response: {:?}", response);
                Ok(response)
            }
            Err(e) => {
                self.stats.malformed += 1;
                Err(e)
            }
        }
    }

    fn read_frame(&mut self) -> Result<usize> {
        self.buffer.fill(0);
        let mut filled = 0;
        while filled < FRAME_SIZE {
            let n = match self.stream.read(&mut self.buffer[filled..FRAME_SIZE]) {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("Failed to read control response"),
            };
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled > 0 && filled < FRAME_SIZE {
            tracing::debug!("Peer hung up after {} of {} frame bytes", filled, FRAME_SIZE);
        }
        Ok(filled)
    }

    /// Round-trip counters
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Give back the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}
