//! Error handling for the scope engine
//!
//! This module defines the engine's error type and a Result alias used
//! throughout the crate. Errors fall into two groups:
//!
//! - **Fatal**: the capture device, the control channel or the renderer
//!   cannot be used. The runner tears everything down and exits non-zero.
//! - **Continuable**: a malformed control message or an out-of-range
//!   parameter set. These are logged and treated as a no-op.

use thiserror::Error;

/// Main error type for scope engine operations
#[derive(Error, Debug)]
pub enum ScopeError {
    /// The capture device could not be opened or read
    #[error("Capture device error: {0}")]
    Device(String),

    /// The capture device rejected the requested stream configuration
    #[error("Capture configuration error: {0}")]
    DeviceConfig(String),

    /// Connecting to the control peer failed
    #[error("Control channel connect error: {0}")]
    ChannelConnect(String),

    /// The control peer closed the connection (zero-byte read)
    #[error("Control peer disconnected")]
    PeerDisconnected,

    /// A control response could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Decoded parameters violate the scope parameter invariants
    #[error("Invalid scope parameters: {0}")]
    InvalidParameters(String),

    /// The render back-end failed
    #[error("Render error: {0}")]
    Render(String),

    /// Shutdown was requested while waiting on the device
    #[error("Acquisition cancelled")]
    Cancelled,

    /// Errors related to configuration loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ScopeError>,
    },
}

impl ScopeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ScopeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error must end the acquisition loop
    pub fn is_fatal(&self) -> bool {
        match self {
            ScopeError::Protocol(_) | ScopeError::InvalidParameters(_) => false,
            ScopeError::WithContext { source, .. } => source.is_fatal(),
            _ => true,
        }
    }

    /// Whether this error only reports a requested shutdown
    pub fn is_cancelled(&self) -> bool {
        match self {
            ScopeError::Cancelled => true,
            ScopeError::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Result type alias for scope engine operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ScopeError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ScopeError::Io(e).with_context(f()))
    }
}
