//! Error types for the laser-emu crate.

use std::error::Error as StdError;
use std::fmt;

/// Errors surfaced by the emulator outside the simulation hot path.
///
/// Drawing and per-step simulation are total and never fail. Errors only come
/// from resource handling (energy buffer sizing), the background worker and the
/// external display surface.
#[derive(Debug)]
pub enum Error {
    /// Invalid construction parameters (e.g. a zero-sized energy buffer).
    InvalidConfig(String),

    /// The energy buffer could not be (re)allocated. The previous buffer is kept.
    Resize {
        width: usize,
        height: usize,
        reason: String,
    },

    /// The simulation worker thread is gone.
    Disconnected(String),

    /// The simulation worker was explicitly stopped.
    Stopped,

    /// The display surface rejected the presented image (wrapped).
    Surface(Box<dyn StdError + Send + Sync>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Error::Resize {
                width,
                height,
                reason,
            } => write!(f, "failed to resize energy buffer to {}x{}: {}", width, height, reason),
            Error::Disconnected(msg) => write!(f, "disconnected: {}", msg),
            Error::Stopped => write!(f, "stopped: worker was explicitly stopped"),
            Error::Surface(e) => write!(f, "display surface error: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Surface(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl Error {
    /// Create an invalid config error with a message.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }

    /// Create a resize error for the requested dimensions.
    pub fn resize(width: usize, height: usize, reason: impl Into<String>) -> Self {
        Error::Resize {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Create a disconnected error with a message.
    pub fn disconnected(msg: impl Into<String>) -> Self {
        Error::Disconnected(msg.into())
    }

    /// Create a surface error from any error type.
    pub fn surface(err: impl StdError + Send + Sync + 'static) -> Self {
        Error::Surface(Box::new(err))
    }

    /// Returns true if this is a Resize error.
    pub fn is_resize(&self) -> bool {
        matches!(self, Error::Resize { .. })
    }

    /// Returns true if this is a Disconnected error.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Error::Disconnected(_))
    }

    /// Returns true if this is a Stopped error.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Error::Stopped)
    }
}

/// Result type for emulator operations.
pub type Result<T> = std::result::Result<T, Error>;
