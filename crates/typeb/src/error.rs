//! Error types for the Type B transport

use thiserror::Error;

/// Error reported by an RF driver
///
/// Drivers convert their native errors into this type; the transport passes
/// it through untouched.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection error
    #[error("Failed to connect to device")]
    Connection,

    /// Transmission error
    #[error("Failed to transmit data")]
    Transmission,

    /// Device error
    #[error("Device error")]
    Device,

    /// The RF exchange did not complete in time
    #[error("Operation timed out")]
    Timeout,

    /// Cancelled operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Driver error (with code)
    #[error("Driver error code: {0}")]
    Driver(i32),

    /// Other error with message
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Create a new driver error
    pub const fn driver(code: i32) -> Self {
        Self::Driver(code)
    }

    /// Create a general other error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other(message.into())
    }
}

/// Errors raised by [`TypeBTag`](crate::TypeBTag)
#[derive(Debug, Error)]
pub enum TypeBError {
    /// The RF driver failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Discovery gave up after the configured number of SENSE attempts
    #[error("No Type B tag answered after {attempts} attempts")]
    TagNotFound {
        /// SENSE commands issued
        attempts: u32,
    },

    /// Discovery ran past its deadline
    #[error("Tag discovery deadline exceeded after {attempts} attempts")]
    DiscoveryTimeout {
        /// SENSE commands issued
        attempts: u32,
    },

    /// Discovery was cancelled through a [`CancelToken`](crate::CancelToken)
    #[error("Tag discovery cancelled")]
    Cancelled,

    /// A response frame too short to carry a header and status word
    #[error("Response frame too short: {len} bytes")]
    FrameTooShort {
        /// Length of the received frame
        len: usize,
    },

    /// The card asked for a second continuation block
    #[error("Response chained over more than one continuation block")]
    UnsupportedChaining,
}

impl TypeBError {
    /// Check if the error came from the RF driver
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
