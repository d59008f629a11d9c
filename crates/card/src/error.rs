use mynumber_nfc_typeb::TypeBError;

use crate::asn1::HeaderError;
use crate::pin::PinVerification;
use crate::status::StatusWord;

/// Result type for card operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by card operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport error
    #[error(transparent)]
    TypeB(#[from] TypeBError),

    /// File header could not be decoded
    #[error("Malformed file header: {0}")]
    Header(#[from] HeaderError),

    /// PIN refused before reaching the card
    #[error("Invalid PIN: {0}")]
    InvalidPin(&'static str),

    /// Card did not accept the PIN
    #[error("PIN verification failed: {0}")]
    PinRejected(PinVerification),

    /// Card answered with an unexpected status word
    #[error("Card returned {status} ({})", .status.description())]
    Status {
        /// Status word returned
        status: StatusWord,
    },

    /// READ BINARY returned no data
    #[error("READ BINARY at offset {offset} returned no data ({status})")]
    ReadBinary {
        /// Offset of the failed chunk
        offset: usize,
        /// Status word returned
        status: StatusWord,
    },

    /// Command body does not fit a short APDU
    #[error("Command body of {len} bytes exceeds the short APDU limit")]
    CommandTooLong {
        /// Body length
        len: usize,
    },

    /// File larger than READ BINARY can address
    #[error("File of {size} bytes exceeds the READ BINARY offset range")]
    FileTooLarge {
        /// Declared file size
        size: usize,
    },

    /// Unknown hash algorithm name
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(String),
}

impl Error {
    /// Check if the error came from the RF link
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::TypeB(_))
    }
}
