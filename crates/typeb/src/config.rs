//! Configuration options for the Type B transport

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;

/// RF settings sent before every exchange (106 kbps Type B)
pub const DEFAULT_RF_PARAMS: [u8; 4] = [0x03, 0x07, 0x0f, 0x07];

/// Protocol settings sent before every exchange
pub const DEFAULT_PROTOCOL_PARAMS: [u8; 10] =
    [0x0b, 0x01, 0x09, 0x01, 0x0c, 0x01, 0x0a, 0x01, 0x00, 0x14];

/// Timeout for SENSE and ATTRIB
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_millis(30);

/// Bounds for the tag discovery loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPolicy {
    /// Give up after this many SENSE commands (`None` polls forever)
    pub max_attempts: Option<u32>,
    /// Pause between two SENSE commands
    pub backoff: Duration,
    /// Give up once discovery has been running this long
    pub deadline: Option<Duration>,
}

impl Default for DiscoveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(100),
            backoff: Duration::from_millis(50),
            deadline: None,
        }
    }
}

impl DiscoveryPolicy {
    /// Poll until a tag shows up or the token is cancelled
    pub const fn unbounded() -> Self {
        Self {
            max_attempts: None,
            backoff: Duration::from_millis(50),
            deadline: None,
        }
    }

    /// Set the maximum number of SENSE attempts
    pub const fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the pause between attempts
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the overall discovery deadline
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Configuration options for [`TypeBTag`](crate::TypeBTag)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeBConfig {
    /// RF settings resent before every exchange
    pub rf_params: Bytes,
    /// Protocol settings resent before every exchange
    pub protocol_params: Bytes,
    /// Timeout for SENSE and ATTRIB
    pub control_timeout: Duration,
    /// Tag discovery bounds
    pub discovery: DiscoveryPolicy,
}

impl Default for TypeBConfig {
    fn default() -> Self {
        Self {
            rf_params: Bytes::from_static(&DEFAULT_RF_PARAMS),
            protocol_params: Bytes::from_static(&DEFAULT_PROTOCOL_PARAMS),
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
            discovery: DiscoveryPolicy::default(),
        }
    }
}

impl TypeBConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the RF settings
    pub fn with_rf_params(mut self, rf_params: impl Into<Bytes>) -> Self {
        self.rf_params = rf_params.into();
        self
    }

    /// Set the protocol settings
    pub fn with_protocol_params(mut self, protocol_params: impl Into<Bytes>) -> Self {
        self.protocol_params = protocol_params.into();
        self
    }

    /// Set the SENSE/ATTRIB timeout
    pub const fn with_control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    /// Set the discovery policy
    pub const fn with_discovery(mut self, discovery: DiscoveryPolicy) -> Self {
        self.discovery = discovery;
        self
    }
}

/// Shared flag used to abort tag discovery from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous cancellation request
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TypeBConfig::default();
        assert_eq!(config.rf_params.as_ref(), &[0x03, 0x07, 0x0f, 0x07]);
        assert_eq!(config.protocol_params.len(), 10);
        assert_eq!(config.control_timeout, Duration::from_millis(30));
        assert_eq!(config.discovery.max_attempts, Some(100));
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!token.is_cancelled());

        other.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!other.is_cancelled());
    }
}
