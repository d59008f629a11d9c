//! RF driver abstraction
//!
//! The transport never talks to reader hardware itself. Anything able to
//! initialise a contactless reader, push its RF/protocol settings and run a
//! single "send N bytes, wait for M bytes" exchange can drive a [`TypeBTag`].
//!
//! [`TypeBTag`]: crate::TypeBTag

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::TransportError;

/// Primitive operations of a contactless reader
pub trait RfDriver: Send + fmt::Debug {
    /// Error type returned by the driver
    type Error: Into<TransportError> + fmt::Debug;

    /// Acknowledge the reader and bring it into a known state
    fn init_device(&mut self) -> Result<(), Self::Error>;

    /// Push the RF and protocol settings used for the next exchange
    fn send_preparation_commands(&mut self, rf: &[u8], protocol: &[u8]) -> Result<(), Self::Error>;

    /// Exchange one frame with the tag
    ///
    /// Returns the reader's full answer, including its framing header.
    fn in_comm_rf(&mut self, payload: &[u8], timeout: Duration) -> Result<Bytes, Self::Error> {
        trace!(payload = %hex::encode(payload), ?timeout, "InCommRF");
        let result = self.do_in_comm_rf(payload, timeout);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode(response), "InCommRF answered");
            }
            Err(e) => {
                debug!(error = ?e, "RF exchange failed");
            }
        }
        result
    }

    /// Internal implementation of in_comm_rf
    fn do_in_comm_rf(&mut self, payload: &[u8], timeout: Duration) -> Result<Bytes, Self::Error>;

    /// Switch the RF field off and release the reader
    fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Timeout used for APDU exchanges
    fn timeout(&self) -> Duration;
}
