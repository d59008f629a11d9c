//! Scripted RF driver for tests
//!
//! [`MockDriver`] replays queued answers for every `in_comm_rf` call and
//! records each driver call so tests can assert the exact byte sequence a
//! session put on the air.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::driver::RfDriver;
use crate::error::TransportError;
use crate::frame::PCB_OFFSET;

/// One call made against the mock driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    /// `init_device`
    InitDevice,
    /// `send_preparation_commands`
    Prepare {
        /// RF settings
        rf: Bytes,
        /// Protocol settings
        protocol: Bytes,
    },
    /// `in_comm_rf`
    InCommRf {
        /// Bytes sent to the tag
        payload: Bytes,
        /// Timeout passed by the transport
        timeout: Duration,
    },
    /// `disconnect`
    Disconnect,
}

/// In-memory driver answering from a queue
#[derive(Debug)]
pub struct MockDriver {
    /// Answers returned by successive `in_comm_rf` calls
    pub responses: VecDeque<Result<Bytes, TransportError>>,
    /// Calls made so far
    pub calls: Vec<DriverCall>,
    /// Timeout reported through [`RfDriver::timeout`]
    pub timeout: Duration,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            responses: VecDeque::new(),
            calls: Vec::new(),
            timeout: Duration::from_millis(100),
        }
    }
}

impl MockDriver {
    /// Create a driver with an empty answer queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver that answers with the given frames in order
    pub fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        Self {
            responses: responses.into_iter().map(Ok).collect(),
            ..Self::default()
        }
    }

    /// Queue an answer
    pub fn push_response(&mut self, response: impl Into<Bytes>) -> &mut Self {
        self.responses.push_back(Ok(response.into()));
        self
    }

    /// Queue a failure
    pub fn push_error(&mut self, error: TransportError) -> &mut Self {
        self.responses.push_back(Err(error));
        self
    }

    /// Payloads sent through `in_comm_rf`, in order
    pub fn sent_payloads(&self) -> Vec<Bytes> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::InCommRf { payload, .. } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&DriverCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }
}

impl RfDriver for MockDriver {
    type Error = TransportError;

    fn init_device(&mut self) -> Result<(), Self::Error> {
        self.calls.push(DriverCall::InitDevice);
        Ok(())
    }

    fn send_preparation_commands(&mut self, rf: &[u8], protocol: &[u8]) -> Result<(), Self::Error> {
        self.calls.push(DriverCall::Prepare {
            rf: Bytes::copy_from_slice(rf),
            protocol: Bytes::copy_from_slice(protocol),
        });
        Ok(())
    }

    fn do_in_comm_rf(&mut self, payload: &[u8], timeout: Duration) -> Result<Bytes, Self::Error> {
        self.calls.push(DriverCall::InCommRf {
            payload: Bytes::copy_from_slice(payload),
            timeout,
        });
        self.responses
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::other("mock driver has no queued response")))
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.calls.push(DriverCall::Disconnect);
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Build a reader frame: zeroed header with `pcb` at offset 7, then body and status
pub fn frame(pcb: u8, data: &[u8], status: [u8; 2]) -> Bytes {
    let mut buf = BytesMut::with_capacity(PCB_OFFSET + 1 + data.len() + 2);
    buf.put_bytes(0x00, PCB_OFFSET);
    buf.put_u8(pcb);
    buf.put_slice(data);
    buf.put_slice(&status);
    buf.freeze()
}

/// Build an acknowledged I-block answer ending in `90 00`
pub fn ok_frame(data: &[u8]) -> Bytes {
    frame(0x02, data, [0x90, 0x00])
}

/// Build an ATQB answer carrying the given PUPI at offsets 8..12
pub fn sense_response(pupi: [u8; 4]) -> Bytes {
    let mut buf = BytesMut::with_capacity(20);
    buf.put_bytes(0x00, PCB_OFFSET);
    buf.put_u8(0x50);
    buf.put_slice(&pupi);
    // application data, protocol info
    buf.put_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x81, 0x91]);
    buf.freeze()
}

/// Build an empty answer, as seen while no tag is in the field
pub fn no_tag_response() -> Bytes {
    Bytes::from_static(&[0x00; 8])
}
