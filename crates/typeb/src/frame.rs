//! Response frame views
//!
//! Every answer from the reader starts with an eight byte framing region
//! (reader status, length, and the tag's PCB at offset 7) and ends with the
//! card's two status bytes. Whatever sits in between is the APDU response body.

use bytes::Bytes;

/// Length of the reader framing header
pub const HEADER_LEN: usize = 8;

/// Length of the trailing status word
pub const STATUS_LEN: usize = 2;

/// Shortest frame carrying both a header and a status word
pub const MIN_FRAME_LEN: usize = HEADER_LEN + STATUS_LEN;

/// Offset of the protocol control byte inside the header
pub const PCB_OFFSET: usize = 7;

/// Read-only view over a raw reader frame
///
/// Construction never fails. For frames shorter than [`MIN_FRAME_LEN`] the
/// views saturate: `header` and `status` hold what is there and `data` is
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    raw: Bytes,
}

impl ResponseFrame {
    /// Wrap a raw frame
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Self { raw: raw.into() }
    }

    /// Framing region, bytes `0..8`
    pub fn header(&self) -> &[u8] {
        &self.raw[..self.raw.len().min(HEADER_LEN)]
    }

    /// Response body, bytes `8..len-2`
    pub fn data(&self) -> &[u8] {
        if self.is_well_formed() {
            &self.raw[HEADER_LEN..self.raw.len() - STATUS_LEN]
        } else {
            &[]
        }
    }

    /// Response body as a cheap clone of the underlying buffer
    pub fn data_bytes(&self) -> Bytes {
        if self.is_well_formed() {
            self.raw.slice(HEADER_LEN..self.raw.len() - STATUS_LEN)
        } else {
            Bytes::new()
        }
    }

    /// Status word, the last two bytes
    pub fn status(&self) -> &[u8] {
        &self.raw[self.raw.len().saturating_sub(STATUS_LEN)..]
    }

    /// SW1 and SW2, if the frame is well formed
    pub fn status_bytes(&self) -> Option<(u8, u8)> {
        match self.status() {
            [sw1, sw2] if self.is_well_formed() => Some((*sw1, *sw2)),
            _ => None,
        }
    }

    /// Protocol control byte of the tag's answer
    pub fn pcb(&self) -> Option<u8> {
        self.raw.get(PCB_OFFSET).copied()
    }

    /// The whole frame
    pub const fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Consume the view and return the frame
    pub fn into_raw(self) -> Bytes {
        self.raw
    }

    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Whether the frame is empty
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Whether the frame is long enough to carry a header and a status word
    pub fn is_well_formed(&self) -> bool {
        self.raw.len() >= MIN_FRAME_LEN
    }
}

impl From<Bytes> for ResponseFrame {
    fn from(raw: Bytes) -> Self {
        Self::new(raw)
    }
}

impl From<ResponseFrame> for Bytes {
    fn from(frame: ResponseFrame) -> Self {
        frame.raw
    }
}
