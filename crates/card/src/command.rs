//! Command APDUs understood by the card
//!
//! Only short APDUs are produced: `Lc` and `Le` are one byte each, so command
//! data is limited to 255 bytes.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Largest command body a short APDU can carry
pub const MAX_DATA_LEN: usize = 0xFF;

/// Generic short APDU command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional), `0x00` asks for up to 256 bytes
    pub le: Option<u8>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Set command data
    ///
    /// Bodies longer than [`MAX_DATA_LEN`] are rejected by [`Command::to_bytes`].
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set expected response length
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Command data, empty if none
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        4 + self.data.as_ref().map_or(0, |data| 1 + data.len()) + usize::from(self.le.is_some())
    }

    /// Convert to raw APDU bytes
    ///
    /// Fails when the body does not fit a one-byte `Lc`.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buffer = BytesMut::with_capacity(self.command_length());

        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if let Some(data) = &self.data {
            let lc = u8::try_from(data.len())
                .map_err(|_| Error::CommandTooLong { len: data.len() })?;
            buffer.put_u8(lc);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        Ok(buffer.freeze())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CLA={:02X} INS={:02X} P1={:02X} P2={:02X}",
            self.cla, self.ins, self.p1, self.p2
        )?;
        if let Some(data) = &self.data {
            write!(f, " Lc={:02X}", data.len())?;
        }
        if let Some(le) = self.le {
            write!(f, " Le={le:02X}")?;
        }
        Ok(())
    }
}

/// Builders for the card's command subset
pub mod commands {
    use bytes::Bytes;

    use super::Command;
    use crate::constants::{AID_LEN, FID_LEN};

    /// SELECT by DF name: `00 A4 04 0C 0A aid`
    pub fn select_df(aid: &[u8; AID_LEN]) -> Command {
        Command::new(0x00, 0xA4, 0x04, 0x0C).with_data(Bytes::copy_from_slice(aid))
    }

    /// SELECT EF under the current DF: `00 A4 02 0C 02 fid`
    pub fn select_ef(fid: &[u8; FID_LEN]) -> Command {
        Command::new(0x00, 0xA4, 0x02, 0x0C).with_data(Bytes::copy_from_slice(fid))
    }

    /// VERIFY against the currently selected PIN EF: `00 20 00 80 Lc pin`
    ///
    /// The PIN must already be validated as short ASCII.
    pub fn verify_pin(pin: &str) -> Command {
        Command::new(0x00, 0x20, 0x00, 0x80).with_data(Bytes::copy_from_slice(pin.as_bytes()))
    }

    /// READ BINARY of the current EF: `00 B0 hi lo le`
    pub const fn read_binary(offset: u16, le: u8) -> Command {
        let [hi, lo] = offset.to_be_bytes();
        Command::new(0x00, 0xB0, hi, lo).with_le(le)
    }

    /// COMPUTE DIGITAL SIGNATURE over a DigestInfo: `80 2A 00 80 Lc digest_info 00`
    pub fn compute_digital_signature(digest_info: impl Into<Bytes>) -> Command {
        Command::new(0x80, 0x2A, 0x00, 0x80)
            .with_data(digest_info)
            .with_le(0x00)
    }
}

#[cfg(test)]
mod tests {
    use super::commands::*;
    use super::*;
    use crate::constants::{CARD_INFO_AP, ef};
    use hex_literal::hex;

    #[test]
    fn test_select_df() {
        let cmd = select_df(&CARD_INFO_AP);
        assert_eq!(cmd.to_bytes().unwrap().as_ref(), &hex!("00A4040C0A D3921000310001010408"));
    }

    #[test]
    fn test_select_ef() {
        let cmd = select_ef(&ef::PERSONAL_DATA);
        assert_eq!(cmd.to_bytes().unwrap().as_ref(), &hex!("00A4020C02 0002"));
        assert_eq!(cmd.command_length(), 7);
    }

    #[test]
    fn test_verify_pin() {
        let cmd = verify_pin("1234");
        assert_eq!(cmd.to_bytes().unwrap().as_ref(), &hex!("0020008004 31323334"));
        assert_eq!(cmd.data(), b"1234");
    }

    #[test]
    fn test_read_binary() {
        assert_eq!(read_binary(0, 0x07).to_bytes().unwrap().as_ref(), &hex!("00B0000007"));
        assert_eq!(read_binary(0x0100, 0x2C).to_bytes().unwrap().as_ref(), &hex!("00B001002C"));
    }

    #[test]
    fn test_compute_digital_signature() {
        let cmd = compute_digital_signature(Bytes::from_static(&[0xAA, 0xBB]));
        assert_eq!(cmd.to_bytes().unwrap().as_ref(), &hex!("802A008002AABB00"));
        assert_eq!(cmd.to_string(), "CLA=80 INS=2A P1=00 P2=80 Lc=02 Le=00");
    }

    #[test]
    fn test_body_length_limit() {
        let full = Command::new(0x00, 0xD6, 0x00, 0x00).with_data(vec![0xAB; MAX_DATA_LEN]);
        let bytes = full.to_bytes().unwrap();
        assert_eq!(bytes[4], 0xFF);
        assert_eq!(bytes.len(), 5 + MAX_DATA_LEN);

        let oversized = Command::new(0x00, 0xD6, 0x00, 0x00).with_data(vec![0xAB; 300]);
        assert!(matches!(oversized.to_bytes(), Err(Error::CommandTooLong { len: 300 })));
    }
}
