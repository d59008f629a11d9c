//! Status word definitions for card responses

use std::fmt;

use mynumber_nfc_typeb::ResponseFrame;
use tracing::Level;

/// Status Word (SW1-SW2) closing every card response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte (SW1)
    pub sw1: u8,
    /// Second status byte (SW2)
    pub sw2: u8,
}

impl StatusWord {
    /// Create a new status word
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Create from a u16 value (SW1 | SW2)
    pub const fn from_u16(status: u16) -> Self {
        Self {
            sw1: (status >> 8) as u8,
            sw2: status as u8,
        }
    }

    /// Convert to a u16 value (SW1 | SW2)
    pub const fn to_u16(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Read the status word closing a response frame
    pub fn from_frame(frame: &ResponseFrame) -> Self {
        let (sw1, sw2) = frame.status_bytes().unwrap_or_default();
        Self::new(sw1, sw2)
    }

    /// Check if this status word indicates success (90 00)
    pub const fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Check if the referenced PIN is blocked (69 84)
    pub const fn is_pin_locked(&self) -> bool {
        self.sw1 == 0x69 && self.sw2 == 0x84
    }

    /// Get the appropriate tracing level for this status word
    pub const fn tracing_level(&self) -> Level {
        if self.is_success() {
            Level::DEBUG
        } else if self.sw1 == 0x62 || self.sw1 == 0x63 {
            Level::INFO
        } else {
            Level::WARN
        }
    }

    /// Get a description of this status word
    pub const fn description(&self) -> &'static str {
        match (self.sw1, self.sw2) {
            (0x90, 0x00) => "Success",
            (0x62, 0x81) => "Part of returned data may be corrupted",
            (0x62, 0x82) => "End of file reached before reading Le bytes",
            (0x63, n) if (n & 0xF0) == 0xC0 => "Verification failed, counter value",
            (0x63, 0x00) => "Verification failed",
            (0x65, 0x81) => "Memory failure",
            (0x67, 0x00) => "Wrong length",
            (0x69, 0x81) => "Command incompatible with file structure",
            (0x69, 0x82) => "Security status not satisfied",
            (0x69, 0x84) => "Referenced data invalidated (PIN blocked)",
            (0x69, 0x85) => "Conditions of use not satisfied",
            (0x69, 0x86) => "Command not allowed",
            (0x6A, 0x81) => "Function not supported",
            (0x6A, 0x82) => "File not found",
            (0x6A, 0x86) => "Incorrect parameters P1-P2",
            (0x6A, 0x88) => "Referenced data not found",
            (0x6B, 0x00) => "Wrong parameters P1-P2",
            (0x6D, 0x00) => "Instruction code not supported or invalid",
            (0x6E, 0x00) => "Class not supported",
            _ => "Unknown status word",
        }
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from(tuple: (u8, u8)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

impl From<u16> for StatusWord {
    fn from(status: u16) -> Self {
        Self::from_u16(status)
    }
}

impl From<StatusWord> for u16 {
    fn from(status: StatusWord) -> Self {
        status.to_u16()
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.sw1, self.sw2)
    }
}

/// Status words the card uses
pub mod common {
    use super::StatusWord;

    /// Success (90 00)
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);

    /// PIN blocked (69 84)
    pub const PIN_LOCKED: StatusWord = StatusWord::new(0x69, 0x84);

    /// Security condition not satisfied (69 82)
    pub const SECURITY_CONDITION_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x82);

    /// File not found (6A 82)
    pub const FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hex_literal::hex;

    #[test]
    fn test_status_word_from_to_u16() {
        let sw = StatusWord::from_u16(0x69C3);
        assert_eq!(sw.sw1, 0x69);
        assert_eq!(sw.sw2, 0xC3);
        assert_eq!(sw.to_u16(), 0x69C3);
    }

    #[test]
    fn test_status_word_predicates() {
        assert!(common::SUCCESS.is_success());
        assert!(common::PIN_LOCKED.is_pin_locked());
        assert_eq!(common::SUCCESS.tracing_level(), Level::DEBUG);
        assert_eq!(StatusWord::new(0x63, 0xC2).tracing_level(), Level::INFO);
        assert_eq!(common::FILE_NOT_FOUND.tracing_level(), Level::WARN);
        assert_eq!(StatusWord::new(0x6A, 0x82).description(), "File not found");
        assert_eq!(StatusWord::new(0x69, 0x84).to_string(), "69 84");
    }

    #[test]
    fn test_status_word_from_frame() {
        let frame = ResponseFrame::new(Bytes::from_static(&hex!("0000000000000002 0102 6982")));
        assert_eq!(
            StatusWord::from_frame(&frame),
            common::SECURITY_CONDITION_NOT_SATISFIED
        );
    }
}
