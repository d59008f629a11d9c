//! PIN validation and VERIFY outcomes

use std::fmt;

use crate::constants::{FID_LEN, ef};
use crate::error::{Error, Result};
use crate::personal_data::PersonalData;
use crate::status::StatusWord;

/// Longest PIN a short VERIFY APDU can carry
pub const MAX_PIN_LEN: usize = 0xFF;

/// Retry counter encoded in a failed VERIFY's SW2 (`63 CX`)
///
/// Applied to any other status this wraps, as the card only answers `63 CX`
/// to a wrong PIN.
pub const fn retries_remaining(sw2: u8) -> u8 {
    sw2.wrapping_sub(0xC0)
}

/// Outcome of a VERIFY command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinVerification {
    /// PIN accepted (`90 00`)
    Success,
    /// PIN blocked (`69 84`)
    Locked,
    /// PIN rejected
    Failed {
        /// Attempts left before the PIN locks
        retries_remaining: u8,
    },
}

impl PinVerification {
    /// Classify the status word answering a VERIFY
    pub const fn from_status(status: StatusWord) -> Self {
        if status.is_success() {
            Self::Success
        } else if status.is_pin_locked() {
            Self::Locked
        } else {
            Self::Failed {
                retries_remaining: retries_remaining(status.sw2),
            }
        }
    }

    /// Check if the PIN was accepted
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Turn anything but success into [`Error::PinRejected`]
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            rejected => Err(Error::PinRejected(rejected)),
        }
    }
}

impl fmt::Display for PinVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("PIN verified"),
            Self::Locked => f.write_str("PIN locked"),
            Self::Failed { retries_remaining } => {
                write!(f, "wrong PIN, {retries_remaining} retries remaining")
            }
        }
    }
}

/// Result of reading the personal data EF
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonalDataResult {
    /// PIN accepted and the file decoded
    Success(PersonalData),
    /// PIN blocked
    Locked,
    /// PIN rejected
    Failed {
        /// Attempts left before the PIN locks
        retries_remaining: u8,
    },
}

impl PersonalDataResult {
    /// Decoded data, if the PIN was accepted
    pub const fn personal_data(&self) -> Option<&PersonalData> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }
}

/// Which PIN of the card info application a string is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    /// 4-digit card info PIN
    CardInfoPin,
    /// 14-character verification number B
    VerificationNumberB,
}

impl PinKind {
    /// Pick the PIN kind from the length of `pin`
    pub fn classify(pin: &str) -> Result<Self> {
        validate_pin(pin)?;
        match pin.len() {
            4 if pin.bytes().all(|b| b.is_ascii_digit()) => Ok(Self::CardInfoPin),
            4 => Err(Error::InvalidPin("card info PIN must be 4 digits")),
            14 => Ok(Self::VerificationNumberB),
            _ => Err(Error::InvalidPin(
                "expected a 4-digit PIN or a 14-character verification number",
            )),
        }
    }

    /// EF holding this PIN
    pub const fn pin_file(self) -> [u8; FID_LEN] {
        match self {
            Self::CardInfoPin => ef::CARD_INFO_PIN,
            Self::VerificationNumberB => ef::VERIFICATION_NUMBER_B,
        }
    }
}

/// Check a PIN fits in a VERIFY APDU
pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.is_empty() {
        return Err(Error::InvalidPin("PIN is empty"));
    }
    if !pin.is_ascii() {
        return Err(Error::InvalidPin("PIN must be ASCII"));
    }
    if pin.len() > MAX_PIN_LEN {
        return Err(Error::InvalidPin("PIN is too long"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_verification_from_status() {
        assert_eq!(
            PinVerification::from_status(StatusWord::new(0x90, 0x00)),
            PinVerification::Success
        );
        assert_eq!(
            PinVerification::from_status(StatusWord::new(0x69, 0x84)),
            PinVerification::Locked
        );
        assert_eq!(
            PinVerification::from_status(StatusWord::new(0x63, 0xC3)),
            PinVerification::Failed { retries_remaining: 3 }
        );
        assert_eq!(retries_remaining(0xC0), 0);
    }

    #[test]
    fn test_into_result() {
        assert!(PinVerification::Success.into_result().is_ok());
        assert!(matches!(
            PinVerification::Locked.into_result(),
            Err(Error::PinRejected(PinVerification::Locked))
        ));
    }

    #[test]
    fn test_classify() {
        assert_eq!(PinKind::classify("1234").unwrap(), PinKind::CardInfoPin);
        assert_eq!(PinKind::classify("80010120301234").unwrap(), PinKind::VerificationNumberB);
        assert_eq!(PinKind::CardInfoPin.pin_file(), [0x00, 0x11]);
        assert_eq!(PinKind::VerificationNumberB.pin_file(), [0x00, 0x14]);

        assert!(matches!(PinKind::classify("12a4"), Err(Error::InvalidPin(_))));
        assert!(matches!(PinKind::classify("12345"), Err(Error::InvalidPin(_))));
        assert!(matches!(PinKind::classify(""), Err(Error::InvalidPin(_))));
    }

    #[test]
    fn test_validate_pin() {
        assert!(validate_pin("abc123").is_ok());
        assert!(validate_pin("１２３４").is_err());
        assert!(validate_pin(&"1".repeat(256)).is_err());
    }
}
