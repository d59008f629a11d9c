//! Applications and elementary files on the card

/// Length of an application identifier
pub const AID_LEN: usize = 10;

/// Length of a file identifier
pub const FID_LEN: usize = 2;

/// Card info application (券面事項入力補助AP)
pub const CARD_INFO_AP: [u8; AID_LEN] =
    [0xD3, 0x92, 0x10, 0x00, 0x31, 0x00, 0x01, 0x01, 0x04, 0x08];

/// Public key infrastructure application (JPKI-AP)
pub const CERT_AP: [u8; AID_LEN] =
    [0xD3, 0x92, 0xF0, 0x00, 0x26, 0x01, 0x00, 0x00, 0x00, 0x01];

/// Elementary file identifiers
pub mod ef {
    use super::FID_LEN;

    /// Individual number (card info AP)
    pub const MY_NUMBER: [u8; FID_LEN] = [0x00, 0x01];

    /// Name, address, birthday and sex (card info AP)
    pub const PERSONAL_DATA: [u8; FID_LEN] = [0x00, 0x02];

    /// 4-digit card info PIN (card info AP)
    pub const CARD_INFO_PIN: [u8; FID_LEN] = [0x00, 0x11];

    /// 14-character verification number B (card info AP)
    pub const VERIFICATION_NUMBER_B: [u8; FID_LEN] = [0x00, 0x14];

    /// PIN protecting the private key (JPKI-AP)
    pub const SIGNATURE_PIN: [u8; FID_LEN] = [0x00, 0x18];

    /// Public key (JPKI-AP)
    pub const PUBLIC_KEY: [u8; FID_LEN] = [0x00, 0x0A];

    /// Private key (JPKI-AP)
    pub const PRIVATE_KEY: [u8; FID_LEN] = [0x00, 0x17];
}

/// Bytes read from the individual number EF
pub const MY_NUMBER_FILE_LEN: usize = 16;

/// The 12 digits inside the individual number EF
pub const MY_NUMBER_DIGITS: std::ops::Range<usize> = 3..15;

/// Bytes read to learn the size of a TLV-wrapped EF
pub const HEADER_READ_LEN: u8 = 7;
