//! DigestInfo packets for the card's RSA signing key

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use digest::Digest;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::error::Error;

/// CLA INS P1 P2 of COMPUTE DIGITAL SIGNATURE
const SIGNING_HEADER: [u8; 4] = [0x80, 0x2A, 0x00, 0x80];

/// DER prefix of a SHA-1 DigestInfo
pub const SHA1_DIGEST_INFO: [u8; 15] = [
    0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14,
];

/// DER prefix of a SHA-256 DigestInfo
pub const SHA256_DIGEST_INFO: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

/// DER prefix of a SHA-384 DigestInfo
pub const SHA384_DIGEST_INFO: [u8; 19] = [
    0x30, 0x41, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x02, 0x05,
    0x00, 0x04, 0x30,
];

/// DER prefix of a SHA-512 DigestInfo
pub const SHA512_DIGEST_INFO: [u8; 19] = [
    0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03, 0x05,
    0x00, 0x04, 0x40,
];

/// Hash algorithms the signing key accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-1
    Sha1,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Every supported algorithm
    pub const ALL: [Self; 4] = [Self::Sha1, Self::Sha256, Self::Sha384, Self::Sha512];

    /// DER prefix placed before the digest
    pub const fn digest_info_header(self) -> &'static [u8] {
        match self {
            Self::Sha1 => &SHA1_DIGEST_INFO,
            Self::Sha256 => &SHA256_DIGEST_INFO,
            Self::Sha384 => &SHA384_DIGEST_INFO,
            Self::Sha512 => &SHA512_DIGEST_INFO,
        }
    }

    /// Digest size in bytes
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Canonical name, e.g. `SHA-256`
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Hash a message
    pub fn digest(self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(message).to_vec(),
            Self::Sha256 => Sha256::digest(message).to_vec(),
            Self::Sha384 => Sha384::digest(message).to_vec(),
            Self::Sha512 => Sha512::digest(message).to_vec(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| {
                alg.name().eq_ignore_ascii_case(s)
                    || alg.name().replace('-', "").eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| Error::UnsupportedHashAlgorithm(s.to_string()))
    }
}

/// DigestInfo header followed by the digest of `message`
pub fn digest_info(algorithm: HashAlgorithm, message: &[u8]) -> Bytes {
    let header = algorithm.digest_info_header();
    let mut buf = BytesMut::with_capacity(header.len() + algorithm.digest_len());
    buf.put_slice(header);
    buf.put_slice(&algorithm.digest(message));
    buf.freeze()
}

/// Full signing APDU: `80 2A 00 80 L DigestInfo 00`
///
/// The longest DigestInfo (SHA-512) is 83 bytes, so `L` always fits one byte.
pub fn signing_apdu(algorithm: HashAlgorithm, message: &[u8]) -> Bytes {
    let info = digest_info(algorithm, message);
    let mut buf = BytesMut::with_capacity(SIGNING_HEADER.len() + 2 + info.len());
    buf.put_slice(&SIGNING_HEADER);
    buf.put_u8(info.len() as u8);
    buf.put_slice(&info);
    buf.put_u8(0x00);
    buf.freeze()
}
