//! Tag and length header of a TLV-wrapped file
//!
//! Only the header is decoded, so that the total size of an EF can be learnt
//! from its first few bytes before reading the rest.

/// Errors from [`HeaderInfo::parse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    /// Not enough bytes for a tag and a length
    #[error("Binary too short to hold a tag and a length")]
    BinaryTooShort,

    /// Tag number spanning more than two bytes
    #[error("Tag numbers longer than two bytes are not supported")]
    UnsupportedTagForm,

    /// Long form length runs past the end of the buffer
    #[error("Length field truncated")]
    TruncatedLengthField,

    /// Long form length does not fit in `usize`
    #[error("Length field overflows")]
    LengthOverflow,
}

/// Decoded header: where the value starts and where it ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    offset_size: usize,
    length: usize,
}

impl HeaderInfo {
    /// Decode the tag and length at the start of `binary`
    pub fn parse(binary: &[u8]) -> Result<Self, HeaderError> {
        if binary.len() < 2 {
            return Err(HeaderError::BinaryTooShort);
        }

        let mut offset = 1;
        if binary[0] & 0x1F == 0x1F {
            if binary[1] & 0x80 != 0 {
                return Err(HeaderError::UnsupportedTagForm);
            }
            offset += 1;
        }

        let &first = binary.get(offset).ok_or(HeaderError::BinaryTooShort)?;
        offset += 1;

        let length = if first & 0x80 == 0 {
            usize::from(first)
        } else {
            let count = usize::from(first & 0x7F);
            let octets = binary
                .get(offset..offset + count)
                .ok_or(HeaderError::TruncatedLengthField)?;
            offset += count;
            octets.iter().try_fold(0usize, |acc, &octet| {
                acc.checked_mul(0x100)
                    .map(|acc| acc | usize::from(octet))
                    .ok_or(HeaderError::LengthOverflow)
            })?
        };

        Ok(Self {
            offset_size: offset,
            length,
        })
    }

    /// Bytes taken by the tag and the length
    pub const fn offset_size(&self) -> usize {
        self.offset_size
    }

    /// Length of the value
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Total size of header and value
    pub const fn size(&self) -> usize {
        self.offset_size.saturating_add(self.length)
    }
}
