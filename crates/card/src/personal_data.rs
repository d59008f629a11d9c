//! Decoder for the personal data EF of the card info application
//!
//! The file is a fixed sequence of TLV records: an outer header, an inner
//! header, then name, address, birthday and sex. Each record starts with a
//! two-byte tag and a one-byte length.

use std::fmt;

use chrono::NaiveDate;

/// Bytes of the outer header skipped before the first record
const OUTER_HEADER_LEN: usize = 3;

/// Tag and length bytes in front of every record value
const RECORD_HEADER_LEN: usize = 3;

/// Sex as printed on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    /// Code `1`
    Male,
    /// Code `2`
    Female,
    /// Code `9`
    NotApplicable,
    /// Any other code
    Unknown,
}

impl Sex {
    /// Interpret the ASCII code stored on the card
    pub const fn from_code(code: u8) -> Self {
        match code {
            b'1' => Self::Male,
            b'2' => Self::Female,
            b'9' => Self::NotApplicable,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Male => "男性",
            Self::Female => "女性",
            Self::NotApplicable => "適用不能",
            Self::Unknown => "不明",
        })
    }
}

/// Identity fields read from the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalData {
    /// Full name
    pub name: String,
    /// Registered address
    pub address: String,
    /// Date of birth, `None` when the stored text is not a valid date
    ///
    /// Calendar dates that do not exist, such as `19990230`, give `None`
    /// rather than rolling over into the following month.
    pub birthday: Option<NaiveDate>,
    /// Sex
    pub sex: Sex,
}

impl PersonalData {
    /// Decode the content of the personal data EF
    ///
    /// Never fails: records cut short by the end of the buffer come out
    /// empty.
    pub fn decode(raw: &[u8]) -> Self {
        let mut records = Records::new(raw);
        records.skip(OUTER_HEADER_LEN);
        records.next_value();

        let name = text(records.next_value());
        let address = text(records.next_value());
        let birthday = parse_birthday(records.next_value());
        let sex = Sex::from_code(records.byte_at(RECORD_HEADER_LEN));

        Self {
            name,
            address,
            birthday,
            sex,
        }
    }
}

#[derive(Debug)]
struct Records<'a> {
    rest: &'a [u8],
}

impl<'a> Records<'a> {
    const fn new(raw: &'a [u8]) -> Self {
        Self { rest: raw }
    }

    fn skip(&mut self, n: usize) {
        self.rest = self.rest.get(n..).unwrap_or_default();
    }

    fn byte_at(&self, index: usize) -> u8 {
        self.rest.get(index).copied().unwrap_or_default()
    }

    /// Value of the record at the cursor, then move past it
    fn next_value(&mut self) -> &'a [u8] {
        let len = usize::from(self.byte_at(2));
        let rest = self.rest;
        let value = rest
            .get(RECORD_HEADER_LEN..)
            .map(|tail| &tail[..len.min(tail.len())])
            .unwrap_or_default();
        self.skip(RECORD_HEADER_LEN + len);
        value
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// `YYYYMMDD`
fn parse_birthday(bytes: &[u8]) -> Option<NaiveDate> {
    let digits = std::str::from_utf8(bytes).ok()?;
    let year = digits.get(0..4)?.parse().ok()?;
    let month = digits.get(4..6)?.parse().ok()?;
    let day = digits.get(6..8)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
