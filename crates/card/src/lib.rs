//! Japanese MyNumber card over NFC Type B
//!
//! Reads the individual number and the personal data of the card info
//! application, and uses the public key infrastructure application to fetch
//! the public key and sign messages. The RF link is provided by
//! [`mynumber_nfc_typeb`].
//!
//! ```no_run
//! # fn run<D: mynumber_nfc_typeb::RfDriver>(driver: D) -> mynumber_card::Result<()> {
//! use mynumber_card::{MyNumberCard, PersonalDataResult};
//! use mynumber_nfc_typeb::TypeBTag;
//!
//! let mut card = MyNumberCard::new(TypeBTag::new(driver));
//! match card.read_personal_data("1234")? {
//!     PersonalDataResult::Success(data) => println!("{} ({})", data.name, data.sex),
//!     PersonalDataResult::Locked => println!("PIN locked"),
//!     PersonalDataResult::Failed { retries_remaining } => {
//!         println!("wrong PIN, {retries_remaining} retries left")
//!     }
//! }
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod application;
mod asn1;
mod command;
pub mod constants;
mod error;
mod hash;
mod personal_data;
mod pin;
mod status;

pub use application::{MAX_FILE_SIZE, MyNumberCard};
pub use asn1::{HeaderError, HeaderInfo};
pub use command::{Command, MAX_DATA_LEN, commands};
pub use error::{Error, Result};
pub use hash::{
    HashAlgorithm, SHA1_DIGEST_INFO, SHA256_DIGEST_INFO, SHA384_DIGEST_INFO, SHA512_DIGEST_INFO,
    digest_info, signing_apdu,
};
pub use personal_data::{PersonalData, Sex};
pub use pin::{
    MAX_PIN_LEN, PersonalDataResult, PinKind, PinVerification, retries_remaining, validate_pin,
};
pub use status::{StatusWord, common as status_words};
