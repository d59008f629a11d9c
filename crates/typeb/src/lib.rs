//! NFC Type B block transport
//!
//! This crate drives an ISO/IEC 14443 Type B tag through any contactless
//! reader exposing the [`RfDriver`] primitives:
//!
//! - tag discovery (SENSE_B) and activation (ATTRIB)
//! - I-block exchange with block number (PNI) tracking
//! - reassembly of an answer chained over one continuation block
//!
//! ```no_run
//! # fn run<D: mynumber_nfc_typeb::RfDriver>(driver: D) -> mynumber_nfc_typeb::Result<()> {
//! use mynumber_nfc_typeb::TypeBTag;
//!
//! let mut tag = TypeBTag::new(driver);
//! tag.connect_to_card()?;
//! let response = tag.send_command(&[0x00, 0xA4, 0x04, 0x0C])?;
//! println!("status: {}", hex::encode(response.status()));
//! tag.disconnect()?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod driver;
mod error;
mod frame;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod tag;

pub use config::{
    CancelToken, DEFAULT_CONTROL_TIMEOUT, DEFAULT_PROTOCOL_PARAMS, DEFAULT_RF_PARAMS,
    DiscoveryPolicy, TypeBConfig,
};
pub use driver::RfDriver;
pub use error::{TransportError, TypeBError};
pub use frame::{HEADER_LEN, MIN_FRAME_LEN, PCB_OFFSET, ResponseFrame, STATUS_LEN};
pub use tag::{
    ACK_MASK, ATTRIB, ATTRIB_PARAMS, CHAINING_MASK, I_BLOCK, Pni, R_ACK, SENSE_B, TagId, TypeBTag,
};

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TypeBError>;
