//! MyNumber card application
//!
//! Every public operation is one complete session: the tag is discovered and
//! activated, the command sequence runs, and the reader is released again
//! whatever the outcome.

use bytes::{Bytes, BytesMut};
use mynumber_nfc_typeb::{CancelToken, RfDriver, TransportError, TypeBTag};
use tracing::{Level, debug, info, instrument, warn};

use crate::asn1::HeaderInfo;
use crate::command::{Command, commands};
use crate::constants::{
    AID_LEN, CARD_INFO_AP, CERT_AP, FID_LEN, HEADER_READ_LEN, MY_NUMBER_DIGITS,
    MY_NUMBER_FILE_LEN, ef,
};
use crate::hash::{HashAlgorithm, signing_apdu};
use crate::personal_data::PersonalData;
use crate::pin::{PersonalDataResult, PinKind, PinVerification, validate_pin};
use crate::status::StatusWord;
use crate::{Error, Result};

/// Largest file READ BINARY can reach with a 15-bit offset
pub const MAX_FILE_SIZE: usize = 0x8000;

/// Answer to one command: body and status word
#[derive(Debug, Clone, PartialEq, Eq)]
struct CardResponse {
    data: Bytes,
    status: StatusWord,
}

/// MyNumber card reached through a Type B transport
#[derive(Debug)]
pub struct MyNumberCard<D: RfDriver> {
    tag: TypeBTag<D>,
}

impl<D: RfDriver> MyNumberCard<D> {
    /// Wrap a transport
    pub const fn new(tag: TypeBTag<D>) -> Self {
        Self { tag }
    }

    /// Open a driver and wrap it with the default transport configuration
    pub fn connect<F, E>(open: F) -> Result<Self>
    where
        F: FnOnce() -> std::result::Result<D, E>,
        E: Into<TransportError>,
    {
        Ok(Self::new(TypeBTag::connect(open)?))
    }

    /// Get a reference to the transport
    pub const fn transport(&self) -> &TypeBTag<D> {
        &self.tag
    }

    /// Get a mutable reference to the transport
    pub const fn transport_mut(&mut self) -> &mut TypeBTag<D> {
        &mut self.tag
    }

    /// Take ownership of the transport
    pub fn into_transport(self) -> TypeBTag<D> {
        self.tag
    }

    /// Token that aborts the wait for a card
    pub fn cancel_token(&self) -> CancelToken {
        self.tag.cancel_token()
    }

    /// Read the 12-digit individual number
    #[instrument(level = "debug", skip_all)]
    pub fn read_personal_number(&mut self, pin: &str) -> Result<String> {
        validate_pin(pin)?;
        self.with_session(|card| {
            card.select_df(&CARD_INFO_AP)?;
            card.select_ef(&ef::CARD_INFO_PIN)?;
            card.verify_pin(pin)?.into_result()?;
            card.select_ef(&ef::MY_NUMBER)?;

            let raw = card.read_binary(MY_NUMBER_FILE_LEN)?;
            let digits = raw.get(MY_NUMBER_DIGITS).unwrap_or_default();
            Ok(digits.iter().copied().map(char::from).collect())
        })
    }

    /// Read name, address, birthday and sex
    ///
    /// Accepts either the 4-digit card info PIN or the 14-character
    /// verification number B. A rejected or blocked PIN is reported in the
    /// result rather than as an error.
    #[instrument(level = "debug", skip_all)]
    pub fn read_personal_data(&mut self, pin: &str) -> Result<PersonalDataResult> {
        let kind = PinKind::classify(pin)?;
        self.with_session(|card| {
            card.select_df(&CARD_INFO_AP)?;
            card.select_ef(&kind.pin_file())?;
            match card.verify_pin(pin)? {
                PinVerification::Success => {}
                PinVerification::Locked => return Ok(PersonalDataResult::Locked),
                PinVerification::Failed { retries_remaining } => {
                    return Ok(PersonalDataResult::Failed { retries_remaining });
                }
            }

            card.select_ef(&ef::PERSONAL_DATA)?;
            let size = card.read_file_size()?;
            let raw = card.read_binary(size)?;
            Ok(PersonalDataResult::Success(PersonalData::decode(&raw)))
        })
    }

    /// Read the public key of the signing key pair
    #[instrument(level = "debug", skip_all)]
    pub fn get_public_key(&mut self) -> Result<Bytes> {
        self.with_session(|card| {
            card.select_df(&CERT_AP)?;
            card.select_ef(&ef::PUBLIC_KEY)?;
            let size = card.read_file_size()?;
            card.read_binary(size)
        })
    }

    /// Sign `message` with the card's private key
    ///
    /// The message is hashed on the host and the card signs the DigestInfo.
    #[instrument(level = "debug", skip_all, fields(algorithm = %algorithm))]
    pub fn sign_with_private_key(
        &mut self,
        algorithm: HashAlgorithm,
        pin: &str,
        message: &[u8],
    ) -> Result<Bytes> {
        validate_pin(pin)?;
        self.with_session(|card| {
            card.select_df(&CERT_AP)?;
            card.select_ef(&ef::SIGNATURE_PIN)?;
            card.verify_pin(pin)?.into_result()?;
            card.select_ef(&ef::PRIVATE_KEY)?;

            let response = card.transmit_raw(&signing_apdu(algorithm, message))?;
            if !response.status.is_success() {
                return Err(Error::Status {
                    status: response.status,
                });
            }
            debug!(len = response.data.len(), "Signature received");
            Ok(response.data)
        })
    }

    fn transmit(&mut self, command: &Command) -> Result<CardResponse> {
        debug!(command = %command, "Sending command");
        self.transmit_raw(&command.to_bytes()?)
    }

    fn transmit_raw(&mut self, apdu: &[u8]) -> Result<CardResponse> {
        let frame = self.tag.send_command(apdu)?;
        let status = StatusWord::from_frame(&frame);
        let description = status.description();
        let level = status.tracing_level();
        if level == Level::DEBUG {
            debug!(status = %status, description, "Card answered");
        } else if level == Level::INFO {
            info!(status = %status, description, "Card answered with warning");
        } else {
            warn!(status = %status, description, "Card returned error status");
        }
        Ok(CardResponse {
            data: frame.data_bytes(),
            status,
        })
    }

    /// Activate the card, run `op` and always release the reader
    fn with_session<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = self
            .tag
            .connect_to_card()
            .map_err(Error::from)
            .and_then(|()| op(self));
        let disconnected = self.tag.disconnect().map_err(Error::from);

        match (result, disconnected) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(disconnect_err)) => {
                warn!(error = %disconnect_err, "Failed to release reader after error");
                Err(err)
            }
        }
    }

    fn select_df(&mut self, aid: &[u8; AID_LEN]) -> Result<()> {
        debug!(aid = %hex::encode(aid), "Selecting DF");
        self.expect_success(&commands::select_df(aid))
    }

    fn select_ef(&mut self, fid: &[u8; FID_LEN]) -> Result<()> {
        debug!(fid = %hex::encode(fid), "Selecting EF");
        self.expect_success(&commands::select_ef(fid))
    }

    fn verify_pin(&mut self, pin: &str) -> Result<PinVerification> {
        debug!("Verifying PIN");
        let frame = self.tag.send_command(&commands::verify_pin(pin).to_bytes()?)?;
        let outcome = PinVerification::from_status(StatusWord::from_frame(&frame));
        if !outcome.is_success() {
            warn!(outcome = %outcome, "PIN not accepted");
        }
        Ok(outcome)
    }

    fn expect_success(&mut self, command: &Command) -> Result<()> {
        let response = self.transmit(command)?;
        if response.status.is_success() {
            Ok(())
        } else {
            Err(Error::Status {
                status: response.status,
            })
        }
    }

    /// Size of the current EF, from the header in its first bytes
    fn read_file_size(&mut self) -> Result<usize> {
        let head = self.transmit(&commands::read_binary(0, HEADER_READ_LEN))?;
        let header = HeaderInfo::parse(&head.data)?;
        debug!(
            offset_size = header.offset_size(),
            size = header.size(),
            "File header"
        );
        Ok(header.size())
    }

    /// Read `size` bytes of the current EF in chunks of at most 256 bytes
    fn read_binary(&mut self, size: usize) -> Result<Bytes> {
        if size > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge { size });
        }

        let mut buffer = BytesMut::with_capacity(size);
        while buffer.len() < size {
            let offset = buffer.len();
            let position = u16::try_from(offset).map_err(|_| Error::FileTooLarge { size })?;
            // Le = 0 asks for 256 bytes
            let le = u8::try_from(size - offset).unwrap_or(0x00);

            let response = self.transmit(&commands::read_binary(position, le))?;
            if response.data.is_empty() {
                return Err(Error::ReadBinary {
                    offset,
                    status: response.status,
                });
            }
            buffer.extend_from_slice(&response.data);
        }

        buffer.truncate(size);
        Ok(buffer.freeze())
    }
}
