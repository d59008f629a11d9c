//! Type B tag session
//!
//! Owns the RF driver together with the only state that survives between two
//! exchanges: the PUPI of the activated tag and the block number (PNI) bit.

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::config::{CancelToken, TypeBConfig};
use crate::driver::RfDriver;
use crate::error::{TransportError, TypeBError};
use crate::frame::ResponseFrame;

/// SENSB_REQ: APf, AFI = all families, PARAM = 16 slots
pub const SENSE_B: [u8; 3] = [0x05, 0x00, 0x10];

/// ATTRIB command byte
pub const ATTRIB: u8 = 0x1D;

/// ATTRIB parameters following the PUPI
pub const ATTRIB_PARAMS: [u8; 4] = [0x00, 0x08, 0x01, 0x00];

/// PCB of an I-block, block number in bit 0
pub const I_BLOCK: u8 = 0x02;

/// PCB of an R(ACK) block asking for the next chained block
pub const R_ACK: u8 = 0xA2;

/// Mask applied to an answer's PCB to recognise an acknowledged I-block
pub const ACK_MASK: u8 = 0b1110_1110;

/// Mask applied to an answer's PCB to detect chaining
pub const CHAINING_MASK: u8 = 0b0001_0100;

type Result<T> = std::result::Result<T, TypeBError>;

/// Pseudo-unique PICC identifier returned in ATQB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagId([u8; 4]);

impl TagId {
    /// Wrap raw PUPI bytes
    pub const fn new(pupi: [u8; 4]) -> Self {
        Self(pupi)
    }

    /// PUPI bytes
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Pick the PUPI out of a SENSE answer, bytes `8..12`
    pub fn from_sense_response(response: &[u8]) -> Option<Self> {
        response
            .get(8..12)
            .and_then(|pupi| <[u8; 4]>::try_from(pupi).ok())
            .map(Self)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// Block number bit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pni(bool);

impl Pni {
    /// Bit value, `0` or `1`
    pub const fn bit(self) -> u8 {
        self.0 as u8
    }

    const fn toggled(self) -> Self {
        Self(!self.0)
    }
}

/// Contactless session with one Type B tag
pub struct TypeBTag<D: RfDriver> {
    driver: D,
    config: TypeBConfig,
    tag_id: Option<TagId>,
    pni: Pni,
    cancel: CancelToken,
}

impl<D: RfDriver> fmt::Debug for TypeBTag<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeBTag")
            .field("driver", &self.driver)
            .field("tag_id", &self.tag_id)
            .field("pni", &self.pni.bit())
            .field("config", &self.config)
            .finish()
    }
}

fn driver_error<E: Into<TransportError>>(error: E) -> TypeBError {
    TypeBError::Transport(error.into())
}

impl<D: RfDriver> TypeBTag<D> {
    /// Wrap an opened driver with the default configuration
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, TypeBConfig::default())
    }

    /// Wrap an opened driver
    pub fn with_config(driver: D, config: TypeBConfig) -> Self {
        Self {
            driver,
            config,
            tag_id: None,
            pni: Pni::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Open a driver and wrap it
    pub fn connect<F, E>(open: F) -> Result<Self>
    where
        F: FnOnce() -> std::result::Result<D, E>,
        E: Into<TransportError>,
    {
        let driver = open().map_err(driver_error)?;
        debug!("RF driver opened");
        Ok(Self::new(driver))
    }

    /// Get a reference to the driver
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the driver
    pub const fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Take ownership of the driver
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Current configuration
    pub const fn config(&self) -> &TypeBConfig {
        &self.config
    }

    /// PUPI of the activated tag
    pub const fn tag_id(&self) -> Option<TagId> {
        self.tag_id
    }

    /// Current block number
    pub const fn pni(&self) -> Pni {
        self.pni
    }

    /// Token that aborts a running discovery when cancelled
    ///
    /// A cancellation aborts one discovery: the token is cleared when
    /// `connect_to_card` returns [`TypeBError::Cancelled`], so the next call
    /// searches again.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Initialise the reader, wait for a tag and activate it
    pub fn connect_to_card(&mut self) -> Result<()> {
        self.driver.init_device().map_err(driver_error)?;
        self.find_tag()?;
        self.send_attrib()
    }

    /// Send one APDU and return the (possibly reassembled) answer
    pub fn send_command(&mut self, apdu: &[u8]) -> Result<ResponseFrame> {
        self.prepare()?;
        let timeout = self.driver.timeout();
        self.exchange(apdu, timeout)
    }

    /// Exchange one I-block, following at most one chained continuation
    pub fn exchange(&mut self, apdu: &[u8], timeout: Duration) -> Result<ResponseFrame> {
        let mut block = BytesMut::with_capacity(apdu.len() + 1);
        block.put_u8(I_BLOCK | self.pni.bit());
        block.put_slice(apdu);

        let frame = self.transceive(&block, timeout)?;
        let pcb = frame.pcb().unwrap_or_default();

        if pcb & ACK_MASK == I_BLOCK {
            self.pni = self.pni.toggled();
        }

        if pcb & CHAINING_MASK == 0 {
            return Ok(frame);
        }

        debug!(pcb = format_args!("{:#04x}", pcb), "Answer chained, sending R(ACK)");
        self.prepare()?;
        let ack = [R_ACK | self.pni.bit()];
        let continuation = self.transceive(&ack, timeout)?;
        // the continuation block was received either way
        self.pni = self.pni.toggled();
        if continuation.pcb().unwrap_or_default() & CHAINING_MASK != 0 {
            return Err(TypeBError::UnsupportedChaining);
        }

        let extra = continuation.data().len() + continuation.status().len();
        let mut joined = BytesMut::with_capacity(frame.len() + extra);
        joined.put_slice(frame.raw());
        joined.put_slice(continuation.data());
        joined.put_slice(continuation.status());

        Ok(ResponseFrame::new(joined.freeze()))
    }

    /// Forget the activated tag so the next session rediscovers it
    pub fn reset_tag_id(&mut self) {
        self.tag_id = None;
    }

    /// Reset the block number to 0
    pub fn reset_sequence(&mut self) {
        self.pni = Pni::default();
    }

    /// Forget the tag and reset the block number
    pub fn reset(&mut self) {
        self.reset_tag_id();
        self.reset_sequence();
    }

    /// Release the reader and forget the tag
    pub fn disconnect(&mut self) -> Result<()> {
        debug!("Disconnecting RF driver");
        let result = self.driver.disconnect().map_err(driver_error);
        self.reset_tag_id();
        result
    }

    fn prepare(&mut self) -> Result<()> {
        self.driver
            .send_preparation_commands(&self.config.rf_params, &self.config.protocol_params)
            .map_err(driver_error)
    }

    fn transceive(&mut self, payload: &[u8], timeout: Duration) -> Result<ResponseFrame> {
        let raw: Bytes = self.driver.in_comm_rf(payload, timeout).map_err(driver_error)?;
        let frame = ResponseFrame::new(raw);
        if !frame.is_well_formed() {
            return Err(TypeBError::FrameTooShort { len: frame.len() });
        }
        Ok(frame)
    }

    fn find_tag(&mut self) -> Result<()> {
        debug!("Searching for a Type B tag");
        let policy = self.config.discovery;
        let started = Instant::now();
        let mut attempts = 0u32;

        while self.tag_id.is_none() {
            if self.cancel.is_cancelled() {
                self.cancel.reset();
                return Err(TypeBError::Cancelled);
            }
            if policy.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(TypeBError::TagNotFound { attempts });
            }
            if policy.deadline.is_some_and(|deadline| started.elapsed() >= deadline) {
                return Err(TypeBError::DiscoveryTimeout { attempts });
            }
            if attempts > 0 && !policy.backoff.is_zero() {
                thread::sleep(policy.backoff);
            }

            attempts += 1;
            self.prepare()?;
            let response = self
                .driver
                .in_comm_rf(&SENSE_B, self.config.control_timeout)
                .map_err(driver_error)?;
            self.tag_id = TagId::from_sense_response(&response);
            trace!(attempts, found = self.tag_id.is_some(), "SENSE_B");
        }

        Ok(())
    }

    fn send_attrib(&mut self) -> Result<()> {
        let Some(tag_id) = self.tag_id else {
            return Err(TypeBError::TagNotFound { attempts: 0 });
        };
        debug!(tag_id = %tag_id, "Sending ATTRIB");

        self.prepare()?;
        let mut attrib = BytesMut::with_capacity(1 + 4 + ATTRIB_PARAMS.len());
        attrib.put_u8(ATTRIB);
        attrib.put_slice(tag_id.as_bytes());
        attrib.put_slice(&ATTRIB_PARAMS);
        self.driver
            .in_comm_rf(&attrib, self.config.control_timeout)
            .map_err(driver_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryPolicy;
    use crate::mock::{DriverCall, MockDriver, frame, no_tag_response, ok_frame, sense_response};
    use hex_literal::hex;

    fn quick_config(max_attempts: u32) -> TypeBConfig {
        TypeBConfig::default().with_discovery(
            DiscoveryPolicy::default()
                .with_max_attempts(Some(max_attempts))
                .with_backoff(Duration::ZERO),
        )
    }

    #[test]
    fn test_connect_to_card_discovers_and_activates() {
        let mut driver = MockDriver::new();
        driver
            .push_response(no_tag_response())
            .push_response(no_tag_response())
            .push_response(sense_response([0x11, 0x22, 0x33, 0x44]))
            .push_response(frame(0x00, &[], [0x90, 0x00]));
        let mut tag = TypeBTag::with_config(driver, quick_config(10));

        tag.connect_to_card().unwrap();

        assert_eq!(tag.tag_id(), Some(TagId::new([0x11, 0x22, 0x33, 0x44])));
        let sent = tag.driver().sent_payloads();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].as_ref(), &SENSE_B);
        assert_eq!(sent[2].as_ref(), &SENSE_B);
        assert_eq!(sent[3].as_ref(), &hex!("1D 11223344 00080100"));

        let calls = &tag.driver().calls;
        assert_eq!(calls[0], DriverCall::InitDevice);
        // every RF exchange is preceded by the preparation commands
        let prepares = tag
            .driver()
            .count_calls(|call| matches!(call, DriverCall::Prepare { .. }));
        assert_eq!(prepares, 4);
        assert!(matches!(
            &calls[2],
            DriverCall::InCommRf { timeout, .. } if *timeout == Duration::from_millis(30)
        ));
    }

    #[test]
    fn test_discovery_is_bounded() {
        let driver = MockDriver::with_responses((0..3).map(|_| no_tag_response()));
        let mut tag = TypeBTag::with_config(driver, quick_config(3));

        let err = tag.connect_to_card().unwrap_err();
        assert!(matches!(err, TypeBError::TagNotFound { attempts: 3 }));
        assert!(tag.tag_id().is_none());
    }

    #[test]
    fn test_discovery_can_be_cancelled() {
        let mut tag = TypeBTag::with_config(MockDriver::new(), quick_config(10));
        tag.cancel_token().cancel();

        let err = tag.connect_to_card().unwrap_err();
        assert!(matches!(err, TypeBError::Cancelled));
        assert!(tag.driver().sent_payloads().is_empty());
    }

    #[test]
    fn test_cancellation_applies_to_one_discovery() {
        let driver =
            MockDriver::with_responses([sense_response([0x01, 0x02, 0x03, 0x04]), ok_frame(&[])]);
        let mut tag = TypeBTag::with_config(driver, quick_config(10));
        let token = tag.cancel_token();
        token.cancel();

        assert!(matches!(tag.connect_to_card(), Err(TypeBError::Cancelled)));
        assert!(!token.is_cancelled());

        tag.connect_to_card().unwrap();
        assert_eq!(tag.tag_id(), Some(TagId::new([0x01, 0x02, 0x03, 0x04])));
    }

    #[test]
    fn test_discovery_deadline() {
        let config = TypeBConfig::default().with_discovery(
            DiscoveryPolicy::default()
                .with_max_attempts(Some(10))
                .with_deadline(Some(Duration::ZERO)),
        );
        let mut tag = TypeBTag::with_config(MockDriver::new(), config);

        let err = tag.connect_to_card().unwrap_err();
        assert!(matches!(err, TypeBError::DiscoveryTimeout { attempts: 0 }));
        assert!(tag.driver().sent_payloads().is_empty());
    }

    #[test]
    fn test_discovery_backs_off_between_attempts() {
        let backoff = Duration::from_millis(5);
        let driver = MockDriver::with_responses([
            no_tag_response(),
            no_tag_response(),
            sense_response([0x0A, 0x0B, 0x0C, 0x0D]),
            ok_frame(&[]),
        ]);
        let config = TypeBConfig::default().with_discovery(
            DiscoveryPolicy::default()
                .with_max_attempts(Some(5))
                .with_backoff(backoff),
        );
        let mut tag = TypeBTag::with_config(driver, config);

        let started = Instant::now();
        tag.connect_to_card().unwrap();

        // two pauses: before the second and the third SENSE
        assert!(started.elapsed() >= backoff * 2);
        assert_eq!(tag.driver().sent_payloads().len(), 4);
    }

    #[test]
    fn test_discovery_propagates_driver_errors() {
        let mut driver = MockDriver::new();
        driver.push_error(TransportError::Device);
        let mut tag = TypeBTag::with_config(driver, quick_config(10));

        let err = tag.connect_to_card().unwrap_err();
        assert!(matches!(err, TypeBError::Transport(TransportError::Device)));
    }

    #[test]
    fn test_exchange_flips_pni_on_ack() {
        let driver = MockDriver::with_responses([ok_frame(&[0x01]), ok_frame(&[0x02])]);
        let mut tag = TypeBTag::new(driver);

        let first = tag.send_command(&hex!("00A4040C")).unwrap();
        assert_eq!(first.data(), &[0x01]);
        assert_eq!(tag.pni().bit(), 1);

        tag.send_command(&hex!("00A4020C")).unwrap();
        assert_eq!(tag.pni().bit(), 0);

        let sent = tag.driver().sent_payloads();
        assert_eq!(sent[0].as_ref(), &hex!("02 00A4040C"));
        assert_eq!(sent[1].as_ref(), &hex!("03 00A4020C"));
    }

    #[test]
    fn test_exchange_keeps_pni_without_ack() {
        let driver = MockDriver::with_responses([frame(0xC2, &[], [0x90, 0x00])]);
        let mut tag = TypeBTag::new(driver);

        tag.send_command(&hex!("00B00000 07")).unwrap();
        assert_eq!(tag.pni().bit(), 0);
    }

    #[test]
    fn test_exchange_follows_one_continuation() {
        let driver = MockDriver::with_responses([
            frame(0x12, &hex!("AABB"), hex!("CCDD")),
            frame(0x03, &hex!("EEFF"), hex!("9000")),
        ]);
        let mut tag = TypeBTag::new(driver);

        let response = tag.send_command(&hex!("00B00000 00")).unwrap();

        // acknowledged once for the first block, once more after the continuation
        assert_eq!(tag.pni().bit(), 0);
        assert_eq!(response.header(), &hex!("0000000000000012"));
        assert_eq!(response.data(), &hex!("AABB CCDD EEFF"));
        assert_eq!(response.status(), &hex!("9000"));

        let sent = tag.driver().sent_payloads();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].as_ref(), &[0xA3]);
        let prepares = tag
            .driver()
            .count_calls(|call| matches!(call, DriverCall::Prepare { .. }));
        assert_eq!(prepares, 2);
    }

    #[test]
    fn test_exchange_rejects_second_continuation() {
        let driver = MockDriver::with_responses([
            frame(0x12, &hex!("AA"), hex!("BBCC")),
            frame(0x13, &hex!("DD"), hex!("EEFF")),
        ]);
        let mut tag = TypeBTag::new(driver);

        let err = tag.send_command(&hex!("00B00000 00")).unwrap_err();
        assert!(matches!(err, TypeBError::UnsupportedChaining));
        // both received blocks are acknowledged, the next I-block uses PNI 0
        assert_eq!(tag.pni().bit(), 0);
    }

    #[test]
    fn test_exchange_rejects_short_frame() {
        let driver = MockDriver::with_responses([Bytes::from_static(&hex!("0000000002"))]);
        let mut tag = TypeBTag::new(driver);

        let err = tag.send_command(&hex!("00B00000 07")).unwrap_err();
        assert!(matches!(err, TypeBError::FrameTooShort { len: 5 }));
    }

    #[test]
    fn test_exchange_uses_driver_timeout() {
        let mut driver = MockDriver::with_responses([ok_frame(&[])]);
        driver.timeout = Duration::from_secs(2);
        let mut tag = TypeBTag::new(driver);

        tag.send_command(&hex!("00200080 00")).unwrap();
        assert!(matches!(
            tag.driver().calls.last(),
            Some(DriverCall::InCommRf { timeout, .. }) if *timeout == Duration::from_secs(2)
        ));
    }

    #[test]
    fn test_disconnect_resets_tag_but_not_sequence() {
        let driver = MockDriver::with_responses([
            sense_response([0x01, 0x02, 0x03, 0x04]),
            ok_frame(&[]),
            ok_frame(&[]),
        ]);
        let mut tag = TypeBTag::with_config(driver, quick_config(1));
        tag.connect_to_card().unwrap();
        tag.send_command(&hex!("00A4040C")).unwrap();
        assert_eq!(tag.pni().bit(), 1);

        tag.disconnect().unwrap();
        assert!(tag.tag_id().is_none());
        assert_eq!(tag.pni().bit(), 1);
        assert_eq!(tag.driver().calls.last(), Some(&DriverCall::Disconnect));

        tag.reset();
        assert_eq!(tag.pni().bit(), 0);
    }

    #[test]
    fn test_connect_opens_driver() {
        let tag = TypeBTag::connect(|| Ok::<_, TransportError>(MockDriver::new())).unwrap();
        assert!(tag.tag_id().is_none());
        assert_eq!(tag.pni(), Pni::default());

        let err = TypeBTag::<MockDriver>::connect(|| Err(TransportError::Connection)).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_tag_id_from_sense_response() {
        assert_eq!(
            TagId::from_sense_response(&sense_response([0xDE, 0xAD, 0xBE, 0xEF])),
            Some(TagId::new([0xDE, 0xAD, 0xBE, 0xEF]))
        );
        assert_eq!(TagId::from_sense_response(&no_tag_response()), None);
        assert_eq!(TagId::new([0xDE, 0xAD, 0xBE, 0xEF]).to_string(), "DEADBEEF");
    }
}
