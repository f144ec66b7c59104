//! SNMP Protocol Data Units (PDUs).
//!
//! Every PDU except the SNMPv1 trap shares one body layout:
//! `request-id, error-status, error-index, variable-bindings`. GETBULK reuses
//! the two middle fields as `non-repeaters` and `max-repetitions`.

use crate::ber::{Codec, Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::varbind::{VarBind, decode_varbind_list, encode_varbind_list};

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    GetRequest = 0xA0,
    GetNextRequest = 0xA1,
    Response = 0xA2,
    SetRequest = 0xA3,
    TrapV1 = 0xA4,
    GetBulkRequest = 0xA5,
    InformRequest = 0xA6,
    TrapV2 = 0xA7,
    Report = 0xA8,
}

impl PduType {
    /// Create from tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            tag::pdu::GET_REQUEST => Some(Self::GetRequest),
            tag::pdu::GET_NEXT_REQUEST => Some(Self::GetNextRequest),
            tag::pdu::RESPONSE => Some(Self::Response),
            tag::pdu::SET_REQUEST => Some(Self::SetRequest),
            tag::pdu::TRAP_V1 => Some(Self::TrapV1),
            tag::pdu::GET_BULK_REQUEST => Some(Self::GetBulkRequest),
            tag::pdu::INFORM_REQUEST => Some(Self::InformRequest),
            tag::pdu::TRAP_V2 => Some(Self::TrapV2),
            tag::pdu::REPORT => Some(Self::Report),
            _ => None,
        }
    }

    /// Get the tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Whether an agent is expected to answer this PDU.
    pub fn expects_response(self) -> bool {
        matches!(
            self,
            Self::GetRequest
                | Self::GetNextRequest
                | Self::GetBulkRequest
                | Self::SetRequest
                | Self::InformRequest
        )
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetRequest => write!(f, "GetRequest"),
            Self::GetNextRequest => write!(f, "GetNextRequest"),
            Self::Response => write!(f, "Response"),
            Self::SetRequest => write!(f, "SetRequest"),
            Self::TrapV1 => write!(f, "TrapV1"),
            Self::GetBulkRequest => write!(f, "GetBulkRequest"),
            Self::InformRequest => write!(f, "InformRequest"),
            Self::TrapV2 => write!(f, "TrapV2"),
            Self::Report => write!(f, "Report"),
        }
    }
}

/// Generic PDU structure for request/response operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Pdu {
    /// PDU type
    pub pdu_type: PduType,
    /// Request ID for correlating requests and responses
    pub request_id: i32,
    /// Error status (0 for requests, error code for responses)
    pub error_status: i32,
    /// Error index (1-based index of problematic varbind)
    pub error_index: i32,
    /// Variable bindings
    pub varbinds: Vec<VarBind>,
}

impl Pdu {
    fn request(pdu_type: PduType, request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self {
            pdu_type,
            request_id,
            error_status: 0,
            error_index: 0,
            varbinds,
        }
    }

    /// Create a new GET request PDU.
    pub fn get_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(
            PduType::GetRequest,
            request_id,
            oids.iter().cloned().map(VarBind::null).collect(),
        )
    }

    /// Create a new GETNEXT request PDU.
    pub fn get_next_request(request_id: i32, oids: &[Oid]) -> Self {
        Self::request(
            PduType::GetNextRequest,
            request_id,
            oids.iter().cloned().map(VarBind::null).collect(),
        )
    }

    /// Create a new SET request PDU.
    pub fn set_request(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Self::request(PduType::SetRequest, request_id, varbinds)
    }

    /// Create a GETBULK request PDU.
    ///
    /// `non_repeaters` and `max_repetitions` occupy the error-status and
    /// error-index slots on the wire.
    pub fn get_bulk(
        request_id: i32,
        non_repeaters: i32,
        max_repetitions: i32,
        oids: &[Oid],
    ) -> Self {
        Self {
            pdu_type: PduType::GetBulkRequest,
            request_id,
            error_status: non_repeaters,
            error_index: max_repetitions,
            varbinds: oids.iter().cloned().map(VarBind::null).collect(),
        }
    }

    /// Create a Response PDU.
    pub fn response(
        request_id: i32,
        error_status: ErrorStatus,
        error_index: i32,
        varbinds: Vec<VarBind>,
    ) -> Self {
        Self {
            pdu_type: PduType::Response,
            request_id,
            error_status: error_status.as_i32(),
            error_index,
            varbinds,
        }
    }

    /// Non-repeaters of a GETBULK request.
    pub fn non_repeaters(&self) -> Option<i32> {
        (self.pdu_type == PduType::GetBulkRequest).then_some(self.error_status)
    }

    /// Max-repetitions of a GETBULK request.
    pub fn max_repetitions(&self) -> Option<i32> {
        (self.pdu_type == PduType::GetBulkRequest).then_some(self.error_index)
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(self.pdu_type.tag(), |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_integer(self.error_index);
            buf.push_integer(self.error_status);
            buf.push_integer(self.request_id);
        });
    }

    /// Decode from BER.
    ///
    /// The SNMPv1 trap has its own layout; see [`TrapV1Pdu::decode`].
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let start = decoder.offset();
        let tag = decoder.read_tag()?;
        let pdu_type = PduType::from_tag(tag)
            .filter(|t| *t != PduType::TrapV1)
            .ok_or_else(|| {
                tracing::debug!(target: "snmp_session::ber", { snmp.offset = %start, kind = %DecodeErrorKind::UnknownPduType(tag) }, "not a request/response PDU");
                Error::decode(start, DecodeErrorKind::UnknownPduType(tag))
            })?;

        let len = decoder.read_length()?;
        let mut pdu_decoder = decoder.sub_decoder(len)?;

        let request_id = pdu_decoder.read_integer()?;
        let error_status = pdu_decoder.read_integer()?;
        let error_index = pdu_decoder.read_integer()?;
        let varbinds = decode_varbind_list(&mut pdu_decoder)?;

        Ok(Pdu {
            pdu_type,
            request_id,
            error_status,
            error_index,
            varbinds,
        })
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.pdu_type != PduType::GetBulkRequest && self.error_status != 0
    }

    /// Get the error status as an enum.
    pub fn error_status_enum(&self) -> ErrorStatus {
        ErrorStatus::from_i32(self.error_status)
    }

    /// The binding named by a 1-based error-index, if it is in range.
    pub fn error_varbind(&self) -> Option<&VarBind> {
        usize::try_from(self.error_index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.varbinds.get(i))
    }
}

impl Codec for Pdu {
    fn encode(&self, buf: &mut EncodeBuf) {
        Pdu::encode(self, buf)
    }

    fn decode(decoder: &mut Decoder) -> Result<Self> {
        Pdu::decode(decoder)
    }
}

/// SNMPv1 generic trap types (RFC 1157 Section 4.1.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum GenericTrap {
    ColdStart = 0,
    WarmStart = 1,
    LinkDown = 2,
    LinkUp = 3,
    AuthenticationFailure = 4,
    EgpNeighborLoss = 5,
    /// See the trap's `specific_trap` field.
    EnterpriseSpecific = 6,
}

impl GenericTrap {
    /// Create from integer value.
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::ColdStart),
            1 => Some(Self::WarmStart),
            2 => Some(Self::LinkDown),
            3 => Some(Self::LinkUp),
            4 => Some(Self::AuthenticationFailure),
            5 => Some(Self::EgpNeighborLoss),
            6 => Some(Self::EnterpriseSpecific),
            _ => None,
        }
    }

    /// Get the integer value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// SNMPv1 Trap PDU (RFC 1157 Section 4.1.6).
///
/// Carries no request-id; agents send it unsolicited and nothing answers it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrapV1Pdu {
    /// Enterprise OID (sysObjectID of the entity generating the trap)
    pub enterprise: Oid,
    /// Agent address
    pub agent_addr: [u8; 4],
    /// Generic trap type
    pub generic_trap: i32,
    /// Specific trap code (meaningful when generic_trap is enterpriseSpecific)
    pub specific_trap: i32,
    /// sysUpTime in hundredths of seconds
    pub time_stamp: u32,
    /// Variable bindings
    pub varbinds: Vec<VarBind>,
}

impl TrapV1Pdu {
    /// Create a new SNMPv1 Trap PDU.
    pub fn new(
        enterprise: Oid,
        agent_addr: [u8; 4],
        generic_trap: GenericTrap,
        specific_trap: i32,
        time_stamp: u32,
        varbinds: Vec<VarBind>,
    ) -> Self {
        Self {
            enterprise,
            agent_addr,
            generic_trap: generic_trap.as_i32(),
            specific_trap,
            time_stamp,
            varbinds,
        }
    }

    /// Get the generic trap type as an enum.
    pub fn generic_trap_enum(&self) -> Option<GenericTrap> {
        GenericTrap::from_i32(self.generic_trap)
    }

    /// Check if this is an enterprise-specific trap.
    pub fn is_enterprise_specific(&self) -> bool {
        self.generic_trap == GenericTrap::EnterpriseSpecific as i32
    }

    /// Equivalent SNMPv2 `snmpTrapOID.0` value (RFC 3584 Section 3).
    ///
    /// ```
    /// use snmp_session::pdu::{GenericTrap, TrapV1Pdu};
    /// use snmp_session::oid;
    ///
    /// let trap = TrapV1Pdu::new(
    ///     oid!(1, 3, 6, 1, 4, 1, 9999),
    ///     [192, 168, 1, 1],
    ///     GenericTrap::LinkDown,
    ///     0,
    ///     12345,
    ///     vec![],
    /// );
    /// assert_eq!(trap.v2_trap_oid(), oid!(1, 3, 6, 1, 6, 3, 1, 1, 5, 3));
    ///
    /// let trap = TrapV1Pdu::new(
    ///     oid!(1, 3, 6, 1, 4, 1, 9999),
    ///     [192, 168, 1, 1],
    ///     GenericTrap::EnterpriseSpecific,
    ///     42,
    ///     12345,
    ///     vec![],
    /// );
    /// assert_eq!(trap.v2_trap_oid(), oid!(1, 3, 6, 1, 4, 1, 9999, 0, 42));
    /// ```
    pub fn v2_trap_oid(&self) -> Oid {
        if self.is_enterprise_specific() {
            self.enterprise.child(0).child(self.specific_trap as u32)
        } else {
            // snmpTraps = 1.3.6.1.6.3.1.1.5
            crate::oid!(1, 3, 6, 1, 6, 3, 1, 1, 5).child((self.generic_trap + 1) as u32)
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_constructed(tag::pdu::TRAP_V1, |buf| {
            encode_varbind_list(buf, &self.varbinds);
            buf.push_unsigned32(tag::application::TIMETICKS, self.time_stamp);
            buf.push_integer(self.specific_trap);
            buf.push_integer(self.generic_trap);
            // NetworkAddress is APPLICATION 0 IMPLICIT IpAddress
            buf.push_ip_address(self.agent_addr);
            buf.push_oid(&self.enterprise);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut pdu = decoder.read_constructed(tag::pdu::TRAP_V1)?;

        let enterprise = pdu.read_oid()?;
        let agent_addr = pdu.read_ip_address()?;
        let generic_trap = pdu.read_integer()?;
        let specific_trap = pdu.read_integer()?;
        let time_stamp = pdu.read_unsigned32(tag::application::TIMETICKS)?;
        let varbinds = decode_varbind_list(&mut pdu)?;

        Ok(TrapV1Pdu {
            enterprise,
            agent_addr,
            generic_trap,
            specific_trap,
            time_stamp,
            varbinds,
        })
    }
}

impl Codec for TrapV1Pdu {
    fn encode(&self, buf: &mut EncodeBuf) {
        TrapV1Pdu::encode(self, buf)
    }

    fn decode(decoder: &mut Decoder) -> Result<Self> {
        TrapV1Pdu::decode(decoder)
    }
}
