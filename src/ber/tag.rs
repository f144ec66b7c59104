//! BER tag definitions for SNMP.
//!
//! Tag encoding follows X.690 Section 8.1.2:
//! - Bits 7-6: Class (00=Universal, 01=Application, 10=Context-specific, 11=Private)
//! - Bit 5: Primitive (0) or Constructed (1)
//! - Bits 4-0: Tag number (0-30, or 31 for long form)

use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::PduType;

/// Tag class bits (bits 7-6)
pub mod class {
    pub const UNIVERSAL: u8 = 0x00;
    pub const APPLICATION: u8 = 0x40;
    pub const CONTEXT_SPECIFIC: u8 = 0x80;
    pub const PRIVATE: u8 = 0xC0;
}

/// Constructed bit (bit 5)
pub const CONSTRUCTED: u8 = 0x20;

/// Universal tags (class bits 00)
pub mod universal {
    // X.690 value; 0x00 is the end-of-contents octet, not BOOLEAN
    pub const BOOLEAN: u8 = 0x01;
    pub const INTEGER: u8 = 0x02;
    pub const BIT_STRING: u8 = 0x03;
    pub const OCTET_STRING: u8 = 0x04;
    /// Constructed OCTET STRING (0x24) - not supported, rejected on decode
    pub const OCTET_STRING_CONSTRUCTED: u8 = 0x24;
    pub const NULL: u8 = 0x05;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const SEQUENCE: u8 = 0x30; // Constructed
    pub const SET: u8 = 0x31; // Constructed
}

/// Application tags (class bits 01) - SNMP-specific types
pub mod application {
    pub const IP_ADDRESS: u8 = 0x40;
    pub const COUNTER32: u8 = 0x41;
    pub const GAUGE32: u8 = 0x42;
    pub const TIMETICKS: u8 = 0x43;
    pub const OPAQUE: u8 = 0x44;
    pub const COUNTER64: u8 = 0x46;
    /// RFC 1442 UInteger32, superseded by Gauge32 in SMIv2
    pub const UNSIGNED32: u8 = 0x47;
}

/// Context-specific tags (class bits 10) - Exception values
pub mod context {
    pub const NO_SUCH_OBJECT: u8 = 0x80;
    pub const NO_SUCH_INSTANCE: u8 = 0x81;
    pub const END_OF_MIB_VIEW: u8 = 0x82;
}

/// PDU tags (context-specific, constructed)
pub mod pdu {
    use super::CONSTRUCTED;
    use super::class::CONTEXT_SPECIFIC;

    pub const GET_REQUEST: u8 = CONTEXT_SPECIFIC | CONSTRUCTED; // 0xA0
    pub const GET_NEXT_REQUEST: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x01; // 0xA1
    pub const RESPONSE: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x02; // 0xA2
    pub const SET_REQUEST: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x03; // 0xA3
    pub const TRAP_V1: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x04; // 0xA4
    pub const GET_BULK_REQUEST: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x05; // 0xA5
    pub const INFORM_REQUEST: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x06; // 0xA6
    pub const TRAP_V2: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x07; // 0xA7
    pub const REPORT: u8 = CONTEXT_SPECIFIC | CONSTRUCTED | 0x08; // 0xA8
}

/// Every tag this crate knows how to name.
///
/// Lookups go through [`Tag::from_u8`], which fails with
/// [`DecodeErrorKind::UnknownTag`] for bytes outside the table. Value decoding
/// does not use this lookup; unknown value tags become [`crate::Value::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    ObjectIdentifier,
    Sequence,
    Set,
    IpAddress,
    Counter32,
    Gauge32,
    TimeTicks,
    Opaque,
    Counter64,
    Unsigned32,
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    Pdu(PduType),
}

impl Tag {
    /// Look up the tag for a raw tag byte.
    pub fn from_u8(byte: u8) -> Result<Self> {
        let tag = match byte {
            universal::BOOLEAN => Tag::Boolean,
            universal::INTEGER => Tag::Integer,
            universal::BIT_STRING => Tag::BitString,
            universal::OCTET_STRING => Tag::OctetString,
            universal::NULL => Tag::Null,
            universal::OBJECT_IDENTIFIER => Tag::ObjectIdentifier,
            universal::SEQUENCE => Tag::Sequence,
            universal::SET => Tag::Set,
            application::IP_ADDRESS => Tag::IpAddress,
            application::COUNTER32 => Tag::Counter32,
            application::GAUGE32 => Tag::Gauge32,
            application::TIMETICKS => Tag::TimeTicks,
            application::OPAQUE => Tag::Opaque,
            application::COUNTER64 => Tag::Counter64,
            application::UNSIGNED32 => Tag::Unsigned32,
            context::NO_SUCH_OBJECT => Tag::NoSuchObject,
            context::NO_SUCH_INSTANCE => Tag::NoSuchInstance,
            context::END_OF_MIB_VIEW => Tag::EndOfMibView,
            other => match PduType::from_tag(other) {
                Some(pdu_type) => Tag::Pdu(pdu_type),
                None => return Err(Error::decode(0, DecodeErrorKind::UnknownTag(other))),
            },
        };
        Ok(tag)
    }

    /// The raw tag byte.
    pub const fn as_u8(self) -> u8 {
        match self {
            Tag::Boolean => universal::BOOLEAN,
            Tag::Integer => universal::INTEGER,
            Tag::BitString => universal::BIT_STRING,
            Tag::OctetString => universal::OCTET_STRING,
            Tag::Null => universal::NULL,
            Tag::ObjectIdentifier => universal::OBJECT_IDENTIFIER,
            Tag::Sequence => universal::SEQUENCE,
            Tag::Set => universal::SET,
            Tag::IpAddress => application::IP_ADDRESS,
            Tag::Counter32 => application::COUNTER32,
            Tag::Gauge32 => application::GAUGE32,
            Tag::TimeTicks => application::TIMETICKS,
            Tag::Opaque => application::OPAQUE,
            Tag::Counter64 => application::COUNTER64,
            Tag::Unsigned32 => application::UNSIGNED32,
            Tag::NoSuchObject => context::NO_SUCH_OBJECT,
            Tag::NoSuchInstance => context::NO_SUCH_INSTANCE,
            Tag::EndOfMibView => context::END_OF_MIB_VIEW,
            Tag::Pdu(pdu_type) => pdu_type as u8,
        }
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> u8 {
        tag.as_u8()
    }
}

/// Check if a tag indicates a constructed type
#[inline]
pub const fn is_constructed(tag: u8) -> bool {
    tag & CONSTRUCTED != 0
}

/// Get the class of a tag
#[inline]
pub const fn tag_class(tag: u8) -> u8 {
    tag & 0xC0
}

/// Get the tag number (bits 4-0)
#[inline]
pub const fn tag_number(tag: u8) -> u8 {
    tag & 0x1F
}
