//! Community-based SNMP message format (v1/v2c).
//!
//! V1 and V2c messages share the same structure:
//! `SEQUENCE { version INTEGER, community OCTET STRING, pdu PDU }`
//!
//! The only difference is the version number (0 for v1, 1 for v2c).

use crate::ber::{Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, Error, Result};
use crate::pdu::{Pdu, PduType};
use crate::version::Version;
use bytes::Bytes;

/// Community-based SNMP message (v1/v2c).
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityMessage {
    /// SNMP version (V1 or V2c)
    pub version: Version,
    /// Community string for authentication
    pub community: Bytes,
    /// Protocol data unit
    pub pdu: Pdu,
}

impl CommunityMessage {
    /// Create a new community message.
    pub fn new(version: Version, community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self {
            version,
            community: community.into(),
            pdu,
        }
    }

    /// Create a V2c message.
    pub fn v2c(community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self::new(Version::V2c, community, pdu)
    }

    /// Create a V1 message.
    pub fn v1(community: impl Into<Bytes>, pdu: Pdu) -> Self {
        Self::new(Version::V1, community, pdu)
    }

    /// Encode to BER.
    pub fn encode(&self) -> Bytes {
        let mut buf = EncodeBuf::new();

        buf.push_sequence(|buf| {
            self.pdu.encode(buf);
            buf.push_octet_string(&self.community);
            buf.push_integer(self.version.as_i32());
        });

        buf.finish()
    }

    /// Decode from BER.
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let version = read_version(&mut seq)?;
        Self::decode_from_sequence(&mut seq, version)
    }

    /// Decode from a sequence decoder where version has already been read.
    pub(crate) fn decode_from_sequence(seq: &mut Decoder, version: Version) -> Result<Self> {
        let community = seq.read_octet_string()?;

        if let Some(pdu_tag) = seq.peek_tag() {
            check_pdu_allowed(version, pdu_tag, seq.offset())?;
        }
        let pdu = Pdu::decode(seq)?;

        Ok(CommunityMessage {
            version,
            community,
            pdu,
        })
    }

    /// Consume and return the PDU.
    pub fn into_pdu(self) -> Pdu {
        self.pdu
    }
}

/// Read the leading version INTEGER of a message sequence.
pub(crate) fn read_version(seq: &mut Decoder) -> Result<Version> {
    let offset = seq.offset();
    let version_num = seq.read_integer()?;
    Version::from_i32(version_num).ok_or_else(|| {
        tracing::debug!(target: "snmp_session::ber", { snmp.offset = %offset, kind = %DecodeErrorKind::UnknownVersion(version_num) }, "decode error");
        Error::decode(offset, DecodeErrorKind::UnknownVersion(version_num))
    })
}

/// Reject PDU shapes that the message version does not carry: GETBULK in
/// v1 and the v1 trap in v2c.
pub(crate) fn check_pdu_allowed(version: Version, pdu_tag: u8, offset: usize) -> Result<()> {
    let allowed = match PduType::from_tag(pdu_tag) {
        Some(PduType::GetBulkRequest) => version.supports_bulk(),
        Some(PduType::TrapV1) => version == Version::V1,
        _ => true,
    };
    if allowed {
        return Ok(());
    }
    let kind = DecodeErrorKind::PduNotAllowed {
        version: version.as_i32(),
        pdu_tag,
    };
    tracing::debug!(target: "snmp_session::ber", { snmp.offset = %offset, kind = %kind }, "PDU not valid for message version");
    Err(Error::decode(offset, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ber::tag;
    use crate::oid;

    #[test]
    fn test_v1_roundtrip() {
        let pdu = Pdu::get_request(42, &[oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
        let msg = CommunityMessage::v1(b"public".as_slice(), pdu);

        let decoded = CommunityMessage::decode(msg.encode()).unwrap();

        assert_eq!(decoded, msg);
        assert_eq!(decoded.version, Version::V1);
        assert_eq!(decoded.community.as_ref(), b"public");
    }

    #[test]
    fn test_v2c_bulk_roundtrip() {
        let pdu = Pdu::get_bulk(123, 0, 10, &[oid!(1, 3, 6, 1, 2, 1, 2)]);
        let msg = CommunityMessage::v2c(b"private".as_slice(), pdu);

        let decoded = CommunityMessage::decode(msg.encode()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_bulk_rejected_in_v1() {
        let pdu = Pdu::get_bulk(1, 0, 10, &[oid!(1, 3, 6, 1)]);
        let msg = CommunityMessage::v1(b"public".as_slice(), pdu);

        let err = CommunityMessage::decode(msg.encode()).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::PduNotAllowed {
                    version: 0,
                    pdu_tag: tag::pdu::GET_BULK_REQUEST
                },
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_version() {
        // SEQUENCE { INTEGER 3, OCTET STRING "" }
        let err = CommunityMessage::decode(Bytes::from_static(&[
            0x30, 0x05, 0x02, 0x01, 0x03, 0x04, 0x00,
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::UnknownVersion(3),
                ..
            }
        ));
    }
}
