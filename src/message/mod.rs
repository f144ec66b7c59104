//! SNMP message wrappers.
//!
//! Messages encapsulate PDUs with version and community information.
//!
//! - [`CommunityMessage`] - request/response messages (any PDU except the v1 trap)
//! - [`Message`] - any v1/v2c message, including SNMPv1 traps
//! - [`raw`] - span-level framing and the response validation chain

mod community;
pub mod raw;

pub use community::CommunityMessage;
pub use raw::{ExpectedResponse, decode_response};

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::Result;
use crate::pdu::{Pdu, TrapV1Pdu};
use crate::version::Version;
use bytes::Bytes;

/// Decoded SNMP message (any v1/v2c PDU).
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Message carrying a request/response-shaped PDU
    Community(CommunityMessage),
    /// SNMPv1 trap message
    TrapV1 { community: Bytes, pdu: TrapV1Pdu },
}

impl Message {
    /// Get the SNMP version.
    pub fn version(&self) -> Version {
        match self {
            Message::Community(m) => m.version,
            Message::TrapV1 { .. } => Version::V1,
        }
    }

    /// Get the community string.
    pub fn community(&self) -> &[u8] {
        match self {
            Message::Community(m) => &m.community,
            Message::TrapV1 { community, .. } => community,
        }
    }

    /// Get the request/response PDU, if this is not a v1 trap.
    pub fn pdu(&self) -> Option<&Pdu> {
        match self {
            Message::Community(m) => Some(&m.pdu),
            Message::TrapV1 { .. } => None,
        }
    }

    /// Encode to BER.
    pub fn encode(&self) -> Bytes {
        match self {
            Message::Community(m) => m.encode(),
            Message::TrapV1 { community, pdu } => {
                let mut buf = EncodeBuf::new();
                buf.push_sequence(|buf| {
                    pdu.encode(buf);
                    buf.push_octet_string(community);
                    buf.push_integer(Version::V1.as_i32());
                });
                buf.finish()
            }
        }
    }

    /// Decode a message from bytes.
    ///
    /// GETBULK inside a v1 message and a v1 trap inside a v2c message are
    /// rejected with [`DecodeErrorKind::PduNotAllowed`](crate::error::DecodeErrorKind::PduNotAllowed).
    pub fn decode(data: Bytes) -> Result<Self> {
        let mut decoder = Decoder::new(data);
        let mut seq = decoder.read_sequence()?;
        let version = community::read_version(&mut seq)?;

        // Peek past the community to pick the PDU layout
        let mut probe = Decoder::new(seq.as_bytes().slice(seq.offset()..));
        probe.read_octet_string()?;
        if let Some(pdu_tag) = probe.peek_tag() {
            community::check_pdu_allowed(version, pdu_tag, seq.offset() + probe.offset())?;
            if pdu_tag == tag::pdu::TRAP_V1 {
                let community = seq.read_octet_string()?;
                let pdu = TrapV1Pdu::decode(&mut seq)?;
                return Ok(Message::TrapV1 { community, pdu });
            }
        }

        Ok(Message::Community(CommunityMessage::decode_from_sequence(
            &mut seq, version,
        )?))
    }
}

impl From<CommunityMessage> for Message {
    fn from(msg: CommunityMessage) -> Self {
        Message::Community(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DecodeErrorKind, Error};
    use crate::oid;
    use crate::pdu::GenericTrap;

    fn trap() -> TrapV1Pdu {
        TrapV1Pdu::new(
            oid!(1, 3, 6, 1, 4, 1, 8072),
            [127, 0, 0, 1],
            GenericTrap::LinkUp,
            0,
            4200,
            vec![],
        )
    }

    #[test]
    fn test_trap_message_roundtrip() {
        let msg = Message::TrapV1 {
            community: Bytes::from_static(b"public"),
            pdu: trap(),
        };
        let decoded = Message::decode(msg.encode()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.version(), Version::V1);
        assert!(decoded.pdu().is_none());
    }

    #[test]
    fn test_trap_rejected_in_v2c() {
        // Re-frame a v1 trap under version 1 (v2c)
        let mut buf = EncodeBuf::new();
        buf.push_sequence(|buf| {
            trap().encode(buf);
            buf.push_octet_string(b"public");
            buf.push_integer(Version::V2c.as_i32());
        });
        let err = Message::decode(buf.finish()).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::PduNotAllowed {
                    version: 1,
                    pdu_tag: 0xA4
                },
                ..
            }
        ));
    }

    #[test]
    fn test_community_message_dispatch() {
        let msg: Message = CommunityMessage::v2c(
            Bytes::from_static(b"ro"),
            Pdu::get_next_request(5, &[oid!(1, 3, 6, 1, 2, 1)]),
        )
        .into();
        let decoded = Message::decode(msg.encode()).unwrap();
        assert_eq!(decoded.community(), b"ro");
        assert_eq!(decoded.pdu().unwrap().request_id, 5);
    }
}
