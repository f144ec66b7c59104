//! Span-level message codec.
//!
//! These functions frame and unframe already-encoded pieces without
//! interpreting values: every span is a `Bytes` view into the datagram it
//! came from. [`decode_response`] is the full validation chain a session runs
//! on each reply.

use std::net::SocketAddr;

use crate::ber::{Decoder, EncodeBuf, tag};
use crate::error::{DecodeErrorKind, EncodeErrorKind, Error, ErrorStatus, Result};
use crate::message::community::{check_pdu_allowed, read_version};
use crate::pdu::PduType;
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;
use bytes::Bytes;

/// Outer message split into its three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub version: Version,
    pub community: Bytes,
    /// Complete PDU TLV, tag included.
    pub pdu: Bytes,
}

/// Request/response PDU header plus the undecoded binding list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPdu {
    pub pdu_type: PduType,
    pub request_id: i32,
    /// Error-status, or non-repeaters for GETBULK.
    pub error_status: i32,
    /// Error-index, or max-repetitions for GETBULK.
    pub error_index: i32,
    /// Complete binding-list SEQUENCE TLV.
    pub bindings: Bytes,
}

/// One binding as two encoded TLVs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVarBind {
    pub oid: Bytes,
    pub value: Bytes,
}

impl RawVarBind {
    /// Materialize an owned [`VarBind`].
    pub fn to_varbind(&self) -> Result<VarBind> {
        let oid = Decoder::new(self.oid.clone()).read_oid()?;
        if oid.is_empty() {
            return Err(Error::decode(0, DecodeErrorKind::InvalidOidEncoding));
        }
        let value = Value::decode(&mut Decoder::new(self.value.clone()))?;
        Ok(VarBind::new(oid, value))
    }
}

/// Frame `(encoded OID, encoded value)` pairs into a binding list.
///
/// A missing value is sent as NULL, which is what GET-style requests carry.
/// Fails on an empty list and on an OID span that holds no arcs.
pub fn encode_bindings(pairs: &[(Bytes, Option<Bytes>)]) -> Result<Bytes> {
    if pairs.is_empty() {
        return Err(Error::encode(EncodeErrorKind::EmptyVarBindList));
    }
    for (oid, _) in pairs {
        if Decoder::new(oid.clone()).read_oid()?.is_empty() {
            return Err(Error::encode(EncodeErrorKind::EmptyOid));
        }
    }

    let mut buf = EncodeBuf::new();
    buf.push_sequence(|buf| {
        for (oid, value) in pairs.iter().rev() {
            buf.push_sequence(|buf| {
                match value {
                    Some(value) => buf.push_bytes(value),
                    None => buf.push_null(),
                }
                buf.push_bytes(oid);
            });
        }
    });
    Ok(buf.finish())
}

/// Wrap a header and a binding list under the PDU's context tag.
pub fn encode_pdu(
    pdu_type: PduType,
    request_id: i32,
    error_status: i32,
    error_index: i32,
    bindings: &[u8],
) -> Bytes {
    let mut buf = EncodeBuf::new();
    buf.push_constructed(pdu_type.tag(), |buf| {
        buf.push_bytes(bindings);
        buf.push_integer(error_index);
        buf.push_integer(error_status);
        buf.push_integer(request_id);
    });
    buf.finish()
}

/// Wrap version, community and an encoded PDU into a complete message.
pub fn encode_message(version: Version, community: &[u8], pdu: &[u8]) -> Bytes {
    let mut buf = EncodeBuf::with_capacity(pdu.len() + community.len() + 16);
    buf.push_sequence(|buf| {
        buf.push_bytes(pdu);
        buf.push_octet_string(community);
        buf.push_integer(version.as_i32());
    });
    buf.finish()
}

/// Split a message into version, community and PDU span.
pub fn decode_message(data: Bytes) -> Result<RawMessage> {
    let mut decoder = Decoder::new(data);
    let mut seq = decoder.read_sequence()?;
    let version = read_version(&mut seq)?;
    let community = seq.read_octet_string()?;

    let offset = seq.offset();
    let (pdu_tag, pdu) = seq.read_tlv()?;
    if PduType::from_tag(pdu_tag).is_none() {
        tracing::debug!(target: "snmp_session::ber", { snmp.offset = %offset, kind = %DecodeErrorKind::UnknownPduType(pdu_tag) }, "unknown PDU type");
        return Err(Error::decode(offset, DecodeErrorKind::UnknownPduType(pdu_tag)));
    }
    check_pdu_allowed(version, pdu_tag, offset)?;

    Ok(RawMessage {
        version,
        community,
        pdu,
    })
}

/// Split a request/response PDU into its header and binding-list span.
pub fn decode_pdu(data: Bytes) -> Result<RawPdu> {
    let mut decoder = Decoder::new(data);
    let tag = decoder.read_tag()?;
    let pdu_type = PduType::from_tag(tag)
        .filter(|t| *t != PduType::TrapV1)
        .ok_or_else(|| {
            tracing::debug!(target: "snmp_session::ber", { snmp.offset = 0, kind = %DecodeErrorKind::UnknownPduType(tag) }, "not a request/response PDU");
            Error::decode(0, DecodeErrorKind::UnknownPduType(tag))
        })?;
    let len = decoder.read_length()?;
    let mut body = decoder.sub_decoder(len)?;

    let request_id = body.read_integer()?;
    let error_status = body.read_integer()?;
    let error_index = body.read_integer()?;

    let offset = body.offset();
    let (list_tag, bindings) = body.read_tlv()?;
    if list_tag != tag::universal::SEQUENCE {
        return Err(Error::decode(
            offset,
            DecodeErrorKind::UnexpectedTag {
                expected: tag::universal::SEQUENCE,
                actual: list_tag,
            },
        ));
    }

    Ok(RawPdu {
        pdu_type,
        request_id,
        error_status,
        error_index,
        bindings,
    })
}

/// Split a binding list into per-binding OID and value spans.
pub fn decode_bindings(data: Bytes) -> Result<Vec<RawVarBind>> {
    let mut decoder = Decoder::new(data);
    let mut list = decoder.read_sequence()?;
    let mut out = Vec::new();

    while !list.is_empty() {
        let mut pair = list.read_sequence()?;

        let offset = pair.offset();
        let (oid_tag, oid) = pair.read_tlv()?;
        if oid_tag != tag::universal::OBJECT_IDENTIFIER {
            return Err(Error::decode(
                offset,
                DecodeErrorKind::UnexpectedTag {
                    expected: tag::universal::OBJECT_IDENTIFIER,
                    actual: oid_tag,
                },
            ));
        }
        let (_, value) = pair.read_tlv()?;
        out.push(RawVarBind { oid, value });
    }

    Ok(out)
}

/// What a session expects of the reply to one outstanding request.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedResponse<'a> {
    pub version: Version,
    pub community: &'a [u8],
    pub request_id: i32,
    /// Peer address, attached to errors for context.
    pub target: Option<SocketAddr>,
}

/// Decode and validate a reply, returning its bindings.
///
/// Checks run in order: version, community, PDU type (must be Response),
/// request-id, then error-status. A non-zero error-status fails with
/// [`Error::Snmp`] carrying the code, the 1-based index and, when the index
/// is in range, the OID it names.
pub fn decode_response(data: Bytes, expected: &ExpectedResponse<'_>) -> Result<Vec<VarBind>> {
    let message = decode_message(data)?;

    if message.version != expected.version {
        tracing::debug!(target: "snmp_session::client", { expected = %expected.version, actual = %message.version }, "version mismatch");
        return Err(Error::VersionMismatch {
            expected: expected.version,
            actual: message.version,
        });
    }
    if message.community.as_ref() != expected.community {
        tracing::debug!(target: "snmp_session::client", "community mismatch");
        return Err(Error::InvalidCommunity {
            target: expected.target,
        });
    }

    let pdu = decode_pdu(message.pdu)?;
    if pdu.pdu_type != PduType::Response {
        return Err(Error::decode(
            0,
            DecodeErrorKind::UnexpectedPduType(pdu.pdu_type.tag()),
        ));
    }
    if pdu.request_id != expected.request_id {
        tracing::debug!(target: "snmp_session::client", { expected = expected.request_id, actual = pdu.request_id }, "request ID mismatch");
        return Err(Error::RequestIdMismatch {
            expected: expected.request_id,
            actual: pdu.request_id,
        });
    }

    let bindings = decode_bindings(pdu.bindings)?;

    if pdu.error_status != 0 {
        let oid = usize::try_from(pdu.error_index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| bindings.get(i))
            .and_then(|raw| Decoder::new(raw.oid.clone()).read_oid().ok());
        let status = ErrorStatus::from_i32(pdu.error_status);
        tracing::debug!(target: "snmp_session::client", { status = %status, index = pdu.error_index }, "agent returned error status");
        return Err(Error::Snmp {
            target: expected.target,
            status,
            index: pdu.error_index.max(0) as u32,
            oid,
        });
    }

    bindings.iter().map(RawVarBind::to_varbind).collect()
}
