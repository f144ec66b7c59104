//! Variable binding (VarBind) type.
//!
//! A VarBind pairs an OID with a value. Order within a list is significant:
//! an agent's error-index points at a 1-based position in it.

use crate::ber::{Codec, Decoder, EncodeBuf};
use crate::error::{DecodeErrorKind, EncodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::value::Value;

/// Variable binding - an OID-value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    /// The object identifier.
    pub oid: Oid,
    /// The value.
    pub value: Value,
}

impl VarBind {
    /// Create a new VarBind.
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// Create a VarBind with a NULL value (for GET requests).
    pub fn null(oid: Oid) -> Self {
        Self {
            oid,
            value: Value::Null,
        }
    }

    /// Encode to BER.
    pub fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_sequence(|buf| {
            self.value.encode(buf);
            buf.push_oid(&self.oid);
        });
    }

    /// Decode from BER.
    pub fn decode(decoder: &mut Decoder) -> Result<Self> {
        let mut seq = decoder.read_sequence()?;
        let start = seq.offset();
        let oid = seq.read_oid()?;
        if oid.is_empty() {
            return Err(Error::decode(start, DecodeErrorKind::InvalidOidEncoding));
        }
        let value = Value::decode(&mut seq)?;
        Ok(VarBind { oid, value })
    }
}

impl Codec for VarBind {
    fn encode(&self, buf: &mut EncodeBuf) {
        VarBind::encode(self, buf)
    }

    fn decode(decoder: &mut Decoder) -> Result<Self> {
        VarBind::decode(decoder)
    }
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} --> {}", self.oid, self.value)
    }
}

/// Encode a list of VarBinds.
pub fn encode_varbind_list(buf: &mut EncodeBuf, varbinds: &[VarBind]) {
    buf.push_sequence(|buf| {
        // Encode in reverse order since we're using reverse buffer
        for vb in varbinds.iter().rev() {
            vb.encode(buf);
        }
    });
}

/// Decode a list of VarBinds. An empty list is accepted.
pub fn decode_varbind_list(decoder: &mut Decoder) -> Result<Vec<VarBind>> {
    let mut seq = decoder.read_sequence()?;
    let mut varbinds = Vec::new();

    while !seq.is_empty() {
        varbinds.push(VarBind::decode(&mut seq)?);
    }

    Ok(varbinds)
}

/// Build NULL-valued bindings for a GET-style request.
///
/// Fails with [`EncodeErrorKind::EmptyVarBindList`] when `oids` is empty,
/// with [`EncodeErrorKind::EmptyOid`] when any OID has no arcs and with
/// [`EncodeErrorKind::OidNotEncodable`] when any OID would not decode back
/// to itself (a single arc, or arcs outside X.690 limits).
pub fn null_varbinds(oids: &[Oid]) -> Result<Vec<VarBind>> {
    if oids.is_empty() {
        return Err(Error::encode(EncodeErrorKind::EmptyVarBindList));
    }
    oids.iter()
        .map(|oid| {
            oid.check_encodable()?;
            Ok(VarBind::null(oid.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use bytes::Bytes;

    fn encode_list(varbinds: &[VarBind]) -> Bytes {
        let mut buf = EncodeBuf::new();
        encode_varbind_list(&mut buf, varbinds);
        buf.finish()
    }

    #[test]
    fn test_varbind_wire_layout() {
        let vb = VarBind::null(oid!(1, 3, 6, 1));
        let mut buf = EncodeBuf::new();
        vb.encode(&mut buf);
        assert_eq!(
            &buf.finish()[..],
            &[0x30, 0x07, 0x06, 0x03, 0x2B, 0x06, 0x01, 0x05, 0x00]
        );
    }

    #[test]
    fn test_varbind_list_preserves_order() {
        let varbinds = vec![
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("router")),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(100)),
            VarBind::new(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::NoSuchInstance),
        ];
        let mut decoder = Decoder::new(encode_list(&varbinds));
        assert_eq!(decode_varbind_list(&mut decoder).unwrap(), varbinds);
    }

    #[test]
    fn test_varbind_list_empty_decodes() {
        let mut decoder = Decoder::new(encode_list(&[]));
        assert!(decode_varbind_list(&mut decoder).unwrap().is_empty());
    }

    #[test]
    fn test_varbind_missing_value() {
        // SEQUENCE { OID } with no value
        let mut decoder = Decoder::from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2B, 0x06, 0x01]);
        assert!(VarBind::decode(&mut decoder).is_err());
    }

    #[test]
    fn test_decode_rejects_zero_length_oid() {
        let mut decoder = Decoder::from_slice(&[0x30, 0x04, 0x06, 0x00, 0x05, 0x00]);
        assert!(matches!(
            VarBind::decode(&mut decoder).unwrap_err(),
            Error::Decode {
                kind: DecodeErrorKind::InvalidOidEncoding,
                ..
            }
        ));
    }

    #[test]
    fn test_null_varbinds_rejects_empty() {
        assert!(matches!(
            null_varbinds(&[]).unwrap_err(),
            Error::Encode {
                kind: EncodeErrorKind::EmptyVarBindList
            }
        ));
        assert!(matches!(
            null_varbinds(&[Oid::empty()]).unwrap_err(),
            Error::Encode {
                kind: EncodeErrorKind::EmptyOid
            }
        ));
    }

    #[test]
    fn test_null_varbinds_rejects_single_arc() {
        let oids = [oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), oid!(1)];
        assert!(matches!(
            null_varbinds(&oids).unwrap_err(),
            Error::Encode {
                kind: EncodeErrorKind::OidNotEncodable
            }
        ));
        assert_eq!(null_varbinds(&[oid!(1, 3)]).unwrap().len(), 1);
    }

    #[test]
    fn test_varbind_display() {
        let vb = VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::Integer(42));
        assert_eq!(vb.to_string(), "1.3.6.1.2.1.1.1.0 --> 42");
    }
}
