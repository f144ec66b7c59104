//! BER (Basic Encoding Rules) codec for SNMP.
//!
//! This module provides encoding and decoding of BER-encoded data as used in SNMP.
//! The implementation follows X.690 with permissive parsing aligned with net-snmp behavior.

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
pub use tag::Tag;

use crate::error::Result;
use crate::oid::Oid;
use bytes::Bytes;

/// A type with a single BER representation.
///
/// Implemented once per wire type (`Oid`, `Value`, `VarBind`, `Pdu`, ...), so
/// generic code can move any of them through [`encode_item`] and
/// [`decode_item`].
pub trait Codec: Sized {
    /// Append this value to a reverse encode buffer.
    fn encode(&self, buf: &mut EncodeBuf);

    /// Read one value from the decoder.
    fn decode(decoder: &mut Decoder) -> Result<Self>;
}

/// Encode one item into a standalone buffer.
pub fn encode_item<C: Codec>(item: &C) -> Bytes {
    let mut buf = EncodeBuf::new();
    item.encode(&mut buf);
    buf.finish()
}

/// Decode one item from the front of `data`.
pub fn decode_item<C: Codec>(data: impl Into<Bytes>) -> Result<C> {
    let mut decoder = Decoder::new(data.into());
    C::decode(&mut decoder)
}

impl Codec for Oid {
    fn encode(&self, buf: &mut EncodeBuf) {
        buf.push_oid(self);
    }

    fn decode(decoder: &mut Decoder) -> Result<Self> {
        decoder.read_oid()
    }
}

/// Decode two BER-encoded OBJECT IDENTIFIER TLVs and test whether the
/// first is a prefix of (or equal to) the second.
///
/// ```
/// use snmp_session::ber::{encode_item, oid_prefix_check};
/// use snmp_session::oid;
///
/// let head = encode_item(&oid!(1, 3, 6, 1, 2, 1, 1));
/// let inside = encode_item(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0));
/// let outside = encode_item(&oid!(1, 3, 6, 1, 2, 1, 2, 1, 0));
///
/// assert!(oid_prefix_check(&head, &inside).unwrap());
/// assert!(!oid_prefix_check(&head, &outside).unwrap());
/// ```
pub fn oid_prefix_check(enc_a: &[u8], enc_b: &[u8]) -> Result<bool> {
    let a = Decoder::from_slice(enc_a).read_oid()?;
    let b = Decoder::from_slice(enc_b).read_oid()?;
    Ok(crate::oid::is_prefix(a.arcs(), b.arcs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    #[test]
    fn test_oid_item_roundtrip() {
        let oid = oid!(1, 3, 6, 1, 4, 1, 9, 9, 42);
        let encoded = encode_item(&oid);
        assert_eq!(encoded[0], tag::universal::OBJECT_IDENTIFIER);
        assert_eq!(decode_item::<Oid>(encoded).unwrap(), oid);
    }

    #[test]
    fn test_prefix_check_equal_and_reversed() {
        let short = encode_item(&oid!(1, 3, 6));
        let long = encode_item(&oid!(1, 3, 6, 1, 2, 1));
        assert!(oid_prefix_check(&short, &short).unwrap());
        assert!(oid_prefix_check(&short, &long).unwrap());
        assert!(!oid_prefix_check(&long, &short).unwrap());
    }

    #[test]
    fn test_prefix_check_rejects_non_oid() {
        let short = encode_item(&oid!(1, 3, 6));
        assert!(oid_prefix_check(&[0x02, 0x01, 0x01], &short).is_err());
        assert!(oid_prefix_check(&short, &[0x06, 0x05, 0x2B]).is_err());
    }
}
