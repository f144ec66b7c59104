//! BER length encoding and decoding.
//!
//! Length encoding follows X.690 Section 8.1.3:
//! - Short form: Single byte, bit 8=0, value 0-127
//! - Long form: Initial byte (bit 8=1, bits 7-1=count), followed by length bytes
//! - Indefinite form (0x80): Rejected

use crate::error::{DecodeErrorKind, Error, Result};
use smallvec::SmallVec;

/// Maximum length accepted on decode.
///
/// 2MB is far larger than any realistic SNMP message. Values above it are
/// treated as malformed rather than trusted for allocation.
pub const MAX_LENGTH: usize = 0x200000;

/// Encode a length in wire order.
///
/// Short form for lengths up to 127; otherwise `0x80 | k` followed by the
/// minimal `k` big-endian octets. Any `usize` is representable.
///
/// ```
/// use snmp_session::ber::encode_length;
///
/// assert_eq!(&encode_length(127)[..], &[0x7F]);
/// assert_eq!(&encode_length(128)[..], &[0x81, 0x80]);
/// assert_eq!(&encode_length(256)[..], &[0x82, 0x01, 0x00]);
/// ```
pub fn encode_length(len: usize) -> SmallVec<[u8; 9]> {
    let mut out = SmallVec::new();

    if len <= 127 {
        out.push(len as u8);
        return out;
    }

    let be = len.to_be_bytes();
    let skip = be.iter().take_while(|&&b| b == 0).count();
    let significant = &be[skip..];

    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
    out
}

/// Number of bytes [`encode_length`] produces for `len`.
#[inline]
pub fn length_encoded_len(len: usize) -> usize {
    if len <= 127 {
        1
    } else {
        let bits = usize::BITS - len.leading_zeros();
        1 + bits.div_ceil(8) as usize
    }
}

/// Decode a length from bytes, returning (length, bytes_consumed).
///
/// The `base_offset` parameter is used to report error offsets correctly
/// when this is called from within a decoder.
pub fn decode_length(data: &[u8], base_offset: usize) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    if first == 0x80 {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::IndefiniteLength,
        ));
    }

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    // 0xFF is reserved for future extension (X.690 8.1.3.5)
    if first == 0xFF {
        return Err(Error::decode(base_offset, DecodeErrorKind::InvalidLength));
    }

    let num_octets = (first & 0x7F) as usize;

    if num_octets > 4 {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthTooLong { octets: num_octets },
        ));
    }

    let Some(octets) = data.get(1..1 + num_octets) else {
        return Err(Error::decode(base_offset, DecodeErrorKind::TruncatedData));
    };

    let len = octets
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize);

    if len > MAX_LENGTH {
        return Err(Error::decode(
            base_offset,
            DecodeErrorKind::LengthExceedsMax {
                length: len,
                max: MAX_LENGTH,
            },
        ));
    }

    Ok((len, 1 + num_octets))
}
