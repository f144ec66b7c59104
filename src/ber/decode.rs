//! BER decoding.
//!
//! Zero-copy decoding using `Bytes` to avoid allocations.

use super::length::decode_length;
use super::tag;
use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use bytes::Bytes;

/// BER decoder that reads from a byte buffer.
///
/// Nested values are read through sub-decoders that share the same
/// underlying buffer; no content is copied until a value is materialized.
pub struct Decoder {
    data: Bytes,
    offset: usize,
}

impl Decoder {
    /// Create a new decoder from bytes.
    pub fn new(data: Bytes) -> Self {
        Self { data, offset: 0 }
    }

    /// Create a decoder from a byte slice (copies the data).
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    fn fail<T>(&self, offset: usize, kind: DecodeErrorKind, msg: &'static str) -> Result<T> {
        tracing::debug!(target: "snmp_session::ber", { snmp.offset = %offset, kind = %kind }, "{}", msg);
        Err(Error::decode(offset, kind))
    }

    /// Get the current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Check if we've reached the end.
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Peek at the next byte without consuming it.
    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Peek at the next tag without consuming it.
    pub fn peek_tag(&self) -> Option<u8> {
        self.peek_byte()
    }

    /// Read a single byte.
    pub fn read_byte(&mut self) -> Result<u8> {
        let Some(byte) = self.peek_byte() else {
            return self.fail(
                self.offset,
                DecodeErrorKind::TruncatedData,
                "truncated data: unexpected end of input",
            );
        };
        self.offset += 1;
        Ok(byte)
    }

    /// Read a tag byte.
    pub fn read_tag(&mut self) -> Result<u8> {
        self.read_byte()
    }

    /// Read a length, validating it against the remaining buffer.
    pub fn read_length(&mut self) -> Result<usize> {
        let rest = self.data.get(self.offset..).unwrap_or_default();
        let (len, consumed) = decode_length(rest, self.offset)?;
        self.offset += consumed;
        if len > self.remaining() {
            return self.fail(
                self.offset,
                DecodeErrorKind::InsufficientData {
                    needed: len,
                    available: self.remaining(),
                },
                "declared length exceeds remaining data",
            );
        }
        Ok(len)
    }

    /// Read raw bytes without copying.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        // Use saturating_add to prevent overflow from bypassing bounds check
        let end = self.offset.saturating_add(len);
        if end > self.data.len() {
            return self.fail(
                self.offset,
                DecodeErrorKind::InsufficientData {
                    needed: len,
                    available: self.remaining(),
                },
                "insufficient data",
            );
        }
        let bytes = self.data.slice(self.offset..end);
        self.offset = end;
        Ok(bytes)
    }

    /// Read and expect a specific tag, returning the content length.
    pub fn expect_tag(&mut self, expected: u8) -> Result<usize> {
        let tag = self.read_tag()?;
        if tag != expected {
            return self.fail(
                self.offset - 1,
                DecodeErrorKind::UnexpectedTag {
                    expected,
                    actual: tag,
                },
                "unexpected tag",
            );
        }
        self.read_length()
    }

    /// Read a BER integer (signed, 32-bit).
    pub fn read_integer(&mut self) -> Result<i32> {
        let len = self.expect_tag(tag::universal::INTEGER)?;
        self.read_integer_value(len)
    }

    /// Read integer value given the length.
    ///
    /// Integers longer than 4 bytes are truncated to their first 4 bytes
    /// with a warning, matching net-snmp.
    pub fn read_integer_value(&mut self, len: usize) -> Result<i32> {
        if len == 0 {
            return self.fail(
                self.offset,
                DecodeErrorKind::ZeroLengthInteger,
                "zero-length integer",
            );
        }
        if len > 4 {
            tracing::warn!(target: "snmp_session::ber", { snmp.offset = %self.offset, length = len }, "integer too long, truncating to 4 bytes");
        }

        let bytes = self.read_bytes(len)?;
        let mut value: i32 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
        for &byte in bytes.iter().take(4) {
            value = (value << 8) | (byte as i32);
        }

        Ok(value)
    }

    /// Read a signed INTEGER of up to 64 bits.
    pub fn read_i64(&mut self) -> Result<i64> {
        let len = self.expect_tag(tag::universal::INTEGER)?;
        self.read_i64_value(len)
    }

    /// Read a signed 64-bit value given the length.
    ///
    /// Unlike [`read_integer_value`](Self::read_integer_value) this does not
    /// truncate: more than 8 content bytes is an overflow.
    pub fn read_i64_value(&mut self, len: usize) -> Result<i64> {
        let start = self.offset;
        let bytes = self.read_bytes(len)?;
        decode_signed(&bytes).map_err(|_| {
            let kind = if len == 0 {
                DecodeErrorKind::ZeroLengthInteger
            } else {
                DecodeErrorKind::IntegerOverflow
            };
            tracing::debug!(target: "snmp_session::ber", { snmp.offset = %start, kind = %kind }, "signed integer out of range");
            Error::decode(start, kind)
        })
    }

    /// Read a 64-bit unsigned integer (Counter64).
    pub fn read_integer64(&mut self, expected_tag: u8) -> Result<u64> {
        let len = self.expect_tag(expected_tag)?;
        self.read_integer64_value(len)
    }

    /// Read 64-bit unsigned integer value given the length.
    pub fn read_integer64_value(&mut self, len: usize) -> Result<u64> {
        if len == 0 {
            return self.fail(
                self.offset,
                DecodeErrorKind::ZeroLengthInteger,
                "zero-length integer",
            );
        }
        if len > 9 {
            // 9 bytes max: 1 leading zero + 8 bytes for u64
            return self.fail(
                self.offset,
                DecodeErrorKind::Integer64TooLong { length: len },
                "integer64 too long",
            );
        }

        let bytes = self.read_bytes(len)?;
        Ok(bytes
            .iter()
            .fold(0u64, |acc, &byte| (acc << 8) | byte as u64))
    }

    /// Read an unsigned 32-bit integer with specific tag.
    pub fn read_unsigned32(&mut self, expected_tag: u8) -> Result<u32> {
        let len = self.expect_tag(expected_tag)?;
        self.read_unsigned32_value(len)
    }

    /// Read unsigned 32-bit integer value given length.
    pub fn read_unsigned32_value(&mut self, len: usize) -> Result<u32> {
        if len == 0 {
            return self.fail(
                self.offset,
                DecodeErrorKind::ZeroLengthInteger,
                "zero-length integer",
            );
        }
        if len > 5 {
            // 5 bytes max: 1 leading zero + 4 bytes for u32
            tracing::warn!(target: "snmp_session::ber", { snmp.offset = %self.offset, length = len }, "unsigned integer too long, truncating to 4 bytes");
        }

        let bytes = self.read_bytes(len)?;
        Ok(bytes
            .iter()
            .take(5)
            .fold(0u32, |acc, &byte| (acc << 8) | byte as u32))
    }

    /// Read an OCTET STRING.
    pub fn read_octet_string(&mut self) -> Result<Bytes> {
        let len = self.expect_tag(tag::universal::OCTET_STRING)?;
        self.read_bytes(len)
    }

    /// Read a NULL.
    pub fn read_null(&mut self) -> Result<()> {
        let len = self.expect_tag(tag::universal::NULL)?;
        if len != 0 {
            return self.fail(
                self.offset,
                DecodeErrorKind::InvalidNull,
                "NULL with non-zero length",
            );
        }
        Ok(())
    }

    /// Read an OBJECT IDENTIFIER.
    pub fn read_oid(&mut self) -> Result<Oid> {
        let len = self.expect_tag(tag::universal::OBJECT_IDENTIFIER)?;
        self.read_oid_value(len)
    }

    /// Read an OID given a pre-read length.
    pub fn read_oid_value(&mut self, len: usize) -> Result<Oid> {
        let start = self.offset;
        let bytes = self.read_bytes(len)?;
        Oid::from_ber(&bytes).map_err(|e| match e {
            Error::Decode { offset, kind } => Error::decode(start + offset, kind),
            other => other,
        })
    }

    /// Read a SEQUENCE, returning a decoder for its contents.
    pub fn read_sequence(&mut self) -> Result<Decoder> {
        self.read_constructed(tag::universal::SEQUENCE)
    }

    /// Read a constructed type with a specific tag, returning a decoder for its contents.
    pub fn read_constructed(&mut self, expected_tag: u8) -> Result<Decoder> {
        let len = self.expect_tag(expected_tag)?;
        self.sub_decoder(len)
    }

    /// Read an IP address.
    pub fn read_ip_address(&mut self) -> Result<[u8; 4]> {
        let len = self.expect_tag(tag::application::IP_ADDRESS)?;
        self.read_ip_address_value(len)
    }

    /// Read an IP address given a pre-read length.
    pub fn read_ip_address_value(&mut self, len: usize) -> Result<[u8; 4]> {
        if len != 4 {
            return self.fail(
                self.offset,
                DecodeErrorKind::InvalidIpAddressLength { length: len },
                "IP address must be 4 bytes",
            );
        }
        let bytes = self.read_bytes(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Read one complete TLV, returning its tag and the raw encoding
    /// (tag and length octets included).
    pub fn read_tlv(&mut self) -> Result<(u8, Bytes)> {
        let start = self.offset;
        let tag = self.read_tag()?;
        let len = self.read_length()?;
        self.read_bytes(len)?;
        Ok((tag, self.data.slice(start..self.offset)))
    }

    /// Skip a TLV (tag-length-value) without parsing.
    pub fn skip_tlv(&mut self) -> Result<()> {
        let _tag = self.read_tag()?;
        let len = self.read_length()?;
        // Use saturating_add and check BEFORE modifying offset to prevent overflow
        let new_offset = self.offset.saturating_add(len);
        if new_offset > self.data.len() {
            return self.fail(
                self.offset,
                DecodeErrorKind::TlvOverflow,
                "TLV extends past end of data",
            );
        }
        self.offset = new_offset;
        Ok(())
    }

    /// Create a sub-decoder for a portion of the remaining data.
    pub fn sub_decoder(&mut self, len: usize) -> Result<Decoder> {
        let content = self.read_bytes(len)?;
        Ok(Decoder::new(content))
    }

    /// Get the underlying bytes for the entire buffer.
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Get remaining data as a slice.
    pub fn remaining_slice(&self) -> &[u8] {
        self.data.get(self.offset..).unwrap_or_default()
    }
}

/// Decode two's-complement content octets into an `i64`.
///
/// Non-minimal encodings are accepted; at most 8 significant octets fit.
pub fn decode_signed(content: &[u8]) -> Result<i64> {
    let Some(&first) = content.first() else {
        return Err(Error::decode(0, DecodeErrorKind::ZeroLengthInteger));
    };

    let fill: u8 = if first & 0x80 != 0 { 0xFF } else { 0x00 };
    // Redundant sign-extension octets carry no value
    let skip = content
        .iter()
        .take(content.len() - 1)
        .take_while(|&&b| b == fill)
        .count();
    let significant = &content[skip..];
    if significant.len() > 8 {
        return Err(Error::decode(0, DecodeErrorKind::IntegerOverflow));
    }
    let sign_ok = (significant[0] & 0x80 != 0) == (fill == 0xFF);
    if significant.len() == 8 && !sign_ok {
        return Err(Error::decode(0, DecodeErrorKind::IntegerOverflow));
    }

    let mut bytes = [fill; 8];
    bytes[8 - significant.len()..].copy_from_slice(significant);
    Ok(i64::from_be_bytes(bytes))
}

/// Decode unsigned content octets into a `u64`.
///
/// A single leading zero octet beyond 8 bytes is tolerated.
pub fn decode_unsigned(content: &[u8]) -> Result<u64> {
    if content.is_empty() {
        return Err(Error::decode(0, DecodeErrorKind::ZeroLengthInteger));
    }
    let skip = content
        .iter()
        .take(content.len() - 1)
        .take_while(|&&b| b == 0)
        .count();
    let significant = &content[skip..];
    if significant.len() > 8 {
        return Err(Error::decode(0, DecodeErrorKind::IntegerOverflow));
    }
    Ok(significant
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64))
}
