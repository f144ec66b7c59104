//! BER encoding.
//!
//! Uses a reverse buffer approach: writes from end backwards to avoid
//! needing to pre-calculate lengths.

use super::length::encode_length;
use super::tag;
use crate::error::{EncodeErrorKind, Error, Result};
use bytes::Bytes;

/// Buffer for BER encoding that writes backwards.
///
/// Content is written first, then the length and tag are prepended, so
/// constructed values are pushed in reverse field order.
pub struct EncodeBuf {
    buf: Vec<u8>,
}

impl EncodeBuf {
    /// Create a new encode buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    /// Create a new encode buffer with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Push a single byte (prepends to front).
    pub fn push_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Push multiple bytes (prepends to front, reversed).
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend(bytes.iter().rev());
    }

    /// Push a BER length encoding.
    pub fn push_length(&mut self, len: usize) {
        self.push_bytes(&encode_length(len));
    }

    /// Push a BER tag.
    pub fn push_tag(&mut self, tag: u8) {
        self.buf.push(tag);
    }

    /// Get the current length of encoded data.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Encode a constructed type (SEQUENCE, PDU, etc).
    ///
    /// Calls the closure to encode contents, then wraps with length and tag.
    pub fn push_constructed<F>(&mut self, tag: u8, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let start_len = self.len();
        f(self);
        let content_len = self.len() - start_len;
        self.push_length(content_len);
        self.push_tag(tag);
    }

    /// Encode a SEQUENCE.
    pub fn push_sequence<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Self),
    {
        self.push_constructed(tag::universal::SEQUENCE, f);
    }

    /// Encode a complete TLV from already-encoded content.
    pub fn push_tlv(&mut self, tag: u8, content: &[u8]) {
        self.push_bytes(content);
        self.push_length(content.len());
        self.push_tag(tag);
    }

    /// Encode an INTEGER.
    pub fn push_integer(&mut self, value: i32) {
        self.push_signed(tag::universal::INTEGER, i64::from(value));
    }

    /// Encode a signed value in minimal two's-complement form under `tag`.
    pub fn push_signed(&mut self, tag: u8, value: i64) {
        let (arr, len) = encode_signed_stack(value);
        self.push_tlv(tag, &arr[8 - len..]);
    }

    /// Encode a 64-bit integer (for Counter64).
    pub fn push_integer64(&mut self, value: u64) {
        self.push_unsigned(tag::application::COUNTER64, value);
    }

    /// Encode an unsigned 32-bit integer with a specific tag.
    pub fn push_unsigned32(&mut self, tag: u8, value: u32) {
        self.push_unsigned(tag, u64::from(value));
    }

    /// Encode an unsigned value under `tag`, with a leading zero octet when
    /// the high bit of the first content octet is set.
    pub fn push_unsigned(&mut self, tag: u8, value: u64) {
        let (arr, len) = encode_unsigned_stack(value);
        self.push_tlv(tag, &arr[9 - len..]);
    }

    /// Encode an OCTET STRING.
    pub fn push_octet_string(&mut self, data: &[u8]) {
        self.push_tlv(tag::universal::OCTET_STRING, data);
    }

    /// Encode a NULL.
    pub fn push_null(&mut self) {
        self.push_length(0);
        self.push_tag(tag::universal::NULL);
    }

    /// Encode an OBJECT IDENTIFIER.
    pub fn push_oid(&mut self, oid: &crate::oid::Oid) {
        let ber = oid.to_ber_smallvec();
        self.push_tlv(tag::universal::OBJECT_IDENTIFIER, &ber);
    }

    /// Encode an IP address.
    pub fn push_ip_address(&mut self, addr: [u8; 4]) {
        self.push_tlv(tag::application::IP_ADDRESS, &addr);
    }

    /// Finalize and return the encoded bytes.
    ///
    /// The buffer is reversed to produce the correct order.
    pub fn finish(mut self) -> Bytes {
        self.buf.reverse();
        Bytes::from(self.buf)
    }

    /// Finalize and return as `Vec<u8>`.
    pub fn finish_vec(mut self) -> Vec<u8> {
        self.buf.reverse();
        self.buf
    }
}

impl Default for EncodeBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a dotted IPv4 string into its four octets.
///
/// Exactly four decimal components in 0-255 are required.
///
/// ```
/// use snmp_session::ber::parse_ip_address;
///
/// assert_eq!(parse_ip_address("192.168.1.10").unwrap(), [192, 168, 1, 10]);
/// assert!(parse_ip_address("192.168.1").is_err());
/// assert!(parse_ip_address("192.168.1.256").is_err());
/// ```
pub fn parse_ip_address(dotted: &str) -> Result<[u8; 4]> {
    let mut octets = [0u8; 4];
    let mut parts = dotted.split('.');

    for octet in octets.iter_mut() {
        let part = parts
            .next()
            .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| Error::encode(EncodeErrorKind::InvalidIpAddress))?;
        *octet = part
            .parse()
            .map_err(|_| Error::encode(EncodeErrorKind::InvalidIpAddress))?;
    }

    if parts.next().is_some() {
        return Err(Error::encode(EncodeErrorKind::InvalidIpAddress));
    }

    Ok(octets)
}

/// Encode a signed integer in minimal BER form.
///
/// Returns a stack-allocated array and the number of valid bytes.
/// The valid bytes are at the END of the array.
#[inline]
fn encode_signed_stack(value: i64) -> ([u8; 8], usize) {
    let bytes = value.to_be_bytes();

    let mut start = 0;
    if value >= 0 {
        // Skip leading 0x00 bytes, keeping one if the next byte has its high bit set
        while start < 7 && bytes[start] == 0 && bytes[start + 1] & 0x80 == 0 {
            start += 1;
        }
    } else {
        // Skip leading 0xFF bytes, keeping one if the next byte would read as positive
        while start < 7 && bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0 {
            start += 1;
        }
    }

    (bytes, 8 - start)
}

/// Encode an unsigned integer.
///
/// Returns a stack-allocated array and the number of valid bytes.
/// The valid bytes are at the END of the array.
#[inline]
fn encode_unsigned_stack(value: u64) -> ([u8; 9], usize) {
    let mut result = [0u8; 9];
    if value == 0 {
        return (result, 1);
    }

    result[1..].copy_from_slice(&value.to_be_bytes());
    let leading_zero_bytes = (value.leading_zeros() / 8) as usize;
    let significant = 8 - leading_zero_bytes;

    // A set high bit needs a 0x00 prefix to stay positive
    if result[1 + leading_zero_bytes] & 0x80 != 0 {
        (result, significant + 1)
    } else {
        (result, significant)
    }
}
