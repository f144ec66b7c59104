//! Object Identifier (OID) type.
//!
//! OIDs are stored as `SmallVec<[u32; 16]>` to avoid heap allocation for common OIDs.
//! Two textual forms are understood: the dotted form with a leading dot
//! (`.1.3.6.1.2.1`, see [`Oid::to_dotted`]) and the bare form used by `Display`
//! (`1.3.6.1.2.1`). Both parse with [`Oid::parse`].

use crate::error::{DecodeErrorKind, EncodeErrorKind, Error, OidErrorKind, Result};
use smallvec::SmallVec;
use std::fmt;

/// Maximum number of arcs (subidentifiers) allowed in an OID.
///
/// Per RFC 2578 Section 3.5: "there are at most 128 sub-identifiers in a value".
/// Enforced during BER decoding via [`Oid::from_ber()`].
pub const MAX_OID_LEN: usize = 128;

/// Object Identifier.
///
/// Stored as a sequence of arc values (u32). Uses SmallVec to avoid
/// heap allocation for OIDs with 16 or fewer arcs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from arc values.
    ///
    /// ```
    /// use snmp_session::oid::Oid;
    ///
    /// let oid = Oid::new([1, 3, 6, 1]);
    /// assert_eq!(oid.len(), 4);
    /// ```
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse an OID from dotted notation.
    ///
    /// One leading `.` is discarded, then every remaining component must be a
    /// decimal number that fits in 32 bits. Empty components (`1..3`), signs,
    /// and an empty result are rejected.
    ///
    /// This does **not** check the X.690 arc constraints; call
    /// [`validate()`](Self::validate) for that.
    ///
    /// ```
    /// use snmp_session::oid::Oid;
    ///
    /// let a = Oid::parse(".1.3.6.1.2.1").unwrap();
    /// let b = Oid::parse("1.3.6.1.2.1").unwrap();
    /// assert_eq!(a, b);
    ///
    /// assert!(Oid::parse("").is_err());
    /// assert!(Oid::parse("1.3.x").is_err());
    /// assert!(Oid::parse("1..3").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let body = s.strip_prefix('.').unwrap_or(s);
        if body.is_empty() {
            return Err(Error::invalid_oid_with_input(OidErrorKind::Empty, s));
        }

        let mut arcs = SmallVec::new();
        for part in body.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s));
            }
            let arc: u32 = part
                .parse()
                .map_err(|_| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;
            arcs.push(arc);
        }

        Ok(Self { arcs })
    }

    /// Format with a leading dot before every arc (`.1.3.6.1`).
    ///
    /// Fails with [`EncodeErrorKind::EmptyOid`] for an empty OID.
    pub fn to_dotted(&self) -> Result<String> {
        if self.arcs.is_empty() {
            return Err(Error::encode(EncodeErrorKind::EmptyOid));
        }
        let mut out = String::with_capacity(self.arcs.len() * 4);
        for arc in &self.arcs {
            out.push('.');
            out.push_str(&arc.to_string());
        }
        Ok(out)
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Check if this OID starts with another OID.
    ///
    /// An OID always starts with itself, and any OID starts with an empty OID.
    pub fn starts_with(&self, other: &Oid) -> bool {
        is_prefix(&other.arcs, &self.arcs)
    }

    /// Check if this OID is a prefix of (or equal to) `other`.
    ///
    /// This is the subtree membership test used by walks: `other` lies at or
    /// below `self` in the MIB tree.
    pub fn is_prefix_of(&self, other: &Oid) -> bool {
        is_prefix(&self.arcs, &other.arcs)
    }

    /// Get the parent OID (all arcs except the last).
    ///
    /// Returns `None` if the OID is empty.
    pub fn parent(&self) -> Option<Oid> {
        let (_, rest) = self.arcs.split_last()?;
        Some(Oid::from_slice(rest))
    }

    /// Create a child OID by appending an arc.
    pub fn child(&self, arc: u32) -> Oid {
        let mut arcs = self.arcs.clone();
        arcs.push(arc);
        Oid { arcs }
    }

    /// Validate OID arcs per X.690 Section 8.19.4.
    ///
    /// - arc1 must be 0, 1, or 2
    /// - arc2 must be <= 39 when arc1 is 0 or 1
    pub fn validate(&self) -> Result<()> {
        let Some(&arc1) = self.arcs.first() else {
            return Ok(());
        };

        if arc1 > 2 {
            return Err(Error::invalid_oid(OidErrorKind::InvalidFirstArc(arc1)));
        }

        if let Some(&arc2) = self.arcs.get(1)
            && arc1 < 2
            && arc2 >= 40
        {
            return Err(Error::invalid_oid(OidErrorKind::InvalidSecondArc {
                first: arc1,
                second: arc2,
            }));
        }

        if self.arcs.len() > MAX_OID_LEN {
            return Err(Error::invalid_oid(OidErrorKind::TooManyArcs {
                count: self.arcs.len(),
                max: MAX_OID_LEN,
            }));
        }

        Ok(())
    }

    /// Encode to BER format, returning bytes in a stack-allocated buffer.
    ///
    /// OID encoding (X.690 Section 8.19):
    /// - First two arcs encoded as (arc1 * 40) + arc2 using base-128
    /// - Remaining arcs encoded as base-128 variable length
    ///
    /// Empty OIDs encode as empty content. Arc constraints are not checked here;
    /// see [`to_ber_checked()`](Self::to_ber_checked).
    pub fn to_ber_smallvec(&self) -> SmallVec<[u8; 64]> {
        let mut bytes = SmallVec::new();

        match self.arcs.as_slice() {
            [] => {}
            [first] => encode_subidentifier(&mut bytes, u64::from(*first) * 40),
            [first, second, rest @ ..] => {
                // arc2 can exceed 127 when arc1 = 2, so the packed value may span bytes
                let packed = u64::from(*first) * 40 + u64::from(*second);
                encode_subidentifier(&mut bytes, packed);
                for &arc in rest {
                    encode_subidentifier(&mut bytes, u64::from(arc));
                }
            }
        }

        bytes
    }

    /// Encode to BER format.
    pub fn to_ber(&self) -> Vec<u8> {
        self.to_ber_smallvec().to_vec()
    }

    /// Encode to BER format with validation.
    ///
    /// Fails for empty OIDs, for single-arc OIDs (the first subidentifier
    /// packs two arcs, so `1` would read back as `1.0`) and for arcs that
    /// violate X.690 Section 8.19.4.
    pub fn to_ber_checked(&self) -> Result<Vec<u8>> {
        self.check_encodable()?;
        Ok(self.to_ber())
    }

    /// Check that this OID survives a BER round trip unchanged.
    pub(crate) fn check_encodable(&self) -> Result<()> {
        if self.arcs.is_empty() {
            return Err(Error::encode(EncodeErrorKind::EmptyOid));
        }
        if self.arcs.len() < 2 {
            return Err(Error::encode(EncodeErrorKind::OidNotEncodable));
        }
        self.validate()
            .map_err(|_| Error::encode(EncodeErrorKind::OidNotEncodable))
    }

    /// Decode from BER format.
    ///
    /// Enforces [`MAX_OID_LEN`] per RFC 2578 Section 3.5. A continuation
    /// sequence that runs past the end of `data` fails with
    /// [`DecodeErrorKind::TruncatedData`].
    pub fn from_ber(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::empty());
        }

        let mut arcs = SmallVec::new();

        let (first_subid, consumed) = decode_subidentifier(data, 0)?;

        let (arc1, arc2) = match first_subid {
            0..40 => (0, first_subid),
            40..80 => (1, first_subid - 40),
            _ => (2, first_subid - 80),
        };
        arcs.push(arc1);
        arcs.push(narrow_arc(arc2, 0)?);

        let mut i = consumed;
        while i < data.len() {
            let (arc, bytes_consumed) = decode_subidentifier(&data[i..], i)?;
            arcs.push(narrow_arc(arc, i)?);
            i += bytes_consumed;

            if arcs.len() > MAX_OID_LEN {
                return Err(Error::decode(
                    i,
                    DecodeErrorKind::OidTooLong {
                        count: arcs.len(),
                        max: MAX_OID_LEN,
                    },
                ));
            }
        }

        Ok(Self { arcs })
    }
}

/// True iff `candidate` is a prefix of (or equal to) `of`.
///
/// ```
/// use snmp_session::oid::is_prefix;
///
/// assert!(is_prefix(&[1, 3, 6], &[1, 3, 6, 1, 2, 1]));
/// assert!(!is_prefix(&[1, 3, 6, 1, 2, 1], &[1, 3, 6]));
/// assert!(is_prefix(&[1, 3, 6], &[1, 3, 6]));
/// ```
pub fn is_prefix(candidate: &[u32], of: &[u32]) -> bool {
    candidate.len() <= of.len() && of[..candidate.len()] == *candidate
}

#[inline]
fn narrow_arc(value: u64, offset: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::decode(offset, DecodeErrorKind::IntegerOverflow))
}

/// Encode a subidentifier in base-128 variable length, minimal form.
#[inline]
fn encode_subidentifier(bytes: &mut SmallVec<[u8; 64]>, value: u64) {
    if value == 0 {
        bytes.push(0);
        return;
    }

    let mut count = 0;
    let mut temp = value;
    while temp > 0 {
        count += 1;
        temp >>= 7;
    }

    for i in (0..count).rev() {
        let mut byte = ((value >> (i * 7)) & 0x7F) as u8;
        if i > 0 {
            byte |= 0x80;
        }
        bytes.push(byte);
    }
}

/// Decode a subidentifier, returning (value, bytes_consumed).
fn decode_subidentifier(data: &[u8], base_offset: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut i = 0;

    loop {
        let Some(&byte) = data.get(i) else {
            return Err(Error::decode(
                base_offset + i,
                DecodeErrorKind::TruncatedData,
            ));
        };
        i += 1;

        // Leading 0x80 pads the value with zero bits (X.690 8.19.2)
        if i == 1 && byte == 0x80 {
            return Err(Error::decode(
                base_offset,
                DecodeErrorKind::InvalidOidEncoding,
            ));
        }

        if value > (u64::MAX >> 7) {
            return Err(Error::decode(
                base_offset + i,
                DecodeErrorKind::IntegerOverflow,
            ));
        }

        value = (value << 7) | u64::from(byte & 0x7F);

        if byte & 0x80 == 0 {
            break;
        }
    }

    Ok((value, i))
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self::from_slice(arcs)
    }
}

impl<const N: usize> From<[u32; N]> for Oid {
    fn from(arcs: [u32; N]) -> Self {
        Self::new(arcs)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arcs.cmp(&other.arcs)
    }
}

/// Macro to create an OID from literal arcs.
///
/// ```
/// use snmp_session::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert_eq!(sys_descr.to_string(), "1.3.6.1.2.1.1.1.0");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse() {
        let oid = Oid::parse("1.3.6.1.2.1.1.1.0").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 2, 1, 1, 1, 0]);
    }

    #[test]
    fn test_parse_leading_dot() {
        let oid = Oid::parse(".1.3.6.1.2.1").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 2, 1]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", ".", "1..3", "1.3.", "1.-3", "1.+3", "a.b", "1.3.99999999999"] {
            let err = Oid::parse(input).unwrap_err();
            assert!(
                matches!(err, Error::InvalidOid { .. }),
                "{input:?} gave {err:?}"
            );
        }
        assert!(matches!(
            Oid::parse("").unwrap_err(),
            Error::InvalidOid {
                kind: OidErrorKind::Empty,
                ..
            }
        ));
    }

    #[test]
    fn test_to_dotted() {
        let oid = oid!(1, 3, 6, 1, 2, 1);
        assert_eq!(oid.to_dotted().unwrap(), ".1.3.6.1.2.1");
        assert!(matches!(
            Oid::empty().to_dotted().unwrap_err(),
            Error::Encode {
                kind: EncodeErrorKind::EmptyOid
            }
        ));
    }

    #[test]
    fn test_display() {
        let oid = Oid::from_slice(&[1, 3, 6, 1, 2, 1, 1, 1, 0]);
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.1.0");
    }

    #[test]
    fn test_prefix() {
        assert!(is_prefix(&[1, 3, 6], &[1, 3, 6, 1, 2, 1]));
        assert!(!is_prefix(&[1, 3, 6, 1, 2, 1], &[1, 3, 6]));
        assert!(is_prefix(&[], &[1, 3]));
        assert!(!is_prefix(&[1, 3, 7], &[1, 3, 6, 1]));

        let oid = Oid::parse("1.3.6.1.2.1.1.1.0").unwrap();
        let head = Oid::parse("1.3.6.1").unwrap();
        assert!(oid.starts_with(&head));
        assert!(head.is_prefix_of(&oid));
        assert!(!oid.is_prefix_of(&head));
    }

    #[test]
    fn test_parent_and_child() {
        let system = oid!(1, 3, 6, 1, 2, 1, 1);
        assert_eq!(system.child(5).child(0), oid!(1, 3, 6, 1, 2, 1, 1, 5, 0));
        assert_eq!(system.parent(), Some(oid!(1, 3, 6, 1, 2, 1)));
        assert!(Oid::empty().parent().is_none());
    }

    #[test]
    fn test_ber_encoding() {
        // 1.3.6.1 encodes as: (1*40+3)=43, 6, 1 = [0x2B, 0x06, 0x01]
        let oid = Oid::parse("1.3.6.1").unwrap();
        assert_eq!(oid.to_ber(), vec![0x2B, 0x06, 0x01]);
    }

    #[test]
    fn test_ber_multibyte_subidentifiers() {
        // 1.3.6.1.4.1.2021 -> 2021 = 0x0F 0x65 in base-128
        let oid = oid!(1, 3, 6, 1, 4, 1, 2021);
        assert_eq!(
            oid.to_ber(),
            vec![0x2B, 0x06, 0x01, 0x04, 0x01, 0x8F, 0x65]
        );

        // u32::MAX needs five bytes
        let oid = oid!(1, 3, u32::MAX);
        assert_eq!(oid.to_ber(), vec![0x2B, 0x8F, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert_eq!(Oid::from_ber(&oid.to_ber()).unwrap(), oid);
    }

    #[test]
    fn test_ber_large_arc2() {
        // 2.999.3: first subid = 2*40 + 999 = 1079 = 0x88 0x37
        let oid = oid!(2, 999, 3);
        assert_eq!(oid.to_ber(), vec![0x88, 0x37, 0x03]);
        assert_eq!(Oid::from_ber(&[0x88, 0x37, 0x03]).unwrap(), oid);
    }

    #[test]
    fn test_from_ber_truncated_continuation() {
        let err = Oid::from_ber(&[0x2B, 0x06, 0x81]).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::TruncatedData,
                ..
            }
        ));
    }

    #[test]
    fn test_from_ber_arc_overflow() {
        // Six 7-bit groups exceed 32 bits
        let err = Oid::from_ber(&[0x2B, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::IntegerOverflow,
                ..
            }
        ));
    }

    #[test]
    fn test_from_ber_enforces_max_oid_len() {
        let mut data = vec![0x2B];
        data.extend(std::iter::repeat_n(0x01, MAX_OID_LEN));
        let err = Oid::from_ber(&data).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                kind: DecodeErrorKind::OidTooLong { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_validate() {
        assert!(oid!(1, 3, 6, 1).validate().is_ok());
        assert!(oid!(2, 999).validate().is_ok());
        assert!(oid!(3, 0).validate().is_err());
        assert!(oid!(0, 40).validate().is_err());
        assert!(oid!(1, 39).validate().is_ok());
        assert!(oid!(3, 0).to_ber_checked().is_err());
        assert!(Oid::empty().to_ber_checked().is_err());
    }

    #[test]
    fn test_from_ber_rejects_padded_subidentifier() {
        // 0x80 0x06 would be a second, non-minimal spelling of arc 6
        let err = Oid::from_ber(&[0x2B, 0x80, 0x06]).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode {
                offset: 1,
                kind: DecodeErrorKind::InvalidOidEncoding,
            }
        ));
        assert!(Oid::from_ber(&[0x80, 0x2B]).is_err());
        assert_eq!(Oid::from_ber(&[0x2B, 0x81, 0x00]).unwrap(), oid!(1, 3, 128));
    }

    #[test]
    fn test_single_arc_not_encodable() {
        // Plain to_ber packs `1` as 0x28, which decodes as 1.0
        assert_eq!(Oid::from_ber(&oid!(1).to_ber()).unwrap(), oid!(1, 0));
        assert!(matches!(
            oid!(1).to_ber_checked().unwrap_err(),
            Error::Encode {
                kind: EncodeErrorKind::OidNotEncodable
            }
        ));
        assert_eq!(oid!(1, 0).to_ber_checked().unwrap(), vec![0x28]);
    }

    #[test]
    fn test_ordering() {
        let a = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
        let b = oid!(1, 3, 6, 1, 2, 1, 1, 2, 0);
        let c = oid!(1, 3, 6, 1, 2, 1, 1, 1);
        assert!(a < b);
        assert!(c < a);
    }

    fn arb_oid() -> impl Strategy<Value = Vec<u32>> {
        (0u32..=2, 0u32..40, prop::collection::vec(any::<u32>(), 0..20)).prop_map(
            |(a, b, rest)| {
                let mut arcs = vec![a, b];
                arcs.extend(rest);
                arcs
            },
        )
    }

    proptest! {
        #[test]
        fn prop_ber_roundtrip(arcs in arb_oid()) {
            let oid = Oid::new(arcs);
            prop_assert_eq!(Oid::from_ber(&oid.to_ber()).unwrap(), oid);
        }

        #[test]
        fn prop_dotted_roundtrip(arcs in arb_oid()) {
            let oid = Oid::new(arcs);
            let dotted = oid.to_dotted().unwrap();
            prop_assert_eq!(Oid::parse(&dotted).unwrap().to_dotted().unwrap(), dotted.clone());
            prop_assert_eq!(Oid::parse(&dotted[1..]).unwrap(), oid);
        }

        #[test]
        fn prop_from_ber_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = Oid::from_ber(&data);
        }
    }
}
