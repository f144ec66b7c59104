//! Names for a handful of well-known OIDs.
//!
//! Not MIB support: a fixed table used to accept `sysDescr.0` style
//! arguments and to annotate output.

use crate::Oid;

static WELL_KNOWN: &[(&[u32], &str)] = &[
    (&[1, 3, 6, 1, 2, 1, 1], "system"),
    (&[1, 3, 6, 1, 2, 1, 1, 1, 0], "sysDescr.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 2, 0], "sysObjectID.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 3, 0], "sysUpTime.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 4, 0], "sysContact.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 5, 0], "sysName.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 6, 0], "sysLocation.0"),
    (&[1, 3, 6, 1, 2, 1, 1, 7, 0], "sysServices.0"),
    (&[1, 3, 6, 1, 2, 1, 2], "interfaces"),
    (&[1, 3, 6, 1, 2, 1, 2, 1, 0], "ifNumber.0"),
    (&[1, 3, 6, 1, 2, 1, 2, 2], "ifTable"),
    (&[1, 3, 6, 1, 2, 1, 4], "ip"),
    (&[1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0], "snmpTrapOID.0"),
];

/// Name for an exact OID match.
pub fn lookup(oid: &Oid) -> Option<&'static str> {
    let arcs = oid.arcs();
    WELL_KNOWN
        .iter()
        .find(|(known, _)| *known == arcs)
        .map(|(_, name)| *name)
}

/// Parse a dotted OID (leading dot optional) or a well-known name.
pub fn parse_oid(s: &str) -> Result<Oid, String> {
    let dotted = s.strip_prefix('.').unwrap_or(s);
    if dotted.starts_with(|c: char| c.is_ascii_digit()) {
        return Oid::parse(dotted).map_err(|e| format!("invalid OID '{s}': {e}"));
    }

    WELL_KNOWN
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(s))
        .map(|(arcs, _)| Oid::from_slice(arcs))
        .ok_or_else(|| {
            format!("unknown OID name '{s}'; use dotted notation (e.g. 1.3.6.1.2.1.1.1.0)")
        })
}
