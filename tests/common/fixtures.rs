//! Common test fixtures and constants.

use snmp_session::{Oid, Value, oid};

pub const COMMUNITY: &[u8] = b"public";

/// Timeout for exchanges that are expected to be answered.
pub const FAST_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(500);

pub fn sys_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)
}
pub fn sys_uptime() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}
pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}
pub fn sys_location() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 6, 0)
}

/// System subtree root: 1.3.6.1.2.1.1
pub fn system_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1)
}

/// Nonexistent OID for error-status and exception tests.
pub fn nonexistent_oid() -> Oid {
    oid!(1, 3, 6, 1, 99, 99, 99, 0)
}

/// Small system group followed by one object outside it.
pub fn system_mib() -> Vec<(Oid, Value)> {
    vec![
        (sys_descr(), Value::from("test agent")),
        (sys_uptime(), Value::TimeTicks(4242)),
        (sys_name(), Value::from("core-1")),
        (sys_location(), Value::from("rack 7")),
        (oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(2)),
    ]
}
