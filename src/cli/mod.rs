//! Shared pieces of the `snmp-get` and `snmp-walk` tools.
//!
//! Only available with the `cli` feature.

pub mod args;
pub mod hints;
pub mod output;
