//! Output formatting for the CLI tools.
//!
//! Results go to stdout as `oid --> value` lines; diagnostics go to stderr.

use crate::cli::hints;
use crate::{Error, ErrorStatus, VarBind};
use std::io::{self, Write};
use std::time::Duration;

/// How results are rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputContext {
    /// Append the well-known name after the OID, when there is one.
    pub show_hints: bool,
    /// Print a timing summary to stderr.
    pub show_timing: bool,
}

impl OutputContext {
    /// Write one binding as `oid --> value`.
    pub fn write_varbind<W: Write>(&self, w: &mut W, vb: &VarBind) -> io::Result<()> {
        match self.show_hints.then(|| hints::lookup(&vb.oid)).flatten() {
            Some(name) => writeln!(w, "{} ({}) --> {}", vb.oid, name, vb.value),
            None => writeln!(w, "{vb}"),
        }
    }

    /// Write every binding to stdout.
    pub fn write_results(&self, varbinds: &[VarBind]) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        for vb in varbinds {
            self.write_varbind(&mut stdout, vb)?;
        }
        stdout.flush()
    }

    /// Report elapsed time to stderr when timing is enabled.
    pub fn write_timing(&self, count: usize, elapsed: Duration) {
        if self.show_timing {
            eprintln!(
                "{} binding(s) in {:.2}ms",
                count,
                elapsed.as_secs_f64() * 1000.0
            );
        }
    }
}

/// Print an error with a short hint for the common failure modes.
pub fn write_error(err: &Error) {
    eprintln!("Error: {err}");
    let hint = match err {
        Error::Timeout { .. } => Some("check the agent address, port and community"),
        Error::InvalidCommunity { .. } => Some("the agent replied with a different community"),
        Error::Snmp {
            status: ErrorStatus::NoSuchName,
            ..
        } => Some("the agent has no such object (SNMPv1)"),
        Error::Snmp {
            status: ErrorStatus::NoAccess | ErrorStatus::AuthorizationError,
            ..
        } => Some("the community lacks access to this object"),
        _ => None,
    };
    if let Some(hint) = hint {
        eprintln!("Hint: {hint}");
    }
    if let Error::Snmp { oid: Some(oid), .. } = err {
        eprintln!("Failed object: {oid}");
    }
}
