//! Command-line arguments shared by the `snmp-*` tools.

use crate::client::SessionBuilder;
use crate::{Session, Version};
use clap::{Args, ValueEnum};
use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;

/// SNMP version as spelled on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SnmpVersion {
    #[value(name = "1")]
    V1,
    #[default]
    #[value(name = "2c")]
    V2c,
}

impl From<SnmpVersion> for Version {
    fn from(v: SnmpVersion) -> Self {
        match v {
            SnmpVersion::V1 => Version::V1,
            SnmpVersion::V2c => Version::V2c,
        }
    }
}

/// Agent, community and request settings.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// Agent address (host or host:port).
    #[arg(value_name = "AGENT")]
    pub target: String,

    /// Community string.
    #[arg(value_name = "COMMUNITY")]
    pub community: String,

    /// Agent UDP port, overriding any port in AGENT.
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Retries after a timeout.
    #[arg(short = 'r', long, default_value_t = 3)]
    pub retries: u32,

    /// Seconds to wait for each reply.
    #[arg(short = 't', long, default_value_t = 5.0, value_name = "SECONDS")]
    pub timeout: f64,

    /// SNMP version.
    #[arg(short = 'v', long = "version", value_enum, default_value = "2c")]
    pub snmp_version: SnmpVersion,
}

impl CommonArgs {
    /// Per-attempt timeout, rejecting zero, negative and non-finite values.
    pub fn timeout_duration(&self) -> Result<Duration, String> {
        match Duration::try_from_secs_f64(self.timeout) {
            Ok(d) if !d.is_zero() => Ok(d),
            _ => Err(format!("invalid timeout '{}'", self.timeout)),
        }
    }

    /// Agent address with the `--port` override applied.
    pub fn target_string(&self) -> String {
        let Some(port) = self.port else {
            return self.target.clone();
        };
        if let Ok(mut addr) = self.target.parse::<SocketAddr>() {
            addr.set_port(port);
            return addr.to_string();
        }
        let host = self.target.trim_start_matches('[').trim_end_matches(']');
        if host.parse::<Ipv6Addr>().is_ok() {
            return format!("[{host}]:{port}");
        }
        let host = host.split(':').next().unwrap_or(host);
        format!("{host}:{port}")
    }

    /// Session builder carrying these settings.
    pub fn session_builder(&self) -> Result<SessionBuilder, String> {
        let builder = match self.snmp_version {
            SnmpVersion::V1 => Session::v1(self.target_string()),
            SnmpVersion::V2c => Session::v2c(self.target_string()),
        };
        Ok(builder
            .community(self.community.as_bytes())
            .timeout(self.timeout_duration()?)
            .retries(self.retries))
    }
}

/// Logging and output switches.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Log debug output to stderr.
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Log trace output (including datagrams) to stderr.
    #[arg(short = 'D', long)]
    pub trace: bool,

    /// Print elapsed time after the results.
    #[arg(long)]
    pub timing: bool,

    /// Annotate well-known OIDs with their names.
    #[arg(long)]
    pub hints: bool,
}

impl OutputArgs {
    /// Install a stderr subscriber at the level selected by `-d`/`-D`.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let filter = if self.trace {
            "snmp_session=trace"
        } else if self.debug {
            "snmp_session=debug"
        } else {
            "snmp_session=warn"
        };

        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_writer(std::io::stderr)
            .init();
    }
}
