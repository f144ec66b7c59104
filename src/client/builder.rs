//! Session builder.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use snmp_session::Session;
//! # use std::time::Duration;
//! # async fn example() -> snmp_session::Result<()> {
//! let session = Session::v2c("192.0.2.1")
//!     .community(b"public")
//!     .timeout(Duration::from_secs(2))
//!     .retries(1)
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::transport::{Transport, UdpTransport};
use crate::version::Version;

use super::{DEFAULT_PORT, Session, SessionConfig, time_seed};

/// Builder for [`Session`].
///
/// Created via [`Session::v1()`] or [`Session::v2c()`].
pub struct SessionBuilder {
    target: String,
    config: SessionConfig,
    request_id_seed: Option<i32>,
}

impl SessionBuilder {
    pub(crate) fn new(target: impl Into<String>, version: Version) -> Self {
        Self {
            target: target.into(),
            config: SessionConfig {
                version,
                ..Default::default()
            },
            request_id_seed: None,
        }
    }

    /// Set the community string.
    pub fn community(mut self, community: &[u8]) -> Self {
        self.config.community = Bytes::copy_from_slice(community);
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the number of retries after a timeout.
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the repetitions used by bulk walks.
    pub fn max_repetitions(mut self, max_repetitions: i32) -> Self {
        self.config.max_repetitions = max_repetitions;
        self
    }

    /// Set the non-repeaters used by bulk requests.
    pub fn non_repeaters(mut self, non_repeaters: i32) -> Self {
        self.config.non_repeaters = non_repeaters;
        self
    }

    /// Bind the session socket to a specific local address.
    pub fn local_addr(mut self, addr: SocketAddr) -> Self {
        self.config.local_addr = Some(addr);
        self
    }

    /// Fix the first request ID instead of deriving it from the clock.
    pub fn request_id_seed(mut self, seed: i32) -> Self {
        self.request_id_seed = Some(seed);
        self
    }

    /// Resolve the target and open a session over a fresh UDP transport.
    pub async fn connect(self) -> Result<Session<UdpTransport>> {
        self.build(UdpTransport::new()).await
    }

    /// Resolve the target and open a session over `transport`.
    pub async fn build<T: Transport>(self, transport: T) -> Result<Session<T>> {
        let peer = resolve_target(&self.target)?;
        let seed = self.request_id_seed.unwrap_or_else(time_seed);
        Session::with_request_id_seed(transport, peer, self.config, seed).await
    }
}

/// Resolve `host`, `host:port`, `ip`, `ip:port` or `[ipv6]:port`.
/// Targets without a port use [`DEFAULT_PORT`].
pub(crate) fn resolve_target(target: &str) -> Result<SocketAddr> {
    if let Ok(addr) = target.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let bare = target.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    let resolved = if target.contains(':') {
        target.to_socket_addrs()
    } else {
        (target, DEFAULT_PORT).to_socket_addrs()
    };
    resolved
        .map_err(|e| Error::Io {
            target: None,
            source: e,
        })?
        .next()
        .ok_or_else(|| Error::Io {
            target: None,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not resolve address",
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_resolve_default_port() {
        assert_eq!(
            resolve_target("192.0.2.1").unwrap(),
            "192.0.2.1:161".parse().unwrap()
        );
        assert_eq!(
            resolve_target("::1").unwrap(),
            "[::1]:161".parse().unwrap()
        );
        assert_eq!(
            resolve_target("[::1]").unwrap(),
            "[::1]:161".parse().unwrap()
        );
    }

    #[test]
    fn test_resolve_explicit_port() {
        assert_eq!(
            resolve_target("192.0.2.1:1161").unwrap(),
            "192.0.2.1:1161".parse().unwrap()
        );
        assert_eq!(
            resolve_target("localhost:1161").unwrap().port(),
            1161
        );
        assert_eq!(resolve_target("localhost").unwrap().port(), DEFAULT_PORT);
    }

    #[tokio::test]
    async fn test_builder_applies_settings() {
        let session = Session::v1("192.0.2.1:1161")
            .community(b"secret")
            .timeout(Duration::from_millis(250))
            .retries(0)
            .max_repetitions(20)
            .request_id_seed(9)
            .build(MockTransport::new())
            .await
            .unwrap();

        let config = session.config();
        assert_eq!(config.version, Version::V1);
        assert_eq!(config.community.as_ref(), b"secret");
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.retries, 0);
        assert_eq!(config.max_repetitions, 20);
        assert_eq!(session.peer_addr(), "192.0.2.1:1161".parse().unwrap());
    }

    #[tokio::test]
    async fn test_builder_rejects_zero_timeout() {
        let result = Session::v2c("192.0.2.1")
            .timeout(Duration::ZERO)
            .build(MockTransport::new())
            .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_builder_rejects_zero_max_repetitions() {
        let mock = MockTransport::new();
        let result = Session::v2c("192.0.2.1")
            .max_repetitions(0)
            .build(mock.clone())
            .await;
        assert!(matches!(
            result,
            Err(Error::Config("max_repetitions must be at least 1"))
        ));
        assert_eq!(mock.open_sockets(), 0);
    }
}
