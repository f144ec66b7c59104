//! SNMP request session.
//!
//! A [`Session`] owns one socket and talks to one peer. It keeps at most one
//! request outstanding at a time; concurrent callers on clones of the same
//! session queue behind each other. Only timeouts are retried, and every
//! retry re-sends the exact bytes of the first attempt so the reply still
//! matches the original request ID.

mod builder;
mod walk;

pub use builder::SessionBuilder;
pub use walk::{BulkWalk, Walk, WalkEnd};

use crate::error::{DecodeErrorKind, EncodeErrorKind, Error, Result};
use crate::message::raw::{decode_message, decode_pdu};
use crate::message::{CommunityMessage, ExpectedResponse, Message, decode_response};
use crate::oid::Oid;
use crate::pdu::{Pdu, PduType, TrapV1Pdu};
use crate::transport::{SocketGuard, Transport, UdpTransport};
use crate::value::Value;
use crate::varbind::{VarBind, null_varbinds};
use crate::version::Version;
use bytes::Bytes;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};
use tracing::{Span, instrument};

/// Default UDP port for agent queries.
pub const DEFAULT_PORT: u16 = 161;

/// Default UDP port for trap reception.
pub const DEFAULT_TRAP_PORT: u16 = 162;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// SNMP version (default: V2c)
    pub version: Version,
    /// Community string (default: "public")
    pub community: Bytes,
    /// Time to wait for a reply per attempt (default: 5 seconds)
    pub timeout: Duration,
    /// Extra attempts after the first one times out (default: 3)
    pub retries: u32,
    /// Bindings requested per GETBULK round in bulk walks (default: 10)
    pub max_repetitions: i32,
    /// Non-repeaters for GETBULK requests built by the session (default: 0)
    pub non_repeaters: i32,
    /// Local address to bind; an ephemeral wildcard address when unset
    pub local_addr: Option<SocketAddr>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            community: Bytes::from_static(b"public"),
            timeout: Duration::from_secs(5),
            retries: 3,
            max_repetitions: 10,
            non_repeaters: 0,
            local_addr: None,
        }
    }
}

impl SessionConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero"));
        }
        if self.max_repetitions < 1 {
            return Err(Error::Config("max_repetitions must be at least 1"));
        }
        if self.non_repeaters < 0 {
            return Err(Error::Config("non_repeaters must not be negative"));
        }
        Ok(())
    }
}

/// SNMP session with one peer.
///
/// Cheap to clone; clones share the socket and the request ID counter.
#[derive(Clone)]
pub struct Session<T: Transport = UdpTransport> {
    inner: Arc<SessionInner<T>>,
}

struct SessionInner<T: Transport> {
    transport: T,
    socket: SocketGuard<T>,
    peer: SocketAddr,
    config: SessionConfig,
    next_request_id: AtomicI32,
    exchange: tokio::sync::Mutex<()>,
}

impl Session<UdpTransport> {
    /// Start building an SNMPv1 session.
    pub fn v1(target: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(target, Version::V1)
    }

    /// Start building an SNMPv2c session.
    pub fn v2c(target: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(target, Version::V2c)
    }
}

impl<T: Transport> Session<T> {
    /// Open a session over `transport`, seeding request IDs from the clock.
    pub async fn new(transport: T, peer: SocketAddr, config: SessionConfig) -> Result<Self> {
        Self::with_request_id_seed(transport, peer, config, time_seed()).await
    }

    /// Open a session whose first request uses `seed` as its request ID.
    ///
    /// Seeds outside `1..=i32::MAX` are folded into that range.
    pub async fn with_request_id_seed(
        transport: T,
        peer: SocketAddr,
        config: SessionConfig,
        seed: i32,
    ) -> Result<Self> {
        config.validate()?;

        let local = config.local_addr.unwrap_or_else(|| match peer {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        });
        let socket = transport.open(Some(local)).await?;
        tracing::debug!(target: "snmp_session::client", { snmp.target = %peer, snmp.socket = %socket, snmp.version = %config.version }, "session opened");

        Ok(Self {
            inner: Arc::new(SessionInner {
                socket: SocketGuard::new(transport.clone(), socket),
                transport,
                peer,
                config,
                next_request_id: AtomicI32::new(seed.wrapping_abs().max(1)),
                exchange: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Peer address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.inner.peer
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// SNMP version.
    pub fn version(&self) -> Version {
        self.inner.config.version
    }

    /// Allocate the next request ID. IDs stay positive and wrap to 1.
    fn next_request_id(&self) -> i32 {
        match self.inner.next_request_id.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |id| Some(if id == i32::MAX { 1 } else { id + 1 }),
        ) {
            Ok(id) | Err(id) => id,
        }
    }

    /// Send an encoded request and return the first datagram received.
    ///
    /// Makes up to `retries + 1` attempts, re-sending the same bytes each
    /// time. Transport errors abort at once; exhausting every attempt fails
    /// with [`Error::Timeout`].
    pub async fn send_and_receive(&self, request: &[u8]) -> Result<Bytes> {
        let request_id = decode_message(Bytes::copy_from_slice(request))
            .and_then(|msg| decode_pdu(msg.pdu))
            .map(|pdu| pdu.request_id)
            .unwrap_or(0);
        self.exchange(request_id, request).await
    }

    #[instrument(
        level = "debug",
        skip(self, data),
        fields(
            snmp.target = %self.peer_addr(),
            snmp.request_id = request_id,
            snmp.attempt = tracing::field::Empty,
            snmp.elapsed_ms = tracing::field::Empty,
        )
    )]
    async fn exchange(&self, request_id: i32, data: &[u8]) -> Result<Bytes> {
        let _outstanding = self.inner.exchange.lock().await;
        let transport = &self.inner.transport;
        let socket = self.inner.socket.id();
        let peer = self.inner.peer;
        let retries = self.inner.config.retries;
        let start = Instant::now();

        // Late replies to earlier requests would be read as this one's.
        while let Some((stale, source)) = transport.try_recv(socket)? {
            tracing::debug!(target: "snmp_session::client", { snmp.source = %source, snmp.bytes = stale.len() }, "discarding stale datagram");
        }

        for attempt in 0..=retries {
            Span::current().record("snmp.attempt", attempt);
            if attempt > 0 {
                tracing::debug!(target: "snmp_session::client", "retrying request");
            }

            tracing::trace!(target: "snmp_session::client", { snmp.bytes = data.len() }, "sending request");
            transport.send(socket, data, peer).await?;

            let ready = transport
                .wait_ready(&[socket], self.inner.config.timeout)
                .await?;
            if !ready.contains(&socket) {
                tracing::trace!(target: "snmp_session::client", "attempt timed out");
                continue;
            }

            let (response, source) = transport.recv(socket).await?;
            if source != peer {
                tracing::warn!(target: "snmp_session::client", { snmp.source = %source }, "reply from unexpected source");
            }
            tracing::trace!(target: "snmp_session::client", { snmp.bytes = response.len() }, "received response");
            Span::current().record("snmp.elapsed_ms", start.elapsed().as_millis() as u64);
            return Ok(response);
        }

        let elapsed = start.elapsed();
        Span::current().record("snmp.elapsed_ms", elapsed.as_millis() as u64);
        tracing::debug!(target: "snmp_session::client", { request_id, ?elapsed, retries }, "request timed out");
        Err(Error::Timeout {
            target: Some(peer),
            elapsed,
            request_id,
            retries,
        })
    }

    /// Encode `pdu`, run the exchange and validate the reply.
    async fn request(&self, pdu: Pdu) -> Result<Vec<VarBind>> {
        let config = &self.inner.config;
        tracing::debug!(target: "snmp_session::client", { snmp.pdu_type = %pdu.pdu_type, snmp.varbind_count = pdu.varbinds.len() }, "sending {} request", pdu.pdu_type);

        let request_id = pdu.request_id;
        let data = CommunityMessage::new(config.version, config.community.clone(), pdu).encode();
        let response = self.exchange(request_id, &data).await?;

        let expected = ExpectedResponse {
            version: config.version,
            community: &config.community,
            request_id,
            target: Some(self.inner.peer),
        };
        let varbinds = decode_response(response, &expected)?;
        tracing::debug!(target: "snmp_session::client", { snmp.varbind_count = varbinds.len() }, "received response");
        Ok(varbinds)
    }

    fn null_pdu(&self, pdu_type: PduType, oids: &[Oid]) -> Result<Pdu> {
        Ok(Pdu {
            pdu_type,
            request_id: self.next_request_id(),
            error_status: 0,
            error_index: 0,
            varbinds: null_varbinds(oids)?,
        })
    }

    fn first(&self, varbinds: Vec<VarBind>) -> Result<VarBind> {
        varbinds.into_iter().next().ok_or_else(|| {
            tracing::debug!(target: "snmp_session::client", { snmp.target = %self.inner.peer, kind = %DecodeErrorKind::EmptyResponse }, "empty response");
            Error::decode(0, DecodeErrorKind::EmptyResponse)
        })
    }

    /// GET a single OID.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr(), snmp.oid = %oid))]
    pub async fn get(&self, oid: &Oid) -> Result<VarBind> {
        let pdu = self.null_pdu(PduType::GetRequest, std::slice::from_ref(oid))?;
        let varbinds = self.request(pdu).await?;
        self.first(varbinds)
    }

    /// GET several OIDs in one request.
    #[instrument(skip(self, oids), err, fields(snmp.target = %self.peer_addr(), snmp.oid_count = oids.len()))]
    pub async fn get_many(&self, oids: &[Oid]) -> Result<Vec<VarBind>> {
        let pdu = self.null_pdu(PduType::GetRequest, oids)?;
        self.request(pdu).await
    }

    /// GETNEXT: the first binding lexicographically after `oid`.
    #[instrument(skip(self), err, fields(snmp.target = %self.peer_addr(), snmp.oid = %oid))]
    pub async fn get_next(&self, oid: &Oid) -> Result<VarBind> {
        let pdu = self.null_pdu(PduType::GetNextRequest, std::slice::from_ref(oid))?;
        let varbinds = self.request(pdu).await?;
        self.first(varbinds)
    }

    /// GETBULK (v2c only).
    #[instrument(skip(self, oids), err, fields(
        snmp.target = %self.peer_addr(),
        snmp.oid_count = oids.len(),
        snmp.non_repeaters = non_repeaters,
        snmp.max_repetitions = max_repetitions,
    ))]
    pub async fn get_bulk(
        &self,
        oids: &[Oid],
        non_repeaters: i32,
        max_repetitions: i32,
    ) -> Result<Vec<VarBind>> {
        if !self.version().supports_bulk() {
            return Err(Error::encode(EncodeErrorKind::BulkNotSupportedInV1));
        }
        let mut pdu = self.null_pdu(PduType::GetBulkRequest, oids)?;
        pdu.error_status = non_repeaters;
        pdu.error_index = max_repetitions;
        self.request(pdu).await
    }

    /// GETBULK with the configured non-repeaters and repetitions.
    pub async fn bulk(&self, oids: &[Oid]) -> Result<Vec<VarBind>> {
        let config = &self.inner.config;
        self.get_bulk(oids, config.non_repeaters, config.max_repetitions)
            .await
    }

    /// SET one OID.
    #[instrument(skip(self, value), err, fields(snmp.target = %self.peer_addr(), snmp.oid = %oid))]
    pub async fn set(&self, oid: &Oid, value: Value) -> Result<VarBind> {
        let varbinds = self.set_many(&[VarBind::new(oid.clone(), value)]).await?;
        self.first(varbinds)
    }

    /// SET several bindings in one request.
    #[instrument(skip(self, varbinds), err, fields(snmp.target = %self.peer_addr(), snmp.oid_count = varbinds.len()))]
    pub async fn set_many(&self, varbinds: &[VarBind]) -> Result<Vec<VarBind>> {
        if varbinds.is_empty() {
            return Err(Error::encode(EncodeErrorKind::EmptyVarBindList));
        }
        for vb in varbinds {
            vb.oid.check_encodable()?;
        }
        let pdu = Pdu::set_request(self.next_request_id(), varbinds.to_vec());
        self.request(pdu).await
    }

    /// Send an SNMPv1 trap to the peer. No reply is expected.
    pub async fn send_trap_v1(&self, trap: TrapV1Pdu) -> Result<()> {
        if self.version() != Version::V1 {
            return Err(Error::Config("SNMPv1 traps require a v1 session"));
        }
        let data = Message::TrapV1 {
            community: self.inner.config.community.clone(),
            pdu: trap,
        }
        .encode();
        tracing::debug!(target: "snmp_session::client", { snmp.target = %self.inner.peer, snmp.bytes = data.len() }, "sending trap");
        self.inner
            .transport
            .send(self.inner.socket.id(), &data, self.inner.peer)
            .await
    }

    /// Walk the subtree under `oid` with GETNEXT.
    pub fn walk(&self, oid: Oid) -> Walk<T> {
        Walk::new(self.clone(), oid)
    }

    /// Walk the subtree under `oid` with GETBULK, `max_repetitions`
    /// bindings per round.
    pub fn bulk_walk(&self, oid: Oid, max_repetitions: i32) -> BulkWalk<T> {
        BulkWalk::new(self.clone(), oid, max_repetitions)
    }
}

/// Clock-derived request ID seed.
pub(crate) fn time_seed() -> i32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i32)
        .unwrap_or(1);
    nanos.wrapping_abs().max(1)
}
