//! Many independent request/response exchanges multiplexed over one wait.
//!
//! A [`Dispatcher`] collects requests with [`submit`](Dispatcher::submit),
//! then drives all of them in rounds with [`dispatch`](Dispatcher::dispatch).
//! Every round sends each unanswered request on its own socket and makes a
//! single [`wait_ready`](Transport::wait_ready) call covering all of them, so
//! the wall-clock cost of a batch is bounded by the retry budget times the
//! timeout rather than by the number of peers.
//!
//! ```rust,no_run
//! use snmp_session::{Dispatcher, DispatcherConfig, oid};
//! use snmp_session::pdu::PduType;
//! use snmp_session::transport::UdpTransport;
//! use snmp_session::varbind::VarBind;
//!
//! # async fn example() -> snmp_session::Result<()> {
//! let mut dispatcher = Dispatcher::new(UdpTransport::new(), DispatcherConfig::default());
//! for host in ["192.0.2.1:161", "192.0.2.2:161"] {
//!     dispatcher.submit(
//!         host.parse().unwrap(),
//!         b"public",
//!         PduType::GetRequest,
//!         vec![VarBind::null(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0))],
//!     )?;
//! }
//! dispatcher.dispatch().await?;
//! for reply in dispatcher.retrieve() {
//!     println!("{:?}", reply.map(|b| b.len()));
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::time_seed;
use crate::error::{EncodeErrorKind, Error, Result};
use crate::message::{CommunityMessage, ExpectedResponse, decode_response};
use crate::pdu::{Pdu, PduType};
use crate::transport::{SocketId, Transport, UdpTransport};
use crate::varbind::VarBind;
use crate::version::Version;
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// SNMP version used for submitted requests (default: V2c)
    pub version: Version,
    /// Shared per-round wait (default: 5 seconds)
    pub timeout: Duration,
    /// Rounds without any reply tolerated after the first (default: 3)
    pub retries: u32,
    /// Local address for every request socket
    pub local_addr: Option<SocketAddr>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            timeout: Duration::from_secs(5),
            retries: 3,
            local_addr: None,
        }
    }
}

/// Identifies a submitted request. Handles index results in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
    /// Position of the request in submission order.
    pub fn index(self) -> usize {
        self.0
    }
}

struct PendingRequest {
    peer: SocketAddr,
    version: Version,
    community: Bytes,
    request_id: i32,
    data: Bytes,
    socket: Option<SocketId>,
    response: Option<Bytes>,
    error: Option<Error>,
}

impl PendingRequest {
    fn is_active(&self) -> bool {
        self.response.is_none() && self.error.is_none()
    }
}

/// Drives many single-peer exchanges concurrently on one task.
pub struct Dispatcher<T: Transport = UdpTransport> {
    transport: T,
    config: DispatcherConfig,
    requests: Vec<PendingRequest>,
    next_request_id: i32,
    elapsed: Duration,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher, seeding request IDs from the clock.
    pub fn new(transport: T, config: DispatcherConfig) -> Self {
        Self::with_request_id_seed(transport, config, time_seed())
    }

    /// Create a dispatcher whose first request uses `seed` as its ID.
    pub fn with_request_id_seed(transport: T, config: DispatcherConfig, seed: i32) -> Self {
        Self {
            transport,
            config,
            requests: Vec::new(),
            next_request_id: seed.wrapping_abs().max(1),
            elapsed: Duration::ZERO,
        }
    }

    /// Number of submitted requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether nothing has been submitted.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn next_request_id(&mut self) -> i32 {
        let id = self.next_request_id;
        self.next_request_id = if id == i32::MAX { 1 } else { id + 1 };
        id
    }

    /// Queue a request built from `pdu_type` and `varbinds`. Nothing is sent
    /// until [`dispatch`](Self::dispatch).
    ///
    /// GETBULK requests built here use zero non-repeaters and ten
    /// repetitions; use [`submit_pdu`](Self::submit_pdu) for other values.
    pub fn submit(
        &mut self,
        peer: SocketAddr,
        community: &[u8],
        pdu_type: PduType,
        varbinds: Vec<VarBind>,
    ) -> Result<Handle> {
        let (error_status, error_index) = match pdu_type {
            PduType::GetBulkRequest => (0, 10),
            _ => (0, 0),
        };
        self.submit_pdu(
            peer,
            community,
            Pdu {
                pdu_type,
                request_id: 0,
                error_status,
                error_index,
                varbinds,
            },
        )
    }

    /// Queue a prepared PDU. Its request ID is replaced with one allocated
    /// by the dispatcher.
    pub fn submit_pdu(&mut self, peer: SocketAddr, community: &[u8], mut pdu: Pdu) -> Result<Handle> {
        let version = self.config.version;
        if pdu.varbinds.is_empty() {
            return Err(Error::encode(EncodeErrorKind::EmptyVarBindList));
        }
        for vb in &pdu.varbinds {
            vb.oid.check_encodable()?;
        }
        match pdu.pdu_type {
            PduType::GetBulkRequest if !version.supports_bulk() => {
                return Err(Error::encode(EncodeErrorKind::BulkNotSupportedInV1));
            }
            PduType::TrapV1 => {
                return Err(Error::Config("SNMPv1 traps cannot be dispatched"));
            }
            _ => {}
        }

        pdu.request_id = self.next_request_id();
        let request_id = pdu.request_id;
        let community = Bytes::copy_from_slice(community);
        let data = CommunityMessage::new(version, community.clone(), pdu).encode();

        let handle = Handle(self.requests.len());
        tracing::trace!(target: "snmp_session::dispatch", { snmp.target = %peer, snmp.request_id = request_id, handle = handle.0 }, "request submitted");
        self.requests.push(PendingRequest {
            peer,
            version,
            community,
            request_id,
            data,
            socket: None,
            response: None,
            error: None,
        });
        Ok(handle)
    }

    /// Send every unanswered request and collect replies until all are
    /// answered or the retry budget runs out.
    ///
    /// Per-request send failures are recorded (see [`errors`](Self::errors))
    /// and do not stop the batch. An error is returned only when the
    /// readiness wait itself fails. All sockets are closed on return.
    pub async fn dispatch(&mut self) -> Result<()> {
        let start = Instant::now();
        let result = self.run_rounds().await;
        self.close_all();
        self.elapsed += start.elapsed();
        result
    }

    async fn run_rounds(&mut self) -> Result<()> {
        let mut rounds_left = self.config.retries.saturating_add(1);
        let mut round = 0u32;

        while rounds_left > 0 && self.requests.iter().any(PendingRequest::is_active) {
            round += 1;

            let mut in_flight: HashMap<SocketId, usize> = HashMap::new();
            for idx in 0..self.requests.len() {
                if !self.requests[idx].is_active() {
                    continue;
                }
                match self.send_one(idx).await {
                    Ok(socket) => {
                        in_flight.insert(socket, idx);
                    }
                    Err(e) => {
                        tracing::debug!(target: "snmp_session::dispatch", { snmp.target = %self.requests[idx].peer, error = %e }, "send failed");
                        self.close_request(idx);
                        self.requests[idx].error = Some(e);
                    }
                }
            }
            if in_flight.is_empty() {
                break;
            }

            let sockets: Vec<SocketId> = in_flight.keys().copied().collect();
            tracing::trace!(target: "snmp_session::dispatch", { round, in_flight = sockets.len() }, "waiting for replies");
            let ready = self
                .transport
                .wait_ready(&sockets, self.config.timeout)
                .await?;

            if ready.is_empty() {
                rounds_left -= 1;
                tracing::debug!(target: "snmp_session::dispatch", { round, rounds_left }, "round timed out");
                continue;
            }

            for socket in ready {
                let Some(&idx) = in_flight.get(&socket) else {
                    continue;
                };
                match self.transport.recv(socket).await {
                    Ok((data, source)) => {
                        tracing::trace!(target: "snmp_session::dispatch", { snmp.source = %source, snmp.bytes = data.len(), handle = idx }, "reply received");
                        self.requests[idx].response = Some(data);
                    }
                    Err(e) => {
                        tracing::debug!(target: "snmp_session::dispatch", { snmp.target = %self.requests[idx].peer, error = %e }, "receive failed");
                        self.requests[idx].error = Some(e);
                    }
                }
                self.close_request(idx);
            }
        }

        let unanswered = self.requests.iter().filter(|r| r.is_active()).count();
        tracing::debug!(target: "snmp_session::dispatch", { rounds = round, requests = self.requests.len(), unanswered }, "dispatch finished");
        Ok(())
    }

    /// Send request `idx`, opening its socket on first use.
    async fn send_one(&mut self, idx: usize) -> Result<SocketId> {
        let socket = match self.requests[idx].socket {
            Some(socket) => socket,
            None => {
                let socket = self.transport.open(self.config.local_addr).await?;
                self.requests[idx].socket = Some(socket);
                socket
            }
        };
        let request = &self.requests[idx];
        self.transport.send(socket, &request.data, request.peer).await?;
        Ok(socket)
    }

    fn close_request(&mut self, idx: usize) {
        if let Some(socket) = self.requests[idx].socket.take() {
            self.transport.close(socket);
        }
    }

    fn close_all(&mut self) {
        for idx in 0..self.requests.len() {
            self.close_request(idx);
        }
    }

    /// Raw reply for each request in submission order; `None` where no
    /// reply arrived.
    pub fn retrieve(&self) -> Vec<Option<Bytes>> {
        self.requests.iter().map(|r| r.response.clone()).collect()
    }

    /// Raw reply for one request.
    pub fn response(&self, handle: Handle) -> Option<&Bytes> {
        self.requests.get(handle.0)?.response.as_ref()
    }

    /// Requests that failed at the transport level.
    pub fn errors(&self) -> Vec<(Handle, &Error)> {
        self.requests
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.error.as_ref().map(|e| (Handle(i), e)))
            .collect()
    }

    /// Decode and validate every reply, in submission order.
    ///
    /// Requests without a reply yield their recorded transport error, or
    /// [`Error::Timeout`] when nothing arrived.
    pub fn retrieve_varbinds(mut self) -> Vec<Result<Vec<VarBind>>> {
        let retries = self.config.retries;
        let elapsed = self.elapsed;
        std::mem::take(&mut self.requests)
            .into_iter()
            .map(|request| {
                if let Some(data) = request.response {
                    let expected = ExpectedResponse {
                        version: request.version,
                        community: &request.community,
                        request_id: request.request_id,
                        target: Some(request.peer),
                    };
                    return decode_response(data, &expected);
                }
                Err(request.error.unwrap_or(Error::Timeout {
                    target: Some(request.peer),
                    elapsed,
                    request_id: request.request_id,
                    retries,
                }))
            })
            .collect()
    }
}

impl<T: Transport> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        self.close_all();
    }
}
