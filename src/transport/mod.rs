//! Transport layer abstraction.
//!
//! A [`Transport`] hands out datagram sockets identified by [`SocketId`] and
//! multiplexes readiness over any number of them with a single wait call.
//! [`Session`](crate::Session) uses one socket per peer; the
//! [`Dispatcher`](crate::Dispatcher) opens one socket per pending request so
//! that the socket a reply arrives on identifies the request it answers.
//!
//! - [`UdpTransport`] - tokio UDP sockets bound through socket2
//! - `MockTransport` - scripted in-memory transport (`testing` feature)

mod udp;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use udp::*;

#[cfg(any(test, feature = "testing"))]
pub use mock::*;

use crate::error::Result;
use bytes::Bytes;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// Maximum datagram size read from a socket.
pub const MAX_DATAGRAM_SIZE: usize = 65535;

/// Opaque handle for a socket opened through a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(pub(crate) u64);

impl SocketId {
    /// Raw numeric id, unique per transport instance.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// Datagram transport used by sessions and the dispatcher.
///
/// Implementations are cheap to clone; clones share the same socket table.
pub trait Transport: Send + Sync + Clone + 'static {
    /// Open a new socket, bound to `local` or to an ephemeral port on the
    /// IPv4 wildcard address.
    fn open(&self, local: Option<SocketAddr>) -> impl Future<Output = Result<SocketId>> + Send;

    /// Send one datagram to `target`.
    fn send(
        &self,
        socket: SocketId,
        data: &[u8],
        target: SocketAddr,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Wait until at least one of `sockets` has a datagram to read, or until
    /// `timeout` elapses.
    ///
    /// Returns the ready sockets, or an empty list on timeout. A socket whose
    /// readiness poll fails is reported ready so that the failure surfaces
    /// from its [`recv`](Self::recv).
    fn wait_ready(
        &self,
        sockets: &[SocketId],
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<SocketId>>> + Send;

    /// Read one datagram from a socket reported ready.
    fn recv(&self, socket: SocketId) -> impl Future<Output = Result<(Bytes, SocketAddr)>> + Send;

    /// Read one already-queued datagram without waiting.
    ///
    /// Returns `None` when nothing is queued. This also clears any readiness
    /// left over from earlier reads.
    fn try_recv(&self, socket: SocketId) -> Result<Option<(Bytes, SocketAddr)>>;

    /// Release a socket. Closing an unknown socket is a no-op.
    fn close(&self, socket: SocketId);
}

/// Closes a socket when dropped.
///
/// Keeps sockets from leaking on early returns out of a request loop.
pub(crate) struct SocketGuard<T: Transport> {
    transport: T,
    socket: SocketId,
}

impl<T: Transport> SocketGuard<T> {
    pub(crate) fn new(transport: T, socket: SocketId) -> Self {
        Self { transport, socket }
    }

    pub(crate) fn id(&self) -> SocketId {
        self.socket
    }
}

impl<T: Transport> Drop for SocketGuard<T> {
    fn drop(&mut self) {
        self.transport.close(self.socket);
    }
}
