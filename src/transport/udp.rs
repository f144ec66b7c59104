//! UDP transport backed by tokio sockets.

use super::{MAX_DATAGRAM_SIZE, SocketId, Transport};
use crate::error::{Error, Result};
use crate::util::bind_udp_socket;
use bytes::Bytes;
use std::collections::HashMap;
use std::future::poll_fn;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::Poll;
use std::time::Duration;
use tokio::net::UdpSocket;

/// UDP transport owning a table of tokio sockets.
///
/// Every [`open`](Transport::open) binds a fresh socket. Readiness for any
/// subset of them is awaited with a single [`wait_ready`](Transport::wait_ready)
/// call, which polls each socket's receive readiness under one timeout.
#[derive(Clone, Default)]
pub struct UdpTransport {
    inner: Arc<UdpTransportInner>,
}

#[derive(Default)]
struct UdpTransportInner {
    sockets: Mutex<HashMap<SocketId, Arc<UdpSocket>>>,
    next_id: AtomicU64,
    recv_buffer_size: Option<usize>,
}

impl UdpTransport {
    /// Create a transport with no open sockets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport whose sockets request a kernel receive buffer of
    /// `size` bytes.
    pub fn with_recv_buffer_size(size: usize) -> Self {
        Self {
            inner: Arc::new(UdpTransportInner {
                recv_buffer_size: Some(size),
                ..Default::default()
            }),
        }
    }

    /// Local address a socket is bound to.
    pub fn local_addr(&self, socket: SocketId) -> Result<SocketAddr> {
        self.socket(socket)?
            .local_addr()
            .map_err(|source| Error::Io {
                target: None,
                source,
            })
    }

    /// Number of sockets currently open.
    pub fn open_sockets(&self) -> usize {
        self.inner.sockets.lock().unwrap().len()
    }

    fn socket(&self, id: SocketId) -> Result<Arc<UdpSocket>> {
        self.inner
            .sockets
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::Io {
                target: None,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{id} is not open"),
                ),
            })
    }
}

impl Transport for UdpTransport {
    async fn open(&self, local: Option<SocketAddr>) -> Result<SocketId> {
        let bind_addr = local.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
        let socket = bind_udp_socket(bind_addr, self.inner.recv_buffer_size)
            .await
            .map_err(|source| Error::Io {
                target: None,
                source,
            })?;

        let id = SocketId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::trace!(
            target: "snmp_session::transport",
            { snmp.socket = %id, snmp.local_addr = ?socket.local_addr().ok() },
            "opened UDP socket"
        );
        self.inner
            .sockets
            .lock()
            .unwrap()
            .insert(id, Arc::new(socket));
        Ok(id)
    }

    async fn send(&self, socket: SocketId, data: &[u8], target: SocketAddr) -> Result<()> {
        let udp = self.socket(socket)?;
        tracing::trace!(
            target: "snmp_session::transport",
            { snmp.socket = %socket, snmp.target = %target, snmp.bytes = data.len() },
            "sending datagram"
        );
        udp.send_to(data, target)
            .await
            .map_err(|source| Error::Io {
                target: Some(target),
                source,
            })?;
        Ok(())
    }

    async fn wait_ready(&self, sockets: &[SocketId], timeout: Duration) -> Result<Vec<SocketId>> {
        let watched: Vec<(SocketId, Arc<UdpSocket>)> = {
            let table = self.inner.sockets.lock().unwrap();
            sockets
                .iter()
                .filter_map(|id| table.get(id).map(|s| (*id, s.clone())))
                .collect()
        };

        if watched.is_empty() {
            tokio::time::sleep(timeout).await;
            return Ok(Vec::new());
        }

        let any_ready = poll_fn(|cx| {
            let mut ready = Vec::new();
            for (id, udp) in &watched {
                match udp.poll_recv_ready(cx) {
                    Poll::Ready(Ok(())) => ready.push(*id),
                    Poll::Ready(Err(e)) => {
                        // recv on this socket reports the error to its owner
                        tracing::debug!(target: "snmp_session::transport", { snmp.socket = %id, error = %e }, "readiness poll failed");
                        ready.push(*id);
                    }
                    Poll::Pending => {}
                }
            }
            if ready.is_empty() {
                Poll::Pending
            } else {
                Poll::Ready(ready)
            }
        });

        Ok(tokio::time::timeout(timeout, any_ready)
            .await
            .unwrap_or_default())
    }

    async fn recv(&self, socket: SocketId) -> Result<(Bytes, SocketAddr)> {
        let udp = self.socket(socket)?;
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, source) = udp.recv_from(&mut buf).await.map_err(|source| Error::Io {
            target: None,
            source,
        })?;
        buf.truncate(len);

        tracing::trace!(
            target: "snmp_session::transport",
            { snmp.socket = %socket, snmp.source = %source, snmp.bytes = len },
            "received datagram"
        );
        Ok((Bytes::from(buf), source))
    }

    fn try_recv(&self, socket: SocketId) -> Result<Option<(Bytes, SocketAddr)>> {
        let udp = self.socket(socket)?;
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        match udp.try_recv_from(&mut buf) {
            Ok((len, source)) => {
                buf.truncate(len);
                Ok(Some((Bytes::from(buf), source)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(source) => Err(Error::Io {
                target: None,
                source,
            }),
        }
    }

    fn close(&self, socket: SocketId) {
        if self.inner.sockets.lock().unwrap().remove(&socket).is_some() {
            tracing::trace!(target: "snmp_session::transport", { snmp.socket = %socket }, "closed UDP socket");
        }
    }
}
