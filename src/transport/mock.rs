//! Scripted in-memory transport for tests.
//!
//! Every datagram sent through a [`MockTransport`] consumes one scripted
//! [`MockReply`]: per-peer scripts first, then the shared queue, then the
//! default reply. Replies that produce data become readable on the socket
//! that sent the request, so [`wait_ready`](Transport::wait_ready) reports
//! exactly the sockets with a pending reply.

use super::{SocketId, Transport};
use crate::error::{Error, ErrorStatus, Result};
use crate::message::{CommunityMessage, Message};
use crate::oid::Oid;
use crate::pdu::Pdu;
use crate::value::Value;
use crate::varbind::VarBind;
use crate::version::Version;
use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake peer does with one request.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Reply with this message, request ID patched to match the request.
    Respond(Bytes),
    /// Reply with these exact bytes.
    RespondRaw(Bytes),
    /// Never reply.
    Drop,
    /// Fail the send itself.
    SendError(String),
    /// Mark the socket readable, then fail the read.
    RecvError(String),
}

/// A datagram sent through the mock.
#[derive(Clone, Debug)]
pub struct SentDatagram {
    pub socket: SocketId,
    pub target: SocketAddr,
    pub data: Bytes,
    /// Request ID, when the datagram decodes as a v1/v2c message.
    pub request_id: Option<i32>,
}

/// A queued datagram, or a read failure in its place.
type Inbound = std::result::Result<(Bytes, SocketAddr), String>;

#[derive(Default)]
struct MockTransportInner {
    next_id: u64,
    open: HashSet<SocketId>,
    closed: Vec<SocketId>,
    scripts: HashMap<SocketAddr, VecDeque<MockReply>>,
    queue: VecDeque<MockReply>,
    default_reply: Option<MockReply>,
    inbox: HashMap<SocketId, VecDeque<Inbound>>,
    sent: Vec<SentDatagram>,
    waits: usize,
}

/// Scripted transport; clones share state.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

impl MockTransport {
    /// Create a mock with nothing scripted. Unscripted requests are dropped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next request to any peer without its own script.
    pub fn queue(&self, reply: MockReply) {
        self.inner.lock().unwrap().queue.push_back(reply);
    }

    /// Queue a reply message; its request ID is patched to match.
    pub fn queue_response(&self, data: impl Into<Bytes>) {
        self.queue(MockReply::Respond(data.into()));
    }

    /// Queue a reply sent back verbatim.
    pub fn queue_raw_response(&self, data: impl Into<Bytes>) {
        self.queue(MockReply::RespondRaw(data.into()));
    }

    /// Queue a dropped request.
    pub fn queue_drop(&self) {
        self.queue(MockReply::Drop);
    }

    /// Queue a send failure.
    pub fn queue_send_error(&self, msg: impl Into<String>) {
        self.queue(MockReply::SendError(msg.into()));
    }

    /// Script a reply for the next request to `peer`.
    pub fn script(&self, peer: SocketAddr, reply: MockReply) {
        self.inner
            .lock()
            .unwrap()
            .scripts
            .entry(peer)
            .or_default()
            .push_back(reply);
    }

    /// Place a datagram on a socket's receive queue without any request,
    /// as a late or duplicated reply would arrive.
    pub fn deliver(&self, socket: SocketId, data: impl Into<Bytes>, from: SocketAddr) {
        self.inner
            .lock()
            .unwrap()
            .inbox
            .entry(socket)
            .or_default()
            .push_back(Ok((data.into(), from)));
    }

    /// Reply used once the scripts and the queue are exhausted.
    pub fn set_default_reply(&self, reply: MockReply) {
        self.inner.lock().unwrap().default_reply = Some(reply);
    }

    /// Every datagram sent so far, in order.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Datagrams sent to one peer.
    pub fn sent_to(&self, peer: SocketAddr) -> Vec<SentDatagram> {
        self.sent().into_iter().filter(|d| d.target == peer).collect()
    }

    /// Sockets opened and not yet closed.
    pub fn open_sockets(&self) -> usize {
        self.inner.lock().unwrap().open.len()
    }

    /// Sockets closed so far, in close order.
    pub fn closed_sockets(&self) -> Vec<SocketId> {
        self.inner.lock().unwrap().closed.clone()
    }

    /// Number of `wait_ready` calls made.
    pub fn wait_calls(&self) -> usize {
        self.inner.lock().unwrap().waits
    }

    fn request_id(data: &Bytes) -> Option<i32> {
        Message::decode(data.clone())
            .ok()
            .and_then(|msg| msg.pdu().map(|pdu| pdu.request_id))
    }

    fn patch_request_id(data: Bytes, request_id: i32) -> Bytes {
        match CommunityMessage::decode(data.clone()) {
            Ok(mut msg) => {
                msg.pdu.request_id = request_id;
                msg.encode()
            }
            Err(_) => data,
        }
    }
}

impl Transport for MockTransport {
    async fn open(&self, _local: Option<SocketAddr>) -> Result<SocketId> {
        let mut inner = self.inner.lock().unwrap();
        let id = SocketId(inner.next_id);
        inner.next_id += 1;
        inner.open.insert(id);
        Ok(id)
    }

    async fn send(&self, socket: SocketId, data: &[u8], target: SocketAddr) -> Result<()> {
        let data = Bytes::copy_from_slice(data);
        let request_id = Self::request_id(&data);

        let mut inner = self.inner.lock().unwrap();
        if !inner.open.contains(&socket) {
            return Err(Error::Io {
                target: Some(target),
                source: std::io::Error::new(std::io::ErrorKind::NotConnected, "socket closed"),
            });
        }
        inner.sent.push(SentDatagram {
            socket,
            target,
            data,
            request_id,
        });

        let scripted = inner.scripts.get_mut(&target).and_then(VecDeque::pop_front);
        let reply = scripted
            .or_else(|| inner.queue.pop_front())
            .or_else(|| inner.default_reply.clone())
            .unwrap_or(MockReply::Drop);

        let inbound = match reply {
            MockReply::Respond(bytes) => Some(Ok((
                match request_id {
                    Some(id) => Self::patch_request_id(bytes, id),
                    None => bytes,
                },
                target,
            ))),
            MockReply::RespondRaw(bytes) => Some(Ok((bytes, target))),
            MockReply::RecvError(msg) => Some(Err(msg)),
            MockReply::Drop => None,
            MockReply::SendError(msg) => {
                return Err(Error::Io {
                    target: Some(target),
                    source: std::io::Error::other(msg),
                });
            }
        };
        if let Some(inbound) = inbound {
            inner.inbox.entry(socket).or_default().push_back(inbound);
        }
        Ok(())
    }

    async fn wait_ready(&self, sockets: &[SocketId], _timeout: Duration) -> Result<Vec<SocketId>> {
        let mut inner = self.inner.lock().unwrap();
        inner.waits += 1;
        Ok(sockets
            .iter()
            .copied()
            .filter(|id| inner.inbox.get(id).is_some_and(|q| !q.is_empty()))
            .collect())
    }

    async fn recv(&self, socket: SocketId) -> Result<(Bytes, SocketAddr)> {
        match self.try_recv(socket)? {
            Some(datagram) => Ok(datagram),
            None => Err(Error::Io {
                target: None,
                source: std::io::Error::new(std::io::ErrorKind::WouldBlock, "no datagram queued"),
            }),
        }
    }

    fn try_recv(&self, socket: SocketId) -> Result<Option<(Bytes, SocketAddr)>> {
        let inbound = self
            .inner
            .lock()
            .unwrap()
            .inbox
            .get_mut(&socket)
            .and_then(VecDeque::pop_front);
        match inbound {
            Some(Ok(datagram)) => Ok(Some(datagram)),
            Some(Err(msg)) => Err(Error::Io {
                target: None,
                source: std::io::Error::other(msg),
            }),
            None => Ok(None),
        }
    }

    fn close(&self, socket: SocketId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.open.remove(&socket) {
            inner.inbox.remove(&socket);
            inner.closed.push(socket);
        }
    }
}

/// Builds encoded Response messages for scripting.
pub struct ResponseBuilder {
    request_id: i32,
    varbinds: Vec<VarBind>,
    error_status: ErrorStatus,
    error_index: i32,
}

impl ResponseBuilder {
    pub fn new(request_id: i32) -> Self {
        Self {
            request_id,
            varbinds: Vec::new(),
            error_status: ErrorStatus::NoError,
            error_index: 0,
        }
    }

    pub fn varbind(mut self, oid: Oid, value: impl Into<Value>) -> Self {
        self.varbinds.push(VarBind::new(oid, value.into()));
        self
    }

    pub fn error_status(mut self, status: ErrorStatus) -> Self {
        self.error_status = status;
        self
    }

    pub fn error_index(mut self, index: i32) -> Self {
        self.error_index = index;
        self
    }

    pub fn build(self, version: Version, community: &[u8]) -> Bytes {
        let pdu = Pdu::response(
            self.request_id,
            self.error_status,
            self.error_index,
            self.varbinds,
        );
        CommunityMessage::new(version, Bytes::copy_from_slice(community), pdu).encode()
    }

    pub fn build_v1(self, community: &[u8]) -> Bytes {
        self.build(Version::V1, community)
    }

    pub fn build_v2c(self, community: &[u8]) -> Bytes {
        self.build(Version::V2c, community)
    }
}
