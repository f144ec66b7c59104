//! Minimal SNMP v1/v2c agent on a loopback UDP socket.
//!
//! Serves GET, GETNEXT, GETBULK and SET from an in-memory table. Requests
//! with a foreign community are silently ignored, and the first
//! `drop_first` requests are swallowed to exercise retransmission. A
//! `delay_first` holds back the first reply so it lands after a retry.

use bytes::Bytes;
use snmp_session::message::CommunityMessage;
use snmp_session::pdu::{Pdu, PduType};
use snmp_session::{ErrorStatus, Oid, Value, VarBind, Version};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

/// Agent behaviour knobs.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub community: Bytes,
    /// Number of leading requests to ignore.
    pub drop_first: usize,
    /// Replace every response's request id with this value.
    pub force_request_id: Option<i32>,
    /// Sleep this long before answering the first answered request.
    pub delay_first: Option<Duration>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            community: Bytes::from_static(super::COMMUNITY),
            drop_first: 0,
            force_request_id: None,
            delay_first: None,
        }
    }
}

/// Running agent; the serving task is aborted on drop.
pub struct FakeAgent {
    addr: SocketAddr,
    received: Arc<AtomicUsize>,
    mib: Arc<Mutex<BTreeMap<Oid, Value>>>,
    task: JoinHandle<()>,
}

impl FakeAgent {
    pub async fn start(objects: Vec<(Oid, Value)>) -> Self {
        Self::with_config(objects, AgentConfig::default()).await
    }

    pub async fn with_config(objects: Vec<(Oid, Value)>, config: AgentConfig) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let received = Arc::new(AtomicUsize::new(0));
        let mib = Arc::new(Mutex::new(objects.into_iter().collect()));

        let task = tokio::spawn(serve(socket, config, received.clone(), Arc::clone(&mib)));
        Self {
            addr,
            received,
            mib,
            task,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Datagrams received so far, including dropped and rejected ones.
    pub fn received(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    pub fn value(&self, oid: &Oid) -> Option<Value> {
        self.mib.lock().unwrap().get(oid).cloned()
    }
}

impl Drop for FakeAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    socket: UdpSocket,
    config: AgentConfig,
    received: Arc<AtomicUsize>,
    mib: Arc<Mutex<BTreeMap<Oid, Value>>>,
) {
    let mut buf = vec![0u8; 65535];
    let mut delay = config.delay_first;
    loop {
        let Ok((len, from)) = socket.recv_from(&mut buf).await else {
            return;
        };
        let seen = received.fetch_add(1, Ordering::SeqCst);
        if seen < config.drop_first {
            continue;
        }
        let Ok(request) = CommunityMessage::decode(Bytes::copy_from_slice(&buf[..len])) else {
            continue;
        };
        if request.community != config.community {
            continue;
        }

        let mut response = answer(&request, &mut mib.lock().unwrap());
        if let Some(id) = config.force_request_id {
            response.request_id = id;
        }
        let reply = CommunityMessage::new(request.version, request.community, response);
        if let Some(pause) = delay.take() {
            tokio::time::sleep(pause).await;
        }
        let _ = socket.send_to(&reply.encode(), from).await;
    }
}

fn answer(request: &CommunityMessage, mib: &mut BTreeMap<Oid, Value>) -> Pdu {
    let pdu = &request.pdu;
    let v1 = request.version == Version::V1;

    match pdu.pdu_type {
        PduType::GetRequest => lookup_each(pdu, |oid| match mib.get(oid) {
            Some(value) => Some(VarBind::new(oid.clone(), value.clone())),
            None if v1 => None,
            None => Some(VarBind::new(oid.clone(), Value::NoSuchObject)),
        }),
        PduType::GetNextRequest => lookup_each(pdu, |oid| match successor(mib, oid) {
            Some(vb) => Some(vb),
            None if v1 => None,
            None => Some(VarBind::new(oid.clone(), Value::EndOfMibView)),
        }),
        PduType::GetBulkRequest => {
            let non_repeaters = pdu.error_status.max(0) as usize;
            let max_repetitions = pdu.error_index.max(0) as usize;
            let mut out = Vec::new();
            for vb in pdu.varbinds.iter().take(non_repeaters) {
                out.push(
                    successor(mib, &vb.oid)
                        .unwrap_or_else(|| VarBind::new(vb.oid.clone(), Value::EndOfMibView)),
                );
            }
            for vb in pdu.varbinds.iter().skip(non_repeaters) {
                let mut cursor = vb.oid.clone();
                for _ in 0..max_repetitions {
                    match successor(mib, &cursor) {
                        Some(next) => {
                            cursor = next.oid.clone();
                            out.push(next);
                        }
                        None => {
                            out.push(VarBind::new(cursor.clone(), Value::EndOfMibView));
                            break;
                        }
                    }
                }
            }
            Pdu::response(pdu.request_id, ErrorStatus::NoError, 0, out)
        }
        PduType::SetRequest => {
            for vb in &pdu.varbinds {
                mib.insert(vb.oid.clone(), vb.value.clone());
            }
            Pdu::response(pdu.request_id, ErrorStatus::NoError, 0, pdu.varbinds.clone())
        }
        _ => Pdu::response(pdu.request_id, ErrorStatus::GenErr, 0, pdu.varbinds.clone()),
    }
}

/// Resolve every binding, or fail the whole PDU with noSuchName at the first
/// miss (1-based), echoing the request bindings the way v1 agents do.
fn lookup_each(pdu: &Pdu, mut resolve: impl FnMut(&Oid) -> Option<VarBind>) -> Pdu {
    let mut out = Vec::with_capacity(pdu.varbinds.len());
    for (i, vb) in pdu.varbinds.iter().enumerate() {
        match resolve(&vb.oid) {
            Some(found) => out.push(found),
            None => {
                return Pdu::response(
                    pdu.request_id,
                    ErrorStatus::NoSuchName,
                    i as i32 + 1,
                    pdu.varbinds.clone(),
                );
            }
        }
    }
    Pdu::response(pdu.request_id, ErrorStatus::NoError, 0, out)
}

fn successor(mib: &BTreeMap<Oid, Value>, oid: &Oid) -> Option<VarBind> {
    use std::ops::Bound::{Excluded, Unbounded};
    mib.range((Excluded(oid.clone()), Unbounded))
        .next()
        .map(|(oid, value)| VarBind::new(oid.clone(), value.clone()))
}
