//! Walk stream implementations.
//!
//! Both walks are single-pass: each request is seeded from the last OID of
//! the previous reply. A walk ends normally ([`WalkEnd::Exhausted`]) when a
//! returned OID leaves the starting subtree, on `endOfMibView`, on an empty
//! GETBULK reply, or when an SNMPv1 agent answers GETNEXT with noSuchName.
//! Any other failure is yielded once as `Err` and ends the walk with
//! [`WalkEnd::Error`].

use std::collections::VecDeque;
use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_core::Stream;

use crate::error::{Error, ErrorStatus, Result};
use crate::oid::Oid;
use crate::transport::Transport;
use crate::value::Value;
use crate::varbind::VarBind;

use super::Session;

type PendingRequest<R> = Pin<Box<dyn Future<Output = Result<R>> + Send>>;

/// Why a walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// The subtree was fully enumerated.
    Exhausted,
    /// The walk stopped after yielding an error.
    Error,
}

/// Subtree position shared by both walk kinds.
struct Cursor {
    base: Oid,
    current: Oid,
    end: Option<WalkEnd>,
}

impl Cursor {
    fn new(base: Oid) -> Self {
        Self {
            current: base.clone(),
            base,
            end: None,
        }
    }

    /// Accept a returned binding. `None` means the walk is over.
    fn admit(&mut self, vb: VarBind) -> Option<Result<VarBind>> {
        if matches!(vb.value, Value::EndOfMibView) {
            tracing::trace!(target: "snmp_session::walk", { snmp.oid = %vb.oid }, "end of MIB view");
            self.end = Some(WalkEnd::Exhausted);
            return None;
        }
        if !self.base.is_prefix_of(&vb.oid) {
            tracing::trace!(target: "snmp_session::walk", { snmp.base = %self.base, snmp.oid = %vb.oid }, "left subtree");
            self.end = Some(WalkEnd::Exhausted);
            return None;
        }
        // A reply that does not advance would repeat forever.
        if vb.oid <= self.current {
            tracing::debug!(target: "snmp_session::walk", { previous = %self.current, current = %vb.oid }, "non-increasing OID");
            self.end = Some(WalkEnd::Error);
            return Some(Err(Error::NonIncreasingOid {
                previous: self.current.clone(),
                current: vb.oid,
            }));
        }

        self.current = vb.oid.clone();
        Some(Ok(vb))
    }

    fn fail(&mut self, err: Error) -> Option<Result<VarBind>> {
        if matches!(
            err,
            Error::Snmp {
                status: ErrorStatus::NoSuchName,
                ..
            }
        ) {
            tracing::trace!(target: "snmp_session::walk", "noSuchName ends walk");
            self.end = Some(WalkEnd::Exhausted);
            return None;
        }
        tracing::debug!(target: "snmp_session::walk", { error = %err }, "walk failed");
        self.end = Some(WalkEnd::Error);
        Some(Err(err))
    }
}

/// GETNEXT-based walk over a subtree.
pub struct Walk<T: Transport> {
    session: Session<T>,
    cursor: Cursor,
    pending: Option<PendingRequest<VarBind>>,
}

impl<T: Transport> Walk<T> {
    pub(crate) fn new(session: Session<T>, oid: Oid) -> Self {
        Self {
            session,
            cursor: Cursor::new(oid),
            pending: None,
        }
    }

    /// The OID the walk started from.
    pub fn base_oid(&self) -> &Oid {
        &self.cursor.base
    }

    /// Why the walk stopped, or `None` while it is still running.
    pub fn end_reason(&self) -> Option<WalkEnd> {
        self.cursor.end
    }

    /// Next binding, or `None` once the walk has ended.
    pub async fn next(&mut self) -> Option<Result<VarBind>> {
        poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Drain the walk, stopping at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<VarBind>> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await {
            out.push(item?);
        }
        Ok(out)
    }
}

impl<T: Transport> Stream for Walk<T> {
    type Item = Result<VarBind>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.cursor.end.is_some() {
            return Poll::Ready(None);
        }

        let pending = this.pending.get_or_insert_with(|| {
            let session = this.session.clone();
            let oid = this.cursor.current.clone();
            let fut: PendingRequest<VarBind> = Box::pin(async move { session.get_next(&oid).await });
            fut
        });
        let result = ready!(pending.as_mut().poll(cx));
        this.pending = None;

        Poll::Ready(match result {
            Ok(vb) => this.cursor.admit(vb),
            Err(e) => this.cursor.fail(e),
        })
    }
}

/// GETBULK-based walk over a subtree.
///
/// Each round asks for up to `max_repetitions` bindings after the current
/// OID. Bindings past the end of the subtree are dropped and the walk stops
/// there; otherwise the next round is seeded from the last binding.
pub struct BulkWalk<T: Transport> {
    session: Session<T>,
    cursor: Cursor,
    max_repetitions: i32,
    buffer: VecDeque<VarBind>,
    pending: Option<PendingRequest<Vec<VarBind>>>,
}

impl<T: Transport> BulkWalk<T> {
    pub(crate) fn new(session: Session<T>, oid: Oid, max_repetitions: i32) -> Self {
        Self {
            session,
            cursor: Cursor::new(oid),
            max_repetitions,
            buffer: VecDeque::new(),
            pending: None,
        }
    }

    /// The OID the walk started from.
    pub fn base_oid(&self) -> &Oid {
        &self.cursor.base
    }

    /// Why the walk stopped, or `None` while it is still running.
    pub fn end_reason(&self) -> Option<WalkEnd> {
        self.cursor.end
    }

    /// Next binding, or `None` once the walk has ended.
    pub async fn next(&mut self) -> Option<Result<VarBind>> {
        poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Drain the walk, stopping at the first error.
    pub async fn collect_all(mut self) -> Result<Vec<VarBind>> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await {
            out.push(item?);
        }
        Ok(out)
    }
}

impl<T: Transport> Stream for BulkWalk<T> {
    type Item = Result<VarBind>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.cursor.end.is_some() {
                return Poll::Ready(None);
            }

            if let Some(vb) = this.buffer.pop_front() {
                return Poll::Ready(this.cursor.admit(vb));
            }

            // A round of zero repetitions can never advance the cursor
            if this.max_repetitions < 1 {
                let err = Error::Config("max_repetitions must be at least 1");
                return Poll::Ready(this.cursor.fail(err));
            }

            let pending = this.pending.get_or_insert_with(|| {
                let session = this.session.clone();
                let oid = this.cursor.current.clone();
                let max_repetitions = this.max_repetitions;
                let fut: PendingRequest<Vec<VarBind>> = Box::pin(async move {
                    session
                        .get_bulk(std::slice::from_ref(&oid), 0, max_repetitions)
                        .await
                });
                fut
            });
            let result = ready!(pending.as_mut().poll(cx));
            this.pending = None;

            match result {
                Ok(varbinds) if varbinds.is_empty() => {
                    tracing::trace!(target: "snmp_session::walk", "empty bulk response");
                    this.cursor.end = Some(WalkEnd::Exhausted);
                    return Poll::Ready(None);
                }
                Ok(varbinds) => {
                    tracing::trace!(target: "snmp_session::walk", { snmp.varbind_count = varbinds.len() }, "bulk round");
                    this.buffer = varbinds.into();
                }
                Err(e) => return Poll::Ready(this.cursor.fail(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SessionConfig;
    use crate::oid;
    use crate::transport::{MockTransport, ResponseBuilder};
    use crate::version::Version;
    use std::time::Duration;

    async fn mock_session(mock: &MockTransport, version: Version) -> Session<MockTransport> {
        let config = SessionConfig {
            version,
            timeout: Duration::from_millis(20),
            retries: 0,
            ..Default::default()
        };
        Session::with_request_id_seed(mock.clone(), "192.0.2.1:161".parse().unwrap(), config, 1)
            .await
            .unwrap()
    }

    fn reply(oid: Oid, value: impl Into<Value>) -> bytes::Bytes {
        ResponseBuilder::new(0).varbind(oid, value).build_v2c(b"public")
    }

    fn system() -> Oid {
        oid!(1, 3, 6, 1, 2, 1, 1)
    }

    #[tokio::test]
    async fn test_walk_stops_when_leaving_subtree() {
        let mock = MockTransport::new();
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "desc"));
        mock.queue_response(reply(
            oid!(1, 3, 6, 1, 2, 1, 1, 2, 0),
            oid!(1, 3, 6, 1, 4, 1, 99),
        ));
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), 1));

        let session = mock_session(&mock, Version::V2c).await;
        let mut walk = session.walk(system());

        let mut oids = Vec::new();
        while let Some(item) = walk.next().await {
            oids.push(item.unwrap().oid);
        }
        assert_eq!(
            oids,
            vec![oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), oid!(1, 3, 6, 1, 2, 1, 1, 2, 0)]
        );
        assert_eq!(walk.end_reason(), Some(WalkEnd::Exhausted));
        assert_eq!(mock.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_walk_seeds_next_request_from_reply() {
        let mock = MockTransport::new();
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "desc"));
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), 1));

        let session = mock_session(&mock, Version::V2c).await;
        session.walk(system()).collect_all().await.unwrap();

        let seeds: Vec<Oid> = mock
            .sent()
            .iter()
            .map(|d| {
                crate::message::CommunityMessage::decode(d.data.clone())
                    .unwrap()
                    .pdu
                    .varbinds[0]
                    .oid
                    .clone()
            })
            .collect();
        assert_eq!(seeds, vec![system(), oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)]);
    }

    #[tokio::test]
    async fn test_walk_ends_on_end_of_mib_view() {
        let mock = MockTransport::new();
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "desc"));
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::EndOfMibView));

        let session = mock_session(&mock, Version::V2c).await;
        let results = session.walk(system()).collect_all().await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_walk_v1_no_such_name_is_normal_end() {
        let mock = MockTransport::new();
        mock.queue_response(
            ResponseBuilder::new(0)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "desc")
                .build_v1(b"public"),
        );
        mock.queue_response(
            ResponseBuilder::new(0)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::Null)
                .error_status(ErrorStatus::NoSuchName)
                .error_index(1)
                .build_v1(b"public"),
        );

        let session = mock_session(&mock, Version::V1).await;
        let mut walk = session.walk(system());
        assert!(walk.next().await.unwrap().is_ok());
        assert!(walk.next().await.is_none());
        assert_eq!(walk.end_reason(), Some(WalkEnd::Exhausted));
    }

    #[tokio::test]
    async fn test_walk_yields_error_once() {
        let mock = MockTransport::new();
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "desc"));
        mock.queue_drop();

        let session = mock_session(&mock, Version::V2c).await;
        let mut walk = session.walk(system());

        assert!(walk.next().await.unwrap().is_ok());
        assert!(walk.next().await.unwrap().unwrap_err().is_timeout());
        assert!(walk.next().await.is_none());
        assert_eq!(walk.end_reason(), Some(WalkEnd::Error));
    }

    #[tokio::test]
    async fn test_walk_errors_on_decreasing_oid() {
        let mock = MockTransport::new();
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), "host1"));
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 1, 4, 0), "admin"));

        let session = mock_session(&mock, Version::V2c).await;
        let mut walk = session.walk(system());

        assert!(walk.next().await.unwrap().is_ok());
        match walk.next().await {
            Some(Err(Error::NonIncreasingOid { previous, current })) => {
                assert_eq!(previous, oid!(1, 3, 6, 1, 2, 1, 1, 5, 0));
                assert_eq!(current, oid!(1, 3, 6, 1, 2, 1, 1, 4, 0));
            }
            other => panic!("expected NonIncreasingOid, got {other:?}"),
        }
        assert!(walk.next().await.is_none());
    }

    #[tokio::test]
    async fn test_walk_errors_on_repeated_oid() {
        let mock = MockTransport::new();
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "desc"));
        mock.queue_response(reply(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "desc"));

        let session = mock_session(&mock, Version::V2c).await;
        let err = session.walk(system()).collect_all().await.unwrap_err();
        assert!(matches!(err, Error::NonIncreasingOid { .. }));
    }

    #[tokio::test]
    async fn test_bulk_walk_trims_outside_subtree() {
        let mock = MockTransport::new();
        mock.queue_response(
            ResponseBuilder::new(0)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "desc")
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 2, 0), oid!(1, 3, 6, 1, 4, 1, 99))
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), 1)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 2, 2, 0), 2)
                .build_v2c(b"public"),
        );

        let session = mock_session(&mock, Version::V2c).await;
        let mut walk = session.bulk_walk(system(), 10);
        let mut results = Vec::new();
        while let Some(item) = walk.next().await {
            results.push(item.unwrap());
        }
        assert_eq!(results.len(), 2);
        assert_eq!(walk.end_reason(), Some(WalkEnd::Exhausted));
        assert_eq!(mock.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_walk_reseeds_from_last_binding() {
        let mock = MockTransport::new();
        mock.queue_response(
            ResponseBuilder::new(0)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), "desc")
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 2, 0), oid!(1, 3, 6, 1, 4, 1, 99))
                .build_v2c(b"public"),
        );
        mock.queue_response(
            ResponseBuilder::new(0)
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 3, 0), Value::TimeTicks(100))
                .varbind(oid!(1, 3, 6, 1, 2, 1, 1, 4, 0), Value::EndOfMibView)
                .build_v2c(b"public"),
        );

        let session = mock_session(&mock, Version::V2c).await;
        let results = session.bulk_walk(system(), 2).collect_all().await.unwrap();
        assert_eq!(results.len(), 3);

        let second = crate::message::CommunityMessage::decode(mock.sent()[1].data.clone()).unwrap();
        assert_eq!(second.pdu.varbinds[0].oid, oid!(1, 3, 6, 1, 2, 1, 1, 2, 0));
        assert_eq!(second.pdu.max_repetitions(), Some(2));
    }

    #[tokio::test]
    async fn test_bulk_walk_empty_response() {
        let mock = MockTransport::new();
        mock.queue_response(ResponseBuilder::new(0).build_v2c(b"public"));

        let session = mock_session(&mock, Version::V2c).await;
        let mut walk = session.bulk_walk(system(), 10);
        assert!(walk.next().await.is_none());
        assert_eq!(walk.end_reason(), Some(WalkEnd::Exhausted));
    }

    #[tokio::test]
    async fn test_bulk_walk_rejects_zero_repetitions() {
        let mock = MockTransport::new();
        let session = mock_session(&mock, Version::V2c).await;
        for max_repetitions in [0, -3] {
            let mut walk = session.bulk_walk(system(), max_repetitions);
            assert!(matches!(
                walk.next().await,
                Some(Err(Error::Config(_)))
            ));
            assert_eq!(walk.end_reason(), Some(WalkEnd::Error));
            assert!(walk.next().await.is_none());
        }
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_walk_in_v1_fails() {
        let mock = MockTransport::new();
        let session = mock_session(&mock, Version::V1).await;
        let mut walk = session.bulk_walk(system(), 10);
        assert!(walk.next().await.unwrap().is_err());
        assert_eq!(walk.end_reason(), Some(WalkEnd::Error));
        assert!(mock.sent().is_empty());
    }
}
