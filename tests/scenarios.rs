//! End-to-end scenarios across codec, validation and walk layers.

mod common;

use bytes::Bytes;
use common::*;
use snmp_session::message::raw::{decode_bindings, decode_message, decode_pdu};
use snmp_session::message::{CommunityMessage, ExpectedResponse, decode_response};
use snmp_session::pdu::{Pdu, PduType};
use snmp_session::{Error, ErrorStatus, Session, Value, VarBind, Version, WalkEnd, oid};

#[test]
fn get_request_v1_decodes_back() {
    let request = CommunityMessage::v1(&b"public"[..], Pdu::get_request(1, &[sys_descr()]));
    let encoded = request.encode();

    let raw = decode_message(encoded.clone()).unwrap();
    assert_eq!(raw.version, Version::V1);
    assert_eq!(raw.version.as_i32(), 0);
    assert_eq!(&raw.community[..], b"public");

    let pdu = decode_pdu(raw.pdu).unwrap();
    assert_eq!(pdu.pdu_type, PduType::GetRequest);
    let bindings: Vec<VarBind> = decode_bindings(pdu.bindings)
        .unwrap()
        .iter()
        .map(|b| b.to_varbind().unwrap())
        .collect();
    assert_eq!(bindings, vec![VarBind::new(sys_descr(), Value::Null)]);

    assert_eq!(CommunityMessage::decode(encoded).unwrap(), request);
}

#[test]
fn no_such_name_response_fails_validation() {
    let response = CommunityMessage::v1(
        &b"public"[..],
        Pdu::response(
            9,
            ErrorStatus::NoSuchName,
            1,
            vec![VarBind::null(nonexistent_oid())],
        ),
    )
    .encode();

    let expected = ExpectedResponse {
        version: Version::V1,
        community: b"public",
        request_id: 9,
        target: None,
    };
    match decode_response(response, &expected).unwrap_err() {
        Error::Snmp {
            status, index, oid, ..
        } => {
            assert_eq!(status, ErrorStatus::NoSuchName);
            assert_eq!(status.as_i32(), 2);
            assert_eq!(index, 1);
            assert_eq!(oid, Some(nonexistent_oid()));
        }
        other => panic!("expected SNMP error status, got {other:?}"),
    }
}

#[test]
fn garbage_response_is_a_decode_error() {
    let expected = ExpectedResponse {
        version: Version::V2c,
        community: b"public",
        request_id: 1,
        target: None,
    };
    let err = decode_response(Bytes::from_static(&[0x30, 0x03, 0x02, 0x01]), &expected);
    assert!(matches!(err, Err(Error::Decode { .. })));
}

#[tokio::test]
async fn walk_stops_at_subtree_boundary() {
    let agent = FakeAgent::start(vec![
        (oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("router")),
        (oid!(1, 3, 6, 1, 2, 1, 1, 2, 0), Value::ObjectIdentifier(oid!(1, 3, 6, 1, 4, 1, 9))),
        (oid!(1, 3, 6, 1, 2, 1, 2, 1, 0), Value::Integer(4)),
    ])
    .await;

    let session = Session::v1(agent.addr().to_string())
        .timeout(FAST_TIMEOUT)
        .retries(0)
        .connect()
        .await
        .unwrap();

    let mut walk = session.walk(system_subtree());
    let mut seen = Vec::new();
    while let Some(vb) = walk.next().await {
        seen.push(vb.unwrap().oid);
    }

    assert_eq!(
        seen,
        vec![oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), oid!(1, 3, 6, 1, 2, 1, 1, 2, 0)]
    );
    assert_eq!(walk.end_reason(), Some(WalkEnd::Exhausted));
    // Two in-subtree steps plus the one that left it.
    assert_eq!(agent.received(), 3);
}
