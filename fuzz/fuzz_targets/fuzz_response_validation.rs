#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_session::Version;
use snmp_session::message::{ExpectedResponse, decode_response};

fuzz_target!(|data: &[u8]| {
    let expected = ExpectedResponse {
        version: Version::V2c,
        community: b"public",
        request_id: 1,
        target: None,
    };
    let _ = decode_response(Bytes::copy_from_slice(data), &expected);
});
