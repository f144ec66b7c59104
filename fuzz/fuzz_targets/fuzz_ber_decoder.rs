#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_session::ber::{Decoder, decode_signed, decode_unsigned};
use snmp_session::value::Value;
use snmp_session::varbind::{VarBind, decode_varbind_list};

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    let _ = Decoder::new(bytes.clone()).read_i64();
    let _ = Decoder::new(bytes.clone()).read_integer64(snmp_session::ber::tag::application::COUNTER64);
    let _ = Decoder::new(bytes.clone()).read_octet_string();
    let _ = Decoder::new(bytes.clone()).read_oid();
    let _ = Decoder::new(bytes.clone()).read_ip_address();
    let _ = Decoder::new(bytes.clone()).read_tlv();
    let _ = decode_signed(data);
    let _ = decode_unsigned(data);

    let _ = Value::decode(&mut Decoder::new(bytes.clone()));
    let _ = VarBind::decode(&mut Decoder::new(bytes.clone()));
    let _ = decode_varbind_list(&mut Decoder::new(bytes));
});
