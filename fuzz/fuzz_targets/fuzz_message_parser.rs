#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_session::message::raw::{decode_bindings, decode_message, decode_pdu};
use snmp_session::message::{CommunityMessage, Message};

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    let _ = Message::decode(bytes.clone());
    let _ = CommunityMessage::decode(bytes.clone());

    // Span layer, walked as far as each stage succeeds
    if let Ok(raw) = decode_message(bytes)
        && let Ok(pdu) = decode_pdu(raw.pdu)
        && let Ok(bindings) = decode_bindings(pdu.bindings)
    {
        for binding in bindings {
            let _ = binding.to_varbind();
        }
    }
});
