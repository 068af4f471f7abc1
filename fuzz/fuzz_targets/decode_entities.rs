#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut buf = data.to_vec();
    let len = html::decode_entities_in_place(&mut buf);
    assert!(len <= data.len(), "decoding must never grow the buffer");
    buf.truncate(len);

    // Decoded output is a fixed point.
    let again = html::decode_entities(&buf);
    assert_eq!(again, buf);
});
