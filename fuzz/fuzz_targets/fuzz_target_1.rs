#![no_main]

use hessian_codec::config::CodecConfig;
use hessian_codec::{decode, parse_call, parse_reply};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary input must fail cleanly: no panics, no unbounded allocation
    let _ = decode(data);
    let _ = parse_call(data, &CodecConfig::default());
    let _ = parse_reply(data, &CodecConfig::default());
});
