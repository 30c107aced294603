//! Fuzz target: JSON decoding of `ApiRequest`.
//!
//! Arbitrary bytes fed to the request decoder must never panic, and any
//! request that decodes must survive re-encoding unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_core::ApiRequest;

fuzz_target!(|data: &[u8]| {
    let Ok(request) = serde_json::from_slice::<ApiRequest>(data) else {
        return;
    };
    let json = serde_json::to_vec(&request).expect("decoded request must re-encode");
    let again: ApiRequest =
        serde_json::from_slice(&json).expect("re-encoded request must decode");
    assert_eq!(again, request, "request must survive a JSON round trip");
});
