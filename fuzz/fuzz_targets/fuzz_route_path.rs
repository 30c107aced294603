//! Fuzz target: `RoutePath` normalisation.
//!
//! Any accepted path is non-empty, has no leading slash, and parses to
//! itself again from its display form.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relay_core::RoutePath;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(path) = RoutePath::parse(raw) else {
        return;
    };
    assert!(!path.as_str().is_empty());
    assert!(!path.as_str().starts_with('/'));
    let reparsed = RoutePath::parse(&path.to_string()).expect("display form must parse");
    assert_eq!(reparsed, path);
});
