#![no_main]
use libfuzzer_sys::fuzz_target;
use tabulite::sanitize::sanitize_column_name;

fuzz_target!(|raw: &str| {
    let out = sanitize_column_name(raw);
    assert!(!out.is_empty());
    assert!(out.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_'));
    assert_eq!(sanitize_column_name(&out), out);
});
