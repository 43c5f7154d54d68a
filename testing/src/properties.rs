//! proptest strategies for request parts.

use proptest::prelude::*;

/// Upper-case HTTP methods.
pub fn method() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("GET".to_string()),
        Just("POST".to_string()),
        Just("PUT".to_string()),
        Just("PATCH".to_string()),
        Just("DELETE".to_string()),
    ]
}

/// Absolute paths of up to four plain segments.
pub fn path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9_-]{1,8}", 0..4)
        .prop_map(|segments| format!("/{}", segments.join("/")))
}

/// Query strings without a leading `?`, possibly empty.
pub fn query_string() -> impl Strategy<Value = String> {
    prop::collection::vec(("[a-z]{1,6}", "[a-z0-9]{0,6}"), 0..3).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    })
}

/// Arbitrary body bytes.
pub fn body() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Printable UTF-8 bodies.
pub fn text_body() -> impl Strategy<Value = String> {
    "[ -~]{0,256}"
}
