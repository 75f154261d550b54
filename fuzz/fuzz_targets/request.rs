//! Fuzz target for request assembly from raw scope parts.

#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use phial_core::{Request, Scope};

#[derive(Debug, Arbitrary)]
struct FuzzRequest {
    post: bool,
    path: String,
    query: Vec<u8>,
    headers: Vec<(Vec<u8>, Vec<u8>)>,
    body: Vec<u8>,
}

fuzz_target!(|data: FuzzRequest| {
    let mut scope = Scope::http(if data.post { "POST" } else { "GET" }, &data.path);
    scope.query_string = Bytes::from(data.query);
    scope.headers = data
        .headers
        .into_iter()
        .take(32)
        .map(|(name, value)| (Bytes::from(name), Bytes::from(value)))
        .collect();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let _ = runtime.block_on(Request::from_parts(&scope, Bytes::from(data.body)));
    let partial = Request::partial(&scope);
    assert_eq!(partial.path(), data.path);
});
