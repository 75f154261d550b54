//! Fuzz target for multipart/form-data parsing.
//!
//! Arbitrary content types and bodies must either parse or return an
//! error, never panic.

#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use phial_core::MultipartParser;

#[derive(Debug, Arbitrary)]
struct FuzzMultipart {
    content_type: String,
    boundary: String,
    body: Vec<u8>,
}

fuzz_target!(|data: FuzzMultipart| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    runtime.block_on(async {
        if let Ok(parser) = MultipartParser::from_content_type(&data.content_type) {
            let _ = parser.parse(Bytes::from(data.body.clone())).await;
        }

        // Well-formed framing around arbitrary part contents
        if let Ok(parser) = MultipartParser::new(data.boundary.clone()) {
            let mut body = format!("--{}\r\n", data.boundary).into_bytes();
            body.extend_from_slice(&data.body);
            body.extend_from_slice(format!("\r\n--{}--", data.boundary).as_bytes());
            let _ = parser.parse_params(Bytes::from(body)).await;
        }
    });
});
