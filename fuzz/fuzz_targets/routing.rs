//! Fuzz target for route registration and matching.
//!
//! Arbitrary patterns may be rejected, but dispatch itself never fails.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use phial_core::{Error, PathParams, Request, Router};

#[derive(Debug, Arbitrary)]
struct FuzzRouting {
    patterns: Vec<String>,
    paths: Vec<String>,
}

async fn dummy_view(_req: Request, _params: PathParams) -> Result<&'static str, Error> {
    Ok("ok")
}

fuzz_target!(|data: FuzzRouting| {
    // Limit route count to prevent OOM
    let mut router = Router::new();
    for pattern in data.patterns.iter().take(64) {
        let _ = router.add_route(pattern, dummy_view);
    }

    for path in data.paths.iter().take(64) {
        let (first, p1) = router.dispatch(path);
        let (second, p2) = router.dispatch(path);
        assert!(first.ptr_eq(second));
        assert_eq!(p1, p2);
    }
});
