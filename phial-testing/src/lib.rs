//! Testing utilities for Phial applications.
//!
//! - **SendMock** - recording send channel
//! - **MockReceive** - scripted receive channel
//! - **TestClient** - drives an app end to end
//! - **Assertions** - status, header and body checks
//!
//! ## Quick Start
//!
//! ```
//! use phial_core::{Error, Response, Router};
//! use phial_testing::*;
//!
//! # tokio_test::block_on(async {
//! let router = Router::new()
//!     .route("^/hello$", |_req, _params| async {
//!         Ok::<_, Error>(Response::text("Hello!"))
//!     })
//!     .unwrap();
//!
//! let client = TestClient::from_router(router);
//! let response = client.get("/hello").await;
//! assert_status(&response, 200);
//! assert_header(&response, "content-type", "text/plain");
//! assert_body(&response, "Hello!");
//! # });
//! ```
//!
//! ## Driving an app by hand
//!
//! ```
//! use phial_core::{Phial, Router, Scope};
//! use phial_testing::{MockReceive, SendMock};
//!
//! # tokio_test::block_on(async {
//! let app = Phial::new(Router::new());
//! let sent = SendMock::new();
//! app.handle(Scope::http("GET", "/missing"), &mut MockReceive::empty(), &mut sent.clone())
//!     .await
//!     .unwrap();
//! assert_eq!(sent.sent()[0].status(), Some(404));
//! # });
//! ```

mod assertions;
mod mock;
mod test_client;

pub use assertions::{
    assert_body, assert_body_contains, assert_header, assert_json, assert_no_response,
    assert_status,
};
pub use mock::{MockReceive, SendMock};
pub use test_client::{MultipartForm, TestClient, TestRequest, TestResponse};

// Re-export common testing utilities
pub use tokio::test as tokio_test;
