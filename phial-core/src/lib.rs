// Core library for the Phial dispatch layer
// Routing, request assembly, response emission and the per-connection pipeline

pub mod application;
pub mod config;
pub mod error;
pub mod form;
pub mod handler;
pub mod multipart;
pub mod protocol;
pub mod request;
pub mod response;
pub mod router;
pub mod status;

// Re-export commonly used types
pub use application::*;
pub use config::*;
pub use error::*;
pub use form::*;
pub use handler::*;
pub use multipart::{MultipartParser, Part};
pub use protocol::*;
pub use request::*;
pub use response::*;
pub use router::{Route, Router};
pub use status::*;
