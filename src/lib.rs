// Phial - a tiny async web framework for the scope/receive/send protocol
//
// The host calls the application once per connection; Phial routes the path,
// assembles the request, runs the view and emits exactly one response.

// Re-export core functionality
pub use phial_core::*;

// Logging macros and configuration
pub use phial_log as log;

#[cfg(feature = "testing")]
pub use phial_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AppConfig,
        Connection,
        Error,
        FormValue,
        IntoResponse,
        PathParams,
        Phial,
        Receive,
        ReceiveMessage,
        Request,
        Response,
        Router,
        Scope,
        SendMessage,
        Sink,
        UploadedFile,
    };
}
