//! # Bridge Traits
//!
//! Platform abstraction seams for the drive asset sync engine. The core
//! crates depend only on these traits; `bridge-desktop` provides the
//! native implementations backed by `reqwest` and `tokio::fs`.

pub mod error;
pub mod http;
pub mod storage;

pub use error::{BridgeError, Result};
pub use http::{FetchedBody, HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::FileSystemAccess;
