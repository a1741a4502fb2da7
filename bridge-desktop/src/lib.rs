//! # Bridge Desktop
//!
//! Native implementations of the `bridge-traits` seams for desktop and
//! server targets: `reqwest` for HTTP and `tokio::fs` for file access.

pub mod filesystem;
pub mod http;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
