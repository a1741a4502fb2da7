//! # Manifest Model & Parser
//!
//! Turns raw manifest text (a CSV describing named assets and their
//! download URLs) into an ordered sequence of [`AssetRecord`]s.
//!
//! The manifest format is a header row plus `name,link,path` data rows.
//! Parsing is deliberately forgiving: quote characters are stripped,
//! short or malformed rows are skipped, and empty input yields an empty
//! result rather than an error.

pub mod error;
pub mod parser;
pub mod record;

pub use error::{ManifestError, Result};
pub use parser::{load, parse, parse_bytes};
pub use record::AssetRecord;
