use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    /// Network-level failure reaching the script endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint responded, but the script itself reported a failure
    #[error("{message}")]
    Script { message: String },

    /// The response body was not the expected JSON payload
    #[error("Unexpected script response: {0}")]
    InvalidResponse(String),

    #[error("Invalid folder ID: {0}")]
    InvalidFolderId(String),
}

pub type Result<T> = std::result::Result<T, ScriptError>;
