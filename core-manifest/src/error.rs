use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Manifest file error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;
