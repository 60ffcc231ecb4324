use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("authentication failed for realm \"{realm}\" ({status})")]
    Authentication { realm: String, status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported output format \"{0}\" (expected json, xml, or csv)")]
    UnsupportedFormat(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
