use std::path::PathBuf;

/// Error taxonomy for the core library. `UnresolvedReference` and `UnknownSymbol`
/// are intentionally not variants here — per the error handling design, those
/// conditions never propagate as errors; they yield dropped edges or empty query
/// results respectively.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("no adapter registered for extension `{0}`")]
    UnsupportedExtension(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid graph document: {0}")]
    InvalidFormat(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
