use thiserror::Error;

/// Result type for checkview-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl Error {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Error::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}
