use thiserror::Error;

/// Shared error type for every k2d crate.
///
/// Kinds track the error taxonomy from the design: `NotFound` maps to HTTP
/// 404 at the (out of scope) façade, `Conflict` to 409, everything else to
/// 500 with the wrapped message.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("{0}: {1}")]
    Serialization(String, #[source] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        Error::Conflict(what.into())
    }

    pub fn conversion(what: impl Into<String>) -> Self {
        Error::Conversion(what.into())
    }

    pub fn validation(what: impl Into<String>) -> Self {
        Error::Validation(what.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
