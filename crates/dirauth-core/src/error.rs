//! Error types for Dirauth

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Startup errors
    #[error("required configuration value is missing: {0}")]
    MissingConfig(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Request-time errors
    #[error("simple bind requires a credential when a bind DN is set")]
    UnauthenticatedBind,

    #[error("the directory rejected the supplied credentials")]
    InvalidCredentials,

    #[error("no directory entry matched the principal")]
    PrincipalNotFound,

    #[error("{matches} directory entries matched the principal")]
    AmbiguousPrincipal { matches: usize },

    #[error("directory operation failed: {0}")]
    Directory(String),

    #[error("failed to release directory connection: {0}")]
    ConnectionRelease(String),
}

impl Error {
    /// Whether this error is fatal to component activation.
    ///
    /// Startup errors prevent an authenticator from being constructed;
    /// everything else collapses to an ordinary authentication failure.
    pub fn is_startup(&self) -> bool {
        matches!(self, Error::MissingConfig(_) | Error::InvalidConfig(_))
    }
}
