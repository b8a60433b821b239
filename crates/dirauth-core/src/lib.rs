//! Dirauth Core Library
//!
//! Boundary types shared by every authenticator backend: the inbound
//! [`Authenticator`] contract, the error taxonomy and the typed
//! configuration schema.

pub mod config;
pub mod error;

pub use config::{LdapConfig, Referral};
pub use error::{Error, Result};

use async_trait::async_trait;

/// Dirauth version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Substitution marker used by DN templates and search filters.
///
/// The zero index currently means nothing, but could be utilized in the
/// future for other substitution techniques.
pub const SUBSTITUTION_TOKEN: &str = "{0}";

/// Default connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Default search filter template
pub const DEFAULT_SEARCH_FILTER: &str = "mail={0}";

/// Default attribute holding the canonical name of a matched entry
pub const DEFAULT_CANONICAL_NAME_ATTRIBUTE: &str = "cn";

/// The inbound contract of the identity-management boundary.
///
/// A backend verifies the caller-supplied principal/credential pair and
/// returns the resolved directory identity on success. Any failure, wrong
/// password, unknown principal or unreachable directory alike, collapses
/// to `None`; the reason is available only through the logging side
/// channel so the return value carries no account-enumeration signal.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, principal: &str, credential: &str) -> Option<String>;
}
