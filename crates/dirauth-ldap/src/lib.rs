//! LDAP authenticator backend
//!
//! Verifies a principal/credential pair with the two-phase bind-and-search
//! protocol:
//!
//! 1. bind as a configured system identity,
//! 2. resolve the principal to a canonical name with a subtree search,
//! 3. render the candidate user DN from a single-marker template,
//! 4. bind again as that DN with the caller's credential; the outcome of
//!    that bind is the verdict.
//!
//! Supports LDAP and LDAPS servers, STARTTLS, and injection-safe filter
//! and DN substitution.

mod authenticator;
mod client;
mod directory;
mod resolver;
mod template;

pub use authenticator::LdapAuthenticator;
pub use client::{BindEnvironment, LdapDirectory};
pub use directory::{Directory, DirectoryConnection, DirectoryEntry};
pub use resolver::{resolve_principal, SearchSpec};
pub use template::Template;
