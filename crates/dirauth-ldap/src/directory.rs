//! Directory access seam
//!
//! The authenticator talks to the directory through these traits so the
//! orchestration can be exercised against a scripted backend. The real
//! implementation lives in [`crate::client`].

use async_trait::async_trait;
use dirauth_core::Result;
use std::collections::HashMap;

/// One entry returned by a directory search
#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry
    pub dn: String,

    /// Requested attributes, each with zero or more values
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// First value of an attribute, if present.
    pub fn first(&self, attr: &str) -> Option<&str> {
        self.attrs.get(attr).and_then(|v| v.first()).map(String::as_str)
    }
}

/// An open, authenticated connection to the directory.
///
/// Connections are scoped resources: the call that opened one owns it and
/// must `close` it on every exit path before returning.
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Subtree-scope search under `base_dn`, returning `attrs` for every
    /// matching entry.
    async fn search_subtree(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>>;

    /// Release the connection. A failure here is reported to the caller
    /// for logging but must never mask the primary outcome.
    async fn close(&mut self) -> Result<()>;
}

/// Opens authenticated directory connections.
///
/// Stateless beyond its immutable configuration; a successful `open` is by
/// itself proof that the directory accepted the supplied identity and
/// credential.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Open a connection bound as `bind_dn` with `credential`.
    async fn open(&self, bind_dn: &str, credential: &str) -> Result<Box<dyn DirectoryConnection>>;

    /// Open a connection bound as the configured system identity.
    async fn open_system(&self) -> Result<Box<dyn DirectoryConnection>>;
}
