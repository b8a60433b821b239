//! End-to-end authentication flow
//!
//! Per call: `SystemBind -> Search -> RenderDn -> UserBind`. The system
//! connection is released as soon as the search completes; the user bind
//! opens an independent connection whose success is the verdict. No state
//! is retained between calls.

use async_trait::async_trait;
use dirauth_core::{Authenticator, LdapConfig, Result};
use ldap3::dn_escape;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::client::LdapDirectory;
use crate::directory::{Directory, DirectoryConnection};
use crate::resolver::{resolve_principal, SearchSpec};
use crate::template::Template;

/// LDAP implementation of the [`Authenticator`] contract.
///
/// Holds only immutable startup configuration; safe to share across
/// concurrent callers. Resolved DNs and connections are never cached, so
/// every call reflects the current directory state.
pub struct LdapAuthenticator {
    directory: Arc<dyn Directory>,
    user_dn: Template,
    search: SearchSpec,
}

impl LdapAuthenticator {
    /// Build an authenticator backed by a real LDAP server.
    ///
    /// Fails only for configuration errors; no connection is attempted
    /// here.
    pub fn new(config: &LdapConfig) -> Result<Self> {
        config.validate()?;
        let directory = Arc::new(LdapDirectory::new(config)?);
        Self::assemble(config, directory)
    }

    /// Build an authenticator with an injected connection provider.
    pub fn with_directory(config: &LdapConfig, directory: Arc<dyn Directory>) -> Result<Self> {
        config.validate()?;
        Self::assemble(config, directory)
    }

    fn assemble(config: &LdapConfig, directory: Arc<dyn Directory>) -> Result<Self> {
        Ok(Self {
            directory,
            user_dn: Template::parse(&config.user_dn_template)?,
            search: SearchSpec::from_config(config)?,
        })
    }

    async fn try_authenticate(&self, principal: &str, credential: &str) -> Result<String> {
        // SystemBind + Search; the system connection is not needed for the
        // user bind, release it as soon as the search returns.
        let mut system = self.directory.open_system().await?;
        let resolved = resolve_principal(system.as_mut(), &self.search, principal).await;
        close_logged(system.as_mut(), "system").await;
        let canonical_name = resolved?;

        // RenderDn; the canonical name comes from the directory but is
        // still escaped before it becomes part of DN syntax.
        let user_dn = self.user_dn.render(&dn_escape(canonical_name.as_str()));

        // UserBind; a successfully opened connection is the proof of
        // authentication, nothing further is read over it.
        let mut user = self.directory.open(&user_dn, credential).await?;
        close_logged(user.as_mut(), "user").await;

        Ok(user_dn)
    }
}

/// Release a connection, logging a failure without letting it mask the
/// primary outcome of the call.
async fn close_logged(conn: &mut dyn DirectoryConnection, role: &str) {
    if let Err(e) = conn.close().await {
        error!(role, error = %e, "failed to close directory connection");
    }
}

#[async_trait]
impl Authenticator for LdapAuthenticator {
    async fn authenticate(&self, principal: &str, credential: &str) -> Option<String> {
        match self.try_authenticate(principal, credential).await {
            Ok(user_dn) => {
                debug!(%user_dn, "authentication succeeded");
                Some(user_dn)
            }
            Err(e) => {
                // every failure reason collapses to the same empty verdict;
                // only this log line distinguishes them
                warn!(error = %e, "authentication failed");
                None
            }
        }
    }
}
