//! LDAP connection provider
//!
//! Assembles the bind environment from the typed configuration, enforces
//! the RFC 4513 unauthenticated-bind rule before any network I/O, and
//! opens `ldap3` connections for the system and user bind phases.

use async_trait::async_trait;
use dirauth_core::{Error, LdapConfig, Referral, Result};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::time::Duration;
use tracing::{debug, warn};

use crate::directory::{Directory, DirectoryConnection, DirectoryEntry};

/// The only authentication mechanism the provider supports
const SIMPLE_AUTHENTICATION_MECHANISM: &str = "simple";

/// LDAP result code for invalid credentials
const RC_INVALID_CREDENTIALS: u32 = 49;

/// The full parameter set of one bind attempt.
///
/// Built once from the configuration with the override map applied
/// (overrides win on conflict), then re-targeted per call at a concrete
/// (DN, credential) pair.
#[derive(Debug, Clone)]
pub struct BindEnvironment {
    pub url: String,
    pub mechanism: &'static str,
    pub bind_dn: String,
    pub credential: String,
    pub connect_timeout: Duration,
    pub starttls: bool,
    pub skip_tls_verify: bool,
    pub referral: Referral,
    pub pooling: bool,
}

impl BindEnvironment {
    /// Merge the typed configuration with its override map.
    ///
    /// Unknown override keys are a startup error; silently ignoring one
    /// would hide a misconfigured deployment until its first bind.
    pub fn from_config(config: &LdapConfig) -> Result<Self> {
        let mut env = Self {
            url: config.url.clone(),
            mechanism: SIMPLE_AUTHENTICATION_MECHANISM,
            bind_dn: String::new(),
            credential: String::new(),
            connect_timeout: config.connect_timeout(),
            starttls: config.tls,
            skip_tls_verify: config.skip_tls_verify,
            referral: config.referral,
            pooling: config.pooling,
        };

        for (key, value) in &config.overrides {
            match key.as_str() {
                "url" => env.url = value.clone(),
                "tls" => env.starttls = parse_bool(key, value)?,
                "skip_tls_verify" => env.skip_tls_verify = parse_bool(key, value)?,
                "connect_timeout_ms" => {
                    let ms: u64 = value.parse().map_err(|_| {
                        Error::InvalidConfig(format!(
                            "override connect_timeout_ms [{value}] is not a number"
                        ))
                    })?;
                    env.connect_timeout = Duration::from_millis(ms);
                }
                "referral" => env.referral = value.parse()?,
                "pooling" => env.pooling = parse_bool(key, value)?,
                other => {
                    return Err(Error::InvalidConfig(format!(
                        "unknown bind environment override [{other}]"
                    )));
                }
            }
        }

        Ok(env)
    }

    /// Re-target the environment at a concrete identity.
    pub fn bind_as(&self, bind_dn: &str, credential: &str) -> Self {
        Self {
            bind_dn: bind_dn.to_string(),
            credential: credential.to_string(),
            ..self.clone()
        }
    }

    /// Reject environments that violate the directory's authentication
    /// mechanism invariants, before a connection attempt is made.
    ///
    /// Simple bind with a non-blank DN and a blank credential is an
    /// "unauthenticated bind" per RFC 4513 section 5.1.2 and must never
    /// pass as a successful authentication. A blank DN is the anonymous
    /// path and carries no credential constraint.
    pub fn validate(&self) -> Result<()> {
        if self.mechanism == SIMPLE_AUTHENTICATION_MECHANISM
            && !self.bind_dn.trim().is_empty()
            && self.credential.trim().is_empty()
        {
            return Err(Error::UnauthenticatedBind);
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("override {key} [{value}] is not a boolean")))
}

/// `ldap3`-backed connection provider
pub struct LdapDirectory {
    env: BindEnvironment,
    system_dn: String,
    system_password: String,
}

impl LdapDirectory {
    pub fn new(config: &LdapConfig) -> Result<Self> {
        Ok(Self {
            env: BindEnvironment::from_config(config)?,
            system_dn: config.system_dn.clone(),
            system_password: config.system_password.clone(),
        })
    }

    async fn connect(&self) -> Result<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.env.connect_timeout)
            .set_starttls(self.env.starttls)
            .set_no_tls_verify(self.env.skip_tls_verify);

        debug!(
            url = %self.env.url,
            referral = self.env.referral.as_str(),
            pooling = self.env.pooling,
            "connecting to directory"
        );

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.env.url)
            .await
            .map_err(|e| Error::Directory(format!("failed to connect to {}: {e}", self.env.url)))?;

        // drive the connection until the handle unbinds or drops
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "ldap connection error");
            }
        });

        Ok(ldap)
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    async fn open(&self, bind_dn: &str, credential: &str) -> Result<Box<dyn DirectoryConnection>> {
        self.env.bind_as(bind_dn, credential).validate()?;

        let mut ldap = self.connect().await?;

        let result = ldap
            .simple_bind(bind_dn, credential)
            .await
            .map_err(|e| Error::Directory(format!("bind failed: {e}")))?;

        if result.rc != 0 {
            let _ = ldap.unbind().await;
            if result.rc == RC_INVALID_CREDENTIALS {
                return Err(Error::InvalidCredentials);
            }
            return Err(Error::Directory(format!(
                "bind as [{bind_dn}] failed with result code {}",
                result.rc
            )));
        }

        Ok(Box::new(LdapConnection { ldap }))
    }

    async fn open_system(&self) -> Result<Box<dyn DirectoryConnection>> {
        self.open(&self.system_dn, &self.system_password).await
    }
}

struct LdapConnection {
    ldap: Ldap,
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    async fn search_subtree(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<DirectoryEntry>> {
        let (results, _res) = self
            .ldap
            .search(base_dn, Scope::Subtree, filter, attrs.to_vec())
            .await
            .map_err(|e| Error::Directory(format!("search failed: {e}")))?
            .success()
            .map_err(|e| Error::Directory(format!("search error: {e}")))?;

        Ok(results
            .into_iter()
            .map(|r| {
                let entry = SearchEntry::construct(r);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .collect())
    }

    async fn close(&mut self) -> Result<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| Error::ConnectionRelease(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LdapConfig {
        LdapConfig {
            url: "ldap://localhost:10389".to_string(),
            system_dn: "uid=admin,ou=system".to_string(),
            system_password: "secret".to_string(),
            base_dn: "ou=people,o=sevenSeas".to_string(),
            search_filter: "mail={0}".to_string(),
            user_dn_template: "cn={0},ou=people,o=sevenSeas".to_string(),
            ..Default::default()
        }
    }

    fn environment() -> BindEnvironment {
        BindEnvironment::from_config(&config()).unwrap()
    }

    #[test]
    fn simple_bind_with_empty_credential_is_rejected() {
        let env = environment().bind_as("cn=foo,ou=people,o=sevenSeas", "");
        assert!(matches!(env.validate(), Err(Error::UnauthenticatedBind)));
    }

    #[test]
    fn whitespace_credential_is_rejected() {
        let env = environment().bind_as("cn=foo,ou=people,o=sevenSeas", "   ");
        assert!(matches!(env.validate(), Err(Error::UnauthenticatedBind)));
    }

    #[test]
    fn simple_bind_with_credential_is_accepted() {
        let env = environment().bind_as("cn=foo,ou=people,o=sevenSeas", "secret");
        assert!(env.validate().is_ok());
    }

    #[test]
    fn anonymous_bind_is_accepted() {
        let env = environment().bind_as("", "");
        assert!(env.validate().is_ok());

        // blank-after-trim DN is still the anonymous path
        let env = environment().bind_as("   ", "");
        assert!(env.validate().is_ok());
    }

    #[test]
    fn environment_defaults_follow_config() {
        let env = environment();
        assert_eq!(env.mechanism, "simple");
        assert_eq!(env.connect_timeout, Duration::from_millis(10_000));
        assert_eq!(env.referral, Referral::Follow);
        assert!(env.pooling);
        assert!(!env.starttls);
    }

    #[test]
    fn overrides_win_on_conflict() {
        let mut config = config();
        config.overrides.insert("referral".to_string(), "ignore".to_string());
        config.overrides.insert("pooling".to_string(), "false".to_string());
        config
            .overrides
            .insert("connect_timeout_ms".to_string(), "2500".to_string());

        let env = BindEnvironment::from_config(&config).unwrap();
        assert_eq!(env.referral, Referral::Ignore);
        assert!(!env.pooling);
        assert_eq!(env.connect_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn unknown_override_is_a_startup_error() {
        let mut config = config();
        config
            .overrides
            .insert("page_size".to_string(), "100".to_string());

        let err = BindEnvironment::from_config(&config).unwrap_err();
        assert!(err.is_startup());
    }

    #[test]
    fn malformed_override_value_is_a_startup_error() {
        let mut config = config();
        config
            .overrides
            .insert("pooling".to_string(), "yes".to_string());
        assert!(BindEnvironment::from_config(&config).is_err());

        let mut config = self::config();
        config
            .overrides
            .insert("connect_timeout_ms".to_string(), "fast".to_string());
        assert!(BindEnvironment::from_config(&config).is_err());
    }
}
