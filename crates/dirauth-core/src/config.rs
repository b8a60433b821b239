//! Configuration for Dirauth
//!
//! The configuration is loaded once at startup into a typed, immutable
//! struct and validated before any authenticator is constructed. A missing
//! required value is a single enumerable startup error, never a scattered
//! runtime check.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::{
    DEFAULT_CANONICAL_NAME_ATTRIBUTE, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_SEARCH_FILTER,
    SUBSTITUTION_TOKEN,
};

/// LDAP authenticator configuration (`[ldap]` section of the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LdapConfig {
    /// LDAP server URL (ldap:// or ldaps://)
    /// Example: "ldap://ldap.example.com:389"
    #[serde(default)]
    pub url: String,

    /// Negotiate TLS (STARTTLS) on a plain ldap:// connection.
    /// ldaps:// URLs are encrypted regardless of this flag.
    #[serde(default)]
    pub tls: bool,

    /// Skip TLS certificate verification (not recommended for production)
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// DN of the system (service) identity used for the search phase
    /// Example: "uid=admin,ou=system"
    #[serde(default)]
    pub system_dn: String,

    /// Credential of the system identity
    #[serde(default)]
    pub system_password: String,

    /// Base DN for the principal search
    /// Example: "ou=people,o=sevenSeas"
    #[serde(default)]
    pub base_dn: String,

    /// Search filter template, must contain the `{0}` marker
    /// Example: "mail={0}"
    #[serde(default = "default_search_filter")]
    pub search_filter: String,

    /// DN template for the user bind, must contain the `{0}` marker
    /// Example: "cn={0},ou=people,o=sevenSeas"
    #[serde(default)]
    pub user_dn_template: String,

    /// Attribute holding the canonical name of a matched entry
    #[serde(default = "default_canonical_name_attribute")]
    pub canonical_name_attribute: String,

    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Referral-following policy
    #[serde(default)]
    pub referral: Referral,

    /// Enable connection pooling in the directory client
    #[serde(default = "default_pooling")]
    pub pooling: bool,

    /// Extra bind-environment overrides; a known key here wins over the
    /// corresponding typed field above
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_search_filter() -> String {
    DEFAULT_SEARCH_FILTER.to_string()
}

fn default_canonical_name_attribute() -> String {
    DEFAULT_CANONICAL_NAME_ATTRIBUTE.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_pooling() -> bool {
    true
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            tls: false,
            skip_tls_verify: false,
            system_dn: String::new(),
            system_password: String::new(),
            base_dn: String::new(),
            search_filter: default_search_filter(),
            user_dn_template: String::new(),
            canonical_name_attribute: default_canonical_name_attribute(),
            connect_timeout_ms: default_connect_timeout_ms(),
            referral: Referral::default(),
            pooling: default_pooling(),
            overrides: HashMap::new(),
        }
    }
}

/// Wrapper matching the on-disk layout of the config file
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ldap: LdapConfig,
}

impl LdapConfig {
    /// Load the `[ldap]` section from a TOML config file.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("failed to read config {path}: {e}")))?;

        let file: ConfigFile = toml::from_str(&content)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config {path}: {e}")))?;

        Ok(file.ldap)
    }

    /// Build a configuration from `DIRAUTH_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DIRAUTH_LDAP_URL") {
            config.url = url;
        }
        if let Ok(v) = std::env::var("DIRAUTH_LDAP_TLS") {
            config.tls = v == "true";
        }
        if let Ok(dn) = std::env::var("DIRAUTH_SYSTEM_DN") {
            config.system_dn = dn;
        }
        if let Ok(pw) = std::env::var("DIRAUTH_SYSTEM_PASSWORD") {
            config.system_password = pw;
        }
        if let Ok(dn) = std::env::var("DIRAUTH_BASE_DN") {
            config.base_dn = dn;
        }
        if let Ok(filter) = std::env::var("DIRAUTH_SEARCH_FILTER") {
            config.search_filter = filter;
        }
        if let Ok(template) = std::env::var("DIRAUTH_USER_DN_TEMPLATE") {
            config.user_dn_template = template;
        }
        if let Ok(timeout) = std::env::var("DIRAUTH_CONNECT_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                config.connect_timeout_ms = ms;
            }
        }
        if let Ok(referral) = std::env::var("DIRAUTH_REFERRAL") {
            if let Ok(r) = referral.parse() {
                config.referral = r;
            }
        }

        config
    }

    /// Validate the configuration; called once before the authenticator
    /// becomes available for authentication calls.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::MissingConfig("url"));
        }
        let url = url::Url::parse(&self.url)
            .map_err(|e| Error::InvalidConfig(format!("invalid url [{}]: {e}", self.url)))?;
        if url.scheme() != "ldap" && url.scheme() != "ldaps" {
            return Err(Error::InvalidConfig(format!(
                "url scheme must be ldap or ldaps, got [{}]",
                url.scheme()
            )));
        }

        if self.system_dn.trim().is_empty() {
            return Err(Error::MissingConfig("system_dn"));
        }
        if self.system_password.trim().is_empty() {
            return Err(Error::MissingConfig("system_password"));
        }
        if self.base_dn.trim().is_empty() {
            return Err(Error::MissingConfig("base_dn"));
        }

        if self.search_filter.trim().is_empty() {
            return Err(Error::MissingConfig("search_filter"));
        }
        if !self.search_filter.contains(SUBSTITUTION_TOKEN) {
            return Err(Error::InvalidConfig(format!(
                "search_filter [{}] must contain the '{SUBSTITUTION_TOKEN}' marker",
                self.search_filter
            )));
        }

        if self.user_dn_template.trim().is_empty() {
            return Err(Error::MissingConfig("user_dn_template"));
        }
        if !self.user_dn_template.contains(SUBSTITUTION_TOKEN) {
            return Err(Error::InvalidConfig(format!(
                "user_dn_template [{}] must contain the '{SUBSTITUTION_TOKEN}' marker",
                self.user_dn_template
            )));
        }

        if self.canonical_name_attribute.trim().is_empty() {
            return Err(Error::MissingConfig("canonical_name_attribute"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "connect_timeout_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Referral-following policy of the directory client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Referral {
    #[default]
    Follow,
    Ignore,
    Throw,
}

impl Referral {
    pub fn as_str(&self) -> &'static str {
        match self {
            Referral::Follow => "follow",
            Referral::Ignore => "ignore",
            Referral::Throw => "throw",
        }
    }
}

impl FromStr for Referral {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "follow" => Ok(Referral::Follow),
            "ignore" => Ok(Referral::Ignore),
            "throw" => Ok(Referral::Throw),
            other => Err(Error::InvalidConfig(format!(
                "referral must be follow, ignore or throw, got [{other}]"
            ))),
        }
    }
}
