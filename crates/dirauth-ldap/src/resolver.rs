//! Principal resolution
//!
//! Resolves an untrusted caller-supplied principal to the canonical name
//! of exactly one directory entry, using a privileged connection supplied
//! by the caller. Zero matches and multiple matches are both failures: an
//! ambiguous principal must never silently authenticate as whichever entry
//! the server happened to return first.

use dirauth_core::{Error, LdapConfig, Result};
use ldap3::ldap_escape;
use tracing::debug;

use crate::directory::DirectoryConnection;
use crate::template::Template;

/// Immutable description of the principal search, built once at startup
#[derive(Debug, Clone)]
pub struct SearchSpec {
    /// Subtree root of the search
    pub base_dn: String,

    /// Filter template with the `{0}` marker
    pub filter: Template,

    /// Attribute whose first value is the canonical name
    pub attribute: String,
}

impl SearchSpec {
    pub fn from_config(config: &LdapConfig) -> Result<Self> {
        Ok(Self {
            base_dn: config.base_dn.clone(),
            filter: Template::parse(&config.search_filter)?,
            attribute: config.canonical_name_attribute.clone(),
        })
    }
}

/// Resolve `principal` to the canonical name of its unique entry.
///
/// The principal is escaped for LDAP filter syntax before substitution,
/// so filter metacharacters in the caller-supplied value cannot widen the
/// search. The connection is borrowed; releasing it on every path is the
/// caller's responsibility.
pub async fn resolve_principal(
    conn: &mut dyn DirectoryConnection,
    spec: &SearchSpec,
    principal: &str,
) -> Result<String> {
    let filter = spec.filter.render(&ldap_escape(principal));
    debug!(base_dn = %spec.base_dn, %filter, "searching for principal");

    let entries = conn
        .search_subtree(&spec.base_dn, &filter, &[&spec.attribute])
        .await?;

    match entries.len() {
        0 => Err(Error::PrincipalNotFound),
        1 => {
            let entry = &entries[0];
            entry
                .first(&spec.attribute)
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::Directory(format!(
                        "entry [{}] has no '{}' attribute",
                        entry.dn, spec.attribute
                    ))
                })
        }
        matches => Err(Error::AmbiguousPrincipal { matches }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_rendering_escapes_metacharacters() {
        let filter = Template::parse("mail={0}").unwrap();
        let rendered = filter.render(&ldap_escape("*)(uid=admin"));
        assert_eq!(rendered, "mail=\\2a\\29\\28uid=admin");
    }

    #[test]
    fn plain_principals_pass_through() {
        let filter = Template::parse("mail={0}").unwrap();
        let rendered = filter.render(&ldap_escape("foo@test.org"));
        assert_eq!(rendered, "mail=foo@test.org");
    }
}
