//! Single-marker substitution templates
//!
//! A template like `cn={0},ou=people,o=sevenSeas` is split once, at
//! construction time, into the prefix and suffix around the first `{0}`
//! marker. Rendering is then plain concatenation, so a malformed template
//! can never surface during an authentication call.

use dirauth_core::{Error, Result, SUBSTITUTION_TOKEN};

/// A template string parsed around its `{0}` marker.
///
/// Only the first occurrence of the marker is honored; any later
/// occurrence becomes part of the suffix verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    prefix: String,
    suffix: String,
}

impl Template {
    /// Parse a template, rejecting empty or markerless input.
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(Error::InvalidConfig("template cannot be empty".into()));
        }
        let index = template.find(SUBSTITUTION_TOKEN).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "template [{template}] must contain the '{SUBSTITUTION_TOKEN}' marker \
                 to understand where to insert the runtime value"
            ))
        })?;

        Ok(Self {
            prefix: template[..index].to_string(),
            suffix: template[index + SUBSTITUTION_TOKEN.len()..].to_string(),
        })
    }

    /// Substitute `value` for the marker.
    ///
    /// Pure concatenation; the caller escapes `value` for the target
    /// syntax (LDAP filter or DN) beforehand.
    pub fn render(&self, value: &str) -> String {
        format!("{}{}{}", self.prefix, value, self.suffix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_prefix_and_suffix() {
        let template = Template::parse("cn={0},ou=people,o=sevenSeas").unwrap();
        assert_eq!(template.prefix(), "cn=");
        assert_eq!(template.suffix(), ",ou=people,o=sevenSeas");
    }

    #[test]
    fn render_replaces_the_marker() {
        let template = Template::parse("cn={0},ou=people,o=sevenSeas").unwrap();
        assert_eq!(template.render("foo"), "cn=foo,ou=people,o=sevenSeas");
    }

    #[test]
    fn marker_at_either_end() {
        let template = Template::parse("{0}@example.org").unwrap();
        assert_eq!(template.render("foo"), "foo@example.org");

        let template = Template::parse("mail={0}").unwrap();
        assert_eq!(template.render("foo@test.org"), "mail=foo@test.org");
    }

    #[test]
    fn only_first_marker_is_honored() {
        let template = Template::parse("cn={0},ou={0}").unwrap();
        assert_eq!(template.render("foo"), "cn=foo,ou={0}");
    }

    #[test]
    fn rejects_empty_template() {
        assert!(Template::parse("").is_err());
        assert!(Template::parse("   ").is_err());
    }

    #[test]
    fn rejects_missing_marker() {
        let err = Template::parse("cn=admin").unwrap_err();
        assert!(err.is_startup());
    }
}
