//! Image references and image rewrite rules.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("valid tag regex"));

static DIGEST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}$")
        .expect("valid digest regex")
});

/// A parsed `[registry/]repo[:tag][@digest]` reference.
///
/// The tag separator is the last `:` after the last `/`, so a registry host
/// with a port (`localhost:5000/app`) is never mistaken for a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Everything before the tag, including any registry host.
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageRef {
    /// Split a reference into repository, tag and digest.
    ///
    /// Only a reference that cannot be split is an error: an empty
    /// repository, or an empty tag or digest after its separator. Anything
    /// that splits but falls outside the registry grammar is accepted and
    /// logged at debug level.
    pub fn parse(reference: &str) -> CoreResult<Self> {
        if reference.is_empty() {
            return Err(CoreError::image(reference, "empty reference"));
        }

        let (name_tag, digest) = match reference.rsplit_once('@') {
            Some((_, "")) => return Err(CoreError::image(reference, "empty digest")),
            Some((name_tag, digest)) => (name_tag, Some(digest)),
            None => (reference, None),
        };

        let slash = name_tag.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (repository, tag) = match name_tag[slash..].rfind(':') {
            Some(colon) => {
                let split = slash + colon;
                (&name_tag[..split], Some(&name_tag[split + 1..]))
            }
            None => (name_tag, None),
        };

        if repository.is_empty() {
            return Err(CoreError::image(reference, "empty repository"));
        }
        if tag == Some("") {
            return Err(CoreError::image(reference, "empty tag"));
        }
        if let Some(issue) = grammar_issue(repository, tag, digest) {
            debug!("Image `{}` is unusual: {}", reference, issue);
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.map(str::to_string),
            digest: digest.map(str::to_string),
        })
    }

    /// A short name has no registry or namespace component.
    pub fn is_unqualified(&self) -> bool {
        !self.repository.contains('/')
    }

    /// Whether the reference already fixes a version, by tag or by digest.
    pub fn is_pinned(&self) -> bool {
        self.tag.is_some() || self.digest.is_some()
    }
}

/// First way a split reference departs from the registry grammar.
fn grammar_issue(repository: &str, tag: Option<&str>, digest: Option<&str>) -> Option<String> {
    if repository.chars().any(char::is_whitespace) {
        return Some("repository contains whitespace".to_string());
    }
    if repository.split('/').any(str::is_empty) {
        return Some("empty path component".to_string());
    }
    if let Some(tag) = tag.filter(|t| !TAG_PATTERN.is_match(t)) {
        return Some(format!("tag `{}` is not a registry tag", tag));
    }
    if let Some(digest) = digest.filter(|d| !DIGEST_PATTERN.is_match(d)) {
        return Some(format!("digest `{}` is not algorithm:hex", digest));
    }
    None
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

/// Rewrite references to image `name` to use `new_name` and/or `new_tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImageRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_tag: Option<String>,
}

impl ImageRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            new_name: None,
            new_tag: None,
        }
    }

    pub fn with_new_name(mut self, new_name: impl Into<String>) -> Self {
        self.new_name = Some(new_name.into());
        self
    }

    pub fn with_new_tag(mut self, new_tag: impl Into<String>) -> Self {
        self.new_tag = Some(new_tag.into());
        self
    }

    /// A rule matches the literal reference or its repository part.
    pub fn matches(&self, image: &ImageRef, reference: &str) -> bool {
        self.name == reference || self.name == image.repository
    }

    /// Apply this rule to a parsed reference.
    pub fn apply(&self, image: &ImageRef) -> ImageRef {
        ImageRef {
            repository: self
                .new_name
                .clone()
                .unwrap_or_else(|| image.repository.clone()),
            tag: self.new_tag.clone().or_else(|| image.tag.clone()),
            digest: image.digest.clone(),
        }
    }
}

/// Rewrite `reference` with the first matching rule, as a consuming tool would.
pub fn rewrite_image(rules: &[ImageRule], reference: &str) -> CoreResult<String> {
    let image = ImageRef::parse(reference)?;
    let rewritten = rules
        .iter()
        .find(|rule| rule.matches(&image, reference))
        .map(|rule| rule.apply(&image).to_string())
        .unwrap_or_else(|| reference.to_string());
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_name() {
        let image = ImageRef::parse("myservice").unwrap();
        assert_eq!(image.repository, "myservice");
        assert_eq!(image.tag, None);
        assert!(image.is_unqualified());
        assert!(!image.is_pinned());
    }

    #[test]
    fn test_parse_registry_port_is_not_a_tag() {
        let image = ImageRef::parse("localhost:5000/team/app").unwrap();
        assert_eq!(image.repository, "localhost:5000/team/app");
        assert_eq!(image.tag, None);
        assert!(!image.is_unqualified());

        let image = ImageRef::parse("localhost:5000/team/app:1.2").unwrap();
        assert_eq!(image.repository, "localhost:5000/team/app");
        assert_eq!(image.tag.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_parse_digest() {
        let digest = format!("sha256:{}", "a".repeat(64));
        let reference = format!("nginx@{}", digest);
        let image = ImageRef::parse(&reference).unwrap();
        assert_eq!(image.repository, "nginx");
        assert_eq!(image.digest.as_deref(), Some(digest.as_str()));
        assert!(image.is_pinned());
        assert_eq!(image.to_string(), reference);
    }

    #[test]
    fn test_parse_rejects_unsplittable() {
        for bad in ["", "a:", ":v1", "a@", "@sha256:abc"] {
            assert!(ImageRef::parse(bad).is_err(), "expected `{}` to be rejected", bad);
        }
    }

    #[test]
    fn test_parse_accepts_unusual_but_splittable() {
        let image = ImageRef::parse("web:v1+build").unwrap();
        assert_eq!(image.repository, "web");
        assert_eq!(image.tag.as_deref(), Some("v1+build"));

        let image = ImageRef::parse("reg//app").unwrap();
        assert_eq!(image.repository, "reg//app");
        assert_eq!(image.tag, None);

        let image = ImageRef::parse("app@sha256").unwrap();
        assert_eq!(image.digest.as_deref(), Some("sha256"));
        assert!(image.is_pinned());
    }

    #[test]
    fn test_rewrite_first_match_wins() {
        let rules = vec![
            ImageRule::new("web").with_new_name("reg.example.com/web"),
            ImageRule::new("web").with_new_tag("ignored"),
        ];
        assert_eq!(
            rewrite_image(&rules, "web:1.0").unwrap(),
            "reg.example.com/web:1.0"
        );
        assert_eq!(rewrite_image(&rules, "db").unwrap(), "db");
    }

    #[test]
    fn test_rule_serializes_camel_case() {
        let rule = ImageRule::new("web").with_new_tag("v2");
        let yaml = serde_yaml::to_string(&rule).unwrap();
        assert!(yaml.contains("newTag: v2"));
        assert!(!yaml.contains("newName"));
    }
}
