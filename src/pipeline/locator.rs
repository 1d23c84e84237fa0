//! Source locator parsing.
//!
//! Documents are addressed as `scheme://container/key...`. Parsing happens
//! before any collaborator call, so a malformed locator is always a local
//! input error, never a storage round trip.

use serde::{Deserialize, Serialize};

/// Parsed object-storage address of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocator {
    pub container: String,
    pub key: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("locator '{0}' is missing a scheme")]
    MissingScheme(String),
    #[error("locator '{0}' has an empty container")]
    EmptyContainer(String),
    #[error("locator '{0}' has an empty item key")]
    EmptyKey(String),
}

impl SourceLocator {
    /// Parse a `scheme://container/key...` locator. The scheme itself is
    /// opaque; container and key must both be non-empty.
    pub fn parse(raw: &str) -> Result<Self, LocatorError> {
        let raw = raw.trim();
        let rest = match raw.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() => rest,
            _ => return Err(LocatorError::MissingScheme(raw.to_string())),
        };

        let (container, key) = rest.split_once('/').unwrap_or((rest, ""));
        if container.is_empty() {
            return Err(LocatorError::EmptyContainer(raw.to_string()));
        }
        if key.is_empty() {
            return Err(LocatorError::EmptyKey(raw.to_string()));
        }

        Ok(Self {
            container: container.to_string(),
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_container_and_multi_segment_key() {
        let locator =
            SourceLocator::parse("store://admissions-docs/app-01/transcript.pdf").expect("parses");
        assert_eq!(locator.container, "admissions-docs");
        assert_eq!(locator.key, "app-01/transcript.pdf");
    }

    #[test]
    fn rejects_missing_scheme() {
        assert_eq!(
            SourceLocator::parse("admissions-docs/app-01.pdf"),
            Err(LocatorError::MissingScheme(
                "admissions-docs/app-01.pdf".to_string()
            ))
        );
        assert!(matches!(
            SourceLocator::parse("://bucket/key"),
            Err(LocatorError::MissingScheme(_))
        ));
    }

    #[test]
    fn rejects_empty_container_and_key() {
        assert!(matches!(
            SourceLocator::parse("store:///orphan.pdf"),
            Err(LocatorError::EmptyContainer(_))
        ));
        assert!(matches!(
            SourceLocator::parse("store://bucket"),
            Err(LocatorError::EmptyKey(_))
        ));
        assert!(matches!(
            SourceLocator::parse("store://bucket/"),
            Err(LocatorError::EmptyKey(_))
        ));
    }
}
