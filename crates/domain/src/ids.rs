use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Length of every document id issued by the host.
pub const ID_LENGTH: usize = 16;

/// Build a deterministic id from a seed, padded or truncated to [`ID_LENGTH`].
///
/// Status conditions use these so that a second "exhaustion" effect on the same
/// actor collides with the first instead of stacking.
pub fn static_id(seed: &str) -> DocumentId {
    let mut id: String = seed.chars().take(ID_LENGTH).collect();
    while id.chars().count() < ID_LENGTH {
        id.push('0');
    }
    DocumentId(id)
}

/// Host-issued 16 character alphanumeric id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..ID_LENGTH].to_string())
    }

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.len() != ID_LENGTH || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::invalid_id(format!(
                "'{}' is not a {} character alphanumeric id",
                value, ID_LENGTH
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(value: DocumentId) -> Self {
        value.0
    }
}

/// Dotted path that locates a document, including its embedding chain,
/// e.g. `Actor.<id>.Item.<id>.ActiveEffect.<id>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUuid(String);

impl DocumentUuid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Uuid of a top-level document.
    pub fn root(document_name: &str, id: &DocumentId) -> Self {
        Self(format!("{}.{}", document_name, id))
    }

    /// Uuid of a document embedded in this one.
    pub fn child(&self, document_name: &str, id: &DocumentId) -> Self {
        Self(format!("{}.{}.{}", self.0, document_name, id))
    }

    /// Uuid of the document this one is embedded in, if any.
    pub fn parent(&self) -> Option<Self> {
        let parts: Vec<&str> = self.0.split('.').collect();
        if parts.len() <= 2 {
            return None;
        }
        Some(Self(parts[..parts.len() - 2].join(".")))
    }

    /// Document name of the last path segment (`Actor`, `Item`, `ActiveEffect`).
    pub fn document_name(&self) -> Option<&str> {
        let mut parts = self.0.rsplit('.');
        parts.next()?;
        parts.next()
    }

    pub fn is_embedded(&self) -> bool {
        self.parent().is_some()
    }

    /// Whether this document is embedded in `ancestor`, at any depth.
    pub fn is_within(&self, ancestor: &DocumentUuid) -> bool {
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentUuid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_id_pads_short_seeds() {
        assert_eq!(static_id("dnd5eexhaustion").as_str(), "dnd5eexhaustion0");
        assert_eq!(static_id("dnd5ebloodied").as_str(), "dnd5ebloodied000");
    }

    #[test]
    fn static_id_truncates_long_seeds() {
        assert_eq!(
            static_id("dnd5eincapacitated").as_str(),
            "dnd5eincapacitat"
        );
    }

    #[test]
    fn generated_ids_are_valid() {
        let id = DocumentId::generate();
        assert!(DocumentId::new(id.as_str()).is_ok());
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(DocumentId::new("short").is_err());
        assert!(DocumentId::new("has-dash-in-it-x").is_err());
    }

    #[test]
    fn uuid_navigation() {
        let actor = DocumentUuid::root("Actor", &static_id("hero"));
        let item = actor.child("Item", &static_id("sword"));
        let effect = item.child("ActiveEffect", &static_id("flame"));

        assert_eq!(effect.document_name(), Some("ActiveEffect"));
        assert_eq!(effect.parent(), Some(item.clone()));
        assert_eq!(item.parent(), Some(actor.clone()));
        assert_eq!(actor.parent(), None);
        assert!(item.is_embedded());
        assert!(!actor.is_embedded());
    }

    #[test]
    fn is_within_follows_the_embedding_chain() {
        let actor = DocumentUuid::root("Actor", &static_id("hero"));
        let item = actor.child("Item", &static_id("sword"));
        let effect = item.child("ActiveEffect", &static_id("flame"));

        assert!(effect.is_within(&actor));
        assert!(effect.is_within(&item));
        assert!(!item.is_within(&item));
        assert!(!actor.is_within(&item));
        let sibling = DocumentUuid::from("Actor.hero0000000000001");
        assert!(!sibling.is_within(&DocumentUuid::from("Actor.hero000000000000")));
    }
}
