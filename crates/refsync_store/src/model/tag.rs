//! Shared tag registry entries.

use crate::types::{LibraryId, TagKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a tag was assigned to an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum TagType {
    /// Added by the user.
    #[default]
    Manual,
    /// Added automatically (imported metadata).
    Automatic,
}

impl From<u8> for TagType {
    fn from(value: u8) -> Self {
        match value {
            1 => TagType::Automatic,
            _ => TagType::Manual,
        }
    }
}

impl From<TagType> for u8 {
    fn from(value: TagType) -> Self {
        match value {
            TagType::Manual => 0,
            TagType::Automatic => 1,
        }
    }
}

/// A tag shared by every item in a library that carries its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name, unique per library.
    pub name: String,
    /// Owning library.
    pub library: LibraryId,
    /// Assigned color, if the user colored the tag.
    pub color: Option<String>,
    /// Keys of items carrying this tag (reverse of `Item::tags`).
    pub items: BTreeSet<String>,
}

impl Tag {
    /// Creates an unassigned tag.
    pub fn new(library: LibraryId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            library,
            color: None,
            items: BTreeSet::new(),
        }
    }

    /// Returns the registry key of this tag.
    #[must_use]
    pub fn tag_key(&self) -> TagKey {
        TagKey::new(self.library.clone(), self.name.clone())
    }

    /// A tag is orphaned when no item carries it and it has no color.
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.items.is_empty() && self.color.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_type_wire_codes() {
        assert_eq!(serde_json::to_string(&TagType::Automatic).unwrap(), "1");
        let parsed: TagType = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, TagType::Manual);
        assert_eq!(TagType::from(7), TagType::Manual);
    }

    #[test]
    fn colored_tag_is_not_orphan() {
        let mut tag = Tag::new(LibraryId::new("u1"), "reading");
        assert!(tag.is_orphan());
        tag.color = Some("#ff6666".into());
        assert!(!tag.is_orphan());
    }
}
