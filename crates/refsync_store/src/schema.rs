//! Item type schema.
//!
//! The schema answers two questions the merge needs for every item: which
//! creator role is primary for the item type, and which base field a
//! type-specific field stands for (`caseName` is the title of a `case`).

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known item type names.
pub mod item_type {
    /// Notes.
    pub const NOTE: &str = "note";
    /// File and link attachments.
    pub const ATTACHMENT: &str = "attachment";
    /// Reader annotations.
    pub const ANNOTATION: &str = "annotation";
    /// Letters (display title falls back to the recipient).
    pub const LETTER: &str = "letter";
    /// Interviews (display title falls back to the interviewer).
    pub const INTERVIEW: &str = "interview";
}

/// Well-known field keys captured into derived attributes.
pub mod field {
    /// Title base field.
    pub const TITLE: &str = "title";
    /// Note HTML.
    pub const NOTE: &str = "note";
    /// Date base field.
    pub const DATE: &str = "date";
    /// Publisher base field.
    pub const PUBLISHER: &str = "publisher";
    /// Publication title base field.
    pub const PUBLICATION_TITLE: &str = "publicationTitle";
    /// Annotation position key.
    pub const ANNOTATION_SORT_INDEX: &str = "annotationSortIndex";
    /// Attachment content hash.
    pub const MD5: &str = "md5";
}

/// Schema entry for one item type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTypeSchema {
    /// Creator role counted as primary for this type.
    #[serde(default)]
    pub primary_creator_type: Option<String>,
    /// Type-specific field → base field.
    #[serde(default)]
    pub base_fields: BTreeMap<String, String>,
}

/// Item type schema: primary creator roles and base field mappings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    item_types: BTreeMap<String, ItemTypeSchema>,
}

const PRIMARY_CREATORS: &[(&str, &str)] = &[
    ("artwork", "artist"),
    ("audioRecording", "performer"),
    ("bill", "sponsor"),
    ("blogPost", "author"),
    ("book", "author"),
    ("bookSection", "author"),
    ("case", "author"),
    ("computerProgram", "programmer"),
    ("conferencePaper", "author"),
    ("dictionaryEntry", "author"),
    ("document", "author"),
    ("email", "author"),
    ("encyclopediaArticle", "author"),
    ("film", "director"),
    ("forumPost", "author"),
    ("hearing", "contributor"),
    ("instantMessage", "author"),
    ("interview", "interviewee"),
    ("journalArticle", "author"),
    ("letter", "author"),
    ("magazineArticle", "author"),
    ("manuscript", "author"),
    ("map", "cartographer"),
    ("newspaperArticle", "author"),
    ("patent", "inventor"),
    ("podcast", "podcaster"),
    ("presentation", "presenter"),
    ("radioBroadcast", "director"),
    ("report", "author"),
    ("statute", "author"),
    ("thesis", "author"),
    ("tvBroadcast", "director"),
    ("videoRecording", "director"),
    ("webpage", "author"),
];

// (item type, type-specific field, base field)
const BASE_FIELDS: &[(&str, &str, &str)] = &[
    ("case", "caseName", field::TITLE),
    ("statute", "nameOfAct", field::TITLE),
    ("email", "subject", field::TITLE),
    ("case", "dateDecided", field::DATE),
    ("statute", "dateEnacted", field::DATE),
    ("patent", "issueDate", field::DATE),
    ("case", "reporter", field::PUBLICATION_TITLE),
    ("audioRecording", "label", field::PUBLISHER),
    ("computerProgram", "company", field::PUBLISHER),
    ("film", "distributor", field::PUBLISHER),
    ("radioBroadcast", "network", field::PUBLISHER),
    ("tvBroadcast", "network", field::PUBLISHER),
    ("videoRecording", "studio", field::PUBLISHER),
    ("report", "institution", field::PUBLISHER),
    ("thesis", "university", field::PUBLISHER),
    ("blogPost", "blogTitle", field::PUBLICATION_TITLE),
    ("bookSection", "bookTitle", field::PUBLICATION_TITLE),
    ("conferencePaper", "proceedingsTitle", field::PUBLICATION_TITLE),
    ("dictionaryEntry", "dictionaryTitle", field::PUBLICATION_TITLE),
    ("encyclopediaArticle", "encyclopediaTitle", field::PUBLICATION_TITLE),
    ("forumPost", "forumTitle", field::PUBLICATION_TITLE),
    ("radioBroadcast", "programTitle", field::PUBLICATION_TITLE),
    ("tvBroadcast", "programTitle", field::PUBLICATION_TITLE),
    ("webpage", "websiteTitle", field::PUBLICATION_TITLE),
];

impl Schema {
    /// Returns the schema bundled with the crate.
    pub fn builtin() -> Self {
        let mut item_types: BTreeMap<String, ItemTypeSchema> = BTreeMap::new();

        for (name, creator) in PRIMARY_CREATORS {
            item_types.entry((*name).to_string()).or_default().primary_creator_type =
                Some((*creator).to_string());
        }
        for (name, specific, base) in BASE_FIELDS {
            item_types
                .entry((*name).to_string())
                .or_default()
                .base_fields
                .insert((*specific).to_string(), (*base).to_string());
        }
        for name in [item_type::NOTE, item_type::ATTACHMENT, item_type::ANNOTATION] {
            item_types.entry(name.to_string()).or_default();
        }

        Self { item_types }
    }

    /// Parses a schema from JSON.
    ///
    /// The document has the shape
    /// `{"itemTypes": {"book": {"primaryCreatorType": "author", "baseFields": {}}}}`.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let schema: Schema = serde_json::from_str(json)?;
        for (name, entry) in &schema.item_types {
            if name.is_empty() {
                return Err(StoreError::invalid_schema("empty item type name"));
            }
            if let Some((specific, _)) = entry
                .base_fields
                .iter()
                .find(|(specific, base)| specific.is_empty() || base.is_empty())
            {
                return Err(StoreError::invalid_schema(format!(
                    "item type {name} has an empty base field mapping for '{specific}'"
                )));
            }
        }
        Ok(schema)
    }

    /// Returns the entry for an item type.
    #[must_use]
    pub fn item_type(&self, name: &str) -> Option<&ItemTypeSchema> {
        self.item_types.get(name)
    }

    /// Returns true if the schema knows the item type.
    #[must_use]
    pub fn knows_type(&self, name: &str) -> bool {
        self.item_types.contains_key(name)
    }

    /// Base field for a type-specific field, if the field is type-specific.
    #[must_use]
    pub fn base_field(&self, item_type: &str, field: &str) -> Option<&str> {
        self.item_types
            .get(item_type)
            .and_then(|entry| entry.base_fields.get(field))
            .map(String::as_str)
    }

    /// Primary creator role for an item type.
    #[must_use]
    pub fn primary_creator_type(&self, item_type: &str) -> Option<&str> {
        self.item_types
            .get(item_type)
            .and_then(|entry| entry.primary_creator_type.as_deref())
    }

    /// Returns true if `creator_type` is the primary role of `item_type`.
    #[must_use]
    pub fn is_primary_creator(&self, item_type: &str, creator_type: &str) -> bool {
        self.primary_creator_type(item_type) == Some(creator_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_primary_creators() {
        let schema = Schema::builtin();
        assert!(schema.is_primary_creator("book", "author"));
        assert!(!schema.is_primary_creator("book", "editor"));
        assert!(schema.is_primary_creator("film", "director"));
        assert_eq!(schema.primary_creator_type("note"), None);
        assert!(schema.knows_type("annotation"));
    }

    #[test]
    fn builtin_base_fields() {
        let schema = Schema::builtin();
        assert_eq!(schema.base_field("case", "caseName"), Some("title"));
        assert_eq!(schema.base_field("thesis", "university"), Some("publisher"));
        assert_eq!(schema.base_field("book", "title"), None);
    }

    #[test]
    fn schema_from_json() {
        let schema = Schema::from_json(
            r#"{"itemTypes": {"gadget": {"primaryCreatorType": "maker",
                "baseFields": {"modelName": "title"}}}}"#,
        )
        .unwrap();
        assert!(schema.is_primary_creator("gadget", "maker"));
        assert_eq!(schema.base_field("gadget", "modelName"), Some("title"));
        assert!(!schema.knows_type("book"));
    }

    #[test]
    fn schema_from_json_rejects_empty_mapping() {
        let result = Schema::from_json(r#"{"itemTypes": {"gadget": {"baseFields": {"x": ""}}}}"#);
        assert!(matches!(result, Err(StoreError::InvalidSchema { .. })));
    }
}
