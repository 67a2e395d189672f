//! Remote item snapshots.
//!
//! A snapshot is the server-authoritative full state of one item at a
//! version, as decoded by the REST layer. Snapshots only ever flow into the
//! merge engine; nothing in the client produces them.

use chrono::{DateTime, Utc};
use refsync_store::model::{Link, LinkRole, Rect, TagType};
use refsync_store::model::LibraryKind;
use refsync_store::LibraryId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A batch of item snapshots from one library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBatch {
    /// Library every snapshot in the batch belongs to.
    pub library: LibraryRef,
    /// Item snapshots.
    #[serde(default)]
    pub items: Vec<ItemSnapshot>,
}

impl ItemBatch {
    /// Creates an empty batch for a library.
    pub fn new(library: LibraryRef) -> Self {
        Self {
            library,
            items: Vec::new(),
        }
    }

    /// Decodes a batch from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Identifies the library a snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRef {
    /// Library identifier.
    pub id: LibraryId,
    /// User or group library.
    #[serde(rename = "type")]
    pub kind: LibraryKind,
    /// Library name, if the server sent it.
    #[serde(default)]
    pub name: Option<String>,
}

impl LibraryRef {
    /// Reference to a user library.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: LibraryId::new(id),
            kind: LibraryKind::User,
            name: None,
        }
    }

    /// Reference to a group library.
    pub fn group(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: LibraryId::new(id),
            kind: LibraryKind::Group,
            name: Some(name.into()),
        }
    }
}

/// A field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Field name as sent by the server, possibly type-specific.
    pub key: String,
    /// Field value.
    pub value: String,
}

/// A creator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorSnapshot {
    /// Creator role.
    pub creator_type: String,
    /// Given name.
    #[serde(default)]
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Single-field name.
    #[serde(default)]
    pub name: String,
}

/// A tag assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSnapshot {
    /// Tag name.
    #[serde(rename = "tag")]
    pub name: String,
    /// Manual or automatic.
    #[serde(rename = "type", default)]
    pub tag_type: TagType,
}

/// A user referenced by created-by / last-modified-by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// User identifier.
    pub id: u64,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// Full remote state of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    /// Item key.
    pub key: String,
    /// Owning library.
    pub library: LibraryRef,
    /// Remote version.
    pub version: u64,
    /// Item type.
    pub item_type: String,
    /// Creation time.
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
    /// Modification time.
    #[serde(default)]
    pub date_modified: Option<DateTime<Utc>>,
    /// Whether the item is in the trash.
    #[serde(default)]
    pub trash: bool,
    /// Parent item key.
    #[serde(default)]
    pub parent_key: Option<String>,
    /// Keys of containing collections.
    #[serde(default)]
    pub collection_keys: Vec<String>,
    /// Field values in server order.
    #[serde(default)]
    pub fields: Vec<FieldSnapshot>,
    /// Creators in server order.
    #[serde(default)]
    pub creators: Vec<CreatorSnapshot>,
    /// Tag assignments.
    #[serde(default)]
    pub tags: Vec<TagSnapshot>,
    /// Relations by predicate.
    #[serde(default)]
    pub relations: BTreeMap<String, String>,
    /// Links by role.
    #[serde(default)]
    pub links: BTreeMap<LinkRole, Link>,
    /// Annotation rectangles as `[minX, minY, maxX, maxY]`.
    #[serde(default)]
    pub rects: Vec<[f64; 4]>,
    /// Ink annotation strokes.
    #[serde(default)]
    pub paths: Vec<Vec<f64>>,
    /// Creator of the item in a group library.
    #[serde(default)]
    pub created_by: Option<UserSnapshot>,
    /// Last modifier of the item in a group library.
    #[serde(default)]
    pub last_modified_by: Option<UserSnapshot>,
}

impl ItemSnapshot {
    /// Creates a snapshot with only identity, version and type set.
    pub fn new(
        library: LibraryRef,
        key: impl Into<String>,
        version: u64,
        item_type: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            library,
            version,
            item_type: item_type.into(),
            date_added: None,
            date_modified: None,
            trash: false,
            parent_key: None,
            collection_keys: Vec::new(),
            fields: Vec::new(),
            creators: Vec::new(),
            tags: Vec::new(),
            relations: BTreeMap::new(),
            links: BTreeMap::new(),
            rects: Vec::new(),
            paths: Vec::new(),
            created_by: None,
            last_modified_by: None,
        }
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    /// Returns the rectangles in model form.
    #[must_use]
    pub fn model_rects(&self) -> Vec<Rect> {
        self.rects
            .iter()
            .map(|[min_x, min_y, max_x, max_y]| Rect::new(*min_x, *min_y, *max_x, *max_y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_batch() {
        let json = r#"{
            "library": {"id": "g7", "type": "group", "name": "Lab"},
            "items": [{
                "key": "ABCD2345",
                "library": {"id": "g7", "type": "group"},
                "version": 12,
                "itemType": "book",
                "dateAdded": "2024-03-01T10:00:00Z",
                "parentKey": null,
                "collectionKeys": ["COLL2222"],
                "fields": [{"key": "title", "value": "Optics"}],
                "creators": [{"creatorType": "author", "firstName": "Isaac", "lastName": "Newton"}],
                "tags": [{"tag": "physics"}, {"tag": "auto", "type": 1}],
                "relations": {"dc:replaces": "http://example.org/items/OLD22222"},
                "links": {"self": {"href": "https://api.example.org/items/ABCD2345"}},
                "rects": [[1.0, 2.0, 3.0, 4.0]],
                "createdBy": {"id": 7, "username": "ada", "name": "Ada"}
            }]
        }"#;

        let batch = ItemBatch::from_json(json).unwrap();
        assert_eq!(batch.library.kind, LibraryKind::Group);
        let item = &batch.items[0];
        assert_eq!(item.field("title"), Some("Optics"));
        assert_eq!(item.tags[0].tag_type, TagType::Manual);
        assert_eq!(item.tags[1].tag_type, TagType::Automatic);
        assert!(item.links.contains_key(&LinkRole::Itself));
        assert_eq!(item.model_rects(), vec![Rect::new(1.0, 2.0, 3.0, 4.0)]);
        assert_eq!(item.created_by.as_ref().map(|u| u.id), Some(7));
        assert!(item.date_added.is_some());
    }

    #[test]
    fn test_minimal_snapshot() {
        let json = r#"{"key":"K2345678","library":{"id":"u1","type":"user"},"version":1,"itemType":"note"}"#;
        let item: ItemSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(item, ItemSnapshot::new(LibraryRef::user("u1"), "K2345678", 1, "note"));
    }
}
