//! Items: regular entries, notes, attachments and annotations.

use crate::model::TagType;
use crate::schema::item_type;
use crate::types::{EntityKey, LibraryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Parts of an item that carry unsynced local edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemChange {
    /// Item type changed.
    Type,
    /// Moved in or out of the trash.
    Trash,
    /// Parent item changed.
    Parent,
    /// Collection membership changed.
    Collections,
    /// One or more fields changed.
    Fields,
    /// Tag assignments changed.
    Tags,
    /// Creators changed.
    Creators,
    /// Relations changed.
    Relations,
    /// Annotation rectangles changed.
    Rects,
    /// Ink annotation paths changed.
    Paths,
}

/// Where the most recent write to an item came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeSource {
    /// A local user action.
    #[default]
    User,
    /// A merge of remote data.
    Sync,
}

/// Remote sync state of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncState {
    /// Matches the last fetched remote version.
    #[default]
    Synced,
    /// Only a placeholder exists locally; the entity must be fetched.
    Dirty,
}

/// One typed key/value field of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field key, e.g. `title` or `caseName`.
    pub key: String,
    /// Base field this type-specific field maps to, e.g. `title` for `caseName`.
    pub base_key: Option<String>,
    /// Field value.
    pub value: String,
    /// Whether the field was edited locally and not yet uploaded.
    pub changed: bool,
}

impl Field {
    /// Creates an unchanged field.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            base_key: None,
            value: value.into(),
            changed: false,
        }
    }

    /// The key used for well-known field lookups: the base key when present.
    #[must_use]
    pub fn effective_key(&self) -> &str {
        self.base_key.as_deref().unwrap_or(&self.key)
    }
}

/// A creator (author, editor, ...) of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    /// Creator role, e.g. `author`.
    pub creator_type: String,
    /// Given name (two-field mode).
    pub first_name: String,
    /// Family name (two-field mode).
    pub last_name: String,
    /// Full name (single-field mode, e.g. institutions).
    pub name: String,
    /// Zero-based position in the item's creator list.
    pub order: usize,
    /// Whether this creator has the item type's primary role.
    pub primary: bool,
}

impl Creator {
    /// Name used in creator summaries: family name, or the single-field name.
    #[must_use]
    pub fn summary_name(&self) -> &str {
        if self.last_name.is_empty() {
            &self.name
        } else {
            &self.last_name
        }
    }
}

/// Role of an external link attached to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LinkRole {
    /// The item's own API URL.
    #[serde(rename = "self")]
    Itself,
    /// The parent item's URL.
    Up,
    /// Web library URL.
    Alternate,
    /// Attachment file download.
    Enclosure,
}

/// An external link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Target URL.
    pub href: String,
    /// Media type of the target.
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
    /// Link title (file name for enclosures).
    #[serde(default)]
    pub title: Option<String>,
    /// Target size in bytes.
    #[serde(default)]
    pub length: Option<u64>,
}

/// An annotation rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub min_x: f64,
    /// Bottom edge.
    pub min_y: f64,
    /// Right edge.
    pub max_x: f64,
    /// Top edge.
    pub max_y: f64,
}

impl Rect {
    /// Creates a rectangle.
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

/// Flattened `x, y, x, y, ...` point list of an ink stroke.
pub type InkPath = Vec<f64>;

/// Attributes derived from fields and creators for display and sorting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    /// Value of the title base field.
    pub base_title: String,
    /// Title shown in lists.
    pub display_title: String,
    /// Normalized title used for sorting.
    pub sort_title: String,
    /// Plain-text preview of a note.
    pub note_preview: Option<String>,
    /// Raw date field.
    pub date: Option<String>,
    /// Sortable `YYYY-MM-DD` form of the date, with zero month/day when unknown.
    pub parsed_date: Option<String>,
    /// Year extracted from the date.
    pub parsed_year: Option<i32>,
    /// Publisher base field.
    pub publisher: Option<String>,
    /// Publication title base field.
    pub publication_title: Option<String>,
    /// Annotation position key used to order annotations in a document.
    pub annotation_sort_index: Option<String>,
    /// Attachment content hash.
    pub content_hash: Option<String>,
    /// Short creator summary, e.g. `Smith and Jones`.
    pub creator_summary: Option<String>,
}

/// An item in a library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Item key, unique within the library.
    pub key: String,
    /// Owning library.
    pub library: LibraryId,
    /// Item type, e.g. `book`, `note`, `attachment`, `annotation`.
    pub item_type: String,
    /// Last remote version merged into this item.
    pub version: u64,
    /// Whether the item is in the trash.
    pub trash: bool,
    /// Local soft delete waiting to be uploaded.
    pub deleted: bool,
    /// Unsynced local edits.
    pub changes: BTreeSet<ItemChange>,
    /// Source of the most recent write.
    pub change_source: ChangeSource,
    /// Remote sync state.
    pub sync_state: SyncState,
    /// Failed fetch attempts for a dirty item.
    pub sync_retries: u32,
    /// When the item was last merged from remote data.
    pub last_synced: Option<DateTime<Utc>>,
    /// Creation time reported by the server.
    pub date_added: Option<DateTime<Utc>>,
    /// Modification time reported by the server.
    pub date_modified: Option<DateTime<Utc>>,
    /// Parent item key for notes, attachments and annotations.
    pub parent: Option<String>,
    /// Keys of collections containing this item.
    pub collections: BTreeSet<String>,
    /// Ordered fields without duplicate keys.
    pub fields: Vec<Field>,
    /// Creators ordered by `Creator::order`.
    pub creators: Vec<Creator>,
    /// Tag assignments by tag name.
    pub tags: BTreeMap<String, TagType>,
    /// Relations: one value per relation predicate.
    pub relations: BTreeMap<String, String>,
    /// External links by role.
    pub links: BTreeMap<LinkRole, Link>,
    /// Annotation rectangles.
    pub rects: Vec<Rect>,
    /// Ink annotation strokes.
    pub paths: Vec<InkPath>,
    /// User who created the item (group libraries).
    pub created_by: Option<u64>,
    /// User who last modified the item (group libraries).
    pub last_modified_by: Option<u64>,
    /// Derived display attributes.
    pub derived: DerivedFields,
}

impl Item {
    /// Creates an empty item.
    pub fn new(library: LibraryId, key: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            library,
            item_type: item_type.into(),
            version: 0,
            trash: false,
            deleted: false,
            changes: BTreeSet::new(),
            change_source: ChangeSource::User,
            sync_state: SyncState::Synced,
            sync_retries: 0,
            last_synced: None,
            date_added: None,
            date_modified: None,
            parent: None,
            collections: BTreeSet::new(),
            fields: Vec::new(),
            creators: Vec::new(),
            tags: BTreeMap::new(),
            relations: BTreeMap::new(),
            links: BTreeMap::new(),
            rects: Vec::new(),
            paths: Vec::new(),
            created_by: None,
            last_modified_by: None,
            derived: DerivedFields::default(),
        }
    }

    /// Creates a placeholder for an item referenced before it was fetched.
    pub fn placeholder(library: LibraryId, key: impl Into<String>) -> Self {
        Self {
            sync_state: SyncState::Dirty,
            change_source: ChangeSource::Sync,
            ..Self::new(library, key, "")
        }
    }

    /// Returns the stable address of this item.
    #[must_use]
    pub fn entity_key(&self) -> EntityKey {
        EntityKey::new(self.library.clone(), self.key.clone())
    }

    /// Returns true if the item has unsynced local edits.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Records a local edit.
    pub fn mark_changed(&mut self, change: ItemChange) {
        self.changes.insert(change);
        self.change_source = ChangeSource::User;
    }

    /// Drops all local edit markers, including per-field markers.
    pub fn reset_changes(&mut self) {
        self.changes.clear();
        for field in &mut self.fields {
            field.changed = false;
        }
    }

    /// Looks up a field by key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.key == key)
    }

    /// Looks up a field value by key or by base key.
    #[must_use]
    pub fn field_value(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.key == key || field.base_key.as_deref() == Some(key))
            .map(|field| field.value.as_str())
    }

    /// Returns true for standalone or child notes.
    #[must_use]
    pub fn is_note(&self) -> bool {
        self.item_type == item_type::NOTE
    }

    /// Returns true for attachments.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.item_type == item_type::ATTACHMENT
    }

    /// Returns true for annotations.
    #[must_use]
    pub fn is_annotation(&self) -> bool {
        self.item_type == item_type::ANNOTATION
    }
}
