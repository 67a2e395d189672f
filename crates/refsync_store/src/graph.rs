//! The entity arena.
//!
//! `Graph` owns every library, item, collection, tag and user. Entities
//! refer to each other by key only. The helpers here keep both directions of
//! the item↔tag and item↔collection relationships in step, so callers never
//! update one side alone.

use crate::error::{StoreError, StoreResult};
use crate::model::{
    Collection, Field, Item, ItemChange, Library, LibraryKind, Tag, TagType, User,
};
use crate::types::{EntityKey, LibraryId, TagKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// In-memory object graph addressed by `(library, key)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphDocument", into = "GraphDocument")]
pub struct Graph {
    libraries: BTreeMap<LibraryId, Library>,
    items: BTreeMap<EntityKey, Item>,
    collections: BTreeMap<EntityKey, Collection>,
    tags: BTreeMap<TagKey, Tag>,
    users: BTreeMap<u64, User>,
}

/// Serialized form of the graph: flat entity lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphDocument {
    #[serde(default)]
    libraries: Vec<Library>,
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    collections: Vec<Collection>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    users: Vec<User>,
}

impl From<GraphDocument> for Graph {
    fn from(doc: GraphDocument) -> Self {
        Self {
            libraries: doc.libraries.into_iter().map(|l| (l.id.clone(), l)).collect(),
            items: doc.items.into_iter().map(|i| (i.entity_key(), i)).collect(),
            collections: doc
                .collections
                .into_iter()
                .map(|c| (c.entity_key(), c))
                .collect(),
            tags: doc.tags.into_iter().map(|t| (t.tag_key(), t)).collect(),
            users: doc.users.into_iter().map(|u| (u.id, u)).collect(),
        }
    }
}

impl From<Graph> for GraphDocument {
    fn from(graph: Graph) -> Self {
        Self {
            libraries: graph.libraries.into_values().collect(),
            items: graph.items.into_values().collect(),
            collections: graph.collections.into_values().collect(),
            tags: graph.tags.into_values().collect(),
            users: graph.users.into_values().collect(),
        }
    }
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // Libraries

    /// Looks up a library.
    #[must_use]
    pub fn library(&self, id: &LibraryId) -> Option<&Library> {
        self.libraries.get(id)
    }

    /// Looks up a library for modification.
    pub fn library_mut(&mut self, id: &LibraryId) -> Option<&mut Library> {
        self.libraries.get_mut(id)
    }

    /// Returns the library, creating it if it is not known yet.
    ///
    /// Newly created group libraries are marked outdated.
    pub fn ensure_library(
        &mut self,
        id: &LibraryId,
        kind: LibraryKind,
        name: Option<&str>,
    ) -> &mut Library {
        self.libraries.entry(id.clone()).or_insert_with(|| {
            debug!(library = %id, ?kind, "creating library container");
            Library::new(id.clone(), kind, name.unwrap_or_default())
        })
    }

    /// Iterates over all libraries.
    pub fn libraries(&self) -> impl Iterator<Item = &Library> {
        self.libraries.values()
    }

    // Items

    /// Looks up an item.
    #[must_use]
    pub fn item(&self, key: &EntityKey) -> Option<&Item> {
        self.items.get(key)
    }

    /// Looks up an item for modification.
    pub fn item_mut(&mut self, key: &EntityKey) -> Option<&mut Item> {
        self.items.get_mut(key)
    }

    /// Returns true if the item exists.
    #[must_use]
    pub fn contains_item(&self, key: &EntityKey) -> bool {
        self.items.contains_key(key)
    }

    /// Inserts or replaces an item, returning the previous value.
    ///
    /// The caller is responsible for tag and collection reverse links; use
    /// [`Graph::link_tag`] and [`Graph::link_collection`] to build them.
    pub fn insert_item(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.entity_key(), item)
    }

    /// Removes an item from the arena without touching reverse links.
    ///
    /// Used to edit an item alongside the rest of the graph; put it back
    /// with [`Graph::insert_item`].
    pub fn take_item(&mut self, key: &EntityKey) -> Option<Item> {
        self.items.remove(key)
    }

    /// Hard-deletes an item and its tag and collection links.
    pub fn purge_item(&mut self, key: &EntityKey) -> Option<Item> {
        let mut item = self.items.remove(key)?;
        for name in item.tags.keys().cloned().collect::<Vec<_>>() {
            self.unlink_tag(&mut item, &name);
        }
        for collection in item.collections.iter().cloned().collect::<Vec<_>>() {
            self.unlink_collection(&mut item, &collection);
        }
        Some(item)
    }

    /// Creates a dirty placeholder item unless the key is already known.
    ///
    /// Returns true if a placeholder was created.
    pub fn ensure_placeholder_item(&mut self, key: &EntityKey) -> bool {
        if self.items.contains_key(key) {
            return false;
        }
        debug!(item = %key, "creating placeholder item");
        self.insert_item(Item::placeholder(key.library.clone(), key.key.clone()));
        true
    }

    /// Iterates over all items.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Returns the items of `library` matching a predicate, in key order.
    pub fn items_where<P>(&self, library: &LibraryId, predicate: P) -> Vec<&Item>
    where
        P: Fn(&Item) -> bool,
    {
        self.items
            .values()
            .filter(|item| &item.library == library && predicate(item))
            .collect()
    }

    // Collections

    /// Looks up a collection.
    #[must_use]
    pub fn collection(&self, key: &EntityKey) -> Option<&Collection> {
        self.collections.get(key)
    }

    /// Looks up a collection for modification.
    pub fn collection_mut(&mut self, key: &EntityKey) -> Option<&mut Collection> {
        self.collections.get_mut(key)
    }

    /// Inserts or replaces a collection, returning the previous value.
    pub fn insert_collection(&mut self, collection: Collection) -> Option<Collection> {
        self.collections.insert(collection.entity_key(), collection)
    }

    /// Iterates over all collections.
    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    /// Adds `item` to a collection, creating a dirty placeholder collection
    /// when the key is unknown. Both directions are updated.
    pub fn link_collection(&mut self, item: &mut Item, collection_key: &str) {
        let key = EntityKey::new(item.library.clone(), collection_key);
        let collection = self.collections.entry(key).or_insert_with(|| {
            debug!(library = %item.library, collection = collection_key, "creating placeholder collection");
            Collection::placeholder(item.library.clone(), collection_key)
        });
        collection.items.insert(item.key.clone());
        item.collections.insert(collection_key.to_string());
    }

    /// Removes `item` from a collection. Both directions are updated.
    pub fn unlink_collection(&mut self, item: &mut Item, collection_key: &str) {
        let key = EntityKey::new(item.library.clone(), collection_key);
        if let Some(collection) = self.collections.get_mut(&key) {
            collection.items.remove(&item.key);
        }
        item.collections.remove(collection_key);
    }

    // Tags

    /// Looks up a tag.
    #[must_use]
    pub fn tag(&self, key: &TagKey) -> Option<&Tag> {
        self.tags.get(key)
    }

    /// Looks up a tag for modification.
    pub fn tag_mut(&mut self, key: &TagKey) -> Option<&mut Tag> {
        self.tags.get_mut(key)
    }

    /// Iterates over all tags.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    /// Assigns a tag to `item`, attaching to the shared tag of that name or
    /// creating it. An existing assignment has its type updated.
    pub fn link_tag(&mut self, item: &mut Item, name: &str, tag_type: TagType) {
        let key = TagKey::new(item.library.clone(), name);
        let tag = self
            .tags
            .entry(key)
            .or_insert_with(|| Tag::new(item.library.clone(), name));
        tag.items.insert(item.key.clone());
        item.tags.insert(name.to_string(), tag_type);
    }

    /// Removes a tag assignment from `item`. Both directions are updated; the
    /// shared tag itself is kept.
    pub fn unlink_tag(&mut self, item: &mut Item, name: &str) {
        let key = TagKey::new(item.library.clone(), name);
        if let Some(tag) = self.tags.get_mut(&key) {
            tag.items.remove(&item.key);
        }
        item.tags.remove(name);
    }

    /// Deletes tags that no item carries and that have no color.
    ///
    /// Restricted to one library when `library` is given. Returns the number
    /// of deleted tags.
    pub fn purge_orphan_tags(&mut self, library: Option<&LibraryId>) -> usize {
        let before = self.tags.len();
        self.tags.retain(|key, tag| {
            let in_scope = library.map_or(true, |library| &key.library == library);
            !(in_scope && tag.is_orphan())
        });
        before - self.tags.len()
    }

    // Users

    /// Looks up a user.
    #[must_use]
    pub fn user(&self, id: u64) -> Option<&User> {
        self.users.get(&id)
    }

    /// Inserts a user or refreshes its names.
    pub fn upsert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Iterates over all users.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Returns true if any item in the arena names the user as creator or
    /// last modifier.
    #[must_use]
    pub fn is_user_referenced(&self, id: u64) -> bool {
        self.items
            .values()
            .any(|item| item.created_by == Some(id) || item.last_modified_by == Some(id))
    }

    /// Deletes the user if nothing references it. Returns true if deleted.
    pub fn collect_user(&mut self, id: u64) -> bool {
        if self.is_user_referenced(id) {
            return false;
        }
        let removed = self.users.remove(&id).is_some();
        if removed {
            debug!(user = id, "removed unreferenced user");
        }
        removed
    }

    // Local edits

    /// Sets a field as a local user edit.
    pub fn set_field(&mut self, key: &EntityKey, field: &str, value: &str) -> StoreResult<()> {
        let item = self
            .items
            .get_mut(key)
            .ok_or_else(|| StoreError::item_not_found(key))?;

        match item.fields.iter_mut().find(|f| f.key == field) {
            Some(existing) => {
                existing.value = value.to_string();
                existing.changed = true;
            }
            None => item.fields.push(Field {
                changed: true,
                ..Field::new(field, value)
            }),
        }
        item.mark_changed(ItemChange::Fields);
        Ok(())
    }

    /// Assigns a tag as a local user edit.
    pub fn assign_tag(&mut self, key: &EntityKey, name: &str) -> StoreResult<()> {
        let mut item = self
            .items
            .remove(key)
            .ok_or_else(|| StoreError::item_not_found(key))?;
        self.link_tag(&mut item, name, TagType::Manual);
        item.mark_changed(ItemChange::Tags);
        self.insert_item(item);
        Ok(())
    }

    /// Moves an item in or out of the trash as a local user edit.
    pub fn set_trash(&mut self, key: &EntityKey, trash: bool) -> StoreResult<()> {
        let item = self
            .items
            .get_mut(key)
            .ok_or_else(|| StoreError::item_not_found(key))?;
        item.trash = trash;
        item.mark_changed(ItemChange::Trash);
        Ok(())
    }

    /// Marks an item deleted locally; the deletion is uploaded later.
    pub fn soft_delete_item(&mut self, key: &EntityKey) -> StoreResult<()> {
        let item = self
            .items
            .get_mut(key)
            .ok_or_else(|| StoreError::item_not_found(key))?;
        item.deleted = true;
        item.change_source = crate::model::ChangeSource::User;
        Ok(())
    }
}
