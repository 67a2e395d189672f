//! Library container, parent, collection and tag relationships.

use refsync_protocol::{ItemSnapshot, LibraryRef};
use refsync_store::model::{Item, TagType};
use refsync_store::Graph;
use std::collections::{BTreeMap, BTreeSet};

/// Resolves the item's library container, creating it on first sight.
pub(super) fn ensure_library(graph: &mut Graph, library: &LibraryRef) {
    let container = graph.ensure_library(&library.id, library.kind, library.name.as_deref());
    if let Some(name) = &library.name {
        if container.name.is_empty() {
            container.name.clone_from(name);
        }
    }
}

/// Points the item at the snapshot's parent.
///
/// A parent that has not been synced yet is created as a dirty placeholder so
/// the next sync pass fetches it.
pub(super) fn set_parent(graph: &mut Graph, item: &mut Item, snapshot: &ItemSnapshot) {
    item.parent = None;
    if let Some(parent) = &snapshot.parent_key {
        graph.ensure_placeholder_item(&item.entity_key().sibling(parent.as_str()));
        item.parent = Some(parent.clone());
    }
}

/// Replaces the item's collection set with the snapshot's.
pub(super) fn set_collections(graph: &mut Graph, item: &mut Item, snapshot: &ItemSnapshot) {
    let wanted: BTreeSet<&str> = snapshot.collection_keys.iter().map(String::as_str).collect();

    let stale: Vec<String> = item
        .collections
        .iter()
        .filter(|key| !wanted.contains(key.as_str()))
        .cloned()
        .collect();
    for key in &stale {
        graph.unlink_collection(item, key);
    }

    for key in wanted {
        if !item.collections.contains(key) {
            graph.link_collection(item, key);
        }
    }
}

/// Replaces the item's tag assignments with the snapshot's.
///
/// Shared tag entities are only detached, never deleted.
pub(super) fn set_tags(graph: &mut Graph, item: &mut Item, snapshot: &ItemSnapshot) {
    let wanted: BTreeMap<&str, TagType> = snapshot
        .tags
        .iter()
        .map(|tag| (tag.name.as_str(), tag.tag_type))
        .collect();

    let stale: Vec<String> = item
        .tags
        .keys()
        .filter(|name| !wanted.contains_key(name.as_str()))
        .cloned()
        .collect();
    for name in &stale {
        graph.unlink_tag(item, name);
    }

    for (name, tag_type) in wanted {
        if item.tags.get(name) != Some(&tag_type) {
            graph.link_tag(item, name, tag_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsync_protocol::TagSnapshot;
    use refsync_store::model::SyncState;
    use refsync_store::{EntityKey, LibraryId, TagKey};

    fn lib() -> LibraryId {
        LibraryId::new("u1")
    }

    fn tag(name: &str, tag_type: TagType) -> TagSnapshot {
        TagSnapshot {
            name: name.to_string(),
            tag_type,
        }
    }

    #[test]
    fn tag_replace_keeps_shared_tag() {
        let mut graph = Graph::new();
        let mut item = Item::new(lib(), "ITEM2345", "book");
        graph.link_tag(&mut item, "A", TagType::Manual);

        let mut snapshot = ItemSnapshot::new(LibraryRef::user("u1"), "ITEM2345", 3, "book");
        snapshot.tags = vec![tag("B", TagType::Automatic)];
        set_tags(&mut graph, &mut item, &snapshot);

        assert_eq!(item.tags.keys().collect::<Vec<_>>(), vec!["B"]);
        assert_eq!(item.tags["B"], TagType::Automatic);
        let a = graph.tag(&TagKey::new(lib(), "A")).unwrap();
        assert!(a.items.is_empty());
        assert!(graph
            .tag(&TagKey::new(lib(), "B"))
            .unwrap()
            .items
            .contains("ITEM2345"));
    }

    #[test]
    fn tag_type_updates_in_place() {
        let mut graph = Graph::new();
        let mut item = Item::new(lib(), "ITEM2345", "book");
        graph.link_tag(&mut item, "A", TagType::Manual);

        let mut snapshot = ItemSnapshot::new(LibraryRef::user("u1"), "ITEM2345", 3, "book");
        snapshot.tags = vec![tag("A", TagType::Automatic)];
        set_tags(&mut graph, &mut item, &snapshot);

        assert_eq!(item.tags["A"], TagType::Automatic);
        assert_eq!(graph.tags().count(), 1);
    }

    #[test]
    fn collections_replace_by_set() {
        let mut graph = Graph::new();
        let mut item = Item::new(lib(), "ITEM2345", "book");
        graph.link_collection(&mut item, "OLD22222");

        let mut snapshot = ItemSnapshot::new(LibraryRef::user("u1"), "ITEM2345", 3, "book");
        snapshot.collection_keys = vec!["NEW22222".into()];
        set_collections(&mut graph, &mut item, &snapshot);

        assert_eq!(item.collections.iter().collect::<Vec<_>>(), vec!["NEW22222"]);
        let old = graph.collection(&EntityKey::new(lib(), "OLD22222")).unwrap();
        assert!(old.items.is_empty());
        let new = graph.collection(&EntityKey::new(lib(), "NEW22222")).unwrap();
        assert_eq!(new.sync_state, SyncState::Dirty);
    }

    #[test]
    fn unknown_parent_becomes_placeholder() {
        let mut graph = Graph::new();
        let mut item = Item::new(lib(), "CHILD234", "note");
        let mut snapshot = ItemSnapshot::new(LibraryRef::user("u1"), "CHILD234", 3, "note");
        snapshot.parent_key = Some("PARENT23".into());

        set_parent(&mut graph, &mut item, &snapshot);
        assert_eq!(item.parent.as_deref(), Some("PARENT23"));
        let parent = graph.item(&EntityKey::new(lib(), "PARENT23")).unwrap();
        assert_eq!(parent.sync_state, SyncState::Dirty);

        snapshot.parent_key = None;
        set_parent(&mut graph, &mut item, &snapshot);
        assert_eq!(item.parent, None);
    }
}
