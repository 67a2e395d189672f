//! Read-only queries over the graph.

use crate::graph::Graph;
use crate::model::Item;
use crate::types::{EntityKey, LibraryId, TagKey};
use std::collections::BTreeSet;

/// Options controlling which items a query returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Include items of nested collections.
    pub include_subcollections: bool,
    /// Include trashed items.
    pub include_trashed: bool,
}

impl QueryOptions {
    /// Creates options with defaults (no subcollections, no trash).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether nested collections are included.
    #[must_use]
    pub const fn include_subcollections(mut self, value: bool) -> Self {
        self.include_subcollections = value;
        self
    }

    /// Sets whether trashed items are included.
    #[must_use]
    pub const fn include_trashed(mut self, value: bool) -> Self {
        self.include_trashed = value;
        self
    }

    fn admits(&self, item: &Item) -> bool {
        !item.deleted && (self.include_trashed || !item.trash)
    }
}

/// Returns the items of a collection, in key order.
pub fn items_in_collection<'g>(
    graph: &'g Graph,
    collection: &EntityKey,
    options: &QueryOptions,
) -> Vec<&'g Item> {
    let mut keys = BTreeSet::new();
    keys.insert(collection.key.clone());
    if options.include_subcollections {
        collect_descendants(graph, collection, &mut keys);
    }

    graph.items_where(&collection.library, |item| {
        options.admits(item) && item.collections.iter().any(|c| keys.contains(c))
    })
}

fn collect_descendants(graph: &Graph, root: &EntityKey, keys: &mut BTreeSet<String>) {
    let mut frontier = vec![root.key.clone()];
    while let Some(parent) = frontier.pop() {
        for child in graph.collections() {
            if child.library == root.library
                && child.parent.as_deref() == Some(parent.as_str())
                && keys.insert(child.key.clone())
            {
                frontier.push(child.key.clone());
            }
        }
    }
}

/// Returns the direct children (notes, attachments, annotations) of an item.
pub fn child_items<'g>(graph: &'g Graph, parent: &EntityKey) -> Vec<&'g Item> {
    graph.items_where(&parent.library, |item| {
        !item.deleted && item.parent.as_deref() == Some(parent.key.as_str())
    })
}

/// Returns items with local edits awaiting upload, including soft deletions.
pub fn changed_items<'g>(graph: &'g Graph, library: &LibraryId) -> Vec<&'g Item> {
    graph.items_where(library, |item| item.is_changed() || item.deleted)
}

/// Returns the items carrying a tag.
pub fn items_with_tag<'g>(
    graph: &'g Graph,
    tag: &TagKey,
    options: &QueryOptions,
) -> Vec<&'g Item> {
    let Some(tag) = graph.tag(tag) else {
        return Vec::new();
    };
    tag.items
        .iter()
        .filter_map(|key| graph.item(&EntityKey::new(tag.library.clone(), key.as_str())))
        .filter(|item| options.admits(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Collection;

    fn lib() -> LibraryId {
        LibraryId::new("u1")
    }

    fn fixture() -> Graph {
        let mut graph = Graph::new();
        let mut root = Collection::new(lib(), "ROOT2222", "Root");
        root.parent = None;
        let mut nested = Collection::new(lib(), "NEST2222", "Nested");
        nested.parent = Some("ROOT2222".into());
        graph.insert_collection(root);
        graph.insert_collection(nested);

        for (key, collection, trash) in [
            ("ITEM0001", "ROOT2222", false),
            ("ITEM0002", "NEST2222", false),
            ("ITEM0003", "ROOT2222", true),
        ] {
            let mut item = Item::new(lib(), key, "book");
            item.trash = trash;
            graph.link_collection(&mut item, collection);
            graph.link_tag(&mut item, "t", crate::model::TagType::Manual);
            graph.insert_item(item);
        }
        graph
    }

    fn keys(items: Vec<&Item>) -> Vec<&str> {
        items.into_iter().map(|i| i.key.as_str()).collect()
    }

    #[test]
    fn collection_options() {
        let graph = fixture();
        let root = EntityKey::new(lib(), "ROOT2222");

        assert_eq!(
            keys(items_in_collection(&graph, &root, &QueryOptions::new())),
            vec!["ITEM0001"]
        );
        assert_eq!(
            keys(items_in_collection(
                &graph,
                &root,
                &QueryOptions::new()
                    .include_subcollections(true)
                    .include_trashed(true)
            )),
            vec!["ITEM0001", "ITEM0002", "ITEM0003"]
        );
    }

    #[test]
    fn children_and_changes() {
        let mut graph = fixture();
        let mut note = Item::new(lib(), "NOTE0001", "note");
        note.parent = Some("ITEM0001".into());
        graph.insert_item(note);

        let parent = EntityKey::new(lib(), "ITEM0001");
        assert_eq!(keys(child_items(&graph, &parent)), vec!["NOTE0001"]);

        assert!(changed_items(&graph, &lib()).is_empty());
        graph.set_field(&parent, "title", "Edited").unwrap();
        graph
            .soft_delete_item(&EntityKey::new(lib(), "ITEM0002"))
            .unwrap();
        assert_eq!(
            keys(changed_items(&graph, &lib())),
            vec!["ITEM0001", "ITEM0002"]
        );
    }

    #[test]
    fn tag_lookup() {
        let graph = fixture();
        let tag = TagKey::new(lib(), "t");
        assert_eq!(items_with_tag(&graph, &tag, &QueryOptions::new()).len(), 2);
        assert!(items_with_tag(&graph, &TagKey::new(lib(), "none"), &QueryOptions::new()).is_empty());
    }
}
