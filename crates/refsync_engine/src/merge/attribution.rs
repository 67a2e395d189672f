//! Creators, relations, links and user attribution.

use refsync_protocol::{ItemSnapshot, UserSnapshot};
use refsync_store::display::refresh_creator_summary;
use refsync_store::model::{Creator, Item, User};
use refsync_store::{Graph, Schema};

/// Replaces the creators in snapshot order and recomputes the summary.
pub(super) fn set_creators(item: &mut Item, snapshot: &ItemSnapshot, schema: &Schema) {
    item.creators = snapshot
        .creators
        .iter()
        .enumerate()
        .map(|(order, remote)| Creator {
            creator_type: remote.creator_type.clone(),
            first_name: remote.first_name.clone(),
            last_name: remote.last_name.clone(),
            name: remote.name.clone(),
            order,
            primary: schema.is_primary_creator(&item.item_type, &remote.creator_type),
        })
        .collect();
    refresh_creator_summary(item);
}

/// Replaces relations and links with the snapshot's.
pub(super) fn set_relations_and_links(item: &mut Item, snapshot: &ItemSnapshot) {
    if item.relations != snapshot.relations {
        item.relations.clone_from(&snapshot.relations);
    }
    if item.links != snapshot.links {
        item.links.clone_from(&snapshot.links);
    }
}

/// Updates created-by and last-modified-by.
///
/// Returns the ids of users the item no longer references; the caller
/// collects them once the item is back in the graph.
pub(super) fn set_users(graph: &mut Graph, item: &mut Item, snapshot: &ItemSnapshot) -> Vec<u64> {
    let mut detached = Vec::new();
    assign_user(graph, &mut item.created_by, snapshot.created_by.as_ref(), &mut detached);
    assign_user(
        graph,
        &mut item.last_modified_by,
        snapshot.last_modified_by.as_ref(),
        &mut detached,
    );
    detached
}

fn assign_user(
    graph: &mut Graph,
    slot: &mut Option<u64>,
    remote: Option<&UserSnapshot>,
    detached: &mut Vec<u64>,
) {
    if let Some(remote) = remote {
        let known = graph
            .user(remote.id)
            .is_some_and(|user| user.username == remote.username && user.name == remote.name);
        if !known {
            graph.upsert_user(User::new(remote.id, remote.username.as_str(), remote.name.as_str()));
        }
    }

    let wanted = remote.map(|user| user.id);
    if *slot == wanted {
        return;
    }
    if let Some(previous) = slot.take() {
        detached.push(previous);
    }
    *slot = wanted;
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsync_protocol::{CreatorSnapshot, LibraryRef};
    use refsync_store::LibraryId;

    fn creator(creator_type: &str, last_name: &str) -> CreatorSnapshot {
        CreatorSnapshot {
            creator_type: creator_type.into(),
            last_name: last_name.into(),
            ..CreatorSnapshot::default()
        }
    }

    #[test]
    fn creators_get_contiguous_order_and_primary_flag() {
        let mut item = Item::new(LibraryId::new("u1"), "ITEM2345", "book");
        let mut snapshot = ItemSnapshot::new(LibraryRef::user("u1"), "ITEM2345", 1, "book");
        snapshot.creators = vec![
            creator("author", "Curie"),
            creator("editor", "Bohr"),
            creator("author", "Meitner"),
        ];

        set_creators(&mut item, &snapshot, &Schema::builtin());

        let orders: Vec<usize> = item.creators.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        let primary: Vec<bool> = item.creators.iter().map(|c| c.primary).collect();
        assert_eq!(primary, vec![true, false, true]);
        assert_eq!(
            item.derived.creator_summary.as_deref(),
            Some("Curie and Meitner")
        );
    }

    #[test]
    fn replaced_user_is_reported_detached() {
        let mut graph = Graph::new();
        let mut item = Item::new(LibraryId::new("g1"), "ITEM2345", "book");
        item.created_by = Some(1);
        graph.upsert_user(User::new(1, "old", "Old"));

        let mut snapshot = ItemSnapshot::new(LibraryRef::group("g1", "Lab"), "ITEM2345", 1, "book");
        snapshot.created_by = Some(UserSnapshot {
            id: 2,
            username: "new".into(),
            name: "New".into(),
        });

        let detached = set_users(&mut graph, &mut item, &snapshot);
        assert_eq!(detached, vec![1]);
        assert_eq!(item.created_by, Some(2));
        assert_eq!(graph.user(2).unwrap().username, "new");
        assert_eq!(item.last_modified_by, None);
    }
}
