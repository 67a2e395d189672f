//! Property-based test generators using proptest.
//!
//! Strategies produce data that respects the invariants the engine relies
//! on: keys use the entity key alphabet, and snapshots stay within one
//! library.

use crate::builders::{BatchBuilder, SnapshotBuilder};
use proptest::prelude::*;
use refsync_protocol::{CreatorSnapshot, ItemBatch, ItemSnapshot};
use refsync_store::KEY_ALPHABET;

/// Strategy for generating valid entity keys.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(KEY_ALPHABET.to_vec()), 8)
        .prop_map(|bytes| bytes.into_iter().map(char::from).collect())
}

/// Strategy for generating tag names.
pub fn tag_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9 -]{0,15}").expect("Invalid regex")
}

/// Strategy for generating creators of common roles.
pub fn creator_strategy() -> impl Strategy<Value = CreatorSnapshot> {
    (
        prop::sample::select(vec!["author", "editor", "contributor"]),
        "[A-Z][a-z]{1,8}",
        "[A-Z][a-z]{1,10}",
    )
        .prop_map(|(role, first, last)| CreatorSnapshot {
            creator_type: role.to_string(),
            first_name: first,
            last_name: last,
            name: String::new(),
        })
}

/// Strategy for generating book snapshots with fields, creators and tags.
pub fn book_snapshot_strategy() -> impl Strategy<Value = ItemSnapshot> {
    (
        key_strategy(),
        1u64..10_000,
        "[A-Za-z ]{1,40}",
        prop::option::of(1800i32..2030),
        prop::collection::vec(creator_strategy(), 0..5),
        prop::collection::btree_set(tag_name_strategy(), 0..4),
    )
        .prop_map(|(key, version, title, year, creators, tags)| {
            let mut builder = SnapshotBuilder::new(&key, "book")
                .version(version)
                .field("title", &title);
            if let Some(year) = year {
                builder = builder.field("date", &year.to_string());
            }
            for tag in &tags {
                builder = builder.tag(tag);
            }
            let mut snapshot = builder.build();
            snapshot.creators = creators;
            snapshot
        })
}

/// Strategy for generating a user-library batch of books with distinct keys.
pub fn batch_strategy() -> impl Strategy<Value = ItemBatch> {
    prop::collection::vec(book_snapshot_strategy(), 1..8).prop_map(|snapshots| {
        let mut seen = std::collections::BTreeSet::new();
        snapshots
            .into_iter()
            .filter(|s| seen.insert(s.key.clone()))
            .fold(BatchBuilder::user(crate::fixtures::TEST_LIBRARY), |batch, s| {
                batch.raw(s)
            })
            .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsync_store::is_valid_key;

    proptest! {
        #[test]
        fn keys_are_valid(key in key_strategy()) {
            prop_assert!(is_valid_key(&key));
        }

        #[test]
        fn batches_have_distinct_keys(batch in batch_strategy()) {
            let keys: std::collections::BTreeSet<_> = batch.items.iter().map(|s| &s.key).collect();
            prop_assert_eq!(keys.len(), batch.items.len());
            for item in &batch.items {
                prop_assert_eq!(&item.library, &batch.library);
            }
        }
    }
}
