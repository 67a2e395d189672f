//! Field reconciliation and derived attribute capture.

use refsync_protocol::ItemSnapshot;
use refsync_store::display::{note_preview, parse_date};
use refsync_store::model::{Field, Item};
use refsync_store::schema::{field, item_type};
use refsync_store::Schema;
use std::collections::BTreeSet;

/// Base-field values seen while walking the snapshot's fields.
#[derive(Debug, Default)]
struct Captured<'a> {
    title: Option<&'a str>,
    note: Option<&'a str>,
    date: Option<&'a str>,
    publisher: Option<&'a str>,
    publication_title: Option<&'a str>,
    annotation_sort_index: Option<&'a str>,
    md5: Option<&'a str>,
}

impl<'a> Captured<'a> {
    fn record(&mut self, base_key: &str, value: &'a str) {
        let slot = match base_key {
            field::TITLE => &mut self.title,
            field::NOTE => &mut self.note,
            field::DATE => &mut self.date,
            field::PUBLISHER => &mut self.publisher,
            field::PUBLICATION_TITLE => &mut self.publication_title,
            field::ANNOTATION_SORT_INDEX => &mut self.annotation_sort_index,
            field::MD5 => &mut self.md5,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// Makes the item's fields match the snapshot.
///
/// Fields missing from the snapshot are dropped, known fields are updated in
/// place and new fields are appended, so existing order is preserved and no
/// key appears twice. The derived attributes that depend on fields are
/// captured in the same pass.
pub(super) fn reconcile(item: &mut Item, snapshot: &ItemSnapshot, schema: &Schema) {
    let incoming: BTreeSet<&str> = snapshot.fields.iter().map(|f| f.key.as_str()).collect();
    item.fields.retain(|f| incoming.contains(f.key.as_str()));

    let mut captured = Captured::default();
    for remote in &snapshot.fields {
        let base_key = schema.base_field(&item.item_type, &remote.key);

        match item.fields.iter_mut().find(|f| f.key == remote.key) {
            Some(local) => {
                if local.value != remote.value {
                    local.value.clone_from(&remote.value);
                }
                local.base_key = base_key.map(str::to_string);
                local.changed = false;
            }
            None => item.fields.push(Field {
                base_key: base_key.map(str::to_string),
                ..Field::new(remote.key.as_str(), remote.value.as_str())
            }),
        }

        captured.record(base_key.unwrap_or(&remote.key), &remote.value);
    }

    apply_captured(item, &captured);
}

fn apply_captured(item: &mut Item, captured: &Captured<'_>) {
    let derived = &mut item.derived;
    derived.base_title = captured.title.unwrap_or_default().to_string();
    derived.note_preview = if item.item_type == item_type::NOTE {
        Some(note_preview(captured.note.unwrap_or_default()))
    } else {
        None
    };

    let parsed = captured.date.and_then(parse_date);
    derived.date = captured.date.map(str::to_string);
    derived.parsed_year = parsed.as_ref().map(|p| p.year);
    derived.parsed_date = parsed.map(|p| p.sortable);

    derived.publisher = captured.publisher.map(str::to_string);
    derived.publication_title = captured.publication_title.map(str::to_string);
    derived.annotation_sort_index = captured.annotation_sort_index.map(str::to_string);
    derived.content_hash = captured.md5.map(str::to_string);
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsync_protocol::{FieldSnapshot, LibraryRef};
    use refsync_store::LibraryId;

    fn snapshot(item_type: &str, fields: &[(&str, &str)]) -> ItemSnapshot {
        let mut snapshot = ItemSnapshot::new(LibraryRef::user("u1"), "ITEM2345", 2, item_type);
        snapshot.fields = fields
            .iter()
            .map(|(key, value)| FieldSnapshot {
                key: (*key).to_string(),
                value: (*value).to_string(),
            })
            .collect();
        snapshot
    }

    #[test]
    fn drops_updates_and_appends() {
        let mut item = Item::new(LibraryId::new("u1"), "ITEM2345", "book");
        item.fields = vec![
            Field::new("title", "Old"),
            Field::new("extra", "gone"),
            Field::new("date", "2001"),
        ];

        let snap = snapshot("book", &[("date", "2002"), ("title", "New"), ("publisher", "P")]);
        reconcile(&mut item, &snap, &Schema::builtin());

        let keys: Vec<&str> = item.fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["title", "date", "publisher"]);
        assert_eq!(item.field_value("title"), Some("New"));
        assert_eq!(item.derived.base_title, "New");
        assert_eq!(item.derived.parsed_year, Some(2002));
        assert_eq!(item.derived.publisher.as_deref(), Some("P"));
    }

    #[test]
    fn duplicate_snapshot_keys_do_not_duplicate_fields() {
        let mut item = Item::new(LibraryId::new("u1"), "ITEM2345", "book");
        let snap = snapshot("book", &[("title", "First"), ("title", "Second")]);
        reconcile(&mut item, &snap, &Schema::builtin());

        assert_eq!(item.fields.len(), 1);
        assert_eq!(item.field_value("title"), Some("Second"));
    }

    #[test]
    fn type_specific_fields_map_to_base_fields() {
        let mut item = Item::new(LibraryId::new("u1"), "CASE2345", "case");
        let snap = snapshot("case", &[("caseName", "Roe v. Wade"), ("dateDecided", "1973")]);
        reconcile(&mut item, &snap, &Schema::builtin());

        assert_eq!(item.field("caseName").unwrap().base_key.as_deref(), Some("title"));
        assert_eq!(item.field_value("title"), Some("Roe v. Wade"));
        assert_eq!(item.derived.base_title, "Roe v. Wade");
    }

    #[test]
    fn note_and_attachment_captures() {
        let mut note = Item::new(LibraryId::new("u1"), "NOTE2345", "note");
        reconcile(
            &mut note,
            &snapshot("note", &[("note", "<p>Hello <b>world</b></p><p>more</p>")]),
            &Schema::builtin(),
        );
        assert_eq!(note.derived.note_preview.as_deref(), Some("Hello world"));

        let mut attachment = Item::new(LibraryId::new("u1"), "ATT23456", "attachment");
        reconcile(
            &mut attachment,
            &snapshot("attachment", &[("md5", "abc123")]),
            &Schema::builtin(),
        );
        assert_eq!(attachment.derived.content_hash.as_deref(), Some("abc123"));
        assert_eq!(attachment.derived.note_preview, None);
    }
}
