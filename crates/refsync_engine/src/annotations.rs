//! Creating annotation items from a document reader.
//!
//! Every annotation kind shares one creation path. What differs between kinds
//! (extra position data, whether selected text is stored) comes from
//! [`AnnotationKind`].

use chrono::{DateTime, Utc};
use refsync_store::model::{ChangeSource, Field, InkPath, Item, ItemChange, Rect, TagType, User};
use refsync_store::schema::{field, item_type};
use refsync_store::{generate_key, Clock, EntityKey, Graph, Schema, StoreError, StoreResult};
use serde_json::json;
use tracing::debug;

/// Field keys written on annotation items.
pub mod annotation_field {
    /// Annotation kind name.
    pub const TYPE: &str = "annotationType";
    /// Selected text.
    pub const TEXT: &str = "annotationText";
    /// User comment.
    pub const COMMENT: &str = "annotationComment";
    /// Display color.
    pub const COLOR: &str = "annotationColor";
    /// Page label shown to the user.
    pub const PAGE_LABEL: &str = "annotationPageLabel";
    /// JSON position on the page.
    pub const POSITION: &str = "annotationPosition";
    /// Author name for annotations by other users.
    pub const AUTHOR_NAME: &str = "annotationAuthorName";
}

/// Kind of annotation, with the data only that kind carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnnotationKind {
    /// Highlighted text.
    Highlight,
    /// Underlined text.
    Underline,
    /// Sticky note.
    Note,
    /// Image selection.
    Image,
    /// Freehand drawing.
    Ink {
        /// Stroke width.
        width: f64,
    },
    /// Free text box.
    Text {
        /// Font size.
        font_size: f64,
        /// Rotation in degrees.
        rotation: f64,
    },
}

impl AnnotationKind {
    /// Name stored in the annotation type field.
    pub const fn type_name(self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Underline => "underline",
            AnnotationKind::Note => "note",
            AnnotationKind::Image => "image",
            AnnotationKind::Ink { .. } => "ink",
            AnnotationKind::Text { .. } => "text",
        }
    }

    /// Whether the selected text is stored.
    pub const fn stores_text(self) -> bool {
        matches!(
            self,
            AnnotationKind::Highlight | AnnotationKind::Underline | AnnotationKind::Text { .. }
        )
    }

    fn position(self, page_index: u32, rects: &[Rect], paths: &[InkPath]) -> serde_json::Value {
        let rects: Vec<[f64; 4]> = rects
            .iter()
            .map(|r| [r.min_x, r.min_y, r.max_x, r.max_y])
            .collect();
        match self {
            AnnotationKind::Ink { width } => json!({
                "pageIndex": page_index,
                "width": width,
                "paths": paths,
            }),
            AnnotationKind::Text {
                font_size,
                rotation,
            } => json!({
                "pageIndex": page_index,
                "fontSize": font_size,
                "rotation": rotation,
                "rects": rects,
            }),
            _ => json!({
                "pageIndex": page_index,
                "rects": rects,
            }),
        }
    }
}

/// An annotation as produced by a document reader.
pub trait ReaderAnnotation {
    /// Key to create the item under; empty to generate one.
    fn key(&self) -> &str;
    /// Annotation kind.
    fn kind(&self) -> AnnotationKind;
    /// Zero-based page index.
    fn page_index(&self) -> u32;
    /// Page label shown to the user.
    fn page_label(&self) -> &str;
    /// Display color, e.g. `#ffd400`.
    fn color(&self) -> &str;
    /// User comment.
    fn comment(&self) -> &str;
    /// Position key that orders annotations within the document.
    fn sort_index(&self) -> &str;
    /// Selected text, for kinds that store it.
    fn text(&self) -> Option<&str>;
    /// Tag names.
    fn tags(&self) -> &[String];
    /// Rectangles covered by the annotation.
    fn rects(&self) -> &[Rect];
    /// Ink strokes.
    fn paths(&self) -> &[InkPath];
    /// Display name of the author.
    fn author(&self) -> &str;
    /// Whether `user` wrote the annotation.
    fn is_authored_by(&self, user: &User) -> bool;
}

/// Plain annotation record.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAnnotation {
    /// Key; empty to generate one.
    pub key: String,
    /// Annotation kind.
    pub kind: AnnotationKind,
    /// Zero-based page index.
    pub page_index: u32,
    /// Page label.
    pub page_label: String,
    /// Display color.
    pub color: String,
    /// User comment.
    pub comment: String,
    /// Sort position key.
    pub sort_index: String,
    /// Selected text.
    pub text: Option<String>,
    /// Tag names.
    pub tags: Vec<String>,
    /// Rectangles.
    pub rects: Vec<Rect>,
    /// Ink strokes.
    pub paths: Vec<InkPath>,
    /// Author display name.
    pub author: String,
    /// Author user id, when known.
    pub author_id: Option<u64>,
}

impl ReaderAnnotation for DocumentAnnotation {
    fn key(&self) -> &str {
        &self.key
    }
    fn kind(&self) -> AnnotationKind {
        self.kind
    }
    fn page_index(&self) -> u32 {
        self.page_index
    }
    fn page_label(&self) -> &str {
        &self.page_label
    }
    fn color(&self) -> &str {
        &self.color
    }
    fn comment(&self) -> &str {
        &self.comment
    }
    fn sort_index(&self) -> &str {
        &self.sort_index
    }
    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
    fn rects(&self) -> &[Rect] {
        &self.rects
    }
    fn paths(&self) -> &[InkPath] {
        &self.paths
    }
    fn author(&self) -> &str {
        &self.author
    }
    fn is_authored_by(&self, user: &User) -> bool {
        self.author_id == Some(user.id)
    }
}

/// Creates annotation items under an attachment as local edits.
///
/// Returns the keys of the created items. Fails without writing anything if
/// the attachment does not exist or is not an attachment.
pub fn create_reader_annotations<A: ReaderAnnotation>(
    graph: &mut Graph,
    schema: &Schema,
    clock: &dyn Clock,
    attachment: &EntityKey,
    annotations: &[A],
    current_user: Option<&User>,
) -> StoreResult<Vec<EntityKey>> {
    let parent = graph.item(attachment).ok_or_else(|| StoreError::MissingParent {
        parent: attachment.clone(),
        child: annotations
            .first()
            .map(|a| a.key().to_string())
            .unwrap_or_default(),
    })?;
    if !parent.is_attachment() {
        return Err(StoreError::invalid_operation(format!(
            "{attachment} is a {}, not an attachment",
            parent.item_type
        )));
    }
    if !schema.knows_type(item_type::ANNOTATION) {
        return Err(StoreError::invalid_schema("schema has no annotation item type"));
    }

    let now = clock.now();
    let mut created = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        let item = build_item(graph, attachment, annotation, current_user, now);
        debug!(item = %item.entity_key(), kind = annotation.kind().type_name(), "created annotation");
        created.push(item.entity_key());
        graph.insert_item(item);
    }
    Ok(created)
}

fn build_item<A: ReaderAnnotation>(
    graph: &mut Graph,
    attachment: &EntityKey,
    annotation: &A,
    current_user: Option<&User>,
    now: DateTime<Utc>,
) -> Item {
    let key = match annotation.key() {
        "" => generate_key(),
        key => key.to_string(),
    };
    let kind = annotation.kind();

    let mut item = Item::new(attachment.library.clone(), key, item_type::ANNOTATION);
    item.parent = Some(attachment.key.clone());
    item.change_source = ChangeSource::User;
    item.date_added = Some(now);
    item.date_modified = Some(now);

    let position = kind.position(annotation.page_index(), annotation.rects(), annotation.paths());
    let mut fields = vec![
        (annotation_field::TYPE, kind.type_name().to_string()),
        (annotation_field::COLOR, annotation.color().to_string()),
        (annotation_field::PAGE_LABEL, annotation.page_label().to_string()),
        (field::ANNOTATION_SORT_INDEX, annotation.sort_index().to_string()),
        (annotation_field::POSITION, position.to_string()),
    ];
    if !annotation.comment().is_empty() {
        fields.push((annotation_field::COMMENT, annotation.comment().to_string()));
    }
    if let Some(text) = annotation.text().filter(|_| kind.stores_text()) {
        fields.push((annotation_field::TEXT, text.to_string()));
    }

    match current_user.filter(|user| annotation.is_authored_by(user)) {
        Some(user) => {
            graph.upsert_user(user.clone());
            item.created_by = Some(user.id);
        }
        None => fields.push((annotation_field::AUTHOR_NAME, annotation.author().to_string())),
    }

    item.fields = fields
        .into_iter()
        .map(|(key, value)| Field {
            changed: true,
            ..Field::new(key, value)
        })
        .collect();
    item.derived.annotation_sort_index = Some(annotation.sort_index().to_string());

    item.rects = annotation.rects().to_vec();
    item.paths = annotation.paths().to_vec();
    for name in annotation.tags() {
        graph.link_tag(&mut item, name, TagType::Manual);
    }

    for change in [ItemChange::Parent, ItemChange::Fields, ItemChange::Rects] {
        item.mark_changed(change);
    }
    if !item.paths.is_empty() {
        item.mark_changed(ItemChange::Paths);
    }
    if !item.tags.is_empty() {
        item.mark_changed(ItemChange::Tags);
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use refsync_store::{FixedClock, LibraryId, TagKey};

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn graph_with_attachment() -> (Graph, EntityKey) {
        let mut graph = Graph::new();
        let key = EntityKey::new(LibraryId::new("u1"), "ATTACH23");
        graph.insert_item(Item::new(key.library.clone(), key.key.as_str(), "attachment"));
        (graph, key)
    }

    fn highlight(author_id: Option<u64>) -> DocumentAnnotation {
        DocumentAnnotation {
            key: String::new(),
            kind: AnnotationKind::Highlight,
            page_index: 2,
            page_label: "3".into(),
            color: "#ffd400".into(),
            comment: "check this".into(),
            sort_index: "00002|000100|00200".into(),
            text: Some("selected words".into()),
            tags: vec!["reading".into()],
            rects: vec![Rect::new(10.0, 20.0, 110.0, 32.0)],
            paths: Vec::new(),
            author: "Ada".into(),
            author_id,
        }
    }

    #[test]
    fn creates_local_annotation_items() {
        let (mut graph, attachment) = graph_with_attachment();
        let me = User::new(7, "ada", "Ada");

        let keys = create_reader_annotations(
            &mut graph,
            &Schema::builtin(),
            &clock(),
            &attachment,
            &[highlight(Some(7))],
            Some(&me),
        )
        .unwrap();

        assert_eq!(keys.len(), 1);
        assert!(refsync_store::is_valid_key(&keys[0].key));
        let item = graph.item(&keys[0]).unwrap();
        assert!(item.is_annotation());
        assert!(item.is_changed());
        assert_eq!(item.parent.as_deref(), Some("ATTACH23"));
        assert_eq!(item.field_value(annotation_field::TYPE), Some("highlight"));
        assert_eq!(item.field_value(annotation_field::TEXT), Some("selected words"));
        assert_eq!(item.field_value(annotation_field::AUTHOR_NAME), None);
        assert_eq!(item.created_by, Some(7));
        assert!(graph.user(7).is_some());
        assert!(graph
            .tag(&TagKey::new(LibraryId::new("u1"), "reading"))
            .unwrap()
            .items
            .contains(&keys[0].key));
    }

    #[test]
    fn other_authors_are_named() {
        let (mut graph, attachment) = graph_with_attachment();
        let me = User::new(7, "ada", "Ada");
        let mut ink = highlight(Some(9));
        ink.key = "INK23456".into();
        ink.kind = AnnotationKind::Ink { width: 2.5 };
        ink.paths = vec![vec![1.0, 2.0, 3.0, 4.0]];
        ink.author = "Grace".into();

        let keys = create_reader_annotations(
            &mut graph,
            &Schema::builtin(),
            &clock(),
            &attachment,
            &[ink],
            Some(&me),
        )
        .unwrap();

        let item = graph.item(&keys[0]).unwrap();
        assert_eq!(item.key, "INK23456");
        assert_eq!(item.field_value(annotation_field::AUTHOR_NAME), Some("Grace"));
        assert_eq!(item.field_value(annotation_field::TEXT), None);
        assert_eq!(item.created_by, None);
        assert!(item.changes.contains(&ItemChange::Paths));

        let position: serde_json::Value =
            serde_json::from_str(item.field_value(annotation_field::POSITION).unwrap()).unwrap();
        assert_eq!(position["width"], 2.5);
        assert_eq!(position["pageIndex"], 2);
    }

    #[test]
    fn missing_attachment_is_an_error() {
        let mut graph = Graph::new();
        let attachment = EntityKey::new(LibraryId::new("u1"), "NOPE2345");

        let result = create_reader_annotations(
            &mut graph,
            &Schema::builtin(),
            &clock(),
            &attachment,
            &[highlight(None)],
            None,
        );
        assert!(matches!(result, Err(StoreError::MissingParent { .. })));
        assert_eq!(graph.items().count(), 0);
    }
}
