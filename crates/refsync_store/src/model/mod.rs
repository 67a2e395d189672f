//! Entities stored in the object graph.
//!
//! Relationships between entities are stored as key sets, never as embedded
//! references, so item↔parent and item↔tag cycles cannot form ownership
//! cycles.

mod collection;
mod item;
mod library;
mod tag;
mod user;

pub use collection::Collection;
pub use item::{
    ChangeSource, Creator, DerivedFields, Field, InkPath, Item, ItemChange, Link, LinkRole, Rect,
    SyncState,
};
pub use library::{Library, LibraryKind};
pub use tag::{Tag, TagType};
pub use user::User;
