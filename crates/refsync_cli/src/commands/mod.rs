//! CLI command implementations.

pub mod inspect;
pub mod listen;
pub mod merge;
pub mod purge_tags;

use refsync_store::{Store, StoreConfig};
use std::path::Path;

/// Opens an existing store file.
fn open_existing(path: &Path) -> Result<Store, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }
    Ok(Store::open(path, StoreConfig::default().create_if_missing(false))?)
}
