//! Destination path resolution.
//!
//! Maps an item and one of its files to the local path the file is
//! validated against and written to.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::manifest::{FileKind, Item, RemoteFile};

/// Directory name for extras inside an item directory.
pub const EXTRAS_DIR: &str = "extras";

/// Resolves destination paths for manifest files.
pub trait PathResolver: Send + Sync {
    /// Directory that holds the files of `item`.
    fn item_dir(&self, item: &Item) -> PathBuf;

    /// Full destination path of `file`.
    fn file_path(&self, item: &Item, kind: FileKind, file: &RemoteFile) -> PathBuf {
        let dir = self.item_dir(item);
        match kind {
            FileKind::Setup => dir.join(&file.name),
            FileKind::Extra => dir.join(EXTRAS_DIR).join(&file.name),
        }
    }
}

/// `<root>/<override or dir hint>/[extras/]<name>`.
///
/// Overrides are keyed by item id or directory hint. A relative override is
/// taken relative to the root.
#[derive(Debug, Clone)]
pub struct DefaultPathResolver {
    root: PathBuf,
    overrides: BTreeMap<String, PathBuf>,
}

impl DefaultPathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overrides: BTreeMap::new(),
        }
    }

    /// Add per-item overrides (item id or dir hint to directory).
    pub fn with_overrides<K, V>(mut self, overrides: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<PathBuf>,
    {
        self.overrides
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathResolver for DefaultPathResolver {
    fn item_dir(&self, item: &Item) -> PathBuf {
        let by_id = self.overrides.get(&item.id.to_string());
        match by_id.or_else(|| self.overrides.get(&item.dir_hint)) {
            Some(dir) => self.root.join(dir),
            None => self.root.join(&item.dir_hint),
        }
    }
}
