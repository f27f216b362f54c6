//! Typed manifest model.
//!
//! The manifest is produced by the catalog collaborator and is read-only to
//! the rest of the crate. It is stored as a versioned JSON document:
//!
//! ```text
//! {
//!   "version": 1,
//!   "items": [
//!     {
//!       "id": 1207658924,
//!       "title": "Example Game",
//!       "dir_hint": "example_game",
//!       "setup_files": [
//!         { "name": "setup.exe", "url": "https://...", "size": 2048,
//!           "checksum": "…", "chunks": [ { "start": 0, "end": 2047, "checksum": "…" } ] }
//!       ],
//!       "extra_files": [ { "name": "manual.pdf", "url": "https://...", "size": 10 } ]
//!     }
//!   ]
//! }
//! ```
//!
//! Parsing is strict: shape errors, unsupported versions, malformed digests,
//! chunk tables that do not tile the file, and file names or directory hints
//! that are not a single path component are rejected with a specific
//! [`ManifestError`].

mod error;

pub use error::{ManifestError, ManifestResult};

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::integrity::checksum::DigestKind;
use crate::integrity::range::ByteRange;

/// Manifest format version written and accepted by this crate.
pub const MANIFEST_VERSION: u32 = 1;

/// Which list of an [`Item`] a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// An installer file.
    Setup,
    /// A bonus file (manual, soundtrack, wallpaper...).
    Extra,
}

/// A declared, checksum-verifiable slice of a [`RemoteFile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// First byte of the chunk.
    pub start: u64,
    /// Last byte of the chunk (inclusive).
    pub end: u64,
    /// Expected hex digest of the chunk bytes.
    pub checksum: String,
}

impl Chunk {
    /// The chunk as a byte range.
    pub fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end)
    }

    /// Number of bytes covered by the chunk.
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }
}

/// A file offered by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// File name on disk. Empty when only a redirecting URL is known.
    #[serde(default)]
    pub name: String,
    /// Download URL.
    pub url: String,
    /// Total size in bytes.
    pub size: u64,
    /// Whole-file hex digest, if the catalog provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Ordered chunk table, if the catalog provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<Chunk>>,
}

impl RemoteFile {
    /// Create a file entry with no checksum and no chunk table.
    pub fn new(name: impl Into<String>, url: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            size,
            checksum: None,
            chunks: None,
        }
    }

    /// Set the whole-file checksum.
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Set the chunk table.
    pub fn with_chunks(mut self, chunks: Vec<Chunk>) -> Self {
        self.chunks = Some(chunks);
        self
    }

    /// Returns the chunk table when present and non-empty.
    pub fn chunk_table(&self) -> Option<&[Chunk]> {
        self.chunks.as_deref().filter(|c| !c.is_empty())
    }

    /// True if the file supports chunk-level corruption detection.
    pub fn is_chunked(&self) -> bool {
        self.chunk_table().is_some()
    }

    /// Index of the chunk containing `offset`.
    pub fn chunk_index_at(&self, offset: u64) -> Option<usize> {
        let chunks = self.chunk_table()?;
        let idx = chunks.partition_point(|c| c.end < offset);
        (idx < chunks.len() && chunks[idx].start <= offset).then_some(idx)
    }

    fn check(&self, item_id: u64) -> ManifestResult<()> {
        // Unnamed files are resolved later and checked again then.
        if !self.name.is_empty() && !is_plain_name(&self.name) {
            return Err(ManifestError::InvalidFileName {
                item_id,
                file: self.name.clone(),
            });
        }
        if let Some(sum) = &self.checksum {
            check_digest(item_id, &self.name, sum)?;
        }

        let Some(chunks) = self.chunks.as_deref() else {
            return Ok(());
        };
        if chunks.is_empty() {
            return Ok(());
        }

        let invalid = |reason: String| ManifestError::InvalidChunkTable {
            item_id,
            file: self.name.clone(),
            reason,
        };

        let mut next = 0u64;
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.start != next {
                return Err(invalid(format!(
                    "chunk {} starts at {}, expected {}",
                    i, chunk.start, next
                )));
            }
            if chunk.end < chunk.start {
                return Err(invalid(format!(
                    "chunk {} ends at {} before its start {}",
                    i, chunk.end, chunk.start
                )));
            }
            check_digest(item_id, &self.name, &chunk.checksum)?;
            next = chunk
                .end
                .checked_add(1)
                .ok_or_else(|| invalid(format!("chunk {} ends past the largest offset", i)))?;
        }
        if next != self.size {
            return Err(invalid(format!(
                "chunks cover {} bytes, file size is {}",
                next, self.size
            )));
        }
        Ok(())
    }
}

/// True if `name` is exactly one normal path component, so joining it onto
/// a directory can never leave that directory.
pub fn is_plain_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn check_digest(item_id: u64, file: &str, digest: &str) -> ManifestResult<()> {
    if DigestKind::detect(digest).is_none() {
        return Err(ManifestError::InvalidChecksum {
            item_id,
            file: file.to_string(),
            checksum: digest.to_string(),
        });
    }
    Ok(())
}

/// A purchased product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Catalog identifier.
    pub id: u64,
    /// Display name.
    pub title: String,
    /// Stable directory name hint.
    pub dir_hint: String,
    /// Installer files.
    #[serde(default)]
    pub setup_files: Vec<RemoteFile>,
    /// Bonus files.
    #[serde(default)]
    pub extra_files: Vec<RemoteFile>,
}

impl Item {
    /// Create an item with no files.
    pub fn new(id: u64, title: impl Into<String>, dir_hint: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            dir_hint: dir_hint.into(),
            setup_files: Vec::new(),
            extra_files: Vec::new(),
        }
    }

    /// Add a setup file.
    pub fn with_setup(mut self, file: RemoteFile) -> Self {
        self.setup_files.push(file);
        self
    }

    /// Add an extra file.
    pub fn with_extra(mut self, file: RemoteFile) -> Self {
        self.extra_files.push(file);
        self
    }

    /// All files, setup files first.
    pub fn files(&self) -> impl Iterator<Item = (FileKind, &RemoteFile)> {
        self.setup_files
            .iter()
            .map(|f| (FileKind::Setup, f))
            .chain(self.extra_files.iter().map(|f| (FileKind::Extra, f)))
    }

    fn files_mut(&mut self) -> impl Iterator<Item = &mut RemoteFile> {
        self.setup_files
            .iter_mut()
            .chain(self.extra_files.iter_mut())
    }
}

/// The full catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version.
    pub version: u32,
    /// Items in catalog order.
    pub items: Vec<Item>,
}

impl Manifest {
    /// Create a manifest at the current format version.
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            version: MANIFEST_VERSION,
            items,
        }
    }

    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> ManifestResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ManifestError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a manifest from JSON text.
    pub fn from_json(text: &str) -> ManifestResult<Self> {
        let manifest: Manifest = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> ManifestResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up an item by id.
    pub fn item(&self, id: u64) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Mutable access to every file of every item.
    pub fn files_mut(&mut self) -> impl Iterator<Item = (u64, &mut RemoteFile)> {
        self.items
            .iter_mut()
            .flat_map(|item| {
                let id = item.id;
                item.files_mut().map(move |f| (id, f))
            })
    }

    /// Check structural invariants.
    pub fn validate(&self) -> ManifestResult<()> {
        if self.version != MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion(self.version));
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            if !is_plain_name(&item.dir_hint) {
                return Err(ManifestError::InvalidDirHint {
                    item_id: item.id,
                    dir_hint: item.dir_hint.clone(),
                });
            }
            for (_, file) in item.files() {
                file.check(item.id)?;
                // Unnamed files are resolved later and cannot collide yet.
                if !file.name.is_empty() && !seen.insert((item.id, file.name.as_str())) {
                    return Err(ManifestError::DuplicateFile {
                        item_id: item.id,
                        file: file.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5_A: &str = "0cc175b9c0f1b6a831c399e269772661";
    const MD5_B: &str = "92eb5ffee6ae2fec3ad71c777531578f";

    fn chunk(start: u64, end: u64) -> Chunk {
        Chunk {
            start,
            end,
            checksum: MD5_A.to_string(),
        }
    }

    #[test]
    fn test_parse_minimal_manifest() {
        let json = r#"{
            "version": 1,
            "items": [
                {
                    "id": 42,
                    "title": "Example",
                    "dir_hint": "example",
                    "setup_files": [
                        { "name": "setup.exe", "url": "https://cdn/setup", "size": 4,
                          "checksum": "0cc175b9c0f1b6a831c399e269772661",
                          "chunks": [ { "start": 0, "end": 3, "checksum": "92eb5ffee6ae2fec3ad71c777531578f" } ] }
                    ],
                    "extra_files": [
                        { "name": "manual.pdf", "url": "https://cdn/manual", "size": 10 }
                    ]
                }
            ]
        }"#;

        let manifest = Manifest::from_json(json).unwrap();
        let item = manifest.item(42).unwrap();
        assert_eq!(item.setup_files.len(), 1);
        assert!(item.setup_files[0].is_chunked());
        assert!(!item.extra_files[0].is_chunked());
        assert_eq!(item.extra_files[0].checksum, None);
    }

    #[test]
    fn test_unsupported_version() {
        let json = r#"{ "version": 7, "items": [] }"#;
        match Manifest::from_json(json) {
            Err(ManifestError::UnsupportedVersion(7)) => {}
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let json = r#"{ "version": 1, "items": [ { "id": "not-a-number" } ] }"#;
        assert!(matches!(
            Manifest::from_json(json),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn test_chunk_gap_is_rejected() {
        let file = RemoteFile::new("a.bin", "u", 10).with_chunks(vec![chunk(0, 3), chunk(5, 9)]);
        let manifest = Manifest::new(vec![Item::new(1, "A", "a").with_setup(file)]);

        match manifest.validate() {
            Err(ManifestError::InvalidChunkTable { item_id, reason, .. }) => {
                assert_eq!(item_id, 1);
                assert!(reason.contains("starts at 5"));
            }
            other => panic!("Expected InvalidChunkTable, got {:?}", other),
        }
    }

    #[test]
    fn test_chunk_table_must_cover_size() {
        let file = RemoteFile::new("a.bin", "u", 12).with_chunks(vec![chunk(0, 3), chunk(4, 9)]);
        let manifest = Manifest::new(vec![Item::new(1, "A", "a").with_setup(file)]);
        assert!(matches!(
            manifest.validate(),
            Err(ManifestError::InvalidChunkTable { .. })
        ));
    }

    #[test]
    fn test_chunk_ending_at_max_offset_is_rejected() {
        let file = RemoteFile::new("a.bin", "u", 0).with_chunks(vec![chunk(0, u64::MAX)]);
        let manifest = Manifest::new(vec![Item::new(1, "A", "a").with_setup(file)]);

        match manifest.validate() {
            Err(ManifestError::InvalidChunkTable { reason, .. }) => {
                assert!(reason.contains("largest offset"));
            }
            other => panic!("Expected InvalidChunkTable, got {:?}", other),
        }
    }

    #[test]
    fn test_file_names_must_stay_inside_item_dir() {
        for name in ["../../escaped.bin", "/abs/path", "sub/dir.bin", "sub\\dir.bin", "..", "."] {
            let json = format!(
                r#"{{ "version": 1, "items": [ {{ "id": 1, "title": "A", "dir_hint": "a",
                    "setup_files": [ {{ "name": {:?}, "url": "u", "size": 1 }} ] }} ] }}"#,
                name
            );
            match Manifest::from_json(&json) {
                Err(ManifestError::InvalidFileName { item_id: 1, file }) => assert_eq!(file, name),
                other => panic!("Expected InvalidFileName for {:?}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_dir_hint_must_be_plain() {
        for hint in ["", "../up", "/root", "a/b"] {
            let manifest = Manifest::new(vec![Item::new(4, "A", hint)]);
            assert!(
                matches!(
                    manifest.validate(),
                    Err(ManifestError::InvalidDirHint { item_id: 4, .. })
                ),
                "hint {:?} accepted",
                hint
            );
        }
    }

    #[test]
    fn test_plain_names() {
        assert!(is_plain_name("setup_game (1).exe"));
        assert!(is_plain_name("..hidden"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name("nul\0byte"));
    }

    #[test]
    fn test_invalid_checksum_is_rejected() {
        let file = RemoteFile::new("a.bin", "u", 1).with_checksum("xyz");
        let manifest = Manifest::new(vec![Item::new(1, "A", "a").with_extra(file)]);
        assert!(matches!(
            manifest.validate(),
            Err(ManifestError::InvalidChecksum { .. })
        ));
    }

    #[test]
    fn test_duplicate_file_is_rejected() {
        let item = Item::new(1, "A", "a")
            .with_setup(RemoteFile::new("a.bin", "u1", 1))
            .with_extra(RemoteFile::new("a.bin", "u2", 1));
        let manifest = Manifest::new(vec![item]);
        assert!(matches!(
            manifest.validate(),
            Err(ManifestError::DuplicateFile { item_id: 1, .. })
        ));
    }

    #[test]
    fn test_chunk_index_at() {
        let file = RemoteFile::new("a.bin", "u", 10).with_chunks(vec![
            chunk(0, 3),
            Chunk {
                start: 4,
                end: 9,
                checksum: MD5_B.to_string(),
            },
        ]);
        assert_eq!(file.chunk_index_at(0), Some(0));
        assert_eq!(file.chunk_index_at(3), Some(0));
        assert_eq!(file.chunk_index_at(4), Some(1));
        assert_eq!(file.chunk_index_at(9), Some(1));
        assert_eq!(file.chunk_index_at(10), None);
    }

    #[test]
    fn test_json_round_trip() {
        let item = Item::new(9, "Nine", "nine")
            .with_setup(
                RemoteFile::new("s.bin", "u", 4)
                    .with_checksum(MD5_A)
                    .with_chunks(vec![chunk(0, 3)]),
            )
            .with_extra(RemoteFile::new("e.zip", "v", 3));
        let manifest = Manifest::new(vec![item]);

        let parsed = Manifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }
}
