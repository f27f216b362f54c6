//! Work items: one network transfer each.

use std::path::PathBuf;

use super::policy::Priority;
use crate::integrity::{ByteRange, FileKey};

/// A single scheduled transfer of `range` from `url` into `dest`.
///
/// Created per run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub key: FileKey,
    pub url: String,
    pub range: ByteRange,
    pub dest: PathBuf,
    pub priority: Priority,
}
