//! Which items and files a fetch covers.

use std::collections::BTreeSet;

use crate::manifest::FileKind;

/// Item and file-kind filter for [`Synchronizer::fetch`](super::Synchronizer::fetch).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Restrict to these item ids; `None` selects every item.
    pub ids: Option<BTreeSet<u64>>,
    pub skip_setups: bool,
    pub skip_extras: bool,
}

impl Selection {
    /// Every file of every item.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    pub fn without_setups(mut self) -> Self {
        self.skip_setups = true;
        self
    }

    pub fn without_extras(mut self) -> Self {
        self.skip_extras = true;
        self
    }

    pub fn includes_item(&self, id: u64) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.contains(&id))
    }

    pub fn includes_kind(&self, kind: FileKind) -> bool {
        match kind {
            FileKind::Setup => !self.skip_setups,
            FileKind::Extra => !self.skip_extras,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_includes_everything() {
        let selection = Selection::all();
        assert!(selection.includes_item(1));
        assert!(selection.includes_kind(FileKind::Setup));
        assert!(selection.includes_kind(FileKind::Extra));
    }

    #[test]
    fn test_filters() {
        let selection = Selection::all().with_ids([3, 5]).without_extras();
        assert!(selection.includes_item(5));
        assert!(!selection.includes_item(4));
        assert!(selection.includes_kind(FileKind::Setup));
        assert!(!selection.includes_kind(FileKind::Extra));
    }
}
