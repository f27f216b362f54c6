//! Compare, update and fetch.
//!
//! A [`Synchronizer`] owns the validation cache for the duration of a run.
//! Every validation pass persists the cache when it finishes, so an
//! interrupted fetch still leaves an accurate picture of what is on disk.

mod context;
mod report;
mod selection;

pub use context::SyncContext;
pub use report::{AuditEntry, AuditReport, FetchSummary};
pub use selection::Selection;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::{CacheError, ComparisonMode, ValidationCache};
use crate::error::{SyncError, SyncResult};
use crate::integrity::{validate, FileKey, FileStatus, ValidationRecord};
use crate::manifest::{is_plain_name, FileKind, Item, Manifest, RemoteFile};
use crate::scheduler::{prepare_destination, schedule, PlannedFile};
use crate::transfer::{file_name_from_url, Reporter};

/// Asked once per selected item with outstanding work, with the number of
/// bytes it needs. Returning `false` skips the item.
pub type ConfirmFn<'a> = dyn FnMut(&Item, u64) -> bool + 'a;

/// A validated file of the current pass.
struct Checked<'m> {
    item: &'m Item,
    kind: FileKind,
    file: &'m RemoteFile,
    dest: PathBuf,
    record: ValidationRecord,
}

/// Runs validation passes and fetches against one cache file.
#[derive(Debug)]
pub struct Synchronizer {
    ctx: SyncContext,
    cache: ValidationCache,
}

impl Synchronizer {
    /// Open the cache named in the context.
    ///
    /// A corrupt or incompatible cache file is discarded with a warning;
    /// the next pass rebuilds it.
    pub fn open(ctx: SyncContext) -> SyncResult<Self> {
        let path = &ctx.config.cache_file;
        let cache = match ValidationCache::load(path) {
            Ok(cache) => cache,
            Err(e @ (CacheError::Parse { .. } | CacheError::UnsupportedVersion { .. })) => {
                tracing::warn!(error = %e, "Ignoring unusable validation cache");
                ValidationCache::new()
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), records = cache.len(), "Loaded validation cache");
        Ok(Self { ctx, cache })
    }

    /// Create with an explicit cache.
    pub fn with_cache(ctx: SyncContext, cache: ValidationCache) -> Self {
        Self { ctx, cache }
    }

    pub fn cache(&self) -> &ValidationCache {
        &self.cache
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Fill in empty file names from the final URL of each file's download
    /// link. Returns the number of names recovered.
    ///
    /// Files whose name cannot be recovered keep an empty name and are
    /// skipped by later passes.
    pub fn resolve_names(&self, manifest: &mut Manifest) -> SyncResult<usize> {
        let mut resolved = 0;

        for (item_id, file) in manifest.files_mut().filter(|(_, f)| f.name.is_empty()) {
            match self.ctx.fetcher.resolve(&file.url) {
                Ok(final_url) => match file_name_from_url(&final_url) {
                    Some(name) if is_plain_name(&name) => {
                        tracing::debug!(item = item_id, url = %file.url, name = %name, "Resolved file name");
                        file.name = name;
                        resolved += 1;
                    }
                    Some(name) => {
                        tracing::warn!(item = item_id, url = %final_url, name = %name, "Rejected unsafe file name");
                    }
                    None => {
                        tracing::warn!(item = item_id, url = %final_url, "No file name in resolved URL");
                    }
                },
                Err(e) => {
                    tracing::warn!(item = item_id, url = %file.url, error = %e, "Failed to resolve file name");
                }
            }
        }

        manifest.validate()?;
        Ok(resolved)
    }

    /// Full validation pass, ignoring cached verdicts.
    pub fn compare(&mut self, manifest: &Manifest) -> SyncResult<AuditReport> {
        self.pass(manifest, ComparisonMode::Full)
    }

    /// Validation pass reusing cached verdicts for unchanged, complete files.
    pub fn update(&mut self, manifest: &Manifest) -> SyncResult<AuditReport> {
        self.pass(manifest, ComparisonMode::Incremental)
    }

    /// Validate the selection, then fetch everything it needs.
    ///
    /// Returns [`SyncError::Interrupted`] if `cancel` is set before the
    /// transfers finish; errors collected up to that point have already
    /// been handed to `reporter`. Cancellation during validation leaves the
    /// cache and the library untouched.
    pub fn fetch(
        &mut self,
        manifest: &Manifest,
        selection: &Selection,
        confirm: &mut ConfirmFn<'_>,
        reporter: &dyn Reporter,
        cancel: &AtomicBool,
    ) -> SyncResult<FetchSummary> {
        let (checked, audit) =
            self.validate_all(manifest, self.ctx.config.comparison, selection, cancel)?;
        for c in &checked {
            self.cache.insert(c.record.clone());
        }
        self.cache.save(&self.ctx.config.cache_file)?;

        let mut summary = FetchSummary {
            audit,
            ..FetchSummary::default()
        };

        let mut approved: BTreeSet<u64> = BTreeSet::new();
        for item in manifest.items.iter().filter(|i| selection.includes_item(i.id)) {
            let outstanding: Vec<&Checked> = checked
                .iter()
                .filter(|c| c.item.id == item.id && !c.record.is_complete())
                .collect();
            if outstanding.is_empty() {
                approved.insert(item.id);
                continue;
            }

            let bytes = outstanding.iter().map(|c| c.record.needed_bytes()).sum();
            if confirm(item, bytes) {
                approved.insert(item.id);
            } else {
                tracing::info!(item = item.id, title = %item.title, "Skipped by user");
                summary.declined.push(item.id);
            }
        }

        let planned: Vec<PlannedFile> = checked
            .iter()
            .filter(|c| approved.contains(&c.item.id))
            .map(|c| PlannedFile {
                item_id: c.item.id,
                kind: c.kind,
                file: c.file,
                record: &c.record,
                dest: c.dest.clone(),
            })
            .filter(|p| p.has_work())
            .collect();

        if cancel.load(Ordering::SeqCst) {
            return Err(SyncError::Interrupted);
        }

        for plan in &planned {
            prepare_destination(plan).map_err(|source| SyncError::Prepare {
                path: plan.dest.clone(),
                source,
            })?;
        }

        let queue = schedule(&planned, self.ctx.config.priority);
        if queue.is_empty() {
            tracing::info!("Nothing to fetch");
            return Ok(summary);
        }

        summary.run = self.ctx.transfer_pool().run(
            queue,
            Arc::clone(&self.ctx.fetcher),
            reporter,
            cancel,
        );

        if summary.run.interrupted {
            return Err(SyncError::Interrupted);
        }
        Ok(summary)
    }

    fn pass(&mut self, manifest: &Manifest, mode: ComparisonMode) -> SyncResult<AuditReport> {
        let (checked, audit) =
            self.validate_all(manifest, mode, &Selection::all(), &AtomicBool::new(false))?;

        self.cache = ValidationCache::from_records(checked.into_iter().map(|c| c.record));
        self.cache.save(&self.ctx.config.cache_file)?;

        tracing::info!(
            valid = audit.valid().count(),
            missing = audit.missing().count(),
            corrupt = audit.corrupt().count(),
            cached = audit.cache_hits(),
            "Validation pass complete"
        );
        Ok(audit)
    }

    fn validate_all<'m>(
        &self,
        manifest: &'m Manifest,
        mode: ComparisonMode,
        selection: &Selection,
        cancel: &AtomicBool,
    ) -> SyncResult<(Vec<Checked<'m>>, AuditReport)> {
        // Destination paths are joined from manifest names.
        manifest.validate()?;

        let mut checked = Vec::new();
        let mut audit = AuditReport::default();

        for item in manifest.items.iter().filter(|i| selection.includes_item(i.id)) {
            for (kind, file) in item.files().filter(|(k, _)| selection.includes_kind(*k)) {
                if cancel.load(Ordering::SeqCst) {
                    tracing::warn!(file = %file.name, "Validation interrupted");
                    return Err(SyncError::Interrupted);
                }
                if file.name.is_empty() {
                    tracing::warn!(item = item.id, url = %file.url, "Skipping file without a name");
                    audit.unnamed += 1;
                    continue;
                }

                let key = FileKey::new(item.id, file.name.clone());
                let dest = self.ctx.resolver.file_path(item, kind, file);
                let cached = self.cache.lookup(&key, mode);

                let validation = match validate(item.id, file, cached, &dest) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(file = %key, error = %e, "Failed to validate");
                        audit.unreadable.push((key, e.to_string()));
                        continue;
                    }
                };

                if validation.status != FileStatus::Valid {
                    tracing::debug!(
                        file = %key,
                        status = ?validation.status,
                        needed = validation.record.needed_bytes(),
                        "File needs transfer"
                    );
                }

                audit.entries.push(AuditEntry {
                    key,
                    kind,
                    path: dest.clone(),
                    status: validation.status,
                    needed_bytes: validation.record.needed_bytes(),
                    from_cache: validation.from_cache,
                    inconsistency: validation.inconsistency,
                });
                checked.push(Checked {
                    item,
                    kind,
                    file,
                    dest,
                    record: validation.record,
                });
            }
        }

        Ok((checked, audit))
    }
}
