// Auto-save support. The timer itself belongs to the host; this module decides where a copy goes and
// whether one may be written right now.

use crate::error::SaveError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared "an edit is in progress" counter. Clones share the count, so a timer on another thread
/// can poll the gate the editor suspends.
#[derive(Clone, Debug, Default)]
pub struct AutoSaveGate(Arc<AtomicUsize>);

/// Keeps the gate suspended until dropped.
#[must_use = "auto-save resumes as soon as the suspension is dropped"]
#[derive(Debug)]
pub struct Suspension(Arc<AtomicUsize>);

impl AutoSaveGate {
    pub fn new() -> Self {
        AutoSaveGate::default()
    }

    pub fn suspend(&self) -> Suspension {
        self.0.fetch_add(1, Ordering::SeqCst);
        Suspension(self.0.clone())
    }

    pub fn is_suspended(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

impl Drop for Suspension {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Rotating slot counter, `1..=max`.
#[derive(Clone, Debug)]
pub struct AutoSaveSlots {
    next: u32,
    max: u32,
}

impl AutoSaveSlots {
    pub fn new(max: u32) -> Self {
        AutoSaveSlots { next: 1, max: max.max(1) }
    }

    /// The slot the next auto-save writes to.
    pub fn peek(&self) -> u32 {
        self.next
    }

    pub fn advance(&mut self) {
        self.next = if self.next >= self.max { 1 } else { self.next + 1 };
    }
}

/// `<dir>/<stem>_autosave_<slot>.xml` for the config at `config`.
pub fn autosave_path(config: &Path, slot: u32) -> PathBuf {
    let stem = config
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    config.with_file_name(format!("{}_autosave_{}.xml", stem, slot))
}

/// Refuses directories and existing read-only files; a missing file is fine.
pub fn check_writable(path: &Path) -> Result<(), SaveError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(SaveError::IsDirectory(path.to_path_buf())),
        Ok(meta) if meta.permissions().readonly() => Err(SaveError::ReadOnly(path.to_path_buf())),
        _ => Ok(()),
    }
}
