//! Durable JSON document store.
//!
//! A [`JsonStore`] owns one file on disk and one in-memory state value. The
//! state is loaded once at startup and written back in full after every
//! accepted mutation.
//!
//! # Atomicity
//!
//! [`JsonStore::persist`] writes `<file>.tmp`, fsyncs it, then renames it
//! over the target. A reader (or a restarted process) sees either the
//! previous document or the new one, never a truncated mix.
//!
//! # Load rules
//!
//! | On disk | [`JsonStore::open`] | [`read`] |
//! |---------|---------------------|----------|
//! | missing | `T::default()` | `T::default()` |
//! | empty or whitespace only | `T::default()` | `T::default()` |
//! | valid JSON | parsed state | parsed state |
//! | invalid JSON | moved to `<file>.corrupt`, `T::default()` | error, file untouched |
//!
//! Only the store that is about to rewrite a file may move it aside.
//! Read-only commands (`stats`, `export`) use [`read`].
//!
//! # Cost
//!
//! Every persist rewrites the whole document, O(n) in the corpus size. That
//! is fine for tens of thousands of commits; an append log would need its
//! own replay and compaction rules.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct JsonStore<T> {
    path: PathBuf,
    state: T,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Open the store at `path`, loading whatever is already there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = load_or_reset(&path)?;
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &T {
        &self.state
    }

    /// Apply `f` to the state and persist if it reports a change.
    ///
    /// Returns whatever `f` returned.
    pub fn update(&mut self, f: impl FnOnce(&mut T) -> bool) -> Result<bool> {
        let changed = f(&mut self.state);
        if changed {
            self.persist()?;
        }
        Ok(changed)
    }

    /// Rewrite the backing file with the current state.
    pub fn persist(&self) -> Result<()> {
        write_atomic(&self.path, &self.state)
    }
}

/// Read the state stored at `path` without modifying anything on disk.
///
/// # Errors
///
/// Fails if the file cannot be read or is not valid JSON for `T`.
pub fn read<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match read_bytes(path)? {
        None => Ok(T::default()),
        Some(bytes) => serde_json::from_slice(&bytes).with_context(|| {
            format!(
                "State file is corrupt: {} (fix or remove it and re-run)",
                path.display()
            )
        }),
    }
}

/// Like [`read`], but a corrupt file is moved to `<file>.corrupt` and the
/// state starts empty. Reserved for [`JsonStore::open`].
fn load_or_reset<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(bytes) = read_bytes(path)? else {
        return Ok(T::default());
    };

    match serde_json::from_slice(&bytes) {
        Ok(state) => Ok(state),
        Err(e) => {
            let aside = sibling(path, "corrupt");
            tracing::warn!(
                path = %path.display(),
                moved_to = %aside.display(),
                error = %e,
                "state file is not valid JSON, starting from empty state"
            );
            fs::rename(path, &aside)
                .with_context(|| format!("Failed to move corrupt file: {}", path.display()))?;
            Ok(T::default())
        }
    }
}

/// File contents, or `None` when the file is missing or blank.
fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read state file: {}", path.display()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(bytes))
}

/// Serialize `value` to `path` via a temp file and rename.
pub fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let tmp = sibling(path, "tmp");
    let json = serde_json::to_vec_pretty(value)?;
    {
        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("Failed to create temp file: {}", tmp.display()))?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace state file: {}", path.display()))?;
    Ok(())
}

/// `data/parsed_data.json` + `tmp` → `data/parsed_data.json.tmp`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
