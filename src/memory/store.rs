//! Index store: the line-oriented file on disk.
//!
//! [`load_index`], [`save_index`], and [`append_entry`] are the three I/O paths. `save`
//! rewrites the whole file (header included); `append` only adds one line and leaves an
//! existing header alone. [`resolve_index_path`] performs the one-time `.json` → `.jsonl`
//! migration and redirects callers to the line-oriented sibling.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::memory::codec::{self, IndexHeader, IndexLine};
use crate::memory::types::{MemoryEntry, MemoryIndex, CURRENT_FORMAT_VERSION};

/// Suffix of the legacy single-JSON index.
pub const LEGACY_SUFFIX: &str = "json";
/// Suffix of the line-oriented index.
pub const LINE_SUFFIX: &str = "jsonl";

/// Handle on a resolved index file.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    /// Resolve `configured` (migrating a legacy `.json` file if needed) and open a handle.
    pub fn open(configured: impl AsRef<Path>) -> Result<Self> {
        let path = resolve_index_path(configured.as_ref())?;
        Ok(Self { path })
    }

    /// The file actually read and written, after any suffix redirection.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<MemoryIndex> {
        load_index(&self.path)
    }

    pub fn save(&self, index: &mut MemoryIndex) -> Result<()> {
        save_index(&self.path, index)
    }

    pub fn append(&self, entry: MemoryEntry) -> Result<()> {
        append_entry(&self.path, entry)
    }
}

/// Read the index at `path`. A missing file is an empty index.
///
/// Malformed lines are skipped with a warning. When the file has neither a header nor any
/// entry but contains the legacy collection key, it is parsed as the legacy format.
pub fn load_index(path: &Path) -> Result<MemoryIndex> {
    if !path.exists() {
        debug!(path = %path.display(), "index file absent, starting empty");
        return Ok(MemoryIndex::empty());
    }

    let bytes =
        fs::read(path).with_context(|| format!("failed to read index file {}", path.display()))?;

    let mut index = MemoryIndex::empty();
    let mut header_seen = false;
    let mut skipped: Vec<(usize, String)> = Vec::new();

    // Decoded per line: one bad byte costs one record, not the whole file.
    for (n, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = match std::str::from_utf8(raw) {
            Ok(text) => text.trim(),
            Err(e) => {
                skipped.push((n + 1, e.to_string()));
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match codec::parse_line(line) {
            Ok(IndexLine::Header(header)) if !header_seen => {
                header_seen = true;
                if !header.version.is_empty() {
                    index.version = header.version;
                }
                index.last_updated = header.last_updated;
                index.embedding_model = header.embedding_model;
            }
            Ok(IndexLine::Header(_)) => {
                debug!(path = %path.display(), line = n + 1, "ignoring extra header line");
            }
            Ok(IndexLine::Entry(entry)) => index.entries.push(entry),
            Err(e) => skipped.push((n + 1, e.to_string())),
        }
    }

    let content = String::from_utf8_lossy(&bytes);
    if !header_seen && index.entries.is_empty() && codec::looks_like_legacy(&content) {
        return Ok(match codec::parse_legacy(&content) {
            Ok(legacy) => {
                info!(
                    path = %path.display(),
                    entries = legacy.entries.len(),
                    "read legacy JSON index"
                );
                legacy
            }
            Err(e) => {
                warn!(path = %path.display(), "legacy index unparsable, treating as empty: {e}");
                MemoryIndex::empty()
            }
        });
    }

    for (line, e) in skipped {
        warn!(path = %path.display(), line, "skipping malformed index line: {e}");
    }

    Ok(index)
}

/// Overwrite `path` with a header line and one line per entry.
///
/// Stamps `last_updated`, defaults an empty `version`, and rewrites legacy array
/// embeddings in the compact encoding.
pub fn save_index(path: &Path, index: &mut MemoryIndex) -> Result<()> {
    ensure_parent_dir(path)?;

    index.last_updated = Some(codec::now_iso());
    if index.version.is_empty() {
        index.version = CURRENT_FORMAT_VERSION.to_string();
    }

    let mut out = codec::serialize_header(&IndexHeader::for_index(index))?;
    out.push('\n');
    for entry in &mut index.entries {
        codec::to_binary(entry);
        out.push_str(&codec::serialize_entry(entry)?);
        out.push('\n');
    }

    // Write to a sibling temp file and rename so a crash never leaves half a file.
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, out)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to replace index file {}", path.display()))?;

    debug!(path = %path.display(), entries = index.entries.len(), "index saved");
    Ok(())
}

/// Append one entry as a new line. A missing or empty file gets a fresh header first;
/// an existing header is left untouched.
pub fn append_entry(path: &Path, entry: MemoryEntry) -> Result<()> {
    let mut entry = codec::ensure_date(entry);
    codec::to_binary(&mut entry);
    let line = codec::serialize_entry(&entry)?;

    ensure_parent_dir(path)?;

    let existing_len = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let mut buf = String::new();
    if existing_len == 0 {
        let mut fresh = MemoryIndex::empty();
        fresh.last_updated = Some(codec::now_iso());
        buf.push_str(&codec::serialize_header(&IndexHeader::for_index(&fresh))?);
        buf.push('\n');
    } else if !ends_with_newline(path)? {
        buf.push('\n');
    }
    buf.push_str(&line);
    buf.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {} for append", path.display()))?;
    file.write_all(buf.as_bytes())
        .with_context(|| format!("failed to append to {}", path.display()))?;

    debug!(path = %path.display(), id = %entry.id, "entry appended");
    Ok(())
}

/// Map a configured path to the file that should actually be used.
///
/// A path ending in `.json` is redirected to its `.jsonl` sibling. If the sibling does not
/// exist yet and the legacy file does, the legacy file is converted once.
pub fn resolve_index_path(configured: &Path) -> Result<PathBuf> {
    if configured.extension().and_then(|e| e.to_str()) != Some(LEGACY_SUFFIX) {
        return Ok(configured.to_path_buf());
    }

    let sibling = configured.with_extension(LINE_SUFFIX);
    if !sibling.exists() && configured.exists() {
        let mut index = load_index(configured)?;
        save_index(&sibling, &mut index).with_context(|| {
            format!("failed to migrate {} to {}", configured.display(), sibling.display())
        })?;
        info!(
            from = %configured.display(),
            to = %sibling.display(),
            entries = index.entries.len(),
            "migrated legacy index to line-oriented format"
        );
    }
    Ok(sibling)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
