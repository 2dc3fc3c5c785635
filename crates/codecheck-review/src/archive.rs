//! Reading uploaded zip archives entry by entry.

use std::io::{Cursor, Read};

use codecheck_core::{CodecheckError, EntryKind};

/// One entry of an uploaded archive, in central directory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, as stored.
    pub name: String,
    /// Classification by name suffix. Directories are always skipped.
    pub kind: EntryKind,
    /// Uncompressed bytes; empty for skipped entries.
    pub contents: Vec<u8>,
}

/// List the entries of a zip archive held in memory.
///
/// Only `.py` and `.txt` entries are decompressed.
///
/// # Errors
///
/// Returns [`CodecheckError::Archive`] if `bytes` is not a readable zip
/// archive or an entry cannot be decompressed.
pub fn walk_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, CodecheckError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| CodecheckError::Archive(format!("failed to open archive: {e}")))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| CodecheckError::Archive(format!("failed to read entry {index}: {e}")))?;
        let name = file.name().to_string();
        let kind = if file.is_dir() {
            EntryKind::Skipped
        } else {
            EntryKind::from_name(&name)
        };

        let mut contents = Vec::new();
        if kind != EntryKind::Skipped {
            file.read_to_end(&mut contents)
                .map_err(|e| CodecheckError::Archive(format!("failed to extract {name}: {e}")))?;
        }
        entries.push(ArchiveEntry {
            name,
            kind,
            contents,
        });
    }
    Ok(entries)
}
