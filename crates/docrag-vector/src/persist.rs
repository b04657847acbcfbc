//! JSON snapshot of the chunk sequence, written via temp file + rename so a
//! reader never observes a partial store.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use docrag_core::error::{Error, Result};
use docrag_core::types::Chunk;

/// `Ok(None)` when nothing has been persisted at `path` yet.
pub fn load_chunks(path: &Path) -> Result<Option<Vec<Chunk>>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let chunks: Vec<Chunk> = serde_json::from_slice(&data)
        .map_err(|e| Error::Storage(format!("{} is not a valid store: {}", path.display(), e)))?;
    debug!(path = %path.display(), chunks = chunks.len(), "loaded store");
    Ok(Some(chunks))
}

pub fn save_chunks(path: &Path, chunks: &[Chunk]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, chunks)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    debug!(path = %path.display(), chunks = chunks.len(), "saved store");
    Ok(())
}

/// Remove the persisted store; a missing file is not an error.
pub fn remove_store(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
