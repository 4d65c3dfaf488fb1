//! Line-delimited JSON persistence for chunk lists, plus the atomic
//! publish helper every artifact writer goes through.
//!
//! Row order is significant: row *i* of every store belongs to chunk *i*.
//! A missing file reads as empty; a malformed line is a hard error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, instrument};

use crate::error::{KbError, Result};
use crate::types::{Chunk, IndexMeta};

/// Write through a temp file in the destination directory, then rename it
/// over `path`. Readers never observe a half-written file.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> std::io::Result<()>,
{
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| KbError::io(dir, e))?;
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| KbError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        write(&mut writer).map_err(|e| KbError::io(path, e))?;
        writer.flush().map_err(|e| KbError::io(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| KbError::io(path, e))?;
    tmp.persist(path).map_err(|e| KbError::io(path, e.error))?;
    Ok(())
}

pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    write_atomic(path, |w| {
        for row in rows {
            serde_json::to_writer(&mut *w, row)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    })
}

/// Read every non-blank line of `path`. `Ok(None)` when the file is absent.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(KbError::io(path, e)),
    };
    let mut rows = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| KbError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|source| KbError::MalformedRecord {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        rows.push(row);
    }
    Ok(Some(rows))
}

#[instrument(skip(chunks), fields(count = chunks.len()))]
pub fn save_chunks_jsonl(chunks: &[Chunk], path: &Path) -> Result<()> {
    write_jsonl(path, chunks)
}

/// Chunks in stored order; empty when the store does not exist.
pub fn load_chunks_jsonl(path: &Path) -> Result<Vec<Chunk>> {
    let chunks = read_jsonl(path)?.unwrap_or_default();
    debug!(count = chunks.len(), path = %path.display(), "loaded chunk store");
    Ok(chunks)
}

pub fn save_index_meta(meta: &IndexMeta, path: &Path) -> Result<()> {
    write_atomic(path, |w| {
        serde_json::to_writer_pretty(&mut *w, meta)?;
        w.write_all(b"\n")
    })
}

pub fn load_index_meta(path: &Path) -> Result<Option<IndexMeta>> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(KbError::io(path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| KbError::MalformedRecord { path: path.to_path_buf(), line: 1, source })
}
