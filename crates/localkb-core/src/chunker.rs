//! Heading-scoped document chunking.
//!
//! Each recognised file is split at Markdown headings (`#` to `######`). A
//! stack of `(depth, title)` tracks the enclosing sections; a new heading pops
//! every entry at the same or deeper depth before being pushed. Section bodies
//! longer than `max_chars` are cut into fixed windows of exactly that many
//! characters with no overlap and no regard for word boundaries.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::config::ChunkingConfig;
use crate::error::{KbError, Result};
use crate::types::{Chunk, DEFAULT_HEADING, DEFAULT_NAMESPACE};

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,6})\s+(.+)$").expect("heading pattern is valid"));

/// Characters of window text that seed a chunk id.
const ID_SEED_CHARS: usize = 200;
/// Hex digits kept from the digest.
const ID_HEX_LEN: usize = 12;

const HEADING_SEPARATOR: &str = " > ";

#[derive(Debug, Default, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Chunk every recognised file under `root`, in sorted traversal order.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn collect_chunks(&self, root: &Path) -> Result<Vec<Chunk>> {
        let files = self.list_files(root)?;
        let mut all_chunks = Vec::new();
        for file_path in &files {
            let namespace = infer_namespace(root, file_path);
            let chunks = self.chunk_file(file_path, &namespace)?;
            debug!(file = %file_path.display(), chunks = chunks.len(), "chunked file");
            all_chunks.extend(chunks);
        }
        info!(files = files.len(), chunks = all_chunks.len(), "collected chunks");
        Ok(all_chunks)
    }

    /// Chunk one file. Invalid UTF-8 sequences are dropped.
    pub fn chunk_file(&self, path: &Path, namespace: &str) -> Result<Vec<Chunk>> {
        let bytes = fs::read(path).map_err(|e| KbError::io(path, e))?;
        Ok(self.chunk_text(&to_posix(path), &decode_dropping_invalid(&bytes), namespace))
    }

    /// Chunk already-loaded text attributed to `source_path`.
    pub fn chunk_text(&self, source_path: &str, text: &str, namespace: &str) -> Vec<Chunk> {
        let raw = text.trim();
        if raw.is_empty() {
            return Vec::new();
        }

        let headings: Vec<_> = HEADING_RE.captures_iter(raw).collect();
        let mut chunks = Vec::new();

        if headings.is_empty() {
            self.push_windows(&mut chunks, source_path, DEFAULT_HEADING, raw, namespace);
            return chunks;
        }

        let mut stack: Vec<(usize, String)> = Vec::new();
        for (i, caps) in headings.iter().enumerate() {
            let (Some(whole), Some(marker), Some(title)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let depth = marker.as_str().len();
            let start = whole.end();
            let end = headings
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(raw.len(), |m| m.start());

            while stack.last().is_some_and(|(d, _)| *d >= depth) {
                stack.pop();
            }
            stack.push((depth, title.as_str().trim().to_string()));

            let body = raw[start..end].trim();
            if body.is_empty() {
                continue;
            }
            let heading_path = heading_path(&stack);
            self.push_windows(&mut chunks, source_path, &heading_path, body, namespace);
        }
        chunks
    }

    fn push_windows(&self, out: &mut Vec<Chunk>, source_path: &str, heading: &str, body: &str, namespace: &str) {
        for window in split_windows(body, self.config.max_chars) {
            let content = window.trim();
            out.push(Chunk {
                chunk_id: chunk_id(source_path, heading, content),
                source_path: source_path.to_string(),
                heading: heading.to_string(),
                content: content.to_string(),
                namespace: namespace.to_string(),
            });
        }
    }

    fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                KbError::io(path, e.into())
            })?;
            if entry.file_type().is_file() && self.is_recognised(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn is_recognised(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            return false;
        };
        let ext = format!(".{}", ext.to_lowercase());
        self.config
            .extensions
            .iter()
            .any(|e| e.to_lowercase() == ext || format!(".{}", e.to_lowercase()) == ext)
    }
}

/// `max_chars`-character windows of `body`; the last one holds the remainder.
pub fn split_windows(body: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (offset, _) in body.char_indices() {
        if count == max_chars {
            windows.push(&body[start..offset]);
            start = offset;
            count = 0;
        }
        count += 1;
    }
    if start < body.len() {
        windows.push(&body[start..]);
    }
    windows
}

/// Short stable digest of source path, heading path and the leading
/// characters of the chunk text.
pub fn chunk_id(source_path: &str, heading: &str, content: &str) -> String {
    let seed: String = content.chars().take(ID_SEED_CHARS).collect();
    let base = format!("{source_path}::{heading}::{seed}");
    let hash = blake3::hash(base.as_bytes());
    hash.to_hex().as_str()[..ID_HEX_LEN].to_string()
}

fn heading_path(stack: &[(usize, String)]) -> String {
    if stack.is_empty() {
        return DEFAULT_HEADING.to_string();
    }
    stack.iter().map(|(_, title)| title.as_str()).collect::<Vec<_>>().join(HEADING_SEPARATOR)
}

/// First directory component under `root`, or the default namespace for
/// files sitting directly in it.
pub fn infer_namespace(root: &Path, file_path: &Path) -> String {
    let Ok(relative) = file_path.strip_prefix(root) else {
        return DEFAULT_NAMESPACE.to_string();
    };
    let parts: Vec<_> = relative.components().filter(|c| matches!(c, Component::Normal(_))).collect();
    match parts.as_slice() {
        [first, _, ..] => first.as_os_str().to_string_lossy().to_string(),
        _ => DEFAULT_NAMESPACE.to_string(),
    }
}

/// Path rendered with `/` separators regardless of platform.
pub fn to_posix(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        let part = match component {
            Component::RootDir => {
                out.push('/');
                continue;
            }
            Component::Prefix(p) => p.as_os_str().to_string_lossy().to_string(),
            Component::CurDir => ".".to_string(),
            Component::ParentDir => "..".to_string(),
            Component::Normal(s) => s.to_string_lossy().to_string(),
        };
        if !out.is_empty() && !out.ends_with('/') {
            out.push('/');
        }
        out.push_str(&part);
    }
    out
}

fn decode_dropping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
