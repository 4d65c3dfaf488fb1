//! On-disk layout of a knowledge base inside a project.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{KbError, Result};

/// All artifact locations, derived from a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbPaths {
    project_root: PathBuf,
}

impl KbPaths {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self { project_root: project_root.into() }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.project_root.join(".localkb")
    }

    pub fn kb_root(&self) -> PathBuf {
        self.state_dir().join("kb")
    }

    /// Ingestion root; its top-level directories become namespaces.
    pub fn kb_raw(&self) -> PathBuf {
        self.kb_root().join("raw")
    }

    pub fn chunks_jsonl(&self) -> PathBuf {
        self.kb_root().join("chunks.jsonl")
    }

    pub fn vector_index(&self) -> PathBuf {
        self.kb_root().join("index.flat")
    }

    pub fn index_meta(&self) -> PathBuf {
        self.kb_root().join("index_meta.json")
    }

    pub fn bm25_corpus_jsonl(&self) -> PathBuf {
        self.kb_root().join("bm25_corpus.jsonl")
    }

    pub fn context_dir(&self) -> PathBuf {
        self.state_dir().join("context")
    }

    pub fn knowledge_pack_md(&self) -> PathBuf {
        self.context_dir().join("knowledge-pack.md")
    }

    pub fn trace_json(&self) -> PathBuf {
        self.context_dir().join("trace.json")
    }

    /// Create `kb/raw/` and `context/` if they do not exist yet.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.kb_raw(), self.context_dir()] {
            fs::create_dir_all(&dir).map_err(|e| KbError::io(&dir, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_in_state_dir() {
        let paths = KbPaths::new("/work/proj");
        assert_eq!(paths.kb_raw(), PathBuf::from("/work/proj/.localkb/kb/raw"));
        assert_eq!(paths.vector_index(), PathBuf::from("/work/proj/.localkb/kb/index.flat"));
        assert_eq!(paths.trace_json(), PathBuf::from("/work/proj/.localkb/context/trace.json"));
    }

    #[test]
    fn ensure_dirs_creates_raw_and_context() {
        let tmp = tempfile::TempDir::new().expect("tmp");
        let paths = KbPaths::new(tmp.path());
        paths.ensure_dirs().expect("dirs");
        assert!(paths.kb_raw().is_dir());
        assert!(paths.context_dir().is_dir());
    }
}
