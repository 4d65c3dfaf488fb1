use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use localkb_core::traits::BuildReporter;
use localkb_core::types::Chunk;

/// Progress bar over the encoding stage.
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl BuildReporter for ProgressReporter {
    fn chunks_collected(&self, chunks: &[Chunk]) -> Result<()> {
        self.bar.set_length(chunks.len() as u64);
        self.bar.set_message("encoding");
        Ok(())
    }

    fn batch_encoded(&self, done: usize, _total: usize) -> Result<()> {
        self.bar.set_position(done as u64);
        Ok(())
    }

    fn artifact_written(&self, label: &str, path: &Path) -> Result<()> {
        self.bar.set_message(format!("wrote {label}"));
        tracing::debug!(path = %path.display(), "{label} written");
        Ok(())
    }
}
