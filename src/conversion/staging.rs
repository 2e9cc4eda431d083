//! Staging slots
//!
//! A staging slot is a uniquely named file used to hand data to the encoder
//! and read its result back. The file is created with create-new semantics
//! so the slot is exclusively owned, and removed when the slot is dropped.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tracing::{trace, warn};
use uuid::Uuid;

/// Filename prefix for every staging file
const STAGING_PREFIX: &str = "wav2mp3-";

/// An exclusively owned staging file, removed on drop
#[derive(Debug)]
pub struct StagingSlot {
    path: PathBuf,
}

impl StagingSlot {
    /// Create an empty staging file in `dir` with the given extension
    pub async fn create(dir: &Path, extension: &str) -> io::Result<Self> {
        let path = dir.join(format!("{}{}.{}", STAGING_PREFIX, Uuid::new_v4(), extension));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        trace!(path = %path.display(), "staging slot created");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// Removal is a blocking call: drop cannot await, and it must also run when
// the owning future is dropped mid-conversion.
impl Drop for StagingSlot {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => trace!(path = %self.path.display(), "staging slot released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove staging slot"
            ),
        }
    }
}

/// Input and output slots for one conversion
#[derive(Debug)]
pub struct StagingPair {
    pub input: StagingSlot,
    pub output: StagingSlot,
}

impl StagingPair {
    /// Acquire both slots. If the output slot cannot be created the input
    /// slot is released before the error is returned.
    pub async fn acquire(dir: &Path) -> io::Result<Self> {
        let input = StagingSlot::create(dir, "wav").await?;
        let output = StagingSlot::create(dir, "mp3").await?;
        Ok(Self { input, output })
    }
}
