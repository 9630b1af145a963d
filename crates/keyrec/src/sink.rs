//! Destinations for recorded text.
//!
//! A sink replaces its previous contents on every write.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Persistent destination for a session's final text.
pub trait TextSink: Send {
    /// Human-readable description used in logs and errors.
    fn describe(&self) -> String;

    /// Replace the sink's contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the write fails.
    fn write(&mut self, text: &str) -> std::io::Result<()>;
}

/// Writes UTF-8 text to a file, truncating it first.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    /// Create a sink for the given path. Nothing is touched until `write`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextSink for FileSink {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn write(&mut self, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, text)?;
        debug!(path = %self.path.display(), bytes = text.len(), "Wrote recording");
        Ok(())
    }
}

/// Keeps the most recent write in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    contents: Option<String>,
    writes: usize,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of the last write, or `None` if never written.
    #[must_use]
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    /// Number of writes received.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl TextSink for MemorySink {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn write(&mut self, text: &str) -> std::io::Result<()> {
        self.contents = Some(text.to_string());
        self.writes += 1;
        Ok(())
    }
}
