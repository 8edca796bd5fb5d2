//! Platform sink: the host surface receiving finished artifacts.
//!
//! The original host for this engine hands artifacts to a browser save
//! dialog and shows toast notifications. Neither belongs in the core, so
//! the pair is abstracted as [`PlatformSink`]: `download` delivers one
//! named binary artifact, `notify` surfaces a human-readable message.
//! Injecting the sink keeps the runner free of ambient state and makes
//! headless testing trivial ([`MemorySink`]).

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};

/// Severity of a [`PlatformSink::notify`] message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Success,
    Error,
}

/// Host surface for artifact delivery and user-facing notices.
pub trait PlatformSink: Send + Sync {
    /// Deliver one artifact under `filename`.
    fn download(&self, data: &[u8], filename: &str) -> io::Result<()>;

    /// Surface a message to the user. Default: drop it.
    fn notify(&self, message: &str, kind: NotifyKind) {
        let _ = (message, kind);
    }
}

/// Filesystem sink: saves artifacts into a directory.
///
/// Writes are atomic (temp file in the target directory, then rename) so
/// a crash mid-write never leaves a truncated artifact behind.
pub struct FsSink {
    dir: PathBuf,
}

impl FsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PlatformSink for FsSink {
    fn download(&self, data: &[u8], filename: &str) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let target = self.dir.join(filename);
        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::fs::write(tmp.path(), data)?;
        tmp.persist(&target).map_err(|e| e.error)?;

        info!("saved {} ({} bytes)", target.display(), data.len());
        Ok(())
    }

    fn notify(&self, message: &str, kind: NotifyKind) {
        match kind {
            NotifyKind::Error => warn!("{message}"),
            _ => info!("{message}"),
        }
    }
}

/// In-memory sink for tests: records every download and notice.
#[derive(Default)]
pub struct MemorySink {
    downloads: Mutex<Vec<(String, Vec<u8>)>>,
    notices: Mutex<Vec<(String, NotifyKind)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts delivered so far.
    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }

    /// Filenames delivered, in delivery order.
    pub fn filenames(&self) -> Vec<String> {
        self.downloads
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Payload of the artifact delivered under `filename`, if any.
    pub fn payload(&self, filename: &str) -> Option<Vec<u8>> {
        self.downloads
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, data)| data.clone())
    }

    pub fn notices(&self) -> Vec<(String, NotifyKind)> {
        self.notices.lock().unwrap().clone()
    }
}

impl PlatformSink for MemorySink {
    fn download(&self, data: &[u8], filename: &str) -> io::Result<()> {
        self.downloads
            .lock()
            .unwrap()
            .push((filename.to_string(), data.to_vec()));
        Ok(())
    }

    fn notify(&self, message: &str, kind: NotifyKind) {
        self.notices
            .lock()
            .unwrap()
            .push((message.to_string(), kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        sink.download(b"payload", "artifact.bin").unwrap();

        let written = std::fs::read(dir.path().join("artifact.bin")).unwrap();
        assert_eq!(written, b"payload");
    }

    #[test]
    fn fs_sink_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        let sink = FsSink::new(&nested);
        sink.download(b"x", "f.bin").unwrap();
        assert!(nested.join("f.bin").exists());
    }

    #[test]
    fn memory_sink_records_everything() {
        let sink = MemorySink::new();
        sink.download(b"one", "a.png").unwrap();
        sink.download(b"two", "b.png").unwrap();
        sink.notify("done", NotifyKind::Success);

        assert_eq!(sink.download_count(), 2);
        assert_eq!(sink.filenames(), vec!["a.png", "b.png"]);
        assert_eq!(sink.payload("b.png").unwrap(), b"two");
        assert_eq!(sink.notices().len(), 1);
    }
}
