//! Input files: named byte buffers handed to the runner.
//!
//! The runner never touches the filesystem itself — inputs arrive as
//! in-memory `(name, bytes)` pairs, pre-validated by the caller (count,
//! size, and type constraints are the host's responsibility). The
//! [`InputFile::from_path`] convenience loader exists for the CLI and for
//! tests; library callers feeding data from a network stream or a
//! database construct [`InputFile`]s directly.

use std::path::Path;
use std::sync::Arc;

/// One input file: a display/base name plus its raw bytes.
///
/// Cheap to share: the runner stores `Arc<InputFile>` so dispatching a
/// file to a processor never copies the payload.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Base filename (no directory components), used to derive output names.
    pub name: String,
    /// Raw file contents.
    pub data: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Read a file from disk, using its final path component as the name.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        Ok(Self { name, data })
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Wrap in an `Arc` for sharing with processor futures.
    pub fn into_shared(self) -> Arc<InputFile> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keeps_name_and_data() {
        let f = InputFile::new("photo.png", vec![1, 2, 3]);
        assert_eq!(f.name, "photo.png");
        assert_eq!(f.len(), 3);
        assert!(!f.is_empty());
    }

    #[tokio::test]
    async fn from_path_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.bin");
        std::fs::write(&path, b"abc").unwrap();

        let f = InputFile::from_path(&path).await.unwrap();
        assert_eq!(f.name, "input.bin");
        assert_eq!(f.data, b"abc");
    }
}
