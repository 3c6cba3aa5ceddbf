//! File input accepted by the scan and extraction adapters.

use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use qaudit_core::file_types::extension_of;

/// Evidence content, either on disk or already in memory.
#[derive(Debug, Clone)]
pub enum FileInput {
    Path {
        path: PathBuf,
        display_name: Option<String>,
    },
    Bytes {
        data: Bytes,
        display_name: Option<String>,
    },
}

impl FileInput {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        FileInput::Path {
            path: path.into(),
            display_name: None,
        }
    }

    pub fn from_bytes(data: impl Into<Bytes>, display_name: Option<String>) -> Self {
        FileInput::Bytes {
            data: data.into(),
            display_name,
        }
    }

    /// Override the name used for extension checks and logs.
    pub fn with_display_name(self, name: impl Into<String>) -> Self {
        let name = Some(name.into());
        match self {
            FileInput::Path { path, .. } => FileInput::Path {
                path,
                display_name: name,
            },
            FileInput::Bytes { data, .. } => FileInput::Bytes {
                data,
                display_name: name,
            },
        }
    }

    /// Display name, falling back to the path's file name.
    pub fn display_name(&self) -> Option<&str> {
        match self {
            FileInput::Path { path, display_name } => display_name
                .as_deref()
                .or_else(|| path.file_name().and_then(|n| n.to_str())),
            FileInput::Bytes { display_name, .. } => display_name.as_deref(),
        }
    }

    /// Lower-case extension of the display name.
    pub fn extension(&self) -> Option<String> {
        self.display_name().and_then(extension_of)
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            FileInput::Path { path, .. } => Some(path),
            FileInput::Bytes { .. } => None,
        }
    }

    /// Size in bytes, read from file metadata without loading the content.
    pub async fn size(&self) -> io::Result<u64> {
        match self {
            FileInput::Path { path, .. } => Ok(tokio::fs::metadata(path).await?.len()),
            FileInput::Bytes { data, .. } => Ok(data.len() as u64),
        }
    }

    /// Read the content, reading at most one byte past `max_bytes`.
    ///
    /// Returns `None` when the content is larger than `max_bytes`, which catches
    /// files that grew after their size was checked.
    pub async fn read_limited(&self, max_bytes: u64) -> io::Result<Option<Bytes>> {
        let data = match self {
            FileInput::Path { path, .. } => {
                let file = tokio::fs::File::open(path).await?;
                let mut buf = Vec::new();
                file.take(max_bytes.saturating_add(1))
                    .read_to_end(&mut buf)
                    .await?;
                Bytes::from(buf)
            }
            FileInput::Bytes { data, .. } => data.clone(),
        };
        if data.len() as u64 > max_bytes {
            return Ok(None);
        }
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_override() {
        let input = FileInput::from_path("/tmp/uploads/abc123").with_display_name("Invoice.PDF");
        assert_eq!(input.display_name(), Some("Invoice.PDF"));
        assert_eq!(input.extension(), Some("pdf".to_string()));
    }

    #[test]
    fn display_name_falls_back_to_path() {
        let input = FileInput::from_path("/tmp/uploads/scan.png");
        assert_eq!(input.display_name(), Some("scan.png"));
        assert_eq!(input.extension(), Some("png".to_string()));
    }

    #[tokio::test]
    async fn bytes_input_size_and_read() {
        let input = FileInput::from_bytes(b"hello".to_vec(), None);
        assert_eq!(input.size().await.unwrap(), 5);
        assert_eq!(&input.read_limited(5).await.unwrap().unwrap()[..], b"hello");
        assert!(input.read_limited(4).await.unwrap().is_none());
        assert_eq!(input.extension(), None);
    }

    #[tokio::test]
    async fn read_stops_past_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growing.log");
        std::fs::write(&path, b"0123456789").unwrap();
        let input = FileInput::from_path(&path);

        // Size checked while the file was small, then it grew.
        assert_eq!(input.size().await.unwrap(), 10);
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();

        assert!(input.read_limited(10).await.unwrap().is_none());
        let all = input.read_limited(4096).await.unwrap().unwrap();
        assert_eq!(all.len(), 4096);
    }

    #[tokio::test]
    async fn missing_path_is_io_error() {
        let input = FileInput::from_path("/definitely/not/here.bin");
        assert!(input.size().await.is_err());
    }
}
