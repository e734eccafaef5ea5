//! Reading source files into memory
//!
//! A [`SourceFile`] is an opened handle to a file on disk together with its
//! name and declared size. [`read_file_bytes`] reads it completely into an
//! owned buffer; any failure is returned as a [`FileReadError`].

use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::LoaderConfig;
use crate::error::FileReadError;
use crate::format::bytes_to_mb;

/// A file selected as transcoding input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl SourceFile {
    /// Open `path` and record its name and size
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, FileReadError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|source| FileReadError::Open {
                path: path.display().to_string(),
                source,
            })?;

        if !metadata.is_file() {
            return Err(FileReadError::Open {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Declared size formatted in megabytes
    pub fn size_mb(&self) -> String {
        bytes_to_mb(self.size)
    }
}

/// Read the whole of `file` into memory.
///
/// The returned buffer is exactly as long as the file's declared size; a
/// file that grows or shrinks between opening and reading is reported as
/// [`FileReadError::SizeMismatch`].
pub async fn read_file_bytes(file: &SourceFile) -> Result<Bytes, FileReadError> {
    let handle = tokio::fs::File::open(&file.path)
        .await
        .map_err(|source| FileReadError::Open {
            path: file.path.display().to_string(),
            source,
        })?;

    let bytes = read_to_bytes(handle, &file.name, file.size).await?;
    tracing::debug!("Read {} ({} MB)", file.name, bytes_to_mb(bytes.len() as u64));
    Ok(bytes)
}

/// Like [`read_file_bytes`], refusing files above the configured limit
pub async fn read_file_bytes_limited(
    file: &SourceFile,
    config: &LoaderConfig,
) -> Result<Bytes, FileReadError> {
    if let Some(limit) = config.max_file_size_bytes() {
        if file.size > limit {
            return Err(FileReadError::TooLarge {
                name: file.name.clone(),
                size: file.size,
                limit,
            });
        }
    }
    read_file_bytes(file).await
}

/// Read `reader` to the end, expecting exactly `expected_len` bytes.
///
/// At most one byte past `expected_len` is read, so a source that is longer
/// than declared is rejected without buffering the rest of it. The
/// `actual` length reported for such a source is `expected_len + 1`.
pub async fn read_to_bytes<R>(
    reader: R,
    name: &str,
    expected_len: u64,
) -> Result<Bytes, FileReadError>
where
    R: AsyncRead + Unpin,
{
    let read_error = |source: io::Error| FileReadError::Read {
        name: name.to_string(),
        source,
    };

    let mut buffer = Vec::new();
    usize::try_from(expected_len)
        .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))
        .and_then(|len| {
            buffer
                .try_reserve_exact(len)
                .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))
        })
        .map_err(read_error)?;

    reader
        .take(expected_len.saturating_add(1))
        .read_to_end(&mut buffer)
        .await
        .map_err(read_error)?;

    let actual = buffer.len() as u64;
    if actual != expected_len {
        return Err(FileReadError::SizeMismatch {
            name: name.to_string(),
            expected: expected_len,
            actual,
        });
    }

    Ok(Bytes::from(buffer))
}
