//! Fixture trees and fake backends

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use unpacker::{ArchiveEntry, ArchiveReader, DiskSpace, ExtractError, ProgressSink};

/// Leading bytes of a RAR 4 volume
pub const RAR4_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x00";

/// Write a file that passes the RAR signature check
pub fn write_volume(dir: &Path, name: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let mut content = RAR4_SIGNATURE.to_vec();
    content.extend_from_slice(b"fixture");
    std::fs::write(&path, content).unwrap();
    path
}

/// Write a file with a `.rar` name but no signature
pub fn write_garbage(dir: &Path, name: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, b"partial download").unwrap();
    path
}

/// Reader that treats signed files as archives holding a fixed entry list
///
/// Archives whose first volume file name contains one of `broken` fail to
/// extract. Every extraction is recorded, and can cancel a token on the way.
pub struct FakeReader {
    pub entries: Vec<ArchiveEntry>,
    pub broken: Vec<String>,
    pub extracted: Mutex<Vec<PathBuf>>,
    pub pending_cancel: Mutex<Option<CancellationToken>>,
}

impl FakeReader {
    pub fn new(entries: Vec<ArchiveEntry>) -> Self {
        Self {
            entries,
            broken: Vec::new(),
            extracted: Mutex::new(Vec::new()),
            pending_cancel: Mutex::new(None),
        }
    }

    /// Cancel `token` from inside the next extraction
    pub fn cancel_on_extract(&self, token: CancellationToken) {
        *self.pending_cancel.lock().unwrap() = Some(token);
    }

    pub fn breaking(mut self, name: &str) -> Self {
        self.broken.push(name.to_string());
        self
    }

    pub fn extracted(&self) -> Vec<PathBuf> {
        self.extracted.lock().unwrap().clone()
    }
}

impl ArchiveReader for FakeReader {
    fn is_valid_container(&self, path: &Path) -> bool {
        std::fs::read(path)
            .map(|bytes| bytes.starts_with(RAR4_SIGNATURE))
            .unwrap_or(false)
    }

    fn list_entries(&self, _path: &Path) -> unpacker::Result<Vec<ArchiveEntry>> {
        Ok(self.entries.clone())
    }

    fn extract_all(
        &self,
        path: &Path,
        dest: &Path,
        progress: &mut dyn ProgressSink,
    ) -> unpacker::Result<Vec<PathBuf>> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if self.broken.iter().any(|b| name.contains(b.as_str())) {
            return Err(ExtractError::ExtractionFailed {
                archive: path.to_path_buf(),
                reason: "CRC mismatch".to_string(),
            }
            .into());
        }

        self.extracted.lock().unwrap().push(path.to_path_buf());
        if let Some(token) = self.pending_cancel.lock().unwrap().take() {
            token.cancel();
        }
        std::fs::create_dir_all(dest)?;
        let mut files = Vec::new();
        for entry in &self.entries {
            let file = dest.join(&entry.name);
            std::fs::write(&file, b"")?;
            files.push(file);
            progress.advance(entry.size);
        }
        files.dedup();
        Ok(files)
    }
}

/// Free-space source with a constant answer
pub struct FixedSpace(pub u64);

impl DiskSpace for FixedSpace {
    fn available_space(&self, _path: &Path) -> std::io::Result<u64> {
        Ok(self.0)
    }
}
