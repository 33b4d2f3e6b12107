//! Filesystem helpers: free space queries and path resolution

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Source of free-space measurements for a destination directory
///
/// Extraction asks this immediately before each archive set so the space
/// buffer is judged against the current state of the disk.
pub trait DiskSpace: Send + Sync {
    /// Bytes available to unprivileged writers on the filesystem holding `path`
    fn available_space(&self, path: &Path) -> std::io::Result<u64>;
}

/// [`DiskSpace`] backed by the operating system
///
/// The destination may not exist yet (it is created right before extraction),
/// so the query goes to its nearest existing ancestor.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsDiskSpace;

impl DiskSpace for FsDiskSpace {
    fn available_space(&self, path: &Path) -> std::io::Result<u64> {
        let existing = nearest_existing_ancestor(path).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no existing ancestor for {}", path.display()),
            )
        })?;
        get_available_space(existing)
    }
}

/// Walk up from `path` to the first component that exists on disk
pub fn nearest_existing_ancestor(path: &Path) -> Option<&Path> {
    path.ancestors().find(|candidate| {
        !candidate.as_os_str().is_empty() && candidate.exists()
    })
}

/// Resolve `path` to an absolute, canonical directory path
///
/// Fails with [`Error::InvalidPath`] when the path is missing or not a directory.
pub fn resolve_directory(path: &Path) -> Result<PathBuf> {
    let resolved = std::fs::canonicalize(path).map_err(|e| Error::InvalidPath {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !resolved.is_dir() {
        return Err(Error::InvalidPath {
            path: path.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(resolved)
}

/// Free bytes on the filesystem holding `path`, as seen by an unprivileged user
///
/// Fails when `path` does not exist or the platform has no free-space query.
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    platform::available_space(path)
}

/// Whole free blocks times the fragment size, clamped at `u64::MAX`
fn blocks_to_bytes(blocks: u64, fragment_size: u64) -> u64 {
    blocks.saturating_mul(fragment_size)
}

#[cfg(unix)]
mod platform {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    pub(super) fn available_space(path: &Path) -> std::io::Result<u64> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let mut stat = MaybeUninit::<libc::statvfs>::uninit();
        // SAFETY: c_path is NUL-terminated and statvfs writes the whole struct on success
        let stat = unsafe {
            if libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            stat.assume_init()
        };

        // Field widths differ between targets (u32 on some, u64 on others)
        #[allow(clippy::useless_conversion)]
        let (blocks, fragment_size) = (u64::from(stat.f_bavail), u64::from(stat.f_frsize));
        Ok(super::blocks_to_bytes(blocks, fragment_size))
    }
}

#[cfg(windows)]
mod platform {
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use winapi::shared::ntdef::ULARGE_INTEGER;
    use winapi::um::fileapi::GetDiskFreeSpaceExW;

    pub(super) fn available_space(path: &Path) -> std::io::Result<u64> {
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: all-zero is a valid ULARGE_INTEGER
        let mut caller_free: ULARGE_INTEGER = unsafe { std::mem::zeroed() };
        // SAFETY: `wide` is NUL-terminated; null total pointers are allowed
        let ok = unsafe {
            GetDiskFreeSpaceExW(
                wide.as_ptr(),
                &mut caller_free,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(std::io::Error::last_os_error());
        }
        // SAFETY: QuadPart is the whole 64-bit value of the union
        Ok(unsafe { *caller_free.QuadPart() })
    }
}

#[cfg(not(any(unix, windows)))]
mod platform {
    use std::path::Path;

    pub(super) fn available_space(_path: &Path) -> std::io::Result<u64> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "free space query not available on this platform",
        ))
    }
}
