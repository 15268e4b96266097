//! # Memory-Mapped Array Files
//!
//! Read-only mmap wrapper for the binary persistence format. Mapping the
//! array files instead of reading them means a reload costs three `mmap`
//! calls and the OS page cache is shared between every process holding the
//! same index open.
//!
//! ## Read-Only by Construction
//!
//! A loaded tree is immutable, so unlike a general storage engine there is
//! no grow/remap hazard to manage: the map is created once, never resized,
//! and dropped with the arena that owns it. Concurrent readers need no
//! synchronization.
//!
//! ## Error Handling
//!
//! All fallible operations return `eyre::Result` carrying the file path and
//! the operation that failed.

use std::fs::File;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::Mmap;

use super::FILE_HEADER_SIZE;

/// One immutable array file mapped into the address space.
#[derive(Debug)]
pub struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .wrap_err_with(|| format!("failed to open index file '{}'", path.display()))?;

        let metadata = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?;

        ensure!(
            metadata.len() >= FILE_HEADER_SIZE as u64,
            "index file '{}' is shorter than its {}-byte header ({} bytes)",
            path.display(),
            FILE_HEADER_SIZE,
            metadata.len()
        );

        // SAFETY: Mmap::map is unsafe because the underlying file could be
        // modified externally while mapped. This is safe because:
        // 1. Index files are written once by write_binary and never mutated
        // 2. The mapping is read-only; this process cannot fault on writes
        // 3. The mmap lifetime is tied to MappedFile, preventing use-after-unmap
        // 4. All record access goes through header-validated offsets
        let mmap = unsafe {
            Mmap::map(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self { mmap })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Hints the kernel to fault the whole file in ahead of first use.
    pub fn prefetch(&self) {
        if self.mmap.is_empty() {
            return;
        }

        #[cfg(unix)]
        // SAFETY: madvise with MADV_WILLNEED is a kernel hint. This is safe
        // because:
        // 1. The pointer and length come from the live mapping itself
        // 2. The region stays mapped for the duration of the call (&self)
        // 3. MADV_WILLNEED never alters the mapped contents
        unsafe {
            libc::madvise(
                self.mmap.as_ptr() as *mut libc::c_void,
                self.mmap.len(),
                libc::MADV_WILLNEED,
            );
        }
    }
}
