use std::ffi::CString;
use std::os::fd::RawFd;
use std::ptr::NonNull;

use tracing::{debug, info};

use crate::error::{Result, ShmError};

/// A fixed-size byte region mapped into this process's address space.
///
/// Backed either by a POSIX named shared-memory object (the cross-process
/// production path) or by an anonymous mapping (process-private, used to
/// exercise the consistency protocol across threads in tests).
pub struct MemoryRegion {
    ptr: NonNull<u8>,
    len: usize,
    backing: Backing,
}

enum Backing {
    Shm {
        fd: RawFd,
        name: CString,
        /// The creator unlinks the object on drop; openers only unmap.
        owner: bool,
    },
    Anonymous,
}

// SAFETY: the region is plain shared memory. All cross-thread (and
// cross-process) mutation goes through the atomic control words and the
// write/read protocol in `transport`; the struct itself holds no thread-bound
// state.
unsafe impl Send for MemoryRegion {}
unsafe impl Sync for MemoryRegion {}

impl MemoryRegion {
    /// Create a fresh named region, replacing any stale object of the same
    /// name (unlink-then-create). The mapping is zero-filled by the kernel.
    pub fn create(name: &str, len: usize) -> Result<Self> {
        let c_name = region_name(name)?;

        // Drop any leftover object from a previous run so both sides start
        // from a zeroed region.
        // SAFETY: c_name is a valid NUL-terminated string.
        unsafe {
            libc::shm_unlink(c_name.as_ptr());
        }

        // SAFETY: c_name is valid; flags request creation of a new object.
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600,
            )
        };
        if fd < 0 {
            return Err(ShmError::Create {
                name: name.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }

        // SAFETY: fd is an open shared-memory descriptor owned here.
        if unsafe { libc::ftruncate(fd, len as libc::off_t) } != 0 {
            let source = std::io::Error::last_os_error();
            // SAFETY: fd/name are valid; best-effort cleanup on the error path.
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(ShmError::Resize {
                name: name.to_string(),
                source,
            });
        }

        let ptr = map_fd(fd, len).inspect_err(|_| {
            // SAFETY: fd/name are valid; best-effort cleanup on the error path.
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
        })?;

        info!(name, len, "created shared region");
        Ok(Self {
            ptr,
            len,
            backing: Backing::Shm {
                fd,
                name: c_name,
                owner: true,
            },
        })
    }

    /// Map an existing named region created by the backend.
    pub fn open(name: &str, len: usize) -> Result<Self> {
        let c_name = region_name(name)?;

        // SAFETY: c_name is a valid NUL-terminated string.
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            return Err(ShmError::Open {
                name: name.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }

        let ptr = map_fd(fd, len).inspect_err(|_| {
            // SAFETY: fd is valid; best-effort cleanup on the error path.
            unsafe {
                libc::close(fd);
            }
        })?;

        info!(name, len, "opened shared region");
        Ok(Self {
            ptr,
            len,
            backing: Backing::Shm {
                fd,
                name: c_name,
                owner: false,
            },
        })
    }

    /// Map an anonymous region, visible only within this process.
    pub fn anonymous(len: usize) -> Result<Self> {
        // SAFETY: requests a fresh zero-filled mapping from the kernel.
        let raw = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(ShmError::Map(std::io::Error::last_os_error()));
        }
        let ptr = NonNull::new(raw.cast())
            .ok_or_else(|| ShmError::Map(std::io::Error::other("mmap returned null")))?;
        debug!(len, "mapped anonymous region");
        Ok(Self {
            ptr,
            len,
            backing: Backing::Anonymous,
        })
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for MemoryRegion {
    fn drop(&mut self) {
        // SAFETY: ptr/len describe the mapping established in the constructor.
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), self.len);
        }
        if let Backing::Shm { fd, name, owner } = &self.backing {
            // SAFETY: fd is the descriptor opened in the constructor; name is
            // a valid NUL-terminated string.
            unsafe {
                libc::close(*fd);
                if *owner {
                    libc::shm_unlink(name.as_ptr());
                }
            }
        }
    }
}

fn map_fd(fd: RawFd, len: usize) -> Result<NonNull<u8>> {
    // SAFETY: fd is an open descriptor sized to at least len.
    let raw = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            0,
        )
    };
    if raw == libc::MAP_FAILED {
        return Err(ShmError::Map(std::io::Error::last_os_error()));
    }
    NonNull::new(raw.cast()).ok_or_else(|| ShmError::Map(std::io::Error::other("mmap returned null")))
}

/// POSIX shared-memory names must be a single path component starting
/// with '/'.
fn region_name(name: &str) -> Result<CString> {
    if !name.starts_with('/') || name.len() < 2 || name[1..].contains('/') {
        return Err(ShmError::InvalidName(name.to_string()));
    }
    CString::new(name).map_err(|_| ShmError::InvalidName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!(
            "/framelink-test-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        )
    }

    #[test]
    fn create_open_share_bytes() {
        let name = unique_name("share");
        let writer = MemoryRegion::create(&name, 4096).unwrap();
        let reader = MemoryRegion::open(&name, 4096).unwrap();

        // SAFETY: both mappings cover the same 4096-byte object.
        unsafe {
            writer.as_ptr().write(0x5A);
            assert_eq!(reader.as_ptr().read(), 0x5A);
        }
    }

    #[test]
    fn open_missing_region_fails() {
        let name = unique_name("missing");
        assert!(matches!(
            MemoryRegion::open(&name, 4096),
            Err(ShmError::Open { .. })
        ));
    }

    #[test]
    fn creator_unlinks_on_drop() {
        let name = unique_name("unlink");
        let region = MemoryRegion::create(&name, 4096).unwrap();
        drop(region);

        assert!(matches!(
            MemoryRegion::open(&name, 4096),
            Err(ShmError::Open { .. })
        ));
    }

    #[test]
    fn create_replaces_stale_region() {
        let name = unique_name("stale");
        let first = MemoryRegion::create(&name, 4096).unwrap();
        // Simulate a crashed backend: mapping still alive, object re-created.
        let second = MemoryRegion::create(&name, 4096).unwrap();
        drop(first);
        drop(second);
    }

    #[test]
    fn invalid_names_rejected() {
        assert!(matches!(
            MemoryRegion::create("no-slash", 64),
            Err(ShmError::InvalidName(_))
        ));
        assert!(matches!(
            MemoryRegion::create("/two/components", 64),
            Err(ShmError::InvalidName(_))
        ));
    }

    #[test]
    fn anonymous_region_is_zeroed() {
        let region = MemoryRegion::anonymous(8192).unwrap();
        assert_eq!(region.len(), 8192);
        // SAFETY: freshly mapped region of 8192 bytes.
        let bytes = unsafe { std::slice::from_raw_parts(region.as_ptr(), region.len()) };
        assert!(bytes.iter().all(|&b| b == 0));
    }
}
