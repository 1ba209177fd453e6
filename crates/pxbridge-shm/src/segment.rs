use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::error::{Result, ShmError};

/// Maximum segment key length. Leaves room for the leading slash and the
/// `.lock` suffix under the POSIX object-name limit.
pub const MAX_KEY_LEN: usize = 200;

/// A named shared-memory segment.
///
/// Created by the producing side (`create`) or mapped by the consuming side
/// (`attach_read_only`). The creator owns the OS objects and unlinks them on
/// drop; an attachment only unmaps. Every bulk copy goes through
/// [`SharedSegment::lock`], which brackets the access with the segment's
/// named semaphore.
pub struct SharedSegment {
    key: String,
    shm_name: CString,
    sem_name: CString,
    ptr: NonNull<u8>,
    len: usize,
    sem: NonNull<libc::sem_t>,
    owner: bool,
    read_only: bool,
}

// SAFETY: the mapping and semaphore are process-wide OS handles; the struct
// owns them exclusively, so moving it to another thread is sound.
unsafe impl Send for SharedSegment {}

impl SharedSegment {
    /// Create a new segment of `len` bytes under `key` and map it writable.
    ///
    /// Fails if an object with the same key already exists.
    pub fn create(key: &str, len: usize) -> Result<Self> {
        let (shm_name, sem_name) = object_names(key)?;
        if len == 0 {
            return Err(ShmError::ZeroSize {
                key: key.to_string(),
            });
        }

        let create_err = |source: io::Error| ShmError::Create {
            key: key.to_string(),
            source,
        };

        // SAFETY: `shm_name` is a valid NUL-terminated string.
        let raw = unsafe {
            libc::shm_open(
                shm_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600 as libc::c_uint,
            )
        };
        if raw < 0 {
            return Err(create_err(io::Error::last_os_error()));
        }
        // SAFETY: freshly opened descriptor, owned here; closed when `fd`
        // goes out of scope (the mapping outlives the descriptor).
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY: sizing an owned, valid shm descriptor.
        if unsafe { libc::ftruncate(fd.as_raw_fd(), len as libc::off_t) } != 0 {
            let source = io::Error::last_os_error();
            unlink_objects(&shm_name, &sem_name);
            return Err(create_err(source));
        }

        let ptr = match map_fd(&fd, len, libc::PROT_READ | libc::PROT_WRITE) {
            Ok(ptr) => ptr,
            Err(source) => {
                unlink_objects(&shm_name, &sem_name);
                return Err(create_err(source));
            }
        };

        // SAFETY: `sem_name` is a valid NUL-terminated string; initial value
        // 1 makes the semaphore an unlocked mutex.
        let sem = unsafe {
            libc::sem_open(
                sem_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                1 as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            let source = io::Error::last_os_error();
            // SAFETY: unmapping the region mapped above.
            unsafe {
                libc::munmap(ptr.as_ptr().cast(), len);
            }
            unlink_objects(&shm_name, &sem_name);
            return Err(create_err(source));
        }

        debug!(key, len, "created shared segment");
        Ok(Self {
            key: key.to_string(),
            shm_name,
            sem_name,
            ptr,
            len,
            // SAFETY: checked against SEM_FAILED above.
            sem: unsafe { NonNull::new_unchecked(sem) },
            owner: true,
            read_only: false,
        })
    }

    /// Attach to an existing segment read-only.
    ///
    /// The mapped length is taken from the object itself, not from the
    /// caller; consumers must check [`SharedSegment::len`] before copying.
    pub fn attach_read_only(key: &str) -> Result<Self> {
        let (shm_name, sem_name) = object_names(key)?;

        let attach_err = |source: io::Error| ShmError::Attach {
            key: key.to_string(),
            source,
        };

        // SAFETY: `shm_name` is a valid NUL-terminated string.
        let raw = unsafe { libc::shm_open(shm_name.as_ptr(), libc::O_RDONLY, 0) };
        if raw < 0 {
            return Err(attach_err(io::Error::last_os_error()));
        }
        // SAFETY: freshly opened descriptor, owned here.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY: zeroed stat buffer is valid for fstat to fill.
        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd.as_raw_fd(), &mut stat) } != 0 {
            return Err(attach_err(io::Error::last_os_error()));
        }
        let len = stat.st_size as usize;
        if len == 0 {
            return Err(ShmError::ZeroSize {
                key: key.to_string(),
            });
        }

        let ptr = map_fd(&fd, len, libc::PROT_READ).map_err(attach_err)?;

        // SAFETY: `sem_name` is a valid NUL-terminated string; opens the
        // existing semaphore created alongside the segment.
        let sem = unsafe { libc::sem_open(sem_name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            let source = io::Error::last_os_error();
            // SAFETY: unmapping the region mapped above.
            unsafe {
                libc::munmap(ptr.as_ptr().cast(), len);
            }
            return Err(attach_err(source));
        }

        debug!(key, len, "attached to shared segment");
        Ok(Self {
            key: key.to_string(),
            shm_name,
            sem_name,
            ptr,
            len,
            // SAFETY: checked against SEM_FAILED above.
            sem: unsafe { NonNull::new_unchecked(sem) },
            owner: false,
            read_only: true,
        })
    }

    /// Acquire the segment lock for one bulk copy.
    ///
    /// The returned guard releases the lock on drop.
    pub fn lock(&mut self) -> Result<SegmentGuard<'_>> {
        loop {
            // SAFETY: `sem` is the open semaphore handle owned by self.
            let rc = unsafe { libc::sem_wait(self.sem.as_ptr()) };
            if rc == 0 {
                return Ok(SegmentGuard { segment: self });
            }
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(ShmError::Lock {
                key: self.key.clone(),
                source: err,
            });
        }
    }

    /// The segment's textual key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Mapped length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping is empty (never true for a live segment).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether this handle created (and will unlink) the OS objects.
    pub fn is_owner(&self) -> bool {
        self.owner
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` describe the mapping created in the
        // constructor; `sem` is the open semaphore handle.
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), self.len);
            libc::sem_close(self.sem.as_ptr());
        }
        if self.owner {
            debug!(key = %self.key, "unlinking shared segment");
            unlink_objects(&self.shm_name, &self.sem_name);
        }
    }
}

impl std::fmt::Debug for SharedSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSegment")
            .field("key", &self.key)
            .field("len", &self.len)
            .field("owner", &self.owner)
            .field("read_only", &self.read_only)
            .finish()
    }
}

/// Lock guard over a shared segment. Exposes the bulk-copy operations and
/// releases the semaphore on drop.
pub struct SegmentGuard<'a> {
    segment: &'a mut SharedSegment,
}

impl SegmentGuard<'_> {
    /// The mapped bytes.
    pub fn bytes(&self) -> &[u8] {
        // SAFETY: the mapping is valid for `len` bytes for the lifetime of
        // the segment, and the semaphore is held for the guard's lifetime.
        unsafe { std::slice::from_raw_parts(self.segment.ptr.as_ptr(), self.segment.len) }
    }

    /// Bulk-copy `data` into the segment.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.segment.read_only {
            return Err(ShmError::ReadOnly {
                key: self.segment.key.clone(),
            });
        }
        if data.len() > self.segment.len {
            return Err(ShmError::CopyOverrun {
                key: self.segment.key.clone(),
                capacity: self.segment.len,
                got: data.len(),
            });
        }
        // SAFETY: destination is a writable mapping of at least `data.len()`
        // bytes (checked above); regions cannot overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.segment.ptr.as_ptr(), data.len());
        }
        Ok(())
    }
}

impl Drop for SegmentGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: releasing the semaphore acquired in `lock`.
        if unsafe { libc::sem_post(self.segment.sem.as_ptr()) } != 0 {
            warn!(
                key = %self.segment.key,
                error = %io::Error::last_os_error(),
                "failed to unlock shared segment"
            );
        }
    }
}

fn object_names(key: &str) -> Result<(CString, CString)> {
    let invalid = |reason: &'static str| ShmError::InvalidKey {
        key: key.to_string(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("key must not be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(invalid("key too long"));
    }
    if !key.bytes().all(|b| b.is_ascii_graphic()) || key.contains('/') {
        return Err(invalid("key must be printable ASCII without '/'"));
    }

    let shm_name = CString::new(format!("/{key}")).map_err(|_| invalid("key contains NUL"))?;
    let sem_name =
        CString::new(format!("/{key}.lock")).map_err(|_| invalid("key contains NUL"))?;
    Ok((shm_name, sem_name))
}

fn map_fd(fd: &OwnedFd, len: usize, prot: libc::c_int) -> io::Result<NonNull<u8>> {
    // SAFETY: mapping an owned, valid descriptor of at least `len` bytes.
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            prot,
            libc::MAP_SHARED,
            fd.as_raw_fd(),
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    NonNull::new(ptr.cast::<u8>()).ok_or_else(|| io::Error::other("mmap returned null"))
}

fn unlink_objects(shm_name: &CString, sem_name: &CString) {
    // SAFETY: both names are valid NUL-terminated strings; failures are
    // ignorable (object already gone).
    unsafe {
        libc::shm_unlink(shm_name.as_ptr());
        libc::sem_unlink(sem_name.as_ptr());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::generate_key;

    #[test]
    fn create_write_attach_read_roundtrip() {
        let key = generate_key();
        let payload: Vec<u8> = (0..64u8).collect();

        let mut seg = SharedSegment::create(&key, payload.len()).unwrap();
        {
            let mut guard = seg.lock().unwrap();
            guard.write(&payload).unwrap();
        }

        let mut reader = SharedSegment::attach_read_only(&key).unwrap();
        assert_eq!(reader.len(), payload.len());
        {
            let guard = reader.lock().unwrap();
            assert_eq!(guard.bytes(), payload.as_slice());
        }

        drop(reader);
        drop(seg);

        // Owner drop unlinked the objects.
        assert!(SharedSegment::attach_read_only(&key).is_err());
    }

    #[test]
    fn create_rejects_duplicate_key() {
        let key = generate_key();
        let _seg = SharedSegment::create(&key, 16).unwrap();
        let dup = SharedSegment::create(&key, 16);
        assert!(matches!(dup, Err(ShmError::Create { .. })));
    }

    #[test]
    fn attach_missing_segment_fails() {
        let result = SharedSegment::attach_read_only("px-test-no-such-segment");
        assert!(matches!(result, Err(ShmError::Attach { .. })));
    }

    #[test]
    fn invalid_keys_rejected() {
        for key in ["", "has/slash", "has space", &"x".repeat(MAX_KEY_LEN + 1)] {
            let result = SharedSegment::create(key, 16);
            assert!(
                matches!(result, Err(ShmError::InvalidKey { .. })),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn zero_size_rejected() {
        let key = generate_key();
        let result = SharedSegment::create(&key, 0);
        assert!(matches!(result, Err(ShmError::ZeroSize { .. })));
    }

    #[test]
    fn write_overrun_rejected() {
        let key = generate_key();
        let mut seg = SharedSegment::create(&key, 8).unwrap();
        let mut guard = seg.lock().unwrap();
        let err = guard.write(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, ShmError::CopyOverrun { .. }));
    }

    #[test]
    fn read_only_attachment_rejects_writes() {
        let key = generate_key();
        let mut seg = SharedSegment::create(&key, 8).unwrap();
        {
            let mut guard = seg.lock().unwrap();
            guard.write(&[1u8; 8]).unwrap();
        }

        let mut reader = SharedSegment::attach_read_only(&key).unwrap();
        let mut guard = reader.lock().unwrap();
        let err = guard.write(&[0u8; 8]).unwrap_err();
        assert!(matches!(err, ShmError::ReadOnly { .. }));
    }
}
