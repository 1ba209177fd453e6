use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// Unix domain socket transport.
///
/// The host side of the control channel binds and accepts; the plugin side
/// connects with a bounded wait. Filesystem socket paths are cleaned up via
/// `Drop` on the listening side.
pub struct UnixDomainSocket {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
    /// Whether the path should be removed on drop.
    cleanup_on_drop: bool,
}

impl UnixDomainSocket {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Maximum socket path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on a filesystem-path Unix domain socket.
    ///
    /// The socket file is created at `path`. If the file already exists and is
    /// a socket, it is removed first (stale socket cleanup).
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    /// Bind and listen on a filesystem-path Unix domain socket with explicit mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        Self::validate_path_len(&path)?;

        // Remove stale socket if it exists, but never remove non-socket files.
        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(|e| TransportError::Bind {
                    path: path.clone(),
                    source: e,
                })?;
            } else {
                return Err(TransportError::Bind {
                    path: path.clone(),
                    source: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
        }

        let listener = UnixListener::bind(&path).map_err(|e| TransportError::Bind {
            path: path.clone(),
            source: e,
        })?;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
            TransportError::Bind {
                path: path.clone(),
                source: e,
            }
        })?;
        let created_metadata =
            std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
        let created_inode = Some((created_metadata.dev(), created_metadata.ino()));

        info!(?path, "listening on control channel socket");

        Ok(Self {
            listener,
            path,
            created_inode,
            cleanup_on_drop: true,
        })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<IpcStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!("accepted control channel connection");
        Ok(IpcStream::from_unix(stream))
    }

    /// Connect to a listening Unix domain socket (blocking, unbounded).
    pub fn connect(path: impl AsRef<Path>) -> Result<IpcStream> {
        let path = path.as_ref();
        let stream =
            std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Connect {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(?path, "connected to control channel socket");
        Ok(IpcStream::from_unix(stream))
    }

    /// Connect with a bounded wait.
    ///
    /// Uses a non-blocking connect and polls for writability until `timeout`
    /// elapses, so a missing or wedged host degrades to
    /// [`TransportError::ConnectTimeout`] instead of blocking the caller.
    pub fn connect_timeout(path: impl AsRef<Path>, timeout: Duration) -> Result<IpcStream> {
        let path = path.as_ref();
        Self::validate_path_len(path)?;

        let stream = connect_nonblocking(path, timeout)?;
        stream.set_nonblocking(false).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, ?timeout, "connected to control channel socket");
        Ok(IpcStream::from_unix(stream))
    }

    fn validate_path_len(path: &Path) -> Result<()> {
        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path: path.to_path_buf(),
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }
        Ok(())
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "unix-domain-socket"
    }
}

fn connect_err(path: &Path, source: io::Error) -> TransportError {
    TransportError::Connect {
        path: path.to_path_buf(),
        source,
    }
}

/// Non-blocking connect with a poll-based deadline.
fn connect_nonblocking(path: &Path, timeout: Duration) -> Result<std::os::unix::net::UnixStream> {
    let deadline = Instant::now() + timeout;

    // SAFETY: plain socket(2) call; the raw fd is immediately wrapped in an
    // OwnedFd so it is closed on every error path below.
    let raw = unsafe { libc::socket(libc::AF_UNIX, libc::SOCK_STREAM, 0) };
    if raw < 0 {
        return Err(connect_err(path, io::Error::last_os_error()));
    }
    // SAFETY: `raw` is a freshly created, valid socket descriptor owned here.
    let fd = unsafe { OwnedFd::from_raw_fd(raw) };

    set_nonblocking_flag(&fd).map_err(|e| connect_err(path, e))?;

    // SAFETY: zeroed sockaddr_un is a valid all-default value for AF_UNIX.
    let mut addr: libc::sockaddr_un = unsafe { std::mem::zeroed() };
    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;
    let bytes = path.as_os_str().as_bytes();
    // Length was validated by the caller; keep a hard stop regardless.
    if bytes.len() >= addr.sun_path.len() {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len: bytes.len(),
            max: addr.sun_path.len(),
        });
    }
    for (dst, src) in addr.sun_path.iter_mut().zip(bytes) {
        *dst = *src as libc::c_char;
    }

    let addr_len = {
        let base = &addr as *const libc::sockaddr_un as usize;
        let sun_path = addr.sun_path.as_ptr() as usize;
        (sun_path - base + bytes.len() + 1) as libc::socklen_t
    };

    // SAFETY: `addr` is a properly initialized sockaddr_un and `addr_len`
    // covers sun_family plus the NUL-terminated path.
    let rc = unsafe {
        libc::connect(
            fd.as_raw_fd(),
            (&addr as *const libc::sockaddr_un).cast::<libc::sockaddr>(),
            addr_len,
        )
    };

    if rc != 0 {
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EINPROGRESS) | Some(libc::EAGAIN) => {
                wait_writable(&fd, path, deadline)?;
            }
            _ => return Err(connect_err(path, err)),
        }
    }

    Ok(std::os::unix::net::UnixStream::from(fd))
}

fn set_nonblocking_flag(fd: &OwnedFd) -> io::Result<()> {
    // SAFETY: fcntl on an owned, valid descriptor.
    let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: same descriptor, flags derived from F_GETFL above.
    let rc = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Poll the pending connect for writability until the deadline, then check
/// SO_ERROR for the final connect result.
fn wait_writable(fd: &OwnedFd, path: &Path, deadline: Instant) -> Result<()> {
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::ConnectTimeout {
                path: path.to_path_buf(),
                timeout: Duration::ZERO,
            });
        }
        let millis = remaining.as_millis().min(i32::MAX as u128) as i32;

        let mut pfd = libc::pollfd {
            fd: fd.as_raw_fd(),
            events: libc::POLLOUT,
            revents: 0,
        };
        // SAFETY: `pfd` is a valid pollfd for a descriptor owned by this call.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis.max(1)) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(connect_err(path, err));
        }
        if rc == 0 {
            return Err(TransportError::ConnectTimeout {
                path: path.to_path_buf(),
                timeout: deadline.saturating_duration_since(Instant::now()),
            });
        }
        break;
    }

    let mut so_error: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    // SAFETY: `so_error` and `len` are valid writable pointers for the
    // provided sizes, and the descriptor is an open socket.
    let rc = unsafe {
        libc::getsockopt(
            fd.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            (&mut so_error as *mut libc::c_int).cast::<libc::c_void>(),
            &mut len,
        )
    };
    if rc != 0 {
        return Err(connect_err(path, io::Error::last_os_error()));
    }
    if so_error != 0 {
        return Err(connect_err(path, io::Error::from_raw_os_error(so_error)));
    }
    Ok(())
}

impl Drop for UnixDomainSocket {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            if let Some((expected_dev, expected_ino)) = self.created_inode {
                if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
                    if metadata.file_type().is_socket()
                        && metadata.dev() == expected_dev
                        && metadata.ino() == expected_ino
                    {
                        debug!(path = ?self.path, "cleaning up socket file");
                        let _ = std::fs::remove_file(&self.path);
                    } else {
                        debug!(
                            path = ?self.path,
                            "socket path identity changed; skipping cleanup"
                        );
                    }
                }
            }
        }
    }
}
