use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ChannelError, Result};

/// A nonblocking Unix domain socket listener with stale-socket cleanup.
///
/// Binding removes a leftover socket file from a crashed run but refuses to
/// remove anything that is not a socket. The file is removed again on drop,
/// but only if it is still the inode this listener created.
pub struct ChannelListener {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl ChannelListener {
    /// Permission mode for created socket paths.
    pub const SOCKET_MODE: u32 = 0o600;

    /// `sockaddr_un.sun_path` limit.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen, nonblocking.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(ChannelError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        if path.exists() {
            let metadata = std::fs::symlink_metadata(&path).map_err(|e| ChannelError::Bind {
                path: path.clone(),
                source: e,
            })?;
            if metadata.file_type().is_socket() {
                debug!(?path, "removing stale socket");
                std::fs::remove_file(&path).map_err(|e| ChannelError::Bind {
                    path: path.clone(),
                    source: e,
                })?;
            } else {
                return Err(ChannelError::Bind {
                    path: path.clone(),
                    source: std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                });
            }
        }

        let listener = UnixListener::bind(&path).map_err(|e| ChannelError::Bind {
            path: path.clone(),
            source: e,
        })?;
        listener.set_nonblocking(true).map_err(|e| ChannelError::Bind {
            path: path.clone(),
            source: e,
        })?;

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(Self::SOCKET_MODE))
            .map_err(|e| ChannelError::Bind {
                path: path.clone(),
                source: e,
            })?;
        let created_metadata =
            std::fs::symlink_metadata(&path).map_err(|e| ChannelError::Bind {
                path: path.clone(),
                source: e,
            })?;
        let created_inode = Some((created_metadata.dev(), created_metadata.ino()));

        info!(?path, "listening on channel socket");
        Ok(Self {
            listener,
            path,
            created_inode,
        })
    }

    /// Accept one pending connection, if any. The accepted stream is left in
    /// blocking mode; callers wrap it in a [`FrameStream`] which switches it.
    ///
    /// [`FrameStream`]: crate::framing::FrameStream
    pub fn try_accept(&self) -> Result<Option<UnixStream>> {
        match self.listener.accept() {
            Ok((stream, _addr)) => {
                debug!(path = ?self.path, "accepted channel connection");
                Ok(Some(stream))
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(ChannelError::Io(err)),
        }
    }

    /// Connect to a listening channel socket.
    pub fn connect(path: impl AsRef<Path>) -> Result<UnixStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| ChannelError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to channel socket");
        Ok(stream)
    }

    /// The path this listener is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ChannelListener {
    fn drop(&mut self) {
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
