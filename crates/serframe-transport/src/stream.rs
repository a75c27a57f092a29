use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::port::PortConfig;

/// A byte stream carrying frames. Implements `Read` and `Write`.
///
/// Serial devices report a read timeout as `ErrorKind::TimedOut`; a read of
/// zero bytes always means end of stream.
pub struct SerialStream {
    inner: SerialStreamInner,
}

enum SerialStreamInner {
    /// A terminal device configured by this crate.
    #[cfg(unix)]
    Tty {
        file: File,
        timeout: Option<Duration>,
    },
    /// Anything else opened by path: captures, FIFOs, non-terminal devices.
    File(File),
    #[cfg(unix)]
    Socket(std::os::unix::net::UnixStream),
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty { file, timeout } => match file.read(buf)? {
                0 if timeout.is_some() && !buf.is_empty() => {
                    Err(std::io::Error::from(ErrorKind::TimedOut))
                }
                n => Ok(n),
            },
            SerialStreamInner::File(file) => file.read(buf),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => stream.read(buf),
        }
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty { file, .. } => file.write(buf),
            SerialStreamInner::File(file) => file.write(buf),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty { file, .. } => file.flush(),
            SerialStreamInner::File(file) => file.flush(),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => stream.flush(),
        }
    }
}

impl SerialStream {
    /// Open a serial device or file for reading and writing.
    ///
    /// Terminal devices are switched to raw 8N1 at `config.baud_rate`. Other
    /// files are used as-is: reads start at the beginning and writes are
    /// appended. A file that cannot be opened for writing is opened read-only.
    pub fn open(path: impl AsRef<Path>, config: &PortConfig) -> Result<Self> {
        let path = path.as_ref();
        config.validate()?;

        let file = open_file(path).map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        #[cfg(unix)]
        if crate::tty::is_tty(&file) {
            crate::tty::configure(&file, config.baud_rate, config.read_timeout).map_err(
                |source| TransportError::Configure {
                    path: path.to_path_buf(),
                    source,
                },
            )?;
            debug!(?path, baud = config.baud_rate, "opened serial device");
            return Ok(Self {
                inner: SerialStreamInner::Tty {
                    file,
                    timeout: config.read_timeout,
                },
            });
        }

        debug!(?path, "opened non-terminal stream; line settings ignored");
        Ok(Self {
            inner: SerialStreamInner::File(file),
        })
    }

    /// Create a connected pair of in-process streams.
    ///
    /// Bytes written to one end are read from the other.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (a, b) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_socket(a), Self::from_socket(b)))
    }

    #[cfg(unix)]
    fn from_socket(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: SerialStreamInner::Socket(stream),
        }
    }

    /// Set the read timeout. `None` blocks indefinitely.
    ///
    /// Plain files never block and ignore the timeout.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty {
                file,
                timeout: current,
            } => {
                crate::tty::set_timeout(file, timeout)?;
                *current = timeout;
                Ok(())
            }
            SerialStreamInner::File(_) => Ok(()),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => {
                stream.set_read_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let inner = match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty { file, timeout } => SerialStreamInner::Tty {
                file: file.try_clone()?,
                timeout: *timeout,
            },
            SerialStreamInner::File(file) => SerialStreamInner::File(file.try_clone()?),
            #[cfg(unix)]
            SerialStreamInner::Socket(stream) => SerialStreamInner::Socket(stream.try_clone()?),
        };
        Ok(Self { inner })
    }

    /// Returns true if this stream is a configured terminal device.
    pub fn is_tty(&self) -> bool {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty { .. } => true,
            _ => false,
        }
    }
}

fn open_file(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOCTTY);
    }

    match options.open(path) {
        Ok(file) => Ok(file),
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            debug!(?path, "write access denied, opening read-only");
            File::open(path)
        }
        Err(err) => Err(err),
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Tty { .. } => "tty",
            SerialStreamInner::File(_) => "file",
            #[cfg(unix)]
            SerialStreamInner::Socket(_) => "socket",
        };
        f.debug_struct("SerialStream").field("type", &kind).finish()
    }
}
