use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::StreamTransport;

/// Baud rate the hub REPL listens on.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial line settings applied when a TTY is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtyConfig {
    /// Line speed in baud. Must map onto a termios speed constant.
    pub baud_rate: u32,
}

impl Default for TtyConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Open a serial device read/write and put it in raw mode.
///
/// Paths that are not terminals (regular files, FIFOs) are opened as-is
/// without termios configuration.
pub fn open_tty(path: impl AsRef<Path>, config: TtyConfig) -> Result<File> {
    let path = path.as_ref();
    let speed = baud_to_speed(config.baud_rate)?;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY)
        .open(path)
        .map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let fd = file.as_raw_fd();
    // SAFETY: `fd` is an open descriptor owned by `file` for the duration of this call.
    if unsafe { libc::isatty(fd) } == 0 {
        debug!(?path, "not a terminal; skipping line configuration");
        return Ok(file);
    }

    configure_raw(fd, speed).map_err(|source| TransportError::Configure {
        path: path.to_path_buf(),
        source,
    })?;

    info!(?path, baud = config.baud_rate, "serial line configured");
    Ok(file)
}

/// Build a reopenable transport for a serial device.
pub fn tty_transport(path: impl Into<PathBuf>, config: TtyConfig) -> StreamTransport<File> {
    let path = path.into();
    let name = path.display().to_string();
    StreamTransport::new(name, move || open_tty(&path, config))
}

fn configure_raw(fd: libc::c_int, speed: libc::speed_t) -> std::io::Result<()> {
    // SAFETY: a zeroed termios is a valid out-parameter for tcgetattr.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open terminal descriptor and `tio` is a valid, writable termios.
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }

    // SAFETY: `tio` was initialized by tcgetattr above.
    unsafe {
        libc::cfmakeraw(&mut tio);
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    // Block until at least one byte is available; no inter-byte timer.
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;

    // SAFETY: `fd` is an open terminal descriptor and `tio` is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn baud_to_speed(baud: u32) -> Result<libc::speed_t> {
    let speed = match baud {
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(speed)
}
