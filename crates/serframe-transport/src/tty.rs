use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::time::Duration;

/// Returns true if `file` refers to a terminal device.
pub(crate) fn is_tty(file: &File) -> bool {
    // SAFETY: `isatty` only inspects the descriptor, which is open for the
    // lifetime of `file`.
    unsafe { libc::isatty(file.as_raw_fd()) == 1 }
}

/// Put the terminal into raw 8N1 mode at `baud_rate` and apply `timeout`.
pub(crate) fn configure(file: &File, baud_rate: u32, timeout: Option<Duration>) -> io::Result<()> {
    let speed = speed_for(baud_rate).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("no termios speed for {baud_rate}"))
    })?;
    let fd = file.as_raw_fd();
    let mut tio = get_attrs(file)?;

    // SAFETY: `tio` is a valid termios value obtained from `tcgetattr`.
    unsafe { libc::cfmakeraw(&mut tio) };
    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !(libc::CSTOPB | libc::PARENB);
    apply_timeout(&mut tio, timeout);

    // SAFETY: `tio` is a valid termios value and `speed` a platform speed constant.
    if unsafe { libc::cfsetispeed(&mut tio, speed) } != 0
        || unsafe { libc::cfsetospeed(&mut tio, speed) } != 0
    {
        return Err(io::Error::last_os_error());
    }

    set_attrs(file, &tio)?;

    // SAFETY: `fd` is an open terminal descriptor owned by `file`.
    if unsafe { libc::tcflush(fd, libc::TCIOFLUSH) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Change only the read timeout of an already configured terminal.
pub(crate) fn set_timeout(file: &File, timeout: Option<Duration>) -> io::Result<()> {
    let mut tio = get_attrs(file)?;
    apply_timeout(&mut tio, timeout);
    set_attrs(file, &tio)
}

// VTIME counts tenths of a second and saturates at 25.5s.
fn apply_timeout(tio: &mut libc::termios, timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => {
            let tenths = timeout.as_millis().div_ceil(100).clamp(1, 255) as libc::cc_t;
            tio.c_cc[libc::VMIN] = 0;
            tio.c_cc[libc::VTIME] = tenths;
        }
        None => {
            tio.c_cc[libc::VMIN] = 1;
            tio.c_cc[libc::VTIME] = 0;
        }
    }
}

fn get_attrs(file: &File) -> io::Result<libc::termios> {
    // SAFETY: an all-zero termios is a valid out-parameter for `tcgetattr`.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    // SAFETY: `tio` is a valid writable termios and the descriptor is open.
    if unsafe { libc::tcgetattr(file.as_raw_fd(), &mut tio) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(tio)
}

fn set_attrs(file: &File, tio: &libc::termios) -> io::Result<()> {
    // SAFETY: `tio` points to a fully initialized termios and the descriptor is open.
    if unsafe { libc::tcsetattr(file.as_raw_fd(), libc::TCSANOW, tio) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn speed_for(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}
