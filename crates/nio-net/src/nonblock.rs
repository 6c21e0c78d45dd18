use std::io;
use std::os::unix::io::AsRawFd;

/// Toggles `O_NONBLOCK` on a raw socket fd. Connections live in non-blocking
/// mode while registered with the reactor's poller and are switched to
/// blocking mode for the duration a worker thread owns them, so the worker's
/// reads behave like ordinary synchronous I/O.
pub fn set_blocking(stream: &impl AsRawFd, blocking: bool) -> io::Result<()> {
    let fd = stream.as_raw_fd();
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL, 0);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let new_flags = if blocking { flags & !libc::O_NONBLOCK } else { flags | libc::O_NONBLOCK };
        if libc::fcntl(fd, libc::F_SETFL, new_flags) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
