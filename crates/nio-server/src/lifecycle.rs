use std::ffi::CString;
use std::io;
use std::sync::Once;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{error, info, warn};

static CLEANUP: Once = Once::new();

/// The original protocol this server implements predates `SO_NOSIGPIPE`-style
/// socket options on every platform; ignoring `SIGPIPE` keeps a write to a
/// peer that has already closed its end from taking the whole process down.
pub fn ignore_sigpipe() {
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_IGN);
    }
}

/// Arms `shutdown` to flip true on `SIGINT`/`SIGTERM`. The reactor's bounded
/// poll interval picks the flag up within one tick; no work happens inside
/// the signal handler itself beyond the atomic store `signal_hook` performs.
pub fn install_signal_handlers(shutdown: &Arc<AtomicBool>) -> io::Result<()> {
    signal_hook::flag::register(SIGINT, Arc::clone(shutdown))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(shutdown))?;
    Ok(())
}

/// Runs the shutdown teardown message exactly once, regardless of whether it
/// is reached via a signal or via the `__/shutdown/__` command path.
pub fn cleanup_once(reason: &str) {
    CLEANUP.call_once(|| {
        info!(reason, "shutting down");
    });
}

/// Detaches the process from its controlling terminal (POSIX only), mirroring
/// the `nio.daemon` configuration knob.
#[cfg(unix)]
pub fn daemonize() -> io::Result<()> {
    let rc = unsafe { libc::daemon(1, 0) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn daemonize() -> io::Result<()> {
    warn!("daemonize requested but this platform has no daemon() support");
    Ok(())
}

/// Drops root privileges to `username` once the listen socket is bound, if
/// the process is currently running as root. A no-op for non-root or when
/// no username is configured.
#[cfg(unix)]
pub fn drop_privileges(username: Option<&str>) -> io::Result<()> {
    let Some(username) = username else { return Ok(()) };
    if unsafe { libc::getuid() } != 0 {
        return Ok(());
    }

    let cname = CString::new(username).map_err(|_| io::Error::other("username contains NUL byte"))?;
    let pwd = unsafe { libc::getpwnam(cname.as_ptr()) };
    if pwd.is_null() {
        error!(username, "no such user, refusing to drop privileges");
        return Err(io::Error::other(format!("unknown user {username}")));
    }

    unsafe {
        let gid = (*pwd).pw_gid;
        let uid = (*pwd).pw_uid;
        if libc::setgid(gid) != 0 || libc::setuid(uid) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    info!(username, "dropped root privileges");
    Ok(())
}

#[cfg(not(unix))]
pub fn drop_privileges(_username: Option<&str>) -> io::Result<()> {
    Ok(())
}
