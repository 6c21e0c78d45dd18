use std::io;
use std::net::SocketAddr;

use nio_net::{CommandOutcome, ConnectionBuffer};

fn is_loopback(peer: SocketAddr) -> bool {
    peer.ip().is_loopback()
}

pub fn handle_version(conn: &mut ConnectionBuffer, version: &str) -> io::Result<()> {
    conn.write_all(format!("{version}\r\n").as_bytes())
}

pub fn handle_verbosity(conn: &mut ConnectionBuffer, noreply: bool) -> io::Result<()> {
    if noreply { Ok(()) } else { conn.write_all(b"OK\r\n") }
}

pub fn handle_stats(conn: &mut ConnectionBuffer) -> io::Result<()> {
    conn.write_all(b"\r\n")
}

/// `__/status/__`, gated to loopback peers only (§4.6).
pub fn handle_status(conn: &mut ConnectionBuffer, peer: SocketAddr) -> io::Result<CommandOutcome> {
    if !is_loopback(peer) {
        conn.write_all(b"ERROR\r\n")?;
        return Ok(CommandOutcome::Close);
    }
    conn.write_all(b"running.\r\n")?;
    Ok(CommandOutcome::Continue)
}

/// `__/shutdown/__`, gated to loopback peers only (§4.6). On success, the
/// worker signals the reactor to tear the whole server down.
pub fn handle_shutdown(conn: &mut ConnectionBuffer, peer: SocketAddr) -> io::Result<CommandOutcome> {
    if !is_loopback(peer) {
        conn.write_all(b"ERROR\r\n")?;
        return Ok(CommandOutcome::Close);
    }
    conn.write_all(b"stopped.\r\n")?;
    Ok(CommandOutcome::Shutdown)
}
