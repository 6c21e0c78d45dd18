use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use mio::net::TcpStream;

use crate::nonblock;

const READ_CHUNK: usize = 8 * 1024;

/// Outcome of scanning the buffer for a CRLF-terminated line.
pub enum Line {
    /// A complete line, CRLF stripped.
    Complete(Vec<u8>),
    /// No delimiter within `limit` bytes; caller should reply with an error
    /// and call [`ConnectionBuffer::drain_line`].
    TooLong,
    /// The peer closed the connection before a delimiter arrived.
    Closed,
}

/// Per-connection read buffer and the command-layer I/O primitives built on
/// top of it (§4.2): line reads, fixed-size reads, and a bounded wait for the
/// binary replication path's receive timeout.
pub struct ConnectionBuffer {
    stream: TcpStream,
    peer: SocketAddr,
    buf: Vec<u8>,
    pos: usize,
}

impl ConnectionBuffer {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer, buf: Vec::with_capacity(READ_CHUNK), pos: 0 }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn into_stream(self) -> TcpStream {
        self.stream
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// True if the buffer already holds unread bytes without touching the
    /// socket — what the worker's inner loop uses to decide whether another
    /// command cycle is ready without blocking.
    pub fn has_buffered(&self) -> bool {
        self.pos < self.buf.len()
    }

    fn compact(&mut self) {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
    }

    fn fill_more(&mut self) -> io::Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.stream.read(&mut chunk)?;
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    /// Reads a `\r\n`-terminated line, blocking on the socket as needed.
    /// `limit` bounds the line length before the caller is asked to give up.
    pub fn read_line(&mut self, limit: usize) -> io::Result<Line> {
        loop {
            if let Some(rel) = find_crlf(&self.buf[self.pos..]) {
                let line = self.buf[self.pos..self.pos + rel].to_vec();
                self.pos += rel + 2;
                self.compact();
                return Ok(Line::Complete(line));
            }
            if self.buf.len() - self.pos > limit {
                return Ok(Line::TooLong);
            }
            if self.fill_more()? == 0 {
                return Ok(Line::Closed);
            }
        }
    }

    /// Discards bytes up to and including the next CRLF (or EOF).
    pub fn drain_line(&mut self) -> io::Result<()> {
        loop {
            if let Some(rel) = find_crlf(&self.buf[self.pos..]) {
                self.pos += rel + 2;
                self.compact();
                return Ok(());
            }
            self.pos = self.buf.len();
            self.compact();
            if self.fill_more()? == 0 {
                return Ok(());
            }
        }
    }

    pub fn read_exact(&mut self, n: usize) -> io::Result<Vec<u8>> {
        while self.buf.len() - self.pos < n {
            if self.fill_more()? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed"));
            }
        }
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        self.compact();
        Ok(out)
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        let bytes = self.read_exact(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_i64_le(&mut self) -> io::Result<i64> {
        let bytes = self.read_exact(8)?;
        Ok(i64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_exact(1)?[0])
    }

    /// True if at least one byte becomes available within `timeout`. Used by
    /// the `bset` binary path, which treats a silent peer as a protocol
    /// error rather than blocking forever.
    pub fn wait_data(&self, timeout: Duration) -> bool {
        if self.has_buffered() {
            return true;
        }
        let mut pfd = libc::pollfd { fd: self.stream.as_raw_fd(), events: libc::POLLIN, revents: 0 };
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        rc > 0 && (pfd.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR)) != 0
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }

    pub fn set_blocking(&self, blocking: bool) -> io::Result<()> {
        nonblock::set_blocking(&self.stream, blocking)
    }
}

fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_crlf_locates_delimiter() {
        assert_eq!(find_crlf(b"hello\r\nworld"), Some(5));
        assert_eq!(find_crlf(b"no delimiter here"), None);
    }
}
