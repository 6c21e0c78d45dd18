use std::io;
use std::sync::Arc;

use nio_db::Engine;
use nio_net::{CommandOutcome, ConnectionBuffer, Line};
use tracing::{trace, warn};

use crate::commands::{
    handle_bget, handle_bkeys, handle_bset, handle_delete, handle_flush_all, handle_get, handle_incr_decr,
    handle_shutdown, handle_stats, handle_status, handle_store, handle_verbosity, handle_version,
};
use crate::error::ReplyError;
use crate::parser::{Command, classify, strip_noreply, tokenize};

const MAX_LINE_LEN: usize = 8192;

/// Owns the storage engine and turns one buffered command line into replies
/// on the wire. A single `Dispatcher` is shared (via `Arc`) across every
/// worker thread; all state it touches beyond the connection itself lives
/// in `Engine`, which is internally synchronized per shard.
pub struct Dispatcher {
    engine: Arc<Engine>,
    version: String,
    trace: bool,
}

impl Dispatcher {
    pub fn new(engine: Arc<Engine>, version: impl Into<String>, trace: bool) -> Self {
        Self { engine, version: version.into(), trace }
    }

    /// One worker command cycle (§4.3 steps 1-7).
    pub fn handle(&self, conn: &mut ConnectionBuffer) -> CommandOutcome {
        match self.try_handle(conn) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(?err, peer = %conn.peer(), "transport error servicing connection");
                CommandOutcome::Close
            }
        }
    }

    fn try_handle(&self, conn: &mut ConnectionBuffer) -> io::Result<CommandOutcome> {
        let line = match conn.read_line(MAX_LINE_LEN)? {
            Line::Complete(line) => line,
            Line::Closed => return Ok(CommandOutcome::Close),
            Line::TooLong => {
                conn.drain_line()?;
                conn.write_all(b"ERROR\r\n")?;
                return Ok(CommandOutcome::Continue);
            }
        };

        let mut tokens = tokenize(&line);
        if tokens.is_empty() {
            conn.write_all(b"ERROR\r\n")?;
            return Ok(CommandOutcome::Continue);
        }
        let noreply = strip_noreply(&mut tokens);
        let head = tokens.remove(0);
        let cmd = classify(&head);

        if self.trace {
            trace!(command = %head, peer = %conn.peer(), "dispatch");
        }

        self.dispatch(conn, cmd, &tokens, noreply)
    }

    fn dispatch(
        &self,
        conn: &mut ConnectionBuffer,
        cmd: Command,
        args: &[String],
        noreply: bool,
    ) -> io::Result<CommandOutcome> {
        match cmd {
            Command::Set | Command::Add | Command::Replace | Command::Append | Command::Prepend | Command::Cas => {
                handle_store(conn, &self.engine, cmd, args, noreply)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Get => {
                handle_get(conn, &self.engine, args, false)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Gets => {
                handle_get(conn, &self.engine, args, true)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Delete => {
                handle_delete(conn, &self.engine, args, noreply)?;
                Ok(CommandOutcome::Continue)
            }
            Command::FlushAll => {
                handle_flush_all(conn, &self.engine, noreply)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Incr => {
                handle_incr_decr(conn, &self.engine, args, true, noreply)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Decr => {
                handle_incr_decr(conn, &self.engine, args, false, noreply)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Stats => {
                handle_stats(conn)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Version => {
                handle_version(conn, &self.version)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Verbosity => {
                handle_verbosity(conn, noreply)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Quit => Ok(CommandOutcome::Close),
            Command::Bget => {
                let Some(key) = args.first() else {
                    conn.write_all(b"e")?;
                    return Ok(CommandOutcome::Continue);
                };
                handle_bget(conn, &self.engine, key)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Bset => {
                let Some(key) = args.first() else {
                    conn.write_all(b"ER")?;
                    return Ok(CommandOutcome::Continue);
                };
                handle_bset(conn, &self.engine, key)
            }
            Command::Bkeys => {
                handle_bkeys(conn, &self.engine)?;
                Ok(CommandOutcome::Continue)
            }
            Command::Status => {
                let peer = conn.peer();
                handle_status(conn, peer)
            }
            Command::Shutdown => {
                let peer = conn.peer();
                handle_shutdown(conn, peer)
            }
            Command::Unknown => {
                conn.write_all(&ReplyError::Protocol.to_wire())?;
                Ok(CommandOutcome::Continue)
            }
        }
    }
}
