use std::io;

use nio_db::{Engine, Precondition};
use nio_net::ConnectionBuffer;
use nio_wire::{Envelope, MAX_KEY_LEN, MAX_VALUE_LEN};

use crate::error::ReplyError;
use crate::parser::Command;
use crate::support::{get_live, split_envelope};
use crate::time::now_secs;

fn reply(conn: &mut ConnectionBuffer, noreply: bool, bytes: &[u8]) -> io::Result<()> {
    if noreply { Ok(()) } else { conn.write_all(bytes) }
}

fn reply_err(conn: &mut ConnectionBuffer, noreply: bool, err: &ReplyError) -> io::Result<()> {
    reply(conn, noreply, &err.to_wire())
}

struct StoreArgs {
    key: String,
    flags: u32,
    exptime: u32,
    bytes: usize,
    cas: Option<i64>,
}

fn parse_store_args(args: &[String], want_cas: bool) -> Result<StoreArgs, ReplyError> {
    let expected = if want_cas { 5 } else { 4 };
    if args.len() != expected {
        return Err(ReplyError::Protocol);
    }
    let key = args[0].clone();
    if key.len() > MAX_KEY_LEN {
        return Err(ReplyError::client("key size too long"));
    }
    let flags: u32 = args[1].parse().map_err(|_| ReplyError::client("bad command line format"))?;
    let exptime: u32 = args[2].parse().map_err(|_| ReplyError::client("bad command line format"))?;
    let bytes: usize = args[3].parse().map_err(|_| ReplyError::client("bad command line format"))?;
    if bytes > MAX_VALUE_LEN {
        return Err(ReplyError::client("data too long"));
    }
    let cas = if want_cas {
        Some(args[4].parse::<i64>().map_err(|_| ReplyError::client("bad command line format"))?)
    } else {
        None
    };
    Ok(StoreArgs { key, flags, exptime, bytes, cas })
}

/// Reads the `bytes`-length body plus its trailing CRLF from the wire.
/// Returns `Err` with the line already drained when the terminator is
/// missing, matching "a short or oversized body ... replies CLIENT_ERROR".
fn read_body(conn: &mut ConnectionBuffer, bytes: usize) -> io::Result<Result<Vec<u8>, ReplyError>> {
    let mut raw = conn.read_exact(bytes + 2)?;
    if &raw[bytes..] != b"\r\n" {
        conn.drain_line()?;
        return Ok(Err(ReplyError::client("bad data chunk")));
    }
    raw.truncate(bytes);
    Ok(Ok(raw))
}

/// Dispatches `set`/`add`/`replace`/`append`/`prepend`/`cas` (§4.5).
pub fn handle_store(
    conn: &mut ConnectionBuffer,
    engine: &Engine,
    cmd: Command,
    args: &[String],
    noreply: bool,
) -> io::Result<()> {
    let want_cas = cmd == Command::Cas;
    let parsed = match parse_store_args(args, want_cas) {
        Ok(parsed) => parsed,
        Err(err) => return reply_err(conn, noreply, &err),
    };

    let body = match read_body(conn, parsed.bytes)? {
        Ok(body) => body,
        Err(err) => return reply_err(conn, noreply, &err),
    };

    let key = parsed.key.as_bytes();
    let now = now_secs();

    match cmd {
        Command::Set => {
            let envelope = Envelope::new(parsed.flags, Envelope::absolute_exptime(parsed.exptime, now));
            engine
                .put(key, envelope.wrap(&body), Precondition::None)
                .map_err(|err| io::Error::other(err.to_string()))?;
            reply(conn, noreply, b"STORED\r\n")
        }
        Command::Add => {
            if get_live(engine, key, now).is_some() {
                return reply(conn, noreply, b"EXISTS\r\n");
            }
            let envelope = Envelope::new(parsed.flags, Envelope::absolute_exptime(parsed.exptime, now));
            match engine.put(key, envelope.wrap(&body), Precondition::MustNotExist) {
                Ok(_) => reply(conn, noreply, b"STORED\r\n"),
                Err(_) => reply(conn, noreply, b"EXISTS\r\n"),
            }
        }
        Command::Replace => {
            if get_live(engine, key, now).is_none() {
                return reply(conn, noreply, b"NOT_FOUND\r\n");
            }
            let envelope = Envelope::new(parsed.flags, Envelope::absolute_exptime(parsed.exptime, now));
            match engine.put(key, envelope.wrap(&body), Precondition::MustExist) {
                Ok(_) => reply(conn, noreply, b"STORED\r\n"),
                Err(_) => reply(conn, noreply, b"NOT_FOUND\r\n"),
            }
        }
        Command::Cas => {
            let Some(existing) = get_live(engine, key, now) else {
                return reply(conn, noreply, b"NOT_FOUND\r\n");
            };
            let wanted = parsed.cas.unwrap_or_default();
            if existing.cas != wanted {
                return reply(conn, noreply, b"EXISTS\r\n");
            }
            let envelope = Envelope::new(parsed.flags, Envelope::absolute_exptime(parsed.exptime, now));
            match engine.put(key, envelope.wrap(&body), Precondition::MustMatchCas(wanted)) {
                Ok(_) => reply(conn, noreply, b"STORED\r\n"),
                Err(nio_db::DbError::NotFound) => reply(conn, noreply, b"NOT_FOUND\r\n"),
                Err(_) => reply(conn, noreply, b"EXISTS\r\n"),
            }
        }
        Command::Append | Command::Prepend => {
            let Some(existing) = get_live(engine, key, now) else {
                return reply(conn, noreply, b"NOT_STORED\r\n");
            };
            let Some((envelope, data)) = split_envelope(&existing) else {
                return reply(conn, noreply, b"NOT_STORED\r\n");
            };
            if data.len() + body.len() > MAX_VALUE_LEN {
                return reply_err(conn, noreply, &ReplyError::server("object too large for cache"));
            }
            let combined = if cmd == Command::Append {
                [data, &body].concat()
            } else {
                [body.as_slice(), data].concat()
            };
            match engine.put(key, envelope.wrap(&combined), Precondition::MustMatchCas(existing.cas)) {
                Ok(_) => reply(conn, noreply, b"STORED\r\n"),
                Err(_) => reply(conn, noreply, b"NOT_STORED\r\n"),
            }
        }
        _ => unreachable!("handle_store only dispatched for storage verbs"),
    }
}

/// `get`/`gets` (§4.5): emits one `VALUE` block per present, unexpired key,
/// followed by a single `END`.
pub fn handle_get(conn: &mut ConnectionBuffer, engine: &Engine, args: &[String], with_cas: bool) -> io::Result<()> {
    let now = now_secs();
    for key in args {
        let Some(record) = get_live(engine, key.as_bytes(), now) else { continue };
        let Some((envelope, data)) = split_envelope(&record) else { continue };
        if with_cas {
            conn.write_all(format!("VALUE {} {} {} {}\r\n", key, envelope.flags, data.len(), record.cas).as_bytes())?;
        } else {
            conn.write_all(format!("VALUE {} {} {}\r\n", key, envelope.flags, data.len()).as_bytes())?;
        }
        conn.write_all(data)?;
        conn.write_all(b"\r\n")?;
    }
    conn.write_all(b"END\r\n")
}

pub fn handle_delete(conn: &mut ConnectionBuffer, engine: &Engine, args: &[String], noreply: bool) -> io::Result<()> {
    if args.is_empty() {
        return reply_err(conn, noreply, &ReplyError::Protocol);
    }
    let key = args[0].as_bytes();
    let now = now_secs();
    if get_live(engine, key, now).is_none() {
        return reply(conn, noreply, b"NOT_FOUND\r\n");
    }
    if engine.delete(key) {
        reply(conn, noreply, b"DELETED\r\n")
    } else {
        reply(conn, noreply, b"NOT_FOUND\r\n")
    }
}

pub fn handle_flush_all(conn: &mut ConnectionBuffer, engine: &Engine, noreply: bool) -> io::Result<()> {
    match engine.flush_all() {
        Ok(()) => reply(conn, noreply, b"DELETED\r\n"),
        Err(err) => reply_err(conn, noreply, &ReplyError::server(err.to_string())),
    }
}

/// `incr`/`decr` (§4.5): the stored value must be an 8-byte little-endian
/// unsigned integer. Retries the CAS-checked write a bounded number of times
/// to ride out a concurrent mutation of the same key.
pub fn handle_incr_decr(
    conn: &mut ConnectionBuffer,
    engine: &Engine,
    args: &[String],
    increment: bool,
    noreply: bool,
) -> io::Result<()> {
    if args.len() != 2 {
        return reply_err(conn, noreply, &ReplyError::Protocol);
    }
    let key = args[0].as_bytes();
    let Ok(operand) = args[1].parse::<u64>() else {
        return reply_err(conn, noreply, &ReplyError::client("invalid numeric delta argument"));
    };

    const MAX_ATTEMPTS: u32 = 8;
    for _ in 0..MAX_ATTEMPTS {
        let now = now_secs();
        let Some(existing) = get_live(engine, key, now) else {
            return reply(conn, noreply, b"NOT_FOUND\r\n");
        };
        let Some((envelope, data)) = split_envelope(&existing) else {
            return reply_err(conn, noreply, &ReplyError::client("cannot increment or decrement non-numeric value"));
        };
        let Ok(current) = <[u8; 8]>::try_from(data) else {
            return reply_err(conn, noreply, &ReplyError::client("cannot increment or decrement non-numeric value"));
        };
        let current = u64::from_le_bytes(current);
        let updated = if increment { current.wrapping_add(operand) } else { current.wrapping_sub(operand) };

        match engine.put(key, envelope.wrap(&updated.to_le_bytes()), Precondition::MustMatchCas(existing.cas)) {
            Ok(_) => return reply(conn, noreply, format!("{updated}\r\n").as_bytes()),
            Err(nio_db::DbError::NotFound) => return reply(conn, noreply, b"NOT_FOUND\r\n"),
            Err(_) => continue,
        }
    }
    reply_err(conn, noreply, &ReplyError::server("concurrent modification, give up"))
}
