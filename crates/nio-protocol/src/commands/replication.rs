use std::io;
use std::time::Duration;

use nio_db::Engine;
use nio_net::{CommandOutcome, ConnectionBuffer};
use nio_wire::{MAX_VALUE_LEN, deflate, inflate};

use crate::support::get_live;
use crate::time::now_secs;

/// Bit 0 of a replication frame's `stat` byte: payload was zlib-deflated.
const STAT_COMPRESSED: u8 = 0x01;
/// Below this size compression is not attempted; small payloads rarely
/// shrink and the attempt is pure overhead.
const COMPRESS_THRESHOLD: usize = 255;

fn maybe_compress(data: &[u8]) -> (Vec<u8>, u8) {
    if data.len() <= COMPRESS_THRESHOLD {
        return (data.to_vec(), 0);
    }
    match deflate(data) {
        Ok(compressed) if compressed.len() < data.len() => (compressed, STAT_COMPRESSED),
        _ => (data.to_vec(), 0),
    }
}

/// `bget <key>` (§4.7): replies `'n'` for a miss, `'e'` on internal failure,
/// else the binary value frame carrying the whole stored record (envelope
/// included) so a peer receiving it via `bset` can restore it byte for byte.
pub fn handle_bget(conn: &mut ConnectionBuffer, engine: &Engine, key: &str) -> io::Result<()> {
    let now = now_secs();
    let Some(record) = get_live(engine, key.as_bytes(), now) else {
        return conn.write_all(b"n");
    };
    let (payload, stat) = maybe_compress(&record.value);
    conn.write_all(b"V")?;
    conn.write_all(&(payload.len() as u32).to_le_bytes())?;
    conn.write_all(&[stat])?;
    conn.write_all(&record.cas.to_le_bytes())?;
    conn.write_all(&payload)
}

/// `bset <key>` (§4.7), followed immediately by the binary frame
/// `u32 size | u8 stat | i64 cas | <size bytes>` with no command-line
/// framing of its own. Writes preserve the supplied CAS verbatim rather
/// than advancing the engine's own counter, which is how a peer's version
/// identity survives replication.
pub fn handle_bset(conn: &mut ConnectionBuffer, engine: &Engine, key: &str) -> io::Result<CommandOutcome> {
    if !conn.wait_data(Duration::from_secs(3)) {
        conn.write_all(b"ER")?;
        return Ok(CommandOutcome::Close);
    }

    let size = conn.read_u32_le()? as usize;
    let stat = conn.read_u8()?;
    let cas = conn.read_i64_le()?;
    let raw = conn.read_exact(size)?;

    let stored = if stat & STAT_COMPRESSED != 0 {
        match inflate(&raw) {
            Ok(data) => data,
            Err(_) => {
                conn.write_all(b"ER")?;
                return Ok(CommandOutcome::Continue);
            }
        }
    } else {
        raw
    };

    if stored.len() > MAX_VALUE_LEN {
        conn.write_all(b"ER")?;
        return Ok(CommandOutcome::Continue);
    }

    match engine.replicate_put(key.as_bytes(), stored, cas) {
        Ok(()) => conn.write_all(b"OK")?,
        Err(_) => conn.write_all(b"ER")?,
    }
    Ok(CommandOutcome::Continue)
}

/// `bkeys` (§4.7): streams every live key as `u8 keysize | <keysize bytes>`,
/// terminated by a single zero byte.
pub fn handle_bkeys(conn: &mut ConnectionBuffer, engine: &Engine) -> io::Result<()> {
    for key in engine.cursor() {
        let len = key.len().min(u8::MAX as usize);
        conn.write_all(&[len as u8])?;
        conn.write_all(&key[..len])?;
    }
    conn.write_all(&[0u8])
}
