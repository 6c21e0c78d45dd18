use nio_db::{Engine, Record};
use nio_wire::Envelope;

/// Fetches `key`, transparently evicting and treating as absent any record
/// whose `exptime` has already elapsed (§3 lazy expiry).
pub fn get_live(engine: &Engine, key: &[u8], now: u32) -> Option<Record> {
    let record = engine.get(key)?;
    let (envelope, _) = Envelope::decode(&record.value).ok()?;
    if envelope.is_expired(now) {
        engine.expire(key);
        None
    } else {
        Some(record)
    }
}

pub fn split_envelope(record: &Record) -> Option<(Envelope, &[u8])> {
    Envelope::decode(&record.value).ok()
}
