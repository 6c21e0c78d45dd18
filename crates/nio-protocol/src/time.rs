use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in whole seconds since the epoch, truncated to
/// `u32` — the same resolution the envelope's `exptime` field stores.
pub fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}
