use crate::error::WireError;

/// Fixed size of the envelope prefix stored ahead of every value: one byte
/// naming the header size itself, a 4-byte flags field, a 4-byte exptime field.
pub const HEADER_SIZE: u8 = 8;
pub const ENVELOPE_LEN: usize = 1 + 4 + 4;

pub const MAX_KEY_LEN: usize = 250;
pub const MAX_VALUE_LEN: usize = 1024 * 1024;

/// The 9-byte header every stored record carries ahead of its data block.
///
/// Layout (all integers little-endian): `u8 header_size | u32 flags | u32 exptime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub flags: u32,
    /// Absolute expiry in seconds since the epoch, or 0 for "never".
    pub exptime: u32,
}

impl Envelope {
    pub const fn new(flags: u32, exptime: u32) -> Self {
        Self { flags, exptime }
    }

    pub fn encode(self) -> [u8; ENVELOPE_LEN] {
        let mut buf = [0u8; ENVELOPE_LEN];
        buf[0] = HEADER_SIZE;
        buf[1..5].copy_from_slice(&self.flags.to_le_bytes());
        buf[5..9].copy_from_slice(&self.exptime.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<(Self, &[u8]), WireError> {
        if bytes.len() < ENVELOPE_LEN {
            return Err(WireError::Truncated { need: ENVELOPE_LEN, have: bytes.len() });
        }
        let flags = u32::from_le_bytes(bytes[1..5].try_into().unwrap());
        let exptime = u32::from_le_bytes(bytes[5..9].try_into().unwrap());
        Ok((Self { flags, exptime }, &bytes[ENVELOPE_LEN..]))
    }

    /// Writes `header_size || flags || exptime || data` into a freshly allocated record.
    pub fn wrap(self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENVELOPE_LEN + data.len());
        out.extend_from_slice(&self.encode());
        out.extend_from_slice(data);
        out
    }

    /// True if `exptime` is set and has already elapsed relative to `now`.
    pub fn is_expired(self, now: u32) -> bool {
        self.exptime != 0 && self.exptime < now
    }

    /// Converts a client-supplied relative (or absolute, per memcached convention)
    /// exptime into the absolute form stored in the envelope, saturating instead
    /// of wrapping on overflow.
    pub fn absolute_exptime(relative: u32, now: u32) -> u32 {
        if relative == 0 { 0 } else { now.saturating_add(relative) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let env = Envelope::new(0xdead_beef, 12345);
        let record = env.wrap(b"hello world");
        let (decoded, data) = Envelope::decode(&record).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(data, b"hello world");
    }

    #[test]
    fn truncated_decode() {
        let err = Envelope::decode(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, WireError::Truncated { .. }));
    }

    #[test]
    fn expiry_saturates_instead_of_wrapping() {
        let abs = Envelope::absolute_exptime(u32::MAX - 1, 100);
        assert_eq!(abs, u32::MAX);
    }

    #[test]
    fn zero_exptime_never_expires() {
        let env = Envelope::new(0, 0);
        assert!(!env.is_expired(u32::MAX));
    }
}
