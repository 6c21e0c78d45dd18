use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::error::WireError;

/// zlib-deflates `data`, returning `None` when the compressed form is not
/// strictly smaller (the replication path only bothers when it helps).
pub fn deflate(data: &[u8]) -> Result<Vec<u8>, WireError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

pub fn inflate(data: &[u8]) -> Result<Vec<u8>, WireError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = deflate(&original).unwrap();
        assert!(compressed.len() < original.len());
        let restored = inflate(&compressed).unwrap();
        assert_eq!(restored, original);
    }
}
