use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::warn;

use crate::error::DbError;
use crate::shard::{Precondition, Record, Shard};

/// A sharded, CAS-versioned hash database.
///
/// Each shard owns an independent lock and an independent append-only log
/// file under `dir/shard-<n>.log`, so operations on unrelated keys never
/// contend. There is no background compaction; `flush_all` is the only way
/// logs shrink.
pub struct Engine {
    dir: PathBuf,
    shards: Vec<Shard>,
    _warm_cache: Vec<Mmap>,
}

fn shard_index(key: &[u8], shard_count: usize) -> usize {
    // FNV-1a, good enough to spread keys across shards without pulling in a
    // hashing crate for a purely internal routing decision.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in key {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    (hash as usize) % shard_count
}

impl Engine {
    /// Opens (creating if absent) the database rooted at `dir`, replaying
    /// each shard's log. `shard_count` comes from the `nio_bucket_num`
    /// config knob, reinterpreted as a shard-count hint rather than a literal
    /// hash-bucket count. `mmap_window_mb`, when non-zero, best-effort memory
    /// maps each shard log to keep its pages warm in the OS cache; the
    /// engine is fully correct without it.
    pub fn open(dir: &Path, shard_count: usize, mmap_window_mb: usize) -> Result<Self, DbError> {
        let shard_count = shard_count.max(1);
        std::fs::create_dir_all(dir).map_err(|source| DbError::Open {
            path: dir.display().to_string(),
            source,
        })?;

        let mut shards = Vec::with_capacity(shard_count);
        let mut warm_cache = Vec::new();
        for idx in 0..shard_count {
            let path = dir.join(format!("shard-{idx}.log"));
            shards.push(Shard::open(path.clone())?);
            if mmap_window_mb > 0 {
                if let Some(mmap) = try_warm(&path) {
                    warm_cache.push(mmap);
                }
            }
        }

        Ok(Self { dir: dir.to_path_buf(), shards, _warm_cache: warm_cache })
    }

    fn shard_for(&self, key: &[u8]) -> &Shard {
        &self.shards[shard_index(key, self.shards.len())]
    }

    pub fn get(&self, key: &[u8]) -> Option<Record> {
        self.shard_for(key).get(key)
    }

    pub fn put(&self, key: &[u8], value: Vec<u8>, pre: Precondition) -> Result<i64, DbError> {
        self.shard_for(key).put(key, value, pre)
    }

    pub fn replicate_put(&self, key: &[u8], value: Vec<u8>, cas: i64) -> Result<(), DbError> {
        self.shard_for(key).replicate_put(key, value, cas)
    }

    pub fn delete(&self, key: &[u8]) -> bool {
        self.shard_for(key).delete(key)
    }

    pub fn expire(&self, key: &[u8]) {
        self.shard_for(key).expire(key);
    }

    /// Recreates every shard's backing file, discarding all records. Mirrors
    /// the "close and recreate the database file" semantics of `flush_all`.
    pub fn flush_all(&self) -> Result<(), DbError> {
        for shard in &self.shards {
            shard.flush_all()?;
        }
        Ok(())
    }

    /// Snapshot of every live key across all shards, used by `bkeys`.
    pub fn cursor(&self) -> Vec<Vec<u8>> {
        self.shards.iter().flat_map(Shard::keys).collect()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn try_warm(path: &Path) -> Option<Mmap> {
    let file = OpenOptions::new().read(true).open(path).ok()?;
    // SAFETY: the log file is append-only and owned by this process; we only
    // ever read through the mapping to prefault pages, never via pointer.
    match unsafe { Mmap::map(&file) } {
        Ok(mmap) => Some(mmap),
        Err(err) => {
            warn!(?err, path = %path.display(), "failed to mmap shard log for warm cache");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::open(dir.path(), 4, 0).unwrap();

        let cas = engine.put(b"k", b"v1".to_vec(), Precondition::None).unwrap();
        assert_eq!(cas, 1);
        assert_eq!(engine.get(b"k").unwrap().value, b"v1");

        let cas2 = engine.put(b"k", b"v2".to_vec(), Precondition::MustMatchCas(cas)).unwrap();
        assert_eq!(cas2, 2);

        assert!(matches!(
            engine.put(b"k", b"v3".to_vec(), Precondition::MustMatchCas(cas)),
            Err(DbError::Conflict)
        ));

        assert!(engine.delete(b"k"));
        assert!(engine.get(b"k").is_none());
    }

    #[test]
    fn add_requires_absence() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::open(dir.path(), 1, 0).unwrap();
        engine.put(b"k", b"v".to_vec(), Precondition::MustNotExist).unwrap();
        assert!(matches!(
            engine.put(b"k", b"v2".to_vec(), Precondition::MustNotExist),
            Err(DbError::Exists)
        ));
    }

    #[test]
    fn replay_recovers_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = Engine::open(dir.path(), 2, 0).unwrap();
            engine.put(b"alpha", b"1".to_vec(), Precondition::None).unwrap();
            engine.put(b"beta", b"2".to_vec(), Precondition::None).unwrap();
            engine.delete(b"alpha");
        }
        let reopened = Engine::open(dir.path(), 2, 0).unwrap();
        assert!(reopened.get(b"alpha").is_none());
        assert_eq!(reopened.get(b"beta").unwrap().value, b"2");
    }

    #[test]
    fn flush_all_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::open(dir.path(), 2, 0).unwrap();
        engine.put(b"k", b"v".to_vec(), Precondition::None).unwrap();
        engine.flush_all().unwrap();
        assert_eq!(engine.len(), 0);
    }

    #[test]
    fn cursor_lists_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::open(dir.path(), 4, 0).unwrap();
        for key in ["a", "b", "c"] {
            engine.put(key.as_bytes(), b"x".to_vec(), Precondition::None).unwrap();
        }
        let mut keys = engine.cursor();
        keys.sort();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }
}
