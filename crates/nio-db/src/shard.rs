use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::DbError;
use crate::log::{LogOp, ShardLog};

#[derive(Clone)]
pub struct Record {
    pub value: Vec<u8>,
    pub cas: i64,
}

pub struct Shard {
    state: Mutex<ShardState>,
}

struct ShardState {
    map: HashMap<Vec<u8>, Record>,
    log: ShardLog,
    path: PathBuf,
}

/// What the caller expects to find for the key before the write is allowed.
#[derive(Clone, Copy)]
pub enum Precondition {
    /// `set`: write regardless of current state.
    None,
    /// `add`: the key must be absent (the caller has already evicted any
    /// expired record before calling).
    MustNotExist,
    /// `replace`/`append`/`prepend`: the key must be present.
    MustExist,
    /// `cas`: the key must be present with exactly this token.
    MustMatchCas(i64),
}

impl Shard {
    pub fn open(path: PathBuf) -> Result<Self, DbError> {
        let mut map = HashMap::new();
        ShardLog::replay(&path, |op| match op {
            LogOp::Put { key, cas, value } => {
                map.insert(key, Record { value, cas });
            }
            LogOp::Delete { key } => {
                map.remove(&key);
            }
        })?;
        let log = ShardLog::open(&path)?;
        Ok(Self { state: Mutex::new(ShardState { map, log, path }) })
    }

    pub fn get(&self, key: &[u8]) -> Option<Record> {
        let state = self.state.lock().unwrap();
        state.map.get(key).cloned()
    }

    pub fn put(&self, key: &[u8], value: Vec<u8>, pre: Precondition) -> Result<i64, DbError> {
        let mut state = self.state.lock().unwrap();
        match (pre, state.map.get(key)) {
            (Precondition::MustNotExist, Some(_)) => return Err(DbError::Exists),
            (Precondition::MustExist, None) => return Err(DbError::NotFound),
            (Precondition::MustMatchCas(want), Some(rec)) if rec.cas != want => {
                return Err(DbError::Conflict);
            }
            (Precondition::MustMatchCas(_), None) => return Err(DbError::NotFound),
            _ => {}
        }

        let next_cas = state.map.get(key).map_or(1, |rec| rec.cas + 1);
        state.log.append_put(key, next_cas, &value)?;
        state.map.insert(key.to_vec(), Record { value, cas: next_cas });
        Ok(next_cas)
    }

    /// Writes `value` stamping the record with `cas` verbatim, as used by the
    /// binary replication path to preserve a peer's version identity instead
    /// of advancing this engine's own counter.
    pub fn replicate_put(&self, key: &[u8], value: Vec<u8>, cas: i64) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        state.log.append_put(key, cas, &value)?;
        state.map.insert(key.to_vec(), Record { value, cas });
        Ok(())
    }

    pub fn delete(&self, key: &[u8]) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.map.remove(key).is_some() {
            let _ = state.log.append_delete(key);
            true
        } else {
            false
        }
    }

    /// Removes `key` without writing a tombstone, used to silently drop an
    /// expired record observed on read.
    pub fn expire(&self, key: &[u8]) {
        let mut state = self.state.lock().unwrap();
        if state.map.remove(key).is_some() {
            let _ = state.log.append_delete(key);
        }
    }

    pub fn flush_all(&self) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        state.map.clear();
        let path = state.path.clone();
        state.log.truncate(&path)
    }

    pub fn keys(&self) -> Vec<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.map.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().map.len()
    }
}
