use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::DbError;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

pub enum LogOp {
    Put { key: Vec<u8>, cas: i64, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Append-only record log backing one shard. Replayed in full on open to
/// rebuild the in-memory map; there is no compaction.
pub struct ShardLog {
    writer: BufWriter<File>,
}

impl ShardLog {
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)
            .map_err(|source| DbError::Open { path: path.display().to_string(), source })?;
        Ok(Self { writer: BufWriter::new(file) })
    }

    /// Replays every record in `path`, invoking `apply` in file order.
    pub fn replay(path: &Path, mut apply: impl FnMut(LogOp)) -> Result<(), DbError> {
        if !path.exists() {
            return Ok(());
        }
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        loop {
            let mut op_byte = [0u8; 1];
            match reader.read_exact(&mut op_byte) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }

            let key = read_blob(&mut reader)?;
            match op_byte[0] {
                OP_PUT => {
                    let cas = read_i64(&mut reader)?;
                    let value = read_blob(&mut reader)?;
                    apply(LogOp::Put { key, cas, value });
                }
                OP_DELETE => apply(LogOp::Delete { key }),
                other => return Err(DbError::Corrupt(format!("unknown log opcode {other}"))),
            }
        }
        Ok(())
    }

    pub fn append_put(&mut self, key: &[u8], cas: i64, value: &[u8]) -> Result<(), DbError> {
        self.writer.write_all(&[OP_PUT])?;
        write_blob(&mut self.writer, key)?;
        self.writer.write_all(&cas.to_le_bytes())?;
        write_blob(&mut self.writer, value)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn append_delete(&mut self, key: &[u8]) -> Result<(), DbError> {
        self.writer.write_all(&[OP_DELETE])?;
        write_blob(&mut self.writer, key)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Truncates the log file to empty, used by `flush_all`.
    pub fn truncate(&mut self, path: &Path) -> Result<(), DbError> {
        let file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }
}

fn read_blob(reader: &mut impl Read) -> Result<Vec<u8>, DbError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_blob(writer: &mut impl Write, blob: &[u8]) -> Result<(), DbError> {
    writer.write_all(&(blob.len() as u32).to_le_bytes())?;
    writer.write_all(blob)?;
    Ok(())
}

fn read_i64(reader: &mut impl Read) -> Result<i64, DbError> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}
