mod error;
mod parser;

use std::path::PathBuf;

pub use error::ConfigError;
use parser::parse_into;

pub const DEFAULT_PORT: u16 = 11211;
pub const DEFAULT_BACKLOG: i32 = 100;
pub const DEFAULT_WORKER_THREADS: usize = 4;
pub const DEFAULT_BUCKET_NUM: usize = 1_000_000;
pub const PROGRAM_NAME: &str = "nio";
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runtime configuration, assembled from defaults, an optional `key = value`
/// file (with `#` comments and recursive `include = path`), and CLI flags
/// layered on top by the binary crate.
#[derive(Debug, Clone)]
pub struct Config {
    pub port_no: u16,
    pub backlog: i32,
    pub worker_threads: usize,
    pub daemon: bool,
    pub username: Option<String>,
    pub error_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub trace_flag: bool,
    pub database_file: PathBuf,
    pub nio_bucket_num: usize,
    pub mmap_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port_no: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            worker_threads: DEFAULT_WORKER_THREADS,
            daemon: false,
            username: None,
            error_file: None,
            output_file: None,
            trace_flag: false,
            database_file: PathBuf::from("nio.db"),
            nio_bucket_num: DEFAULT_BUCKET_NUM,
            mmap_size: 0,
        }
    }
}

impl Config {
    /// Loads defaults overlaid with the `key = value` file at `path`,
    /// following `include = other.conf` directives relative to the file
    /// that names them.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        parse_into(&mut config, path)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_keys_comments_and_includes() {
        let dir = tempfile::tempdir().unwrap();
        let included = dir.path().join("extra.conf");
        std::fs::write(&included, "nio.worker_threads = 8\n").unwrap();

        let main_path = dir.path().join("main.conf");
        let mut file = std::fs::File::create(&main_path).unwrap();
        writeln!(file, "# comment line").unwrap();
        writeln!(file, "nio.port_no = 12000").unwrap();
        writeln!(file, "include = {}", included.display()).unwrap();
        writeln!(file, "nio.trace_flag = 1").unwrap();
        drop(file);

        let config = Config::from_file(&main_path).unwrap();
        assert_eq!(config.port_no, 12000);
        assert_eq!(config.worker_threads, 8);
        assert!(config.trace_flag);
    }

    #[test]
    fn later_assignment_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.conf");
        std::fs::write(&path, "nio.port_no = 1\nnio.port_no = 2\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.port_no, 2);
    }
}
