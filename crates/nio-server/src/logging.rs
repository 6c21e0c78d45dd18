use std::fs::OpenOptions;
use std::path::Path;

use nio_config::Config;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Routes structured logs to `nio.output_file` (defaulting to stdout) at a
/// level controlled by `nio.trace_flag`; `RUST_LOG` still overrides this if
/// set, matching `tracing_subscriber`'s usual precedence.
pub fn init(config: &Config) {
    let default_level = if config.trace_flag { Level::TRACE } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match config.output_file.as_deref() {
        Some(path) => {
            if let Some(writer) = open_append(path) {
                builder.with_writer(writer).init();
                return;
            }
        }
        None => {}
    }
    builder.init();
}

fn open_append(path: &Path) -> Option<std::fs::File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("nio-server: could not open log file {}: {err}", path.display());
            None
        }
    }
}
