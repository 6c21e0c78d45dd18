use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{Config, ConfigError};

/// Parses `path` into `config`, recursing into `include = other` directives.
/// A relative include path is resolved against the directory of the file
/// that names it, matching the original's behaviour.
pub fn parse_into(config: &mut Config, path: &Path) -> Result<(), ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Malformed {
                path: path.display().to_string(),
                line: lineno + 1,
                text: raw_line.to_string(),
            });
        };
        let key = key.trim();
        let value = value.trim();

        if key == "include" {
            let included = resolve_include(path, value);
            parse_into(config, &included)?;
            continue;
        }

        apply(config, key, value)?;
    }
    Ok(())
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn resolve_include(from: &Path, value: &str) -> PathBuf {
    let candidate = PathBuf::from(value);
    if candidate.is_absolute() {
        candidate
    } else {
        from.parent().map_or_else(|| candidate.clone(), |dir| dir.join(&candidate))
    }
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |key: &str, value: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };

    match key {
        "nio.port_no" => config.port_no = value.parse().map_err(|_| invalid(key, value))?,
        "nio.backlog" => config.backlog = value.parse().map_err(|_| invalid(key, value))?,
        "nio.worker_threads" => {
            config.worker_threads = value.parse().map_err(|_| invalid(key, value))?;
        }
        "nio.daemon" => config.daemon = value != "0",
        "nio.username" => config.username = Some(value.to_string()),
        "nio.error_file" => config.error_file = Some(PathBuf::from(value)),
        "nio.output_file" => config.output_file = Some(PathBuf::from(value)),
        "nio.trace_flag" => config.trace_flag = value != "0",
        "nio.database_file" => config.database_file = PathBuf::from(value),
        "nio.nio_bucket_num" => {
            config.nio_bucket_num = value.parse().map_err(|_| invalid(key, value))?;
        }
        "nio.mmap_size" => config.mmap_size = value.parse().map_err(|_| invalid(key, value))?,
        other => warn!(key = other, "ignoring unknown configuration key"),
    }
    Ok(())
}
