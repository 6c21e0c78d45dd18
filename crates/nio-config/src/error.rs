use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("malformed line {line} in {path}: {text}")]
    Malformed { path: String, line: usize, text: String },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
