use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("truncated envelope: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("value exceeds maximum size of {max} bytes")]
    ValueTooLarge { max: usize },

    #[error("key exceeds maximum size of {max} bytes")]
    KeyTooLarge { max: usize },

    #[error("zlib compression failed: {0}")]
    Compress(#[from] std::io::Error),
}
