mod compress;
mod envelope;
mod error;

pub use compress::{deflate, inflate};
pub use envelope::{Envelope, HEADER_SIZE, MAX_KEY_LEN, MAX_VALUE_LEN};
pub use error::WireError;
