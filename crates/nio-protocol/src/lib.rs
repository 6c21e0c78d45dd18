mod commands;
mod dispatch;
mod error;
mod parser;
mod support;
mod time;

pub use dispatch::Dispatcher;
pub use error::ReplyError;
pub use parser::{Command, SHUTDOWN_CMD, STATUS_CMD, classify};
