mod admin;
mod replication;
mod storage;

pub use admin::{handle_shutdown, handle_stats, handle_status, handle_verbosity, handle_version};
pub use replication::{handle_bget, handle_bkeys, handle_bset};
pub use storage::{handle_delete, handle_flush_all, handle_get, handle_incr_decr, handle_store};
