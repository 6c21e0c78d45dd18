mod buffer;
mod nonblock;
mod outcome;
mod pool;
mod queue;
mod reactor;

pub use buffer::{ConnectionBuffer, Line};
pub use outcome::CommandOutcome;
pub use pool::{Handler, spawn_workers};
pub use queue::{ReturnItem, ReturnReceiver, ReturnSender, WorkItem, WorkReceiver, WorkSender, channel_pair};
pub use reactor::{Reactor, self_wake};
