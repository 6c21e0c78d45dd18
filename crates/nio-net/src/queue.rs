use std::net::SocketAddr;

use mio::Token;
use mio::net::TcpStream;

use crate::outcome::CommandOutcome;

/// A connection handed from the reactor to a worker: the dispatch-time
/// equivalent of the work queue's `{socket, peer}` descriptor (§3), carrying
/// the socket itself since ownership moves with it.
pub struct WorkItem {
    pub token: Token,
    pub stream: TcpStream,
    pub peer: SocketAddr,
}

/// A connection handed back from a worker once its command cycle is done.
pub struct ReturnItem {
    pub token: Token,
    pub stream: TcpStream,
    pub outcome: CommandOutcome,
}

pub type WorkSender = crossbeam_channel::Sender<WorkItem>;
pub type WorkReceiver = crossbeam_channel::Receiver<WorkItem>;
pub type ReturnSender = crossbeam_channel::Sender<ReturnItem>;
pub type ReturnReceiver = crossbeam_channel::Receiver<ReturnItem>;

/// Builds the unbounded FIFO channel pair linking the reactor to the worker
/// pool in each direction.
pub fn channel_pair<T>() -> (crossbeam_channel::Sender<T>, crossbeam_channel::Receiver<T>) {
    crossbeam_channel::unbounded()
}
