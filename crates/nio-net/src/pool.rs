use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::buffer::ConnectionBuffer;
use crate::outcome::CommandOutcome;
use crate::queue::{ReturnSender, WorkReceiver};
use crate::reactor;

/// One command-cycle step: read and execute exactly one request on the
/// connection, returning how the worker should proceed (§4.3).
pub type Handler = dyn Fn(&mut ConnectionBuffer) -> CommandOutcome + Send + Sync;

/// Spawns `count` worker threads, each pulling connections from `work_rx`,
/// running `handler` in a loop until the connection's buffer is drained of
/// pipelined requests, then handing the connection back on `result_tx`.
pub fn spawn_workers(
    count: usize,
    work_rx: WorkReceiver,
    result_tx: ReturnSender,
    listen_port: u16,
    handler: Arc<Handler>,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|idx| {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let handler = Arc::clone(&handler);
            thread::Builder::new()
                .name(format!("nio-worker-{idx}"))
                .spawn(move || worker_loop(&work_rx, &result_tx, listen_port, &handler))
                .expect("failed to spawn worker thread")
        })
        .collect()
}

fn worker_loop(work_rx: &WorkReceiver, result_tx: &ReturnSender, listen_port: u16, handler: &Handler) {
    while let Ok(item) = work_rx.recv() {
        let mut conn = ConnectionBuffer::new(item.stream, item.peer);
        if let Err(err) = conn.set_blocking(true) {
            warn!(?err, "failed to switch connection to blocking mode");
        }

        let mut outcome = CommandOutcome::Continue;
        loop {
            outcome = handler(&mut conn);
            if outcome != CommandOutcome::Continue || !conn.has_buffered() {
                break;
            }
        }

        if outcome == CommandOutcome::Shutdown {
            reactor::self_wake(listen_port);
        }

        if outcome == CommandOutcome::Continue {
            if let Err(err) = conn.set_blocking(false) {
                warn!(?err, "failed to switch connection back to non-blocking mode");
            }
        }

        let stream = conn.into_stream();
        debug!(?outcome, "command cycle complete");
        if result_tx.send(crate::queue::ReturnItem { token: item.token, stream, outcome }).is_err() {
            break;
        }
    }
}
