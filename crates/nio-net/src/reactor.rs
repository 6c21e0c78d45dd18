use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, TcpStream as StdTcpStream};
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, trace, warn};

use crate::queue::{ReturnReceiver, WorkSender};

const LISTENER_TOKEN: Token = Token(0);
const FIRST_CLIENT_TOKEN: usize = 1;
/// Bounded so the loop periodically rechecks the shutdown flag and drains
/// the worker return queue even when no socket is ready.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The single-threaded multiplexer owning the listener and every idle client
/// socket (§4.1). Connections dispatched to a worker are removed from the
/// poller entirely and only rejoin once the worker hands them back.
pub struct Reactor {
    poll: Poll,
    listener: TcpListener,
    idle: HashMap<Token, TcpStream>,
    next_token: usize,
    backlog_port: u16,
    shutdown: Arc<AtomicBool>,
}

impl Reactor {
    pub fn bind(addr: SocketAddr, backlog: u32) -> io::Result<Self> {
        let std_listener = {
            use std::net::TcpListener as StdListener;
            let listener = StdListener::bind(addr)?;
            // std's bind(2)+listen(2) hardcodes a 128 backlog; listen(2) may
            // be called again on the same socket to change it, so re-apply
            // the configured value directly, matching the original's
            // listen(sock, backlog) call.
            let backlog = i32::try_from(backlog).unwrap_or(i32::MAX);
            if unsafe { libc::listen(listener.as_raw_fd(), backlog) } != 0 {
                return Err(io::Error::last_os_error());
            }
            listener.set_nonblocking(true)?;
            listener
        };
        let mut listener = TcpListener::from_std(std_listener);
        let mut poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        Ok(Self {
            poll,
            listener,
            idle: HashMap::new(),
            next_token: FIRST_CLIENT_TOKEN,
            backlog_port: addr.port(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_port(&self) -> u16 {
        self.backlog_port
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    fn next_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    fn accept_all(&mut self, work_tx: &WorkSender) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        drop(stream);
                        continue;
                    }
                    let token = self.next_token();
                    if let Err(err) = self.poll.registry().register(&mut stream, token, Interest::READABLE) {
                        warn!(?err, "failed to register accepted connection");
                        continue;
                    }
                    debug!(%peer, "connect");
                    self.idle.insert(token, stream);
                    let _ = work_tx;
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => {
                    warn!(?err, "accept failed");
                    break;
                }
            }
        }
    }

    fn dispatch(&mut self, token: Token, work_tx: &WorkSender) {
        let Some(mut stream) = self.idle.remove(&token) else { return };
        if let Err(err) = self.poll.registry().deregister(&mut stream) {
            warn!(?err, "failed to deregister dispatched connection");
        }
        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(_) => return,
        };
        if work_tx.send(crate::queue::WorkItem { token, stream, peer }).is_err() {
            warn!("work queue closed, dropping connection");
        }
    }

    fn drain_returns(&mut self, result_rx: &ReturnReceiver) {
        while let Ok(item) = result_rx.try_recv() {
            match item.outcome {
                crate::outcome::CommandOutcome::Continue => {
                    let mut stream = item.stream;
                    if let Err(err) = crate::nonblock::set_blocking(&stream, false) {
                        warn!(?err, "failed to re-arm non-blocking mode");
                    }
                    if let Err(err) = self.poll.registry().register(&mut stream, item.token, Interest::READABLE) {
                        warn!(?err, "failed to re-register returned connection");
                        continue;
                    }
                    self.idle.insert(item.token, stream);
                }
                crate::outcome::CommandOutcome::Close => {
                    drop(item.stream);
                }
                crate::outcome::CommandOutcome::Shutdown => {
                    drop(item.stream);
                    self.shutdown.store(true, Ordering::SeqCst);
                }
            }
        }
    }

    /// Runs until the shutdown flag is observed set, handing every readable
    /// client socket off to `work_tx` and re-registering whatever comes back
    /// on `result_rx`.
    pub fn run(&mut self, work_tx: WorkSender, result_rx: ReturnReceiver) -> io::Result<()> {
        let mut events = Events::with_capacity(1024);
        loop {
            match self.poll.poll(&mut events, Some(POLL_INTERVAL)) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }

            for event in events.iter() {
                if event.token() == LISTENER_TOKEN {
                    self.accept_all(&work_tx);
                } else {
                    self.dispatch(event.token(), &work_tx);
                }
            }

            self.drain_returns(&result_rx);

            if self.shutdown.load(Ordering::SeqCst) {
                trace!("reactor observed shutdown flag, exiting loop");
                break;
            }
        }
        Ok(())
    }
}

/// Opens a throwaway loopback connection to the listen port and sends a
/// single byte, purely to unblock the reactor's poll once the shutdown flag
/// has been set. Mirrors the wake mechanism of the system this was modeled
/// on; any failure here is harmless since the reactor's bounded poll
/// interval will observe the flag shortly regardless.
pub fn self_wake(port: u16) {
    if let Ok(mut stream) = StdTcpStream::connect(("127.0.0.1", port)) {
        use std::io::Write;
        let _ = stream.write_all(&[0u8]);
    }
}
