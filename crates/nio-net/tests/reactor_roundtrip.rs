use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nio_net::{CommandOutcome, Reactor, spawn_workers};

/// An echo handler: whatever one line arrives, it is echoed straight back.
/// Exercises the full accept -> dispatch -> worker -> return cycle without
/// pulling in the memcached protocol layer.
#[test]
fn echoes_a_single_line_and_stays_open() {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let mut reactor = Reactor::bind(addr, 16).unwrap();
    let port = reactor.local_port();

    let (work_tx, work_rx) = nio_net::channel_pair();
    let (result_tx, result_rx) = nio_net::channel_pair();
    let handler: Arc<nio_net::Handler> = Arc::new(|conn| match conn.read_line(1024) {
        Ok(nio_net::Line::Complete(line)) => {
            let mut reply = line;
            reply.extend_from_slice(b"\r\n");
            conn.write_all(&reply).ok();
            CommandOutcome::Continue
        }
        _ => CommandOutcome::Close,
    });
    let _workers = spawn_workers(1, work_rx, result_tx, port, handler);

    thread::spawn(move || {
        let _ = reactor.run(work_tx, result_rx);
    });
    thread::sleep(Duration::from_millis(50));

    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream.write_all(b"hello\r\n").unwrap();
    let mut buf = [0u8; 7];
    stream.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"hello\r\n");
}
