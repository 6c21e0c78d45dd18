use std::io::{Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nio_db::Engine;
use nio_net::{Reactor, spawn_workers};
use nio_protocol::Dispatcher;

/// Spawns a full reactor + worker pool + dispatcher stack on an ephemeral
/// port, in the style of `flux-network`'s own `tcp_roundtrip` test: raw
/// threads, a real socket, and assertions on the bytes that come back.
fn spawn_server(dir: &std::path::Path) -> u16 {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let mut reactor = Reactor::bind(addr, 16).unwrap();
    let port = reactor.local_port();

    let engine = Arc::new(Engine::open(dir, 4, 0).unwrap());
    let dispatcher = Arc::new(Dispatcher::new(engine, "0.1.0-test", false));
    let (work_tx, work_rx) = nio_net::channel_pair();
    let (result_tx, result_rx) = nio_net::channel_pair();
    let handler: Arc<nio_net::Handler> = Arc::new(move |conn| dispatcher.handle(conn));
    let _workers = spawn_workers(2, work_rx, result_tx, port, handler);

    thread::spawn(move || {
        let _ = reactor.run(work_tx, result_rx);
    });
    // Give the reactor a moment to start polling before the test connects.
    thread::sleep(Duration::from_millis(50));
    port
}

fn roundtrip(stream: &mut TcpStream, request: &[u8], expect_len: usize) -> Vec<u8> {
    stream.write_all(request).unwrap();
    let mut buf = vec![0u8; expect_len];
    stream.read_exact(&mut buf).unwrap();
    buf
}

#[test]
fn set_then_get_round_trips_value() {
    let dir = tempfile::tempdir().unwrap();
    let port = spawn_server(dir.path());
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();

    let stored = roundtrip(&mut stream, b"set foo 0 0 5\r\nhello\r\n", "STORED\r\n".len());
    assert_eq!(stored, b"STORED\r\n");

    let reply = roundtrip(&mut stream, b"get foo\r\n", b"VALUE foo 0 5\r\nhello\r\nEND\r\n".len());
    assert_eq!(reply, b"VALUE foo 0 5\r\nhello\r\nEND\r\n");
}

#[test]
fn add_then_add_again_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let port = spawn_server(dir.path());
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();

    let first = roundtrip(&mut stream, b"add foo 0 0 1\r\nx\r\n", b"STORED\r\n".len());
    assert_eq!(first, b"STORED\r\n");

    let second = roundtrip(&mut stream, b"add foo 0 0 1\r\ny\r\n", b"EXISTS\r\n".len());
    assert_eq!(second, b"EXISTS\r\n");
}

#[test]
fn noreply_suppresses_every_byte() {
    let dir = tempfile::tempdir().unwrap();
    let port = spawn_server(dir.path());
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();

    stream.write_all(b"set foo 0 0 1 noreply\r\nx\r\n").unwrap();
    // Immediately follow with a command that does reply; if noreply leaked
    // a byte, this read would desynchronize and fail the exact-match below.
    let reply = roundtrip(&mut stream, b"get foo\r\n", b"VALUE foo 0 1\r\nx\r\nEND\r\n".len());
    assert_eq!(reply, b"VALUE foo 0 1\r\nx\r\nEND\r\n");
}

#[test]
fn status_from_loopback_reports_running() {
    let dir = tempfile::tempdir().unwrap();
    let port = spawn_server(dir.path());
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let reply = roundtrip(&mut stream, b"__/status/__\r\n", b"running.\r\n".len());
    assert_eq!(reply, b"running.\r\n");
}

#[test]
fn incr_wraps_numeric_value() {
    let dir = tempfile::tempdir().unwrap();
    let port = spawn_server(dir.path());
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();

    let stored = roundtrip(&mut stream, b"set n 0 0 8\r\n\x0a\x00\x00\x00\x00\x00\x00\x00\r\n", b"STORED\r\n".len());
    assert_eq!(stored, b"STORED\r\n");

    let reply = roundtrip(&mut stream, b"incr n 3\r\n", b"13\r\n".len());
    assert_eq!(reply, b"13\r\n");
}
