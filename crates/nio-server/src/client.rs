use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::Duration;

use nio_protocol::{STATUS_CMD, SHUTDOWN_CMD};

/// Connects to a server on `127.0.0.1:port`, sends `cmd_line` and reads one
/// reply line. Used by `--stop`/`--status`; prints "not running." the same
/// way the original CLI does when nothing answers.
fn server_cmd(port: u16, cmd_line: &str) -> String {
    let Ok(stream) = TcpStream::connect(("127.0.0.1", port)) else {
        return "not running.".to_string();
    };
    let _ = stream.set_read_timeout(Some(Duration::from_secs(3)));
    let mut writer = match stream.try_clone() {
        Ok(clone) => clone,
        Err(_) => return "not running.".to_string(),
    };

    if writer.write_all(format!("{cmd_line}\r\n").as_bytes()).is_err() {
        return "not running.".to_string();
    }

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(n) if n > 0 => line.trim_end().to_string(),
        _ => "not running.".to_string(),
    }
}

pub fn stop(port: u16) -> String {
    server_cmd(port, SHUTDOWN_CMD)
}

pub fn status(port: u16) -> String {
    server_cmd(port, STATUS_CMD)
}
