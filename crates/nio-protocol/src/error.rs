use thiserror::Error;

/// Maps directly onto the reply-token families of §7: a malformed command
/// line, a client-supplied argument violation, or an internal failure.
#[derive(Error, Debug, Clone)]
pub enum ReplyError {
    #[error("malformed command")]
    Protocol,
    #[error("CLIENT_ERROR {0}")]
    Client(String),
    #[error("SERVER_ERROR {0}")]
    Server(String),
}

impl ReplyError {
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    pub fn to_wire(&self) -> Vec<u8> {
        match self {
            Self::Protocol => b"ERROR\r\n".to_vec(),
            Self::Client(msg) => format!("CLIENT_ERROR {msg}\r\n").into_bytes(),
            Self::Server(msg) => format!("SERVER_ERROR {msg}\r\n").into_bytes(),
        }
    }
}
