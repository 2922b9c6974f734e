use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Formatted event exceeded its maximum length and was not sent
    #[error("{kind} event is {len} bytes, limit is {max}")]
    EventTooLong {
        kind: &'static str,
        len: usize,
        max: usize,
    },

    #[error("formatting error")]
    Format(#[from] std::fmt::Error),

    #[error("write to subscriber {0} timed out")]
    WriteTimeout(String),

    #[error("{0} channel closed")]
    ChannelClosed(&'static str),
}

pub type HubResult<T> = Result<T, HubError>;
