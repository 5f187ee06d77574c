use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("malformed tick: {0}")]
    MalformedTick(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("feed stalled: no message for {0} ms")]
    FeedStalled(u64),

    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
