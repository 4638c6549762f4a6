use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("queue transport error: {0}")]
    Transport(#[from] lapin::Error),

    #[error("malformed queue payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

pub type QueueResult<T> = Result<T, QueueError>;
