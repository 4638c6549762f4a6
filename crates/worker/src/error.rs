use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("store error: {0}")]
    Store(#[from] occasio_store::StoreError),

    #[error("directory error: {0}")]
    Directory(#[from] occasio_directory::DirectoryError),

    #[error("queue error: {0}")]
    Queue(#[from] occasio_queue::QueueError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
