use crate::utils::CompressorError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Failed to start worker thread: {0}")]
    Spawn(String),

    #[error("Worker is no longer accepting requests")]
    Disconnected,
}

pub type WorkerResult<T> = Result<T, WorkerError>;

impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        WorkerError::Spawn(err.to_string())
    }
}

impl From<WorkerError> for CompressorError {
    fn from(err: WorkerError) -> Self {
        CompressorError::WorkerCrashed(err.to_string())
    }
}
