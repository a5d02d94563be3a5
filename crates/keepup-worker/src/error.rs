use keepup_storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
