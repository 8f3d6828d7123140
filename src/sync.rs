use std::future::Future;

use tokio::task::JoinHandle;

use crate::error::AppError;

/// Handle to a background reconciliation. Dropping it leaves the task
/// running; `abort` cancels it; `finished` waits for the number of records
/// it applied.
#[derive(Debug)]
pub struct SyncHandle {
    task: JoinHandle<Result<usize, AppError>>,
}

impl SyncHandle {
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = Result<usize, AppError>> + Send + 'static,
    {
        Self {
            task: tokio::spawn(fut),
        }
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn finished(self) -> Result<usize, AppError> {
        self.task
            .await
            .map_err(|e| AppError::Task(e.to_string()))?
    }
}
