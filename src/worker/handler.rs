use crate::ring::Job;

/// Processes jobs pulled by a [`WorkerAgent`](super::WorkerAgent).
#[tonic::async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, job: Job) -> Result<(), String>;
}

/// Logs each job and reports success.
#[derive(Debug, Clone, Default)]
pub struct LoggingHandler {
    worker: String,
}

impl LoggingHandler {
    pub fn new(worker: impl Into<String>) -> Self {
        Self {
            worker: worker.into(),
        }
    }
}

#[tonic::async_trait]
impl JobHandler for LoggingHandler {
    async fn handle(&self, job: Job) -> Result<(), String> {
        tracing::info!(worker = %self.worker, filename = %job.filename, "Processing job");
        Ok(())
    }
}
