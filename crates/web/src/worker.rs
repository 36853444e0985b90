use std::time::Duration;

use storage::services::{JobWorker, Materializer};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::state::AppState;

/// Background tasks draining the ranking job queue.
pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        state: &AppState,
        materializer: Materializer,
        workers: usize,
        poll_interval: Duration,
    ) -> Self {
        let (shutdown, receiver) = watch::channel(false);

        let handles = (0..workers.max(1))
            .map(|id| {
                let worker = JobWorker::new(
                    id,
                    state.coordinator.clone(),
                    materializer.clone(),
                    poll_interval,
                );
                tokio::spawn(worker.run(receiver.clone()))
            })
            .collect();

        Self { shutdown, handles }
    }

    /// Signals every worker and waits for in-flight jobs to finish.
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            tracing::warn!("job workers already stopped");
        }

        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("job worker panicked: {}", e);
            }
        }
    }
}
