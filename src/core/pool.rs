use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::error::Result;

/// Progress of a single job, delivered in completion order
#[derive(Debug)]
pub enum JobEvent<R> {
    Started { key: String },
    Completed { key: String, result: R },
    Failed { key: String, error: String },
}

/// Bounded pool: `workers` tasks pull jobs from a shared queue.
/// One worker gives sequential execution through the same code path.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start processing `jobs`. The returned channel closes once every job
    /// has reported; a job that errors or panics becomes `JobEvent::Failed`.
    pub fn spawn<T, R, F, Fut>(&self, jobs: Vec<(String, T)>, job: F) -> mpsc::Receiver<JobEvent<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(jobs.len().max(1) * 2);
        let worker_count = self.workers.min(jobs.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let job = Arc::new(job);

        for worker in 0..worker_count {
            let queue = Arc::clone(&queue);
            let job = Arc::clone(&job);
            let tx = tx.clone();

            tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some((key, item)) = next else {
                        break;
                    };

                    tracing::debug!(worker, job = %key, "Starting job");
                    if tx.send(JobEvent::Started { key: key.clone() }).await.is_err() {
                        break;
                    }

                    let event = match tokio::spawn(job(item)).await {
                        Ok(Ok(result)) => JobEvent::Completed { key, result },
                        Ok(Err(e)) => JobEvent::Failed {
                            key,
                            error: e.to_string(),
                        },
                        Err(join_error) if join_error.is_panic() => JobEvent::Failed {
                            key,
                            error: format!("job panicked: {}", panic_message(join_error.into_panic())),
                        },
                        Err(join_error) => JobEvent::Failed {
                            key,
                            error: join_error.to_string(),
                        },
                    };

                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
        }

        rx
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstimatorError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn collect<R>(mut rx: mpsc::Receiver<JobEvent<R>>) -> Vec<JobEvent<R>> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn jobs(n: usize) -> Vec<(String, usize)> {
        (0..n).map(|i| (format!("sub-{}", i), i)).collect()
    }

    #[tokio::test]
    async fn test_single_worker_keeps_queue_order() {
        let pool = WorkerPool::new(1);
        let events = collect(pool.spawn(jobs(4), |i| async move { Ok(i * 10) })).await;

        let completed: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Completed { result, .. } => Some(*result),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec![0, 10, 20, 30]);
        assert_eq!(events.len(), 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failures_and_panics_do_not_stop_siblings() {
        let pool = WorkerPool::new(3);
        let events = collect(pool.spawn(jobs(6), |i| async move {
            match i {
                2 => Err(EstimatorError::Config("broken".to_string())),
                4 => panic!("boom"),
                _ => Ok(i),
            }
        }))
        .await;

        let mut completed = Vec::new();
        let mut failed = Vec::new();
        for event in events {
            match event {
                JobEvent::Completed { result, .. } => completed.push(result),
                JobEvent::Failed { key, error } => failed.push((key, error)),
                JobEvent::Started { .. } => {}
            }
        }
        completed.sort();
        failed.sort();

        assert_eq!(completed, vec![0, 1, 3, 5]);
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].0, "sub-2");
        assert!(failed[0].1.contains("broken"));
        assert_eq!(failed[1].0, "sub-4");
        assert!(failed[1].1.contains("boom"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let pool = WorkerPool::new(2);
        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let events = collect(pool.spawn(jobs(8), move |i| {
            let running = Arc::clone(&r);
            let peak = Arc::clone(&p);
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            }
        }))
        .await;

        assert_eq!(events.len(), 16);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_empty_queue_closes_channel() {
        let pool = WorkerPool::new(4);
        let events = collect(pool.spawn(Vec::<(String, usize)>::new(), |i| async move { Ok(i) })).await;
        assert!(events.is_empty());
        assert_eq!(WorkerPool::new(0).workers(), 1);
    }
}
