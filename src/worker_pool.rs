//! Bounded worker pool primitive (spec §4.H): fixed-size, ordered result
//! return, participates in cooperative cancellation.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tokio::sync::Semaphore;

use crate::error::{PipelineError, Result};

/// Shared flag checked by in-flight worker tasks at their next
/// suspension point (spec §5 "cooperative at each suspension point").
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Bail out with [`PipelineError::Cancelled`] if cancellation has been
    /// requested; call at each suspension point.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A bounded pool of `size` worker threads (spec §4.H). Built on a
/// dedicated `rayon::ThreadPool` rather than the process-wide pool
/// (`src/process_pool.rs`) so the pipeline can size it independently of
/// other concurrent CPU-bound work. `size` is also used to bound
/// [`map_ordered_async`](WorkerPool::map_ordered_async)'s in-flight task
/// count, so the one pool sizes both the CPU-bound (rayon) and
/// subprocess-bound (tokio) pre-processing paths identically.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<Self> {
        let size = size.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("goesvfi-worker-{i}"))
            .build()
            .map_err(|e| PipelineError::InvalidInput(format!("failed to build worker pool: {e}")))?;
        Ok(WorkerPool { pool, size })
    }

    /// Run `f(index)` for every `index` in `0..count`, returning results in
    /// index order regardless of completion order (spec §4.C "Ordering is
    /// preserved: workers return results keyed by input index and the
    /// orchestrator assembles them in order"). The whole batch fails (and
    /// partial successes are discarded, per spec §7) if any single task
    /// fails or `cancel` is observed.
    pub fn map_ordered<T, F>(&self, count: usize, cancel: &CancelToken, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync,
    {
        self.pool.install(|| {
            (0..count)
                .into_par_iter()
                .map(|index| {
                    cancel.check()?;
                    f(index)
                })
                .collect()
        })
    }

    /// Async counterpart to [`map_ordered`](WorkerPool::map_ordered) for
    /// pre-processing steps that await an external subprocess (colourise)
    /// as well as doing CPU-bound work (crop), which can't run inside a
    /// `rayon` closure. At most `size` invocations of `f` are in flight at
    /// once; results are returned in index order regardless of completion
    /// order, same ordering guarantee as the synchronous pool.
    pub async fn map_ordered_async<T, Fut, F>(&self, count: usize, cancel: &CancelToken, f: F) -> Result<Vec<T>>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        F: Fn(usize) -> Fut,
    {
        let semaphore = Arc::new(Semaphore::new(self.size));
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let permits = semaphore.clone();
            let cancel = cancel.clone();
            let fut = f(index);
            handles.push(tokio::spawn(async move {
                let _permit = permits.acquire_owned().await.expect("semaphore closed unexpectedly");
                cancel.check()?;
                fut.await
            }));
        }

        let mut results = Vec::with_capacity(count);
        for handle in handles {
            let outcome: Result<T> = handle
                .await
                .map_err(|e| PipelineError::InvalidInput(format!("pre-processing task panicked: {e}")))?;
            results.push(outcome?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn results_are_in_submitted_order() {
        let pool = WorkerPool::new(4).unwrap();
        let cancel = CancelToken::new();
        let results = pool
            .map_ordered(10, &cancel, |i| Ok::<usize, PipelineError>(i * i))
            .unwrap();
        assert_eq!(results, (0..10).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn a_single_failure_fails_the_whole_batch() {
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        let result = pool.map_ordered(5, &cancel, |i| {
            if i == 3 {
                Err(PipelineError::InvalidInput("boom".into()))
            } else {
                Ok(i)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn cancellation_is_observed() {
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let calls = AtomicUsize::new(0);
        let result = pool.map_ordered(5, &cancel, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<(), PipelineError>(())
        });
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn async_map_ordered_preserves_order_and_bounds_concurrency() {
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let in_flight_c = in_flight.clone();
        let max_in_flight_c = max_in_flight.clone();
        let results = pool
            .map_ordered_async(6, &cancel, move |i| {
                let in_flight = in_flight_c.clone();
                let max_in_flight = max_in_flight_c.clone();
                async move {
                    let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_in_flight.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<usize, PipelineError>(i * 2)
                }
            })
            .await
            .unwrap();

        assert_eq!(results, (0..6).map(|i| i * 2).collect::<Vec<_>>());
        assert!(max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn async_map_ordered_observes_cancellation() {
        let pool = WorkerPool::new(2).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = pool
            .map_ordered_async(4, &cancel, |i| async move { Ok::<usize, PipelineError>(i) })
            .await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }
}
