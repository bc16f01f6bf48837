//! Process-wide CPU-bound worker pool (SPEC_FULL.md §10.6), grounded on the
//! original's `GlobalProcessPool` singleton: a single pool shared across the
//! process rather than one per pipeline run, so concurrent pipelines (e.g.
//! embedders driving several at once) don't oversubscribe the machine.

use std::sync::OnceLock;

static GLOBAL_POOL: OnceLock<rayon::ThreadPool> = OnceLock::new();

fn global_pool() -> &'static rayon::ThreadPool {
    GLOBAL_POOL.get_or_init(|| {
        let workers = num_cpus::get().max(1).min(4);
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("goesvfi-global-{i}"))
            .build()
            .expect("failed to build global process pool")
    })
}

/// Run `f` on the process-wide pool, scoped to at most `max_concurrent`
/// concurrently in-flight closures from this caller (a cooperative limit
/// layered on top of the pool's fixed thread count, mirroring the
/// original's `auto_scale`/`scale_threshold` admission control).
pub fn batch_context<T, F>(max_concurrent: usize, items: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    let pool = global_pool();
    pool.install(|| {
        use rayon::prelude::*;
        (0..items)
            .collect::<Vec<_>>()
            .chunks(max_concurrent.max(1))
            .flat_map(|chunk| chunk.par_iter().map(|&i| f(i)).collect::<Vec<_>>())
            .collect()
    })
}
