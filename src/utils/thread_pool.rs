use once_cell::sync::OnceCell;
use rayon::ThreadPoolBuilder;
use std::sync::Arc;

static THREAD_POOL: OnceCell<Arc<rayon::ThreadPool>> = OnceCell::new();

/// Default worker count when nothing is configured.
const DEFAULT_MAX_THREADS: usize = 8;

fn build_pool(num_threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("hash-db-worker-{i}"))
        .build()
}

/// Initialize the global hashing pool with `num_threads` workers
///
/// # Errors
///
/// Returns an error if the pool cannot be built or was already initialized
pub fn init_thread_pool(num_threads: usize) -> anyhow::Result<()> {
    let pool = build_pool(num_threads)?;
    THREAD_POOL
        .set(Arc::new(pool))
        .map_err(|_| anyhow::anyhow!("Thread pool already initialized"))?;
    Ok(())
}

/// The global hashing pool, or `None` if it could not be built
fn get_thread_pool() -> Option<Arc<rayon::ThreadPool>> {
    THREAD_POOL
        .get_or_try_init(|| {
            let num_threads = std::thread::available_parallelism()
                .map_or(1, std::num::NonZeroUsize::get)
                .min(DEFAULT_MAX_THREADS);
            build_pool(num_threads).map(Arc::new)
        })
        .ok()
        .cloned()
}

/// Run `f` inside the hashing pool. Falls back to rayon's global pool if
/// the dedicated one cannot be created.
pub fn run_in_pool<F, R>(f: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match get_thread_pool() {
        Some(pool) => pool.install(f),
        None => f(),
    }
}

/// Size the hashing pool from `[performance] parallel_threads`; 0 keeps the
/// default
///
/// # Errors
///
/// Returns an error if the pool has already been initialized
pub fn configure_from_config(config: &crate::config::Config) -> anyhow::Result<()> {
    if config.performance.parallel_threads > 0 {
        init_thread_pool(config.performance.parallel_threads)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_run_in_pool_uses_named_workers() {
        let names: Vec<String> = run_in_pool(|| {
            (0..4)
                .into_par_iter()
                .map(|_| std::thread::current().name().unwrap_or_default().to_string())
                .collect()
        });
        assert!(names.iter().all(|name| name.starts_with("hash-db-worker-")));
    }
}
