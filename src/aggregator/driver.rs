//! Parallel driver (C10, spec §4.10)
//!
//! A worker pool sized to twice the number of logical CPUs drives the two independent fan-outs
//! named in §4.10: per-result-file loading and per-column statistics aggregation. The pool is an
//! injectable collaborator so constrained environments (`--offline`, or tests) can fall back to
//! plain serial execution without depending on a real thread pool.

use anyhow::Result;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Drives fan-out work either on a real `rayon` thread pool or, in serial mode, on the calling
/// thread. Either way, results come back in submission order regardless of completion order.
pub struct Driver {
    pool: Option<ThreadPool>,
}

impl Driver {
    /// Builds a pool sized to twice the number of logical CPUs (§4.10), or a serial driver when
    /// `offline` is set.
    pub fn new(offline: bool) -> Result<Self> {
        if offline {
            return Ok(Self::serial());
        }
        let threads = std::thread::available_parallelism().map_or(2, |n| n.get() * 2);
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
        Ok(Self { pool: Some(pool) })
    }

    /// A driver that runs every submitted task on the calling thread, in order.
    pub fn serial() -> Self {
        Self { pool: None }
    }

    /// Runs `tasks` to completion and returns their results in submission order.
    pub fn run_all<T, F>(&self, tasks: Vec<F>) -> Vec<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| {
                use rayon::prelude::*;
                tasks.into_par_iter().map(|task| task()).collect()
            }),
            None => tasks.into_iter().map(|task| task()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn serial_driver_preserves_submission_order() {
        let driver = Driver::serial();
        let tasks: Vec<_> = (0..5).map(|i| move || i * i).collect();
        assert_eq!(driver.run_all(tasks), vec![0, 1, 4, 9, 16]);
    }

    #[test]
    fn pooled_driver_preserves_submission_order() {
        let driver = Driver::new(false).unwrap();
        let tasks: Vec<_> = (0..8).map(|i| move || i).collect();
        assert_eq!(driver.run_all(tasks), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn pooled_driver_actually_runs_every_task() {
        let driver = Driver::new(false).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let counter = counter.clone();
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .collect();
        driver.run_all(tasks);
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }
}
