use crate::dataset::Dataset;
use crate::error::{Error, Result};

use rayon::{ThreadPool, ThreadPoolBuilder};
use std::time::Instant;
use tracing::info;

/// Handle shared by every stage of one job: owns the worker pool the
/// partitions are evaluated on. Built explicitly and released when dropped,
/// so every exit path (errors and unwinding included) tears it down.
pub struct ExecutionContext {
    app_name: String,
    pool: ThreadPool,
    started: Instant,
}

impl ExecutionContext {

    /// `num_threads == 0` lets the pool pick one worker per available core.
    pub fn new(app_name: &str, num_threads: usize) -> Result<ExecutionContext> {

        let prefix = app_name.to_owned();
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |i| format!("{}-worker-{}", prefix, i))
            .build()?;

        info!(app_name, threads = pool.current_num_threads(), "started execution context");

        Ok(Self {
            app_name: app_name.to_owned(),
            pool,
            started: Instant::now(),
        })
    }

    /// Runs `job` with a fresh context and releases the context afterwards,
    /// whatever `job` returns.
    pub fn scoped<R, F>(app_name: &str, num_threads: usize, job: F) -> Result<R>
    where
        F: FnOnce(&ExecutionContext) -> Result<R>,
    {
        let ctx = ExecutionContext::new(app_name, num_threads)?;
        job(&ctx)
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `op` inside the worker pool, parallel iterators started from `op`
    /// use this context's workers.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Declares every file matching `pattern` as input, one partition per
    /// file and one element per line. Nothing is read yet.
    pub fn text_file(&self, pattern: &str) -> Result<Dataset<'_, String>> {

        let entries = glob::glob(pattern).map_err(|source| Error::Pattern {
            pattern: pattern.to_owned(),
            source,
        })?;

        let mut partitions = Vec::new();
        for entry in entries {
            let path = entry?;
            if path.is_file() {
                partitions.push(path);
            }
        }
        partitions.sort();

        if partitions.is_empty() {
            return Err(Error::NoInput(pattern.to_owned()));
        }

        info!(pattern, partitions = partitions.len(), "declared text input");
        Ok(Dataset::from_files(self, partitions))
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        info!(
            app_name = %self.app_name,
            elapsed_secs = self.started.elapsed().as_secs(),
            "stopped execution context"
        );
    }
}
