//! Dedicated runtime for query plans
//!
//! DataFusion operators can run for a long time between yield points. Plans
//! therefore execute on their own worker threads, while the caller's runtime
//! keeps the timers that bound them. A plan that never yields can then
//! occupy only these threads, and its deadline still fires on time.

use std::future::Future;

use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

pub struct QueryRuntime {
    // Always `Some` until drop.
    runtime: Option<Runtime>,
    worker_threads: usize,
}

impl QueryRuntime {
    pub fn new(worker_threads: usize) -> std::io::Result<Self> {
        let worker_threads = worker_threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("sqlsandbox-query")
            .enable_time()
            .build()?;

        log::debug!("Query runtime started with {} worker thread(s)", worker_threads);
        Ok(Self {
            runtime: Some(runtime),
            worker_threads,
        })
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Run `future` on the query threads. Aborting the handle cancels the
    /// task at its next yield point.
    pub fn spawn<F>(&self, future: F) -> Option<JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.as_ref().map(|runtime| runtime.spawn(future))
    }
}

impl Drop for QueryRuntime {
    fn drop(&mut self) {
        // Dropping a runtime blocks, which panics inside async code. Tasks
        // still running are left to finish on their own threads.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
