use derivative::Derivative;
use error_stack::{report, Result};
use threadpool::ThreadPool;

use super::Error;

/// Simple thread pool executor
#[derive(Debug, Derivative)]
#[derivative(Default(new = "true"))]
pub struct Executor {
    #[derivative(Default(value = "ThreadPool::new(worker_count())"))]
    pool: ThreadPool,
}

/// NUM_CPU - 1 workers, at least one
fn worker_count() -> usize {
    match num_cpus::get() {
        0..2 => 1,
        n => n - 1,
    }
}

impl Executor {
    /// Execute a task
    pub fn execute<T>(&self, f: impl FnOnce() -> T + Send + 'static) -> Task<T>
    where
        T: Send + 'static,
    {
        let (send, recv) = oneshot::channel();
        self.pool.execute(move || {
            let _ = send.send(f());
        });
        Task { recv }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.pool.join();
    }
}

/// A handle for a spawned task in the executor
pub struct Task<T> {
    recv: oneshot::Receiver<T>,
}

impl<T> Task<T> {
    /// Wait for the task to complete and return the result
    ///
    /// Fails if the task panicked before sending its result
    pub fn wait(self) -> Result<T, Error> {
        self.recv.recv().map_err(|_| report!(Error::TaskDropped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_return_in_submission_order() {
        let executor = Executor::new();
        let tasks: Vec<_> = (0..8u64).map(|i| executor.execute(move || i * i)).collect();
        let results: Vec<u64> = tasks.into_iter().map(|t| t.wait().unwrap()).collect();
        assert_eq!(results, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn panicked_task_is_an_error() {
        let executor = Executor::new();
        let task = executor.execute(|| -> u32 { panic!("boom") });
        assert!(task.wait().is_err());
    }
}
