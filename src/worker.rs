//! Background worker threads with cooperative cancellation
//!
//! Every pipeline runs on its own named thread. A worker is stopped by
//! clearing its [`RunFlag`]; the loop notices at the top of its next
//! iteration, so cancellation is bounded by one poll interval plus whatever
//! I/O is in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::Error;

/// Shared "keep running" flag
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// A flag that starts out running
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Ask the owning loop to exit
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned background thread
pub struct Worker {
    name: String,
    flag: RunFlag,
    thread_handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a thread running `body` until it returns
    ///
    /// The body receives the worker's flag and is expected to return soon
    /// after the flag is cleared.
    pub fn spawn<F>(name: impl Into<String>, flag: RunFlag, body: F) -> Result<Self, Error>
    where
        F: FnOnce(RunFlag) + Send + 'static,
    {
        let name = name.into();
        let flag_for_loop = flag.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || body(flag_for_loop))
            .map_err(|e| Error::Worker(format!("{}: {}", name, e)))?;

        tracing::debug!("Worker {} started", name);

        Ok(Self {
            name,
            flag,
            thread_handle: Some(handle),
        })
    }

    /// Spawn a polling loop
    ///
    /// `step` performs at most one unit of work and reports whether it found
    /// any. The thread sleeps for `idle` only after an empty step, so a
    /// backlog drains back-to-back.
    pub fn spawn_polling<F>(name: impl Into<String>, idle: Duration, mut step: F) -> Result<Self, Error>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self::spawn(name, RunFlag::new(), move |flag| {
            while flag.is_running() {
                if !step() {
                    thread::sleep(idle);
                }
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flag(&self) -> &RunFlag {
        &self.flag
    }

    pub fn is_running(&self) -> bool {
        self.flag.is_running()
    }

    /// Clear the flag and wait for the thread to finish
    pub fn stop(&mut self) {
        self.flag.stop();

        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("Worker {} panicked", self.name);
            } else {
                tracing::debug!("Worker {} stopped", self.name);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_polling_worker_stops() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_for_loop = counter.clone();

        let mut worker = Worker::spawn_polling("test-poll", Duration::from_millis(1), move || {
            counter_for_loop.fetch_add(1, Ordering::Relaxed);
            false
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        assert!(worker.is_running());
        worker.stop();
        assert!(!worker.is_running());

        let after_stop = counter.load(Ordering::Relaxed);
        assert!(after_stop > 0);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(counter.load(Ordering::Relaxed), after_stop);
    }

    #[test]
    fn test_external_flag() {
        let flag = RunFlag::new();
        let worker = Worker::spawn("test-flag", flag.clone(), |flag| {
            while flag.is_running() {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();

        assert_eq!(worker.name(), "test-flag");
        flag.stop();
        drop(worker);
        assert!(!flag.is_running());
    }
}
