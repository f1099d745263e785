//! Generic async job handling
//!
//! Background work runs on its own thread with a single-threaded tokio
//! runtime; the UI thread polls the result without ever blocking.

use anyhow::{anyhow, Result};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tokio::runtime::Builder;

/// Helper struct for async jobs - polls a background task
pub struct AsyncJob<T> {
    receiver: Option<Receiver<Result<T>>>,
}

impl<T> AsyncJob<T> {
    /// Create a new async job with the given receiver
    pub fn new(receiver: Receiver<Result<T>>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Poll the job for completion
    /// Returns Some(result) if the job has completed, None if still running
    pub fn poll(&mut self) -> Option<Result<T>> {
        if let Some(rx) = &self.receiver {
            match rx.try_recv() {
                Ok(res) => {
                    self.receiver = None;
                    return Some(res);
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.receiver = None;
                    return Some(Err(anyhow!("Worker task disconnected")));
                }
            }
        }
        None
    }

    /// Check if the job is still running
    pub fn is_running(&self) -> bool {
        self.receiver.is_some()
    }
}

/// Run `builder()` to completion on a fresh thread and hand back a pollable job.
pub fn spawn_job<T, FutBuilder, Fut>(builder: FutBuilder) -> AsyncJob<T>
where
    T: Send + 'static,
    FutBuilder: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<T>> + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = match Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime.block_on(builder()),
            Err(e) => Err(anyhow!("Failed to create async runtime: {}", e)),
        };
        let _ = tx.send(result);
    });
    AsyncJob::new(rx)
}
