//! Flush executors
//!
//! The indexer never runs database I/O on a producer's thread; it hands a
//! job to a [`FlushExecutor`]. [`BackgroundExecutor`] is the production
//! implementation: a few named threads pulling jobs off a crossbeam channel.
//! [`InlineExecutor`] runs jobs immediately and is handy in tests and for
//! single-threaded tools.

use crate::error::WorkerError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// One unit of flush work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs flush jobs off the caller's path
pub trait FlushExecutor: Send + Sync {
    /// Queue a job; the job does its own error reporting
    fn submit(&self, job: Job) -> Result<(), WorkerError>;
}

/// Runs every job on the submitting thread
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

impl FlushExecutor for InlineExecutor {
    fn submit(&self, job: Job) -> Result<(), WorkerError> {
        run_job("inline", job);
        Ok(())
    }
}

/// Messages to flush worker threads
enum ExecutorMessage {
    Run(Job),
    Shutdown,
}

/// Fixed pool of flush threads fed by an unbounded channel
pub struct BackgroundExecutor {
    sender: Sender<ExecutorMessage>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundExecutor {
    /// Spawn `workers` flush threads
    pub fn new(workers: usize) -> Result<Self, WorkerError> {
        let (sender, receiver) = unbounded();
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers.max(1) {
            let name = format!("db-flush-{}", id);
            let receiver = receiver.clone();

            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&name, receiver))
                .map_err(|e| WorkerError::SpawnFailed {
                    name: format!("db-flush-{}", id),
                    reason: e.to_string(),
                })?;
            handles.push(handle);
        }

        Ok(Self {
            sender,
            handles: Mutex::new(handles),
        })
    }

    /// Finish queued jobs, then stop and join all threads
    ///
    /// Jobs submitted after this returns are rejected with
    /// [`WorkerError::QueueClosed`].
    pub fn shutdown(&self) -> Result<(), WorkerError> {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();

        for _ in &handles {
            let _ = self.sender.send(ExecutorMessage::Shutdown);
        }

        let mut result = Ok(());
        for handle in handles {
            let name = handle.thread().name().unwrap_or("db-flush").to_string();
            if handle.join().is_err() {
                result = Err(WorkerError::Panicked { name });
            }
        }
        result
    }

    fn is_running(&self) -> bool {
        !self.handles.lock().is_empty()
    }
}

impl FlushExecutor for BackgroundExecutor {
    fn submit(&self, job: Job) -> Result<(), WorkerError> {
        // Held across the send so a job can't land behind the shutdown messages
        let handles = self.handles.lock();
        if handles.is_empty() {
            return Err(WorkerError::QueueClosed);
        }

        self.sender
            .send(ExecutorMessage::Run(job))
            .map_err(|_| WorkerError::QueueClosed)
    }
}

impl Drop for BackgroundExecutor {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.shutdown();
        }
    }
}

fn worker_loop(name: &str, receiver: Receiver<ExecutorMessage>) {
    debug!("Flush worker {} started", name);

    while let Ok(msg) = receiver.recv() {
        match msg {
            ExecutorMessage::Run(job) => run_job(name, job),
            ExecutorMessage::Shutdown => break,
        }
    }

    debug!("Flush worker {} finished", name);
}

/// Run a job, containing any panic so the worker survives
fn run_job(name: &str, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!("Flush job on {} panicked: {}", name, message);
    }
}
