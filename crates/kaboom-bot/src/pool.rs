//! Fixed worker pool for fanned-out subtrees.
//!
//! A subtree crossing into the pool must already be detached into its own
//! tree; the queue is bounded, and a submit against a full queue runs the
//! job inline on the caller's thread instead of buffering without bound.

use crate::telemetry::SearchCounters;
use kaboom_core::tree::GameTree;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct SubtreePool {
    sender: Option<SyncSender<Job>>,
    workers: Vec<JoinHandle<()>>,
    inline_runs: AtomicU64,
}

impl SubtreePool {
    pub fn new(workers: usize, queue_depth: usize) -> SubtreePool {
        let workers = workers.max(1);
        let (sender, receiver) = sync_channel::<Job>(queue_depth.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let handles = (0..workers)
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                std::thread::spawn(move || worker_loop(receiver))
            })
            .collect();
        SubtreePool {
            sender: Some(sender),
            workers: handles,
            inline_runs: AtomicU64::new(0),
        }
    }

    /// Hands a detached subtree to the pool, or processes it synchronously
    /// on this thread when every queue slot is taken.
    pub fn dispatch<F>(&self, tree: GameTree, work: F)
    where
        F: FnOnce(GameTree) + Send + 'static,
    {
        self.submit_or_run(Box::new(move || work(tree)));
    }

    pub fn submit_or_run(&self, job: Job) {
        let Some(sender) = &self.sender else {
            job();
            return;
        };
        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) | Err(TrySendError::Disconnected(job)) => {
                self.inline_runs.fetch_add(1, Ordering::Relaxed);
                debug!("subtree queue full, running job inline");
                job();
            }
        }
    }

    /// Jobs that ran inline because the queue was full.
    pub fn inline_runs(&self) -> u64 {
        self.inline_runs.load(Ordering::Relaxed)
    }

    pub fn record_inline_runs(&self, counters: &SearchCounters) {
        SearchCounters::add(&counters.inline_fallbacks, self.inline_runs());
    }

    /// Drains the queue and joins every worker.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for SubtreePool {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        let job = {
            let guard = match receiver.lock() {
                Ok(guard) => guard,
                Err(_) => return,
            };
            guard.recv()
        };
        match job {
            Ok(job) => job(),
            Err(_) => return,
        }
    }
}
