//! Worker Pool
//!
//! A fixed set of worker threads, each owning one connection slot.
//!
//! ## Responsibilities
//! - Spawn exactly `size` workers up front
//! - Hand out free slots, blocking while all are bound
//! - Return a slot to the pool when its job finishes (even on panic)
//! - Join every worker on shutdown
//!
//! ## Slot Lifecycle
//! ```text
//!   free ──acquire()──► reserved ──Slot::run(job)──► bound ──job done──► free
//!                          │
//!                          └──Slot dropped unused──────────────────────► free
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Sender};
use parking_lot::{Condvar, Mutex};

use crate::error::{KvError, Result};

/// Unit of work run on a worker
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Free slot ids plus the condition signalled when one is returned
struct Slots {
    free: Mutex<Vec<usize>>,
    released: Condvar,
}

impl Slots {
    fn release(&self, id: usize) {
        self.free.lock().push(id);
        self.released.notify_one();
    }
}

/// Fixed-size pool of connection workers
pub struct WorkerPool {
    slots: Arc<Slots>,
    senders: Vec<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(KvError::Pool("pool size must be at least 1".to_string()));
        }

        let slots = Arc::new(Slots {
            // Reversed so that slot 0 is handed out first
            free: Mutex::new((0..size).rev().collect()),
            released: Condvar::new(),
        });

        let mut senders = Vec::with_capacity(size);
        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let (tx, rx) = channel::unbounded::<Job>();
            let slots = Arc::clone(&slots);
            let handle = thread::Builder::new()
                .name(format!("tablekv-worker-{}", id))
                .spawn(move || {
                    for job in rx {
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::error!("Job on worker {} panicked", id);
                        }
                        slots.release(id);
                    }
                    tracing::trace!("Worker {} exiting", id);
                })?;
            senders.push(tx);
            workers.push(handle);
        }

        tracing::debug!("Worker pool started with {} slots", size);
        Ok(Self {
            slots,
            senders,
            workers,
            size,
        })
    }

    /// Block until a slot is free and reserve it
    pub fn acquire(&self) -> Slot<'_> {
        let mut free = self.slots.free.lock();
        loop {
            if let Some(id) = free.pop() {
                return Slot::new(self, id);
            }
            self.slots.released.wait(&mut free);
        }
    }

    /// Like [`acquire`](Self::acquire) but give up after `timeout`
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<Slot<'_>> {
        let deadline = Instant::now() + timeout;
        let mut free = self.slots.free.lock();
        loop {
            if let Some(id) = free.pop() {
                return Some(Slot::new(self, id));
            }
            if self.slots.released.wait_until(&mut free, deadline).timed_out() {
                return free.pop().map(|id| Slot::new(self, id));
            }
        }
    }

    /// Total number of slots
    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.slots.free.lock().len()
    }

    /// Slots currently reserved or running a job
    pub fn bound(&self) -> usize {
        self.size - self.available()
    }

    /// Stop accepting jobs and wait for every running job to finish
    pub fn shutdown(mut self) {
        self.join_workers();
    }

    fn join_workers(&mut self) {
        // Closing the channels ends each worker loop after its current job
        self.senders.clear();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Worker thread panicked during shutdown");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.join_workers();
    }
}

/// A reserved slot; run exactly one job on it or drop it to give it back
pub struct Slot<'a> {
    pool: &'a WorkerPool,
    id: usize,
    dispatched: bool,
}

impl<'a> Slot<'a> {
    fn new(pool: &'a WorkerPool, id: usize) -> Self {
        Self {
            pool,
            id,
            dispatched: false,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Run `job` on this slot's worker; the slot is freed when it returns
    pub fn run<F>(mut self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.senders[self.id]
            .send(Box::new(job))
            .map_err(|_| KvError::Pool(format!("worker {} has stopped", self.id)))?;
        self.dispatched = true;
        Ok(())
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        if !self.dispatched {
            self.pool.slots.release(self.id);
        }
    }
}
