//! Fixed-size pool of worker threads.
//!
//! Workers never look at the interrupt flag; only the controller that owns
//! the pool decides when to stop, and shuts the pool down from one place.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers named `loop-worker-<n>`.
    pub fn new(size: usize) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("loop-worker-{}", id))
                .spawn(move || worker_loop(id, &receiver))?;
            workers.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues a job. Fails only if every worker has exited.
    pub fn execute(&self, job: Job) -> io::Result<()> {
        self.sender
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "pool is shut down"))?
            .send(job)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "all workers exited"))
    }

    /// Stops accepting jobs and joins the workers once the queue is drained.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.sender = None;
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.join() {
                warn!("Worker panicked: {:?}", e);
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(id: usize, receiver: &Mutex<Receiver<Job>>) {
    loop {
        let job = {
            let guard = receiver.lock().unwrap_or_else(|e| e.into_inner());
            guard.recv()
        };
        match job {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
    debug!("loop-worker-{} exiting", id);
}
