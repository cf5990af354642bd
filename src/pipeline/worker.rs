//! Background execution of style transfer requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};
use crate::model::ModelLoader;

use super::transfer::{StyleTransfer, StyleTransferRequest, StylizedResult};

struct Job {
    request: StyleTransferRequest,
    cancelled: Arc<AtomicBool>,
    reply: Sender<Result<StylizedResult>>,
}

/// A pool of threads running [`StyleTransfer::stylize`] off the
/// caller's thread.
///
/// Dropping the worker stops accepting jobs, lets queued jobs drain and
/// joins the threads.
pub struct Worker<L: ModelLoader> {
    pipeline: Arc<StyleTransfer<L>>,
    sender: Option<Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
}

impl<L> Worker<L>
where
    L: ModelLoader + 'static,
    L::Model: 'static,
{
    /// Spawn `threads` worker threads (at least one) sharing `pipeline`.
    ///
    /// # Errors
    ///
    /// Returns an error if a thread cannot be spawned.
    pub fn new(pipeline: Arc<StyleTransfer<L>>, threads: usize) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let threads = (0..threads.max(1))
            .map(|i| {
                let pipeline = Arc::clone(&pipeline);
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("stylecast-worker-{i}"))
                    .spawn(move || run_jobs(&pipeline, &receiver))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        tracing::debug!("Started {} stylization worker(s)", threads.len());

        Ok(Self {
            pipeline,
            sender: Some(sender),
            threads,
        })
    }

    /// Queue a request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerClosed`] if the worker threads are gone.
    pub fn submit(&self, request: StyleTransferRequest) -> Result<PendingStylization> {
        let (reply, result) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let job = Job {
            request,
            cancelled: Arc::clone(&cancelled),
            reply,
        };

        self.sender
            .as_ref()
            .ok_or(Error::WorkerClosed)?
            .send(job)
            .map_err(|_| Error::WorkerClosed)?;

        Ok(PendingStylization { cancelled, result })
    }

    /// The pipeline the workers run.
    #[must_use]
    pub fn pipeline(&self) -> &StyleTransfer<L> {
        &self.pipeline
    }
}

impl<L: ModelLoader> Drop for Worker<L> {
    fn drop(&mut self) {
        // Closing the queue ends each thread's receive loop
        drop(self.sender.take());

        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("Stylization worker panicked");
            }
        }
    }
}

fn run_jobs<L: ModelLoader>(pipeline: &StyleTransfer<L>, receiver: &Mutex<Receiver<Job>>) {
    loop {
        let job = {
            let receiver = receiver.lock().unwrap_or_else(PoisonError::into_inner);
            match receiver.recv() {
                Ok(job) => job,
                Err(_) => return,
            }
        };

        if job.cancelled.load(Ordering::Acquire) {
            tracing::debug!(
                "Skipping cancelled request for {}",
                job.request.content_path().display()
            );
            continue;
        }

        let result = pipeline.stylize(&job.request);

        if job.reply.send(result).is_err() {
            tracing::debug!("Requester went away, discarding stylized result");
        }
    }
}

/// Handle to a queued stylization.
///
/// Dropping the handle cancels the request: if it has not started it is
/// skipped, otherwise its result is discarded when it completes. The
/// model call itself cannot be interrupted.
pub struct PendingStylization {
    cancelled: Arc<AtomicBool>,
    result: Receiver<Result<StylizedResult>>,
}

impl PendingStylization {
    /// Block until the result is ready.
    ///
    /// # Errors
    ///
    /// Returns the stylization error, or [`Error::WorkerClosed`] if the
    /// worker shut down without answering.
    pub fn wait(self) -> Result<StylizedResult> {
        self.result.recv().map_err(|_| Error::WorkerClosed)?
    }

    /// The result, if it is ready. Call at most once after it returns
    /// `Some`.
    pub fn try_take(&self) -> Option<Result<StylizedResult>> {
        match self.result.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::WorkerClosed)),
        }
    }

    /// Give up on the request.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PendingStylization {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
