use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::mpsc;
use std::task::{Context, Poll, Waker};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::VfsError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of named worker threads fed from one FIFO queue.
///
/// Tasks start in submission order. With a single thread they also finish
/// in submission order, which is what [`Vfs::load_async`](crate::Vfs::load_async)
/// relies on.
///
/// Dropping the pool closes the queue, lets already queued tasks run, and
/// joins the threads.
pub struct WorkerPool {
    sender: Option<mpsc::Sender<Job>>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `threads` workers (at least one) named `{name}-{index}`.
    pub fn new(name: &str, threads: usize) -> Result<Self, VfsError> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::with_capacity(threads.max(1));
        for index in 0..threads.max(1) {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || run_worker(&receiver))
                .map_err(VfsError::Io)?;
            handles.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            threads: handles,
        })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.threads.len()
    }

    /// Queue `task` and return a handle to its result.
    ///
    /// A task that panics is logged and its handle resolves to `None`;
    /// the worker keeps serving later tasks.
    pub fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::sync_channel(1);
        let waker: Arc<Mutex<Option<Waker>>> = Arc::new(Mutex::new(None));
        let job_waker = waker.clone();

        let job: Job = Box::new(move || {
            match catch_unwind(AssertUnwindSafe(task)) {
                Ok(value) => {
                    let _ = result_tx.send(value);
                }
                Err(_) => log::error!("Worker task panicked"),
            }
            // The sender is gone either way; wake the handle so it observes it.
            drop(result_tx);
            if let Some(waker) = job_waker.lock().take() {
                waker.wake();
            }
        });

        if let Some(sender) = &self.sender
            && sender.send(job).is_err()
        {
            log::error!("Worker queue closed, task dropped");
        }

        TaskHandle {
            receiver: result_rx,
            waker,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel ends each worker loop once the queue drains.
        self.sender.take();
        let current = thread::current().id();
        for handle in self.threads.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::error!("Worker thread exited with a panic");
            }
        }
    }
}

fn run_worker(receiver: &Mutex<mpsc::Receiver<Job>>) {
    loop {
        // Hold the queue lock only while taking a job.
        let job = receiver.lock().recv();
        match job {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
}

/// Handle to the result of a task queued on a [`WorkerPool`].
///
/// Can be polled with [`try_recv()`](Self::try_recv), waited on with
/// [`recv()`](Self::recv), or `.await`ed. It resolves to `None` if the task
/// panicked or was dropped without running.
pub struct TaskHandle<T> {
    receiver: mpsc::Receiver<T>,
    waker: Arc<Mutex<Option<Waker>>>,
}

impl<T> TaskHandle<T> {
    /// A handle whose task will never run; it resolves to `None` at once.
    pub(crate) fn closed() -> Self {
        let (_, receiver) = mpsc::sync_channel(1);
        Self {
            receiver,
            waker: Arc::new(Mutex::new(None)),
        }
    }

    /// Retrieve the result without blocking.
    ///
    /// Returns `Some(T)` if the task has completed, `None` otherwise.
    /// This consumes the value; later calls return `None`.
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Block until the task completes and return its result.
    pub fn recv(self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Block for at most `timeout`.
    ///
    /// Returns `Err(self)` if the task is still running, so the caller can
    /// keep waiting.
    pub fn recv_timeout(self, timeout: Duration) -> Result<Option<T>, Self> {
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => Ok(Some(value)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Ok(None),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(self),
        }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        // Register before checking so a completion in between still wakes us.
        *self.waker.lock() = Some(cx.waker().clone());
        match self.receiver.try_recv() {
            Ok(value) => Poll::Ready(Some(value)),
            Err(mpsc::TryRecvError::Empty) => Poll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => Poll::Ready(None),
        }
    }
}
