//! Publisher - the single consumer context of a graph family
//!
//! Every commit, derived-view recomputation and deferred notification of a
//! root graph and the views built on it runs on one dedicated thread, which
//! keeps each published view single-writer.
//!
//! Tasks run in (due time, submission order). A panicking task is logged and
//! the thread keeps serving. The thread exits once every `Publisher` handle
//! (and every queued task holding one) has been dropped.

use parking_lot::Mutex;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::errors::{ErrorKind, GraphError, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct Scheduled {
    due: Instant,
    seq: u64,
    task: Task,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

// Reversed so the max-heap pops the earliest (due, seq) first
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct PublisherInner {
    name: String,
    sender: Mutex<Sender<Scheduled>>,
    next_seq: AtomicU64,
    thread_id: ThreadId,
    tasks_run: Arc<AtomicU64>,
}

/// Handle to a publisher thread. Cheap to clone.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

impl Publisher {
    /// Spawn a new publisher thread named `netgraph-<name>`
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Scheduled>();
        let tasks_run = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&tasks_run);
        let thread_name = format!("netgraph-{}", name);
        let loop_name = name.clone();
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || run_loop(&loop_name, receiver, &counter))
            .map_err(|e| {
                GraphError::new(
                    ErrorKind::PublisherStopped,
                    format!("Failed to spawn publisher '{}'", name),
                )
                .with_source(e)
            })?;

        info!(publisher = %name, "Publisher started");

        Ok(Self {
            inner: Arc::new(PublisherInner {
                thread_id: handle.thread().id(),
                name,
                sender: Mutex::new(sender),
                next_seq: AtomicU64::new(0),
                tasks_run,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// True when called from the publisher thread itself
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Number of tasks executed so far (including ones that panicked)
    pub fn tasks_run(&self) -> u64 {
        self.inner.tasks_run.load(Ordering::Acquire)
    }

    /// Queue a task to run as soon as earlier tasks are done
    pub fn execute(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
        self.schedule_at(Instant::now(), Box::new(task))
    }

    /// Queue a task to run no earlier than `delay` from now
    pub fn schedule_after(&self, delay: Duration, task: impl FnOnce() + Send + 'static) -> Result<()> {
        self.schedule_at(Instant::now() + delay, Box::new(task))
    }

    /// Run `task` on the publisher and wait for its result.
    ///
    /// Runs inline when already on the publisher thread.
    pub fn run_sync<R, F>(&self, task: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return Ok(task());
        }

        let (tx, rx) = mpsc::sync_channel(1);
        self.execute(move || {
            let _ = tx.send(task());
        })?;
        rx.recv().map_err(|_| {
            GraphError::new(
                ErrorKind::PublisherStopped,
                format!("Task on publisher '{}' did not complete", self.inner.name),
            )
        })
    }

    /// Wait until every task queued before this call and already due has run
    pub fn barrier(&self) -> Result<()> {
        self.run_sync(|| ())
    }

    fn schedule_at(&self, due: Instant, task: Task) -> Result<()> {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        self.inner
            .sender
            .lock()
            .send(Scheduled { due, seq, task })
            .map_err(|_| GraphError::publisher_stopped(&self.inner.name))
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("name", &self.inner.name)
            .field("tasks_run", &self.tasks_run())
            .finish()
    }
}

fn run_loop(name: &str, receiver: Receiver<Scheduled>, tasks_run: &AtomicU64) {
    let mut queue: BinaryHeap<Scheduled> = BinaryHeap::new();

    loop {
        while queue.peek().is_some_and(|next| next.due <= Instant::now()) {
            if let Some(next) = queue.pop() {
                run_task(name, next, tasks_run);
            }
        }

        let received = match queue.peek() {
            Some(next) => receiver.recv_timeout(next.due.saturating_duration_since(Instant::now())),
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(task) => queue.push(task),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(publisher = %name, dropped = queue.len(), "Publisher stopped");
}

fn run_task(name: &str, scheduled: Scheduled, tasks_run: &AtomicU64) {
    let seq = scheduled.seq;
    let outcome = panic::catch_unwind(AssertUnwindSafe(scheduled.task));
    tasks_run.fetch_add(1, Ordering::AcqRel);

    if let Err(payload) = outcome {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(publisher = %name, seq, panic = %message, "Publisher task panicked");
    }
}
