// corpusboard - app/scheduler.rs
//
// Cancellable delayed and repeating tasks whose results are delivered back
// to the owning thread.
//
// Architecture:
//   - Each scheduled task runs on its own background thread and sends its
//     events over a shared mpsc channel. The task never touches the store.
//   - The owner drains the channel with `poll` (non-blocking) or
//     `recv_timeout` and applies events itself, so all mutation stays on
//     one thread.
//   - Every task has an `Arc<AtomicBool>` cancel flag. Events carry their
//     task's flag, so anything still queued when a task is cancelled is
//     discarded on receipt.
//   - Sleeps are split into CANCEL_CHECK_INTERVAL_MS slices, so a cancelled
//     task exits promptly instead of finishing its delay.

use crate::util::constants::{CANCEL_CHECK_INTERVAL_MS, MAX_EVENTS_PER_PUMP};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

/// Identifies one scheduled task for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Returned by `schedule_*`; cancels the task it refers to.
///
/// Dropping the handle does not cancel the task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    cancel: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Stop the task. Events it has already sent are discarded on receipt.
    pub fn cancel(&self) {
        if !self.cancel.swap(true, Ordering::SeqCst) {
            tracing::debug!(task = %self.id, "Task cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Bookkeeping for a spawned task.
struct TaskSlot {
    cancel: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

/// An event plus the cancel flag of the task that produced it.
struct Envelope<E> {
    cancel: Arc<AtomicBool>,
    event: E,
}

/// Runs delayed and periodic work off-thread and hands back its events.
pub struct Scheduler<E: Send + 'static> {
    tx: mpsc::Sender<Envelope<E>>,
    rx: mpsc::Receiver<Envelope<E>>,
    tasks: Vec<TaskSlot>,
    next_id: u64,
}

impl<E: Send + 'static> Scheduler<E> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    /// Deliver `event` once after `delay`, unless cancelled first.
    pub fn schedule_once(&mut self, delay: Duration, event: E) -> TaskHandle {
        self.spawn(move |tx, cancel| {
            if sleep_cancellable(delay, &cancel) {
                return;
            }
            let _ = tx.send(Envelope {
                cancel: Arc::clone(&cancel),
                event,
            });
        })
    }

    /// Call `generator` every `interval` and deliver what it returns.
    ///
    /// The tick number passed to the generator starts at 1. Returning `None`
    /// ends the task. Cancelling the handle ends it at the next slice
    /// boundary.
    pub fn schedule_repeating<G>(&mut self, interval: Duration, mut generator: G) -> TaskHandle
    where
        G: FnMut(u64) -> Option<E> + Send + 'static,
    {
        self.spawn(move |tx, cancel| {
            let mut tick = 0u64;
            loop {
                if sleep_cancellable(interval, &cancel) {
                    return;
                }
                tick += 1;
                let Some(event) = generator(tick) else {
                    return;
                };
                let envelope = Envelope {
                    cancel: Arc::clone(&cancel),
                    event,
                };
                if tx.send(envelope).is_err() {
                    // Owner dropped the scheduler.
                    return;
                }
            }
        })
    }

    fn spawn<F>(&mut self, body: F) -> TaskHandle
    where
        F: FnOnce(mpsc::Sender<Envelope<E>>, Arc<AtomicBool>) + Send + 'static,
    {
        let id = TaskId(self.next_id);
        self.next_id += 1;

        let cancel = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        self.tasks.push(TaskSlot {
            cancel: Arc::clone(&cancel),
            finished: Arc::clone(&finished),
        });

        let tx = self.tx.clone();
        let thread_cancel = Arc::clone(&cancel);
        std::thread::spawn(move || {
            body(tx, thread_cancel);
            finished.store(true, Ordering::SeqCst);
            tracing::trace!(task = %id, "Task thread exited");
        });

        tracing::debug!(task = %id, "Task scheduled");
        TaskHandle { id, cancel }
    }

    /// Drain delivered events without blocking.
    ///
    /// At most MAX_EVENTS_PER_PUMP events are returned per call; the rest
    /// stay queued for the next one.
    pub fn poll(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while events.len() < MAX_EVENTS_PER_PUMP {
            match self.rx.try_recv() {
                Ok(envelope) => {
                    if let Some(event) = live(envelope) {
                        events.push(event);
                    }
                }
                Err(_) => break,
            }
        }
        self.prune();
        events
    }

    /// Block for up to `timeout` waiting for the next live event.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<E> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(envelope) => {
                    if let Some(event) = live(envelope) {
                        return Some(event);
                    }
                }
                Err(_) => return None,
            }
        }
    }

    /// Number of tasks neither cancelled nor finished.
    pub fn active_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| !t.cancel.load(Ordering::SeqCst) && !t.finished.load(Ordering::SeqCst))
            .count()
    }

    /// Cancel every outstanding task.
    pub fn cancel_all(&mut self) {
        for task in &self.tasks {
            task.cancel.store(true, Ordering::SeqCst);
        }
        let count = self.tasks.len();
        self.tasks.clear();
        if count > 0 {
            tracing::debug!(tasks = count, "All tasks cancelled");
        }
    }

    fn prune(&mut self) {
        self.tasks.retain(|t| {
            !t.finished.load(Ordering::SeqCst) && !t.cancel.load(Ordering::SeqCst)
        });
    }
}

impl<E: Send + 'static> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + 'static> Drop for Scheduler<E> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn live<E>(envelope: Envelope<E>) -> Option<E> {
    if envelope.cancel.load(Ordering::SeqCst) {
        None
    } else {
        Some(envelope.event)
    }
}

/// Sleep for `duration` in cancel-check slices.
///
/// Returns `true` if `cancel` was set before the full duration elapsed.
pub(crate) fn sleep_cancellable(duration: Duration, cancel: &AtomicBool) -> bool {
    let slice = Duration::from_millis(CANCEL_CHECK_INTERVAL_MS);
    let deadline = Instant::now() + duration;
    loop {
        if cancel.load(Ordering::SeqCst) {
            return true;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return cancel.load(Ordering::SeqCst);
        }
        std::thread::sleep(remaining.min(slice));
    }
}
