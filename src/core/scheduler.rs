//! Single-worker deadline scheduler.
//!
//! [`TaskScheduler`] owns one dedicated OS thread that executes submitted
//! [`Task`]s in nondecreasing deadline order. Submission is non-blocking and
//! safe from any number of caller threads; the worker sleeps on a condition
//! variable between deadlines, so an idle scheduler consumes no CPU.
//!
//! # Design
//!
//! - **No polling**: the worker waits for exactly the time remaining until
//!   the earliest deadline, interruptible by new submissions.
//! - **Serialized execution**: tasks run one at a time on the worker. A slow
//!   task delays all subsequent due tasks; this is a documented limitation.
//!   If parallel execution is ever needed, the design can grow into a bounded
//!   worker pool fed by the same time-ordered queue.
//! - **Owned tasks**: a task is moved into the scheduler at submission and
//!   dropped after a one-shot run, on drain, or when the scheduler is dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use super::error::SchedulerError;
use super::task::Task;

/// A task together with its schedule, owned by the scheduler.
struct ScheduledTask {
    task: Box<dyn Task>,
    /// `ZERO` means one-shot; anything else is the repeat interval.
    period: Duration,
    /// Absolute deadline of the next run.
    next_execution: Instant,
}

/// Queue state guarded by the scheduler mutex.
///
/// Invariant: `queue` is sorted by ascending `next_execution`, ties in
/// submission order. A task is either here or currently executing on the
/// worker, never both.
struct QueueState {
    queue: VecDeque<ScheduledTask>,
    cancelled: bool,
}

impl QueueState {
    /// Insert before the first entry with a strictly greater deadline, so
    /// equal deadlines keep submission order.
    fn put(&mut self, entry: ScheduledTask) {
        let at = self
            .queue
            .iter()
            .position(|e| e.next_execution > entry.next_execution)
            .unwrap_or(self.queue.len());
        self.queue.insert(at, entry);
    }
}

/// Internal counters for scheduler statistics (lock-free atomics).
#[derive(Debug, Default)]
struct SchedulerCounters {
    submitted: AtomicU64,
    executed: AtomicU64,
    rescheduled: AtomicU64,
    discarded: AtomicU64,
}

/// Snapshot of scheduler activity.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStats {
    /// Tasks accepted by [`TaskScheduler::schedule`].
    pub submitted: u64,
    /// Task runs completed (including drain runs and periodic repeats).
    pub executed: u64,
    /// Re-insertions of periodic tasks after a run.
    pub rescheduled: u64,
    /// Tasks dropped unexecuted during a stop.
    pub discarded: u64,
    /// Tasks currently waiting in the queue.
    pub queued: usize,
}

/// State shared between the scheduler handle and its worker thread.
struct Shared {
    state: Mutex<QueueState>,
    wakeup: Condvar,
    counters: SchedulerCounters,
}

/// What the worker decided to do with the head of the queue.
enum NextStep {
    WaitForever,
    WaitFor(Duration),
    RunHead,
}

/// Single-worker engine that runs due tasks in deadline order.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = TaskScheduler::new();
/// scheduler.start()?;
/// scheduler.schedule(Box::new(task), Duration::from_secs(2), Duration::ZERO);
/// scheduler.stop(true)?;
/// ```
pub struct TaskScheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskScheduler {
    /// Create a scheduler with an empty queue and no worker running.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    queue: VecDeque::new(),
                    cancelled: false,
                }),
                wakeup: Condvar::new(),
                counters: SchedulerCounters::default(),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Start the worker thread.
    ///
    /// Tasks scheduled before `start` are retained and become eligible as
    /// soon as the worker is running.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::AlreadyStarted`] if the worker is running.
    /// - [`SchedulerError::Spawn`] if the OS thread could not be created.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }

        self.shared.state.lock().cancelled = false;

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("task-scheduler".into())
            .spawn(move || worker_loop(&shared))
            .map_err(SchedulerError::Spawn)?;

        *worker = Some(handle);
        info!("task scheduler started");
        Ok(())
    }

    /// Stop the worker and drain the queue.
    ///
    /// Blocks until the worker has been cancelled and joined. If `graceful`,
    /// every remaining task whose deadline has already passed (relative to a
    /// single instant captured at drain start) runs exactly once on the
    /// calling thread; all other remaining tasks are dropped unexecuted.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::NotStarted`] if the worker is not running.
    /// - [`SchedulerError::WorkerPanicked`] if a task panic killed the
    ///   worker. The queue is still drained in that case.
    pub fn stop(&self, graceful: bool) -> Result<(), SchedulerError> {
        let handle = {
            let mut worker = self.worker.lock();
            match worker.take() {
                Some(handle) => handle,
                None => return Err(SchedulerError::NotStarted),
            }
        };

        {
            let mut state = self.shared.state.lock();
            state.cancelled = true;
        }
        self.shared.wakeup.notify_all();

        let panicked = handle.join().is_err();

        let drained = {
            let mut state = self.shared.state.lock();
            std::mem::take(&mut state.queue)
        };

        let now = Instant::now();
        for mut entry in drained {
            if graceful && now >= entry.next_execution {
                entry.task.run();
                self.shared.counters.executed.fetch_add(1, Ordering::Relaxed);
            } else {
                self.shared.counters.discarded.fetch_add(1, Ordering::Relaxed);
            }
        }

        info!(graceful, "task scheduler stopped");

        if panicked {
            return Err(SchedulerError::WorkerPanicked);
        }
        Ok(())
    }

    /// Stop the worker and drop all queued tasks without running any of
    /// them, even those already due. Equivalent to `stop(false)`.
    ///
    /// # Errors
    ///
    /// Same as [`TaskScheduler::stop`].
    pub fn cancel(&self) -> Result<(), SchedulerError> {
        self.stop(false)
    }

    /// Whether the worker thread is currently running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Schedule a task for execution.
    ///
    /// The first run happens `delay` after now. A `period` of
    /// [`Duration::ZERO`] makes the task one-shot; otherwise it repeats every
    /// `period` after each run, measured from run completion. Returns
    /// immediately; the worker is woken in case it needs to reconsider its
    /// wait deadline.
    pub fn schedule(&self, task: Box<dyn Task>, delay: Duration, period: Duration) {
        let entry = ScheduledTask {
            task,
            period,
            next_execution: Instant::now() + delay,
        };

        {
            let mut state = self.shared.state.lock();
            state.put(entry);
        }
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        self.shared.wakeup.notify_all();

        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        debug!(delay_ms, period_ms, "task scheduled");
    }

    /// Get a snapshot of scheduler activity.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let queued = self.shared.state.lock().queue.len();
        let c = &self.shared.counters;
        SchedulerStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            executed: c.executed.load(Ordering::Relaxed),
            rescheduled: c.rescheduled.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
            queued,
        }
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        // Best-effort graceful stop, matching explicit shutdown.
        let _ = self.stop(true);
    }
}

/// The worker loop: run due tasks, wait out the gap to the next deadline,
/// sleep indefinitely on an empty queue. Cancellation is checked every
/// iteration.
fn worker_loop(shared: &Arc<Shared>) {
    debug!("scheduler worker started");

    loop {
        let mut state = shared.state.lock();
        if state.cancelled {
            break;
        }

        let now = Instant::now();
        let step = match state.queue.front() {
            None => NextStep::WaitForever,
            Some(head) if head.next_execution > now => {
                NextStep::WaitFor(head.next_execution - now)
            }
            Some(_) => NextStep::RunHead,
        };

        match step {
            NextStep::WaitForever => {
                shared.wakeup.wait(&mut state);
            }
            NextStep::WaitFor(remaining) => {
                // Interruptible by submissions; a timeout just means the
                // head deadline arrived and the next iteration runs it.
                let _ = shared.wakeup.wait_for(&mut state, remaining);
            }
            NextStep::RunHead => {
                let Some(mut entry) = state.queue.pop_front() else {
                    continue;
                };
                // The queue lock is not held while the task runs.
                drop(state);

                entry.task.run();
                shared.counters.executed.fetch_add(1, Ordering::Relaxed);

                if entry.period > Duration::ZERO {
                    entry.next_execution = Instant::now() + entry.period;
                    shared.state.lock().put(entry);
                    shared.counters.rescheduled.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    debug!("scheduler worker exiting");
}
