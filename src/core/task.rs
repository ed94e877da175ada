//! The unit of deferred work consumed by the scheduler.

/// A unit of deferred or periodic work.
///
/// A task is boxed and moved into the [`TaskScheduler`](super::TaskScheduler)
/// at submission time; the scheduler owns it from then on. A one-shot task is
/// dropped after its single run, a periodic task when the scheduler is
/// stopped or dropped.
///
/// # Failure semantics
///
/// `run` has no error channel and the scheduler provides no exception
/// boundary: implementations must catch and log their own failures. A panic
/// escaping `run` is fatal to the scheduler's single worker thread.
///
/// # Example
///
/// ```
/// use harmonia_core::core::Task;
///
/// struct Heartbeat;
///
/// impl Task for Heartbeat {
///     fn run(&mut self) {
///         tracing::debug!("tick");
///     }
/// }
/// ```
pub trait Task: Send {
    /// Execute the task on the scheduler's worker thread.
    fn run(&mut self);
}

/// Blanket implementation: any `Send` closure is a task.
impl<F> Task for F
where
    F: FnMut() + Send,
{
    fn run(&mut self) {
        self();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn closure_is_a_task() {
        let count = AtomicUsize::new(0);
        let mut task: Box<dyn Task + '_> = Box::new(|| {
            count.fetch_add(1, Ordering::Relaxed);
        });
        task.run();
        task.run();
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }
}
