//! Deferred Task Scheduler
//!
//! Marking a computation dirty happens synchronously, but the "changed"
//! notification that follows is deferred. The scheduler collects those
//! deferred tasks into a single FIFO queue and runs them together in one
//! drain, so any number of writes in one synchronous turn produce at most one
//! notification per node.
//!
//! # Draining
//!
//! A drain pops from the live queue until it is observably empty. Tasks that
//! enqueue more tasks while the drain is running are picked up by the same
//! drain, in order. The pending marker is released only once the queue is
//! empty, so the next enqueue after that starts a fresh batch.
//!
//! Each task runs in isolation: a panicking task is logged and the drain
//! carries on with the rest of the queue.
//!
//! # Driving the scheduler
//!
//! - [`Scheduler::flush`] drains synchronously.
//! - [`Scheduler::tick`] yields to the async runtime once (the equivalent of
//!   a microtask boundary) and then drains.
//! - [`Scheduler::drain_loop`] is a long-running future for hosts that run a
//!   `tokio::task::LocalSet`; it drains every time a new batch starts.

use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tokio::sync::Notify;
use tracing::{debug, error, trace};

type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct Queue {
    tasks: VecDeque<Task>,
    /// A drain has been requested and not yet completed.
    pending: bool,
    /// A drain is currently running on this thread.
    draining: bool,
}

thread_local! {
    static QUEUE: RefCell<Queue> = RefCell::new(Queue::default());
    static WAKER: Rc<Notify> = Rc::new(Notify::new());
}

/// The process-wide (per evaluation thread) deferred task queue.
pub struct Scheduler;

impl Scheduler {
    /// Append a task and make sure a drain is pending.
    pub fn enqueue<F>(task: F)
    where
        F: FnOnce() + 'static,
    {
        let starts_batch = QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            queue.tasks.push_back(Box::new(task));
            !std::mem::replace(&mut queue.pending, true)
        });

        if starts_batch {
            trace!("drain scheduled");
            WAKER.with(|waker| waker.notify_one());
        }
    }

    /// Whether a drain has been requested and not yet completed.
    pub fn is_pending() -> bool {
        QUEUE.with(|queue| queue.borrow().pending)
    }

    /// Number of tasks waiting in the queue.
    pub fn len() -> usize {
        QUEUE.with(|queue| queue.borrow().tasks.len())
    }

    pub fn is_empty() -> bool {
        Self::len() == 0
    }

    /// Drain the queue synchronously, returning the number of tasks run.
    ///
    /// Calling this from inside a running task returns `0` immediately; the
    /// outer drain runs whatever the task enqueued.
    pub fn flush() -> usize {
        let entered = QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            !std::mem::replace(&mut queue.draining, true)
        });
        if !entered {
            return 0;
        }

        let mut ran = 0;
        loop {
            let next = QUEUE.with(|queue| queue.borrow_mut().tasks.pop_front());
            let Some(task) = next else { break };
            ran += 1;

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                error!(panic = %panic_message(&payload), "scheduled task panicked");
            }
        }

        QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            queue.draining = false;
            queue.pending = false;
        });

        if ran > 0 {
            debug!(tasks = ran, "scheduler drained");
        }
        ran
    }

    /// Yield to the async runtime once, then drain.
    pub async fn tick() -> usize {
        tokio::task::yield_now().await;
        Self::flush()
    }

    /// Drain every time a new batch is scheduled. Never returns.
    ///
    /// Spawn this with `tokio::task::spawn_local` on the evaluation thread.
    pub async fn drain_loop() {
        let waker = WAKER.with(Rc::clone);
        loop {
            waker.notified().await;
            Self::flush();
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
