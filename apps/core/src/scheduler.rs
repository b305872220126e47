//! Single-threaded cooperative timer queue.
//!
//! Callbacks receive the owning state and the scheduler itself, so a callback
//! can re-register follow-up work (or itself) with a computed delay. Nothing
//! here blocks: the event loop asks for [`Scheduler::next_due`], waits for
//! input up to that instant, then calls [`Scheduler::run_due`].

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

type OnceCallback<S> = Box<dyn FnOnce(&mut S, &mut Scheduler<S>)>;
type RepeatCallback<S> = Box<dyn FnMut(&mut S, &mut Scheduler<S>)>;

enum Job<S> {
    Once(OnceCallback<S>),
    Every {
        interval: Duration,
        callback: RepeatCallback<S>,
    },
}

struct ScheduledTask<S> {
    due: Instant,
    seq: u64,
    id: TaskId,
    job: Job<S>,
}

impl<S> PartialEq for ScheduledTask<S> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<S> Eq for ScheduledTask<S> {}

impl<S> PartialOrd for ScheduledTask<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S> Ord for ScheduledTask<S> {
    // Reversed so the BinaryHeap pops the earliest (due, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct Scheduler<S> {
    now: Instant,
    queue: BinaryHeap<ScheduledTask<S>>,
    cancelled: HashSet<TaskId>,
    running: Option<TaskId>,
    next_seq: u64,
    next_id: u64,
}

impl<S> Scheduler<S> {
    pub fn new(start: Instant) -> Self {
        Self {
            now: start,
            queue: BinaryHeap::new(),
            cancelled: HashSet::new(),
            running: None,
            next_seq: 0,
            next_id: 0,
        }
    }

    /// The scheduler's notion of the current time: the latest instant passed
    /// to `run_due`, or the start instant.
    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn after<F>(&mut self, delay: Duration, callback: F) -> TaskId
    where
        F: FnOnce(&mut S, &mut Scheduler<S>) + 'static,
    {
        let id = self.allocate_id();
        let due = self.now + delay;
        self.push(due, id, Job::Once(Box::new(callback)));
        id
    }

    pub fn every<F>(&mut self, interval: Duration, callback: F) -> TaskId
    where
        F: FnMut(&mut S, &mut Scheduler<S>) + 'static,
    {
        let id = self.allocate_id();
        let due = self.now + interval;
        self.push(
            due,
            id,
            Job::Every {
                interval,
                callback: Box::new(callback),
            },
        );
        id
    }

    /// A cancelled task never fires again. Cancelling an id that already ran
    /// is harmless.
    pub fn cancel(&mut self, id: TaskId) {
        if self.running == Some(id) || self.queue.iter().any(|task| task.id == id) {
            self.cancelled.insert(id);
        }
    }

    pub fn pending(&self) -> usize {
        self.queue
            .iter()
            .filter(|task| !self.cancelled.contains(&task.id))
            .count()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.queue
            .iter()
            .filter(|task| !self.cancelled.contains(&task.id))
            .map(|task| task.due)
            .min()
    }

    /// Fires every task due at or before `now`. Tasks registered while this
    /// pass runs are left for a later pass, even when already due.
    pub fn run_due(&mut self, state: &mut S, now: Instant) -> usize {
        if now > self.now {
            self.now = now;
        }
        let horizon = self.next_seq;
        let mut deferred = Vec::new();
        let mut fired = 0;

        while let Some(top) = self.queue.peek() {
            if top.due > self.now {
                break;
            }
            let Some(task) = self.queue.pop() else {
                break;
            };
            if task.seq >= horizon {
                deferred.push(task);
                continue;
            }
            if self.cancelled.remove(&task.id) {
                continue;
            }

            fired += 1;
            match task.job {
                Job::Once(callback) => {
                    self.running = Some(task.id);
                    callback(state, self);
                    self.running = None;
                    self.cancelled.remove(&task.id);
                }
                Job::Every {
                    interval,
                    mut callback,
                } => {
                    self.running = Some(task.id);
                    callback(state, self);
                    self.running = None;
                    if self.cancelled.remove(&task.id) {
                        continue;
                    }
                    let mut due = task.due + interval;
                    if due <= self.now {
                        due = self.now + interval;
                    }
                    self.push(due, task.id, Job::Every { interval, callback });
                }
            }
        }

        for task in deferred {
            self.queue.push(task);
        }
        fired
    }

    /// Moves the clock forward by `by` and fires whatever became due.
    pub fn advance(&mut self, state: &mut S, by: Duration) -> usize {
        let target = self.now + by;
        let mut fired = 0;
        loop {
            match self.next_due() {
                Some(due) if due <= target => fired += self.run_due(state, due),
                _ => break,
            }
        }
        self.now = target;
        fired
    }

    /// Jumps the clock from task to task until nothing is queued or
    /// `max_steps` passes ran. Recurring tasks keep the queue busy, so callers
    /// that have one registered should rely on the step bound.
    pub fn run_until_idle(&mut self, state: &mut S, max_steps: usize) -> usize {
        let mut fired = 0;
        for _ in 0..max_steps {
            let Some(due) = self.next_due() else {
                break;
            };
            fired += self.run_due(state, due);
        }
        fired
    }

    fn allocate_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, due: Instant, id: TaskId, job: Job<S>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledTask { due, seq, id, job });
    }
}
