use std::collections::VecDeque;
use std::sync::Mutex;

use super::system::Job;

/// Fixed capacity of each worker's job deque.
pub const QUEUE_CAPACITY: usize = 1024;

/// One worker's bounded job deque. The owning worker pushes and pops from
/// the back (LIFO, favoring cache-hot recently-submitted work); thieves pop
/// from the front (FIFO, taking the oldest-submitted work so a thief and
/// the owner rarely race for the same job).
pub(super) struct WorkerQueue {
    deque: Mutex<VecDeque<Job>>,
}

impl WorkerQueue {
    pub(super) fn new() -> Self {
        WorkerQueue { deque: Mutex::new(VecDeque::with_capacity(QUEUE_CAPACITY)) }
    }

    /// Pushes a job onto this queue. Fails (returning the job back to the
    /// caller) if the queue is already at [`QUEUE_CAPACITY`].
    pub(super) fn push(&self, job: Job) -> Result<(), Job> {
        let mut deque = self.deque.lock().unwrap();
        if deque.len() >= QUEUE_CAPACITY {
            return Err(job);
        }
        deque.push_back(job);
        Ok(())
    }

    /// Owner-side pop: LIFO, takes the most recently pushed job.
    pub(super) fn pop(&self) -> Option<Job> {
        self.deque.lock().unwrap().pop_back()
    }

    /// Thief-side steal: FIFO, takes the oldest job in the queue.
    pub(super) fn steal(&self) -> Option<Job> {
        self.deque.lock().unwrap().pop_front()
    }

    /// Current number of queued jobs. Exposed only for deterministic tests
    /// that need to observe a worker having drained its queue.
    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.deque.lock().unwrap().len()
    }
}
