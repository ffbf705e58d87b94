use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;

use super::counter::{CounterNode, JobHandle};
use super::queue::WorkerQueue;

/// A unit of work submitted to a [`JobSystem`]: an opaque `FnOnce` plus its
/// completion counter.
pub struct Job {
    task: Box<dyn FnOnce() + Send + 'static>,
    counter: Arc<CounterNode>,
}

impl Job {
    /// Builds a job with no parent; its [`JobHandle`] becomes complete as
    /// soon as `task` returns.
    pub fn leaf(task: Box<dyn FnOnce() + Send + 'static>) -> Self {
        Job { task, counter: CounterNode::new(None) }
    }

    /// Builds a job that is a child of `parent`: `parent`'s handle will not
    /// report complete until this job (and every other child registered
    /// under it) has finished. Registers itself with the parent counter
    /// before returning, so there is no window where the parent could be
    /// observed complete with this child still unsubmitted.
    pub fn child_of(parent: &JobHandle, task: Box<dyn FnOnce() + Send + 'static>) -> Self {
        parent.node.add_child();
        Job { task, counter: CounterNode::new(Some(parent.node.clone())) }
    }

    /// A handle that can be polled for this job's completion.
    pub fn handle(&self) -> JobHandle {
        JobHandle { node: self.counter.clone() }
    }

    fn run(self) {
        (self.task)();
        self.counter.finish();
    }
}

/// The job queue was at capacity on every worker; the caller should retry
/// or drop the work.
#[derive(Debug)]
pub struct JobSubmitError;

impl fmt::Display for JobSubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job submission failed: every worker queue is at capacity")
    }
}
impl std::error::Error for JobSubmitError {}

/// A fixed pool of worker threads, each with its own bounded job deque,
/// that steal from one another round-robin when their own deque runs dry.
pub struct JobSystem {
    queues: Vec<Arc<WorkerQueue>>,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    next_worker: AtomicUsize,
}

impl JobSystem {
    /// Starts `worker_count` worker threads (clamped to at least 1).
    ///
    /// The orchestrator is expected to pass `available_parallelism() - 1`:
    /// the orchestrator thread itself makes up the remaining logical core.
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let running = Arc::new(AtomicBool::new(true));
        let queues: Vec<Arc<WorkerQueue>> = (0..worker_count).map(|_| Arc::new(WorkerQueue::new())).collect();

        let workers = (0..worker_count)
            .map(|id| {
                let queues = queues.clone();
                let running = running.clone();
                thread::Builder::new()
                    .name(format!("tile-worker-{id}"))
                    .spawn(move || worker_loop(id, &queues, &running))
                    .expect("failed to spawn job worker thread")
            })
            .collect();

        JobSystem { queues, running, workers, next_worker: AtomicUsize::new(0) }
    }

    /// Number of worker threads in the pool.
    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }

    /// Submits `job`, round-robining across workers starting from an
    /// internal cursor; tries every worker before failing with
    /// [`JobSubmitError`] (all queues at [`super::QUEUE_CAPACITY`]).
    pub fn submit(&self, job: Job) -> Result<JobHandle, JobSubmitError> {
        let handle = job.handle();
        let start = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.queues.len();

        let mut job = job;
        for offset in 0..self.queues.len() {
            let index = (start + offset) % self.queues.len();
            match self.queues[index].push(job) {
                Ok(()) => return Ok(handle),
                Err(returned) => job = returned,
            }
        }
        Err(JobSubmitError)
    }

    /// Signals every worker to stop once its current job (if any) finishes
    /// and joins all worker threads. Jobs already popped from a queue run
    /// to completion; jobs still sitting in a queue are abandoned, so
    /// callers must ensure every submitted job has completed (via
    /// [`JobHandle::is_complete`]) before calling this.
    pub fn shutdown(mut self) {
        self.running.store(false, Ordering::Release);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// One worker's main loop: drain its own queue LIFO, then try stealing FIFO
/// from every other worker round-robin starting at `self + 1`, yielding to
/// the OS if nothing was found anywhere.
fn worker_loop(id: usize, queues: &[Arc<WorkerQueue>], running: &AtomicBool) {
    let worker_count = queues.len();
    while running.load(Ordering::Acquire) {
        if let Some(job) = queues[id].pop() {
            job.run();
            continue;
        }

        let mut stolen = None;
        for offset in 1..worker_count {
            let victim = (id + offset) % worker_count;
            if let Some(job) = queues[victim].steal() {
                stolen = Some(job);
                break;
            }
        }

        match stolen {
            Some(job) => job.run(),
            None => thread::yield_now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn submitted_job_runs_and_completes() {
        let system = JobSystem::new(2);
        let counter = Arc::new(AtomicI32::new(0));
        let c = counter.clone();
        let handle = system
            .submit(Job::leaf(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })))
            .unwrap();

        while !handle.is_complete() {
            thread::yield_now();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        system.shutdown();
    }

    #[test]
    fn many_jobs_across_workers_all_complete() {
        let system = JobSystem::new(4);
        let counter = Arc::new(AtomicI32::new(0));
        let mut handles = Vec::new();
        for _ in 0..200 {
            let c = counter.clone();
            handles.push(
                system
                    .submit(Job::leaf(Box::new(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                    })))
                    .unwrap(),
            );
        }
        for h in &handles {
            while !h.is_complete() {
                thread::yield_now();
            }
        }
        assert_eq!(counter.load(Ordering::SeqCst), 200);
        system.shutdown();
    }

    #[test]
    fn parent_job_waits_for_children() {
        let system = JobSystem::new(2);
        let counter = Arc::new(AtomicI32::new(0));

        let parent_job = Job::leaf(Box::new(|| {}));
        let parent_handle = parent_job.handle();

        let c1 = counter.clone();
        let child_a = Job::child_of(&parent_handle, Box::new(move || {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = counter.clone();
        let child_b = Job::child_of(&parent_handle, Box::new(move || {
            c2.fetch_add(1, Ordering::SeqCst);
        }));

        system.submit(parent_job).unwrap();
        system.submit(child_a).unwrap();
        system.submit(child_b).unwrap();

        while !parent_handle.is_complete() {
            thread::yield_now();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        system.shutdown();
    }

    #[test]
    fn submission_fails_once_every_queue_is_saturated() {
        let system = JobSystem::new(1);

        // Occupy the sole worker with a job that never returns, then wait
        // for it to actually be popped before flooding the now-static
        // queue, so the test doesn't race the worker thread for slots.
        system
            .submit(Job::leaf(Box::new(|| {
                thread::sleep(std::time::Duration::from_secs(3600));
            })))
            .unwrap();
        while system.queues[0].len() != 0 {
            thread::yield_now();
        }

        for _ in 0..super::super::queue::QUEUE_CAPACITY {
            system.submit(Job::leaf(Box::new(|| {}))).unwrap();
        }
        let result = system.submit(Job::leaf(Box::new(|| {})));
        assert!(result.is_err());
        // The worker is permanently stuck; don't join it.
        std::mem::forget(system);
    }
}
