//! A small work-stealing job system: a fixed pool of worker threads, each
//! owning a bounded deque, that rasterizer jobs are scheduled onto.
//!
//! This is hand-rolled rather than built on a task-pool crate like `rayon`
//! because the work-stealing mechanics — bounded per-worker queues,
//! round-robin submission, round-robin stealing, and a
//! `parent`-cascading completion counter — are themselves the subject being
//! built, not an incidental detail a task-pool crate would paper over. The
//! queues are plain `Mutex`-protected deques, not a lock-free chase-lev
//! deque: push/pop/steal are documented as linearizable via a mutex, and a
//! from-scratch lock-free deque is not something to hand-write untested.

mod counter;
mod queue;
mod system;

pub use counter::JobHandle;
pub use queue::QUEUE_CAPACITY;
pub use system::{Job, JobSubmitError, JobSystem};
