use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A job's completion counter, optionally chained to a parent counter.
///
/// Starts at 1 (representing the job itself); a caller that spawns children
/// under this job calls [`CounterNode::add_child`] once per child *before*
/// submitting it, so the parent can never observe completion while a child
/// is still outstanding. When the count reaches zero the node recursively
/// finishes its parent, establishing the release/acquire happens-before
/// edge the completion chain depends on.
pub(super) struct CounterNode {
    count: AtomicUsize,
    parent: Option<Arc<CounterNode>>,
}

impl CounterNode {
    pub(super) fn new(parent: Option<Arc<CounterNode>>) -> Arc<Self> {
        Arc::new(CounterNode { count: AtomicUsize::new(1), parent })
    }

    /// Registers one more outstanding child under this node.
    pub(super) fn add_child(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Marks one unit of work (this job, or one of its children) complete.
    /// If this was the last outstanding unit, cascades into the parent.
    pub(super) fn finish(self: &Arc<Self>) {
        let previous = self.count.fetch_sub(1, Ordering::AcqRel);
        if previous == 1 {
            if let Some(parent) = &self.parent {
                parent.finish();
            }
        }
    }

    pub(super) fn is_complete(&self) -> bool {
        self.count.load(Ordering::Acquire) == 0
    }
}

/// A cheaply-cloneable handle used to poll whether a submitted job (and all
/// of its children, if any) has finished.
#[derive(Clone)]
pub struct JobHandle {
    pub(super) node: Arc<CounterNode>,
}

impl JobHandle {
    /// Atomic load of the underlying counter; `true` once the job and every
    /// job submitted under it have run to completion.
    pub fn is_complete(&self) -> bool {
        self.node.is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_job_completes_on_single_finish() {
        let node = CounterNode::new(None);
        let handle = JobHandle { node: node.clone() };
        assert!(!handle.is_complete());
        node.finish();
        assert!(handle.is_complete());
    }

    #[test]
    fn parent_completes_only_after_every_child_finishes() {
        let parent = CounterNode::new(None);
        let parent_handle = JobHandle { node: parent.clone() };

        parent.add_child();
        let child_a = CounterNode::new(Some(parent.clone()));
        parent.add_child();
        let child_b = CounterNode::new(Some(parent.clone()));

        // Parent's own unit plus two children = not complete yet.
        child_a.finish();
        assert!(!parent_handle.is_complete());
        child_b.finish();
        assert!(!parent_handle.is_complete());
        // The parent's own "self" unit must still be finished explicitly.
        parent.finish();
        assert!(parent_handle.is_complete());
    }
}
