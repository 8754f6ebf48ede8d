use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::node::Node;
use crate::node_lock::NodeLock;

/// Weakly-interned map from node identity to its NodeLock.
///
/// Ensures exactly one NodeLock exists per node while any claim or waiter
/// references it; once the last strong reference drops, the weak entry is
/// pruned lazily on next access — no background sweeper, matching the
/// design note in spec §9.
pub(crate) struct Registry<N: Node> {
    locks: Mutex<HashMap<N, Weak<NodeLock>>>,
}

impl<N: Node> Registry<N> {
    pub(crate) fn new() -> Self {
        Registry {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the NodeLock currently strongly-reachable for `node`,
    /// creating one if none exists. Atomic with respect to concurrent
    /// callers: two concurrent calls for the same node observe the same
    /// `Arc<NodeLock>` instance (the whole lookup-or-insert runs under one
    /// mutex acquisition).
    pub(crate) fn get_or_create(&self, node: &N) -> Arc<NodeLock> {
        let mut locks = self.locks.lock();
        if let Some(weak) = locks.get(node) {
            if let Some(strong) = weak.upgrade() {
                return strong;
            }
        }
        let lock = NodeLock::new();
        locks.insert(node.clone(), Arc::downgrade(&lock));
        tracing::trace!("treelock.registry.create");
        lock
    }
}
