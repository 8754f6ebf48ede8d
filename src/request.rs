use std::sync::Arc;

use crate::derive::derive_claims;
use crate::mode::Mode;
use crate::node::Node;
use crate::node_lock::{acquire, NodeLock, NodeLockClaim};
use crate::registry::Registry;

/// A scoped, held combined lock. Dropping it releases every claim in
/// reverse acquisition order, whether the drop comes from normal scope
/// exit or from the surrounding future being cancelled mid-hold — both
/// paths run through the same `Drop` impl, which is this crate's
/// expression of spec §9's "scoped resource whose destructor releases all
/// held handles on all exit paths".
pub struct TreeGuard<N: Node> {
    // Kept in acquisition order; Drop pops from the back, i.e. releases in
    // reverse order, per spec §4.4.
    claims: Vec<(N, NodeLockClaim)>,
}

impl<N: Node> Drop for TreeGuard<N> {
    fn drop(&mut self) {
        while self.claims.pop().is_some() {
            // NodeLockClaim's own Drop performs the release + admission
            // sweep; popping it here is what gives us reverse order.
        }
    }
}

/// Builds the combined lock for one `(read, write)` request against
/// `registry`. This is the only place §4.3's derivation and §4.4's
/// acquisition order are used together.
///
/// Cancellation safety: claims acquired so far accumulate directly inside
/// a `TreeGuard` local, not a bare `Vec`. A bare `Vec<T>`'s own `Drop`
/// would drop its elements front-to-back, which is the *wrong* order for
/// spec §4.4's release contract — only `TreeGuard`'s own `Drop` (which
/// pops from the back) gives reverse-order release. By building the real
/// `TreeGuard` incrementally, a cancellation that drops this function's
/// future mid-loop (the caller's task was cancelled while awaiting a
/// later NodeLock) tears down that same local `TreeGuard` via ordinary
/// Rust async-fn-local-variable teardown, which runs its reverse-order
/// `Drop` — no separate unwind code path is needed.
pub(crate) async fn acquire_tree<N: Node>(
    registry: &Registry<N>,
    read: Vec<N>,
    write: Vec<N>,
) -> TreeGuard<N> {
    let claims = derive_claims(&read, &write);
    tracing::debug!(count = claims.len(), "treelock.request.derived");

    let mut guard = TreeGuard {
        claims: Vec::with_capacity(claims.len()),
    };
    for (node, mode) in claims {
        let node_lock: Arc<NodeLock> = registry.get_or_create(&node);
        let claim = acquire(node_lock, mode).await;
        guard.claims.push((node, claim));
    }

    tracing::debug!(count = guard.claims.len(), "treelock.request.acquired");
    guard
}

impl<N: Node> TreeGuard<N> {
    /// The mode held for `node` in this guard, if any. Mainly useful for
    /// tests and debugging; the core itself never needs to inspect its own
    /// guard.
    pub fn mode_for(&self, node: &N) -> Option<Mode> {
        self.claims
            .iter()
            .find(|(n, _)| n == node)
            .map(|(_, claim)| claim.mode())
    }
}
