use std::sync::Arc;

use crate::node::Node;
use crate::registry::Registry;
use crate::request::{acquire_tree, TreeGuard};

/// Facade over one tree of locks. Cheap to clone (an `Arc` handle around a
/// shared `Registry`), in the same style as this crate's teacher's
/// actor-handle types: every clone talks to the same underlying state.
#[derive(Clone)]
pub struct TreeLock<N: Node> {
    registry: Arc<Registry<N>>,
}

impl<N: Node> TreeLock<N> {
    /// Builds an independent tree lock. No configuration — per spec §6,
    /// there is nothing to configure.
    pub fn new() -> Self {
        TreeLock {
            registry: Arc::new(Registry::new()),
        }
    }

    /// Opens a scoped combined acquisition over `read` and `write`. Blocks
    /// (asynchronously) until every implied claim is held, then returns a
    /// guard that releases everything, in reverse order, on drop.
    ///
    /// `read` and `write` may overlap each other and their own ancestors
    /// arbitrarily, and may contain duplicates; see spec §4.3 for how
    /// these are normalized.
    pub async fn acquire(&self, read: Vec<N>, write: Vec<N>) -> TreeGuard<N> {
        acquire_tree(&self.registry, read, write).await
    }
}

impl<N: Node> Default for TreeLock<N> {
    fn default() -> Self {
        Self::new()
    }
}
