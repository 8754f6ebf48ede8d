//! nexus_treelock: hierarchical reader/writer locking over a tree of
//! opaque nodes.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │  TreeLock (facade, cheap Clone)                            │
//! │   └─ Registry ── weakly-interned map: Node -> NodeLock      │
//! │        NodeLock: per-node mode + strict FIFO waiter queue    │
//! │                                                             │
//! │  TreeLock::acquire(read, write)                            │
//! │   └─ derive per-node modes (mode::derive_claims)            │
//! │   └─ TreeRequest::acquire: sorted, all-or-nothing,          │
//! │      producing a TreeGuard that releases everything in      │
//! │      reverse order on drop (including cancellation)         │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # #[tokio::main] async fn main() {
//! use nexus_treelock::{TreeLock, path::PathNode};
//!
//! let locks = TreeLock::new();
//! let a = PathNode::new("a/b/c");
//!
//! let _guard = locks.acquire(vec![], vec![a]).await;
//! // ... mutate the subtree rooted at a/b/c ...
//! # }
//! ```

mod derive;
mod lock;
mod mode;
mod node;
mod node_lock;
pub mod path;
mod registry;
mod request;

pub use lock::TreeLock;
pub use mode::Mode;
pub use node::Node;
pub use request::TreeGuard;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::{path::PathNode, Mode, Node, TreeGuard, TreeLock};
}
