use std::fmt::Debug;
use std::hash::Hash;

/// An opaque identity in the tree this lock protects.
///
/// The core never inspects a node's internal structure — it only compares,
/// hashes, and asks for the ancestor chain. `ancestors()` must be stable: two
/// calls on an equal node within the lifetime of one request must return
/// equal sequences.
pub trait Node: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static {
    /// The ordered chain from this node's immediate parent up to (and
    /// including) its root. Empty for a root node.
    ///
    /// The core does not require this order to agree with `Node`'s own
    /// `Ord` impl (see spec §3 / SPEC_FULL.md §9) — only that it is stable.
    fn ancestors(&self) -> Vec<Self>;
}
