use std::collections::BTreeMap;

use crate::mode::Mode;
use crate::node::Node;

/// The role(s) a node plays across a single request's read/write sets,
/// folded by union (not subtraction) so a node that is both an explicit
/// read target and an ancestor of a write target keeps both roles visible
/// until the final priority reduction below.
#[derive(Debug, Default, Clone, Copy)]
struct Roles {
    write: bool,
    write_ancestor: bool,
    read: bool,
    read_ancestor: bool,
}

/// Computes the coalesced (node, Mode) claims for one request, per spec
/// §4.3. Duplicate input nodes collapse naturally since `roles` is keyed by
/// node identity.
///
/// The result is sorted by `N`'s own total order (the global order the
/// request later acquires NodeLocks in).
pub(crate) fn derive_claims<N: Node>(read: &[N], write: &[N]) -> Vec<(N, Mode)> {
    let mut roles: BTreeMap<N, Roles> = BTreeMap::new();

    for n in write {
        roles.entry(n.clone()).or_default().write = true;
    }
    for n in write {
        for a in n.ancestors() {
            let r = roles.entry(a).or_default();
            if !r.write {
                r.write_ancestor = true;
            }
        }
    }
    // An explicit read target always keeps its `read` role, even when the
    // same node is also a write-ancestor — that combination is exactly the
    // composite case §4.3 requires. Only the *propagation* to further
    // ancestors (group 4, ReadAncestor) is restricted to nodes that are
    // "pure" read targets (group 3: read but neither write nor
    // write-ancestor) — a node shadowed by a write claim doesn't leak a
    // weaker ancestor claim from its read side.
    for n in read {
        roles.entry(n.clone()).or_default().read = true;
    }
    for n in read {
        let pure_read_group = roles
            .get(n)
            .map(|r| r.read && !r.write && !r.write_ancestor)
            .unwrap_or(false);
        if !pure_read_group {
            continue;
        }
        for a in n.ancestors() {
            let r = roles.entry(a).or_default();
            if !r.write && !r.write_ancestor && !r.read {
                r.read_ancestor = true;
            }
        }
    }

    roles
        .into_iter()
        .map(|(node, roles)| {
            let mode = if roles.write {
                Mode::Write
            } else if roles.read && roles.write_ancestor {
                Mode::ReadAndWriteAncestor
            } else if roles.write_ancestor {
                Mode::WriteAncestor
            } else if roles.read {
                Mode::Read
            } else {
                Mode::ReadAncestor
            };
            (node, mode)
        })
        .collect()
}
