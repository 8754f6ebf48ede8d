use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::mode::{HeldCounts, Mode};

/// Monotonically increasing id used only to identify a waiter within its
/// own NodeLock's queue (for `cancel`/`abandon`), never exposed outside
/// this module.
type WaiterId = u64;

struct Waiter {
    id: WaiterId,
    mode: Mode,
    tx: Option<oneshot::Sender<()>>,
}

struct Inner {
    held: HeldCounts,
    waiters: VecDeque<Waiter>,
    next_waiter_id: WaiterId,
}

impl Inner {
    /// Admits waiters from the head of the queue while each is compatible
    /// with `held`, per spec §4.1's fairness rule: stop at the first
    /// incompatible head waiter, never skip ahead.
    fn admit_from_head(&mut self) {
        while let Some(front) = self.waiters.front() {
            if !front.mode.compatible(&self.held) {
                break;
            }
            let mut waiter = self.waiters.pop_front().expect("front just peeked");
            self.held.add(waiter.mode);
            if let Some(tx) = waiter.tx.take() {
                // Admission always succeeds regardless of whether the
                // caller is still listening (see abandon()'s race note);
                // a dropped receiver just means the waiter side will find
                // out it's already been admitted.
                let _ = tx.send(());
            }
        }
    }
}

/// Per-node fair reader/writer-style lock, keyed implicitly by its position
/// in the Registry. Strictly FIFO: a blocked waiter at the head of the
/// queue blocks every later waiter, even one whose mode is independently
/// compatible with `held`.
pub(crate) struct NodeLock {
    inner: Mutex<Inner>,
}

/// A held claim on one NodeLock. Dropping it releases the mode and runs the
/// admission sweep — this is the unit `TreeGuard` composes in reverse order.
pub(crate) struct NodeLockClaim {
    lock: Arc<NodeLock>,
    mode: Mode,
    released: bool,
}

impl NodeLock {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(NodeLock {
            inner: Mutex::new(Inner {
                held: HeldCounts::default(),
                waiters: VecDeque::new(),
                next_waiter_id: 0,
            }),
        })
    }

    /// True when nothing currently references this lock's state: no
    /// holders, no waiters. Used by the Registry to decide whether a weak
    /// entry may be pruned.
    pub(crate) fn is_idle(&self) -> bool {
        let inner = self.inner.lock();
        inner.held.is_empty() && inner.waiters.is_empty()
    }
}

/// Acquires `mode` on `lock`, suspending on an internal oneshot channel if
/// admission must wait its turn in the FIFO queue. Cancellation-safe: if
/// this future is dropped before completing, `PendingWaiter`'s `Drop`
/// removes the waiter (or, if it raced with admission, releases the claim
/// it was just handed — see spec §9's cancel/admission race note).
pub(crate) async fn acquire(lock: Arc<NodeLock>, mode: Mode) -> NodeLockClaim {
    let rx = {
        let mut inner = lock.inner.lock();
        if inner.waiters.is_empty() && mode.compatible(&inner.held) {
            inner.held.add(mode);
            tracing::trace!(?mode, "treelock.node_lock.admit_immediate");
            None
        } else {
            let id = inner.next_waiter_id;
            inner.next_waiter_id += 1;
            let (tx, rx) = oneshot::channel();
            inner.waiters.push_back(Waiter {
                id,
                mode,
                tx: Some(tx),
            });
            tracing::trace!(?mode, waiter_id = id, "treelock.node_lock.enqueue");
            Some((id, rx))
        }
    };

    let Some((id, rx)) = rx else {
        return NodeLockClaim {
            lock,
            mode,
            released: false,
        };
    };

    let mut pending = PendingWaiter {
        lock: Some(lock.clone()),
        id,
        mode,
    };
    // If the receiver errs (sender dropped without sending — shouldn't
    // happen, admit_from_head always sends before dropping) treat it the
    // same as a cancellation race: fall through to abandon's queue check.
    let _ = rx.await;
    pending.lock.take();
    tracing::trace!(?mode, waiter_id = id, "treelock.node_lock.admit");
    NodeLockClaim {
        lock,
        mode,
        released: false,
    }
}

impl NodeLockClaim {
    pub(crate) fn release(mut self) {
        self.do_release();
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    fn do_release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut inner = self.lock.inner.lock();
        inner.held.remove(self.mode);
        inner.admit_from_head();
        tracing::trace!(mode = ?self.mode, "treelock.node_lock.release");
    }
}

impl Drop for NodeLockClaim {
    fn drop(&mut self) {
        self.do_release();
    }
}

/// Guards a waiter that has not yet observed its admission. Its `Drop`
/// implements spec §5's cancellation contract: remove the waiter from the
/// queue if it is still queued, re-running the admission sweep if removing
/// it unblocks the new head; if it is no longer in the queue, it was
/// already admitted by a concurrent `admit_from_head`, so its claim must be
/// released instead of silently dropped.
struct PendingWaiter {
    lock: Option<Arc<NodeLock>>,
    id: WaiterId,
    mode: Mode,
}

impl Drop for PendingWaiter {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        let mut inner = lock.inner.lock();
        if let Some(pos) = inner.waiters.iter().position(|w| w.id == self.id) {
            inner.waiters.remove(pos);
            // Removing a non-head waiter cannot change admissibility of
            // the current head; removing the head itself might.
            if pos == 0 {
                inner.admit_from_head();
            }
            tracing::trace!(waiter_id = self.id, "treelock.node_lock.cancel");
        } else {
            // Lost the race: admit_from_head already popped us and sent on
            // our oneshot before we got here. We hold a claim the caller
            // never observed — release it on its behalf.
            inner.held.remove(self.mode);
            inner.admit_from_head();
            tracing::trace!(
                waiter_id = self.id,
                "treelock.node_lock.abandon_after_admit"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn immediate_admission_when_queue_empty_and_compatible() {
        let lock = NodeLock::new();
        let claim = acquire(lock.clone(), Mode::Read).await;
        assert!(!lock.is_idle());
        claim.release();
        assert!(lock.is_idle());
    }

    #[tokio::test]
    async fn write_excludes_concurrent_write() {
        let lock = NodeLock::new();
        let c1 = acquire(lock.clone(), Mode::Write).await;

        let lock2 = lock.clone();
        let task = tokio::spawn(async move { acquire(lock2, Mode::Write).await });
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        c1.release();
        let c2 = task.await.unwrap();
        c2.release();
    }

    #[tokio::test]
    async fn fifo_head_blocks_later_compatible_waiter() {
        // held starts as Read, so a later Read waiter would be
        // individually compatible with the *current* held set — but it
        // must not be allowed to jump the queue ahead of an
        // earlier-enqueued, currently-incompatible Write waiter.
        let lock = NodeLock::new();
        let c1 = acquire(lock.clone(), Mode::Read).await;

        let lock_a = lock.clone();
        let waiter_write = tokio::spawn(async move { acquire(lock_a, Mode::Write).await });
        tokio::task::yield_now().await;
        assert!(!waiter_write.is_finished());

        let lock_b = lock.clone();
        let waiter_read = tokio::spawn(async move { acquire(lock_b, Mode::Read).await });
        tokio::task::yield_now().await;

        // waiter_read's mode (Read) is compatible with the currently held
        // Read, but it must still queue behind the blocked Write waiter.
        assert!(!waiter_write.is_finished());
        assert!(!waiter_read.is_finished());

        c1.release();
        // Releasing the original reader admits waiter_write (the queue
        // head); waiter_read must remain queued behind it regardless.
        let c2 = waiter_write.await.unwrap();
        tokio::task::yield_now().await;
        assert!(!waiter_read.is_finished());

        c2.release();
        let c3 = waiter_read.await.unwrap();
        c3.release();
    }

    #[tokio::test]
    async fn cancel_before_admission_frees_the_slot() {
        let lock = NodeLock::new();
        let c1 = acquire(lock.clone(), Mode::Write).await;

        let lock2 = lock.clone();
        let task = tokio::spawn(async move { acquire(lock2, Mode::Write).await });
        tokio::task::yield_now().await;
        task.abort();
        let _ = task.await;

        // Give the aborted task's drop glue a chance to run.
        tokio::task::yield_now().await;

        c1.release();
        assert!(lock.is_idle());
    }
}
