//! Eviction policy: which unpinned frame gives up its page.

use crate::frame::FrameId;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

/// Tracks eviction candidates for the buffer pool.
///
/// The pool reports pin transitions: `unpin` when a frame's last pin is
/// released (the frame becomes a candidate), `pin` when the frame is
/// taken again (candidacy is withdrawn). `victim` hands out the frame to
/// recycle next.
pub trait Replacer: Send + Sync {
    /// Makes a frame a candidate for eviction.
    fn unpin(&self, frame_id: FrameId);

    /// Withdraws a frame from eviction candidacy.
    fn pin(&self, frame_id: FrameId);

    /// Picks the next victim and removes it from the candidate set.
    fn victim(&self) -> Option<FrameId>;

    /// Number of current candidates.
    fn len(&self) -> usize;

    /// True when no frame can be evicted.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Least-recently-unpinned replacement.
///
/// Candidates queue in the order their last pin was released and victims
/// come from the front, so the page idle longest loses its frame first. A
/// frame unpinned again while still queued keeps its place.
pub struct LruReplacer {
    inner: Mutex<LruInner>,
}

struct LruInner {
    /// Candidates, oldest at the front.
    order: VecDeque<FrameId>,
    /// Membership index for `order`.
    queued: HashSet<FrameId>,
}

impl LruReplacer {
    /// Creates a replacer able to track `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruInner {
                order: VecDeque::with_capacity(capacity),
                queued: HashSet::with_capacity(capacity),
            }),
        }
    }
}

impl Replacer for LruReplacer {
    fn unpin(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if inner.queued.insert(frame_id) {
            inner.order.push_back(frame_id);
        }
    }

    fn pin(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if inner.queued.remove(&frame_id) {
            inner.order.retain(|&queued| queued != frame_id);
        }
    }

    fn victim(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        let frame_id = inner.order.pop_front()?;
        inner.queued.remove(&frame_id);
        Some(frame_id)
    }

    fn len(&self) -> usize {
        self.inner.lock().order.len()
    }
}
