use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::models::Sample;

pub const DEFAULT_CAPACITY: usize = 500;

/// Fixed-capacity window over the most recent samples.
///
/// Pushes and snapshots share one lock, so a reader never sees a half
/// applied push. Eviction happens under the same guard as the append.
#[derive(Clone)]
pub struct LiveBuffer {
    inner: Arc<Mutex<VecDeque<Sample>>>,
    capacity: usize,
}

impl LiveBuffer {
    /// # Panics
    /// If `capacity` is zero; settings validation rejects that earlier.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "live buffer capacity must be non-zero");
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends at the tail, evicting the oldest sample when full.
    pub fn push(&self, sample: Sample) {
        let mut window = self.lock();
        if window.len() == self.capacity {
            window.pop_front();
        }
        window.push_back(sample);
    }

    /// Point-in-time copy in arrival order.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Sample>> {
        // A panic while holding the guard cannot leave the deque half-updated
        // (push_back/pop_front are single steps), so poisoning is ignored.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl fmt::Debug for LiveBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl Default for LiveBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
