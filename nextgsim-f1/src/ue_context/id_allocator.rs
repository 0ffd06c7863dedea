//! Round-robin UE F1AP ID allocation

/// Allocates UE F1AP IDs from `[min, max]`.
///
/// The scan starts after the last returned ID and wraps from `max` to `min`,
/// so IDs are handed out round-robin rather than reusing the lowest free one.
/// IDs still held by a context are skipped.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    min: u32,
    max: u32,
    next: u32,
}

impl IdAllocator {
    pub fn new(min: u32, max: u32) -> Self {
        debug_assert!(min <= max);
        Self {
            min,
            max,
            next: min,
        }
    }

    /// Number of IDs in the range
    pub fn range_len(&self) -> u64 {
        u64::from(self.max.saturating_sub(self.min)) + 1
    }

    /// ID the next scan starts from
    pub fn next_id(&self) -> u32 {
        self.next
    }

    /// Returns a free ID, or `None` when the store is at `capacity` or every
    /// ID of the range is in use.
    ///
    /// `in_use` tells whether an ID is held by a context; `nb_in_use` is the
    /// number of contexts currently holding an ID. Since at most `nb_in_use`
    /// IDs can be skipped, the scan is bounded by `nb_in_use + 1` steps.
    pub fn allocate<F>(&mut self, in_use: F, nb_in_use: usize, capacity: usize) -> Option<u32>
    where
        F: Fn(u32) -> bool,
    {
        if nb_in_use >= capacity || nb_in_use as u64 >= self.range_len() {
            return None;
        }

        let steps = (nb_in_use as u64 + 1).min(self.range_len());
        for _ in 0..steps {
            let candidate = self.next;
            self.next = if candidate == self.max {
                self.min
            } else {
                candidate + 1
            };
            if !in_use(candidate) {
                return Some(candidate);
            }
        }
        None
    }
}
