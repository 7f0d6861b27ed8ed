use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("cannot dequeue from an empty sliding max queue")]
    Empty,
}

/// Monotonic deque for linear-time sliding window maximum.
///
/// Backed by a plain `Vec` and a front cursor: entries before `front` are
/// dequeued. From `front` onward values are strictly decreasing, so
/// `items[front]` is always the current window max.
#[derive(Debug, Clone)]
pub struct SlidingMaxQueue<K, V> {
    items: Vec<(K, V)>,
    front: usize,
}

impl<K, V> Default for SlidingMaxQueue<K, V> {
    fn default() -> Self {
        Self { items: Vec::new(), front: 0 }
    }
}

impl<K, V: PartialOrd> SlidingMaxQueue<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { items: Vec::with_capacity(capacity), front: 0 }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.front == self.items.len()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len() - self.front
    }

    /// Appends `(key, value)`, first dropping every tail entry whose value is
    /// `<= value`. Those can never be the max again while this one is queued.
    pub fn enqueue(&mut self, key: K, value: V) {
        while self.items.len() > self.front
            && self.items.last().is_some_and(|(_, v)| *v <= value)
        {
            self.items.pop();
        }
        self.items.push((key, value));
    }

    #[inline(always)]
    pub fn max(&self) -> Option<&(K, V)> {
        self.items.get(self.front)
    }

    pub fn dequeue_max(&mut self) -> Result<&(K, V), QueueError> {
        if self.is_empty() {
            return Err(QueueError::Empty);
        }
        self.front += 1;
        Ok(&self.items[self.front - 1])
    }

    /// Active entries, front (max) first.
    pub fn iter(&self) -> impl Iterator<Item = &(K, V)> {
        self.items[self.front..].iter()
    }
}
