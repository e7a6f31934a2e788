use parking_lot::Mutex;
use std::collections::VecDeque;

/// Small least-recently-used cache for driver handles.
///
/// Capacities are a handful of entries, so lookups scan a deque kept in
/// recency order (most recent first).
pub(crate) struct LruCache<K, V> {
    entries: Mutex<VecDeque<(K, V)>>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: PartialEq,
    V: Clone,
{
    pub(crate) const fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Returns a clone of the cached value and marks it most recently used.
    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let index = entries.iter().position(|(k, _)| k == key)?;
        let entry = entries.remove(index)?;
        let value = entry.1.clone();
        entries.push_front(entry);
        Some(value)
    }

    /// Caches `value` unless `key` is already present, in which case the
    /// cached value wins. Returns the value that ends up cached.
    pub(crate) fn insert(&self, key: K, value: V) -> V {
        let mut entries = self.entries.lock();
        if let Some(index) = entries.iter().position(|(k, _)| *k == key) {
            if let Some(entry) = entries.remove(index) {
                let cached = entry.1.clone();
                entries.push_front(entry);
                return cached;
            }
        }

        entries.push_front((key, value.clone()));
        entries.truncate(self.capacity);
        value
    }

    /// Returns the cached value for `key`, or creates it with `init` and
    /// caches it. Errors from `init` are returned and nothing is cached.
    ///
    /// The lock is not held while `init` runs; when two callers race, the
    /// value inserted first is kept and returned to both.
    pub(crate) fn get_or_try_insert_with<E>(
        &self,
        key: K,
        init: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = init(&key)?;
        Ok(self.insert(key, value))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }
}
