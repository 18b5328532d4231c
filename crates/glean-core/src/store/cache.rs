use std::collections::BTreeMap;

/// Chapter text keyed by chapter index.
///
/// Eviction is by distance from the reading position, not by recency:
/// once the cache holds more than `capacity` entries, [`prune_around`]
/// drops every entry farther than `prune_distance` from the given index.
///
/// [`prune_around`]: ChapterCache::prune_around
#[derive(Debug, Clone)]
pub struct ChapterCache {
    entries: BTreeMap<usize, String>,
    capacity: usize,
    prune_distance: usize,
}

impl ChapterCache {
    pub fn new(capacity: usize, prune_distance: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
            prune_distance,
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(&index).map(String::as_str)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn insert(&mut self, index: usize, content: String) {
        self.entries.insert(index, content);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn indices(&self) -> Vec<usize> {
        self.entries.keys().copied().collect()
    }

    /// Returns the number of evicted entries.
    pub fn prune_around(&mut self, center: usize) -> usize {
        if self.entries.len() <= self.capacity {
            return 0;
        }
        let before = self.entries.len();
        let distance = self.prune_distance;
        self.entries
            .retain(|index, _| index.abs_diff(center) <= distance);
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(indices: impl IntoIterator<Item = usize>) -> ChapterCache {
        let mut cache = ChapterCache::new(20, 10);
        for index in indices {
            cache.insert(index, format!("chapter {index}"));
        }
        cache
    }

    #[test]
    fn no_pruning_at_or_below_capacity() {
        let mut cache = filled(0..20);
        assert_eq!(cache.prune_around(0), 0);
        assert_eq!(cache.len(), 20);
    }

    #[test]
    fn pruning_keeps_the_window_around_the_center() {
        let mut cache = filled(0..30);
        let evicted = cache.prune_around(15);
        assert_eq!(evicted, 9);
        assert_eq!(cache.indices(), (5..=25).collect::<Vec<_>>());
        assert_eq!(cache.get(15), Some("chapter 15"));
        assert!(!cache.contains(4));
    }

    #[test]
    fn pruning_ignores_insertion_order() {
        let mut cache = filled((0..25).rev());
        cache.prune_around(0);
        assert_eq!(cache.indices(), (0..=10).collect::<Vec<_>>());
    }
}
