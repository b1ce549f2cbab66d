use std::collections::BTreeMap;

/// Messages held until the step they belong to is simulated. Messages sharing
/// an index come back out in the order they went in.
#[derive(Debug, Clone)]
pub struct IndexedQueue<T> {
    entries: BTreeMap<u32, Vec<T>>,
    len: usize,
}

impl<T> Default for IndexedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndexedQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, index: u32, item: T) {
        self.entries.entry(index).or_default().push(item);
        self.len += 1;
    }

    /// Everything stored at or before `index`, oldest index first.
    pub fn take_through(&mut self, index: u32) -> Vec<T> {
        let later = match index.checked_add(1) {
            Some(next) => self.entries.split_off(&next),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.entries, later);
        let items: Vec<T> = due.into_values().flatten().collect();
        self.len -= items.len();
        items
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_index_keeps_arrival_order() {
        let mut queue = IndexedQueue::new();
        queue.insert(5, "a");
        queue.insert(6, "x");
        queue.insert(5, "b");
        queue.insert(5, "c");
        assert_eq!(queue.take_through(5), vec!["a", "b", "c"]);
        assert_eq!(queue.len(), 1);
        assert!(queue.take_through(5).is_empty());
    }

    #[test]
    fn take_through_drains_in_index_order() {
        let mut queue = IndexedQueue::new();
        queue.insert(9, 90);
        queue.insert(3, 30);
        queue.insert(7, 70);
        queue.insert(3, 31);
        assert_eq!(queue.take_through(7), vec![30, 31, 70]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take_through(u32::MAX), vec![90]);
        assert!(queue.is_empty());
    }
}
