const EMPTY: u32 = u32::MAX;

/// Fixed-capacity history keyed by world index. A slot only answers for the
/// index that last wrote it.
#[derive(Debug, Clone)]
pub struct IndexedRing<T> {
    slots: Vec<Option<T>>,
    indices: Vec<u32>,
}

impl<T: Clone> IndexedRing<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: vec![None; capacity],
            indices: vec![EMPTY; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, index: u32) -> usize {
        index as usize % self.slots.len()
    }

    pub fn save(&mut self, index: u32, value: T) {
        let slot = self.slot(index);
        self.slots[slot] = Some(value);
        self.indices[slot] = index;
    }

    pub fn contains(&self, index: u32) -> bool {
        self.indices[self.slot(index)] == index
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        let slot = self.slot(index);
        if self.indices[slot] == index {
            self.slots[slot].as_ref()
        } else {
            None
        }
    }

    pub fn latest_at_or_before(&self, index: u32) -> Option<(u32, &T)> {
        let oldest = index.saturating_sub(self.capacity() as u32 - 1);
        (oldest..=index)
            .rev()
            .find_map(|i| self.get(i).map(|value| (i, value)))
    }

    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.indices.fill(EMPTY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn o1_lookup_rejects_stale_slots() {
        let mut ring = IndexedRing::new(4);
        ring.save(1, "one");
        ring.save(5, "five");
        assert!(ring.get(1).is_none());
        assert_eq!(ring.get(5), Some(&"five"));
        assert!(!ring.contains(9));
    }

    #[test]
    fn latest_at_or_before_scans_back() {
        let mut ring = IndexedRing::new(8);
        ring.save(2, 'a');
        assert_eq!(ring.latest_at_or_before(6), Some((2, &'a')));
        assert_eq!(ring.latest_at_or_before(1), None);
    }
}
