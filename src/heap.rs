//! Addressable binary min-heap (C1).
//!
//! Keyed by an `f64` key and an integer payload id; ids are unique and an
//! auxiliary position map gives `Update`/`Contains` in `O(log n)` instead of the
//! `O(n)` scan a plain `BinaryHeap<Reverse<_>>` would need. Used only by the
//! matching engine's `Heuristic` phase (`spec.md` §4.1/§4.3) to iterate vertices
//! in non-decreasing current degree; nothing else in the crate needs an
//! addressable heap, so this stays a small, self-contained component rather than
//! a wrapper around a crate, matching the teacher's preference for hand-rolled,
//! allocation-light structures (`union_find.rs`) over a dependency for the
//! core's own data structures.

use crate::util::Weight;

/// a min-heap over `(key, id)` pairs; `id` must be in `[0, capacity)` and unique
/// among the heap's current contents.
#[derive(Debug, Clone)]
pub struct BinaryHeap {
    /// heap array of `(key, id)`, heap-ordered on `key`
    heap: Vec<(Weight, usize)>,
    /// `position[id]` is `id`'s index into `heap`, or `None` if `id` is absent
    position: Vec<Option<usize>>,
}

impl BinaryHeap {
    /// a heap that can hold ids in `[0, capacity)`
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            position: vec![None; capacity],
        }
    }

    pub fn size(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.position[id].is_some()
    }

    /// insert a fresh id; panics (via `debug_assert!`) if `id` is already present,
    /// since re-inserting a live id is always a caller bug, never a recoverable
    /// runtime condition.
    pub fn insert(&mut self, key: Weight, id: usize) {
        debug_assert!(!self.contains(id), "id {id} already present in heap");
        let index = self.heap.len();
        self.heap.push((key, id));
        self.position[id] = Some(index);
        self.sift_up(index);
    }

    /// remove and return the id with the smallest key; `None` if the heap is empty
    pub fn delete_min(&mut self) -> Option<usize> {
        if self.heap.is_empty() {
            return None;
        }
        let (_, min_id) = self.heap[0];
        let last = self.heap.pop().unwrap();
        self.position[min_id] = None;
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.position[last.1] = Some(0);
            self.sift_down(0);
        }
        Some(min_id)
    }

    /// change `id`'s key; `id` must already be present.
    pub fn update(&mut self, id: usize, key: Weight) {
        let index = self.position[id].expect("update called on absent id");
        let old_key = self.heap[index].0;
        self.heap[index].0 = key;
        if key < old_key {
            self.sift_up(index);
        } else if key > old_key {
            self.sift_down(index);
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index].0 < self.heap[parent].0 {
                self.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            let mut smallest = index;
            if left < len && self.heap[left].0 < self.heap[smallest].0 {
                smallest = left;
            }
            if right < len && self.heap[right].0 < self.heap[smallest].0 {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.swap(index, smallest);
            index = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.position[self.heap[a].1] = Some(a);
        self.position[self.heap[b].1] = Some(b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_min_returns_in_sorted_order() {
        let mut heap = BinaryHeap::new(5);
        heap.insert(3.0, 0);
        heap.insert(1.0, 1);
        heap.insert(4.0, 2);
        heap.insert(1.5, 3);
        heap.insert(2.0, 4);
        let mut order = Vec::new();
        while let Some(id) = heap.delete_min() {
            order.push(id);
        }
        assert_eq!(order, vec![1, 3, 4, 0, 2]);
    }

    #[test]
    fn update_reorders() {
        let mut heap = BinaryHeap::new(3);
        heap.insert(5.0, 0);
        heap.insert(6.0, 1);
        heap.insert(7.0, 2);
        heap.update(2, 1.0);
        assert_eq!(heap.delete_min(), Some(2));
        heap.update(1, 0.0);
        assert_eq!(heap.delete_min(), Some(1));
        assert_eq!(heap.delete_min(), Some(0));
    }

    #[test]
    fn contains_tracks_membership() {
        let mut heap = BinaryHeap::new(2);
        assert!(!heap.contains(0));
        heap.insert(1.0, 0);
        assert!(heap.contains(0));
        heap.delete_min();
        assert!(!heap.contains(0));
    }

    #[test]
    fn size_tracks_element_count() {
        let mut heap = BinaryHeap::new(3);
        assert_eq!(heap.size(), 0);
        heap.insert(1.0, 0);
        heap.insert(2.0, 1);
        assert_eq!(heap.size(), 2);
        heap.delete_min();
        assert_eq!(heap.size(), 1);
        assert!(!heap.is_empty());
        heap.delete_min();
        assert!(heap.is_empty());
    }
}
