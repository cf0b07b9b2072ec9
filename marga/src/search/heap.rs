//! Binary min-heap open list.
//!
//! Entries are ordered by F = G + H. Ties go to the smaller H when a
//! heuristic is active (straighter paths on grids), otherwise to insertion
//! order. Each move writes the entry's slot back into its [`PathNode`] so
//! decrease-key is O(log n).

use crate::storage::{NodeIndex, ScratchBuffer};

use super::path_node::NOT_IN_HEAP;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapEntry {
    pub node: NodeIndex,
    pub f: u32,
    pub g: u32,
    pub h: u32,
    seq: u32,
}

#[derive(Debug, Default)]
pub struct OpenList {
    entries: Vec<HeapEntry>,
    tie_break_on_h: bool,
    next_seq: u32,
}

impl OpenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the heap and pick the tie-break rule for the next search
    pub fn reset(&mut self, tie_break_on_h: bool) {
        self.entries.clear();
        self.tie_break_on_h = tie_break_on_h;
        self.next_seq = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entry(&self, heap_index: u32) -> &HeapEntry {
        &self.entries[heap_index as usize]
    }

    #[inline]
    fn less(&self, a: &HeapEntry, b: &HeapEntry) -> bool {
        if a.f != b.f {
            return a.f < b.f;
        }
        if self.tie_break_on_h && a.h != b.h {
            return a.h < b.h;
        }
        a.seq < b.seq
    }

    pub fn push(&mut self, scratch: &mut ScratchBuffer, node: NodeIndex, g: u32, h: u32) {
        let entry = HeapEntry {
            node,
            f: g.saturating_add(h),
            g,
            h,
            seq: self.next_seq,
        };
        self.next_seq = self.next_seq.wrapping_add(1);
        self.entries.push(entry);
        let i = self.entries.len() - 1;
        scratch.get_mut(node).heap_index = i as u32;
        self.sift_up(scratch, i);
    }

    /// Remove the best entry. Its PathNode is marked as not in heap.
    pub fn pop(&mut self, scratch: &mut ScratchBuffer) -> Option<HeapEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let top = self.entries.swap_remove(0);
        scratch.get_mut(top.node).heap_index = NOT_IN_HEAP;
        if !self.entries.is_empty() {
            scratch.get_mut(self.entries[0].node).heap_index = 0;
            self.sift_down(scratch, 0);
        }
        Some(top)
    }

    /// Lower the scores of an entry already in the heap
    pub fn decrease(&mut self, scratch: &mut ScratchBuffer, heap_index: u32, g: u32, h: u32) {
        let i = heap_index as usize;
        let entry = &mut self.entries[i];
        entry.g = g;
        entry.h = h;
        entry.f = g.saturating_add(h);
        self.sift_up(scratch, i);
    }

    fn sift_up(&mut self, scratch: &mut ScratchBuffer, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(&self.entries[i], &self.entries[parent]) {
                break;
            }
            self.swap(scratch, i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, scratch: &mut ScratchBuffer, mut i: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut best = left;
            if right < len && self.less(&self.entries[right], &self.entries[left]) {
                best = right;
            }
            if !self.less(&self.entries[best], &self.entries[i]) {
                break;
            }
            self.swap(scratch, i, best);
            i = best;
        }
    }

    #[inline]
    fn swap(&mut self, scratch: &mut ScratchBuffer, a: usize, b: usize) {
        self.entries.swap(a, b);
        scratch.get_mut(self.entries[a].node).heap_index = a as u32;
        scratch.get_mut(self.entries[b].node).heap_index = b as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pops_in_f_order() {
        let mut scratch = ScratchBuffer::with_capacity(16);
        let mut heap = OpenList::new();
        heap.reset(true);
        for (node, g, h) in [(1, 50, 10), (2, 10, 5), (3, 30, 0), (4, 5, 100)] {
            heap.push(&mut scratch, node, g, h);
        }
        let order: Vec<_> = std::iter::from_fn(|| heap.pop(&mut scratch)).map(|e| e.node).collect();
        assert_eq!(order, vec![2, 3, 1, 4]);
        assert_eq!(scratch.get(2).heap_index, NOT_IN_HEAP);
    }

    #[test]
    fn test_tie_break_by_h() {
        let mut scratch = ScratchBuffer::with_capacity(8);
        let mut heap = OpenList::new();
        heap.reset(true);
        heap.push(&mut scratch, 1, 60, 40);
        heap.push(&mut scratch, 2, 90, 10);
        assert_eq!(heap.pop(&mut scratch).map(|e| e.node), Some(2));
    }

    #[test]
    fn test_tie_break_by_insertion_without_heuristic() {
        let mut scratch = ScratchBuffer::with_capacity(8);
        let mut heap = OpenList::new();
        heap.reset(false);
        heap.push(&mut scratch, 1, 60, 40);
        heap.push(&mut scratch, 2, 90, 10);
        assert_eq!(heap.pop(&mut scratch).map(|e| e.node), Some(1));
    }

    #[test]
    fn test_decrease_key_tracks_index() {
        let mut scratch = ScratchBuffer::with_capacity(16);
        let mut heap = OpenList::new();
        heap.reset(true);
        for node in 1..=8 {
            heap.push(&mut scratch, node, node * 10, 0);
        }
        for node in 1..=8 {
            let i = scratch.get(node).heap_index;
            assert_eq!(heap.entry(i).node, node);
        }
        let i = scratch.get(8).heap_index;
        heap.decrease(&mut scratch, i, 1, 0);
        assert_eq!(scratch.get(8).heap_index, 0);
        assert_eq!(heap.pop(&mut scratch).map(|e| (e.node, e.f)), Some((8, 1)));
        assert_eq!(heap.len(), 7);
    }
}
