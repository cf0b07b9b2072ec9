//! Node arena with recyclable indices.
//!
//! [`NodeStorage`] maps dense node indices to [`NodeRecord`]s. A node may own
//! 1 to 3 contiguous path-node slots ("variants"). Freed indices go onto a
//! recycle stack per variant count and are handed out again before the
//! high-water mark is bumped.
//!
//! The backing table grows to the next power of two. Growth also resizes
//! every registered worker [`ScratchBuffer`], so references into a buffer
//! must not be held across anything that can allocate. In practice the
//! arena is only mutated under the `NavData` write lock while all workers
//! are paused.

mod record;
mod scratch;

pub use record::{NodeIndex, NodeRecord};
pub use scratch::ScratchBuffer;

pub(crate) use record::Slot;

use std::sync::{Arc, Weak};

use log::{debug, trace};
use parking_lot::Mutex;

use crate::core::Int3;
use crate::error::StorageError;
use crate::graph::GraphIndex;

/// Maximum path-node variants per node
pub const MAX_VARIANTS: u8 = 3;

/// First index used for temporary (start/end) nodes
pub const TEMPORARY_NODE_START: NodeIndex = 1 << 25;

/// Exclusive upper bound of any path-node index (26-bit parent field)
pub const MAX_PATH_NODE_INDEX: NodeIndex = 1 << 26;

/// Arena of graph nodes.
#[derive(Debug)]
pub struct NodeStorage {
    slots: Vec<Slot>,
    /// High-water mark; index 0 is reserved as "no node"
    next_index: NodeIndex,
    recycled: [Vec<NodeIndex>; MAX_VARIANTS as usize],
    scratch: Vec<Weak<Mutex<ScratchBuffer>>>,
    live: usize,
}

impl Default for NodeStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStorage {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create with room for `capacity` slots (rounded up to a power of two)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            slots: vec![Slot::Free; capacity],
            next_index: 1,
            recycled: Default::default(),
            scratch: Vec::new(),
            live: 0,
        }
    }

    /// Allocate a node with `variants` path-node slots.
    ///
    /// Returns the base index. The record starts walkable, untagged and
    /// unassigned to any hierarchical node.
    pub fn allocate(
        &mut self,
        graph: GraphIndex,
        position: Int3,
        variants: u8,
    ) -> Result<NodeIndex, StorageError> {
        if variants == 0 || variants > MAX_VARIANTS {
            return Err(StorageError::InvalidVariantCount(variants));
        }

        let index = match self.recycled[variants as usize - 1].pop() {
            Some(index) => index,
            None => {
                let index = self.next_index;
                let end = index + variants as NodeIndex;
                if end > TEMPORARY_NODE_START {
                    return Err(StorageError::Exhausted(self.next_index));
                }
                self.next_index = end;
                self.grow_to(end as usize);
                index
            }
        };

        self.slots[index as usize] = Slot::Node(NodeRecord::new(graph, position, variants));
        for v in 1..variants as NodeIndex {
            self.slots[(index + v) as usize] = Slot::Variant { base: index };
        }
        self.live += 1;
        trace!("[NodeStorage] allocate {} (variants={})", index, variants);
        Ok(index)
    }

    /// Free a node, recycling its index and invalidating scratch slots.
    pub fn free(&mut self, index: NodeIndex) -> Result<(), StorageError> {
        let variants = match self.slots.get(index as usize) {
            Some(Slot::Node(record)) => record.variants,
            _ => return Err(StorageError::NotAllocated(index)),
        };

        for v in 0..variants as NodeIndex {
            self.slots[(index + v) as usize] = Slot::Free;
        }

        self.scratch.retain(|weak| weak.strong_count() > 0);
        for weak in &self.scratch {
            if let Some(buffer) = weak.upgrade() {
                let mut buffer = buffer.lock();
                for v in 0..variants as NodeIndex {
                    buffer.reset_slot(index + v);
                }
            }
        }

        self.recycled[variants as usize - 1].push(index);
        self.live -= 1;
        trace!("[NodeStorage] free {} (variants={})", index, variants);
        Ok(())
    }

    /// Register a new worker scratch buffer sized to the arena.
    pub fn register_scratch(&mut self) -> Arc<Mutex<ScratchBuffer>> {
        let buffer = Arc::new(Mutex::new(ScratchBuffer::with_capacity(self.slots.len())));
        self.scratch.retain(|weak| weak.strong_count() > 0);
        self.scratch.push(Arc::downgrade(&buffer));
        buffer
    }

    fn grow_to(&mut self, required: usize) {
        if required <= self.slots.len() {
            return;
        }
        let capacity = required.next_power_of_two();
        debug!(
            "[NodeStorage] growing {} -> {} slots",
            self.slots.len(),
            capacity
        );
        self.slots.resize(capacity, Slot::Free);

        self.scratch.retain(|weak| weak.strong_count() > 0);
        for weak in &self.scratch {
            if let Some(buffer) = weak.upgrade() {
                buffer.lock().resize(capacity);
            }
        }
    }

    /// Record of the node owning path-node `index` (resolves variants)
    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&NodeRecord> {
        match self.slots.get(index as usize)? {
            Slot::Node(record) => Some(record),
            Slot::Variant { base } => match self.slots.get(*base as usize)? {
                Slot::Node(record) => Some(record),
                _ => None,
            },
            Slot::Free => None,
        }
    }

    /// Mutable record of the node owning path-node `index`
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut NodeRecord> {
        let base = self.base_of(index)?;
        match self.slots.get_mut(base as usize)? {
            Slot::Node(record) => Some(record),
            _ => None,
        }
    }

    /// Base index of the node owning path-node `index`
    #[inline]
    pub fn base_of(&self, index: NodeIndex) -> Option<NodeIndex> {
        match self.slots.get(index as usize)? {
            Slot::Node(_) => Some(index),
            Slot::Variant { base } => Some(*base),
            Slot::Free => None,
        }
    }

    /// True if `index` is the base slot of a live node
    #[inline]
    pub fn is_live(&self, index: NodeIndex) -> bool {
        matches!(self.slots.get(index as usize), Some(Slot::Node(_)))
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Current table size (always a power of two)
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// One past the highest index ever handed out
    pub fn high_water_mark(&self) -> NodeIndex {
        self.next_index
    }

    /// Number of recycled indices waiting for reuse
    pub fn recycled_count(&self) -> usize {
        self.recycled.iter().map(Vec::len).sum()
    }

    /// Number of live scratch buffers
    pub fn scratch_buffers(&self) -> usize {
        self.scratch.iter().filter(|w| w.strong_count() > 0).count()
    }

    /// Iterate live nodes (base indices only)
    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &NodeRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Slot::Node(record) => Some((i as NodeIndex, record)),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn alloc(storage: &mut NodeStorage, variants: u8) -> NodeIndex {
        storage.allocate(0, Int3::ZERO, variants).unwrap()
    }

    #[test]
    fn test_allocate_bumps_and_grows() {
        let mut storage = NodeStorage::new();
        assert_eq!(storage.capacity(), 1);

        let a = alloc(&mut storage, 1);
        let b = alloc(&mut storage, 3);
        let c = alloc(&mut storage, 1);
        assert_eq!((a, b, c), (1, 2, 5));
        assert_eq!(storage.capacity(), 8);
        assert!(storage.capacity().is_power_of_two());
        assert_eq!(storage.len(), 3);
    }

    #[test]
    fn test_variant_slots_resolve_to_base() {
        let mut storage = NodeStorage::new();
        let base = alloc(&mut storage, 3);
        assert_eq!(storage.base_of(base + 2), Some(base));
        assert_eq!(storage.get(base + 1).map(|r| r.variants), Some(3));
        assert!(storage.is_live(base));
        assert!(!storage.is_live(base + 1));
    }

    #[test]
    fn test_recycle_matches_variant_count() {
        let mut storage = NodeStorage::new();
        let a = alloc(&mut storage, 2);
        let _b = alloc(&mut storage, 1);
        storage.free(a).unwrap();

        // Single-variant request does not take the two-slot hole
        let c = alloc(&mut storage, 1);
        assert_ne!(c, a);
        let d = alloc(&mut storage, 2);
        assert_eq!(d, a);
        assert_eq!(storage.recycled_count(), 0);
    }

    #[test]
    fn test_double_free_rejected() {
        let mut storage = NodeStorage::new();
        let a = alloc(&mut storage, 1);
        storage.free(a).unwrap();
        assert_eq!(storage.free(a), Err(StorageError::NotAllocated(a)));
        assert!(storage.get(a).is_none());
    }

    #[test]
    fn test_invalid_variant_count() {
        let mut storage = NodeStorage::new();
        assert_eq!(
            storage.allocate(0, Int3::ZERO, 4),
            Err(StorageError::InvalidVariantCount(4))
        );
        assert_eq!(
            storage.allocate(0, Int3::ZERO, 0),
            Err(StorageError::InvalidVariantCount(0))
        );
    }

    #[test]
    fn test_scratch_resized_on_growth() {
        let mut storage = NodeStorage::new();
        let buffer = storage.register_scratch();
        for _ in 0..100 {
            alloc(&mut storage, 1);
        }
        assert_eq!(buffer.lock().capacity(), storage.capacity());
        assert_eq!(storage.scratch_buffers(), 1);

        drop(buffer);
        assert_eq!(storage.scratch_buffers(), 0);
    }

    #[test]
    fn test_free_resets_scratch_slots() {
        let mut storage = NodeStorage::new();
        let buffer = storage.register_scratch();
        let a = alloc(&mut storage, 2);
        {
            let mut scratch = buffer.lock();
            scratch.get_mut(a).path_id = 7;
            scratch.get_mut(a + 1).path_id = 7;
        }
        storage.free(a).unwrap();
        let again = alloc(&mut storage, 2);
        assert_eq!(again, a);

        let scratch = buffer.lock();
        assert_eq!(scratch.get(a).path_id, 0);
        assert_eq!(scratch.get(a + 1).path_id, 0);
    }

    #[test]
    fn test_random_allocate_free_unique() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let mut storage = NodeStorage::new();
        let mut live: Vec<(NodeIndex, u8)> = Vec::new();

        for _ in 0..2000 {
            if live.is_empty() || rng.random_bool(0.6) {
                let variants = rng.random_range(1..=3u8);
                let index = alloc(&mut storage, variants);
                live.push((index, variants));
            } else {
                let i = rng.random_range(0..live.len());
                let (index, _) = live.swap_remove(i);
                storage.free(index).unwrap();
            }

            // No two live nodes share any slot
            let mut used = HashSet::new();
            for &(index, variants) in &live {
                for v in 0..variants as NodeIndex {
                    assert!(used.insert(index + v), "slot {} reused", index + v);
                }
            }
        }
        assert_eq!(storage.len(), live.len());
    }
}
