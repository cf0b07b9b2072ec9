//! Bit-packed per-worker search record.
//!
//! Packed word layout:
//!
//! ```text
//!  31   30   29..26     25..0
//! ┌────┬────┬─────────┬──────────────────────┐
//! │ F2 │ F1 │ fraction│ parent path-node idx │
//! └────┴────┴─────────┴──────────────────────┘
//! ```

use crate::storage::NodeIndex;

const PARENT_MASK: u32 = (1 << 26) - 1;
const FRACTION_SHIFT: u32 = 26;
const FRACTION_MASK: u32 = 0xF << FRACTION_SHIFT;
const FLAG1: u32 = 1 << 30;
const FLAG2: u32 = 1 << 31;
const FLAGS_MASK: u32 = FLAG1 | FLAG2;

/// Heap index sentinel for nodes that are not on the open list
pub const NOT_IN_HEAP: u32 = u32::MAX;

/// Quantized edge fraction range (0..=15)
pub const FRACTION_MAX: u8 = 15;

/// Fraction used for node centers and temporary nodes
pub const FRACTION_CENTER: u8 = 8;

/// Search scratch for one (worker, path-node index) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathNode {
    /// Generation stamp of the request that last touched this slot (0 = never)
    pub path_id: u16,
    /// Position in the open list, or [`NOT_IN_HEAP`]
    pub heap_index: u32,
    packed: u32,
}

impl Default for PathNode {
    fn default() -> Self {
        Self {
            path_id: 0,
            heap_index: NOT_IN_HEAP,
            packed: 0,
        }
    }
}

impl PathNode {
    #[inline]
    pub fn parent(&self) -> NodeIndex {
        self.packed & PARENT_MASK
    }

    #[inline]
    pub fn set_parent(&mut self, parent: NodeIndex) {
        debug_assert!(parent <= PARENT_MASK);
        self.packed = (self.packed & !PARENT_MASK) | (parent & PARENT_MASK);
    }

    #[inline]
    pub fn fraction(&self) -> u8 {
        ((self.packed & FRACTION_MASK) >> FRACTION_SHIFT) as u8
    }

    #[inline]
    pub fn set_fraction(&mut self, fraction: u8) {
        let f = (fraction.min(FRACTION_MAX) as u32) << FRACTION_SHIFT;
        self.packed = (self.packed & !FRACTION_MASK) | f;
    }

    /// Marks nodes with a synthesized connection to the temporary end node
    #[inline]
    pub fn flag1(&self) -> bool {
        self.packed & FLAG1 != 0
    }

    #[inline]
    pub fn set_flag1(&mut self, on: bool) {
        if on {
            self.packed |= FLAG1;
        } else {
            self.packed &= !FLAG1;
        }
    }

    /// Marks nodes already visited by the current trace-back
    #[inline]
    pub fn flag2(&self) -> bool {
        self.packed & FLAG2 != 0
    }

    #[inline]
    pub fn set_flag2(&mut self, on: bool) {
        if on {
            self.packed |= FLAG2;
        } else {
            self.packed &= !FLAG2;
        }
    }

    /// True if this slot was touched by the request with stamp `path_id`
    #[inline]
    pub fn is_current(&self, path_id: u16) -> bool {
        self.path_id == path_id
    }

    /// Claim the slot for a new request. Flags survive, they are cleared
    /// explicitly by the handler.
    #[inline]
    pub fn touch(&mut self, path_id: u16) {
        self.path_id = path_id;
        self.heap_index = NOT_IN_HEAP;
        self.packed &= FLAGS_MASK;
    }
}
