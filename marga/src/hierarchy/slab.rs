//! Size-class slab allocator for hierarchical adjacency lists.
//!
//! All lists live in one `Vec<u32>`. Blocks come in power-of-two size
//! classes (4, 8, 16, ...) with a free list per class. A full list moves to
//! the next class and its old block is recycled.

const MIN_BLOCK: u32 = 4;

/// Handle to a list stored in a [`SlabAllocator`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlabList {
    offset: u32,
    len: u32,
    /// Size class + 1 (0 = no block)
    class: u8,
}

impl SlabList {
    pub const EMPTY: SlabList = SlabList {
        offset: 0,
        len: 0,
        class: 0,
    };

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    fn capacity(&self) -> u32 {
        if self.class == 0 {
            0
        } else {
            MIN_BLOCK << (self.class - 1)
        }
    }
}

#[derive(Debug, Default)]
pub struct SlabAllocator {
    data: Vec<u32>,
    free: Vec<Vec<u32>>,
}

impl SlabAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, class: u8) -> u32 {
        let slot = class as usize - 1;
        if slot >= self.free.len() {
            self.free.resize_with(slot + 1, Vec::new);
        }
        if let Some(offset) = self.free[slot].pop() {
            return offset;
        }
        let offset = self.data.len() as u32;
        self.data
            .resize(self.data.len() + (MIN_BLOCK << (class - 1)) as usize, 0);
        offset
    }

    /// Contents of a list
    #[inline]
    pub fn get(&self, list: &SlabList) -> &[u32] {
        let start = list.offset as usize;
        &self.data[start..start + list.len as usize]
    }

    pub fn contains(&self, list: &SlabList, value: u32) -> bool {
        self.get(list).contains(&value)
    }

    /// Append a value, moving to a larger block when full
    pub fn push(&mut self, list: &mut SlabList, value: u32) {
        if list.len == list.capacity() {
            let class = list.class + 1;
            let offset = self.allocate(class);
            let old = list.offset as usize;
            self.data
                .copy_within(old..old + list.len as usize, offset as usize);
            if list.class != 0 {
                self.free[list.class as usize - 1].push(list.offset);
            }
            list.offset = offset;
            list.class = class;
        }
        self.data[(list.offset + list.len) as usize] = value;
        list.len += 1;
    }

    /// Remove a value (order not preserved). Returns true if found.
    pub fn remove(&mut self, list: &mut SlabList, value: u32) -> bool {
        let start = list.offset as usize;
        let end = start + list.len as usize;
        let Some(i) = self.data[start..end].iter().position(|&v| v == value) else {
            return false;
        };
        self.data[start + i] = self.data[end - 1];
        list.len -= 1;
        true
    }

    /// Release a list's block
    pub fn free(&mut self, list: &mut SlabList) {
        if list.class != 0 {
            self.free[list.class as usize - 1].push(list.offset);
        }
        *list = SlabList::EMPTY;
    }

    /// Total words reserved
    pub fn reserved(&self) -> usize {
        self.data.len()
    }
}
