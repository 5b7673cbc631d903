//! The explicit free list and its next-fit search.
//!
//! Free blocks are threaded into one doubly linked list through the two
//! pointer-sized links overlaid on their payloads, so insertion and removal
//! are O(1) with no traversal. The list is anchored by a sentinel: the
//! prologue block's payload, whose 16 bytes of link storage exist for
//! exactly this purpose and which never leaves that role. Insertion is at
//! the head, so the most recently freed block is found first.

use crate::block::BlockPtr;

/// The free-block list plus the next-fit cursor that searches it.
#[derive(Debug)]
pub struct FreeList {
    /// The prologue block's payload. Permanently allocated, never returned
    /// by a search; only its link words are live.
    sentinel: BlockPtr,
    /// Next-fit rover. At rest this is the sentinel, a current list node,
    /// or null right after the node past the list end was removed;
    /// [`FreeList::find_fit`] treats null as "restart from the head".
    rover: BlockPtr,
}

impl FreeList {
    /// Anchor an empty list at `sentinel`.
    ///
    /// # Safety
    /// `sentinel` must be the payload of the prologue block, with 16
    /// writable bytes of link storage.
    pub unsafe fn new(sentinel: BlockPtr) -> Self {
        unsafe {
            sentinel.set_link_prev(BlockPtr::NULL);
            sentinel.set_link_next(BlockPtr::NULL);
        }
        Self {
            sentinel,
            rover: sentinel,
        }
    }

    #[inline]
    pub fn sentinel(&self) -> BlockPtr {
        self.sentinel
    }

    #[inline]
    pub fn rover(&self) -> BlockPtr {
        self.rover
    }

    /// Link `bp` in at the head, immediately after the sentinel.
    ///
    /// # Safety
    /// `bp` must be a free block of this heap that is not already listed.
    pub unsafe fn insert(&mut self, bp: BlockPtr) {
        unsafe {
            let head = self.sentinel.link_next();
            bp.set_link_next(head);
            bp.set_link_prev(self.sentinel);
            self.sentinel.set_link_next(bp);
            if !head.is_null() {
                head.set_link_prev(bp);
            }
        }
    }

    /// Splice `bp` out through its own stored links. If the rover sat on
    /// `bp`, it advances to `bp`'s forward link.
    ///
    /// # Safety
    /// `bp` must currently be in the list.
    pub unsafe fn remove(&mut self, bp: BlockPtr) {
        unsafe {
            let next = bp.link_next();
            let prev = bp.link_prev();
            if self.rover == bp {
                self.rover = next;
            }
            prev.set_link_next(next);
            if !next.is_null() {
                next.set_link_prev(prev);
            }
        }
    }

    /// Next-fit search for a free block of at least `asize` bytes: forward
    /// from the rover to the end of the list, then from the head up to (not
    /// including) the rover's old position. On success the rover moves to
    /// the returned block. The sentinel is never a match; its allocated bit
    /// fails the state check.
    ///
    /// # Safety
    /// The list must be consistent with the block tags it threads through.
    pub unsafe fn find_fit(&mut self, asize: usize) -> Option<BlockPtr> {
        unsafe {
            let old_rover = self.rover;
            let mut bp = old_rover;
            while !bp.is_null() {
                if !bp.is_allocated() && bp.size() >= asize {
                    self.rover = bp;
                    return Some(bp);
                }
                bp = bp.link_next();
            }
            bp = self.sentinel;
            while !bp.is_null() && bp != old_rover {
                if !bp.is_allocated() && bp.size() >= asize {
                    self.rover = bp;
                    return Some(bp);
                }
                bp = bp.link_next();
            }
            None
        }
    }

    /// After a merge, a rover caught strictly inside `merged`'s extent no
    /// longer names a block boundary; pull it back to the block's start.
    ///
    /// # Safety
    /// `merged` must be a block with valid tags.
    pub unsafe fn repair_rover(&mut self, merged: BlockPtr) {
        unsafe {
            let start = merged.addr();
            let end = merged.next().addr();
            let rover = self.rover.addr();
            if rover > start && rover < end {
                self.rover = merged;
            }
        }
    }
}
