//! Best-effort heap consistency checking.
//!
//! Diagnostic only: violations are counted and logged through the `log`
//! facade, never raised. Invoked explicitly, never on the allocation path.

use log::{debug, error};

use crate::block::BlockPtr;
use crate::grow::HeapSource;
use crate::heap::Heap;
use crate::{ALIGNMENT, MIN_BLOCK_SIZE};

/// Point-in-time summary of the managed region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Total bytes ever obtained from the growth source.
    pub bytes_grown: usize,
    /// Bytes accounted to blocks in the physical chain, prologue included.
    /// Always [`crate::REGION_OVERHEAD`] short of `bytes_grown`.
    pub bytes_in_blocks: usize,
    /// Blocks in the physical chain, prologue included.
    pub blocks: usize,
    /// Free blocks in the physical chain.
    pub free_blocks: usize,
    /// Bytes held by free blocks.
    pub free_bytes: usize,
}

impl<S: HeapSource> Heap<S> {
    /// Walk the physical chain from the prologue to the epilogue and then
    /// the free list, validating the layout invariants: prologue and
    /// epilogue tags, payload alignment, header/footer agreement, full
    /// coalescing, and free-list membership matching the free tag bits.
    /// Returns the number of violations found; each is logged. With
    /// `verbose`, every block is also dumped at debug level.
    pub fn check(&self, verbose: bool) -> usize {
        let mut violations = 0;
        // SAFETY: base is the prologue of a region this heap owns; the walk
        // is bounded by the epilogue's zero size.
        unsafe {
            let prologue = self.base;
            if verbose {
                debug!("heap ({:p}):", prologue.payload());
            }
            if prologue.size() != MIN_BLOCK_SIZE || !prologue.is_allocated() {
                error!("bad prologue tag at {:p}", prologue.payload());
                violations += 1;
            }

            let mut chain_blocks = 0usize;
            let mut chain_free = 0usize;
            let mut prev_free = false;
            let mut bp = prologue;
            while bp.size() > 0 {
                if verbose {
                    debug!(
                        "  {:p}: size {} [{}]",
                        bp.payload(),
                        bp.size(),
                        if bp.is_allocated() { "alloc" } else { "free" },
                    );
                }
                violations += check_block(bp);
                let free = !bp.is_allocated();
                if free && prev_free {
                    error!("adjacent free blocks at {:p}", bp.payload());
                    violations += 1;
                }
                if free {
                    chain_free += 1;
                }
                prev_free = free;
                chain_blocks += 1;
                bp = bp.next();
            }
            if verbose {
                debug!("  {:p}: epilogue", bp.payload());
            }
            if bp.size() != 0 || !bp.is_allocated() {
                error!("bad epilogue tag at {:p}", bp.payload());
                violations += 1;
            }

            // Free-list walk, bounded by the chain length so a cycle or a
            // duplicated node cannot hang the checker.
            let mut listed = 0usize;
            let mut node = self.free.sentinel().link_next();
            while !node.is_null() && listed <= chain_blocks {
                if node.is_allocated() {
                    error!("allocated block {:p} on the free list", node.payload());
                    violations += 1;
                }
                if node.link_prev().link_next() != node {
                    error!("broken backward link at {:p}", node.payload());
                    violations += 1;
                }
                listed += 1;
                node = node.link_next();
            }
            if listed != chain_free {
                error!(
                    "free list holds {} blocks, chain marks {} free",
                    listed, chain_free
                );
                violations += 1;
            }
        }
        violations
    }

    /// Summarize the region by walking the physical chain.
    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            bytes_grown: self.grown,
            bytes_in_blocks: 0,
            blocks: 0,
            free_blocks: 0,
            free_bytes: 0,
        };
        // SAFETY: as in `check`.
        unsafe {
            let mut bp = self.base;
            while bp.size() > 0 {
                stats.blocks += 1;
                stats.bytes_in_blocks += bp.size();
                if !bp.is_allocated() {
                    stats.free_blocks += 1;
                    stats.free_bytes += bp.size();
                }
                bp = bp.next();
            }
        }
        stats
    }
}

/// Per-block invariants: payload alignment and boundary-tag agreement.
///
/// # Safety
/// `bp` must name a non-epilogue block boundary in a live region.
unsafe fn check_block(bp: BlockPtr) -> usize {
    let mut violations = 0;
    if bp.addr() % ALIGNMENT != 0 {
        error!("{:p} is not doubleword aligned", bp.payload());
        violations += 1;
    }
    unsafe {
        if bp.header().read() != bp.footer().read() {
            error!("header does not match footer at {:p}", bp.payload());
            violations += 1;
        }
    }
    violations
}
