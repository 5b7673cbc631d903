//! rnfmalloc: an explicit-free-list malloc-style allocator.
//!
//! Implements the classic boundary-tag heap design:
//! - A 4-byte header and footer on every block (two-way physical traversal)
//! - A doubly linked free list threaded through free-block payloads,
//!   anchored by a sentinel inside the permanently allocated prologue
//! - Next-fit search with a roving cursor
//! - Immediate coalescing of adjacent free blocks on release
//!
//! The allocator is a context object: it owns a growth source (its only
//! external collaborator) and all of its state, and is passed explicitly.
//! Single logical caller by design; `Heap` is `!Sync` by construction and
//! there is deliberately no process-wide instance.
//!
//! # Usage
//!
//! ```ignore
//! use rnfmalloc::{FixedSource, Heap};
//!
//! let source = FixedSource::new(1 << 20).expect("backing memory");
//! let mut heap = Heap::bootstrap(source).expect("initial growth");
//! let p = heap.malloc(100);
//! unsafe { heap.free(p) };
//! ```

pub mod block;
pub mod check;
pub mod free_list;
pub mod grow;
pub mod heap;

/// Double-word alignment of payloads and block sizes (bytes).
pub const ALIGNMENT: usize = 8;

/// Smallest legal block: 8 bytes of boundary tags plus 16 bytes that must be
/// available either to the caller's payload or to free-list link storage.
pub const MIN_BLOCK_SIZE: usize = 24;

/// Default heap-growth increment (bytes).
pub const CHUNK_SIZE: usize = 1 << 12;

pub use check::HeapStats;
#[cfg(unix)]
pub use grow::SystemSource;
pub use grow::{FixedSource, HeapSource};
pub use heap::{Heap, HeapError, REGION_OVERHEAD};
