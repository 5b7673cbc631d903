//! Heap-growth sources.
//!
//! The allocator consumes raw address space through [`HeapSource`]. Every
//! call must return bytes immediately contiguous with the end of the
//! previously returned region, so the managed range stays one unbroken,
//! append-only span. Both sources here get that property the same way: one
//! reservation up front, handed out as successive slices.

use core::ptr::NonNull;
use std::alloc::{self, Layout};

use log::debug;

use crate::ALIGNMENT;

/// Supplier of raw, contiguous address space.
pub trait HeapSource {
    /// Extend the managed range by exactly `len` bytes.
    ///
    /// Returns the start of the appended region, which is immediately
    /// contiguous with the end of the previous one, or `None` when the
    /// source cannot grow further. There is no partial success. The first
    /// region returned starts 8-aligned.
    fn grow(&mut self, len: usize) -> Option<NonNull<u8>>;
}

/// A source over one fixed, up-front host allocation.
///
/// Exhausts deterministically once `capacity` bytes have been handed out,
/// which makes it both an arena-embedded backing store and the test harness
/// for out-of-memory paths.
#[derive(Debug)]
pub struct FixedSource {
    base: NonNull<u8>,
    layout: Layout,
    used: usize,
}

impl FixedSource {
    /// Reserve `capacity` bytes from the host allocator. `None` when the
    /// host refuses or `capacity` is zero.
    pub fn new(capacity: usize) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        let layout = Layout::from_size_align(capacity, ALIGNMENT).ok()?;
        // SAFETY: layout has non-zero size.
        let base = NonNull::new(unsafe { alloc::alloc(layout) })?;
        Some(Self { base, layout, used: 0 })
    }

    pub fn capacity(&self) -> usize {
        self.layout.size()
    }
}

impl HeapSource for FixedSource {
    fn grow(&mut self, len: usize) -> Option<NonNull<u8>> {
        if len == 0 || len > self.layout.size() - self.used {
            return None;
        }
        // SAFETY: used + len <= capacity, so the slice is inside the backing
        // allocation.
        let start = unsafe { self.base.as_ptr().add(self.used) };
        self.used += len;
        debug!("fixed source: +{} bytes, {} used", len, self.used);
        NonNull::new(start)
    }
}

impl Drop for FixedSource {
    fn drop(&mut self) {
        // SAFETY: base was allocated with exactly this layout.
        unsafe { alloc::dealloc(self.base.as_ptr(), self.layout) }
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use core::ptr;

        use libc::{
            MAP_ANONYMOUS, MAP_FAILED, MAP_NORESERVE, MAP_PRIVATE, PROT_READ, PROT_WRITE, mmap,
            munmap,
        };

        /// A source that grows inside one large `MAP_NORESERVE` reservation
        /// made up front. The kernel commits pages on first touch, so an
        /// oversized reservation costs address space, not memory, and slices
        /// of it are contiguous by construction.
        pub struct SystemSource {
            base: NonNull<u8>,
            reserved: usize,
            used: usize,
        }

        impl SystemSource {
            /// Default reservation: 1 GiB of address space.
            pub const DEFAULT_RESERVATION: usize = 1 << 30;

            pub fn new() -> Option<Self> {
                Self::with_reservation(Self::DEFAULT_RESERVATION)
            }

            /// Reserve `reservation` bytes (rounded up to the OS page size).
            pub fn with_reservation(reservation: usize) -> Option<Self> {
                if reservation == 0 {
                    return None;
                }
                let page = page_size::get();
                let reserved = reservation.checked_add(page - 1)? / page * page;
                // SAFETY: anonymous private mapping, no file descriptor.
                let addr = unsafe {
                    mmap(
                        ptr::null_mut(),
                        reserved,
                        PROT_READ | PROT_WRITE,
                        MAP_NORESERVE | MAP_ANONYMOUS | MAP_PRIVATE,
                        -1,
                        0,
                    )
                };
                if addr == MAP_FAILED {
                    return None;
                }
                debug!("system source: reserved {} bytes at {:p}", reserved, addr);
                Some(Self {
                    base: NonNull::new(addr as *mut u8)?,
                    reserved,
                    used: 0,
                })
            }
        }

        impl HeapSource for SystemSource {
            fn grow(&mut self, len: usize) -> Option<NonNull<u8>> {
                if len == 0 || len > self.reserved - self.used {
                    return None;
                }
                // SAFETY: used + len <= reserved, inside the mapping.
                let start = unsafe { self.base.as_ptr().add(self.used) };
                self.used += len;
                NonNull::new(start)
            }
        }

        impl Drop for SystemSource {
            fn drop(&mut self) {
                // SAFETY: base/reserved describe exactly the mapping made in
                // with_reservation; page-aligned by mmap.
                unsafe {
                    munmap(self.base.as_ptr() as *mut _, self.reserved);
                }
            }
        }
    }
}
