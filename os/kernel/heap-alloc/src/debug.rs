//! Debug invariant checker and block/bucket iterators.
//!
//! Rather than replicating a printf-driven heap dump, this module exposes
//! iterators over blocks and bucket lists; [`Allocator::check_heap`]
//! consumes them to confirm the heap's boundary tags and free-list
//! membership agree with each other. It compiles only under
//! `cfg(debug_assertions)` or `cfg(test)`, so release builds pay nothing
//! for it.

#![cfg(any(debug_assertions, test))]

use crate::boundary::{header_of, read_alloc, read_prev_alloc, read_size};
use crate::config::{ALIGNMENT, MIN_BLOCK_SIZE, NUM_BUCKETS};
use crate::error::AllocError;
use crate::heap::Allocator;
use crate::region::RegionSource;
use crate::size_class::bucket_of;

/// A snapshot of one block's boundary-tag state, yielded by [`BlockIter`].
#[derive(Debug, Clone, Copy)]
pub struct BlockInfo {
    pub header: *mut u8,
    pub size: usize,
    pub allocated: bool,
    pub prev_allocated: bool,
}

/// Walks every block from the prologue to the epilogue (inclusive),
/// following `header.size` to find each successor. The epilogue (size 0)
/// is the final item.
pub struct BlockIter {
    current: *mut u8,
    done: bool,
}

impl Iterator for BlockIter {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        if self.done {
            return None;
        }
        let header = self.current;
        let size = unsafe { read_size(header) };
        let info = BlockInfo {
            header,
            size,
            allocated: unsafe { read_alloc(header) },
            prev_allocated: unsafe { read_prev_alloc(header) },
        };
        if size == 0 {
            self.done = true;
        } else {
            self.current = unsafe { header.add(size) };
        }
        Some(info)
    }
}

impl<R: RegionSource> Allocator<R> {
    /// Iterates every block from the prologue through the epilogue.
    #[must_use]
    pub fn blocks(&self) -> BlockIter {
        BlockIter {
            current: self.prologue(),
            done: false,
        }
    }

    /// Walks every block from the prologue to the epilogue, then cross-checks
    /// free-list membership against what that walk found, describing the
    /// first inconsistency it finds.
    ///
    /// # Errors
    /// Returns [`AllocError::InvariantViolation`] describing the first
    /// invariant found broken.
    pub fn check_heap(&self) -> Result<(), AllocError> {
        let lo = self.prologue();
        let hi = self.epilogue_addr();

        let mut prev: Option<BlockInfo> = None;
        let mut free_count = 0usize;
        let mut free_total = 0usize;

        for info in self.blocks() {
            if (info.header as usize) < lo as usize || (info.header as usize) > hi as usize {
                return Err(AllocError::InvariantViolation("block header out of heap range"));
            }
            // The prologue is a permanently allocated 16-byte sentinel (see
            // `heap.rs::new`), deliberately smaller than `MIN_BLOCK_SIZE`; the
            // epilogue is already exempted via `info.size > 0`.
            if info.size > 0 && info.header != lo {
                if info.size < MIN_BLOCK_SIZE {
                    return Err(AllocError::InvariantViolation("block smaller than MIN_BLOCK_SIZE"));
                }
                if !info.size.is_multiple_of(ALIGNMENT) {
                    return Err(AllocError::InvariantViolation("block size not 16-aligned"));
                }
            }

            if let Some(p) = prev {
                if info.prev_allocated != p.allocated {
                    return Err(AllocError::InvariantViolation(
                        "PA flag disagrees with predecessor's A bit",
                    ));
                }
                if !p.allocated && !info.allocated {
                    return Err(AllocError::InvariantViolation(
                        "two adjacent blocks are both free",
                    ));
                }
            }

            if !info.allocated {
                let footer = unsafe { info.header.add(info.size - crate::config::WORD_SIZE) };
                if unsafe { read_size(footer) } != info.size || unsafe { read_alloc(footer) } {
                    return Err(AllocError::InvariantViolation(
                        "free block's footer disagrees with its header",
                    ));
                }
                free_count += 1;
                free_total += info.size;
            }

            prev = Some(info);
        }

        let mut list_count = 0usize;
        let mut list_total = 0usize;
        for bucket in 0..NUM_BUCKETS {
            for node in unsafe { self.registry().iter(bucket) } {
                let header = unsafe { header_of(node) };
                if (header as usize) < lo as usize || (header as usize) > hi as usize {
                    return Err(AllocError::InvariantViolation("free-list node outside heap"));
                }
                if unsafe { read_alloc(header) } {
                    return Err(AllocError::InvariantViolation(
                        "allocated block present in a free list",
                    ));
                }
                let size = unsafe { read_size(header) };
                if bucket_of(size) != bucket {
                    return Err(AllocError::InvariantViolation(
                        "free block is in the wrong bucket for its size",
                    ));
                }
                list_count += 1;
                list_total += size;
            }
        }

        if list_count != free_count || list_total != free_total {
            return Err(AllocError::InvariantViolation(
                "free-list membership disagrees with the heap walk",
            ));
        }

        Ok(())
    }

    /// Iterates the header addresses of every free block currently held in
    /// `bucket`'s list.
    ///
    /// # Safety
    /// The caller must not mutate the allocator while iterating.
    pub unsafe fn free_block_headers(&self, bucket: usize) -> impl Iterator<Item = *mut u8> + '_ {
        unsafe { self.registry().iter(bucket) }.map(|node| unsafe { header_of(node) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::ArenaRegion;

    #[test]
    fn freshly_bootstrapped_heap_is_consistent() {
        let a: Allocator<ArenaRegion<4096>> = Allocator::new(ArenaRegion::new()).unwrap();
        assert!(a.check_heap().is_ok());
    }

    #[test]
    fn heap_stays_consistent_across_allocate_and_release() {
        let mut a: Allocator<ArenaRegion<4096>> = Allocator::new(ArenaRegion::new()).unwrap();
        let p1 = a.allocate(24).unwrap();
        let p2 = a.allocate(40).unwrap();
        assert!(a.check_heap().is_ok());
        a.release(Some(p1));
        assert!(a.check_heap().is_ok());
        a.release(Some(p2));
        assert!(a.check_heap().is_ok());
    }
}
