//! Heap bootstrap, epilogue management, and the allocator instance itself.
//!
//! [`Allocator`] owns both the region handle and the bucket head array
//! directly, rather than reaching into process-wide mutable state:
//! single-threaded access is this type's precondition, not something it
//! enforces (see the crate's thread-safety non-goal).

use crate::boundary::{node_of, read_alloc, read_prev_alloc, read_size, write_footer, write_header};
use crate::coalesce::coalesce;
use crate::config::WORD_SIZE;
use crate::error::AllocError;
use crate::free_list::FreeListRegistry;
use crate::placement;
use crate::region::RegionSource;
use crate::size_class::bucket_of;
use core::ptr::{self, NonNull};

/// Bytes requested from the region source at bootstrap: an 8-byte pad, a
/// 16-byte prologue (header + footer), and a zero-size epilogue word.
const BOOTSTRAP_BYTES: usize = 4 * WORD_SIZE;

/// A single-threaded, single-heap dynamic memory allocator.
///
/// `R` is the host's region-extension primitive. `Allocator` owns the heap
/// region and the segregated free-list heads directly, and every public
/// operation is a method taking `&mut self`.
pub struct Allocator<R: RegionSource> {
    region: R,
    registry: FreeListRegistry,
    /// Header address of the current epilogue sentinel; moves on every
    /// heap extension.
    epilogue: *mut u8,
}

impl<R: RegionSource> Allocator<R> {
    /// Bootstraps a fresh allocator over `region`: extends it by
    /// `4 * WORD_SIZE` bytes and writes the leading pad, the prologue
    /// sentinel, and the epilogue sentinel.
    ///
    /// # Errors
    /// Returns [`AllocError::OutOfMemory`] if `region` cannot supply the
    /// initial bootstrap bytes.
    pub fn new(mut region: R) -> Result<Self, AllocError> {
        let base = region.region_extend(BOOTSTRAP_BYTES)?;
        let prologue = unsafe { base.add(WORD_SIZE) };
        let epilogue = unsafe { prologue.add(2 * WORD_SIZE) };
        unsafe {
            write_header(prologue, 2 * WORD_SIZE, false, true);
            write_footer(prologue, 2 * WORD_SIZE, true);
            write_header(epilogue, 0, true, true);
        }
        log::trace!("heap-alloc: bootstrapped at {base:p}, epilogue at {epilogue:p}");
        Ok(Self {
            region,
            registry: FreeListRegistry::new(),
            epilogue,
        })
    }

    /// Requests `n` payload bytes. `n == 0` resolves to a minimum-sized
    /// block rather than returning a null pointer, so callers never need to
    /// special-case a zero-byte request.
    ///
    /// Returns `None` only on [`AllocError::OutOfMemory`] from the
    /// underlying region source.
    #[must_use]
    pub fn allocate(&mut self, n: usize) -> Option<NonNull<u8>> {
        let size = placement::normalize(n);
        let header = if let Some(header) = unsafe { self.registry.find_fit(size) } {
            unsafe { placement::split(&mut self.registry, header, size) }
        } else {
            self.extend(size).ok()?
        };
        self.debug_check_heap();
        NonNull::new(unsafe { node_of(header) })
    }

    /// Releases a previously allocated block. A no-op if `p` is `None`.
    pub fn release(&mut self, p: Option<NonNull<u8>>) {
        let Some(p) = p else { return };
        let header = unsafe { crate::boundary::header_of(p.as_ptr()) };
        let merged = unsafe { coalesce(&mut self.registry, header) };
        let size = unsafe { read_size(merged) };
        unsafe { self.registry.insert(node_of(merged), bucket_of(size)) };
        self.debug_check_heap();
    }

    /// Resizes a block to `n` payload bytes, copying
    /// `min(n, old_payload_size)` bytes into the new location.
    ///
    /// `p == None` behaves as [`Self::allocate`]; `n == 0` behaves as
    /// [`Self::release`], returning `None`.
    #[must_use]
    pub fn resize(&mut self, p: Option<NonNull<u8>>, n: usize) -> Option<NonNull<u8>> {
        let Some(p) = p else { return self.allocate(n) };
        if n == 0 {
            self.release(Some(p));
            return None;
        }
        let old_header = unsafe { crate::boundary::header_of(p.as_ptr()) };
        let old_payload_size = unsafe { read_size(old_header) } - WORD_SIZE;
        let new_p = self.allocate(n)?;
        let copy_len = core::cmp::min(n, old_payload_size);
        unsafe { ptr::copy_nonoverlapping(p.as_ptr(), new_p.as_ptr(), copy_len) };
        self.release(Some(p));
        Some(new_p)
    }

    /// Allocates room for `k` elements of `n` bytes each, zero-filled.
    #[must_use]
    pub fn zero_allocate(&mut self, k: usize, n: usize) -> Option<NonNull<u8>> {
        let total = k.checked_mul(n)?;
        let p = self.allocate(total)?;
        unsafe { ptr::write_bytes(p.as_ptr(), 0, total) };
        Some(p)
    }

    /// Extends the heap by exactly `size` bytes, turning the prior epilogue
    /// word into the new block's header and writing a fresh epilogue at the
    /// new high end. The new block is allocated but **not** inserted into
    /// the registry — it already satisfies the in-flight request.
    fn extend(&mut self, size: usize) -> Result<*mut u8, AllocError> {
        let prior_epilogue = self.epilogue;
        let pa = unsafe { read_prev_alloc(prior_epilogue) };
        let header = self.region.region_extend(size)?;
        debug_assert_eq!(
            header, prior_epilogue,
            "region source must grow contiguously from the prior epilogue"
        );
        unsafe { write_header(header, size, pa, true) };
        let new_epilogue = unsafe { header.add(size) };
        unsafe { write_header(new_epilogue, 0, true, true) };
        self.epilogue = new_epilogue;
        log::trace!("heap-alloc: extended heap by {size} bytes, new epilogue at {new_epilogue:p}");
        Ok(header)
    }

    #[cfg(debug_assertions)]
    fn debug_check_heap(&self) {
        if let Err(e) = self.check_heap() {
            panic!("{e}");
        }
    }

    #[cfg(not(debug_assertions))]
    fn debug_check_heap(&self) {}

    pub(crate) fn registry(&self) -> &FreeListRegistry {
        &self.registry
    }

    pub(crate) fn prologue(&self) -> *mut u8 {
        unsafe { (self.region.region_lo() as *mut u8).add(WORD_SIZE) }
    }

    pub(crate) fn epilogue_addr(&self) -> *mut u8 {
        self.epilogue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::ArenaRegion;

    fn alloc() -> Allocator<ArenaRegion<4096>> {
        Allocator::new(ArenaRegion::new()).unwrap()
    }

    #[test]
    fn bootstrap_writes_prologue_and_epilogue() {
        let a = alloc();
        let prologue = a.prologue();
        unsafe {
            assert_eq!(read_size(prologue), 16);
            assert!(read_alloc(prologue));
            assert!(!read_prev_alloc(prologue));
            let epilogue = a.epilogue_addr();
            assert_eq!(read_size(epilogue), 0);
            assert!(read_alloc(epilogue));
            assert!(read_prev_alloc(epilogue));
        }
    }

    #[test]
    fn cold_start_allocates_a_minimum_block() {
        let mut a = alloc();
        let p = a.allocate(24).unwrap();
        assert_eq!(p.as_ptr() as usize % 16, 0);
        let header = unsafe { crate::boundary::header_of(p.as_ptr()) };
        assert_eq!(unsafe { read_size(header) }, 32);
    }

    #[test]
    fn allocate_allocate_release_middle_then_full_coalesce() {
        let mut a = alloc();
        let pa = a.allocate(24).unwrap();
        let pb = a.allocate(40).unwrap();
        let header_b = unsafe { crate::boundary::header_of(pb.as_ptr()) };
        assert_eq!(unsafe { read_size(header_b) }, 48);

        a.release(Some(pa));
        let header_a = unsafe { crate::boundary::header_of(pa.as_ptr()) };
        unsafe {
            assert_eq!(read_size(header_a), 32);
            assert!(!read_alloc(header_a));
        }

        a.release(Some(pb));
        // a and b merge with the epilogue's predecessor side: 32 + 48 = 80.
        unsafe {
            assert_eq!(read_size(header_a), 80);
            assert!(!read_alloc(header_a));
        }
    }

    #[test]
    fn split_on_reuse_leaves_a_usable_tail() {
        let mut a = alloc();
        let pa = a.allocate(24).unwrap();
        let pb = a.allocate(40).unwrap();
        a.release(Some(pa));
        a.release(Some(pb));

        let p = a.allocate(16).unwrap();
        let header = unsafe { crate::boundary::header_of(p.as_ptr()) };
        unsafe {
            assert_eq!(read_size(header), 32);
            assert!(read_alloc(header));
            let tail = header.add(32);
            assert_eq!(read_size(tail), 48);
            assert!(!read_alloc(tail));
        }
    }

    #[test]
    fn resize_shrinks_and_preserves_prefix() {
        let mut a = alloc();
        let p = a.allocate(100).unwrap();
        let header = unsafe { crate::boundary::header_of(p.as_ptr()) };
        assert_eq!(unsafe { read_size(header) }, 112);
        unsafe {
            ptr::write_bytes(p.as_ptr(), 0xAB, 100);
        }
        let q = a.resize(Some(p), 40).unwrap();
        let qheader = unsafe { crate::boundary::header_of(q.as_ptr()) };
        assert_eq!(unsafe { read_size(qheader) }, 48);
        for i in 0..40 {
            assert_eq!(unsafe { *q.as_ptr().add(i) }, 0xAB);
        }
    }

    #[test]
    fn zero_allocate_fills_with_zero() {
        let mut a = alloc();
        let p = a.zero_allocate(4, 10).unwrap();
        let header = unsafe { crate::boundary::header_of(p.as_ptr()) };
        assert_eq!(unsafe { read_size(header) }, 48);
        for i in 0..40 {
            assert_eq!(unsafe { *p.as_ptr().add(i) }, 0);
        }
    }

    #[test]
    fn release_of_null_is_a_no_op() {
        let mut a = alloc();
        a.release(None);
    }

    #[test]
    fn out_of_memory_propagates_as_null() {
        let mut a = Allocator::new(ArenaRegion::<64>::new()).unwrap();
        // The arena only has room for the bootstrap bytes; any further
        // allocation must fail cleanly.
        assert!(a.allocate(64).is_none());
    }
}
