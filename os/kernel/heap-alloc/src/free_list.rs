//! Segregated free-list registry: `N` circular doubly linked lists of free
//! blocks, one per size-class bucket.
//!
//! Each list node lives inside the payload of the free block it describes:
//! the word at the node address is the forward link, the word right after it
//! is the back link. These are only valid while the block is free, which is
//! why every accessor here is `unsafe` — callers must hold the invariant that
//! `node` currently addresses a free block's node (see [`crate::boundary`]).
//!
//! Ordering within a bucket is unspecified; insertion is always at the head.

use crate::boundary::header_of;
use crate::config::{NUM_BUCKETS, WORD_SIZE};
use crate::size_class::bucket_of;
use core::ptr;

#[inline]
unsafe fn read_next(node: *mut u8) -> *mut u8 {
    unsafe { ptr::read(node.cast::<*mut u8>()) }
}

#[inline]
unsafe fn write_next(node: *mut u8, next: *mut u8) {
    unsafe { ptr::write(node.cast::<*mut u8>(), next) };
}

#[inline]
unsafe fn read_prev(node: *mut u8) -> *mut u8 {
    unsafe { ptr::read(node.add(WORD_SIZE).cast::<*mut u8>()) }
}

#[inline]
unsafe fn write_prev(node: *mut u8, prev: *mut u8) {
    unsafe { ptr::write(node.add(WORD_SIZE).cast::<*mut u8>(), prev) };
}

/// `N` bucket heads, each either empty (`None`, represented as a null
/// pointer) or pointing at one node of a circular doubly linked list.
pub(crate) struct FreeListRegistry {
    heads: [*mut u8; NUM_BUCKETS],
}

impl FreeListRegistry {
    pub(crate) const fn new() -> Self {
        Self {
            heads: [ptr::null_mut(); NUM_BUCKETS],
        }
    }

    /// Inserts `node` (a free block's node address) at the head of the
    /// bucket implied by the size of the block at `header_of(node)`. O(1).
    ///
    /// # Safety
    /// `node` must address a free block not already present in any bucket.
    pub(crate) unsafe fn insert(&mut self, node: *mut u8, bucket: usize) {
        let head = self.heads[bucket];
        if head.is_null() {
            unsafe {
                write_next(node, node);
                write_prev(node, node);
            }
        } else {
            let last = unsafe { read_prev(head) };
            unsafe {
                write_next(node, head);
                write_prev(node, last);
                write_next(last, node);
                write_prev(head, node);
            }
        }
        self.heads[bucket] = node;
    }

    /// Unlinks `node` from `bucket`'s circular list. O(1).
    ///
    /// # Safety
    /// `node` must currently be a member of `bucket`'s list.
    pub(crate) unsafe fn remove(&mut self, node: *mut u8, bucket: usize) {
        let next = unsafe { read_next(node) };
        if next == node {
            self.heads[bucket] = ptr::null_mut();
            return;
        }
        let prev = unsafe { read_prev(node) };
        if self.heads[bucket] == node {
            self.heads[bucket] = next;
        }
        unsafe {
            write_next(prev, next);
            write_prev(next, prev);
        }
    }

    /// Scans buckets starting at `bucket_of(size)`, returning the header of
    /// the first free block whose size is at least `size`, already removed
    /// from the registry. Returns `None` if no list holds a sufficient block.
    ///
    /// # Safety
    /// Every bucket's list must satisfy the registry's invariants (every
    /// node free, reachable, and sized per its bucket).
    pub(crate) unsafe fn find_fit(&mut self, size: usize) -> Option<*mut u8> {
        for bucket in bucket_of(size)..NUM_BUCKETS {
            let head = self.heads[bucket];
            if head.is_null() {
                continue;
            }
            let mut node = head;
            loop {
                let header = unsafe { header_of(node) };
                if unsafe { crate::boundary::read_size(header) } >= size {
                    unsafe { self.remove(node, bucket) };
                    return Some(header);
                }
                node = unsafe { read_next(node) };
                if node == head {
                    break;
                }
            }
        }
        None
    }

    /// Iterates the node addresses of `bucket`'s list in forward order.
    ///
    /// # Safety
    /// The caller must not mutate the registry while iterating.
    pub(crate) unsafe fn iter(&self, bucket: usize) -> BucketIter {
        BucketIter {
            head: self.heads[bucket],
            current: self.heads[bucket],
            exhausted: self.heads[bucket].is_null(),
        }
    }
}

/// Forward walk over one bucket's circular list, yielding node addresses.
pub(crate) struct BucketIter {
    head: *mut u8,
    current: *mut u8,
    exhausted: bool,
}

impl Iterator for BucketIter {
    type Item = *mut u8;

    fn next(&mut self) -> Option<*mut u8> {
        if self.exhausted {
            return None;
        }
        let node = self.current;
        let next = unsafe { read_next(node) };
        if next == self.head {
            self.exhausted = true;
        } else {
            self.current = next;
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{node_of, write_header};

    /// A handful of free-looking 32-byte blocks backed by plain arrays, used
    /// to exercise list operations without a real heap.
    struct Blocks {
        storage: [[u8; 32]; 4],
    }

    impl Blocks {
        fn new() -> Self {
            let mut s = Self {
                storage: [[0u8; 32]; 4],
            };
            for block in &mut s.storage {
                unsafe { write_header(block.as_mut_ptr(), 32, true, false) };
            }
            s
        }

        fn node(&mut self, i: usize) -> *mut u8 {
            unsafe { node_of(self.storage[i].as_mut_ptr()) }
        }
    }

    #[test]
    fn insert_then_remove_empties_the_bucket() {
        let mut blocks = Blocks::new();
        let mut reg = FreeListRegistry::new();
        let n0 = blocks.node(0);
        unsafe {
            reg.insert(n0, 0);
            assert!(!reg.heads[0].is_null());
            reg.remove(n0, 0);
            assert!(reg.heads[0].is_null());
        }
    }

    #[test]
    fn insert_at_head_and_iterate_in_order() {
        let mut blocks = Blocks::new();
        let mut reg = FreeListRegistry::new();
        let (n0, n1, n2) = (blocks.node(0), blocks.node(1), blocks.node(2));
        unsafe {
            reg.insert(n0, 0);
            reg.insert(n1, 0);
            reg.insert(n2, 0);
            let seen: std::vec::Vec<*mut u8> = reg.iter(0).collect();
            assert_eq!(seen, std::vec![n2, n1, n0]);
        }
    }

    #[test]
    fn find_fit_removes_the_match() {
        let mut blocks = Blocks::new();
        let mut reg = FreeListRegistry::new();
        let n0 = blocks.node(0);
        unsafe {
            reg.insert(n0, 0);
            let found = reg.find_fit(32);
            assert_eq!(found, Some(crate::boundary::header_of(n0)));
            assert!(reg.heads[0].is_null());
        }
    }

    #[test]
    fn find_fit_escalates_to_a_larger_bucket() {
        let mut blocks = Blocks::new();
        let mut reg = FreeListRegistry::new();
        unsafe {
            write_header(blocks.storage[0].as_mut_ptr(), 32, true, false);
        }
        let n0 = blocks.node(0);
        unsafe {
            reg.insert(n0, bucket_of(32));
            // Nothing fits a request that lands in a higher, empty bucket except
            // by falling through to buckets above it — here we just confirm a
            // too-large request against a 32-byte-only registry fails cleanly.
            assert!(reg.find_fit(64).is_none());
        }
    }
}
