//! Boundary-tag codec: reads and writes the inline header/footer words.
//!
//! A header (and, for free blocks, a footer) is a single machine word packing
//! three fields into one `usize`:
//!
//! ```text
//! | high bits ... bit 4 | bit 1 | bit 0 |
//! |     block size       |  PA   |   A   |
//! ```
//!
//! The codec never touches free-list pointers; that state lives in the
//! payload region of free blocks and is owned by [`crate::free_list`].

use crate::config::WORD_SIZE;
use core::ptr;

const ALLOC_BIT: usize = 0b01;
const PREV_ALLOC_BIT: usize = 0b10;
const SIZE_MASK: usize = !0b1111;

#[inline]
unsafe fn read_word(p: *mut u8) -> usize {
    unsafe { ptr::read(p.cast::<usize>()) }
}

#[inline]
unsafe fn write_word(p: *mut u8, value: usize) {
    unsafe { ptr::write(p.cast::<usize>(), value) };
}

/// # Safety
/// `p` must point at a valid header or footer word within the heap.
#[inline]
#[must_use]
pub unsafe fn read_size(p: *mut u8) -> usize {
    unsafe { read_word(p) & SIZE_MASK }
}

/// # Safety
/// `p` must point at a valid header or footer word within the heap.
#[inline]
#[must_use]
pub unsafe fn read_alloc(p: *mut u8) -> bool {
    unsafe { read_word(p) & ALLOC_BIT != 0 }
}

/// # Safety
/// `p` must point at a valid header word within the heap.
#[inline]
#[must_use]
pub unsafe fn read_prev_alloc(p: *mut u8) -> bool {
    unsafe { read_word(p) & PREV_ALLOC_BIT != 0 }
}

/// Writes a header word encoding `size`, the predecessor-allocated flag `pa`,
/// and this-block-allocated flag `a`. `size`'s low 4 bits are ignored.
///
/// # Safety
/// `p` must point at a valid, writable header location within the heap.
#[inline]
pub unsafe fn write_header(p: *mut u8, size: usize, pa: bool, a: bool) {
    let word = (size & SIZE_MASK) | (usize::from(pa) << 1) | usize::from(a);
    unsafe { write_word(p, word) };
}

/// Writes the footer word for a block whose header is at `header`. The
/// footer mirrors `size` and `a`; only free blocks (`a == false`) carry one.
///
/// # Safety
/// `header` must address a block of at least `size` bytes within the heap.
#[inline]
pub unsafe fn write_footer(header: *mut u8, size: usize, a: bool) {
    let footer = unsafe { header.add(size - WORD_SIZE) };
    let word = (size & SIZE_MASK) | usize::from(a);
    unsafe { write_word(footer, word) };
}

/// Sets the predecessor-allocated flag without disturbing size or the A bit.
///
/// # Safety
/// `p` must point at a valid header word within the heap.
#[inline]
pub unsafe fn set_prev_alloc(p: *mut u8) {
    let word = unsafe { read_word(p) } | PREV_ALLOC_BIT;
    unsafe { write_word(p, word) };
}

/// Clears the predecessor-allocated flag without disturbing size or the A bit.
///
/// # Safety
/// `p` must point at a valid header word within the heap.
#[inline]
pub unsafe fn clear_prev_alloc(p: *mut u8) {
    let word = unsafe { read_word(p) } & !PREV_ALLOC_BIT;
    unsafe { write_word(p, word) };
}

/// Translates a block's header address to its free-list node address.
///
/// # Safety
/// `header` must be a valid header address within the heap.
#[inline]
#[must_use]
pub unsafe fn node_of(header: *mut u8) -> *mut u8 {
    unsafe { header.add(WORD_SIZE) }
}

/// Translates a free block's node address back to its header address.
///
/// # Safety
/// `node` must be a valid free-block node address within the heap.
#[inline]
#[must_use]
pub unsafe fn header_of(node: *mut u8) -> *mut u8 {
    unsafe { node.sub(WORD_SIZE) }
}
