//! Release-time coalescing: merges a newly freed block with its immediate
//! free neighbor(s), so that no two adjacent blocks are ever both free.
//!
//! The block's own PA bit tells us the predecessor's allocation state; the
//! successor's header is read directly. Since no two adjacent blocks are
//! ever both free before this call runs, neither neighbor needs to look
//! further still — their own neighbors are guaranteed allocated.

use crate::boundary::{
    clear_prev_alloc, node_of, read_alloc, read_prev_alloc, read_size, write_footer, write_header,
};
use crate::free_list::FreeListRegistry;
use crate::size_class::bucket_of;

/// Merges the block at `header` with any free neighbor(s) and returns the
/// header of the resulting (possibly larger) free block. The merged block is
/// **not** reinserted into `registry` — that is the caller's responsibility.
///
/// # Safety
/// `header` must address a block about to transition to free, with valid
/// neighbors on both sides (guaranteed by the prologue/epilogue framing).
pub(crate) unsafe fn coalesce(registry: &mut FreeListRegistry, header: *mut u8) -> *mut u8 {
    let size = unsafe { read_size(header) };
    let pa = unsafe { read_prev_alloc(header) };
    let successor = unsafe { header.add(size) };
    let na = unsafe { read_alloc(successor) };

    match (pa, na) {
        (true, true) => {
            log::trace!("heap-alloc: coalesce {header:p}: no free neighbor, size {size}");
            unsafe {
                write_header(header, size, true, false);
                write_footer(header, size, false);
                clear_prev_alloc(successor);
            }
            header
        }
        (true, false) => {
            let successor_size = unsafe { read_size(successor) };
            unsafe { registry.remove(node_of(successor), bucket_of(successor_size)) };
            let merged = size + successor_size;
            log::trace!(
                "heap-alloc: coalesce {header:p}: merging with free successor {successor:p}, {size} + {successor_size} = {merged}"
            );
            unsafe {
                write_header(header, merged, true, false);
                write_footer(header, merged, false);
            }
            header
        }
        (false, true) => {
            let predecessor = predecessor_header(header);
            let predecessor_size = unsafe { read_size(predecessor) };
            let predecessor_pa = unsafe { read_prev_alloc(predecessor) };
            unsafe { registry.remove(node_of(predecessor), bucket_of(predecessor_size)) };
            let merged = predecessor_size + size;
            log::trace!(
                "heap-alloc: coalesce {header:p}: merging with free predecessor {predecessor:p}, {predecessor_size} + {size} = {merged}"
            );
            unsafe {
                write_header(predecessor, merged, predecessor_pa, false);
                write_footer(predecessor, merged, false);
                clear_prev_alloc(successor);
            }
            predecessor
        }
        (false, false) => {
            let predecessor = predecessor_header(header);
            let predecessor_size = unsafe { read_size(predecessor) };
            let predecessor_pa = unsafe { read_prev_alloc(predecessor) };
            let successor_size = unsafe { read_size(successor) };
            unsafe {
                registry.remove(node_of(predecessor), bucket_of(predecessor_size));
                registry.remove(node_of(successor), bucket_of(successor_size));
            }
            let merged = predecessor_size + size + successor_size;
            log::debug!(
                "heap-alloc: coalesce {header:p}: merging free predecessor {predecessor:p} and successor {successor:p}, {predecessor_size} + {size} + {successor_size} = {merged}"
            );
            unsafe {
                write_header(predecessor, merged, predecessor_pa, false);
                write_footer(predecessor, merged, false);
            }
            predecessor
        }
    }
}

/// The footer immediately preceding `header` belongs to the predecessor
/// block and encodes its size, from which its header address follows.
unsafe fn predecessor_header(header: *mut u8) -> *mut u8 {
    let predecessor_footer = unsafe { header.sub(crate::config::WORD_SIZE) };
    let predecessor_size = unsafe { read_size(predecessor_footer) };
    unsafe { header.sub(predecessor_size) }
}
