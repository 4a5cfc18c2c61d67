//! # Segregated-Fit Heap Allocator
//!
//! This crate implements a general-purpose dynamic memory allocator that
//! manages a single contiguous heap region obtained from a host-provided
//! region-extension primitive. It exposes the classical
//! allocate/release/resize/zero-allocate surface and satisfies requests
//! with bounded metadata overhead, acceptable internal fragmentation, and
//! amortized constant-time behavior for typical request streams.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            Public entry-point glue (Allocator)       │
//! │    • allocate / release / resize / zero_allocate     │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Placement engine ([`placement`])         │
//! │    • size normalization, find-fit, split, extend      │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │     Free-list registry ([`free_list`]) + Coalescer    │
//! │     ([`coalesce`]) + Size-class index ([`size_class`])│
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │        Boundary-tag codec ([`boundary`])               │
//! │    • inline header/footer words, PA/A flag bits       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! * [`boundary`] — reads and writes the inline header/footer words.
//! * [`size_class`] — maps a block size to one of 16 segregated buckets.
//! * [`free_list`] — the segregated registry of circular doubly linked lists.
//! * [`coalesce`] — merges a freed block with its immediate free neighbor(s).
//! * [`placement`] — size normalization, first-fit search, and splitting.
//! * [`heap`] — heap bootstrap, the moving epilogue, and the `Allocator` type.
//! * [`region`] — the downward interface to a host-provided heap region.
//! * [`debug`] — the invariant checker and block/bucket iterators (debug/test only).
//!
//! ## Non-goals
//!
//! This allocator is single-threaded and non-reentrant; it does not harden
//! against use-after-free or double-free; it never shrinks the heap back to
//! the host; it has no per-size-class slab caches; and every payload
//! pointer is aligned to 16 bytes, never more.
//!
//! ## Usage
//!
//! ```rust
//! use heap_alloc::{Allocator, ArenaRegion};
//!
//! let mut a = Allocator::new(ArenaRegion::<4096>::new()).unwrap();
//! let p = a.allocate(40).unwrap();
//! unsafe { p.as_ptr().write_bytes(0, 40) };
//! a.release(Some(p));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod boundary;
pub mod coalesce;
pub mod config;
#[cfg(any(debug_assertions, test))]
pub mod debug;
pub mod error;
pub mod free_list;
pub mod heap;
pub mod placement;
pub mod region;
pub mod size_class;

pub use error::AllocError;
pub use heap::Allocator;
pub use region::{ArenaRegion, RegionSource};
