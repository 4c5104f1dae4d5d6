//! # rheap - A First-Fit Free-List Heap
//!
//! This crate provides a general purpose **free-list allocator** that manages
//! one contiguous, growable region of memory: the program break via `sbrk(2)`,
//! or a fixed in-memory buffer.
//!
//! ## Overview
//!
//! The region is carved into blocks. Every block is a header followed by the
//! payload handed to the caller, and the blocks form a doubly linked list in
//! address order:
//!
//! ```text
//!   Managed Region:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ ┌──────┬───────┐┌──────┬────────────┐┌──────┬──────┐                 │
//!   │ │ hdr  │  A    ││ hdr  │   free     ││ hdr  │  C   │   (not ours)    │
//!   │ └──────┴───────┘└──────┴────────────┘└──────┴──────┘                 │
//!   │ ▲                                                   ▲                │
//!   │ │                                                   │                │
//!   │ Head                                           Region End            │
//!   │                                              (program break)         │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **allocate** walks the list and takes the first free block that is big
//!   enough (first fit), splitting it when the leftover can hold another
//!   block. When nothing fits, the region grows by one block at its end.
//! - **free** marks the block free and merges it with free neighbours
//!   straight away. A free block at the end of the region is handed back by
//!   shrinking the region.
//! - **resize** shrinks or grows in place when it can, and relocates
//!   otherwise.
//! - **zero_allocate** allocates `count * size` bytes and clears them.
//!
//! ## Crate Structure
//!
//! ```text
//!   rheap
//!   ├── align      - Rounding macros (align!, align_down!)
//!   ├── block      - Block metadata
//!   ├── config     - HeapConfig (alignment, header size, split threshold)
//!   ├── directory  - Address-ordered block list (internal)
//!   ├── error      - HeapError, GrowError, DirectoryError, ConfigError
//!   ├── heap       - FreeListHeap
//!   └── region     - Region trait, FixedRegion, SbrkRegion
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rheap::{FixedRegion, FreeListHeap};
//!
//! let mut heap = FreeListHeap::new(FixedRegion::new(4096));
//!
//! let ptr = heap.allocate(64).unwrap();
//! unsafe { ptr.as_ptr().write_bytes(0xAB, 64) };
//!
//! let ptr = heap.resize(ptr.as_ptr(), 256).unwrap();
//! heap.free(ptr.as_ptr());
//!
//! assert!(heap.is_empty());
//! ```
//!
//! ## Block Layout
//!
//! ```text
//!   Single Block (default config):
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Header             │         Payload                │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ free            │  │  ┌──────────────────────────┐  │
//!   │  │ payload_size: N │  │  │                          │  │
//!   │  │ prev / next     │  │  │  N bytes, N % 4 == 0     │  │
//!   │  │ payload         │  │  │                          │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │      20 bytes         │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! The header bytes are reserved in the region, but the metadata itself is
//! kept in a side table keyed by header address. A pointer is accepted by
//! `free`/`resize` only if a block is recorded exactly one header before it.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **One region per heap**: Growth and shrinking happen only at the end
//! - **Small alignment**: Payloads are aligned to the configured unit only
//! - **Unchecked sizes**: `count * size` in `zero_allocate` wraps on overflow
//!
//! ## Safety
//!
//! The heap hands out raw pointers. Reading or writing through them is
//! `unsafe` and only valid while the allocation is live and the heap (and
//! its region) still exist. [`SbrkRegion`] assumes nothing else moves the
//! program break.

pub mod align;
mod block;
mod config;
mod directory;
mod error;
mod heap;
mod region;

pub use block::BlockInfo;
pub use config::{DEFAULT_ALIGNMENT, DEFAULT_HEADER_SIZE, HeapConfig};
pub use error::{ConfigError, DirectoryError, GrowError, HeapError};
pub use heap::{FreeListHeap, Reclaimed};
#[cfg(unix)]
pub use region::SbrkRegion;
pub use region::{FixedRegion, Region};
