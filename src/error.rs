use std::io;

use thiserror::Error;

/// Failures surfaced by the public heap operations.
#[derive(Debug, Error)]
pub enum HeapError {
  /// The region could not be extended. Existing blocks are untouched.
  #[error("out of memory: could not grow the region by {requested} bytes")]
  OutOfMemory {
    requested: usize,
    #[source]
    source: GrowError,
  },

  /// The address is not the payload start of any live block.
  #[error("address {0:#x} does not belong to any block of this heap")]
  InvalidPointer(usize),
}

/// Failures of the region primitive, on growth or retraction.
#[derive(Debug, Error)]
pub enum GrowError {
  #[error("region exhausted: requested {requested} bytes, {available} available")]
  Exhausted { requested: usize, available: usize },

  #[error("growth of {0} bytes exceeds the platform increment limit")]
  TooLarge(usize),

  #[error("region end moved from {expected:#x} to {found:#x} outside this heap")]
  Discontiguous { expected: usize, found: usize },

  #[error("address {0:#x} is outside the region")]
  OutsideRegion(usize),

  #[error("program break could not be moved: {0}")]
  Os(#[from] io::Error),
}

/// A broken block directory invariant, as reported by
/// [`FreeListHeap::check_invariants`](crate::FreeListHeap::check_invariants).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
  #[error("block {header:#x} ends at {end:#x} but its successor starts at {next:#x}")]
  Gap { header: usize, end: usize, next: usize },

  #[error("blocks {first:#x} and {second:#x} are adjacent and both free")]
  AdjacentFree { first: usize, second: usize },

  #[error("block {header:#x} has payload size {payload_size}, not a multiple of {alignment}")]
  Misaligned {
    header: usize,
    payload_size: usize,
    alignment: usize,
  },

  #[error("block {header:#x} records payload {payload:#x}, expected {expected:#x}")]
  BadPayloadPointer {
    header: usize,
    payload: usize,
    expected: usize,
  },

  #[error("block {header:#x} links back to {found:?}, expected {expected:?}")]
  BrokenBackLink {
    header: usize,
    found: Option<usize>,
    expected: Option<usize>,
  },

  #[error("last block ends at {tail_end:#x} but the region ends at {region_end:#x}")]
  TailMismatch { tail_end: usize, region_end: usize },

  #[error("{stored} blocks stored but only {reachable} reachable from the head")]
  Unreachable { stored: usize, reachable: usize },
}

/// Rejected [`HeapConfig`](crate::HeapConfig) values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("alignment {0} is not a power of two")]
  AlignmentNotPowerOfTwo(usize),

  #[error("header size {header_size} is not a multiple of the alignment {alignment}")]
  HeaderMisaligned { header_size: usize, alignment: usize },

  #[error("minimum split payload {min_split_payload} must be a non-zero multiple of {alignment}")]
  SplitPayload {
    min_split_payload: usize,
    alignment: usize,
  },
}
