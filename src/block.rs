/// Metadata of one block. Blocks are keyed by their header address, and
/// `prev`/`next` hold the header addresses of the neighbours in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
  pub free: bool,
  pub payload_size: usize,
  pub prev: Option<usize>,
  pub next: Option<usize>,
  /// Start of the payload; always `header + header_size`.
  pub payload: usize,
}

impl Block {
  pub fn new(
    payload: usize,
    payload_size: usize,
    free: bool,
  ) -> Self {
    Self {
      free,
      payload_size,
      prev: None,
      next: None,
      payload,
    }
  }

  /// First address past the payload, i.e. where the next header begins.
  pub fn end(&self) -> usize {
    self.payload + self.payload_size
  }
}

/// Read-only view of a block handed out by
/// [`FreeListHeap::blocks`](crate::FreeListHeap::blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub header: usize,
  pub payload: usize,
  pub payload_size: usize,
  pub free: bool,
}
