use std::{
  mem,
  ptr::{self, NonNull},
};

use log::{debug, trace, warn};

use crate::{
  align_down,
  block::BlockInfo,
  config::HeapConfig,
  directory::{BlockDirectory, Fit},
  error::{ConfigError, DirectoryError, GrowError, HeapError},
  region::Region,
};

const WORD: usize = mem::size_of::<usize>();

/// What [`FreeListHeap::try_free`] did with a valid pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reclaimed {
  /// The block stays in the list as a free block.
  Retained,
  /// The block was the tail and the region was retracted to its header.
  Shrunk,
}

/// First-fit free-list heap over a growable [`Region`].
///
/// All state lives in this value; two heaps over two regions are fully
/// independent. Not thread-safe: wrap it in a lock to share it.
pub struct FreeListHeap<R: Region> {
  region: R,
  config: HeapConfig,
  directory: BlockDirectory,
}

impl<R: Region> FreeListHeap<R> {
  pub fn new(region: R) -> Self {
    Self::build(region, HeapConfig::default())
  }

  pub fn with_config(
    region: R,
    config: HeapConfig,
  ) -> Result<Self, ConfigError> {
    config.validate()?;

    Ok(Self::build(region, config))
  }

  fn build(
    region: R,
    config: HeapConfig,
  ) -> Self {
    Self {
      region,
      directory: BlockDirectory::new(config.header_size),
      config,
    }
  }

  pub fn region(&self) -> &R {
    &self.region
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  /// True when no block exists and the region holds nothing of ours.
  pub fn is_empty(&self) -> bool {
    self.directory.is_empty()
  }

  pub fn block_count(&self) -> usize {
    self.directory.len()
  }

  /// Blocks in address order.
  pub fn blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.directory.iter()
  }

  pub fn check_invariants(&self) -> Result<(), DirectoryError> {
    self.directory.check(self.config.alignment, self.region.end())
  }

  /// Payload capacity of a live allocation, which may exceed what was asked.
  pub fn usable_size(
    &self,
    ptr: *const u8,
  ) -> Result<usize, HeapError> {
    let header = self.locate(ptr)?;

    Ok(self.directory.block(header).payload_size)
  }

  fn round(
    &self,
    size: usize,
  ) -> Result<usize, HeapError> {
    self.config.round(size).ok_or(HeapError::OutOfMemory {
      requested: size,
      source: GrowError::TooLarge(size),
    })
  }

  /// Allocates at least `size` bytes.
  ///
  /// The first free block large enough is reused, split when the leftover
  /// can host another block. Otherwise the region grows by one block at its
  /// tail.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let rounded = self.round(size)?;

    let header = match self.directory.first_fit(rounded) {
      Fit::Found(header) => {
        self
          .directory
          .split(header, rounded, self.config.split_threshold());
        self.directory.set_free(header, false);
        header
      }
      Fit::Missing { last } => self.grow(last, rounded)?,
    };

    Ok(self.payload_pointer(header))
  }

  fn grow(
    &mut self,
    last: Option<usize>,
    payload_size: usize,
  ) -> Result<usize, HeapError> {
    let requested = self
      .config
      .header_size
      .checked_add(payload_size)
      .ok_or(HeapError::OutOfMemory {
        requested: payload_size,
        source: GrowError::TooLarge(payload_size),
      })?;

    let start = self
      .region
      .grow(requested)
      .map_err(|source| HeapError::OutOfMemory { requested, source })?;

    debug_assert_eq!(
      last.map(|tail| self.directory.block(tail).end()),
      last.map(|_| start),
      "region grew away from the tail block"
    );

    self.directory.append(start, payload_size, last);

    debug!("grew region by {requested} bytes for block {start:#x}");

    Ok(start)
  }

  /// Releases an allocation. Addresses this heap never handed out are
  /// ignored, so any pointer value is accepted.
  pub fn free(
    &mut self,
    ptr: *mut u8,
  ) {
    if let Err(err) = self.try_free(ptr) {
      trace!("ignored free: {err}");
    }
  }

  /// [`free`](Self::free) with the outcome reported.
  ///
  /// Freeing a pointer twice is not detected when its block still exists;
  /// the second call then finds an already free block.
  pub fn try_free(
    &mut self,
    ptr: *mut u8,
  ) -> Result<Reclaimed, HeapError> {
    let mut header = self.locate(ptr)?;

    self.directory.set_free(header, true);

    if let Some(prev) = self.directory.block(header).prev {
      if self.directory.block(prev).free {
        self.directory.coalesce(prev);
        header = prev;
      }
    }

    self.directory.coalesce(header);

    if self.directory.block(header).next.is_some() {
      return Ok(Reclaimed::Retained);
    }

    if let Err(err) = self.region.shrink_to(header) {
      warn!("keeping free tail block {header:#x}: {err}");
      return Ok(Reclaimed::Retained);
    }

    self.directory.unlink_tail(header);

    debug!("released tail block {header:#x}, region shrunk");

    Ok(Reclaimed::Shrunk)
  }

  /// Changes the size of an allocation, moving it only when it cannot grow
  /// in place.
  ///
  /// A null `ptr` allocates. When the data has to move, the whole smaller
  /// payload is copied, in machine words and then the sub-word tail. If the
  /// new allocation fails the original block is left as it was.
  pub fn resize(
    &mut self,
    ptr: *mut u8,
    new_size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    if ptr.is_null() {
      return self.allocate(new_size);
    }

    let header = self.locate(ptr)?;
    let rounded = self.round(new_size)?;
    let block = *self.directory.block(header);

    if block.payload_size >= rounded {
      self.trim(header, rounded);
      return Ok(self.payload_pointer(header));
    }

    if let Some(next) = block.next {
      let next = self.directory.block(next);

      if next.free && block.payload_size + self.config.header_size + next.payload_size >= rounded {
        self.directory.coalesce(header);
        self.trim(header, rounded);
        return Ok(self.payload_pointer(header));
      }
    }

    let fresh = self.allocate(rounded)?;
    let fresh_size = self
      .directory
      .block(fresh.addr().get() - self.config.header_size)
      .payload_size;
    let copied = block.payload_size.min(fresh_size);
    let whole = align_down!(copied, WORD);

    trace!("relocating block {header:#x}: copying {copied} bytes");

    unsafe {
      let src = self.region.pointer(block.payload);
      let dst = fresh.as_ptr();

      for i in 0..whole / WORD {
        let word = src.cast::<usize>().add(i).read_unaligned();
        dst.cast::<usize>().add(i).write_unaligned(word);
      }

      ptr::copy_nonoverlapping(src.add(whole), dst.add(whole), copied - whole);
    }

    self.free(ptr);

    Ok(fresh)
  }

  /// Splits `header` down to `size` and folds the leftover into a free
  /// successor so no two free blocks end up adjacent.
  fn trim(
    &mut self,
    header: usize,
    size: usize,
  ) {
    if let Some(rest) = self
      .directory
      .split(header, size, self.config.split_threshold())
    {
      self.directory.coalesce(rest);
    }
  }

  /// Allocates `count * element_size` bytes and zeroes the whole rounded
  /// payload.
  ///
  /// The multiplication wraps on overflow; callers must validate the
  /// arguments themselves.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    element_size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let total = count.wrapping_mul(element_size);
    let rounded = self.round(total)?;
    let ptr = self.allocate(total)?;

    let whole = align_down!(rounded, WORD);

    unsafe {
      let words = ptr.as_ptr().cast::<usize>();
      for i in 0..whole / WORD {
        words.add(i).write_unaligned(0);
      }

      ptr::write_bytes(ptr.as_ptr().add(whole), 0, rounded - whole);
    }

    Ok(ptr)
  }

  fn locate(
    &self,
    ptr: *const u8,
  ) -> Result<usize, HeapError> {
    let address = ptr.addr();

    self
      .directory
      .locate(address, self.region.end())
      .ok_or(HeapError::InvalidPointer(address))
  }

  fn payload_pointer(
    &self,
    header: usize,
  ) -> NonNull<u8> {
    let payload = self.region.pointer(header + self.config.header_size);

    // Payloads sit above at least one header, so they are never null.
    unsafe { NonNull::new_unchecked(payload) }
  }
}
