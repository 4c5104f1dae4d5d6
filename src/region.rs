use std::mem;

use log::debug;

use crate::error::GrowError;

/// A contiguous address range that can only grow or shrink at its end.
pub trait Region {
  /// Extends the region by exactly `byte_count` bytes and returns the end
  /// address from before the extension. On failure nothing is extended.
  fn grow(
    &mut self,
    byte_count: usize,
  ) -> Result<usize, GrowError>;

  /// Retracts the end back to `address`, which must be a block boundary
  /// no greater than the current end. On failure the end is unchanged.
  fn shrink_to(
    &mut self,
    address: usize,
  ) -> Result<(), GrowError>;

  /// Current end of the region.
  fn end(&self) -> usize;

  /// Turns an address inside the region into a pointer the caller may use.
  fn pointer(
    &self,
    address: usize,
  ) -> *mut u8;
}

/// A fixed-capacity buffer owned by the heap.
///
/// ```text
///   base                     end                         base + capacity
///   ├────────────────────────┼────────────────────────────┤
///   │     in use (blocks)    │       available            │
///   └────────────────────────┴────────────────────────────┘
/// ```
///
/// The buffer is allocated once and never moves, so payload pointers stay
/// valid for as long as the region lives. It is backed by machine words, so
/// `base` is word aligned.
pub struct FixedRegion {
  _memory: Vec<usize>,
  base: *mut u8,
  len: usize,
  capacity: usize,
}

impl FixedRegion {
  pub fn new(capacity: usize) -> Self {
    let mut memory = vec![0usize; capacity.div_ceil(mem::size_of::<usize>())];
    let base = memory.as_mut_ptr().cast::<u8>();

    Self {
      _memory: memory,
      base,
      len: 0,
      capacity,
    }
  }

  pub fn base(&self) -> usize {
    self.base.addr()
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}

impl Region for FixedRegion {
  fn grow(
    &mut self,
    byte_count: usize,
  ) -> Result<usize, GrowError> {
    let available = self.capacity - self.len;

    if byte_count > available {
      return Err(GrowError::Exhausted {
        requested: byte_count,
        available,
      });
    }

    let previous_end = self.end();
    self.len += byte_count;

    Ok(previous_end)
  }

  fn shrink_to(
    &mut self,
    address: usize,
  ) -> Result<(), GrowError> {
    if !(self.base()..=self.end()).contains(&address) {
      return Err(GrowError::OutsideRegion(address));
    }

    self.len = address - self.base();

    Ok(())
  }

  fn end(&self) -> usize {
    self.base() + self.len
  }

  fn pointer(
    &self,
    address: usize,
  ) -> *mut u8 {
    self.base.wrapping_add(address - self.base())
  }
}

/// The process data segment, moved with `sbrk(2)` and `brk(2)`.
///
/// The heap assumes it is the only user of the program break while it holds
/// blocks. If something else moves the break between two growths the new
/// space would not be contiguous with the last block, so the increment is
/// handed back and the growth fails. Once the region is retracted to where
/// it started it holds nothing, and the next growth starts afresh wherever
/// the break is.
#[cfg(unix)]
pub struct SbrkRegion {
  start: Option<usize>,
  end: Option<usize>,
}

#[cfg(unix)]
impl SbrkRegion {
  pub const fn new() -> Self {
    Self {
      start: None,
      end: None,
    }
  }

  /// Current program break as reported by `sbrk(0)`.
  pub fn program_break() -> usize {
    unsafe { libc::sbrk(0) }.addr()
  }
}

#[cfg(unix)]
impl Default for SbrkRegion {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(unix)]
impl Region for SbrkRegion {
  fn grow(
    &mut self,
    byte_count: usize,
  ) -> Result<usize, GrowError> {
    use libc::{c_void, intptr_t, sbrk};

    let increment = intptr_t::try_from(byte_count).map_err(|_| GrowError::TooLarge(byte_count))?;

    let previous = unsafe { sbrk(increment) };

    if previous == usize::MAX as *mut c_void {
      return Err(std::io::Error::last_os_error().into());
    }

    let previous = previous.addr();

    if let Some(expected) = self.end {
      if previous != expected {
        unsafe { sbrk(-increment) };

        return Err(GrowError::Discontiguous {
          expected,
          found: previous,
        });
      }
    }

    self.start.get_or_insert(previous);
    self.end = Some(previous + byte_count);

    debug!("program break moved {previous:#x} -> {:#x}", previous + byte_count);

    Ok(previous)
  }

  fn shrink_to(
    &mut self,
    address: usize,
  ) -> Result<(), GrowError> {
    match (self.start, self.end) {
      (Some(start), Some(end)) if (start..=end).contains(&address) => {}
      _ => return Err(GrowError::OutsideRegion(address)),
    }

    if unsafe { libc::brk(address as *mut libc::c_void) } != 0 {
      return Err(std::io::Error::last_os_error().into());
    }

    debug!("program break retracted to {address:#x}");

    if self.start == Some(address) {
      self.start = None;
      self.end = None;
    } else {
      self.end = Some(address);
    }

    Ok(())
  }

  fn end(&self) -> usize {
    self.end.unwrap_or_else(Self::program_break)
  }

  fn pointer(
    &self,
    address: usize,
  ) -> *mut u8 {
    address as *mut u8
  }
}
