use std::{collections::HashMap, iter};

use log::trace;

use crate::{
  block::{Block, BlockInfo},
  error::DirectoryError,
};

/// Outcome of a first-fit scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
  Found(usize),
  /// Nothing fits; `last` is the tail block to grow after.
  Missing { last: Option<usize> },
}

/// Address-ordered doubly linked list of blocks covering the region.
///
/// ```text
///   head
///    │
///    ▼
///   ┌────────┬─────────┐   ┌────────┬──────┐   ┌────────┬────────────┐
///   │ header │ payload │ ⇄ │ header │ payl │ ⇄ │ header │  payload   │
///   └────────┴─────────┘   └────────┴──────┘   └────────┴────────────┘
///                      ▲
///                      └── end of one payload == start of the next header
/// ```
///
/// Headers live in a map keyed by header address rather than inside the
/// region, so every link is a plain address and no region byte is ever
/// reinterpreted as metadata.
#[derive(Debug)]
pub struct BlockDirectory {
  blocks: HashMap<usize, Block>,
  head: Option<usize>,
  header_size: usize,
}

impl BlockDirectory {
  pub fn new(header_size: usize) -> Self {
    Self {
      blocks: HashMap::new(),
      head: None,
      header_size,
    }
  }

  #[cfg(test)]
  pub fn head(&self) -> Option<usize> {
    self.head
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_none()
  }

  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  #[cfg(test)]
  pub fn get(
    &self,
    header: usize,
  ) -> Option<&Block> {
    self.blocks.get(&header)
  }

  /// Block behind a header known to be linked. Panics otherwise.
  pub fn block(
    &self,
    header: usize,
  ) -> &Block {
    &self.blocks[&header]
  }

  fn block_mut(
    &mut self,
    header: usize,
  ) -> &mut Block {
    self
      .blocks
      .get_mut(&header)
      .unwrap_or_else(|| panic!("block {header:#x} is linked but not stored"))
  }

  pub fn set_free(
    &mut self,
    header: usize,
    free: bool,
  ) {
    self.block_mut(header).free = free;
  }

  /// Maps a payload address back to its header.
  ///
  /// The address must lie strictly inside `(head, region_end)` and the
  /// block found one header before it must record that very address as its
  /// payload. Anything else is not ours.
  pub fn locate(
    &self,
    address: usize,
    region_end: usize,
  ) -> Option<usize> {
    let head = self.head?;

    if address <= head || address >= region_end {
      return None;
    }

    let header = address.checked_sub(self.header_size)?;
    let block = self.blocks.get(&header)?;

    (block.payload == address).then_some(header)
  }

  pub fn first_fit(
    &self,
    size: usize,
  ) -> Fit {
    let mut last = None;
    let mut current = self.head;

    while let Some(header) = current {
      let block = self.block(header);

      if block.free && block.payload_size >= size {
        trace!("first fit for {size} bytes: block {header:#x} ({} bytes)", block.payload_size);
        return Fit::Found(header);
      }

      last = Some(header);
      current = block.next;
    }

    Fit::Missing { last }
  }

  /// Links a freshly grown, allocated block after `prev` (or as the head).
  pub fn append(
    &mut self,
    header: usize,
    payload_size: usize,
    prev: Option<usize>,
  ) {
    let mut block = Block::new(header + self.header_size, payload_size, false);
    block.prev = prev;

    match prev {
      Some(prev) => self.block_mut(prev).next = Some(header),
      None => self.head = Some(header),
    }

    self.blocks.insert(header, block);
  }

  /// Shrinks `header` to exactly `size` bytes when the leftover is at least
  /// `threshold`, turning the leftover into a new free block. Returns the
  /// header of that block.
  pub fn split(
    &mut self,
    header: usize,
    size: usize,
    threshold: usize,
  ) -> Option<usize> {
    let block = *self.block(header);
    let leftover = block.payload_size.checked_sub(size)?;

    if leftover < threshold {
      return None;
    }

    let remainder = block.payload + size;
    let mut rest = Block::new(remainder + self.header_size, leftover - self.header_size, true);
    rest.prev = Some(header);
    rest.next = block.next;

    if let Some(next) = block.next {
      self.block_mut(next).prev = Some(remainder);
    }

    let shrunk = self.block_mut(header);
    shrunk.payload_size = size;
    shrunk.next = Some(remainder);

    trace!(
      "split block {header:#x}: kept {size} bytes, new free block {remainder:#x} ({} bytes)",
      rest.payload_size
    );

    self.blocks.insert(remainder, rest);

    Some(remainder)
  }

  /// Absorbs the successor of `header` if it is free. Returns whether a
  /// merge happened.
  pub fn coalesce(
    &mut self,
    header: usize,
  ) -> bool {
    let Some(next) = self.block(header).next else {
      return false;
    };

    if !self.block(next).free {
      return false;
    }

    let absorbed = self.splice_out(next);
    self.block_mut(header).payload_size += self.header_size + absorbed.payload_size;

    trace!("coalesced block {next:#x} into {header:#x}");

    true
  }

  /// Removes `header` from the list, linking its neighbours to each other.
  pub fn splice_out(
    &mut self,
    header: usize,
  ) -> Block {
    let removed = self
      .blocks
      .remove(&header)
      .unwrap_or_else(|| panic!("splicing out unknown block {header:#x}"));

    match removed.prev {
      Some(prev) => self.block_mut(prev).next = removed.next,
      None => self.head = removed.next,
    }

    if let Some(next) = removed.next {
      self.block_mut(next).prev = removed.prev;
    }

    removed
  }

  /// Drops the tail block ahead of a region shrink.
  pub fn unlink_tail(
    &mut self,
    header: usize,
  ) -> Block {
    debug_assert!(self.block(header).next.is_none(), "{header:#x} is not the tail");

    self.splice_out(header)
  }

  pub fn iter(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    iter::successors(self.head, |header| self.block(*header).next).map(|header| {
      let block = self.block(header);

      BlockInfo {
        header,
        payload: block.payload,
        payload_size: block.payload_size,
        free: block.free,
      }
    })
  }

  /// Walks the list and reports the first broken invariant.
  pub fn check(
    &self,
    alignment: usize,
    region_end: usize,
  ) -> Result<(), DirectoryError> {
    let mut reachable = 0;
    let mut expected_prev = None;
    let mut current = self.head;

    while let Some(header) = current {
      let block = self.block(header);
      reachable += 1;

      if block.prev != expected_prev {
        return Err(DirectoryError::BrokenBackLink {
          header,
          found: block.prev,
          expected: expected_prev,
        });
      }

      let expected_payload = header + self.header_size;
      if block.payload != expected_payload {
        return Err(DirectoryError::BadPayloadPointer {
          header,
          payload: block.payload,
          expected: expected_payload,
        });
      }

      if block.payload_size % alignment != 0 {
        return Err(DirectoryError::Misaligned {
          header,
          payload_size: block.payload_size,
          alignment,
        });
      }

      match block.next {
        Some(next) => {
          if block.end() != next {
            return Err(DirectoryError::Gap {
              header,
              end: block.end(),
              next,
            });
          }

          if block.free && self.block(next).free {
            return Err(DirectoryError::AdjacentFree {
              first: header,
              second: next,
            });
          }
        }
        None => {
          if block.end() != region_end {
            return Err(DirectoryError::TailMismatch {
              tail_end: block.end(),
              region_end,
            });
          }
        }
      }

      expected_prev = Some(header);
      current = block.next;
    }

    if reachable != self.blocks.len() {
      return Err(DirectoryError::Unreachable {
        stored: self.blocks.len(),
        reachable,
      });
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const HEADER: usize = 20;
  const BASE: usize = 0x1000;

  /// Three allocated blocks of 12, 20 and 32 bytes starting at `BASE`.
  fn three_blocks() -> (BlockDirectory, [usize; 3], usize) {
    let mut directory = BlockDirectory::new(HEADER);

    let a = BASE;
    let b = a + HEADER + 12;
    let c = b + HEADER + 20;
    let end = c + HEADER + 32;

    directory.append(a, 12, None);
    directory.append(b, 20, Some(a));
    directory.append(c, 32, Some(b));

    (directory, [a, b, c], end)
  }

  #[test]
  fn test_append_keeps_order() {
    let (directory, [a, b, c], end) = three_blocks();

    assert_eq!(directory.head(), Some(a));
    assert_eq!(directory.check(4, end), Ok(()));

    let headers: Vec<usize> = directory.iter().map(|info| info.header).collect();
    assert_eq!(headers, vec![a, b, c]);
  }

  #[test]
  fn test_locate_accepts_payload_starts_only() {
    let (directory, [a, b, _], end) = three_blocks();

    assert_eq!(directory.locate(a + HEADER, end), Some(a));
    assert_eq!(directory.locate(b + HEADER, end), Some(b));
    assert_eq!(directory.locate(a + HEADER + 4, end), None);
    assert_eq!(directory.locate(a, end), None);
    assert_eq!(directory.locate(end, end), None);
    assert_eq!(directory.locate(8, end), None);
  }

  #[test]
  fn test_locate_on_empty_directory() {
    let directory = BlockDirectory::new(HEADER);

    assert_eq!(directory.locate(BASE + HEADER, BASE + 100), None);
  }

  #[test]
  fn test_first_fit_reports_last_block() {
    let (mut directory, [a, b, c], _) = three_blocks();

    assert_eq!(directory.first_fit(4), Fit::Missing { last: Some(c) });

    directory.set_free(b, true);
    directory.set_free(a, true);

    assert_eq!(directory.first_fit(16), Fit::Found(b));
    assert_eq!(directory.first_fit(4), Fit::Found(a));
    assert_eq!(directory.first_fit(64), Fit::Missing { last: Some(c) });
  }

  #[test]
  fn test_split_links_remainder() {
    let (mut directory, [_, _, c], end) = three_blocks();

    let rest = directory.split(c, 4, HEADER + 4).unwrap();

    assert_eq!(rest, c + HEADER + 4);
    assert_eq!(directory.get(c).unwrap().payload_size, 4);
    assert_eq!(directory.get(rest).unwrap().payload_size, 32 - 4 - HEADER);
    assert!(directory.get(rest).unwrap().free);
    assert_eq!(directory.check(4, end), Ok(()));
  }

  #[test]
  fn test_split_below_threshold_is_skipped() {
    let (mut directory, [_, b, _], _) = three_blocks();

    assert_eq!(directory.split(b, 4, HEADER + 4), None);
    assert_eq!(directory.get(b).unwrap().payload_size, 20);
  }

  #[test]
  fn test_coalesce_absorbs_free_successor() {
    let (mut directory, [a, b, c], end) = three_blocks();

    directory.set_free(a, true);
    directory.set_free(b, true);

    assert!(directory.coalesce(a));
    assert_eq!(directory.get(a).unwrap().payload_size, 12 + HEADER + 20);
    assert_eq!(directory.get(a).unwrap().next, Some(c));
    assert_eq!(directory.get(c).unwrap().prev, Some(a));
    assert!(directory.get(b).is_none());
    assert_eq!(directory.check(4, end), Ok(()));
  }

  #[test]
  fn test_coalesce_skips_allocated_successor() {
    let (mut directory, [a, _, _], _) = three_blocks();

    directory.set_free(a, true);

    assert!(!directory.coalesce(a));
    assert_eq!(directory.len(), 3);
  }

  #[test]
  fn test_unlink_last_block_resets_head() {
    let mut directory = BlockDirectory::new(HEADER);
    directory.append(BASE, 8, None);

    directory.unlink_tail(BASE);

    assert!(directory.is_empty());
    assert_eq!(directory.len(), 0);
  }

  #[test]
  fn test_check_reports_adjacent_free() {
    let (mut directory, [a, b, _], end) = three_blocks();

    directory.set_free(a, true);
    directory.set_free(b, true);

    assert_eq!(
      directory.check(4, end),
      Err(DirectoryError::AdjacentFree { first: a, second: b })
    );
  }

  #[test]
  fn test_check_reports_tail_mismatch() {
    let (directory, _, end) = three_blocks();

    assert_eq!(
      directory.check(4, end + 4),
      Err(DirectoryError::TailMismatch {
        tail_end: end,
        region_end: end + 4,
      })
    );
  }

  #[test]
  fn test_check_reports_gap() {
    let mut directory = BlockDirectory::new(HEADER);
    directory.append(BASE, 8, None);
    directory.append(BASE + 64, 8, Some(BASE));

    assert_eq!(
      directory.check(4, BASE + 64 + HEADER + 8),
      Err(DirectoryError::Gap {
        header: BASE,
        end: BASE + HEADER + 8,
        next: BASE + 64,
      })
    );
  }
}
