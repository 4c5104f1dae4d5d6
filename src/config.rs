use crate::error::ConfigError;

pub const DEFAULT_ALIGNMENT: usize = 4;
pub const DEFAULT_HEADER_SIZE: usize = 20;

/// Layout parameters of a [`FreeListHeap`](crate::FreeListHeap).
///
/// The defaults reproduce the classic layout: payloads rounded to 4 bytes,
/// a 20 byte header in front of every payload, and a split only when the
/// leftover can hold a header plus one alignment unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  pub alignment: usize,
  pub header_size: usize,
  pub min_split_payload: usize,
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      alignment: DEFAULT_ALIGNMENT,
      header_size: DEFAULT_HEADER_SIZE,
      min_split_payload: DEFAULT_ALIGNMENT,
    }
  }
}

impl HeapConfig {
  pub fn with_alignment(
    mut self,
    alignment: usize,
  ) -> Self {
    self.alignment = alignment;
    self
  }

  pub fn with_header_size(
    mut self,
    header_size: usize,
  ) -> Self {
    self.header_size = header_size;
    self
  }

  pub fn with_min_split_payload(
    mut self,
    min_split_payload: usize,
  ) -> Self {
    self.min_split_payload = min_split_payload;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !self.alignment.is_power_of_two() {
      return Err(ConfigError::AlignmentNotPowerOfTwo(self.alignment));
    }

    if self.header_size % self.alignment != 0 {
      return Err(ConfigError::HeaderMisaligned {
        header_size: self.header_size,
        alignment: self.alignment,
      });
    }

    if self.min_split_payload == 0 || self.min_split_payload % self.alignment != 0 {
      return Err(ConfigError::SplitPayload {
        min_split_payload: self.min_split_payload,
        alignment: self.alignment,
      });
    }

    Ok(())
  }

  /// Rounds a request up to the alignment unit. Zero becomes one unit.
  /// Returns `None` when rounding would pass `usize::MAX`.
  pub fn round(
    &self,
    size: usize,
  ) -> Option<usize> {
    let rounded = crate::align!(size, self.alignment);

    if rounded < size {
      return None;
    }

    Some(rounded.max(self.alignment))
  }

  /// Smallest leftover worth carving into its own block.
  pub fn split_threshold(&self) -> usize {
    self.header_size + self.min_split_payload
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_are_valid() {
    let config = HeapConfig::default();

    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.split_threshold(), 24);
  }

  #[test]
  fn test_round() {
    let config = HeapConfig::default();

    assert_eq!(config.round(0), Some(4));
    assert_eq!(config.round(1), Some(4));
    assert_eq!(config.round(10), Some(12));
    assert_eq!(config.round(20), Some(20));
    assert_eq!(config.round(30), Some(32));
  }

  #[test]
  fn test_round_reports_wrap_near_max() {
    let config = HeapConfig::default();

    assert_eq!(config.round(usize::MAX - 1), None);
    assert_eq!(config.round(usize::MAX), None);
    assert_eq!(config.round(usize::MAX - 3), Some(usize::MAX - 3));
  }

  #[test]
  fn test_rejects_bad_alignment() {
    let config = HeapConfig::default().with_alignment(6);

    assert_eq!(config.validate(), Err(ConfigError::AlignmentNotPowerOfTwo(6)));
  }

  #[test]
  fn test_rejects_misaligned_header() {
    let config = HeapConfig::default().with_alignment(8);

    assert_eq!(
      config.validate(),
      Err(ConfigError::HeaderMisaligned {
        header_size: 20,
        alignment: 8,
      })
    );
  }

  #[test]
  fn test_rejects_zero_split_payload() {
    let config = HeapConfig::default().with_min_split_payload(0);

    assert!(matches!(config.validate(), Err(ConfigError::SplitPayload { .. })));
  }

  #[test]
  fn test_word_sized_layout() {
    let config = HeapConfig::default()
      .with_alignment(8)
      .with_header_size(32)
      .with_min_split_payload(8);

    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.round(9), Some(16));
  }
}
