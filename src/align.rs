/// Rounds `value` up to the next multiple of `unit`.
///
/// `unit` must be a power of two. The addition wraps, so a value within
/// `unit` of `usize::MAX` rounds to a small number instead of panicking.
///
/// # Examples
///
/// ```rust
/// use rheap::align;
///
/// assert_eq!(align!(13usize, 4), 16);
/// assert_eq!(align!(16usize, 4), 16);
/// assert_eq!(align!(1usize, 8), 8);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr, $unit:expr) => {
    ($value).wrapping_add($unit - 1) & !($unit - 1)
  };
}

/// Rounds `value` down to a multiple of `unit`.
///
/// ```rust
/// use rheap::align_down;
///
/// assert_eq!(align_down!(13, 8), 8);
/// assert_eq!(align_down!(7, 8), 0);
/// ```
#[macro_export]
macro_rules! align_down {
  ($value:expr, $unit:expr) => {
    ($value) & !($unit - 1)
  };
}

#[cfg(test)]
mod tests {
  use std::mem;

  #[test]
  fn test_align() {
    let unit = 4usize;

    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (unit * i + 1)..=(unit * (i + 1));

      let expected_alignment = unit * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size, unit));
      }
    }
  }

  #[test]
  fn test_align_zero_stays_zero() {
    assert_eq!(align!(0usize, 4), 0);
  }

  #[test]
  fn test_align_wraps_near_max() {
    assert_eq!(align!(usize::MAX - 1, 4usize), 0);
  }

  #[test]
  fn test_align_down_to_word() {
    let word = mem::size_of::<usize>();

    assert_eq!(align_down!(word * 3 + 1, word), word * 3);
    assert_eq!(align_down!(word - 1, word), 0);
    assert_eq!(align_down!(word * 2, word), word * 2);
  }
}
