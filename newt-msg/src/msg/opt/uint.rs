//! The `uint` option value format (RFC7252 section 3.2)
//!
//! A non-negative integer is represented in network byte order using
//! the minimum number of bytes: zero is represented with an empty value.

use tinyvec::ArrayVec;

/// Encode an unsigned integer as the minimal big-endian byte string.
///
/// ```
/// use newt_msg::opt::uint;
///
/// assert_eq!(uint::encode(0).as_ref(), &[] as &[u8]);
/// assert_eq!(uint::encode(0x12).as_ref(), &[0x12]);
/// assert_eq!(uint::encode(0x0104).as_ref(), &[0x01, 0x04]);
/// ```
pub fn encode(val: u32) -> ArrayVec<[u8; 4]> {
  let width = (32 - val.leading_zeros() as usize + 7) / 8;
  val.to_be_bytes().iter().skip(4 - width).copied().collect()
}

/// Decode a big-endian byte string into an unsigned integer.
///
/// Yields `None` when the value is wider than 4 bytes.
///
/// ```
/// use newt_msg::opt::uint;
///
/// assert_eq!(uint::decode(&[]), Some(0));
/// assert_eq!(uint::decode(&[0x01, 0x04]), Some(0x0104));
/// assert_eq!(uint::decode(&[1, 2, 3, 4, 5]), None);
/// ```
pub fn decode(bytes: &[u8]) -> Option<u32> {
  if bytes.len() > 4 {
    return None;
  }

  Some(bytes.iter().fold(0u32, |n, b| (n << 8) | (*b as u32)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minimal_width() {
    let cases: [(u32, usize); 6] =
      [(0, 0), (1, 1), (255, 1), (256, 2), (65535, 2), (65536, 3)];

    for (val, width) in cases {
      assert_eq!(encode(val).len(), width, "width of {}", val);
    }
  }

  #[test]
  fn roundtrip() {
    for val in [0u32, 1, 12, 255, 256, 0xFFFF, 0x10000, u32::MAX] {
      assert_eq!(decode(&encode(val)), Some(val));
    }
  }
}
