//! # newt_msg
//! Low-level representation of CoAP messages.
//!
//! ## Message shapes
//! The [`Message`] struct is generic over the byte collections backing
//! its payload and option values:
//! - `Vec`-backed messages grow on the heap and require `alloc`
//! - `tinyvec::ArrayVec`-backed messages live entirely on the stack
//!
//! Both satisfy the same [`newt_common::Array`] bounds, so every codec
//! path in this crate works against preallocated storage.
//!
//! ## Scope
//! This crate explicitly does **not** know or care about how
//! messages are sent and received, and is **just** concerned with the data
//! structures involved on the machines having a CoAP conversation.
//!
//! For a runtime that uses this library, see the `newt` crate.

#![cfg_attr(all(not(test), feature = "no_std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;

#[doc(hidden)]
pub mod from_bytes;
#[doc(hidden)]
pub mod to_bytes;

#[doc(inline)]
pub use from_bytes::TryFromBytes;
#[doc(inline)]
pub use to_bytes::{MessageToBytesError, OptionOrdering, SerializeRules, TryIntoBytes};

mod msg;
pub use msg::*;

/// RFC 8323 length-prefixed framing for stream transports
pub mod reliable;

/// Message cache keys
pub mod cache_key;
pub use cache_key::{CacheKey, DefaultCacheKey};

#[cfg(test)]
#[macro_export]
/// Assert that 2 bytes are equal, rendering them as binary on failure
macro_rules! assert_eqb {
  ($actual:expr, $expected:expr) => {
    if $actual != $expected {
      panic!("expected {:08b} to equal {:08b}", $actual, $expected)
    }
  };
}

#[cfg(test)]
#[macro_export]
/// Assert that 2 byte sequences are equal, rendering them as binary on failure
macro_rules! assert_eqb_iter {
  ($actual:expr, $expected:expr) => {
    if $actual.iter().ne($expected.iter()) {
      panic!("expected {:?} to equal {:?}",
             $actual.iter().map(|b| format!("{:08b}", b)).collect::<Vec<_>>(),
             $expected.iter().map(|b| format!("{:08b}", b)).collect::<Vec<_>>())
    }
  };
}

#[cfg(test)]
pub(crate) fn test_msg() -> (VecMessage, Vec<u8>) {
  let header: [u8; 4] = [0b01_00_0001, 0x45, 0x00, 0x01];
  let token: [u8; 1] = [254u8];
  let content_format: &[u8] = b"application/json";
  let options: [&[u8]; 2] = [&[0b1100_1101u8, 0b0000_0011u8], content_format];
  let payload: [&[u8]; 2] = [&[0b11111111u8], b"hello, world!"];
  let bytes = [header.as_ref(),
               token.as_ref(),
               options.concat().as_ref(),
               payload.concat().as_ref()].concat();

  let mut msg = VecMessage::new(Type::Con,
                                Code { class: 2, detail: 5 },
                                Id(1),
                                Token(tinyvec::array_vec!([u8; 8] => 254)));
  msg.add(OptNumber(12), OptValue(content_format.iter().copied().collect()))
     .unwrap();
  msg.payload = Payload(b"hello, world!".iter().copied().collect());

  (msg, bytes)
}
