use newt_common::Cursor;

use super::MessageParseError;
use crate::from_bytes::TryConsumeBytes;

/// Uniquely identifies a single message that may be retransmitted.
///
/// For a little more context and the difference between [`Id`] and [`Token`](super::Token),
/// see [`Token`](super::Token).
///
/// See [RFC7252 - Message Details](https://datatracker.ietf.org/doc/html/rfc7252#section-3) for context
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Eq, Ord, Debug, Default)]
pub struct Id(pub u16);

impl<A: AsRef<[u8]>> TryConsumeBytes<A> for Id {
  type Error = MessageParseError;

  fn try_consume_bytes(bytes: &mut Cursor<A>) -> Result<Self, Self::Error> {
    match bytes.take_exact(2) {
      | Some(&[a, b]) => Ok(Id(u16::from_be_bytes([a, b]))),
      | _ => Err(MessageParseError::eof()),
    }
  }
}

impl From<Id> for [u8; 2] {
  fn from(id: Id) -> [u8; 2] {
    id.0.to_be_bytes()
  }
}
