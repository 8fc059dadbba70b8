use newt_common::{Array, GetSize};

use crate::msg::Byte1;
use crate::*;

/// Trait allowing fallible conversion into bytes
pub trait TryIntoBytes {
  /// Error type yielded if conversion fails
  type Error;

  /// Try to convert into a collection of bytes
  ///
  /// ```
  /// use newt_msg::{Code, Id, Token, TryIntoBytes, Type, VecMessage};
  ///
  /// let msg = VecMessage::new(Type::Con, Code::GET, Id(1), Token::empty());
  /// let bytes: Vec<u8> = msg.try_into_bytes().unwrap();
  /// ```
  fn try_into_bytes<C: Array<Item = u8>>(self) -> Result<C, Self::Error>;
}

/// What serialization should do about option order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptionOrdering {
  /// Sort the options by number before emitting (selection sort,
  /// in place). The order of repeated options is not guaranteed to
  /// be preserved; insert in sorted position if that matters.
  Sort,
  /// The caller asserts the options are already sorted; a decreasing
  /// number fails with [`MessageToBytesError::OptionOutOfOrder`].
  AssumeSorted,
}

/// Knobs for serializing a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeRules {
  /// See [`OptionOrdering`]
  pub ordering: OptionOrdering,
  /// Fail with [`MessageToBytesError::OptionRepeated`] when an option
  /// the registry marks non-repeatable occurs more than once
  pub check_repeat: bool,
}

impl Default for SerializeRules {
  fn default() -> Self {
    Self { ordering: OptionOrdering::Sort,
           check_repeat: true }
  }
}

/// Errors encounterable serializing to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageToBytesError {
  /// Reserved capacity was not enough for size of message
  TooLong {
    /// Capacity of the target buffer
    capacity: usize,
    /// Size the message needs
    size: usize,
  },

  /// Options were asserted to be sorted, but a number decreased
  OptionOutOfOrder {
    /// Number preceding the offender
    prev: u32,
    /// The offending (smaller) number
    next: u32,
  },

  /// A non-repeatable option occurred more than once
  OptionRepeated(u32),

  /// Code was 0.00 but the message carried a token, options or a payload
  EmptyMessageFormat,
}

impl<P, L> Message<P, L>
  where P: Array<Item = u8>,
        L: OptList
{
  /// Serialize this message, spelling out what to do about option
  /// order and repetition. [`TryIntoBytes`] is this with the
  /// default rules (sort, check repeats).
  ///
  /// The target collection is never written past its capacity: a
  /// message that does not fit fails with
  /// [`MessageToBytesError::TooLong`].
  pub fn serialize_with<C: Array<Item = u8>>(mut self,
                                             rules: SerializeRules)
                                             -> Result<C, MessageToBytesError> {
    if self.code.kind() == CodeKind::Empty
       && (self.token.len() > 0 || self.opts.get_size() > 0 || self.payload.0.get_size() > 0)
    {
      return Err(MessageToBytesError::EmptyMessageFormat);
    }

    match rules.ordering {
      | OptionOrdering::Sort => sort_opts(&mut self.opts),
      | OptionOrdering::AssumeSorted => {
        let mut prev = 0u32;

        for o in self.opts.iter() {
          if o.number.0 < prev {
            return Err(MessageToBytesError::OptionOutOfOrder { prev,
                                                               next: o.number.0 });
          }

          prev = o.number.0;
        }
      },
    }

    if rules.check_repeat {
      let mut prev: Option<OptNumber> = None;

      for o in self.opts.iter() {
        if prev == Some(o.number) && !known::repeatable(o.number) {
          return Err(MessageToBytesError::OptionRepeated(o.number.0));
        }

        prev = Some(o.number);
      }
    }

    let size = self.get_size();
    let mut bytes = C::reserve(size);

    if let Some(max) = bytes.max_size() {
      if max < size {
        return Err(MessageToBytesError::TooLong { capacity: max,
                                                  size });
      }
    }

    let byte1: u8 = Byte1 { tkl: self.token.0.len() as u8,
                            ver: self.ver,
                            ty: self.ty }.into();

    bytes.extend(Some(byte1));
    bytes.extend(Some(u8::from(self.code)));
    bytes.extend(<[u8; 2]>::from(self.id));
    bytes.extend(self.token.0);

    let mut prev = OptNumber(0);
    for opt in self.opts.iter() {
      opt.extend_bytes(prev, &mut bytes);
      prev = opt.number;
    }

    if !self.payload.0.size_is_zero() {
      bytes.extend(Some(0b11111111));
      bytes.extend(self.payload.0);
    }

    Ok(bytes)
  }
}

impl<P, L> TryIntoBytes for Message<P, L>
  where P: Array<Item = u8>,
        L: OptList
{
  type Error = MessageToBytesError;

  fn try_into_bytes<C: Array<Item = u8>>(self) -> Result<C, Self::Error> {
    self.serialize_with(SerializeRules::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{assert_eqb, assert_eqb_iter};

  #[test]
  fn msg() {
    let (msg, expected) = crate::test_msg();
    let actual: Vec<u8> = msg.try_into_bytes().unwrap();
    assert_eqb_iter!(actual, expected);
  }

  #[test]
  fn confirmable_get_round_trips() {
    let mut msg = VecMessage::new(Type::Con,
                                  Code::GET,
                                  Id(0x1234),
                                  Token::try_from(&[0x5B, 0x7E][..]).unwrap());
    msg.add_path_segment("time").unwrap();

    let bytes: Vec<u8> = msg.clone().try_into_bytes().unwrap();
    assert_eq!(bytes,
               vec![0x42, 0x01, 0x12, 0x34, 0x5B, 0x7E, 0xB4, 0x74, 0x69, 0x6D, 0x65]);

    let parsed = VecMessage::try_from_bytes(&bytes).unwrap();
    assert_eq!(parsed, msg);
  }

  #[test]
  fn piggybacked_response_bytes() {
    let bytes = [0x62u8, 0x45, 0x12, 0x34, 0x5B, 0x7E, 0xC0, 0xFF, 0x4F, 0x4B];
    let msg = VecMessage::try_from_bytes(&bytes[..]).unwrap();

    assert_eq!(msg.ty, Type::Ack);
    assert_eq!(msg.code, Code::CONTENT);
    assert_eq!(msg.id, Id(0x1234));
    assert_eq!(msg.token, Token::try_from(&[0x5B, 0x7E][..]).unwrap());
    assert_eq!(msg.content_format(), Some(ContentFormat::Text));
    assert_eq!(msg.payload.as_bytes(), b"OK");

    let emitted: Vec<u8> = msg.try_into_bytes().unwrap();
    assert_eq!(emitted, bytes.to_vec());
  }

  #[test]
  fn byte_1() {
    let byte = Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 };
    let actual: u8 = byte.into();
    let expected = 0b_01_10_0011u8;
    assert_eqb!(actual, expected)
  }

  #[test]
  fn empty_message_is_4_bytes() {
    let msg = VecMessage::new(Type::Ack, Code::EMPTY, Id(77), Token::empty());
    let bytes: Vec<u8> = msg.try_into_bytes().unwrap();
    assert_eq!(bytes.len(), 4);
  }

  #[test]
  fn empty_code_with_payload_is_format_error() {
    let mut msg = VecMessage::new(Type::Ack, Code::EMPTY, Id(77), Token::empty());
    msg.payload = Payload(vec![1]);
    assert_eq!(msg.try_into_bytes::<Vec<u8>>(),
               Err(MessageToBytesError::EmptyMessageFormat));
  }

  #[test]
  fn sort_then_emit() {
    let mut msg = VecMessage::new(Type::Con, Code::GET, Id(1), Token::empty());
    // bypass sorted insertion to simulate unsorted caller input
    msg.opts = vec![Opt { number: OptNumber(60),
                          value: OptValue(vec![1]) },
                    Opt { number: OptNumber(3),
                          value: OptValue(b"h".to_vec()) }];

    let bytes: Vec<u8> = msg.clone().try_into_bytes().unwrap();
    let parsed = VecMessage::try_from_bytes(&bytes).unwrap();

    let numbers = parsed.opts.iter().map(|o| o.number.0).collect::<Vec<_>>();
    assert_eq!(numbers, vec![3, 60]);
  }

  #[test]
  fn unsorted_input_fails_when_asserted_sorted() {
    let mut msg = VecMessage::new(Type::Con, Code::GET, Id(1), Token::empty());
    msg.opts = vec![Opt { number: OptNumber(60),
                          value: OptValue(vec![1]) },
                    Opt { number: OptNumber(3),
                          value: OptValue(b"h".to_vec()) }];

    let rules = SerializeRules { ordering: OptionOrdering::AssumeSorted,
                                 check_repeat: true };
    assert_eq!(msg.serialize_with::<Vec<u8>>(rules),
               Err(MessageToBytesError::OptionOutOfOrder { prev: 60,
                                                           next: 3 }));
  }

  #[test]
  fn repeated_non_repeatable_fails() {
    let mut msg = VecMessage::new(Type::Con, Code::GET, Id(1), Token::empty());
    msg.add(known::no_repeat::CONTENT_FORMAT, OptValue(vec![])).unwrap();
    msg.add(known::no_repeat::CONTENT_FORMAT, OptValue(vec![50])).unwrap();

    assert_eq!(msg.clone().try_into_bytes::<Vec<u8>>(),
               Err(MessageToBytesError::OptionRepeated(12)));

    // repeatable options repeat freely
    let mut msg = VecMessage::new(Type::Con, Code::GET, Id(1), Token::empty());
    msg.add_path_segment("a").unwrap();
    msg.add_path_segment("b").unwrap();
    assert!(msg.try_into_bytes::<Vec<u8>>().is_ok());
  }

  #[test]
  fn never_writes_past_capacity() {
    let mut msg =
      crate::ArrayVecMessage::<16, 2, 16>::new(Type::Con, Code::GET, Id(1), Token::empty());
    msg.payload = Payload(b"twelve bytes".iter().copied().collect());

    let emitted = msg.clone().try_into_bytes::<tinyvec::ArrayVec<[u8; 8]>>();
    assert_eq!(emitted,
               Err(MessageToBytesError::TooLong { capacity: 8,
                                                  size: 17 }));

    let emitted = msg.try_into_bytes::<tinyvec::ArrayVec<[u8; 17]>>();
    assert_eq!(emitted.map(|bytes| bytes.len()), Ok(17));
  }

  #[test]
  fn no_payload_marker() {
    let msg = VecMessage::new(Type::Con,
                              Code { class: 2,
                                     detail: 5 },
                              Id(0),
                              Token::empty());

    assert_ne!(msg.try_into_bytes::<Vec<_>>().unwrap().last(),
               Some(&0b11111111));
  }
}
