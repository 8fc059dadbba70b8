use core::str::{from_utf8, Utf8Error};

use newt_common::{AppendCopy, Array, Cursor, GetSize};

/// Message Code
pub mod code;

/// Message parsing errors
pub mod parse_error;

/// Message ID
pub mod id;

/// Message Options
pub mod opt;

/// Message Type
pub mod ty;

/// Message Token
pub mod token;

/// Message Version
pub mod ver;

pub use code::*;
pub use id::*;
pub use opt::*;
pub use parse_error::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

use crate::from_bytes::TryConsumeBytes;
use crate::TryFromBytes;

#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;
use tinyvec::ArrayVec;

/// Low-level representation of the message payload
///
/// Both requests and responses may include a payload, depending on the
/// Method or Response Code, respectively.
///
/// # Related
/// - [RFC7252#section-5.5 Payloads and Representations](https://datatracker.ietf.org/doc/html/rfc7252#section-5.5)
#[derive(Default, Clone, Debug)]
pub struct Payload<C>(pub C);

impl<C> PartialEq for Payload<C> where C: Array<Item = u8>
{
  fn eq(&self, other: &Self) -> bool {
    self.0.iter().eq(other.0.iter())
  }
}

impl<C> Eq for Payload<C> where C: Array<Item = u8> {}

impl<C> core::hash::Hash for Payload<C> where C: Array<Item = u8>
{
  fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
    state.write(&self.0)
  }
}

impl<C> Payload<C> where C: Array<Item = u8>
{
  /// Convert a reference to a Payload to a byte slice
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

/// Struct representing the first byte of a message.
///
/// ```text
/// CoAP version
/// |
/// |  Message type (request, response, empty)
/// |  |
/// |  |  Length of token, in bytes. (4-bit integer)
/// |  |  |
/// vv vv vvvv
/// 01 00 0000
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) tkl: u8,
}

impl TryFrom<u8> for Byte1 {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    let ver = b >> 6; // bits 0 & 1
    let ty = b >> 4 & 0b11; // bits 2 & 3
    let tkl = b & 0b1111u8; // last 4 bits

    if ver != 1 {
      return Err(MessageParseError::InvalidVersion(ver));
    }

    Ok(Byte1 { ver: Version(ver),
               ty: Type::try_from(ty)?,
               tkl })
  }
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let tkl = b.tkl;

    ver | ty | tkl
  }
}

/// # CoAP Messages
/// This struct provides a high-level API for manipulating requests & responses,
/// while still being cheaply serializable to & from the byte layout of CoAP messages on the wire.
///
/// ## Options
/// Options (the CoAP equivalent to HTTP headers) are kept sorted by
/// number; [`Message::add`] inserts at the sorted position, appending
/// after any existing values with the same number. Serialization is
/// then a single pass that re-derives the deltas.
///
/// ## Storage
/// `Message` is generic over the collections backing the payload and
/// the option list, so the same type serves heap-allocated (`Vec`) and
/// preallocated (`tinyvec::ArrayVec`) use. See [`VecMessage`] and
/// [`ArrayVecMessage`].
///
/// ## Sending / Receiving
/// This crate (`newt-msg`) explicitly does **not** know or care about how
/// the messages are sent and received, and is **just** concerned with the data
/// structures involved on the machines having a CoAP conversation.
#[derive(Clone, Debug)]
pub struct Message<PayloadBytes, Opts> {
  /// see [`Id`] for details
  pub id: Id,
  /// see [`Type`] for details
  pub ty: Type,
  /// see [`Version`] for details
  pub ver: Version,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Code`] for details
  pub code: Code,
  /// see [`opt::Opt`] for details
  pub opts: Opts,
  /// see [`Payload`]
  pub payload: Payload<PayloadBytes>,
}

/// [`Message`] backed by heap allocation
#[cfg(feature = "alloc")]
pub type VecMessage = Message<Vec<u8>, Vec<Opt<Vec<u8>>>>;

/// [`Message`] backed entirely by stack allocation
pub type ArrayVecMessage<const PAYLOAD_CAP: usize, const N_OPTS: usize, const OPT_CAP: usize> =
  Message<ArrayVec<[u8; PAYLOAD_CAP]>, ArrayVec<[Opt<ArrayVec<[u8; OPT_CAP]>>; N_OPTS]>>;

impl<P, L> PartialEq for Message<P, L>
  where P: Array<Item = u8>,
        L: OptList + PartialEq
{
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
    && self.ty == other.ty
    && self.ver == other.ver
    && self.code == other.code
    && self.token == other.token
    && self.payload == other.payload
    && self.opts == other.opts
  }
}

impl<P, L> GetSize for Message<P, L>
  where P: Array<Item = u8>,
        L: OptList
{
  const CAPACITY: Option<usize> = None;

  fn get_size(&self) -> usize {
    let header_size = 4;
    let token_size = self.token.0.len();
    let opts_size: usize = {
      let mut prev = OptNumber(0);
      self.opts
          .iter()
          .map(|o| {
            let size = o.wire_size(prev);
            prev = o.number;
            size
          })
          .sum()
    };
    let payload_size = match self.payload.0.get_size() {
      | 0 => 0,
      | n => n + 1,
    };

    header_size + token_size + opts_size + payload_size
  }

  fn is_full(&self) -> bool {
    false
  }
}

impl<P, L> Message<P, L>
  where P: Array<Item = u8> + AppendCopy<u8>,
        L: OptList
{
  /// Create a new message
  pub fn new(ty: Type, code: Code, id: Id, token: Token) -> Self {
    Self { id,
           token,
           ty,
           code,
           ver: Version::default(),
           payload: Payload(P::default()),
           opts: L::default() }
  }

  /// Create a new message that ACKs this one.
  ///
  /// Per RFC7252 an acknowledgment echoes the message id of the
  /// confirmable message it acknowledges.
  pub fn ack(&self) -> Self {
    Self { id: self.id,
           token: Token::empty(),
           ver: Default::default(),
           ty: Type::Ack,
           code: Code::EMPTY,
           payload: Payload(Default::default()),
           opts: Default::default() }
  }

  /// Create a new message that Resets this one.
  pub fn rst(&self) -> Self {
    Self { id: self.id,
           token: Token::empty(),
           ver: Default::default(),
           ty: Type::Reset,
           code: Code::EMPTY,
           payload: Payload(Default::default()),
           opts: Default::default() }
  }

  /// Insert a new value for a given option, preserving the sorted
  /// order of the list. Repeated numbers go after existing instances.
  ///
  /// Errors when there is no storage left for options.
  pub fn add(&mut self, n: OptNumber, v: OptValue<L::Bytes>) -> Result<(), OptionsFull> {
    if self.opts.is_full() {
      return Err(OptionsFull(n));
    }

    let ix = self.opts
                 .iter()
                 .position(|o| o.number > n)
                 .unwrap_or_else(|| self.opts.get_size());

    self.opts.insert_at(ix, Opt { number: n,
                                  value: v });
    Ok(())
  }

  /// Replace any / all existing values with a new one.
  pub fn set(&mut self, n: OptNumber, v: OptValue<L::Bytes>) -> Result<(), OptionsFull> {
    self.remove(n);
    self.add(n, v)
  }

  /// Get the value(s) of an option by number
  pub fn get(&self, n: OptNumber) -> impl Iterator<Item = &OptValue<L::Bytes>> {
    self.opts
        .iter()
        .filter(move |o| o.number == n)
        .map(|o| &o.value)
  }

  /// Get the value of an option, taking the first if there are multiple.
  pub fn get_first(&self, n: OptNumber) -> Option<&OptValue<L::Bytes>> {
    self.get(n).next()
  }

  /// Get the value of an option, and interpret it as a UTF-8 string
  pub fn get_str(&self, n: OptNumber) -> Result<Option<&str>, Utf8Error> {
    match self.get_first(n) {
      | Some(v) => from_utf8(&v.0).map(Some),
      | _ => Ok(None),
    }
  }

  /// Get the value of an option, and interpret it as an unsigned integer
  pub fn get_uint(&self, n: OptNumber) -> Option<u32> {
    self.get_first(n).and_then(|v| uint::decode(&v.0))
  }

  /// Remove all values for the option from this message,
  /// returning how many there were.
  pub fn remove(&mut self, n: OptNumber) -> usize {
    let mut removed = 0;

    while let Some(ix) = self.opts.iter().position(|o| o.number == n) {
      self.opts.remove(ix);
      removed += 1;
    }

    removed
  }

  /// Check every option against the registry ([`opt::known`]),
  /// using the signaling registries when the message code is 7.xx.
  pub fn check_known_opts(&self) -> Result<(), known::OptValidateError> {
    self.opts.iter().try_for_each(|o| {
                      let e = match self.code.kind() {
                        | CodeKind::Signal => known::lookup_signal(self.code, o.number),
                        | _ => known::lookup(o.number),
                      };
                      known::validate_against(e, o.number, o.value.0.get_size())
                    })
  }

  /// Update the value for the Uri-Host option,
  /// discarding any existing values.
  pub fn set_host<S>(&mut self, host: S) -> Result<(), OptionsFull>
    where S: AsRef<str>
  {
    self.set(known::no_repeat::HOST,
             OptValue(host.as_ref().as_bytes().iter().copied().collect()))
  }

  /// Get the value for the Uri-Host option
  pub fn host(&self) -> Result<Option<&str>, Utf8Error> {
    self.get_str(known::no_repeat::HOST)
  }

  /// Update the value for the Uri-Port option,
  /// discarding any existing values.
  pub fn set_port(&mut self, port: u16) -> Result<(), OptionsFull> {
    self.set(known::no_repeat::PORT,
             OptValue(uint::encode(port as u32).into_iter().collect()))
  }

  /// Get the value for the Uri-Port option
  pub fn port(&self) -> Option<u16> {
    self.get_uint(known::no_repeat::PORT).map(|n| n as u16)
  }

  /// Append a Uri-Path segment, alongside any existing segments.
  pub fn add_path_segment<S>(&mut self, segment: S) -> Result<(), OptionsFull>
    where S: AsRef<str>
  {
    self.add(known::repeat::PATH,
             OptValue(segment.as_ref().as_bytes().iter().copied().collect()))
  }

  /// Iterate over the Uri-Path segments
  pub fn path_segments(&self) -> impl Iterator<Item = Result<&str, Utf8Error>> {
    self.get(known::repeat::PATH).map(|v| from_utf8(&v.0))
  }

  /// Insert a new value for the Uri-Query option,
  /// alongside any existing values.
  pub fn add_query<S>(&mut self, query: S) -> Result<(), OptionsFull>
    where S: AsRef<str>
  {
    self.add(known::repeat::QUERY,
             OptValue(query.as_ref().as_bytes().iter().copied().collect()))
  }

  /// Iterate over the Uri-Query arguments
  pub fn queries(&self) -> impl Iterator<Item = Result<&str, Utf8Error>> {
    self.get(known::repeat::QUERY).map(|v| from_utf8(&v.0))
  }

  /// Update the value for the Content-Format option,
  /// discarding any existing values.
  pub fn set_content_format(&mut self, format: ContentFormat) -> Result<(), OptionsFull> {
    self.set(known::no_repeat::CONTENT_FORMAT,
             OptValue(uint::encode(u16::from(format) as u32).into_iter().collect()))
  }

  /// Get the value for the Content-Format option
  pub fn content_format(&self) -> Option<ContentFormat> {
    self.get_uint(known::no_repeat::CONTENT_FORMAT)
        .map(|n| ContentFormat::from(n as u16))
  }

  /// Update the value for the Accept option,
  /// discarding any existing values.
  pub fn set_accept(&mut self, format: ContentFormat) -> Result<(), OptionsFull> {
    self.set(known::no_repeat::ACCEPT,
             OptValue(uint::encode(u16::from(format) as u32).into_iter().collect()))
  }

  /// Get the value for the Block1 option
  pub fn block1(&self) -> Option<block::Block> {
    self.get_uint(known::no_repeat::BLOCK1).map(block::Block::from)
  }

  /// Get the value for the Block2 option
  pub fn block2(&self) -> Option<block::Block> {
    self.get_uint(known::no_repeat::BLOCK2).map(block::Block::from)
  }

  /// Update the value for the No-Response option,
  /// discarding any existing values.
  pub fn set_no_response(&mut self, nr: no_response::Suppress) -> Result<(), OptionsFull> {
    self.set(known::no_repeat::NO_RESPONSE,
             OptValue(uint::encode(u8::from(nr) as u32).into_iter().collect()))
  }

  /// Get the value for the No-Response option
  pub fn no_response(&self) -> Option<no_response::Suppress> {
    self.get_uint(known::no_repeat::NO_RESPONSE)
        .map(|n| no_response::Suppress::from(n as u8))
  }

  /// Get the value for the Observe option on a request
  pub fn observe(&self) -> Option<observe::Action> {
    self.get_uint(known::no_repeat::OBSERVE)
        .and_then(|n| u8::try_from(n).ok())
        .and_then(observe::Action::from_byte)
  }

  /// Get the value for the Hop-Limit option
  pub fn hop_limit(&self) -> Option<u8> {
    self.get_uint(known::no_repeat::HOP_LIMIT)
        .and_then(|n| u8::try_from(n).ok())
  }
}

impl<Bytes: AsRef<[u8]>, P: Array<Item = u8> + AppendCopy<u8>, L: OptList> TryFromBytes<Bytes>
  for Message<P, L>
{
  type Error = MessageParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    let Byte1 { tkl, ty, ver } = bytes.next()
                                      .ok_or_else(MessageParseError::eof)?
                                      .try_into()?;

    if tkl > 8 {
      return Err(Self::Error::InvalidTokenLength(tkl));
    }

    let code: Code = bytes.next().ok_or_else(MessageParseError::eof)?.into();
    let id: Id = Id::try_consume_bytes(&mut bytes)?;

    let token = bytes.take_exact(tkl as usize)
                     .ok_or_else(MessageParseError::eof)?;
    let token = Token(token.iter().copied().collect());

    if code.kind() == CodeKind::Empty {
      if tkl != 0 || !bytes.is_exhausted() {
        return Err(Self::Error::EmptyMessageFormat);
      }

      return Ok(Message::new(ty, code, id, token));
    }

    let opts = opt::parse_opts::<_, L>(&mut bytes).map_err(Self::Error::OptParseError)?;

    let payload = if bytes.is_exhausted() {
      Payload(Default::default())
    } else {
      bytes.take(1); // payload marker; the option walk stops short of it
      if bytes.is_exhausted() {
        return Err(Self::Error::PayloadMarkerWithoutPayload);
      }

      let mut p = P::reserve(bytes.remaining());
      p.append_copy(bytes.take_until_end());
      Payload(p)
    };

    Ok(Message { id,
                 ty,
                 ver,
                 code,
                 token,
                 opts,
                 payload })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_msg() {
    let (expect, bytes) = crate::test_msg();
    assert_eq!(VecMessage::try_from_bytes(&bytes).unwrap(), expect)
  }

  #[test]
  fn parse_byte1() {
    let byte = 0b01_10_0011u8;
    let byte = Byte1::try_from(byte).unwrap();
    assert_eq!(byte,
               Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       tkl: 3 })
  }

  #[test]
  fn parse_rejects_bad_version() {
    let bytes = [0b11_00_0000u8, 0x01, 0x00, 0x01];
    assert_eq!(VecMessage::try_from_bytes(&bytes[..]),
               Err(MessageParseError::InvalidVersion(3)));
  }

  #[test]
  fn parse_rejects_long_token() {
    let bytes = [0b01_00_1001u8, 0x01, 0x00, 0x01, 1, 2, 3, 4, 5, 6, 7, 8, 9];
    assert_eq!(VecMessage::try_from_bytes(&bytes[..]),
               Err(MessageParseError::InvalidTokenLength(9)));
  }

  #[test]
  fn parse_empty_message() {
    let bytes = [0b01_10_0000u8, 0x00, 0x12, 0x34];
    let msg = VecMessage::try_from_bytes(&bytes[..]).unwrap();
    assert_eq!(msg.code, Code::EMPTY);
    assert_eq!(msg.id, Id(0x1234));

    // bytes after the header of an empty message are a format error
    let bytes = [0b01_10_0000u8, 0x00, 0x12, 0x34, 0xFF, 0x01];
    assert_eq!(VecMessage::try_from_bytes(&bytes[..]),
               Err(MessageParseError::EmptyMessageFormat));

    // so is a token
    let bytes = [0b01_10_0001u8, 0x00, 0x12, 0x34, 0x01];
    assert_eq!(VecMessage::try_from_bytes(&bytes[..]),
               Err(MessageParseError::EmptyMessageFormat));
  }

  #[test]
  fn parse_marker_without_payload() {
    let bytes = [0b01_00_0000u8, 0x01, 0x00, 0x01, 0xFF];
    assert_eq!(VecMessage::try_from_bytes(&bytes[..]),
               Err(MessageParseError::PayloadMarkerWithoutPayload));
  }

  #[test]
  fn add_keeps_options_sorted() {
    let mut msg = VecMessage::new(Type::Con, Code::GET, Id(1), Token::empty());
    msg.add_path_segment("a").unwrap();
    msg.set_host("h").unwrap();
    msg.add_path_segment("b").unwrap();
    msg.set_port(5683).unwrap();

    let numbers = msg.opts.iter().map(|o| o.number.0).collect::<Vec<_>>();
    assert_eq!(numbers, vec![3, 7, 11, 11]);

    let segments = msg.path_segments().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(segments, vec!["a", "b"]);
  }

  #[test]
  fn check_known_opts() {
    let mut msg = VecMessage::new(Type::Con, Code::GET, Id(1), Token::empty());
    msg.add(OptNumber(2), OptValue(vec![])).unwrap();
    assert_eq!(msg.check_known_opts(),
               Err(known::OptValidateError::UnknownNumber(OptNumber(2))));

    let mut msg = VecMessage::new(Type::Con, Code::GET, Id(1), Token::empty());
    msg.add(known::no_repeat::IF_NONE_MATCH, OptValue(vec![1])).unwrap();
    assert_eq!(msg.check_known_opts(),
               Err(known::OptValidateError::InvalidLength { number: known::no_repeat::IF_NONE_MATCH,
                                                            len: 1 }));
  }
}
