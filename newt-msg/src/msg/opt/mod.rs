use newt_common::{AppendCopy, Array, Cursor, GetSize};
use tinyvec::ArrayVec;

/// Option parsing error
pub mod parse_error;
pub use parse_error::*;

/// Unsigned option value encoding
pub mod uint;

/// Editing options in an already-serialized message
pub mod edit;

/// Well-known options
pub mod known;
pub use known::*;

/// The Option number identifies which Option is being set
/// (e.g. Content-Format has a Number of 12)
///
/// Numbers are drawn from a registry; see [`known`] for the
/// catalog this library understands.
///
/// # Related
/// - [RFC7252#section-3.1 Option Format](https://datatracker.ietf.org/doc/html/rfc7252#section-3.1)
/// - [RFC7252#section-5.4.6 Option Numbers](https://datatracker.ietf.org/doc/html/rfc7252#section-5.4.6)
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Eq, Ord, Debug, Default)]
pub struct OptNumber(pub u32);

/// Option Value
///
/// # Related
/// - [RFC7252#section-3.1 Option Format](https://datatracker.ietf.org/doc/html/rfc7252#section-3.1)
/// - [RFC7252#section-5.4 Options](https://datatracker.ietf.org/doc/html/rfc7252#section-5.4)
#[derive(Clone, Debug, Default)]
pub struct OptValue<C>(pub C);

impl<C> PartialOrd for OptValue<C> where C: Array<Item = u8>
{
  fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
    self.0.iter().partial_cmp(other.0.iter())
  }
}

impl<C> PartialEq for OptValue<C> where C: Array<Item = u8>
{
  fn eq(&self, other: &Self) -> bool {
    self.0.iter().eq(other.0.iter())
  }
}

impl<C> Ord for OptValue<C> where C: Array<Item = u8>
{
  fn cmp(&self, other: &Self) -> core::cmp::Ordering {
    self.0.iter().cmp(other.0.iter())
  }
}

impl<C> Eq for OptValue<C> where C: Array<Item = u8> {}

impl<C> core::hash::Hash for OptValue<C> where C: Array<Item = u8>
{
  fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
    state.write(&self.0)
  }
}

impl<C> OptValue<C> where C: Array<Item = u8>
{
  /// Convert a reference to a OptValue to a byte slice
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

/// A single option: its registry number and its value.
///
/// Note that unlike the wire representation, `Opt` stores the absolute
/// number rather than a delta against the previous option.
///
/// # Related
/// - [RFC7252#section-5.4 Options](https://datatracker.ietf.org/doc/html/rfc7252#section-5.4)
#[derive(Clone, Debug, Default)]
pub struct Opt<C> {
  /// See [`OptNumber`]
  pub number: OptNumber,
  /// See [`OptValue`]
  pub value: OptValue<C>,
}

impl<C> PartialOrd for Opt<C> where C: Array<Item = u8>
{
  fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl<C> PartialEq for Opt<C> where C: Array<Item = u8>
{
  fn eq(&self, other: &Self) -> bool {
    self.number.eq(&other.number) && self.value.eq(&other.value)
  }
}

impl<C> Ord for Opt<C> where C: Array<Item = u8>
{
  fn cmp(&self, other: &Self) -> core::cmp::Ordering {
    self.number
        .cmp(&other.number)
        .then_with(|| self.value.cmp(&other.value))
  }
}

impl<C> Eq for Opt<C> where C: Array<Item = u8> {}

/// Generalization of "a list of options"
///
/// This pins the item type of an [`Array`] to [`Opt`] and exposes the
/// byte collection backing each value, so that the same codec paths
/// serve `Vec<Opt<Vec<u8>>>` and `ArrayVec<[Opt<ArrayVec<..>>; N]>` alike.
pub trait OptList
  where Self: Array<Item = Opt<<Self as OptList>::Bytes>>
{
  /// Byte array for option values
  type Bytes: Array<Item = u8> + AppendCopy<u8> + Clone + core::fmt::Debug;
}

impl<B, L> OptList for L
  where B: Array<Item = u8> + AppendCopy<u8> + Clone + core::fmt::Debug,
        L: Array<Item = Opt<B>>
{
  type Bytes = B;
}

/// Storage for options (or for the values of one repeated option) is exhausted
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct OptionsFull(pub OptNumber);

/// Peek at the first byte of the cursor and interpret it as an Option header.
///
/// Stops (without consuming) when the byte is a payload marker,
/// indicating all options have been read.
pub(crate) fn opt_header<A: AsRef<[u8]>>(bytes: &mut Cursor<A>) -> Result<u8, OptParseError> {
  match bytes.peek_exact(1) {
    | None | Some(&[0b11111111]) => Err(OptParseError::OptionsExhausted),
    | Some(&[b]) => {
      bytes.next();
      Ok(b)
    },
    | _ => Err(OptParseError::eof()),
  }
}

/// Interpret a nibble as a delta/length, consuming extension bytes where
/// the nibble says to.
///
/// Values 0-12 are taken as-is; 13 means "+13, 1 extension byte";
/// 14 means "+269, 2 big-endian extension bytes"; 15 is reserved.
pub(crate) fn parse_opt_len_or_delta<A: AsRef<[u8]>>(head: u8,
                                                     bytes: &mut Cursor<A>,
                                                     reserved_err: OptParseError)
                                                     -> Result<u32, OptParseError> {
  match head {
    | 13 => bytes.next()
                 .map(|n| (n as u32) + 13)
                 .ok_or_else(OptParseError::eof),
    | 14 => match bytes.take_exact(2) {
      | Some(&[a, b]) => Ok((u16::from_be_bytes([a, b]) as u32) + 269),
      | _ => Err(OptParseError::eof()),
    },
    | 15 => Err(reserved_err),
    | _ => Ok(head as u32),
  }
}

/// Consume one option TLV, resolving its number against the previous
/// option's number.
pub(crate) fn consume_opt<A, C>(bytes: &mut Cursor<A>,
                                prev: OptNumber)
                                -> Result<Opt<C>, OptParseError>
  where A: AsRef<[u8]>,
        C: Array<Item = u8> + AppendCopy<u8>
{
  let header = opt_header(bytes)?;

  // NOTE: the delta extension **MUST** be consumed before the length extension
  let delta = parse_opt_len_or_delta(header >> 4, bytes, OptParseError::ReservedDeltaNibble)?;
  let len =
    parse_opt_len_or_delta(header & 0b1111, bytes, OptParseError::ReservedLengthNibble)? as usize;

  if let Some(max) = C::CAPACITY {
    if len > max {
      return Err(OptParseError::OptionValueTooLong { capacity: max,
                                                     actual: len });
    }
  }

  let value_bytes = bytes.take_exact(len).ok_or_else(OptParseError::eof)?;
  let mut value = C::reserve(len);
  value.append_copy(value_bytes);

  Ok(Opt { number: OptNumber(prev.0.saturating_add(delta)),
           value: OptValue(value) })
}

/// Consume option TLVs until the payload marker or the end of the
/// buffer, resolving deltas into absolute numbers as they come.
pub(crate) fn parse_opts<A: AsRef<[u8]>, L: OptList>(bytes: &mut Cursor<A>)
                                                     -> Result<L, OptParseError> {
  let mut opts = L::default();
  let mut prev = OptNumber(0);

  loop {
    match consume_opt::<_, L::Bytes>(bytes, prev) {
      | Ok(opt) => {
        if opts.is_full() {
          break Err(OptParseError::TooManyOptions(opts.get_size()));
        }

        prev = opt.number;
        opts.push(opt);
      },
      | Err(OptParseError::OptionsExhausted) => break Ok(opts),
      | Err(e) => break Err(e),
    }
  }
}

/// Number of extension bytes a delta/length value occupies on the wire
pub(crate) fn ext_width(val: u32) -> usize {
  match val {
    | v if v >= 269 => 2,
    | v if v >= 13 => 1,
    | _ => 0,
  }
}

/// Split a delta/length into its nibble and extension bytes
pub(crate) fn encode_len_or_delta(val: u32) -> (u8, ArrayVec<[u8; 2]>) {
  debug_assert!(val <= 65535 + 269);

  match val {
    | v if v >= 269 => {
      let mut bytes = ArrayVec::new();
      bytes.extend(((v - 269) as u16).to_be_bytes());
      (14, bytes)
    },
    | v if v >= 13 => {
      let mut bytes = ArrayVec::new();
      bytes.push((v - 13) as u8);
      (13, bytes)
    },
    | v => (v as u8, ArrayVec::new()),
  }
}

impl<C: Array<Item = u8>> Opt<C> {
  /// Number of bytes this option occupies on the wire, given the
  /// option preceding it.
  pub fn wire_size(&self, prev: OptNumber) -> usize {
    let len = self.value.0.get_size();
    1 + ext_width(self.number.0.saturating_sub(prev.0)) + ext_width(len as u32) + len
  }

  /// Given a collection to [`Extend`] and the preceding option's number,
  /// add this Opt's wire bytes to the collection.
  pub fn extend_bytes(&self, prev: OptNumber, bytes: &mut impl Extend<u8>) {
    let (del, del_ext) = encode_len_or_delta(self.number.0.saturating_sub(prev.0));
    let (len, len_ext) = encode_len_or_delta(self.value.0.get_size() as u32);

    bytes.extend(Some(del << 4 | len));
    bytes.extend(del_ext);
    bytes.extend(len_ext);
    bytes.extend(self.value.0.iter().copied());
  }
}

/// In-place selection sort of an option list by number.
///
/// Not stable; callers that rely on the relative order of repeated
/// options (e.g. Uri-Path segments) should insert in sorted position
/// instead, which makes this a verification pass.
pub fn sort_opts<C: Array<Item = u8>>(opts: &mut [Opt<C>]) {
  for i in 0..opts.len() {
    let mut min = i;

    for j in (i + 1)..opts.len() {
      if opts[j].number < opts[min].number {
        min = j;
      }
    }

    if min != i {
      opts.swap(i, min);
    }
  }
}

/// Whether an option may be silently ignored by a receiver
/// that does not recognize it.
///
/// # Related
/// - [RFC7252#section-5.4.1 Critical/Elective](https://datatracker.ietf.org/doc/html/rfc7252#section-5.4.1)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptionMustBeProcessed {
  /// This option must be processed,
  /// and a response that ignores it
  /// will be rejected.
  ///
  /// Corresponds to the option being "critical"
  /// in strict CoAP terms
  Yes,
  /// This option does not _need_ to
  /// be processed,
  /// and a response that ignores it
  /// will be processed anyway.
  ///
  /// Corresponds to the option being "elective"
  /// in strict CoAP terms
  No,
}

/// What a proxy that does not recognize an option must do with
/// the message carrying it.
///
/// # Related
/// - [RFC7252#section-5.4.2 Proxy Unsafe or Safe-to-Forward and NoCacheKey](https://datatracker.ietf.org/doc/html/rfc7252#section-5.4.2)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum WhenOptionUnsupportedByProxy {
  /// This option /must be/ processed & understood by proxies
  /// and may not be forwarded blindly to their destination.
  ///
  /// Corresponds to the option being "UnSafe" to forward
  /// in strict CoAP terms
  Error,
  /// This option may not be processed & understood by proxies
  /// and may be forwarded blindly to their destination.
  ///
  /// Corresponds to the option being "SafeToForward"
  /// in strict CoAP terms
  Forward,
}

impl OptNumber {
  /// Whether or not this option may be ignored by a server
  pub fn must_be_processed(&self) -> OptionMustBeProcessed {
    #[allow(clippy::wildcard_in_or_patterns)] // will only ever be 0 or 1
    match self.0 & 0b1 {
      | 1 => OptionMustBeProcessed::Yes,
      | 0 | _ => OptionMustBeProcessed::No,
    }
  }

  /// Whether or not this option may be forwarded blindly by
  /// a proxy that does not support processing it
  pub fn when_unsupported_by_proxy(&self) -> WhenOptionUnsupportedByProxy {
    #[allow(clippy::wildcard_in_or_patterns)] // will only ever be 0 or 1
    match (self.0 & 0b10) >> 1 {
      | 1 => WhenOptionUnsupportedByProxy::Error,
      | 0 | _ => WhenOptionUnsupportedByProxy::Forward,
    }
  }

  /// Whether this option should be included in a cache key
  /// built for the message carrying it.
  ///
  /// NoCacheKey options have bits 1-5 matching the pattern `11110`.
  pub fn include_in_cache_key(&self) -> bool {
    ((self.0 >> 1) & 0b11111) != 0b11110
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  type Bytes = Vec<u8>;

  fn opt(number: u32, value: &[u8]) -> Opt<Bytes> {
    Opt { number: OptNumber(number),
          value: OptValue(value.iter().copied().collect()) }
  }

  #[test]
  fn parse_opt() {
    let opt_bytes: [u8; 2] = [0b00010001, 0b00000001];
    let mut cursor = Cursor::new(&opt_bytes[..]);
    let parsed = consume_opt::<_, Bytes>(&mut cursor, OptNumber(0)).unwrap();
    assert_eq!(parsed, opt(1, &[1]));

    let opt_bytes: [u8; 5] = [0b00010001, 0b00000001, 0b00010001, 0b00000011, 0b11111111];
    let mut cursor = Cursor::new(&opt_bytes[..]);
    let parsed: Vec<Opt<Bytes>> = parse_opts(&mut cursor).unwrap();
    assert_eq!(parsed, vec![opt(1, &[1]), opt(2, &[3])]);

    // payload marker stays in the cursor for the message parser
    assert_eq!(cursor.next(), Some(0b11111111));
  }

  #[test]
  fn parse_delta_boundaries() {
    // delta 12 | 13 | 268 | 269, all with empty values
    let cases: [(u32, Vec<u8>); 4] = [(12, vec![0b1100_0000]),
                                      (13, vec![0b1101_0000, 0]),
                                      (268, vec![0b1101_0000, 255]),
                                      (269, vec![0b1110_0000, 0, 0])];

    for (number, bytes) in cases {
      let mut cursor = Cursor::new(&bytes[..]);
      let parsed = consume_opt::<_, Bytes>(&mut cursor, OptNumber(0)).unwrap();
      assert_eq!(parsed.number, OptNumber(number));

      let mut emitted = Vec::new();
      opt(number, &[]).extend_bytes(OptNumber(0), &mut emitted);
      assert_eq!(emitted, bytes);
    }
  }

  #[test]
  fn parse_len_boundaries() {
    for len in [12usize, 13, 268, 269] {
      let o = opt(1, &vec![1u8; len]);

      let mut emitted = Vec::new();
      o.extend_bytes(OptNumber(0), &mut emitted);

      let mut cursor = Cursor::new(&emitted[..]);
      let parsed = consume_opt::<_, Bytes>(&mut cursor, OptNumber(0)).unwrap();
      assert_eq!(parsed, o);
    }
  }

  #[test]
  fn reserved_nibbles_error() {
    let mut cursor = Cursor::new(&[0b1111_0000u8, 0][..]);
    assert_eq!(consume_opt::<_, Bytes>(&mut cursor, OptNumber(0)),
               Err(OptParseError::ReservedDeltaNibble));

    let mut cursor = Cursor::new(&[0b0000_1111u8, 0][..]);
    assert_eq!(consume_opt::<_, Bytes>(&mut cursor, OptNumber(0)),
               Err(OptParseError::ReservedLengthNibble));
  }

  #[test]
  fn declared_len_past_end_of_buffer() {
    let mut cursor = Cursor::new(&[0b0001_0100u8, 1, 2][..]);
    assert_eq!(consume_opt::<_, Bytes>(&mut cursor, OptNumber(0)),
               Err(OptParseError::UnexpectedEndOfStream));
  }

  #[test]
  fn value_longer_than_storage() {
    let mut bytes = vec![0b0001_1101u8, 0];
    bytes.extend([1u8; 13]);

    let mut cursor = Cursor::new(&bytes[..]);
    assert_eq!(consume_opt::<_, tinyvec::ArrayVec<[u8; 8]>>(&mut cursor, OptNumber(0)),
               Err(OptParseError::OptionValueTooLong { capacity: 8,
                                                       actual: 13 }));
  }

  #[test]
  fn selection_sort() {
    let mut opts = [opt(60, &[]), opt(11, b"a"), opt(1, &[]), opt(11, b"b")];
    sort_opts(&mut opts);

    let numbers = opts.iter().map(|o| o.number.0).collect::<Vec<_>>();
    assert_eq!(numbers, vec![1, 11, 11, 60]);
  }

  #[test]
  fn derived_flags() {
    use super::known::{no_repeat, repeat};

    // Uri-Path is critical & unsafe to forward
    assert_eq!(repeat::PATH.must_be_processed(), OptionMustBeProcessed::Yes);
    assert_eq!(repeat::PATH.when_unsupported_by_proxy(),
               WhenOptionUnsupportedByProxy::Error);

    // Content-Format is elective & safe to forward
    assert_eq!(no_repeat::CONTENT_FORMAT.must_be_processed(),
               OptionMustBeProcessed::No);
    assert_eq!(no_repeat::CONTENT_FORMAT.when_unsupported_by_proxy(),
               WhenOptionUnsupportedByProxy::Forward);

    // Size1 (60 = 0b111100) is NoCacheKey
    assert!(!no_repeat::SIZE1.include_in_cache_key());
    assert!(no_repeat::CONTENT_FORMAT.include_in_cache_key());

    // Size2 (28 = 0b11100) is not: only bits 1-4 match the pattern
    assert!(no_repeat::SIZE2.include_in_cache_key());

    // every other catalog number is cache-key relevant
    for n in [1u32, 3, 4, 5, 7, 8, 11, 12, 14, 15, 17, 20, 23, 27, 35, 39, 258] {
      assert!(OptNumber(n).include_in_cache_key(), "option {}", n);
    }
  }
}
