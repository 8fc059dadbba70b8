//! Message framing for reliable byte-stream transports (RFC 8323).
//!
//! Over TCP, TLS or WebSockets there is no datagram boundary and no
//! retransmission to drive, so the 4-byte UDP header is replaced by a
//! variable-length frame: a length nibble (with up to 3 extension
//! bytes), the token length nibble, the code, then token, options and
//! payload exactly as in the UDP encoding. There is no message id and
//! no type; multiplexing is by token and reliability is the
//! transport's problem.
//!
//! Whether a connection speaks this framing is decided by the caller
//! (it is a property of the transport), never guessed from the bytes.

use newt_common::{AppendCopy, Array, Cursor, GetSize};
use tinyvec::ArrayVec;

use crate::{Code, CodeKind, Id, MessageToBytesError, Opt, OptList, OptNumber, OptParseError,
            Payload, Token, TryFromBytes, TryIntoBytes, Type};

/// A message as it appears on a reliable transport: no id, no type.
#[derive(Clone, Debug)]
pub struct Frame<PayloadBytes, Opts> {
  /// see [`Code`] for details
  pub code: Code,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Opt`] for details
  pub opts: Opts,
  /// see [`Payload`]
  pub payload: Payload<PayloadBytes>,
}

/// [`Frame`] backed by heap allocation
#[cfg(feature = "alloc")]
pub type VecFrame = Frame<std_alloc::vec::Vec<u8>, std_alloc::vec::Vec<Opt<std_alloc::vec::Vec<u8>>>>;

impl<P, L> PartialEq for Frame<P, L>
  where P: Array<Item = u8>,
        L: OptList + PartialEq
{
  fn eq(&self, other: &Self) -> bool {
    self.code == other.code
    && self.token == other.token
    && self.opts == other.opts
    && self.payload == other.payload
  }
}

/// Errors encounterable while parsing a frame from bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrameParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Token length was > 8
  InvalidTokenLength(u8),

  /// The frame's declared length ended before the buffer did
  TrailingBytes(usize),

  /// Error parsing option
  OptParseError(OptParseError),

  /// The payload marker (0xFF) was present with zero payload bytes following it
  PayloadMarkerWithoutPayload,
}

impl FrameParseError {
  fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}

/// Size a complete frame will occupy, derived from a prefix of it.
///
/// Stream transports use this to learn how many bytes to buffer
/// before handing the frame to the parser. Yields `None` when the
/// prefix is too short to tell (at most 4 bytes are needed).
pub fn frame_size_hint(prefix: &[u8]) -> Option<usize> {
  let b0 = *prefix.first()?;
  let tkl = (b0 & 0b1111) as usize;

  let (body, ext) = match b0 >> 4 {
    | 13 => ((*prefix.get(1)? as usize) + 13, 1),
    | 14 => {
      let hi = *prefix.get(1)? as usize;
      let lo = *prefix.get(2)? as usize;
      ((hi << 8 | lo) + 269, 2)
    },
    | 15 => {
      let hi = *prefix.get(1)? as usize;
      let mid = *prefix.get(2)? as usize;
      let lo = *prefix.get(3)? as usize;
      ((hi << 16 | mid << 8 | lo) + 65805, 3)
    },
    | n => (n as usize, 0),
  };

  Some(1 + ext + 1 + tkl + body)
}

fn encode_len(body: usize) -> (u8, ArrayVec<[u8; 3]>) {
  let mut ext = ArrayVec::new();

  match body {
    | n if n >= 65805 => {
      let n = (n - 65805) as u32;
      ext.extend([(n >> 16) as u8, (n >> 8) as u8, n as u8]);
      (15, ext)
    },
    | n if n >= 269 => {
      let n = (n - 269) as u16;
      ext.extend(n.to_be_bytes());
      (14, ext)
    },
    | n if n >= 13 => {
      ext.push((n - 13) as u8);
      (13, ext)
    },
    | n => (n as u8, ext),
  }
}

impl<P, L> Frame<P, L>
  where P: Array<Item = u8> + AppendCopy<u8>,
        L: OptList
{
  /// Create a new frame
  pub fn new(code: Code, token: Token) -> Self {
    Self { code,
           token,
           opts: L::default(),
           payload: Payload(P::default()) }
  }

  /// Reframe a datagram-shaped message for a reliable transport,
  /// dropping its id and type.
  pub fn from_message(msg: crate::Message<P, L>) -> Self {
    Self { code: msg.code,
           token: msg.token,
           opts: msg.opts,
           payload: msg.payload }
  }

  /// Give this frame the id and type it needs to travel over a
  /// datagram transport.
  pub fn into_message(self, id: Id, ty: Type) -> crate::Message<P, L> {
    crate::Message { id,
                     ty,
                     ver: Default::default(),
                     code: self.code,
                     token: self.token,
                     opts: self.opts,
                     payload: self.payload }
  }

  fn body_size(&self) -> usize {
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

    opts_size + payload_size
  }
}

impl<Bytes: AsRef<[u8]>, P: Array<Item = u8> + AppendCopy<u8>, L: OptList> TryFromBytes<Bytes>
  for Frame<P, L>
{
  type Error = FrameParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    let b0 = bytes.next().ok_or_else(FrameParseError::eof)?;
    let tkl = b0 & 0b1111;

    if tkl > 8 {
      return Err(FrameParseError::InvalidTokenLength(tkl));
    }

    let body_len = match b0 >> 4 {
      | 13 => bytes.next()
                   .map(|n| n as usize + 13)
                   .ok_or_else(FrameParseError::eof)?,
      | 14 => match bytes.take_exact(2) {
        | Some(&[a, b]) => (u16::from_be_bytes([a, b]) as usize) + 269,
        | _ => return Err(FrameParseError::eof()),
      },
      | 15 => match bytes.take_exact(3) {
        | Some(&[a, b, c]) => {
          ((a as usize) << 16 | (b as usize) << 8 | c as usize) + 65805
        },
        | _ => return Err(FrameParseError::eof()),
      },
      | n => n as usize,
    };

    let code: Code = bytes.next().ok_or_else(FrameParseError::eof)?.into();

    let token = bytes.take_exact(tkl as usize)
                     .ok_or_else(FrameParseError::eof)?;
    let token = Token(token.iter().copied().collect());

    if bytes.remaining() < body_len {
      return Err(FrameParseError::eof());
    }

    if bytes.remaining() > body_len {
      return Err(FrameParseError::TrailingBytes(bytes.remaining() - body_len));
    }

    let mut body = Cursor::new(bytes.take_until_end());
    let opts =
      crate::opt::parse_opts::<_, L>(&mut body).map_err(FrameParseError::OptParseError)?;

    let payload = if body.is_exhausted() {
      Payload(Default::default())
    } else {
      body.take(1); // payload marker
      if body.is_exhausted() {
        return Err(FrameParseError::PayloadMarkerWithoutPayload);
      }

      let mut p = P::reserve(body.remaining());
      p.append_copy(body.take_until_end());
      Payload(p)
    };

    Ok(Frame { code,
               token,
               opts,
               payload })
  }
}

impl<P, L> TryIntoBytes for Frame<P, L>
  where P: Array<Item = u8> + AppendCopy<u8>,
        L: OptList
{
  type Error = MessageToBytesError;

  fn try_into_bytes<C: Array<Item = u8>>(mut self) -> Result<C, Self::Error> {
    if self.code.kind() == CodeKind::Empty
       && (self.token.len() > 0 || self.opts.get_size() > 0 || self.payload.0.get_size() > 0)
    {
      return Err(MessageToBytesError::EmptyMessageFormat);
    }

    crate::sort_opts(&mut self.opts);

    let body = self.body_size();
    let (len_nibble, len_ext) = encode_len(body);
    let size = 1 + len_ext.len() + 1 + self.token.len() + body;

    let mut bytes = C::reserve(size);

    if let Some(max) = bytes.max_size() {
      if max < size {
        return Err(MessageToBytesError::TooLong { capacity: max,
                                                  size });
      }
    }

    bytes.extend(Some(len_nibble << 4 | self.token.len() as u8));
    bytes.extend(len_ext);
    bytes.extend(Some(u8::from(self.code)));
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

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{known, OptValue};

  fn csm() -> VecFrame {
    let mut frame = VecFrame::new(Code::CSM, Token::empty());
    // Max-Message-Size, from the CSM signaling registry
    frame.opts.push(Opt { number: OptNumber(2),
                          value: OptValue(vec![0x04, 0x80]) });
    frame
  }

  #[test]
  fn csm_round_trips() {
    let bytes: Vec<u8> = csm().try_into_bytes().unwrap();

    // body: 1 header byte + 2 value bytes
    assert_eq!(bytes[0], 0b0011_0000);
    assert_eq!(bytes[1], u8::from(Code::CSM));

    let parsed = VecFrame::try_from_bytes(&bytes).unwrap();
    assert_eq!(parsed, csm());
  }

  #[test]
  fn ping_is_two_bytes() {
    let ping = VecFrame::new(Code::PING, Token::empty());
    let bytes: Vec<u8> = ping.try_into_bytes().unwrap();
    assert_eq!(bytes, vec![0x00, u8::from(Code::PING)]);
  }

  #[test]
  fn length_nibble_boundaries() {
    for body_len in [12usize, 13, 268, 269, 65804, 65805] {
      let mut frame = VecFrame::new(Code::CONTENT, Token::empty());
      frame.payload = Payload(vec![1u8; body_len - 1]); // 1 byte spent on the marker

      let bytes: Vec<u8> = frame.clone().try_into_bytes().unwrap();
      assert_eq!(frame_size_hint(&bytes), Some(bytes.len()));

      let parsed = VecFrame::try_from_bytes(&bytes).unwrap();
      assert_eq!(parsed, frame, "body length {}", body_len);
    }
  }

  #[test]
  fn trailing_bytes_are_an_error() {
    let mut bytes: Vec<u8> = VecFrame::new(Code::PING, Token::empty()).try_into_bytes()
                                                                      .unwrap();
    bytes.push(0xAB);

    assert_eq!(VecFrame::try_from_bytes(&bytes),
               Err(FrameParseError::TrailingBytes(1)));
  }

  #[test]
  fn multiplexing_is_by_token() {
    let mut frame = VecFrame::new(Code::GET, Token::try_from(&[1, 2, 3][..]).unwrap());
    frame.opts.push(Opt { number: known::repeat::PATH,
                          value: OptValue(b"time".to_vec()) });

    let bytes: Vec<u8> = frame.try_into_bytes().unwrap();
    let parsed = VecFrame::try_from_bytes(&bytes).unwrap();
    assert_eq!(parsed.token, Token::try_from(&[1, 2, 3][..]).unwrap());
  }
}
