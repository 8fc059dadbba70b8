use super::OptNumber;
use crate::Code;

/// Block1 & Block2 option values
pub mod block;

/// The No-Response option (RFC 7967)
pub mod no_response;

/// The Observe option (RFC 7641)
pub mod observe;

/// Content-Format values
pub mod content_format;
pub use content_format::ContentFormat;

/// Options that may occur at most once in a message
pub mod no_repeat {
  use super::OptNumber;

  /// [Uri-Host](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.1)
  pub const HOST: OptNumber = OptNumber(3);

  /// [If-None-Match](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.8.2)
  pub const IF_NONE_MATCH: OptNumber = OptNumber(5);

  /// [Observe (RFC 7641)](https://datatracker.ietf.org/doc/html/rfc7641#section-2)
  pub const OBSERVE: OptNumber = OptNumber(6);

  /// [Uri-Port](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.1)
  pub const PORT: OptNumber = OptNumber(7);

  /// [Content-Format](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.3)
  pub const CONTENT_FORMAT: OptNumber = OptNumber(12);

  /// [Max-Age](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.5)
  pub const MAX_AGE: OptNumber = OptNumber(14);

  /// [Hop-Limit (RFC 8768)](https://datatracker.ietf.org/doc/html/rfc8768#section-3)
  pub const HOP_LIMIT: OptNumber = OptNumber(16);

  /// [Accept](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.4)
  pub const ACCEPT: OptNumber = OptNumber(17);

  /// [Block2 (RFC 7959)](https://datatracker.ietf.org/doc/html/rfc7959#section-2.2)
  pub const BLOCK2: OptNumber = OptNumber(23);

  /// [Block1 (RFC 7959)](https://datatracker.ietf.org/doc/html/rfc7959#section-2.2)
  pub const BLOCK1: OptNumber = OptNumber(27);

  /// [Size2 (RFC 7959)](https://datatracker.ietf.org/doc/html/rfc7959#section-4)
  pub const SIZE2: OptNumber = OptNumber(28);

  /// [Proxy-Uri](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.2)
  pub const PROXY_URI: OptNumber = OptNumber(35);

  /// [Proxy-Scheme](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.2)
  pub const PROXY_SCHEME: OptNumber = OptNumber(39);

  /// [Size1](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.9)
  pub const SIZE1: OptNumber = OptNumber(60);

  /// [No-Response (RFC 7967)](https://datatracker.ietf.org/doc/html/rfc7967#section-2)
  ///
  /// Note: one revision of this registry circulated with number 284;
  /// 258 is the number the RFC assigns.
  pub const NO_RESPONSE: OptNumber = OptNumber(258);
}

/// Options that may occur any number of times in a message
pub mod repeat {
  use super::OptNumber;

  /// [If-Match](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.8.1)
  pub const IF_MATCH: OptNumber = OptNumber(1);

  /// [ETag](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.6)
  pub const ETAG: OptNumber = OptNumber(4);

  /// [Location-Path](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.7)
  pub const LOCATION_PATH: OptNumber = OptNumber(8);

  /// [Uri-Path](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.1)
  pub const PATH: OptNumber = OptNumber(11);

  /// [Uri-Query](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.1)
  pub const QUERY: OptNumber = OptNumber(15);

  /// [Location-Query](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10.7)
  pub const LOCATION_QUERY: OptNumber = OptNumber(20);
}

/// The shape of values an option carries
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValueKind {
  /// Zero-length value; presence is the signal
  Empty,
  /// Opaque byte string
  Opaque,
  /// Non-negative integer, minimal big-endian encoding
  Uint,
  /// UTF-8 string
  String,
}

/// One row of the option registry
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
  /// Whether the option may occur more than once in a message
  pub repeatable: bool,
  /// Value format
  pub kind: ValueKind,
  /// Smallest admissible value length, in bytes
  pub min_len: u16,
  /// Largest admissible value length, in bytes
  pub max_len: u16,
}

const fn entry(repeatable: bool, kind: ValueKind, min_len: u16, max_len: u16) -> Entry {
  Entry { repeatable,
          kind,
          min_len,
          max_len }
}

/// Look an option number up in the registry of options
/// this library understands.
///
/// Yields `None` for numbers outside the registry.
pub fn lookup(number: OptNumber) -> Option<Entry> {
  use ValueKind::*;

  match number {
    | repeat::IF_MATCH => Some(entry(true, Opaque, 0, 8)),
    | no_repeat::HOST => Some(entry(false, String, 1, 255)),
    | repeat::ETAG => Some(entry(true, Opaque, 1, 8)),
    | no_repeat::IF_NONE_MATCH => Some(entry(false, Empty, 0, 0)),
    | no_repeat::OBSERVE => Some(entry(false, Uint, 0, 3)),
    | no_repeat::PORT => Some(entry(false, Uint, 0, 2)),
    | repeat::LOCATION_PATH => Some(entry(true, String, 0, 255)),
    | repeat::PATH => Some(entry(true, String, 0, 255)),
    | no_repeat::CONTENT_FORMAT => Some(entry(false, Uint, 0, 2)),
    | no_repeat::MAX_AGE => Some(entry(false, Uint, 0, 4)),
    | repeat::QUERY => Some(entry(true, String, 0, 255)),
    | no_repeat::HOP_LIMIT => Some(entry(false, Uint, 1, 1)),
    | no_repeat::ACCEPT => Some(entry(false, Uint, 0, 2)),
    | repeat::LOCATION_QUERY => Some(entry(true, String, 0, 255)),
    | no_repeat::BLOCK2 => Some(entry(false, Uint, 0, 3)),
    | no_repeat::BLOCK1 => Some(entry(false, Uint, 0, 3)),
    | no_repeat::SIZE2 => Some(entry(false, Uint, 0, 4)),
    | no_repeat::PROXY_URI => Some(entry(false, String, 1, 1034)),
    | no_repeat::PROXY_SCHEME => Some(entry(false, String, 1, 255)),
    | no_repeat::SIZE1 => Some(entry(false, Uint, 0, 4)),
    | no_repeat::NO_RESPONSE => Some(entry(false, Uint, 0, 1)),
    | _ => None,
  }
}

/// Signaling messages (RFC 8323 section 5) draw their options from
/// small per-code registries instead of the shared one.
pub fn lookup_signal(code: Code, number: OptNumber) -> Option<Entry> {
  use ValueKind::*;

  match (code, number.0) {
    | (Code::CSM, 2) => Some(entry(false, Uint, 0, 4)),
    | (Code::CSM, 4) => Some(entry(false, Empty, 0, 0)),
    | (Code::PING, 2) | (Code::PONG, 2) => Some(entry(false, Empty, 0, 0)),
    | (Code::RELEASE, 2) => Some(entry(true, String, 1, 255)),
    | (Code::RELEASE, 4) => Some(entry(false, Uint, 0, 3)),
    | (Code::ABORT, 2) => Some(entry(false, Uint, 0, 2)),
    | _ => None,
  }
}

/// Whether an option may occur more than once in a message.
///
/// Numbers outside the registry are assumed repeatable, since nothing
/// is known about them.
pub fn repeatable(number: OptNumber) -> bool {
  lookup(number).map(|e| e.repeatable).unwrap_or(true)
}

/// A message's options disagreed with the registry
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptValidateError {
  /// The option number is not in the registry
  UnknownNumber(OptNumber),
  /// The value length is outside the admissible range for this option
  /// (notably: an empty-format option carrying bytes)
  InvalidLength {
    /// Offending option
    number: OptNumber,
    /// Value length found
    len: usize,
  },
}

/// Check one option against a registry row.
pub fn validate_against(e: Option<Entry>,
                        number: OptNumber,
                        value_len: usize)
                        -> Result<(), OptValidateError> {
  match e {
    | None => Err(OptValidateError::UnknownNumber(number)),
    | Some(e) if value_len < e.min_len as usize || value_len > e.max_len as usize => {
      Err(OptValidateError::InvalidLength { number,
                                            len: value_len })
    },
    | Some(_) => Ok(()),
  }
}

/// Check one option of a non-signaling message against the registry.
pub fn validate(number: OptNumber, value_len: usize) -> Result<(), OptValidateError> {
  validate_against(lookup(number), number, value_len)
}
