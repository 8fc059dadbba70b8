#[cfg(feature = "alloc")]
use std_alloc::string::{String, ToString};

/// # Message Code
///
/// A code is a single byte split into a 3-bit class and a 5-bit detail,
/// rendered as `c.dd` (e.g. `2.05`).
///
/// # Examples
/// ```
/// use newt_msg::Code;
///
/// assert_eq!(Code { class: 2,
///                   detail: 5 }.to_string(),
///            "2.05".to_string());
/// ```
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Code {
  /// The "class" of message codes identify it as a request or response, and provides the class of response status:
  ///
  /// |class|meaning|
  /// |---|---|
  /// |`0`|Message is a request|
  /// |`2`|Message is a success response|
  /// |`4`|Message is a client error response|
  /// |`5`|Message is a server error response|
  /// |`7`|Message is a signaling message (reliable transports only)|
  pub class: u8,

  /// 2-digit integer (range `[0, 32)`) that provides granular information about the response status.
  ///
  /// Will always be `0` for requests.
  pub detail: u8,
}

/// Whether a code is for a request, response, or empty message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeKind {
  /// A request code (0.xx)
  Request,
  /// A response code ([2-5].xx)
  Response,
  /// A signaling code (7.xx, RFC 8323)
  Signal,
  /// EMPTY (0.00)
  Empty,
  /// A code drawn from one of the reserved classes (1, 3, 6)
  Reserved,
}

impl Code {
  /// Create a new Code
  ///
  /// ```
  /// use newt_msg::Code;
  ///
  /// let content = Code::new(2, 05);
  /// ```
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  /// Get the human string representation of a message code
  ///
  /// # Returns
  /// A `char` array
  ///
  /// This is to avoid unnecessary heap allocation,
  /// you can create a `String` with `FromIterator::<String>::from_iter`,
  /// or if the `alloc` feature of `newt` is enabled there is a `ToString` implementation provided for Code.
  /// ```
  /// use newt_msg::Code;
  ///
  /// let code = Code { class: 2,
  ///                   detail: 5 };
  /// let chars = code.to_human();
  /// let string = String::from_iter(chars);
  /// assert_eq!(string, "2.05".to_string());
  /// ```
  pub fn to_human(&self) -> [char; 4] {
    let to_char = |d: u8| char::from_digit(d.into(), 10).unwrap();
    [to_char(self.class),
     '.',
     to_char(self.detail / 10),
     to_char(self.detail % 10)]
  }

  /// Get whether this code is for a request, response, signal, or empty message
  ///
  /// ```
  /// use newt_msg::{Code, CodeKind};
  ///
  /// let empty: Code = Code::new(0, 0);
  /// assert_eq!(empty.kind(), CodeKind::Empty);
  ///
  /// let req = Code::new(0, 1); // GET
  /// assert_eq!(req.kind(), CodeKind::Request);
  ///
  /// let resp = Code::new(2, 5); // OK CONTENT
  /// assert_eq!(resp.kind(), CodeKind::Response);
  /// ```
  pub fn kind(&self) -> CodeKind {
    match (self.class, self.detail) {
      | (0, 0) => CodeKind::Empty,
      | (0, _) => CodeKind::Request,
      | (2..=5, _) => CodeKind::Response,
      | (7, _) => CodeKind::Signal,
      | _ => CodeKind::Reserved,
    }
  }

  /// Whether this code is a 2.xx success response
  pub fn is_success(&self) -> bool {
    self.class == 2
  }

  /// Whether this code is a 4.xx client error response
  pub fn is_client_error(&self) -> bool {
    self.class == 4
  }

  /// Whether this code is a 5.xx server error response
  pub fn is_server_error(&self) -> bool {
    self.class == 5
  }

  /// 0.00, used for pings and stand-alone acknowledgments
  pub const EMPTY: Self = Self::new(0, 0);

  /// 0.01
  pub const GET: Self = Self::new(0, 1);

  /// 0.02
  pub const POST: Self = Self::new(0, 2);

  /// 0.03
  pub const PUT: Self = Self::new(0, 3);

  /// 0.04
  pub const DELETE: Self = Self::new(0, 4);

  /// 0.05 (RFC 8132)
  pub const FETCH: Self = Self::new(0, 5);

  /// 0.06 (RFC 8132)
  pub const PATCH: Self = Self::new(0, 6);

  /// 0.07 (RFC 8132)
  pub const IPATCH: Self = Self::new(0, 7);

  /// 2.01
  pub const CREATED: Self = Self::new(2, 1);

  /// 2.02
  pub const DELETED: Self = Self::new(2, 2);

  /// 2.03
  pub const VALID: Self = Self::new(2, 3);

  /// 2.04
  pub const CHANGED: Self = Self::new(2, 4);

  /// 2.05
  pub const CONTENT: Self = Self::new(2, 5);

  /// 4.00
  pub const BAD_REQUEST: Self = Self::new(4, 0);

  /// 4.04
  pub const NOT_FOUND: Self = Self::new(4, 4);

  /// 4.05
  pub const METHOD_NOT_ALLOWED: Self = Self::new(4, 5);

  /// 4.13
  pub const REQUEST_ENTITY_TOO_LARGE: Self = Self::new(4, 13);

  /// 5.00
  pub const INTERNAL_SERVER_ERROR: Self = Self::new(5, 0);

  /// 7.01, first message on a reliable-transport session (RFC 8323)
  pub const CSM: Self = Self::new(7, 1);

  /// 7.02 (RFC 8323)
  pub const PING: Self = Self::new(7, 2);

  /// 7.03 (RFC 8323)
  pub const PONG: Self = Self::new(7, 3);

  /// 7.04 (RFC 8323)
  pub const RELEASE: Self = Self::new(7, 4);

  /// 7.05 (RFC 8323)
  pub const ABORT: Self = Self::new(7, 5);
}

#[cfg(feature = "alloc")]
impl ToString for Code {
  fn to_string(&self) -> String {
    String::from_iter(self.to_human())
  }
}

impl From<u8> for Code {
  fn from(b: u8) -> Self {
    // xxxyyyyy

    // xxx => class
    let class = b >> 5;

    // yyyyy => detail
    let detail = b & 0b00011111;

    Code { class, detail }
  }
}

impl From<Code> for u8 {
  fn from(code: Code) -> u8 {
    let class = (code.class << 5) & 0b11100000;
    let detail = code.detail & 0b00011111;

    class | detail
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_eqb;

  #[test]
  fn parse_code() {
    let byte = 0b01000101_u8;
    let code = Code::from(byte);
    assert_eq!(code,
               Code { class: 2,
                      detail: 5 })
  }

  #[test]
  fn serialize_code() {
    let code = Code { class: 2,
                      detail: 5 };
    let actual: u8 = code.into();
    let expected = 0b01000101_u8;
    assert_eqb!(actual, expected)
  }

  #[test]
  fn code_kinds() {
    assert_eq!(Code::EMPTY.kind(), CodeKind::Empty);
    assert_eq!(Code::IPATCH.kind(), CodeKind::Request);
    assert_eq!(Code::new(4, 13).kind(), CodeKind::Response);
    assert_eq!(Code::CSM.kind(), CodeKind::Signal);
    assert_eq!(Code::new(1, 0).kind(), CodeKind::Reserved);
    assert_eq!(Code::new(6, 22).kind(), CodeKind::Reserved);
  }
}
