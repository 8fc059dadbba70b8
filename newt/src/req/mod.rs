use newt_msg::{Id, OptNumber, OptValue, OptionsFull, Payload, Token, Type};
use no_std_net::SocketAddr;

use crate::config::{self, Config};
use crate::uri::{self, UriParseError};

/// Request methods
pub mod method;
pub use method::Method;

/// A CoAP request under construction.
///
/// `Req` is the message factory: fluent methods capture the type,
/// token, options and payload, and the runtime serializes the finished
/// message when it is sent. Option-storage overflow is remembered and
/// surfaced at send time rather than mid-chain, the same way
/// serialization errors are.
///
/// ```
/// use newt::config::Std;
/// use newt::req::Req;
///
/// let req = Req::<Std>::get("sensors/temp").query("unit=c");
/// ```
#[derive(Clone, Debug)]
pub struct Req<Cfg: Config> {
  /// The message under construction
  pub msg: config::Message<Cfg>,
  pub(crate) err: Option<OptionsFull>,
}

impl<Cfg: Config> Req<Cfg> {
  /// Create a new confirmable request
  pub fn new(method: Method) -> Self {
    Self { msg: config::Message::<Cfg>::new(Type::Con, method.code(), Id(0), Token::empty()),
           err: None }
  }

  /// Create a new GET request
  pub fn get<P: AsRef<str>>(path: P) -> Self {
    Self::new(Method::Get).path(path)
  }

  /// Create a new POST request
  pub fn post<P: AsRef<str>>(path: P) -> Self {
    Self::new(Method::Post).path(path)
  }

  /// Create a new PUT request
  pub fn put<P: AsRef<str>>(path: P) -> Self {
    Self::new(Method::Put).path(path)
  }

  /// Create a new DELETE request
  pub fn delete<P: AsRef<str>>(path: P) -> Self {
    Self::new(Method::Delete).path(path)
  }

  /// Create a new FETCH request
  pub fn fetch<P: AsRef<str>>(path: P) -> Self {
    Self::new(Method::Fetch).path(path)
  }

  /// Create a new PATCH request
  pub fn patch<P: AsRef<str>>(path: P) -> Self {
    Self::new(Method::Patch).path(path)
  }

  /// Create a new iPATCH request
  pub fn ipatch<P: AsRef<str>>(path: P) -> Self {
    Self::new(Method::IPatch).path(path)
  }

  /// Create a request from a full CoAP URI, yielding the request and
  /// the address it should be sent to.
  ///
  /// ```
  /// use newt::config::Std;
  /// use newt::req::{Method, Req};
  ///
  /// let (req, addr) = Req::<Std>::from_uri(Method::Get, "coap://[::1]/a/b?k=v").unwrap();
  /// assert_eq!(addr.port(), 5683);
  /// ```
  pub fn from_uri<S: AsRef<str>>(method: Method, s: S) -> Result<(Self, SocketAddr), UriParseError> {
    let parts = uri::decompose(s.as_ref())?;
    let mut req = Self::new(method);

    match parts.add_to_message::<Cfg>(&mut req.msg) {
      | Ok(()) => {},
      | Err(uri::UriToOptionsError::Uri(e)) => return Err(e),
      | Err(uri::UriToOptionsError::OptionsFull(e)) => req.err = Some(e),
    }

    Ok((req, parts.addr()))
  }

  /// Make this request non-confirmable: fire-and-forget, no
  /// retransmission, no transaction slot.
  pub fn non(mut self) -> Self {
    self.msg.ty = Type::Non;
    self
  }

  /// Append Uri-Path segments (`/`-separated)
  pub fn path<P: AsRef<str>>(mut self, path: P) -> Self {
    for segment in path.as_ref().split('/').filter(|s| !s.is_empty()) {
      let res = self.msg.add_path_segment(segment);
      self.err = self.err.or(res.err());
    }

    self
  }

  /// Append a Uri-Query argument
  pub fn query<Q: AsRef<str>>(mut self, query: Q) -> Self {
    let res = self.msg.add_query(query.as_ref());
    self.err = self.err.or(res.err());
    self
  }

  /// Set the token used to correlate the response with this request
  pub fn token(mut self, token: Token) -> Self {
    self.msg.token = token;
    self
  }

  /// Set the payload
  pub fn payload<B: IntoIterator<Item = u8>>(mut self, bytes: B) -> Self {
    self.msg.payload = Payload(bytes.into_iter().collect());
    self
  }

  /// Add an arbitrary option
  pub fn option<B: IntoIterator<Item = u8>>(mut self, number: OptNumber, value: B) -> Self {
    let res = self.msg.add(number, OptValue(value.into_iter().collect()));
    self.err = self.err.or(res.err());
    self
  }

  /// Ask the server to suppress response categories (RFC 7967)
  pub fn no_response(mut self, suppress: newt_msg::opt::no_response::Suppress) -> Self {
    let res = self.msg.set_no_response(suppress);
    self.err = self.err.or(res.err());
    self
  }

  /// The method this request will perform
  pub fn method(&self) -> Option<Method> {
    Method::from_code(self.msg.code)
  }

  /// The token carried by this request
  pub fn msg_token(&self) -> Token {
    self.msg.token
  }
}

impl<Cfg: Config> From<Req<Cfg>> for config::Message<Cfg> {
  fn from(req: Req<Cfg>) -> Self {
    req.msg
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test;

  #[test]
  fn fluent_request() {
    let req = Req::<test::Config>::get("a/b").query("k=v")
                                             .token(Token::try_from(&[1][..]).unwrap());

    assert_eq!(req.method(), Some(Method::Get));
    assert_eq!(req.msg.ty, Type::Con);

    let segments = req.msg
                      .path_segments()
                      .collect::<Result<Vec<_>, _>>()
                      .unwrap();
    assert_eq!(segments, vec!["a", "b"]);
    assert!(req.err.is_none());
  }

  #[test]
  fn from_uri_sets_options_in_order() {
    let (req, addr) =
      Req::<test::Config>::from_uri(Method::Get, "coap://[::1]:5683/a/b?k=v&flag").unwrap();

    assert_eq!(addr.port(), 5683);

    let opts = req.msg
                  .opts
                  .iter()
                  .map(|o| (o.number.0, o.value.0.clone()))
                  .collect::<Vec<_>>();
    assert_eq!(opts,
               vec![(11, b"a".to_vec()),
                    (11, b"b".to_vec()),
                    (15, b"k=v".to_vec()),
                    (15, b"flag".to_vec())]);
  }
}
