use core::str::{from_utf8, Utf8Error};

use newt_msg::{Code, ContentFormat, Id, Payload, Token, Type};
use no_std_net::SocketAddr;

use crate::config::{self, Config};

/// A CoAP response.
///
/// Wraps a [`Message`](config::Message) whose code is a response code,
/// with conveniences for the piggybacked-response shape servers
/// usually want.
#[derive(Clone, Debug)]
pub struct Resp<Cfg: Config> {
  /// The wrapped message
  pub msg: config::Message<Cfg>,
}

impl<Cfg: Config> Resp<Cfg> {
  /// Create a response shaped to answer `req`.
  ///
  /// Confirmable requests get an acknowledgment carrying the response
  /// (echoing the request's message id); non-confirmable requests get
  /// a non-confirmable response with an id the runtime assigns at
  /// send time. The token is echoed either way.
  pub fn for_request(req: &config::Message<Cfg>) -> Self {
    let (ty, id) = match req.ty {
      | Type::Con => (Type::Ack, req.id),
      | _ => (Type::Non, Id(0)),
    };

    Self { msg: config::Message::<Cfg>::new(ty, Code::CONTENT, id, req.token) }
  }

  /// The response status
  pub fn code(&self) -> Code {
    self.msg.code
  }

  /// Set the response status
  pub fn set_code(&mut self, code: Code) {
    self.msg.code = code;
  }

  /// Replace the payload
  pub fn set_payload<B: IntoIterator<Item = u8>>(&mut self, bytes: B) {
    self.msg.payload = Payload(bytes.into_iter().collect());
  }

  /// Set the Content-Format option
  pub fn set_content_format(&mut self, format: ContentFormat) {
    self.msg.set_content_format(format).ok();
  }

  /// The payload, interpreted as UTF-8
  pub fn payload_str(&self) -> Result<&str, Utf8Error> {
    from_utf8(self.msg.payload.as_bytes())
  }
}

impl<Cfg: Config> From<Resp<Cfg>> for config::Message<Cfg> {
  fn from(resp: Resp<Cfg>) -> Self {
    resp.msg
  }
}

/// Everything needed to produce a response after the original exchange
/// has been acknowledged and forgotten: the peer, the original
/// request's type, and the token correlating the two.
///
/// This is a plain value; hand it to whatever code will eventually
/// compute the result, then give it back to
/// [`Core::send_separate`](crate::core::Core::send_separate).
/// The runtime does not manage that computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeparateResponse {
  /// Who asked
  pub addr: SocketAddr,
  /// How they asked (confirmable or not); the eventual response
  /// travels the same way
  pub ty: Type,
  /// The correlator the response must echo
  pub token: Token,
}

/// What a request handler is given to answer with.
///
/// Starts out as a piggybacked 2.05; handlers overwrite what they
/// need to. Taking a [`SeparateResponse`] out of the reply makes the
/// runtime send a bare acknowledgment instead, leaving the real
/// response to be produced later.
#[derive(Clone, Debug)]
pub struct Reply<Cfg: Config> {
  /// The response under construction
  pub resp: Resp<Cfg>,
  peer: SocketAddr,
  req_ty: Type,
  separate: bool,
}

impl<Cfg: Config> Reply<Cfg> {
  pub(crate) fn for_request(req: &config::Message<Cfg>, peer: SocketAddr) -> Self {
    Self { resp: Resp::for_request(req),
           peer,
           req_ty: req.ty,
           separate: false }
  }

  /// The peer the request came from
  pub fn peer(&self) -> SocketAddr {
    self.peer
  }

  /// Answer with a bare ACK now, yielding the value needed to send the
  /// real response later.
  pub fn separate_response(&mut self) -> SeparateResponse {
    self.separate = true;
    SeparateResponse { addr: self.peer,
                       ty: self.req_ty,
                       token: self.resp.msg.token }
  }

  /// Whether the handler opted into a separate response
  pub fn is_separate(&self) -> bool {
    self.separate
  }
}

#[cfg(test)]
mod tests {
  use newt_msg::{Token, Type};

  use super::*;
  use crate::test;

  #[test]
  fn piggyback_shape() {
    let mut req = config::Message::<test::Config>::new(Type::Con,
                                                       Code::GET,
                                                       Id(7),
                                                       Token::try_from(&[1][..]).unwrap());
    req.add_path_segment("time").unwrap();

    let resp: Resp<test::Config> = Resp::for_request(&req);
    assert_eq!(resp.msg.ty, Type::Ack);
    assert_eq!(resp.msg.id, Id(7));
    assert_eq!(resp.msg.token, req.token);

    req.ty = Type::Non;
    let resp: Resp<test::Config> = Resp::for_request(&req);
    assert_eq!(resp.msg.ty, Type::Non);
  }
}
