//! Splitting `coap[s][+tcp|+ws]://host[:port]/path?query` into its
//! parts, and composing it back from a message's options.
//!
//! Hosts are IP literals (dotted-quad v4 or bracketed v6); names
//! requiring resolution are a transport concern this library stays out
//! of. The `#fragment` production is explicitly rejected.

use core::fmt::Write;
use core::str::FromStr;

use newt_common::Array;
use newt_msg::{known, OptValue, OptionsFull};
use no_std_net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::config::{self, Config};

/// URI schemes CoAP messages travel under
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scheme {
  /// `coap` (UDP, port 5683)
  Coap,
  /// `coaps` (DTLS, port 5684)
  Coaps,
  /// `coap+tcp` (RFC 8323, port 5683)
  CoapTcp,
  /// `coaps+tcp` (RFC 8323, port 5684)
  CoapsTcp,
  /// `coap+ws` (RFC 8323, port 80)
  CoapWs,
  /// `coaps+ws` (RFC 8323, port 443)
  CoapsWs,
}

impl Scheme {
  /// The port used when the URI does not name one
  pub fn default_port(&self) -> u16 {
    use Scheme::*;

    match self {
      | Coap | CoapTcp => 5683,
      | Coaps | CoapsTcp => 5684,
      | CoapWs => 80,
      | CoapsWs => 443,
    }
  }

  /// The scheme's name as it appears in a URI
  pub fn as_str(&self) -> &'static str {
    use Scheme::*;

    match self {
      | Coap => "coap",
      | Coaps => "coaps",
      | CoapTcp => "coap+tcp",
      | CoapsTcp => "coaps+tcp",
      | CoapWs => "coap+ws",
      | CoapsWs => "coaps+ws",
    }
  }

  fn parse(s: &str) -> Result<Self, UriParseError> {
    use Scheme::*;

    match s {
      | "coap" => Ok(Coap),
      | "coaps" => Ok(Coaps),
      | "coap+tcp" => Ok(CoapTcp),
      | "coaps+tcp" => Ok(CoapsTcp),
      | "coap+ws" => Ok(CoapWs),
      | "coaps+ws" => Ok(CoapsWs),
      | _ => Err(UriParseError::UnknownScheme),
    }
  }
}

/// The parts of a CoAP URI, borrowed from the string they were split from.
///
/// `path` and `query` are kept raw (percent-encoded); decoding happens
/// when they are turned into options.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UriParts<'a> {
  /// See [`Scheme`]
  pub scheme: Scheme,
  /// Host IP literal
  pub host: IpAddr,
  /// Port (the scheme's default when absent)
  pub port: u16,
  /// Raw path, without the leading `/`
  pub path: &'a str,
  /// Raw query, without the `?`
  pub query: &'a str,
}

/// Errors encounterable while decomposing a URI
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum UriParseError {
  /// No `://` found
  MissingScheme,
  /// Scheme is not one of the six CoAP schemes
  UnknownScheme,
  /// Host is not an IPv4 or bracketed IPv6 literal
  InvalidHost,
  /// Port is not a decimal number below 65536
  InvalidPort,
  /// URIs with a `#fragment` are not meaningful in CoAP
  FragmentNotAllowed,
  /// A `%` escape was not followed by 2 hex digits
  InvalidPercentEncoding,
}

/// Split a URI string into its parts.
///
/// ```
/// use newt::uri::{decompose, Scheme};
///
/// let uri = decompose("coap://[::1]:5683/a/b?k=v&flag").unwrap();
/// assert_eq!(uri.scheme, Scheme::Coap);
/// assert_eq!(uri.port, 5683);
/// assert_eq!(uri.path, "a/b");
/// assert_eq!(uri.query, "k=v&flag");
/// ```
pub fn decompose(s: &str) -> Result<UriParts<'_>, UriParseError> {
  if s.contains('#') {
    return Err(UriParseError::FragmentNotAllowed);
  }

  let (scheme, rest) = s.split_once("://").ok_or(UriParseError::MissingScheme)?;
  let scheme = Scheme::parse(scheme)?;

  let (authority, path_and_query) = match rest.find(['/', '?']) {
    | Some(ix) => rest.split_at(ix),
    | None => (rest, ""),
  };

  let (path, query) = match path_and_query.split_once('?') {
    | Some((p, q)) => (p.strip_prefix('/').unwrap_or(p), q),
    | None => (path_and_query.strip_prefix('/').unwrap_or(path_and_query), ""),
  };

  let (host, port) = split_authority(authority)?;

  let host = parse_host(host)?;
  let port = match port {
    | Some(p) => u16::from_str(p).map_err(|_| UriParseError::InvalidPort)?,
    | None => scheme.default_port(),
  };

  Ok(UriParts { scheme,
                host,
                port,
                path,
                query })
}

fn split_authority(authority: &str) -> Result<(&str, Option<&str>), UriParseError> {
  if let Some(rest) = authority.strip_prefix('[') {
    // bracketed IPv6 literal
    let (host, after) = rest.split_once(']').ok_or(UriParseError::InvalidHost)?;

    match after.strip_prefix(':') {
      | Some(port) => Ok((host, Some(port))),
      | None if after.is_empty() => Ok((host, None)),
      | None => Err(UriParseError::InvalidHost),
    }
  } else {
    match authority.split_once(':') {
      | Some((host, port)) => Ok((host, Some(port))),
      | None => Ok((authority, None)),
    }
  }
}

fn parse_host(host: &str) -> Result<IpAddr, UriParseError> {
  if host.contains(':') {
    Ipv6Addr::from_str(host).map(IpAddr::V6)
                            .map_err(|_| UriParseError::InvalidHost)
  } else {
    Ipv4Addr::from_str(host).map(IpAddr::V4)
                            .map_err(|_| UriParseError::InvalidHost)
  }
}

/// Decode `%XX` escapes from a raw URI component into a byte collection.
pub(crate) fn percent_decode_into<C: Array<Item = u8>>(s: &str,
                                                       out: &mut C)
                                                       -> Result<(), UriParseError> {
  let hex = |b: u8| -> Result<u8, UriParseError> {
    match b {
      | b'0'..=b'9' => Ok(b - b'0'),
      | b'a'..=b'f' => Ok(b - b'a' + 10),
      | b'A'..=b'F' => Ok(b - b'A' + 10),
      | _ => Err(UriParseError::InvalidPercentEncoding),
    }
  };

  let bytes = s.as_bytes();
  let mut ix = 0;

  while ix < bytes.len() {
    match bytes[ix] {
      | b'%' if ix + 2 < bytes.len() => {
        out.push(hex(bytes[ix + 1])? << 4 | hex(bytes[ix + 2])?);
        ix += 3;
      },
      | b'%' => return Err(UriParseError::InvalidPercentEncoding),
      | b => {
        out.push(b);
        ix += 1;
      },
    }
  }

  Ok(())
}

impl<'a> UriParts<'a> {
  /// The socket address this URI names
  pub fn addr(&self) -> SocketAddr {
    SocketAddr::new(self.host, self.port)
  }

  /// Append this URI's path & query to a message as Uri-Path and
  /// Uri-Query options, one per segment / argument, in order.
  pub fn add_to_message<Cfg: Config>(&self,
                                     msg: &mut config::Message<Cfg>)
                                     -> Result<(), UriToOptionsError> {
    for segment in self.path.split('/').filter(|s| !s.is_empty()) {
      let mut value = Cfg::OptBytes::default();
      percent_decode_into(segment, &mut value)?;
      msg.add(known::repeat::PATH, OptValue(value))?;
    }

    for arg in self.query.split('&').filter(|s| !s.is_empty()) {
      let mut value = Cfg::OptBytes::default();
      percent_decode_into(arg, &mut value)?;
      msg.add(known::repeat::QUERY, OptValue(value))?;
    }

    Ok(())
  }
}

/// Errors encounterable while turning a URI into options
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum UriToOptionsError {
  Uri(UriParseError),
  OptionsFull(OptionsFull),
}

impl From<UriParseError> for UriToOptionsError {
  fn from(e: UriParseError) -> Self {
    Self::Uri(e)
  }
}

impl From<OptionsFull> for UriToOptionsError {
  fn from(e: OptionsFull) -> Self {
    Self::OptionsFull(e)
  }
}

/// Compose a URI from a message's Uri-Path & Uri-Query options and the
/// address it is (or was) destined for.
///
/// The inverse of [`decompose`] + [`UriParts::add_to_message`].
pub fn compose<W, Cfg>(out: &mut W,
                       scheme: Scheme,
                       addr: SocketAddr,
                       msg: &config::Message<Cfg>)
                       -> core::fmt::Result
  where W: Write,
        Cfg: Config
{
  write!(out, "{}://", scheme.as_str())?;

  match addr.ip() {
    | IpAddr::V4(ip) => write!(out, "{}", ip)?,
    | IpAddr::V6(ip) => write!(out, "[{}]", ip)?,
  }

  if addr.port() != scheme.default_port() {
    write!(out, ":{}", addr.port())?;
  }

  for segment in msg.path_segments() {
    write!(out, "/{}", segment.map_err(|_| core::fmt::Error)?)?;
  }

  let mut first = true;
  for arg in msg.queries() {
    write!(out,
           "{}{}",
           if first { "?" } else { "&" },
           arg.map_err(|_| core::fmt::Error)?)?;
    first = false;
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use newt_common::Writable;
  use newt_msg::{Code, Id, Token, Type};

  use super::*;
  use crate::test;

  type Message = config::Message<test::Config>;

  #[test]
  fn decompose_ipv6_with_query() {
    let uri = decompose("coap://[::1]:5683/a/b?k=v&flag").unwrap();

    assert_eq!(uri.scheme, Scheme::Coap);
    assert_eq!(uri.host, IpAddr::V6(Ipv6Addr::from_str("::1").unwrap()));
    assert_eq!(uri.port, 5683);
    assert_eq!(uri.path, "a/b");
    assert_eq!(uri.query, "k=v&flag");

    let mut msg = Message::new(Type::Con, Code::GET, Id(1), Token::empty());
    uri.add_to_message::<test::Config>(&mut msg).unwrap();

    let opts = msg.opts
                  .iter()
                  .map(|o| (o.number.0, o.value.0.clone()))
                  .collect::<Vec<_>>();
    assert_eq!(opts,
               vec![(11, b"a".to_vec()),
                    (11, b"b".to_vec()),
                    (15, b"k=v".to_vec()),
                    (15, b"flag".to_vec())]);
  }

  #[test]
  fn decompose_ipv4_defaults() {
    let uri = decompose("coaps://192.168.0.1").unwrap();

    assert_eq!(uri.host, IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1)));
    assert_eq!(uri.port, 5684);
    assert_eq!(uri.path, "");
    assert_eq!(uri.query, "");
  }

  #[test]
  fn scheme_ports() {
    assert_eq!(decompose("coap+tcp://1.1.1.1").unwrap().port, 5683);
    assert_eq!(decompose("coaps+tcp://1.1.1.1").unwrap().port, 5684);
    assert_eq!(decompose("coap+ws://1.1.1.1").unwrap().port, 80);
    assert_eq!(decompose("coaps+ws://1.1.1.1").unwrap().port, 443);
  }

  #[test]
  fn rejections() {
    assert_eq!(decompose("coap://1.1.1.1/a#frag"),
               Err(UriParseError::FragmentNotAllowed));
    assert_eq!(decompose("http://1.1.1.1"), Err(UriParseError::UnknownScheme));
    assert_eq!(decompose("no-scheme-here"), Err(UriParseError::MissingScheme));
    assert_eq!(decompose("coap://coap.me/a"), Err(UriParseError::InvalidHost));
    assert_eq!(decompose("coap://1.1.1.1:99999"),
               Err(UriParseError::InvalidPort));
    assert_eq!(decompose("coap://[::1/a"), Err(UriParseError::InvalidHost));
  }

  #[test]
  fn percent_decoding() {
    let uri = decompose("coap://1.1.1.1/with%20space").unwrap();
    let mut msg = Message::new(Type::Con, Code::GET, Id(1), Token::empty());
    uri.add_to_message::<test::Config>(&mut msg).unwrap();

    assert_eq!(msg.path_segments().next(), Some(Ok("with space")));

    let uri = decompose("coap://1.1.1.1/bad%2").unwrap();
    let mut msg = Message::new(Type::Con, Code::GET, Id(1), Token::empty());
    assert_eq!(uri.add_to_message::<test::Config>(&mut msg),
               Err(UriToOptionsError::Uri(UriParseError::InvalidPercentEncoding)));
  }

  #[test]
  fn compose_inverts_decompose() {
    let uri = decompose("coap://[::1]/a/b?k=v").unwrap();
    let mut msg = Message::new(Type::Con, Code::GET, Id(1), Token::empty());
    uri.add_to_message::<test::Config>(&mut msg).unwrap();

    let mut out = Writable::<tinyvec::ArrayVec<[u8; 64]>>::default();
    compose::<_, test::Config>(&mut out, Scheme::Coap, uri.addr(), &msg).unwrap();
    assert_eq!(out.as_str(), "coap://[::1]/a/b?k=v");
  }
}
