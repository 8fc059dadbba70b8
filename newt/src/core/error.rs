use newt_msg::{MessageToBytesError, OptionsFull};

use crate::config::Config;
use crate::error::Kind;
use crate::net::Socket;

/// An error surfaced by the runtime to its caller.
///
/// Parse failures on inbound datagrams are *not* errors: the runtime
/// drops (or answers 4.13 to) bad datagrams and keeps running.
#[derive(Debug)]
pub enum Error<Cfg: Config> {
  /// Some socket operation failed
  SockError(<Cfg::Socket as Socket>::Error),

  /// The platform clock failed to produce a reading
  ClockError(embedded_time::clock::Error),

  /// Serializing an outbound message failed
  Serialize(MessageToBytesError),

  /// A request builder ran out of option storage
  TooManyOptions(OptionsFull),

  /// Every transaction slot is busy
  NoFreeSlots,

  /// This is a client-profile runtime (no resource tree), and a peer
  /// sent it a request
  RequestNotSupported,
}

impl<Cfg: Config> Error<Cfg> {
  /// Which failure class this error belongs to
  pub fn kind(&self) -> Kind {
    match self {
      | Error::SockError(_) => Kind::SocketError,
      | Error::ClockError(_) => Kind::SocketError,
      | Error::Serialize(e) => Kind::from(*e),
      | Error::TooManyOptions(_) => Kind::InsufficientBuffer,
      | Error::NoFreeSlots => Kind::NoFreeSlots,
      | Error::RequestNotSupported => Kind::RequestNotSupported,
    }
  }
}
