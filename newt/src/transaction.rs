//! One slot per in-flight confirmable exchange: the serialized bytes
//! (retransmitted verbatim), the peer, timers, and the callback to
//! fire when the exchange closes.

use embedded_time::Instant;
use newt_msg::{CodeKind, Id, Token, Type};
use no_std_net::SocketAddr;

use crate::config::{self, Config};
use crate::net::Dgram;
use crate::retry::{Attempts, RetryTimer, Strategy, YouShould};
use crate::time::Millis;

/// Where a transaction is in its life
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Status {
  /// The slot is free
  #[default]
  Idle,
  /// Sent, awaiting a matching response (retransmitting on a timer)
  Sending,
  /// A response arrived
  Success,
  /// An empty ACK arrived; the peer owes us a separate response
  Empty,
  /// The retransmission budget ran out
  TimedOut,
  /// Cancelled by the caller
  Cancelled,
}

impl Status {
  /// Whether the exchange is over and the slot is about to be released
  pub fn is_terminal(&self) -> bool {
    matches!(self, Status::Success | Status::TimedOut | Status::Cancelled)
  }
}

/// What a transaction callback is invoked with
#[derive(Debug)]
pub struct Outcome<'a, Cfg: Config> {
  /// Where the transaction ended up; one of the terminal states,
  /// or [`Status::Empty`] when a separate response is now pending
  pub status: Status,
  /// The matched response, when there is one
  pub response: Option<(&'a config::Message<Cfg>, SocketAddr)>,
}

/// Called when a transaction leaves [`Status::Sending`].
///
/// A plain function pointer: transactions live in a preallocated pool,
/// so there is nowhere to put a closure's captures.
pub type Callback<Cfg> = fn(&Outcome<'_, Cfg>);

/// How strictly responses are matched to slots.
///
/// The message id must always match; peers & tokens optionally tighten
/// the check.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct MatchRules {
  /// Require the response to come from the peer the request went to
  pub endpoint: bool,
  /// Require the response token to echo the request token
  pub token: bool,
}

/// One in-flight confirmable exchange
pub struct Slot<Cfg: Config> {
  status: Status,
  buf: Dgram,
  addr: Option<SocketAddr>,
  id: Id,
  token: Token,
  is_ping: bool,
  callback: Option<Callback<Cfg>>,
  timer: Option<RetryTimer<Cfg::Clock>>,
  started: Option<Instant<Cfg::Clock>>,
  span: Millis,
}

impl<Cfg: Config> Default for Slot<Cfg> {
  fn default() -> Self {
    Self { status: Status::Idle,
           buf: Default::default(),
           addr: None,
           id: Id(0),
           token: Token::empty(),
           is_ping: false,
           callback: None,
           timer: None,
           started: None,
           span: Millis::new(0) }
  }
}

impl<Cfg: Config> core::fmt::Debug for Slot<Cfg> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Slot")
     .field("status", &self.status)
     .field("id", &self.id)
     .field("addr", &self.addr)
     .finish_non_exhaustive()
  }
}

impl<Cfg: Config> Slot<Cfg> {
  /// Claim this slot for an exchange.
  ///
  /// `bytes` is the full serialized message; it is retained and
  /// retransmitted verbatim.
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn init(&mut self,
                     bytes: &[u8],
                     addr: SocketAddr,
                     id: Id,
                     token: Token,
                     is_ping: bool,
                     callback: Option<Callback<Cfg>>,
                     now: Instant<Cfg::Clock>,
                     initial_timeout: Millis,
                     max_retransmit: u16,
                     span: Millis) {
    self.status = Status::Sending;
    self.buf.clear();
    self.buf.extend_from_slice(bytes);
    self.addr = Some(addr);
    self.id = id;
    self.token = token;
    self.is_ping = is_ping;
    self.callback = callback;
    // attempt 1 is the send itself; exhaustion fires at the expiry
    // after the final retransmission
    self.timer = Some(RetryTimer::new(now,
                                      Strategy::Exponential(initial_timeout),
                                      Attempts(max_retransmit + 1)));
    self.started = Some(now);
    self.span = span;
  }

  /// The retained bytes this slot retransmits
  pub fn buffer(&self) -> &[u8] {
    &self.buf
  }

  /// The slot's current status
  pub fn status(&self) -> Status {
    self.status
  }

  /// The peer this exchange is with
  pub fn addr(&self) -> Option<SocketAddr> {
    self.addr
  }

  /// Retransmissions left before the exchange times out
  pub fn retransmissions_remaining(&self) -> u16 {
    self.timer.map(|t| t.attempts_remaining()).unwrap_or(0)
  }

  fn fire(&mut self, status: Status, response: Option<(&config::Message<Cfg>, SocketAddr)>) {
    self.status = status;

    if let Some(callback) = self.callback {
      callback(&Outcome { status, response });
    }

    if status.is_terminal() {
      self.release();
    }
  }

  fn release(&mut self) {
    *self = Self::default();
  }

  /// Cancel the exchange: the callback fires with no response and the
  /// slot is released.
  pub fn cancel(&mut self) {
    if matches!(self.status, Status::Sending | Status::Empty) {
      self.fire(Status::Cancelled, None);
    }
  }

  /// Offer an inbound message to this slot.
  ///
  /// Yields `true` when the message matched (and was consumed by) this
  /// transaction.
  pub(crate) fn check_response(&mut self,
                               msg: &config::Message<Cfg>,
                               from: SocketAddr,
                               rules: MatchRules)
                               -> bool {
    match self.status {
      | Status::Sending => {},
      | Status::Empty => {
        // the separate response correlates by token, and arrives as a
        // fresh message with its own id
        if msg.token == self.token && msg.code.kind() == CodeKind::Response {
          self.fire(Status::Success, Some((msg, from)));
          return true;
        }
        return false;
      },
      | _ => return false,
    }

    if msg.id != self.id {
      return false;
    }

    if rules.endpoint && self.addr != Some(from) {
      return false;
    }

    if rules.token && msg.code.kind() != CodeKind::Empty && msg.token != self.token {
      return false;
    }

    match (msg.code.kind(), msg.ty) {
      | (CodeKind::Empty, Type::Reset) if self.is_ping => {
        // pong
        self.fire(Status::Success, Some((msg, from)));
        true
      },
      | (CodeKind::Empty, Type::Reset) => {
        self.fire(Status::Cancelled, Some((msg, from)));
        true
      },
      | (CodeKind::Empty, _) => {
        // bare ACK; a separate response is coming
        self.fire(Status::Empty, None);
        true
      },
      | _ => {
        self.fire(Status::Success, Some((msg, from)));
        true
      },
    }
  }

  /// Drive this slot's timer. When a retransmission is due, yields the
  /// bytes to put on the wire and the peer to send them to.
  pub(crate) fn tick(&mut self, now: Instant<Cfg::Clock>) -> Option<(&[u8], SocketAddr)> {
    if self.status != Status::Sending {
      return None;
    }

    let span_exhausted = self.started
                             .map(|started| crate::time::elapsed(&started, &now) > self.span)
                             .unwrap_or(false);

    let due = match self.timer.as_mut() {
      | Some(timer) => match timer.what_should_i_do(now) {
        | Ok(YouShould::Retry) => true,
        | Ok(YouShould::Cry) => {
          self.fire(Status::TimedOut, None);
          return None;
        },
        | Err(nb::Error::WouldBlock) => false,
        | Err(nb::Error::Other(_)) => false,
      },
      | None => false,
    };

    if due && span_exhausted {
      // MAX_TRANSMIT_SPAN forbids another retransmission; give up early
      self.fire(Status::TimedOut, None);
      return None;
    }

    match (due, self.addr) {
      | (true, Some(addr)) => Some((&self.buf, addr)),
      | _ => None,
    }
  }
}

/// A fixed-capacity pool of transaction [`Slot`]s.
///
/// Currently the capacity is hard-coded at 16 concurrent exchanges,
/// but this will eventually be configurable at compile-time.
pub struct Pool<Cfg: Config> {
  slots: [Slot<Cfg>; 16],
}

impl<Cfg: Config> Default for Pool<Cfg> {
  fn default() -> Self {
    Self::new()
  }
}

impl<Cfg: Config> core::fmt::Debug for Pool<Cfg> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Pool").finish_non_exhaustive()
  }
}

impl<Cfg: Config> Pool<Cfg> {
  /// Create a pool of idle slots
  pub fn new() -> Self {
    Self { slots: core::array::from_fn(|_| Slot::default()) }
  }

  /// The first idle slot, or `None` when all are busy
  pub fn find_free_slot(&mut self) -> Option<&mut Slot<Cfg>> {
    self.slots.iter_mut().find(|s| s.status == Status::Idle)
  }

  /// Offer an inbound message to every busy slot; `true` when one
  /// consumed it.
  pub(crate) fn check_response(&mut self,
                               msg: &config::Message<Cfg>,
                               from: SocketAddr,
                               rules: MatchRules)
                               -> bool {
    self.slots
        .iter_mut()
        .any(|s| s.check_response(msg, from, rules))
  }

  /// Release the slot claimed for message `id` without firing its
  /// callback; used when the initial send itself fails.
  pub(crate) fn cancel_quiet(&mut self, id: Id) {
    self.slots
        .iter_mut()
        .filter(|s| s.id == id && s.status == Status::Sending)
        .for_each(|s| *s = Slot::default());
  }

  /// Cancel the exchange correlated with `token`
  pub fn cancel(&mut self, token: Token) {
    self.slots
        .iter_mut()
        .filter(|s| s.token == token)
        .for_each(|s| s.cancel());
  }

  /// Iterate over the slots
  pub fn slots(&self) -> impl Iterator<Item = &Slot<Cfg>> {
    self.slots.iter()
  }

  pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Slot<Cfg>> {
    self.slots.iter_mut()
  }
}
