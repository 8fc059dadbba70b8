//! The runtime core: glues the transport, the codec, the transaction
//! pool and the resource tree together.
//!
//! [`Core::run`] is one turn of the crank: poll the socket, fully
//! process whatever arrived, then drive the retransmission timers.
//! The core never spawns anything; the caller's loop is the only
//! thread of control, so an inbound datagram is always processed
//! before the pool is ticked and retransmissions cannot race with a
//! response from the same peer.

use embedded_time::{Clock, Instant};
use newt_common::Writable;
use newt_msg::{Code, CodeKind, ContentFormat, Id, Token, Type};
use newt_msg::{TryFromBytes, TryIntoBytes};
use no_std_net::SocketAddr;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tinyvec::ArrayVec;

/// Runtime errors
pub mod error;
pub use error::Error;

use crate::config::{self, Config};
use crate::logging;
use crate::net::{Addressed, Dgram, Socket};
use crate::req::{Method, Req};
use crate::resource::{discovery, Tree};
use crate::resp::{Reply, Resp, SeparateResponse};
use crate::time::Millis;
use crate::transaction::{Callback, MatchRules, Outcome, Pool, Status};

enum Answer<Cfg: Config> {
  Respond(config::Message<Cfg>),
  AckOnly,
}

/// A CoAP client & server runtime over one socket.
///
/// A `Core` constructed with [`Core::new`] serves a resource tree
/// (server profile); one constructed with [`Core::client`] has no tree
/// and answers nothing.
pub struct Core<'res, Cfg: Config> {
  sock: Cfg::Socket,
  clock: Cfg::Clock,
  params: config::Params,
  rules: MatchRules,
  rng: ChaCha8Rng,
  mid: u16,
  pool: Pool<Cfg>,
  resources: Option<Tree<'res, Cfg>>,
}

impl<'res, Cfg: Config> Core<'res, Cfg> {
  /// Create a server-profile runtime with default transmission
  /// parameters
  pub fn new(clock: Cfg::Clock, sock: Cfg::Socket) -> Self {
    Self::with_params(clock, sock, config::Params::default())
  }

  /// Create a server-profile runtime
  pub fn with_params(clock: Cfg::Clock, sock: Cfg::Socket, params: config::Params) -> Self {
    let seed = clock.try_now()
                    .ok()
                    .and_then(|i| Millis::try_from(i.duration_since_epoch()).ok())
                    .map(|m| m.0)
                    .unwrap_or(0x6e657774);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mid = rng.gen();

    Self { sock,
           clock,
           params,
           rules: MatchRules::default(),
           rng,
           mid,
           pool: Pool::new(),
           resources: Some(Tree::new()) }
  }

  /// Create a client-profile runtime: no resource tree, and inbound
  /// requests are rejected with
  /// [`Error::RequestNotSupported`].
  pub fn client(clock: Cfg::Clock, sock: Cfg::Socket) -> Self {
    let mut me = Self::new(clock, sock);
    me.resources = None;
    me
  }

  /// Tighten how responses are matched to outstanding transactions
  pub fn match_rules(&mut self, rules: MatchRules) {
    self.rules = rules;
  }

  /// The resource tree, when this is a server-profile runtime.
  ///
  /// The `&mut` receiver is what keeps tree mutation honest: nodes can
  /// be added or removed between turns of [`Core::run`], never while a
  /// request is being dispatched.
  pub fn resources_mut(&mut self) -> Option<&mut Tree<'res, Cfg>> {
    self.resources.as_mut()
  }

  /// The transaction pool
  pub fn transactions(&self) -> &Pool<Cfg> {
    &self.pool
  }

  /// Cancel the outstanding exchange correlated with `token`; its
  /// callback fires with [`Status::Cancelled`] and no response.
  pub fn cancel(&mut self, token: Token) {
    self.pool.cancel(token);
  }

  fn next_mid(&mut self) -> Id {
    let id = Id(self.mid);
    self.mid = self.mid.wrapping_add(1);
    id
  }

  fn now(&self) -> Result<Instant<Cfg::Clock>, Error<Cfg>> {
    self.clock.try_now().map_err(Error::ClockError)
  }

  /// Send a request.
  ///
  /// Confirmable requests claim a transaction slot and are
  /// retransmitted until a response matches or the budget runs out;
  /// the callback fires once with the outcome. Non-confirmable
  /// requests claim nothing and the callback fires inline from the
  /// send result.
  ///
  /// Yields the token to correlate (or [`Core::cancel`]) with.
  pub fn send_req(&mut self,
                  req: Req<Cfg>,
                  addr: SocketAddr,
                  callback: Option<Callback<Cfg>>)
                  -> Result<Token, Error<Cfg>> {
    if let Some(e) = req.err {
      return Err(Error::TooManyOptions(e));
    }

    self.transmit(req.msg, addr, callback, false).map(|(_, token)| token)
  }

  /// Check the liveness of a peer: send an empty confirmable message,
  /// which well-behaved peers answer with Reset ("pong").
  ///
  /// The callback fires with [`Status::Success`] when the pong
  /// arrives.
  pub fn ping(&mut self,
              addr: SocketAddr,
              callback: Option<Callback<Cfg>>)
              -> Result<Id, Error<Cfg>> {
    let msg = config::Message::<Cfg>::new(Type::Con, Code::EMPTY, Id(0), Token::empty());
    self.transmit(msg, addr, callback, true).map(|(id, _)| id)
  }

  /// Send the response half of a separated exchange; see
  /// [`Reply::separate_response`].
  pub fn send_separate(&mut self,
                       sep: SeparateResponse,
                       resp: Resp<Cfg>)
                       -> Result<(), Error<Cfg>> {
    let mut msg = resp.msg;
    msg.token = sep.token;
    msg.ty = sep.ty;

    self.transmit(msg, sep.addr, None, false).map(|_| ())
  }

  fn transmit(&mut self,
              mut msg: config::Message<Cfg>,
              addr: SocketAddr,
              callback: Option<Callback<Cfg>>,
              is_ping: bool)
              -> Result<(Id, Token), Error<Cfg>> {
    msg.id = self.next_mid();

    let (id, token, ty) = (msg.id, msg.token, msg.ty);

    log::trace!("-> {} {}", addr, logging::msg_summary::<Cfg>(&msg).as_str());
    let bytes = msg.try_into_bytes::<Dgram>().map_err(Error::Serialize)?;

    match ty {
      | Type::Con => {
        let now = self.now()?;
        let timeout = self.params.initial_timeout(&mut self.rng);
        let span = self.params.max_transmit_span();
        let max_retransmit = self.params.max_retransmit;

        let slot = self.pool.find_free_slot().ok_or(Error::NoFreeSlots)?;
        slot.init(&bytes,
                  addr,
                  id,
                  token,
                  is_ping,
                  callback,
                  now,
                  timeout,
                  max_retransmit,
                  span);

        match nb::block!(self.sock.send(Addressed(&bytes, addr))) {
          | Ok(()) => Ok((id, token)),
          | Err(e) => {
            self.pool.cancel_quiet(id);
            Err(Error::SockError(e))
          },
        }
      },
      | _ => {
        nb::block!(self.sock.send(Addressed(&bytes, addr))).map_err(Error::SockError)?;

        if let Some(callback) = callback {
          callback(&Outcome { status: Status::Success,
                              response: None });
        }

        Ok((id, token))
      },
    }
  }

  fn send_msg(&mut self, msg: config::Message<Cfg>, addr: SocketAddr) -> Result<(), Error<Cfg>> {
    log::trace!("-> {} {}", addr, logging::msg_summary::<Cfg>(&msg).as_str());

    let bytes = msg.try_into_bytes::<Dgram>().map_err(Error::Serialize)?;
    nb::block!(self.sock.send(Addressed(&bytes, addr))).map_err(Error::SockError)
  }

  /// Fully process one inbound datagram.
  ///
  /// Malformed datagrams are dropped (or, when a request did not fit
  /// in this machine's buffers, answered with 4.13) without failing
  /// the run loop; only transport & profile errors surface.
  pub fn process(&mut self, dgram: &[u8], from: SocketAddr) -> Result<(), Error<Cfg>> {
    if dgram.is_empty() {
      return Ok(());
    }

    let msg = match config::Message::<Cfg>::try_from_bytes(dgram) {
      | Ok(msg) => msg,
      | Err(e) if e.is_capacity_error() => {
        log::debug!("request from {} overran our buffers ({}); answering 4.13",
                    from,
                    crate::error::Kind::from(e).name());

        if let Some(reply) = Self::entity_too_large(dgram) {
          self.send_msg(reply, from)?;
        }

        return Ok(());
      },
      | Err(e) => {
        log::debug!("dropping datagram from {}: {} ({:?})",
                    from,
                    crate::error::Kind::from(e).name(),
                    e);
        return Ok(());
      },
    };

    log::trace!("<- {} {}", from, logging::msg_summary::<Cfg>(&msg).as_str());

    match msg.code.kind() {
      | CodeKind::Empty => self.handle_empty(msg, from),
      | CodeKind::Response => self.handle_response(msg, from),
      | CodeKind::Request => self.handle_request(msg, from),
      | kind => {
        log::debug!("dropping message from {} with unusable code class ({:?}, {})",
                    from,
                    kind,
                    crate::error::Kind::CodeInvalid.name());
        Ok(())
      },
    }
  }

  /// Build a 4.13 reply from the prefix of a request too large to
  /// parse. Header & token always fit (they precede the options), so
  /// they are read straight out of the raw bytes.
  fn entity_too_large(dgram: &[u8]) -> Option<config::Message<Cfg>> {
    let b0 = *dgram.first()?;
    let code = Code::from(*dgram.get(1)?);

    if code.kind() != CodeKind::Request {
      return None;
    }

    let ty = Type::try_from(b0 >> 4 & 0b11).ok()?;
    let id = Id(u16::from_be_bytes([*dgram.get(2)?, *dgram.get(3)?]));
    let tkl = (b0 & 0b1111) as usize;
    let token = Token::try_from(dgram.get(4..4 + tkl)?).ok()?;

    let ty = match ty {
      | Type::Con => Type::Ack,
      | _ => Type::Non,
    };

    Some(config::Message::<Cfg>::new(ty, Code::REQUEST_ENTITY_TOO_LARGE, id, token))
  }

  fn handle_empty(&mut self, msg: config::Message<Cfg>, from: SocketAddr) -> Result<(), Error<Cfg>> {
    match msg.ty {
      | Type::Con => {
        // CoAP ping; pong is a Reset
        let rst = msg.rst();
        self.send_msg(rst, from)
      },
      | Type::Ack | Type::Reset => {
        self.pool.check_response(&msg, from, self.rules);
        Ok(())
      },
      | Type::Non => Ok(()),
    }
  }

  fn handle_response(&mut self,
                     msg: config::Message<Cfg>,
                     from: SocketAddr)
                     -> Result<(), Error<Cfg>> {
    if !self.pool.check_response(&msg, from, self.rules) {
      log::debug!("response from {} matched no outstanding transaction", from);
    }

    // confirmable responses (e.g. the separate kind) want an ack
    // whether or not anyone was still waiting for them
    if msg.ty == Type::Con {
      let ack = msg.ack();
      self.send_msg(ack, from)?;
    }

    Ok(())
  }

  fn handle_request(&mut self,
                    msg: config::Message<Cfg>,
                    from: SocketAddr)
                    -> Result<(), Error<Cfg>> {
    let method = Method::from_code(msg.code);

    let mut segments: ArrayVec<[&str; 8]> = Default::default();
    let mut bad_path = false;

    for s in msg.path_segments() {
      match s {
        | Ok(s) if !segments.is_full() => segments.push(s),
        | Ok(_) => {},
        | Err(_) => bad_path = true,
      }
    }

    let answer = match self.resources.as_ref() {
      | None => return Err(Error::RequestNotSupported),
      | Some(_) if bad_path => Answer::<Cfg>::Respond(Self::error_reply(&msg, Code::BAD_REQUEST)),
      | Some(tree)
        if method == Some(Method::Get) && segments[..] == discovery::WELL_KNOWN_CORE[..] =>
      {
        let mut buf = Writable::<ArrayVec<[u8; 1024]>>::default();
        discovery::write_link_format(tree, &mut buf).ok();

        let mut resp: Resp<Cfg> = Resp::for_request(&msg);
        resp.set_content_format(ContentFormat::LinkFormat);
        resp.set_payload(buf.iter().copied());
        Answer::Respond(resp.msg)
      },
      | Some(tree) => match tree.lookup(segments.iter().copied()) {
        | None => Answer::Respond(Self::error_reply(&msg, Code::NOT_FOUND)),
        | Some(id) => {
          let node = tree.node(id);

          match method.and_then(|m| node.handler(m)) {
            | Some(handler) => {
              let mut reply = Reply::for_request(&msg, from);
              handler(&msg, &mut reply);

              if reply.is_separate() {
                Answer::AckOnly
              } else {
                Answer::Respond(reply.resp.msg)
              }
            },
            | None if node.has_any_handler() => {
              Answer::Respond(Self::error_reply(&msg, Code::METHOD_NOT_ALLOWED))
            },
            | None => Answer::Respond(Self::error_reply(&msg, Code::NOT_FOUND)),
          }
        },
      },
    };

    match answer {
      | Answer::Respond(mut reply_msg) => {
        let suppressed = msg.no_response()
                            .map(|nr| nr.suppresses(reply_msg.code))
                            .unwrap_or(false);

        if suppressed {
          log::debug!("peer {} asked for this response class to be suppressed", from);
          return self.ack_if_con(&msg, from);
        }

        if reply_msg.ty != Type::Ack {
          reply_msg.id = self.next_mid();
        }

        log::trace!("-> {} {}", from, logging::msg_summary::<Cfg>(&reply_msg).as_str());
        match reply_msg.try_into_bytes::<Dgram>() {
          | Ok(bytes) => {
            nb::block!(self.sock.send(Addressed(&bytes, from))).map_err(Error::SockError)
          },
          | Err(e) => {
            // the peer will retransmit & give up; nothing goes on the wire
            log::error!("response to {} failed to serialize: {:?}", from, e);
            Ok(())
          },
        }
      },
      | Answer::AckOnly => self.ack_if_con(&msg, from),
    }
  }

  fn ack_if_con(&mut self, msg: &config::Message<Cfg>, from: SocketAddr) -> Result<(), Error<Cfg>> {
    if msg.ty == Type::Con {
      let ack = msg.ack();
      self.send_msg(ack, from)?;
    }

    Ok(())
  }

  fn error_reply(req: &config::Message<Cfg>, code: Code) -> config::Message<Cfg> {
    let mut resp: Resp<Cfg> = Resp::for_request(req);
    resp.set_code(code);
    resp.msg
  }

  /// Drive the transaction pool's timers: retransmit what is due, time
  /// out what is spent.
  pub fn check_transactions(&mut self) {
    let now = match self.clock.try_now() {
      | Ok(now) => now,
      | Err(_) => return,
    };

    for slot in self.pool.slots_mut() {
      if let Some((bytes, addr)) = slot.tick(now) {
        log::debug!("retransmitting to {}", addr);
        nb::block!(self.sock.send(Addressed(bytes, addr))).ok();
      }
    }
  }

  /// One turn of the runtime: poll the socket, process the datagram if
  /// one arrived, then drive the timers.
  ///
  /// An `Ok(())` that did nothing is an idle tick; call this in a
  /// loop.
  pub fn run(&mut self) -> Result<(), Error<Cfg>> {
    match self.sock.poll() {
      | Ok(Some(Addressed(dgram, addr))) => self.process(&dgram, addr)?,
      | Ok(None) => {},
      | Err(e) => return Err(Error::SockError(e)),
    }

    self.check_transactions();
    Ok(())
  }
}
