#![allow(dead_code)]

use core::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use embedded_time::rate::Fraction;
use embedded_time::Instant;
use newt_msg::Opt;
use tinyvec::ArrayVec;

use crate::config::Alloc;
use crate::net::{Addressed, Socket};

/// Config implementor using mocks for clock and sock
pub type Config = Alloc<ClockMock, SockMock>;

/// Alias so tests can be explicit about which config they drive
pub type TestConfig = Config;

/// A shared handle to a [`ClockMock`]'s current time
pub type TimeHandle = Rc<Cell<u64>>;

/// Everything a [`SockMock`] sent or received
pub type SockMsgs = Arc<Mutex<Vec<Addressed<Vec<u8>>>>>;

/// A peer address for tests
pub fn addr(n: u8) -> no_std_net::SocketAddr {
  use no_std_net::{Ipv4Addr, SocketAddrV4};

  no_std_net::SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, n), 5683))
}

/// A clock whose current time is set by the test body
#[derive(Debug, Clone)]
pub struct ClockMock(TimeHandle);

impl ClockMock {
  pub fn new() -> (Self, TimeHandle) {
    let time = Rc::new(Cell::new(0));
    (Self(time.clone()), time)
  }
}

impl embedded_time::Clock for ClockMock {
  type T = u64;

  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000);

  fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
    Ok(Instant::new(self.0.get()))
  }
}

/// A mocked socket
///
/// Inbound datagrams are pushed onto `rx` by the test body; everything
/// the runtime sends lands in `tx` for the test body to inspect.
#[derive(Debug)]
pub struct SockMock {
  pub rx: SockMsgs,
  pub tx: SockMsgs,
}

impl SockMock {
  pub fn new() -> Self {
    Self { rx: Default::default(),
           tx: Default::default() }
  }
}

impl Socket for SockMock {
  type Error = Option<()>;

  fn bind(_: no_std_net::SocketAddr) -> Result<Self, Self::Error> {
    Ok(Self::new())
  }

  fn send(&self, msg: Addressed<&[u8]>) -> nb::Result<(), Self::Error> {
    self.tx.lock().unwrap().push(Addressed(msg.0.to_vec(), msg.1));
    Ok(())
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addressed<usize>, Self::Error> {
    let mut rx = self.rx.lock().unwrap();

    if rx.is_empty() {
      return Err(nb::Error::WouldBlock);
    }

    let dgram = rx.remove(0);
    dgram.data()
         .iter()
         .enumerate()
         .for_each(|(ix, byte)| buffer[ix] = *byte);

    Ok(dgram.map(|bytes| bytes.len()))
  }
}

/// Config implementor with tiny preallocated buffers, for exercising
/// the capacity-exhaustion paths
#[derive(Debug)]
pub struct TinyConfig;

impl crate::config::Config for TinyConfig {
  type PayloadBuffer = ArrayVec<[u8; 64]>;
  type OptBytes = ArrayVec<[u8; 16]>;
  type Opts = ArrayVec<[Opt<ArrayVec<[u8; 16]>>; 4]>;
  type Clock = ClockMock;
  type Socket = SockMock;
}
