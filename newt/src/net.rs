use no_std_net::SocketAddr;
use tinyvec::ArrayVec;

/// Data that came from (or is going to) a network socket
#[derive(Debug, Clone, Copy)]
pub struct Addressed<T>(pub T, pub SocketAddr);

impl<T> Addressed<T> {
  /// Borrow the contents of this Addressed
  pub fn as_ref(&self) -> Addressed<&T> {
    Addressed(self.data(), self.addr())
  }

  /// Discard the socket and get the data in this Addressed
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addressed
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addressed<R> {
    Addressed(f(self.0), self.1)
  }

  /// Borrow the contents of the addressed item
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Copy the socket address for the data
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// A packet received over a socket.
///
/// Currently the capacity is hard-coded at 1152 bytes,
/// but this will eventually be configurable at compile-time.
pub type Dgram = ArrayVec<[u8; 1152]>;

/// A CoAP network socket
///
/// This mirrors the Udp socket traits in embedded-nal, but allows us to implement them for foreign types (like `std::net::UdpSocket`).
pub trait Socket: Sized {
  /// The error yielded by socket operations
  type Error: core::fmt::Debug;

  /// Bind a new socket to a local address
  ///
  /// The socket must behave non-blockingly afterwards: [`Socket::recv`]
  /// reports "nothing to read yet" with [`nb::Error::WouldBlock`],
  /// never by parking the caller.
  fn bind(addr: SocketAddr) -> Result<Self, Self::Error>;

  /// Send a message to a remote address
  fn send(&self, msg: Addressed<&[u8]>) -> nb::Result<(), Self::Error>;

  /// Pull a buffered datagram from the socket, along with the address of the sender.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addressed<usize>, Self::Error>;

  /// Release the socket.
  ///
  /// The default implementation just drops it.
  fn close(self) {}

  /// Poll the socket for a datagram, distinguishing "no data available"
  /// (`Ok(None)`) from I/O failure.
  fn poll(&self) -> Result<Option<Addressed<Dgram>>, Self::Error> {
    let mut buf = [0u8; 1152];
    let recvd = self.recv(&mut buf);

    match recvd {
      | Ok(Addressed(n, addr)) => Ok(Some(Addressed(buf.into_iter().take(n).collect(), addr))),
      | Err(nb::Error::WouldBlock) => Ok(None),
      | Err(nb::Error::Other(e)) => Err(e),
    }
  }
}
