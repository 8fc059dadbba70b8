use crate::net::{Addressed, Socket};

/// Copy a `no_std_net` address into its `std::net` counterpart
pub fn std_addr(addr: no_std_net::SocketAddr) -> std::net::SocketAddr {
  use no_std_net::SocketAddr::*;

  match addr {
    | V4(a) => {
      let ip = std::net::Ipv4Addr::from(a.ip().octets());
      std::net::SocketAddr::V4(std::net::SocketAddrV4::new(ip, a.port()))
    },
    | V6(a) => {
      let ip = std::net::Ipv6Addr::from(a.ip().octets());
      std::net::SocketAddr::V6(std::net::SocketAddrV6::new(ip, a.port(), 0, 0))
    },
  }
}

/// Copy a `std::net` address into its `no_std_net` counterpart
pub fn no_std_addr(addr: std::net::SocketAddr) -> no_std_net::SocketAddr {
  use std::net::SocketAddr::*;

  match addr {
    | V4(a) => {
      let ip = no_std_net::Ipv4Addr::from(a.ip().octets());
      no_std_net::SocketAddr::V4(no_std_net::SocketAddrV4::new(ip, a.port()))
    },
    | V6(a) => {
      let ip = no_std_net::Ipv6Addr::from(a.ip().octets());
      no_std_net::SocketAddr::V6(no_std_net::SocketAddrV6::new(ip, a.port(), 0, 0))
    },
  }
}

impl Socket for std::net::UdpSocket {
  type Error = std::io::Error;

  fn bind(addr: no_std_net::SocketAddr) -> Result<Self, Self::Error> {
    let sock = std::net::UdpSocket::bind(std_addr(addr))?;
    sock.set_nonblocking(true)?;
    Ok(sock)
  }

  fn send(&self, msg: Addressed<&[u8]>) -> nb::Result<(), Self::Error> {
    let Addressed(bytes, addr) = msg;

    self.send_to(bytes, std_addr(addr))
        .map(|_| ())
        .map_err(|e| match e.kind() {
          | std::io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
          | _ => nb::Error::Other(e),
        })
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addressed<usize>, Self::Error> {
    self.recv_from(buffer)
        .map(|(n, addr)| Addressed(n, no_std_addr(addr)))
        .map_err(|e| match e.kind() {
          | std::io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
          | _ => nb::Error::Other(e),
        })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn addr_conversions_roundtrip() {
    let v4: std::net::SocketAddr = "1.2.3.4:5683".parse().unwrap();
    assert_eq!(std_addr(no_std_addr(v4)), v4);

    let v6: std::net::SocketAddr = "[::1]:5684".parse().unwrap();
    assert_eq!(std_addr(no_std_addr(v6)), v6);
  }
}
