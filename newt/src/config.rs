use core::fmt::Debug;

use newt_common::{AppendCopy, Array};
use newt_msg::Opt;
use rand::Rng;
#[cfg(feature = "alloc")]
use std_alloc::vec::Vec;

use crate::net::Socket;
use crate::time::{Clock, Millis};

/// `newt` configuration trait: picks the concrete collections, clock
/// and socket a runtime instance is built from.
///
/// The "preallocated everything" and "heap everything" flavors are two
/// implementors of this trait, not two codebases.
pub trait Config: Sized + 'static + Debug {
  /// What type should we use to store message payloads?
  type PayloadBuffer: Array<Item = u8> + AppendCopy<u8> + Clone + Debug;

  /// What type should we use to store option values?
  type OptBytes: Array<Item = u8> + AppendCopy<u8> + Clone + Debug + 'static;

  /// What type should we use to store the option list?
  type Opts: Array<Item = Opt<Self::OptBytes>> + Clone + Debug;

  /// What should we use to keep track of time?
  type Clock: Clock;

  /// What should we use for networking?
  type Socket: Socket;
}

/// Type alias using Config instead of explicit type parameters for [`newt_msg::Message`]
pub type Message<Cfg> =
  newt_msg::Message<<Cfg as Config>::PayloadBuffer, <Cfg as Config>::Opts>;

/// Configures `newt` to use `Vec` for collections
#[cfg(feature = "alloc")]
pub struct Alloc<Clk, Sock>(core::marker::PhantomData<(Clk, Sock)>)
  where Clk: Clock + 'static,
        Sock: Socket + 'static;

#[cfg(feature = "alloc")]
impl<Clk: Clock + 'static, Sock: Socket + 'static> Debug for Alloc<Clk, Sock> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "Alloc::<_, _>(_)")
  }
}

#[cfg(feature = "alloc")]
impl<Clk: Clock + 'static, Sock: Socket + 'static> Clone for Alloc<Clk, Sock> {
  fn clone(&self) -> Self {
    Self(Default::default())
  }
}

#[cfg(feature = "alloc")]
impl<Clk: Clock + 'static, Sock: Socket + 'static> Config for Alloc<Clk, Sock> {
  type PayloadBuffer = Vec<u8>;
  type OptBytes = Vec<u8>;
  type Opts = Vec<Opt<Vec<u8>>>;
  type Clock = Clk;
  type Socket = Sock;
}

/// Configures `newt` to use `Vec` for collections,
/// `UdpSocket` for networking,
/// and [`crate::std::Clock`] for timing
#[cfg(feature = "std")]
pub type Std = Alloc<crate::std::Clock, ::std::net::UdpSocket>;

/// Transmission parameters (RFC7252 section 4.8)
///
/// `ack_random_factor` is expressed in percent to keep the arithmetic
/// integral: the default 1.5 is `150`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
  /// ACK_TIMEOUT. Default 2 seconds
  pub ack_timeout: Millis,
  /// ACK_RANDOM_FACTOR × 100. Default 150
  pub ack_random_factor_percent: u16,
  /// MAX_RETRANSMIT. Default 4
  pub max_retransmit: u16,
}

impl Default for Params {
  fn default() -> Self {
    Self { ack_timeout: Millis::new(2000),
           ack_random_factor_percent: 150,
           max_retransmit: 4 }
  }
}

impl Params {
  /// The initial retransmission timeout for one exchange:
  /// `ACK_TIMEOUT × U[1, ACK_RANDOM_FACTOR)`
  pub fn initial_timeout(&self, rng: &mut impl Rng) -> Millis {
    let spread = self.ack_random_factor_percent.saturating_sub(100) as u64;
    let jitter = match spread {
      | 0 => 0,
      | s => rng.gen_range(0..s),
    };

    Millis::new(self.ack_timeout.0 * (100 + jitter) / 100)
  }

  /// MAX_TRANSMIT_SPAN: `ACK_TIMEOUT × (2^MAX_RETRANSMIT − 1) × ACK_RANDOM_FACTOR`
  pub fn max_transmit_span(&self) -> Millis {
    Millis::new(self.ack_timeout.0 * ((1u64 << self.max_retransmit.min(63)) - 1)
           * self.ack_random_factor_percent as u64
           / 100)
  }

  /// MAX_TRANSMIT_WAIT: `ACK_TIMEOUT × (2^(MAX_RETRANSMIT+1) − 1) × ACK_RANDOM_FACTOR`
  pub fn max_transmit_wait(&self) -> Millis {
    Millis::new(self.ack_timeout.0 * ((1u64 << (self.max_retransmit.min(62) + 1)) - 1)
           * self.ack_random_factor_percent as u64
           / 100)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rfc7252_derived_quantities() {
    let params = Params::default();
    assert_eq!(params.max_transmit_span(), Millis::new(45_000));
    assert_eq!(params.max_transmit_wait(), Millis::new(93_000));
  }

  #[test]
  fn initial_timeout_within_bounds() {
    let params = Params::default();
    let mut rng = rand::rngs::mock::StepRng::new(0, 1);

    for _ in 0..32 {
      let t = params.initial_timeout(&mut rng);
      assert!(t >= Millis::new(2000) && t < Millis::new(3000), "timeout {:?}", t);
    }
  }

  #[test]
  fn no_jitter_when_factor_is_one() {
    let params = Params { ack_timeout: Millis::new(1000),
                          ack_random_factor_percent: 100,
                          max_retransmit: 2 };
    let mut rng = rand::rngs::mock::StepRng::new(0, 1);
    assert_eq!(params.initial_timeout(&mut rng), Millis::new(1000));
  }
}
