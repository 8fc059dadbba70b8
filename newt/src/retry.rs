use embedded_time::Instant;

use crate::time::{elapsed, Clock, Millis};

/// A non-blocking timer that allows a fixed-delay or exponential-backoff retry,
/// that lives alongside some operation to retry.
///
/// It does not _contain_ the work to be done (e.g. `Box<fn()>`) because
/// we don't have the luxury of a memory allocator :)
///
/// The timer does not own a clock either; the caller samples time and
/// passes it in, so that a pool of timers shares one clock.
pub struct RetryTimer<C: Clock> {
  start: Instant<C>,
  strategy: Strategy,
  attempts: Attempts,
  max_attempts: Attempts,
}

impl<C: Clock> Clone for RetryTimer<C> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<C: Clock> Copy for RetryTimer<C> {}

impl<C: Clock> core::fmt::Debug for RetryTimer<C> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RetryTimer")
     .field("strategy", &self.strategy)
     .field("attempts", &self.attempts)
     .field("max_attempts", &self.max_attempts)
     .finish_non_exhaustive()
  }
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Attempts(pub u16);

/// What the retrier thinks of the situation
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum YouShould {
  /// Attempts have been exhausted and the work that is
  /// being retried should be considered poisoned.
  Cry,
  /// A retry should be performed
  Retry,
}

impl<C: Clock> RetryTimer<C> {
  /// Create a new retrier
  pub fn new(now: Instant<C>, strategy: Strategy, max_attempts: Attempts) -> Self {
    Self { start: now,
           strategy,
           max_attempts,
           attempts: Attempts(1) }
  }

  /// Ask the retrier if we should retry.
  ///
  /// Exhaustion ([`YouShould::Cry`]) is reported when the expiry
  /// *after* the final attempt passes, so the final attempt gets its
  /// full window to succeed before the work is poisoned.
  pub fn what_should_i_do(&mut self, now: Instant<C>) -> nb::Result<YouShould, core::convert::Infallible> {
    if !self.strategy
            .is_ready(elapsed(&self.start, &now), self.attempts.0)
    {
      return Err(nb::Error::WouldBlock);
    }

    if self.attempts >= self.max_attempts {
      Ok(YouShould::Cry)
    } else {
      self.attempts.0 += 1;
      Ok(YouShould::Retry)
    }
  }

  /// How many attempts have been made so far
  pub fn attempts(&self) -> Attempts {
    self.attempts
  }

  /// How many attempts are left before the work is poisoned
  pub fn attempts_remaining(&self) -> u16 {
    self.max_attempts.0.saturating_sub(self.attempts.0)
  }
}

/// Strategy to employ when retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Schedule attempt `k` (1-indexed) at `delay * 2^(k-1)` after the
  /// work started, doubling the gap between consecutive attempts.
  ///
  /// This is the confirmable-message retransmission schedule of
  /// RFC7252 section 4.2.
  Exponential(Millis),
  /// Wait a fixed delay between attempts.
  Delay(Millis),
}

impl Strategy {
  /// Check if the strategy says an appropriate time has passed
  pub fn is_ready(&self, time_passed: Millis, attempts: u16) -> bool {
    if attempts == 0 {
      return true;
    }

    match self {
      | Self::Delay(dur) => time_passed.0 >= (dur.0 * attempts as u64),
      | Self::Exponential(dur) => time_passed.0 >= Self::expiry_exp(*dur, attempts),
    }
  }

  fn expiry_exp(init: Millis, attempts: u16) -> u64 {
    init.0 << (attempts - 1).min(63)
  }
}

#[cfg(test)]
mod test {
  use embedded_time::rate::Fraction;

  use super::*;

  pub struct FakeClock;

  impl embedded_time::Clock for FakeClock {
    type T = u64;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1000);

    fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
      Ok(Instant::new(0))
    }
  }

  fn at(millis: u64) -> Instant<FakeClock> {
    Instant::new(millis)
  }

  #[test]
  fn retrier() {
    let mut retry =
      RetryTimer::new(at(0), Strategy::Delay(Millis::new(1000)), Attempts(5));

    assert_eq!(retry.what_should_i_do(at(999)).unwrap_err(), nb::Error::WouldBlock);
    assert_eq!(retry.what_should_i_do(at(1000)).unwrap(), YouShould::Retry); // Attempt 2

    assert_eq!(retry.what_should_i_do(at(1999)).unwrap_err(), nb::Error::WouldBlock);
    assert_eq!(retry.what_should_i_do(at(2000)).unwrap(), YouShould::Retry); // Attempt 3

    assert_eq!(retry.what_should_i_do(at(10_000)).unwrap(), YouShould::Retry); // Attempt 4
    assert_eq!(retry.what_should_i_do(at(10_000)).unwrap(), YouShould::Retry); // Attempt 5
    assert_eq!(retry.what_should_i_do(at(10_000)).unwrap(), YouShould::Cry); // Attempt 6
  }

  #[test]
  fn delay_waits() {
    let strat = Strategy::Delay(Millis::new(100));

    assert!(strat.is_ready(Millis::new(0), 0));

    assert!(!strat.is_ready(Millis::new(99), 1));
    assert!(strat.is_ready(Millis::new(100), 1));

    assert!(!strat.is_ready(Millis::new(199), 2));
    assert!(strat.is_ready(Millis::new(200), 2));
  }

  #[test]
  fn exp_expiries_double() {
    let init = Millis::new(100);
    assert_eq!(Strategy::expiry_exp(init, 1), 100);
    assert_eq!(Strategy::expiry_exp(init, 2), 200);
    assert_eq!(Strategy::expiry_exp(init, 3), 400);
  }

  #[test]
  fn exp_waits() {
    let strat = Strategy::Exponential(Millis::new(100));

    assert!(strat.is_ready(Millis::new(0), 0));

    assert!(!strat.is_ready(Millis::new(99), 1));
    assert!(strat.is_ready(Millis::new(100), 1));

    assert!(!strat.is_ready(Millis::new(199), 2));
    assert!(strat.is_ready(Millis::new(200), 2));

    assert!(!strat.is_ready(Millis::new(399), 3));
    assert!(strat.is_ready(Millis::new(400), 3));
  }
}
