use embedded_time::Instant;

/// A duration, in milliseconds
pub type Millis = embedded_time::duration::Milliseconds<u64>;

/// Supertrait of [`embedded_time::Clock`] pinning the
/// type of "ticks" to u64
pub trait Clock: embedded_time::Clock<T = u64> {}
impl<C: embedded_time::Clock<T = u64>> Clock for C {}

/// Milliseconds elapsed between two instants, saturating to zero
/// when `now` is before `start`.
pub fn elapsed<C: Clock>(start: &Instant<C>, now: &Instant<C>) -> Millis {
  now.checked_duration_since(start)
     .and_then(|d| Millis::try_from(d).ok())
     .unwrap_or(Millis::new(0))
}
