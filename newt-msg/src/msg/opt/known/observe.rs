/// Value of the Observe option on requests (RFC 7641)
///
/// On responses the option instead carries a sequence number used to
/// order notifications, which this library surfaces as a plain uint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
  /// Add this client to the list of observers of the resource (0)
  Register,
  /// Remove this client from the list of observers (1)
  Deregister,
}

impl Action {
  /// Interpret an option value byte as an Action
  pub fn from_byte(b: u8) -> Option<Self> {
    match b {
      | 0 => Some(Self::Register),
      | 1 => Some(Self::Deregister),
      | _ => None,
    }
  }
}

impl From<Action> for u8 {
  fn from(a: Action) -> u8 {
    match a {
      | Action::Register => 0,
      | Action::Deregister => 1,
    }
  }
}
