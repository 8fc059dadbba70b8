use tinyvec::ArrayVec;

/// Message token for matching requests to responses
///
/// Note that this is different from [`Id`](super::Id),
/// which uniquely identifies a message that may be retransmitted.
///
/// For example, Client may send a confirmable message with id 1 and token 321
/// to Server multiple times,
/// then Server confirms and sends a response
/// with a different id (because it's a different message),
/// but token 321 (so the client knows which request the response is responding to)
///
/// See [RFC7252 - Message Details](https://datatracker.ietf.org/doc/html/rfc7252#section-3) for context
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Eq, Ord, Debug, Default)]
pub struct Token(pub ArrayVec<[u8; 8]>);

/// Error yielded when creating a [`Token`] from more than 8 bytes of data
#[derive(Copy, Clone, Hash, PartialEq, PartialOrd, Eq, Ord, Debug)]
pub struct TokenTooLong(pub usize);

impl Token {
  /// The zero-length token used by empty messages
  pub fn empty() -> Self {
    Token(Default::default())
  }

  /// Length of the token, in bytes
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Whether this is the zero-length token
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<'a> TryFrom<&'a [u8]> for Token {
  type Error = TokenTooLong;

  fn try_from(bytes: &'a [u8]) -> Result<Self, Self::Error> {
    if bytes.len() > 8 {
      Err(TokenTooLong(bytes.len()))
    } else {
      Ok(Token(bytes.iter().copied().collect()))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_len_bounds() {
    assert_eq!(Token::try_from(&[][..]), Ok(Token::empty()));
    assert!(Token::try_from(&[0u8; 1][..]).is_ok());
    assert!(Token::try_from(&[0u8; 8][..]).is_ok());
    assert_eq!(Token::try_from(&[0u8; 9][..]), Err(TokenTooLong(9)));
  }
}
