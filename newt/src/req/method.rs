use newt_msg::Code;

/// Request methods a resource can handle
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
  /// 0.01
  Get,
  /// 0.02
  Post,
  /// 0.03
  Put,
  /// 0.04
  Delete,
  /// 0.05 (RFC 8132)
  Fetch,
  /// 0.06 (RFC 8132)
  Patch,
  /// 0.07 (RFC 8132)
  IPatch,
}

/// All methods, in code order
pub const METHODS: [Method; 7] = [Method::Get,
                                  Method::Post,
                                  Method::Put,
                                  Method::Delete,
                                  Method::Fetch,
                                  Method::Patch,
                                  Method::IPatch];

impl Method {
  /// The message code for this method
  pub fn code(&self) -> Code {
    use Method::*;

    match self {
      | Get => Code::GET,
      | Post => Code::POST,
      | Put => Code::PUT,
      | Delete => Code::DELETE,
      | Fetch => Code::FETCH,
      | Patch => Code::PATCH,
      | IPatch => Code::IPATCH,
    }
  }

  /// Interpret a message code as a method
  pub fn from_code(code: Code) -> Option<Self> {
    use Method::*;

    match (code.class, code.detail) {
      | (0, 1) => Some(Get),
      | (0, 2) => Some(Post),
      | (0, 3) => Some(Put),
      | (0, 4) => Some(Delete),
      | (0, 5) => Some(Fetch),
      | (0, 6) => Some(Patch),
      | (0, 7) => Some(IPatch),
      | _ => None,
    }
  }

  /// Index into a per-method handler table
  pub(crate) fn ix(&self) -> usize {
    use Method::*;

    match self {
      | Get => 0,
      | Post => 1,
      | Put => 2,
      | Delete => 3,
      | Fetch => 4,
      | Patch => 5,
      | IPatch => 6,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_roundtrip() {
    for m in METHODS {
      assert_eq!(Method::from_code(m.code()), Some(m));
    }

    assert_eq!(Method::from_code(Code::EMPTY), None);
    assert_eq!(Method::from_code(Code::CONTENT), None);
  }
}
