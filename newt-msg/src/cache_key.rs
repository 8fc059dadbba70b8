use core::fmt::Debug;
use core::hash::{Hash, Hasher};

use blake2::{Blake2s256, Digest};
use newt_common::{AppendCopy, Array};

use crate::{Message, OptList};

/// [`core::hash::Hasher`] implementation backed by the blake2 digest
#[derive(Clone, Debug, Default)]
pub struct Blake2Hasher(Blake2s256);

impl Hasher for Blake2Hasher {
  fn write(&mut self, bytes: &[u8]) {
    self.0.update(bytes)
  }

  fn finish(&self) -> u64 {
    let digest = self.0.clone().finalize();
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(word)
  }
}

/// Default hasher used for [`CacheKey`]
///
/// Hashes the message code plus every option the registry does not
/// mark NoCacheKey.
#[derive(Debug, Clone, Default)]
pub struct DefaultCacheKey(Blake2Hasher);

impl DefaultCacheKey {
  /// Create a new `DefaultCacheKey`
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheKey for DefaultCacheKey {
  type Hasher = Blake2Hasher;

  fn hasher(&mut self) -> &mut Self::Hasher {
    &mut self.0
  }

  fn add_cache_key<P, L>(&mut self, msg: &Message<P, L>)
    where P: Array<Item = u8> + AppendCopy<u8>,
          L: OptList
  {
    u8::from(msg.code).hash(&mut self.0);
    msg.opts.iter().for_each(|o| {
                     if o.number.include_in_cache_key() {
                       o.number.0.hash(&mut self.0);
                       o.value.hash(&mut self.0);
                     }
                   });
  }
}

/// The cache key can be used to compare messages for representing
/// the same action against the same resource; for example requests
/// with different IDs but the same method and cache-key affecting options
/// (ex. path, query parameters) will yield the same cache-key.
///
/// Extends [`core::hash::Hash`] with the ability to build a cache-key of a message
/// in the hasher's state.
///
/// [`DefaultCacheKey`] Provides a default implementation.
pub trait CacheKey
  where Self: Sized + Debug
{
  /// Type used to generate hashes
  type Hasher: Hasher;

  #[allow(missing_docs)]
  fn hasher(&mut self) -> &mut Self::Hasher;

  /// Add this message's cache key to the hasher's internal state.
  fn add_cache_key<P, L>(&mut self, msg: &Message<P, L>)
    where P: Array<Item = u8> + AppendCopy<u8>,
          L: OptList;

  /// Add this message's cache key to the hasher's internal state and yield the [`u64`] hash.
  fn cache_key<P, L>(mut self, msg: &Message<P, L>) -> u64
    where P: Array<Item = u8> + AppendCopy<u8>,
          L: OptList
  {
    self.add_cache_key(msg);
    self.hasher().finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Code, Id, Token, Type, VecMessage};

  fn get_time(id: u16) -> VecMessage {
    let mut msg = VecMessage::new(Type::Con, Code::GET, Id(id), Token::empty());
    msg.add_path_segment("time").unwrap();
    msg
  }

  #[test]
  fn same_action_same_key() {
    let a = DefaultCacheKey::new().cache_key(&get_time(1));
    let b = DefaultCacheKey::new().cache_key(&get_time(2));
    assert_eq!(a, b);
  }

  #[test]
  fn different_path_different_key() {
    let mut other = VecMessage::new(Type::Con, Code::GET, Id(1), Token::empty());
    other.add_path_segment("sensors").unwrap();

    let a = DefaultCacheKey::new().cache_key(&get_time(1));
    let b = DefaultCacheKey::new().cache_key(&other);
    assert_ne!(a, b);
  }

  #[test]
  fn no_cache_key_options_are_ignored() {
    use crate::{known, uint, OptValue};

    let mut with_size1 = get_time(1);
    with_size1.set(known::no_repeat::SIZE1,
                   OptValue(uint::encode(1024).into_iter().collect()))
              .unwrap();

    let a = DefaultCacheKey::new().cache_key(&get_time(1));
    let b = DefaultCacheKey::new().cache_key(&with_size1);
    assert_eq!(a, b);
  }

  #[test]
  fn size2_is_part_of_the_key() {
    use crate::{known, uint, OptValue};

    let mut with_size2 = get_time(1);
    with_size2.set(known::no_repeat::SIZE2,
                   OptValue(uint::encode(1024).into_iter().collect()))
              .unwrap();

    let a = DefaultCacheKey::new().cache_key(&get_time(1));
    let b = DefaultCacheKey::new().cache_key(&with_size2);
    assert_ne!(a, b);
  }
}
