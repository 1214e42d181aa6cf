use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{BuildHasher, Hash, Hasher};
use std::ops::Deref;

use siphasher::sip128::{Hasher128, SipHasher13};

/// The cache key derived from a call's arguments.
///
/// This is the comma-joined string coercion of every argument. Arguments
/// with the same coercion share a signature even if their types differ, so
/// `(1, 2)` and `("1", "2")` hit the same cache entry.
///
/// The string's 128-bit hash is computed once up front. Equality still
/// compares the full string, the hash only feeds the terminal table.
#[derive(Clone)]
pub struct Signature {
    /// The precomputed hash.
    hash: u128,
    /// The joined arguments.
    text: Box<str>,
}

impl Signature {
    /// Hash a joined argument string and wrap it.
    pub fn new(text: impl Into<Box<str>>) -> Self {
        let text = text.into();
        Self { hash: hash(&text), text }
    }

    /// The joined argument string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Deref for Signature {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.text
    }
}

impl Hash for Signature {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u128(self.hash);
    }
}

impl Eq for Signature {}

impl PartialEq for Signature {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.text == other.text
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.text, f)
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad(&self.text)
    }
}

/// Produce a 128-bit hash of a value.
#[inline]
fn hash<T: Hash + ?Sized>(value: &T) -> u128 {
    let mut state = SipHasher13::new();
    value.hash(&mut state);
    state.finish128().as_u128()
}

/// Hash map that re-uses a signature's precomputed hash.
pub(crate) type SignatureMap<V> = HashMap<Signature, V, BuildPassthroughHasher>;

#[derive(Copy, Clone, Default)]
pub(crate) struct BuildPassthroughHasher;

#[derive(Default)]
pub(crate) struct PassthroughHasher {
    value: u64,
}

impl Hasher for PassthroughHasher {
    #[inline(always)]
    fn finish(&self) -> u64 {
        self.value
    }

    #[inline]
    fn write(&mut self, _bytes: &[u8]) {
        unimplemented!("signatures only write their precomputed hash")
    }

    #[inline]
    fn write_u128(&mut self, i: u128) {
        // truncating conversion
        self.value = i as u64;
    }
}

impl BuildHasher for BuildPassthroughHasher {
    type Hasher = PassthroughHasher;

    #[inline]
    fn build_hasher(&self) -> PassthroughHasher {
        PassthroughHasher::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_text_is_equal_signature() {
        assert_eq!(Signature::new("s1"), Signature::new(String::from("s1")));
        assert_ne!(Signature::new("s1"), Signature::new("s2"));
    }

    #[test]
    fn test_map_lookup() {
        let mut map = SignatureMap::default();
        map.insert(Signature::new("1,2"), 3);
        assert_eq!(map.get(&Signature::new("1,2")), Some(&3));
        assert_eq!(map.get(&Signature::new("12")), None);
    }
}
