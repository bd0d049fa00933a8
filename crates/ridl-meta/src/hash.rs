//! Selector hashing
//!
//! The one-at-a-time byte hash (public domain, cf.
//! http://burtleburtle.net/bob/hash/doobs.html). Producer and consumer
//! sides are compiled separately and must agree on every selector, so
//! the function depends only on the selector bytes. The empty selector
//! (the unnamed indexed-property slot) hashes to 0.

use rustc_hash::FxHashMap;

/// Hash a selector string to its 32-bit dispatch key.
pub fn one_at_a_time(key: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &byte in key {
        hash = hash.wrapping_add(byte as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash = hash.wrapping_add(hash << 15);
    hash
}

/// Collision bookkeeping across one compilation. Two distinct selector
/// names mapping to one hash is a known limitation: it is reported, not
/// masked.
#[derive(Default)]
pub struct HashTable {
    seen: FxHashMap<u32, String>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`; returns the previously seen, different name when
    /// the hash collides.
    pub fn check(&mut self, hash: u32, name: &str) -> Option<String> {
        match self.seen.get(&hash) {
            Some(existing) if existing != name => Some(existing.clone()),
            Some(_) => None,
            None => {
                self.seen.insert(hash, name.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(one_at_a_time(b"createElement"), one_at_a_time(b"createElement"));
        assert_eq!(one_at_a_time(b""), 0);
    }

    #[test]
    fn test_distinct_names_distinct_hashes() {
        // The standard corpus of member names must stay collision-free.
        let corpus = [
            "item",
            "length",
            "createElement",
            "createInstance",
            "appendChild",
            "removeChild",
            "getElementById",
            "addEventListener",
            "bar",
            "baz",
            "op",
        ];
        let mut table = HashTable::new();
        for name in corpus {
            assert_eq!(table.check(one_at_a_time(name.as_bytes()), name), None);
        }
    }

    #[test]
    fn test_collision_is_reported_once_detected() {
        let mut table = HashTable::new();
        assert_eq!(table.check(7, "first"), None);
        assert_eq!(table.check(7, "first"), None);
        assert_eq!(table.check(7, "second"), Some("first".to_string()));
    }
}
