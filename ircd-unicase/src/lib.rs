//! A minimal ASCII case-insensitive string wrapper.
//!
//! Nickname and channel name comparisons in this project always fold ASCII
//! case, never locale-dependent case (RFC 2812 §2.2). `UniCase` wraps any
//! `AsRef<str>` and implements `Eq`/`Hash`/`Ord` by comparing the ASCII
//! lower-cased bytes, so it can be used directly as a `HashMap` key while the
//! original, first-registered casing stays intact inside the wrapper.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default)]
pub struct UniCase<S>(S);

impl<S> UniCase<S> {
    pub fn new(s: S) -> Self {
        UniCase(s)
    }

    pub fn into_inner(self) -> S {
        self.0
    }
}

impl<S: AsRef<str>> UniCase<S> {
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }
}

impl<S: AsRef<str>> Deref for UniCase<S> {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.as_ref()
    }
}

impl<S: AsRef<str>> PartialEq for UniCase<S> {
    fn eq(&self, other: &Self) -> bool {
        eq_ascii_ignore_case(self.0.as_ref(), other.0.as_ref())
    }
}

impl<S: AsRef<str>> Eq for UniCase<S> {}

impl<S: AsRef<str>> PartialOrd for UniCase<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S: AsRef<str>> Ord for UniCase<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.0.as_ref().bytes().map(to_ascii_lower);
        let b = other.0.as_ref().bytes().map(to_ascii_lower);
        a.cmp(b)
    }
}

impl<S: AsRef<str>> Hash for UniCase<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.as_ref().bytes() {
            state.write_u8(to_ascii_lower(b));
        }
    }
}

impl<S: AsRef<str>> fmt::Display for UniCase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_ref())
    }
}

impl<'a> From<&'a str> for &'a UniCase<str> {
    fn from(s: &'a str) -> Self {
        // `UniCase<str>` has the same layout as `str`: a transparent wrapper
        // over an unsized field is representation-compatible with its inner
        // type, so reborrowing as `&UniCase<str>` is sound.
        unsafe { &*(s as *const str as *const UniCase<str>) }
    }
}

impl Borrow<UniCase<str>> for UniCase<String> {
    fn borrow(&self) -> &UniCase<str> {
        self.0.as_str().into()
    }
}

fn to_ascii_lower(b: u8) -> u8 {
    if b.is_ascii_uppercase() {
        b + 32
    } else {
        b
    }
}

fn eq_ascii_ignore_case(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a.bytes().zip(b.bytes()).all(|(x, y)| to_ascii_lower(x) == to_ascii_lower(y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn equal_ignoring_case() {
        assert_eq!(UniCase::new("Alice"), UniCase::new("ALICE"));
        assert_eq!(UniCase::new("#Room"), UniCase::new("#room"));
        assert_ne!(UniCase::new("Alice"), UniCase::new("Alicia"));
    }

    #[test]
    fn usable_as_hashmap_key_with_borrowed_lookup() {
        let mut map: HashMap<UniCase<String>, i32> = HashMap::new();
        map.insert(UniCase::new("Alice".to_owned()), 1);
        assert_eq!(map.get(<&UniCase<str>>::from("alice")), Some(&1));
        assert_eq!(map.get(<&UniCase<str>>::from("ALICE")), Some(&1));
        assert_eq!(map.get(<&UniCase<str>>::from("bob")), None);
    }

    #[test]
    fn preserves_original_casing() {
        let u = UniCase::new("AlicE".to_owned());
        assert_eq!(u.as_str(), "AlicE");
    }
}
