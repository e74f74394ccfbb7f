//! Case-insensitive, order-preserving header multi-map.
//!
//! HTTP allows the same header name to appear multiple times and requires
//! case-insensitive name matching, while proxies and tests expect the original
//! spelling and ordering to survive a round trip. [`Headers`] therefore keeps
//! entries as an insertion-ordered list of `(name, value)` pairs and folds only
//! ASCII case when comparing names.
//!
//! The first-value/all-values distinction matters: `get` answers "what is the
//! Content-Length" style questions (first occurrence wins), while `get_all`
//! exposes every occurrence for headers like `Set-Cookie`.

use std::fmt;

/// An insertion-ordered multi-map of HTTP header names to values.
///
/// Names are matched case-insensitively (ASCII folding) but stored and
/// iterated with their original spelling.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    items: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Creates an empty header map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { items: Vec::with_capacity(capacity) }
    }

    /// Returns the number of entries, counting duplicates.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the first value for `name`, or `None` if absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// Returns every value for `name` in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.items.iter().filter(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Replaces every value for `name` with a single entry.
    ///
    /// The new entry takes the position of the first removed one, or is
    /// appended when `name` was absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.items.iter().position(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(pos) => {
                self.items.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
                self.items.insert(pos.min(self.items.len()), (name, value.into()));
            }
            None => self.items.push((name, value.into())),
        }
    }

    /// Appends another value for `name`, keeping existing entries.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.items.push((name.into(), value.into()));
    }

    /// Removes every value for `name`, returning how many entries were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        before - self.items.len()
    }

    /// Iterates entries as `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.items.iter().map(|(k, v)| (k, v))).finish()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        Self { items: iter.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect() }
    }
}
