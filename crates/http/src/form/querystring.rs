//! `application/x-www-form-urlencoded` parsing.
//!
//! Used for both URL query strings and urlencoded request bodies. The
//! grammar is forgiving: malformed percent escapes pass through literally,
//! pairs without `=` become empty-valued keys, and empty segments vanish.

use crate::form::lossless_utf8;

/// An order-preserving, case-sensitive multi-map of decoded pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap {
    items: Vec<(String, String)>,
}

impl QueryMap {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First value for the key, in insertion order.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// All values for the key, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.items.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|(k, _)| k == key)
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.push((key.into(), value.into()));
    }

    /// Replaces every value for the key with a single value, keeping the
    /// first occurrence's position; appends when the key is absent.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.items.iter().position(|(k, _)| k == &key) {
            Some(first) => {
                self.items.retain(|(k, _)| k != &key);
                self.items.insert(first, (key, value));
            }
            None => self.items.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for QueryMap {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        Self { items: iter.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect() }
    }
}

/// Parses a query string (without the leading `?`) into a [`QueryMap`].
/// Pairs separate on `&` or `;`.
pub fn parse_qs(query: &str) -> QueryMap {
    let mut map = QueryMap::new();
    for pair in query.split(['&', ';']) {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        map.append(decode_component(key), decode_component(value));
    }
    map
}

fn decode_component(input: &str) -> String {
    lossless_utf8(&percent_decode(input))
}

/// Percent-decodes one urlencoded component to raw bytes. `+` becomes a
/// space; a `%` not followed by two hex digits stays literal.
pub(crate) fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push((hi << 4) | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_pairs_in_order() {
        let map = parse_qs("a=1&b=2&a=3");
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.get_all("a"), vec!["1", "3"]);
        assert_eq!(map.get("b"), Some("2"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn plus_and_percent_escapes() {
        let map = parse_qs("name=John+Doe&city=S%C3%A3o%20Paulo");
        assert_eq!(map.get("name"), Some("John Doe"));
        assert_eq!(map.get("city"), Some("São Paulo"));
    }

    #[test]
    fn keys_are_decoded_too() {
        let map = parse_qs("a%20b=c");
        assert_eq!(map.get("a b"), Some("c"));
    }

    #[test]
    fn key_without_equals_gets_empty_value() {
        let map = parse_qs("flag&x=1");
        assert_eq!(map.get("flag"), Some(""));
        assert_eq!(map.get("x"), Some("1"));
    }

    #[test]
    fn empty_segments_skipped() {
        let map = parse_qs("&&a=1&&");
        assert_eq!(map.len(), 1);
        assert!(parse_qs("").is_empty());
    }

    #[test]
    fn semicolon_also_separates_pairs() {
        let map = parse_qs("a=1;b=2&c=3");
        assert_eq!(map.get("a"), Some("1"));
        assert_eq!(map.get("b"), Some("2"));
        assert_eq!(map.get("c"), Some("3"));
    }

    #[test]
    fn set_replaces_all_keeping_first_position() {
        let mut map = parse_qs("a=1&b=2&a=3");
        map.set("a", "9");
        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(pairs, vec![("a", "9"), ("b", "2")]);
    }

    #[test]
    fn malformed_escapes_pass_through() {
        let map = parse_qs("a=%zz&b=100%&c=%4");
        assert_eq!(map.get("a"), Some("%zz"));
        assert_eq!(map.get("b"), Some("100%"));
        assert_eq!(map.get("c"), Some("%4"));
    }

    #[test]
    fn invalid_utf8_preserved_as_escapes() {
        let map = parse_qs("raw=%FF%FE");
        assert_eq!(map.get("raw"), Some("%FF%FE"));
        // a valid multibyte sequence still decodes normally
        let map = parse_qs("ok=%C3%A9");
        assert_eq!(map.get("ok"), Some("é"));
    }

    #[test]
    fn case_sensitive_keys() {
        let map = parse_qs("Key=1&key=2");
        assert_eq!(map.get("Key"), Some("1"));
        assert_eq!(map.get("key"), Some("2"));
    }
}
