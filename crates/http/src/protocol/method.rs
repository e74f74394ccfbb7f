//! HTTP method representation optimized for route matching.
//!
//! The eight common verbs are mapped onto a fixed bitmask so that per-rule
//! membership checks and the 405 allowed-set union are single integer ops on
//! the matching hot path. Anything else (WebDAV verbs, custom extensions) is
//! carried as an uppercased string and checked by linear scan in the small
//! auxiliary list of a [`MethodSet`].

use std::fmt;

const GET: u16 = 1 << 0;
const HEAD: u16 = 1 << 1;
const POST: u16 = 1 << 2;
const PUT: u16 = 1 << 3;
const DELETE: u16 = 1 << 4;
const PATCH: u16 = 1 << 5;
const OPTIONS: u16 = 1 << 6;
const TRACE: u16 = 1 << 7;

const KNOWN: [(u16, &str); 8] = [
    (GET, "GET"),
    (HEAD, "HEAD"),
    (POST, "POST"),
    (PUT, "PUT"),
    (DELETE, "DELETE"),
    (PATCH, "PATCH"),
    (OPTIONS, "OPTIONS"),
    (TRACE, "TRACE"),
];

/// An HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Trace,
    /// Any verb outside the eight common ones, stored uppercased.
    Extension(String),
}

impl Method {
    /// Parses a method token, folding ASCII case.
    pub fn parse(token: &str) -> Method {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "PATCH" => Method::Patch,
            "OPTIONS" => Method::Options,
            "TRACE" => Method::Trace,
            other => Method::Extension(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Extension(s) => s,
        }
    }

    fn bit(&self) -> Option<u16> {
        match self {
            Method::Get => Some(GET),
            Method::Head => Some(HEAD),
            Method::Post => Some(POST),
            Method::Put => Some(PUT),
            Method::Delete => Some(DELETE),
            Method::Patch => Some(PATCH),
            Method::Options => Some(OPTIONS),
            Method::Trace => Some(TRACE),
            Method::Extension(_) => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of HTTP methods: a bitmask for the common verbs plus an auxiliary
/// list for extension verbs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet {
    mask: u16,
    extra: Vec<String>,
}

impl MethodSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0 && self.extra.is_empty()
    }

    pub fn insert(&mut self, method: &Method) {
        match method.bit() {
            Some(bit) => self.mask |= bit,
            None => {
                let name = method.as_str();
                if !self.extra.iter().any(|m| m == name) {
                    self.extra.push(name.to_owned());
                }
            }
        }
    }

    pub fn remove(&mut self, method: &Method) {
        match method.bit() {
            Some(bit) => self.mask &= !bit,
            None => self.extra.retain(|m| m != method.as_str()),
        }
    }

    pub fn contains(&self, method: &Method) -> bool {
        match method.bit() {
            Some(bit) => self.mask & bit != 0,
            None => self.extra.iter().any(|m| m == method.as_str()),
        }
    }

    /// Merges `other` into `self`.
    pub fn union_with(&mut self, other: &MethodSet) {
        self.mask |= other.mask;
        for name in &other.extra {
            if !self.extra.iter().any(|m| m == name) {
                self.extra.push(name.clone());
            }
        }
    }

    /// Lists the contained methods, common verbs first in canonical order.
    pub fn methods(&self) -> Vec<Method> {
        let mut out: Vec<Method> =
            KNOWN.iter().filter(|(bit, _)| self.mask & bit != 0).map(|(_, name)| Method::parse(name)).collect();
        let mut extra = self.extra.clone();
        extra.sort();
        out.extend(extra.into_iter().map(Method::Extension));
        out
    }

    /// Renders the set as an `Allow` header value, e.g. `"GET, HEAD, OPTIONS"`.
    pub fn to_allow_header(&self) -> String {
        self.methods().iter().map(Method::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl<'a> FromIterator<&'a Method> for MethodSet {
    fn from_iter<T: IntoIterator<Item = &'a Method>>(iter: T) -> Self {
        let mut set = MethodSet::new();
        for method in iter {
            set.insert(method);
        }
        set
    }
}
