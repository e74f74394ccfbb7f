//! Path-segment converters.
//!
//! A [`Converter`] parses one placeholder segment into a typed [`Value`]
//! and formats it back for URL building. Rejection is `None`, never an
//! error: a converter turning down a segment only eliminates one candidate
//! rule, and the match scan moves on.

use std::fmt;

use uuid::Uuid;

/// A typed value captured from (or substituted into) a path segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Uuid(Uuid),
}

impl Value {
    /// The string form as it would appear in a URL path.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(v) => {
                let s = v.to_string();
                if s.contains('.') { f.write_str(&s) } else { write!(f, "{s}.0") }
            }
            Self::Uuid(u) => write!(f, "{u}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

/// One segment parser/formatter. Constraint fields come from placeholder
/// arguments like `<int(fixed_digits=4):year>`.
#[derive(Debug, Clone, PartialEq)]
pub enum Converter {
    /// Non-empty run without `/`.
    Str { min_length: Option<usize>, max_length: Option<usize>, length: Option<usize> },
    /// Unsigned decimal digits only (no sign, no whitespace).
    Int { fixed_digits: Option<usize>, min: Option<i64>, max: Option<i64> },
    /// `digits.digits`, no sign or exponent.
    Float { min: Option<f64>, max: Option<f64> },
    /// Canonical 8-4-4-4-12 hex-dashed form.
    Uuid,
    /// Greedy: one or more remaining `/`-separated segments.
    Path,
    /// Exactly one of a closed set of literals.
    Any(Vec<String>),
}

impl Converter {
    /// The default converter for a bare `<name>` placeholder.
    pub fn string() -> Self {
        Self::Str { min_length: None, max_length: None, length: None }
    }

    /// Whether this converter consumes the rest of the path instead of a
    /// single segment.
    pub fn is_path(&self) -> bool {
        matches!(self, Self::Path)
    }

    /// Parses one captured piece of path, `None` meaning "this candidate
    /// rule does not apply".
    pub fn convert(&self, segment: &str) -> Option<Value> {
        match self {
            Self::Str { min_length, max_length, length } => {
                if segment.is_empty() || segment.contains('/') {
                    return None;
                }
                let n = segment.chars().count();
                if length.is_some_and(|exact| n != exact) {
                    return None;
                }
                if min_length.is_some_and(|min| n < min) || max_length.is_some_and(|max| n > max) {
                    return None;
                }
                Some(Value::Str(segment.to_owned()))
            }

            Self::Int { fixed_digits, min, max } => {
                if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                if fixed_digits.is_some_and(|width| segment.len() != width) {
                    return None;
                }
                let value: i64 = segment.parse().ok()?;
                if min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max) {
                    return None;
                }
                Some(Value::Int(value))
            }

            Self::Float { min, max } => {
                let (whole, frac) = segment.split_once('.')?;
                if whole.is_empty()
                    || frac.is_empty()
                    || !whole.bytes().all(|b| b.is_ascii_digit())
                    || !frac.bytes().all(|b| b.is_ascii_digit())
                {
                    return None;
                }
                let value: f64 = segment.parse().ok()?;
                if min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max) {
                    return None;
                }
                Some(Value::Float(value))
            }

            Self::Uuid => {
                if !is_canonical_uuid(segment) {
                    return None;
                }
                Uuid::parse_str(segment).ok().map(Value::Uuid)
            }

            Self::Path => {
                if segment.is_empty() {
                    return None;
                }
                Some(Value::Str(segment.to_owned()))
            }

            Self::Any(choices) => {
                if choices.iter().any(|c| c == segment) { Some(Value::Str(segment.to_owned())) } else { None }
            }
        }
    }

    /// Formats a value back into path text; `None` when the value does not
    /// fit this converter (wrong type or constraint violation).
    pub fn to_url(&self, value: &Value) -> Option<String> {
        match self {
            Self::Str { .. } => {
                let s = value.as_str()?;
                if s.is_empty() || s.contains('/') {
                    return None;
                }
                self.convert(s).map(|_| s.to_owned())
            }

            Self::Int { fixed_digits, .. } => {
                let n = value.as_int()?;
                let text = match *fixed_digits {
                    Some(width) => format!("{n:0width$}"),
                    None => n.to_string(),
                };
                self.convert(&text).map(|_| text)
            }

            Self::Float { .. } => {
                let text = value.as_float().map(|_| value.to_string())?;
                self.convert(&text).map(|_| text)
            }

            Self::Uuid => value.as_uuid().map(|u| u.to_string()),

            Self::Path => {
                let s = value.as_str()?;
                if s.is_empty() { None } else { Some(s.to_owned()) }
            }

            Self::Any(choices) => {
                let s = value.as_str()?;
                if choices.iter().any(|c| c == s) { Some(s.to_owned()) } else { None }
            }
        }
    }
}

/// Strict 8-4-4-4-12 layout check; the `uuid` crate alone would also accept
/// simple and braced forms.
fn is_canonical_uuid(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    if bytes.len() != 36 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}
