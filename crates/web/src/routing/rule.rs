//! Route rules: compiled URL patterns.
//!
//! A pattern like `/user/<int:id>/post/<name>` compiles into an alternating
//! trace of literal text and named placeholders. Placeholders take an
//! optional converter (`<name>` defaults to `string`) and converter
//! arguments: `<int(fixed_digits=4):year>`, `<any(json, xml):format>`,
//! `<string(length=2):country>`.

use std::collections::HashMap;

use carafe_http::protocol::{Method, MethodSet};
use thiserror::Error;

use crate::routing::converters::{Converter, Value};

/// Captured placeholder values from a successful match.
pub type Captures = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder { name: String, converter: Converter },
}

/// A pattern rejected at compile time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("pattern must start with '/': {pattern:?}")]
    LeadingSlash { pattern: String },

    #[error("unterminated placeholder in pattern: {pattern:?}")]
    UnterminatedPlaceholder { pattern: String },

    #[error("unknown converter: {name:?}")]
    UnknownConverter { name: String },

    #[error("invalid converter argument: {argument:?}")]
    InvalidArgument { argument: String },

    #[error("invalid parameter name: {name:?}")]
    InvalidParameterName { name: String },

    #[error("duplicate parameter name: {name:?}")]
    DuplicateParameter { name: String },

    #[error("a path placeholder must end the pattern")]
    PathNotLast,
}

/// One compiled route: pattern, endpoint name, allowed methods, slash
/// policy. Immutable once built.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: String,
    endpoint: String,
    trace: Vec<Segment>,
    methods: MethodSet,
    strict_slashes: bool,
    suppress_options: bool,
}

impl Rule {
    pub fn builder(pattern: impl Into<String>, endpoint: impl Into<String>) -> RuleBuilder {
        RuleBuilder {
            pattern: pattern.into(),
            endpoint: endpoint.into(),
            methods: Vec::new(),
            strict_slashes: true,
            suppress_options: false,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// True when the pattern has no placeholders (an exact literal path).
    pub fn is_static(&self) -> bool {
        self.trace.iter().all(|s| matches!(s, Segment::Literal(_)))
    }

    pub fn strict_slashes(&self) -> bool {
        self.strict_slashes
    }

    /// The full allowed-method set: the explicit methods plus HEAD when GET
    /// is present, plus OPTIONS unless suppressed.
    pub fn allowed_methods(&self) -> MethodSet {
        let mut allowed = self.methods.clone();
        if allowed.contains(&Method::Get) {
            allowed.insert(&Method::Head);
        }
        if !self.suppress_options {
            allowed.insert(&Method::Options);
        }
        allowed
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.allowed_methods().contains(method)
    }

    /// Structural match of a request path against this pattern. Trailing
    /// slash policy is not applied here; the matcher owns that.
    pub fn matches(&self, path: &str) -> Option<Captures> {
        let mut values = Captures::new();
        let mut rest = path;

        for (idx, segment) in self.trace.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    rest = rest.strip_prefix(lit.as_str())?;
                }
                Segment::Placeholder { name, converter } if converter.is_path() => {
                    // greedy: everything left, minus any trailing literal text
                    let suffix: String = self.trace[idx + 1..]
                        .iter()
                        .map(|s| match s {
                            Segment::Literal(lit) => lit.as_str(),
                            Segment::Placeholder { .. } => "",
                        })
                        .collect();
                    let capture = rest.strip_suffix(suffix.as_str())?;
                    values.insert(name.clone(), converter.convert(capture)?);
                    return Some(values);
                }
                Segment::Placeholder { name, converter } => {
                    let end = rest.find('/').unwrap_or(rest.len());
                    values.insert(name.clone(), converter.convert(&rest[..end])?);
                    rest = &rest[end..];
                }
            }
        }

        if rest.is_empty() { Some(values) } else { None }
    }

    /// The inverse of [`matches`](Self::matches): substitutes values into
    /// the pattern. `None` when a value is missing or rejected by its
    /// converter.
    pub fn build(&self, values: &Captures) -> Option<String> {
        let mut out = String::with_capacity(self.pattern.len());
        for segment in &self.trace {
            match segment {
                Segment::Literal(lit) => out.push_str(lit),
                Segment::Placeholder { name, converter } => {
                    out.push_str(&converter.to_url(values.get(name)?)?);
                }
            }
        }
        Some(out)
    }
}

/// Staged configuration for a [`Rule`].
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    pattern: String,
    endpoint: String,
    methods: Vec<Method>,
    strict_slashes: bool,
    suppress_options: bool,
}

impl RuleBuilder {
    /// Sets the explicit allowed methods; without this, the rule defaults
    /// to GET.
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn strict_slashes(mut self, strict: bool) -> Self {
        self.strict_slashes = strict;
        self
    }

    /// Drops the implicit OPTIONS from the allowed-method set.
    pub fn suppress_options(mut self) -> Self {
        self.suppress_options = true;
        self
    }

    pub fn build(self) -> Result<Rule, RuleError> {
        let trace = compile(&self.pattern)?;
        let methods = if self.methods.is_empty() {
            [Method::Get].iter().collect()
        } else {
            self.methods.iter().collect()
        };
        Ok(Rule {
            pattern: self.pattern,
            endpoint: self.endpoint,
            trace,
            methods,
            strict_slashes: self.strict_slashes,
            suppress_options: self.suppress_options,
        })
    }
}

fn compile(pattern: &str) -> Result<Vec<Segment>, RuleError> {
    if !pattern.starts_with('/') {
        return Err(RuleError::LeadingSlash { pattern: pattern.to_owned() });
    }

    let mut trace = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;

    while let Some(open) = rest.find('<') {
        literal.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('>')
            .ok_or_else(|| RuleError::UnterminatedPlaceholder { pattern: pattern.to_owned() })?;
        let spec = &after[..close];
        rest = &after[close + 1..];

        if !literal.is_empty() {
            trace.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        let (name, converter) = parse_placeholder(spec)?;
        trace.push(Segment::Placeholder { name, converter });
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        trace.push(Segment::Literal(literal));
    }

    let mut seen = Vec::new();
    let mut path_seen = false;
    for segment in &trace {
        if let Segment::Placeholder { name, converter } = segment {
            if path_seen {
                return Err(RuleError::PathNotLast);
            }
            if seen.contains(&name.as_str()) {
                return Err(RuleError::DuplicateParameter { name: name.clone() });
            }
            seen.push(name.as_str());
            path_seen = converter.is_path();
        }
    }
    Ok(trace)
}

/// Parses the inside of `<...>`: `name`, `converter:name` or
/// `converter(args):name`.
fn parse_placeholder(spec: &str) -> Result<(String, Converter), RuleError> {
    let (converter_spec, name) = match spec.split_once(':') {
        Some((converter, name)) => (converter.trim(), name.trim()),
        None => ("string", spec.trim()),
    };
    if name.is_empty() || name.contains(['/', '<', '>']) {
        return Err(RuleError::InvalidParameterName { name: name.to_owned() });
    }
    Ok((name.to_owned(), parse_converter(converter_spec)?))
}

fn parse_converter(spec: &str) -> Result<Converter, RuleError> {
    let (kind, args) = match spec.split_once('(') {
        Some((kind, rest)) => {
            let args = rest
                .strip_suffix(')')
                .ok_or_else(|| RuleError::InvalidArgument { argument: spec.to_owned() })?;
            (kind.trim(), parse_args(args))
        }
        None => (spec.trim(), Vec::new()),
    };

    match kind {
        "string" => {
            let (mut min_length, mut max_length, mut length) = (None, None, None);
            for (key, value) in named_args(&args)? {
                match key {
                    "minlength" => min_length = Some(parse_number(value)?),
                    "maxlength" => max_length = Some(parse_number(value)?),
                    "length" => length = Some(parse_number(value)?),
                    _ => return Err(RuleError::InvalidArgument { argument: key.to_owned() }),
                }
            }
            Ok(Converter::Str { min_length, max_length, length })
        }

        "int" => {
            let (mut fixed_digits, mut min, mut max) = (None, None, None);
            for (key, value) in named_args(&args)? {
                match key {
                    "fixed_digits" => fixed_digits = Some(parse_number(value)?),
                    "min" => min = Some(parse_number(value)?),
                    "max" => max = Some(parse_number(value)?),
                    _ => return Err(RuleError::InvalidArgument { argument: key.to_owned() }),
                }
            }
            Ok(Converter::Int { fixed_digits, min, max })
        }

        "float" => {
            let (mut min, mut max) = (None, None);
            for (key, value) in named_args(&args)? {
                match key {
                    "min" => min = Some(parse_number(value)?),
                    "max" => max = Some(parse_number(value)?),
                    _ => return Err(RuleError::InvalidArgument { argument: key.to_owned() }),
                }
            }
            Ok(Converter::Float { min, max })
        }

        "uuid" => Ok(Converter::Uuid),
        "path" => Ok(Converter::Path),

        "any" => {
            if args.is_empty() {
                return Err(RuleError::InvalidArgument { argument: "any requires choices".to_owned() });
            }
            Ok(Converter::Any(args.into_iter().map(|a| a.value.to_owned()).collect()))
        }

        other => Err(RuleError::UnknownConverter { name: other.to_owned() }),
    }
}

struct Arg<'a> {
    key: Option<&'a str>,
    value: &'a str,
}

fn parse_args(args: &str) -> Vec<Arg<'_>> {
    args.split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) => Arg { key: Some(key.trim()), value: unquote(value.trim()) },
            None => Arg { key: None, value: unquote(arg) },
        })
        .collect()
}

fn named_args<'a>(args: &'a [Arg<'a>]) -> Result<Vec<(&'a str, &'a str)>, RuleError> {
    args.iter()
        .map(|arg| match arg.key {
            Some(key) => Ok((key, arg.value)),
            None => Err(RuleError::InvalidArgument { argument: arg.value.to_owned() }),
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    let stripped = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')));
    stripped.unwrap_or(value)
}

fn parse_number<N: std::str::FromStr>(value: &str) -> Result<N, RuleError> {
    value.parse().map_err(|_| RuleError::InvalidArgument { argument: value.to_owned() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str) -> Rule {
        Rule::builder(pattern, "endpoint").build().unwrap()
    }

    #[test]
    fn literal_pattern_is_static() {
        let r = rule("/about");
        assert!(r.is_static());
        assert!(r.matches("/about").is_some());
        assert!(r.matches("/about/").is_none());
        assert!(r.matches("/abou").is_none());
    }

    #[test]
    fn default_placeholder_is_string() {
        let r = rule("/user/<name>");
        let captures = r.matches("/user/alice").unwrap();
        assert_eq!(captures["name"], Value::Str("alice".into()));
        assert!(r.matches("/user/").is_none());
        assert!(r.matches("/user/a/b").is_none());
    }

    #[test]
    fn typed_placeholder_converts() {
        let r = rule("/post/<int:id>/comments");
        let captures = r.matches("/post/42/comments").unwrap();
        assert_eq!(captures["id"], Value::Int(42));
        assert!(r.matches("/post/abc/comments").is_none());
    }

    #[test]
    fn path_placeholder_is_greedy() {
        let r = rule("/files/<path:name>");
        let captures = r.matches("/files/a/b/c.txt").unwrap();
        assert_eq!(captures["name"], Value::Str("a/b/c.txt".into()));
        assert!(r.matches("/files/").is_none());
    }

    #[test]
    fn path_placeholder_with_trailing_literal() {
        let r = rule("/pages/<path:page>/edit");
        let captures = r.matches("/pages/docs/intro/edit").unwrap();
        assert_eq!(captures["page"], Value::Str("docs/intro".into()));
        assert!(r.matches("/pages/docs/intro").is_none());
    }

    #[test]
    fn converter_arguments_parsed() {
        let r = rule("/archive/<int(fixed_digits=4):year>/<any(json, 'xml'):format>");
        let captures = r.matches("/archive/2024/xml").unwrap();
        assert_eq!(captures["year"], Value::Int(2024));
        assert_eq!(captures["format"], Value::Str("xml".into()));
        assert!(r.matches("/archive/24/xml").is_none());
        assert!(r.matches("/archive/2024/yaml").is_none());
    }

    #[test]
    fn default_methods_imply_head_and_options() {
        let r = rule("/");
        assert!(r.allows(&Method::Get));
        assert!(r.allows(&Method::Head));
        assert!(r.allows(&Method::Options));
        assert!(!r.allows(&Method::Post));
    }

    #[test]
    fn post_only_rule_has_no_head() {
        let r = Rule::builder("/submit", "submit").methods([Method::Post]).build().unwrap();
        assert!(r.allows(&Method::Post));
        assert!(r.allows(&Method::Options));
        assert!(!r.allows(&Method::Get));
        assert!(!r.allows(&Method::Head));
    }

    #[test]
    fn suppress_options() {
        let r = Rule::builder("/quiet", "quiet").suppress_options().build().unwrap();
        assert!(r.allows(&Method::Get));
        assert!(!r.allows(&Method::Options));
    }

    #[test]
    fn build_is_the_inverse_of_matches() {
        let r = rule("/post/<int:id>/rev/<float:rev>");
        let captures = r.matches("/post/7/rev/1.5").unwrap();
        assert_eq!(r.build(&captures).as_deref(), Some("/post/7/rev/1.5"));
    }

    #[test]
    fn build_fails_on_missing_or_bad_values() {
        let r = rule("/post/<int:id>");
        assert!(r.build(&Captures::new()).is_none());

        let mut values = Captures::new();
        values.insert("id".into(), Value::Str("oops".into()));
        assert!(r.build(&values).is_none());
    }

    #[test]
    fn compile_errors() {
        assert_eq!(
            Rule::builder("no-slash", "e").build().unwrap_err(),
            RuleError::LeadingSlash { pattern: "no-slash".into() }
        );
        assert!(matches!(
            Rule::builder("/a/<broken", "e").build().unwrap_err(),
            RuleError::UnterminatedPlaceholder { .. }
        ));
        assert_eq!(
            Rule::builder("/a/<regex:x>", "e").build().unwrap_err(),
            RuleError::UnknownConverter { name: "regex".into() }
        );
        assert_eq!(
            Rule::builder("/a/<x>/<x>", "e").build().unwrap_err(),
            RuleError::DuplicateParameter { name: "x".into() }
        );
        assert_eq!(Rule::builder("/a/<path:p>/<x>", "e").build().unwrap_err(), RuleError::PathNotLast);
        assert!(matches!(
            Rule::builder("/a/<int(width=3):x>", "e").build().unwrap_err(),
            RuleError::InvalidArgument { .. }
        ));
    }
}
