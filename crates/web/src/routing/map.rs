//! Route table and frozen matcher.
//!
//! [`RouteMap`] is the append-only registration surface. [`bind`]
//! (RouteMap::bind) freezes it into a [`Matcher`]: an immutable, cheaply
//! cloneable snapshot safe to share across serving tasks with no locks.
//! Registration and serving never interleave.
//!
//! Matching runs in two phases by design: an exact hash lookup over the
//! placeholder-free rules, then a registration-ordered scan of the dynamic
//! rules. A static rule therefore always beats a dynamic rule for the same
//! literal path, and dynamic priority is plain registration order.

use std::collections::HashMap;
use std::sync::Arc;

use carafe_http::protocol::{Method, MethodSet};
use thiserror::Error;
use tracing::debug;

use crate::routing::converters::Value;
use crate::routing::rule::{Captures, Rule};

/// A successful match: the rule's endpoint and the converted placeholder
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub endpoint: String,
    pub values: Captures,
}

/// A structured non-match. These are routing outcomes the adapter layer
/// renders, not failures of the matcher itself.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MatchError {
    #[error("no route matches the path")]
    NotFound,

    #[error("method not allowed (allow: {})", allowed.to_allow_header())]
    MethodNotAllowed { allowed: MethodSet },

    #[error("requested path differs from the canonical route by a trailing slash: {target}")]
    RequestRedirect { target: String },
}

/// The append-only route table used during application setup.
#[derive(Debug, Default)]
pub struct RouteMap {
    /// Literal path -> index into `rules`, first registration wins.
    static_index: HashMap<String, usize>,
    /// Indexes of dynamic rules in registration order.
    dynamic: Vec<usize>,
    rules: Vec<Arc<Rule>>,
}

impl RouteMap {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a rule. Placeholder-free patterns go into the static index
    /// (duplicates keep the first registration); the rest append to the
    /// dynamic scan list.
    pub fn add(&mut self, rule: Rule) {
        let index = self.rules.len();
        if rule.is_static() {
            self.static_index.entry(rule.pattern().to_owned()).or_insert(index);
        } else {
            self.dynamic.push(index);
        }
        debug!(endpoint = rule.endpoint(), pattern = rule.pattern(), "route registered");
        self.rules.push(Arc::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Freezes the table into a [`Matcher`] bound to a server context.
    pub fn bind(self, context: BindContext) -> Matcher {
        Matcher {
            inner: Arc::new(MatcherInner {
                static_index: self.static_index,
                dynamic: self.dynamic,
                rules: self.rules,
                context,
            }),
        }
    }
}

/// The server context a matcher is bound to. Only used for URL building and
/// (when `host_matching` is set) cross-host rejection; path matching itself
/// never consults it.
#[derive(Debug, Clone)]
pub struct BindContext {
    pub server_name: String,
    pub script_name: String,
    pub url_scheme: String,
    pub subdomain: Option<String>,
    pub host_matching: bool,
}

impl Default for BindContext {
    fn default() -> Self {
        Self {
            server_name: "localhost".to_owned(),
            script_name: String::new(),
            url_scheme: "http".to_owned(),
            subdomain: None,
            host_matching: false,
        }
    }
}

/// A frozen, shareable view of a bound route table.
#[derive(Debug, Clone)]
pub struct Matcher {
    inner: Arc<MatcherInner>,
}

#[derive(Debug)]
struct MatcherInner {
    static_index: HashMap<String, usize>,
    dynamic: Vec<usize>,
    rules: Vec<Arc<Rule>>,
    context: BindContext,
}

impl Matcher {
    /// Whether a request `Host` is acceptable for this binding. Always true
    /// unless host matching was enabled at bind time.
    pub fn accepts_host(&self, host: &str) -> bool {
        let context = &self.inner.context;
        if !context.host_matching {
            return true;
        }
        let expected = match &context.subdomain {
            Some(sub) => format!("{sub}.{}", context.server_name),
            None => context.server_name.clone(),
        };
        host.eq_ignore_ascii_case(&expected)
    }

    /// Resolves a request path and method against the frozen table.
    pub fn match_path(&self, path: &str, method: &Method) -> Result<RouteMatch, MatchError> {
        let inner = &*self.inner;
        let mut allowed = MethodSet::new();
        let mut path_matched = false;

        // phase 1: exact static lookup
        if let Some(&idx) = inner.static_index.get(path) {
            let rule = &inner.rules[idx];
            if rule.allows(method) {
                return Ok(RouteMatch { endpoint: rule.endpoint().to_owned(), values: Captures::new() });
            }
            allowed.union_with(&rule.allowed_methods());
            path_matched = true;
        }

        // phase 2: trailing-slash alternate static lookup
        if let Some(&idx) = inner.static_index.get(&toggle_slash(path)) {
            let rule = &inner.rules[idx];
            if rule.strict_slashes() {
                // redirect only toward the canonical slashed form
                if rule.pattern().ends_with('/') && !path_matched {
                    return Err(MatchError::RequestRedirect { target: format!("{path}/") });
                }
            } else if rule.allows(method) {
                return Ok(RouteMatch { endpoint: rule.endpoint().to_owned(), values: Captures::new() });
            } else {
                allowed.union_with(&rule.allowed_methods());
                path_matched = true;
            }
        }

        // phase 3: ordered dynamic scan; a converter turning a segment down
        // only skips that candidate
        for &idx in &inner.dynamic {
            let rule = &inner.rules[idx];
            if let Some(values) = rule.matches(path) {
                if rule.allows(method) {
                    return Ok(RouteMatch { endpoint: rule.endpoint().to_owned(), values });
                }
                allowed.union_with(&rule.allowed_methods());
                path_matched = true;
                continue;
            }
            if !path.ends_with('/') && rule.pattern().ends_with('/') {
                let slashed = format!("{path}/");
                if let Some(values) = rule.matches(&slashed) {
                    if rule.strict_slashes() {
                        return Err(MatchError::RequestRedirect { target: slashed });
                    }
                    if rule.allows(method) {
                        return Ok(RouteMatch { endpoint: rule.endpoint().to_owned(), values });
                    }
                    allowed.union_with(&rule.allowed_methods());
                    path_matched = true;
                }
            } else if path.ends_with('/') && !rule.strict_slashes() {
                if let Some(values) = rule.matches(&path[..path.len() - 1]) {
                    if rule.allows(method) {
                        return Ok(RouteMatch { endpoint: rule.endpoint().to_owned(), values });
                    }
                    allowed.union_with(&rule.allowed_methods());
                    path_matched = true;
                }
            }
        }

        if path_matched { Err(MatchError::MethodNotAllowed { allowed }) } else { Err(MatchError::NotFound) }
    }

    /// Builds a URL path for an endpoint, the inverse of
    /// [`match_path`](Self::match_path). The bound script name is prefixed.
    /// `None` when the endpoint is unknown or a value is missing/invalid.
    pub fn build(&self, endpoint: &str, values: &Captures) -> Option<String> {
        let inner = &*self.inner;
        for rule in &inner.rules {
            if rule.endpoint() != endpoint {
                continue;
            }
            if let Some(path) = rule.build(values) {
                return Some(format!("{}{path}", inner.context.script_name));
            }
        }
        None
    }
}

/// `/a/` -> `/a` and `/a` -> `/a/`.
fn toggle_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() => stripped.to_owned(),
        _ => format!("{path}/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::rule::Rule;

    fn map(rules: Vec<Rule>) -> Matcher {
        let mut map = RouteMap::new();
        for rule in rules {
            map.add(rule);
        }
        map.bind(BindContext::default())
    }

    fn rule(pattern: &str, endpoint: &str) -> Rule {
        Rule::builder(pattern, endpoint).build().unwrap()
    }

    #[test]
    fn static_match_beats_dynamic() {
        let matcher = map(vec![rule("/user/<name>", "dynamic"), rule("/user/admin", "static")]);
        let hit = matcher.match_path("/user/admin", &Method::Get).unwrap();
        assert_eq!(hit.endpoint, "static");
        assert!(hit.values.is_empty());

        let hit = matcher.match_path("/user/alice", &Method::Get).unwrap();
        assert_eq!(hit.endpoint, "dynamic");
        assert_eq!(hit.values["name"], Value::Str("alice".into()));
    }

    #[test]
    fn first_static_registration_wins() {
        let matcher = map(vec![rule("/dup", "first"), rule("/dup", "second")]);
        assert_eq!(matcher.match_path("/dup", &Method::Get).unwrap().endpoint, "first");
    }

    #[test]
    fn first_wins_survives_index_growth() {
        let mut m = RouteMap::new();
        m.add(rule("/keep", "original"));
        for i in 0..1500 {
            m.add(rule(&format!("/filler/{i}"), &format!("filler{i}")));
        }
        m.add(rule("/keep", "usurper"));
        let matcher = m.bind(BindContext::default());
        assert_eq!(matcher.match_path("/keep", &Method::Get).unwrap().endpoint, "original");
        assert_eq!(matcher.match_path("/filler/1499", &Method::Get).unwrap().endpoint, "filler1499");
    }

    #[test]
    fn dynamic_rules_scanned_in_registration_order() {
        let matcher = map(vec![rule("/x/<a>", "first"), rule("/x/<b>", "second")]);
        assert_eq!(matcher.match_path("/x/hello", &Method::Get).unwrap().endpoint, "first");
    }

    #[test]
    fn converter_rejection_moves_to_next_candidate() {
        let matcher = map(vec![rule("/obj/<uuid:id>", "by_uuid"), rule("/obj/<name>", "by_name")]);

        let hit = matcher.match_path("/obj/550e8400-e29b-41d4-a716-446655440000", &Method::Get).unwrap();
        assert_eq!(hit.endpoint, "by_uuid");

        let hit = matcher.match_path("/obj/not-a-uuid", &Method::Get).unwrap();
        assert_eq!(hit.endpoint, "by_name");
    }

    #[test]
    fn not_found_vs_method_not_allowed() {
        let matcher = map(vec![
            rule("/item", "get_item"),
            Rule::builder("/item", "post_item").methods([Method::Post]).build().unwrap(),
        ]);

        assert_eq!(matcher.match_path("/missing", &Method::Get).unwrap_err(), MatchError::NotFound);

        // /item is indexed to the GET rule; DELETE matches neither, and the
        // allowed set is the union over all path-matching rules
        let err = matcher.match_path("/item", &Method::Delete).unwrap_err();
        let MatchError::MethodNotAllowed { allowed } = err else {
            panic!("expected MethodNotAllowed, got {err:?}");
        };
        assert!(allowed.contains(&Method::Get));
        assert!(allowed.contains(&Method::Head));
        assert!(allowed.contains(&Method::Options));
    }

    #[test]
    fn method_union_includes_dynamic_rules() {
        let matcher = map(vec![
            rule("/thing/<id>", "get_thing"),
            Rule::builder("/thing/<id>", "put_thing").methods([Method::Put]).build().unwrap(),
        ]);
        let err = matcher.match_path("/thing/7", &Method::Delete).unwrap_err();
        let MatchError::MethodNotAllowed { allowed } = err else {
            panic!("expected MethodNotAllowed, got {err:?}");
        };
        assert!(allowed.contains(&Method::Get));
        assert!(allowed.contains(&Method::Put));
    }

    #[test]
    fn strict_slash_near_miss_redirects() {
        let matcher = map(vec![rule("/projects/", "projects")]);
        assert_eq!(
            matcher.match_path("/projects", &Method::Get).unwrap_err(),
            MatchError::RequestRedirect { target: "/projects/".into() }
        );
        assert!(matcher.match_path("/projects/", &Method::Get).is_ok());
    }

    #[test]
    fn non_strict_rule_matches_both_slash_forms() {
        let matcher = map(vec![
            Rule::builder("/docs/", "docs").strict_slashes(false).build().unwrap(),
            Rule::builder("/tag/<name>", "tag").strict_slashes(false).build().unwrap(),
        ]);
        assert!(matcher.match_path("/docs", &Method::Get).is_ok());
        assert!(matcher.match_path("/docs/", &Method::Get).is_ok());
        assert!(matcher.match_path("/tag/rust", &Method::Get).is_ok());
        assert!(matcher.match_path("/tag/rust/", &Method::Get).is_ok());
    }

    #[test]
    fn strict_rule_without_slash_does_not_match_slashed_path() {
        let matcher = map(vec![rule("/exact", "exact")]);
        assert_eq!(matcher.match_path("/exact/", &Method::Get).unwrap_err(), MatchError::NotFound);
    }

    #[test]
    fn dynamic_strict_slash_redirect() {
        let matcher = map(vec![rule("/branch/<name>/", "branch")]);
        assert_eq!(
            matcher.match_path("/branch/main", &Method::Get).unwrap_err(),
            MatchError::RequestRedirect { target: "/branch/main/".into() }
        );
        assert_eq!(matcher.match_path("/branch/main/", &Method::Get).unwrap().endpoint, "branch");
    }

    #[test]
    fn build_round_trip_with_script_name() {
        let mut m = RouteMap::new();
        m.add(rule("/post/<int:id>", "post"));
        let matcher = m.bind(BindContext { script_name: "/app".to_owned(), ..Default::default() });

        let values = Captures::from([("id".to_owned(), Value::Int(7))]);
        assert_eq!(matcher.build("post", &values).as_deref(), Some("/app/post/7"));
        assert!(matcher.build("post", &Captures::new()).is_none());
        assert!(matcher.build("missing", &values).is_none());
    }

    #[test]
    fn host_matching_disabled_by_default() {
        let matcher = map(vec![rule("/", "root")]);
        assert!(matcher.accepts_host("anything.example"));

        let mut m = RouteMap::new();
        m.add(rule("/", "root"));
        let matcher = m.bind(BindContext {
            server_name: "example.com".to_owned(),
            subdomain: Some("api".to_owned()),
            host_matching: true,
            ..Default::default()
        });
        assert!(matcher.accepts_host("api.example.com"));
        assert!(matcher.accepts_host("API.EXAMPLE.COM"));
        assert!(!matcher.accepts_host("example.com"));
    }
}
