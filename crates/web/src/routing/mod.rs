//! URL routing: converters, rules, and the two-phase matcher.

pub mod converters;
pub use converters::Converter;
pub use converters::Value;

pub mod rule;
pub use rule::Captures;
pub use rule::Rule;
pub use rule::RuleBuilder;
pub use rule::RuleError;

pub mod map;
pub use map::BindContext;
pub use map::MatchError;
pub use map::Matcher;
pub use map::RouteMap;
pub use map::RouteMatch;
