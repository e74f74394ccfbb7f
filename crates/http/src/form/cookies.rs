//! `Cookie` header parsing.
//!
//! Splits the header into `name=value` pairs on `;`. Values wrapped in
//! double quotes keep everything up to the closing quote, semicolons
//! included; backslashes inside quotes are kept as-is. A repeated name keeps
//! its last value, a token without `=` is skipped, and no percent decoding
//! is applied.

use crate::form::QueryMap;

/// Parses a `Cookie` request header into an ordered multi-map.
pub fn parse_cookies(header: &str) -> QueryMap {
    let mut map = QueryMap::new();
    let bytes = header.as_bytes();
    let mut i = 0;

    // all scan boundaries are ASCII bytes, so &str slicing below stays on
    // char boundaries
    while i < bytes.len() {
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b';') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let key_start = i;
        while i < bytes.len() && bytes[i] != b'=' && bytes[i] != b';' {
            i += 1;
        }
        let key = header[key_start..i].trim();

        if i >= bytes.len() || bytes[i] == b';' {
            continue; // token without '=', skipped
        }

        i += 1; // consume '='
        while i < bytes.len() && bytes[i] == b' ' {
            i += 1;
        }

        let value = if i < bytes.len() && bytes[i] == b'"' {
            i += 1;
            let value_start = i;
            while i < bytes.len() && bytes[i] != b'"' {
                i += 1;
            }
            let value = &header[value_start..i];
            if i < bytes.len() {
                i += 1; // closing quote
            }
            value
        } else {
            let value_start = i;
            while i < bytes.len() && bytes[i] != b';' {
                i += 1;
            }
            header[value_start..i].trim_end()
        };

        if !key.is_empty() {
            map.set(key, value);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_pairs() {
        let cookies = parse_cookies("session=abc123; theme=dark");
        assert_eq!(cookies.get("session"), Some("abc123"));
        assert_eq!(cookies.get("theme"), Some("dark"));
    }

    #[test]
    fn quoted_value_keeps_semicolons() {
        let cookies = parse_cookies("data=\"a;b=c\"; next=1");
        assert_eq!(cookies.get("data"), Some("a;b=c"));
        assert_eq!(cookies.get("next"), Some("1"));
    }

    #[test]
    fn backslashes_inside_quotes_kept() {
        let cookies = parse_cookies(r#"p="a\"b""#);
        // the first unescaped-looking quote closes the value
        assert_eq!(cookies.get("p"), Some(r"a\"));
    }

    #[test]
    fn whitespace_and_empty_segments_tolerated() {
        let cookies = parse_cookies("  a=1 ;; ;  b = 2 ");
        assert_eq!(cookies.get("a"), Some("1"));
        assert_eq!(cookies.get("b"), Some("2"));
    }

    #[test]
    fn bare_token_is_skipped() {
        let cookies = parse_cookies("flag; a=1");
        assert!(cookies.get("flag").is_none());
        assert_eq!(cookies.get("a"), Some("1"));
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let cookies = parse_cookies("v=\"open");
        assert_eq!(cookies.get("v"), Some("open"));
    }

    #[test]
    fn last_occurrence_wins() {
        let cookies = parse_cookies("x=1; x=2");
        assert_eq!(cookies.get("x"), Some("2"));
        assert_eq!(cookies.get_all("x"), vec!["2"]);
    }

    #[test]
    fn no_percent_decoding() {
        let cookies = parse_cookies("enc=%20literal");
        assert_eq!(cookies.get("enc"), Some("%20literal"));
    }
}
