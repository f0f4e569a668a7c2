//! Path routing with `:name` captures.
//!
//! Patterns are literal segments mixed with single-segment captures:
//! `/game/:GameID/highscore`. Lookup is order-independent: among the
//! patterns matching a URL, the one whose earliest differing segment is
//! literal wins. Structural conflicts (two patterns identical once
//! capture names are erased) are rejected at registration time.

use http::Method;
use percent_encoding::percent_decode_str;

/// One compiled pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug)]
struct Route<T> {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    value: T,
}

/// A successful lookup: the registered value plus the captured
/// `(name, value)` pairs, percent-decoded.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    pub value: &'a T,
    pub params: Vec<(String, String)>,
}

/// Registration failure.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The new pattern is structurally identical to an existing one for
    /// the same method (capture names do not disambiguate routes).
    #[error("duplicate route: {method} {pattern} conflicts with {existing}")]
    Conflict {
        method: Method,
        pattern: String,
        existing: String,
    },
}

/// Immutable-after-startup pattern matcher.
#[derive(Debug, Default)]
pub struct Router<T> {
    routes: Vec<Route<T>>,
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Compile and add a pattern. Patterns are normalized to exactly one
    /// leading slash with trailing slashes stripped.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        value: T,
    ) -> Result<(), RouterError> {
        let pattern = normalize(pattern);
        let segments = compile(&pattern);

        if let Some(existing) = self
            .routes
            .iter()
            .find(|r| r.method == method && same_structure(&r.segments, &segments))
        {
            return Err(RouterError::Conflict {
                method,
                pattern,
                existing: existing.pattern.clone(),
            });
        }

        self.routes.push(Route {
            method,
            pattern,
            segments,
            value,
        });
        Ok(())
    }

    /// Find the most specific route matching a method and URL path.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        let parts: Vec<&str> = split(path);

        self.routes
            .iter()
            .filter(|r| r.method == *method && matches(&r.segments, &parts))
            .reduce(|best, candidate| {
                if more_specific(&candidate.segments, &best.segments) {
                    candidate
                } else {
                    best
                }
            })
            .map(|route| RouteMatch {
                value: &route.value,
                params: capture(&route.segments, &parts),
            })
    }

    /// Whether any registered route matches, without capturing.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        let parts: Vec<&str> = split(path);
        self.routes
            .iter()
            .any(|r| r.method == *method && matches(&r.segments, &parts))
    }
}

fn normalize(pattern: &str) -> String {
    let trimmed = pattern.trim_matches('/');
    format!("/{trimmed}")
}

fn split(path: &str) -> Vec<&str> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

fn compile(pattern: &str) -> Vec<Segment> {
    split(pattern)
        .into_iter()
        .map(|s| match s.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Literal(s.to_string()),
        })
        .collect()
}

/// Structural equality with capture names erased: `/g/:a` and `/g/:b`
/// route identically, so they conflict.
fn same_structure(a: &[Segment], b: &[Segment]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| match (x, y) {
            (Segment::Literal(x), Segment::Literal(y)) => x == y,
            (Segment::Param(_), Segment::Param(_)) => true,
            _ => false,
        })
}

fn matches(segments: &[Segment], parts: &[&str]) -> bool {
    segments.len() == parts.len()
        && segments.iter().zip(parts).all(|(seg, part)| match seg {
            Segment::Literal(lit) => lit == part,
            Segment::Param(_) => true,
        })
}

/// `a` beats `b` when its earliest differing segment is literal.
fn more_specific(a: &[Segment], b: &[Segment]) -> bool {
    for (x, y) in a.iter().zip(b) {
        match (x, y) {
            (Segment::Literal(_), Segment::Param(_)) => return true,
            (Segment::Param(_), Segment::Literal(_)) => return false,
            _ => {}
        }
    }
    false
}

fn capture(segments: &[Segment], parts: &[&str]) -> Vec<(String, String)> {
    segments
        .iter()
        .zip(parts)
        .filter_map(|(seg, part)| match seg {
            Segment::Param(name) => {
                let value = percent_decode_str(part)
                    .decode_utf8()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| (*part).to_string());
                Some((name.clone(), value))
            }
            Segment::Literal(_) => None,
        })
        .collect()
}
