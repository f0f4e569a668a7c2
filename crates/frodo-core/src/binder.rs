//! Request binding: merge query, body, and path values into one typed
//! request value.
//!
//! Every value source funnels through the same JSON decode. Query and
//! path pairs are rewritten into minimal JSON documents shaped by the
//! target's [`Shape`](crate::shape::Shape) descriptor, deep-merged with
//! the decoded body, and the merged document is deserialized once into
//! the output value. Any custom `Deserialize` a field type carries
//! therefore applies identically whether the value arrived in the body,
//! the URL path, or the query string.
//!
//! Merge precedence is query, then body, then path: later sources
//! overwrite earlier ones at the leaf. A `:param` in the URL is the most
//! specific statement of intent, so it goes last.

use std::collections::HashSet;

use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::Request;
use crate::context::PathParams;
use crate::shape::{Bindable, Shape};

/// Binding failure. Everything here maps to a 400 at the gateway
/// boundary; see [`crate::Error::from`].
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// The body was present and non-empty but is not valid JSON.
    #[error("malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// A source value could not be decoded into the target leaf type.
    /// `key` is the binding-name path of the offending leaf and `value`
    /// its merged JSON representation.
    #[error("cannot bind {key}={value}: {detail}")]
    TypeMismatch {
        key: String,
        value: String,
        detail: String,
    },
}

impl From<BindError> for crate::Error {
    fn from(err: BindError) -> Self {
        crate::Error::bad_request(err.to_string())
    }
}

/// Merge the request's query string, JSON body, and captured path
/// parameters into `out`.
///
/// Leaves named by no source keep whatever value `out` already holds.
/// Unknown source keys are ignored. The body is consulted only for
/// POST/PUT/PATCH requests, per the wire contract.
pub fn bind<T>(req: &Request, out: &mut T) -> Result<(), BindError>
where
    T: Bindable + Serialize + DeserializeOwned,
{
    let shape = T::shape();

    // Snapshot the current value so untouched leaves survive the decode.
    let mut doc = serde_json::to_value(&*out).map_err(|e| BindError::TypeMismatch {
        key: String::new(),
        value: String::new(),
        detail: format!("request shape is not JSON-representable: {e}"),
    })?;

    // Query phase. A repeated key binds only its first value.
    if let Some(query) = req.uri().query() {
        let mut seen: HashSet<String> = HashSet::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            overlay_pair(&mut doc, shape, &key, &value, Some(&mut seen));
        }
    }

    // Body phase.
    let body = req.body();
    if matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH) && !body.is_empty() {
        let parsed: Value = serde_json::from_slice(body).map_err(BindError::MalformedBody)?;
        merge(&mut doc, parsed);
    }

    // Path phase. Captures were percent-decoded by the router.
    if let Some(params) = req.extensions().get::<PathParams>() {
        for (key, value) in &params.0 {
            overlay_pair(&mut doc, shape, key, value, None);
        }
    }

    match serde_path_to_error::deserialize::<_, T>(&doc) {
        Ok(value) => {
            *out = value;
            Ok(())
        }
        Err(err) => {
            let key = err.path().to_string();
            let value = offending_value(&doc, err.path());
            Err(BindError::TypeMismatch {
                key,
                value,
                detail: err.into_inner().to_string(),
            })
        }
    }
}

/// Resolve one `(key, value)` pair against the shape and write it into
/// the accumulating document. Unresolvable or composite-target pairs
/// are dropped without error: they name input the wire contract cannot
/// express, not a caller mistake.
fn overlay_pair(
    doc: &mut Value,
    shape: &'static Shape,
    key: &str,
    value: &str,
    mut seen: Option<&mut HashSet<String>>,
) {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        tracing::trace!(key, "discarding pair with empty key segment");
        return;
    }

    // Walk the declared shape, rewriting each segment to its canonical
    // binding name so the decoder sees exact field names.
    let mut canonical = Vec::with_capacity(segments.len());
    let mut current = shape;
    for segment in &segments {
        let Some(field) = current.field(segment) else {
            tracing::trace!(key, %segment, "discarding pair with unresolvable segment");
            return;
        };
        canonical.push(field.name);
        current = (field.shape)();
    }

    if !current.is_leaf() {
        tracing::trace!(key, "discarding pair addressing a composite value");
        return;
    }

    if let Some(seen) = seen.take() {
        if !seen.insert(canonical.join(".")) {
            tracing::trace!(key, "discarding repeated source key");
            return;
        }
    }

    let leaf = leaf_value(current, value);

    // Descend, creating single-key objects along the way; a non-object
    // in the way loses to the later write.
    let mut slot = doc;
    for name in &canonical[..canonical.len() - 1] {
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(map) = slot else { return };
        slot = map.entry(name.to_string()).or_insert(Value::Null);
    }
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    let Value::Object(map) = slot else { return };
    map.insert(canonical[canonical.len() - 1].to_string(), leaf);
}

/// Choose the JSON representation of a raw value string for a leaf.
///
/// Values that do not look like the target classification are passed
/// through as JSON strings so the field type's own deserializer gets a
/// chance at them (ISO-8601 durations stored as integers, etc.).
fn leaf_value(shape: &Shape, value: &str) -> Value {
    if value.is_empty() {
        return match shape {
            Shape::Bool => Value::Bool(false),
            Shape::Number => Value::Number(0.into()),
            _ => Value::String(String::new()),
        };
    }

    match shape {
        Shape::Bool if value.eq_ignore_ascii_case("true") => Value::Bool(true),
        Shape::Bool if value.eq_ignore_ascii_case("false") => Value::Bool(false),
        Shape::Number if looks_numeric(value) => parse_number(value)
            .unwrap_or_else(|| Value::String(value.to_string())),
        _ => Value::String(value.to_string()),
    }
}

/// Only digits with at most one decimal point pass as JSON numbers.
fn looks_numeric(value: &str) -> bool {
    let mut dots = 0;
    for c in value.chars() {
        match c {
            '0'..='9' => {}
            '.' => dots += 1,
            _ => return false,
        }
    }
    dots <= 1
}

fn parse_number(value: &str) -> Option<Value> {
    if value.contains('.') {
        serde_json::Number::from_f64(value.parse::<f64>().ok()?).map(Value::Number)
    } else {
        value
            .parse::<u64>()
            .ok()
            .map(|n| Value::Number(n.into()))
    }
}

/// Deep-merge `overlay` into `base`: objects combine key-wise, anything
/// else replaces outright.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Pull the merged value at a decode-failure path out of the document
/// for the TypeMismatch message.
fn offending_value(doc: &Value, path: &serde_path_to_error::Path) -> String {
    use serde_path_to_error::Segment;

    let mut current = doc;
    for segment in path.iter() {
        let next = match segment {
            Segment::Map { key } => current.get(key),
            Segment::Seq { index } => current.get(index),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return String::new(),
        }
    }
    current.to_string()
}
