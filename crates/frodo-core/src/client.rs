//! The runtime half of generated clients: one shared connection pool
//! plus the wire conventions for turning a request value into an HTTP
//! call.
//!
//! Generated client structs stay thin; each operation delegates to
//! [`Client::invoke`] with its method and path template. `:name`
//! captures are substituted from the request value's matching fields
//! (case-insensitively, percent-encoded, and removed from the
//! remainder); remaining leaves travel as dotted query pairs for
//! GET/HEAD/DELETE and as the JSON body for everything else.

use std::time::Duration;

use bytes::Bytes;
use http::Method;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use url::Url;

use crate::respond::RawResponse;
use crate::{Context, Error};

/// Characters that may not appear raw inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'%')
    .add(b'/');

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote caller for one service's base URL.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

/// Configuration for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    timeout: Duration,
    http: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Overall per-request timeout. A context deadline shorter than
    /// this wins at call time.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reuse an existing connection pool instead of building one.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| Error::bad_request(format!("invalid base url {:?}: {e}", self.base_url)))?;
        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::unexpected(format!("failed to build http client: {e}")))?,
        };
        Ok(Client { http, base_url })
    }
}

impl Client {
    /// A client for the given base URL with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        Self::builder(base_url).build()
    }

    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            http: None,
        }
    }

    /// Invoke a remote operation and decode its JSON response.
    pub async fn invoke<Req, Resp>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        req: &Req,
    ) -> Result<Resp, Error>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let response = self.dispatch(ctx, method, path, req).await?;
        response
            .json::<Resp>()
            .await
            .map_err(|e| Error::unexpected(format!("undecodable response: {e}")))
    }

    /// Invoke a remote operation whose response is a raw content
    /// stream rather than JSON.
    pub async fn invoke_raw<Req>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        req: &Req,
    ) -> Result<RawResponse, Error>
    where
        Req: Serialize,
    {
        let response = self.dispatch(ctx, method, path, req).await?;

        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = response
            .headers()
            .get(http::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_file_name);

        let content = response
            .bytes()
            .await
            .map_err(|e| Error::unexpected(format!("unreadable response: {e}")))?;

        Ok(RawResponse {
            content_type,
            file_name,
            content: Bytes::from(content),
        })
    }

    async fn dispatch<Req: Serialize>(
        &self,
        ctx: &Context,
        method: Method,
        path: &str,
        req: &Req,
    ) -> Result<reqwest::Response, Error> {
        let mut fields = match serde_json::to_value(req) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(Error::bad_request(format!("unserializable request: {e}"))),
        };

        let rendered = substitute_path(path, &mut fields);
        let mut url = self.base_url.clone();
        url.set_path(&join_path(self.base_url.path(), &rendered));

        let send_query = matches!(method, Method::GET | Method::HEAD | Method::DELETE);
        if send_query {
            let mut pairs = Vec::new();
            flatten_query("", &Value::Object(fields.clone()), &mut pairs);
            if !pairs.is_empty() {
                let mut serializer = url.query_pairs_mut();
                for (key, value) in &pairs {
                    serializer.append_pair(key, value);
                }
            }
        }

        tracing::debug!(%method, url = %url, "invoking remote operation");

        let mut builder = self.http.request(method, url);
        if !send_query {
            builder = builder.json(&Value::Object(fields));
        }
        if !ctx.authorization().is_empty() {
            builder = builder.header(http::header::AUTHORIZATION, ctx.authorization());
        }
        if let Some(remaining) = ctx.remaining() {
            builder = builder.timeout(remaining);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(format!("request timed out: {e}"))
            } else {
                Error::unavailable(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Failures carry the wire error shape; re-surface it verbatim so
        // remote failures read exactly like local ones.
        let body = response.bytes().await.unwrap_or_default();
        Err(serde_json::from_slice::<Error>(&body).unwrap_or_else(|_| {
            Error::new(
                status.as_u16(),
                String::from_utf8_lossy(&body).into_owned(),
            )
        }))
    }
}

/// Replace `:name` segments with the matching top-level field values,
/// removing consumed fields from the map. A capture with no matching
/// field renders as an empty segment.
fn substitute_path(template: &str, fields: &mut Map<String, Value>) -> String {
    let mut rendered = String::new();
    for segment in template.split('/').filter(|s| !s.is_empty()) {
        rendered.push('/');
        match segment.strip_prefix(':') {
            Some(name) => {
                let key = fields
                    .keys()
                    .find(|k| k.eq_ignore_ascii_case(name))
                    .cloned();
                let value = key.and_then(|k| fields.remove(&k)).unwrap_or(Value::Null);
                let text = leaf_text(&value);
                rendered.extend(utf8_percent_encode(&text, SEGMENT));
            }
            None => rendered.push_str(segment),
        }
    }
    if rendered.is_empty() {
        rendered.push('/');
    }
    rendered
}

fn join_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{base}{path}")
}

/// Flatten leaves into dotted query pairs. Nulls are absent fields;
/// sequences and mappings have no single-value query representation and
/// are dropped.
fn flatten_query(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                let key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_query(&key, value, pairs);
            }
        }
        Value::Null => {}
        Value::Array(_) => {
            tracing::trace!(key = prefix, "dropping sequence from query encoding");
        }
        other => pairs.push((prefix.to_string(), leaf_text(other))),
    }
}

fn leaf_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn attachment_file_name(disposition: &str) -> Option<String> {
    let (_, name) = disposition.split_once("filename=")?;
    let name = name.trim().trim_matches('"');
    (!name.is_empty()).then(|| name.to_string())
}
