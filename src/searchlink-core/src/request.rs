//! Request construction
//!
//! [`build_request`] assembles an outgoing [`Request`] from a method, a path,
//! an optional JSON body, query parameters and extra headers. Nothing here
//! touches the network.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::uri::{PathAndQuery, Uri};
use http::{HeaderMap, Method};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::error::RequestError;

const CONTENT_TYPE_JSON: &str = "application/json";

/// An outgoing API request.
///
/// The path is either an absolute URL or an origin-form path such as
/// `/_cat/indices?v`; relative paths are resolved by the transport. A route
/// given without its leading slash (`_cat/indices`) is rooted.
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Option<Bytes>>,
}

impl Request {
    /// Create a request from method, path and body, without extra parameters or headers
    pub fn new(method: Method, path: &str, body: Option<Bytes>) -> Result<Self, RequestError> {
        let inner = http::Request::builder()
            .method(method)
            .uri(&*rooted(path))
            .body(body)
            .map_err(|e| RequestError::malformed(path, e))?;
        Ok(Self { inner })
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.uri().query()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.inner.body().as_ref()
    }

    /// Split into the request head and the body, for handing to a transport
    pub fn into_parts(self) -> (http::request::Parts, Option<Bytes>) {
        self.inner.into_parts()
    }

    /// Set query parameters, one value per key.
    ///
    /// A key present in `params` replaces every value already in the query
    /// string for that key; other keys keep their values. The query string is
    /// re-encoded with keys in sorted order.
    pub fn set_query_params(&mut self, params: &HashMap<String, String>) -> Result<(), RequestError> {
        let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(query) = self.query() {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                values.entry(key.into_owned()).or_default().push(value.into_owned());
            }
        }
        for (key, value) in params {
            values.insert(key.clone(), vec![value.clone()]);
        }

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, key_values) in &values {
            for value in key_values {
                serializer.append_pair(key, value);
            }
        }
        let query = serializer.finish();

        let path = self.path().to_string();
        let path_and_query = if query.is_empty() {
            path.clone()
        } else {
            format!("{path}?{query}")
        };

        let mut parts = self.inner.uri().clone().into_parts();
        parts.path_and_query =
            Some(PathAndQuery::try_from(path_and_query).map_err(|e| RequestError::malformed(&path, e))?);
        *self.inner.uri_mut() = Uri::from_parts(parts).map_err(|e| RequestError::malformed(&path, e))?;
        Ok(())
    }

    /// Merge extra headers into the request.
    ///
    /// A request without headers adopts `headers` as is. Otherwise every value
    /// is appended to the values already present for its name.
    pub fn merge_headers(&mut self, headers: HeaderMap) {
        if headers.is_empty() {
            return;
        }
        if self.inner.headers().is_empty() {
            *self.inner.headers_mut() = headers;
            return;
        }
        let existing = self.inner.headers_mut();
        for (name, value) in headers.iter() {
            existing.append(name, value.clone());
        }
    }

    fn set_json_content_type(&mut self) {
        self.inner
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    }
}

fn rooted(path: &str) -> Cow<'_, str> {
    if path.is_empty() || path.starts_with('/') || path.contains("://") {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    }
}

/// Build a request from its parts.
///
/// When a body is given the content type is always `application/json`, even
/// if `headers` carries another one.
pub fn build_request(
    method: Method,
    path: &str,
    body: Option<Bytes>,
    params: &HashMap<String, String>,
    headers: HeaderMap,
) -> Result<Request, RequestError> {
    let has_body = body.is_some();
    let mut request = Request::new(method, path, body)?;

    if !params.is_empty() {
        request.set_query_params(params)?;
    }

    request.merge_headers(headers);

    if has_body {
        request.set_json_content_type();
    }

    Ok(request)
}
