use crate::cache::{CacheTag, QueryKey};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of one backend call: what to send and which cache tags it
/// reads (`provides`) or writes (`invalidates`).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub provides: Vec<CacheTag>,
    pub invalidates: Vec<CacheTag>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            provides: Vec::new(),
            invalidates: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn provides(mut self, tags: impl IntoIterator<Item = CacheTag>) -> Self {
        extend_unique(&mut self.provides, tags);
        self
    }

    pub fn invalidates(mut self, tags: impl IntoIterator<Item = CacheTag>) -> Self {
        extend_unique(&mut self.invalidates, tags);
        self
    }

    /// Reads are GETs; they are coalesced and, when tagged, cached.
    pub fn is_query(&self) -> bool {
        self.method == HttpMethod::Get
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::new(format!("{} {}", self.method, self.path))
    }
}

fn extend_unique(target: &mut Vec<CacheTag>, tags: impl IntoIterator<Item = CacheTag>) {
    for tag in tags {
        if !target.contains(&tag) {
            target.push(tag);
        }
    }
}

/// Builds `path?k=v&...` with each value percent-encoded.
pub fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{query}")
}

/// Percent-encodes one path segment.
pub fn segment(value: &str) -> String {
    urlencoding::encode(value.trim()).into_owned()
}
