use super::request::HttpMethod;
use crate::redact::redact_secrets;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

const CLIENT_USER_AGENT: &str = concat!("shopfront/", env!("CARGO_PKG_VERSION"));

/// One call as handed to the wire. `authorization` is the full header value
/// (already carrying any scheme prefix) or `None` for unauthenticated calls.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
  pub method: HttpMethod,
  pub path: String,
  pub authorization: Option<String>,
  pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
  pub status: u16,
  pub body: String,
}

impl TransportResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// No response was received.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
  fn from(err: reqwest::Error) -> Self {
    Self(redact_secrets(&err.to_string()).into_owned())
  }
}

/// The seam every backend call goes through.
pub trait Transport: Send + Sync + 'static {
  fn perform(
    &self,
    request: TransportRequest,
  ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

fn build_headers(authorization: Option<&str>) -> HeaderMap {
  let mut headers = HeaderMap::new();
  headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
  headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
  if let Some(value) = authorization {
    if let Ok(mut value) = HeaderValue::from_str(value) {
      value.set_sensitive(true);
      headers.insert(AUTHORIZATION, value);
    }
  }
  headers
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
  match method {
    HttpMethod::Get => reqwest::Method::GET,
    HttpMethod::Post => reqwest::Method::POST,
    HttpMethod::Put => reqwest::Method::PUT,
    HttpMethod::Patch => reqwest::Method::PATCH,
    HttpMethod::Delete => reqwest::Method::DELETE,
  }
}

/// HTTPS transport. Keeps a cookie store so the refresh-token cookie set by
/// login travels with every later request.
pub struct HttpTransport {
  http: reqwest::Client,
  base_url: String,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
    let http = reqwest::Client::builder()
      .cookie_store(true)
      .timeout(timeout)
      .build()?;
    Ok(Self {
      http,
      base_url: base_url.trim_end_matches('/').to_string(),
    })
  }
}

impl Transport for HttpTransport {
  fn perform(
    &self,
    request: TransportRequest,
  ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
    async move {
      let url = format!("{}{}", self.base_url, request.path);
      let mut builder = self
        .http
        .request(to_reqwest_method(request.method), url)
        .headers(build_headers(request.authorization.as_deref()));
      if let Some(body) = &request.body {
        builder = builder.json(body);
      }

      let res = builder.send().await?;
      let status = res.status().as_u16();
      let body = res.text().await?;
      Ok(TransportResponse { status, body })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn build_headers_marks_authorization_sensitive() {
    let headers = build_headers(Some("token-abc"));
    let auth = headers.get(AUTHORIZATION).unwrap();
    assert!(auth.is_sensitive());
    assert_eq!(auth.to_str().unwrap(), "token-abc");

    let anonymous = build_headers(None);
    assert!(anonymous.get(AUTHORIZATION).is_none());
    assert_eq!(anonymous.get(ACCEPT).unwrap().to_str().unwrap(), "application/json");
  }
}
