use serde_json::Value;
use thiserror::Error;

/// How the client reacts to a failed status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
  /// 401: credentials missing or expired; eligible for one refresh.
  Unauthenticated,
  /// 403: surfaced to the caller, never retried.
  Forbidden,
  /// 404: surfaced to the caller, never retried.
  NotFound,
  Other,
}

pub fn map_http_status(status_code: u16) -> StatusClass {
  match status_code {
    401 => StatusClass::Unauthenticated,
    403 => StatusClass::Forbidden,
    404 => StatusClass::NotFound,
    _ => StatusClass::Other,
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  #[error("unauthenticated: {message}")]
  Unauthenticated { message: String },
  #[error("forbidden: {message}")]
  Forbidden { message: String },
  #[error("not found: {message}")]
  NotFound { message: String },
  #[error("request failed with status {status}: {message}")]
  Http { status: u16, message: String },
  #[error("network error: {0}")]
  Network(String),
  #[error("unexpected response: {0}")]
  Decode(String),
  #[error("{0}")]
  Validation(String),
}

impl ApiError {
  pub fn from_status(status: u16, message: impl Into<String>) -> Self {
    let message = message.into();
    match map_http_status(status) {
      StatusClass::Unauthenticated => Self::Unauthenticated { message },
      StatusClass::Forbidden => Self::Forbidden { message },
      StatusClass::NotFound => Self::NotFound { message },
      StatusClass::Other => Self::Http { status, message },
    }
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Unauthenticated { .. } => Some(401),
      Self::Forbidden { .. } => Some(403),
      Self::NotFound { .. } => Some(404),
      Self::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub fn class(&self) -> Option<StatusClass> {
    self.status().map(map_http_status)
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Unauthenticated { message }
      | Self::Forbidden { message }
      | Self::NotFound { message }
      | Self::Http { message, .. } => message,
      Self::Network(message) | Self::Decode(message) | Self::Validation(message) => message,
    }
  }

  pub fn is_unauthenticated(&self) -> bool {
    matches!(self, Self::Unauthenticated { .. })
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

fn read_string(value: Option<&Value>) -> Option<String> {
  let s = value?.as_str()?.trim();
  if s.is_empty() {
    None
  } else {
    Some(s.to_string())
  }
}

fn status_text(status: u16) -> &'static str {
  match status {
    400 => "Bad request",
    401 => "Unauthorized",
    403 => "Forbidden",
    404 => "Not found",
    409 => "Conflict",
    422 => "Unprocessable entity",
    429 => "Too many requests",
    500..=599 => "Server error",
    _ => "Request failed",
  }
}

/// Pulls the human-readable message out of an error body. The backend sends
/// `{ message }`, sometimes nested as `{ data: { message } }`.
pub fn error_message(status: u16, body: &str) -> String {
  let parsed = serde_json::from_str::<Value>(body).ok();
  parsed
    .as_ref()
    .and_then(|json| {
      read_string(json.get("message"))
        .or_else(|| read_string(json.get("data").and_then(|d| d.get("message"))))
        .or_else(|| read_string(json.get("error").and_then(|d| d.get("message"))))
    })
    .unwrap_or_else(|| status_text(status).to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_codes_map_to_classes() {
    assert_eq!(map_http_status(401), StatusClass::Unauthenticated);
    assert_eq!(map_http_status(403), StatusClass::Forbidden);
    assert_eq!(map_http_status(404), StatusClass::NotFound);
    assert_eq!(map_http_status(500), StatusClass::Other);
    assert_eq!(map_http_status(429), StatusClass::Other);
  }

  #[test]
  fn error_message_reads_flat_and_nested_bodies() {
    assert_eq!(error_message(404, r#"{"success":false,"message":"Product not found"}"#), "Product not found");
    assert_eq!(error_message(403, r#"{"data":{"message":"Admins only"}}"#), "Admins only");
    assert_eq!(error_message(500, "<html>oops</html>"), "Server error");
    assert_eq!(error_message(401, r#"{"message":"   "}"#), "Unauthorized");
  }

  #[test]
  fn from_status_keeps_status_and_message() {
    let err = ApiError::from_status(409, "Already in cart");
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.message(), "Already in cart");
    assert_eq!(err.class(), Some(StatusClass::Other));
    assert!(ApiError::from_status(401, "expired").is_unauthenticated());
  }
}
