use super::{data, decode, require, to_body};
use crate::cache::CacheTag;
use crate::client::{segment, ApiClient, ApiError, ApiRequest, Transport};
use crate::types::{AccessTokenPayload, LoginRequest, RegisterRequest, User};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("access token is not a three-part token")]
    Malformed,
    #[error("access token claims are not base64url: {0}")]
    Encoding(String),
    #[error("access token claims are not a user record: {0}")]
    Claims(String),
    #[error("access token claims carry no user id")]
    MissingSubject,
}

/// Reads the user out of an access token's claims. The signature is not
/// checked; the backend does that on every call.
pub fn decode_token_claims(token: &str) -> Result<User, TokenError> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(claims), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(claims.trim_end_matches('='))
        .map_err(|e| TokenError::Encoding(e.to_string()))?;
    let user: User = serde_json::from_slice(&bytes).map_err(|e| TokenError::Claims(e.to_string()))?;
    if user.id.is_empty() {
        return Err(TokenError::MissingSubject);
    }
    Ok(user)
}

impl<T: Transport> ApiClient<T> {
    /// Exchanges credentials for an access token and starts a session for
    /// the user named in its claims. The refresh cookie set by the backend
    /// stays in the transport's cookie store.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ApiError::Validation("Please fill in all fields".to_string()));
        }

        let body = to_body(&LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        })?;
        let response = self.send(ApiRequest::post("/auth/login").with_body(body)).await?;

        let payload: AccessTokenPayload = decode(data(response))?;
        let token = payload
            .token()
            .ok_or_else(|| ApiError::Validation("Invalid credentials".to_string()))?
            .to_string();
        let user = decode_token_claims(&token).map_err(|e| ApiError::Decode(e.to_string()))?;

        self.cache().clear();
        self.session().sign_in(user.clone(), token);
        Ok(user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        require(&request.name, "Name")?;
        require(&request.email, "Email")?;
        require(&request.password, "Password")?;

        let response = self
            .send(ApiRequest::post("/users/create-user").with_body(to_body(request)?))
            .await?;
        decode(data(response))
    }

    pub async fn user(&self, id: &str) -> Result<User, ApiError> {
        require(id, "User id")?;
        let response = self
            .send(ApiRequest::get(format!("/users/{}", segment(id))).provides([CacheTag::Users]))
            .await?;
        decode(data(response))
    }

    /// Ends the session and drops every cached response.
    pub fn logout(&self) {
        let previous = self.session().sign_out();
        self.cache().clear();
        if previous.is_authenticated() {
            info!("logged out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use serde_json::json;

    fn token_for(claims: serde_json::Value) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl",
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    #[test]
    fn claims_decode_into_user() {
        let token = token_for(json!({
            "userId": "u1",
            "email": "newadmin@gmail.com",
            "role": "admin",
            "iat": 1700000000,
            "exp": 1700086400
        }));
        let user = decode_token_claims(&token).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.email.as_deref(), Some("newadmin@gmail.com"));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(decode_token_claims("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(decode_token_claims("a.b.c.d"), Err(TokenError::Malformed));
        assert!(matches!(decode_token_claims("a.!!!.c"), Err(TokenError::Encoding(_))));
        assert_eq!(
            decode_token_claims(&token_for(json!({"email": "x@y.z"}))),
            Err(TokenError::MissingSubject)
        );
    }
}
