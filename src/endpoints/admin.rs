use super::{data, decode, decode_list, require, to_body};
use crate::cache::CacheTag;
use crate::client::{segment, ApiClient, ApiError, ApiRequest, Transport};
use crate::types::{RegisterRequest, Role, User};
use serde_json::{json, Value};

const USER_STATUSES: [&str; 2] = ["in-progress", "blocked"];

impl<T: Transport> ApiClient<T> {
    pub async fn all_users(&self) -> Result<Vec<User>, ApiError> {
        let response = self
            .send(ApiRequest::get("/users/all-user").provides([CacheTag::Users]))
            .await?;
        decode_list(response)
    }

    pub async fn all_admins(&self) -> Result<Vec<User>, ApiError> {
        let response = self
            .send(ApiRequest::get("/users/all-admin").provides([CacheTag::Admins]))
            .await?;
        decode_list(response)
    }

    pub async fn admin(&self, id: &str) -> Result<User, ApiError> {
        require(id, "Admin id")?;
        let response = self
            .send(ApiRequest::get(format!("/users/admin/{}", segment(id))).provides([CacheTag::Admins]))
            .await?;
        decode(data(response))
    }

    pub async fn change_user_status(&self, id: &str, status: &str) -> Result<(), ApiError> {
        require(id, "User id")?;
        let status = status.trim().to_ascii_lowercase();
        if !USER_STATUSES.contains(&status.as_str()) {
            return Err(ApiError::Validation(format!(
                "Status must be one of: {}",
                USER_STATUSES.join(", ")
            )));
        }
        self.send(
            ApiRequest::patch(format!("/users/status/{}", segment(id)))
                .with_body(json!({ "status": status }))
                .invalidates([CacheTag::Users]),
        )
        .await?;
        Ok(())
    }

    pub async fn create_admin(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        require(&request.name, "Name")?;
        require(&request.email, "Email")?;
        require(&request.password, "Password")?;

        let mut body = to_body(request)?;
        if let Value::Object(fields) = &mut body {
            fields.insert("role".to_string(), json!(Role::Admin.as_str()));
        }
        let response = self
            .send(
                ApiRequest::post("/users/create-user")
                    .with_body(body)
                    .invalidates([CacheTag::Admins]),
            )
            .await?;
        decode(data(response))
    }

    pub async fn delete_admin(&self, id: &str) -> Result<(), ApiError> {
        require(id, "Admin id")?;
        self.send(ApiRequest::delete(format!("/users/admin/{}", segment(id))).invalidates([CacheTag::Admins]))
            .await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        require(id, "User id")?;
        self.send(ApiRequest::delete(format!("/users/{}", segment(id))).invalidates([CacheTag::Users]))
            .await?;
        Ok(())
    }
}
