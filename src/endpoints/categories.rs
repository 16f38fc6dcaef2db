use super::{data, decode, decode_list, require, to_body};
use crate::cache::CacheTag;
use crate::client::{ApiClient, ApiError, ApiRequest, Transport};
use crate::types::{Category, NewCategory};

impl<T: Transport> ApiClient<T> {
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let response = self
            .send(ApiRequest::get("/categories").provides([CacheTag::Categories]))
            .await?;
        decode_list(response)
    }

    pub async fn create_category(&self, category: &NewCategory) -> Result<Category, ApiError> {
        require(&category.name, "Category name")?;
        let response = self
            .send(
                ApiRequest::post("/categories")
                    .with_body(to_body(category)?)
                    .invalidates([CacheTag::Categories]),
            )
            .await?;
        decode(data(response))
    }
}
