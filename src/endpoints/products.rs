use super::{data, decode, decode_list, require, to_body};
use crate::cache::CacheTag;
use crate::client::{segment, with_query, ApiClient, ApiError, ApiRequest, Transport};
use crate::types::{NewProduct, Product};

impl<T: Transport> ApiClient<T> {
    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        let response = self
            .send(ApiRequest::get("/products").provides([CacheTag::Products]))
            .await?;
        decode_list(response)
    }

    pub async fn featured_products(&self) -> Result<Vec<Product>, ApiError> {
        let path = with_query("/products", &[("isFeatured", "true")]);
        let response = self
            .send(ApiRequest::get(path).provides([CacheTag::Products]))
            .await?;
        decode_list(response)
    }

    pub async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, ApiError> {
        require(category, "Category")?;
        let path = with_query("/products", &[("category", category.trim())]);
        let response = self
            .send(ApiRequest::get(path).provides([CacheTag::Products]))
            .await?;
        decode_list(response)
    }

    pub async fn product(&self, id: &str) -> Result<Product, ApiError> {
        require(id, "Product id")?;
        let response = self
            .send(ApiRequest::get(format!("/products/{}", segment(id))).provides([CacheTag::Products]))
            .await?;
        decode(data(response))
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
        require(&product.title, "Title")?;
        require(&product.category, "Category")?;
        if !product.price.is_finite() || product.price < 0.0 {
            return Err(ApiError::Validation("Price must be a non-negative number".to_string()));
        }

        let response = self
            .send(
                ApiRequest::post("/products/create-product")
                    .with_body(to_body(product)?)
                    .invalidates([CacheTag::Products]),
            )
            .await?;
        decode(data(response))
    }

    pub async fn delete_product(&self, id: &str) -> Result<(), ApiError> {
        require(id, "Product id")?;
        self.send(ApiRequest::delete(format!("/products/{}", segment(id))).invalidates([CacheTag::Products]))
            .await?;
        Ok(())
    }
}
