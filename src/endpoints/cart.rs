use super::{data, decode, require};
use crate::cache::CacheTag;
use crate::checkout::{decide_quantity_change, DecideQuantityChangeParams, QuantityDecision};
use crate::client::{segment, ApiClient, ApiError, ApiRequest, Transport};
use crate::types::{Cart, CartItem};
use serde_json::{json, Value};

impl<T: Transport> ApiClient<T> {
    /// The signed-in shopper's cart; a shopper without one gets an empty cart.
    pub async fn cart(&self) -> Result<Cart, ApiError> {
        let response = self
            .send(ApiRequest::get("/cart").provides([CacheTag::Cart]))
            .await?;
        match data(response) {
            Value::Null => Ok(Cart::default()),
            cart => decode(cart),
        }
    }

    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> Result<(), ApiError> {
        require(product_id, "Product id")?;
        if quantity == 0 {
            return Err(ApiError::Validation("Quantity must be at least 1".to_string()));
        }
        self.send(
            ApiRequest::post("/cart/add-to-cart")
                .with_body(json!({ "productId": product_id.trim(), "quantity": quantity }))
                .invalidates([CacheTag::Cart]),
        )
        .await?;
        Ok(())
    }

    pub async fn update_cart_item(&self, product_id: &str, quantity: u32) -> Result<(), ApiError> {
        require(product_id, "Product id")?;
        self.send(
            ApiRequest::put("/cart/update-cart")
                .with_body(json!({ "productId": product_id.trim(), "quantity": quantity }))
                .invalidates([CacheTag::Cart]),
        )
        .await?;
        Ok(())
    }

    /// Sets a line's quantity, refusing values outside `[1, stock]` before
    /// anything is sent. Returns whether an update was dispatched.
    pub async fn set_cart_quantity(&self, item: &CartItem, requested: i64) -> Result<bool, ApiError> {
        let decision = decide_quantity_change(DecideQuantityChangeParams {
            current: item.quantity,
            requested,
            stock: item.product.stock,
        });
        match decision {
            QuantityDecision::Unchanged => Ok(false),
            QuantityDecision::Update(quantity) => {
                self.update_cart_item(&item.product.id, quantity).await?;
                Ok(true)
            }
            QuantityDecision::BelowMinimum => Err(ApiError::Validation(
                "Quantity must be at least 1; remove the item instead".to_string(),
            )),
            QuantityDecision::AboveStock { stock } => Err(ApiError::Validation(format!(
                "Only {stock} in stock"
            ))),
        }
    }

    pub async fn remove_from_cart(&self, product_id: &str) -> Result<(), ApiError> {
        require(product_id, "Product id")?;
        self.send(
            ApiRequest::delete(format!("/cart/remove-from-cart/{}", segment(product_id)))
                .with_body(json!({ "productId": product_id.trim() }))
                .invalidates([CacheTag::Cart]),
        )
        .await?;
        Ok(())
    }

    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        self.send(ApiRequest::delete("/cart/clear-cart").invalidates([CacheTag::Cart]))
            .await?;
        Ok(())
    }
}
