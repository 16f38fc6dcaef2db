use super::{data, decode, decode_list, require, to_body};
use crate::cache::CacheTag;
use crate::checkout::{build_order, BuildOrderParams, CheckoutOutcome};
use crate::client::{segment, ApiClient, ApiError, ApiRequest, Transport};
use crate::types::{Cart, NewOrder, Order, OrderCreated, OrderStatus, PaymentMethod, ShippingInfo};
use serde_json::{json, Value};
use tracing::{info, warn};

impl<T: Transport> ApiClient<T> {
    pub async fn create_order(&self, order: &NewOrder) -> Result<OrderCreated, ApiError> {
        let response = self
            .send(
                ApiRequest::post("/orders/create-order")
                    .with_body(to_body(order)?)
                    .invalidates([CacheTag::Orders]),
            )
            .await?;
        match data(response) {
            Value::Null => Ok(OrderCreated { payment_session: None }),
            created => decode(created),
        }
    }

    /// Validates the checkout, creates the order and settles the cart.
    /// Cash on delivery finishes here; online methods hand back the payment
    /// page the shopper must visit.
    pub async fn place_order(
        &self,
        cart: &Cart,
        shipping: ShippingInfo,
        payment_method: PaymentMethod,
    ) -> Result<CheckoutOutcome, ApiError> {
        let session = self.session().snapshot();
        let order = build_order(BuildOrderParams {
            cart,
            user: session.user(),
            shipping,
            payment_method,
        })
        .map_err(|e| ApiError::Validation(e.to_string()))?;

        let created = self.create_order(&order).await?;
        info!(method = payment_method.label(), items = order.order_items.len(), "order created");

        if payment_method == PaymentMethod::CashOnDelivery {
            self.clear_cart().await?;
            return Ok(CheckoutOutcome::Placed);
        }

        let payment_url = created
            .payment_session
            .map(|session| session.payment_url)
            .filter(|url| !url.trim().is_empty());
        let Some(payment_url) = payment_url else {
            warn!(method = payment_method.label(), "order created without a payment url");
            return Err(ApiError::Decode(
                "Could not initiate payment. Please try again or contact support.".to_string(),
            ));
        };
        self.clear_cart().await?;
        Ok(CheckoutOutcome::AwaitingPayment { payment_url })
    }

    pub async fn orders(&self) -> Result<Vec<Order>, ApiError> {
        let response = self
            .send(ApiRequest::get("/orders").provides([CacheTag::Orders]))
            .await?;
        decode_list(response)
    }

    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, ApiError> {
        require(user_id, "User id")?;
        let response = self
            .send(ApiRequest::get(format!("/orders/user/{}", segment(user_id))).provides([CacheTag::Orders]))
            .await?;
        decode_list(response)
    }

    pub async fn order(&self, id: &str) -> Result<Order, ApiError> {
        require(id, "Order id")?;
        let response = self
            .send(ApiRequest::get(format!("/orders/{}", segment(id))).provides([CacheTag::Orders]))
            .await?;
        decode(data(response))
    }

    pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> Result<(), ApiError> {
        require(id, "Order id")?;
        self.send(
            ApiRequest::put(format!("/orders/{}", segment(id)))
                .with_body(json!({ "status": status.as_str() }))
                .invalidates([CacheTag::Orders]),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_order(&self, id: &str) -> Result<(), ApiError> {
        require(id, "Order id")?;
        self.send(ApiRequest::delete(format!("/orders/{}", segment(id))).invalidates([CacheTag::Orders]))
            .await?;
        Ok(())
    }
}
