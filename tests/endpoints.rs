use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use shopfront_lib::cache::ResponseCache;
use shopfront_lib::checkout::CheckoutOutcome;
use shopfront_lib::client::{ApiClient, ApiError, ClientOptions, HttpMethod};
use shopfront_lib::notifications::Notifier;
use shopfront_lib::state::SessionStore;
use shopfront_lib::testing::MockBackend;
use shopfront_lib::types::{PaymentMethod, RegisterRequest, Role, ShippingInfo};
use std::sync::Arc;

fn client(backend: MockBackend) -> ApiClient<MockBackend> {
    ApiClient::new(
        backend,
        SessionStore::new(),
        Arc::new(ResponseCache::new()),
        Notifier::default(),
        ClientOptions::default(),
    )
}

fn access_token(user_id: &str, role: &str) -> String {
    let claims = json!({ "userId": user_id, "email": format!("{user_id}@example.com"), "role": role });
    format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(claims.to_string()))
}

async fn signed_in(backend: MockBackend, role: &str) -> ApiClient<MockBackend> {
    backend.reply(
        HttpMethod::Post,
        "/auth/login",
        200,
        json!({ "success": true, "data": { "accessToken": access_token("u1", role) } }),
    );
    let client = client(backend);
    client.login("u1@example.com", "123456").await.unwrap();
    client
}

fn shipping() -> ShippingInfo {
    ShippingInfo {
        address: "House 1, Road 2".to_string(),
        city: "Dhaka".to_string(),
        postal_code: "1207".to_string(),
        country: "Bangladesh".to_string(),
        phone: Some("01700000000".to_string()),
    }
}

fn cart_body(quantity: u32) -> Value {
    json!({
        "data": {
            "items": [{
                "productId": { "_id": "p1", "title": "Desk Lamp", "price": 100, "finalPrice": 80, "stock": 4 },
                "quantity": quantity
            }]
        }
    })
}

#[tokio::test]
async fn login_starts_a_session_from_token_claims() {
    let backend = MockBackend::new();
    backend.reply(HttpMethod::Get, "/cart", 200, json!({ "data": null }));
    let client = signed_in(backend, "admin").await;

    let session = client.session().snapshot();
    assert_eq!(session.user_id(), Some("u1"));
    assert_eq!(session.role(), Some(Role::Admin));

    let cart = client.cart().await.unwrap();
    assert!(cart.items.is_empty());

    let calls = client.transport().calls();
    assert_eq!(calls[0].body, Some(json!({ "email": "u1@example.com", "password": "123456" })));
    assert_eq!(calls[1].authorization.as_deref(), Some(access_token("u1", "admin").as_str()));
}

#[tokio::test]
async fn login_without_token_is_rejected() {
    let backend = MockBackend::new();
    backend.reply(HttpMethod::Post, "/auth/login", 200, json!({ "data": {} }));
    let client = client(backend);

    let err = client.login("a@b.c", "pw").await.unwrap_err();
    assert_eq!(err, ApiError::Validation("Invalid credentials".to_string()));
    assert!(!client.session().snapshot().is_authenticated());

    let err = client.login(" ", "pw").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(client.transport().calls().len(), 1);
}

#[tokio::test]
async fn product_lists_unwrap_paged_envelopes() {
    let backend = MockBackend::new();
    backend
        .reply(
            HttpMethod::Get,
            "/products?isFeatured=true",
            200,
            json!({ "data": { "result": [{ "_id": "p1", "title": "Lamp", "price": "49.5", "isFeatured": true }] } }),
        )
        .reply(
            HttpMethod::Get,
            "/products?category=Home%20Decor",
            200,
            json!({ "data": { "result": [] } }),
        );
    let client = client(backend);

    let featured = client.featured_products().await.unwrap();
    assert_eq!(featured.len(), 1);
    assert_eq!(featured[0].price, 49.5);
    assert!(featured[0].is_featured);

    assert!(client.products_in_category("Home Decor").await.unwrap().is_empty());
}

#[tokio::test]
async fn cart_read_is_refetched_after_adding_an_item() {
    let backend = MockBackend::new();
    backend
        .reply(HttpMethod::Get, "/cart", 200, cart_body(1))
        .reply(HttpMethod::Get, "/cart", 200, cart_body(2))
        .reply(HttpMethod::Post, "/cart/add-to-cart", 200, json!({ "success": true }));
    let client = signed_in(backend, "user").await;

    assert_eq!(client.cart().await.unwrap().items[0].quantity, 1);
    assert_eq!(client.cart().await.unwrap().items[0].quantity, 1);
    client.add_to_cart("p1", 1).await.unwrap();
    assert_eq!(client.cart().await.unwrap().items[0].quantity, 2);
    assert_eq!(client.transport().call_count(HttpMethod::Get, "/cart"), 2);
}

#[tokio::test]
async fn quantity_outside_stock_is_refused_before_sending() {
    let backend = MockBackend::new();
    backend.reply(HttpMethod::Get, "/cart", 200, cart_body(2));
    let client = signed_in(backend, "user").await;
    let cart = client.cart().await.unwrap();

    let err = client.set_cart_quantity(&cart.items[0], 5).await.unwrap_err();
    assert_eq!(err, ApiError::Validation("Only 4 in stock".to_string()));
    assert!(!client.set_cart_quantity(&cart.items[0], 2).await.unwrap());
    assert_eq!(client.transport().call_count(HttpMethod::Put, "/cart/update-cart"), 0);
}

#[tokio::test]
async fn cash_on_delivery_places_order_and_clears_cart() {
    let backend = MockBackend::new();
    backend
        .reply(HttpMethod::Get, "/cart", 200, cart_body(2))
        .reply(HttpMethod::Post, "/orders/create-order", 200, json!({ "success": true, "data": { "_id": "o1" } }))
        .reply(HttpMethod::Delete, "/cart/clear-cart", 200, json!({ "success": true }));
    let client = signed_in(backend, "user").await;
    let cart = client.cart().await.unwrap();

    let outcome = client
        .place_order(&cart, shipping(), PaymentMethod::CashOnDelivery)
        .await
        .unwrap();
    assert_eq!(outcome, CheckoutOutcome::Placed);

    let calls = client.transport().calls();
    let order = calls
        .iter()
        .find(|c| c.path == "/orders/create-order")
        .and_then(|c| c.body.clone())
        .unwrap();
    assert_eq!(order["userId"], "u1");
    assert_eq!(order["paymentMethod"], "Cash on Delivery");
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["orderItems"][0]["product"], "p1");
    assert_eq!(order["shippingInfo"]["postalCode"], "1207");
    assert_eq!(order["totalPrice"], 191.99);
    assert_eq!(client.transport().call_count(HttpMethod::Delete, "/cart/clear-cart"), 1);
}

#[tokio::test]
async fn online_payment_returns_payment_url() {
    let backend = MockBackend::new();
    backend
        .reply(HttpMethod::Get, "/cart", 200, cart_body(1))
        .reply(
            HttpMethod::Post,
            "/orders/create-order",
            200,
            json!({ "data": { "paymentSession": { "payment_url": "https://pay.example.com/s/1" } } }),
        )
        .reply(HttpMethod::Delete, "/cart/clear-cart", 200, json!({ "success": true }));
    let client = signed_in(backend, "user").await;
    let cart = client.cart().await.unwrap();

    let outcome = client.place_order(&cart, shipping(), PaymentMethod::Bkash).await.unwrap();
    assert_eq!(
        outcome,
        CheckoutOutcome::AwaitingPayment {
            payment_url: "https://pay.example.com/s/1".to_string()
        }
    );
}

#[tokio::test]
async fn invalid_checkout_sends_nothing() {
    let backend = MockBackend::new();
    backend.reply(HttpMethod::Get, "/cart", 200, cart_body(1));
    let client = signed_in(backend, "user").await;
    let cart = client.cart().await.unwrap();
    let before = client.transport().calls().len();

    let err = client
        .place_order(
            &cart,
            ShippingInfo {
                address: String::new(),
                ..shipping()
            },
            PaymentMethod::Card,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation(message) if message.contains("address")));
    assert_eq!(client.transport().calls().len(), before);
}

#[tokio::test]
async fn create_admin_sends_admin_role() {
    let backend = MockBackend::new();
    backend.reply(
        HttpMethod::Post,
        "/users/create-user",
        200,
        json!({ "data": { "_id": "a2", "email": "ops@example.com", "role": "admin" } }),
    );
    let client = signed_in(backend, "admin").await;

    let admin = client
        .create_admin(&RegisterRequest {
            name: "Ops".to_string(),
            email: "ops@example.com".to_string(),
            password: "secret1".to_string(),
            phone: None,
            address: None,
        })
        .await
        .unwrap();

    assert_eq!(admin.id, "a2");
    let body = client.transport().calls().last().and_then(|c| c.body.clone()).unwrap();
    assert_eq!(body["role"], "admin");
    assert!(body.get("phone").is_none());
}
