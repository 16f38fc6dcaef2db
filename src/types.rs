use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// Account record as returned by the backend and as decoded from access
/// token claims. Records carry `_id`, `id` or `userId` depending on the
/// endpoint; all three collapse into `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "UserRecord", rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    object_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default = "default_role")]
    role: Role,
    #[serde(default)]
    status: Option<String>,
}

fn default_role() -> Role {
    Role::User
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        let id = non_blank(record.id)
            .or_else(|| non_blank(record.object_id))
            .or_else(|| non_blank(record.user_id))
            .unwrap_or_default();
        Self {
            id,
            name: non_blank(record.name),
            email: non_blank(record.email),
            phone: non_blank(record.phone),
            address: non_blank(record.address),
            role: record.role,
            status: non_blank(record.status),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub final_price: Option<f64>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub ratings: Option<f64>,
    #[serde(default)]
    pub ratings_count: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Price the shopper actually pays: the discounted price when the backend
    /// computed one, the base price otherwise.
    pub fn effective_price(&self) -> f64 {
        self.final_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// Product as populated inside a cart line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub final_price: Option<f64>,
    #[serde(default)]
    pub stock: u32,
}

impl CartProduct {
    pub fn effective_price(&self) -> f64 {
        self.final_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    #[serde(rename = "productId")]
    pub product: CartProduct,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentMethod {
    Card,
    Nagad,
    Bkash,
    #[default]
    CashOnDelivery,
}

impl PaymentMethod {
    /// Label the backend stores on the order.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Card => "Credit/Debit Card",
            Self::Nagad => "Nagad",
            Self::Bkash => "Save bKash Account",
            Self::CashOnDelivery => "Cash on Delivery",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "card" | "credit/debit card" => Some(Self::Card),
            "nagad" => Some(Self::Nagad),
            "bkash" | "save bkash account" => Some(Self::Bkash),
            "cod" | "cash on delivery" => Some(Self::CashOnDelivery),
            _ => None,
        }
    }
}

impl Serialize for PaymentMethod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product: Value,
    pub qty: u32,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: f64,
}

impl OrderItem {
    /// The product reference is either an id or a populated product document.
    pub fn product_id(&self) -> Option<&str> {
        match &self.product {
            Value::String(id) => Some(id.as_str()),
            Value::Object(obj) => obj.get("_id").and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: Value,
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_info: Option<ShippingInfo>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_price: f64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentSession {
    pub payment_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    #[serde(default)]
    pub payment_session: Option<PaymentSession>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product: String,
    pub qty: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub user_id: String,
    pub phone: Option<String>,
    pub order_items: Vec<NewOrderItem>,
    pub shipping_info: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub total_price: f64,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Access token carried in `{ data: { accessToken } }` by login and refresh.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenPayload {
    #[serde(default)]
    pub access_token: Option<String>,
}

impl AccessTokenPayload {
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Accepts numbers and numeric strings; the backend echoes totals the way
/// the client sent them.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("not a number: {s}"))),
        Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!("not a number: {other}"))),
    }
}

/// Like [`lenient_f64`], with null and blank strings read as absent.
fn lenient_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        value => lenient_f64(value).map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_id_collapses_from_any_backend_field() {
        let a: User = serde_json::from_value(json!({"_id": "abc", "role": "admin"})).unwrap();
        assert_eq!(a.id, "abc");
        assert_eq!(a.role, Role::Admin);

        let b: User =
            serde_json::from_value(json!({"_id": "abc", "id": "U-1", "role": "user"})).unwrap();
        assert_eq!(b.id, "U-1");

        let c: User = serde_json::from_value(json!({"userId": "u9", "email": "a@b.c"})).unwrap();
        assert_eq!(c.id, "u9");
        assert_eq!(c.role, Role::User);
    }

    #[test]
    fn product_effective_price_prefers_final_price() {
        let p: Product = serde_json::from_value(json!({
            "_id": "p1", "title": "Lamp", "price": 100, "finalPrice": 80, "stock": 3
        }))
        .unwrap();
        assert_eq!(p.effective_price(), 80.0);

        let q: Product =
            serde_json::from_value(json!({"_id": "p2", "title": "Mug", "price": "12.5"})).unwrap();
        assert_eq!(q.effective_price(), 12.5);
        assert_eq!(q.created_at, None);
    }

    #[test]
    fn string_final_prices_decode() {
        let p: Product = serde_json::from_value(json!({
            "_id": "p1", "title": "Lamp", "price": "100", "discount": "20", "finalPrice": "80.50"
        }))
        .unwrap();
        assert_eq!(p.final_price, Some(80.5));
        assert_eq!(p.discount, Some(20.0));

        let q: Product = serde_json::from_value(json!({
            "_id": "p2", "title": "Mug", "price": 12, "finalPrice": null, "discount": ""
        }))
        .unwrap();
        assert_eq!(q.final_price, None);
        assert_eq!(q.discount, None);

        let item: CartProduct =
            serde_json::from_value(json!({"_id": "p1", "price": 100, "finalPrice": "75"})).unwrap();
        assert_eq!(item.effective_price(), 75.0);
    }

    #[test]
    fn order_total_accepts_string_totals() {
        let o: Order = serde_json::from_value(json!({
            "_id": "o1",
            "userId": "u1",
            "orderItems": [{"product": {"_id": "p1", "title": "Lamp"}, "qty": 2, "price": 10}],
            "paymentMethod": "Cash on Delivery",
            "totalPrice": "51.99",
            "status": "Pending"
        }))
        .unwrap();
        assert_eq!(o.total_price, 51.99);
        assert_eq!(o.order_items[0].product_id(), Some("p1"));
    }

    #[test]
    fn payment_method_serializes_as_label() {
        let v = serde_json::to_value(PaymentMethod::CashOnDelivery).unwrap();
        assert_eq!(v, json!("Cash on Delivery"));
        assert_eq!(PaymentMethod::parse("bkash"), Some(PaymentMethod::Bkash));
        assert_eq!(PaymentMethod::parse("cheque"), None);
    }
}
