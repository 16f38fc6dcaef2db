use crate::types::{Cart, NewOrder, NewOrderItem, PaymentMethod, ShippingInfo, User};
use thiserror::Error;

const TAX_RATE: f64 = 0.10;
const FLAT_SHIPPING: f64 = 15.99;
const PENDING_STATUS: &str = "Pending";

fn round_cents(amount: f64) -> f64 {
  (amount * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartSummary {
  pub item_count: u32,
  pub subtotal: f64,
  pub shipping: f64,
  pub tax: f64,
  pub total: f64,
}

pub fn summarize_cart(cart: &Cart) -> CartSummary {
  let item_count = cart.items.iter().map(|item| item.quantity).sum();
  let subtotal: f64 = cart
    .items
    .iter()
    .map(|item| item.product.effective_price() * f64::from(item.quantity))
    .sum();
  let shipping = if cart.items.is_empty() { 0.0 } else { FLAT_SHIPPING };
  let tax = subtotal * TAX_RATE;

  CartSummary {
    item_count,
    subtotal: round_cents(subtotal),
    shipping,
    tax: round_cents(tax),
    total: round_cents(subtotal + shipping + tax),
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityDecision {
  Update(u32),
  Unchanged,
  BelowMinimum,
  AboveStock { stock: u32 },
}

pub struct DecideQuantityChangeParams {
  pub current: u32,
  pub requested: i64,
  pub stock: u32,
}

/// Cart lines hold between one unit and the product's stock.
pub fn decide_quantity_change(params: DecideQuantityChangeParams) -> QuantityDecision {
  if params.requested < 1 {
    return QuantityDecision::BelowMinimum;
  }
  if params.requested > i64::from(params.stock) {
    return QuantityDecision::AboveStock { stock: params.stock };
  }
  let requested = params.requested as u32;
  if requested == params.current {
    QuantityDecision::Unchanged
  } else {
    QuantityDecision::Update(requested)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
  #[error("No items to order.")]
  EmptyCart,
  #[error("Please log in to place an order.")]
  NotSignedIn,
  #[error("Please fill in all shipping information (missing: {}).", .0.join(", "))]
  MissingShipping(Vec<&'static str>),
}

fn missing_shipping_fields(shipping: &ShippingInfo) -> Vec<&'static str> {
  [
    ("address", &shipping.address),
    ("city", &shipping.city),
    ("postal code", &shipping.postal_code),
    ("country", &shipping.country),
  ]
  .into_iter()
  .filter(|(_, value)| value.trim().is_empty())
  .map(|(name, _)| name)
  .collect()
}

pub struct BuildOrderParams<'a> {
  pub cart: &'a Cart,
  pub user: Option<&'a User>,
  pub shipping: ShippingInfo,
  pub payment_method: PaymentMethod,
}

/// Validates a checkout and assembles the order body. Nothing is sent when
/// this fails.
pub fn build_order(params: BuildOrderParams<'_>) -> Result<NewOrder, CheckoutError> {
  if params.cart.items.is_empty() {
    return Err(CheckoutError::EmptyCart);
  }
  let user = params
    .user
    .filter(|u| !u.id.trim().is_empty())
    .ok_or(CheckoutError::NotSignedIn)?;
  let missing = missing_shipping_fields(&params.shipping);
  if !missing.is_empty() {
    return Err(CheckoutError::MissingShipping(missing));
  }

  let order_items = params
    .cart
    .items
    .iter()
    .map(|item| NewOrderItem {
      product: item.product.id.clone(),
      qty: item.quantity,
      price: item.product.effective_price(),
    })
    .collect();

  Ok(NewOrder {
    user_id: user.id.clone(),
    phone: params.shipping.phone.clone().or_else(|| user.phone.clone()),
    order_items,
    shipping_info: params.shipping,
    payment_method: params.payment_method,
    total_price: summarize_cart(params.cart).total,
    status: PENDING_STATUS,
  })
}

/// What happened after an order was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
  /// Cash on delivery: the order is placed and the cart was cleared.
  Placed,
  /// Online payment: the shopper continues at `payment_url`.
  AwaitingPayment { payment_url: String },
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{CartItem, CartProduct, Role};

  fn line(id: &str, price: f64, final_price: Option<f64>, quantity: u32) -> CartItem {
    CartItem {
      product: CartProduct {
        id: id.to_string(),
        title: format!("Item {id}"),
        images: Vec::new(),
        price,
        final_price,
        stock: 10,
      },
      quantity,
    }
  }

  fn shopper() -> User {
    User {
      id: "u1".to_string(),
      name: Some("Rahim".to_string()),
      email: Some("rahim@example.com".to_string()),
      phone: Some("01700000000".to_string()),
      address: None,
      role: Role::User,
      status: None,
    }
  }

  fn shipping() -> ShippingInfo {
    ShippingInfo {
      address: "House 1, Road 2".to_string(),
      city: "Dhaka".to_string(),
      postal_code: "1207".to_string(),
      country: "Bangladesh".to_string(),
      phone: None,
    }
  }

  #[test]
  fn summary_uses_discounted_prices_tax_and_flat_shipping() {
    let cart = Cart {
      items: vec![line("a", 100.0, Some(80.0), 2), line("b", 50.0, None, 1)],
    };
    let summary = summarize_cart(&cart);
    assert_eq!(summary.item_count, 3);
    assert_eq!(summary.subtotal, 210.0);
    assert_eq!(summary.tax, 21.0);
    assert_eq!(summary.shipping, 15.99);
    assert_eq!(summary.total, 246.99);
  }

  #[test]
  fn empty_cart_has_no_shipping() {
    let summary = summarize_cart(&Cart::default());
    assert_eq!(summary.shipping, 0.0);
    assert_eq!(summary.total, 0.0);
  }

  #[test]
  fn quantity_stays_within_one_and_stock() {
    let decide = |current, requested| {
      decide_quantity_change(DecideQuantityChangeParams {
        current,
        requested,
        stock: 3,
      })
    };
    assert_eq!(decide(1, 0), QuantityDecision::BelowMinimum);
    assert_eq!(decide(3, 4), QuantityDecision::AboveStock { stock: 3 });
    assert_eq!(decide(2, 2), QuantityDecision::Unchanged);
    assert_eq!(decide(2, 3), QuantityDecision::Update(3));
  }

  #[test]
  fn build_order_rejects_incomplete_checkouts() {
    let user = shopper();
    let err = build_order(BuildOrderParams {
      cart: &Cart::default(),
      user: Some(&user),
      shipping: shipping(),
      payment_method: PaymentMethod::CashOnDelivery,
    })
    .unwrap_err();
    assert_eq!(err, CheckoutError::EmptyCart);

    let cart = Cart {
      items: vec![line("a", 10.0, None, 1)],
    };
    let err = build_order(BuildOrderParams {
      cart: &cart,
      user: None,
      shipping: shipping(),
      payment_method: PaymentMethod::CashOnDelivery,
    })
    .unwrap_err();
    assert_eq!(err, CheckoutError::NotSignedIn);

    let err = build_order(BuildOrderParams {
      cart: &cart,
      user: Some(&user),
      shipping: ShippingInfo {
        city: " ".to_string(),
        country: String::new(),
        ..shipping()
      },
      payment_method: PaymentMethod::Card,
    })
    .unwrap_err();
    assert_eq!(err, CheckoutError::MissingShipping(vec!["city", "country"]));
    assert_eq!(
      err.to_string(),
      "Please fill in all shipping information (missing: city, country)."
    );
  }

  #[test]
  fn build_order_assembles_items_and_totals() {
    let user = shopper();
    let cart = Cart {
      items: vec![line("a", 100.0, Some(90.0), 1)],
    };
    let order = build_order(BuildOrderParams {
      cart: &cart,
      user: Some(&user),
      shipping: shipping(),
      payment_method: PaymentMethod::Nagad,
    })
    .unwrap();

    assert_eq!(order.user_id, "u1");
    assert_eq!(order.phone.as_deref(), Some("01700000000"));
    assert_eq!(order.order_items.len(), 1);
    assert_eq!(order.order_items[0].price, 90.0);
    assert_eq!(order.total_price, 114.99);
    assert_eq!(order.status, "Pending");
  }
}
