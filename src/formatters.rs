use crate::catalog::CatalogPage;
use crate::checkout::{summarize_cart, CheckoutOutcome};
use crate::notifications::{Notification, NotificationLevel};
use crate::types::{Cart, Category, Order, Product, User};

pub(crate) fn format_price(amount: f64) -> String {
    format!("৳{amount:.2}")
}

pub(crate) fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(r) if r > 0.0 => format!("{r:.1}★"),
        _ => "unrated".to_string(),
    }
}

/// One line per product: id, title, price (with the base price when
/// discounted), rating, category and stock.
pub(crate) fn format_product_line(product: &Product) -> String {
    let price = match product.final_price {
        Some(final_price) if final_price < product.price => format!(
            "{} (was {})",
            format_price(final_price),
            format_price(product.price)
        ),
        _ => format_price(product.effective_price()),
    };
    let stock = if product.stock == 0 {
        "out of stock".to_string()
    } else {
        format!("{} in stock", product.stock)
    };
    format!(
        "{}  {}  {}  {}  [{}]  {}",
        product.id,
        product.title,
        price,
        format_rating(product.ratings),
        product.category,
        stock
    )
}

pub(crate) fn format_product_detail(product: &Product) -> String {
    let mut lines = vec![format_product_line(product)];
    if let Some(brand) = &product.brand {
        lines.push(format!("Brand: {brand}"));
    }
    if let Some(count) = product.ratings_count {
        lines.push(format!("Reviews: {count}"));
    }
    if let Some(created_at) = product.created_at {
        lines.push(format!("Listed: {}", created_at.format("%Y-%m-%d")));
    }
    if !product.description.trim().is_empty() {
        lines.push(String::new());
        lines.push(product.description.trim().to_string());
    }
    lines.join("\n")
}

pub(crate) fn format_catalog_page(page: &CatalogPage) -> String {
    let mut lines: Vec<String> = page.items.iter().map(format_product_line).collect();
    if lines.is_empty() {
        lines.push("No products match the current filters.".to_string());
    }
    lines.push(format!(
        "Page {} of {} ({} products)",
        page.page, page.total_pages, page.total_items
    ));
    lines.join("\n")
}

pub(crate) fn format_category_line(category: &Category) -> String {
    format!("{}  {}", category.id, category.name)
}

pub(crate) fn format_cart(cart: &Cart) -> String {
    if cart.items.is_empty() {
        return "Your cart is empty.".to_string();
    }
    let mut lines: Vec<String> = cart
        .items
        .iter()
        .map(|item| {
            let unit = item.product.effective_price();
            format!(
                "{}  {}  {} x {} = {}",
                item.product.id,
                item.product.title,
                item.quantity,
                format_price(unit),
                format_price(unit * f64::from(item.quantity))
            )
        })
        .collect();

    let summary = summarize_cart(cart);
    lines.push(format!("Subtotal: {}", format_price(summary.subtotal)));
    lines.push(format!("Shipping: {}", format_price(summary.shipping)));
    lines.push(format!("Tax: {}", format_price(summary.tax)));
    lines.push(format!("Total: {}", format_price(summary.total)));
    lines.join("\n")
}

pub(crate) fn format_order_line(order: &Order) -> String {
    let items: u32 = order.order_items.iter().map(|item| item.qty).sum();
    format!(
        "{}  {}  {} item(s)  {}  {}",
        order.id,
        order.status,
        items,
        format_price(order.total_price),
        order.payment_method
    )
}

pub(crate) fn format_user_line(user: &User) -> String {
    format!(
        "{}  {}  {}  {}  {}",
        user.id,
        user.name.as_deref().unwrap_or("-"),
        user.email.as_deref().unwrap_or("-"),
        user.role.as_str(),
        user.status.as_deref().unwrap_or("-")
    )
}

pub(crate) fn format_checkout_outcome(outcome: &CheckoutOutcome) -> String {
    match outcome {
        CheckoutOutcome::Placed => "Order placed successfully!".to_string(),
        CheckoutOutcome::AwaitingPayment { payment_url } => {
            format!("Continue to payment: {payment_url}")
        }
    }
}

pub(crate) fn format_notification(notification: &Notification) -> String {
    let level = match notification.level {
        NotificationLevel::Info => "info",
        NotificationLevel::Success => "ok",
        NotificationLevel::Error => "error",
    };
    format!("[{level}] {}", notification.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartItem, CartProduct};

    fn discounted_lamp() -> Product {
        serde_json::from_value(serde_json::json!({
            "_id": "p1",
            "title": "Desk Lamp",
            "price": 100,
            "finalPrice": 80,
            "category": "Home",
            "stock": 3,
            "ratings": 4.3
        }))
        .unwrap()
    }

    #[test]
    fn product_line_shows_discount_and_rating() {
        assert_eq!(
            format_product_line(&discounted_lamp()),
            "p1  Desk Lamp  ৳80.00 (was ৳100.00)  4.3★  [Home]  3 in stock"
        );
    }

    #[test]
    fn cart_lists_lines_and_totals() {
        let cart = Cart {
            items: vec![CartItem {
                product: CartProduct {
                    id: "p1".to_string(),
                    title: "Desk Lamp".to_string(),
                    images: Vec::new(),
                    price: 100.0,
                    final_price: Some(80.0),
                    stock: 3,
                },
                quantity: 2,
            }],
        };
        let text = format_cart(&cart);
        assert!(text.starts_with("p1  Desk Lamp  2 x ৳80.00 = ৳160.00"));
        assert!(text.ends_with("Total: ৳191.99"));
        assert_eq!(format_cart(&Cart::default()), "Your cart is empty.");
    }

    #[test]
    fn empty_catalog_page_says_so() {
        let page = CatalogPage {
            items: Vec::new(),
            page: 1,
            total_pages: 1,
            total_items: 0,
        };
        assert_eq!(
            format_catalog_page(&page),
            "No products match the current filters.\nPage 1 of 1 (0 products)"
        );
    }
}
