use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shopfront")]
#[command(about = "Storefront and admin client for the e-commerce backend", version)]
pub struct Cli {
    /// Settings file (JSON). Falls back to $SHOPFRONT_SETTINGS, then defaults.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct Credentials {
    /// Account email, for commands that need a session
    #[arg(long, global = true, env = "SHOPFRONT_EMAIL")]
    pub email: Option<String>,

    #[arg(long, global = true, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Browse the catalogue
    Products(ProductsArgs),
    /// Show one product
    Product { id: String },
    /// List categories
    Categories,
    /// Manage the signed-in shopper's cart
    #[command(subcommand)]
    Cart(CartCommand),
    /// Place an order for everything in the cart
    Checkout(CheckoutArgs),
    /// List the signed-in shopper's orders
    Orders,
    /// Show one order
    Order { id: String },
    /// Create a shopper account
    Register(AccountArgs),
    /// Store administration
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
pub struct ProductsArgs {
    /// Exact category name ("All" for every category)
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub min_price: Option<f64>,
    #[arg(long)]
    pub max_price: Option<f64>,
    /// "Best Rating", "Price: Low to High", "Price: High to Low" or "Newest Arrivals"
    #[arg(long)]
    pub sort: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Only featured products
    #[arg(long)]
    pub featured: bool,
}

#[derive(Subcommand, Debug)]
pub enum CartCommand {
    Show,
    Add {
        product_id: String,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    Update {
        product_id: String,
        quantity: i64,
    },
    Remove {
        product_id: String,
    },
    Clear,
}

#[derive(Args, Debug)]
pub struct CheckoutArgs {
    #[arg(long)]
    pub address: String,
    #[arg(long)]
    pub city: String,
    #[arg(long)]
    pub postal_code: String,
    #[arg(long)]
    pub country: String,
    #[arg(long)]
    pub phone: Option<String>,
    /// card, nagad, bkash or cod
    #[arg(long, default_value = "cod")]
    pub payment: String,
}

#[derive(Args, Debug)]
pub struct AccountArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long = "account-email")]
    pub account_email: String,
    #[arg(long = "account-password")]
    pub account_password: String,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

#[derive(Args, Debug)]
pub struct NewProductArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long)]
    pub price: f64,
    #[arg(long)]
    pub discount: Option<f64>,
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub brand: Option<String>,
    #[arg(long, default_value_t = 0)]
    pub stock: u32,
    #[arg(long = "image")]
    pub images: Vec<String>,
    #[arg(long)]
    pub featured: bool,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    Users,
    Admins,
    Admin { id: String },
    /// Set a user's status (in-progress or blocked)
    UserStatus { id: String, status: String },
    DeleteUser { id: String },
    CreateAdmin(AccountArgs),
    DeleteAdmin { id: String },
    AddProduct(NewProductArgs),
    DeleteProduct { id: String },
    AddCategory {
        name: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// Every order in the store
    Orders,
    OrderStatus { id: String, status: String },
    DeleteOrder { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_product_filters() {
        let cli = Cli::parse_from([
            "shopfront",
            "products",
            "--category",
            "Electronics",
            "--max-price",
            "500",
            "--sort",
            "Newest Arrivals",
            "--page",
            "2",
        ]);
        let Command::Products(args) = cli.command else {
            panic!("expected products command");
        };
        assert_eq!(args.category.as_deref(), Some("Electronics"));
        assert_eq!(args.max_price, Some(500.0));
        assert_eq!(args.page, 2);
    }

    #[test]
    fn parses_cart_update_with_global_credentials() {
        let cli = Cli::parse_from([
            "shopfront",
            "cart",
            "update",
            "p1",
            "3",
            "--email",
            "a@b.c",
            "--password",
            "secret",
        ]);
        assert!(matches!(
            cli.command,
            Command::Cart(CartCommand::Update { ref product_id, quantity: 3 }) if product_id == "p1"
        ));
        assert_eq!(cli.credentials.email.as_deref(), Some("a@b.c"));
    }
}
