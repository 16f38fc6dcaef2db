use crate::access::{authorize, Access, ADMIN_ROLES, SHOPPER_ROLES};
use crate::catalog::{browse, price_ceiling, CatalogFilter, CatalogQuery, PriceRange, SortKey, ALL_CATEGORIES};
use crate::cli::{AccountArgs, AdminCommand, CartCommand, CheckoutArgs, Cli, Command, Credentials, ProductsArgs};
use crate::client::{ApiError, StatusClass};
use crate::formatters::{
  format_cart, format_catalog_page, format_category_line, format_checkout_outcome, format_notification,
  format_order_line, format_product_detail, format_user_line,
};
use crate::notifications::Notification;
use crate::settings::SettingsStore;
use crate::state::AppState;
use crate::types::{NewCategory, NewProduct, OrderStatus, PaymentMethod, RegisterRequest, Role, ShippingInfo};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

pub fn run() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
    Ok(runtime) => runtime,
    Err(e) => {
      eprintln!("error: failed to start runtime: {e}");
      return ExitCode::FAILURE;
    }
  };
  runtime.block_on(execute(cli))
}

async fn execute(cli: Cli) -> ExitCode {
  let state = match SettingsStore::from_env_or(cli.settings.as_deref())
    .map_err(anyhow::Error::from)
    .and_then(|settings| AppState::from_settings(settings).context("failed to start client"))
  {
    Ok(state) => state,
    Err(e) => {
      eprintln!("error: {e:#}");
      return ExitCode::FAILURE;
    }
  };
  info!(base_url = %state.config.base_url, "client ready");

  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let janitor = state.spawn_janitor(shutdown_rx);
  let mut notifications = state.notifier.subscribe();

  let exit = match dispatch(&state, &cli.credentials, cli.command).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      match err.downcast_ref::<ApiError>() {
        // 403 and 404 were already announced by the client.
        Some(api) if matches!(api.class(), Some(StatusClass::Forbidden | StatusClass::NotFound)) => {}
        Some(api) => state.notifier.notify_error(api),
        None => eprintln!("error: {err:#}"),
      }
      ExitCode::FAILURE
    }
  };

  print_notifications(&mut notifications);
  let _ = shutdown_tx.send(true);
  let _ = janitor.await;
  exit
}

fn print_notifications(rx: &mut broadcast::Receiver<Notification>) {
  loop {
    match rx.try_recv() {
      Ok(notification) => eprintln!("{}", format_notification(&notification)),
      Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
        debug!(skipped, "notifications dropped");
      }
      Err(_) => break,
    }
  }
}

/// Logs in with the supplied credentials (if any) and checks the resulting
/// role against `allowed`.
async fn sign_in(state: &AppState, credentials: &Credentials, allowed: &[Role]) -> Result<()> {
  if let (Some(email), Some(password)) = (&credentials.email, &credentials.password) {
    state.client.login(email, password).await?;
  }
  match authorize(&state.current_session(), allowed) {
    Access::Granted => Ok(()),
    Access::LoginRequired => {
      bail!("this command needs an account; pass --email and --password (or set SHOPFRONT_EMAIL and SHOPFRONT_PASSWORD)")
    }
    Access::Forbidden => bail!("your account is not allowed to do that"),
  }
}

async fn dispatch(state: &AppState, credentials: &Credentials, command: Command) -> Result<()> {
  let client = &state.client;
  match command {
    Command::Products(args) => list_products(state, args).await,
    Command::Product { id } => {
      println!("{}", format_product_detail(&client.product(&id).await?));
      Ok(())
    }
    Command::Categories => {
      for category in client.categories().await? {
        println!("{}", format_category_line(&category));
      }
      Ok(())
    }
    Command::Cart(cart) => {
      sign_in(state, credentials, &SHOPPER_ROLES).await?;
      run_cart(state, cart).await
    }
    Command::Checkout(args) => {
      sign_in(state, credentials, &SHOPPER_ROLES).await?;
      checkout(state, args).await
    }
    Command::Orders => {
      sign_in(state, credentials, &SHOPPER_ROLES).await?;
      let session = state.current_session();
      let user_id = session.user_id().ok_or_else(|| anyhow!("no user id in session"))?;
      let orders = client.orders_for_user(user_id).await?;
      if orders.is_empty() {
        println!("No orders yet.");
      }
      for order in &orders {
        println!("{}", format_order_line(order));
      }
      Ok(())
    }
    Command::Order { id } => {
      sign_in(state, credentials, &SHOPPER_ROLES).await?;
      println!("{}", format_order_line(&client.order(&id).await?));
      Ok(())
    }
    Command::Register(account) => {
      let user = client.register(&register_request(account)).await?;
      state
        .notifier
        .success(format!("Account created for {}", user.email.as_deref().unwrap_or(&user.id)));
      Ok(())
    }
    Command::Admin(admin) => {
      sign_in(state, credentials, &ADMIN_ROLES).await?;
      run_admin(state, admin).await
    }
  }
}

async fn list_products(state: &AppState, args: ProductsArgs) -> Result<()> {
  let client = &state.client;
  let products = match (&args.category, args.featured) {
    (_, true) => client.featured_products().await?,
    (Some(category), false) if category != ALL_CATEGORIES => client.products_in_category(category).await?,
    _ => client.products().await?,
  };

  let sort = match args.sort.as_deref() {
    Some(label) => label.parse::<SortKey>()?,
    None => SortKey::default(),
  };
  let price = match (args.min_price, args.max_price) {
    (None, None) => None,
    (min, max) => Some(PriceRange {
      min: min.unwrap_or(0.0),
      max: max.unwrap_or_else(|| price_ceiling(&products)),
    }),
  };
  let query = CatalogQuery {
    filter: CatalogFilter {
      category: args.category.unwrap_or_else(|| ALL_CATEGORIES.to_string()),
      price,
    },
    sort,
    page: args.page,
    page_size: state.page_size(),
  };

  println!("{}", format_catalog_page(&browse(&products, &query)));
  Ok(())
}

async fn run_cart(state: &AppState, command: CartCommand) -> Result<()> {
  let client = &state.client;
  match command {
    CartCommand::Show => {}
    CartCommand::Add { product_id, quantity } => {
      client.add_to_cart(&product_id, quantity).await?;
      state.notifier.success("Product added to cart successfully!");
    }
    CartCommand::Update { product_id, quantity } => {
      let cart = client.cart().await?;
      let item = cart
        .items
        .iter()
        .find(|item| item.product.id == product_id)
        .ok_or_else(|| anyhow!("product {product_id} is not in the cart"))?;
      if client.set_cart_quantity(item, quantity).await? {
        state.notifier.success("Cart updated");
      }
    }
    CartCommand::Remove { product_id } => {
      client.remove_from_cart(&product_id).await?;
      state.notifier.success("Item removed from cart");
    }
    CartCommand::Clear => {
      client.clear_cart().await?;
      state.notifier.success("Cart cleared");
    }
  }
  println!("{}", format_cart(&client.cart().await?));
  Ok(())
}

async fn checkout(state: &AppState, args: CheckoutArgs) -> Result<()> {
  let payment_method = PaymentMethod::parse(&args.payment)
    .ok_or_else(|| anyhow!("unknown payment method {:?}; use card, nagad, bkash or cod", args.payment))?;
  let cart = state.client.cart().await?;
  let shipping = ShippingInfo {
    address: args.address,
    city: args.city,
    postal_code: args.postal_code,
    country: args.country,
    phone: args.phone,
  };

  let outcome = state.client.place_order(&cart, shipping, payment_method).await?;
  state.notifier.success(format_checkout_outcome(&outcome));
  Ok(())
}

fn register_request(account: AccountArgs) -> RegisterRequest {
  RegisterRequest {
    name: account.name,
    email: account.account_email,
    password: account.account_password,
    phone: account.phone,
    address: account.address,
  }
}

async fn run_admin(state: &AppState, command: AdminCommand) -> Result<()> {
  let client = &state.client;
  match command {
    AdminCommand::Users => {
      for user in client.all_users().await? {
        println!("{}", format_user_line(&user));
      }
    }
    AdminCommand::Admins => {
      for admin in client.all_admins().await? {
        println!("{}", format_user_line(&admin));
      }
    }
    AdminCommand::Admin { id } => println!("{}", format_user_line(&client.admin(&id).await?)),
    AdminCommand::UserStatus { id, status } => {
      client.change_user_status(&id, &status).await?;
      state.notifier.success("Status updated successfully");
    }
    AdminCommand::DeleteUser { id } => {
      client.delete_user(&id).await?;
      state.notifier.success("User deleted");
    }
    AdminCommand::CreateAdmin(account) => {
      client.create_admin(&register_request(account)).await?;
      state.notifier.success("Admin created successfully!");
    }
    AdminCommand::DeleteAdmin { id } => {
      client.delete_admin(&id).await?;
      state.notifier.success("Admin deleted");
    }
    AdminCommand::AddProduct(args) => {
      let product = NewProduct {
        title: args.title,
        description: args.description,
        price: args.price,
        discount: args.discount,
        category: args.category,
        brand: args.brand,
        stock: args.stock,
        images: args.images,
        is_featured: args.featured,
      };
      client.create_product(&product).await?;
      state.notifier.success("Product added successfully!");
    }
    AdminCommand::DeleteProduct { id } => {
      client.delete_product(&id).await?;
      state.notifier.success("Product deleted");
    }
    AdminCommand::AddCategory { name, image } => {
      client.create_category(&NewCategory { name, image }).await?;
      state.notifier.success("Category added");
    }
    AdminCommand::Orders => {
      for order in client.orders().await? {
        println!("{}", format_order_line(&order));
      }
    }
    AdminCommand::OrderStatus { id, status } => {
      let status = OrderStatus::parse(&status).ok_or_else(|| anyhow!("unknown order status {status:?}"))?;
      client.update_order_status(&id, status).await?;
      state.notifier.success("Order status updated successfully");
    }
    AdminCommand::DeleteOrder { id } => {
      client.delete_order(&id).await?;
      state.notifier.success("Order deleted");
    }
  }
  Ok(())
}
