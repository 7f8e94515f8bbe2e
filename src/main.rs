use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;

use storefront::auth::AdminGate;
use storefront::{
  logging, Category, Config, NewOrder, NewProduct, OrderQuery, OrderStatus, Page, ProductPatch,
  ProductQuery, Storefront,
};

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "Catalog and order admin for the storefront data layer")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/storefront/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Admin password for commands that need it, if not already logged in
  #[arg(short, long, global = true)]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(ClapArgs, Debug)]
struct PageArgs {
  /// 1-based page number
  #[arg(long, requires = "limit")]
  page: Option<u32>,

  /// Items per page
  #[arg(long)]
  limit: Option<u32>,
}

impl PageArgs {
  fn page(&self) -> Option<Page> {
    self
      .limit
      .map(|limit| Page::new(self.page.unwrap_or(1), limit))
  }
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show which backend is in use and how much each holds
  Status,
  /// Remember the admin password for later commands
  Login,
  /// Forget the admin login
  Logout,
  /// List products
  Products {
    #[arg(long)]
    category: Option<Category>,
    #[command(flatten)]
    page: PageArgs,
  },
  /// Show one product
  Product { id: String },
  /// Create a product (admin)
  AddProduct {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long, default_value = "supplement")]
    category: Category,
    /// Stock to track (remote backend only)
    #[arg(long)]
    stock: Option<u32>,
  },
  /// Change fields of a product (admin)
  UpdateProduct {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long)]
    category: Option<Category>,
    #[arg(long)]
    stock: Option<u32>,
  },
  /// Delete a product (admin)
  DeleteProduct { id: String },
  /// List orders (admin)
  Orders {
    #[arg(long)]
    status: Option<OrderStatus>,
    #[command(flatten)]
    page: PageArgs,
  },
  /// Show one order (admin)
  Order { id: String },
  /// Place an order for a product
  PlaceOrder {
    #[arg(long)]
    product_id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    region: String,
  },
  /// Set an order's status (admin)
  SetStatus { id: String, status: OrderStatus },
  /// Delete an order (admin)
  DeleteOrder { id: String },
}

impl Command {
  fn needs_admin(&self) -> bool {
    !matches!(
      self,
      Command::Status
        | Command::Login
        | Command::Logout
        | Command::Products { .. }
        | Command::Product { .. }
        | Command::PlaceOrder { .. }
    )
  }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
  let json =
    serde_json::to_string_pretty(value).map_err(|e| eyre!("Failed to encode output: {}", e))?;
  println!("{}", json);
  Ok(())
}

fn require_admin(gate: &AdminGate<'_>, password: Option<&str>) -> Result<()> {
  if gate.is_authenticated() {
    return Ok(());
  }
  match password {
    Some(p) if gate.login(p)? => Ok(()),
    Some(_) => Err(eyre!("Incorrect admin password")),
    None => Err(eyre!(
      "This command needs admin access. Run `storefront login -p <password>` or pass --password."
    )),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Keep the guard alive until exit so buffered log lines are flushed
  let _log_guard = logging::init(&logging::default_log_dir()?)?;

  let config = Config::load(args.config.as_deref())?;
  let store = Storefront::from_config(&config)?;
  let gate = AdminGate::new(config.admin_password(), store.local());

  if args.command.needs_admin() {
    require_admin(&gate, args.password.as_deref())?;
  }

  match args.command {
    Command::Status => {
      let summary = store.summary().await;
      print(&serde_json::json!({
        "remoteConfigured": summary.remote_configured,
        "degraded": summary.degraded,
        "products": summary.products,
        "orders": summary.orders,
        "adminAuthenticated": gate.is_authenticated(),
      }))?;
    }
    Command::Login => {
      let password = args
        .password
        .ok_or_else(|| eyre!("Pass the admin password with --password"))?;
      if !gate.login(&password)? {
        return Err(eyre!("Incorrect admin password"));
      }
      println!("Logged in");
    }
    Command::Logout => {
      gate.logout()?;
      println!("Logged out");
    }
    Command::Products { category, page } => {
      let query = ProductQuery {
        category,
        page: page.page(),
      };
      print(&store.get_products(&query).await)?;
    }
    Command::Product { id } => print(&store.get_product(&id).await)?,
    Command::AddProduct {
      name,
      description,
      price,
      image_url,
      category,
      stock,
    } => {
      let product = NewProduct {
        name,
        description,
        price,
        image_url,
        category,
        stock_quantity: stock,
      };
      print(&store.add_product(product).await)?;
    }
    Command::UpdateProduct {
      id,
      name,
      description,
      price,
      image_url,
      category,
      stock,
    } => {
      let patch = ProductPatch {
        name,
        description,
        price,
        image_url,
        category,
        stock_quantity: stock,
      };
      if patch.is_empty() {
        return Err(eyre!("Nothing to update"));
      }
      print(&store.update_product(&id, &patch).await)?;
    }
    Command::DeleteProduct { id } => print(&store.delete_product(&id).await)?,
    Command::Orders { status, page } => {
      let query = OrderQuery {
        status,
        page: page.page(),
      };
      print(&store.get_orders(&query).await)?;
    }
    Command::Order { id } => print(&store.get_order(&id).await)?,
    Command::PlaceOrder {
      product_id,
      name,
      phone,
      address,
      region,
    } => {
      let order = NewOrder {
        product_id,
        customer_name: name,
        customer_phone: phone,
        customer_address: address,
        customer_region: region,
        status: None,
      };
      print(&store.add_order(order).await)?;
    }
    Command::SetStatus { id, status } => {
      print(&store.update_order_status(&id, status).await)?
    }
    Command::DeleteOrder { id } => print(&store.delete_order(&id).await)?,
  }

  Ok(())
}
