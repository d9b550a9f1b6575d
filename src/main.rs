//! hosting-client - command line front end for the hosting platform

use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use hosting_client::notify::{NotificationEvent, NotificationMessage};
use hosting_client::resources::{
    NewPlan, ServerAction, DEFAULT_PLAN_PAGE_SIZE, DEFAULT_SERVER_PAGE_SIZE,
};
use hosting_client::{listener, ClientConfig, HostingClient};

/// Command line client for the hosting platform
#[derive(Parser, Debug)]
#[command(name = "hosting-client")]
#[command(about = "Identity flows, notifications and servers of the hosting platform")]
struct Args {
    /// Origin the platform is served from
    #[arg(long, env = "HOSTING_ORIGIN", default_value = "http://localhost:8080")]
    origin: String,

    /// Path prefix of the identity service
    #[arg(long, env = "HOSTING_AUTH_BASE", default_value = "/auth")]
    auth_base: String,

    /// Path prefix of the hosting API
    #[arg(long, env = "HOSTING_API_BASE", default_value = "/api/hosting")]
    api_base: String,

    /// Path of the notification WebSocket
    #[arg(long, env = "HOSTING_NOTIFICATION_PATH", default_value = "/api/notification/ws")]
    notification_path: String,

    /// Seconds to wait before reconnecting the notification channel
    #[arg(long, env = "HOSTING_RECONNECT_DELAY_SECS", default_value = "5")]
    reconnect_delay_secs: u64,

    /// Log in with this email before running the command
    #[arg(long, env = "HOSTING_EMAIL")]
    email: Option<String>,

    /// Password for --email
    #[arg(long, env = "HOSTING_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and print the session
    Login,
    /// Register a new identity
    Register {
        #[arg(long)]
        name: String,
    },
    /// Print the current session
    Whoami,
    /// End the session
    Logout,
    /// List plans
    Plans {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PLAN_PAGE_SIZE)]
        page_size: u32,
    },
    /// Show one plan
    Plan { id: Uuid },
    /// Create a plan
    CreatePlan {
        #[arg(long)]
        name: String,
        #[arg(long)]
        cpu_cores: u32,
        #[arg(long)]
        ram_mb: u32,
        #[arg(long)]
        disk_gb: u32,
    },
    /// List servers
    Servers {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_SERVER_PAGE_SIZE)]
        page_size: u32,
    },
    /// Show one server
    Server { id: Uuid },
    /// Order a server
    Order {
        #[arg(long)]
        plan_id: Uuid,
        #[arg(long)]
        name: String,
    },
    /// Start, stop or delete a server
    Action { server_id: Uuid, action: ServerAction },
    /// Print notifications until interrupted
    Watch,
}

impl Args {
    fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = ClientConfig::new(&self.origin)?;
        config.auth_base = self.auth_base.clone();
        config.api_base = self.api_base.clone();
        config.notification_path = self.notification_path.clone();
        config.reconnect_delay = Duration::from_secs(self.reconnect_delay_secs);
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("hosting_client={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = HostingClient::new(args.client_config()?)?;

    let logged_in = match (&args.email, &args.password, &args.command) {
        (_, _, Command::Register { .. }) => false,
        (Some(email), Some(password), _) => {
            client
                .identity()
                .login(email, password)
                .await
                .context("login failed")?;
            true
        }
        _ => false,
    };

    match args.command {
        Command::Login => {
            anyhow::ensure!(logged_in, "login needs --email and --password");
            let session = client.identity().get_current_user().await?;
            print_json(&session)?;
        }
        Command::Register { ref name } => {
            let email = args.email.as_deref().context("--email is required")?;
            let password = args.password.as_deref().context("--password is required")?;
            let result = client.identity().register(email, password, name).await?;
            print_json(&result)?;
        }
        Command::Whoami => {
            let session = client.identity().get_current_user().await?;
            print_json(&session)?;
        }
        Command::Logout => {
            let channel = client.notification_channel()?;
            client
                .identity()
                .logout(&channel, &|location: &str| info!(location, "Signed out"))
                .await;
        }
        Command::Plans { page, page_size } => {
            print_json(&client.resources().list_plans(page, page_size).await?)?;
        }
        Command::Plan { id } => {
            print_json(&client.resources().get_plan(id).await?)?;
        }
        Command::CreatePlan {
            name,
            cpu_cores,
            ram_mb,
            disk_gb,
        } => {
            let plan = NewPlan {
                name,
                cpu_cores,
                ram_mb,
                disk_gb,
            };
            print_json(&client.resources().create_plan(&plan).await?)?;
        }
        Command::Servers { page, page_size } => {
            print_json(&client.resources().list_servers(page, page_size).await?)?;
        }
        Command::Server { id } => {
            print_json(&client.resources().get_server(id).await?)?;
        }
        Command::Order { plan_id, ref name } => {
            print_json(&client.resources().order_server(plan_id, name).await?)?;
        }
        Command::Action { server_id, action } => {
            print_json(
                &client
                    .resources()
                    .perform_server_action(server_id, action)
                    .await?,
            )?;
        }
        Command::Watch => {
            anyhow::ensure!(logged_in, "watch needs --email and --password");
            watch(&client).await?;
        }
    }

    Ok(())
}

/// Print notifications until Ctrl-C, then log out
async fn watch(client: &HostingClient) -> anyhow::Result<()> {
    let channel = client.notification_channel()?;

    channel.add_listener(listener(|message: &NotificationMessage| {
        match NotificationEvent::from_message(message).and_then(|e| e.server_status()) {
            Some(change) => println!(
                "server {} is now {:?}{}",
                change.server_id,
                change.status,
                change
                    .ipv4_address
                    .map(|ip| format!(" ({})", ip))
                    .unwrap_or_default()
            ),
            None => println!("{}", message),
        }
        Ok(())
    }));

    channel.connect();
    info!(url = channel.url(), "Watching notifications, Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    client
        .identity()
        .logout(&channel, &|location: &str| info!(location, "Signed out"))
        .await;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
