//! Task Manager
//!
//! Runs the task REST service, or acts as a command-line client against one.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufReader};
use std::path::Path;
use task_manager::api::{shutdown_signal, start_server};
use task_manager::cli::client::{PromptConfirm, run_add, run_delete, run_list, run_toggle};
use task_manager::cli::{Cli, Command};
use task_manager::client::{AlwaysConfirm, ApiClient, TaskListView};
use task_manager::config::{Config, StoreBackend};
use task_manager::db;
use task_manager::logging::{LogTarget, init_logging};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::load_with_env(cli.config.as_deref().map(Path::new))
        .context("failed to load configuration")?;

    // CLI flags win over file and environment
    if let Some(db_path) = &cli.database {
        config.store.backend = StoreBackend::Sqlite;
        config.store.path = db_path.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(api_url) = &cli.api_url {
        config.client.api_url = Some(api_url.clone());
    }

    let mut out = io::stdout();
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await?,
        Command::List(args) => run_list(&client_view(&config), &args, &mut out).await?,
        Command::Add(args) => {
            run_add(&client_view(&config), &args, &mut out).await?;
        }
        Command::Toggle(args) => {
            run_toggle(&client_view(&config), &args, &mut out).await?;
        }
        Command::Delete(args) => {
            let view = client_view(&config);
            if args.yes {
                run_delete(&view, &args, &AlwaysConfirm, &mut out).await?;
            } else {
                let confirm = PromptConfirm::new(BufReader::new(io::stdin()), io::stderr());
                run_delete(&view, &args, &confirm, &mut out).await?;
            }
        }
    }
    Ok(())
}

/// Run the HTTP service until SIGINT or SIGTERM.
async fn run_server(config: Config) -> Result<()> {
    info!("Starting Task Manager v{}", env!("CARGO_PKG_VERSION"));
    match config.store.backend {
        StoreBackend::Postgres => info!(
            "Database: postgres://{}@{}:{}/{}",
            config.store.user, config.store.host, config.store.port, config.store.name
        ),
        StoreBackend::Sqlite => info!("Database: {:?}", config.store.path),
    }

    let store = db::connect(&config.store).context("failed to open task store")?;
    let handle = start_server(store, &config).await?;

    shutdown_signal().await;
    handle.shutdown().await?;

    info!("Server stopped");
    Ok(())
}

/// View for client subcommands, pointed at the configured service.
fn client_view(config: &Config) -> TaskListView<ApiClient> {
    let base_url = config.absolute_api_base_url();
    debug!("API base URL: {}", base_url);
    TaskListView::new(ApiClient::new(base_url))
}
