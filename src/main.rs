//! MediBot: a personal health assistant.
//!
//! This is the application entry point. It loads configuration from TOML,
//! initializes tracing, connects to the database, starts the medication
//! reminder service, sets up the Axum router and starts the HTTP server.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medibot::config::{AppConfig, DEFAULT_CONFIG_PATH};
use medibot::db;
use medibot::http::start_server;
use medibot::reminder::ReminderService;
use medibot::routes::create_router;
use medibot::state::AppState;
use medibot::templates::init_templates;

/// MediBot: chatbot, appointments and medication reminders
#[derive(Parser, Debug)]
#[command(name = "medibot", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level filter (e.g., "medibot=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args = Args::parse();

    // Configuration comes first: it decides the log format and default filter
    let config = AppConfig::load(&args.config)?;

    // Initialize tracing with priority: CLI > env > config
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| config.default_log_filter().to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        config = %args.config,
        debug = config.app.debug,
        backend = ?config.database.backend,
        chatbot = ?config.chatbot.provider,
        "Loaded configuration"
    );

    // Initialize Tera templates
    let tera = init_templates()?;
    tracing::info!("Initialized templates");

    // Connect to the database; the server still starts without one
    let db = db::connect(&config.database).await;

    // Reminder service is started here and nowhere else
    if config.reminder.enabled {
        let reminders = Arc::new(ReminderService::new(&config.reminder, db.clone())?);
        reminders.start()?;
    } else {
        tracing::info!("Reminder service disabled");
    }

    let http_config = config.http.clone();

    // Create application state and router
    let state = AppState::new(config, tera, db)?;
    let app = create_router(state)?;

    start_server(app, &http_config).await?;

    Ok(())
}
