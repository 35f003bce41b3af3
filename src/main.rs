//! SearchGov-RS: multi-tenant search aggregation service
//!
//! This is the main entry point for the application.

use anyhow::Result;
use searchgov_rs::{
    config,
    network::HttpClient,
    web::{create_router, AppState},
};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "-V" | "--version" => {
                println!("searchgov-rs {}", searchgov_rs::VERSION);
                return Ok(());
            }
            _ => {}
        }
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting SearchGov-RS v{}", searchgov_rs::VERSION);

    // Load configuration
    let settings = config::load()?;
    info!(
        "Loaded configuration for instance: {} ({} tenants)",
        settings.general.instance_name,
        settings.tenants.len()
    );

    // Initialize HTTP client
    let client = HttpClient::with_settings(&settings.outgoing)?;
    info!("HTTP client initialized");

    // Create application state
    let state = AppState::new(settings.clone(), client);
    info!(
        "Loaded {} search providers",
        state.services.providers.len()
    );

    // Create router
    let app = create_router(state);

    // Bind address
    let addr = SocketAddr::new(settings.server.bind_address.parse()?, settings.server.port);

    info!("Starting server on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Print usage information
fn print_usage() {
    println!(
        r#"
SearchGov-RS v{}
Multi-tenant search aggregation service

USAGE:
    searchgov-rs [OPTIONS]

OPTIONS:
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT VARIABLES:
    SEARCHGOV_SETTINGS_PATH              Path to settings.yml
    SEARCHGOV_PORT                       Server port
    SEARCHGOV_BIND_ADDRESS               Bind address
    SEARCHGOV_BING_WEB_SUBSCRIPTION_ID   Bing web API key
    SEARCHGOV_BING_IMAGE_SUBSCRIPTION    Bing image API key
    SEARCHGOV_GOOGLE_API_KEY             Google custom search key
    SEARCHGOV_GOOGLE_CX                  Google custom search engine id
    SEARCHGOV_INTERNAL_INDEX_URL         Internal index web endpoint
    RUST_LOG                             Log filter (default: info)
"#,
        searchgov_rs::VERSION
    );
}
