//! User API - a small JSON user directory behind an API key.
//!
//! This binary loads configuration, starts logging and serves the router.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use user_api::{
    config::{Cli, Command, Environment, ServeConfig},
    directory::UserDirectory,
    pipeline::ApiKey,
    server::{build_pipeline, create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(&config);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let directory = Arc::new(UserDirectory::seeded());

    info!("Configuration:");
    info!("  Environment: {}", config.environment);
    info!("  Users: {} record(s)", directory.len());
    info!("  Body limit: {} bytes", config.body_limit);
    match &config.cors_origins {
        Some(origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    if config.uses_default_api_key() {
        warn!("  API key: using the built-in development key");
        warn!("           Set API_KEY before exposing this server");
    } else {
        info!("  API key: configured");
    }

    let router = create_router(directory, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/", addr);
    info!("    curl -H 'x-api-key: <key>' http://{}/users", addr);
    info!("    curl -H 'x-api-key: <key>' http://{}/users/1", addr);
    info!("────────────────────────────────────────────────────────────────");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Resolve when the process receives Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
///
/// Production emits JSON lines; other environments use the human-readable
/// formatter. `RUST_LOG` overrides the configured level.
fn init_logging(config: &ServeConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.default_filter().into());

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.environment {
        Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        Environment::Development | Environment::Test => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
    }
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(ApiKey::new(&config.api_key))
        .with_body_limit(config.body_limit)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(config: ServeConfig) -> ExitCode {
    if config.verbose {
        init_logging(&config);
    }

    println!("User API Configuration Check");
    println!("═════════════════════════════");
    println!();

    if let Err(e) = config.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ Configuration valid");
    println!("  Bind address: {}", config.bind_address());
    println!("  Environment: {}", config.environment);
    println!("  Log level: {}", config.effective_log_level());
    println!("  Body limit: {} bytes", config.body_limit);
    match &config.cors_origins {
        Some(origins) => println!("  CORS origins: {}", origins.join(", ")),
        None => println!("  CORS origins: any"),
    }
    if config.uses_default_api_key() {
        println!("  API key: built-in development key");
    } else {
        println!("  API key: configured");
    }
    println!();

    let directory = UserDirectory::seeded();
    if let Err(e) = UserDirectory::new(directory.list().to_vec()) {
        println!("✗ User directory: {}", e);
        return ExitCode::FAILURE;
    }

    println!("Users:");
    println!("──────");
    for user in directory.list() {
        println!("  {:>3}  {}", user.id, user.name);
    }
    println!();

    let pipeline = build_pipeline(Arc::new(directory), &build_router_config(&config));
    println!("Pipeline: {}", pipeline.stage_names().join(" → "));

    println!();
    println!("═════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
