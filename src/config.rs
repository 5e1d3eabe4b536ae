//! Configuration management for the user API.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables (also read from a `.env` file at startup)
//! - Sensible defaults for every setting
//!
//! # Commands
//!
//! - `user-api` / `user-api serve` - Start the HTTP server (default)
//! - `user-api check` - Validate configuration and print the directory
//!
//! # Environment Variables
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 4000)
//! - `API_KEY` - Shared secret for `/users` (default: secret123, development only)
//! - `APP_ENV` - development, production or test (default: development)
//! - `LOG_LEVEL` - Log level (default: info)
//! - `CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `BODY_LIMIT` - Maximum JSON body size in bytes (default: 102400)

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::pipeline::{DEFAULT_API_KEY, DEFAULT_BODY_LIMIT};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 4000;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// =============================================================================
// CLI Arguments
// =============================================================================

/// User API - a small JSON user directory behind an API key.
#[derive(Parser, Debug, Clone)]
#[command(name = "user-api")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// The command to run; `serve` when none was given.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeConfig),

    /// Validate the configuration without starting the server
    Check(ServeConfig),
}

/// Deployment environment.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for serving (shared by `serve` and `check`).
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    /// Deployment environment.
    #[arg(long, value_enum, default_value_t = Environment::Development, env = "APP_ENV")]
    pub environment: Environment,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Shared secret required in the x-api-key header under /users.
    #[arg(long, default_value = DEFAULT_API_KEY, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    // =========================================================================
    // HTTP Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Maximum accepted JSON body size in bytes.
    #[arg(long, default_value_t = DEFAULT_BODY_LIMIT, env = "BODY_LIMIT")]
    pub body_limit: usize,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("API key must not be empty. Set --api-key or API_KEY".to_string());
        }

        if self.environment.is_production() && self.api_key.trim() == DEFAULT_API_KEY {
            return Err(
                "The default API key cannot be used in production. Set --api-key or API_KEY"
                    .to_string(),
            );
        }

        if self.body_limit == 0 {
            return Err("body_limit must be greater than 0".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(format!(
                "Invalid log level '{}'. Expected one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The effective log level; `--verbose` forces debug.
    pub fn effective_log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level.to_ascii_lowercase()
        }
    }

    /// Default tracing filter for this configuration.
    pub fn default_filter(&self) -> String {
        let level = self.effective_log_level();
        format!("user_api={},tower_http={}", level, level)
    }

    /// Whether the built-in development key is in use.
    pub fn uses_default_api_key(&self) -> bool {
        self.api_key.trim() == DEFAULT_API_KEY
    }
}

// =============================================================================
// Tests
// =============================================================================
