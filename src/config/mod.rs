use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use serde::Deserialize;

use crate::navigation::Route;

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the client records backend
    #[serde(default = "default_api_url")]
    pub clients_api_url: String,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Where diagnostics go while the terminal is in use
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_log_file() -> String {
    "client-registry.log".to_string()
}

/// Command line flags; they take precedence over the environment.
#[derive(Parser, Debug)]
#[command(name = "client-registry", about = "Terminal client record editor")]
pub struct Cli {
    /// Backend base URL (overrides CLIENTS_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,
    /// Open a blank client form
    #[arg(long, conflicts_with = "edit")]
    pub new: bool,
    /// Open the form for an existing client
    #[arg(long, value_name = "ID")]
    pub edit: Option<i32>,
}

impl Cli {
    /// Screen to show first
    pub fn start_route(&self) -> Route {
        match (self.new, self.edit) {
            (_, Some(id)) => Route::EditClient(id),
            (true, None) => Route::NewClient,
            (false, None) => Route::ClientList,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();
        let config = envy::from_env::<Config>()?;
        Ok(config)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.api_url {
            self.clients_api_url = url.clone();
        }
    }

    pub fn clients_api_url(&self) -> &str {
        &self.clients_api_url
    }
}

/// Load configuration from the environment and the command line
pub fn init(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_cli(cli);
    Ok(config)
}
