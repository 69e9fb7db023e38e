//! Command-line interface parsing for coincal
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the startup mode the binary runs in.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use thiserror::Error;

use crate::api::Credentials;
use crate::lookup::standardize;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// `--config` value is not `CLIENT_ID:CLIENT_SECRET`
    #[error("Invalid credentials: '{0}'. Expected CLIENT_ID:CLIENT_SECRET")]
    InvalidClientCredentials(String),

    /// `--config-key` value is blank
    #[error("Invalid API key: the key must not be empty")]
    EmptyApiKey,
}

/// coincal - upcoming crypto events from CoinMarketCal
#[derive(Parser, Debug)]
#[command(name = "coincal")]
#[command(about = "Upcoming crypto events from the CoinMarketCal calendar")]
#[command(version)]
pub struct Cli {
    /// Comma separated list of coin symbols (Eg: btc,eth,req)
    #[arg(short = 'c', long, value_name = "SYMBOLS", value_delimiter = ',')]
    pub coins: Vec<String>,

    /// Comma separated list of event types to filter by (Eg: Roadmap,Airdrop)
    #[arg(short = 't', long, value_name = "TYPES", value_delimiter = ',')]
    pub types: Vec<String>,

    /// List all categories
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Set CoinMarketCal OAuth client credentials
    #[arg(long, value_name = "CLIENT_ID:CLIENT_SECRET", conflicts_with = "config_key")]
    pub config: Option<String>,

    /// Set a CoinMarketCal API key
    #[arg(long, value_name = "API_KEY")]
    pub config_key: Option<String>,

    /// Page of events to show, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Events per page
    #[arg(long, value_name = "COUNT", env = "COINCAL_PAGE_SIZE")]
    pub max: Option<u32>,

    /// Directory holding credentials and cached lists
    #[arg(long, value_name = "DIR", env = "COINCAL_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Override the API root URL
    #[arg(long, value_name = "URL", env = "COINCAL_API_URL")]
    pub api_url: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// What the binary should do, derived from CLI arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Store credentials and exit
    Configure(Credentials),
    /// Show events filtered by coin symbols and/or category names
    Events {
        coin_symbols: Vec<String>,
        category_names: Vec<String>,
    },
    /// Show the available categories
    ListCategories,
    /// Nothing requested: print usage and the categories
    Usage,
}

/// Parses a `CLIENT_ID:CLIENT_SECRET` argument
///
/// The secret may itself contain `:`; only the first one separates.
pub fn parse_client_credentials(value: &str) -> Result<Credentials, CliError> {
    match value.split_once(':') {
        Some((id, secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
            Ok(Credentials::Client {
                client_id: id.trim().to_string(),
                client_secret: secret.trim().to_string(),
            })
        }
        _ => Err(CliError::InvalidClientCredentials(value.to_string())),
    }
}

impl Mode {
    /// Creates a Mode from parsed CLI arguments.
    ///
    /// Credential configuration wins over everything else, then event filters,
    /// then `--list`.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if let Some(value) = &cli.config {
            return parse_client_credentials(value).map(Mode::Configure);
        }
        if let Some(key) = &cli.config_key {
            let api_key = key.trim();
            if api_key.is_empty() {
                return Err(CliError::EmptyApiKey);
            }
            return Ok(Mode::Configure(Credentials::ApiKey {
                api_key: api_key.to_string(),
            }));
        }

        let coin_symbols = standardize(&cli.coins);
        let category_names = standardize(&cli.types);
        if !coin_symbols.is_empty() || !category_names.is_empty() {
            return Ok(Mode::Events {
                coin_symbols,
                category_names,
            });
        }

        if cli.list {
            Ok(Mode::ListCategories)
        } else {
            Ok(Mode::Usage)
        }
    }
}

/// Usage examples printed when no parameters are given
pub fn example_usage() -> String {
    [
        "  Examples:",
        "",
        "    $ coincal --config dummyclientid123:fakeclientsecret456",
        "    $ coincal --config-key yourapikey789",
        "    $ coincal -c omg,etc",
        "    $ coincal --coins omg,etc",
        "    $ coincal -t roadmap,burn",
        "    $ coincal --types roadmap,burn",
        "    $ coincal -c omg,etc -t roadmap,burn",
        "",
    ]
    .join("\n")
}

/// Guidance printed when no credentials are stored
pub fn missing_credentials_message() -> String {
    [
        "No API credentials found",
        "Register at https://coinmarketcal.com/en/developer/register to get your API credentials",
        "Use --config CLIENTID:CLIENTSECRET or --config-key APIKEY to set them",
        "Example: $ coincal --config dummyclientid123:fakeclientsecret456",
    ]
    .join("\n")
}
