//! Runtime settings resolved from CLI flags, environment and defaults

use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::{Credentials, Endpoints, DEFAULT_PAGE_SIZE};
use crate::cache::CacheManager;
use crate::cli::Cli;

/// Settings shared by every mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Cache directory; the per-user configuration directory when unset
    pub cache_dir: Option<PathBuf>,
    pub page: u32,
    pub page_size: u32,
    /// API root; chosen from the credential kind when unset
    pub api_url: Option<String>,
    pub verbosity: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            api_url: None,
            verbosity: 0,
        }
    }
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            cache_dir: cli.cache_dir.clone(),
            page: cli.page.max(1),
            page_size: cli.max.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE),
            api_url: cli.api_url.clone().filter(|url| !url.trim().is_empty()),
            verbosity: cli.verbose,
        }
    }

    /// Opens the cache, or `None` when no directory can be determined
    pub fn open_cache(&self) -> Option<CacheManager> {
        match &self.cache_dir {
            Some(dir) => Some(CacheManager::with_dir(dir.clone())),
            None => CacheManager::new(),
        }
    }

    pub fn endpoints(&self, credentials: &Credentials) -> Endpoints {
        match &self.api_url {
            Some(url) => Endpoints::new(url.as_str()),
            None => Endpoints::default_for(credentials),
        }
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Installs the stderr logger; `RUST_LOG` overrides the verbosity flag
pub fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.log_filter()));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
