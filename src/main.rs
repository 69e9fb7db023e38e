//! coincal - upcoming crypto events from CoinMarketCal
//!
//! Prints a table of calendar events for the requested coins and event types,
//! with coin and category lists cached between runs.

use std::process::ExitCode;

use clap::Parser;

use coincal::api::{ApiError, CalendarClient, Credentials, Fetched};
use coincal::cli::{example_usage, missing_credentials_message, Cli, Mode};
use coincal::config::{init_tracing, Settings};
use coincal::lookup::find_events;
use coincal::table;

/// Prints the events matching the given filters
async fn show_events(
    client: &CalendarClient,
    settings: &Settings,
    coin_symbols: &[String],
    category_names: &[String],
) -> Result<(), ApiError> {
    let search = find_events(
        client,
        coin_symbols,
        category_names,
        settings.page,
        Some(settings.page_size),
    )
    .await?;

    let filters = &search.filters;
    if !filters.unknown_coins.is_empty() {
        eprintln!("Unknown coin symbol(s): {}", filters.unknown_coins.join(", "));
    }
    if !filters.unknown_categories.is_empty() {
        eprintln!("Unknown event type(s): {}", filters.unknown_categories.join(", "));
    }

    match search.events {
        Fetched::Data(events) => println!("{}", table::render_events(&events)),
        Fetched::Empty => println!("No events found"),
    }
    Ok(())
}

/// Prints the names of all event categories
async fn show_categories(client: &CalendarClient) -> Result<(), ApiError> {
    match client.get_categories().await? {
        Fetched::Data(categories) => {
            println!("Valid types are: ");
            println!("{}", table::category_names(&categories));
        }
        Fetched::Empty => println!("No event types available"),
    }
    Ok(())
}

async fn run_query(mode: Mode, settings: &Settings, client: &CalendarClient) -> Result<(), ApiError> {
    match mode {
        Mode::Events {
            coin_symbols,
            category_names,
        } => show_events(client, settings, &coin_symbols, &category_names).await,
        Mode::ListCategories => show_categories(client).await,
        // Handled before a client exists.
        Mode::Configure(_) => Ok(()),
        Mode::Usage => {
            println!("No input params detected\n");
            println!("{}", example_usage());
            show_categories(client).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = Settings::from_cli(&cli);
    init_tracing(&settings);

    let mode = match Mode::from_cli(&cli) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(cache) = settings.open_cache() else {
        eprintln!("Unable to determine where to store credentials, use --cache-dir");
        return ExitCode::FAILURE;
    };

    // Configuration mode writes the credentials and never touches the network.
    if let Mode::Configure(credentials) = &mode {
        return match credentials.store(&cache) {
            Ok(()) => {
                println!("API credentials set.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to store API credentials in {}: {}", cache.dir().display(), e);
                ExitCode::FAILURE
            }
        };
    }

    let Some(credentials) = Credentials::load(&cache) else {
        println!("{}", missing_credentials_message());
        return ExitCode::FAILURE;
    };

    let endpoints = settings.endpoints(&credentials);
    let client = match CalendarClient::connect(credentials, cache, endpoints) {
        Ok(client) => client.with_page_size(settings.page_size),
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run_query(mode, &settings, &client).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_configuration() => {
            eprintln!("{}", e);
            eprintln!("Use --config CLIENTID:CLIENTSECRET or --config-key APIKEY to update your credentials");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::SUCCESS
        }
    }
}
