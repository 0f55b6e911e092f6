//! # Segue
//!
//! Endless Last.fm listening sessions from the terminal.
//!
//! ```bash
//! # Authorize once
//! segue login
//!
//! # Start from a search, or from a random loved track
//! segue play --track "Portishead Roads"
//! segue play
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info, warn};
use segue::auth::{FileAuthStore, SessionAuthStore};
use segue::cli::{Args, Command, CredentialArgs};
use segue::commands::ChannelInput;
use segue::completion;
use segue::config::{self, RuntimeConfig};
use segue::controller::PlaybackController;
use segue::lastfm::{self, LastFmClient};
use segue::lyrics::NoLyrics;
use segue::resolver::SimilarityResolver;
use segue::scrape::LastFmPageScraper;
use std::io;
use std::sync::Arc;

/// Main entry point for the Segue application.
///
/// Loads `.env`, initializes logging (controlled via `RUST_LOG`), parses the
/// command line and routes to the subcommand.
fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    env_logger::init();
    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {e}"),
    }

    let args = Args::parse();

    match args.command {
        Command::Play { track, tick_ms } => {
            play(args.credentials, track.as_deref(), tick_ms)?;
        }
        Command::Login => {
            login(args.credentials)?;
        }
        Command::Logout => {
            let store = FileAuthStore::new(config::get_session_path()?);
            if store.clear()? {
                println!("Stored Last.fm session removed");
            } else {
                println!("No stored Last.fm session");
            }
        }
        Command::Completion { shell } => {
            let mut cmd = Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(shell),
                &mut cmd,
                &mut io::stdout(),
            );
        }
    }

    Ok(())
}

fn load_config(credentials: CredentialArgs) -> Result<RuntimeConfig> {
    RuntimeConfig::from_credentials(credentials.api_key, credentials.api_secret, credentials.username)
}

fn play(credentials: CredentialArgs, query: Option<&str>, tick_ms: Option<u64>) -> Result<()> {
    let mut config = load_config(credentials)?;
    if let Some(tick_ms) = tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    debug!("Runtime config: {}", serde_json::to_string(&config)?);

    let input = ChannelInput::from_stdin()?;
    let store = FileAuthStore::new(&config.session_file);
    let client = LastFmClient::new(
        config.api_key.as_str(),
        config.api_secret.as_str(),
        config.username.as_str(),
        config.http_timeout(),
    );
    let session_key = match store.load()? {
        Some(session_key) => session_key,
        None => {
            println!("No Last.fm session stored yet.");
            lastfm::authorize(&client, &store, &input)?
        }
    };

    let catalog = Arc::new(client.with_session_key(session_key));
    let scraper = Arc::new(LastFmPageScraper::new(config.http_timeout()));
    let resolver = SimilarityResolver::new(
        catalog.clone(),
        scraper,
        config.username.clone(),
        config.resolver,
    );
    let mut controller = PlaybackController::new(
        catalog,
        resolver,
        Arc::new(NoLyrics),
        config.controller_settings(),
    );

    let state = controller.shared_state();
    ctrlc::set_handler(move || {
        if state.is_exit_requested() {
            println!("\nExiting...");
            std::process::exit(130);
        }
        println!("\nLeaving the session... press Ctrl-C again to quit immediately");
        state.request_exit();
    })
    .context("Failed to install the Ctrl-C handler")?;

    let Some(first) = controller.bootstrap(query, &input)? else {
        info!("No starting track chosen");
        return Ok(());
    };
    controller.run(first, input)?;
    println!("Exiting...");
    Ok(())
}

fn login(credentials: CredentialArgs) -> Result<()> {
    let config = load_config(credentials)?;
    let store = FileAuthStore::new(&config.session_file);
    let client = LastFmClient::new(
        config.api_key.as_str(),
        config.api_secret.as_str(),
        config.username.as_str(),
        config.http_timeout(),
    );
    let input = ChannelInput::from_stdin()?;

    lastfm::authorize(&client, &store, &input)?;
    println!("Logged in; session key stored at {}", store.path().display());
    Ok(())
}
