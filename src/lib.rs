//! Endless Last.fm listening sessions.
//!
//! Segue plays one track after another without ever running dry: each time a
//! track ends, the next one is picked from what the catalog says is similar,
//! skipping anything already heard this session.
//!
//! Core modules:
//! - [`resolver`] - Tiered next-track resolution
//! - [`recency`] - Played tracks and aborted artists
//! - [`controller`] - The per-track playback state machine
//! - [`commands`] - Operator commands and the listener thread
//! - [`session`] - State shared between listener and controller
//!
//! ### Collaborators
//!
//! - [`catalog`] - Catalog and scrobbling seam, implemented by [`lastfm`]
//! - [`scrape`] - Web-page fallback for similarity lookups
//! - [`lyrics`] - Chord sheets and transposition
//! - [`search`] - Interactive track search
//! - [`auth`] - Stored session key
//! - `memory` - In-memory collaborators for tests, behind the `test-support` feature
//!
//! ### Supporting Modules
//!
//! - [`config`] - Runtime settings and data directory management
//! - [`cli`] - Command-line interface definitions
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use segue::commands::ChannelInput;
//! use segue::controller::{ControllerSettings, PlaybackController};
//! use segue::lastfm::LastFmClient;
//! use segue::lyrics::NoLyrics;
//! use segue::resolver::{ResolverSettings, SimilarityResolver};
//! use segue::scrape::LastFmPageScraper;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let timeout = Duration::from_secs(10);
//! let catalog = Arc::new(
//!     LastFmClient::new("api-key", "api-secret", "listener", timeout).with_session_key("sk"),
//! );
//! let scraper = Arc::new(LastFmPageScraper::new(timeout));
//! let resolver = SimilarityResolver::new(catalog.clone(), scraper, "listener", ResolverSettings::default());
//! let mut controller =
//!     PlaybackController::new(catalog, resolver, Arc::new(NoLyrics), ControllerSettings::default());
//!
//! let input = ChannelInput::from_stdin()?;
//! if let Some(first) = controller.bootstrap(Some("Massive Attack Teardrop"), &input)? {
//!     controller.run(first, input)?;
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod auth;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod controller;
pub mod lastfm;
pub mod lyrics;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod recency;
pub mod resolver;
pub mod scrape;
pub mod search;
pub mod session;
pub mod track;
