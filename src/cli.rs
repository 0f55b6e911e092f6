//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `segue` binary.
//!
//! ## Commands
//!
//! - `play`: start a listening session, from a search or a random loved track
//! - `login`: authorize segue with Last.fm and store the session key
//! - `logout`: forget the stored session key
//! - `completion`: print a shell completion script
//!
//! Credentials are global options that fall back to `LASTFM_API_KEY`,
//! `LASTFM_API_SECRET` and `LASTFM_USERNAME`, which may also come from a
//! `.env` file in the working directory.
//!
//! ## Examples
//!
//! ```bash
//! segue login
//! segue play --track "Massive Attack Teardrop"
//! segue play
//! ```

use clap::{Parser, Subcommand, ValueEnum};

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser, Debug)]
#[command(name = "segue")]
#[command(about = "Segue: endless Last.fm listening sessions, one similar track after another")]
#[command(version)]
pub struct Args {
    #[command(flatten)]
    pub credentials: CredentialArgs,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Last.fm API credentials and account.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Last.fm API key
    #[arg(long, env = "LASTFM_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Last.fm API shared secret
    #[arg(long, env = "LASTFM_API_SECRET", global = true, hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Last.fm user whose loved tracks and play counts are used
    #[arg(long, env = "LASTFM_USERNAME", global = true)]
    pub username: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a listening session
    ///
    /// While a track plays, type a command and press Enter:
    /// q (next track), p (pass without scrobbling), n (drop this artist),
    /// qs / ps (finish or pass, then search), m <int> (transpose chords),
    /// x (leave).
    Play {
        /// Search query for the first track; a random loved track otherwise
        #[arg(short = 'n', long = "track", value_hint = clap::ValueHint::Other)]
        track: Option<String>,

        /// Milliseconds between now-playing updates
        #[arg(long, value_name = "MS")]
        tick_ms: Option<u64>,
    },

    /// Authorize segue with your Last.fm account
    Login,

    /// Remove the stored Last.fm session key
    Logout,

    /// Generate shell completion scripts
    ///
    /// Example: `segue completion bash > ~/.local/share/bash-completion/completions/segue`
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
