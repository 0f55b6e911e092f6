//! # Operator Commands
//!
//! Short tokens typed while a track plays, and the listener thread that turns
//! them into transition intent.
//!
//! All operator input arrives through one line channel fed by a stdin reader
//! thread. The per-track listener owns the receiving end while the track plays
//! and hands it back through its `JoinHandle`, so the controller can use the
//! same input for search prompts between tracks.

use crate::session::SharedState;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// `q`: finish the track normally.
    Quit,
    /// `p`: skip without scrobbling.
    Pass,
    /// `n`: blacklist the artist for the rest of the session.
    AbortArtist,
    /// `qs`: finish, then search for the next track.
    QuitAndSearch,
    /// `ps`: pass, then search for the next track.
    PassAndSearch,
    /// `m <int>`: shift the chord sheet by semitones.
    Transpose(i32),
    /// `x` or `exit`: leave the session.
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Unknown(String),
    BadTranspose(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(_) => write!(f, "Invalid input. Please try again."),
            Self::BadTranspose(_) => write!(f, "Invalid input. Please use 'm <number>' format."),
        }
    }
}

impl std::error::Error for CommandError {}

impl FromStr for SessionCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let token = line.trim().to_lowercase();
        let command = match token.as_str() {
            "q" => Self::Quit,
            "p" => Self::Pass,
            "n" => Self::AbortArtist,
            "qs" => Self::QuitAndSearch,
            "ps" => Self::PassAndSearch,
            "x" | "exit" => Self::Exit,
            _ => return parse_transpose(&token),
        };
        Ok(command)
    }
}

fn parse_transpose(token: &str) -> Result<SessionCommand, CommandError> {
    let mut parts = token.split_whitespace();
    if parts.next() != Some("m") {
        return Err(CommandError::Unknown(token.to_string()));
    }
    match (parts.next().map(str::parse::<i32>), parts.next()) {
        (Some(Ok(semitones)), None) => Ok(SessionCommand::Transpose(semitones)),
        _ => Err(CommandError::BadTranspose(token.to_string())),
    }
}

/// Blocking source of operator lines.
pub trait LineInput {
    /// Next line without its terminator, `None` once input has ended.
    fn next_line(&self) -> Option<String>;
}

/// Receiving end of the operator line channel.
pub struct ChannelInput {
    rx: Receiver<String>,
}

impl ChannelInput {
    #[must_use]
    pub fn new(rx: Receiver<String>) -> Self {
        Self { rx }
    }

    /// Start the stdin reader thread and return its receiving end.
    pub fn from_stdin() -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to read operator input: {e}");
                            break;
                        }
                    }
                }
                debug!("Operator input reader finished");
            })
            .context("Failed to start the input reader thread")?;
        Ok(Self::new(rx))
    }

    /// Pre-filled input that ends after the given lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (tx, rx) = mpsc::channel();
        for line in lines {
            // The receiver is alive in this scope.
            let _ = tx.send(line.into());
        }
        Self::new(rx)
    }
}

impl LineInput for ChannelInput {
    fn next_line(&self) -> Option<String> {
        self.rx.recv().ok()
    }
}

/// Print `message` without a newline and read the trimmed answer.
pub fn prompt(input: &dyn LineInput, message: &str) -> Option<String> {
    print!("{message}");
    let _ = io::stdout().flush();
    input.next_line().map(|line| line.trim().to_string())
}

/// Spawn the listener for one track.
///
/// It applies commands until one ends the track, an exit is requested, or
/// input runs out (which counts as an exit request). The thread returns the
/// input so the caller can keep reading from it.
pub fn spawn_listener(input: ChannelInput, state: SharedState) -> Result<JoinHandle<ChannelInput>> {
    thread::Builder::new()
        .name("command-listener".into())
        .spawn(move || {
            listen(&input, &state);
            input
        })
        .context("Failed to start the command listener")
}

fn listen(input: &dyn LineInput, state: &SharedState) {
    while !state.is_exit_requested() {
        let Some(line) = input.next_line() else {
            info!("Operator input closed, ending the session");
            state.request_exit();
            return;
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<SessionCommand>() {
            Ok(command) => {
                debug!("Operator command {command:?}");
                if state.apply(command) {
                    return;
                }
            }
            Err(e) => println!("{e}"),
        }
    }
}
