//! # Shared Session State
//!
//! The only state touched by more than one thread. The command listener writes
//! transition intent; the controller reads it once per tick as a single
//! snapshot and clears it when a track ends.

use crate::commands::SessionCommand;
use log::debug;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Transition intent for the current track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionFlags {
    /// The current track is over, one way or another.
    pub finished: bool,
    /// Skip the scrobble and resolve from the track before this one.
    pub passed: bool,
    /// Blacklist the current artist.
    pub artist_aborted: bool,
    /// Ask the operator for a search query instead of resolving.
    pub next_requested: bool,
    /// Leave the session without scrobbling the current track.
    pub exit_requested: bool,
}

/// Everything behind the session lock.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub flags: TransitionFlags,
    pub chords_modified: bool,
    pub tonality: i32,
}

/// What the controller reads on each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub flags: TransitionFlags,
    /// A pending transposition, consumed by the read.
    pub transpose: Option<i32>,
}

/// Cloneable handle to the session state.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<Mutex<SessionState>>);

impl SharedState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply an operator command. Returns true when the command ends the
    /// current track, after which the listener stops reading.
    pub fn apply(&self, command: SessionCommand) -> bool {
        let mut state = self.lock();
        let flags = match command {
            SessionCommand::Transpose(semitones) => {
                state.chords_modified = true;
                state.tonality = semitones;
                debug!("Transposition by {semitones} requested");
                return false;
            }
            SessionCommand::Quit => TransitionFlags {
                finished: true,
                ..state.flags
            },
            SessionCommand::Pass => TransitionFlags {
                passed: true,
                finished: true,
                ..state.flags
            },
            SessionCommand::AbortArtist => TransitionFlags {
                artist_aborted: true,
                finished: true,
                ..state.flags
            },
            SessionCommand::QuitAndSearch => TransitionFlags {
                finished: true,
                next_requested: true,
                ..state.flags
            },
            SessionCommand::PassAndSearch => TransitionFlags {
                passed: true,
                finished: true,
                next_requested: true,
                ..state.flags
            },
            SessionCommand::Exit => TransitionFlags {
                exit_requested: true,
                ..state.flags
            },
        };
        state.flags = flags;
        debug!("Transition flags now {flags:?}");
        true
    }

    pub fn request_exit(&self) {
        self.lock().flags.exit_requested = true;
    }

    #[must_use]
    pub fn is_exit_requested(&self) -> bool {
        self.lock().flags.exit_requested
    }

    /// Read the flags and take any pending transposition under one lock.
    pub fn snapshot(&self) -> Snapshot {
        let mut state = self.lock();
        let transpose = if state.chords_modified {
            state.chords_modified = false;
            Some(state.tonality)
        } else {
            None
        };
        Snapshot {
            flags: state.flags,
            transpose,
        }
    }

    /// Reset the per-track flags. An exit request survives.
    pub fn clear_transition(&self) {
        let mut state = self.lock();
        let exit_requested = state.flags.exit_requested;
        state.flags = TransitionFlags {
            exit_requested,
            ..TransitionFlags::default()
        };
        state.chords_modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_and_search_sets_three_flags() {
        let state = SharedState::new();
        assert!(state.apply(SessionCommand::PassAndSearch));

        let flags = state.snapshot().flags;
        assert!(flags.passed && flags.finished && flags.next_requested);
        assert!(!flags.artist_aborted && !flags.exit_requested);
    }

    #[test]
    fn test_transpose_does_not_finish_track() {
        let state = SharedState::new();
        assert!(!state.apply(SessionCommand::Transpose(-2)));

        let first = state.snapshot();
        assert_eq!(first.transpose, Some(-2));
        assert!(!first.flags.finished);
        assert_eq!(state.snapshot().transpose, None, "transposition is consumed");
    }

    #[test]
    fn test_clear_transition_keeps_exit() {
        let state = SharedState::new();
        state.apply(SessionCommand::AbortArtist);
        state.request_exit();
        state.clear_transition();

        let flags = state.snapshot().flags;
        assert!(flags.exit_requested);
        assert!(!flags.finished && !flags.artist_aborted);
    }

    #[test]
    fn test_clones_share_state() {
        let state = SharedState::new();
        let listener_side = state.clone();
        listener_side.apply(SessionCommand::Exit);
        assert!(state.is_exit_requested());
    }
}
