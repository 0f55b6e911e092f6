//! # Playback Control
//!
//! Runs a listening session one track at a time:
//!
//! - **Loading**: announce the track, fill in the album, show the user's play
//!   count and the chord sheet.
//! - **Active**: start the command listener, then tick. Each tick reports
//!   now-playing, shows a transposed sheet when one was requested, and reads
//!   the transition flags once.
//! - **Finishing**: do the scrobble, pass or abort bookkeeping and pick the
//!   next track.
//! - **Terminating**: leave without scrobbling the current track.
//!
//! Collaborator failures never stop the loop, except the resolver's last
//! fallback coming up empty.

use crate::catalog::CatalogService;
use crate::commands::{self, prompt, ChannelInput, LineInput};
use crate::lyrics::{transpose_sheet, LyricsService};
use crate::recency::RecencyTracker;
use crate::resolver::{Resolved, SimilarityResolver};
use crate::search;
use crate::session::{SharedState, TransitionFlags};
use crate::track::{NextUp, Track};
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Loading,
    Active,
    Finishing,
    Terminating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Pause between now-playing reports.
    pub tick_interval: Duration,
    /// Results per page in the interactive search.
    pub search_page_size: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            search_page_size: 5,
        }
    }
}

/// The track being played and what was loaded for it.
struct Current {
    track: Track,
    started_at: u64,
}

/// How the Active phase ended.
enum Ended {
    Finished(TransitionFlags, ChannelInput),
    Exit,
}

pub struct PlaybackController {
    catalog: Arc<dyn CatalogService>,
    resolver: SimilarityResolver,
    lyrics: Arc<dyn LyricsService>,
    settings: ControllerSettings,
    state: SharedState,
    tracker: RecencyTracker,
    phase: PlaybackPhase,
    sheet: Option<String>,
    history: Vec<Track>,
}

impl PlaybackController {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        resolver: SimilarityResolver,
        lyrics: Arc<dyn LyricsService>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            catalog,
            resolver,
            lyrics,
            settings,
            state: SharedState::new(),
            tracker: RecencyTracker::new(),
            phase: PlaybackPhase::Loading,
            sheet: None,
            history: Vec::new(),
        }
    }

    /// Handle for anything outside the session that may request an exit.
    #[must_use]
    pub fn shared_state(&self) -> SharedState {
        self.state.clone()
    }

    #[must_use]
    pub fn tracker(&self) -> &RecencyTracker {
        &self.tracker
    }

    #[must_use]
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    /// Chord sheet of the current track as last shown, transpositions included.
    #[must_use]
    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    /// Every track loaded so far, in order.
    ///
    /// Nothing in the session reads this back. It is there so a finished
    /// session can be inspected, and grows by one track per load.
    #[must_use]
    pub fn history(&self) -> &[Track] {
        &self.history
    }

    /// Pick the first track: from a search when `query` is given, otherwise
    /// a random loved track.
    ///
    /// Returns `Ok(None)` when operator input ends during the search.
    pub fn bootstrap(&mut self, query: Option<&str>, input: &dyn LineInput) -> Result<Option<NextUp>> {
        if let Some(query) = query {
            return Ok(search::search_track(
                &*self.catalog,
                input,
                query,
                self.settings.search_page_size,
            ));
        }

        self.tracker.record_played("", "", false);
        let resolved = self.resolver.random_loved()?;
        Ok(Some(announce(resolved)))
    }

    /// Play from `first` until the operator leaves or no track can be found.
    pub fn run(&mut self, first: NextUp, input: ChannelInput) -> Result<()> {
        let mut next = first;
        let mut input = input;

        loop {
            let current = self.load(next);
            let (flags, returned) = match self.play(&current, input)? {
                Ended::Finished(flags, returned) => (flags, returned),
                Ended::Exit => {
                    self.set_phase(PlaybackPhase::Terminating);
                    info!("Leaving the session during {}", current.track);
                    return Ok(());
                }
            };
            input = returned;

            self.set_phase(PlaybackPhase::Finishing);
            let upcoming = self.finish(&current, flags, &input)?;
            self.state.clear_transition();

            match upcoming {
                Some(upcoming) => next = upcoming,
                None => {
                    self.set_phase(PlaybackPhase::Terminating);
                    info!("Operator input ended, leaving the session");
                    return Ok(());
                }
            }
        }
    }

    fn set_phase(&mut self, phase: PlaybackPhase) {
        debug!("{:?} -> {phase:?}", self.phase);
        self.phase = phase;
    }

    fn load(&mut self, next: NextUp) -> Current {
        self.set_phase(PlaybackPhase::Loading);
        let NextUp { mut track, manual } = next;

        println!("Artist: {}", track.artist);
        println!("Track: {}", track.title);

        if track.album.is_none() && !manual {
            match self.catalog.track_info(&track.artist, &track.title) {
                Ok(info) => track.album = info.album,
                Err(e) => warn!("Album lookup for {track} failed: {e:#}"),
            }
        }
        println!("Album: {}", track.album.as_deref().unwrap_or("unknown"));

        if !manual {
            match self.catalog.user_track_stats(&track.artist, &track.title) {
                Ok(stats) => {
                    println!("You listened to this track {} times.", stats.play_count);
                    if stats.loved {
                        println!("You LOVE this track.");
                    }
                }
                Err(e) => warn!("Listening stats for {track} failed: {e:#}"),
            }
        }

        self.sheet = self.lyrics.fetch(&track.artist, &track.title);
        match &self.sheet {
            Some(sheet) => println!("{sheet}"),
            None => println!("Text and chords are not found."),
        }

        self.history.push(track.clone());
        Current {
            track,
            started_at: unix_now(),
        }
    }

    fn play(&mut self, current: &Current, input: ChannelInput) -> Result<Ended> {
        self.set_phase(PlaybackPhase::Active);
        let listener = commands::spawn_listener(input, self.state.clone())?;

        loop {
            if let Err(e) = self.catalog.update_now_playing(&current.track) {
                warn!("Now-playing update for {} failed: {e:#}", current.track);
            }

            let snapshot = self.state.snapshot();
            if let Some(semitones) = snapshot.transpose {
                match self.sheet.as_mut() {
                    Some(text) => {
                        *text = transpose_sheet(text, semitones);
                        println!("{text}");
                    }
                    None => println!("Text and chords are not found."),
                }
            }

            if snapshot.flags.exit_requested {
                // A listener blocked on input is left behind; it dies with the process.
                if listener.is_finished() {
                    let _ = listener.join();
                }
                return Ok(Ended::Exit);
            }
            if snapshot.flags.finished {
                let input = listener
                    .join()
                    .map_err(|_| anyhow!("Command listener panicked"))?;
                return Ok(Ended::Finished(snapshot.flags, input));
            }

            thread::sleep(self.settings.tick_interval);
        }
    }

    fn finish(
        &mut self,
        current: &Current,
        flags: TransitionFlags,
        input: &dyn LineInput,
    ) -> Result<Option<NextUp>> {
        let track = &current.track;
        println!("Track is finishing...");

        if flags.artist_aborted {
            println!("Artist is aborting...");
            let count = self.tracker.record_abort(&track.artist);
            info!("{} aborted {count} time(s) this session", track.artist);
            self.tracker.record_played(&track.artist, &track.title, false);

            let resolved = match self.tracker.previous() {
                Some(previous) => self
                    .resolver
                    .resolve_from_artist(&previous.artist, &self.tracker)?,
                None => self.resolver.random_loved()?,
            };
            return Ok(Some(announce(resolved)));
        }

        if flags.next_requested {
            let scrobbled = !flags.passed;
            if scrobbled {
                self.scrobble(current);
            }
            self.tracker.record_played(&track.artist, &track.title, scrobbled);

            println!("Searching for the next track...");
            let Some(query) = prompt(input, "Input your search query: ") else {
                return Ok(None);
            };
            if self.state.is_exit_requested() {
                return Ok(None);
            }
            return Ok(search::search_track(
                &*self.catalog,
                input,
                &query,
                self.settings.search_page_size,
            ));
        }

        let resolved = if flags.passed {
            println!("Track is passing...");
            self.tracker.record_played(&track.artist, &track.title, false);
            match self.tracker.previous() {
                Some(previous) => self.resolver.resolve_next(&previous, &self.tracker)?,
                None => self.resolver.random_loved()?,
            }
        } else {
            self.scrobble(current);
            self.tracker.record_played(&track.artist, &track.title, true);
            self.resolver.resolve_next(track, &self.tracker)?
        };
        Ok(Some(announce(resolved)))
    }

    fn scrobble(&self, current: &Current) {
        println!("\nScrobbling... ");
        match self.catalog.scrobble(&current.track, current.started_at) {
            Ok(()) => println!("OK"),
            Err(e) => warn!("Scrobble of {} failed: {e:#}", current.track),
        }
    }
}

fn announce(resolved: Resolved) -> NextUp {
    println!("\n{}", next_track_line(&resolved));
    debug!("Resolved by {:?}", resolved.tier);
    NextUp::from(resolved.track)
}

fn next_track_line(resolved: &Resolved) -> String {
    format!("Next track is {}: {}", resolved.tier.describe(), resolved.track)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
