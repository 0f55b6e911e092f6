//! # Recency Tracker
//!
//! Remembers which tracks were already played or passed during this session,
//! and how many times each artist was aborted mid-play.
//!
//! ## Ordering
//!
//! Entries live in a single recency order. A track that was scrobbled (played
//! through) is moved to the *newest* end; a track that ended without a
//! scrobble is moved to the *oldest* end so that it stops anchoring
//! similarity searches. [`RecencyTracker::previous`] reads the newest end,
//! which after a pass is the track played before the passed one.
//!
//! Positions are signed generation numbers in a `BTreeMap`: refreshing to the
//! newest end takes `max + 1`, refreshing to the oldest end takes `min - 1`,
//! and a key index makes the refresh O(log n).
//!
//! Nothing is ever evicted; the tracker lives as long as the session.

use crate::track::{recency_key, Track, KEY_SEPARATOR};
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Key stored for the bootstrap placeholder (no explicit starting track).
const PLACEHOLDER_KEY: &str = "";

#[derive(Debug, Default, Clone)]
pub struct RecencyTracker {
    /// recency key -> generation
    positions: HashMap<String, i64>,
    /// generation -> recency key, oldest first
    order: BTreeMap<i64, String>,
    /// lowercased artist -> abort count
    aborted_artists: HashMap<String, u32>,
}

impl RecencyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a track ended.
    ///
    /// An empty artist or title records the bootstrap placeholder instead of a
    /// real track. The placeholder takes part in ordering but never comes back
    /// out of [`previous`](Self::previous).
    pub fn record_played(&mut self, artist: &str, title: &str, was_scrobbled: bool) {
        let key = if artist.is_empty() || title.is_empty() {
            PLACEHOLDER_KEY.to_string()
        } else {
            recency_key(artist, title)
        };

        if let Some(generation) = self.positions.remove(&key) {
            self.order.remove(&generation);
        }

        let generation = if was_scrobbled || self.order.is_empty() {
            self.newest_slot()
        } else {
            self.oldest_slot()
        };

        debug!(
            "Recorded '{key}' at generation {generation} ({})",
            if was_scrobbled { "scrobbled" } else { "not scrobbled" }
        );
        self.order.insert(generation, key.clone());
        self.positions.insert(key, generation);
    }

    /// The entry at the newest end, rebuilt as a track.
    ///
    /// Artist and title come back lowercased, as stored in the key.
    #[must_use]
    pub fn previous(&self) -> Option<Track> {
        let (_, key) = self.order.last_key_value()?;
        if key == PLACEHOLDER_KEY {
            return None;
        }
        let (artist, title) = key.split_once(KEY_SEPARATOR)?;
        Some(Track::new(artist, title))
    }

    #[must_use]
    pub fn was_played(&self, artist: &str, title: &str) -> bool {
        if artist.is_empty() || title.is_empty() {
            return false;
        }
        self.positions.contains_key(&recency_key(artist, title))
    }

    #[must_use]
    pub fn was_track_played(&self, track: &Track) -> bool {
        self.was_played(&track.artist, &track.title)
    }

    /// Count one more abort for `artist` and return the new total.
    pub fn record_abort(&mut self, artist: &str) -> u32 {
        let count = self.aborted_artists.entry(artist.to_lowercase()).or_insert(0);
        *count += 1;
        *count
    }

    #[must_use]
    pub fn is_aborted(&self, artist: &str) -> bool {
        self.abort_count(artist) > 0
    }

    #[must_use]
    pub fn abort_count(&self, artist: &str) -> u32 {
        self.aborted_artists
            .get(&artist.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    /// Number of entries, placeholder included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Real track keys from oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order
            .values()
            .map(String::as_str)
            .filter(|key| *key != PLACEHOLDER_KEY)
    }

    fn newest_slot(&self) -> i64 {
        self.order.last_key_value().map_or(0, |(generation, _)| generation + 1)
    }

    fn oldest_slot(&self) -> i64 {
        self.order.first_key_value().map_or(0, |(generation, _)| generation - 1)
    }
}
