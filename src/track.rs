//! Track references shared by every part of a listening session.
//!
//! A [`Track`] is identified by its artist and title, compared without regard
//! to case. The album travels along for display and scrobbling but never takes
//! part in de-duplication.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between artist and title inside a recency key.
pub const KEY_SEPARATOR: &str = " - ";

/// A track as known to the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub artist: String,
    pub title: String,
    /// Informational only, never part of the track identity.
    pub album: Option<String>,
}

impl Track {
    #[must_use]
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            album: None,
        }
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Normalized `artist - title` key used for de-duplication.
    #[must_use]
    pub fn recency_key(&self) -> String {
        recency_key(&self.artist, &self.title)
    }

    /// True when both tracks refer to the same recording, ignoring case and album.
    #[must_use]
    pub fn same_recording(&self, other: &Track) -> bool {
        self.recency_key() == other.recency_key()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{KEY_SEPARATOR}{}", self.artist, self.title)
    }
}

/// Build the recency key for an artist/title pair.
///
/// Only case is folded. Diacritics and punctuation are kept as they are, so
/// `"Beyoncé"` and `"Beyonce"` are different artists here.
#[must_use]
pub fn recency_key(artist: &str, title: &str) -> String {
    format!(
        "{}{KEY_SEPARATOR}{}",
        artist.to_lowercase(),
        title.to_lowercase()
    )
}

/// The track the session is about to load, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextUp {
    pub track: Track,
    /// Typed in by the operator rather than picked from the catalog.
    /// Manual tracks skip album and user-statistics lookups.
    pub manual: bool,
}

impl NextUp {
    #[must_use]
    pub fn manual(track: Track) -> Self {
        Self { track, manual: true }
    }
}

impl From<Track> for NextUp {
    fn from(track: Track) -> Self {
        Self { track, manual: false }
    }
}
