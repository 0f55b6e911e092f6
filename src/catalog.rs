//! Catalog collaborator: everything the session asks of the scrobbling service.
//!
//! The production implementation is [`crate::lastfm::LastFmClient`]; tests and
//! benchmarks use the in-memory catalog behind the `test-support` feature.

use crate::track::Track;
use anyhow::Result;

/// Result of a track-similarity lookup.
///
/// `Absent` means the service has no similarity data for the track at all.
/// `Ranked(vec![])` means the data exists but lists nothing. The resolver
/// treats the two differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimilarTracks {
    Absent,
    Ranked(Vec<Track>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub album: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserTrackStats {
    pub play_count: u64,
    pub loved: bool,
}

/// One page of the operator's loved tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LovedPage {
    pub items: Vec<Track>,
    pub total_pages: u32,
}

/// Remote music catalog and scrobbling service.
///
/// Every call may fail. Callers decide whether a failure is fatal; inside the
/// session none of them are, apart from an empty loved-tracks collection.
pub trait CatalogService: Send + Sync {
    /// One page (1-based) of free-text search results.
    fn search_track(&self, query: &str, page: u32, limit: u32) -> Result<Vec<Track>>;

    fn track_info(&self, artist: &str, title: &str) -> Result<TrackInfo>;

    /// Play count and loved status for the configured user.
    fn user_track_stats(&self, artist: &str, title: &str) -> Result<UserTrackStats>;

    /// Tracks similar to the given one, in the service's relevance order.
    fn similar_tracks(&self, artist: &str, title: &str, limit: u32) -> Result<SimilarTracks>;

    fn similar_artists(&self, artist: &str, limit: u32) -> Result<Vec<String>>;

    fn top_tracks(&self, artist: &str, limit: u32) -> Result<Vec<Track>>;

    /// One page (1-based) of a user's loved tracks.
    fn loved_tracks(&self, user: &str, page: u32) -> Result<LovedPage>;

    fn scrobble(&self, track: &Track, timestamp: u64) -> Result<()>;

    fn update_now_playing(&self, track: &Track) -> Result<()>;
}
