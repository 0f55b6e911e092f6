//! In-memory collaborators.
//!
//! Canned catalog, scraper and lyrics implementations that record every call.
//! They drive offline sessions in tests and benchmarks, where call counts are
//! how tier ordering and scrobble behaviour get checked.

use crate::catalog::{CatalogService, LovedPage, SimilarTracks, TrackInfo, UserTrackStats};
use crate::lyrics::LyricsService;
use crate::scrape::ScrapeFallbackService;
use crate::track::{recency_key, Track};
use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

/// A call made against [`InMemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    Search { query: String, page: u32 },
    TrackInfo(Track),
    UserTrackStats(Track),
    SimilarTracks(Track),
    SimilarArtists(String),
    TopTracks(String),
    LovedTracks(u32),
    Scrobble(Track),
    NowPlaying(Track),
}

/// Catalog methods that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogMethod {
    Search,
    TrackInfo,
    UserTrackStats,
    SimilarTracks,
    SimilarArtists,
    TopTracks,
    LovedTracks,
    Scrobble,
    NowPlaying,
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    search_pages: Vec<Vec<Track>>,
    albums: HashMap<String, String>,
    stats: HashMap<String, UserTrackStats>,
    similar_tracks: HashMap<String, Vec<Track>>,
    similar_artists: HashMap<String, Vec<String>>,
    top_tracks: HashMap<String, Vec<Track>>,
    loved_pages: Vec<Vec<Track>>,
    failing: HashSet<CatalogMethod>,
    calls: Mutex<Vec<CatalogCall>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages returned by `search_track`, whatever the query.
    #[must_use]
    pub fn with_search_pages(mut self, pages: Vec<Vec<Track>>) -> Self {
        self.search_pages = pages;
        self
    }

    #[must_use]
    pub fn with_album(mut self, artist: &str, title: &str, album: &str) -> Self {
        self.albums.insert(recency_key(artist, title), album.to_string());
        self
    }

    #[must_use]
    pub fn with_stats(mut self, artist: &str, title: &str, stats: UserTrackStats) -> Self {
        self.stats.insert(recency_key(artist, title), stats);
        self
    }

    /// Tracks without an entry here answer `SimilarTracks::Absent`.
    #[must_use]
    pub fn with_similar_tracks(mut self, artist: &str, title: &str, similar: Vec<Track>) -> Self {
        self.similar_tracks.insert(recency_key(artist, title), similar);
        self
    }

    #[must_use]
    pub fn with_similar_artists(mut self, artist: &str, similar: &[&str]) -> Self {
        self.similar_artists.insert(
            artist.to_lowercase(),
            similar.iter().map(|name| (*name).to_string()).collect(),
        );
        self
    }

    #[must_use]
    pub fn with_top_tracks(mut self, artist: &str, titles: &[&str]) -> Self {
        self.top_tracks.insert(
            artist.to_lowercase(),
            titles.iter().map(|title| Track::new(artist, *title)).collect(),
        );
        self
    }

    #[must_use]
    pub fn with_loved_pages(mut self, pages: Vec<Vec<Track>>) -> Self {
        self.loved_pages = pages;
        self
    }

    #[must_use]
    pub fn failing(mut self, method: CatalogMethod) -> Self {
        self.failing.insert(method);
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&CatalogCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| predicate(call))
            .count()
    }

    #[must_use]
    pub fn scrobbles(&self) -> Vec<Track> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                CatalogCall::Scrobble(track) => Some(track),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: CatalogCall, method: CatalogMethod) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        if self.failing.contains(&method) {
            bail!("{method:?} is unavailable");
        }
        Ok(())
    }
}

impl CatalogService for InMemoryCatalog {
    fn search_track(&self, query: &str, page: u32, _limit: u32) -> Result<Vec<Track>> {
        self.record(
            CatalogCall::Search { query: query.to_string(), page },
            CatalogMethod::Search,
        )?;
        let index = page.saturating_sub(1) as usize;
        Ok(self.search_pages.get(index).cloned().unwrap_or_default())
    }

    fn track_info(&self, artist: &str, title: &str) -> Result<TrackInfo> {
        self.record(CatalogCall::TrackInfo(Track::new(artist, title)), CatalogMethod::TrackInfo)?;
        Ok(TrackInfo {
            album: self.albums.get(&recency_key(artist, title)).cloned(),
        })
    }

    fn user_track_stats(&self, artist: &str, title: &str) -> Result<UserTrackStats> {
        self.record(
            CatalogCall::UserTrackStats(Track::new(artist, title)),
            CatalogMethod::UserTrackStats,
        )?;
        Ok(self
            .stats
            .get(&recency_key(artist, title))
            .cloned()
            .unwrap_or_default())
    }

    fn similar_tracks(&self, artist: &str, title: &str, limit: u32) -> Result<SimilarTracks> {
        self.record(
            CatalogCall::SimilarTracks(Track::new(artist, title)),
            CatalogMethod::SimilarTracks,
        )?;
        Ok(match self.similar_tracks.get(&recency_key(artist, title)) {
            Some(similar) => SimilarTracks::Ranked(similar.iter().take(limit as usize).cloned().collect()),
            None => SimilarTracks::Absent,
        })
    }

    fn similar_artists(&self, artist: &str, limit: u32) -> Result<Vec<String>> {
        self.record(
            CatalogCall::SimilarArtists(artist.to_string()),
            CatalogMethod::SimilarArtists,
        )?;
        Ok(self
            .similar_artists
            .get(&artist.to_lowercase())
            .map(|names| names.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    fn top_tracks(&self, artist: &str, limit: u32) -> Result<Vec<Track>> {
        self.record(CatalogCall::TopTracks(artist.to_string()), CatalogMethod::TopTracks)?;
        Ok(self
            .top_tracks
            .get(&artist.to_lowercase())
            .map(|tracks| tracks.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    fn loved_tracks(&self, _user: &str, page: u32) -> Result<LovedPage> {
        self.record(CatalogCall::LovedTracks(page), CatalogMethod::LovedTracks)?;
        let index = page.saturating_sub(1) as usize;
        Ok(LovedPage {
            items: self.loved_pages.get(index).cloned().unwrap_or_default(),
            total_pages: u32::try_from(self.loved_pages.len()).unwrap_or(u32::MAX),
        })
    }

    fn scrobble(&self, track: &Track, _timestamp: u64) -> Result<()> {
        self.record(CatalogCall::Scrobble(track.clone()), CatalogMethod::Scrobble)
    }

    fn update_now_playing(&self, track: &Track) -> Result<()> {
        self.record(CatalogCall::NowPlaying(track.clone()), CatalogMethod::NowPlaying)
    }
}

/// A call made against [`InMemoryScraper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeCall {
    SimilarTrack(Track),
    SimilarArtists(String),
}

#[derive(Debug, Default)]
pub struct InMemoryScraper {
    similar_tracks: HashMap<String, Vec<Track>>,
    similar_artists: HashMap<String, Vec<String>>,
    calls: Mutex<Vec<ScrapeCall>>,
}

impl InMemoryScraper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_similar_tracks(mut self, artist: &str, title: &str, similar: Vec<Track>) -> Self {
        self.similar_tracks.insert(recency_key(artist, title), similar);
        self
    }

    #[must_use]
    pub fn with_similar_artists(mut self, artist: &str, similar: &[&str]) -> Self {
        self.similar_artists.insert(
            artist.to_lowercase(),
            similar.iter().map(|name| (*name).to_string()).collect(),
        );
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ScrapeCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: ScrapeCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl ScrapeFallbackService for InMemoryScraper {
    fn similar_track_from_page(
        &self,
        artist: &str,
        title: &str,
        is_played: &dyn Fn(&Track) -> bool,
    ) -> Result<Option<Track>> {
        self.record(ScrapeCall::SimilarTrack(Track::new(artist, title)));
        Ok(self
            .similar_tracks
            .get(&recency_key(artist, title))
            .and_then(|tracks| tracks.iter().find(|track| !is_played(track)).cloned()))
    }

    fn similar_artists_from_page(&self, artist: &str) -> Result<Option<Vec<String>>> {
        self.record(ScrapeCall::SimilarArtists(artist.to_string()));
        Ok(self.similar_artists.get(&artist.to_lowercase()).cloned())
    }
}

/// Chord sheets keyed by track.
#[derive(Debug, Default)]
pub struct InMemoryLyrics {
    sheets: HashMap<String, String>,
}

impl InMemoryLyrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sheet(mut self, artist: &str, title: &str, sheet: &str) -> Self {
        self.sheets.insert(recency_key(artist, title), sheet.to_string());
        self
    }
}

impl LyricsService for InMemoryLyrics {
    fn fetch(&self, artist: &str, title: &str) -> Option<String> {
        self.sheets.get(&recency_key(artist, title)).cloned()
    }
}
