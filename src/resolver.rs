//! # Next-Track Resolution
//!
//! Picks what plays next by walking a fixed chain of tiers. The first tier
//! that yields a usable candidate wins:
//!
//! 1. **Catalog similarity**: the catalog's similar tracks for the reference,
//!    in the catalog's own ranking, first one not played yet.
//! 2. **Scraped similarity**: only when tier 1 had a list and every entry was
//!    played. One more candidate is pulled from the track's web page.
//! 3. **Similar artists**: top tracks of artists similar to the reference
//!    artist, skipping artists aborted in this session.
//! 4. **Random loved track**: a random page of the user's loved tracks, then a
//!    random track on that page. Played tracks are not filtered here.
//!
//! A catalog that has *no* similarity data for the reference goes straight
//! from tier 1 to tier 3; the page scrape is reserved for lists that exist but
//! are used up.
//!
//! Failures in tiers 1-3 are logged and count as "no candidate". Tier 4 is the
//! only one that can fail the chain, and an empty loved-tracks collection is
//! reported as [`ResolveError::EmptyLovedTracks`].

use crate::catalog::{CatalogService, SimilarTracks};
use crate::recency::RecencyTracker;
use crate::scrape::ScrapeFallbackService;
use crate::track::Track;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which stage of the chain produced a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    CatalogSimilarity,
    ScrapedSimilarity,
    SimilarArtist,
    RandomLoved,
}

impl Tier {
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::CatalogSimilarity | Self::ScrapedSimilarity => "similar on track",
            Self::SimilarArtist => "similar on artist",
            Self::RandomLoved => "random loved track",
        }
    }
}

/// Outcome of a single tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Found(Track),
    NoCandidate,
}

/// Tier 1 needs a third outcome: the list may be missing altogether.
#[derive(Debug)]
enum Similarity {
    Found(Track),
    Exhausted,
    Absent,
}

/// A resolved next track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub track: Track,
    pub tier: Tier,
}

impl Resolved {
    fn new(track: Track, tier: Tier) -> Self {
        Self { track, tier }
    }
}

/// Conditions that end the session because no fallback is left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    EmptyLovedTracks { user: String },
    EmptyLovedPage { user: String, page: u32 },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLovedTracks { user } => write!(
                f,
                "User '{user}' has no loved tracks; love a few tracks on Last.fm so the session has somewhere to fall back to"
            ),
            Self::EmptyLovedPage { user, page } => {
                write!(f, "Page {page} of loved tracks for '{user}' came back empty")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// How many items each catalog lookup asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSettings {
    pub similar_tracks_limit: u32,
    pub similar_artists_limit: u32,
    pub top_tracks_limit: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            similar_tracks_limit: 50,
            similar_artists_limit: 12,
            top_tracks_limit: 6,
        }
    }
}

pub struct SimilarityResolver {
    catalog: Arc<dyn CatalogService>,
    scraper: Arc<dyn ScrapeFallbackService>,
    username: String,
    settings: ResolverSettings,
    rng: StdRng,
}

impl SimilarityResolver {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        scraper: Arc<dyn ScrapeFallbackService>,
        username: impl Into<String>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            catalog,
            scraper,
            username: username.into(),
            settings,
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed for the loved-track draw.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run the whole chain for `reference`.
    ///
    /// # Errors
    ///
    /// Fails only when tier 4 fails: the loved-tracks collection is empty or
    /// cannot be fetched.
    pub fn resolve_next(&mut self, reference: &Track, tracker: &RecencyTracker) -> Result<Resolved> {
        info!("Resolving the track to follow {reference}");

        match self.catalog_similarity(reference, tracker) {
            Similarity::Found(track) => return Ok(Resolved::new(track, Tier::CatalogSimilarity)),
            Similarity::Exhausted => {
                if let Candidate::Found(track) = self.scraped_similarity(reference, tracker) {
                    return Ok(Resolved::new(track, Tier::ScrapedSimilarity));
                }
            }
            Similarity::Absent => {
                debug!("No similarity data for {reference}, skipping the page scrape");
            }
        }

        self.resolve_from_artist(&reference.artist, tracker)
    }

    /// Enter the chain at tier 3, keyed on `artist`.
    ///
    /// # Errors
    ///
    /// Same as [`resolve_next`](Self::resolve_next).
    pub fn resolve_from_artist(&mut self, artist: &str, tracker: &RecencyTracker) -> Result<Resolved> {
        if let Candidate::Found(track) = self.similar_artist_track(artist, tracker) {
            return Ok(Resolved::new(track, Tier::SimilarArtist));
        }
        self.random_loved()
    }

    /// Tier 4 on its own: a random page, then a random track on it.
    ///
    /// The draw is deliberately not uniform over the whole collection: a
    /// short last page makes each of its tracks more likely.
    ///
    /// # Errors
    ///
    /// [`ResolveError::EmptyLovedTracks`] when the user has loved nothing;
    /// transport errors from the catalog.
    pub fn random_loved(&mut self) -> Result<Resolved> {
        info!("Searching a random loved track of '{}'", self.username);
        let first = self
            .catalog
            .loved_tracks(&self.username, 1)
            .context("Failed to fetch loved tracks")?;
        if first.total_pages == 0 {
            return Err(ResolveError::EmptyLovedTracks {
                user: self.username.clone(),
            }
            .into());
        }

        let page_number = self.rng.gen_range(1..=first.total_pages);
        let page = if page_number == 1 {
            first
        } else {
            self.catalog
                .loved_tracks(&self.username, page_number)
                .with_context(|| format!("Failed to fetch page {page_number} of loved tracks"))?
        };

        let track = page
            .items
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| ResolveError::EmptyLovedPage {
                user: self.username.clone(),
                page: page_number,
            })?;
        debug!("Picked {track} from loved page {page_number}/{}", page.total_pages);
        Ok(Resolved::new(track, Tier::RandomLoved))
    }

    fn catalog_similarity(&self, reference: &Track, tracker: &RecencyTracker) -> Similarity {
        let ranked = match self.catalog.similar_tracks(
            &reference.artist,
            &reference.title,
            self.settings.similar_tracks_limit,
        ) {
            Ok(SimilarTracks::Ranked(ranked)) => ranked,
            Ok(SimilarTracks::Absent) => return Similarity::Absent,
            Err(err) => {
                warn!("Similar tracks lookup for {reference} failed: {err:#}");
                return Similarity::Absent;
            }
        };

        debug!("Catalog lists {} tracks similar to {reference}", ranked.len());
        ranked
            .into_iter()
            .find(|candidate| !tracker.was_track_played(candidate))
            .map_or(Similarity::Exhausted, Similarity::Found)
    }

    fn scraped_similarity(&self, reference: &Track, tracker: &RecencyTracker) -> Candidate {
        let is_played = |track: &Track| tracker.was_track_played(track);
        match self
            .scraper
            .similar_track_from_page(&reference.artist, &reference.title, &is_played)
        {
            Ok(Some(track)) if !tracker.was_track_played(&track) => Candidate::Found(track),
            Ok(Some(track)) => {
                warn!("Page scrape offered {track}, which was already played");
                Candidate::NoCandidate
            }
            Ok(None) => Candidate::NoCandidate,
            Err(err) => {
                warn!("Similar tracks page for {reference} failed: {err:#}");
                Candidate::NoCandidate
            }
        }
    }

    fn similar_artist_track(&self, artist: &str, tracker: &RecencyTracker) -> Candidate {
        if artist.trim().is_empty() {
            return Candidate::NoCandidate;
        }

        for name in self.similar_artists(artist) {
            if tracker.is_aborted(&name) {
                debug!("Skipping aborted artist {name}");
                continue;
            }
            let top = match self.catalog.top_tracks(&name, self.settings.top_tracks_limit) {
                Ok(top) => top,
                Err(err) => {
                    warn!("Top tracks lookup for {name} failed: {err:#}");
                    continue;
                }
            };
            if let Some(track) = top.into_iter().find(|track| !tracker.was_track_played(track)) {
                return Candidate::Found(track);
            }
        }
        Candidate::NoCandidate
    }

    /// Catalog list first; the artist page only when the catalog gives nothing.
    fn similar_artists(&self, artist: &str) -> Vec<String> {
        let listed = self
            .catalog
            .similar_artists(artist, self.settings.similar_artists_limit)
            .unwrap_or_else(|err| {
                warn!("Similar artists lookup for {artist} failed: {err:#}");
                Vec::new()
            });
        if !listed.is_empty() {
            return listed;
        }

        debug!("Catalog lists no artists similar to {artist}, trying the artist page");
        match self.scraper.similar_artists_from_page(artist) {
            Ok(scraped) => scraped.unwrap_or_default(),
            Err(err) => {
                warn!("Similar artists page for {artist} failed: {err:#}");
                Vec::new()
            }
        }
    }
}
