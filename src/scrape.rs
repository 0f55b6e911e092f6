//! Similarity data scraped from Last.fm web pages.
//!
//! Used only when the structured API has run dry: the track page lists
//! "Similar Tracks", the artist's `+similar` page lists "Similar Artists".

use crate::track::Track;
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

const MUSIC_ROOT: &str = "https://www.last.fm/music";

/// Page-scraping fallback for similarity lookups.
pub trait ScrapeFallbackService: Send + Sync {
    /// First similar track on the track's page for which `is_played` is false.
    fn similar_track_from_page(
        &self,
        artist: &str,
        title: &str,
        is_played: &dyn Fn(&Track) -> bool,
    ) -> Result<Option<Track>>;

    /// Similar artists from the artist's page, `None` when the page has no such section.
    fn similar_artists_from_page(&self, artist: &str) -> Result<Option<Vec<String>>>;
}

pub struct LastFmPageScraper {
    agent: ureq::Agent,
    music_root: String,
}

impl LastFmPageScraper {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            music_root: MUSIC_ROOT.to_string(),
        }
    }

    /// Fetch a page body, `None` unless the server answered 200.
    fn fetch_page(&self, url: &str) -> Result<Option<String>> {
        debug!("Fetching page {url}");
        let mut resp = self
            .agent
            .get(url)
            .call()
            .with_context(|| format!("request {url}"))?;
        if resp.status().as_u16() != 200 {
            warn!("Page {url} answered {}", resp.status());
            return Ok(None);
        }
        let body = resp
            .body_mut()
            .read_to_string()
            .with_context(|| format!("read {url} body"))?;
        Ok(Some(body))
    }
}

impl ScrapeFallbackService for LastFmPageScraper {
    fn similar_track_from_page(
        &self,
        artist: &str,
        title: &str,
        is_played: &dyn Fn(&Track) -> bool,
    ) -> Result<Option<Track>> {
        let url = format!(
            "{}/{}/_/{}",
            self.music_root,
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );
        let Some(page) = self.fetch_page(&url)? else {
            return Ok(None);
        };
        let candidates = parse_similar_tracks(&page)?.unwrap_or_default();
        Ok(candidates.into_iter().find(|track| !is_played(track)))
    }

    fn similar_artists_from_page(&self, artist: &str) -> Result<Option<Vec<String>>> {
        let url = format!("{}/{}/+similar", self.music_root, urlencoding::encode(artist));
        match self.fetch_page(&url)? {
            Some(page) => parse_similar_artists(&page),
            None => Ok(None),
        }
    }
}

/// Tracks listed under the "Similar Tracks" heading, in page order.
pub fn parse_similar_tracks(html: &str) -> Result<Option<Vec<Track>>> {
    let document = Html::parse_document(html);
    let Some(list) = section_list(&document, "h3", "Similar Tracks")? else {
        return Ok(None);
    };

    let item = selector("li")?;
    let title_link = selector("h3 a")?;
    let artist_link = selector("p span a")?;

    let tracks = list
        .select(&item)
        .filter_map(|li| {
            let title = li.select(&title_link).next().map(element_text)?;
            let artist = li.select(&artist_link).next().map(element_text)?;
            Some(Track::new(artist, title))
        })
        .collect();
    Ok(Some(tracks))
}

/// Artist names listed under the "Similar Artists" heading, in page order.
pub fn parse_similar_artists(html: &str) -> Result<Option<Vec<String>>> {
    let document = Html::parse_document(html);
    let Some(list) = section_list(&document, "h2", "Similar Artists")? else {
        return Ok(None);
    };

    let item = selector("li")?;
    let name_link = selector("h3 a")?;

    let artists = list
        .select(&item)
        .filter_map(|li| li.select(&name_link).next().map(element_text))
        .filter(|name| !name.is_empty())
        .collect();
    Ok(Some(artists))
}

/// The first `<ol>` after the heading whose text is `heading_text`.
fn section_list<'a>(
    document: &'a Html,
    heading_tag: &str,
    heading_text: &str,
) -> Result<Option<ElementRef<'a>>> {
    let walk = selector(&format!("{heading_tag}, ol"))?;
    let mut heading_seen = false;
    for element in document.select(&walk) {
        let name = element.value().name();
        if !heading_seen && name == heading_tag && element_text(element) == heading_text {
            heading_seen = true;
        } else if heading_seen && name == "ol" {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow!("invalid selector '{css}': {err:?}"))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK_PAGE: &str = r#"
        <html><body>
          <h3>Featured On</h3>
          <ol><li><h3><a>Some Album</a></h3></li></ol>
          <h3>Similar Tracks</h3>
          <ol>
            <li><h3><a href="/music/Cocteau+Twins/_/Heaven">Heaven or Las Vegas</a></h3>
                <p><span><a href="/music/Cocteau+Twins">Cocteau Twins</a></span></p></li>
            <li><h3><a>When the Sun Hits</a></h3>
                <p><span><a>Slowdive</a></span></p></li>
            <li><h3><a>Broken item without artist</a></h3></li>
          </ol>
        </body></html>
    "#;

    const ARTIST_PAGE: &str = r#"
        <html><body>
          <h2>Similar Artists</h2>
          <ol>
            <li><h3><a>Ride</a></h3></li>
            <li><span>advert</span></li>
            <li><h3><a> Lush </a></h3></li>
          </ol>
        </body></html>
    "#;

    #[test]
    fn test_parse_similar_tracks_in_page_order() {
        let tracks = parse_similar_tracks(TRACK_PAGE)
            .expect("parse")
            .expect("section present");
        assert_eq!(
            tracks,
            vec![
                Track::new("Cocteau Twins", "Heaven or Las Vegas"),
                Track::new("Slowdive", "When the Sun Hits"),
            ]
        );
    }

    #[test]
    fn test_parse_similar_tracks_without_section() {
        let html = "<html><body><h3>Featured On</h3><ol><li>x</li></ol></body></html>";
        assert_eq!(parse_similar_tracks(html).expect("parse"), None);
    }

    #[test]
    fn test_parse_similar_artists() {
        let artists = parse_similar_artists(ARTIST_PAGE)
            .expect("parse")
            .expect("section present");
        assert_eq!(artists, vec!["Ride".to_string(), "Lush".to_string()]);
    }

    #[test]
    fn test_parse_similar_artists_without_section() {
        assert_eq!(parse_similar_artists("<p>nothing</p>").expect("parse"), None);
    }
}
