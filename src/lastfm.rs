//! # Last.fm Web API Client
//!
//! [`CatalogService`] over the Last.fm JSON API at `ws.audioscrobbler.com`.
//!
//! Read methods are plain GET requests keyed by the API key. Write methods
//! (`track.scrobble`, `track.updateNowPlaying`) and the authorization calls
//! are form POSTs carrying an `api_sig`: the MD5 of every parameter as
//! `key + value`, sorted by key, followed by the API secret.
//!
//! Last.fm reports failures as `{"error": <code>, "message": ...}`, sometimes
//! with a 200 status, so every response body is checked for that shape.
//! A similar-tracks response without a `similartracks` object is not an error
//! for the session; it maps to [`SimilarTracks::Absent`].

use crate::auth::SessionAuthStore;
use crate::catalog::{CatalogService, LovedPage, SimilarTracks, TrackInfo, UserTrackStats};
use crate::commands::{prompt, LineInput};
use crate::track::Track;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";
const AUTH_URL: &str = "http://www.last.fm/api/auth";

pub struct LastFmClient {
    agent: ureq::Agent,
    api_root: String,
    api_key: String,
    api_secret: String,
    username: String,
    session_key: Option<String>,
}

impl LastFmClient {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        username: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            api_root: API_ROOT.to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            username: username.into(),
            session_key: None,
        }
    }

    /// Attach the session key needed for scrobbling.
    #[must_use]
    pub fn with_session_key(mut self, session_key: impl Into<String>) -> Self {
        self.session_key = Some(session_key.into());
        self
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.session_key.is_some()
    }

    /// Browser URL where the user grants access for `token`.
    #[must_use]
    pub fn auth_url(&self, token: &str) -> String {
        format!("{AUTH_URL}?api_key={}&token={}", self.api_key, token)
    }

    /// Ask for an unauthorized request token (`auth.getToken`).
    pub fn request_token(&self) -> Result<String> {
        let response: TokenResponse = self.post_signed("auth.getToken", &[])?;
        Ok(response.token)
    }

    /// Exchange an authorized token for a session key (`auth.getSession`).
    pub fn session_from_token(&self, token: &str) -> Result<String> {
        let response: SessionResponse = self.post_signed("auth.getSession", &[("token", token)])?;
        info!("Authorized as '{}'", response.session.name);
        Ok(response.session.key)
    }

    fn get_value(&self, method: &str, params: &[(&str, &str)]) -> Result<Value> {
        debug!("GET {method} {params:?}");
        let mut request = self
            .agent
            .get(&self.api_root)
            .query("method", method)
            .query("api_key", &self.api_key)
            .query("format", "json");
        for (key, value) in params {
            request = request.query(*key, *value);
        }
        let resp = request.call().with_context(|| format!("request {method}"))?;
        read_value(resp, method)
    }

    fn get<T: DeserializeOwned>(&self, method: &str, params: &[(&str, &str)]) -> Result<T> {
        let value = self.get_value(method, params)?;
        check_api_error(&value, method)?;
        serde_json::from_value(value).with_context(|| format!("decode {method} response"))
    }

    fn post_signed<T: DeserializeOwned>(&self, method: &str, params: &[(&str, &str)]) -> Result<T> {
        debug!("POST {method}");
        let mut pairs: Vec<(String, String)> = params
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        pairs.push(("method".into(), method.into()));
        pairs.push(("api_key".into(), self.api_key.clone()));

        let signature = sign(&pairs, &self.api_secret);
        pairs.push(("api_sig".into(), signature));
        pairs.push(("format".into(), "json".into()));

        let resp = self
            .agent
            .post(&self.api_root)
            .send_form(pairs.iter().map(|(key, value)| (key.as_str(), value.as_str())))
            .with_context(|| format!("request {method}"))?;
        let value = read_value(resp, method)?;
        check_api_error(&value, method)?;
        serde_json::from_value(value).with_context(|| format!("decode {method} response"))
    }

    fn session_key(&self) -> Result<&str> {
        self.session_key
            .as_deref()
            .context("No Last.fm session; run `segue login` first")
    }
}

impl CatalogService for LastFmClient {
    fn search_track(&self, query: &str, page: u32, limit: u32) -> Result<Vec<Track>> {
        let page = page.to_string();
        let limit = limit.to_string();
        let response: SearchResponse = self.get(
            "track.search",
            &[("track", query), ("page", &page), ("limit", &limit)],
        )?;
        Ok(response.tracks())
    }

    fn track_info(&self, artist: &str, title: &str) -> Result<TrackInfo> {
        let response: TrackInfoResponse =
            self.get("track.getInfo", &[("artist", artist), ("track", title)])?;
        Ok(TrackInfo {
            album: response.track.album.map(|album| album.title),
        })
    }

    fn user_track_stats(&self, artist: &str, title: &str) -> Result<UserTrackStats> {
        let response: TrackInfoResponse = self.get(
            "track.getInfo",
            &[("artist", artist), ("track", title), ("username", &self.username)],
        )?;
        Ok(response.track.stats())
    }

    fn similar_tracks(&self, artist: &str, title: &str, limit: u32) -> Result<SimilarTracks> {
        let limit = limit.to_string();
        let value = self.get_value(
            "track.getSimilar",
            &[("artist", artist), ("track", title), ("limit", &limit)],
        )?;
        parse_similar_tracks(value)
    }

    fn similar_artists(&self, artist: &str, limit: u32) -> Result<Vec<String>> {
        let limit = limit.to_string();
        let response: SimilarArtistsResponse =
            self.get("artist.getSimilar", &[("artist", artist), ("limit", &limit)])?;
        Ok(response
            .similarartists
            .artist
            .into_vec()
            .into_iter()
            .map(|artist| artist.name)
            .collect())
    }

    fn top_tracks(&self, artist: &str, limit: u32) -> Result<Vec<Track>> {
        let limit = limit.to_string();
        let response: TopTracksResponse =
            self.get("artist.getTopTracks", &[("artist", artist), ("limit", &limit)])?;
        Ok(response
            .toptracks
            .track
            .into_vec()
            .into_iter()
            .map(ApiTrack::into_track)
            .collect())
    }

    fn loved_tracks(&self, user: &str, page: u32) -> Result<LovedPage> {
        let page = page.to_string();
        let value = self.get_value("user.getLovedTracks", &[("user", user), ("page", &page)])?;
        parse_loved_page(value)
    }

    fn scrobble(&self, track: &Track, timestamp: u64) -> Result<()> {
        let session_key = self.session_key()?;
        let timestamp = timestamp.to_string();
        let mut params = vec![
            ("artist", track.artist.as_str()),
            ("track", track.title.as_str()),
            ("timestamp", timestamp.as_str()),
            ("sk", session_key),
        ];
        if let Some(album) = track.album.as_deref() {
            params.push(("album", album));
        }
        let _: Value = self.post_signed("track.scrobble", &params)?;
        Ok(())
    }

    fn update_now_playing(&self, track: &Track) -> Result<()> {
        let session_key = self.session_key()?;
        let mut params = vec![
            ("artist", track.artist.as_str()),
            ("track", track.title.as_str()),
            ("sk", session_key),
        ];
        if let Some(album) = track.album.as_deref() {
            params.push(("album", album));
        }
        let _: Value = self.post_signed("track.updateNowPlaying", &params)?;
        Ok(())
    }
}

/// Run the web authorization flow and store the resulting session key.
pub fn authorize(
    client: &LastFmClient,
    store: &dyn SessionAuthStore,
    input: &dyn LineInput,
) -> Result<String> {
    let token = client.request_token()?;
    println!("Grant access in your browser:\n{}", client.auth_url(&token));
    prompt(input, "Press Enter once access is granted... ")
        .context("Input closed before authorization finished")?;

    let session_key = client.session_from_token(&token)?;
    store.save(&session_key)?;
    Ok(session_key)
}

/// `api_sig` for a set of request parameters.
#[must_use]
pub fn sign(params: &[(String, String)], secret: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut payload = String::new();
    for (key, value) in sorted {
        payload.push_str(key);
        payload.push_str(value);
    }
    payload.push_str(secret);
    format!("{:x}", md5::compute(payload.as_bytes()))
}

pub fn parse_similar_tracks(value: Value) -> Result<SimilarTracks> {
    let response: SimilarTracksResponse =
        serde_json::from_value(value).context("decode track.getSimilar response")?;
    Ok(match response.similartracks {
        Some(list) => SimilarTracks::Ranked(
            list.track
                .into_vec()
                .into_iter()
                .map(ApiTrack::into_track)
                .collect(),
        ),
        None => SimilarTracks::Absent,
    })
}

pub fn parse_loved_page(value: Value) -> Result<LovedPage> {
    check_api_error(&value, "user.getLovedTracks")?;
    let response: LovedTracksResponse =
        serde_json::from_value(value).context("decode user.getLovedTracks response")?;
    let total_pages = response
        .lovedtracks
        .attr
        .total_pages
        .trim()
        .parse()
        .context("loved tracks totalPages is not a number")?;
    Ok(LovedPage {
        items: response
            .lovedtracks
            .track
            .into_vec()
            .into_iter()
            .map(ApiTrack::into_track)
            .collect(),
        total_pages,
    })
}

fn read_value(mut resp: ureq::http::Response<ureq::Body>, method: &str) -> Result<Value> {
    let status = resp.status();
    let body = resp
        .body_mut()
        .read_to_string()
        .with_context(|| format!("read {method} response body"))?;
    serde_json::from_str(&body)
        .with_context(|| format!("decode {method} response (status {status})"))
}

fn check_api_error(value: &Value, method: &str) -> Result<()> {
    if let Some(code) = value.get("error").and_then(Value::as_i64) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message");
        bail!("{method} failed with Last.fm error {code}: {message}");
    }
    Ok(())
}

/// Last.fm sends a bare object instead of a one-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

/// Search results name the artist as a string, everything else as an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiArtist {
    Plain(String),
    Named { name: String },
}

impl ApiArtist {
    fn into_name(self) -> String {
        match self {
            Self::Plain(name) | Self::Named { name } => name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    name: String,
    artist: ApiArtist,
}

impl ApiTrack {
    fn into_track(self) -> Track {
        Track::new(self.artist.into_name(), self.name)
    }
}

#[derive(Debug, Deserialize)]
struct TrackList {
    #[serde(default)]
    track: OneOrMany<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    trackmatches: Option<TrackList>,
}

impl SearchResponse {
    fn tracks(self) -> Vec<Track> {
        self.results
            .trackmatches
            .map(|matches| matches.track.into_vec())
            .unwrap_or_default()
            .into_iter()
            .map(ApiTrack::into_track)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct TrackInfoResponse {
    track: TrackDetails,
}

#[derive(Debug, Deserialize)]
struct TrackDetails {
    #[serde(default)]
    album: Option<AlbumRef>,
    #[serde(default)]
    userplaycount: Option<Value>,
    #[serde(default)]
    userloved: Option<Value>,
}

impl TrackDetails {
    fn stats(&self) -> UserTrackStats {
        UserTrackStats {
            play_count: self.userplaycount.as_ref().and_then(number_field).unwrap_or(0),
            loved: self.userloved.as_ref().and_then(number_field) == Some(1),
        }
    }
}

/// Numeric fields arrive as strings or numbers depending on the method.
fn number_field(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SimilarTracksResponse {
    #[serde(default)]
    similartracks: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
struct SimilarArtistsResponse {
    similarartists: ArtistList,
}

#[derive(Debug, Deserialize)]
struct ArtistList {
    #[serde(default)]
    artist: OneOrMany<NamedArtist>,
}

#[derive(Debug, Deserialize)]
struct NamedArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    toptracks: TrackList,
}

#[derive(Debug, Deserialize)]
struct LovedTracksResponse {
    lovedtracks: LovedTracks,
}

#[derive(Debug, Deserialize)]
struct LovedTracks {
    #[serde(default)]
    track: OneOrMany<ApiTrack>,
    #[serde(rename = "@attr")]
    attr: PageAttr,
}

#[derive(Debug, Deserialize)]
struct PageAttr {
    #[serde(rename = "totalPages")]
    total_pages: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session: SessionInfo,
}

#[derive(Debug, Deserialize)]
struct SessionInfo {
    name: String,
    key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sign_sorts_parameters() {
        let params = vec![
            ("token".to_string(), "t456".to_string()),
            ("method".to_string(), "auth.getSession".to_string()),
            ("api_key".to_string(), "k123".to_string()),
        ];
        assert_eq!(sign(&params, "s3cret"), "5d62a5de90c4a6c844163ec9f41698be");
    }

    #[test]
    fn test_similar_tracks_present_and_absent() {
        let present = json!({
            "similartracks": {
                "track": [
                    {"name": "Glory Box", "artist": {"name": "Portishead"}},
                    {"name": "Teardrop", "artist": {"name": "Massive Attack"}}
                ],
                "@attr": {"artist": "Tricky"}
            }
        });
        assert_eq!(
            parse_similar_tracks(present).expect("parse"),
            SimilarTracks::Ranked(vec![
                Track::new("Portishead", "Glory Box"),
                Track::new("Massive Attack", "Teardrop"),
            ])
        );

        let empty = json!({"similartracks": {"track": [], "@attr": {}}});
        assert_eq!(
            parse_similar_tracks(empty).expect("parse"),
            SimilarTracks::Ranked(vec![])
        );

        let missing = json!({"error": 6, "message": "Track not found"});
        assert_eq!(parse_similar_tracks(missing).expect("parse"), SimilarTracks::Absent);
    }

    #[test]
    fn test_loved_page_parses_string_total() {
        let value = json!({
            "lovedtracks": {
                "track": {"name": "Roads", "artist": {"name": "Portishead"}},
                "@attr": {"user": "listener", "totalPages": "4", "page": "1"}
            }
        });
        let page = parse_loved_page(value).expect("parse");
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.items, vec![Track::new("Portishead", "Roads")]);
    }

    #[test]
    fn test_loved_page_reports_api_error() {
        let value = json!({"error": 10, "message": "Invalid API key"});
        let err = parse_loved_page(value).expect_err("api error");
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn test_search_results_use_plain_artist() {
        let response: SearchResponse = serde_json::from_value(json!({
            "results": {
                "trackmatches": {
                    "track": [{"name": "Karmacoma", "artist": "Massive Attack", "listeners": "1"}]
                }
            }
        }))
        .expect("decode");
        assert_eq!(response.tracks(), vec![Track::new("Massive Attack", "Karmacoma")]);
    }

    #[test]
    fn test_track_details_stats() {
        let response: TrackInfoResponse = serde_json::from_value(json!({
            "track": {
                "name": "Angel",
                "album": {"title": "Mezzanine"},
                "userplaycount": "12",
                "userloved": "1"
            }
        }))
        .expect("decode");
        assert_eq!(
            response.track.stats(),
            UserTrackStats {
                play_count: 12,
                loved: true
            }
        );
        assert_eq!(response.track.album.map(|a| a.title).as_deref(), Some("Mezzanine"));
    }

    #[test]
    fn test_auth_url() {
        let client = LastFmClient::new("key", "secret", "listener", Duration::from_secs(1));
        assert_eq!(
            client.auth_url("tok"),
            "http://www.last.fm/api/auth?api_key=key&token=tok"
        );
        assert!(!client.has_session());
    }
}
