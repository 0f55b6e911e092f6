//! Interactive track search.
//!
//! Results are listed a page at a time and numbered across pages, so the
//! sixth result keeps the number 6 after paging. When the catalog has nothing
//! more to show, the operator types the track in by hand.

use crate::catalog::CatalogService;
use crate::commands::{prompt, LineInput};
use crate::track::{NextUp, Track};
use log::{debug, warn};

/// Run a search for `query` and let the operator pick a track.
///
/// Returns `None` only when operator input ends.
pub fn search_track(
    catalog: &dyn CatalogService,
    input: &dyn LineInput,
    query: &str,
    page_size: u32,
) -> Option<NextUp> {
    let mut shown: Vec<Track> = Vec::new();
    let mut page = 1;

    loop {
        let results = catalog
            .search_track(query, page, page_size)
            .unwrap_or_else(|err| {
                warn!("Search for '{query}' failed: {err:#}");
                Vec::new()
            });
        debug!("Search page {page} for '{query}' has {} results", results.len());

        if results.is_empty() {
            if shown.is_empty() {
                println!("Nothing found for '{query}'. Enter the track manually.");
            } else {
                println!("No more results. Enter the track manually.");
            }
            return manual_entry(input);
        }

        for (offset, track) in results.iter().enumerate() {
            println!("{}. {track}", shown.len() + offset + 1);
        }
        shown.extend(results);

        loop {
            let answer = prompt(input, "Choose a track number, or 'n' for more results: ")?;
            if answer.eq_ignore_ascii_case("n") {
                page += 1;
                break;
            }
            let chosen = answer
                .parse::<usize>()
                .ok()
                .and_then(|number| number.checked_sub(1))
                .and_then(|index| shown.get(index));
            match chosen {
                Some(track) => return Some(NextUp::from(track.clone())),
                None => println!("Invalid input. Please try again"),
            }
        }
    }
}

/// Ask for artist, title and an optional album.
fn manual_entry(input: &dyn LineInput) -> Option<NextUp> {
    let artist = required(input, "Artist: ")?;
    let title = required(input, "Title: ")?;
    let album = prompt(input, "Album (optional): ")?;

    let mut track = Track::new(artist, title);
    if !album.is_empty() {
        track = track.with_album(album);
    }
    Some(NextUp::manual(track))
}

fn required(input: &dyn LineInput, message: &str) -> Option<String> {
    loop {
        let answer = prompt(input, message)?;
        if !answer.is_empty() {
            return Some(answer);
        }
        println!("Invalid input. Please try again");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ChannelInput;
    use crate::memory::{CatalogCall, CatalogMethod, InMemoryCatalog};

    fn create_test_pages() -> Vec<Vec<Track>> {
        vec![
            (1..=5).map(|i| Track::new("First", format!("Song {i}"))).collect(),
            vec![Track::new("Second", "Song 6"), Track::new("Second", "Song 7")],
        ]
    }

    #[test]
    fn test_pick_from_first_page() {
        let catalog = InMemoryCatalog::new().with_search_pages(create_test_pages());
        let input = ChannelInput::from_lines(["3"]);

        let picked = search_track(&catalog, &input, "song", 5).expect("picked");
        assert_eq!(picked, NextUp::from(Track::new("First", "Song 3")));
        assert!(!picked.manual);
    }

    #[test]
    fn test_numbers_continue_across_pages() {
        let catalog = InMemoryCatalog::new().with_search_pages(create_test_pages());
        let input = ChannelInput::from_lines(["zero", "0", "N", "7"]);

        let picked = search_track(&catalog, &input, "song", 5).expect("picked");
        assert_eq!(picked.track, Track::new("Second", "Song 7"));
        assert_eq!(
            catalog.calls(),
            vec![
                CatalogCall::Search { query: "song".into(), page: 1 },
                CatalogCall::Search { query: "song".into(), page: 2 },
            ]
        );
    }

    #[test]
    fn test_earlier_page_stays_selectable() {
        let catalog = InMemoryCatalog::new().with_search_pages(create_test_pages());
        let input = ChannelInput::from_lines(["n", "2"]);

        let picked = search_track(&catalog, &input, "song", 5).expect("picked");
        assert_eq!(picked.track, Track::new("First", "Song 2"));
    }

    #[test]
    fn test_paging_past_end_falls_back_to_manual_entry() {
        let catalog = InMemoryCatalog::new().with_search_pages(create_test_pages());
        let input = ChannelInput::from_lines(["n", "n", "Low", "", "Words", "The Great Destroyer"]);

        let picked = search_track(&catalog, &input, "song", 5).expect("picked");
        assert!(picked.manual);
        assert_eq!(
            picked.track,
            Track::new("Low", "Words").with_album("The Great Destroyer")
        );
    }

    #[test]
    fn test_failed_search_goes_to_manual_entry() {
        let catalog = InMemoryCatalog::new().failing(CatalogMethod::Search);
        let input = ChannelInput::from_lines(["Low", "Words", ""]);

        let picked = search_track(&catalog, &input, "anything", 5).expect("picked");
        assert_eq!(picked, NextUp::manual(Track::new("Low", "Words")));
    }

    #[test]
    fn test_closed_input_gives_none() {
        let catalog = InMemoryCatalog::new().with_search_pages(create_test_pages());
        let input = ChannelInput::from_lines(["n"]);
        assert_eq!(search_track(&catalog, &input, "song", 5), None);
    }
}
