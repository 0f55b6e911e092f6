//! # Integration Tests for Segue
//!
//! Full listening sessions driven through the public API against in-memory
//! collaborators, plus the command-line surface of the binary.

use segue::commands::ChannelInput;
use segue::controller::{ControllerSettings, PlaybackController, PlaybackPhase};
use segue::lyrics::LyricsService;
use segue::memory::{CatalogCall, CatalogMethod, InMemoryCatalog, InMemoryLyrics, InMemoryScraper};
use segue::resolver::{ResolveError, ResolverSettings, SimilarityResolver};
use segue::track::{NextUp, Track};
use std::sync::Arc;
use std::time::Duration;

/// Test helper wiring a controller to in-memory collaborators
fn create_test_session(
    catalog: &Arc<InMemoryCatalog>,
    lyrics: Arc<dyn LyricsService>,
) -> PlaybackController {
    let resolver = SimilarityResolver::new(
        catalog.clone(),
        Arc::new(InMemoryScraper::new()),
        "listener",
        ResolverSettings::default(),
    )
    .with_seed(42);
    PlaybackController::new(
        catalog.clone(),
        resolver,
        lyrics,
        ControllerSettings {
            tick_interval: Duration::from_millis(1),
            search_page_size: 5,
        },
    )
}

fn run_session(catalog: &Arc<InMemoryCatalog>, first: Track, lines: &[&str]) -> PlaybackController {
    let mut controller = create_test_session(catalog, Arc::new(InMemoryLyrics::new()));
    controller
        .run(NextUp::from(first), ChannelInput::from_lines(lines.iter().copied()))
        .expect("session should end cleanly");
    controller
}

#[cfg(test)]
mod cli_tests {
    use clap::Parser;
    use segue::cli::{Args, Command, Shell};
    use std::process::Command as Process;

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = Process::new(env!("CARGO_BIN_EXE_segue"))
            .arg("--help")
            .output()
            .expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("segue"));
        assert!(stdout.contains("play"));
        assert!(stdout.contains("login"));
        assert!(stdout.contains("logout"));
        assert!(stdout.contains("completion"));
    }

    #[test]
    fn test_cli_version_flag() {
        let output = Process::new(env!("CARGO_BIN_EXE_segue"))
            .arg("--version")
            .output()
            .expect("Failed to run version command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("segue"));
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_completion_generation() {
        let output = Process::new(env!("CARGO_BIN_EXE_segue"))
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_segue"));
        assert!(stdout.contains("complete"));
    }

    #[test]
    fn test_play_arguments() {
        let args = Args::try_parse_from([
            "segue",
            "play",
            "-n",
            "Portishead Roads",
            "--tick-ms",
            "250",
            "--api-key",
            "abc",
        ])
        .expect("valid arguments");

        assert_eq!(args.credentials.api_key.as_deref(), Some("abc"));
        match args.command {
            Command::Play { track, tick_ms } => {
                assert_eq!(track.as_deref(), Some("Portishead Roads"));
                assert_eq!(tick_ms, Some(250));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_completion_requires_known_shell() {
        let args = Args::try_parse_from(["segue", "completion", "power-shell"]).expect("valid");
        assert!(matches!(
            args.command,
            Command::Completion {
                shell: Shell::PowerShell
            }
        ));
        assert!(Args::try_parse_from(["segue", "completion", "tcsh"]).is_err());
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_finished_tracks_chain_through_similarity() {
        let catalog = Arc::new(
            InMemoryCatalog::new()
                .with_similar_tracks("A", "One", vec![Track::new("B", "Two")])
                .with_similar_tracks("B", "Two", vec![Track::new("A", "One"), Track::new("C", "Three")]),
        );

        let controller = run_session(&catalog, Track::new("A", "One"), &["q", "q"]);

        assert_eq!(
            controller.history(),
            &[Track::new("A", "One"), Track::new("B", "Two"), Track::new("C", "Three")]
        );
        assert_eq!(catalog.scrobbles(), vec![Track::new("A", "One"), Track::new("B", "Two")]);
        assert_eq!(controller.phase(), PlaybackPhase::Terminating);
    }

    #[test]
    fn test_pass_resolves_from_preceding_track() {
        let catalog = Arc::new(InMemoryCatalog::new().with_similar_tracks(
            "A",
            "One",
            vec![Track::new("B", "Two"), Track::new("C", "Three")],
        ));

        let controller = run_session(&catalog, Track::new("A", "One"), &["q", "p"]);

        assert_eq!(
            controller.history(),
            &[Track::new("A", "One"), Track::new("B", "Two"), Track::new("C", "Three")]
        );
        assert_eq!(catalog.scrobbles(), vec![Track::new("A", "One")]);
        assert!(controller.tracker().was_played("b", "two"));
        assert_eq!(controller.tracker().keys().next(), Some("b - two"));
    }

    #[test]
    fn test_abort_skips_artist_and_uses_similar_artists() {
        let catalog = Arc::new(
            InMemoryCatalog::new()
                .with_similar_tracks("Y", "Intro", vec![Track::new("Z", "Banned Song")])
                .with_similar_artists("Y", &["Z", "W"])
                .with_top_tracks("Z", &["Another Z Song"])
                .with_top_tracks("W", &["Fresh"]),
        );

        let controller = run_session(&catalog, Track::new("Y", "Intro"), &["q", "n"]);

        assert_eq!(controller.history().last(), Some(&Track::new("W", "Fresh")));
        assert!(controller.tracker().is_aborted("z"));
        assert!(controller.tracker().was_played("Z", "Banned Song"));
        assert_eq!(catalog.scrobbles(), vec![Track::new("Y", "Intro")]);
        assert_eq!(catalog.count(|call| *call == CatalogCall::TopTracks("Z".into())), 0);
    }

    #[test]
    fn test_quit_and_search_scrobbles_then_searches() {
        let catalog = Arc::new(InMemoryCatalog::new().with_search_pages(vec![vec![
            Track::new("Found", "First"),
            Track::new("Found", "Second"),
        ]]));

        let controller = run_session(
            &catalog,
            Track::new("A", "One"),
            &["qs", "found", "2"],
        );

        assert_eq!(controller.history().last(), Some(&Track::new("Found", "Second")));
        assert_eq!(catalog.scrobbles(), vec![Track::new("A", "One")]);
        assert_eq!(catalog.count(|call| matches!(call, CatalogCall::SimilarTracks(_))), 0);
    }

    #[test]
    fn test_pass_and_search_with_manual_entry() {
        let catalog = Arc::new(InMemoryCatalog::new());

        let controller = run_session(
            &catalog,
            Track::new("A", "One"),
            &["ps", "obscure", "Hand", "Typed", "Home Tape"],
        );

        assert_eq!(
            controller.history().last(),
            Some(&Track::new("Hand", "Typed").with_album("Home Tape"))
        );
        assert!(catalog.scrobbles().is_empty());
        assert_eq!(
            catalog.count(|call| *call == CatalogCall::UserTrackStats(Track::new("Hand", "Typed"))),
            0
        );
    }

    #[test]
    fn test_failed_scrobble_does_not_block() {
        let catalog = Arc::new(
            InMemoryCatalog::new()
                .with_similar_tracks("A", "One", vec![Track::new("B", "Two")])
                .failing(CatalogMethod::Scrobble)
                .failing(CatalogMethod::NowPlaying),
        );

        let controller = run_session(&catalog, Track::new("A", "One"), &["q"]);

        assert_eq!(controller.history().len(), 2);
        assert_eq!(catalog.scrobbles(), vec![Track::new("A", "One")]);
    }

    #[test]
    fn test_transpose_keeps_track_playing() {
        let catalog = Arc::new(
            InMemoryCatalog::new().with_similar_tracks("A", "One", vec![Track::new("B", "Two")]),
        );
        let lyrics = InMemoryLyrics::new().with_sheet("A", "One", "Am C\nla la");
        let mut controller = create_test_session(&catalog, Arc::new(lyrics));

        controller
            .run(
                NextUp::from(Track::new("A", "One")),
                ChannelInput::from_lines(["m 2", "m x", "q"]),
            )
            .expect("session");

        assert_eq!(controller.history().len(), 2);
        assert_eq!(catalog.scrobbles().len(), 1);
    }

    #[test]
    fn test_transpose_rewrites_shown_sheet() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let lyrics = InMemoryLyrics::new().with_sheet("A", "One", "Am C\nla la");
        let mut controller = create_test_session(&catalog, Arc::new(lyrics));

        controller
            .run(
                NextUp::from(Track::new("A", "One")),
                ChannelInput::from_lines(["m 2", "m x", "x"]),
            )
            .expect("session");

        assert_eq!(controller.sheet(), Some("Hm D\nla la"));
        assert!(catalog.scrobbles().is_empty());
    }

    #[test]
    fn test_extreme_transpose_does_not_panic() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let lyrics = InMemoryLyrics::new().with_sheet("A", "One", "G# A");
        let mut controller = create_test_session(&catalog, Arc::new(lyrics));

        controller
            .run(
                NextUp::from(Track::new("A", "One")),
                ChannelInput::from_lines(["m 2147483647", "x"]),
            )
            .expect("session");

        assert_eq!(controller.sheet(), Some("D# E"));
    }

    #[test]
    fn test_empty_loved_tracks_ends_session() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let mut controller = create_test_session(&catalog, Arc::new(InMemoryLyrics::new()));

        let err = controller
            .run(
                NextUp::from(Track::new("Lonely", "Song")),
                ChannelInput::from_lines(["q"]),
            )
            .expect_err("no fallback left");

        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::EmptyLovedTracks { .. })
        ));
        assert_eq!(catalog.scrobbles(), vec![Track::new("Lonely", "Song")]);
    }

    #[test]
    fn test_bootstrap_from_search() {
        let catalog = Arc::new(
            InMemoryCatalog::new().with_search_pages(vec![vec![Track::new("Start", "Here")]]),
        );
        let mut controller = create_test_session(&catalog, Arc::new(InMemoryLyrics::new()));
        let input = ChannelInput::from_lines(["1"]);

        let first = controller
            .bootstrap(Some("start here"), &input)
            .expect("bootstrap");
        assert_eq!(first, Some(NextUp::from(Track::new("Start", "Here"))));
        assert!(controller.tracker().is_empty());
    }

    #[test]
    fn test_external_exit_request_stops_session() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let mut controller = create_test_session(&catalog, Arc::new(InMemoryLyrics::new()));
        controller.shared_state().request_exit();

        let (_tx, rx) = std::sync::mpsc::channel::<String>();
        controller
            .run(NextUp::from(Track::new("A", "One")), ChannelInput::new(rx))
            .expect("session");

        assert_eq!(controller.phase(), PlaybackPhase::Terminating);
        assert!(catalog.scrobbles().is_empty());
    }
}
