//! Chord sheets: retrieval seam and transposition.
//!
//! Sheets are plain text where chord lines sit above lyric lines. A line is a
//! chord line when every whitespace-separated token on it parses as a chord;
//! only those lines are rewritten by [`transpose_sheet`].
//!
//! Roots use the twelve-step scale `A B H C C# D D# E F F# G G#`, where `B` is
//! the flattened `H` as in German and Russian chord books.

use log::debug;

/// Best-effort chord-sheet lookup. Absence is never an error.
pub trait LyricsService: Send + Sync {
    fn fetch(&self, artist: &str, title: &str) -> Option<String>;
}

/// Lyrics source that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLyrics;

impl LyricsService for NoLyrics {
    fn fetch(&self, _artist: &str, _title: &str) -> Option<String> {
        None
    }
}

const SCALE: [&str; 12] = ["A", "B", "H", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#"];

/// Chord qualities accepted after the root, longest first so `maj` wins over `m`.
const QUALITIES: [&str; 9] = ["maj", "min", "dim", "aug", "sus", "add", "m", "+", "-"];

/// Shift every chord line of `sheet` by `semitones` (may be negative).
#[must_use]
pub fn transpose_sheet(sheet: &str, semitones: i32) -> String {
    sheet
        .lines()
        .map(|line| {
            if is_chord_line(line) {
                transpose_line(line, semitones)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Transpose one chord such as `C#m7`, `Hsus4` or `Am/G`.
#[must_use]
pub fn transpose_chord(chord: &str, semitones: i32) -> Option<String> {
    let (main, bass) = match chord.split_once('/') {
        Some((main, bass)) => (main, Some(bass)),
        None => (chord, None),
    };

    let (root, suffix) = split_root(main)?;
    if !is_quality(suffix) {
        return None;
    }
    let mut out = format!("{}{suffix}", shift(root, semitones));

    if let Some(bass) = bass {
        let (bass_root, rest) = split_root(bass)?;
        if !rest.is_empty() {
            return None;
        }
        out.push('/');
        out.push_str(shift(bass_root, semitones));
    }
    Some(out)
}

fn is_chord_line(line: &str) -> bool {
    let mut tokens = line.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|token| transpose_chord(token, 0).is_some())
}

fn transpose_line(line: &str, semitones: i32) -> String {
    let mut out = String::with_capacity(line.len());
    let mut token = String::new();
    for ch in line.chars() {
        if ch.is_whitespace() {
            flush_token(&mut out, &mut token, semitones);
            out.push(ch);
        } else {
            token.push(ch);
        }
    }
    flush_token(&mut out, &mut token, semitones);
    out
}

fn flush_token(out: &mut String, token: &mut String, semitones: i32) {
    if token.is_empty() {
        return;
    }
    match transpose_chord(token, semitones) {
        Some(shifted) => out.push_str(&shifted),
        None => {
            debug!("Leaving token '{token}' untouched");
            out.push_str(token);
        }
    }
    token.clear();
}

/// Split a chord into its scale index and the remaining suffix.
fn split_root(chord: &str) -> Option<(usize, &str)> {
    let first = chord.chars().next()?;
    if !matches!(first, 'A' | 'B' | 'H' | 'C' | 'D' | 'E' | 'F' | 'G') {
        return None;
    }
    let root_len = if chord[1..].starts_with('#') { 2 } else { 1 };
    let root = &chord[..root_len];
    let index = SCALE.iter().position(|note| *note == root)?;
    Some((index, &chord[root_len..]))
}

fn is_quality(mut suffix: &str) -> bool {
    while !suffix.is_empty() {
        if let Some(rest) = QUALITIES.iter().find_map(|q| suffix.strip_prefix(q)) {
            suffix = rest;
            continue;
        }
        let digits = suffix.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 {
            suffix = &suffix[digits..];
            continue;
        }
        if let Some(rest) = suffix.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            return is_quality(rest);
        }
        return false;
    }
    true
}

fn shift(index: usize, semitones: i32) -> &'static str {
    let len = SCALE.len() as i32;
    let shifted = (index as i32 + semitones.rem_euclid(len)).rem_euclid(len);
    SCALE[shifted as usize]
}
