//! English sentence splitting.
//!
//! A sentence ends at a run of `.`, `!` or `?` (plus any closing quotes or
//! brackets) followed by whitespace or the end of the text. A lone period after
//! a known abbreviation or a single-letter initial does not end a sentence.
//! Blank lines always do.

use std::sync::LazyLock;

use regex::Regex;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t\r]*\n").expect("paragraph pattern is valid"));

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w']+").expect("word pattern is valid"));

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "ft", "vs", "etc", "e.g", "i.e",
    "a.m", "p.m", "u.s", "u.k", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept",
    "oct", "nov", "dec", "no", "vol", "approx", "dept", "est", "inc", "ltd", "co", "gen", "col",
    "capt", "lt", "sgt", "rev", "hon",
];

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

/// True when the period ending `preceding` belongs to an abbreviation or initial.
fn ends_with_abbreviation(preceding: &str) -> bool {
    let Some(word) = preceding.split_whitespace().last() else {
        return false;
    };
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    let mut chars = word.chars();
    if let (Some(only), None) = (chars.next(), chars.next()) {
        return only.is_alphabetic();
    }
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/// Splits `text` into trimmed, non-empty sentences borrowed from the input.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    for paragraph in PARAGRAPH_BREAK.split(text) {
        split_paragraph(paragraph, &mut sentences);
    }
    sentences
}

fn split_paragraph<'a>(paragraph: &'a str, out: &mut Vec<&'a str>) {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        if !is_terminal(chars[i].1) {
            i += 1;
            continue;
        }

        let run_start = i;
        while i < chars.len() && is_terminal(chars[i].1) {
            i += 1;
        }
        let terminal_run = i - run_start;
        while i < chars.len() && is_closing(chars[i].1) {
            i += 1;
        }

        let at_boundary = chars.get(i).map_or(true, |(_, c)| c.is_whitespace());
        if !at_boundary {
            continue;
        }
        let lone_period = terminal_run == 1 && chars[run_start].1 == '.';
        if lone_period && ends_with_abbreviation(&paragraph[start..chars[run_start].0]) {
            continue;
        }

        let end = chars.get(i).map_or(paragraph.len(), |(offset, _)| *offset);
        push_trimmed(&paragraph[start..end], out);
        start = end;
    }

    push_trimmed(&paragraph[start..], out);
}

fn push_trimmed<'a>(candidate: &'a str, out: &mut Vec<&'a str>) {
    let sentence = candidate.trim();
    if !sentence.is_empty() {
        out.push(sentence);
    }
}

/// Lowercased words of a sentence; tokens without a letter are dropped.
pub fn sentence_words(sentence: &str) -> Vec<String> {
    WORD.find_iter(sentence)
        .map(|m| m.as_str().trim_matches('\''))
        .filter(|w| w.chars().any(char::is_alphabetic))
        .map(str::to_lowercase)
        .collect()
}
