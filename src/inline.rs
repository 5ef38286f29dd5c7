//! Inline emphasis within a single Markdown line.
//!
//! Four patterns are recognised: `**bold**`, `*italic*`, `~~strikethrough~~`
//! and `` `code` ``. Matches from every pattern are sorted by start and reduced
//! greedily: a match is kept only if it starts at or after the end of the last
//! kept one. Nested markup therefore degrades to the outer match, e.g.
//! `**bold *and* italic**` is one bold segment with literal asterisks inside.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::{InlineStyle, Segment};

static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("invalid bold regex"));
static STRIKETHROUGH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"~~(.+?)~~").expect("invalid strikethrough regex"));
static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.+?)`").expect("invalid code regex"));

#[derive(Debug)]
struct Match {
    start: usize,
    end: usize,
    inner: String,
    style: InlineStyle,
}

/// Split `text` into plain and styled segments.
pub fn parse_inline(text: &str) -> Vec<Segment> {
    let mut matches = Vec::new();
    collect_regex(&BOLD, InlineStyle::Bold, text, &mut matches);
    collect_italic(text, &mut matches);
    collect_regex(&STRIKETHROUGH, InlineStyle::Strikethrough, text, &mut matches);
    collect_regex(&CODE, InlineStyle::Code, text, &mut matches);
    // Stable: on equal starts the pattern order above decides.
    matches.sort_by_key(|m| m.start);

    let mut segments = Vec::new();
    let mut last_end = 0;
    for m in matches {
        if m.start < last_end {
            continue;
        }
        if m.start > last_end {
            segments.push(Segment::plain(&text[last_end..m.start]));
        }
        segments.push(Segment::styled(m.inner, m.style));
        last_end = m.end;
    }

    if segments.is_empty() {
        return vec![Segment::plain(text)];
    }
    if last_end < text.len() {
        segments.push(Segment::plain(&text[last_end..]));
    }
    segments
}

fn collect_regex(regex: &Regex, style: InlineStyle, text: &str, out: &mut Vec<Match>) {
    for caps in regex.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push(Match {
            start: whole.start(),
            end: whole.end(),
            inner: inner.as_str().to_string(),
            style,
        });
    }
}

/// Single-asterisk emphasis whose delimiters are not part of a `**` pair:
/// neither the opening nor the closing `*` may touch another `*`.
fn collect_italic(text: &str, out: &mut Vec<Match>) {
    let bytes = text.as_bytes();
    let is_star = |i: usize| bytes.get(i) == Some(&b'*');

    let mut i = 0;
    while i < bytes.len() {
        let opens = is_star(i)
            && !(i > 0 && is_star(i - 1))
            && i + 1 < bytes.len()
            && !is_star(i + 1);
        if !opens {
            i += 1;
            continue;
        }
        // Shortest content of at least one character.
        let close =
            (i + 2..bytes.len()).find(|&j| is_star(j) && !is_star(j - 1) && !is_star(j + 1));
        match close {
            Some(j) => {
                out.push(Match {
                    start: i,
                    end: j + 1,
                    inner: text[i + 1..j].to_string(),
                    style: InlineStyle::Italic,
                });
                i = j + 1;
            }
            None => i += 1,
        }
    }
}
