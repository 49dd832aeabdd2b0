//! Splitting a quote into plain and highlighted runs.
//!
//! Every occurrence of every term is found case-insensitively, including
//! occurrences that overlap each other ("aa" in "aaa"). Overlapping ranges are
//! merged before splitting, so the runs always concatenate back to the
//! original quote.

use std::ops::Range;

use log::debug;
use regex::{Regex, RegexBuilder};

/// A run of quote text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub highlighted: bool,
}

/// Byte ranges of `text` to highlight, sorted and non-overlapping.
///
/// Ranges that merely touch stay separate, so two adjacent terms are still
/// wrapped independently.
pub fn match_ranges(text: &str, terms: &[String]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();

    for term in terms {
        if term.trim().is_empty() {
            continue;
        }
        let Some(re) = term_regex(term) else {
            continue;
        };

        let mut start = 0;
        while start <= text.len() {
            let Some(m) = re.find_at(text, start) else {
                break;
            };
            if m.start() == m.end() {
                break;
            }
            ranges.push(m.range());
            // Step one character past the match start so self-overlapping
            // occurrences are found too.
            let step = text[m.start()..].chars().next().map_or(1, char::len_utf8);
            start = m.start() + step;
        }
    }

    ranges.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match merged.last_mut() {
            Some(last) if r.start < last.end => last.end = last.end.max(r.end),
            _ => merged.push(r),
        }
    }
    merged
}

/// Split `text` into segments, highlighting every match of `terms`.
pub fn segments<'a>(text: &'a str, terms: &[String]) -> Vec<Segment<'a>> {
    let mut out = Vec::new();
    let mut pos = 0;
    for r in match_ranges(text, terms) {
        if r.start > pos {
            out.push(Segment {
                text: &text[pos..r.start],
                highlighted: false,
            });
        }
        out.push(Segment {
            text: &text[r.clone()],
            highlighted: true,
        });
        pos = r.end;
    }
    if pos < text.len() {
        out.push(Segment {
            text: &text[pos..],
            highlighted: false,
        });
    }
    out
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn term_regex(term: &str) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            debug!("skipping highlight term {term:?}: {e}");
            None
        }
    }
}
