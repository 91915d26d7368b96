use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::{ParsedAnswer, RawAnswer, RawCitation};

pub const DEFAULT_FOLLOWUP_DELIMITER: &str = "Anschlussfragen:";

/// `[doc7]` style reference emitted by the answer backend. The number is the
/// one-based position of the citation in the answer's citation list.
static CITATION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[doc(\d{1,3})\]").expect("citation marker pattern"));

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub followup_delimiter: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            followup_delimiter: DEFAULT_FOLLOWUP_DELIMITER.to_string(),
        }
    }
}

pub fn parse(raw: &RawAnswer) -> ParsedAnswer {
    parse_with(raw, &ParseOptions::default())
}

/// Rewrites `[docN]` markers into `[ordinal]` footnotes, keeping only the
/// citations the main answer actually references, in first-reference order.
pub fn parse_with(raw: &RawAnswer, options: &ParseOptions) -> ParsedAnswer {
    let rewrite = rewrite_markers(raw, options, |ordinal| format!("[{ordinal}]"));

    ParsedAnswer {
        markdown_format_text: rewrite.text,
        citations: rewrite.citations,
        generated_chart: raw.generated_chart.clone(),
    }
}

/// Result of one pass over the main answer's `[docN]` markers.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerRewrite {
    pub text: String,
    /// Referenced citations, indexed by ordinal - 1.
    pub citations: Vec<RawCitation>,
    /// Ordinal of every rewritten marker, in reading order.
    pub ordinals: Vec<usize>,
}

/// Replace each resolvable `[docN]` marker with `render(ordinal)`. Only the
/// markers themselves are touched; bracketed numbers already in the text
/// (`items[1]`, code) stay as written.
pub fn rewrite_markers<F>(raw: &RawAnswer, options: &ParseOptions, mut render: F) -> MarkerRewrite
where
    F: FnMut(usize) -> String,
{
    let main = main_answer(&raw.text, &options.followup_delimiter);

    let mut assigned: HashMap<usize, usize> = HashMap::new();
    let mut citations: Vec<RawCitation> = Vec::new();
    let mut ordinals: Vec<usize> = Vec::new();

    let text = CITATION_MARKER
        .replace_all(main, |caps: &Captures| {
            let marker = &caps[0];
            let Some(key) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
                return marker.to_string();
            };

            let ordinal = match assigned.get(&key) {
                Some(ordinal) => *ordinal,
                None => {
                    let Some(source) =
                        key.checked_sub(1).and_then(|index| raw.citations.get(index))
                    else {
                        tracing::debug!(
                            marker,
                            available = raw.citations.len(),
                            "citation marker does not resolve; leaving it as text"
                        );
                        return marker.to_string();
                    };

                    let ordinal = citations.len() + 1;
                    let mut citation = source.clone();
                    citation.reindex_id = Some(ordinal.to_string());
                    citations.push(citation);
                    assigned.insert(key, ordinal);
                    ordinal
                }
            };

            ordinals.push(ordinal);
            render(ordinal)
        })
        .into_owned();

    enumerate_parts(&mut citations);

    MarkerRewrite {
        text,
        citations,
        ordinals,
    }
}

/// Ordinals of the references in the main answer, in reading order.
pub fn reference_ordinals(raw: &RawAnswer, options: &ParseOptions) -> Vec<usize> {
    rewrite_markers(raw, options, |ordinal| format!("[{ordinal}]")).ordinals
}

/// Text before the follow-up heading, or the whole text when there is none.
pub fn main_answer<'a>(text: &'a str, delimiter: &str) -> &'a str {
    if delimiter.is_empty() {
        return text;
    }
    match text.split_once(delimiter) {
        Some((head, _)) => head.trim_end(),
        None => text,
    }
}

/// Suggested follow-up questions listed after the follow-up heading.
pub fn followups(text: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        return vec![];
    }
    let Some(zone) = text.split(delimiter).nth(1) else {
        return vec![];
    };

    zone.split("- ")
        .map(|question| CITATION_MARKER.replace_all(question, ""))
        .map(|question| question.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|question| !question.is_empty())
        .collect()
}

// Several chunks of the same file are numbered as parts 1, 2, ... unless the
// backend already told us which part they are.
fn enumerate_parts(citations: &mut [RawCitation]) {
    let mut seen: HashMap<String, i64> = HashMap::new();
    for citation in citations.iter_mut() {
        let Some(filepath) = citation.filepath.as_deref() else {
            continue;
        };
        let part = seen
            .entry(filepath.to_string())
            .and_modify(|count| *count += 1)
            .or_insert(1);
        if citation.part_index.is_none() {
            citation.part_index = Some(*part);
        }
    }
}
