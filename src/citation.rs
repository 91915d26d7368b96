use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use thiserror::Error;

use crate::config::ViewerConfig;
use crate::markup;
use crate::models::{CitationAction, RawCitation, SourceCitation, ViewContext};
use crate::organization;

pub const DEFAULT_TRUNCATION_LIMIT: usize = 50;
const TRUNCATED_HEAD_CHARS: usize = 20;
const TRUNCATED_TAIL_CHARS: usize = 20;

static PAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Page (\d+)").expect("page number pattern"));

/// Everything except unreserved characters and `!*'()` is escaped in file names.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("citation has no file path to open")]
    MissingFilepath,
    #[error("no page number in citation title {title:?}")]
    MissingPageNumber { title: String },
}

impl SourceCitation {
    /// Decide once what kind of document a citation points at.
    pub fn classify(citation: &RawCitation) -> Self {
        let title = non_empty(citation.title.as_deref()).map(str::to_string);
        match non_empty(citation.filepath.as_deref()) {
            Some(filepath) if is_pdf_path(filepath) => SourceCitation::Pdf {
                filepath: filepath.to_string(),
                page: title.as_deref().and_then(page_number),
                title,
            },
            Some(filepath) => SourceCitation::Web {
                document_id: filepath.to_string(),
                title,
            },
            None => SourceCitation::Inline {
                title,
                content: citation.content.clone(),
            },
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, SourceCitation::Pdf { .. })
    }
}

pub fn is_pdf_path(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".pdf")
}

/// Page number from titles such as `Page 47` or `see Page 12`.
pub fn page_number(title: &str) -> Option<u32> {
    PAGE_NUMBER
        .captures(title)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Part of the source document a citation belongs to: the explicit part index,
/// otherwise the zero-based chunk id shifted to one-based.
pub fn part_number(citation: &RawCitation) -> Option<i64> {
    citation.part_index.or_else(|| {
        citation
            .chunk_id
            .as_deref()
            .and_then(leading_integer)
            .and_then(|chunk| chunk.checked_add(1))
    })
}

pub fn label_for(citation: &RawCitation, ordinal: usize, truncate: bool) -> String {
    label_with_limit(citation, ordinal, truncate, DEFAULT_TRUNCATION_LIMIT)
}

/// Full citation label. A file path always wins over the title, whatever kind
/// of document the path names.
pub fn label_with_limit(
    citation: &RawCitation,
    ordinal: usize,
    truncate: bool,
    limit: usize,
) -> String {
    let title = non_empty(citation.title.as_deref());

    if let Some(filepath) = non_empty(citation.filepath.as_deref()) {
        let name = if truncate {
            shorten(filepath, limit)
        } else {
            filepath.to_string()
        };
        return match title {
            Some(title) => format!("{name} - {title}"),
            None => name,
        };
    }

    if let Some(title) = title {
        let part = part_number(citation);
        if truncate && title.chars().count() > limit {
            let short = head_tail(title);
            return match part {
                Some(part) => format!("{short} - Part {part}"),
                None => short,
            };
        }
        return match part {
            Some(1) | None => title.to_string(),
            Some(part) => format!("{title} - Part {part}"),
        };
    }

    fallback_label(ordinal)
}

/// Label shown in the reference panel under an answer.
pub fn display_label(citation: &RawCitation, ordinal: usize, limit: usize) -> String {
    match SourceCitation::classify(citation) {
        SourceCitation::Pdf { .. } => label_with_limit(citation, ordinal, true, limit),
        SourceCitation::Web { title, .. } | SourceCitation::Inline { title, .. } => {
            title.unwrap_or_else(|| fallback_label(ordinal))
        }
    }
}

pub fn fallback_label(ordinal: usize) -> String {
    format!("Citation {ordinal}")
}

#[derive(Clone, Debug)]
pub struct CitationResolver {
    pdf_endpoint: String,
    viewer_base_url: String,
    organization: Option<String>,
    sanitize: bool,
}

impl CitationResolver {
    pub fn new(viewer: &ViewerConfig, sanitize: bool) -> Self {
        Self {
            pdf_endpoint: viewer.pdf_endpoint.clone(),
            viewer_base_url: viewer.document_viewer_base_url.clone(),
            organization: None,
            sanitize,
        }
    }

    pub fn with_organization(mut self, organization: Option<&str>) -> Self {
        self.organization = organization.and_then(organization::normalize);
        self
    }

    /// Work out what a click on `citation` does. Failures are logged and
    /// returned; the caller simply does not navigate.
    pub fn resolve(
        &self,
        citation: &RawCitation,
        context: ViewContext,
    ) -> Result<CitationAction, ResolveError> {
        let outcome = self.resolve_source(&SourceCitation::classify(citation), context);
        if let Err(err) = &outcome {
            tracing::warn!(citation_id = %citation.id, error = %err, "citation click not resolved");
        }
        outcome
    }

    pub fn resolve_source(
        &self,
        source: &SourceCitation,
        context: ViewContext,
    ) -> Result<CitationAction, ResolveError> {
        match source {
            SourceCitation::Pdf {
                filepath,
                title,
                page,
            } => {
                let page = page.ok_or_else(|| ResolveError::MissingPageNumber {
                    title: title.clone().unwrap_or_default(),
                })?;
                Ok(CitationAction::OpenPdf {
                    url: self.pdf_url(filepath, page),
                })
            }
            SourceCitation::Web { document_id, .. } => Ok(CitationAction::OpenViewer {
                url: self.viewer_url(document_id),
            }),
            SourceCitation::Inline { title, content } => match context {
                ViewContext::History => Ok(CitationAction::ShowContent {
                    title: title.clone(),
                    html: markup::to_html(content, self.sanitize),
                }),
                ViewContext::Answer => Err(ResolveError::MissingFilepath),
            },
        }
    }

    pub fn pdf_url(&self, filepath: &str, page: u32) -> String {
        let namespace = self
            .organization
            .as_deref()
            .map(|org| format!("{org}/"))
            .unwrap_or_default();
        format!(
            "{}?file_name={}{}#page={}",
            self.pdf_endpoint,
            namespace,
            utf8_percent_encode(filepath, URI_COMPONENT),
            page
        )
    }

    pub fn viewer_url(&self, document_id: &str) -> String {
        format!("{}{}/content", self.viewer_base_url, document_id)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn shorten(value: &str, limit: usize) -> String {
    if value.chars().count() > limit {
        head_tail(value)
    } else {
        value.to_string()
    }
}

fn head_tail(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let head: String = chars.iter().take(TRUNCATED_HEAD_CHARS).collect();
    let tail: String = chars[chars.len().saturating_sub(TRUNCATED_TAIL_CHARS)..]
        .iter()
        .collect();
    format!("{head}...{tail}")
}

// Leading digits count, the rest is ignored (`"3_a"` is 3).
fn leading_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().map(|n| sign * n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn pdf(filepath: &str, title: &str) -> RawCitation {
        RawCitation {
            id: "c".to_string(),
            filepath: Some(filepath.to_string()),
            title: Some(title.to_string()),
            ..RawCitation::default()
        }
    }

    fn titled(title: &str, part_index: Option<i64>) -> RawCitation {
        RawCitation {
            id: "t".to_string(),
            title: Some(title.to_string()),
            part_index,
            ..RawCitation::default()
        }
    }

    fn resolver() -> CitationResolver {
        CitationResolver::new(&AppConfig::default().viewer, true)
    }

    #[test]
    fn filepath_label_without_truncation() {
        let citation = pdf("reports/Q1 Report.pdf", "Page 47");
        assert_eq!(
            label_for(&citation, 1, false),
            "reports/Q1 Report.pdf - Page 47"
        );
    }

    #[test]
    fn long_filepath_is_truncated_head_and_tail() {
        let filepath = format!("{}.pdf", "a".repeat(60));
        let citation = pdf(&filepath, "Page 3");
        let expected = format!(
            "{}...{} - Page 3",
            &filepath[..20],
            &filepath[filepath.len() - 20..]
        );
        assert_eq!(label_for(&citation, 1, true), expected);
        assert_eq!(label_for(&citation, 1, false), format!("{filepath} - Page 3"));
    }

    #[test]
    fn first_part_is_not_suffixed() {
        assert_eq!(
            label_for(&titled("Employee Handbook", Some(1)), 1, false),
            "Employee Handbook"
        );
        assert_eq!(
            label_for(&titled("Employee Handbook", Some(2)), 1, false),
            "Employee Handbook - Part 2"
        );
    }

    #[test]
    fn chunk_id_stands_in_for_part_index() {
        let mut citation = titled("Handbook", None);
        citation.chunk_id = Some("2".to_string());
        assert_eq!(part_number(&citation), Some(3));
        assert_eq!(label_for(&citation, 1, false), "Handbook - Part 3");

        citation.chunk_id = Some("0_abc".to_string());
        assert_eq!(label_for(&citation, 1, false), "Handbook");
    }

    #[test]
    fn oversized_chunk_id_has_no_part() {
        let mut citation = titled("Handbook", None);
        citation.chunk_id = Some(i64::MAX.to_string());
        assert_eq!(part_number(&citation), None);
        assert_eq!(label_for(&citation, 1, false), "Handbook");

        citation.chunk_id = Some("99999999999999999999".to_string());
        assert_eq!(part_number(&citation), None);
    }

    #[test]
    fn long_title_is_truncated_with_part() {
        let title = "T".repeat(30) + &"x".repeat(30);
        let citation = titled(&title, Some(1));
        let label = label_for(&citation, 1, true);
        assert_eq!(
            label,
            format!("{}...{} - Part 1", "T".repeat(20), "x".repeat(20))
        );
    }

    #[test]
    fn untitled_citation_falls_back_to_position() {
        let citation = RawCitation::default();
        assert_eq!(label_for(&citation, 4, true), "Citation 4");
        assert_eq!(display_label(&citation, 2, 50), "Citation 2");
    }

    #[test]
    fn filepath_takes_priority_over_title() {
        let mut citation = titled("Employee Handbook", Some(2));
        citation.filepath = Some("docs/handbook".to_string());
        assert_eq!(
            label_for(&citation, 1, false),
            "docs/handbook - Employee Handbook"
        );
        // the reference panel only treats PDFs that way
        assert_eq!(display_label(&citation, 1, 50), "Employee Handbook");
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert!(SourceCitation::classify(&pdf("A/B.PDF", "Page 1")).is_pdf());
        assert!(matches!(
            SourceCitation::classify(&pdf("1234-5678", "Doc")),
            SourceCitation::Web { .. }
        ));
        assert!(matches!(
            SourceCitation::classify(&titled("Doc", None)),
            SourceCitation::Inline { .. }
        ));
    }

    #[test]
    fn pdf_click_opens_page() {
        let action = resolver()
            .resolve(&pdf("x/y.pdf", "see Page 12"), ViewContext::Answer)
            .expect("resolvable");
        let CitationAction::OpenPdf { url } = action else {
            panic!("expected a pdf action");
        };
        assert!(url.ends_with("#page=12"));
        assert_eq!(url, "/get-pdf?file_name=x%2Fy.pdf#page=12");
    }

    #[test]
    fn pdf_without_page_does_not_navigate() {
        let err = resolver()
            .resolve(&pdf("x/y.pdf", "no page info"), ViewContext::Answer)
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingPageNumber {
                title: "no page info".to_string()
            }
        );
    }

    #[test]
    fn organization_prefixes_pdf_requests() {
        let resolver = resolver().with_organization(Some("  Acme.Corp. "));
        assert_eq!(
            resolver.pdf_url("Q1 Report (final).pdf", 3),
            "/get-pdf?file_name=acme.corp/Q1%20Report%20(final).pdf#page=3"
        );
    }

    #[test]
    fn web_documents_open_in_viewer() {
        let action = resolver()
            .resolve(&pdf("4711", "Contract"), ViewContext::Answer)
            .expect("resolvable");
        assert_eq!(
            action,
            CitationAction::OpenViewer {
                url: "https://amsterdam.publishone.nl/document/4711/content".to_string()
            }
        );
    }

    #[test]
    fn inline_content_is_only_shown_in_history() {
        let mut citation = titled("Notes", None);
        citation.content = "**bold**<script>alert(1)</script>".to_string();

        assert_eq!(
            resolver().resolve(&citation, ViewContext::Answer),
            Err(ResolveError::MissingFilepath)
        );

        let action = resolver()
            .resolve(&citation, ViewContext::History)
            .expect("modal");
        let CitationAction::ShowContent { title, html } = action else {
            panic!("expected modal content");
        };
        assert_eq!(title.as_deref(), Some("Notes"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("alert"));
    }
}
