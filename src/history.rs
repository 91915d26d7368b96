use serde::Serialize;

use crate::citation::display_label;
use crate::markup;
use crate::models::{CitationAction, HistoryRow, RawAnswer, ViewContext};
use crate::render::AnswerRenderer;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryCitation {
    pub ordinal: usize,
    pub label: String,
    pub action: Option<CitationAction>,
}

impl HistoryCitation {
    /// Target of a navigating action, empty when the citation opens in place.
    pub fn href(&self) -> &str {
        match &self.action {
            Some(CitationAction::OpenPdf { url }) | Some(CitationAction::OpenViewer { url }) => url,
            _ => "",
        }
    }

    pub fn modal_html(&self) -> &str {
        match &self.action {
            Some(CitationAction::ShowContent { html, .. }) => html,
            _ => "",
        }
    }
}

/// One row of the audit table, ready for display. Rows with an empty prompt
/// or answer are kept and shown with empty cells.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub system_message_html: String,
    pub user_prompt: String,
    pub assistant_html: String,
    pub citations: Vec<HistoryCitation>,
}

pub fn build_history(rows: &[HistoryRow], renderer: &AnswerRenderer) -> Vec<HistoryEntry> {
    rows.iter().map(|row| history_entry(row, renderer)).collect()
}

fn history_entry(row: &HistoryRow, renderer: &AnswerRenderer) -> HistoryEntry {
    let raw = RawAnswer {
        text: row.assistant_answer.clone(),
        citations: row.citations.clone(),
        ..RawAnswer::default()
    };
    let (assistant_html, cited) = renderer.answer_html(&raw);
    let resolver = renderer.resolver_for(None);

    let citations = cited
        .iter()
        .enumerate()
        .map(|(index, citation)| HistoryCitation {
            ordinal: index + 1,
            label: display_label(citation, index + 1, renderer.truncation_limit()),
            action: resolver.resolve(citation, ViewContext::History).ok(),
        })
        .collect();

    HistoryEntry {
        timestamp: row.timestamp.clone(),
        system_message_html: row
            .system_message
            .as_deref()
            .map(|message| markup::to_html(message, renderer.sanitizes()))
            .unwrap_or_default(),
        user_prompt: row.user_prompt.clone(),
        assistant_html,
        citations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::RawCitation;

    fn renderer() -> AnswerRenderer {
        let mut config = AppConfig::default();
        config.render.sanitize_answer = true;
        AnswerRenderer::new(&config)
    }

    fn row(prompt: &str, answer: &str) -> HistoryRow {
        HistoryRow {
            timestamp: "2024-05-02T10:00:00Z".to_string(),
            system_message: Some("You are *helpful*.".to_string()),
            user_prompt: prompt.to_string(),
            assistant_answer: answer.to_string(),
            citations: vec![RawCitation {
                id: "1".to_string(),
                title: Some("Policy".to_string()),
                content: "Chunk **text**".to_string(),
                ..RawCitation::default()
            }],
        }
    }

    #[test]
    fn incomplete_rows_are_kept() {
        let rows = vec![row("q", "a [doc1]"), row("", "orphan answer"), row("q2", "")];
        let entries = build_history(&rows, &renderer());

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].user_prompt, "");
        assert_eq!(entries[2].assistant_html, "");
        assert!(entries[2].citations.is_empty());
    }

    #[test]
    fn history_citations_open_as_modals() {
        let entries = build_history(&[row("q", "Answer [doc1]")], &renderer());
        let entry = &entries[0];

        assert!(entry.system_message_html.contains("<em>helpful</em>"));
        assert!(entry.assistant_html.contains("Answer <sup>1</sup>"));
        assert_eq!(entry.citations.len(), 1);
        assert_eq!(entry.citations[0].label, "Policy");
        match &entry.citations[0].action {
            Some(CitationAction::ShowContent { html, .. }) => {
                assert!(html.contains("<strong>text</strong>"))
            }
            other => panic!("expected modal content, got {other:?}"),
        }
        assert_eq!(entry.citations[0].href(), "");
        assert!(entry.citations[0].modal_html().contains("Chunk"));
    }
}
