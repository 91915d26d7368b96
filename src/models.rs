use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An answer exactly as the question-answering endpoint returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawAnswer {
    #[serde(rename = "answer")]
    pub text: String,
    #[serde(default)]
    pub citations: Vec<RawCitation>,
    #[serde(default)]
    pub generated_chart: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

/// Citation metadata attached to an answer. Which fields are populated
/// depends on how the source document was ingested (PDF vs XML/CMS).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawCitation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub chunk_id: Option<String>,
    #[serde(default)]
    pub part_index: Option<i64>,
    #[serde(default)]
    pub reindex_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAnswer {
    pub markdown_format_text: String,
    pub citations: Vec<RawCitation>,
    #[serde(rename = "generated_chart")]
    pub generated_chart: Option<String>,
}

/// A citation classified once at the ingestion boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceCitation {
    Pdf {
        filepath: String,
        title: Option<String>,
        page: Option<u32>,
    },
    Web {
        document_id: String,
        title: Option<String>,
    },
    Inline {
        title: Option<String>,
        content: String,
    },
}

/// What a click on a citation should do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CitationAction {
    OpenPdf { url: String },
    OpenViewer { url: String },
    ShowContent { title: Option<String>, html: String },
}

impl CitationAction {
    /// Navigation actions open a new browsing context instead of replacing the view.
    pub fn opens_new_context(&self) -> bool {
        matches!(
            self,
            CitationAction::OpenPdf { .. } | CitationAction::OpenViewer { .. }
        )
    }
}

/// Where a citation is being clicked from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewContext {
    #[default]
    Answer,
    History,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CitationEntry {
    pub ordinal: usize,
    pub label: String,
    pub action: Option<CitationAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderedAnswer {
    pub message_id: Option<String>,
    pub html: String,
    pub followups: Vec<String>,
    pub citations: Vec<CitationEntry>,
    pub chart_data_uri: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackToken {
    Neutral,
    Positive,
    Negative,
    MissingCitation,
    WrongCitation,
    OutOfScope,
    InaccurateOrIrrelevant,
    OtherUnhelpful,
    HateSpeech,
    Violent,
    Sexual,
    Manipulative,
    OtherHarmful,
}

impl FeedbackToken {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackToken::Neutral => "neutral",
            FeedbackToken::Positive => "positive",
            FeedbackToken::Negative => "negative",
            FeedbackToken::MissingCitation => "missing_citation",
            FeedbackToken::WrongCitation => "wrong_citation",
            FeedbackToken::OutOfScope => "out_of_scope",
            FeedbackToken::InaccurateOrIrrelevant => "inaccurate_or_irrelevant",
            FeedbackToken::OtherUnhelpful => "other_unhelpful",
            FeedbackToken::HateSpeech => "hate_speech",
            FeedbackToken::Violent => "violent",
            FeedbackToken::Sexual => "sexual",
            FeedbackToken::Manipulative => "manipulative",
            FeedbackToken::OtherHarmful => "other_harmful",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        let token = match value.trim() {
            "neutral" => FeedbackToken::Neutral,
            "positive" => FeedbackToken::Positive,
            "negative" => FeedbackToken::Negative,
            "missing_citation" => FeedbackToken::MissingCitation,
            "wrong_citation" => FeedbackToken::WrongCitation,
            "out_of_scope" => FeedbackToken::OutOfScope,
            "inaccurate_or_irrelevant" => FeedbackToken::InaccurateOrIrrelevant,
            "other_unhelpful" => FeedbackToken::OtherUnhelpful,
            "hate_speech" => FeedbackToken::HateSpeech,
            "violent" => FeedbackToken::Violent,
            "sexual" => FeedbackToken::Sexual,
            "manipulative" => FeedbackToken::Manipulative,
            "other_harmful" => FeedbackToken::OtherHarmful,
            _ => return None,
        };
        Some(token)
    }

    /// Reasons that may be selected in the negative-feedback dialog.
    pub fn is_reason(self) -> bool {
        !matches!(
            self,
            FeedbackToken::Neutral | FeedbackToken::Positive | FeedbackToken::Negative
        )
    }

    /// Reasons only offered on the "report inappropriate content" panel.
    pub fn is_harmful(self) -> bool {
        matches!(
            self,
            FeedbackToken::HateSpeech
                | FeedbackToken::Violent
                | FeedbackToken::Sexual
                | FeedbackToken::Manipulative
                | FeedbackToken::OtherHarmful
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRow {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub system_message: Option<String>,
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default)]
    pub assistant_answer: String,
    #[serde(default)]
    pub citations: Vec<RawCitation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrontendSettings {
    #[serde(default)]
    pub auth_enabled: bool,
    #[serde(default)]
    pub feedback_enabled: bool,
    #[serde(default)]
    pub sanitize_answer: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Pdf,
    Xml,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatus {
    pub job_id: String,
    pub status: JobState,
    pub file_type: UploadKind,
    pub filenames: Vec<String>,
    pub progress: u64,
    pub total: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJobRequest {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default = "default_job_state")]
    pub status: JobState,
    pub file_type: UploadKind,
    #[serde(default)]
    pub filenames: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobUpdate {
    #[serde(default)]
    pub status: Option<JobState>,
    #[serde(default)]
    pub filenames: Option<Vec<String>>,
    #[serde(default)]
    pub progress: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
}

fn default_job_state() -> JobState {
    JobState::Queued
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_answer_reads_backend_field_names() {
        let raw: RawAnswer = serde_json::from_str(
            r#"{
                "answer": "See [doc1].",
                "citations": [{"id": "c1", "content": "body", "filepath": "a.pdf", "title": "Page 2"}],
                "generated_chart": null,
                "message_id": "m-1"
            }"#,
        )
        .expect("valid answer json");

        assert_eq!(raw.text, "See [doc1].");
        assert_eq!(raw.citations.len(), 1);
        assert_eq!(raw.citations[0].filepath.as_deref(), Some("a.pdf"));
        assert_eq!(raw.message_id.as_deref(), Some("m-1"));
        assert!(raw.feedback.is_none());
    }

    #[test]
    fn feedback_tokens_round_trip_through_wire_names() {
        for token in [
            FeedbackToken::Neutral,
            FeedbackToken::InaccurateOrIrrelevant,
            FeedbackToken::OtherHarmful,
        ] {
            assert_eq!(FeedbackToken::from_wire(token.as_str()), Some(token));
        }
        assert_eq!(FeedbackToken::from_wire("thumbs_sideways"), None);
    }

    #[test]
    fn citation_action_is_tagged() {
        let action = CitationAction::OpenViewer {
            url: "https://viewer/doc/content".to_string(),
        };
        let json = serde_json::to_value(&action).expect("serializable");
        assert_eq!(json["action"], "open_viewer");
        assert!(action.opens_new_context());
    }
}
