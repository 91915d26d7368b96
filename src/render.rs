use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::citation::{display_label, CitationResolver};
use crate::config::AppConfig;
use crate::markup;
use crate::models::{
    CitationEntry, ParsedAnswer, RawAnswer, RawCitation, RenderedAnswer, ViewContext,
};
use crate::parser::{self, ParseOptions};

/// Turns raw answers into HTML plus per-citation labels and click actions.
#[derive(Clone, Debug)]
pub struct AnswerRenderer {
    parse_options: ParseOptions,
    truncation_limit: usize,
    sanitize: bool,
    resolver: CitationResolver,
}

impl AnswerRenderer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            parse_options: ParseOptions {
                followup_delimiter: config.render.followup_delimiter.clone(),
            },
            truncation_limit: config.render.truncation_limit,
            sanitize: config.render.sanitize_answer,
            resolver: CitationResolver::new(&config.viewer, config.render.sanitize_answer),
        }
    }

    pub fn sanitizes(&self) -> bool {
        self.sanitize
    }

    pub fn truncation_limit(&self) -> usize {
        self.truncation_limit
    }

    pub fn parse(&self, raw: &RawAnswer) -> ParsedAnswer {
        parser::parse_with(raw, &self.parse_options)
    }

    pub fn followups(&self, raw: &RawAnswer) -> Vec<String> {
        parser::followups(&raw.text, &self.parse_options.followup_delimiter)
    }

    /// Resolver scoped to the organization the answer's documents live in.
    pub fn resolver_for(&self, organization: Option<&str>) -> CitationResolver {
        self.resolver.clone().with_organization(organization)
    }

    /// Answer HTML with references as `<sup>n</sup>`, plus the citations
    /// they point at in ordinal order.
    pub fn answer_html(&self, raw: &RawAnswer) -> (String, Vec<RawCitation>) {
        let rewrite = parser::rewrite_markers(raw, &self.parse_options, |ordinal| {
            format!("<sup>{ordinal}</sup>")
        });
        (markup::to_html(&rewrite.text, self.sanitize), rewrite.citations)
    }

    pub fn render(&self, raw: &RawAnswer) -> RenderedAnswer {
        let (html, cited) = self.answer_html(raw);
        let resolver = self.resolver_for(raw.organization.as_deref());

        let citations = cited
            .iter()
            .enumerate()
            .map(|(index, citation)| {
                let ordinal = index + 1;
                CitationEntry {
                    ordinal,
                    label: display_label(citation, ordinal, self.truncation_limit),
                    action: resolver.resolve(citation, ViewContext::Answer).ok(),
                }
            })
            .collect();

        RenderedAnswer {
            message_id: raw.message_id.clone(),
            html,
            followups: self.followups(raw),
            citations,
            chart_data_uri: raw.generated_chart.as_deref().and_then(chart_data_uri),
        }
    }
}

/// PNG data URI for a generated chart; payloads that are not base64 are skipped.
pub fn chart_data_uri(payload: &str) -> Option<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }

    match STANDARD.decode(payload) {
        Ok(_) => Some(format!("data:image/png;base64,{payload}")),
        Err(err) => {
            tracing::warn!(error = %err, "generated chart is not valid base64; not embedding it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CitationAction;

    fn renderer(sanitize: bool) -> AnswerRenderer {
        let mut config = AppConfig::default();
        config.render.sanitize_answer = sanitize;
        AnswerRenderer::new(&config)
    }

    fn sample() -> RawAnswer {
        RawAnswer {
            text: "Vacation is **25 days** [doc2].<script>bad()</script> See also [doc1] and [doc2].\n\nAnschlussfragen:\n- Wie beantrage ich Urlaub?"
                .to_string(),
            citations: vec![
                RawCitation {
                    id: "web".to_string(),
                    title: Some("Tarifvertrag".to_string()),
                    filepath: Some("98765".to_string()),
                    ..RawCitation::default()
                },
                RawCitation {
                    id: "pdf".to_string(),
                    title: Some("Page 4".to_string()),
                    filepath: Some("hr/handbook.pdf".to_string()),
                    ..RawCitation::default()
                },
            ],
            generated_chart: None,
            message_id: Some("m-7".to_string()),
            feedback: None,
            organization: Some("Acme".to_string()),
        }
    }

    #[test]
    fn renders_sanitized_answer_with_footnotes() {
        let rendered = renderer(true).render(&sample());

        assert!(rendered.html.contains("<strong>25 days</strong>"));
        assert!(rendered.html.contains("<sup>1</sup>"));
        assert!(rendered.html.contains("<sup>2</sup>"));
        assert!(!rendered.html.contains("bad()"));
        assert!(!rendered.html.contains("Anschlussfragen"));
        assert_eq!(rendered.followups, vec!["Wie beantrage ich Urlaub?".to_string()]);
        assert_eq!(rendered.message_id.as_deref(), Some("m-7"));
    }

    #[test]
    fn citation_entries_carry_labels_and_actions() {
        let rendered = renderer(true).render(&sample());

        assert_eq!(rendered.citations.len(), 2);
        let pdf = &rendered.citations[0];
        assert_eq!(pdf.ordinal, 1);
        assert_eq!(pdf.label, "hr/handbook.pdf - Page 4");
        assert_eq!(
            pdf.action,
            Some(CitationAction::OpenPdf {
                url: "/get-pdf?file_name=acme/hr%2Fhandbook.pdf#page=4".to_string()
            })
        );

        let web = &rendered.citations[1];
        assert_eq!(web.label, "Tarifvertrag");
        assert!(matches!(web.action, Some(CitationAction::OpenViewer { .. })));
    }

    #[test]
    fn unresolvable_pdf_has_no_action() {
        let mut raw = sample();
        raw.citations[1].title = Some("Introduction".to_string());
        let rendered = renderer(false).render(&raw);
        assert_eq!(rendered.citations[0].action, None);
    }

    #[test]
    fn bracketed_numbers_in_code_are_left_alone() {
        let mut raw = sample();
        raw.text = "Use `items[1]` here [doc2].\n\n```\nlet x = arr[1];\n```".to_string();
        let rendered = renderer(true).render(&raw);

        assert!(rendered.html.contains("<code>items[1]</code>"));
        assert!(rendered.html.contains("let x = arr[1];"));
        assert!(!rendered.html.contains("&lt;sup&gt;"));
        assert_eq!(rendered.html.matches("<sup>1</sup>").count(), 1);
        assert_eq!(rendered.citations.len(), 1);
    }

    #[test]
    fn chart_payload_must_be_base64() {
        assert_eq!(
            chart_data_uri("iVBORw0KGgo="),
            Some("data:image/png;base64,iVBORw0KGgo=".to_string())
        );
        assert_eq!(chart_data_uri("\"><script>"), None);
        assert_eq!(chart_data_uri("  "), None);
    }
}
