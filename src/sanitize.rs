use std::collections::HashSet;

use ammonia::{Builder, UrlRelative};
use once_cell::sync::Lazy;

/// Tags the answer backend is known to emit once markdown is rendered.
pub const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "b", "blockquote", "br", "caption", "code", "col", "colgroup", "dd", "del",
    "div", "dl", "dt", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "ins", "kbd",
    "li", "mark", "ol", "p", "pre", "s", "small", "span", "strike", "strong", "sub", "sup",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "u", "ul",
];

pub const ALLOWED_ATTRIBUTES: &[&str] = &[
    "align", "alt", "class", "colspan", "href", "rowspan", "src", "start", "target", "title",
];

/// Removed together with everything inside them.
pub const STRIPPED_WITH_CONTENT: &[&str] = &["script", "style"];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

static SANITIZER: Lazy<Builder<'static>> = Lazy::new(|| {
    let mut builder = Builder::empty();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
        .clean_content_tags(STRIPPED_WITH_CONTENT.iter().copied().collect::<HashSet<_>>())
        .generic_attributes(ALLOWED_ATTRIBUTES.iter().copied().collect::<HashSet<_>>())
        .url_schemes(URL_SCHEMES.iter().copied().collect::<HashSet<_>>())
        .url_relative(UrlRelative::PassThrough)
        .link_rel(Some("noopener noreferrer"))
        .strip_comments(true);
    builder
});

/// Run HTML through the fixed allow-list. Event handler attributes, scripts
/// and unknown tags are dropped; text content of unknown tags is kept.
pub fn sanitize_html(input: &str) -> String {
    SANITIZER.clean(input).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_removed_with_its_body() {
        let out = sanitize_html("<strong>keep</strong><script>steal(document.cookie)</script>");
        assert_eq!(out, "<strong>keep</strong>");
    }

    #[test]
    fn event_handlers_are_stripped() {
        let out = sanitize_html(r#"<img src="chart.png" onerror="alert(1)" alt="chart">"#);
        assert!(out.contains(r#"src="chart.png""#));
        assert!(!out.contains("onerror"));
    }

    #[test]
    fn javascript_urls_are_dropped() {
        let out = sanitize_html(r#"<a href="javascript:alert(1)">x</a>"#);
        assert!(!out.contains("javascript"));
        assert!(out.contains(">x</a>"));
    }

    #[test]
    fn answer_formatting_survives() {
        let html = "<table><thead><tr><th>a</th></tr></thead><tbody><tr><td><em>b</em><sup>1</sup></td></tr></tbody></table><pre><code class=\"language-rust\">fn main() {}</code></pre>";
        let out = sanitize_html(html);
        for fragment in [
            "<th>a</th>",
            "<td><em>b</em><sup>1</sup></td>",
            "<code class=\"language-rust\">fn main() {}</code>",
        ] {
            assert!(out.contains(fragment), "missing {fragment} in {out}");
        }
    }

    #[test]
    fn relative_links_pass_through() {
        let out = sanitize_html(r#"<a href="/get-pdf?file_name=a.pdf">a</a>"#);
        assert!(out.contains(r#"href="/get-pdf?file_name=a.pdf""#));
        assert!(out.contains(r#"rel="noopener noreferrer""#));
    }

    #[test]
    fn iframes_are_not_allowed() {
        let out = sanitize_html(r#"<iframe src="https://evil.example"></iframe><p>ok</p>"#);
        assert_eq!(out, "<p>ok</p>");
    }
}
