use pulldown_cmark::{html, Options, Parser};

use crate::sanitize::sanitize_html;

/// GitHub-flavoured markdown to HTML. Links open in a new browsing context.
pub fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(text, options);
    let mut out = String::with_capacity(text.len() + text.len() / 2);
    html::push_html(&mut out, parser);
    out.replace("<a href=\"", "<a target=\"_blank\" href=\"")
}

/// Render markdown and, when `sanitize` is set, pass the result through the allow-list.
pub fn to_html(text: &str, sanitize: bool) -> String {
    let rendered = markdown_to_html(text);
    if sanitize {
        sanitize_html(&rendered)
    } else {
        rendered
    }
}
