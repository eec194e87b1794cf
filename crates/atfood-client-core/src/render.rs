use pulldown_cmark::{Options, Parser, html};

use crate::sanitize::sanitize_html;

/// Converts markdown into HTML. The output is untrusted and always goes
/// through a [`Sanitizer`] before it is displayed.
pub trait MarkdownEngine {
    fn to_html(&self, markdown: &str) -> String;
}

pub trait Sanitizer {
    fn sanitize(&self, html: &str) -> String;
}

/// CommonMark with the GitHub extensions the collaborator's answers use
/// (tables, strikethrough, task lists).
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownMarkdown;

impl MarkdownEngine for PulldownMarkdown {
    fn to_html(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);

        let parser = Parser::new_ext(markdown, options);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSanitizer;

impl Sanitizer for FallbackSanitizer {
    fn sanitize(&self, html: &str) -> String {
        sanitize_html(html)
    }
}

/// Raw response text to displayable markup.
///
/// Capabilities are picked once at construction. Without a markdown engine the
/// text is escaped and shown verbatim; with one, the converted HTML is always
/// sanitized, by the injected sanitizer if there is one and by
/// [`FallbackSanitizer`] otherwise. There is no way to build a pipeline that
/// converts without sanitizing.
pub struct RenderPipeline {
    markdown: Option<Box<dyn MarkdownEngine>>,
    sanitizer: Box<dyn Sanitizer>,
}

impl RenderPipeline {
    pub fn new(
        markdown: Option<Box<dyn MarkdownEngine>>,
        sanitizer: Option<Box<dyn Sanitizer>>,
    ) -> Self {
        Self {
            markdown,
            sanitizer: sanitizer.unwrap_or_else(|| Box::new(FallbackSanitizer)),
        }
    }

    /// Pipeline with no markdown engine: every answer is shown as escaped text.
    pub fn plain_text() -> Self {
        Self::new(None, None)
    }

    pub fn has_markdown(&self) -> bool {
        self.markdown.is_some()
    }

    pub fn render_markup(&self, raw_text: &str) -> String {
        match &self.markdown {
            Some(engine) => {
                let converted = engine.to_html(raw_text);
                self.sanitizer.sanitize(&converted)
            }
            None => preformatted(raw_text),
        }
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(Some(Box::new(PulldownMarkdown)), None)
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("markdown", &self.markdown.is_some())
            .finish_non_exhaustive()
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub(crate) const PLAIN_OPEN: &str = "<pre class=\"atfood-plain\">";
pub(crate) const PLAIN_CLOSE: &str = "</pre>";

fn preformatted(raw: &str) -> String {
    format!("{PLAIN_OPEN}{}{PLAIN_CLOSE}", escape_html(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::unsafe_parts;
    use quickcheck::quickcheck;

    struct UpperSanitizer;

    impl Sanitizer for UpperSanitizer {
        fn sanitize(&self, html: &str) -> String {
            html.to_uppercase()
        }
    }

    #[test]
    fn markdown_is_converted_and_sanitized() {
        let pipeline = RenderPipeline::default();
        let markup = pipeline.render_markup("Try **miso**.");
        assert_eq!(markup, "<p>Try <strong>miso</strong>.</p>\n");
    }

    #[test]
    fn raw_script_in_markdown_is_removed() {
        let pipeline = RenderPipeline::default();
        let markup = pipeline.render_markup(
            "Umami tips:\n\n<script>fetch('/steal')</script>\n\n<p onclick=\"x()\">Salt</p>",
        );
        assert!(markup.contains("Umami tips:"));
        assert!(!markup.contains("<script"));
        assert!(!markup.contains("fetch("));
        assert!(!markup.contains("onclick"));
        assert!(markup.contains("Salt"));
    }

    #[test]
    fn javascript_links_lose_their_href() {
        let pipeline = RenderPipeline::default();
        let markup = pipeline.render_markup("[click](javascript:alert(1)) and [ok](https://atfood.example)");
        assert!(!markup.to_lowercase().contains("javascript:"));
        assert!(markup.contains("href=\"https://atfood.example\""));
    }

    #[test]
    fn entity_encoded_script_urls_do_not_survive_rendering() {
        let markup = RenderPipeline::default().render_markup(concat!(
            "<a href=\"&#106;avascript:alert(1)\">a</a> ",
            "<a href=\"javascript&colon;alert(2)\">b</a> ",
            "<img src=\"java&#9;script:x\">"
        ));
        assert_eq!(markup, "<p><a>a</a> <a>b</a> <img></p>\n");
        assert!(unsafe_parts(&markup).is_empty());
    }

    #[test]
    fn injected_sanitizer_replaces_fallback() {
        let pipeline = RenderPipeline::new(
            Some(Box::new(PulldownMarkdown)),
            Some(Box::new(UpperSanitizer)),
        );
        assert_eq!(pipeline.render_markup("hi"), "<P>HI</P>\n");
    }

    #[test]
    fn plain_text_pipeline_escapes_and_preserves_whitespace() {
        let pipeline = RenderPipeline::plain_text();
        assert!(!pipeline.has_markdown());
        assert_eq!(
            pipeline.render_markup("a < b & \"c\"\n  'd'"),
            "<pre class=\"atfood-plain\">a &lt; b &amp; &quot;c&quot;\n  &#39;d&#39;</pre>"
        );
    }

    quickcheck! {
        fn plain_text_never_leaks_markup_characters(raw: String) -> bool {
            let markup = RenderPipeline::plain_text().render_markup(&raw);
            let Some(inner) = markup
                .strip_prefix(PLAIN_OPEN)
                .and_then(|rest| rest.strip_suffix(PLAIN_CLOSE))
            else {
                return false;
            };
            !inner.contains('<') && !inner.contains('>') && !inner.contains('"')
        }

        fn converted_markup_never_keeps_script_or_handlers(before: String, after: String) -> bool {
            let raw = format!("{before}\n\n<script>alert(1)</script>\n\n<b onclick=\"x()\">{after}</b>");
            let markup = RenderPipeline::default().render_markup(&raw);
            unsafe_parts(&markup).is_empty()
        }
    }
}
