//! Markdown preprocessor using pulldown-cmark.

use pulldown_cmark::{Options, Parser, html};

/// Converts markdown property values into HTML fragments.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Create a renderer with the extensions content authors expect.
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    /// Render markdown source to HTML.
    pub fn to_html(&self, source: &str) -> String {
        let parser = Parser::new_ext(source, self.options);
        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph() {
        let html = MarkdownRenderer::new().to_html("Hello **world**");
        assert_eq!(html, "<p>Hello <strong>world</strong></p>\n");
    }

    #[test]
    fn test_heading_and_emphasis() {
        let html = MarkdownRenderer::new().to_html("# Title\n\nSome *text*.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn test_strikethrough_enabled() {
        let html = MarkdownRenderer::new().to_html("~~gone~~");
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_table_rendering() {
        let html = MarkdownRenderer::new().to_html(
            "| Header 1 | Header 2 |\n|----------|----------|\n| Cell 1   | Cell 2   |",
        );

        assert!(html.contains("<table>"));
        assert!(html.contains("<thead>"));
        assert!(html.contains("<td>Cell 1</td>"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(MarkdownRenderer::new().to_html(""), "");
    }
}
