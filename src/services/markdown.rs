//! Markdown rendering
//!
//! Blog bodies are stored as Markdown and rendered once on write. The same
//! parse feeds the derived fields: reading time and the fallback excerpt.
//!
//! ```
//! use portfolio::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Hello\n\nThis is **bold** text.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, Event, Options, Parser, TagEnd};

/// Average reading speed used for `reading_time`
pub const WORDS_PER_MINUTE: usize = 200;

/// Stateless Markdown to HTML renderer
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Renderer with tables, strikethrough, task lists and smart punctuation
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        Self { options }
    }

    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, parser);
        html_output
    }

    /// Text content with markup removed; block boundaries become spaces
    pub fn plain_text(&self, markdown: &str) -> String {
        let mut text = String::with_capacity(markdown.len());
        for event in Parser::new_ext(markdown, self.options) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                    text.push(' ')
                }
                _ => {}
            }
        }
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Minutes needed to read the post, never less than one
    pub fn reading_time(&self, markdown: &str) -> i64 {
        let words = self.plain_text(markdown).split_whitespace().count();
        words.div_ceil(WORDS_PER_MINUTE).max(1) as i64
    }

    /// First `max_chars` characters of the plain text, cut on a word boundary
    pub fn excerpt(&self, markdown: &str, max_chars: usize) -> String {
        let text = self.plain_text(markdown);
        if text.chars().count() <= max_chars {
            return text;
        }

        let cut: String = text.chars().take(max_chars).collect();
        let trimmed = match cut.rfind(' ') {
            Some(idx) if idx > 0 => &cut[..idx],
            _ => cut.as_str(),
        };
        format!("{}...", trimmed.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_new() {
        let renderer = MarkdownRenderer::default();
        let html = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~");

        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn test_render_common_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("## Title\n\n- [x] done\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~");

        assert!(html.contains("<h2>Title</h2>"));
        assert!(html.contains("type=\"checkbox\""));
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn test_plain_text_strips_markup() {
        let renderer = MarkdownRenderer::new();
        let text = renderer.plain_text("# Hi\n\nSome **bold** and `code`.\n\n* one\n* two");
        assert_eq!(text, "Hi Some bold and code. one two");
    }

    #[test]
    fn test_reading_time() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(renderer.reading_time(""), 1);
        assert_eq!(renderer.reading_time("short post"), 1);

        let long = "word ".repeat(WORDS_PER_MINUTE * 2 + 1);
        assert_eq!(renderer.reading_time(&long), 3);
    }

    #[test]
    fn test_excerpt_cuts_on_word_boundary() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(renderer.excerpt("Short text", 50), "Short text");
        assert_eq!(
            renderer.excerpt("The quick brown fox jumps over the lazy dog", 18),
            "The quick brown..."
        );
    }
}
