//! Converts the small Markdown subset used by the rules API into HTML.
//!
//! Lines are tokenized into blocks first (paragraph, bullet list, blockquote) and the inline
//! emphasis pass runs per line afterwards, so bullet markers never get mistaken for emphasis.
//! Each non-empty line outside a list becomes its own paragraph.

use once_cell::sync::Lazy;
use regex::Regex;

use super::sanitize::{collapse_adjacent_inline_tags, strip_links, InlineTag};

static HTML_TAG_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<[a-z][\s>]").unwrap());
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*]\s+").unwrap());
static QUOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s*").unwrap());
static STRONG_EM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*\*(.+?)\*\*\*").unwrap());
static STRONG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static EM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Paragraph(String),
    List(Vec<String>),
    Quote(Vec<Block>),
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    quote: Option<Vec<Block>>,
    list: Option<Vec<String>>,
}

impl BlockBuilder {
    fn container(&mut self) -> &mut Vec<Block> {
        match self.quote.as_mut() {
            Some(quote) => quote,
            None => &mut self.blocks,
        }
    }

    fn close_list(&mut self) {
        if let Some(items) = self.list.take() {
            self.container().push(Block::List(items));
        }
    }

    fn close_quote(&mut self) {
        self.close_list();
        if let Some(children) = self.quote.take() {
            self.blocks.push(Block::Quote(children));
        }
    }

    fn open_quote(&mut self) {
        if self.quote.is_none() {
            self.close_list();
            self.quote = Some(Vec::new());
        }
    }

    fn push_item(&mut self, item: &str) {
        self.list.get_or_insert_with(Vec::new).push(item.to_string());
    }

    fn push_paragraph(&mut self, text: &str) {
        self.close_list();
        self.container().push(Block::Paragraph(text.to_string()));
    }

    fn finish(mut self) -> Vec<Block> {
        self.close_quote();
        self.close_list();
        self.blocks
    }
}

fn tokenize(source: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();

    for raw_line in source.split('\n') {
        let line = raw_line.trim();
        let is_quote = line.starts_with('>');
        let line = if is_quote {
            QUOTE_RE.replace(line, "").into_owned()
        } else {
            line.to_string()
        };

        if line.is_empty() {
            builder.close_quote();
            continue;
        }

        if is_quote {
            builder.open_quote();
        } else if builder.quote.is_some() {
            builder.close_quote();
        }

        if BULLET_RE.is_match(&line) {
            let item = BULLET_RE.replace(&line, "");
            builder.push_item(&item);
        } else {
            builder.push_paragraph(&line);
        }
    }

    builder.finish()
}

fn render_inline(text: &str) -> String {
    let html = STRONG_EM_RE.replace_all(text, "<strong><em>${1}</em></strong>");
    let html = STRONG_RE.replace_all(&html, "<strong>${1}</strong>");
    EM_RE.replace_all(&html, "<em>${1}</em>").into_owned()
}

fn render_blocks(blocks: &[Block], out: &mut String) {
    for block in blocks {
        match block {
            Block::Paragraph(text) => {
                out.push_str("<p>");
                out.push_str(&render_inline(text));
                out.push_str("</p>");
            }
            Block::List(items) => {
                out.push_str("<ul>");
                for item in items {
                    out.push_str("<li>");
                    out.push_str(&render_inline(item));
                    out.push_str("</li>");
                }
                out.push_str("</ul>");
            }
            Block::Quote(children) => {
                out.push_str("<blockquote>");
                render_blocks(children, out);
                out.push_str("</blockquote>");
            }
        }
    }
}

/// Renders Markdown as HTML. Input that already contains an HTML tag only gets its links
/// stripped.
pub fn markdown_to_html(text: &str) -> String {
    let prepared = text.replace("\r\n", "\n");
    let prepared = prepared.trim();
    if prepared.is_empty() {
        return String::new();
    }

    if HTML_TAG_OPEN_RE.is_match(prepared) {
        return strip_links(prepared);
    }

    let mut html = String::new();
    render_blocks(&tokenize(prepared), &mut html);

    let html = collapse_adjacent_inline_tags(&html, InlineTag::Em);
    strip_links(&html)
}
