//! Plain-text rendition of chapter markup for the terminal viewer

use std::rc::Rc;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Node, NodeData, RcDom};

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6", "li",
    "tr", "table", "ul", "ol", "dl", "dt", "dd", "figure", "figcaption", "hr", "header",
    "footer", "aside", "nav",
];

/// Flatten chapter markup into paragraphs separated by newlines.
///
/// Whitespace is collapsed except inside `<pre>`. Images become an
/// `[image: alt]` marker.
pub fn html_to_text(html: &str) -> String {
    let dom = match parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
    {
        Ok(dom) => dom,
        Err(e) => {
            log::warn!("Failed to parse chapter markup: {e}");
            return String::new();
        }
    };

    let mut writer = TextWriter::default();
    writer.visit(&dom.document, false);
    writer.finish()
}

#[derive(Default)]
struct TextWriter {
    out: String,
    /// Whitespace seen but not yet emitted
    pending_space: bool,
}

impl TextWriter {
    fn visit(&mut self, node: &Rc<Node>, preformatted: bool) {
        match node.data {
            NodeData::Text { ref contents } => {
                let text = contents.borrow();
                if preformatted {
                    self.out.push_str(&text);
                } else {
                    self.push_collapsed(&text);
                }
            }
            NodeData::Element {
                ref name,
                ref attrs,
                ..
            } => {
                let tag = name.local.as_ref();
                match tag {
                    "head" | "script" | "style" | "title" => {}
                    "br" => self.newline(),
                    "img" => {
                        let alt = attrs
                            .borrow()
                            .iter()
                            .find(|a| a.name.local.as_ref() == "alt")
                            .map(|a| a.value.to_string())
                            .unwrap_or_default();
                        self.push_collapsed(&format!(" [image: {}] ", alt.trim()));
                    }
                    "pre" => {
                        self.block_break();
                        self.visit_children(node, true);
                        self.block_break();
                    }
                    _ if BLOCK_TAGS.contains(&tag) => {
                        self.block_break();
                        if tag == "li" {
                            self.out.push_str("• ");
                        }
                        self.visit_children(node, preformatted);
                        self.block_break();
                    }
                    _ => self.visit_children(node, preformatted),
                }
            }
            _ => self.visit_children(node, preformatted),
        }
    }

    fn visit_children(&mut self, node: &Rc<Node>, preformatted: bool) {
        for child in node.children.borrow().iter() {
            self.visit(child, preformatted);
        }
    }

    fn push_collapsed(&mut self, text: &str) {
        for (i, word) in text.split_whitespace().enumerate() {
            let leading_gap = i > 0 || text.starts_with(char::is_whitespace);
            if (leading_gap || self.pending_space) && !self.at_line_start() {
                self.out.push(' ');
            }
            self.pending_space = false;
            self.out.push_str(word);
        }
        if text.ends_with(char::is_whitespace) {
            self.pending_space = true;
        }
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.pending_space = false;
    }

    /// Separate blocks by one blank line
    fn block_break(&mut self) {
        self.pending_space = false;
        if self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_are_separated() {
        let text = html_to_text("<html><body><h1>Title</h1><p>One  two\nthree</p><p>Four</p></body></html>");
        assert_eq!(text, "Title\n\nOne two three\n\nFour");
    }

    #[test]
    fn pre_keeps_whitespace() {
        let text = html_to_text("<body><pre>line 1\n  line 2</pre></body>");
        assert_eq!(text, "line 1\n  line 2");
    }

    #[test]
    fn inline_markup_joins_words() {
        let text = html_to_text("<p>Hello <b>bold</b> world</p>");
        assert_eq!(text, "Hello bold world");
    }

    #[test]
    fn images_and_scripts() {
        let text = html_to_text(
            "<head><title>x</title><style>p{}</style></head><body><img alt='Cover'/><script>var a;</script></body>",
        );
        assert_eq!(text, "[image: Cover]");
    }
}
