//! Markdown to HTML with comrak.

use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::{Arena, Options, format_html, parse_document};

use crate::export::escape_html;
use crate::highlight;

/// Parser options shared by the HTML renderer and the terminal preview.
pub fn create_options() -> Options {
    let mut options = Options::default();

    // GFM extensions
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.footnotes = true;
    options.extension.shortcodes = true;

    options
}

/// Render markdown source to an HTML fragment.
///
/// Raw HTML in the source comes out escaped. Fenced code blocks tagged with a
/// language syntect knows are replaced by inline-styled highlighted markup.
pub fn render_html(markdown: &str) -> String {
    let arena = Arena::new();
    let mut options = create_options();
    let root = parse_document(&arena, markdown, &options);
    neutralize_and_highlight(root);

    // Only blocks produced above survive as raw HTML.
    options.render.unsafe_ = true;

    let mut html = Vec::new();
    if let Err(err) = format_html(root, &options, &mut html) {
        tracing::warn!(error = %err, "markdown render failed");
        return format!("<pre>{}</pre>", escape_html(markdown));
    }
    String::from_utf8_lossy(&html).into_owned()
}

fn neutralize_and_highlight<'a>(root: &'a AstNode<'a>) {
    for node in root.descendants() {
        let mut data = node.data.borrow_mut();
        let replacement = match &data.value {
            NodeValue::HtmlInline(raw) => Some(NodeValue::Text(raw.clone())),
            NodeValue::HtmlBlock(block) => Some(NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: block.block_type,
                literal: format!("<p>{}</p>\n", escape_html(block.literal.trim_end())),
            })),
            NodeValue::CodeBlock(code) if code.fenced => {
                let language = code.info.split_whitespace().next().unwrap_or_default();
                highlight::highlight_html(language, &code.literal).map(|literal| {
                    NodeValue::HtmlBlock(NodeHtmlBlock {
                        block_type: 0,
                        literal,
                    })
                })
            }
            _ => None,
        };
        if let Some(value) = replacement {
            data.value = value;
        }
    }
}
