//! Build a [`DocTree`] from CommonMark source.
//!
//! Block and inline structure become containers tagged with the HTML element
//! the Markdown would render to, so exclusion rules written for HTML hosts
//! apply unchanged. Raw HTML and image alt text are kept in the tree but under
//! `DisplayNone` containers: they are not rendered as text and must never
//! reach the anchoring corpus.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use super::{DocTree, DocumentTree, NodeId, Visibility};

/// Tag used for containers wrapping raw HTML
pub const RAW_HTML_TAG: &str = "raw-html";

pub fn parse(source: &str) -> DocTree {
    let mut tree = DocTree::new("body");
    let mut stack: Vec<NodeId> = vec![tree.root()];
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;

    for event in Parser::new_ext(source, options) {
        let parent = stack.last().copied().unwrap_or_else(|| tree.root());
        match event {
            Event::Start(tag) => {
                let element = tree.append_element(parent, element_name(&tag));
                match tag {
                    Tag::Image { .. } | Tag::HtmlBlock => {
                        tree.set_visibility(element, Visibility::DisplayNone);
                    }
                    Tag::CodeBlock(CodeBlockKind::Fenced(lang)) if !lang.is_empty() => {
                        tree.add_class(element, &format!("language-{lang}"));
                    }
                    _ => {}
                }
                stack.push(element);
            }
            Event::End(_) => {
                // The root never pops.
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Event::Text(text) => {
                tree.append_text(parent, &text);
            }
            Event::Code(code) => {
                let element = tree.append_element(parent, "code");
                tree.append_text(element, &code);
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let element = tree.append_element(parent, RAW_HTML_TAG);
                tree.set_visibility(element, Visibility::DisplayNone);
                tree.append_text(element, &html);
            }
            Event::SoftBreak | Event::HardBreak => {
                tree.append_text(parent, "\n");
            }
            Event::Rule => {
                tree.append_element(parent, "hr");
            }
            Event::TaskListMarker(checked) => {
                let element = tree.append_element(parent, "input");
                if checked {
                    tree.add_class(element, "checked");
                }
            }
            Event::FootnoteReference(label) => {
                let element = tree.append_element(parent, "sup");
                tree.append_text(element, &label);
            }
            _ => {}
        }
    }

    log::trace!("built markdown tree with {} nodes", tree.len());
    tree
}

fn element_name(tag: &Tag<'_>) -> &'static str {
    match tag {
        Tag::Paragraph => "p",
        Tag::Heading { level, .. } => match level {
            HeadingLevel::H1 => "h1",
            HeadingLevel::H2 => "h2",
            HeadingLevel::H3 => "h3",
            HeadingLevel::H4 => "h4",
            HeadingLevel::H5 => "h5",
            HeadingLevel::H6 => "h6",
        },
        Tag::BlockQuote(_) => "blockquote",
        Tag::CodeBlock(_) => "pre",
        Tag::HtmlBlock => RAW_HTML_TAG,
        Tag::List(Some(_)) => "ol",
        Tag::List(None) => "ul",
        Tag::Item => "li",
        Tag::FootnoteDefinition(_) => "aside",
        Tag::Table(_) => "table",
        Tag::TableHead => "thead",
        Tag::TableRow => "tr",
        Tag::TableCell => "td",
        Tag::Emphasis => "em",
        Tag::Strong => "strong",
        Tag::Strikethrough => "del",
        Tag::Link { .. } => "a",
        Tag::Image { .. } => "img",
        _ => "span",
    }
}
