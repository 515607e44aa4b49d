//! Markdown section extraction.
//!
//! Uses pulldown-cmark to turn a document into ordered, classified sections
//! plus a plain and a structure-preserving rendering of its text.

use pulldown_cmark::{Event, Parser as MdParser, Tag, TagEnd};

use super::classifier::classify;
use crate::models::*;

/// Splits `markdown` into sections, one per heading, and classifies each.
pub fn extract_structure(markdown: &str) -> DocumentStructure {
    let mut builder = StructureBuilder::default();

    for event in MdParser::new(markdown) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                builder.flush_block();
                builder.heading = Some((level as u8, String::new()));
            }
            Event::End(TagEnd::Heading(_)) => builder.close_heading(),
            Event::Start(Tag::Item) => {
                // A nested list starts inside an item that already has text.
                builder.flush_block();
                builder.item_depth += 1;
            }
            Event::End(TagEnd::Item) => {
                builder.flush_block();
                builder.item_depth = builder.item_depth.saturating_sub(1);
            }
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::CodeBlock) => {
                if builder.item_depth == 0 {
                    builder.flush_block();
                } else {
                    // Loose items keep all their paragraphs on one line.
                    builder.break_paragraph();
                }
            }
            Event::Text(text) | Event::Code(text) => builder.push_text(&text),
            Event::SoftBreak => builder.push_text(" "),
            Event::HardBreak => builder.push_text("\n"),
            _ => {}
        }
    }

    builder.finish()
}

/// Joins blocks with a blank line, except consecutive list items.
#[derive(Default)]
struct TextSink {
    text: String,
    last_was_item: bool,
}

impl TextSink {
    fn push(&mut self, line: &str, is_item: bool) {
        if !self.text.is_empty() {
            let separator = if is_item && self.last_was_item { "\n" } else { "\n\n" };
            self.text.push_str(separator);
        }
        self.text.push_str(line);
        self.last_was_item = is_item;
    }
}

#[derive(Default)]
struct StructureBuilder {
    raw: Vec<String>,
    structured: TextSink,
    sections: Vec<DocumentSection>,
    current: Option<(DocumentSection, TextSink)>,
    heading: Option<(u8, String)>,
    block: String,
    item_depth: usize,
}

impl StructureBuilder {
    fn push_text(&mut self, text: &str) {
        match self.heading {
            Some((_, ref mut title)) => title.push_str(text),
            None => self.block.push_str(text),
        }
    }

    fn break_paragraph(&mut self) {
        if !self.block.is_empty() && !self.block.ends_with(char::is_whitespace) {
            self.block.push(' ');
        }
    }

    fn close_heading(&mut self) {
        let Some((level, title)) = self.heading.take() else {
            return;
        };
        let title = title.trim().to_string();

        self.finish_section();
        self.structured
            .push(&format!("{} {}", "#".repeat(level as usize), title), false);
        self.raw.push(title.clone());
        self.current = Some((
            DocumentSection::new(level, title, String::new(), SectionKind::Unknown),
            TextSink::default(),
        ));
    }

    fn flush_block(&mut self) {
        let text = std::mem::take(&mut self.block);
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let is_item = self.item_depth > 0;
        let line = if is_item {
            format!("- {}", text)
        } else {
            text.to_string()
        };

        self.structured.push(&line, is_item);
        self.raw.push(text.to_string());
        if let Some((_, ref mut content)) = self.current {
            content.push(&line, is_item);
        }
    }

    fn finish_section(&mut self) {
        if let Some((mut section, content)) = self.current.take() {
            section.content = content.text;
            section.kind = classify(&section.title, &section.content);
            self.sections.push(section);
        }
    }

    fn finish(mut self) -> DocumentStructure {
        self.flush_block();
        self.finish_section();
        DocumentStructure {
            raw_text: self.raw.join("\n"),
            structured_text: self.structured.text,
            sections: self.sections,
        }
    }
}
