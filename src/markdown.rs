use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::MarkdownConfig;
use crate::tree::{OpaqueKind, Paragraph, ParagraphElement, StructuralElement, TextStyle};

static EXTRA_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("invalid newline regex"));

/// Convert a body to Markdown, one block per paragraph.
///
/// Lossy: empty paragraphs are dropped, tables and tables of contents become
/// placeholder comments, and only heading levels (plus, when enabled, simple
/// inline emphasis) survive.
pub fn to_markdown(elements: &[StructuralElement], config: &MarkdownConfig) -> String {
    let mut out = String::new();
    for element in elements {
        emit_element(element, config, &mut out);
    }
    EXTRA_NEWLINES.replace_all(&out, "\n\n").trim().to_string()
}

fn emit_element(element: &StructuralElement, config: &MarkdownConfig, out: &mut String) {
    match element {
        StructuralElement::Paragraph(paragraph) => emit_paragraph(paragraph, config, out),
        StructuralElement::Table(_) => emit_placeholder(&config.table_placeholder, out),
        StructuralElement::Opaque(opaque) => {
            if opaque.kind == OpaqueKind::TableOfContents {
                emit_placeholder(&config.toc_placeholder, out);
            }
        }
    }
}

fn emit_placeholder(placeholder: &str, out: &mut String) {
    if placeholder.is_empty() {
        return;
    }
    out.push_str(placeholder);
    out.push_str("\n\n");
}

fn emit_paragraph(paragraph: &Paragraph, config: &MarkdownConfig, out: &mut String) {
    let text = paragraph.text();
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    match paragraph.paragraph_style.named_style_type.heading_level() {
        Some(level) => {
            for _ in 0..level {
                out.push('#');
            }
            out.push(' ');
            out.push_str(text);
        }
        None if config.inline_styles => {
            let mut styled = String::new();
            for element in &paragraph.elements {
                if let ParagraphElement::TextRun(run) = element {
                    styled.push_str(&run_to_markdown(&run.content, &run.text_style, config));
                }
            }
            out.push_str(styled.trim());
        }
        None => out.push_str(text),
    }
    out.push('\n');
    out.push('\n');
}

/// Marker for a run's style. One marker at most, code first.
fn marker(style: &TextStyle, config: &MarkdownConfig) -> Option<&'static str> {
    if style.font_family.as_deref() == Some(config.code_font.as_str()) {
        Some("`")
    } else if style.bold == Some(true) {
        Some("**")
    } else if style.italic == Some(true) {
        Some("*")
    } else if style.strikethrough == Some(true) {
        Some("~~")
    } else {
        None
    }
}

fn run_to_markdown(text: &str, style: &TextStyle, config: &MarkdownConfig) -> String {
    let core = text.trim();
    let Some(marker) = marker(style, config).filter(|_| !core.is_empty()) else {
        return text.to_string();
    };
    // Keep surrounding whitespace outside the markers.
    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[lead.len() + core.len()..];
    format!("{lead}{marker}{core}{marker}{trail}")
}
