use crate::tree::{NamedStyle, TextStyle};

/// Inline markup recognised inside a Markdown line. Styles never nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineStyle {
    Bold,
    Italic,
    Strikethrough,
    Code,
}

impl InlineStyle {
    /// The character style the service should apply for this markup.
    pub fn text_style(self, code_font: &str) -> TextStyle {
        let mut style = TextStyle::default();
        match self {
            InlineStyle::Bold => style.bold = Some(true),
            InlineStyle::Italic => style.italic = Some(true),
            InlineStyle::Strikethrough => style.strikethrough = Some(true),
            InlineStyle::Code => style.font_family = Some(code_font.to_string()),
        }
        style
    }
}

/// A run of text with at most one inline style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: Option<InlineStyle>,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    pub fn styled(text: impl Into<String>, style: InlineStyle) -> Self {
        Self {
            text: text.into(),
            style: Some(style),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    /// An empty source line, kept as a bare paragraph break.
    Blank,
}

/// Block-level unit decoded from Markdown, one per source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub segments: Vec<Segment>,
}

impl Block {
    pub fn blank() -> Self {
        Self {
            kind: BlockKind::Blank,
            segments: Vec::new(),
        }
    }

    /// Concatenated text of all segments.
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Paragraph style for this block; `paragraph` applies to non-heading text.
    pub fn named_style(&self, paragraph: NamedStyle) -> Option<NamedStyle> {
        match self.kind {
            BlockKind::Heading(level) => NamedStyle::heading(level),
            BlockKind::Paragraph => Some(paragraph),
            BlockKind::Blank => None,
        }
    }
}
