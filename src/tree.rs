use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A document as fetched from the service, tabs included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,
    /// Body of a document without tabs (or of its first tab).
    #[serde(default)]
    pub content: Vec<StructuralElement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tabs: Vec<Tab>,
}

/// A named sub-document with its own offset space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub tab_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Vec<StructuralElement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_tabs: Vec<Tab>,
}

/// Block-level node of the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StructuralElement {
    Paragraph(Paragraph),
    Table(Table),
    /// Table of contents, section break, ... One offset unit, no text.
    Opaque(OpaqueElement),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    #[serde(default)]
    pub elements: Vec<ParagraphElement>,
    #[serde(default)]
    pub paragraph_style: ParagraphStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParagraphElement {
    TextRun(TextRun),
    /// Page break, inline image, ... One offset unit, no text.
    Opaque(OpaqueElement),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub content: String,
    #[serde(default)]
    pub text_style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueElement {
    pub kind: OpaqueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpaqueKind {
    TableOfContents,
    SectionBreak,
    PageBreak,
    InlineObject,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default)]
    pub table_rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    #[serde(default)]
    pub table_cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphStyle {
    #[serde(default)]
    pub named_style_type: NamedStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_id: Option<String>,
}

impl ParagraphStyle {
    pub fn named(style: NamedStyle) -> Self {
        Self {
            named_style_type: style,
            heading_id: None,
        }
    }
}

/// Named paragraph style. Unrecognised names collapse into `Other`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedStyle {
    #[default]
    #[serde(rename = "NORMAL_TEXT")]
    NormalText,
    #[serde(rename = "TITLE")]
    Title,
    #[serde(rename = "SUBTITLE")]
    Subtitle,
    #[serde(rename = "HEADING_1")]
    Heading1,
    #[serde(rename = "HEADING_2")]
    Heading2,
    #[serde(rename = "HEADING_3")]
    Heading3,
    #[serde(rename = "HEADING_4")]
    Heading4,
    #[serde(rename = "HEADING_5")]
    Heading5,
    #[serde(rename = "HEADING_6")]
    Heading6,
    #[serde(rename = "OTHER")]
    #[serde(other)]
    Other,
}

impl NamedStyle {
    /// `HEADING_n` for `n` in `1..=6`.
    pub fn heading(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Heading1),
            2 => Some(Self::Heading2),
            3 => Some(Self::Heading3),
            4 => Some(Self::Heading4),
            5 => Some(Self::Heading5),
            6 => Some(Self::Heading6),
            _ => None,
        }
    }

    /// Heading level, or `None` for non-heading styles.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            Self::Heading1 => Some(1),
            Self::Heading2 => Some(2),
            Self::Heading3 => Some(3),
            Self::Heading4 => Some(4),
            Self::Heading5 => Some(5),
            Self::Heading6 => Some(6),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NormalText => "NORMAL_TEXT",
            Self::Title => "TITLE",
            Self::Subtitle => "SUBTITLE",
            Self::Heading1 => "HEADING_1",
            Self::Heading2 => "HEADING_2",
            Self::Heading3 => "HEADING_3",
            Self::Heading4 => "HEADING_4",
            Self::Heading5 => "HEADING_5",
            Self::Heading6 => "HEADING_6",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for NamedStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamedStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL_TEXT" => Ok(Self::NormalText),
            "TITLE" => Ok(Self::Title),
            "SUBTITLE" => Ok(Self::Subtitle),
            "HEADING_1" => Ok(Self::Heading1),
            "HEADING_2" => Ok(Self::Heading2),
            "HEADING_3" => Ok(Self::Heading3),
            "HEADING_4" => Ok(Self::Heading4),
            "HEADING_5" => Ok(Self::Heading5),
            "HEADING_6" => Ok(Self::Heading6),
            other => Err(format!("unknown paragraph style: {}", other)),
        }
    }
}

/// Inline character style. `None` fields are unset (inherited).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    /// Points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Hex colour such as `#1a4f8b`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl TextStyle {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every field set in `other` on top of `self`.
    pub fn overlay(&mut self, other: &TextStyle) {
        if other.bold.is_some() {
            self.bold = other.bold;
        }
        if other.italic.is_some() {
            self.italic = other.italic;
        }
        if other.underline.is_some() {
            self.underline = other.underline;
        }
        if other.strikethrough.is_some() {
            self.strikethrough = other.strikethrough;
        }
        if other.font_size.is_some() {
            self.font_size = other.font_size;
        }
        if other.font_family.is_some() {
            self.font_family = other.font_family.clone();
        }
        if other.foreground_color.is_some() {
            self.foreground_color = other.foreground_color.clone();
        }
        if other.background_color.is_some() {
            self.background_color = other.background_color.clone();
        }
    }
}

impl Paragraph {
    /// A paragraph holding a single unstyled run. A trailing newline is added
    /// when `text` lacks one.
    pub fn new(style: NamedStyle, text: &str) -> Self {
        let mut content = text.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        Self {
            elements: vec![ParagraphElement::TextRun(TextRun {
                content,
                text_style: TextStyle::default(),
            })],
            paragraph_style: ParagraphStyle::named(style),
        }
    }

    /// Concatenated text of all runs, newline included.
    pub fn text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|element| match element {
                ParagraphElement::TextRun(run) => Some(run.content.as_str()),
                ParagraphElement::Opaque(_) => None,
            })
            .collect()
    }
}

impl StructuralElement {
    pub fn paragraph(text: &str) -> Self {
        Self::Paragraph(Paragraph::new(NamedStyle::NormalText, text))
    }

    /// Levels outside `1..=6` produce a normal paragraph.
    pub fn heading(level: u8, text: &str) -> Self {
        let style = NamedStyle::heading(level).unwrap_or(NamedStyle::NormalText);
        Self::Paragraph(Paragraph::new(style, text))
    }

    pub fn opaque(kind: OpaqueKind) -> Self {
        Self::Opaque(OpaqueElement { kind })
    }
}

impl Document {
    /// Every tab, depth first in document order, with its nesting depth.
    pub fn all_tabs(&self) -> Vec<(&Tab, usize)> {
        fn collect<'a>(tabs: &'a [Tab], depth: usize, out: &mut Vec<(&'a Tab, usize)>) {
            for tab in tabs {
                out.push((tab, depth));
                collect(&tab.child_tabs, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        collect(&self.tabs, 0, &mut out);
        out
    }
}

/// Length of `text` in UTF-16 code units, the unit of every document index.
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}
