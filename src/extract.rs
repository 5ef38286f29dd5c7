use crate::range::IndexRange;
use crate::tree::{
    OpaqueElement, Paragraph, ParagraphElement, StructuralElement, TextRun, TextStyle, utf16_len,
};

/// The first index of every body.
pub const BODY_START: usize = 1;

/// Offset units taken by an element that carries no text.
pub const OPAQUE_LEN: usize = 1;

/// Callbacks for [`walk`]. All default to no-ops.
pub trait Visitor {
    /// Called before the paragraph's own elements, with the full paragraph range.
    fn paragraph(&mut self, _paragraph: &Paragraph, _range: IndexRange) {}

    fn text_run(&mut self, _run: &TextRun, _range: IndexRange) {}

    /// Block-level or inline element without text.
    fn opaque(&mut self, _element: &OpaqueElement, _range: IndexRange) {}

    /// Called when entering (`true`) and leaving (`false`) a table.
    fn table(&mut self, _entering: bool) {}
}

/// Walk `elements` starting at `start`, returning the index after the last one.
pub fn walk<V: Visitor + ?Sized>(
    elements: &[StructuralElement],
    start: usize,
    visitor: &mut V,
) -> usize {
    let mut offset = start;
    for element in elements {
        offset = match element {
            StructuralElement::Paragraph(paragraph) => walk_paragraph(paragraph, offset, visitor),
            StructuralElement::Table(table) => {
                visitor.table(true);
                for row in &table.table_rows {
                    for cell in &row.table_cells {
                        offset = walk(&cell.content, offset, visitor);
                    }
                }
                visitor.table(false);
                offset
            }
            StructuralElement::Opaque(opaque) => {
                visitor.opaque(opaque, IndexRange::new(offset, offset + OPAQUE_LEN));
                offset + OPAQUE_LEN
            }
        };
    }
    offset
}

fn walk_paragraph<V: Visitor + ?Sized>(paragraph: &Paragraph, start: usize, visitor: &mut V) -> usize {
    let end = start + paragraph_len(paragraph);
    visitor.paragraph(paragraph, IndexRange::new(start, end));

    let mut offset = start;
    for element in &paragraph.elements {
        match element {
            ParagraphElement::TextRun(run) => {
                let len = utf16_len(&run.content);
                visitor.text_run(run, IndexRange::new(offset, offset + len));
                offset += len;
            }
            ParagraphElement::Opaque(opaque) => {
                visitor.opaque(opaque, IndexRange::new(offset, offset + OPAQUE_LEN));
                offset += OPAQUE_LEN;
            }
        }
    }
    end
}

/// Offset units occupied by a paragraph, newline included.
pub fn paragraph_len(paragraph: &Paragraph) -> usize {
    paragraph
        .elements
        .iter()
        .map(|element| match element {
            ParagraphElement::TextRun(run) => utf16_len(&run.content),
            ParagraphElement::Opaque(_) => OPAQUE_LEN,
        })
        .sum()
}

#[derive(Default)]
struct TextCollector {
    text: String,
}

impl Visitor for TextCollector {
    fn text_run(&mut self, run: &TextRun, _range: IndexRange) {
        self.text.push_str(&run.content);
    }
}

/// Concatenated text of every run, and the index after the last element.
pub fn extract_text(elements: &[StructuralElement], start: usize) -> (String, usize) {
    let mut collector = TextCollector::default();
    let end = walk(elements, start, &mut collector);
    (collector.text, end)
}

/// A text run together with the range it occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpan {
    pub range: IndexRange,
    pub text: String,
    pub style: TextStyle,
}

#[derive(Default)]
struct RunCollector {
    runs: Vec<RunSpan>,
}

impl Visitor for RunCollector {
    fn text_run(&mut self, run: &TextRun, range: IndexRange) {
        self.runs.push(RunSpan {
            range,
            text: run.content.clone(),
            style: run.text_style.clone(),
        });
    }
}

/// Every text run in document order with its range.
pub fn run_spans(elements: &[StructuralElement], start: usize) -> Vec<RunSpan> {
    let mut collector = RunCollector::default();
    walk(elements, start, &mut collector);
    collector.runs
}

/// Index bounds of a body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Extent {
    pub start: usize,
    /// One past the implicit trailing newline.
    pub end: usize,
}

impl Extent {
    pub fn of(elements: &[StructuralElement]) -> Self {
        Self {
            start: BODY_START,
            end: BODY_START + content_len(elements),
        }
    }

    /// Last index content can be inserted at: just before the trailing newline.
    pub fn insert_limit(&self) -> usize {
        self.end.saturating_sub(1).max(self.start)
    }

    /// Clamp `index` into `[start, insert_limit]`.
    pub fn clamp(&self, index: usize) -> usize {
        index.clamp(self.start, self.insert_limit())
    }
}

struct NoopVisitor;

impl Visitor for NoopVisitor {}

/// Offset units occupied by `elements`.
pub fn content_len(elements: &[StructuralElement]) -> usize {
    walk(elements, 0, &mut NoopVisitor)
}

/// Slice `text` by UTF-16 offsets relative to its start. Offsets that fall
/// inside a surrogate pair are moved outward to the enclosing character.
pub fn slice_utf16(text: &str, from: usize, to: usize) -> &str {
    let mut units = 0;
    let mut start_byte = text.len();
    let mut end_byte = text.len();
    for (byte, ch) in text.char_indices() {
        let next = units + ch.len_utf16();
        if start_byte == text.len() && next > from {
            start_byte = byte;
        }
        if units >= to {
            end_byte = byte;
            break;
        }
        units = next;
    }
    if start_byte > end_byte {
        return "";
    }
    &text[start_byte..end_byte]
}
