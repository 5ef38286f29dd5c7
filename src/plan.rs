use crate::block::{Block, BlockKind};
use crate::edit::EditOperation;
use crate::extract::Extent;
use crate::range::IndexRange;
use crate::tree::{NamedStyle, ParagraphStyle, utf16_len};

/// Where a batch of blocks is inserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// At a paragraph boundary; every block carries its own trailing newline.
    Before(usize),
    /// At the end of the body, just before the final newline. Blocks are
    /// separated by leading newlines and the last one is terminated by the
    /// body's own final newline. `leading_break` also separates the first block
    /// from a non-empty last paragraph.
    End { index: usize, leading_break: bool },
}

impl Anchor {
    pub fn index(&self) -> usize {
        match *self {
            Anchor::Before(index) | Anchor::End { index, .. } => index,
        }
    }
}

/// Operations for one batch and the span the inserted text ends up occupying.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub operations: Vec<EditOperation>,
    pub inserted: IndexRange,
}

#[derive(Debug, Clone)]
pub struct Planner {
    tab_id: Option<String>,
    code_font: String,
    paragraph_style: NamedStyle,
    extent: Option<Extent>,
}

impl Planner {
    pub fn new(tab_id: Option<String>) -> Self {
        Self {
            tab_id,
            code_font: "Courier New".to_string(),
            paragraph_style: NamedStyle::NormalText,
            extent: None,
        }
    }

    /// Clamp insertion points into the body described by `extent`.
    pub fn within(mut self, extent: Extent) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Font family applied to code segments.
    pub fn code_font(mut self, font: impl Into<String>) -> Self {
        self.code_font = font.into();
        self
    }

    /// Named style for paragraph blocks. Heading blocks keep their level.
    pub fn paragraph_style(mut self, style: NamedStyle) -> Self {
        self.paragraph_style = style;
        self
    }

    /// Insert `blocks` at the paragraph boundary `start`.
    pub fn insertion(&self, blocks: &[Block], start: usize) -> Plan {
        self.plan(blocks, Anchor::Before(start))
    }

    /// Insert `blocks` at the end of the body.
    pub fn insertion_at_end(&self, blocks: &[Block], index: usize, leading_break: bool) -> Plan {
        self.plan(
            blocks,
            Anchor::End {
                index,
                leading_break,
            },
        )
    }

    /// Delete `old` (when non-empty), then insert `blocks` at `anchor`.
    pub fn replacement(&self, old: IndexRange, blocks: &[Block], anchor: Anchor) -> Plan {
        let mut operations = Vec::new();
        if !old.is_empty() {
            operations.push(EditOperation::DeleteRange {
                range: old,
                tab_id: self.tab_id.clone(),
            });
        }
        let plan = self.plan(blocks, anchor);
        operations.extend(plan.operations);
        Plan {
            operations,
            inserted: plan.inserted,
        }
    }

    /// Plan `blocks` at `anchor`. A running cursor advances by every insert,
    /// so each operation already sees the text inserted before it.
    pub fn plan(&self, blocks: &[Block], anchor: Anchor) -> Plan {
        let anchor = self.clamp(anchor);
        let start = anchor.index();
        let mut cursor = start;
        let mut operations = Vec::new();

        for (i, block) in blocks.iter().enumerate() {
            let (lead, trail) = match anchor {
                Anchor::Before(_) => (false, true),
                Anchor::End { leading_break, .. } => (i > 0 || leading_break, false),
            };
            self.plan_block(block, lead, trail, &mut cursor, &mut operations);
        }

        Plan {
            operations,
            inserted: IndexRange::new(start, cursor),
        }
    }

    fn clamp(&self, anchor: Anchor) -> Anchor {
        let Some(extent) = self.extent else {
            return anchor;
        };
        match anchor {
            Anchor::Before(index) => Anchor::Before(extent.clamp(index)),
            Anchor::End {
                index,
                leading_break,
            } => Anchor::End {
                index: extent.clamp(index),
                leading_break,
            },
        }
    }

    fn plan_block(
        &self,
        block: &Block,
        lead: bool,
        trail: bool,
        cursor: &mut usize,
        operations: &mut Vec<EditOperation>,
    ) {
        if block.kind == BlockKind::Blank {
            if lead || trail {
                self.insert(*cursor, "\n".to_string(), operations);
                *cursor += 1;
            }
            return;
        }

        // The separator goes in on its own so the block text starts a fresh
        // paragraph and inherits no character style from the text before it.
        if lead {
            self.insert(*cursor, "\n".to_string(), operations);
            *cursor += 1;
        }

        let block_start = *cursor;
        let mut text: String = block
            .segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect();
        if trail {
            text.push('\n');
        }
        if !text.is_empty() {
            let len = utf16_len(&text);
            self.insert(*cursor, text, operations);
            *cursor += len;
        }

        let mut offset = block_start;
        for segment in &block.segments {
            let len = utf16_len(&segment.text);
            if let Some(style) = segment.style.filter(|_| len > 0) {
                operations.push(EditOperation::SetTextStyle {
                    range: IndexRange::new(offset, offset + len),
                    style: style.text_style(&self.code_font),
                    tab_id: self.tab_id.clone(),
                });
            }
            offset += len;
        }

        // Without a trailing newline the block is closed by the one after it.
        let paragraph_end = if trail { *cursor } else { *cursor + 1 };
        if let Some(style) = block.named_style(self.paragraph_style) {
            operations.push(EditOperation::SetParagraphStyle {
                range: IndexRange::new(block_start, paragraph_end),
                style: ParagraphStyle::named(style),
                tab_id: self.tab_id.clone(),
            });
        }
    }

    fn insert(&self, index: usize, text: String, operations: &mut Vec<EditOperation>) {
        operations.push(EditOperation::InsertText {
            index,
            text,
            tab_id: self.tab_id.clone(),
        });
    }
}
