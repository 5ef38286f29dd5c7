use serde::Serialize;

use crate::extract::{BODY_START, Visitor, walk};
use crate::range::IndexRange;
use crate::tree::{NamedStyle, Paragraph, StructuralElement};

/// A heading paragraph and the range it occupies, newline included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Heading {
    pub level: NamedStyle,
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
}

impl Heading {
    pub fn range(&self) -> IndexRange {
        IndexRange::new(self.start_index, self.end_index)
    }

    /// Case-insensitive comparison ignoring surrounding whitespace.
    pub fn matches(&self, name: &str) -> bool {
        self.text.to_lowercase() == name.trim().to_lowercase()
    }
}

#[derive(Default)]
struct HeadingCollector {
    headings: Vec<Heading>,
    last_paragraph: Option<IndexRange>,
    table_depth: usize,
}

impl Visitor for HeadingCollector {
    fn paragraph(&mut self, paragraph: &Paragraph, range: IndexRange) {
        if self.table_depth == 0 {
            self.last_paragraph = Some(range);
        }
        let level = paragraph.paragraph_style.named_style_type;
        if level.heading_level().is_none() {
            return;
        }
        self.headings.push(Heading {
            level,
            text: paragraph.text().trim().to_string(),
            start_index: range.start,
            end_index: range.end,
        });
    }

    fn table(&mut self, entering: bool) {
        if entering {
            self.table_depth += 1;
        } else {
            self.table_depth = self.table_depth.saturating_sub(1);
        }
    }
}

/// Every heading in document order.
pub fn find_headings(elements: &[StructuralElement]) -> Vec<Heading> {
    index(elements).headings
}

/// Headings, the index after the body, and the last top-level paragraph.
pub(crate) struct HeadingIndex {
    pub headings: Vec<Heading>,
    pub end: usize,
    pub last_paragraph: Option<IndexRange>,
}

pub(crate) fn index(elements: &[StructuralElement]) -> HeadingIndex {
    let mut collector = HeadingCollector::default();
    let end = walk(elements, BODY_START, &mut collector);
    HeadingIndex {
        headings: collector.headings,
        end,
        last_paragraph: collector.last_paragraph,
    }
}

/// Body span of every heading: from its end to the next heading's start, the
/// last one running to `document_end`.
pub fn sections(headings: &[Heading], document_end: usize) -> Vec<IndexRange> {
    headings
        .iter()
        .enumerate()
        .map(|(i, heading)| {
            let end = headings
                .get(i + 1)
                .map_or(document_end, |next| next.start_index);
            IndexRange::new(heading.end_index.min(end), end)
        })
        .collect()
}
