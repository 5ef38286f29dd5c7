use serde::{Deserialize, Serialize};

use crate::range::IndexRange;
use crate::tree::{ParagraphStyle, TextStyle};

/// A primitive mutation understood by the document service.
///
/// Operations in one batch apply in order; each index already accounts for
/// the length changes made by the operations before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditOperation {
    InsertText {
        index: usize,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<String>,
    },
    DeleteRange {
        range: IndexRange,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<String>,
    },
    SetParagraphStyle {
        range: IndexRange,
        style: ParagraphStyle,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<String>,
    },
    SetTextStyle {
        range: IndexRange,
        style: TextStyle,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<String>,
    },
}

impl EditOperation {
    /// First index the operation touches.
    pub fn index(&self) -> usize {
        match self {
            EditOperation::InsertText { index, .. } => *index,
            EditOperation::DeleteRange { range, .. }
            | EditOperation::SetParagraphStyle { range, .. }
            | EditOperation::SetTextStyle { range, .. } => range.start,
        }
    }

    pub fn tab_id(&self) -> Option<&str> {
        match self {
            EditOperation::InsertText { tab_id, .. }
            | EditOperation::DeleteRange { tab_id, .. }
            | EditOperation::SetParagraphStyle { tab_id, .. }
            | EditOperation::SetTextStyle { tab_id, .. } => tab_id.as_deref(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EditOperation::InsertText { .. } => "insertText",
            EditOperation::DeleteRange { .. } => "deleteRange",
            EditOperation::SetParagraphStyle { .. } => "setParagraphStyle",
            EditOperation::SetTextStyle { .. } => "setTextStyle",
        }
    }
}
