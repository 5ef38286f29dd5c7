use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::edit::EditOperation;
use crate::extract::{BODY_START, OPAQUE_LEN, content_len};
use crate::range::IndexRange;
use crate::service::{
    BatchRequest, BatchResponse, DocumentService, DocumentSummary, ServiceError, TabSummary,
};
use crate::tabs;
use crate::tree::{
    Document, NamedStyle, OpaqueElement, Paragraph, ParagraphElement, ParagraphStyle,
    StructuralElement, TextRun, TextStyle,
};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Store {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    documents: BTreeMap<String, Document>,
}

/// In-process [`DocumentService`] backed by a JSON store. A batch is applied to
/// a copy of the document and committed only when every edit succeeds.
#[derive(Debug, Default)]
pub struct MemoryService {
    store: RefCell<Store>,
    calls: RefCell<Vec<&'static str>>,
    applied: RefCell<Vec<BatchRequest>>,
    /// Successful batches still allowed before the next one is refused.
    rejection: RefCell<Option<(usize, String)>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let service = Self::new();
        for document in documents {
            service.insert_document(document);
        }
        service
    }

    /// Load a store written by [`MemoryService::save`]. A missing file is an
    /// empty store.
    pub fn open(path: &Path) -> Result<Self, ServiceError> {
        if !path.exists() {
            debug!(path = %path.display(), "store does not exist yet, starting empty");
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let store: Store = serde_json::from_str(&content)?;
        debug!(path = %path.display(), documents = store.documents.len(), "opened store");
        Ok(Self {
            store: RefCell::new(store),
            ..Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ServiceError> {
        let json = serde_json::to_string_pretty(&*self.store.borrow())?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Add or replace a document under its own id.
    pub fn insert_document(&self, document: Document) {
        self.store
            .borrow_mut()
            .documents
            .insert(document.document_id.clone(), document);
    }

    /// Current state of a document, without recording a call.
    pub fn document(&self, document_id: &str) -> Option<Document> {
        self.store.borrow().documents.get(document_id).cloned()
    }

    /// Names of the service methods called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|call| **call == method).count()
    }

    /// Every batch that was committed.
    pub fn applied_batches(&self) -> Vec<BatchRequest> {
        self.applied.borrow().clone()
    }

    /// Refuse the next batch with `message`.
    pub fn reject_next_apply(&self, message: impl Into<String>) {
        self.reject_apply_after(0, message);
    }

    /// Let `successes` batches through, then refuse the one after with `message`.
    pub fn reject_apply_after(&self, successes: usize, message: impl Into<String>) {
        *self.rejection.borrow_mut() = Some((successes, message.into()));
    }

    fn record(&self, call: &'static str) {
        self.calls.borrow_mut().push(call);
    }

    fn take_rejection(&self) -> Option<String> {
        let mut rejection = self.rejection.borrow_mut();
        let due = match rejection.as_mut() {
            Some((0, _)) => true,
            Some((remaining, _)) => {
                *remaining -= 1;
                false
            }
            None => false,
        };
        if due {
            rejection.take().map(|(_, message)| message)
        } else {
            None
        }
    }
}

impl DocumentService for MemoryService {
    fn fetch_document(&self, document_id: &str) -> Result<Document, ServiceError> {
        self.record("fetch_document");
        self.document(document_id)
            .ok_or_else(|| ServiceError::NotFound(document_id.to_string()))
    }

    fn apply_edits(
        &self,
        document_id: &str,
        request: &BatchRequest,
    ) -> Result<BatchResponse, ServiceError> {
        self.record("apply_edits");
        let mut store = self.store.borrow_mut();
        let document = store
            .documents
            .get_mut(document_id)
            .ok_or_else(|| ServiceError::NotFound(document_id.to_string()))?;

        if let Some(message) = self.take_rejection() {
            warn!(document_id, %message, "refusing batch");
            return Err(ServiceError::Rejected(message));
        }
        if let Some(required) = &request.required_revision_id
            && document.revision_id.as_ref() != Some(required)
        {
            return Err(ServiceError::Rejected(format!(
                "required revision {required} does not match current revision {}",
                document.revision_id.as_deref().unwrap_or("none")
            )));
        }

        let mut updated = document.clone();
        for edit in &request.edits {
            let content = tabs::content_mut(&mut updated, edit.tab_id()).ok_or_else(|| {
                ServiceError::Rejected(format!(
                    "{}: tab not found: {}",
                    edit.name(),
                    edit.tab_id().unwrap_or_default()
                ))
            })?;
            apply(content, edit)
                .map_err(|message| ServiceError::Rejected(format!("{}: {message}", edit.name())))?;
        }

        updated.revision_id = Some(next_revision(document.revision_id.as_deref()));
        let response = BatchResponse {
            revision_id: updated.revision_id.clone(),
        };
        *document = updated;
        self.applied.borrow_mut().push(request.clone());
        debug!(document_id, edits = request.edits.len(), "applied batch");
        Ok(response)
    }

    fn list_tabs(&self, document_id: &str) -> Result<Vec<TabSummary>, ServiceError> {
        self.record("list_tabs");
        let store = self.store.borrow();
        let document = store
            .documents
            .get(document_id)
            .ok_or_else(|| ServiceError::NotFound(document_id.to_string()))?;
        Ok(document
            .all_tabs()
            .into_iter()
            .map(|(tab, depth)| TabSummary {
                tab_id: tab.tab_id.clone(),
                title: tab.title.clone(),
                depth,
            })
            .collect())
    }

    fn create_document(&self, title: &str) -> Result<String, ServiceError> {
        self.record("create_document");
        let mut store = self.store.borrow_mut();
        store.next_id += 1;
        let document_id = format!("doc-{}", store.next_id);
        store.documents.insert(
            document_id.clone(),
            Document {
                document_id: document_id.clone(),
                title: title.to_string(),
                revision_id: Some(next_revision(None)),
                content: vec![StructuralElement::Paragraph(Paragraph::new(
                    NamedStyle::NormalText,
                    "",
                ))],
                tabs: Vec::new(),
            },
        );
        Ok(document_id)
    }

    fn delete_document(&self, document_id: &str) -> Result<(), ServiceError> {
        self.record("delete_document");
        self.store
            .borrow_mut()
            .documents
            .remove(document_id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(document_id.to_string()))
    }

    fn search_documents(&self, query: &str) -> Result<Vec<DocumentSummary>, ServiceError> {
        self.record("search_documents");
        let query = query.trim().to_lowercase();
        Ok(self
            .store
            .borrow()
            .documents
            .values()
            .filter(|document| document.title.to_lowercase().contains(&query))
            .map(|document| DocumentSummary {
                document_id: document.document_id.clone(),
                title: document.title.clone(),
            })
            .collect())
    }
}

fn next_revision(current: Option<&str>) -> String {
    let current = current.and_then(|revision| revision.parse::<u64>().ok()).unwrap_or(0);
    (current + 1).to_string()
}

#[derive(Debug, Clone)]
enum Item {
    /// A character; a newline carries the style of the paragraph it ends.
    Char {
        ch: char,
        style: TextStyle,
        paragraph: Option<ParagraphStyle>,
    },
    Inline(OpaqueElement),
    Block {
        element: StructuralElement,
        len: usize,
    },
}

impl Item {
    fn len(&self) -> usize {
        match self {
            Item::Char { ch, .. } => ch.len_utf16(),
            Item::Inline(_) => OPAQUE_LEN,
            Item::Block { len, .. } => *len,
        }
    }

    fn ends_paragraph(&self) -> bool {
        matches!(self, Item::Char { paragraph: Some(_), .. })
    }

    fn is_block(&self) -> bool {
        matches!(self, Item::Block { .. })
    }
}

fn flatten(elements: &[StructuralElement]) -> Vec<Item> {
    let mut items = Vec::new();
    for element in elements {
        let StructuralElement::Paragraph(paragraph) = element else {
            items.push(Item::Block {
                len: content_len(std::slice::from_ref(element)),
                element: element.clone(),
            });
            continue;
        };
        for child in &paragraph.elements {
            match child {
                ParagraphElement::TextRun(run) => {
                    items.extend(run.content.chars().map(|ch| Item::Char {
                        ch,
                        style: run.text_style.clone(),
                        paragraph: (ch == '\n').then(|| paragraph.paragraph_style.clone()),
                    }));
                }
                ParagraphElement::Opaque(opaque) => items.push(Item::Inline(opaque.clone())),
            }
        }
    }
    items
}

fn rebuild(items: Vec<Item>) -> Vec<StructuralElement> {
    fn flush_run(run: &mut Option<TextRun>, elements: &mut Vec<ParagraphElement>) {
        if let Some(run) = run.take() {
            elements.push(ParagraphElement::TextRun(run));
        }
    }

    let mut out = Vec::new();
    let mut elements = Vec::new();
    let mut run: Option<TextRun> = None;

    for item in items {
        match item {
            Item::Char {
                ch,
                style,
                paragraph,
            } => {
                if !run.as_ref().is_some_and(|current| current.text_style == style) {
                    flush_run(&mut run, &mut elements);
                    run = Some(TextRun {
                        content: String::new(),
                        text_style: style,
                    });
                }
                if let Some(current) = run.as_mut() {
                    current.content.push(ch);
                }
                if let Some(paragraph_style) = paragraph {
                    flush_run(&mut run, &mut elements);
                    out.push(StructuralElement::Paragraph(Paragraph {
                        elements: std::mem::take(&mut elements),
                        paragraph_style,
                    }));
                }
            }
            Item::Inline(opaque) => {
                flush_run(&mut run, &mut elements);
                elements.push(ParagraphElement::Opaque(opaque));
            }
            Item::Block { element, .. } => {
                flush_run(&mut run, &mut elements);
                if !elements.is_empty() {
                    out.push(StructuralElement::Paragraph(Paragraph {
                        elements: std::mem::take(&mut elements),
                        paragraph_style: ParagraphStyle::default(),
                    }));
                }
                out.push(element);
            }
        }
    }

    flush_run(&mut run, &mut elements);
    if !elements.is_empty() {
        out.push(StructuralElement::Paragraph(Paragraph {
            elements,
            paragraph_style: ParagraphStyle::default(),
        }));
    }
    out
}

/// Item position starting exactly at `index`.
fn position(items: &[Item], index: usize) -> Option<usize> {
    let mut offset = BODY_START;
    for (i, item) in items.iter().enumerate() {
        if offset == index {
            return Some(i);
        }
        offset += item.len();
        if offset > index {
            return None;
        }
    }
    (offset == index).then_some(items.len())
}

fn apply(content: &mut Vec<StructuralElement>, edit: &EditOperation) -> Result<(), String> {
    let mut items = flatten(content);
    let end = BODY_START + items.iter().map(Item::len).sum::<usize>();

    match edit {
        EditOperation::InsertText { index, text, .. } => insert_text(&mut items, *index, end, text)?,
        EditOperation::DeleteRange { range, .. } => delete_range(&mut items, *range, end)?,
        EditOperation::SetTextStyle { range, style, .. } => {
            let (from, to) = span(&items, *range, end)?;
            for item in &mut items[from..to] {
                if let Item::Char { style: current, .. } = item {
                    current.overlay(style);
                }
            }
        }
        EditOperation::SetParagraphStyle { range, style, .. } => {
            set_paragraph_style(&mut items, *range, end, style)?
        }
    }

    *content = rebuild(items);
    Ok(())
}

fn insert_text(items: &mut Vec<Item>, index: usize, end: usize, text: &str) -> Result<(), String> {
    if index < BODY_START || index >= end {
        return Err(format!("index {index} is outside [{BODY_START}, {end})"));
    }
    let at = position(items, index).ok_or_else(|| format!("index {index} splits an element"))?;
    if items.get(at).is_some_and(Item::is_block) {
        return Err(format!("index {index} is not inside a paragraph"));
    }

    // Text continues the style of the character before it in the same paragraph.
    let style = items[..at]
        .iter()
        .rev()
        .take_while(|item| !item.ends_paragraph() && !item.is_block())
        .find_map(|item| match item {
            Item::Char { style, .. } => Some(style.clone()),
            _ => None,
        })
        .unwrap_or_default();
    let paragraph = items[at..]
        .iter()
        .find_map(|item| match item {
            Item::Char {
                paragraph: Some(paragraph),
                ..
            } => Some(paragraph.clone()),
            _ => None,
        })
        .unwrap_or_default();

    let inserted: Vec<Item> = text
        .chars()
        .map(|ch| Item::Char {
            ch,
            style: style.clone(),
            paragraph: (ch == '\n').then(|| paragraph.clone()),
        })
        .collect();
    items.splice(at..at, inserted);
    Ok(())
}

fn delete_range(items: &mut Vec<Item>, range: IndexRange, end: usize) -> Result<(), String> {
    if range.end >= end {
        return Err(format!("range {range} includes the final newline"));
    }
    let (from, to) = span(items, range, end)?;
    let mut remaining = items.clone();
    remaining.drain(from..to);

    let merges_into_block = remaining
        .windows(2)
        .any(|pair| pair[1].is_block() && !pair[0].ends_paragraph() && !pair[0].is_block());
    if merges_into_block {
        return Err(format!("deleting {range} would merge a paragraph into a table"));
    }
    *items = remaining;
    Ok(())
}

fn set_paragraph_style(
    items: &mut [Item],
    range: IndexRange,
    end: usize,
    style: &ParagraphStyle,
) -> Result<(), String> {
    if range.is_empty() {
        return Err(format!("empty range {range}"));
    }
    if range.start < BODY_START || range.end > end {
        return Err(format!("range {range} is outside [{BODY_START}, {end})"));
    }

    let mut offset = BODY_START;
    let mut paragraph_start = BODY_START;
    for item in items.iter_mut() {
        let next = offset + item.len();
        match item {
            Item::Char {
                paragraph: Some(current),
                ..
            } => {
                if IndexRange::new(paragraph_start, next).overlaps(&range) {
                    *current = style.clone();
                }
                paragraph_start = next;
            }
            Item::Block { .. } => paragraph_start = next,
            _ => {}
        }
        offset = next;
    }
    Ok(())
}

/// Item positions covered by `range`, which must not split any item.
fn span(items: &[Item], range: IndexRange, end: usize) -> Result<(usize, usize), String> {
    if range.is_empty() {
        return Err(format!("empty range {range}"));
    }
    if range.start < BODY_START || range.end > end {
        return Err(format!("range {range} is outside [{BODY_START}, {end})"));
    }
    let from = position(items, range.start)
        .ok_or_else(|| format!("index {} splits an element", range.start))?;
    let to = position(items, range.end)
        .ok_or_else(|| format!("index {} splits an element", range.end))?;
    Ok((from, to))
}
