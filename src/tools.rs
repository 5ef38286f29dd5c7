use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::edit::EditOperation;
use crate::error::{Error, NotFoundKind, Result, ToolError};
use crate::extract::{BODY_START, Extent, run_spans, slice_utf16};
use crate::headings::{self, Heading, HeadingIndex};
use crate::markdown::to_markdown;
use crate::parser::parse;
use crate::plan::{Anchor, Planner};
use crate::range::IndexRange;
use crate::service::{BatchRequest, DocumentService, DocumentSummary, ServiceError, TabSummary};
use crate::tabs;
use crate::tree::{NamedStyle, StructuralElement, TextStyle};

/// Outcome of [`Session::write_markdown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteStatus {
    /// Units removed by the clearing batch.
    pub deleted: usize,
    pub inserted: IndexRange,
    /// Remote calls made, 1 or 2.
    pub batches: usize,
}

/// A text run clipped to the queried range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyledRange {
    pub range: IndexRange,
    pub style: TextStyle,
    pub text: String,
}

/// Arguments of [`Session::replace_section`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceSection {
    pub start_heading: String,
    /// Replace up to this heading (exclusive) instead of the next one.
    pub end_heading: Option<String>,
    pub content: String,
    /// Keep the start heading and replace only the body below it.
    pub preserve_heading: bool,
    pub style: Option<NamedStyle>,
}

impl ReplaceSection {
    pub fn new(start_heading: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            start_heading: start_heading.into(),
            end_heading: None,
            content: content.into(),
            preserve_heading: true,
            style: None,
        }
    }
}

struct Snapshot {
    tab_id: Option<String>,
    content: Vec<StructuralElement>,
    extent: Extent,
    index: HeadingIndex,
    revision_id: Option<String>,
}

impl Snapshot {
    /// First heading matching `name`, with its position in document order.
    fn heading(&self, name: &str) -> Result<(usize, &Heading)> {
        self.index
            .headings
            .iter()
            .enumerate()
            .find(|(_, heading)| heading.matches(name))
            .ok_or_else(|| Error::not_found(NotFoundKind::Heading, name))
    }

    /// Start of the heading after position `i`, or the insertion limit.
    fn section_end(&self, i: usize) -> usize {
        self.index
            .headings
            .get(i + 1)
            .map_or(self.extent.insert_limit(), |next| next.start_index)
    }

    /// Anchor for an insertion at `index`, which must already be clamped.
    fn anchor(&self, index: usize) -> Anchor {
        if index < self.extent.insert_limit() {
            return Anchor::Before(index);
        }
        Anchor::End {
            index,
            leading_break: self.last_paragraph_has_text(),
        }
    }

    fn last_paragraph_has_text(&self) -> bool {
        self.index
            .last_paragraph
            .is_some_and(|paragraph| paragraph.len() > 1)
    }
}

pub struct Session<'a> {
    service: &'a dyn DocumentService,
    config: &'a Config,
}

impl<'a> Session<'a> {
    pub fn new(service: &'a dyn DocumentService, config: &'a Config) -> Self {
        Self { service, config }
    }

    /// Tab content as Markdown.
    pub fn read_as_markdown(
        &self,
        document_id: &str,
        tab: Option<&str>,
    ) -> Result<String, ToolError> {
        self.snapshot(document_id, tab)
            .map(|snapshot| to_markdown(&snapshot.content, &self.config.markdown))
            .map_err(|source| ToolError::new("read-as-markdown", document_id, source))
    }

    /// Replace the whole tab with `markdown`.
    ///
    /// Clearing and inserting are separate batches; if the second one fails the
    /// tab is left empty.
    pub fn write_markdown(
        &self,
        document_id: &str,
        markdown: &str,
        tab: Option<&str>,
    ) -> Result<WriteStatus, ToolError> {
        self.write(document_id, markdown, tab)
            .map_err(|source| ToolError::new("write-markdown", document_id, source))
    }

    pub fn find_headings(
        &self,
        document_id: &str,
        tab: Option<&str>,
    ) -> Result<Vec<Heading>, ToolError> {
        self.snapshot(document_id, tab)
            .map(|snapshot| snapshot.index.headings)
            .map_err(|source| ToolError::new("find-headings", document_id, source))
    }

    /// Insert `content` directly below `heading`. Returns the insertion index.
    pub fn insert_after_heading(
        &self,
        document_id: &str,
        heading: &str,
        content: &str,
        style: Option<NamedStyle>,
        tab: Option<&str>,
    ) -> Result<usize, ToolError> {
        self.insert_relative(document_id, heading, content, style, tab, |heading, _| {
            heading.end_index
        })
        .map_err(|source| ToolError::new("insert-after-heading", document_id, source))
    }

    /// Insert `content` at the end of the section under `heading`, just before
    /// the next heading. Returns the insertion index.
    pub fn append_to_section(
        &self,
        document_id: &str,
        heading: &str,
        content: &str,
        style: Option<NamedStyle>,
        tab: Option<&str>,
    ) -> Result<usize, ToolError> {
        self.insert_relative(document_id, heading, content, style, tab, |_, section_end| {
            section_end
        })
        .map_err(|source| ToolError::new("append-to-section", document_id, source))
    }

    /// Replace a section's content. Returns the span of the inserted text.
    pub fn replace_section(
        &self,
        document_id: &str,
        request: &ReplaceSection,
        tab: Option<&str>,
    ) -> Result<IndexRange, ToolError> {
        self.replace(document_id, request, tab)
            .map_err(|source| ToolError::new("replace-section", document_id, source))
    }

    /// Text runs overlapping `[start, end)`, clipped to it. `end` defaults to
    /// `start + 1`.
    pub fn get_style_at(
        &self,
        document_id: &str,
        start: usize,
        end: Option<usize>,
        tab: Option<&str>,
    ) -> Result<Vec<StyledRange>, ToolError> {
        self.style_at(document_id, start, end, tab)
            .map_err(|source| ToolError::new("get-style-at", document_id, source))
    }

    pub fn list_tabs(&self, document_id: &str) -> Result<Vec<TabSummary>, ToolError> {
        self.service
            .list_tabs(document_id)
            .map_err(|err| lookup_error(document_id, err))
            .map_err(|source| ToolError::new("list-tabs", document_id, source))
    }

    pub fn create_document(&self, title: &str) -> Result<String, ToolError> {
        let document_id = self
            .service
            .create_document(title)
            .map_err(|err| ToolError::new("create-document", title, err.into()))?;
        info!(%document_id, title, "created document");
        Ok(document_id)
    }

    pub fn delete_document(&self, document_id: &str) -> Result<(), ToolError> {
        self.service
            .delete_document(document_id)
            .map_err(|err| lookup_error(document_id, err))
            .map_err(|source| ToolError::new("delete-document", document_id, source))?;
        info!(document_id, "deleted document");
        Ok(())
    }

    pub fn search_documents(&self, query: &str) -> Result<Vec<DocumentSummary>, ToolError> {
        self.service
            .search_documents(query)
            .map_err(|err| ToolError::new("search-documents", query, err.into()))
    }

    fn snapshot(&self, document_id: &str, tab: Option<&str>) -> Result<Snapshot> {
        let document = self
            .service
            .fetch_document(document_id)
            .map_err(|err| lookup_error(document_id, err))?;
        let target = tabs::resolve(&document, tab)?;
        let index = headings::index(target.content);
        let extent = Extent {
            start: BODY_START,
            end: index.end,
        };
        debug!(
            document_id,
            tab = ?target.tab_id,
            end = extent.end,
            headings = index.headings.len(),
            "resolved document"
        );
        Ok(Snapshot {
            tab_id: target.tab_id.map(str::to_string),
            content: target.content.to_vec(),
            extent,
            index,
            revision_id: document.revision_id.clone(),
        })
    }

    fn planner(&self, snapshot: &Snapshot, style: Option<NamedStyle>) -> Planner {
        let planner = Planner::new(snapshot.tab_id.clone())
            .code_font(&self.config.markdown.code_font)
            .within(snapshot.extent);
        match style {
            Some(style) => planner.paragraph_style(style),
            None => planner,
        }
    }

    /// Apply one batch, returning the revision the document moved to.
    fn apply(
        &self,
        document_id: &str,
        edits: Vec<EditOperation>,
        revision_id: Option<String>,
    ) -> Result<Option<String>> {
        if edits.is_empty() {
            return Ok(revision_id);
        }
        let index = edits[0].index();
        let request = BatchRequest {
            edits,
            required_revision_id: revision_id.filter(|_| self.config.editing.check_revision),
        };
        debug!(document_id, edits = request.edits.len(), index, "applying batch");
        match self.service.apply_edits(document_id, &request) {
            Ok(response) => Ok(response.revision_id),
            Err(ServiceError::Rejected(message)) => Err(Error::RemoteRejected {
                document_id: document_id.to_string(),
                index,
                message,
            }),
            Err(err) => Err(lookup_error(document_id, err)),
        }
    }

    fn write(&self, document_id: &str, markdown: &str, tab: Option<&str>) -> Result<WriteStatus> {
        let snapshot = self.snapshot(document_id, tab)?;
        let planner = self.planner(&snapshot, None);
        let limit = snapshot.extent.insert_limit();
        let start = snapshot.extent.start;

        let mut revision_id = snapshot.revision_id.clone();
        let mut batches = 0;
        let mut deleted = 0;
        if limit > start {
            let clear = IndexRange::new(start, limit);
            let edits = vec![EditOperation::DeleteRange {
                range: clear,
                tab_id: snapshot.tab_id.clone(),
            }];
            revision_id = self.apply(document_id, edits, revision_id)?;
            batches += 1;
            deleted = clear.len();
        }

        let plan = planner.insertion_at_end(&parse(markdown), start, false);
        self.apply(document_id, plan.operations, revision_id)?;
        batches += 1;

        info!(document_id, deleted, inserted = %plan.inserted, batches, "rewrote document");
        Ok(WriteStatus {
            deleted,
            inserted: plan.inserted,
            batches,
        })
    }

    /// Insert decoded `content` at the index `locate` picks from the matched
    /// heading and the end of its section.
    fn insert_relative(
        &self,
        document_id: &str,
        heading: &str,
        content: &str,
        style: Option<NamedStyle>,
        tab: Option<&str>,
        locate: impl Fn(&Heading, usize) -> usize,
    ) -> Result<usize> {
        let snapshot = self.snapshot(document_id, tab)?;
        let (position, found) = snapshot.heading(heading)?;
        let index = snapshot
            .extent
            .clamp(locate(found, snapshot.section_end(position)));
        let anchor = snapshot.anchor(index);

        let plan = self.planner(&snapshot, style).plan(&parse(content), anchor);
        self.apply(document_id, plan.operations, snapshot.revision_id.clone())?;
        info!(document_id, heading, index, inserted = %plan.inserted, "inserted content");
        Ok(index)
    }

    fn replace(
        &self,
        document_id: &str,
        request: &ReplaceSection,
        tab: Option<&str>,
    ) -> Result<IndexRange> {
        let snapshot = self.snapshot(document_id, tab)?;
        let (position, heading) = snapshot.heading(&request.start_heading)?;
        let start = if request.preserve_heading {
            heading.end_index
        } else {
            heading.start_index
        };

        let end = match &request.end_heading {
            Some(name) => snapshot.index.headings[position + 1..]
                .iter()
                .find(|candidate| candidate.matches(name))
                .map(|candidate| candidate.start_index)
                .ok_or_else(|| Error::not_found(NotFoundKind::Heading, name.as_str()))?,
            None => snapshot.section_end(position),
        };

        let extent = snapshot.extent;
        let (start, end) = (extent.clamp(start), extent.clamp(end));
        if end < start {
            return Err(Error::InvalidRange { start, end });
        }

        let old = IndexRange::new(start, end);
        let anchor = if end < extent.insert_limit() {
            Anchor::Before(start)
        } else if old.is_empty() {
            snapshot.anchor(start)
        } else {
            // Everything up to the final newline is gone; its now empty
            // paragraph takes the new content.
            Anchor::End {
                index: start,
                leading_break: false,
            }
        };

        let plan = self
            .planner(&snapshot, request.style)
            .replacement(old, &parse(&request.content), anchor);
        self.apply(document_id, plan.operations, snapshot.revision_id.clone())?;
        info!(
            document_id,
            heading = %request.start_heading,
            replaced = %old,
            inserted = %plan.inserted,
            "replaced section"
        );
        Ok(plan.inserted)
    }

    fn style_at(
        &self,
        document_id: &str,
        start: usize,
        end: Option<usize>,
        tab: Option<&str>,
    ) -> Result<Vec<StyledRange>> {
        let requested_end = end.unwrap_or(start.saturating_add(1));
        if start < BODY_START || requested_end <= start {
            return Err(Error::InvalidRange {
                start,
                end: requested_end,
            });
        }

        let snapshot = self.snapshot(document_id, tab)?;
        let end = requested_end.min(snapshot.extent.end);
        if start >= end {
            return Err(Error::InvalidRange {
                start,
                end: requested_end,
            });
        }

        let query = IndexRange::new(start, end);
        Ok(run_spans(&snapshot.content, snapshot.extent.start)
            .into_iter()
            .filter_map(|run| {
                let range = run.range.intersect(&query)?;
                let text = slice_utf16(
                    &run.text,
                    range.start - run.range.start,
                    range.end - run.range.start,
                );
                Some(StyledRange {
                    range,
                    style: run.style,
                    text: text.to_string(),
                })
            })
            .collect())
    }
}

/// Map a service failure on a lookup, turning a missing document into
/// [`Error::NotFound`].
fn lookup_error(document_id: &str, err: ServiceError) -> Error {
    match err {
        ServiceError::NotFound(_) => Error::not_found(NotFoundKind::Document, document_id),
        other => Error::Service(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryService;
    use crate::tree::{Document, Paragraph, ParagraphElement, ParagraphStyle, TextRun};

    fn service(content: Vec<StructuralElement>) -> MemoryService {
        MemoryService::with_documents([Document {
            document_id: "doc".to_string(),
            title: "Doc".to_string(),
            revision_id: Some("1".to_string()),
            content,
            tabs: Vec::new(),
        }])
    }

    fn bold() -> TextStyle {
        TextStyle {
            bold: Some(true),
            ..Default::default()
        }
    }

    fn styled_paragraph() -> StructuralElement {
        StructuralElement::Paragraph(Paragraph {
            elements: vec![
                ParagraphElement::TextRun(TextRun {
                    content: "ab".to_string(),
                    text_style: bold(),
                }),
                ParagraphElement::TextRun(TextRun {
                    content: "cd\n".to_string(),
                    text_style: TextStyle::default(),
                }),
            ],
            paragraph_style: ParagraphStyle::default(),
        })
    }

    #[test]
    fn style_at_clips_runs_to_the_query() {
        let service = service(vec![styled_paragraph()]);
        let config = Config::default();
        let session = Session::new(&service, &config);

        let styles = session.get_style_at("doc", 2, Some(4), None).unwrap();
        assert_eq!(
            styles,
            vec![
                StyledRange {
                    range: IndexRange::new(2, 3),
                    style: bold(),
                    text: "b".to_string(),
                },
                StyledRange {
                    range: IndexRange::new(3, 4),
                    style: TextStyle::default(),
                    text: "c".to_string(),
                },
            ]
        );
        let single = session.get_style_at("doc", 1, None, None).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].text, "a");
    }

    #[test]
    fn style_at_end_is_clamped_to_the_body() {
        let service = service(vec![styled_paragraph()]);
        let config = Config::default();
        let session = Session::new(&service, &config);

        let styles = session.get_style_at("doc", 4, Some(100), None).unwrap();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].range, IndexRange::new(4, 6));
        assert_eq!(styles[0].text, "d\n");
    }

    #[test]
    fn invalid_style_ranges_make_no_calls() {
        let service = service(vec![styled_paragraph()]);
        let config = Config::default();
        let session = Session::new(&service, &config);

        for (start, end) in [(0, Some(2)), (3, Some(3)), (4, Some(2)), (usize::MAX, None)] {
            let err = session.get_style_at("doc", start, end, None).unwrap_err();
            assert!(matches!(err.source, Error::InvalidRange { .. }));
        }
        assert!(service.calls().is_empty());

        let err = session.get_style_at("doc", 9, None, None).unwrap_err();
        assert!(matches!(err.source, Error::InvalidRange { .. }));
    }

    #[test]
    fn insertion_after_the_last_heading_opens_a_new_paragraph() {
        let service = service(vec![StructuralElement::heading(1, "Only")]);
        let config = Config::default();
        let session = Session::new(&service, &config);

        let index = session
            .insert_after_heading("doc", "only", "text", None, None)
            .unwrap();
        assert_eq!(index, 5);
        assert_eq!(
            service.document("doc").unwrap().content,
            vec![
                StructuralElement::heading(1, "Only"),
                StructuralElement::paragraph("text"),
            ]
        );
    }

    #[test]
    fn missing_document_is_not_found() {
        let service = MemoryService::new();
        let config = Config::default();
        let session = Session::new(&service, &config);

        let err = session.read_as_markdown("nope", None).unwrap_err();
        assert_eq!(err.operation, "read-as-markdown");
        assert!(matches!(
            err.source,
            Error::NotFound {
                kind: NotFoundKind::Document,
                ..
            }
        ));
    }

    #[test]
    fn revision_travels_with_batches_when_enabled() {
        let service = service(vec![StructuralElement::paragraph("old")]);
        let mut config = Config::default();
        config.editing.check_revision = true;
        let session = Session::new(&service, &config);

        session.write_markdown("doc", "new", None).unwrap();
        let revisions: Vec<_> = service
            .applied_batches()
            .into_iter()
            .map(|batch| batch.required_revision_id)
            .collect();
        assert_eq!(revisions, vec![Some("1".to_string()), Some("2".to_string())]);
    }
}
