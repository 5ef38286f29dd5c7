use docedit::service::{BatchRequest, BatchResponse, DocumentSummary, TabSummary};
use docedit::tree::{Document, NamedStyle, Paragraph, ParagraphElement, StructuralElement, Tab};
use docedit::{
    Config, DocumentService, EditOperation, Error, IndexRange, MemoryService, NotFoundKind,
    ReplaceSection, ServiceError, Session,
};

// Intro [1,7) | Hello [7,13) | Body [13,18) | Text [18,23) | Conclusion [23,34) | Bye [34,38)
fn sample() -> Vec<StructuralElement> {
    vec![
        StructuralElement::heading(1, "Intro"),
        StructuralElement::paragraph("Hello"),
        StructuralElement::heading(2, "Body"),
        StructuralElement::paragraph("Text"),
        StructuralElement::heading(1, "Conclusion"),
        StructuralElement::paragraph("Bye"),
    ]
}

fn document(content: Vec<StructuralElement>) -> Document {
    Document {
        document_id: "doc".to_string(),
        title: "Report".to_string(),
        revision_id: Some("1".to_string()),
        content,
        tabs: Vec::new(),
    }
}

fn service() -> MemoryService {
    MemoryService::with_documents([document(sample())])
}

/// `(style, text)` of every top-level paragraph.
fn outline(content: &[StructuralElement]) -> Vec<(NamedStyle, String)> {
    content
        .iter()
        .filter_map(|element| match element {
            StructuralElement::Paragraph(paragraph) => Some((
                paragraph.paragraph_style.named_style_type,
                paragraph.text(),
            )),
            _ => None,
        })
        .collect()
}

fn body(service: &MemoryService) -> Vec<(NamedStyle, String)> {
    outline(&service.document("doc").unwrap().content)
}

type Run = (String, Option<bool>, Option<String>);

/// `(text, bold, font family)` of each run in the top-level paragraph at `position`.
fn runs(service: &MemoryService, position: usize) -> Vec<Run> {
    let doc = service.document("doc").unwrap();
    match &doc.content[position] {
        StructuralElement::Paragraph(paragraph) => paragraph
            .elements
            .iter()
            .filter_map(|element| match element {
                ParagraphElement::TextRun(run) => Some((
                    run.content.clone(),
                    run.text_style.bold,
                    run.text_style.font_family.clone(),
                )),
                _ => None,
            })
            .collect(),
        other => panic!("expected a paragraph, found {other:?}"),
    }
}

fn plain(text: &str) -> Run {
    (text.to_string(), None, None)
}

fn normal(text: &str) -> (NamedStyle, String) {
    (NamedStyle::NormalText, format!("{text}\n"))
}

fn heading(level: u8, text: &str) -> (NamedStyle, String) {
    (NamedStyle::heading(level).unwrap(), format!("{text}\n"))
}

#[test]
fn headings_are_listed_in_document_order() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let headings = session.find_headings("doc", None).unwrap();
    let spans: Vec<_> = headings
        .iter()
        .map(|h| (h.text.as_str(), h.start_index, h.end_index))
        .collect();
    assert_eq!(
        spans,
        vec![("Intro", 1, 7), ("Body", 13, 18), ("Conclusion", 23, 34)]
    );
}

#[test]
fn read_encodes_headings_and_paragraphs() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    assert_eq!(
        session.read_as_markdown("doc", None).unwrap(),
        "# Intro\n\nHello\n\n## Body\n\nText\n\n# Conclusion\n\nBye"
    );
}

#[test]
fn append_lands_before_the_next_heading() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let index = session
        .append_to_section("doc", "body", "More", None, None)
        .unwrap();
    assert_eq!(index, 23);
    assert_eq!(
        body(&service),
        vec![
            heading(1, "Intro"),
            normal("Hello"),
            heading(2, "Body"),
            normal("Text"),
            normal("More"),
            heading(1, "Conclusion"),
            normal("Bye"),
        ]
    );

    let conclusion = session
        .find_headings("doc", None)
        .unwrap()
        .into_iter()
        .find(|h| h.text == "Conclusion")
        .unwrap();
    assert_eq!(conclusion.start_index, 28);
}

#[test]
fn append_to_the_last_section_extends_the_body() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let index = session
        .append_to_section("doc", "Conclusion", "# Appendix\nSee also", None, None)
        .unwrap();
    assert_eq!(index, 37);
    assert_eq!(
        body(&service)[5..],
        [normal("Bye"), heading(1, "Appendix"), normal("See also")]
    );
}

#[test]
fn insert_after_heading_goes_first_in_the_section() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let index = session
        .insert_after_heading("doc", "  INTRO ", "Lead **in**", None, None)
        .unwrap();
    assert_eq!(index, 7);
    assert_eq!(body(&service)[..3], [heading(1, "Intro"), normal("Lead in"), normal("Hello")]);
    assert_eq!(
        runs(&service, 1),
        vec![plain("Lead "), ("in".to_string(), Some(true), None), plain("\n")]
    );
}

#[test]
fn plain_text_after_styled_text_stays_plain() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    session.write_markdown("doc", "a **b** `c` d", None).unwrap();
    assert_eq!(
        runs(&service, 0),
        vec![
            plain("a "),
            ("b".to_string(), Some(true), None),
            plain(" "),
            ("c".to_string(), None, Some("Courier New".to_string())),
            plain(" d\n"),
        ]
    );
}

#[test]
fn appending_after_a_styled_last_run_starts_unstyled() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    session.write_markdown("doc", "# H\n**tail**", None).unwrap();
    session
        .append_to_section("doc", "H", "more", None, None)
        .unwrap();

    assert_eq!(body(&service), [heading(1, "H"), normal("tail"), normal("more")]);
    assert_eq!(runs(&service, 1), vec![("tail\n".to_string(), Some(true), None)]);
    assert_eq!(runs(&service, 2), vec![plain("more\n")]);
}

#[test]
fn style_override_applies_to_paragraph_blocks() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    session
        .insert_after_heading(
            "doc",
            "Body",
            "## Sub\nQuote",
            Some(NamedStyle::Subtitle),
            None,
        )
        .unwrap();
    assert_eq!(
        body(&service)[3..5],
        [heading(2, "Sub"), (NamedStyle::Subtitle, "Quote\n".to_string())]
    );
}

#[test]
fn replace_section_keeps_the_heading_by_default() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let inserted = session
        .replace_section("doc", &ReplaceSection::new("Intro", "New intro"), None)
        .unwrap();
    assert_eq!(inserted, IndexRange::new(7, 17));
    assert_eq!(
        body(&service)[..3],
        [heading(1, "Intro"), normal("New intro"), heading(2, "Body")]
    );
}

#[test]
fn replace_section_up_to_an_end_heading_can_drop_the_start_heading() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let request = ReplaceSection {
        end_heading: Some("conclusion".to_string()),
        preserve_heading: false,
        ..ReplaceSection::new("Intro", "# Fresh\nbody")
    };
    session.replace_section("doc", &request, None).unwrap();
    assert_eq!(
        body(&service),
        vec![
            heading(1, "Fresh"),
            normal("body"),
            heading(1, "Conclusion"),
            normal("Bye"),
        ]
    );
}

#[test]
fn replacing_the_last_section_leaves_no_empty_paragraph() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let inserted = session
        .replace_section("doc", &ReplaceSection::new("Conclusion", "Farewell"), None)
        .unwrap();
    assert_eq!(inserted, IndexRange::new(34, 42));
    assert_eq!(body(&service)[4..], [heading(1, "Conclusion"), normal("Farewell")]);
}

#[test]
fn end_heading_must_follow_the_start_heading() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let request = ReplaceSection {
        end_heading: Some("Intro".to_string()),
        ..ReplaceSection::new("Body", "x")
    };
    let err = session.replace_section("doc", &request, None).unwrap_err();
    assert!(err.source.is_not_found());
    assert_eq!(service.call_count("apply_edits"), 0);
}

#[test]
fn missing_heading_writes_nothing() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let err = session
        .insert_after_heading("doc", "Nonexistent", "x", None, None)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "insert-after-heading failed for doc: heading not found: \"Nonexistent\""
    );
    assert_eq!(service.calls(), vec!["fetch_document"]);
    assert!(service.applied_batches().is_empty());
    assert_eq!(body(&service), outline(&sample()));
}

#[test]
fn write_markdown_clears_then_inserts() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let status = session
        .write_markdown("doc", "# T\nbody", None)
        .unwrap();
    assert_eq!(status.deleted, 36);
    assert_eq!(status.inserted, IndexRange::new(1, 7));
    assert_eq!(status.batches, 2);
    assert_eq!(service.call_count("apply_edits"), 2);
    assert_eq!(body(&service), vec![heading(1, "T"), normal("body")]);
    assert_eq!(session.read_as_markdown("doc", None).unwrap(), "# T\n\nbody");
}

#[test]
fn write_markdown_to_an_empty_document_is_one_batch() {
    let service = MemoryService::new();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let id = session.create_document("Fresh").unwrap();
    let status = session.write_markdown(&id, "hello", None).unwrap();
    assert_eq!(status.batches, 1);
    assert_eq!(
        outline(&service.document(&id).unwrap().content),
        vec![normal("hello")]
    );
}

#[test]
fn rejected_second_batch_leaves_the_document_cleared() {
    let service = service();
    let config = Config::default();
    let session = Session::new(&service, &config);

    service.reject_apply_after(1, "Invalid requests[0].insertText: index out of bounds");
    let err = session.write_markdown("doc", "# T", None).unwrap_err();
    match err.source {
        Error::RemoteRejected {
            ref document_id,
            index,
            ref message,
        } => {
            assert_eq!(document_id, "doc");
            assert_eq!(index, 1);
            assert_eq!(message, "Invalid requests[0].insertText: index out of bounds");
        }
        ref other => panic!("unexpected error: {other}"),
    }
    assert_eq!(body(&service), vec![normal("")]);
}

#[test]
fn index_past_the_end_is_clamped() {
    let service = MemoryService::with_documents([document(vec![StructuralElement::heading(
        2, "Tail",
    )])]);
    let config = Config::default();
    let session = Session::new(&service, &config);

    let index = session
        .append_to_section("doc", "Tail", "after", None, None)
        .unwrap();
    assert_eq!(index, 5);
    assert_eq!(body(&service), vec![heading(2, "Tail"), normal("after")]);
}

#[test]
fn operations_are_scoped_to_a_tab() {
    let mut doc = document(Vec::new());
    doc.tabs = vec![
        Tab {
            tab_id: "t.0".to_string(),
            title: "Main".to_string(),
            content: sample(),
            child_tabs: Vec::new(),
        },
        Tab {
            tab_id: "t.1".to_string(),
            title: "Notes".to_string(),
            content: vec![
                StructuralElement::heading(1, "Todo"),
                StructuralElement::paragraph("one"),
            ],
            child_tabs: Vec::new(),
        },
    ];
    let service = MemoryService::with_documents([doc]);
    let config = Config::default();
    let session = Session::new(&service, &config);

    assert!(session.find_headings("doc", Some("Notes")).unwrap()[0].matches("todo"));
    session
        .append_to_section("doc", "Todo", "two", None, Some("notes"))
        .unwrap();

    let doc = service.document("doc").unwrap();
    assert_eq!(outline(&doc.tabs[0].content), outline(&sample()));
    assert_eq!(
        outline(&doc.tabs[1].content),
        vec![heading(1, "Todo"), normal("one"), normal("two")]
    );
    let batches = service.applied_batches();
    assert!(batches[0].edits.iter().all(|op| op.tab_id() == Some("t.1")));

    let err = session.read_as_markdown("doc", Some("Archive")).unwrap_err();
    assert!(matches!(
        err.source,
        Error::NotFound {
            kind: NotFoundKind::Tab,
            ..
        }
    ));
}

/// Lets another writer edit the document between fetch and apply.
struct Contended<'a> {
    inner: &'a MemoryService,
}

impl DocumentService for Contended<'_> {
    fn fetch_document(&self, document_id: &str) -> Result<Document, ServiceError> {
        let document = self.inner.fetch_document(document_id)?;
        let concurrent = BatchRequest {
            edits: vec![EditOperation::InsertText {
                index: 1,
                text: "x".to_string(),
                tab_id: None,
            }],
            required_revision_id: None,
        };
        self.inner.apply_edits(document_id, &concurrent)?;
        Ok(document)
    }

    fn apply_edits(
        &self,
        document_id: &str,
        request: &BatchRequest,
    ) -> Result<BatchResponse, ServiceError> {
        self.inner.apply_edits(document_id, request)
    }

    fn list_tabs(&self, document_id: &str) -> Result<Vec<TabSummary>, ServiceError> {
        self.inner.list_tabs(document_id)
    }

    fn create_document(&self, title: &str) -> Result<String, ServiceError> {
        self.inner.create_document(title)
    }

    fn delete_document(&self, document_id: &str) -> Result<(), ServiceError> {
        self.inner.delete_document(document_id)
    }

    fn search_documents(&self, query: &str) -> Result<Vec<DocumentSummary>, ServiceError> {
        self.inner.search_documents(query)
    }
}

#[test]
fn stale_revision_is_rejected_when_checking_is_enabled() {
    let inner = service();
    let contended = Contended { inner: &inner };
    let mut config = Config::default();
    config.editing.check_revision = true;
    let session = Session::new(&contended, &config);

    let err = session
        .append_to_section("doc", "Body", "More", None, None)
        .unwrap_err();
    assert!(matches!(err.source, Error::RemoteRejected { index: 23, .. }));
    assert_eq!(inner.applied_batches().len(), 1);

    config.editing.check_revision = false;
    let session = Session::new(&contended, &config);
    session
        .append_to_section("doc", "Body", "More", None, None)
        .unwrap();
}

#[test]
fn documents_can_be_created_found_and_deleted() {
    let service = MemoryService::new();
    let config = Config::default();
    let session = Session::new(&service, &config);

    let id = session.create_document("Quarterly plan").unwrap();
    let found = session.search_documents("PLAN").unwrap();
    assert_eq!(found[0].document_id, id);
    assert!(session.list_tabs(&id).unwrap().is_empty());

    session.delete_document(&id).unwrap();
    let err = session.delete_document(&id).unwrap_err();
    assert_eq!(err.operation, "delete-document");
    assert!(err.source.is_not_found());
}

#[test]
fn empty_paragraphs_are_not_part_of_the_markdown() {
    let service = MemoryService::with_documents([document(vec![
        StructuralElement::Paragraph(Paragraph::new(NamedStyle::Heading2, "Intro")),
        StructuralElement::paragraph(""),
        StructuralElement::paragraph("text"),
    ])]);
    let config = Config::default();
    let session = Session::new(&service, &config);
    assert_eq!(
        session.read_as_markdown("doc", None).unwrap(),
        "## Intro\n\ntext"
    );
}
