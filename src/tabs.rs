use crate::error::{Error, NotFoundKind, Result};
use crate::tree::{Document, StructuralElement, Tab};

/// The body an operation works on, and the tab id its edits must carry.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    pub tab_id: Option<&'a str>,
    pub content: &'a [StructuralElement],
}

/// Narrow a document to one tab: exact id first, then a case-insensitive
/// trimmed title. Without a reference the main body is used.
pub fn resolve<'a>(document: &'a Document, reference: Option<&str>) -> Result<Target<'a>> {
    let Some(reference) = reference else {
        return Ok(Target {
            tab_id: None,
            content: default_content(document),
        });
    };

    let tab = find_tab(document, reference)
        .ok_or_else(|| Error::not_found(NotFoundKind::Tab, reference))?;
    Ok(Target {
        tab_id: Some(tab.tab_id.as_str()),
        content: &tab.content,
    })
}

/// First tab matching `reference` by id, else by title.
pub fn find_tab<'a>(document: &'a Document, reference: &str) -> Option<&'a Tab> {
    let tabs = document.all_tabs();
    let title = reference.trim().to_lowercase();
    tabs.iter()
        .find(|(tab, _)| tab.tab_id == reference)
        .or_else(|| {
            tabs.iter()
                .find(|(tab, _)| tab.title.trim().to_lowercase() == title)
        })
        .map(|(tab, _)| *tab)
}

/// Documents fetched with tabs may leave the legacy body empty; the first tab
/// then holds the main content.
fn default_content(document: &Document) -> &[StructuralElement] {
    match document.tabs.first() {
        Some(tab) if document.content.is_empty() => &tab.content,
        _ => &document.content,
    }
}

/// Mutable body addressed by an edit's tab id.
pub fn content_mut<'a>(
    document: &'a mut Document,
    tab_id: Option<&str>,
) -> Option<&'a mut Vec<StructuralElement>> {
    fn by_id<'t>(tabs: &'t mut [Tab], id: &str) -> Option<&'t mut Tab> {
        for tab in tabs {
            if tab.tab_id == id {
                return Some(tab);
            }
            if let Some(found) = by_id(&mut tab.child_tabs, id) {
                return Some(found);
            }
        }
        None
    }

    match tab_id {
        Some(id) => by_id(&mut document.tabs, id).map(|tab| &mut tab.content),
        None if document.content.is_empty() && !document.tabs.is_empty() => {
            document.tabs.first_mut().map(|tab| &mut tab.content)
        }
        None => Some(&mut document.content),
    }
}
