use std::sync::Arc;

use super::error::SessionError;

/// Opaque document payload. Shared so that a broadcast does not copy it per receiver.
pub type DocumentBytes = Arc<[u8]>;

/// Point-in-time copy of the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub document: Option<DocumentBytes>,
    pub document_version: u64,
    pub page: u32,
}

/// Current document and page of the single session.
///
/// The store knows nothing about the document format, so it cannot know the page count.
/// Only the lower bound of a page is enforced here; clients clamp what they display.
#[derive(Debug)]
pub struct DocumentStore {
    document: Option<DocumentBytes>,
    document_version: u64,
    page: u32,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            document: None,
            document_version: 0,
            page: 1,
        }
    }

    /// Replace the document. Always resets the page to 1.
    pub fn replace_document(&mut self, document: DocumentBytes) -> u64 {
        self.document = Some(document);
        self.document_version += 1;
        self.page = 1;
        self.document_version
    }

    /// Set the current page. Values below 1, or beyond what a page number can hold, are rejected.
    pub fn set_page(&mut self, page: i64) -> Result<u32, SessionError> {
        if page < 1 {
            return Err(SessionError::PageOutOfRange(page));
        }
        let page = u32::try_from(page).map_err(|_| SessionError::PageOutOfRange(page))?;
        self.page = page;
        Ok(page)
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            document: self.document.clone(),
            document_version: self.document_version,
            page: self.page,
        }
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn document_size(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.len())
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
