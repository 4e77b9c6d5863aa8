//! The document renderer the agent drives, and the tickets that keep stale renders off screen.

use thiserror::Error;

use crate::session::DocumentBytes;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot decode document: {0}")]
pub struct DecodeError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot render page {page}: {reason}")]
pub struct RenderError {
    pub page: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderFailure {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

pub trait DecodedDocument {
    fn page_count(&self) -> u32;
}

/// Turns document bytes into pixels on some surface. Implemented outside this crate.
pub trait DocumentRenderer {
    type Decoded: DecodedDocument;
    type Surface;

    fn decode(&self, document: &[u8]) -> Result<Self::Decoded, DecodeError>;

    fn render_page(
        &self,
        decoded: &Self::Decoded,
        page: u32,
        surface: &mut Self::Surface,
    ) -> Result<(), RenderError>;
}

/// The view a render was started for. A render is shown only if its ticket is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTicket {
    pub generation: u64,
    pub page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedPage {
    pub page_count: u32,
    /// Requested page clamped to the document, which may differ from the session page.
    pub shown_page: u32,
}

/// A complete document and the ticket it was taken under.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub ticket: RenderTicket,
    pub document: DocumentBytes,
}

impl RenderJob {
    /// Decode and draw. Holds no borrow on the agent, so broadcasts can land while it runs.
    pub fn run<R: DocumentRenderer>(
        &self,
        renderer: &R,
        surface: &mut R::Surface,
    ) -> Result<RenderedPage, RenderFailure> {
        let decoded = renderer.decode(&self.document)?;
        let page_count = decoded.page_count();
        let shown_page = clamp_page(self.ticket.page, page_count);
        renderer.render_page(&decoded, shown_page, surface)?;
        Ok(RenderedPage { page_count, shown_page })
    }
}

/// What happened to a finished render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Displayed(RenderedPage),
    Failed(RenderFailure),
    /// The document or page changed while rendering. Not an error.
    StaleDiscarded,
}

pub fn clamp_page(page: u32, page_count: u32) -> u32 {
    page.clamp(1, page_count.max(1))
}
