//! Boundary to the document-rendering library
//!
//! The viewer never decodes documents itself. A [`DocumentBackend`] opens
//! sources into [`DocumentHandle`]s, which hand out [`PageHandle`]s that can
//! paint themselves into a [`Surface`].

use super::cancel::CancellationToken;
use super::error::{LoadError, PageError, RenderError};
use super::types::{PageSize, Surface};

/// Opens document sources.
///
/// Opening runs in parallel at boot, so implementations must be shareable
/// across threads.
pub trait DocumentBackend: Send + Sync + 'static {
    type Document: DocumentHandle;

    fn open(&self, source: &str) -> Result<Self::Document, LoadError>;
}

/// One opened, page-based document.
///
/// Handles are read-only after opening and are shared with the raster
/// worker thread.
pub trait DocumentHandle: Send + Sync + 'static {
    type Page: PageHandle;

    fn page_count(&self) -> usize;

    /// Load a 1-based local page
    fn page(&self, local_page: usize) -> Result<Self::Page, PageError>;
}

/// A loaded page, ready to be rasterized
pub trait PageHandle {
    /// Size of the page at scale 1
    fn intrinsic_size(&self) -> PageSize;

    /// Paint the page into `surface` at `scale`.
    ///
    /// Implementations should poll `cancel` where they can and return
    /// [`RenderError::Cancelled`] once they observe it.
    fn render(
        &self,
        surface: &mut Surface,
        scale: f32,
        cancel: &CancellationToken,
    ) -> Result<(), RenderError>;
}
