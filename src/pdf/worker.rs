//! Raster worker - runs in a dedicated thread
//!
//! Jobs are handled one at a time in arrival order, so two rasters never run
//! in parallel. A job whose token was cancelled before it starts is answered
//! with [`RenderError::Cancelled`] without touching the document.

use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, info, warn};

use super::backend::{DocumentHandle, PageHandle};
use super::document_set::DocumentSet;
use super::error::{PageError, RenderError};
use super::request::{RasterJob, RasterRequest, RasterResponse, ScaleSpec};
use super::types::{PageSize, Surface};
use super::zoom::fit_scale;

/// Largest backing store edge we will allocate, in pixels
const MAX_SURFACE_DIMENSION: f32 = 16_384.0;

/// Pre-computed rasterization parameters for a page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterSpec {
    /// Scale in CSS pixels per page unit
    pub scale: f32,
    /// Device pixel ratio applied on top of `scale`
    pub pixel_ratio: f32,
    pub width_px: u32,
    pub height_px: u32,
}

impl RasterSpec {
    #[must_use]
    pub fn compute(intrinsic: PageSize, scale: ScaleSpec, pixel_ratio: f32) -> Self {
        let scale = match scale {
            ScaleSpec::Fit { container, padding } => fit_scale(intrinsic, container, padding),
            ScaleSpec::Manual(scale) => scale,
        };

        let mut pixel_ratio = pixel_ratio;
        let backing = intrinsic.scaled(scale * pixel_ratio);
        let max_dim = backing.width.max(backing.height);
        if max_dim > MAX_SURFACE_DIMENSION {
            pixel_ratio *= MAX_SURFACE_DIMENSION / max_dim;
        }

        let backing = intrinsic.scaled(scale * pixel_ratio);
        Self {
            scale,
            pixel_ratio,
            width_px: (backing.width.floor() as u32).max(1),
            height_px: (backing.height.floor() as u32).max(1),
        }
    }

    /// Scale handed to the page raster, including the pixel ratio
    #[must_use]
    pub fn device_scale(&self) -> f32 {
        self.scale * self.pixel_ratio
    }
}

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub fn raster_worker<D: DocumentHandle>(
    documents: Arc<DocumentSet<D>>,
    requests: Receiver<RasterRequest>,
    responses: Sender<RasterResponse>,
) {
    for request in requests {
        match request {
            RasterRequest::Render(job) => {
                let id = job.id;
                let response = match render_job(&documents, &job) {
                    Ok(surface) => RasterResponse::Rendered {
                        id,
                        global_page: job.global_page,
                        surface: Arc::new(surface),
                    },
                    Err(error) => {
                        if !error.is_cancelled() {
                            warn!("Render {id} of page {} failed: {error}", job.global_page);
                        }
                        RasterResponse::Failed { id, error }
                    }
                };

                if responses.send(response).is_err() {
                    break; // scheduler dropped its receiver
                }
            }

            RasterRequest::Shutdown => break,
        }
    }
    info!("Raster worker thread exiting");
}

/// Acquire the page, size the surface and rasterize it
pub fn render_job<D: DocumentHandle>(
    documents: &DocumentSet<D>,
    job: &RasterJob,
) -> Result<Surface, RenderError> {
    if job.cancel.is_cancelled() {
        debug!("Render {} cancelled before start", job.id);
        return Err(RenderError::Cancelled);
    }

    let location = job.location;
    let document = documents
        .document(location.doc_index)
        .ok_or(PageError::OutOfRange {
            page: job.global_page,
            page_count: documents.total_pages(),
        })?;
    let page = document.page(location.local_page)?;

    if job.cancel.is_cancelled() {
        debug!("Render {} cancelled after page acquisition", job.id);
        return Err(RenderError::Cancelled);
    }

    let spec = RasterSpec::compute(page.intrinsic_size(), job.scale, job.pixel_ratio);
    let mut surface = Surface::new(spec.width_px, spec.height_px, spec.scale, spec.pixel_ratio);
    page.render(&mut surface, spec.device_scale(), &job.cancel)?;

    if job.cancel.is_cancelled() {
        return Err(RenderError::Cancelled);
    }

    Ok(surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::CancellationToken;
    use crate::pdf::request::RequestId;
    use crate::pdf::types::{ContainerSize, PageLocation};
    use crate::test_utils::ScriptedDocument;

    fn job(location: PageLocation, scale: ScaleSpec) -> RasterJob {
        RasterJob {
            id: RequestId::new(1),
            global_page: 1,
            location,
            scale,
            pixel_ratio: 1.0,
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn spec_floors_surface_dimensions() {
        let spec = RasterSpec::compute(PageSize::new(100.0, 50.0), ScaleSpec::Manual(1.15), 1.0);
        assert_eq!((spec.width_px, spec.height_px), (114, 57));
        assert_eq!(spec.scale, 1.15);
    }

    #[test]
    fn spec_applies_pixel_ratio_to_backing_store_only() {
        let spec = RasterSpec::compute(PageSize::new(100.0, 50.0), ScaleSpec::Manual(1.0), 2.0);
        assert_eq!((spec.width_px, spec.height_px), (200, 100));
        assert_eq!(spec.scale, 1.0);
        assert_eq!(spec.device_scale(), 2.0);
    }

    #[test]
    fn spec_fit_uses_container() {
        let spec = RasterSpec::compute(
            PageSize::new(100.0, 100.0),
            ScaleSpec::Fit {
                container: ContainerSize::new(236.0, 436.0),
                padding: 18.0,
            },
            1.0,
        );
        assert_eq!(spec.scale, 2.0);
        assert_eq!((spec.width_px, spec.height_px), (200, 200));
    }

    #[test]
    fn spec_caps_huge_surfaces() {
        let spec = RasterSpec::compute(PageSize::new(10_000.0, 5_000.0), ScaleSpec::Manual(4.0), 2.0);
        assert!(spec.width_px as f32 <= MAX_SURFACE_DIMENSION);
        assert_eq!(spec.scale, 4.0);
    }

    #[test]
    fn render_job_paints_requested_page() {
        let documents = DocumentSet::from_documents(vec![
            ScriptedDocument::new(3),
            ScriptedDocument::new(5).with_id(1),
        ]);
        let surface = render_job(
            &documents,
            &job(PageLocation::new(1, 2), ScaleSpec::Manual(1.0)),
        )
        .unwrap();

        assert_eq!(
            crate::test_utils::painted_marker(&surface),
            Some(ScriptedDocument::marker(1, 2))
        );
    }

    #[test]
    fn render_job_reports_page_errors() {
        let documents = DocumentSet::from_documents(vec![ScriptedDocument::new(3).failing_page(2)]);
        let err = render_job(&documents, &job(PageLocation::new(0, 2), ScaleSpec::Manual(1.0)))
            .unwrap_err();
        assert!(matches!(err, RenderError::Page(PageError::Engine { page: 2, .. })));
    }

    #[test]
    fn render_job_honours_cancel_before_start() {
        let documents = DocumentSet::from_documents(vec![ScriptedDocument::new(3)]);
        let job = job(PageLocation::new(0, 1), ScaleSpec::Manual(1.0));
        job.cancel.cancel();
        assert!(render_job(&documents, &job).unwrap_err().is_cancelled());
    }
}
