//! MuPDF-backed documents
//!
//! MuPDF documents are not shared between threads. A [`MupdfDocument`] only
//! records where the file lives and how many pages it has; each thread that
//! loads pages opens its own copy, kept for the life of the thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;

use log::debug;
use mupdf::{Colorspace, Document, Matrix, Page, Pixmap};
use url::Url;

use super::backend::{DocumentBackend, DocumentHandle, PageHandle};
use super::cancel::CancellationToken;
use super::error::{LoadError, PageError, RenderError};
use super::types::{PageSize, Surface};

thread_local! {
    static OPEN_DOCUMENTS: RefCell<HashMap<PathBuf, Document>> = RefCell::new(HashMap::new());
}

/// Opens local PDF files (plain paths or `file://` URLs)
#[derive(Clone, Copy, Debug, Default)]
pub struct MupdfBackend;

impl MupdfBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Resolve a source reference to a local path
pub fn local_path(source: &str) -> Result<PathBuf, LoadError> {
    match Url::parse(source) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map_err(|()| LoadError::open(source, "not a valid file URL")),
        // Single letters are Windows drive prefixes, not schemes
        Ok(url) if url.scheme().len() > 1 => Err(LoadError::Remote {
            location: source.to_string(),
        }),
        _ => Ok(PathBuf::from(source)),
    }
}

impl DocumentBackend for MupdfBackend {
    type Document = MupdfDocument;

    fn open(&self, source: &str) -> Result<MupdfDocument, LoadError> {
        let path = local_path(source)?;
        if !path.is_file() {
            return Err(LoadError::open(source, "file not found"));
        }

        let doc = Document::open(path.to_string_lossy().as_ref())
            .map_err(|e| LoadError::open(source, e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| LoadError::open(source, e.to_string()))?;

        debug!("Opened {} ({page_count} pages)", path.display());
        Ok(MupdfDocument {
            path,
            page_count: page_count.max(0) as usize,
        })
    }
}

/// An opened PDF, identified by its path
#[derive(Clone, Debug)]
pub struct MupdfDocument {
    path: PathBuf,
    page_count: usize,
}

impl DocumentHandle for MupdfDocument {
    type Page = MupdfPage;

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page(&self, local_page: usize) -> Result<MupdfPage, PageError> {
        if local_page == 0 || local_page > self.page_count {
            return Err(PageError::OutOfRange {
                page: local_page,
                page_count: self.page_count,
            });
        }

        let engine = |e: mupdf::error::Error| PageError::Engine {
            page: local_page,
            detail: e.to_string(),
        };

        let page = OPEN_DOCUMENTS.with(|docs| -> Result<Page, PageError> {
            let mut docs = docs.borrow_mut();
            let doc = match docs.entry(self.path.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let doc = Document::open(self.path.to_string_lossy().as_ref()).map_err(engine)?;
                    entry.insert(doc)
                }
            };
            doc.load_page(local_page as i32 - 1).map_err(engine)
        })?;

        let bounds = page.bounds().map_err(engine)?;
        Ok(MupdfPage {
            page,
            size: PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0),
        })
    }
}

pub struct MupdfPage {
    page: Page,
    size: PageSize,
}

impl PageHandle for MupdfPage {
    fn intrinsic_size(&self) -> PageSize {
        self.size
    }

    fn render(
        &self,
        surface: &mut Surface,
        scale: f32,
        cancel: &CancellationToken,
    ) -> Result<(), RenderError> {
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }

        let rgb = Colorspace::device_rgb();
        let pixmap = self
            .page
            .to_pixmap(&Matrix::new_scale(scale, scale), &rgb, false, false)
            .map_err(|e| RenderError::raster(format!("PDF engine: {e}")))?;

        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }

        copy_pixmap(&pixmap, surface)
    }
}

fn copy_pixmap(pixmap: &Pixmap, surface: &mut Surface) -> Result<(), RenderError> {
    copy_samples(
        pixmap.samples(),
        pixmap.width() as usize,
        pixmap.height() as usize,
        pixmap.n() as usize,
        surface,
    )
}

/// Copy packed samples with `n` channels into the RGB surface, clipping to
/// the smaller of the two. Channels past the third (alpha) are dropped.
fn copy_samples(
    samples: &[u8],
    width: usize,
    height: usize,
    n: usize,
    surface: &mut Surface,
) -> Result<(), RenderError> {
    if n < 3 {
        return Err(RenderError::raster(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let stride = width * n;
    if samples.len() < stride.saturating_mul(height) {
        return Err(RenderError::raster("Pixmap buffer size mismatch"));
    }

    let copy_width = width.min(surface.width_px as usize);
    let copy_height = height.min(surface.height_px as usize);
    let out_stride = surface.stride();

    for y in 0..copy_height {
        let row = &samples[y * stride..y * stride + copy_width * n];
        let out = &mut surface.pixels[y * out_stride..y * out_stride + copy_width * 3];
        if n == 3 {
            out.copy_from_slice(row);
        } else {
            for (dst, px) in out.chunks_exact_mut(3).zip(row.chunks_exact(n)) {
                dst.copy_from_slice(&px[..3]);
            }
        }
    }

    Ok(())
}
