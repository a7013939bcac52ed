//! Scripted in-memory backend for tests
//!
//! Documents are plain page counts. Pages paint a marker pixel identifying
//! `(document id, local page)`, and can be made to fail, to block on a gate,
//! or to ignore cancellation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};

use crate::pdf::{
    CancellationToken, DocumentBackend, DocumentHandle, LoadError, PageError, PageHandle,
    PageSize, RenderError, Surface,
};

const MARKER_TAG: u8 = 0x5A;
const GATE_POLL: Duration = Duration::from_millis(2);

/// Backend serving [`ScriptedDocument`]s by source name
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    documents: HashMap<String, ScriptedDocument>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, source: &str, document: ScriptedDocument) -> Self {
        self.documents.insert(source.to_string(), document);
        self
    }
}

impl DocumentBackend for ScriptedBackend {
    type Document = ScriptedDocument;

    fn open(&self, source: &str) -> Result<ScriptedDocument, LoadError> {
        self.documents
            .get(source)
            .cloned()
            .ok_or_else(|| LoadError::open(source, "no such document"))
    }
}

/// Blocks a page raster until released
#[derive(Clone)]
pub struct Gate {
    release_tx: Sender<()>,
    release_rx: Receiver<()>,
    entered_tx: Sender<()>,
    entered_rx: Receiver<()>,
}

impl Gate {
    pub fn new() -> Self {
        let (release_tx, release_rx) = flume::unbounded();
        let (entered_tx, entered_rx) = flume::unbounded();
        Self {
            release_tx,
            release_rx,
            entered_tx,
            entered_rx,
        }
    }

    /// Let one blocked raster proceed
    pub fn release(&self) {
        let _ = self.release_tx.send(());
    }

    /// Wait until a raster has entered the gate
    pub fn wait_entered(&self, timeout: Duration) -> bool {
        self.entered_rx.recv_timeout(timeout).is_ok()
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct ScriptedDocument {
    id: u8,
    page_count: usize,
    page_size: PageSize,
    failing_pages: HashSet<usize>,
    failing_rasters: HashSet<usize>,
    gates: HashMap<usize, Gate>,
    ignore_cancel: bool,
    renders: Arc<AtomicUsize>,
}

impl ScriptedDocument {
    pub fn new(page_count: usize) -> Self {
        Self {
            id: 0,
            page_count,
            page_size: PageSize::new(612.0, 792.0),
            failing_pages: HashSet::new(),
            failing_rasters: HashSet::new(),
            gates: HashMap::new(),
            ignore_cancel: false,
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Marker painted by page `local_page` of document `id`
    pub fn marker(id: u8, local_page: usize) -> (u8, u8, u8) {
        (id, local_page as u8, MARKER_TAG)
    }

    pub fn with_id(mut self, id: u8) -> Self {
        self.id = id;
        self
    }

    pub fn with_page_size(mut self, size: PageSize) -> Self {
        self.page_size = size;
        self
    }

    /// Loading `local_page` fails with a [`PageError`]
    pub fn failing_page(mut self, local_page: usize) -> Self {
        self.failing_pages.insert(local_page);
        self
    }

    /// Rasterizing `local_page` fails with a [`RenderError`]
    pub fn failing_raster(mut self, local_page: usize) -> Self {
        self.failing_rasters.insert(local_page);
        self
    }

    /// Rasterizing `local_page` blocks on `gate`
    pub fn gated_page(mut self, local_page: usize, gate: &Gate) -> Self {
        self.gates.insert(local_page, gate.clone());
        self
    }

    /// Gated rasters keep waiting even after cancellation
    pub fn ignoring_cancel(mut self) -> Self {
        self.ignore_cancel = true;
        self
    }

    /// Number of rasters started on this document (shared across clones)
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl DocumentHandle for ScriptedDocument {
    type Page = ScriptedPage;

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page(&self, local_page: usize) -> Result<ScriptedPage, PageError> {
        if local_page == 0 || local_page > self.page_count {
            return Err(PageError::OutOfRange {
                page: local_page,
                page_count: self.page_count,
            });
        }
        if self.failing_pages.contains(&local_page) {
            return Err(PageError::Engine {
                page: local_page,
                detail: "scripted page failure".to_string(),
            });
        }

        Ok(ScriptedPage {
            marker: Self::marker(self.id, local_page),
            size: self.page_size,
            fail_raster: self.failing_rasters.contains(&local_page),
            gate: self.gates.get(&local_page).cloned(),
            ignore_cancel: self.ignore_cancel,
            renders: Arc::clone(&self.renders),
        })
    }
}

pub struct ScriptedPage {
    marker: (u8, u8, u8),
    size: PageSize,
    fail_raster: bool,
    gate: Option<Gate>,
    ignore_cancel: bool,
    renders: Arc<AtomicUsize>,
}

impl PageHandle for ScriptedPage {
    fn intrinsic_size(&self) -> PageSize {
        self.size
    }

    fn render(
        &self,
        surface: &mut Surface,
        _scale: f32,
        cancel: &CancellationToken,
    ) -> Result<(), RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let _ = gate.entered_tx.send(());
            loop {
                if cancel.is_cancelled() && !self.ignore_cancel {
                    return Err(RenderError::Cancelled);
                }
                match gate.release_rx.recv_timeout(GATE_POLL) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }

        if self.fail_raster {
            return Err(RenderError::raster("scripted raster failure"));
        }

        if surface.pixels.len() >= 3 {
            surface.pixels[0] = self.marker.0;
            surface.pixels[1] = self.marker.1;
            surface.pixels[2] = self.marker.2;
        }
        Ok(())
    }
}

/// Marker of the page painted into `surface`, if any
pub fn painted_marker(surface: &Surface) -> Option<(u8, u8, u8)> {
    match surface.pixels.get(..3) {
        Some(&[r, g, MARKER_TAG]) => Some((r, g, MARKER_TAG)),
        _ => None,
    }
}
