//! Render scheduler - single-flight page rendering
//!
//! At most one raster is current. A new request cancels the one in flight and
//! takes over immediately; responses are matched against the current epoch
//! before anything is published, so a superseded raster that finishes late
//! can never overwrite the display.

use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, info, warn};

use super::backend::DocumentHandle;
use super::cancel::CancellationToken;
use super::document_set::DocumentSet;
use super::error::RenderError;
use super::locator::locate;
use super::request::{RasterJob, RasterRequest, RasterResponse, RequestId, ScaleSpec};
use super::types::{ContainerSize, Surface, ViewMode};
use super::worker::raster_worker;
use super::zoom::FIT_PADDING;

/// Scheduler tuning
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Padding around a fitted page, in CSS pixels
    pub fit_padding: f32,
    /// Device pixel ratio for backing stores
    pub pixel_ratio: f32,
    /// Give up on a render after this long; `None` waits forever
    pub render_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fit_padding: FIT_PADDING,
            pixel_ratio: 1.0,
            render_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Admission state of the scheduler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    Idle,
    Busy,
}

/// Page currently on display
#[derive(Clone, Debug)]
pub struct DisplayedPage {
    pub id: RequestId,
    pub global_page: usize,
    pub surface: Arc<Surface>,
}

/// Outcome of the current render, as seen by the host
#[derive(Debug)]
pub enum RenderEvent {
    Published(DisplayedPage),
    Failed {
        id: RequestId,
        global_page: usize,
        error: RenderError,
    },
}

#[derive(Debug)]
struct InFlight {
    id: RequestId,
    global_page: usize,
    cancel: CancellationToken,
    started: Instant,
}

/// Schedules page rasters on a dedicated worker thread
pub struct RenderScheduler<D> {
    documents: Arc<DocumentSet<D>>,
    request_tx: Sender<RasterRequest>,
    response_rx: Receiver<RasterResponse>,
    next_request_id: u64,
    in_flight: Option<InFlight>,
    displayed: Option<DisplayedPage>,
    last_error: Option<RenderError>,
    config: SchedulerConfig,
}

impl<D: DocumentHandle> RenderScheduler<D> {
    /// Start the raster worker over a read-only document set
    pub fn new(documents: Arc<DocumentSet<D>>, config: SchedulerConfig) -> std::io::Result<Self> {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let worker_documents = Arc::clone(&documents);
        std::thread::Builder::new()
            .name("raster-worker".into())
            .spawn(move || raster_worker(worker_documents, request_rx, response_tx))?;

        Ok(Self {
            documents,
            request_tx,
            response_rx,
            next_request_id: 1,
            in_flight: None,
            displayed: None,
            last_error: None,
            config,
        })
    }

    #[must_use]
    pub fn documents(&self) -> &DocumentSet<D> {
        &self.documents
    }

    #[must_use]
    pub fn status(&self) -> RenderStatus {
        if self.in_flight.is_some() {
            RenderStatus::Busy
        } else {
            RenderStatus::Idle
        }
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.status() == RenderStatus::Busy
    }

    /// Page on display, if any render has completed
    #[must_use]
    pub fn displayed(&self) -> Option<&DisplayedPage> {
        self.displayed.as_ref()
    }

    /// Error from the most recent render, cleared by the next request
    #[must_use]
    pub fn last_error(&self) -> Option<&RenderError> {
        self.last_error.as_ref()
    }

    /// Show `global_page` now, superseding any render in flight.
    ///
    /// Returns `None` when there is nothing to render.
    pub fn request(
        &mut self,
        global_page: usize,
        mode: ViewMode,
        container: ContainerSize,
    ) -> Option<RequestId> {
        let total_pages = self.documents.total_pages();
        if total_pages == 0 {
            debug!("Ignoring render request: document set has no pages");
            return None;
        }

        if let Some(previous) = self.in_flight.take() {
            debug!(
                "Cancelling render {} of page {}",
                previous.id, previous.global_page
            );
            previous.cancel.cancel();
        }
        self.last_error = None;

        let id = self.next_id();
        let global_page = global_page.clamp(1, total_pages);
        let location = locate(global_page, self.documents.page_offsets(), total_pages);
        let scale = match mode {
            ViewMode::Fit => ScaleSpec::Fit {
                container,
                padding: self.config.fit_padding,
            },
            ViewMode::Manual(scale) => ScaleSpec::Manual(scale),
        };
        let cancel = CancellationToken::new();

        debug!(
            "Render {id}: page {global_page} -> document {} page {} ({scale:?})",
            location.doc_index, location.local_page
        );

        let job = RasterJob {
            id,
            global_page,
            location,
            scale,
            pixel_ratio: self.config.pixel_ratio,
            cancel: cancel.clone(),
        };
        if self.request_tx.send(RasterRequest::Render(job)).is_err() {
            warn!("Raster worker is gone, cannot render page {global_page}");
            self.last_error = Some(RenderError::WorkerGone);
            return None;
        }

        self.in_flight = Some(InFlight {
            id,
            global_page,
            cancel,
            started: Instant::now(),
        });
        Some(id)
    }

    /// Collect finished renders without blocking
    pub fn poll(&mut self) -> Vec<RenderEvent> {
        let mut events = Vec::new();

        loop {
            match self.response_rx.try_recv() {
                Ok(response) => self.handle_response(response, &mut events),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.fail_in_flight(RenderError::WorkerGone, &mut events);
                    break;
                }
            }
        }

        self.check_timeout(&mut events);
        events
    }

    /// Block until the scheduler is idle or `max_wait` has passed
    pub fn wait_idle(&mut self, max_wait: Duration) -> Vec<RenderEvent> {
        let deadline = Instant::now() + max_wait;
        let mut events = self.poll();

        while self.is_busy() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let mut wait = deadline - now;
            if let Some(expiry) = self.timeout_at() {
                wait = wait.min(expiry.saturating_duration_since(now));
            }

            match self.response_rx.recv_timeout(wait) {
                Ok(response) => self.handle_response(response, &mut events),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.fail_in_flight(RenderError::WorkerGone, &mut events);
                    break;
                }
            }
            self.check_timeout(&mut events);
        }

        events
    }

    fn handle_response(&mut self, response: RasterResponse, events: &mut Vec<RenderEvent>) {
        let id = response.id();
        let current = self.in_flight.as_ref().is_some_and(|f| f.id == id);
        if !current {
            debug!("Discarding stale response for render {id}");
            return;
        }

        let Some(in_flight) = self.in_flight.take() else {
            return;
        };

        match response {
            RasterResponse::Rendered {
                id,
                global_page,
                surface,
            } => {
                info!(
                    "Render {id}: published page {global_page} ({}x{} px, scale {:.3}) in {:?}",
                    surface.width_px,
                    surface.height_px,
                    surface.scale,
                    in_flight.started.elapsed()
                );
                let page = DisplayedPage {
                    id,
                    global_page,
                    surface,
                };
                self.displayed = Some(page.clone());
                events.push(RenderEvent::Published(page));
            }

            RasterResponse::Failed { error, .. } if error.is_cancelled() => {
                debug!("Render {id} cancelled");
            }

            RasterResponse::Failed { id, error } => {
                self.last_error = Some(error.clone());
                events.push(RenderEvent::Failed {
                    id,
                    global_page: in_flight.global_page,
                    error,
                });
            }
        }
    }

    fn timeout_at(&self) -> Option<Instant> {
        let timeout = self.config.render_timeout?;
        self.in_flight.as_ref().map(|f| f.started + timeout)
    }

    fn check_timeout(&mut self, events: &mut Vec<RenderEvent>) {
        let Some(timeout) = self.config.render_timeout else {
            return;
        };
        if self
            .timeout_at()
            .is_some_and(|expiry| Instant::now() >= expiry)
        {
            if let Some(in_flight) = &self.in_flight {
                warn!(
                    "Render {} of page {} timed out after {timeout:?}",
                    in_flight.id, in_flight.global_page
                );
            }
            self.fail_in_flight(RenderError::TimedOut(timeout), events);
        }
    }

    fn fail_in_flight(&mut self, error: RenderError, events: &mut Vec<RenderEvent>) {
        let Some(in_flight) = self.in_flight.take() else {
            return;
        };
        in_flight.cancel.cancel();
        self.last_error = Some(error.clone());
        events.push(RenderEvent::Failed {
            id: in_flight.id,
            global_page: in_flight.global_page,
            error,
        });
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl<D> Drop for RenderScheduler<D> {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }
        let _ = self.request_tx.send(RasterRequest::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{PageError, PageSize};
    use crate::test_utils::{Gate, ScriptedDocument, painted_marker};

    const WAIT: Duration = Duration::from_secs(5);

    fn scheduler(documents: Vec<ScriptedDocument>) -> RenderScheduler<ScriptedDocument> {
        RenderScheduler::new(
            Arc::new(DocumentSet::from_documents(documents)),
            SchedulerConfig::default(),
        )
        .unwrap()
    }

    fn published_pages(events: &[RenderEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Published(page) => Some(page.global_page),
                RenderEvent::Failed { .. } => None,
            })
            .collect()
    }

    #[test]
    fn request_publishes_owning_document_page() {
        let mut scheduler = scheduler(vec![
            ScriptedDocument::new(3).with_id(0),
            ScriptedDocument::new(5).with_id(1),
        ]);

        scheduler.request(4, ViewMode::Manual(1.0), ContainerSize::default());
        assert!(scheduler.is_busy());

        let events = scheduler.wait_idle(WAIT);
        assert_eq!(published_pages(&events), vec![4]);
        assert_eq!(scheduler.status(), RenderStatus::Idle);

        let displayed = scheduler.displayed().unwrap();
        assert_eq!(
            painted_marker(&displayed.surface),
            Some(ScriptedDocument::marker(1, 1))
        );
    }

    #[test]
    fn fit_mode_sizes_surface_to_container() {
        let mut scheduler = scheduler(vec![
            ScriptedDocument::new(1).with_page_size(PageSize::new(100.0, 200.0)),
        ]);

        scheduler.request(1, ViewMode::Fit, ContainerSize::new(236.0, 436.0));
        scheduler.wait_idle(WAIT);

        let surface = &scheduler.displayed().unwrap().surface;
        assert_eq!((surface.width_px, surface.height_px), (200, 400));
        assert_eq!(surface.scale, 2.0);
    }

    #[test]
    fn second_request_supersedes_first() {
        let gate = Gate::new();
        let mut scheduler = scheduler(vec![ScriptedDocument::new(8).gated_page(1, &gate)]);

        let first = scheduler
            .request(1, ViewMode::Fit, ContainerSize::default())
            .unwrap();
        assert!(gate.wait_entered(WAIT));
        let second = scheduler
            .request(2, ViewMode::Fit, ContainerSize::default())
            .unwrap();
        assert!(second > first);

        let events = scheduler.wait_idle(WAIT);
        assert_eq!(published_pages(&events), vec![2]);
        assert!(scheduler.last_error().is_none());
        assert_eq!(scheduler.displayed().unwrap().id, second);
    }

    #[test]
    fn late_result_from_superseded_render_is_discarded() {
        let gate = Gate::new();
        let document = ScriptedDocument::new(8)
            .gated_page(1, &gate)
            .ignoring_cancel();
        let mut scheduler = scheduler(vec![document.clone()]);

        scheduler.request(1, ViewMode::Fit, ContainerSize::default());
        assert!(gate.wait_entered(WAIT));
        scheduler.request(3, ViewMode::Fit, ContainerSize::default());

        // The first raster ignores its cancel and runs to the end anyway
        gate.release();

        let events = scheduler.wait_idle(WAIT);
        assert_eq!(published_pages(&events), vec![3]);
        assert_eq!(scheduler.displayed().unwrap().global_page, 3);
        assert_eq!(document.renders(), 2);
    }

    #[test]
    fn stale_rendered_response_is_not_published() {
        let gate = Gate::new();
        let mut scheduler = scheduler(vec![ScriptedDocument::new(4).gated_page(2, &gate)]);

        let stale = scheduler
            .request(1, ViewMode::Fit, ContainerSize::default())
            .unwrap();
        scheduler.request(2, ViewMode::Fit, ContainerSize::default());

        let mut events = Vec::new();
        scheduler.handle_response(
            RasterResponse::Rendered {
                id: stale,
                global_page: 1,
                surface: Arc::new(Surface::new(1, 1, 1.0, 1.0)),
            },
            &mut events,
        );

        assert!(events.is_empty());
        assert!(scheduler.displayed().is_none());
        assert!(scheduler.is_busy());

        gate.release();
        let events = scheduler.wait_idle(WAIT);
        assert_eq!(published_pages(&events), vec![2]);
    }

    #[test]
    fn page_error_keeps_previous_display() {
        let mut scheduler = scheduler(vec![ScriptedDocument::new(3).failing_page(2)]);

        scheduler.request(1, ViewMode::Fit, ContainerSize::default());
        scheduler.wait_idle(WAIT);

        scheduler.request(2, ViewMode::Fit, ContainerSize::default());
        let events = scheduler.wait_idle(WAIT);

        assert!(matches!(
            events.as_slice(),
            [RenderEvent::Failed {
                global_page: 2,
                error: RenderError::Page(PageError::Engine { .. }),
                ..
            }]
        ));
        assert!(!scheduler.is_busy());
        assert_eq!(scheduler.displayed().unwrap().global_page, 1);
    }

    #[test]
    fn raster_error_is_cleared_by_next_request() {
        let mut scheduler = scheduler(vec![ScriptedDocument::new(3).failing_raster(2)]);

        scheduler.request(2, ViewMode::Fit, ContainerSize::default());
        scheduler.wait_idle(WAIT);
        assert!(matches!(
            scheduler.last_error(),
            Some(RenderError::Raster { .. })
        ));

        scheduler.request(3, ViewMode::Fit, ContainerSize::default());
        assert!(scheduler.last_error().is_none());
        scheduler.wait_idle(WAIT);
        assert_eq!(scheduler.displayed().unwrap().global_page, 3);
    }

    #[test]
    fn hung_render_times_out_and_returns_to_idle() {
        let gate = Gate::new();
        let documents = Arc::new(DocumentSet::from_documents(vec![
            ScriptedDocument::new(2).gated_page(1, &gate),
        ]));
        let config = SchedulerConfig {
            render_timeout: Some(Duration::from_millis(50)),
            ..SchedulerConfig::default()
        };
        let mut scheduler = RenderScheduler::new(documents, config).unwrap();

        scheduler.request(1, ViewMode::Fit, ContainerSize::default());
        let events = scheduler.wait_idle(WAIT);

        assert!(matches!(
            events.as_slice(),
            [RenderEvent::Failed {
                error: RenderError::TimedOut(_),
                ..
            }]
        ));
        assert!(!scheduler.is_busy());

        // The worker is free again once the cancelled raster unwinds
        scheduler.request(2, ViewMode::Fit, ContainerSize::default());
        let events = scheduler.wait_idle(WAIT);
        assert_eq!(published_pages(&events), vec![2]);
    }

    #[test]
    fn empty_document_set_ignores_requests() {
        let mut scheduler = scheduler(vec![ScriptedDocument::new(0)]);
        assert!(
            scheduler
                .request(1, ViewMode::Fit, ContainerSize::default())
                .is_none()
        );
        assert!(!scheduler.is_busy());
    }

    #[test]
    fn dropping_scheduler_cancels_render_and_stops_worker() {
        let gate = Gate::new();
        let documents = Arc::new(DocumentSet::from_documents(vec![
            ScriptedDocument::new(1).gated_page(1, &gate),
        ]));
        let mut scheduler =
            RenderScheduler::new(Arc::clone(&documents), SchedulerConfig::default()).unwrap();

        scheduler.request(1, ViewMode::Fit, ContainerSize::default());
        assert!(gate.wait_entered(WAIT));
        drop(scheduler);

        // The gate is never released, so the worker only lets go of the
        // documents if the raster observed its cancel
        let deadline = Instant::now() + WAIT;
        while Arc::strong_count(&documents) > 1 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(Arc::strong_count(&documents), 1);
    }
}
