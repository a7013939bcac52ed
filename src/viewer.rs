//! Viewer session: boot sequence and UI projection

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use serde::Serialize;

use crate::params::ViewerParams;
use crate::pdf::{
    Command, DisplayedPage, DocumentBackend, DocumentHandle, DocumentSet, Navigator, RenderEvent,
    RenderScheduler, ViewState, ViewerError,
};
use crate::settings::Settings;

/// Whether an error happened while booting or while rendering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Load,
    Render,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBanner {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorBanner {
    #[must_use]
    pub fn from_error(error: &ViewerError) -> Self {
        Self {
            kind: if error.is_load() {
                ErrorKind::Load
            } else {
                ErrorKind::Render
            },
            message: error.framed_message(),
        }
    }
}

/// Everything the presentation layer shows
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UiState {
    /// Global page of the last published render
    pub page_number: Option<usize>,
    pub page_count: usize,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub busy: bool,
    pub scale: Option<f32>,
    pub error: Option<ErrorBanner>,
    pub external_link: Option<String>,
}

impl UiState {
    /// State shown when boot failed and no session exists
    #[must_use]
    pub fn load_failed(error: &ViewerError, external_link: Option<String>) -> Self {
        Self {
            page_number: None,
            page_count: 0,
            prev_enabled: false,
            next_enabled: false,
            busy: false,
            scale: None,
            error: Some(ErrorBanner::from_error(error)),
            external_link,
        }
    }
}

/// Counters as of the last published render
#[derive(Clone, Copy, Debug, Default)]
struct Counters {
    page_number: Option<usize>,
    prev_enabled: bool,
    next_enabled: bool,
}

/// One viewer instance over an opened document set
pub struct Viewer<D> {
    navigator: Navigator<D>,
    params: ViewerParams,
    zoom_step: f32,
    counters: Counters,
}

impl<D: DocumentHandle> Viewer<D> {
    /// Open all sources and request the first page.
    ///
    /// Any source failing to open aborts the boot; no partial session is kept.
    pub fn boot<B>(backend: &B, params: ViewerParams, settings: &Settings) -> Result<Self, ViewerError>
    where
        B: DocumentBackend<Document = D>,
    {
        info!("Booting viewer with {} source(s)", params.sources.len());
        let documents = DocumentSet::open(backend, &params.sources).map_err(|e| {
            error!("Boot failed: {e}");
            ViewerError::from(e)
        })?;

        let scheduler = RenderScheduler::new(Arc::new(documents), settings.scheduler_config())?;
        let navigator = Navigator::new(
            scheduler,
            settings.initial_scale,
            settings.default_container,
        );

        let mut viewer = Self {
            navigator,
            params,
            zoom_step: settings.zoom_step(),
            counters: Counters::default(),
        };
        viewer.navigator.go_to(1);
        Ok(viewer)
    }

    #[must_use]
    pub fn state(&self) -> &ViewState {
        self.navigator.state()
    }

    #[must_use]
    pub fn displayed(&self) -> Option<&DisplayedPage> {
        self.navigator.scheduler().displayed()
    }

    pub fn apply(&mut self, cmd: Command) {
        self.navigator.apply(cmd);
    }

    pub fn next(&mut self) {
        self.navigator.next();
    }

    pub fn prev(&mut self) {
        self.navigator.prev();
    }

    pub fn go_to(&mut self, page: usize) {
        self.navigator.go_to(page);
    }

    pub fn zoom_in(&mut self) {
        self.navigator.zoom(self.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.navigator.zoom(-self.zoom_step);
    }

    /// Collect finished renders without blocking
    pub fn poll(&mut self) -> Vec<RenderEvent> {
        let events = self.navigator.poll();
        self.absorb(&events);
        events
    }

    /// Block until the current render settles or `max_wait` passes
    pub fn wait_idle(&mut self, max_wait: Duration) -> Vec<RenderEvent> {
        let events = self.navigator.wait_idle(max_wait);
        self.absorb(&events);
        events
    }

    fn absorb(&mut self, events: &[RenderEvent]) {
        let total = self.state().total_pages;
        for event in events {
            if let RenderEvent::Published(page) = event {
                self.counters = Counters {
                    page_number: Some(page.global_page),
                    prev_enabled: page.global_page > 1,
                    next_enabled: page.global_page < total,
                };
            }
        }
    }

    #[must_use]
    pub fn ui_state(&self) -> UiState {
        let scheduler = self.navigator.scheduler();
        UiState {
            page_number: self.counters.page_number,
            page_count: self.state().total_pages,
            prev_enabled: self.counters.prev_enabled,
            next_enabled: self.counters.next_enabled,
            busy: scheduler.is_busy(),
            scale: self.displayed().map(|page| page.surface.scale),
            error: scheduler
                .last_error()
                .map(|e| ErrorBanner::from_error(&ViewerError::Render(e.clone()))),
            external_link: self.params.external_link.clone(),
        }
    }
}
