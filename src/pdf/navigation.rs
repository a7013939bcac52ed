//! Navigation controller
//!
//! Translates intents into state changes and render requests.

use std::time::Duration;

use log::debug;

use super::backend::DocumentHandle;
use super::request::RequestId;
use super::service::{RenderEvent, RenderScheduler};
use super::state::{Command, Effect, ViewState};
use super::types::ContainerSize;

/// Owns the session state and the scheduler of one viewer
pub struct Navigator<D> {
    state: ViewState,
    scheduler: RenderScheduler<D>,
}

impl<D: DocumentHandle> Navigator<D> {
    #[must_use]
    pub fn new(scheduler: RenderScheduler<D>, initial_scale: f32, container: ContainerSize) -> Self {
        let total_pages = scheduler.documents().total_pages();
        Self {
            state: ViewState::new(total_pages, initial_scale, container),
            scheduler,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub fn scheduler(&self) -> &RenderScheduler<D> {
        &self.scheduler
    }

    /// Apply a command to the session state and carry out its effects.
    ///
    /// Returns the id of the render request issued, if any.
    pub fn apply(&mut self, cmd: Command) -> Option<RequestId> {
        debug!("Navigation command {cmd:?}");
        let effects = self.state.apply(cmd);
        self.execute_effects(effects)
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) -> Option<RequestId> {
        let mut issued = None;
        for effect in effects {
            match effect {
                Effect::RenderCurrentPage => {
                    issued = self.scheduler.request(
                        self.state.cursor,
                        self.state.view_mode(),
                        self.state.container,
                    );
                }
            }
        }
        issued
    }

    pub fn go_to(&mut self, page: usize) -> Option<RequestId> {
        self.apply(Command::GoToPage(page))
    }

    pub fn next(&mut self) -> Option<RequestId> {
        self.apply(Command::NextPage)
    }

    pub fn prev(&mut self) -> Option<RequestId> {
        self.apply(Command::PrevPage)
    }

    pub fn zoom(&mut self, delta: f32) -> Option<RequestId> {
        self.apply(Command::Zoom(delta))
    }

    pub fn fit(&mut self) -> Option<RequestId> {
        self.apply(Command::Fit)
    }

    pub fn on_resize(&mut self, container: ContainerSize) -> Option<RequestId> {
        self.apply(Command::Resize(container))
    }

    pub fn on_fullscreen_change(&mut self, container: ContainerSize) -> Option<RequestId> {
        self.apply(Command::FullscreenChanged(container))
    }

    pub fn poll(&mut self) -> Vec<RenderEvent> {
        self.scheduler.poll()
    }

    pub fn wait_idle(&mut self, max_wait: Duration) -> Vec<RenderEvent> {
        self.scheduler.wait_idle(max_wait)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pdf::{DocumentSet, PageSize, SchedulerConfig};
    use crate::test_utils::ScriptedDocument;

    const WAIT: Duration = Duration::from_secs(5);

    fn navigator() -> Navigator<ScriptedDocument> {
        let documents = DocumentSet::from_documents(vec![
            ScriptedDocument::new(3).with_page_size(PageSize::new(100.0, 100.0)),
            ScriptedDocument::new(5).with_page_size(PageSize::new(100.0, 100.0)),
        ]);
        let scheduler =
            RenderScheduler::new(Arc::new(documents), SchedulerConfig::default()).unwrap();
        Navigator::new(scheduler, 1.0, ContainerSize::new(236.0, 236.0))
    }

    fn displayed_scale(nav: &Navigator<ScriptedDocument>) -> f32 {
        nav.scheduler().displayed().unwrap().surface.scale
    }

    #[test]
    fn fit_twice_gives_same_scale() {
        let mut nav = navigator();
        nav.fit();
        nav.wait_idle(WAIT);
        let first = displayed_scale(&nav);

        nav.fit();
        nav.wait_idle(WAIT);
        assert_eq!(displayed_scale(&nav), first);
        assert_eq!(first, 2.0);
    }

    #[test]
    fn resize_in_manual_mode_issues_no_request() {
        let mut nav = navigator();
        assert!(nav.zoom(0.15).is_some());
        nav.wait_idle(WAIT);

        assert!(nav.on_resize(ContainerSize::new(500.0, 500.0)).is_none());
        assert!(!nav.scheduler().is_busy());
        assert!((displayed_scale(&nav) - 1.15).abs() < 1e-6);
    }

    #[test]
    fn fullscreen_change_refits() {
        let mut nav = navigator();
        nav.fit();
        nav.wait_idle(WAIT);

        assert!(
            nav.on_fullscreen_change(ContainerSize::new(436.0, 436.0))
                .is_some()
        );
        nav.wait_idle(WAIT);
        assert_eq!(displayed_scale(&nav), 4.0);
    }

    #[test]
    fn next_crosses_document_boundary() {
        let mut nav = navigator();
        nav.go_to(3);
        nav.next();
        nav.wait_idle(WAIT);

        assert_eq!(nav.state().cursor, 4);
        assert_eq!(nav.scheduler().displayed().unwrap().global_page, 4);
    }
}
