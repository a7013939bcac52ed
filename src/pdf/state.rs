//! Viewer session state
//!
//! Holds the global page cursor, the view mode and the container size for
//! one viewer instance. Intents are applied as [`Command`]s and yield the
//! [`Effect`]s the controller must carry out.

use super::types::{ContainerSize, ViewMode};
use super::zoom::{clamp_scale, manual_scale};

/// Mutable session context of one viewer
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    /// Current global page (1-based)
    pub cursor: usize,

    /// Total page count across all documents
    pub total_pages: usize,

    /// Whether the page is fitted to the container
    pub fit: bool,

    /// Manual zoom factor, kept while in fit mode
    pub scale: f32,

    /// Current display area
    pub container: ContainerSize,
}

impl ViewState {
    #[must_use]
    pub fn new(total_pages: usize, initial_scale: f32, container: ContainerSize) -> Self {
        Self {
            cursor: 1,
            total_pages,
            fit: true,
            scale: clamp_scale(initial_scale),
            container,
        }
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        if self.fit {
            ViewMode::Fit
        } else {
            ViewMode::Manual(self.scale)
        }
    }

    #[must_use]
    pub fn last_page(&self) -> usize {
        self.total_pages.max(1)
    }

    #[must_use]
    pub fn prev_enabled(&self) -> bool {
        self.cursor > 1
    }

    #[must_use]
    pub fn next_enabled(&self) -> bool {
        self.cursor < self.total_pages
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::GoToPage(page) => {
                self.cursor = page.clamp(1, self.last_page());
                vec![Effect::RenderCurrentPage]
            }

            Command::NextPage => self.apply(Command::GoToPage(self.cursor.saturating_add(1))),

            Command::PrevPage => self.apply(Command::GoToPage(self.cursor.saturating_sub(1))),

            Command::Zoom(delta) => {
                self.fit = false;
                self.scale = manual_scale(self.scale, delta);
                vec![Effect::RenderCurrentPage]
            }

            Command::Fit => {
                self.fit = true;
                vec![Effect::RenderCurrentPage]
            }

            Command::Resize(container) | Command::FullscreenChanged(container) => {
                self.container = container;
                if self.fit {
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }
        }
    }
}

/// Navigation intents
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Go to a 1-based global page, clamped into range
    GoToPage(usize),
    NextPage,
    PrevPage,
    /// Switch to manual mode and change the zoom factor by a delta
    Zoom(f32),
    /// Switch to fit mode
    Fit,
    /// The container was resized
    Resize(ContainerSize),
    /// Fullscreen was entered or left, giving a new container size
    FullscreenChanged(ContainerSize),
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Render the page under the cursor with the current view mode
    RenderCurrentPage,
}
