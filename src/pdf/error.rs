//! Error taxonomy for loading and rendering

use std::time::Duration;

/// A document source failed to open. Fatal to boot.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no document sources were provided")]
    NoSources,

    #[error("{location}: {detail}")]
    Open { location: String, detail: String },

    #[error("{location}: remote transport unavailable, only local files can be opened")]
    Remote { location: String },
}

impl LoadError {
    pub fn open(location: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Open {
            location: location.into(),
            detail: detail.into(),
        }
    }
}

/// A specific page failed to load within an otherwise healthy document
#[derive(Debug, Clone, thiserror::Error)]
pub enum PageError {
    #[error("page {page} is out of range (document has {page_count} pages)")]
    OutOfRange { page: usize, page_count: usize },

    #[error("page {page}: {detail}")]
    Engine { page: usize, detail: String },
}

/// Rasterization did not produce a surface
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error("{detail}")]
    Raster { detail: String },

    /// Superseded by a later request. Never shown to the user.
    #[error("render cancelled")]
    Cancelled,

    #[error("render did not finish within {}ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("render worker is not running")]
    WorkerGone,
}

impl RenderError {
    pub fn raster(detail: impl Into<String>) -> Self {
        Self::Raster {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Error as surfaced to the presentation layer
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to start render worker: {0}")]
    Startup(#[from] std::io::Error),
}

impl ViewerError {
    /// User-facing text with load-time or render-time framing
    #[must_use]
    pub fn framed_message(&self) -> String {
        match self {
            Self::Load(e) => format!("Document failed to load.\n\n{e}"),
            Self::Render(e) => format!("Page failed to render.\n\n{e}"),
            Self::Startup(e) => format!("Viewer failed to start.\n\n{e}"),
        }
    }

    /// True for errors raised while booting, before any page is shown
    #[must_use]
    pub fn is_load(&self) -> bool {
        matches!(self, Self::Load(_) | Self::Startup(_))
    }
}
