//! Page virtualization and render scheduling

mod backend;
mod cancel;
mod document_set;
mod error;
mod locator;
#[cfg(feature = "pdf")]
mod mupdf_backend;
mod navigation;
mod request;
mod service;
mod state;
mod types;
mod worker;
mod zoom;

pub use backend::{DocumentBackend, DocumentHandle, PageHandle};
pub use cancel::CancellationToken;
pub use document_set::DocumentSet;
pub use error::{LoadError, PageError, RenderError, ViewerError};
pub use locator::locate;
#[cfg(feature = "pdf")]
pub use mupdf_backend::{MupdfBackend, MupdfDocument, MupdfPage, local_path};
pub use navigation::Navigator;
pub use request::{RasterJob, RasterRequest, RasterResponse, RequestId, ScaleSpec};
pub use service::{DisplayedPage, RenderEvent, RenderScheduler, RenderStatus, SchedulerConfig};
pub use state::{Command, Effect, ViewState};
pub use types::*;
pub use worker::RasterSpec;
pub use zoom::*;
