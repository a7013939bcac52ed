//! Raster job and response types exchanged with the worker

use std::sync::Arc;

use super::cancel::CancellationToken;
use super::error::RenderError;
use super::types::{ContainerSize, PageLocation, Surface};

/// Epoch of a render request. Each request gets a fresh, larger id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How the worker should pick the raster scale
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScaleSpec {
    Fit {
        container: ContainerSize,
        padding: f32,
    },
    Manual(f32),
}

/// Request sent to the raster worker
#[derive(Debug)]
pub enum RasterRequest {
    Render(RasterJob),
    Shutdown,
}

/// One page render
#[derive(Clone, Debug)]
pub struct RasterJob {
    pub id: RequestId,
    /// 1-based global page
    pub global_page: usize,
    pub location: PageLocation,
    pub scale: ScaleSpec,
    pub pixel_ratio: f32,
    pub cancel: CancellationToken,
}

/// Response from the raster worker
#[derive(Debug)]
pub enum RasterResponse {
    Rendered {
        id: RequestId,
        global_page: usize,
        surface: Arc<Surface>,
    },

    Failed { id: RequestId, error: RenderError },
}

impl RasterResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Rendered { id, .. } | Self::Failed { id, .. } => *id,
        }
    }
}
