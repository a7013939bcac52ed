// Export modules for use in tests
pub mod inputs;
pub mod panic_handler;
pub mod params;
pub mod pdf;
pub mod settings;
pub mod viewer;

pub mod test_utils;

// Re-export viewer session components
pub use params::ViewerParams;
pub use settings::Settings;
pub use viewer::{ErrorBanner, ErrorKind, UiState, Viewer};
