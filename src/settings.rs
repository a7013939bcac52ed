use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pdf::{ContainerSize, FIT_PADDING, SchedulerConfig, ZOOM_STEP};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagestack";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Padding around a fitted page, in CSS pixels
    #[serde(default = "default_fit_padding")]
    pub fit_padding: f32,

    /// Zoom delta applied by zoom in/out
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    /// Manual zoom factor that the first zoom delta is applied to. Has no
    /// effect while the page is fitted.
    #[serde(default = "default_initial_scale")]
    pub initial_scale: f32,

    #[serde(default = "default_pixel_ratio")]
    pub device_pixel_ratio: f32,

    /// 0 disables the render timeout
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    #[serde(default)]
    pub default_container: ContainerSize,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_fit_padding() -> f32 {
    FIT_PADDING
}

fn default_zoom_step() -> f32 {
    ZOOM_STEP
}

fn default_initial_scale() -> f32 {
    1.0
}

fn default_pixel_ratio() -> f32 {
    1.0
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            fit_padding: default_fit_padding(),
            zoom_step: default_zoom_step(),
            initial_scale: default_initial_scale(),
            device_pixel_ratio: default_pixel_ratio(),
            render_timeout_ms: default_render_timeout_ms(),
            default_container: ContainerSize::default(),
        }
    }
}

impl Settings {
    /// Device pixel ratio, with nonsense values treated as 1
    pub fn pixel_ratio(&self) -> f32 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    /// Zoom delta, with nonsense values replaced by the default step
    pub fn zoom_step(&self) -> f32 {
        if self.zoom_step.is_finite() && self.zoom_step > 0.0 {
            self.zoom_step
        } else {
            ZOOM_STEP
        }
    }

    pub fn render_timeout(&self) -> Option<Duration> {
        (self.render_timeout_ms > 0).then(|| Duration::from_millis(self.render_timeout_ms))
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            fit_padding: self.fit_padding.max(0.0),
            pixel_ratio: self.pixel_ratio(),
            render_timeout: self.render_timeout(),
        }
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from the default location, writing defaults if absent
pub fn load_settings() -> Settings {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return Settings::default();
    };
    load_or_create(&path)
}

/// Load settings from `path`, writing defaults there if the file is missing
pub fn load_or_create(path: &Path) -> Settings {
    if path.exists() {
        return load_settings_from_path(path);
    }

    info!("Settings file not found, creating with defaults at {path:?}");
    let settings = Settings::default();
    save_settings_to_file(&settings, path);
    settings
}

pub fn load_settings_from_path(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                settings
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                Settings::default()
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            Settings::default()
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(SETTINGS_HEADER);
    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str(&format!("fit_padding: {}\n", settings.fit_padding));
    content.push_str(&format!("zoom_step: {}\n", settings.zoom_step));
    content.push_str(&format!("initial_scale: {}\n", settings.initial_scale));
    content.push_str(&format!(
        "device_pixel_ratio: {}\n",
        settings.device_pixel_ratio
    ));
    content.push_str("# Milliseconds before a page render is abandoned (0 = never)\n");
    content.push_str(&format!(
        "render_timeout_ms: {}\n",
        settings.render_timeout_ms
    ));
    content.push_str("default_container:\n");
    content.push_str(&format!(
        "  width: {}\n",
        settings.default_container.width
    ));
    content.push_str(&format!(
        "  height: {}\n",
        settings.default_container.height
    ));

    content
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# pagestack settings
# ============================================================================
# Zoom is clamped to 0.4 .. 4.0 regardless of the values below.

"#;
