//! Reader display preferences, persisted under [`READER_CONFIG_KEY`].

use crate::storage::{READER_CONFIG_KEY, Storage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 36;
pub const MAX_PADDING: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderTheme {
    #[default]
    Light,
    Dark,
    Sepia,
    Night,
}

impl ReaderTheme {
    pub fn as_str(self) -> &'static str {
        match self {
            ReaderTheme::Light => "light",
            ReaderTheme::Dark => "dark",
            ReaderTheme::Sepia => "sepia",
            ReaderTheme::Night => "night",
        }
    }
}

impl FromStr for ReaderTheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ReaderTheme::Light),
            "dark" => Ok(ReaderTheme::Dark),
            "sepia" => Ok(ReaderTheme::Sepia),
            "night" => Ok(ReaderTheme::Night),
            other => Err(format!("unknown theme {other:?}")),
        }
    }
}

/// Stored as camelCase JSON. Missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReaderAppearance {
    pub font_size: u32,
    pub line_height: f32,
    pub theme: ReaderTheme,
    pub brightness: u8,
    pub padding_horizontal: u32,
    pub padding_vertical: u32,
    pub paragraph_spacing: f32,
    pub animations: bool,
}

impl Default for ReaderAppearance {
    fn default() -> Self {
        Self {
            font_size: 18,
            line_height: 1.8,
            theme: ReaderTheme::Light,
            brightness: 100,
            padding_horizontal: 16,
            padding_vertical: 24,
            paragraph_spacing: 1.0,
            animations: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct AppearancePatch {
    pub font_size: Option<u32>,
    pub line_height: Option<f32>,
    pub theme: Option<ReaderTheme>,
    pub brightness: Option<u8>,
    pub padding_horizontal: Option<u32>,
    pub padding_vertical: Option<u32>,
    pub paragraph_spacing: Option<f32>,
    pub animations: Option<bool>,
}

impl AppearancePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ReaderAppearance {
    /// Apply `patch`, clamping every value into its supported range.
    /// Non-finite floats are ignored.
    pub fn apply(&mut self, patch: AppearancePatch) {
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        }
        if let Some(line_height) = patch.line_height.filter(|v| v.is_finite()) {
            self.line_height = line_height.clamp(1.0, 3.0);
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(brightness) = patch.brightness {
            self.brightness = brightness.min(100);
        }
        if let Some(padding) = patch.padding_horizontal {
            self.padding_horizontal = padding.min(MAX_PADDING);
        }
        if let Some(padding) = patch.padding_vertical {
            self.padding_vertical = padding.min(MAX_PADDING);
        }
        if let Some(spacing) = patch.paragraph_spacing.filter(|v| v.is_finite()) {
            self.paragraph_spacing = spacing.clamp(0.0, 4.0);
        }
        if let Some(animations) = patch.animations {
            self.animations = animations;
        }
    }

    /// Stored values pass through the same clamps as patches.
    fn sanitized(self) -> Self {
        let mut clean = Self::default();
        clean.apply(AppearancePatch {
            font_size: Some(self.font_size),
            line_height: Some(self.line_height),
            theme: Some(self.theme),
            brightness: Some(self.brightness),
            padding_horizontal: Some(self.padding_horizontal),
            padding_vertical: Some(self.padding_vertical),
            paragraph_spacing: Some(self.paragraph_spacing),
            animations: Some(self.animations),
        });
        clean
    }
}

/// Appearance preferences backed by client storage. Every change is written
/// through immediately.
pub struct AppearanceStore {
    storage: Arc<dyn Storage>,
    current: ReaderAppearance,
}

impl AppearanceStore {
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let current = match storage.get(READER_CONFIG_KEY) {
            Some(raw) => match serde_json::from_str::<ReaderAppearance>(&raw) {
                Ok(stored) => stored.sanitized(),
                Err(err) => {
                    warn!("Ignoring invalid reader appearance: {err}");
                    ReaderAppearance::default()
                }
            },
            None => ReaderAppearance::default(),
        };
        Self { storage, current }
    }

    pub fn current(&self) -> ReaderAppearance {
        self.current
    }

    pub fn update(&mut self, patch: AppearancePatch) -> ReaderAppearance {
        self.current.apply(patch);
        self.persist();
        self.current
    }

    pub fn set_theme(&mut self, theme: ReaderTheme) -> ReaderAppearance {
        self.update(AppearancePatch {
            theme: Some(theme),
            ..AppearancePatch::default()
        })
    }

    pub fn reset(&mut self) -> ReaderAppearance {
        self.current = ReaderAppearance::default();
        self.persist();
        self.current
    }

    fn persist(&self) {
        match serde_json::to_string(&self.current) {
            Ok(json) => {
                self.storage.set(READER_CONFIG_KEY, &json);
                debug!(theme = self.current.theme.as_str(), font_size = self.current.font_size, "Saved reader appearance");
            }
            Err(err) => warn!("Failed to encode reader appearance: {err}"),
        }
    }
}
