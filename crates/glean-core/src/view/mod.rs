//! Reader UI state that lives outside the stores.

pub mod appearance;
pub mod fullscreen;
pub mod scroll;

pub use appearance::{AppearancePatch, AppearanceStore, ReaderAppearance, ReaderTheme};
pub use fullscreen::FullscreenState;
pub use scroll::{ArrivedState, ScrollDirections, ScrollTracker};
