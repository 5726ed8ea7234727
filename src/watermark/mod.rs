// Watermark engine - placement geometry, fonts, and pixel compositing
pub mod compositing;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod types;

// Re-export public items
pub use compositing::composite;
pub use error::WatermarkError;
pub use fonts::{FontCatalog, TextMetrics};
pub use geometry::{DEFAULT_ANCHOR_MARGIN, anchor_position, clamp_position, measure_footprint};
pub use types::{
    ANCHOR_PRESETS, AnchorBox, Color, Slot, SpecEdit, WatermarkMode, WatermarkSpec, anchor_preset,
    apply_edit,
};
