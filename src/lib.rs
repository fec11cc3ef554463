//! Renders clan-battle status cards: boss panels with HP bars and member
//! chip lists, progress summaries, and combined multi-boss reports.

pub mod assets;
pub mod canvas;
pub mod chips;
pub mod config;
pub mod error;
pub mod mask;
pub mod model;
pub mod packing;
pub mod render;
pub mod text;

#[cfg(test)]
mod test_support;

pub use assets::{ImageStore, MissingAvatars};
pub use canvas::{CanvasBuilder, Padding};
pub use config::RenderConfig;
pub use error::RenderError;
pub use model::{
    BossStatus, CategorizedChips, ChipEntries, ProgressSummary, ReportRequest, SummaryStat,
    UserChipInput,
};
pub use render::{Renderer, encode_jpeg, encode_png};
pub use text::{FontRasterizer, GlyphRasterizer};
