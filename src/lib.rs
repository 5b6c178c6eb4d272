pub mod acquire;
pub mod api;
pub mod config;
pub mod gen;
pub mod layout;
pub mod text;
pub mod types;
pub mod utils;

pub use config::CardConfig;
pub use gen::CardComposer;
pub use types::{ContentBox, ImageRef, LayoutGeometry, RenderedCard, TrackMetadata};
