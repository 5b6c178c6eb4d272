use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::text::sanitize_title;

/// Everything the card shows about a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub duration: String,
    pub channel: String,
    pub views: String,
    pub image: ImageRef,
}

impl TrackMetadata {
    /// Builds metadata from raw provider values, cleaning up the title.
    pub fn new(
        title: &str,
        duration: impl Into<String>,
        channel: impl Into<String>,
        views: impl Into<String>,
        image: ImageRef,
    ) -> Self {
        Self {
            title: sanitize_title(title),
            duration: duration.into(),
            channel: channel.into(),
            views: views.into(),
            image,
        }
    }

    /// Used in place of anything the resolver could not provide.
    pub fn placeholder(default_image: impl Into<PathBuf>) -> Self {
        Self {
            title: "Unknown Title".to_string(),
            duration: "00:30".to_string(),
            channel: "Youtube".to_string(),
            views: "Views".to_string(),
            image: ImageRef::Path(default_image.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageRef {
    Url(String),
    Path(PathBuf),
}

impl ImageRef {
    /// Anything starting with `http` is fetched, everything else is read from disk.
    pub fn parse(reference: &str) -> Self {
        if reference.starts_with("http") {
            Self::Url(reference.to_string())
        } else {
            Self::Path(reference.into())
        }
    }
}

/// The usable region of the overlay asset. `x2` and `y2` are exclusive.
///
/// Only [ContentBox::new] builds one, so a box is never empty or inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBox {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl ContentBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Option<Self> {
        (x2 > x1 && y2 > y1).then_some(Self { x1, y1, x2, y2 })
    }
    pub fn x1(&self) -> u32 {
        self.x1
    }
    pub fn y1(&self) -> u32 {
        self.y1
    }
    pub fn x2(&self) -> u32 {
        self.x2
    }
    pub fn y2(&self) -> u32 {
        self.y2
    }
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thumbnail {
    pub x: u32,
    pub y: u32,
    pub size: u32,
    pub radius: u32,
}

/// Positions derived from a [ContentBox]. Everything that depends on measured
/// text is computed lazily by the methods in [crate::layout].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutGeometry {
    pub content: ContentBox,
    pub inner: Rect,
    pub thumbnail: Thumbnail,
    pub text_x: f32,
    pub text_width: f32,
    pub title_y: f32,
    pub time_y: f32,
    pub brand_x: f32,
    pub brand_center_y: f32,
}

/// A card written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCard {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}
