use std::{error::Error, future::Future};

use serde::{Deserialize, Serialize};

use crate::{
    types::{ImageRef, TrackMetadata},
    utils::http_client,
};

pub type ResolveError = Box<dyn Error + Send + Sync>;

/// Looks up everything the card needs to know about a video.
pub trait MetadataResolver {
    fn resolve(&self, id: &str) -> impl Future<Output = Result<TrackMetadata, ResolveError>> + Send;
}

/// Never finds anything, so cards fall back to placeholder metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineResolver;

impl MetadataResolver for OfflineResolver {
    async fn resolve(&self, id: &str) -> Result<TrackMetadata, ResolveError> {
        Err(format!("Offline, not resolving {id}").into())
    }
}

pub const DEFAULT_INVIDIOUS: &str = "https://inv.nadeko.net";

/// Resolves videos through the API of an Invidious instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvidiousResolver {
    base_url: String,
    timeout: std::time::Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvidiousResponse {
    Error { error: String },
    Value(Video),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub title: Option<String>,
    pub length_seconds: Option<u64>,
    pub author: Option<String>,
    pub view_count: Option<u64>,
    #[serde(default)]
    pub video_thumbnails: Vec<VideoThumbnail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoThumbnail {
    pub quality: String,
    pub url: String,
}

impl InvidiousResolver {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn url(&self, id: &str) -> String {
        format!("{}/api/v1/videos/{id}", self.base_url)
    }

    /// Converts an API response into card metadata.
    pub fn to_metadata(&self, video: Video) -> Result<TrackMetadata, ResolveError> {
        let Video {
            title,
            length_seconds,
            author,
            view_count,
            video_thumbnails,
        } = video;

        let thumbnail = pick_thumbnail(&video_thumbnails).ok_or("Video has no thumbnails")?;

        Ok(TrackMetadata::new(
            title.as_deref().unwrap_or("Unsupported Title"),
            format_length(length_seconds.unwrap_or(0)),
            author.unwrap_or_else(|| "Unknown Channel".to_string()),
            view_count
                .map(short_views)
                .unwrap_or_else(|| "Unknown Views".to_string()),
            ImageRef::Url(self.absolute_url(&thumbnail.url)),
        ))
    }

    fn absolute_url(&self, url: &str) -> String {
        let url = url.split('?').next().unwrap_or(url);
        if let Some(rest) = url.strip_prefix("//") {
            format!("https://{rest}")
        } else if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            url.to_string()
        }
    }
}

impl MetadataResolver for InvidiousResolver {
    async fn resolve(&self, id: &str) -> Result<TrackMetadata, ResolveError> {
        let url = self.url(id);
        log::info!("Resolving {id} via {url}");

        let response = http_client().get(&url).timeout(self.timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("Metadata request failed with status {status}").into());
        }

        match response.json::<InvidiousResponse>().await? {
            InvidiousResponse::Value(video) => self.to_metadata(video),
            InvidiousResponse::Error { error } => Err(error.into()),
        }
    }
}

/// Preferred thumbnail qualities, best first. `high` exists for every video.
///
/// `maxres` only exists for HD uploads and 404s otherwise, so it is used only
/// when the list has nothing else.
const THUMBNAIL_QUALITIES: &[&str] = &["high", "sddefault", "medium", "default"];

fn pick_thumbnail(thumbnails: &[VideoThumbnail]) -> Option<&VideoThumbnail> {
    THUMBNAIL_QUALITIES
        .iter()
        .find_map(|quality| thumbnails.iter().find(|t| t.quality == *quality))
        .or(thumbnails.first())
}

/// `M:SS`, or `H:MM:SS` past the hour.
pub fn format_length(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Abbreviates a view count the way video sites do: `1.2K views`, `12M views`.
pub fn short_views(views: u64) -> String {
    const UNITS: &[(u64, &str)] = &[(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];

    let Some((unit, suffix)) = UNITS.iter().find(|(unit, _)| views >= *unit) else {
        return format!("{views} views");
    };

    let tenths = views / (unit / 10);
    if tenths < 100 && tenths % 10 != 0 {
        format!("{}.{}{suffix} views", tenths / 10, tenths % 10)
    } else {
        format!("{}{suffix} views", tenths / 10)
    }
}
