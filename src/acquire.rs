//! Turns image references into bitmaps, falling back through a list of sources.

use std::{path::PathBuf, time::Duration};

use image::{DynamicImage, ImageReader, Rgb, RgbImage};

use crate::{
    types::ImageRef,
    utils::{guess_image_mime, http_client, BoxError, TempFile},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Path(PathBuf),
    /// Always available.
    Blank {
        width: u32,
        height: u32,
        color: [u8; 3],
    },
}

impl From<ImageRef> for ImageSource {
    fn from(value: ImageRef) -> Self {
        match value {
            ImageRef::Url(url) => Self::Url(url),
            ImageRef::Path(path) => Self::Path(path),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageAcquirer {
    /// Downloads are staged here.
    pub cache_dir: PathBuf,
    pub timeout: Duration,
}

impl ImageAcquirer {
    pub fn new(cache_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            timeout,
        }
    }

    /// Returns the first source that loads, or `None` if all of them failed.
    ///
    /// `tag` names the temporary download files.
    pub async fn acquire(&self, tag: &str, sources: &[ImageSource]) -> Option<DynamicImage> {
        for source in sources {
            match self.load(tag, source).await {
                Ok(image) => return Some(image),
                Err(e) => log::warn!("Unable to load image from {source:?}: {e}"),
            }
        }
        None
    }

    pub async fn load(&self, tag: &str, source: &ImageSource) -> Result<DynamicImage, BoxError> {
        match source {
            ImageSource::Url(url) => self.download(tag, url).await,
            ImageSource::Path(path) => decode(path.clone()).await,
            ImageSource::Blank {
                width,
                height,
                color,
            } => Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                *width,
                *height,
                Rgb(*color),
            ))),
        }
    }

    async fn download(&self, tag: &str, url: &str) -> Result<DynamicImage, BoxError> {
        log::info!("Downloading image from {url}");

        let response = http_client().get(url).timeout(self.timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("Image download failed with status {status}").into());
        }
        let data = response.bytes().await?;

        let mime = guess_image_mime(&data).ok_or("Downloaded data is not a known image format")?;
        log::debug!("Downloaded {} bytes of {mime}", data.len());

        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let temp = TempFile::new_in(&self.cache_dir, &format!("thumb{tag}"), "img");
        tokio::fs::write(temp.path(), &data).await?;

        decode(temp.path().to_path_buf()).await
    }
}

/// Decodes on the blocking pool; large previews take a while.
async fn decode(path: PathBuf) -> Result<DynamicImage, BoxError> {
    tokio::task::spawn_blocking(move || -> Result<DynamicImage, BoxError> {
        Ok(ImageReader::open(&path)?.with_guessed_format()?.decode()?)
    })
    .await?
}
