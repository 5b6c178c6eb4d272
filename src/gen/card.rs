use std::{
    path::Path,
    sync::{Arc, OnceLock},
};

use image::{imageops::FilterType, DynamicImage, ImageReader, Rgb, RgbImage};
use tiny_skia::{FillRule, Mask, Paint, Pixmap, PixmapPaint, Transform};

use crate::{
    acquire::{ImageAcquirer, ImageSource},
    api::MetadataResolver,
    config::{CardConfig, LayoutConfig},
    layout::{self, accent_color, display_duration, format_clock, parse_duration, progress_ratio},
    text::{truncate, Face, FontBook, Span, TextLayer},
    types::{ContentBox, Rect, RenderedCard, Thumbnail, TrackMetadata},
    utils::{file_stem, write_atomic, BoxError},
};

use super::{backdrop::backdrop, rounded_rect, to_pixmap};

const SECONDARY_TEXT: [u8; 3] = [215, 215, 215];
const TRACK: [u8; 4] = [255, 255, 255, 70];
const SHADOW: [u8; 3] = [0, 0, 0];
const SHADOW_OPACITY: f32 = 180.0 / 255.0;
const WATERMARK_OPACITY: f32 = 240.0 / 255.0;

/// The static player frame, resized to the canvas.
struct Overlay {
    pixmap: Pixmap,
    content: ContentBox,
}

impl Overlay {
    fn load(path: &Path, config: &LayoutConfig) -> Result<Self, BoxError> {
        let image = ImageReader::open(path)
            .map_err(|e| format!("Unable to open overlay {}: {e}", path.display()))?
            .with_guessed_format()?
            .decode()?
            .resize_exact(config.canvas_width, config.canvas_height, FilterType::Lanczos3)
            .to_rgba8();

        let content = layout::content_box(&image, config.alpha_threshold)
            .ok_or_else(|| format!("Overlay {} has no opaque region", path.display()))?;
        log::info!("Overlay content box: {content:?}");

        let pixmap = to_pixmap(&image).ok_or("Unable to allocate overlay pixmap")?;
        Ok(Self { pixmap, content })
    }
}

/// Resolves, fetches and draws "now playing" cards into the cache directory.
///
/// The overlay asset (with its content box) and the fonts are loaded on first
/// use and reused by every later render. Loading, drawing and writing run on
/// the blocking pool.
pub struct CardComposer<R> {
    resolver: R,
    config: CardConfig,
    acquirer: ImageAcquirer,
    overlay: OnceLock<Arc<Overlay>>,
    fonts: OnceLock<Arc<FontBook>>,
}

impl<R: MetadataResolver> CardComposer<R> {
    pub fn new(resolver: R, config: CardConfig) -> Self {
        let acquirer = ImageAcquirer::new(&config.cache_dir, config.http_timeout());
        Self {
            resolver,
            config,
            acquirer,
            overlay: OnceLock::new(),
            fonts: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    /// Renders the card for `id`, or `None` if it could not be drawn. Failures are logged.
    pub async fn render(&self, id: &str) -> Option<RenderedCard> {
        match self.try_render(id).await {
            Ok(card) => {
                log::info!("Card for {id} written to {}", card.path.display());
                Some(card)
            }
            Err(e) => {
                log::error!("Unable to render card for {id}: {e}");
                None
            }
        }
    }

    pub async fn try_render(&self, id: &str) -> Result<RenderedCard, BoxError> {
        let metadata = self.metadata(id).await;
        let source = self.source_image(id, &metadata).await;
        let overlay = self.overlay().await?;
        let fonts = self.fonts().await?;

        let config = self.config.layout.clone();
        let cache_dir = self.config.cache_dir.clone();
        let path = cache_dir.join(format!("{}.png", file_stem(id)));
        let target = path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), BoxError> {
            let png = compose(&overlay, &fonts, &config, &metadata, &source)?;
            std::fs::create_dir_all(&cache_dir)?;
            write_atomic(&target, png)?;
            Ok(())
        })
        .await??;

        Ok(RenderedCard {
            path,
            width: self.config.layout.canvas_width,
            height: self.config.layout.canvas_height,
        })
    }

    async fn metadata(&self, id: &str) -> TrackMetadata {
        match self.resolver.resolve(id).await {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("Using placeholder metadata for {id}: {e}");
                TrackMetadata::placeholder(&self.config.assets.default_image)
            }
        }
    }

    async fn source_image(&self, id: &str, metadata: &TrackMetadata) -> DynamicImage {
        let LayoutConfig {
            canvas_width,
            canvas_height,
            blank_color,
            ..
        } = self.config.layout;
        let blank = ImageSource::Blank {
            width: canvas_width,
            height: canvas_height,
            color: blank_color,
        };

        let sources = [
            metadata.image.clone().into(),
            ImageSource::Path(self.config.assets.default_image.clone()),
            blank,
        ];

        match self.acquirer.acquire(&file_stem(id), &sources).await {
            Some(image) => image,
            None => {
                let blank = RgbImage::from_pixel(canvas_width, canvas_height, Rgb(blank_color));
                DynamicImage::ImageRgb8(blank)
            }
        }
    }

    async fn overlay(&self) -> Result<Arc<Overlay>, BoxError> {
        if let Some(overlay) = self.overlay.get() {
            return Ok(overlay.clone());
        }
        let path = self.config.assets.overlay.clone();
        let config = self.config.layout.clone();
        let overlay = tokio::task::spawn_blocking(move || Overlay::load(&path, &config)).await??;
        Ok(self.overlay.get_or_init(|| Arc::new(overlay)).clone())
    }

    async fn fonts(&self) -> Result<Arc<FontBook>, BoxError> {
        if let Some(fonts) = self.fonts.get() {
            return Ok(fonts.clone());
        }
        let main = self.config.assets.font_main.clone();
        let small = self.config.assets.font_small.clone();
        let fonts = tokio::task::spawn_blocking(move || FontBook::load(&main, &small)).await??;
        Ok(self.fonts.get_or_init(|| Arc::new(fonts)).clone())
    }
}

/// Draws the whole card and encodes it as PNG.
fn compose(
    overlay: &Overlay,
    fonts: &FontBook,
    config: &LayoutConfig,
    metadata: &TrackMetadata,
    source: &DynamicImage,
) -> Result<Vec<u8>, BoxError> {
    let geometry = layout::compute(overlay.content, config);

    let mut canvas = to_pixmap(&backdrop(source, config)).ok_or("Unable to allocate canvas")?;
    canvas.draw_pixmap(
        0,
        0,
        overlay.pixmap.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );

    let thumb = geometry.thumbnail;
    let thumb_image = source.resize_to_fill(thumb.size, thumb.size, FilterType::Lanczos3);
    let accent = accent_color(&thumb_image, config.accent_min);
    draw_thumbnail(&mut canvas, &thumb_image, thumb)?;

    let mut text = TextLayer::new(config.canvas_width, config.canvas_height);

    let title = truncate(&metadata.title, config.title_max_chars);
    let title_size = fonts.fit(
        &title,
        Face::Main,
        geometry.text_width,
        config.title_font_min,
        config.title_font_max,
    )?;
    let title_height = fonts.measure(&title, Face::Main, title_size)?.height;
    text.push(Span::new(title, Face::Main, title_size, geometry.text_x, geometry.title_y));

    let channel = truncate(&metadata.channel, config.channel_max_chars);
    let info = format!("{channel} • {}", metadata.views);
    let info_y = geometry.info_y(title_height, config);
    let info_size = fonts.fit(
        &info,
        Face::Small,
        geometry.text_width,
        config.info_font_min,
        config.info_font_max,
    )?;
    let info_height = fonts.measure(&info, Face::Small, info_size)?.height;
    text.push(
        Span::new(info, Face::Small, info_size, geometry.text_x, info_y).fill(SECONDARY_TEXT),
    );

    let current = config.current_position_secs;
    let total = parse_duration(&metadata.duration);
    let ratio = progress_ratio(current, total, config.fallback_progress);
    let bar = geometry.progress_bar(info_y + info_height, config);
    draw_progress(&mut canvas, bar, ratio, accent);

    let time = format!(
        "{} / {}",
        format_clock(current),
        display_duration(&metadata.duration)
    );
    text.push(
        Span::new(time, Face::Small, config.time_font, geometry.text_x, geometry.time_y)
            .fill(SECONDARY_TEXT),
    );

    let brand_height = fonts
        .measure(&config.brand_text, Face::Main, config.brand_font)?
        .height;
    text.push(Span::new(
        &config.brand_text,
        Face::Main,
        config.brand_font,
        geometry.brand_x,
        geometry.brand_center_y - brand_height / 2.0,
    ));

    push_watermark(&mut text, fonts, config)?;

    let tree = fonts.tree(&text.to_svg(fonts))?;
    resvg::render(&tree, Transform::default(), &mut canvas.as_mut());

    Ok(canvas.encode_png()?)
}

/// Bottom-right label with a drop shadow: four dark copies, then the bright one.
fn push_watermark(
    text: &mut TextLayer,
    fonts: &FontBook,
    config: &LayoutConfig,
) -> Result<(), BoxError> {
    let LayoutConfig {
        watermark_text,
        watermark_font,
        watermark_margin,
        ..
    } = config;

    let size = fonts.measure(watermark_text, Face::Small, *watermark_font)?;
    let x = config.canvas_width as f32 - size.width - watermark_margin;
    let y = config.canvas_height as f32 - size.height - watermark_margin;

    for (dx, dy) in [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)] {
        let shadow = Span::new(watermark_text, Face::Small, *watermark_font, x + dx, y + dy);
        text.push(shadow.fill(SHADOW).opacity(SHADOW_OPACITY));
    }
    text.push(Span::new(watermark_text, Face::Small, *watermark_font, x, y).opacity(WATERMARK_OPACITY));
    Ok(())
}

/// Pastes the thumbnail through a rounded-corner alpha mask.
fn draw_thumbnail(
    canvas: &mut Pixmap,
    image: &DynamicImage,
    thumb: Thumbnail,
) -> Result<(), BoxError> {
    let Thumbnail { x, y, size, radius } = thumb;
    let pixmap = to_pixmap(&image.to_rgba8()).ok_or("Unable to allocate thumbnail")?;

    let path = rounded_rect(x as f32, y as f32, size as f32, size as f32, radius as f32)
        .ok_or("Empty thumbnail")?;
    let mut mask = Mask::new(canvas.width(), canvas.height()).ok_or("Unable to allocate mask")?;
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());

    canvas.draw_pixmap(
        x as i32,
        y as i32,
        pixmap.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        Some(&mask),
    );
    Ok(())
}

fn draw_progress(canvas: &mut Pixmap, bar: Rect, ratio: f32, accent: Rgb<u8>) {
    let radius = bar.height / 2.0;
    let Rgb([r, g, b]) = accent;

    let track =
        rounded_rect(bar.x, bar.y, bar.width, bar.height, radius).map(|path| (path, TRACK));
    let filled = rounded_rect(bar.x, bar.y, bar.width * ratio, bar.height, radius)
        .map(|path| (path, [r, g, b, 255]));

    for (path, [r, g, b, a]) in track.into_iter().chain(filled) {
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }
}
