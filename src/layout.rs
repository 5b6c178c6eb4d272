use image::{imageops::FilterType, DynamicImage, Rgb, RgbaImage};

use crate::{
    config::LayoutConfig,
    types::{ContentBox, LayoutGeometry, Rect, Thumbnail},
};

/// Bounding box of every pixel whose alpha is above `threshold`.
///
/// Returns `None` for a fully transparent image.
pub fn content_box(overlay: &RgbaImage, threshold: u8) -> Option<ContentBox> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;

    for (x, y, pixel) in overlay.enumerate_pixels() {
        if pixel[3] <= threshold {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
        });
    }

    let (x1, y1, x2, y2) = bounds?;
    ContentBox::new(x1, y1, x2 + 1, y2 + 1)
}

/// Places everything whose position does not depend on text metrics.
pub fn compute(content: ContentBox, config: &LayoutConfig) -> LayoutGeometry {
    let box_w = content.width() as f32;
    let box_h = content.height() as f32;

    let pad_x = (box_w * config.pad_x).max(0.0);
    let pad_y = (box_h * config.pad_y).max(0.0);
    let inner = Rect {
        x: content.x1() as f32 + pad_x,
        y: content.y1() as f32 + pad_y,
        width: (box_w - 2.0 * pad_x).max(0.0),
        height: (box_h - 2.0 * pad_y).max(0.0),
    };

    let thumbnail = thumbnail(content, inner, config);

    let text_x = (thumbnail.x + thumbnail.size) as f32 + box_w * config.text_gap;
    let text_x = text_x.min(inner.right());
    let text_width = (inner.right() - text_x).max(0.0);

    let geometry = LayoutGeometry {
        content,
        inner,
        thumbnail,
        text_x,
        text_width,
        title_y: content.y1() as f32 + box_h * config.title_y_frac,
        time_y: content.y2() as f32 - box_h * config.time_y_frac,
        brand_x: content.x1() as f32 + box_w * config.brand_x_frac,
        brand_center_y: content.y1() as f32 + box_h * config.brand_y_frac,
    };
    log::debug!("{geometry:?}");
    geometry
}

fn thumbnail(content: ContentBox, inner: Rect, config: &LayoutConfig) -> Thumbnail {
    let box_w = content.width();
    let box_h = content.height();

    let size = (inner.height * config.thumb_h_frac).min(inner.width * config.thumb_w_frac);
    let size = (size.max(0.0) as u32).min(box_w).min(box_h).max(1);

    let x = (inner.x + box_w as f32 * config.thumb_margin_x).max(0.0) as u32;
    let x = x.clamp(content.x1(), content.x2() - size);

    let centered = inner.y + (inner.height - size as f32) / 2.0 + config.thumb_offset_y as f32;
    let y = (centered.max(0.0) as u32).clamp(content.y1(), content.y2() - size);

    Thumbnail {
        x,
        y,
        size,
        radius: (size as f32 * config.corner_radius_frac).max(0.0) as u32,
    }
}

impl LayoutGeometry {
    /// Top of the channel/views line, just below the rendered title.
    pub fn info_y(&self, title_height: f32, config: &LayoutConfig) -> f32 {
        self.title_y + title_height + config.line_gap
    }

    /// The bar sits centered between the info line and the duration text.
    pub fn progress_bar(&self, info_bottom: f32, config: &LayoutConfig) -> Rect {
        let height = (self.content.height() as f32 * config.bar_h_frac).max(config.bar_min_height);

        let top = info_bottom + config.bar_margin;
        let bottom = self.time_y - config.bar_margin;
        let y = if bottom - top >= height {
            top + (bottom - top - height) / 2.0
        } else {
            top
        };

        Rect {
            x: self.text_x,
            y,
            width: self.text_width,
            height,
        }
    }
}

/// Total seconds of a `H:M:S`, `M:S` or `S` duration. Anything malformed is 0.
pub fn parse_duration(duration: &str) -> u64 {
    let duration = duration.trim();
    if duration.is_empty() {
        return 0;
    }

    let parts: Vec<&str> = duration.split(':').collect();
    if parts.len() > 3 {
        return 0;
    }

    let mut total = 0u64;
    for part in parts {
        let Ok(value) = part.trim().parse::<u64>() else {
            return 0;
        };
        total = total * 60 + value;
    }
    total
}

/// `current / total` clamped to `[0, 1]`, or `fallback` for an unknown length.
pub fn progress_ratio(current: u64, total: u64, fallback: f32) -> f32 {
    if total == 0 {
        return fallback;
    }
    (current as f32 / total as f32).clamp(0.0, 1.0)
}

/// `MM:SS`, or `H:MM:SS` past the hour.
pub fn format_clock(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Durations without a minutes part are shown as `00:SS`.
pub fn display_duration(duration: &str) -> String {
    if duration.contains(':') {
        duration.to_string()
    } else {
        format!("00:{:0>2}", duration.trim())
    }
}

/// Average color of the image, with every channel raised to at least `min`.
pub fn accent_color(image: &DynamicImage, min: u8) -> Rgb<u8> {
    let average = image.resize_exact(1, 1, FilterType::Triangle).to_rgb8();
    let Rgb([r, g, b]) = *average.get_pixel(0, 0);
    Rgb([r.max(min), g.max(min), b.max(min)])
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn contained(thumb: Thumbnail, content: ContentBox) -> bool {
        thumb.x >= content.x1()
            && thumb.y >= content.y1()
            && thumb.x + thumb.size <= content.x2()
            && thumb.y + thumb.size <= content.y2()
    }

    #[test]
    fn thumbnail_stays_inside_content_box() {
        let config = LayoutConfig::default();
        let boxes = [
            (0, 0, 1280, 720),
            (100, 150, 1180, 570),
            (10, 10, 11, 11),
            (500, 0, 502, 720),
            (0, 300, 1280, 305),
            (37, 91, 940, 96),
        ];
        for (x1, y1, x2, y2) in boxes {
            let content = ContentBox::new(x1, y1, x2, y2).unwrap();
            let geometry = compute(content, &config);
            assert!(
                contained(geometry.thumbnail, content),
                "{:?} escapes {content:?}",
                geometry.thumbnail
            );
        }
    }

    #[test]
    fn thumbnail_stays_inside_with_extreme_config() {
        let config = LayoutConfig {
            thumb_h_frac: 3.0,
            thumb_w_frac: 3.0,
            thumb_margin_x: 0.9,
            thumb_offset_y: 500,
            pad_x: 0.0,
            pad_y: 0.0,
            ..Default::default()
        };
        let content = ContentBox::new(100, 100, 400, 300).unwrap();
        assert!(contained(compute(content, &config).thumbnail, content));
    }

    #[test]
    fn text_column_never_crosses_inner_edge() {
        let config = LayoutConfig {
            thumb_w_frac: 1.0,
            text_gap: 0.5,
            ..Default::default()
        };
        let content = ContentBox::new(0, 0, 400, 1000).unwrap();
        let geometry = compute(content, &config);
        assert!(geometry.text_x <= geometry.inner.right());
        assert_eq!(geometry.text_width, geometry.inner.right() - geometry.text_x);
    }

    #[test]
    fn default_layout_keeps_text_right_of_thumbnail() {
        let config = LayoutConfig::default();
        let geometry = compute(ContentBox::new(100, 150, 1180, 570).unwrap(), &config);
        let thumb = geometry.thumbnail;
        assert!(geometry.text_x > (thumb.x + thumb.size) as f32);
        assert!(geometry.text_width > 0.0);
        assert_eq!(thumb.radius, (thumb.size as f32 * 0.2) as u32);
    }

    #[test]
    fn progress_bar_fits_between_info_and_time() {
        let config = LayoutConfig::default();
        let geometry = compute(ContentBox::new(100, 150, 1180, 570).unwrap(), &config);
        let info_bottom = geometry.title_y + 100.0;
        let bar = geometry.progress_bar(info_bottom, &config);

        assert!(bar.y >= info_bottom + config.bar_margin);
        assert!(bar.bottom() <= geometry.time_y - config.bar_margin);
        assert!(bar.height >= config.bar_min_height);
        assert_eq!(bar.x, geometry.text_x);
        assert_eq!(bar.width, geometry.text_width);
    }

    #[test]
    fn progress_bar_is_pinned_when_space_runs_out() {
        let config = LayoutConfig::default();
        let geometry = compute(ContentBox::new(0, 0, 800, 100).unwrap(), &config);
        let info_bottom = geometry.time_y;
        let bar = geometry.progress_bar(info_bottom, &config);
        assert_eq!(bar.y, info_bottom + config.bar_margin);
        assert_eq!(bar.height, config.bar_min_height);
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("45"), 45);
        assert_eq!(parse_duration("2:30"), 150);
        assert_eq!(parse_duration("1:02:03"), 3723);
        assert_eq!(parse_duration("00:30"), 30);
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("live"), 0);
        assert_eq!(parse_duration("3:x5"), 0);
        assert_eq!(parse_duration("1:2:3:4"), 0);
        assert_eq!(parse_duration(":30"), 0);
    }

    #[test]
    fn progress() {
        assert_eq!(progress_ratio(30, 0, 0.2), 0.2);
        assert_eq!(progress_ratio(30, 150, 0.2), 0.2);
        assert_eq!(progress_ratio(30, 10, 0.2), 1.0);
        assert_eq!(progress_ratio(0, 10, 0.2), 0.0);
    }

    #[test]
    fn clock_and_display() {
        assert_eq!(format_clock(30), "00:30");
        assert_eq!(format_clock(225), "03:45");
        assert_eq!(format_clock(3723), "1:02:03");
        assert_eq!(display_duration("3:45"), "3:45");
        assert_eq!(display_duration("7"), "00:07");
        assert_eq!(display_duration("45"), "00:45");
    }

    #[test]
    fn content_box_from_alpha() {
        let mut overlay = RgbaImage::from_pixel(100, 60, Rgba([0, 0, 0, 0]));
        for y in 10..50 {
            for x in 20..80 {
                overlay.put_pixel(x, y, Rgba([255, 255, 255, 200]));
            }
        }
        // Faint pixels at or below the threshold don't count.
        overlay.put_pixel(0, 0, Rgba([255, 255, 255, 20]));
        overlay.put_pixel(99, 59, Rgba([255, 255, 255, 5]));

        assert_eq!(content_box(&overlay, 20), ContentBox::new(20, 10, 80, 50));
    }

    #[test]
    fn transparent_overlay_has_no_content_box() {
        let overlay = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 0]));
        assert_eq!(content_box(&overlay, 20), None);
    }

    #[test]
    fn accent_is_lightened() {
        let dark = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([10, 200, 30, 255])));
        assert_eq!(accent_color(&dark, 90), Rgb([90, 200, 90]));
    }
}
