use image::{
    imageops::{self, FilterType},
    DynamicImage, Rgba, RgbaImage,
};

use crate::config::LayoutConfig;

/// Blurred, darkened copy of `source`, centered on an opaque black canvas.
pub fn backdrop(source: &DynamicImage, config: &LayoutConfig) -> RgbaImage {
    let (width, height) = (config.canvas_width, config.canvas_height);

    let fitted = source.resize(width, height, FilterType::Lanczos3).to_rgba8();
    let mut blurred = imageops::blur(&fitted, config.blur_sigma);
    darken(&mut blurred, config.brightness);

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    let x = width.saturating_sub(blurred.width()) / 2;
    let y = height.saturating_sub(blurred.height()) / 2;
    imageops::overlay(&mut canvas, &blurred, x.into(), y.into());
    canvas
}

/// Multiplies the color channels, leaving alpha alone.
fn darken(image: &mut RgbaImage, factor: f32) {
    for pixel in image.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = (*channel as f32 * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_the_canvas() {
        let config = LayoutConfig::default();
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(320, 180, Rgba([200, 200, 200, 255])));
        let out = backdrop(&source, &config);

        assert_eq!(out.dimensions(), (1280, 720));
        // 200 * 0.3
        let Rgba([r, g, b, a]) = *out.get_pixel(640, 360);
        for channel in [r, g, b] {
            assert!((59..=61).contains(&channel), "{channel}");
        }
        assert_eq!(a, 255);
    }

    #[test]
    fn letterboxes_other_aspect_ratios() {
        let config = LayoutConfig::default();
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255])));
        let out = backdrop(&source, &config);

        assert_eq!(out.dimensions(), (1280, 720));
        assert_eq!(out.get_pixel(5, 360), &Rgba([0, 0, 0, 255]));
        assert_eq!(out.get_pixel(640, 360)[3], 255);
    }
}
