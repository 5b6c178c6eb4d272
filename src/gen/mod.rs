mod backdrop;

pub mod card;

use image::RgbaImage;
use tiny_skia::{ColorU8, Path, PathBuilder, Pixmap};

pub use card::CardComposer;

/// Copies an image into a premultiplied pixmap.
fn to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Rectangle with circular corners; `radius` is capped at half the shorter side.
fn rounded_rect(x: f32, y: f32, width: f32, height: f32, radius: f32) -> Option<Path> {
    if width <= 0.0 || height <= 0.0 {
        return None;
    }
    // Control point distance for a quarter circle drawn with one cubic.
    const KAPPA: f32 = 0.552_284_8;

    let r = radius.min(width / 2.0).min(height / 2.0).max(0.0);
    let k = r * KAPPA;
    let (right, bottom) = (x + width, y + height);

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + k, y, right, y + r - k, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - k, bottom, x, bottom - r + k, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
    pb.close();
    pb.finish()
}

#[cfg(test)]
mod tests {
    use image::Rgba;
    use tiny_skia::{FillRule, Mask, Transform};

    use super::*;

    #[test]
    fn pixmap_is_premultiplied() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 128]));
        let pixmap = to_pixmap(&image).unwrap();
        let pixel = pixmap.pixel(1, 1).unwrap();
        assert_eq!(pixel.alpha(), 128);
        assert!((99..=101).contains(&pixel.red()));
    }

    #[test]
    fn rounded_corners_are_cut() {
        let path = rounded_rect(0.0, 0.0, 100.0, 100.0, 25.0).unwrap();
        let mut mask = Mask::new(100, 100).unwrap();
        mask.fill_path(&path, FillRule::Winding, true, Transform::identity());

        let at = |x: usize, y: usize| mask.data()[y * 100 + x];
        assert_eq!(at(0, 0), 0);
        assert_eq!(at(99, 99), 0);
        assert_eq!(at(50, 50), 255);
        assert!(at(50, 0) > 200);
    }

    #[test]
    fn empty_rects_have_no_path() {
        assert!(rounded_rect(10.0, 10.0, 0.0, 5.0, 2.0).is_none());
    }
}
