use std::{error::Error, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub assets: AssetPaths,
    pub cache_dir: PathBuf,
    pub layout: LayoutConfig,
    pub http_timeout_secs: u64,
}
impl Default for CardConfig {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            cache_dir: "./cache".into(),
            layout: LayoutConfig::default(),
            http_timeout_secs: 10,
        }
    }
}
impl CardConfig {
    /// Reads a JSON config. Missing fields keep their defaults.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let path = path.into();
        let data = std::fs::read(&path)
            .map_err(|e| format!("Unable to read config {}: {e}", path.display()))?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    /// Title and brand label.
    pub font_main: PathBuf,
    /// Info line, duration and watermark.
    pub font_small: PathBuf,
    /// Static player frame. Its alpha channel defines the content box.
    pub overlay: PathBuf,
    /// Preview image used when the real one can't be fetched.
    pub default_image: PathBuf,
}
impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            font_main: "assets/DejaVuSans-Bold.ttf".into(),
            font_small: "assets/DejaVuSans.ttf".into(),
            overlay: "assets/overlay.png".into(),
            default_image: "assets/default.png".into(),
        }
    }
}

/// Every constant of the card layout.
///
/// Fractions are relative to the content box width (`*_x`, `*_w`) or height
/// (`*_y`, `*_h`) unless the field says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,

    pub blur_sigma: f32,
    pub brightness: f32,
    pub alpha_threshold: u8,
    pub blank_color: [u8; 3],

    pub pad_x: f32,
    pub pad_y: f32,

    /// Of the inner region height.
    pub thumb_h_frac: f32,
    /// Of the inner region width.
    pub thumb_w_frac: f32,
    pub thumb_margin_x: f32,
    /// Pixels, added after centering.
    pub thumb_offset_y: i32,
    /// Of the thumbnail side.
    pub corner_radius_frac: f32,
    pub accent_min: u8,

    pub text_gap: f32,
    pub title_y_frac: f32,
    pub time_y_frac: f32,
    /// Pixels between the title and the info line.
    pub line_gap: f32,

    pub title_max_chars: usize,
    pub channel_max_chars: usize,
    pub title_font_max: u32,
    pub title_font_min: u32,
    pub info_font_max: u32,
    pub info_font_min: u32,
    pub time_font: u32,

    pub bar_h_frac: f32,
    /// Pixels.
    pub bar_min_height: f32,
    /// Pixels, kept free above and below the bar.
    pub bar_margin: f32,

    pub current_position_secs: u64,
    pub fallback_progress: f32,

    pub brand_text: String,
    pub brand_font: u32,
    pub brand_x_frac: f32,
    pub brand_y_frac: f32,

    pub watermark_text: String,
    pub watermark_font: u32,
    /// Pixels from the bottom-right corner of the canvas.
    pub watermark_margin: f32,
}
impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            canvas_width: 1280,
            canvas_height: 720,

            blur_sigma: 5.0,
            brightness: 0.3,
            alpha_threshold: 20,
            blank_color: [40, 40, 40],

            pad_x: 0.03,
            pad_y: 0.06,

            thumb_h_frac: 0.75,
            thumb_w_frac: 0.34,
            thumb_margin_x: 0.02,
            thumb_offset_y: 4,
            corner_radius_frac: 0.2,
            accent_min: 90,

            text_gap: 0.04,
            title_y_frac: 0.18,
            time_y_frac: 0.24,
            line_gap: 12.0,

            title_max_chars: 40,
            channel_max_chars: 28,
            title_font_max: 48,
            title_font_min: 26,
            info_font_max: 26,
            info_font_min: 18,
            time_font: 28,

            bar_h_frac: 0.025,
            bar_min_height: 6.0,
            bar_margin: 10.0,

            current_position_secs: 30,
            fallback_progress: 0.2,

            brand_text: "Rocky Music".to_string(),
            brand_font: 32,
            brand_x_frac: 0.04,
            brand_y_frac: 0.08,

            watermark_text: "@mrrockytg".to_string(),
            watermark_font: 24,
            watermark_margin: 25.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: CardConfig =
            serde_json::from_str(r#"{ "cache_dir": "/tmp/cards", "layout": { "brightness": 0.5 } }"#)
                .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cards"));
        assert_eq!(config.layout.brightness, 0.5);
        assert_eq!(config.layout.canvas_width, 1280);
        assert_eq!(config.assets, AssetPaths::default());
    }
}
