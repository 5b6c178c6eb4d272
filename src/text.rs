use std::{
    fmt::Write,
    path::Path,
    sync::{Arc, OnceLock},
};

use regex::Regex;

use crate::utils::BoxError;

/// Collapses every run of non-alphanumeric characters into a space and title-cases the rest.
pub fn sanitize_title(title: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let non_word = NON_WORD.get_or_init(|| Regex::new(r"[\W_]+").expect("valid regex"));

    title_case(non_word.replace_all(title, " ").trim())
}

fn title_case(text: &str) -> String {
    let mut previous_is_letter = false;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}

/// Cuts `text` to at most `max_chars` characters, the last three of which become `...`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    short.push_str(&"..."[..max_chars.min(3)]);
    short
}

/// Largest size in `min..=max` whose measured width fits, or `min` if none does.
///
/// Sizes are tried from the top down, one unit at a time.
pub fn fit_font_size<E>(
    max_width: f32,
    min: u32,
    max: u32,
    mut measure: impl FnMut(u32) -> Result<f32, E>,
) -> Result<u32, E> {
    for size in (min..=max).rev() {
        if measure(size)? <= max_width {
            return Ok(size);
        }
    }
    Ok(min)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Main,
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextSize {
    pub width: f32,
    pub height: f32,
}

/// How a loaded font file is selected again from SVG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceStyle {
    pub family: String,
    pub weight: u16,
    pub style: &'static str,
    pub stretch: &'static str,
}

impl FaceStyle {
    fn of(face: &fontdb::FaceInfo) -> Option<Self> {
        let (family, _) = face.families.first()?;
        let style = match face.style {
            fontdb::Style::Normal => "normal",
            fontdb::Style::Italic => "italic",
            fontdb::Style::Oblique => "oblique",
        };
        let stretch = match face.stretch {
            fontdb::Stretch::UltraCondensed => "ultra-condensed",
            fontdb::Stretch::ExtraCondensed => "extra-condensed",
            fontdb::Stretch::Condensed => "condensed",
            fontdb::Stretch::SemiCondensed => "semi-condensed",
            fontdb::Stretch::Normal => "normal",
            fontdb::Stretch::SemiExpanded => "semi-expanded",
            fontdb::Stretch::Expanded => "expanded",
            fontdb::Stretch::ExtraExpanded => "extra-expanded",
            fontdb::Stretch::UltraExpanded => "ultra-expanded",
        };
        Some(Self {
            family: family.clone(),
            weight: face.weight.0,
            style,
            stretch,
        })
    }

    /// `font-*` attributes for a `<text>` element.
    fn attributes(&self) -> String {
        let Self {
            family,
            weight,
            style,
            stretch,
        } = self;
        let family = html_escape::encode_double_quoted_attribute(family);
        format!(
            r#"font-family="{family}" font-weight="{weight}" font-style="{style}" font-stretch="{stretch}""#
        )
    }
}

/// The two card fonts, registered in a private font database.
///
/// Both files may belong to the same family (a bold and a regular cut), so
/// each face is remembered with its weight, style and stretch too.
pub struct FontBook {
    db: fontdb::Database,
    main: FaceStyle,
    small: FaceStyle,
}

impl FontBook {
    pub fn load(main: &Path, small: &Path) -> Result<Self, BoxError> {
        let mut db = fontdb::Database::new();
        let main = load_face(&mut db, main)?;
        let small = load_face(&mut db, small)?;
        log::debug!("Fonts: {main:?}, {small:?}");
        Ok(Self { db, main, small })
    }

    pub fn face(&self, face: Face) -> &FaceStyle {
        match face {
            Face::Main => &self.main,
            Face::Small => &self.small,
        }
    }

    /// Bounding box of `text` once shaped and outlined.
    pub fn measure(&self, text: &str, face: Face, size: u32) -> Result<TextSize, BoxError> {
        if text.trim().is_empty() {
            return Ok(TextSize::default());
        }

        let mut layer = TextLayer::new(4096, 1024);
        layer.push(Span::new(text, face, size, 0.0, 0.0));
        let tree = self.tree(&layer.to_svg(self))?;

        let bbox = tree.root().abs_bounding_box();
        Ok(TextSize {
            width: bbox.width(),
            height: bbox.height(),
        })
    }

    pub fn fit(
        &self,
        text: &str,
        face: Face,
        max_width: f32,
        min: u32,
        max: u32,
    ) -> Result<u32, BoxError> {
        fit_font_size(max_width, min, max, |size| {
            Ok(self.measure(text, face, size)?.width)
        })
    }

    pub fn tree(&self, svg: &str) -> Result<usvg::Tree, BoxError> {
        let options = usvg::Options {
            font_family: self.main.family.clone(),
            ..Default::default()
        };
        Ok(usvg::Tree::from_str(svg, &options, &self.db)?)
    }
}

fn load_face(db: &mut fontdb::Database, path: &Path) -> Result<FaceStyle, BoxError> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Unable to read font {}: {e}", path.display()))?;
    let ids = db.load_font_source(fontdb::Source::Binary(Arc::new(data)));

    ids.first()
        .and_then(|id| db.face(*id))
        .and_then(FaceStyle::of)
        .ok_or_else(|| format!("No usable font face in {}", path.display()).into())
}

/// One line of text, positioned by its top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub face: Face,
    pub size: u32,
    pub x: f32,
    pub y: f32,
    pub fill: [u8; 3],
    pub opacity: f32,
}

impl Span {
    pub fn new(text: impl Into<String>, face: Face, size: u32, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            face,
            size,
            x,
            y,
            fill: [255, 255, 255],
            opacity: 1.0,
        }
    }
    pub fn fill(mut self, fill: [u8; 3]) -> Self {
        self.fill = fill;
        self
    }
    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }
}

/// All text of a card, drawn in one pass over the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    width: u32,
    height: u32,
    spans: Vec<Span>,
}

impl TextLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            spans: vec![],
        }
    }

    pub fn push(&mut self, span: Span) {
        self.spans.push(span);
    }

    pub fn to_svg(&self, fonts: &FontBook) -> String {
        let Self {
            width,
            height,
            spans,
        } = self;

        let body = spans.iter().fold(String::new(), |mut body, span| {
            let Span {
                text,
                face,
                size,
                x,
                y,
                fill: [r, g, b],
                opacity,
            } = span;
            let font = fonts.face(*face).attributes();
            let text = html_escape::encode_text(text);
            // Writing into a String can't fail.
            let _ = write!(
                body,
                r##"<text x="{x}" y="{y}" {font} font-size="{size}px" fill="rgb({r},{g},{b})" fill-opacity="{opacity}" dominant-baseline="hanging" xml:space="preserve">{text}</text>"##
            );
            body
        });

        format!(
            r##"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" xmlns="http://www.w3.org/2000/svg">{body}</svg>"##
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_is_sanitized_and_title_cased() {
        assert_eq!(sanitize_title("My Song!!"), "My Song");
        assert_eq!(sanitize_title("  hello__WORLD (official video) "), "Hello World Official Video");
        assert_eq!(sanitize_title("track 2nd take"), "Track 2Nd Take");
        assert_eq!(sanitize_title("!!!"), "");
    }

    #[test]
    fn truncate_respects_budget() {
        let long = "a".repeat(50);
        let short = truncate(&long, 40);
        assert_eq!(short.chars().count(), 40);
        assert!(short.ends_with("..."));
        assert_eq!(&short[..37], &long[..37]);

        assert_eq!(truncate("  Artist  ", 28), "Artist");
        assert_eq!(truncate("exactly", 7), "exactly");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let text = "é".repeat(10);
        let short = truncate(&text, 6);
        assert_eq!(short, "ééé...");
    }

    /// Pretends every character is half as wide as the font size.
    fn synthetic_width(text: &str) -> impl Fn(u32) -> Result<f32, ()> + '_ {
        move |size| Ok(text.chars().count() as f32 * size as f32 * 0.5)
    }

    #[test]
    fn fit_picks_largest_fitting_size() {
        // 10 chars: width = 5 * size, fits 150px up to size 30.
        let size = fit_font_size(150.0, 26, 48, synthetic_width("0123456789")).unwrap();
        assert_eq!(size, 30);
    }

    #[test]
    fn fit_keeps_max_when_it_fits() {
        let size = fit_font_size(1000.0, 26, 48, synthetic_width("short")).unwrap();
        assert_eq!(size, 48);
    }

    #[test]
    fn fit_falls_back_to_min() {
        let size = fit_font_size(10.0, 26, 48, synthetic_width("far too long for this")).unwrap();
        assert_eq!(size, 26);
    }

    fn bundled_fonts() -> FontBook {
        let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
        FontBook::load(
            &assets.join("DejaVuSans-Bold.ttf"),
            &assets.join("DejaVuSans.ttf"),
        )
        .unwrap()
    }

    #[test]
    fn faces_of_one_family_stay_distinct() {
        let fonts = bundled_fonts();
        let (main, small) = (fonts.face(Face::Main), fonts.face(Face::Small));
        assert_eq!(main.family, small.family);
        assert_eq!((main.weight, small.weight), (700, 400));

        let bold = fonts.measure("Now Playing", Face::Main, 40).unwrap();
        let regular = fonts.measure("Now Playing", Face::Small, 40).unwrap();
        assert!(bold.width > regular.width, "{bold:?} vs {regular:?}");
    }

    #[test]
    fn spans_carry_the_full_face() {
        let fonts = bundled_fonts();
        let mut layer = TextLayer::new(100, 50);
        layer.push(Span::new("a < b", Face::Main, 20, 1.0, 2.0));
        let svg = layer.to_svg(&fonts);

        assert!(svg.contains(r#"font-family="DejaVu Sans" font-weight="700""#), "{svg}");
        assert!(svg.contains(r#"font-style="normal" font-stretch="normal""#), "{svg}");
        assert!(svg.contains("a &lt; b"), "{svg}");
        assert!(fonts.tree(&svg).is_ok());
    }

    #[test]
    fn blank_text_measures_nothing() {
        let fonts = bundled_fonts();
        assert_eq!(fonts.measure("   ", Face::Small, 30).unwrap(), TextSize::default());
    }

    #[test]
    fn fit_propagates_measure_errors() {
        let result = fit_font_size(10.0, 26, 48, |_| Err("broken font"));
        assert_eq!(result, Err("broken font"));
    }
}
