//! Font capabilities
//!
//! The typesetting engine never reads font files.
//! Instead it consumes fonts through the narrow [Font] trait,
//!     which exposes glyph metrics and font dimensions.
//! Fonts are created by a [FontFactory] and stored in a [FontRepo],
//!     which hands out [FontId] values that are cheap to copy into registers.
//!
//! This crate provides one concrete font, the in-memory [MetricFont],
//!     whose metrics usually come from the engine configuration.

use common::Scaled;
use std::collections::HashMap;
use std::rc::Rc;

#[cfg(feature = "serde")]
mod spec;
#[cfg(feature = "serde")]
pub use spec::*;

/// The box dimensions of a single glyph.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphMetrics {
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
    pub italic_correction: Scaled,
}

/// Capability object for a loaded font.
///
/// A missing glyph or font dimension is reported as [None];
///     callers substitute zero or emit a missing character diagnostic.
pub trait Font: std::fmt::Debug {
    /// Name the font was loaded under.
    fn name(&self) -> &str;

    /// Metrics of the glyph for the provided character.
    fn glyph(&self, c: char) -> Option<GlyphMetrics>;

    /// Font dimension with the provided number, using `\fontdimen` numbering (starting at 1).
    fn dimen(&self, number: usize) -> Option<Scaled>;

    /// Number of font dimensions this font has.
    fn num_dimens(&self) -> usize;

    /// The size the font was designed at; `\font\x=name scaled n` loads it at `n/1000` of this.
    fn design_size(&self) -> Scaled;
}

/// Font dimension numbers used by TeX.
pub mod dimen {
    pub const SLANT: usize = 1;
    pub const SPACE: usize = 2;
    pub const SPACE_STRETCH: usize = 3;
    pub const SPACE_SHRINK: usize = 4;
    pub const X_HEIGHT: usize = 5;
    pub const QUAD: usize = 6;
    pub const EXTRA_SPACE: usize = 7;
}

/// Identifier of a font in a [FontRepo].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontId(pub u32);

impl FontId {
    /// The font that is selected before any other font is loaded.
    pub const NULL_FONT: FontId = FontId(0);
}

/// The null font, which has no glyphs and seven zero font dimensions.
#[derive(Debug, Default)]
pub struct NullFont;

impl Font for NullFont {
    fn name(&self) -> &str {
        "nullfont"
    }
    fn glyph(&self, _: char) -> Option<GlyphMetrics> {
        None
    }
    fn dimen(&self, number: usize) -> Option<Scaled> {
        if (1..=7).contains(&number) {
            Some(Scaled::ZERO)
        } else {
            None
        }
    }
    fn num_dimens(&self) -> usize {
        7
    }
    fn design_size(&self) -> Scaled {
        Scaled::ZERO
    }
}

/// A font whose metrics are held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricFont {
    name: String,
    design_size: Scaled,
    glyphs: HashMap<char, GlyphMetrics>,
    default_glyph: Option<GlyphMetrics>,
    params: Vec<Scaled>,
}

impl MetricFont {
    pub fn new<T: Into<String>>(name: T, design_size: Scaled) -> MetricFont {
        MetricFont {
            name: name.into(),
            design_size,
            ..Default::default()
        }
    }

    pub fn with_glyph(mut self, c: char, metrics: GlyphMetrics) -> MetricFont {
        self.glyphs.insert(c, metrics);
        self
    }

    /// Metrics used for every character that has no explicit glyph.
    pub fn with_default_glyph(mut self, metrics: GlyphMetrics) -> MetricFont {
        self.default_glyph = Some(metrics);
        self
    }

    /// Sets the font dimensions, starting from `\fontdimen1`.
    pub fn with_params(mut self, params: Vec<Scaled>) -> MetricFont {
        self.params = params;
        self
    }

    /// Returns a copy of this font loaded at a different size.
    ///
    /// Every length is multiplied by `size/design_size`.
    /// The slant (font dimension 1) is a pure number and is left unchanged.
    pub fn at_size<T: Into<String>>(&self, name: T, size: Scaled) -> MetricFont {
        let scale = |s: Scaled| -> Scaled {
            if self.design_size.0 == 0 {
                return s;
            }
            Scaled((s.0 as i64 * size.0 as i64 / self.design_size.0 as i64) as i32)
        };
        let scale_glyph = |g: &GlyphMetrics| GlyphMetrics {
            width: scale(g.width),
            height: scale(g.height),
            depth: scale(g.depth),
            italic_correction: scale(g.italic_correction),
        };
        MetricFont {
            name: name.into(),
            design_size: self.design_size,
            glyphs: self
                .glyphs
                .iter()
                .map(|(c, g)| (*c, scale_glyph(g)))
                .collect(),
            default_glyph: self.default_glyph.as_ref().map(scale_glyph),
            params: self
                .params
                .iter()
                .enumerate()
                .map(|(i, p)| if i + 1 == dimen::SLANT { *p } else { scale(*p) })
                .collect(),
        }
    }
}

impl Font for MetricFont {
    fn name(&self) -> &str {
        &self.name
    }
    fn glyph(&self, c: char) -> Option<GlyphMetrics> {
        self.glyphs.get(&c).copied().or(self.default_glyph)
    }
    fn dimen(&self, number: usize) -> Option<Scaled> {
        number
            .checked_sub(1)
            .and_then(|i| self.params.get(i))
            .copied()
    }
    fn num_dimens(&self) -> usize {
        self.params.len()
    }
    fn design_size(&self) -> Scaled {
        self.design_size
    }
}

/// Error returned when a font cannot be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    NotFound(String),
    InvalidSize(String, Scaled),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NotFound(name) => write!(f, "font `{name}` not found"),
            LoadError::InvalidSize(name, size) => {
                write!(f, "font `{name}` cannot be loaded at size {size}")
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Implementations of this trait create fonts from names.
pub trait FontFactory {
    /// Load the font with the provided name, optionally at a specific size.
    fn load(&self, name: &str, size: Option<Scaled>) -> Result<Rc<dyn Font>, LoadError>;
}

/// Factory that serves fonts from a fixed set of [MetricFont] values.
#[derive(Debug, Default)]
pub struct MetricFactory {
    fonts: HashMap<String, MetricFont>,
}

impl MetricFactory {
    pub fn new(fonts: Vec<MetricFont>) -> MetricFactory {
        MetricFactory {
            fonts: fonts
                .into_iter()
                .map(|font| (font.name.clone(), font))
                .collect(),
        }
    }

    pub fn add(&mut self, font: MetricFont) {
        self.fonts.insert(font.name.clone(), font);
    }
}

impl FontFactory for MetricFactory {
    fn load(&self, name: &str, size: Option<Scaled>) -> Result<Rc<dyn Font>, LoadError> {
        let font = self
            .fonts
            .get(name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;
        match size {
            None => Ok(Rc::new(font.clone())),
            Some(size) => {
                if size <= Scaled::ZERO || size >= Scaled(2048 * Scaled::ONE.0) {
                    return Err(LoadError::InvalidSize(name.to_string(), size));
                }
                Ok(Rc::new(font.at_size(name, size)))
            }
        }
    }
}

/// Repository of loaded fonts.
///
/// The null font is always present with identifier [FontId::NULL_FONT].
#[derive(Debug)]
pub struct FontRepo {
    fonts: Vec<Rc<dyn Font>>,
}

impl Default for FontRepo {
    fn default() -> Self {
        FontRepo {
            fonts: vec![Rc::new(NullFont)],
        }
    }
}

impl FontRepo {
    /// Adds a font to the repository and returns its identifier.
    pub fn insert(&mut self, font: Rc<dyn Font>) -> FontId {
        self.fonts.push(font);
        FontId((self.fonts.len() - 1) as u32)
    }

    /// Returns the font with the provided identifier.
    ///
    /// Unknown identifiers resolve to the null font.
    pub fn get(&self, id: FontId) -> &Rc<dyn Font> {
        self.fonts.get(id.0 as usize).unwrap_or(&self.fonts[0])
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(n: i32) -> Scaled {
        Scaled(n * Scaled::ONE.0)
    }

    fn font() -> MetricFont {
        MetricFont::new("test", pt(10))
            .with_glyph(
                'a',
                GlyphMetrics {
                    width: pt(5),
                    height: pt(4),
                    depth: Scaled::ZERO,
                    italic_correction: Scaled::ZERO,
                },
            )
            .with_params(vec![Scaled(1000), pt(3), pt(1), pt(1), pt(4), pt(10)])
    }

    #[test]
    fn glyph_lookup() {
        let font = font();
        assert_eq!(font.glyph('a').map(|g| g.width), Some(pt(5)));
        assert_eq!(font.glyph('b'), None);
    }

    #[test]
    fn default_glyph() {
        let font = font().with_default_glyph(GlyphMetrics {
            width: pt(1),
            ..Default::default()
        });
        assert_eq!(font.glyph('b').map(|g| g.width), Some(pt(1)));
    }

    #[test]
    fn dimen_numbering_starts_at_one() {
        let font = font();
        assert_eq!(font.dimen(0), None);
        assert_eq!(font.dimen(2), Some(pt(3)));
        assert_eq!(font.dimen(6), Some(pt(10)));
        assert_eq!(font.dimen(7), None);
    }

    #[test]
    fn load_at_size() {
        let factory = MetricFactory::new(vec![font()]);
        let big = factory.load("test", Some(pt(20))).unwrap();
        assert_eq!(big.glyph('a').map(|g| g.width), Some(pt(10)));
        assert_eq!(big.dimen(dimen::SLANT), Some(Scaled(1000)));
        assert_eq!(big.dimen(dimen::QUAD), Some(pt(20)));
    }

    #[test]
    fn load_missing_font() {
        let factory = MetricFactory::default();
        assert_eq!(
            factory.load("missing", None).unwrap_err(),
            LoadError::NotFound("missing".into())
        );
    }

    #[test]
    fn repo_falls_back_to_null_font() {
        let mut repo = FontRepo::default();
        let id = repo.insert(Rc::new(font()));
        assert_eq!(id, FontId(1));
        assert_eq!(repo.get(id).name(), "test");
        assert_eq!(repo.get(FontId(17)).name(), "nullfont");
    }
}
