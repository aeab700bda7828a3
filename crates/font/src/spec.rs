//! Serializable descriptions of in-memory fonts.
//!
//! Lengths are written as TeX length literals, e.g. `"4.30554pt"`.

use super::*;
use std::collections::BTreeMap;

/// A length that is (de)serialized as a TeX length literal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub struct Length(pub Scaled);

impl TryFrom<String> for Length {
    type Error = common::ParseScaledError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Length(value.parse()?))
    }
}

/// Description of the metrics of one glyph.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct GlyphSpec {
    pub width: Length,
    #[serde(default)]
    pub height: Length,
    #[serde(default)]
    pub depth: Length,
    #[serde(default)]
    pub italic: Length,
}

impl From<GlyphSpec> for GlyphMetrics {
    fn from(value: GlyphSpec) -> Self {
        GlyphMetrics {
            width: value.width.0,
            height: value.height.0,
            depth: value.depth.0,
            italic_correction: value.italic.0,
        }
    }
}

/// Description of a [MetricFont].
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct FontSpec {
    pub name: String,
    pub design_size: Length,
    #[serde(default)]
    pub params: Vec<Length>,
    #[serde(default)]
    pub glyphs: BTreeMap<String, GlyphSpec>,
    #[serde(default)]
    pub default_glyph: Option<GlyphSpec>,
}

impl From<FontSpec> for MetricFont {
    fn from(spec: FontSpec) -> Self {
        let mut font = MetricFont::new(spec.name, spec.design_size.0)
            .with_params(spec.params.into_iter().map(|l| l.0).collect());
        if let Some(default_glyph) = spec.default_glyph {
            font = font.with_default_glyph(default_glyph.into());
        }
        for (key, glyph) in spec.glyphs {
            if let Some(c) = key.chars().next() {
                font = font.with_glyph(c, glyph.into());
            }
        }
        font
    }
}
