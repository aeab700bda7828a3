//! Nodes of horizontal and vertical lists.
//!
//! Only the node types the engine produces are here; there are no
//!     ligatures, discretionaries, marks, inserts or whatsits.

use common::Glue as GlueSpec;
use common::Scaled;

/// Horizontal node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Horizontal {
    Char(Char),
    HList(HList),
    VList(VList),
    Rule(Rule),
    Math(Math),
    Glue(Glue),
    Kern(Kern),
    Penalty(Penalty),
}

/// Vertical node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Vertical {
    HList(HList),
    VList(VList),
    Rule(Rule),
    Glue(Glue),
    Kern(Kern),
    Penalty(Penalty),
}

/// A glyph, with its metrics copied from the font so that packing needs no font lookup.
///
/// Described in TeX.2021.134.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Char {
    pub char: char,
    pub font: u32,
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
}

/// An `\hbox`.
///
/// Described in TeX.2021.135.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HList {
    pub height: Scaled,
    pub width: Scaled,
    pub depth: Scaled,
    /// Downward shift in a horizontal list, rightward shift in a vertical list.
    pub shift_amount: Scaled,
    pub list: Vec<Horizontal>,
}

impl HList {
    /// The empty box `\hbox{}`.
    ///
    /// Described in TeX.2021.136.
    pub fn new_null_box() -> Self {
        Default::default()
    }
}

/// A `\vbox`.
///
/// Described in TeX.2021.137.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VList {
    pub height: Scaled,
    pub width: Scaled,
    pub depth: Scaled,
    pub shift_amount: Scaled,
    pub list: Vec<Vertical>,
}

/// A filled rectangle.
///
/// A [Rule::RUNNING] dimension stretches to the enclosing box.
///
/// Described in TeX.2021.138.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    pub height: Scaled,
    pub width: Scaled,
    pub depth: Scaled,
}

impl Rule {
    pub const RUNNING: Scaled = Scaled(-(1 << 30));

    /// A rule running in every dimension.
    ///
    /// Described in TeX.2021.139.
    pub fn new() -> Self {
        Self {
            height: Self::RUNNING,
            width: Self::RUNNING,
            depth: Self::RUNNING,
        }
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::new()
    }
}

/// Start or end of an inline formula; the width is `\mathsurround`.
///
/// Described in TeX.2021.147.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Math {
    pub kind: MathKind,
    pub width: Scaled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MathKind {
    Before,
    After,
}

/// A piece of glue.
///
/// Described in TeX.2021.149.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Glue {
    pub kind: GlueKind,
    pub glue: GlueSpec,
}

/// The kind of a glue node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlueKind {
    Normal,
    /// Glue inserted from a named parameter, e.g. `\thinmuskip` in math formulas.
    Parameter(GlueParameter),
}

/// Named glue parameters that can appear in node lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlueParameter {
    ThinMuSkip,
    MedMuSkip,
    ThickMuSkip,
}

impl GlueParameter {
    pub fn name(&self) -> &'static str {
        match self {
            GlueParameter::ThinMuSkip => "thinmuskip",
            GlueParameter::MedMuSkip => "medmuskip",
            GlueParameter::ThickMuSkip => "thickmuskip",
        }
    }
}

/// A kern.
///
/// Described in TeX.2021.155.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Kern {
    pub kind: KernKind,
    pub width: Scaled,
}

/// The kind of a kern node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KernKind {
    /// From font data or math spacing.
    Normal,
    /// `\kern`.
    Explicit,
    /// `\mkern`.
    Math,
}

impl Kern {
    pub fn new(width: Scaled) -> Kern {
        Kern {
            kind: KernKind::Normal,
            width,
        }
    }
}

/// A penalty.
///
/// Described in TeX.2021.157.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Penalty {
    pub value: i32,
}

impl Penalty {
    /// Penalties at least this large forbid a break.
    pub const INFINITE: i32 = 10000;
}
