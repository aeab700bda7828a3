//! Conversion of math lists into horizontal lists.
//!
//! This is TeX.2021 part 36, `mlist_to_hlist`, together with the routines it calls.
//! The conversion runs in two passes.
//! The first pass typesets every atom and fraction in isolation
//!     and records the maximum height and depth of the list,
//!     which the second pass needs to size `\left` and `\right` delimiters.
//! The second pass inserts the delimiters, the inter-atom spacing and the line break penalties.
//!
//! The numeric recipes follow TeX exactly, down to the rounding.

use crate::noad::*;
use crate::style::Style;
use boxworks::node::{self, Horizontal, HList, Vertical, VList};
use boxworks::pack::{hpack, vpack};
use common::{Glue, GlueComponent, Scaled};
use font::{Font, FontId, FontRepo};
use std::rc::Rc;
use texweave::group::{Address, DimenParameter, IntegerParameter, MathSize, MuGlueParameter};
use texweave::vm::VM;

const SIZES: [MathSize; 3] = [MathSize::Text, MathSize::Script, MathSize::ScriptScript];

/// Number of font dimensions the symbol font (family 2) must have.
pub const TOTAL_MATHSY_PARAMS: usize = 22;

/// Number of font dimensions the extension font (family 3) must have.
pub const TOTAL_MATHEX_PARAMS: usize = 13;

mod mathsy {
    pub const MATH_X_HEIGHT: usize = 5;
    pub const MATH_QUAD: usize = 6;
    pub const NUM1: usize = 8;
    pub const NUM2: usize = 9;
    pub const NUM3: usize = 10;
    pub const DENOM1: usize = 11;
    pub const DENOM2: usize = 12;
    pub const SUP1: usize = 13;
    pub const SUP2: usize = 14;
    pub const SUP3: usize = 15;
    pub const SUB1: usize = 16;
    pub const SUB2: usize = 17;
    pub const SUP_DROP: usize = 18;
    pub const SUB_DROP: usize = 19;
    pub const DELIM1: usize = 20;
    pub const DELIM2: usize = 21;
    pub const AXIS_HEIGHT: usize = 22;
}

mod mathex {
    pub const DEFAULT_RULE_THICKNESS: usize = 8;
    pub const BIG_OP_SPACING1: usize = 9;
    pub const BIG_OP_SPACING2: usize = 10;
    pub const BIG_OP_SPACING3: usize = 11;
    pub const BIG_OP_SPACING4: usize = 12;
    pub const BIG_OP_SPACING5: usize = 13;
}

/// Inter-atom spacing.
///
/// Rows are indexed by the class of the left atom and columns by the class of the right atom.
/// `0` means no space, `1` a thin space in display and text styles only,
///     `2` a thin space, `3` a medium space in display and text styles only,
///     and `4` a thick space in display and text styles only.
/// `*` marks pairs that cannot occur after binary operators have been reclassified.
///
/// TeX.2021.764.
const MATH_SPACING: [&[u8; 8]; 8] = [
    b"02340001", b"22*40001", b"33**3**3", b"44*04004", b"00*00000", b"02340001", b"11*11111",
    b"12341011",
];

/// A font that a formula needs but is missing, or that lacks font dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsufficientFonts {
    pub family: u8,
    pub size: MathSize,
    pub num_dimens: usize,
    pub required: usize,
}

impl std::fmt::Display for InsufficientFonts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let which = match self.size {
            MathSize::Text => "\\textfont",
            MathSize::Script => "\\scriptfont",
            MathSize::ScriptScript => "\\scriptscriptfont",
        };
        write!(
            f,
            "{which}{} has {} font dimensions but at least {} are required",
            self.family, self.num_dimens, self.required
        )
    }
}

/// Everything the conversion reads from the engine: fonts and parameters.
pub struct Context<'a> {
    fonts: &'a FontRepo,
    families: [[FontId; 16]; 3],
    script_space: Scaled,
    null_delimiter_space: Scaled,
    delimiter_shortfall: Scaled,
    delimiter_factor: i32,
    bin_op_penalty: i32,
    rel_penalty: i32,
    thin_mu_skip: Glue,
    med_mu_skip: Glue,
    thick_mu_skip: Glue,
    /// Characters that were requested but are not in their font.
    pub missing_characters: Vec<(String, char)>,
}

impl<'a> Context<'a> {
    /// Captures the fonts and parameters currently in effect.
    pub fn new<S>(vm: &'a VM<S>) -> Context<'a> {
        let chain = vm.chain();
        let mut families = [[FontId::NULL_FONT; 16]; 3];
        for (i, size) in SIZES.into_iter().enumerate() {
            for fam in 0..16_u8 {
                families[i][fam as usize] = chain.font(Address::FamilyFont(size, fam));
            }
        }
        let dimen = |p| chain.dimen(Address::Dimension(p));
        let integer = |p| chain.integer(Address::Integer(p));
        let mu_glue = |p| chain.glue(Address::MuGlue(p));
        Context {
            fonts: &vm.fonts,
            families,
            script_space: dimen(DimenParameter::ScriptSpace),
            null_delimiter_space: dimen(DimenParameter::NullDelimiterSpace),
            delimiter_shortfall: dimen(DimenParameter::DelimiterShortfall),
            delimiter_factor: integer(IntegerParameter::DelimiterFactor),
            bin_op_penalty: integer(IntegerParameter::BinOpPenalty),
            rel_penalty: integer(IntegerParameter::RelPenalty),
            thin_mu_skip: mu_glue(MuGlueParameter::ThinMuSkip),
            med_mu_skip: mu_glue(MuGlueParameter::MedMuSkip),
            thick_mu_skip: mu_glue(MuGlueParameter::ThickMuSkip),
            missing_characters: vec![],
        }
    }

    /// Checks that the symbol and extension fonts have enough font dimensions at every size.
    ///
    /// TeX.2021.1195.
    pub fn check_fonts(&self) -> Result<(), InsufficientFonts> {
        for size in SIZES {
            for (family, required) in [(2, TOTAL_MATHSY_PARAMS), (3, TOTAL_MATHEX_PARAMS)] {
                let num_dimens = self.font(size, family).num_dimens();
                if num_dimens < required {
                    return Err(InsufficientFonts {
                        family,
                        size,
                        num_dimens,
                        required,
                    });
                }
            }
        }
        Ok(())
    }

    fn font_id(&self, size: MathSize, family: u8) -> FontId {
        self.families[size as usize][(family & 0xF) as usize]
    }

    fn font(&self, size: MathSize, family: u8) -> &Rc<dyn Font> {
        self.fonts.get(self.font_id(size, family))
    }

    fn mathsy(&self, number: usize, size: MathSize) -> Scaled {
        self.font(size, 2).dimen(number).unwrap_or_default()
    }

    fn mathex(&self, number: usize, size: MathSize) -> Scaled {
        self.font(size, 3).dimen(number).unwrap_or_default()
    }

    fn axis_height(&self, size: MathSize) -> Scaled {
        self.mathsy(mathsy::AXIS_HEIGHT, size)
    }

    fn default_rule_thickness(&self, size: MathSize) -> Scaled {
        self.mathex(mathex::DEFAULT_RULE_THICKNESS, size)
    }

    /// The size of one math unit in the style: one eighteenth of the quad of the symbol font.
    fn math_unit(&self, style: Style) -> Scaled {
        self.mathsy(mathsy::MATH_QUAD, style.size())
            .x_over_n(18)
            .map(|(q, _)| q)
            .unwrap_or_default()
    }

    /// Looks up a character, recording it if the font does not have it.
    ///
    /// TeX.2021.722.
    fn fetch(&mut self, c: MathChar, size: MathSize) -> Option<(FontId, font::GlyphMetrics)> {
        let id = self.font_id(size, c.family);
        let fonts = self.fonts;
        let font = fonts.get(id);
        match font.glyph(c.char) {
            Some(metrics) => Some((id, metrics)),
            None => {
                log::warn!("missing character {:?} in font {}", c.char, font.name());
                self.missing_characters.push((font.name().to_string(), c.char));
                None
            }
        }
    }
}

fn char_node(c: char, font: FontId, metrics: &font::GlyphMetrics) -> Horizontal {
    Horizontal::Char(node::Char {
        char: c,
        font: font.0,
        width: metrics.width,
        height: metrics.height,
        depth: metrics.depth,
    })
}

/// Multiplies a length in mu by the math unit, given as `n + f/2^16`.
///
/// TeX.2021.716.
fn mu_mult(x: Scaled, n: i32, f: i32) -> Scaled {
    x.xn_over_d(f, 0o200000)
        .and_then(|(y, _)| x.nx_plus_y(n, y))
        .unwrap_or_default()
}

fn split_math_unit(m: Scaled) -> (i32, i32) {
    let mut n = m.0 / 0o200000;
    let mut f = m.0 % 0o200000;
    if f < 0 {
        n -= 1;
        f += 0o200000;
    }
    (n, f)
}

/// Converts glue measured in mu to glue measured in points.
///
/// Infinite stretch and shrink are unchanged.
///
/// TeX.2021.716.
pub fn math_glue(g: Glue, m: Scaled) -> Glue {
    let (n, f) = split_math_unit(m);
    let convert = |c: GlueComponent| {
        if c.order == 0 {
            GlueComponent::finite(mu_mult(c.scaled(), n, f))
        } else {
            c
        }
    };
    Glue {
        width: convert(g.width),
        stretch: convert(g.stretch),
        shrink: convert(g.shrink),
    }
}

/// Converts a kern measured in mu to a kern measured in points.
///
/// TeX.2021.717.
pub fn math_kern(width: Scaled, m: Scaled) -> Scaled {
    let (n, f) = split_math_unit(m);
    mu_mult(width, n, f)
}

/// Glue that stretches and shrinks infinitely: `0pt plus 1fil minus 1fil`.
fn ss_glue() -> Horizontal {
    Horizontal::Glue(node::Glue {
        kind: node::GlueKind::Normal,
        glue: Glue {
            width: GlueComponent::ZERO,
            stretch: GlueComponent::new(Scaled::ONE.0 as i64, 1),
            shrink: GlueComponent::new(Scaled::ONE.0 as i64, 1),
        },
    })
}

/// Changes the width of a box, centering its contents.
///
/// TeX.2021.715.
fn rebox(b: HList, width: Scaled) -> HList {
    if b.width == width || b.list.is_empty() {
        return HList { width, ..b };
    }
    let mut list = b.list;
    if let [Horizontal::Char(c)] = list.as_slice() {
        // The box width may include an italic correction.
        if c.width != b.width {
            let kern = b.width - c.width;
            list.push(Horizontal::Kern(node::Kern::new(kern)));
        }
    }
    let mut nodes = vec![ss_glue()];
    nodes.extend(list);
    nodes.push(ss_glue());
    HList {
        width,
        shift_amount: Scaled::ZERO,
        ..hpack(nodes)
    }
}

fn fraction_rule(thickness: Scaled) -> Vertical {
    Vertical::Rule(node::Rule {
        height: thickness,
        depth: Scaled::ZERO,
        ..node::Rule::new()
    })
}

fn vertical_kern(width: Scaled) -> Vertical {
    Vertical::Kern(node::Kern::new(width))
}

/// An item of the list between the two passes.
enum Item {
    Atom {
        class: MathClass,
        nodes: Vec<Horizontal>,
    },
    Left(Delimiter),
    Middle(Delimiter),
    Right(Delimiter),
    Node(Horizontal),
}

/// Converts a math list into a horizontal list.
///
/// Penalties for line breaks after binary operators and relations are only inserted
///     if `penalties` is true, which is the case for the outer list of inline formulas.
///
/// TeX.2021.726.
pub fn mlist_to_hlist(
    ctx: &mut Context,
    list: &[Noad],
    style: Style,
    penalties: bool,
) -> Vec<Horizontal> {
    let mu = ctx.math_unit(style);
    let mut items: Vec<Item> = Vec::with_capacity(list.len());
    // Index and class of the previous atom, for reclassifying binary operators.
    let mut r: Option<usize> = None;
    let mut r_type = MathClass::Op;
    let mut max_h = Scaled::ZERO;
    let mut max_d = Scaled::ZERO;
    let reclassify_previous_bin = |items: &mut Vec<Item>, r: Option<usize>, r_type: MathClass| {
        if r_type != MathClass::Bin {
            return;
        }
        if let Some(Item::Atom { class, .. }) = r.and_then(|i| items.get_mut(i)) {
            *class = MathClass::Ord;
        }
    };
    for noad in list {
        match noad {
            Noad::Atom(atom) => {
                let mut class = atom.class;
                if class == MathClass::Bin
                    && matches!(
                        r_type,
                        MathClass::Bin
                            | MathClass::Op
                            | MathClass::Rel
                            | MathClass::Open
                            | MathClass::Punct
                    )
                {
                    class = MathClass::Ord;
                }
                if matches!(class, MathClass::Rel | MathClass::Close | MathClass::Punct) {
                    reclassify_previous_bin(&mut items, r, r_type);
                }
                let nodes = typeset_atom(ctx, atom, class, style);
                let z = hpack(nodes.clone());
                max_h = max_h.max(z.height);
                max_d = max_d.max(z.depth);
                r = Some(items.len());
                r_type = class;
                items.push(Item::Atom { class, nodes });
            }
            Noad::Fraction(fraction) => {
                let b = make_fraction(ctx, fraction, style);
                max_h = max_h.max(b.height);
                max_d = max_d.max(b.depth);
                r = Some(items.len());
                r_type = MathClass::Inner;
                items.push(Item::Atom {
                    class: MathClass::Inner,
                    nodes: vec![Horizontal::HList(b)],
                });
            }
            Noad::Left(d) => {
                r = None;
                r_type = MathClass::Open;
                items.push(Item::Left(*d));
            }
            Noad::Middle(d) => {
                reclassify_previous_bin(&mut items, r, r_type);
                r = None;
                r_type = MathClass::Open;
                items.push(Item::Middle(*d));
            }
            Noad::Right(d) => {
                reclassify_previous_bin(&mut items, r, r_type);
                r = None;
                r_type = MathClass::Open;
                items.push(Item::Right(*d));
            }
            Noad::MuKern(width) => {
                items.push(Item::Node(Horizontal::Kern(node::Kern {
                    kind: node::KernKind::Math,
                    width: math_kern(*width, mu),
                })));
            }
            Noad::MuGlue(glue) => {
                items.push(Item::Node(Horizontal::Glue(node::Glue {
                    kind: node::GlueKind::Normal,
                    glue: math_glue(*glue, mu),
                })));
            }
            Noad::Node(node) => {
                if let Horizontal::Rule(rule) = node {
                    max_h = max_h.max(rule.height);
                    max_d = max_d.max(rule.depth);
                }
                items.push(Item::Node(node.clone()));
            }
        }
    }
    reclassify_previous_bin(&mut items, r, r_type);

    // Second pass: TeX.2021.760.
    let mut result = vec![];
    let mut r_type: Option<MathClass> = None;
    let mut items = items.into_iter().peekable();
    while let Some(item) = items.next() {
        let mut after = None;
        let (t, nodes, penalty) = match item {
            Item::Node(node) => {
                result.push(node);
                continue;
            }
            Item::Atom { class, nodes } => {
                let penalty = match class {
                    MathClass::Bin => ctx.bin_op_penalty,
                    MathClass::Rel => ctx.rel_penalty,
                    _ => node::Penalty::INFINITE,
                };
                (class, nodes, penalty)
            }
            Item::Left(d) => (
                MathClass::Open,
                vec![make_left_right(ctx, &d, style, max_h, max_d)],
                node::Penalty::INFINITE,
            ),
            Item::Middle(d) => {
                after = Some(MathClass::Open);
                (
                    MathClass::Close,
                    vec![make_left_right(ctx, &d, style, max_h, max_d)],
                    node::Penalty::INFINITE,
                )
            }
            Item::Right(d) => (
                MathClass::Close,
                vec![make_left_right(ctx, &d, style, max_h, max_d)],
                node::Penalty::INFINITE,
            ),
        };
        if let Some(r_type) = r_type {
            if let Some(glue) = spacing(ctx, r_type, t, style, mu) {
                result.push(glue);
            }
        }
        result.extend(nodes);
        if penalties && penalty < node::Penalty::INFINITE {
            let allowed = match items.peek() {
                None => false,
                Some(Item::Node(Horizontal::Penalty(_))) => false,
                Some(Item::Atom {
                    class: MathClass::Rel,
                    ..
                }) => false,
                Some(_) => true,
            };
            if allowed {
                result.push(Horizontal::Penalty(node::Penalty { value: penalty }));
            }
        }
        // A middle delimiter closes the material before it and opens the material after it.
        r_type = Some(after.unwrap_or(t));
    }
    result
}

/// Returns the glue between two adjacent atoms.
///
/// TeX.2021.766.
fn spacing(
    ctx: &Context,
    left: MathClass,
    right: MathClass,
    style: Style,
    mu: Scaled,
) -> Option<Horizontal> {
    let code = MATH_SPACING[left.index()][right.index()];
    let parameter = match code {
        b'1' if style.is_text_or_larger() => node::GlueParameter::ThinMuSkip,
        b'2' => node::GlueParameter::ThinMuSkip,
        b'3' if style.is_text_or_larger() => node::GlueParameter::MedMuSkip,
        b'4' if style.is_text_or_larger() => node::GlueParameter::ThickMuSkip,
        _ => return None,
    };
    let glue = match parameter {
        node::GlueParameter::ThinMuSkip => ctx.thin_mu_skip,
        node::GlueParameter::MedMuSkip => ctx.med_mu_skip,
        node::GlueParameter::ThickMuSkip => ctx.thick_mu_skip,
    };
    Some(Horizontal::Glue(node::Glue {
        kind: node::GlueKind::Parameter(parameter),
        glue: math_glue(glue, mu),
    }))
}

/// Typesets an atom: its nucleus and scripts.
///
/// TeX.2021.728 and TeX.2021.754.
fn typeset_atom(ctx: &mut Context, atom: &Atom, class: MathClass, style: Style) -> Vec<Horizontal> {
    let size = style.size();
    let mut delta = Scaled::ZERO;
    let mut nodes = vec![];
    let limits = class == MathClass::Op && style.is_display();
    match (&atom.nucleus, class) {
        (Field::Char(c), MathClass::Op) => {
            // TeX.2021.749.
            if let Some(metrics) = ctx.font(size, c.family).glyph(c.char) {
                delta = metrics.italic_correction;
            }
            let mut x = clean_box(ctx, &atom.nucleus, style);
            if !atom.subscript.is_empty() && !limits {
                x.width = x.width - delta;
            }
            x.shift_amount = (x.height - x.depth).half() - ctx.axis_height(size);
            nodes.push(Horizontal::HList(x));
        }
        (Field::Char(c), _) => {
            // TeX.2021.755.
            if let Some((id, metrics)) = ctx.fetch(*c, size) {
                delta = metrics.italic_correction;
                nodes.push(char_node(c.char, id, &metrics));
                let text_char = class == MathClass::Ord && !atom.has_scripts();
                let is_text_font = ctx
                    .fonts
                    .get(id)
                    .dimen(font::dimen::SPACE)
                    .is_some_and(|space| space != Scaled::ZERO);
                if text_char && is_text_font {
                    delta = Scaled::ZERO;
                }
                if atom.subscript.is_empty() && delta != Scaled::ZERO {
                    nodes.push(Horizontal::Kern(node::Kern::new(delta)));
                    delta = Scaled::ZERO;
                }
            }
        }
        (Field::Empty, _) => {}
        (Field::List(list), _) => {
            let inner = mlist_to_hlist(ctx, list, style, false);
            nodes.push(Horizontal::HList(hpack(inner)));
        }
    }
    if limits {
        let nucleus = match nodes.pop() {
            Some(Horizontal::HList(b)) => b,
            Some(other) => hpack(vec![other]),
            None => HList::new_null_box(),
        };
        return vec![Horizontal::VList(make_limits(ctx, atom, nucleus, delta, style))];
    }
    if atom.has_scripts() {
        let scripts = make_scripts(ctx, atom, &nodes, delta, style);
        nodes.push(scripts);
    }
    nodes
}

/// Constructs a box with limits above and below the operator.
///
/// TeX.2021.750.
fn make_limits(ctx: &mut Context, atom: &Atom, nucleus: HList, delta: Scaled, style: Style) -> VList {
    let size = style.size();
    let x = clean_box(ctx, &atom.superscript, style.superscript());
    let y = clean_hlist(vec![Horizontal::HList(nucleus)]);
    let z = clean_box(ctx, &atom.subscript, style.subscript());
    let width = y.width.max(x.width).max(z.width);
    let mut x = rebox(x, width);
    let y = rebox(y, width);
    let mut z = rebox(z, width);
    x.shift_amount = delta.half();
    z.shift_amount = -x.shift_amount;
    let mut v = VList {
        height: y.height,
        depth: y.depth,
        width,
        shift_amount: Scaled::ZERO,
        list: vec![],
    };
    let big_op_spacing = |n| ctx.mathex(n, size);
    let spacing5 = big_op_spacing(mathex::BIG_OP_SPACING5);
    if !atom.superscript.is_empty() {
        let shift_up = (big_op_spacing(mathex::BIG_OP_SPACING3) - x.depth)
            .max(big_op_spacing(mathex::BIG_OP_SPACING1));
        v.height = v.height + spacing5 + x.height + x.depth + shift_up;
        v.list.push(vertical_kern(spacing5));
        v.list.push(Vertical::HList(x));
        v.list.push(vertical_kern(shift_up));
    }
    v.list.push(Vertical::HList(y));
    if !atom.subscript.is_empty() {
        let shift_down = (big_op_spacing(mathex::BIG_OP_SPACING4) - z.height)
            .max(big_op_spacing(mathex::BIG_OP_SPACING2));
        v.depth = v.depth + spacing5 + z.height + z.depth + shift_down;
        v.list.push(vertical_kern(shift_down));
        v.list.push(Vertical::HList(z));
        v.list.push(vertical_kern(spacing5));
    }
    v
}

/// Attaches the superscript and subscript to a typeset nucleus.
///
/// Returns the box holding the scripts, which is appended to the nucleus.
///
/// TeX.2021.756.
pub fn make_scripts(
    ctx: &mut Context,
    atom: &Atom,
    nucleus: &[Horizontal],
    delta: Scaled,
    style: Style,
) -> Horizontal {
    let size = style.size();
    let (mut shift_up, mut shift_down) = match nucleus.first() {
        Some(Horizontal::Char(_)) => (Scaled::ZERO, Scaled::ZERO),
        _ => {
            let z = hpack(nucleus.to_vec());
            let t = style.script_size();
            (
                z.height - ctx.mathsy(mathsy::SUP_DROP, t),
                z.depth + ctx.mathsy(mathsy::SUB_DROP, t),
            )
        }
    };
    let x_height = ctx.mathsy(mathsy::MATH_X_HEIGHT, size);
    let four_fifths_x_height = Scaled((x_height.0 * 4).abs() / 5);
    if atom.superscript.is_empty() {
        // TeX.2021.757.
        let mut x = clean_box(ctx, &atom.subscript, style.subscript());
        x.width = x.width + ctx.script_space;
        shift_down = shift_down
            .max(ctx.mathsy(mathsy::SUB1, size))
            .max(x.height - four_fifths_x_height);
        x.shift_amount = shift_down;
        return Horizontal::HList(x);
    }
    // TeX.2021.758.
    let mut x = clean_box(ctx, &atom.superscript, style.superscript());
    x.width = x.width + ctx.script_space;
    let clr = if style.is_cramped() {
        ctx.mathsy(mathsy::SUP3, size)
    } else if style.is_display() {
        ctx.mathsy(mathsy::SUP1, size)
    } else {
        ctx.mathsy(mathsy::SUP2, size)
    };
    shift_up = shift_up
        .max(clr)
        .max(x.depth + Scaled(x_height.0.abs() / 4));
    if atom.subscript.is_empty() {
        x.shift_amount = -shift_up;
        return Horizontal::HList(x);
    }
    // TeX.2021.759.
    let mut y = clean_box(ctx, &atom.subscript, style.subscript());
    y.width = y.width + ctx.script_space;
    shift_down = shift_down.max(ctx.mathsy(mathsy::SUB2, size));
    let clr = ctx.default_rule_thickness(size) * 4
        - ((shift_up - x.depth) - (y.height - shift_down));
    if clr > Scaled::ZERO {
        shift_down = shift_down + clr;
        let clr = four_fifths_x_height - (shift_up - x.depth);
        if clr > Scaled::ZERO {
            shift_up = shift_up + clr;
            shift_down = shift_down - clr;
        }
    }
    x.shift_amount = delta;
    let kern = (shift_up - x.depth) - (y.height - shift_down);
    let mut b = vpack(vec![
        Vertical::HList(x),
        vertical_kern(kern),
        Vertical::HList(y),
    ]);
    b.shift_amount = shift_down;
    Horizontal::VList(b)
}

/// Typesets a generalized fraction.
///
/// TeX.2021.743.
fn make_fraction(ctx: &mut Context, fraction: &Fraction, style: Style) -> HList {
    let size = style.size();
    let thickness = fraction
        .thickness
        .unwrap_or_else(|| ctx.default_rule_thickness(size));
    // TeX.2021.744.
    let mut x = clean_box_list(ctx, &fraction.numerator, style.numerator());
    let mut z = clean_box_list(ctx, &fraction.denominator, style.denominator());
    if x.width < z.width {
        x = rebox(x, z.width);
    } else {
        z = rebox(z, x.width);
    }
    let (mut shift_up, mut shift_down) = if style.is_display() {
        (ctx.mathsy(mathsy::NUM1, size), ctx.mathsy(mathsy::DENOM1, size))
    } else if thickness != Scaled::ZERO {
        (ctx.mathsy(mathsy::NUM2, size), ctx.mathsy(mathsy::DENOM2, size))
    } else {
        (ctx.mathsy(mathsy::NUM3, size), ctx.mathsy(mathsy::DENOM2, size))
    };
    let axis_height = ctx.axis_height(size);
    let rule_thickness = ctx.default_rule_thickness(size);
    let mut delta = Scaled::ZERO;
    if thickness == Scaled::ZERO {
        // TeX.2021.745.
        let clr = if style.is_display() {
            rule_thickness * 7
        } else {
            rule_thickness * 3
        };
        let delta = (clr - ((shift_up - x.depth) - (z.height - shift_down))).half();
        if delta > Scaled::ZERO {
            shift_up = shift_up + delta;
            shift_down = shift_down + delta;
        }
    } else {
        // TeX.2021.746.
        let clr = if style.is_display() {
            thickness * 3
        } else {
            thickness
        };
        delta = thickness.half();
        let delta1 = clr - ((shift_up - x.depth) - (axis_height + delta));
        let delta2 = clr - ((axis_height - delta) - (z.height - shift_down));
        if delta1 > Scaled::ZERO {
            shift_up = shift_up + delta1;
        }
        if delta2 > Scaled::ZERO {
            shift_down = shift_down + delta2;
        }
    }
    // TeX.2021.747.
    let mut v = VList {
        height: shift_up + x.height,
        depth: z.depth + shift_down,
        width: x.width,
        shift_amount: Scaled::ZERO,
        list: vec![],
    };
    let gap = (shift_up - x.depth) - (z.height - shift_down);
    let x_depth = x.depth;
    let z_height = z.height;
    v.list.push(Vertical::HList(x));
    if thickness == Scaled::ZERO {
        v.list.push(vertical_kern(gap));
    } else {
        v.list
            .push(vertical_kern((shift_up - x_depth) - (axis_height + delta)));
        v.list.push(fraction_rule(thickness));
        v.list
            .push(vertical_kern((axis_height - delta) - (z_height - shift_down)));
    }
    v.list.push(Vertical::HList(z));
    // TeX.2021.748.
    let delimiter_size = if style.is_display() {
        ctx.mathsy(mathsy::DELIM1, size)
    } else {
        ctx.mathsy(mathsy::DELIM2, size)
    };
    let left = var_delimiter(ctx, &fraction.left, size, delimiter_size);
    let right = var_delimiter(ctx, &fraction.right, size, delimiter_size);
    hpack(vec![
        Horizontal::HList(left),
        Horizontal::VList(v),
        Horizontal::HList(right),
    ])
}

/// Typesets a `\left`, `\middle` or `\right` delimiter to cover the list.
///
/// TeX.2021.762.
fn make_left_right(
    ctx: &mut Context,
    delimiter: &Delimiter,
    style: Style,
    max_h: Scaled,
    max_d: Scaled,
) -> Horizontal {
    let size = style.size();
    let mut delta2 = max_d + ctx.axis_height(size);
    let mut delta1 = max_h + max_d - delta2;
    if delta2 > delta1 {
        delta1 = delta2;
    }
    let mut delta = Scaled((delta1.0 / 500).saturating_mul(ctx.delimiter_factor));
    delta2 = delta1 + delta1 - ctx.delimiter_shortfall;
    if delta < delta2 {
        delta = delta2;
    }
    Horizontal::HList(var_delimiter(ctx, delimiter, size, delta))
}

/// Builds a delimiter whose height plus depth is at least `v`, if possible.
///
/// The small variant is tried first, then the large variant;
///     each is looked up in the font of the requested size and then in the larger sizes.
/// The tallest glyph found is used if none is tall enough.
/// A null delimiter becomes an empty box of width `\nulldelimiterspace`.
///
/// TeX.2021.706.
pub fn var_delimiter(ctx: &mut Context, delimiter: &Delimiter, size: MathSize, v: Scaled) -> HList {
    let mut best: Option<(FontId, char, font::GlyphMetrics)> = None;
    let mut w = Scaled::ZERO;
    'search: for variant in [delimiter.small, delimiter.large].into_iter().flatten() {
        for candidate in SIZES.into_iter().rev().filter(|s| *s <= size) {
            let id = ctx.font_id(candidate, variant.family);
            if id == FontId::NULL_FONT {
                continue;
            }
            let Some(metrics) = ctx.fonts.get(id).glyph(variant.char) else {
                continue;
            };
            let hd = metrics.height + metrics.depth;
            if hd > w {
                best = Some((id, variant.char, metrics));
                w = hd;
                if hd >= v {
                    break 'search;
                }
            }
        }
    }
    let mut b = match best {
        // TeX.2021.709.
        Some((id, c, metrics)) => HList {
            width: metrics.width + metrics.italic_correction,
            height: metrics.height,
            depth: metrics.depth,
            shift_amount: Scaled::ZERO,
            list: vec![char_node(c, id, &metrics)],
        },
        None => HList {
            width: ctx.null_delimiter_space,
            ..HList::new_null_box()
        },
    };
    b.shift_amount = (b.height - b.depth).half() - ctx.axis_height(size);
    b
}

/// Typesets a field in a box on its own.
///
/// TeX.2021.720.
pub fn clean_box(ctx: &mut Context, field: &Field, style: Style) -> HList {
    match field {
        Field::Empty => HList::new_null_box(),
        Field::Char(c) => {
            let list = [Noad::Atom(Atom::new(MathClass::Ord, Field::Char(*c)))];
            clean_hlist(mlist_to_hlist(ctx, &list, style, false))
        }
        Field::List(list) => clean_box_list(ctx, list, style),
    }
}

fn clean_box_list(ctx: &mut Context, list: &[Noad], style: Style) -> HList {
    clean_hlist(mlist_to_hlist(ctx, list, style, false))
}

fn clean_hlist(mut nodes: Vec<Horizontal>) -> HList {
    if nodes.len() == 1 {
        if let Some(Horizontal::HList(b)) = nodes.first() {
            if b.shift_amount == Scaled::ZERO {
                if let Some(Horizontal::HList(b)) = nodes.pop() {
                    return b;
                }
            }
        }
    }
    let mut b = hpack(nodes);
    // TeX.2021.721: an italic correction after a single character is not needed.
    if let [Horizontal::Char(_), Horizontal::Kern(_)] = b.list.as_slice() {
        b.list.pop();
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use font::{GlyphMetrics, MetricFont};

    fn pt(n: i32) -> Scaled {
        Scaled::ONE * n
    }

    struct Fixture {
        fonts: FontRepo,
        families: [[FontId; 16]; 3],
    }

    /// Fonts with round metrics.
    ///
    /// Every glyph of the text font is 5pt wide, 4pt high and 1pt deep.
    /// The symbol font has an axis height of 2pt and an x-height of 4pt.
    fn fixture(complete_symbol_font: bool) -> Fixture {
        let mut fonts = FontRepo::default();
        let glyph = GlyphMetrics {
            width: pt(5),
            height: pt(4),
            depth: pt(1),
            italic_correction: Scaled::ZERO,
        };
        let text = MetricFont::new("text", pt(10))
            .with_default_glyph(glyph)
            .with_params(vec![Scaled::ZERO; 7]);
        let mut sy_params = vec![Scaled::ZERO; 22];
        sy_params[mathsy::MATH_X_HEIGHT - 1] = pt(4);
        sy_params[mathsy::MATH_QUAD - 1] = pt(18);
        sy_params[mathsy::SUP1 - 1] = pt(4);
        sy_params[mathsy::SUP2 - 1] = pt(3);
        sy_params[mathsy::SUP3 - 1] = pt(2);
        sy_params[mathsy::SUB1 - 1] = pt(1);
        sy_params[mathsy::SUB2 - 1] = pt(2);
        sy_params[mathsy::AXIS_HEIGHT - 1] = pt(2);
        sy_params[mathsy::NUM2 - 1] = pt(6);
        sy_params[mathsy::DENOM2 - 1] = pt(6);
        if !complete_symbol_font {
            sy_params.truncate(20);
        }
        let symbols = MetricFont::new("symbols", pt(10))
            .with_default_glyph(glyph)
            .with_params(sy_params);
        let mut ex_params = vec![Scaled::ZERO; 13];
        ex_params[mathex::DEFAULT_RULE_THICKNESS - 1] = pt(1);
        let extension = MetricFont::new("extension", pt(10))
            .with_default_glyph(glyph)
            .with_params(ex_params);
        let text = fonts.insert(Rc::new(text));
        let symbols = fonts.insert(Rc::new(symbols));
        let extension = fonts.insert(Rc::new(extension));
        let mut families = [[FontId::NULL_FONT; 16]; 3];
        for size in families.iter_mut() {
            size[0] = text;
            size[1] = text;
            size[2] = symbols;
            size[3] = extension;
        }
        Fixture { fonts, families }
    }

    impl Fixture {
        fn context(&self) -> Context<'_> {
            Context {
                fonts: &self.fonts,
                families: self.families,
                script_space: Scaled::ZERO,
                null_delimiter_space: pt(1),
                delimiter_shortfall: Scaled::ZERO,
                delimiter_factor: 1000,
                bin_op_penalty: 700,
                rel_penalty: 500,
                thin_mu_skip: Glue::rigid(pt(3)),
                med_mu_skip: Glue::rigid(pt(4)),
                thick_mu_skip: Glue::rigid(pt(5)),
                missing_characters: vec![],
            }
        }
    }

    fn atom(class: MathClass, c: char) -> Atom {
        Atom::new(class, Field::Char(MathChar { family: 1, char: c }))
    }

    fn glue_widths(nodes: &[Horizontal]) -> Vec<(node::GlueParameter, Scaled)> {
        nodes
            .iter()
            .filter_map(|n| match n {
                Horizontal::Glue(node::Glue {
                    kind: node::GlueKind::Parameter(p),
                    glue,
                }) => Some((*p, glue.width())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn math_glue_conversion() {
        // 1mu = 1pt exactly when the math unit is 1pt.
        let glue = Glue {
            width: GlueComponent::finite(pt(3)),
            stretch: GlueComponent::new(Scaled::ONE.0 as i64, 2),
            shrink: GlueComponent::finite(pt(1)),
        };
        let converted = math_glue(glue, Scaled::ONE);
        assert_eq!(converted.width.scaled(), pt(3));
        assert_eq!(converted.stretch, glue.stretch);
        assert_eq!(converted.shrink.scaled(), pt(1));

        let half = math_kern(pt(3), Scaled(Scaled::ONE.0 / 2));
        assert_eq!(half, Scaled(3 * Scaled::ONE.0 / 2));
    }

    #[test]
    fn fonts_check() {
        let fixture = fixture(true);
        assert_eq!(fixture.context().check_fonts(), Ok(()));
        let fixture = self::fixture(false);
        let err = fixture.context().check_fonts().unwrap_err();
        assert_eq!(err.family, 2);
        assert_eq!(err.num_dimens, 20);
        assert_eq!(err.required, TOTAL_MATHSY_PARAMS);
    }

    #[test]
    fn relation_spacing() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let list = vec![
            Noad::Atom(atom(MathClass::Ord, 'x')),
            Noad::Atom(atom(MathClass::Rel, '=')),
            Noad::Atom(atom(MathClass::Ord, 'y')),
        ];
        let nodes = mlist_to_hlist(&mut ctx, &list, Style::TEXT, true);
        // The math unit is 1pt because the quad is 18pt.
        assert_eq!(
            glue_widths(&nodes),
            vec![
                (node::GlueParameter::ThickMuSkip, pt(5)),
                (node::GlueParameter::ThickMuSkip, pt(5)),
            ]
        );
        assert!(nodes
            .iter()
            .any(|n| *n == Horizontal::Penalty(node::Penalty { value: 500 })));
    }

    #[test]
    fn no_conditional_spacing_in_script_style() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let list = vec![
            Noad::Atom(atom(MathClass::Ord, 'x')),
            Noad::Atom(atom(MathClass::Rel, '=')),
            Noad::Atom(atom(MathClass::Ord, 'y')),
        ];
        let nodes = mlist_to_hlist(&mut ctx, &list, Style::SCRIPT, false);
        assert_eq!(glue_widths(&nodes), vec![]);
    }

    #[test]
    fn leading_binary_operator_is_ordinary() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let list = vec![
            Noad::Atom(atom(MathClass::Bin, '-')),
            Noad::Atom(atom(MathClass::Ord, 'x')),
        ];
        let nodes = mlist_to_hlist(&mut ctx, &list, Style::TEXT, true);
        assert_eq!(glue_widths(&nodes), vec![]);
        assert!(!nodes.iter().any(|n| matches!(n, Horizontal::Penalty(_))));
    }

    #[test]
    fn binary_operator_spacing() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let list = vec![
            Noad::Atom(atom(MathClass::Ord, 'x')),
            Noad::Atom(atom(MathClass::Bin, '+')),
            Noad::Atom(atom(MathClass::Ord, 'y')),
        ];
        let nodes = mlist_to_hlist(&mut ctx, &list, Style::TEXT, true);
        assert_eq!(
            glue_widths(&nodes),
            vec![
                (node::GlueParameter::MedMuSkip, pt(4)),
                (node::GlueParameter::MedMuSkip, pt(4)),
            ]
        );
    }

    #[test]
    fn superscript_placement() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let mut a = atom(MathClass::Ord, 'x');
        a.superscript = Field::Char(MathChar {
            family: 1,
            char: '2',
        });
        let nodes = mlist_to_hlist(&mut ctx, &[Noad::Atom(a)], Style::TEXT, false);
        assert_eq!(nodes.len(), 2);
        let Horizontal::HList(sup) = &nodes[1] else {
            panic!("expected a box, got {:?}", nodes[1]);
        };
        // Text style uses sup2 = 3pt; depth 1pt + x-height/4 = 2pt is smaller.
        assert_eq!(sup.shift_amount, -pt(3));
    }

    #[test]
    fn subscript_placement() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let mut a = atom(MathClass::Ord, 'x');
        a.subscript = Field::Char(MathChar {
            family: 1,
            char: 'i',
        });
        let nodes = mlist_to_hlist(&mut ctx, &[Noad::Atom(a)], Style::TEXT, false);
        let Horizontal::HList(sub) = &nodes[1] else {
            panic!("expected a box, got {:?}", nodes[1]);
        };
        // sub1 = 1pt is larger than the height 4pt minus 4/5 of the 4pt x-height.
        let clearance = pt(4) - Scaled(pt(16).0 / 5);
        assert_eq!(sub.shift_amount, pt(1).max(clearance));
    }

    #[test]
    fn both_scripts_keep_a_gap() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let mut a = atom(MathClass::Ord, 'x');
        a.superscript = Field::Char(MathChar {
            family: 1,
            char: '2',
        });
        a.subscript = Field::Char(MathChar {
            family: 1,
            char: 'i',
        });
        let nodes = mlist_to_hlist(&mut ctx, &[Noad::Atom(a)], Style::TEXT, false);
        let Horizontal::VList(scripts) = &nodes[1] else {
            panic!("expected a vertical box, got {:?}", nodes[1]);
        };
        let [Vertical::HList(sup), Vertical::Kern(kern), Vertical::HList(sub)] =
            scripts.list.as_slice()
        else {
            panic!("unexpected scripts box {:?}", scripts.list);
        };
        // The gap between the superscript's depth and the subscript's height
        //     is four times the rule thickness.
        assert_eq!(kern.width, pt(4));
        assert_eq!(sup.depth, pt(1));
        assert_eq!(sub.height, pt(4));
        let correction = Scaled(pt(16).0 / 5) - pt(2);
        assert_eq!(scripts.shift_amount, pt(6) - correction);
    }

    #[test]
    fn fraction_dimensions() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let fraction = Fraction {
            numerator: vec![Noad::Atom(atom(MathClass::Ord, 'a'))],
            denominator: vec![Noad::Atom(atom(MathClass::Ord, 'b'))],
            thickness: None,
            left: Delimiter::NULL,
            right: Delimiter::NULL,
        };
        let nodes = mlist_to_hlist(&mut ctx, &[Noad::Fraction(fraction)], Style::TEXT, false);
        let [Horizontal::HList(b)] = nodes.as_slice() else {
            panic!("expected a single box, got {nodes:?}");
        };
        // Two null delimiters of 1pt around a 5pt wide fraction.
        assert_eq!(b.width, pt(7));
        let Horizontal::VList(v) = &b.list[1] else {
            panic!("expected the fraction's vertical box");
        };
        assert!(v
            .list
            .iter()
            .any(|n| matches!(n, Vertical::Rule(r) if r.height == pt(1))));
    }

    #[test]
    fn null_delimiter() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let b = var_delimiter(&mut ctx, &Delimiter::NULL, MathSize::Text, pt(10));
        assert_eq!(b.width, pt(1));
        assert!(b.list.is_empty());
        assert_eq!(b.shift_amount, -pt(2));
    }

    #[test]
    fn delimiter_uses_best_variant() {
        let fixture = fixture(true);
        let mut ctx = fixture.context();
        let d = Delimiter {
            small: Some(MathChar {
                family: 0,
                char: '(',
            }),
            large: None,
        };
        let b = var_delimiter(&mut ctx, &d, MathSize::Text, pt(50));
        assert_eq!(b.height + b.depth, pt(5));
        assert_eq!(b.width, pt(5));
    }

    #[test]
    fn missing_characters_are_recorded() {
        let mut fixture = fixture(true);
        let empty = fixture
            .fonts
            .insert(Rc::new(MetricFont::new("empty", pt(10))));
        fixture.families[0][4] = empty;
        let mut ctx = fixture.context();
        let list = vec![Noad::Atom(Atom::new(
            MathClass::Ord,
            Field::Char(MathChar {
                family: 4,
                char: 'q',
            }),
        ))];
        let nodes = mlist_to_hlist(&mut ctx, &list, Style::TEXT, false);
        assert!(nodes.is_empty());
        assert_eq!(ctx.missing_characters, vec![("empty".to_string(), 'q')]);
    }
}
