//! Packaging node lists into boxes at their natural size.
//!
//! Only natural packaging (`\hbox{...}` without `to` or `spread`) is implemented,
//!     so the glue in a packaged list is never stretched or shrunk.

use crate::node::*;
use common::Scaled;

/// Packs a horizontal list into a box of its natural size.
///
/// The width is the sum of the widths; the height and depth are the maxima,
///     taking shifted boxes into account.
///
/// TeX.2021.649 with `m=additional` and `w=0`.
pub fn hpack(list: Vec<Horizontal>) -> HList {
    let mut width = Scaled::ZERO;
    let mut height = Scaled::ZERO;
    let mut depth = Scaled::ZERO;
    for node in &list {
        let (w, h, d) = match node {
            Horizontal::Char(c) => (c.width, c.height, c.depth),
            Horizontal::HList(b) => (b.width, b.height - b.shift_amount, b.depth + b.shift_amount),
            Horizontal::VList(b) => (b.width, b.height - b.shift_amount, b.depth + b.shift_amount),
            Horizontal::Rule(r) => (r.width, r.height, r.depth),
            Horizontal::Math(m) => (m.width, Scaled::ZERO, Scaled::ZERO),
            Horizontal::Glue(g) => (g.glue.width(), Scaled::ZERO, Scaled::ZERO),
            Horizontal::Kern(k) => (k.width, Scaled::ZERO, Scaled::ZERO),
            Horizontal::Penalty(_) => (Scaled::ZERO, Scaled::ZERO, Scaled::ZERO),
        };
        width += w;
        height = height.max(h);
        depth = depth.max(d);
    }
    HList {
        height,
        width,
        depth,
        shift_amount: Scaled::ZERO,
        list,
    }
}

/// Packs a vertical list into a box of its natural size.
///
/// The depth of the box is the depth of the last box or rule;
///     any glue or kern after it makes the depth zero.
///
/// TeX.2021.668 with `m=additional`, `h=0` and no depth limit.
pub fn vpack(list: Vec<Vertical>) -> VList {
    let mut width = Scaled::ZERO;
    let mut height = Scaled::ZERO;
    let mut depth = Scaled::ZERO;
    for node in &list {
        match node {
            Vertical::HList(b) => {
                height += depth + b.height;
                depth = b.depth;
                width = width.max(b.width + b.shift_amount);
            }
            Vertical::VList(b) => {
                height += depth + b.height;
                depth = b.depth;
                width = width.max(b.width + b.shift_amount);
            }
            Vertical::Rule(r) => {
                height += depth + r.height;
                depth = r.depth;
                width = width.max(r.width);
            }
            Vertical::Glue(g) => {
                height += depth + g.glue.width();
                depth = Scaled::ZERO;
            }
            Vertical::Kern(k) => {
                height += depth + k.width;
                depth = Scaled::ZERO;
            }
            Vertical::Penalty(_) => {}
        }
    }
    VList {
        height,
        width,
        depth,
        shift_amount: Scaled::ZERO,
        list,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(n: i32) -> Scaled {
        Scaled(n * Scaled::ONE.0)
    }

    fn char_node(w: i32, h: i32, d: i32) -> Horizontal {
        Horizontal::Char(Char {
            char: 'x',
            font: 1,
            width: pt(w),
            height: pt(h),
            depth: pt(d),
        })
    }

    #[test]
    fn hpack_natural_size() {
        let b = hpack(vec![
            char_node(5, 4, 0),
            Horizontal::Kern(Kern::new(pt(2))),
            char_node(3, 6, 2),
            Horizontal::Glue(Glue {
                kind: GlueKind::Normal,
                glue: common::Glue::rigid(pt(1)),
            }),
        ]);
        assert_eq!((b.width, b.height, b.depth), (pt(11), pt(6), pt(2)));
    }

    #[test]
    fn hpack_shifted_box() {
        let mut inner = hpack(vec![char_node(1, 4, 1)]);
        inner.shift_amount = pt(2);
        let b = hpack(vec![Horizontal::HList(inner)]);
        assert_eq!((b.height, b.depth), (pt(2), pt(3)));
    }

    #[test]
    fn hpack_empty_list() {
        assert_eq!(hpack(vec![]), HList::new_null_box());
    }

    #[test]
    fn vpack_natural_size() {
        let top = hpack(vec![char_node(5, 4, 1)]);
        let bottom = hpack(vec![char_node(3, 6, 2)]);
        let b = vpack(vec![
            Vertical::HList(top),
            Vertical::Kern(Kern::new(pt(3))),
            Vertical::HList(bottom),
        ]);
        assert_eq!((b.width, b.height, b.depth), (pt(5), pt(14), pt(2)));
    }

    #[test]
    fn vpack_trailing_kern_zeroes_depth() {
        let b = vpack(vec![
            Vertical::HList(hpack(vec![char_node(5, 4, 1)])),
            Vertical::Kern(Kern::new(pt(1))),
        ]);
        assert_eq!((b.height, b.depth), (pt(6), Scaled::ZERO));
    }
}
