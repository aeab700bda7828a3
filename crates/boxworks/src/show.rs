//! Textual representation of node lists.
//!
//! The format is the one Knuth's TeX uses for `\showbox` and `\showlists`:
//!     one node per line, with nesting indicated by leading dots.
//!
//! Described in TeX.2021.173 to TeX.2021.198.

use crate::node::*;
use common::write_scaled;
use common::Scaled;
use std::fmt::Write;

/// Writes a horizontal list, one node per line.
///
/// The `font_name` closure maps font numbers in character nodes to the name that is printed.
pub fn write_horizontal_list<W: Write>(
    w: &mut W,
    list: &[Horizontal],
    font_name: &dyn Fn(u32) -> String,
) -> std::fmt::Result {
    let mut printer = Printer { w, font_name };
    for node in list {
        printer.horizontal(node, 0)?;
    }
    Ok(())
}

/// Writes a vertical list, one node per line.
pub fn write_vertical_list<W: Write>(
    w: &mut W,
    list: &[Vertical],
    font_name: &dyn Fn(u32) -> String,
) -> std::fmt::Result {
    let mut printer = Printer { w, font_name };
    for node in list {
        printer.vertical(node, 0)?;
    }
    Ok(())
}

struct Printer<'a, W> {
    w: &'a mut W,
    font_name: &'a dyn Fn(u32) -> String,
}

impl<'a, W: Write> Printer<'a, W> {
    fn indent(&mut self, depth: usize) -> std::fmt::Result {
        for _ in 0..depth {
            self.w.write_char('.')?;
        }
        Ok(())
    }

    fn dimen(&mut self, s: Scaled) -> std::fmt::Result {
        write_scaled(self.w, s.0 as i64)
    }

    fn rule_dimen(&mut self, s: Scaled) -> std::fmt::Result {
        if s == Rule::RUNNING {
            self.w.write_char('*')
        } else {
            self.dimen(s)
        }
    }

    fn box_header(
        &mut self,
        name: &str,
        height: Scaled,
        depth: Scaled,
        width: Scaled,
        shift_amount: Scaled,
    ) -> std::fmt::Result {
        write!(self.w, "\\{name}(")?;
        self.dimen(height)?;
        self.w.write_char('+')?;
        self.dimen(depth)?;
        self.w.write_str(")x")?;
        self.dimen(width)?;
        if shift_amount != Scaled::ZERO {
            self.w.write_str(", shifted ")?;
            self.dimen(shift_amount)?;
        }
        self.w.write_char('\n')
    }

    fn horizontal(&mut self, node: &Horizontal, depth: usize) -> std::fmt::Result {
        self.indent(depth)?;
        match node {
            Horizontal::Char(c) => {
                writeln!(self.w, "\\{} {}", (self.font_name)(c.font), c.char)
            }
            Horizontal::HList(b) => self.hlist(b, depth),
            Horizontal::VList(b) => self.vlist(b, depth),
            Horizontal::Rule(r) => self.rule(r),
            Horizontal::Math(m) => {
                match m.kind {
                    MathKind::Before => self.w.write_str("\\mathon")?,
                    MathKind::After => self.w.write_str("\\mathoff")?,
                }
                if m.width != Scaled::ZERO {
                    self.w.write_str(", surrounded ")?;
                    self.dimen(m.width)?;
                }
                self.w.write_char('\n')
            }
            Horizontal::Glue(g) => self.glue(g),
            Horizontal::Kern(k) => self.kern(k),
            Horizontal::Penalty(p) => writeln!(self.w, "\\penalty {}", p.value),
        }
    }

    fn vertical(&mut self, node: &Vertical, depth: usize) -> std::fmt::Result {
        self.indent(depth)?;
        match node {
            Vertical::HList(b) => self.hlist(b, depth),
            Vertical::VList(b) => self.vlist(b, depth),
            Vertical::Rule(r) => self.rule(r),
            Vertical::Glue(g) => self.glue(g),
            Vertical::Kern(k) => self.kern(k),
            Vertical::Penalty(p) => writeln!(self.w, "\\penalty {}", p.value),
        }
    }

    fn hlist(&mut self, b: &HList, depth: usize) -> std::fmt::Result {
        self.box_header("hbox", b.height, b.depth, b.width, b.shift_amount)?;
        for node in &b.list {
            self.horizontal(node, depth + 1)?;
        }
        Ok(())
    }

    fn vlist(&mut self, b: &VList, depth: usize) -> std::fmt::Result {
        self.box_header("vbox", b.height, b.depth, b.width, b.shift_amount)?;
        for node in &b.list {
            self.vertical(node, depth + 1)?;
        }
        Ok(())
    }

    fn rule(&mut self, r: &Rule) -> std::fmt::Result {
        self.w.write_str("\\rule(")?;
        self.rule_dimen(r.height)?;
        self.w.write_char('+')?;
        self.rule_dimen(r.depth)?;
        self.w.write_str(")x")?;
        self.rule_dimen(r.width)?;
        self.w.write_char('\n')
    }

    fn glue(&mut self, g: &Glue) -> std::fmt::Result {
        self.w.write_str("\\glue")?;
        if let GlueKind::Parameter(parameter) = g.kind {
            write!(self.w, "(\\{})", parameter.name())?;
        }
        self.w.write_char(' ')?;
        g.glue.write_with_unit(self.w, "")?;
        self.w.write_char('\n')
    }

    fn kern(&mut self, k: &Kern) -> std::fmt::Result {
        match k.kind {
            KernKind::Normal => self.w.write_str("\\kern")?,
            KernKind::Explicit => self.w.write_str("\\kern ")?,
            KernKind::Math => self.w.write_str("\\mkern")?,
        }
        self.dimen(k.width)?;
        if k.kind == KernKind::Math {
            self.w.write_str("mu")?;
        }
        self.w.write_char('\n')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::hpack;

    fn pt(n: i32) -> Scaled {
        Scaled(n * Scaled::ONE.0)
    }

    #[test]
    fn show_hbox() {
        let list = vec![Horizontal::HList(hpack(vec![
            Horizontal::Char(Char {
                char: 'a',
                font: 1,
                width: pt(5),
                height: pt(4),
                depth: Scaled::ZERO,
            }),
            Horizontal::Kern(Kern {
                kind: KernKind::Explicit,
                width: pt(2),
            }),
            Horizontal::Penalty(Penalty { value: 100 }),
            Horizontal::Math(Math {
                kind: MathKind::After,
                width: Scaled::ZERO,
            }),
        ]))];
        let mut s = String::new();
        write_horizontal_list(&mut s, &list, &|_| "tenrm".to_string()).unwrap();
        assert_eq!(
            s,
            "\\hbox(4.0+0.0)x7.0\n.\\tenrm a\n.\\kern 2.0\n.\\penalty 100\n.\\mathoff\n"
        );
    }

    #[test]
    fn show_glue_and_rule() {
        let list = vec![
            Vertical::Glue(Glue {
                kind: GlueKind::Normal,
                glue: common::Glue {
                    width: pt(3).into(),
                    stretch: common::GlueComponent::new(65536, 1),
                    shrink: common::GlueComponent::ZERO,
                },
            }),
            Vertical::Rule(Rule {
                height: pt(1),
                depth: Scaled::ZERO,
                width: Rule::RUNNING,
            }),
        ];
        let mut s = String::new();
        write_vertical_list(&mut s, &list, &|_| String::new()).unwrap();
        assert_eq!(s, "\\glue 3.0 plus 1.0fil\n\\rule(1.0+0.0)x*\n");
    }
}
