//! Math styles.
//!
//! TeX typesets every part of a formula in one of eight styles.
//! The style determines the size of the fonts and how scripts and fractions are placed.
//! The numbering follows TeX.2021.688, so that the derived styles
//!     can be computed with integer arithmetic.

use texweave::group::MathSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Style(u8);

impl Style {
    pub const DISPLAY: Style = Style(0);
    pub const TEXT: Style = Style(2);
    pub const SCRIPT: Style = Style(4);
    pub const SCRIPT_SCRIPT: Style = Style(6);

    pub fn is_cramped(&self) -> bool {
        self.0 % 2 == 1
    }

    pub fn cramped(&self) -> Style {
        Style(2 * (self.0 / 2) + 1)
    }

    pub fn superscript(&self) -> Style {
        Style(2 * (self.0 / 4) + 4 + self.0 % 2)
    }

    pub fn subscript(&self) -> Style {
        Style(2 * (self.0 / 4) + 5)
    }

    pub fn numerator(&self) -> Style {
        Style(self.0 + 2 - 2 * (self.0 / 6))
    }

    pub fn denominator(&self) -> Style {
        Style(2 * (self.0 / 2) + 3 - 2 * (self.0 / 6))
    }

    /// The size of the fonts used in this style.
    pub fn size(&self) -> MathSize {
        if self.0 < 4 {
            MathSize::Text
        } else if self.0 < 6 {
            MathSize::Script
        } else {
            MathSize::ScriptScript
        }
    }

    /// Whether this is display style, cramped or not.
    pub fn is_display(&self) -> bool {
        self.0 < 2
    }

    /// Whether this is display or text style; conditional spaces only appear here.
    pub fn is_text_or_larger(&self) -> bool {
        *self < Style::SCRIPT
    }

    /// Size of the scripts' fonts, used for the `sup_drop` and `sub_drop` parameters.
    ///
    /// TeX.2021.756.
    pub fn script_size(&self) -> MathSize {
        if *self < Style::SCRIPT {
            MathSize::Script
        } else {
            MathSize::ScriptScript
        }
    }
}

impl std::fmt::Display for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 / 2 {
            0 => "display",
            1 => "text",
            2 => "script",
            _ => "scriptscript",
        };
        write!(f, "{name}style")?;
        if self.is_cramped() {
            write!(f, "'")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_styles() {
        let d = Style::DISPLAY;
        assert_eq!(d.superscript(), Style::SCRIPT);
        assert_eq!(d.subscript(), Style::SCRIPT.cramped());
        assert_eq!(d.numerator(), Style::TEXT);
        assert_eq!(d.denominator(), Style::TEXT.cramped());

        let t = Style::TEXT.cramped();
        assert_eq!(t.superscript(), Style::SCRIPT.cramped());
        assert_eq!(t.numerator(), Style::SCRIPT.cramped());

        let ss = Style::SCRIPT_SCRIPT;
        assert_eq!(ss.superscript(), Style::SCRIPT_SCRIPT);
        assert_eq!(ss.numerator(), Style::SCRIPT_SCRIPT);
        assert_eq!(ss.denominator(), Style::SCRIPT_SCRIPT.cramped());
    }

    #[test]
    fn sizes() {
        assert_eq!(Style::DISPLAY.size(), MathSize::Text);
        assert_eq!(Style::TEXT.cramped().size(), MathSize::Text);
        assert_eq!(Style::SCRIPT.size(), MathSize::Script);
        assert_eq!(Style::SCRIPT_SCRIPT.cramped().size(), MathSize::ScriptScript);
        assert_eq!(Style::TEXT.script_size(), MathSize::Script);
        assert_eq!(Style::SCRIPT.script_size(), MathSize::ScriptScript);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Style::TEXT.cramped()), "textstyle'");
        assert_eq!(format!("{}", Style::SCRIPT_SCRIPT), "scriptscriptstyle");
    }
}
