//! Noads: the intermediate representation of math formulas.
//!
//! The math list builder produces a [MathList] of noads.
//! The typesetting pass in [crate::mlist] later converts the list into
//!     an ordinary horizontal list of boxes, glue and kerns.
//!
//! This corresponds to TeX.2021 part 34, although the representation here is
//!     a closed Rust enum rather than a web of linked memory words.

use boxworks::node::Horizontal;
use common::{Glue, Scaled};

/// An ordered sequence of noads.
pub type MathList = Vec<Noad>;

/// Class of an atom, as determined by the math code or by the command that created it.
///
/// TeX.2021.682.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MathClass {
    Ord,
    Op,
    Bin,
    Rel,
    Open,
    Close,
    Punct,
    Inner,
}

impl MathClass {
    /// The class encoded in the top bits of a math code.
    ///
    /// Class 7 (variable family) is typeset as an ordinary atom.
    pub fn from_math_code(code: u32) -> MathClass {
        match (code >> 12) & 7 {
            1 => MathClass::Op,
            2 => MathClass::Bin,
            3 => MathClass::Rel,
            4 => MathClass::Open,
            5 => MathClass::Close,
            6 => MathClass::Punct,
            _ => MathClass::Ord,
        }
    }

    /// Position of the class in the inter-atom spacing table.
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

/// A character in a math family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MathChar {
    pub family: u8,
    pub char: char,
}

/// The nucleus, superscript or subscript of an atom.
///
/// TeX.2021.681.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Empty,
    Char(MathChar),
    List(MathList),
}

impl Field {
    pub fn is_empty(&self) -> bool {
        matches!(self, Field::Empty)
    }
}

/// Which script of an atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Superscript,
    Subscript,
}

impl Script {
    pub fn name(&self) -> &'static str {
        match self {
            Script::Superscript => "superscript",
            Script::Subscript => "subscript",
        }
    }
}

/// An atom: a nucleus with optional scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub class: MathClass,
    pub nucleus: Field,
    pub superscript: Field,
    pub subscript: Field,
}

impl Atom {
    pub fn new(class: MathClass, nucleus: Field) -> Atom {
        Atom {
            class,
            nucleus,
            superscript: Field::Empty,
            subscript: Field::Empty,
        }
    }

    pub fn script(&self, script: Script) -> &Field {
        match script {
            Script::Superscript => &self.superscript,
            Script::Subscript => &self.subscript,
        }
    }

    /// Sets a script of the atom.
    ///
    /// Each script can be set at most once;
    ///     if it is already set the atom is unchanged and the field is returned.
    pub fn set_script(&mut self, script: Script, field: Field) -> Result<(), Field> {
        let slot = match script {
            Script::Superscript => &mut self.superscript,
            Script::Subscript => &mut self.subscript,
        };
        if !slot.is_empty() {
            return Err(field);
        }
        *slot = field;
        Ok(())
    }

    pub fn has_scripts(&self) -> bool {
        !self.superscript.is_empty() || !self.subscript.is_empty()
    }
}

/// A delimiter, as specified by a delimiter code.
///
/// A delimiter has a small and a large variant; either may be absent.
/// The null delimiter `.` has neither and is typeset as empty space
///     of width `\nulldelimiterspace`.
///
/// TeX.2021.683.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delimiter {
    pub small: Option<MathChar>,
    pub large: Option<MathChar>,
}

impl Delimiter {
    pub const NULL: Delimiter = Delimiter {
        small: None,
        large: None,
    };

    /// Decodes a 24-bit delimiter code like `"4262303`.
    pub fn from_code(code: u32) -> Delimiter {
        let variant = |family: u32, c: u32| {
            if family == 0 && c == 0 {
                None
            } else {
                char::from_u32(c).map(|char| MathChar {
                    family: family as u8,
                    char,
                })
            }
        };
        Delimiter {
            small: variant((code >> 20) & 0xF, (code >> 12) & 0xFF),
            large: variant((code >> 8) & 0xF, code & 0xFF),
        }
    }

    pub fn is_null(&self) -> bool {
        self.small.is_none() && self.large.is_none()
    }
}

/// A generalized fraction, as created by `\over`, `\atop` and `\above`.
///
/// TeX.2021.683.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fraction {
    pub numerator: MathList,
    pub denominator: MathList,
    /// Thickness of the fraction rule; [None] means the default rule thickness of the font.
    pub thickness: Option<Scaled>,
    pub left: Delimiter,
    pub right: Delimiter,
}

/// An element of a math list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Noad {
    Atom(Atom),
    Fraction(Fraction),
    Left(Delimiter),
    Middle(Delimiter),
    Right(Delimiter),
    /// A kern measured in mu, created by `\mkern`.
    MuKern(Scaled),
    /// Glue measured in mu, created by `\mskip`.
    MuGlue(Glue),
    /// A node that is already typeset, like the glue from `\hskip` or a penalty.
    Node(Horizontal),
}

impl Noad {
    pub fn as_atom_mut(&mut self) -> Option<&mut Atom> {
        match self {
            Noad::Atom(atom) => Some(atom),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_code_classes() {
        assert_eq!(MathClass::from_math_code(0x7161), MathClass::Ord);
        assert_eq!(MathClass::from_math_code(0x202B), MathClass::Bin);
        assert_eq!(MathClass::from_math_code(0x303D), MathClass::Rel);
        assert_eq!(MathClass::from_math_code(0x1350), MathClass::Op);
        assert_eq!(MathClass::from_math_code(0x0030), MathClass::Ord);
    }

    #[test]
    fn delimiter_codes() {
        let d = Delimiter::from_code(0x028300);
        assert_eq!(
            d.small,
            Some(MathChar {
                family: 0,
                char: '('
            })
        );
        assert_eq!(
            d.large,
            Some(MathChar {
                family: 3,
                char: '\0'
            })
        );
        assert!(Delimiter::from_code(0).is_null());
    }

    #[test]
    fn scripts_are_set_once() {
        let mut atom = Atom::new(MathClass::Ord, Field::Empty);
        assert!(atom
            .set_script(Script::Superscript, Field::List(vec![]))
            .is_ok());
        assert!(atom.set_script(Script::Subscript, Field::Empty).is_ok());
        assert!(atom
            .set_script(Script::Superscript, Field::List(vec![]))
            .is_err());
    }
}
