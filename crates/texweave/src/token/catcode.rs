//! Category codes.

use CatCode::*;

/// Enum representing all 16 category codes in TeX.
///
/// Each variant's documentation contains an example character which is mapped to that category code in plainTeX.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Hash)]
pub enum CatCode {
    /// Marks the beginning of a control sequence.
    /// Example: `\`.
    ///
    /// This category code is never seen outside of the lexer.
    Escape = 0,
    /// Begins a new group.
    /// Example: `{`.
    BeginGroup = 1,
    /// Ends an existing new group.
    /// Example: `}`.
    EndGroup = 2,
    /// Starts or ends math mode.
    /// Example: `$`.
    MathShift = 3,
    /// Example: `&`.
    AlignmentTab = 4,
    /// Marks a new line in the input.
    ///
    /// Two or more consecutive new lines, modulo intervening [Space] characters,
    ///     create a `\par` control sequence instead of a space.
    /// This code also terminates a comment.
    EndOfLine = 5,
    /// Marks the beginning of a parameter number.
    /// Example: `#`.
    Parameter = 6,
    /// Example: `^`.
    Superscript = 7,
    /// Example: `_`.
    Subscript = 8,
    /// Character that is ignored by the lexer.
    /// Example: ASCII null (0).
    Ignored = 9,
    /// Whitespace. Example: ` `.
    Space = 10,
    /// A character that can be used in a control sequence name.
    /// Examples: `[a-zA-z]`.
    Letter = 11,
    /// Example: `@`.
    #[default]
    Other = 12,
    /// A single character that behaves like a control sequence.
    /// Example: `~`.
    Active = 13,
    /// Marks the beginning of a comment.
    /// Example: `%`.
    Comment = 14,
    /// An invalid character.
    /// If this is encountered in the input, the lexer returns an error.
    /// Example: ASCII delete (127).
    Invalid = 15,
}

impl TryFrom<u8> for CatCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Escape,
            1 => BeginGroup,
            2 => EndGroup,
            3 => MathShift,
            4 => AlignmentTab,
            5 => EndOfLine,
            6 => Parameter,
            7 => Superscript,
            8 => Subscript,
            9 => Ignored,
            10 => Space,
            11 => Letter,
            12 => Other,
            13 => Active,
            14 => Comment,
            15 => Invalid,
            _ => return Err(()),
        })
    }
}

impl std::fmt::Display for CatCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, *self as u8)
    }
}

impl CatCode {
    /// Category code of a character in INITEX, before any format is loaded.
    ///
    /// TeX.2021.232 and the TeXBook p343.
    pub fn initex_default(c: char) -> CatCode {
        match c {
            '\\' => Escape,
            '\r' | '\n' => EndOfLine,
            ' ' => Space,
            '%' => Comment,
            '\u{0}' => Ignored,
            '\u{7F}' => Invalid,
            'a'..='z' | 'A'..='Z' => Letter,
            _ => Other,
        }
    }

    /// Category code of a character after the plainTeX format has been loaded.
    ///
    /// This is [CatCode::initex_default] with the changes described on p343 of the TeXBook.
    pub fn plain_tex_default(c: char) -> CatCode {
        match c {
            '{' => BeginGroup,
            '}' => EndGroup,
            '$' => MathShift,
            '&' => AlignmentTab,
            '#' => Parameter,
            '^' | '\u{B}' => Superscript,
            '_' | '\u{1}' => Subscript,
            '~' | '\u{C}' => Active,
            '\t' => Space,
            _ => CatCode::initex_default(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_u8() {
        for u in 0_u8..16 {
            let code = CatCode::try_from(u).unwrap();
            assert_eq!(code as u8, u);
        }
        assert_eq!(CatCode::try_from(16), Err(()));
    }

    #[test]
    fn plain_tex_defaults() {
        assert_eq!(CatCode::plain_tex_default('{'), BeginGroup);
        assert_eq!(CatCode::plain_tex_default('\\'), Escape);
        assert_eq!(CatCode::plain_tex_default('q'), Letter);
        assert_eq!(CatCode::plain_tex_default('@'), Other);
        assert_eq!(CatCode::initex_default('{'), Other);
    }
}
