//! The lexer that turns characters into tokens.
//!
//! Lexing in TeX is "just in time": a token is produced only when it is requested,
//!     because the category codes used to classify the next character can be changed
//!     by the command that the current token invokes.
//! Consider `\catcode`\A=10 AB`.
//! If the whole line were lexed up front the `A` would become a letter token,
//!     but after the assignment runs it is a space and must be trimmed.

use crate::token::trace;
use crate::token::CatCode;
use crate::token::CsName;
use crate::token::CsNameInterner;
use crate::token::Token;

/// Errors the lexer can return.
///
/// The VM converts these into full diagnostics, because only it knows how to trace keys.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    InvalidCharacter(char, trace::Key),
    EmptyControlSequence(trace::Key),
}

/// Source of category codes for the lexer.
pub trait CatCodeFn {
    fn cat_code(&self, c: char) -> CatCode;
}

impl CatCodeFn for std::collections::HashMap<char, CatCode> {
    fn cat_code(&self, c: char) -> CatCode {
        self.get(&c).copied().unwrap_or_default()
    }
}

/// Whether the next run of blanks should be dropped.
///
/// TeX.2021.303 calls these states M (mid line) and S (skipping blanks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    MidLine,
    SkipBlanks,
}

/// Lexer for one piece of source code.
#[derive(Debug)]
pub struct Lexer {
    raw: RawLexer,
    state: State,
    buffer: String,
}

impl Lexer {
    pub fn new(source_code: &str, trace_key_range: trace::KeyRange) -> Lexer {
        Lexer {
            raw: RawLexer {
                chars: source_code.chars().collect(),
                pos: 0,
                trace_key_range,
            },
            state: State::SkipBlanks,
            buffer: String::new(),
        }
    }

    /// Returns the next token, or [None] when the source code is exhausted.
    pub fn next<F: CatCodeFn>(
        &mut self,
        cat_code_fn: &F,
        cs_name_interner: &mut CsNameInterner,
    ) -> Result<Option<Token>, Error> {
        while let Some(raw) = self.raw.next(cat_code_fn) {
            let c = raw.char;
            let key = raw.trace_key;
            let token = match raw.code {
                CatCode::Escape => {
                    let (name, is_control_word) =
                        self.read_control_sequence(key, cat_code_fn, cs_name_interner)?;
                    self.state = if is_control_word {
                        State::SkipBlanks
                    } else {
                        State::MidLine
                    };
                    return Ok(Some(Token::new_control_sequence(name, key)));
                }
                CatCode::EndOfLine | CatCode::Space => {
                    let new_lines = self.consume_blanks(cat_code_fn)
                        + usize::from(raw.code == CatCode::EndOfLine);
                    if new_lines >= 2 {
                        self.state = State::SkipBlanks;
                        let par = cs_name_interner.get_or_intern("par");
                        return Ok(Some(Token::new_control_sequence(par, key)));
                    }
                    if self.state == State::SkipBlanks {
                        continue;
                    }
                    Token::new_space(c, key)
                }
                CatCode::BeginGroup => Token::new_begin_group(c, key),
                CatCode::EndGroup => Token::new_end_group(c, key),
                CatCode::MathShift => Token::new_math_shift(c, key),
                CatCode::AlignmentTab => Token::new_alignment_tab(c, key),
                CatCode::Parameter => Token::new_parameter(c, key),
                CatCode::Superscript => {
                    if self.raw.apply_caret_notation(c, true) {
                        continue;
                    }
                    Token::new_superscript(c, key)
                }
                CatCode::Subscript => Token::new_subscript(c, key),
                CatCode::Letter => Token::new_letter(c, key),
                CatCode::Other => Token::new_other(c, key),
                CatCode::Active => Token::new_active_character(c, key),
                CatCode::Comment => {
                    while let Some(next) = self.raw.peek(cat_code_fn) {
                        if next.code == CatCode::EndOfLine {
                            break;
                        }
                        self.raw.advance();
                    }
                    self.state = State::SkipBlanks;
                    continue;
                }
                CatCode::Ignored => continue,
                CatCode::Invalid => return Err(Error::InvalidCharacter(c, key)),
            };
            self.state = State::MidLine;
            return Ok(Some(token));
        }
        Ok(None)
    }

    fn consume_blanks<F: CatCodeFn>(&mut self, cat_code_fn: &F) -> usize {
        let mut new_lines = 0_usize;
        while let Some(raw) = self.raw.peek(cat_code_fn) {
            match raw.code {
                CatCode::EndOfLine => new_lines += 1,
                CatCode::Space => {}
                _ => break,
            }
            self.raw.advance();
        }
        new_lines
    }

    /// Reads the name of a control sequence whose escape character has been consumed.
    ///
    /// The boolean is true if the control sequence is a control word or a control space,
    ///     after which blanks are skipped.
    fn read_control_sequence<F: CatCodeFn>(
        &mut self,
        escape_key: trace::Key,
        cat_code_fn: &F,
        cs_name_interner: &mut CsNameInterner,
    ) -> Result<(CsName, bool), Error> {
        self.buffer.clear();
        let first = loop {
            let first = match self.raw.next(cat_code_fn) {
                None => return Err(Error::EmptyControlSequence(escape_key)),
                Some(first) => first,
            };
            if first.code == CatCode::Superscript && self.raw.apply_caret_notation(first.char, true)
            {
                continue;
            }
            break first;
        };
        self.buffer.push(first.char);
        let skip_blanks = match first.code {
            CatCode::Letter => {
                while let Some(raw) = self.raw.peek(cat_code_fn) {
                    match raw.code {
                        CatCode::Letter => {
                            self.raw.advance();
                            self.buffer.push(raw.char);
                        }
                        CatCode::Superscript if self.raw.apply_caret_notation(raw.char, false) => {}
                        _ => break,
                    }
                }
                true
            }
            CatCode::Space => true,
            _ => false,
        };
        Ok((cs_name_interner.get_or_intern(&self.buffer), skip_blanks))
    }
}

struct RawToken {
    code: CatCode,
    char: char,
    trace_key: trace::Key,
}

#[derive(Debug)]
struct RawLexer {
    chars: Vec<char>,
    pos: usize,
    trace_key_range: trace::KeyRange,
}

impl RawLexer {
    fn next<F: CatCodeFn>(&mut self, cat_code_fn: &F) -> Option<RawToken> {
        let c = *self.chars.get(self.pos)?;
        self.pos += 1;
        Some(RawToken {
            char: c,
            code: cat_code_fn.cat_code(c),
            trace_key: self.trace_key_range.next(),
        })
    }

    fn peek<F: CatCodeFn>(&self, cat_code_fn: &F) -> Option<RawToken> {
        let c = *self.chars.get(self.pos)?;
        Some(RawToken {
            char: c,
            code: cat_code_fn.cat_code(c),
            trace_key: self.trace_key_range.peek(),
        })
    }

    fn advance(&mut self) {
        if self.pos < self.chars.len() {
            self.pos += 1;
            self.trace_key_range.next();
        }
    }

    /// Applies TeX's `^^` notation if the input at the current position allows it.
    ///
    /// The first superscript character may or may not have been consumed already.
    /// On success the three characters are replaced by the single character
    ///     they denote, which is left as the next character of the input.
    ///
    /// TeX.2021.355.
    fn apply_caret_notation(&mut self, first: char, first_consumed: bool) -> bool {
        let second_pos = if first_consumed {
            self.pos
        } else {
            self.pos + 1
        };
        if self.chars.get(second_pos) != Some(&first) {
            return false;
        }
        let third = match self.chars.get(second_pos + 1) {
            // TeX leaves the characters alone at the end of the input.
            None => return false,
            Some(third) => *third,
        };
        if !first_consumed {
            self.advance();
        }
        self.advance();
        let code = third as u32;
        let replacement = match code {
            0x00..=0x3F => code + 0x40,
            0x40..=0x7F => code - 0x40,
            _ => return true,
        };
        if let Some(replacement) = char::from_u32(replacement) {
            self.chars[self.pos] = replacement;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::CatCode::*;
    use crate::token::Value;
    use std::collections::HashMap;

    enum Expected {
        Character(char, CatCode),
        ControlSequence(&'static str),
    }
    use Expected::Character;
    use Expected::ControlSequence;

    fn lexer_test(input: &str, expected: Vec<Expected>) {
        let mut lexer = Lexer::new(input, trace::KeyRange::for_testing());
        let mut map: HashMap<char, CatCode> = (0_u32..128)
            .filter_map(char::from_u32)
            .map(|c| (c, CatCode::plain_tex_default(c)))
            .collect();
        map.insert('X', EndOfLine);
        map.insert('Y', Space);
        map.insert('Z', Ignored);
        map.insert('\u{7F}', Other);
        let mut interner = CsNameInterner::default();
        let mut actual = Vec::new();
        while let Some(t) = lexer.next(&map, &mut interner).unwrap() {
            actual.push(t.value());
        }
        let expected: Vec<Value> = expected
            .into_iter()
            .map(|e| match e {
                ControlSequence(name) => Token::new_control_sequence(
                    interner.get_or_intern(name),
                    trace::Key::dummy(),
                )
                .value(),
                Character(c, cat_code) => Value::try_new(c, cat_code).unwrap(),
            })
            .collect();
        assert_eq!(actual, expected);
    }

    macro_rules! lexer_tests {
        ($( ( $name: ident, $input: expr, $ ( $expected: expr, ) * ), )+) => {
            $(
            #[test]
            fn $name() {
                lexer_test($input, vec![ $( $expected ),* ]);
            }
            )+
        };
    }

    lexer_tests![
        (
            control_word_then_group,
            r"\a{b}",
            ControlSequence("a"),
            Character('{', BeginGroup),
            Character('b', Letter),
            Character('}', EndGroup),
        ),
        (
            blanks_after_control_word_skipped,
            "\\abc  \n d",
            ControlSequence("abc"),
            Character('d', Letter),
        ),
        (
            control_symbol_keeps_following_space,
            "\\{ A",
            ControlSequence("{"),
            Character(' ', Space),
            Character('A', Letter),
        ),
        (
            control_space_skips_blanks,
            "\\  A",
            ControlSequence(" "),
            Character('A', Letter),
        ),
        (
            control_word_followed_by_digit,
            "\\A1",
            ControlSequence("A"),
            Character('1', Other),
        ),
        (
            comment_removed,
            "A%a comment here\n%A second comment\nC",
            Character('A', Letter),
            Character('C', Letter),
        ),
        (comment_at_end, "A%a comment here", Character('A', Letter),),
        (
            blank_line_after_comment_is_par,
            "A%\n\n B",
            Character('A', Letter),
            ControlSequence("par"),
            Character('B', Letter),
        ),
        (
            double_space_creates_one_space,
            "A  B",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
        ),
        (
            single_newline_creates_one_space,
            "A\nB",
            Character('A', Letter),
            Character('\n', Space),
            Character('B', Letter),
        ),
        (
            newline_space_newline_creates_par,
            "A\n \nB",
            Character('A', Letter),
            ControlSequence("par"),
            Character('B', Letter),
        ),
        (
            leading_blanks_skipped,
            "  A",
            Character('A', Letter),
        ),
        (
            non_standard_blank_characters,
            "AYBXC",
            Character('A', Letter),
            Character('Y', Space),
            Character('B', Letter),
            Character('X', Space),
            Character('C', Letter),
        ),
        (single_ignored_character, "Z",),
        (caret_notation_subtracts, "^^k", Character('+', Other),),
        (caret_notation_adds, "^^+", Character('k', Letter),),
        (
            caret_notation_at_end_of_input,
            "A^^",
            Character('A', Letter),
            Character('^', Superscript),
            Character('^', Superscript),
        ),
        (caret_notation_to_ignored_character, "^^\u{40}",),
        (
            caret_notation_upper_boundary,
            "^^\u{7F}",
            Character('?', Other),
        ),
        (caret_notation_in_control_word, "\\a^^-b", ControlSequence("amb"),),
        (caret_notation_as_control_symbol, "\\^^m", ControlSequence("-"),),
        (
            superscript_control_symbol,
            "\\^a",
            ControlSequence("^"),
            Character('a', Letter),
        ),
        (
            active_character,
            "~a",
            Character('~', Active),
            Character('a', Letter),
        ),
    ];

    #[test]
    fn invalid_character() {
        let mut lexer = Lexer::new("a\u{7F}", trace::KeyRange::for_testing());
        let map: HashMap<char, CatCode> = [('a', Letter), ('\u{7F}', Invalid)].into();
        let mut interner = CsNameInterner::default();
        assert!(lexer.next(&map, &mut interner).unwrap().is_some());
        assert!(matches!(
            lexer.next(&map, &mut interner),
            Err(Error::InvalidCharacter('\u{7F}', _))
        ));
    }

    #[test]
    fn empty_control_sequence() {
        let mut lexer = Lexer::new("\\", trace::KeyRange::for_testing());
        let map: HashMap<char, CatCode> = [('\\', Escape)].into();
        let mut interner = CsNameInterner::default();
        assert!(matches!(
            lexer.next(&map, &mut interner),
            Err(Error::EmptyControlSequence(_))
        ));
    }
}
