//! Number parsing.
//!
//! The number may be octal, decimal, hexadecimal, cast from a character token, or read
//!     from an internal quantity like a register or a `\chardef` command.
//! The full definition of a number in the TeX grammar is given in chapter 24 of the TeXbook.

use crate::command::Command;
use crate::prelude as txl;
use crate::token::{self, CatCode, Value};
use crate::traits::*;
use crate::*;
use common::{Glue, Scaled};

impl<S: TexweaveState> Parsable<S> for i32 {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let (_, i) = parse_number_internal(input)?;
        Ok(i)
    }
}

/// A non-negative integer less than `N`.
///
/// Register numbers are unbounded, so [Uint::MAX] is the only bound they carry.
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct Uint<const N: usize>(pub usize);

impl Uint<0> {
    pub const MAX: usize = i32::MAX as usize;
}

impl<S: TexweaveState, const N: usize> Parsable<S> for Uint<N> {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let (first_token, i) = parse_number_internal(input)?;
        if i < 0 || i as usize >= N {
            let err = OutOfBoundsError::<N> {
                trace: input.vm().trace(first_token),
                got: i,
            };
            input.vm().error(err)?;
            Ok(Uint(0))
        } else {
            Ok(Uint(i as usize))
        }
    }
}

#[derive(Debug)]
struct OutOfBoundsError<const N: usize> {
    trace: token::trace::SourceCodeTrace,
    got: i32,
}

impl<const N: usize> error::TexError for OutOfBoundsError<N> {
    fn kind(&self) -> error::Kind {
        error::Kind::Token(&self.trace)
    }

    fn title(&self) -> String {
        format!(
            "expected an integer in the range [0, {}), got {}",
            N, self.got
        )
    }
}

impl<S: TexweaveState> Parsable<S> for char {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let (first_token, i) = parse_number_internal(input)?;
        if let Some(c) = u32::try_from(i).ok().and_then(char::from_u32) {
            return Ok(c);
        }
        input.vm().error(
            parse::Error::new(
                input.vm(),
                "a character code",
                Some(first_token),
                "a character code is an integer in the range [0, 1114111] that is not a surrogate",
            )
            .with_got_override(format!["got the integer {i}"])
            .with_annotation_override("this is where the number started"),
        )?;
        Ok('\0')
    }
}

impl<S: TexweaveState> Parsable<S> for CatCode {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let (token, i) = parse_number_internal(input)?;
        if let Some(cat_code) = u8::try_from(i)
            .ok()
            .and_then(|u| CatCode::try_from(u).ok())
        {
            return Ok(cat_code);
        }
        input.vm().error(
            parse::Error::new(
                input.vm(),
                "a category code number (an integer in the range [0, 15])",
                Some(token),
                "",
            )
            .with_got_override(format!["got the integer {i}"])
            .with_annotation_override("this is where the number started"),
        )?;
        Ok(CatCode::Escape)
    }
}

const GUIDANCE_BEGINNING: &str =
    "a number begins with zero or more minus signs followed by one of the following:
- A decimal digit (0-9), which begins a decimal number.
- The character ', which indicates the beginning of an octal number
- The character \", which indicates the beginning of a hexadecimal number
- The character `, followed by a character token. The character is converted into its UTF-8 number.
- A command that references a variable, like \\count 1.
";

/// A quantity stored inside the engine.
///
/// TeX.2021.413 calls the different types of quantity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InternalQuantity {
    Integer(i32),
    Dimen(Scaled),
    Glue(Glue),
    MuGlue(Glue),
}

impl InternalQuantity {
    /// Coerces the quantity to an integer; dimensions become their value in scaled points.
    pub(crate) fn integer(&self) -> i32 {
        match self {
            InternalQuantity::Integer(i) => *i,
            InternalQuantity::Dimen(d) => d.0,
            InternalQuantity::Glue(g) | InternalQuantity::MuGlue(g) => g.width().0,
        }
    }
}

/// Reads the quantity the command bound to a token references.
///
/// Returns [None] if the command does not reference a numeric quantity;
///     in this case nothing beyond the token has been consumed
///     unless the command is a variable with a non-numeric value.
pub(crate) fn parse_internal_quantity<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    token: token::Token,
    command_ref: token::CommandRef,
) -> txl::Result<Option<InternalQuantity>> {
    let cmd = match input.vm().chain().command(&command_ref) {
        Some(Command::Variable(cmd)) => cmd.clone(),
        Some(Command::Character(c)) => return Ok(Some(InternalQuantity::Integer(*c as i32))),
        Some(Command::MathCharacter(c)) => {
            return Ok(Some(InternalQuantity::Integer(*c as i32)))
        }
        _ => return Ok(None),
    };
    Ok(match cmd.value(token, input)? {
        variable::Value::Integer(i) => Some(InternalQuantity::Integer(i)),
        variable::Value::CatCode(c) => Some(InternalQuantity::Integer(c as i32)),
        variable::Value::Dimen(d) => Some(InternalQuantity::Dimen(d)),
        variable::Value::Glue(g) => Some(InternalQuantity::Glue(g)),
        variable::Value::MuGlue(g) => Some(InternalQuantity::MuGlue(g)),
        variable::Value::TokenList(_) | variable::Value::Font(_) => None,
    })
}

/// Reports that a command does not begin a number.
pub(crate) fn missing_number_error<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    token: token::Token,
    command_ref: token::CommandRef,
) -> txl::Result<()> {
    let annotation = match input.vm().chain().command(&command_ref) {
        None => "undefined control sequence".to_string(),
        Some(cmd) => format!["control sequence referencing {cmd}"],
    };
    let err = parse::Error::new(
        input.vm(),
        "the beginning of a number",
        Some(token),
        GUIDANCE_BEGINNING,
    )
    .with_annotation_override(annotation);
    input.vm().error(err)
}

fn parse_number_internal<S: TexweaveState>(
    stream: &mut vm::ExpandedStream<S>,
) -> txl::Result<(token::Token, i32)> {
    let sign = parse_optional_signs(stream)?;
    let first_token = stream.next_or_err(NumberEndOfInputError {})?;
    let result: i32 = match first_token.value() {
        Value::CommandRef(command_ref) => {
            match parse_internal_quantity(stream, first_token, command_ref)? {
                Some(quantity) => quantity.integer(),
                None => {
                    missing_number_error(stream, first_token, command_ref)?;
                    0
                }
            }
        }
        _ => {
            let (i, _) = parse_constant(stream, first_token)?;
            super::OptionalSpace::parse(stream)?;
            i
        }
    };
    let result = match sign {
        None => result,
        // The only i32 that is not safe to negate is i32::MIN.
        // TeX wraps in this case and the result is i32::MIN again.
        Some(_) => result.wrapping_neg(),
    };
    Ok((first_token, result))
}

/// Parses a constant whose first token has already been read.
///
/// Returns the value and the radix; the radix is 0 for alphabetic constants
///     and for missing numbers.
/// A single space after the constant is not consumed.
///
/// TeX.2021.442-445.
pub(crate) fn parse_constant<S: TexweaveState>(
    stream: &mut vm::ExpandedStream<S>,
    first_token: token::Token,
) -> txl::Result<(i32, u32)> {
    Ok(match first_token.value() {
        Value::Other(c @ '0'..='9') => (parse_digits(stream, 10, c as i32 - '0' as i32)?, 10),
        Value::Other('\'') => (parse_digits(stream, 8, 0)?, 8),
        Value::Other('"') => (parse_digits(stream, 16, 0)?, 16),
        Value::Other('`') => (parse_character(stream)?, 0),
        _ => {
            stream.back(first_token);
            let err = parse::Error::new(
                stream.vm(),
                "the beginning of a number",
                Some(first_token),
                GUIDANCE_BEGINNING,
            );
            stream.vm().error(err)?;
            (0, 0)
        }
    })
}

#[derive(Debug)]
struct NumberEndOfInputError;

impl error::EndOfInputError for NumberEndOfInputError {
    fn doing(&self) -> String {
        "parsing a number".into()
    }
    fn notes(&self) -> Vec<String> {
        vec![GUIDANCE_BEGINNING.into()]
    }
}

/// Parses optional signs and spaces.
///
/// If the combination of the signs is positive, [None] is returned.
/// Otherwise, the token corresponding to the last negative sign is returned.
pub(crate) fn parse_optional_signs<S: TexweaveState>(
    stream: &mut vm::ExpandedStream<S>,
) -> txl::Result<Option<token::Token>> {
    let mut result = None;
    while let Some((sign, token)) = get_optional_element_with_token![
        stream,
        Value::Other('+') => true,
        Value::Other('-') => false,
        Value::Space(_) => true,
    ] {
        result = match (result, sign) {
            (None, false) => Some(token),
            (Some(_), false) => None,
            (result, true) => result,
        };
    }
    Ok(result)
}

const CHARACTER_GUIDANCE: &str =
    r"a character is a character token or single-character control sequence like \a";

// TeX.2021.442
fn parse_character<S: TexweaveState>(input: &mut vm::ExpandedStream<S>) -> txl::Result<i32> {
    let token = input.unexpanded().next_or_err(CharacterError {})?;
    let c = match token.value() {
        Value::CommandRef(token::CommandRef::ControlSequence(cs_name)) => {
            let single = {
                let name = input.vm().cs_name_interner().resolve(cs_name).unwrap_or("");
                let mut iter = name.chars();
                match (iter.next(), iter.next()) {
                    (Some(c), None) => Some(c),
                    _ => None,
                }
            };
            match single {
                Some(c) => c,
                None => {
                    let err = parse::Error::new(
                        input.vm(),
                        "a character",
                        Some(token),
                        CHARACTER_GUIDANCE,
                    )
                    .with_got_override("found an improper alphabetic constant");
                    input.vm().error(err)?;
                    input.back(token);
                    '0'
                }
            }
        }
        _ => token.char().unwrap_or('0'),
    };
    super::OptionalSpace::parse(input)?;
    Ok(c as i32)
}

#[derive(Debug)]
struct CharacterError;

impl error::EndOfInputError for CharacterError {
    fn doing(&self) -> String {
        "parsing a character".into()
    }

    fn notes(&self) -> Vec<String> {
        vec![CHARACTER_GUIDANCE.into()]
    }
}

fn parse_digits<S: TexweaveState>(
    stream: &mut vm::ExpandedStream<S>,
    radix: i32,
    mut result: i32,
) -> txl::Result<i32> {
    let mut started = radix == 10;
    let mut too_big = false;
    while let Some(next) = stream.next()? {
        let digit = match next.value() {
            Value::Other(c) => c.to_digit(radix as u32).and_then(|d| {
                // Hexadecimal digits are upper case only.
                if c.is_ascii_lowercase() {
                    None
                } else {
                    Some(d as i32)
                }
            }),
            Value::Letter(c @ 'A'..='F') if radix == 16 => Some(c as i32 - 'A' as i32 + 10),
            _ => None,
        };
        let Some(digit) = digit else {
            stream.back(next);
            break;
        };
        started = true;
        result = match result.checked_mul(radix).and_then(|n| n.checked_add(digit)) {
            Some(n) => n,
            None => {
                if !too_big {
                    let err = too_big_error(stream.vm(), next, radix, result, digit);
                    stream.vm().error(err)?;
                    too_big = true;
                }
                i32::MAX
            }
        }
    }
    if !started {
        let (expected, guidance) = if radix == 8 {
            (
                "an octal digit",
                "an octal digit is a token with value 0-7 and category other",
            )
        } else {
            (
                "a hexadecimal digit",
                "a hexadecimal digit is either:\n- A character token with value 0-9 and category other, or\n- A character token with value A-F and category letter or other",
            )
        };
        let got = stream.peek()?.copied();
        let err = parse::Error::new(stream.vm(), expected, got, guidance);
        stream.vm().error(err)?;
    }
    Ok(result)
}

fn too_big_error<S>(
    vm: &vm::VM<S>,
    token: token::Token,
    radix: i32,
    n: i32,
    digit: i32,
) -> parse::Error {
    let (got, range) = match radix {
        8 => (
            format!["got '{n:o}{digit:o}"],
            format!["'{:o}, '{:o}", 0, i32::MAX],
        ),
        16 => (
            format!["got \"{n:X}{digit:X}"],
            format!["\"{:X}, \"{:X}", 0, i32::MAX],
        ),
        _ => (format!["got {n}{digit}"], format!["{}, {}", 0, i32::MAX]),
    };
    parse::Error::new(vm, format!["a number in the range [{range}]"], Some(token), "")
        .with_got_override(got)
        .with_annotation_override("this digit makes the number too big")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::testing::*;

    parse_success_tests![
        (octal_7, "'7", 7),
        (octal_8, "'10", 8),
        (octal_129, "'201", 129),
        (octal_max, "'17777777777", 2147483647),
        (octal_min, "-'17777777777", -2147483647),
        (decimal_0, "0", 0),
        (decimal_9, "9", 9),
        (decimal_with_0_padding, "00019", 19),
        (decimal_201, "201", 201),
        (decimal_max, "2147483647", 2147483647),
        (decimal_min, "-2147483647", -2147483647),
        (hexadecimal_10, "\"A", 10),
        (hexadecimal_31, "\"1F", 31),
        (hexadecimal_513, "\"201", 513),
        (hexadecimal_max, "\"7FFFFFFF", 2147483647),
        (number_from_character, "`A", 65),
        (number_from_length_1_control_sequence, r"`\A", 65),
        (number_from_character_non_ascii, "`ö", 0x00F6),
        (number_from_active_space, "` ", 32),
        (signs_plus, r"+4", 4),
        (signs_minus, r"-4", -4),
        (signs_plus_minus, r"+-4", -4),
        (signs_minus_minus, r"--4", 4),
        (signs_minus_minus_spaces, r"  -  - 4", 4),
        (internal_integer, r"\testcount", 1000),
        (internal_integer_negated, r"-\testcount", -1000),
        (internal_dimen_coerced, r"\testdimen", 163840),
        (internal_glue_coerced, r"\testskip", 65536),
        (character_command, r"\testchar", 65),
        (math_character_command, r"\testmathchar", 0x7161),
    ];

    parse_failure_tests![
        i32,
        (octal_too_big, "'177777777770"),
        (octal_empty, "'"),
        (decimal_too_big_1, "2147483648"),
        (decimal_too_big_2, "500000000000000"),
        (decimal_too_negative, "-5000000000000"),
        (hexadecimal_too_big, "\"7FFFFFFF0"),
        (hexadecimal_empty, "\""),
        (letter, "A"),
        (control_sequence_too_long, r"`\BC"),
        (undefined_control_sequence, r"\undefined"),
        (end_of_input, ""),
    ];

    parse_failure_tests![
        Uint::<16>,
        (number_too_big, "16"),
        (number_is_negative, "-1"),
    ];

    parse_failure_tests![CatCode, (cat_code_too_big, "16"),];

    parse_success_tests![(cat_code_letter, "11", CatCode::Letter),];

    #[test]
    fn too_big_is_recoverable() {
        let (got, errors) = run_parse_recovery_test::<i32>("2147483648");
        assert_eq!(got, i32::MAX);
        assert_eq!(errors, 1);
    }

    #[test]
    fn trailing_space_is_consumed() {
        let mut vm = new_vm("12 x");
        let input = vm::ExecutionInput::new(&mut vm);
        assert_eq!(i32::parse(input).unwrap(), 12);
        assert_eq!(input.next().unwrap().and_then(|t| t.char()), Some('x'));
    }
}
