use crate::prelude as txl;
use crate::token::Value;
use crate::traits::*;
use crate::vm;

/// Attempts to read a keyword like `plus` or `true` from the input.
///
/// Letters are matched case insensitively and may have category letter or other.
/// Spaces before the first character are skipped and dropped, even if the keyword is absent.
/// A space after the first character ends the match.
/// If the keyword is not found, the partially matched tokens are returned to the input.
///
/// TeX.2021.407.
pub fn parse_keyword<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    keyword: &str,
) -> txl::Result<bool> {
    let mut matched = vec![];
    let mut expected = keyword.chars().peekable();
    while let Some(&want) = expected.peek() {
        let Some(token) = input.next()? else {
            break;
        };
        match token.value() {
            Value::Letter(c) | Value::Other(c) if c.to_ascii_lowercase() == want => {
                matched.push(token);
                expected.next();
            }
            Value::Space(_) if matched.is_empty() => {}
            _ => {
                input.back(token);
                break;
            }
        }
    }
    if expected.peek().is_none() {
        return Ok(true);
    }
    while let Some(token) = matched.pop() {
        input.back(token);
    }
    Ok(false)
}

/// When parsed, this type consumes an optional `by` keyword from the input stream.
#[derive(Debug, PartialEq, Eq)]
pub struct OptionalBy;

impl<S: TexweaveState> Parsable<S> for OptionalBy {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        parse_keyword(input, "by")?;
        Ok(OptionalBy)
    }
}

/// When parsed, this type consumes a required `to` keyword from the input stream.
#[derive(Debug, PartialEq, Eq)]
pub struct To;

impl<S: TexweaveState> Parsable<S> for To {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        if !parse_keyword(input, "to")? {
            let got = input.peek()?.copied();
            let err = crate::parse::Error::new(
                input.vm(),
                "the keyword `to`",
                got,
                "the `to` keyword consists of a t or T letter token, then a o or O letter token",
            );
            input.vm().error(err)?;
        }
        Ok(To)
    }
}
