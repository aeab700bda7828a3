use crate::command::Command;
use crate::prelude as txl;
use crate::token::{CommandRef, Value};
use crate::traits::*;
use crate::*;
use font::FontId;
use std::rc::Rc;

/// When parsed, this type consumes an optional equals from the token stream.
pub struct OptionalEquals;

impl<S: TexweaveState> Parsable<S> for OptionalEquals {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        parse_optional_equals(input)?;
        Ok(OptionalEquals {})
    }
}

/// When parsed, this type consumes an optional equals from the token stream without performing expansion.
pub struct OptionalEqualsUnexpanded;

impl<S: TexweaveState> Parsable<S> for OptionalEqualsUnexpanded {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        parse_optional_equals(input.unexpanded())?;
        Ok(OptionalEqualsUnexpanded {})
    }
}

// TeX.2021.405
fn parse_optional_equals<I: TokenStream>(input: &mut I) -> txl::Result<()>
where
    I::S: TexweaveState,
{
    while let Some(found_equals) = get_optional_element![
        input,
        Value::Other('=') => true,
        Value::Space(_) => false,
    ] {
        if found_equals {
            break;
        }
    }
    Ok(())
}

/// The value in a token list assignment like `\toks 3 = {abc}` or `\everymath = \toks 3`.
///
/// Tokens between the braces are not expanded.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct TokenListValue(pub Rc<Vec<token::Token>>);

impl<S: TexweaveState> Parsable<S> for TokenListValue {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        // TeX.2021.1226
        let token = loop {
            let token = input.next_or_err(TokenListEndOfInputError {})?;
            if !matches!(token.value(), Value::Space(_)) {
                break token;
            }
        };
        match token.value() {
            Value::BeginGroup(_) => {
                let mut tokens = vec![];
                if !parse::parse_balanced_tokens(input.unexpanded(), &mut tokens)? {
                    return Err(error::SimpleEndOfInputError::new(
                        input.vm(),
                        "unexpected end of input while reading a token list",
                    )
                    .with_note("the closing brace of the token list is missing")
                    .into());
                }
                Ok(TokenListValue(Rc::new(tokens)))
            }
            Value::CommandRef(command_ref) => {
                if let Some(cmd) = variable_command(input.vm(), &command_ref) {
                    if let variable::Value::TokenList(t) = cmd.value(token, input)? {
                        return Ok(TokenListValue(t));
                    }
                }
                input.vm().error(parse::Error::new(
                    input.vm(),
                    "a token list",
                    Some(token),
                    "a token list is either balanced tokens in braces or a token list variable like \\toks 1",
                ))?;
                Ok(TokenListValue::default())
            }
            _ => {
                input.back(token);
                input.vm().error(parse::Error::new(
                    input.vm(),
                    "a token list",
                    Some(token),
                    "a token list is either balanced tokens in braces or a token list variable like \\toks 1",
                ))?;
                Ok(TokenListValue::default())
            }
        }
    }
}

#[derive(Debug)]
struct TokenListEndOfInputError;

impl error::EndOfInputError for TokenListEndOfInputError {
    fn doing(&self) -> String {
        "parsing a token list".into()
    }
}

impl<S: TexweaveState> Parsable<S> for FontId {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let token = loop {
            let token = input.next_or_err(FontEndOfInputError {})?;
            if !matches!(token.value(), Value::Space(_)) {
                break token;
            }
        };
        if let Value::CommandRef(command_ref) = token.value() {
            if let Some(Command::Font(id)) = input.vm().chain().command(&command_ref) {
                return Ok(*id);
            }
            if let Some(cmd) = variable_command(input.vm(), &command_ref) {
                if let variable::Value::Font(id) = cmd.value(token, input)? {
                    return Ok(id);
                }
            }
        }
        input.vm().error(parse::Error::new(
            input.vm(),
            "a font identifier",
            Some(token),
            "a font identifier is a command defined by \\font, or a font variable like \\textfont 1",
        ))?;
        Ok(FontId::NULL_FONT)
    }
}

#[derive(Debug)]
struct FontEndOfInputError;

impl error::EndOfInputError for FontEndOfInputError {
    fn doing(&self) -> String {
        "parsing a font identifier".into()
    }
}

fn variable_command<S>(
    vm: &vm::VM<S>,
    command_ref: &CommandRef,
) -> Option<Rc<variable::Command<S>>> {
    match vm.chain().command(command_ref) {
        Some(Command::Variable(cmd)) => Some(cmd.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::testing::*;

    #[test]
    fn optional_equals_consumes_spaces_and_equals() {
        let mut vm = new_vm("  = x");
        let input = vm::ExecutionInput::new(&mut vm);
        OptionalEquals::parse(input).unwrap();
        // The space after the equals sign is not consumed.
        assert!(matches!(
            input.next().unwrap().map(|t| t.value()),
            Some(Value::Space(_))
        ));
    }

    #[test]
    fn optional_equals_absent() {
        let mut vm = new_vm("x");
        let input = vm::ExecutionInput::new(&mut vm);
        OptionalEquals::parse(input).unwrap();
        assert_eq!(input.next().unwrap().and_then(|t| t.char()), Some('x'));
    }

    #[test]
    fn token_list_in_braces() {
        let mut vm = new_vm("{a{b}c}d");
        let input = vm::ExecutionInput::new(&mut vm);
        let TokenListValue(tokens) = TokenListValue::parse(input).unwrap();
        let s = token::write_tokens(tokens.iter(), input.vm().cs_name_interner());
        assert_eq!(s, "a{b}c");
    }

    #[test]
    fn token_list_from_variable() {
        let mut vm = new_vm(r"\testtoks");
        let input = vm::ExecutionInput::new(&mut vm);
        let TokenListValue(tokens) = TokenListValue::parse(input).unwrap();
        let s = token::write_tokens(tokens.iter(), input.vm().cs_name_interner());
        assert_eq!(s, "xyz");
    }

    parse_failure_tests![
        TokenListValue,
        (token_list_unterminated, "{a{b}"),
        (token_list_missing_brace, "a"),
        (token_list_from_integer, r"\testcount"),
    ];

    parse_success_tests![(font_command, r"\testfont", FontId(1)),];

    parse_failure_tests![FontId, (font_from_letter, "a"),];
}
