//! `\let` aliasing command

use texweave::command::{self, Command};
use texweave::error;
use texweave::parse::OptionalEqualsUnexpanded;
use texweave::prelude as txl;
use texweave::token::{CommandRef, Token, Value};
use texweave::traits::*;
use texweave::vm;

pub const LET_DOC: &str = "Assign a command or character to a control sequence";

pub(crate) static LET_TAG: command::StaticTag = command::StaticTag::new();

/// Get the `\let` command.
pub fn get_let<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(let_primitive_fn)
        .with_tag(LET_TAG.get())
        .with_doc(LET_DOC)
}

#[derive(Debug)]
struct LetEndOfInputError;

impl error::EndOfInputError for LetEndOfInputError {
    fn doing(&self) -> String {
        "reading the right hand side of a \\let assignment".into()
    }
}

fn let_primitive_fn<S: TexweaveState>(
    _: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let scope = input.assignment_scope();
    let alias = CommandRef::parse(input)?;
    OptionalEqualsUnexpanded::parse(input)?;
    let token = input.unexpanded().next_or_err(LetEndOfInputError)?;
    let command = match token.value() {
        Value::CommandRef(command_ref) => input.vm().chain().command(&command_ref).cloned(),
        value => Some(Command::CharacterTokenAlias(value)),
    };
    match command {
        Some(command) => input.chain_mut().set_command(alias, command, scope),
        None => input.chain_mut().undefine(alias, scope),
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::testing::*;

    test_suite![
        expansion_equality_tests(
            (let_for_macro, r"\def\A{abc}\let\B\A\B", "abc"),
            (local, r"\def\A{a}\def\B{b}\let\C=\A{\let\C=\B \C}\C", "ba"),
            (
                global,
                r"\def\A{a}\def\B{b}\let\C=\A{\global\let\C=\B \C}\C",
                "bb"
            ),
            (let_for_macro_equals, r"\def\A{abc}\let\B=\A\B", "abc"),
            (let_equals_space, r"\def\A{abc}\let\B= \A\B", "abc"),
            (let_takes_global, r"\global\let\B=\relax \assertGlobalIsFalse", ""),
            (let_character, r"\let\B=a\B\B", "aa"),
            (let_begin_group, r"\let\bgroup={\bgroup\count1=3 }\the\count1", "0"),
            (let_is_not_a_copy_of_the_name, r"\def\A{a}\let\B\A\def\A{b}\B", "a"),
            (
                let_variable,
                r"\let\c=\count \c1=4 \the\count1",
                "4"
            ),
            (
                let_undefined_in_group,
                r"\def\A{a}{\let\A\undefined}\A",
                "a"
            ),
        ),
        failure_tests(
            (let_undefined_is_undefined, r"\def\A{a}\let\A\undefined \A"),
            (let_end_of_input, r"\let\B="),
            (let_character_target, r"\let a=b"),
        ),
    ];
}
