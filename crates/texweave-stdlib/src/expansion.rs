//! Commands that alter the expansion process

use texweave::command;
use texweave::error;
use texweave::prelude as txl;
use texweave::token::Token;
use texweave::traits::*;
use texweave::vm;

static NO_EXPAND_TAG: command::StaticTag = command::StaticTag::new();

pub(crate) static RELAX_TAG: command::StaticTag = command::StaticTag::new();

/// Get the `\noexpand` command.
///
/// The command works through [noexpand_hook], which the state must call
///     from [TexweaveState::expansion_override_hook].
pub fn get_noexpand<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(noexpand_fn)
        .with_tag(NO_EXPAND_TAG.get())
        .with_doc("Prevent the next token from being expanded")
}

fn noexpand_fn<S: TexweaveState>(token: Token, input: &mut vm::ExpansionInput<S>) -> txl::Result<()> {
    Err(error::SimpleTokenError::new(
        input.vm(),
        token,
        "\\noexpand was expanded without the \\noexpand hook",
    )
    .with_note("the state of this VM does not call the \\noexpand hook from its expansion override hook")
    .into())
}

#[derive(Debug)]
struct NoExpandEndOfInputError;

impl error::EndOfInputError for NoExpandEndOfInputError {
    fn doing(&self) -> String {
        "expanding a \\noexpand command".into()
    }
    fn notes(&self) -> Vec<String> {
        vec!["\\noexpand must be followed by 1 token".into()]
    }
}

/// Hook that implements `\noexpand`.
///
/// The returned token, if any, is not expanded.
#[inline]
pub fn noexpand_hook<S: TexweaveState>(
    _: Token,
    input: &mut vm::ExpansionInput<S>,
    tag: Option<command::Tag>,
) -> txl::Result<Option<Token>> {
    if tag != Some(NO_EXPAND_TAG.get()) {
        return Ok(None);
    }
    let token = input.unexpanded().next_or_err(NoExpandEndOfInputError)?;
    Ok(Some(token))
}

/// Get the `\expandafter` command.
pub fn get_expandafter<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(expandafter_fn)
        .with_doc("Expand the token after next, then put back the next token")
}

#[derive(Debug)]
struct ExpandAfterEndOfInputError {
    found: usize,
}

impl error::EndOfInputError for ExpandAfterEndOfInputError {
    fn doing(&self) -> String {
        "expanding an \\expandafter command".into()
    }
    fn notes(&self) -> Vec<String> {
        vec![format!(
            "\\expandafter must be followed by 2 tokens; only {} were found",
            self.found
        )]
    }
}

fn expandafter_fn<S: TexweaveState>(
    _: Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let next = input
        .unexpanded()
        .next_or_err(ExpandAfterEndOfInputError { found: 0 })?;
    if input.unexpanded().peek()?.is_none() {
        return Err(error::SimpleEndOfInputError::new(
            input.vm(),
            "unexpected end of input while expanding an \\expandafter command",
        )
        .with_note("\\expandafter must be followed by 2 tokens; only 1 was found")
        .into());
    }
    input.expanded().expand_once()?;
    input.expansions_mut().push(next);
    Ok(())
}

/// Get the `\relax` command.
pub fn get_relax<S>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(|_, _| Ok(()))
        .with_tag(RELAX_TAG.get())
        .with_doc("Do nothing")
}

#[cfg(test)]
mod tests {
    use crate::testing::*;

    test_suite![
        options(
            TestOption::BuiltInCommands(built_in_commands),
            TestOption::AllowUndefinedCommands(true),
        ),
        expansion_equality_tests(
            (noexpand_macro, r"\def\a{Hello}\noexpand\a", r"\a"),
            (
                noexpand_in_argument_position,
                r"\def\a#1\b{Hello '#1'}\def\b{World}\a\b",
                "Hello ''"
            ),
            (
                expandafter_basic,
                r"\def\a#1\b{Hello '#1'}\def\b{World}\expandafter\a\b\b",
                "Hello 'World'"
            ),
            (
                expandafter_and_noexpand,
                r"\def\a#1\b{Hello '#1'}\def\b{World}\expandafter\a\noexpand\b\b",
                "Hello ''World"
            ),
            (
                expandafter_only_expands_once,
                r"\def\A{\B}\def\B{Hello}\expandafter\noexpand\A",
                r"\B"
            ),
            (
                expandafter_chain,
                r"\def\a#1{a#1}\def\b#1{b#1}\def\c{c}\expandafter\expandafter\expandafter\a\expandafter\b\c",
                "abc"
            ),
            (
                expandafter_unexpandable_second_token,
                r"\def\a#1{(#1)}\expandafter\a x",
                "(x)"
            ),
            (relax_does_nothing, r"a\relax b", "ab"),
        ),
        failure_tests(
            (noexpand_end_of_input, r"\noexpand"),
            (expandafter_end_of_input_0, r"\expandafter"),
            (expandafter_end_of_input_1, r"\expandafter\a"),
        ),
    ];
}
