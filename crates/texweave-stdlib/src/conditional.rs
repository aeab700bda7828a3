//! Conditional primitives (if, else, fi, and switch)
//!
//! # Developer notes
//!
//! A conditional that evaluates to true pushes a branch onto a stack in the [Component]
//!     and expands to nothing; the `\else` or `\fi` that eventually follows pops it.
//! A conditional that evaluates to false skips tokens, without expanding them,
//!     until the matching `\else` or `\fi`.
//! The skipping logic identifies conditionals by the tag attached to their commands,
//!     so aliases created with `\let` are skipped correctly.

use std::cell::RefCell;
use texweave::command::{self, Command};
use texweave::error;
use texweave::prelude as txl;
use texweave::token::{CommandRef, Token, Value};
use texweave::traits::*;
use texweave::vm;

pub const ELSE_DOC: &str = "Start the else branch of a conditional or switch statement";
pub const IFCASE_DOC: &str = "Begin a switch statement";
pub const IFNUM_DOC: &str = "Compare two integers";
pub const IFODD_DOC: &str = "Check if an integer is odd";
pub const IFTRUE_DOC: &str = "Evaluate the true branch";
pub const IFFALSE_DOC: &str = "Evaluate the false branch";
pub const IFX_DOC: &str = "Check if two tokens have the same meaning";
pub const FI_DOC: &str = "End a conditional or switch statement";
pub const OR_DOC: &str = "Begin the next branch of a switch statement";

/// Component for keeping track of conditional branches as they are expanded.
///
/// Expansion commands only get shared access to the state, hence the [RefCell].
#[derive(Default)]
pub struct Component {
    // A stack where each element corresponds to a conditional that is currently
    // expanding. A nested conditional is further up the stack than the conditional it is
    // nested in.
    branches: RefCell<Vec<Branch>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchKind {
    // The true branch of an if conditional.
    True,
    // The false branch of an if conditional, or the default branch of a switch statement.
    Else,
    // A regular case branch of a switch statement.
    Switch,
}

#[derive(Debug)]
struct Branch {
    token: Token,
    kind: BranchKind,
}

static IF_TAG: command::StaticTag = command::StaticTag::new();
static ELSE_TAG: command::StaticTag = command::StaticTag::new();
static OR_TAG: command::StaticTag = command::StaticTag::new();
static FI_TAG: command::StaticTag = command::StaticTag::new();

fn push_branch<S: HasComponent<Component>>(input: &vm::ExpansionInput<S>, branch: Branch) {
    input.state().component().branches.borrow_mut().push(branch);
}

fn pop_branch<S: HasComponent<Component>>(input: &vm::ExpansionInput<S>) -> Option<Branch> {
    input.state().component().branches.borrow_mut().pop()
}

fn tag_of<S>(input: &vm::ExpansionInput<S>, token: Token) -> Option<command::Tag>
where
    S: TexweaveState,
{
    match token.value() {
        Value::CommandRef(command_ref) => input
            .vm()
            .chain()
            .command(&command_ref)
            .and_then(Command::tag),
        _ => None,
    }
}

#[derive(Debug)]
struct SkipEndOfInputError {
    skipping: &'static str,
}

impl error::EndOfInputError for SkipEndOfInputError {
    fn doing(&self) -> String {
        format!("skipping {}", self.skipping)
    }
    fn notes(&self) -> Vec<String> {
        vec!["each conditional must be terminated by a \\fi command".into()]
    }
}

/// What the skipper stopped at.
enum Stop {
    Else,
    Or,
    Fi,
}

/// Skips tokens until the `\else`, `\or` or `\fi` that matches the current conditional.
///
/// Nested conditionals are skipped in full.
/// If `stop_at_else` is false, `\else` and `\or` at the top level are skipped too.
fn skip<S: TexweaveState>(
    input: &mut vm::ExpansionInput<S>,
    stop_at_else: bool,
    skipping: &'static str,
) -> txl::Result<Stop> {
    let mut depth = 0_usize;
    loop {
        let token = input
            .unexpanded()
            .next_or_err(SkipEndOfInputError { skipping })?;
        let Some(tag) = tag_of(input, token) else {
            continue;
        };
        if tag == IF_TAG.get() {
            depth += 1;
        } else if tag == FI_TAG.get() {
            if depth == 0 {
                return Ok(Stop::Fi);
            }
            depth -= 1;
        } else if depth == 0 && stop_at_else {
            if tag == ELSE_TAG.get() {
                return Ok(Stop::Else);
            }
            if tag == OR_TAG.get() {
                return Ok(Stop::Or);
            }
        }
    }
}

fn true_case<S: HasComponent<Component>>(token: Token, input: &mut vm::ExpansionInput<S>) {
    push_branch(
        input,
        Branch {
            token,
            kind: BranchKind::True,
        },
    );
}

// The false case scans forward in the input stream, discarding all tokens, until it encounters
// either a \else or \fi command.
fn false_case<S: HasComponent<Component>>(
    token: Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    loop {
        match skip(input, true, "the true branch of a conditional that evaluated to false")? {
            Stop::Else => {
                push_branch(
                    input,
                    Branch {
                        token,
                        kind: BranchKind::Else,
                    },
                );
                return Ok(());
            }
            Stop::Fi => return Ok(()),
            // \or in a conditional that is not \ifcase is an error in TeX;
            // while skipping it is ignored.
            Stop::Or => continue,
        }
    }
}

macro_rules! create_if_primitive {
    ($if_fn: ident, $if_primitive_fn: ident, $get_if: ident, $docs: expr) => {
        fn $if_primitive_fn<S: HasComponent<Component>>(
            token: Token,
            input: &mut vm::ExpansionInput<S>,
        ) -> txl::Result<()> {
            if $if_fn(input)? {
                true_case(token, input);
                Ok(())
            } else {
                false_case(token, input)
            }
        }

        pub fn $get_if<S: HasComponent<Component>>() -> command::BuiltIn<S> {
            command::BuiltIn::new_expansion($if_primitive_fn)
                .with_tag(IF_TAG.get())
                .with_doc($docs)
        }
    };
}

fn if_true<S>(_: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    Ok(true)
}

fn if_false<S>(_: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    Ok(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    LessThan,
    Equal,
    GreaterThan,
}

#[derive(Debug)]
struct RelationEndOfInputError;

impl error::EndOfInputError for RelationEndOfInputError {
    fn doing(&self) -> String {
        "reading a relation (<, = or >)".into()
    }
}

fn parse_relation<S: TexweaveState>(input: &mut vm::ExpansionInput<S>) -> txl::Result<Relation> {
    loop {
        let token = input.next_or_err(RelationEndOfInputError)?;
        return match token.value() {
            Value::Space(_) => continue,
            Value::Other('<') => Ok(Relation::LessThan),
            Value::Other('=') => Ok(Relation::Equal),
            Value::Other('>') => Ok(Relation::GreaterThan),
            _ => Err(error::SimpleTokenError::new(
                input.vm(),
                token,
                "missing = inserted for \\ifnum",
            )
            .with_note("a relation is one of the characters <, = or >, with category code 12")
            .into()),
        };
    }
}

fn if_num<S: TexweaveState>(input: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    let a = i32::parse(input)?;
    let r = parse_relation(input)?;
    let b = i32::parse(input)?;
    Ok(match r {
        Relation::LessThan => a < b,
        Relation::Equal => a == b,
        Relation::GreaterThan => a > b,
    })
}

fn if_odd<S: TexweaveState>(input: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    let n = i32::parse(input)?;
    Ok(n % 2 != 0)
}

#[derive(Debug)]
struct IfxEndOfInputError;

impl error::EndOfInputError for IfxEndOfInputError {
    fn doing(&self) -> String {
        "reading the two tokens that \\ifx compares".into()
    }
}

/// Compares the next two unexpanded tokens.
///
/// Two characters are equal if they have the same character code and category code.
/// Two commands are equal if they have the same meaning; two undefined commands are equal.
/// A character and a command are equal if the command is an alias for the character.
fn if_x<S: TexweaveState>(input: &mut vm::ExpansionInput<S>) -> txl::Result<bool> {
    let a = input.unexpanded().next_or_err(IfxEndOfInputError)?;
    let b = input.unexpanded().next_or_err(IfxEndOfInputError)?;
    let chain = input.vm().chain();
    let resolve = |command_ref: &CommandRef| chain.command(command_ref);
    Ok(match (a.value(), b.value()) {
        (Value::CommandRef(a), Value::CommandRef(b)) => match (resolve(&a), resolve(&b)) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_meaning(b),
            _ => false,
        },
        (Value::CommandRef(command_ref), value) | (value, Value::CommandRef(command_ref)) => {
            matches!(resolve(&command_ref), Some(Command::CharacterTokenAlias(alias)) if *alias == value)
        }
        (a, b) => a == b,
    })
}

create_if_primitive![if_true, if_true_primitive_fn, get_if_true, IFTRUE_DOC];
create_if_primitive![if_false, if_false_primitive_fn, get_if_false, IFFALSE_DOC];
create_if_primitive![if_num, if_num_primitive_fn, get_if_num, IFNUM_DOC];
create_if_primitive![if_odd, if_odd_primitive_fn, get_if_odd, IFODD_DOC];
create_if_primitive![if_x, if_x_primitive_fn, get_if_x, IFX_DOC];

fn if_case_primitive_fn<S: HasComponent<Component>>(
    ifcase_token: Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let mut cases_to_skip = i32::parse(input)?;
    loop {
        if cases_to_skip == 0 {
            push_branch(
                input,
                Branch {
                    token: ifcase_token,
                    kind: BranchKind::Switch,
                },
            );
            return Ok(());
        }
        match skip(input, true, "the cases of an \\ifcase")? {
            Stop::Or => {
                cases_to_skip -= 1;
            }
            Stop::Else => {
                push_branch(
                    input,
                    Branch {
                        token: ifcase_token,
                        kind: BranchKind::Else,
                    },
                );
                return Ok(());
            }
            Stop::Fi => return Ok(()),
        }
    }
}

/// Get the `\ifcase` command.
pub fn get_if_case<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(if_case_primitive_fn)
        .with_tag(IF_TAG.get())
        .with_doc(IFCASE_DOC)
}

fn unexpected<S: TexweaveState>(
    token: Token,
    input: &vm::ExpansionInput<S>,
    title: &str,
) -> Box<error::Error> {
    error::SimpleTokenError::new(input.vm(), token, title)
        .with_category(error::Category::Scope)
        .into()
}

fn or_primitive_fn<S: HasComponent<Component>>(
    or_token: Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    // For an or command to be valid, we must be in a switch statement
    match pop_branch(input) {
        Some(Branch {
            kind: BranchKind::Switch,
            ..
        }) => {}
        branch => {
            if let Some(branch) = branch {
                push_branch(input, branch);
            }
            return Err(unexpected(or_token, input, "extra \\or"));
        }
    }
    skip(input, false, "the remaining cases of an \\ifcase")?;
    Ok(())
}

/// Get the `\or` command.
pub fn get_or<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(or_primitive_fn)
        .with_tag(OR_TAG.get())
        .with_doc(OR_DOC)
}

fn else_primitive_fn<S: HasComponent<Component>>(
    else_token: Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    // For else token to be valid, we must be in the true branch of a conditional
    match pop_branch(input) {
        Some(Branch {
            kind: BranchKind::True | BranchKind::Switch,
            ..
        }) => {}
        branch => {
            if let Some(branch) = branch {
                push_branch(input, branch);
            }
            return Err(unexpected(else_token, input, "extra \\else"));
        }
    }
    skip(input, false, "the false branch of a conditional that evaluated to true")?;
    Ok(())
}

/// Get the `\else` command.
pub fn get_else<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(else_primitive_fn)
        .with_tag(ELSE_TAG.get())
        .with_doc(ELSE_DOC)
}

fn fi_primitive_fn<S: HasComponent<Component>>(
    token: Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    // We could be in the false branch: \iftrue\else\fi
    // Or in the true branch: \iftrue\fi
    // Or in a switch statement.
    match pop_branch(input) {
        Some(branch) => {
            log::trace!("{:?} branch of the conditional at {:?} closed", branch.kind, branch.token);
            Ok(())
        }
        None => Err(unexpected(token, input, "extra \\fi")),
    }
}

/// Get the `\fi` command.
pub fn get_fi<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(fi_primitive_fn)
        .with_tag(FI_TAG.get())
        .with_doc(FI_DOC)
}

#[cfg(test)]
mod tests {
    use crate::testing::*;

    test_suite![
        expansion_equality_tests(
            (iftrue_base_case, r"\iftrue a\else b\fi c", r"ac"),
            (iftrue_no_else, r"\iftrue a\fi c", r"ac"),
            (
                iftrue_skip_nested_ifs,
                r"\iftrue a\else b\iftrue \else c\fi d\fi e",
                r"ae"
            ),
            (iffalse_base_case, r"\iffalse a\else b\fi c", r"bc"),
            (iffalse_no_else, r"\iffalse a\fi c", r"c"),
            (
                iffalse_skip_nested_ifs,
                r"\iffalse \iftrue a\else b\fi c\else d\fi e",
                r"de"
            ),
            (
                iffalse_and_iftrue_1,
                r"\iffalse a\else b\iftrue c\else d\fi e\fi f",
                r"bcef"
            ),
            (
                iffalse_and_iftrue_2,
                r"\iftrue a\iffalse b\else c\fi d\else e\fi f",
                r"acdf"
            ),
            (
                iffalse_skips_let_alias_of_if,
                r"\let\ifx=\iftrue \let\myfi=\fi \iffalse \ifx a\else b\myfi c\else d\fi e",
                r"de"
            ),
            (ifnum_less_than_true, r"\ifnum 4<5a\else b\fi c", r"ac"),
            (ifnum_less_than_false, r"\ifnum 5<4a\else b\fi c", r"bc"),
            (ifnum_equal_true, r"\ifnum 4=4a\else b\fi c", r"ac"),
            (ifnum_equal_false, r"\ifnum 5=4a\else b\fi c", r"bc"),
            (ifnum_greater_than_true, r"\ifnum 5>4a\else b\fi c", r"ac"),
            (ifnum_greater_than_false, r"\ifnum 4>5a\else b\fi c", r"bc"),
            (ifnum_spaces, r"\ifnum 4 < 5 a\else b\fi c", r"ac"),
            (
                ifnum_registers,
                r"\count1=4 \count2=5 \ifnum\count1<\count2 a\else b\fi c",
                r"ac"
            ),
            (ifodd_odd, r"\ifodd 3a\else b\fi c", r"ac"),
            (ifodd_even, r"\ifodd 4a\else b\fi c", r"bc"),
            (ifodd_negative, r"\ifodd -3a\else b\fi c", r"ac"),
            (ifcase_zero_no_ors, r"\ifcase 0 a\else b\fi c", r"ac"),
            (ifcase_zero_one_or, r"\ifcase 0 a\or b\else c\fi d", r"ad"),
            (ifcase_one, r"\ifcase 1 a\or b\else c\fi d", r"bd"),
            (
                ifcase_one_more_cases,
                r"\ifcase 1 a\or b\or c\else d\fi e",
                r"be"
            ),
            (ifcase_else_no_ors, r"\ifcase 1 a\else b\fi c", r"bc"),
            (ifcase_else_one_or, r"\ifcase 2 a\or b\else c\fi d", r"cd"),
            (ifcase_no_matching_case, r"\ifcase 3 a\or b\or c\fi d", r"d"),
            (
                ifcase_nested,
                r"\ifcase 1 a\or b\ifcase 1 c\or d\or e\else f\fi g\or h\fi i",
                r"bdgi"
            ),
            (ifx_same_letter, r"\ifx aa1\else 2\fi", "1"),
            (ifx_different_letters, r"\ifx ab1\else 2\fi", "2"),
            (
                ifx_letter_and_other,
                r"\ifx a11\else 2\fi",
                "2"
            ),
            (ifx_same_macro, r"\def\A{x}\def\B{x}\ifx\A\B 1\else 2\fi", "1"),
            (
                ifx_different_macro,
                r"\def\A{x}\def\B{y}\ifx\A\B 1\else 2\fi",
                "2"
            ),
            (
                ifx_long_macro_differs,
                r"\def\A{x}\long\def\B{x}\ifx\A\B 1\else 2\fi",
                "2"
            ),
            (
                ifx_same_primitive,
                r"\let\a=\count \ifx\a\count 1\else 2\fi",
                "1"
            ),
            (
                ifx_different_primitives,
                r"\ifx\count\dimen 1\else 2\fi",
                "2"
            ),
            (ifx_both_undefined, r"\ifx\undefinedA\undefinedB 1\else 2\fi", "1"),
            (
                ifx_undefined_and_defined,
                r"\ifx\undefinedA\count 1\else 2\fi",
                "2"
            ),
            (ifx_alias_and_character, r"\let\a=x\ifx\a x1\else 2\fi", "1"),
            (ifx_character_and_alias, r"\let\a=x\ifx x\a 1\else 2\fi", "1"),
            (
                ifx_does_not_expand,
                r"\def\A{a}\ifx\A a1\else 2\fi",
                "2"
            ),
            (
                ifx_skipped_branch,
                r"\iffalse \ifx ab\fi x\else y\fi",
                "y"
            ),
        ),
        failure_tests(
            (iftrue_end_of_input, r"\iftrue a\else b"),
            (iffalse_end_of_input, r"\iffalse a"),
            (else_not_expected, r"a\else"),
            (fi_not_expected, r"a\fi"),
            (or_not_expected, r"a\or"),
            (else_after_else, r"\iffalse a\else b\else c\fi"),
            (ifnum_missing_relation, r"\ifnum 4 5 a\fi"),
            (ifx_end_of_input, r"\ifx a"),
        ),
    ];
}
