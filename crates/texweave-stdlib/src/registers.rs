//! Register variables (`\count`, `\dimen`, `\skip`, `\muskip`, `\toks`)
//!     and the commands that bind them to control sequences (`\countdef` and friends).
//!
//! Registers live in the group chain, so they follow the usual scoping rules.
//! Register numbers are not bounded by anything other than the size of an integer.

use std::rc::Rc;
use texweave::command::{self, Command};
use texweave::group::Address;
use texweave::parse::{self, OptionalEquals};
use texweave::prelude as txl;
use texweave::token::{CommandRef, Token};
use texweave::traits::*;
use texweave::variable;
use texweave::vm;

pub const COUNT_DOC: &str = "Get or set an integer register";
pub const DIMEN_DOC: &str = "Get or set a dimension register";
pub const SKIP_DOC: &str = "Get or set a glue register";
pub const MUSKIP_DOC: &str = "Get or set a math glue register";
pub const TOKS_DOC: &str = "Get or set a token list register";
pub const COUNTDEF_DOC: &str = "Bind an integer register to a control sequence";

const NUM_REGISTERS: usize = parse::Uint::<0>::MAX;

pub(crate) static REGISTER_DEF_TAG: command::StaticTag = command::StaticTag::new();

/// Get the `\count` command.
pub fn get_count<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_dynamic(count_fn)).with_doc(COUNT_DOC)
}

/// Get the `\dimen` command.
pub fn get_dimen<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_dynamic(dimen_fn)).with_doc(DIMEN_DOC)
}

/// Get the `\skip` command.
pub fn get_skip<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_dynamic(skip_fn)).with_doc(SKIP_DOC)
}

/// Get the `\muskip` command.
pub fn get_muskip<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_dynamic(muskip_fn)).with_doc(MUSKIP_DOC)
}

/// Get the `\toks` command.
pub fn get_toks<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_dynamic(toks_fn)).with_doc(TOKS_DOC)
}

fn register_number<S: TexweaveState>(input: &mut vm::ExpandedStream<S>) -> txl::Result<u32> {
    let index = parse::Uint::<NUM_REGISTERS>::parse(input)?;
    Ok(index.0 as u32)
}

fn count_fn<S: TexweaveState>(_: Token, input: &mut vm::ExpandedStream<S>) -> txl::Result<Address> {
    Ok(Address::Count(register_number(input)?))
}

fn dimen_fn<S: TexweaveState>(_: Token, input: &mut vm::ExpandedStream<S>) -> txl::Result<Address> {
    Ok(Address::Dimen(register_number(input)?))
}

fn skip_fn<S: TexweaveState>(_: Token, input: &mut vm::ExpandedStream<S>) -> txl::Result<Address> {
    Ok(Address::Skip(register_number(input)?))
}

fn muskip_fn<S: TexweaveState>(_: Token, input: &mut vm::ExpandedStream<S>) -> txl::Result<Address> {
    Ok(Address::MuSkip(register_number(input)?))
}

fn toks_fn<S: TexweaveState>(_: Token, input: &mut vm::ExpandedStream<S>) -> txl::Result<Address> {
    Ok(Address::Toks(register_number(input)?))
}

/// Get the `\countdef` command.
pub fn get_countdef<S: TexweaveState>() -> command::BuiltIn<S> {
    new_register_def(countdef_fn)
}

/// Get the `\dimendef` command.
pub fn get_dimendef<S: TexweaveState>() -> command::BuiltIn<S> {
    new_register_def(dimendef_fn)
}

/// Get the `\skipdef` command.
pub fn get_skipdef<S: TexweaveState>() -> command::BuiltIn<S> {
    new_register_def(skipdef_fn)
}

/// Get the `\muskipdef` command.
pub fn get_muskipdef<S: TexweaveState>() -> command::BuiltIn<S> {
    new_register_def(muskipdef_fn)
}

/// Get the `\toksdef` command.
pub fn get_toksdef<S: TexweaveState>() -> command::BuiltIn<S> {
    new_register_def(toksdef_fn)
}

fn new_register_def<S>(f: command::ExecutionFn<S>) -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(f)
        .with_tag(REGISTER_DEF_TAG.get())
        .with_doc(COUNTDEF_DOC)
}

fn countdef_fn<S: TexweaveState>(_: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    register_def(input, Address::Count)
}

fn dimendef_fn<S: TexweaveState>(_: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    register_def(input, Address::Dimen)
}

fn skipdef_fn<S: TexweaveState>(_: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    register_def(input, Address::Skip)
}

fn muskipdef_fn<S: TexweaveState>(_: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    register_def(input, Address::MuSkip)
}

fn toksdef_fn<S: TexweaveState>(_: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    register_def(input, Address::Toks)
}

fn register_def<S: TexweaveState>(
    input: &mut vm::ExecutionInput<S>,
    address: fn(u32) -> Address,
) -> txl::Result<()> {
    let scope = input.assignment_scope();
    let (target, _, index) =
        <(CommandRef, OptionalEquals, parse::Uint<NUM_REGISTERS>)>::parse(input)?;
    let variable = variable::Command::new_static(address(index.0 as u32));
    input
        .chain_mut()
        .set_command(target, Command::Variable(Rc::new(variable)), scope);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testing::*;

    test_suite![
        expansion_equality_tests(
            (count_default, r"\the\count1", "0"),
            (count_assign, r"\count1=-17 \the\count1", "-17"),
            (count_assign_no_equals, r"\count1 17 \the\count1", "17"),
            (count_large_register, r"\count 40000=3 \the\count40000", "3"),
            (count_grouping, r"\count1=1{\count1=2}\the\count1", "1"),
            (count_from_register, r"\count1=5 \count2=\count1 \the\count2", "5"),
            (dimen, r"\dimen2=3.5pt \the\dimen2", the_output("3.5pt")),
            (
                skip,
                r"\skip3=1pt plus 2fil minus 3fill\relax\the\skip3",
                the_output("1.0pt plus 2.0fil minus 3.0fill")
            ),
            (
                muskip,
                r"\muskip0=3mu plus 1fill\relax\the\muskip0",
                the_output("3.0mu plus 1.0fill")
            ),
            (toks, r"\toks0={Hello}\the\toks0", "Hello"),
            (toks_from_toks, r"\toks0={a}\toks1=\toks0 \the\toks1", "a"),
            (countdef, r"\countdef\A=5 \A=7 \the\count5", "7"),
            (countdef_read, r"\count5=7 \countdef\A=5 \the\A", "7"),
            (countdef_local, r"{\countdef\A=5}\def\A{x}\A", "x"),
            (countdef_global, r"{\global\countdef\A=5}\A=3 \the\count5", "3"),
            (
                countdef_takes_global,
                r"\global\countdef\A=5 \assertGlobalIsFalse",
                ""
            ),
            (dimendef, r"\dimendef\D=1 \D=2pt \the\dimen1", the_output("2.0pt")),
            (skipdef, r"\skipdef\S=1 \S=2pt\relax\the\skip1", the_output("2.0pt")),
            (toksdef, r"\toksdef\T=2 \T={xy}\the\toks2", "xy"),
            (
                countdef_active_character,
                r"\catcode`\A=13 \countdef A5 \countdef ~6 ~=7 A=8 \advance~byA\the~",
                "15"
            ),
        ),
        failure_tests(
            (count_negative_register, r"\count -1 = 4"),
            (count_end_of_input, r"\count"),
            (toks_letter_value, r"\toks 0 = a"),
            (toks_end_of_input, r"\toks 0 = {  no closing brace"),
            (countdef_character_target, r"\countdef a=1"),
            (countdef_end_of_input, r"\countdef"),
        ),
    ];
}
