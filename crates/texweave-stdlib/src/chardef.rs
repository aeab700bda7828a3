//! `\chardef` and `\mathchardef`
//!
//! Both bind a control sequence to a fixed code.
//! `\the` on the result gives the code back as a number.

use texweave::command::{self, Command};
use texweave::parse::{self, OptionalEquals};
use texweave::prelude as txl;
use texweave::token::{CommandRef, Token};
use texweave::traits::*;
use texweave::vm;

pub(crate) static CHARDEF_TAG: command::StaticTag = command::StaticTag::new();

/// The largest math code; `"8000` makes a character behave as if it were active.
const MAX_MATH_CODE: usize = 0x8000;

/// Get the `\chardef` command.
pub fn get_chardef<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(chardef_fn)
        .with_tag(CHARDEF_TAG.get())
        .with_doc("Bind a character code to a control sequence")
}

fn chardef_fn<S: TexweaveState>(_: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    let scope = input.assignment_scope();
    let (target, _, c) = <(CommandRef, OptionalEquals, char)>::parse(input)?;
    input
        .chain_mut()
        .set_command(target, Command::Character(c), scope);
    Ok(())
}

/// Get the `\mathchardef` command.
pub fn get_mathchardef<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(mathchardef_fn)
        .with_tag(CHARDEF_TAG.get())
        .with_doc("Bind a math code to a control sequence")
}

fn mathchardef_fn<S: TexweaveState>(
    _: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let scope = input.assignment_scope();
    let (target, _, code) =
        <(CommandRef, OptionalEquals, parse::Uint<{ MAX_MATH_CODE + 1 }>)>::parse(input)?;
    input
        .chain_mut()
        .set_command(target, Command::MathCharacter(code.0 as u32), scope);
    Ok(())
}
