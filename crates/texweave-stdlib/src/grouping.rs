//! Semi-simple groups and `\aftergroup`
//!
//! Groups opened with `\begingroup` can only be closed by `\endgroup`,
//!     and groups opened with a begin-group character can only be closed by an end-group character.

use texweave::command;
use texweave::error;
use texweave::group::GroupKind;
use texweave::prelude as txl;
use texweave::token::Token;
use texweave::traits::*;
use texweave::vm;

/// Get the `\begingroup` command.
pub fn get_begingroup<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(|token, input| {
        input.begin_group(GroupKind::SemiSimple, token);
        Ok(())
    })
    .with_doc("Begin a group that must be ended by \\endgroup")
}

/// Get the `\endgroup` command.
pub fn get_endgroup<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(|token, input| input.end_group(GroupKind::SemiSimple, token))
        .with_doc("End a group begun by \\begingroup")
}

/// Get the `\aftergroup` command.
pub fn get_aftergroup<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(aftergroup_primitive_fn)
        .with_doc("Insert a token after the current group ends")
}

#[derive(Debug)]
struct AfterGroupEndOfInputError;

impl error::EndOfInputError for AfterGroupEndOfInputError {
    fn doing(&self) -> String {
        "reading the token to insert after the current group".into()
    }
}

fn aftergroup_primitive_fn<S: TexweaveState>(
    _: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let token = input.unexpanded().next_or_err(AfterGroupEndOfInputError)?;
    input.chain_mut().add_after_group_token(token);
    Ok(())
}
