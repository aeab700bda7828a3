//! The `\global`, `\long` and `\outer` prefix commands
//!
//! `\long` and `\outer` may only precede the macro definition commands
//!     (`\def`, `\gdef`, `\edef`, `\xdef` or their aliases).
//! A `\long` macro may take arguments that contain `\par`;
//!     an `\outer` macro may not appear inside arguments or definitions at all.
//!
//! `\global` may precede any assignment.
//!
//! # Developer notes
//!
//! `\global` changes the behavior, at run time, of a bunch of other commands
//!     like `\def` and `\advance`, and it also changes the semantics of variable assignment.
//! It is impossible to scope it tightly.
//!
//! The approach here is a flag in the [Component] that is set by `\global`.
//! Commands that can be prefixed read the flag exactly once, through
//!     [vm::ExecutionInput::assignment_scope], which consults
//!     [variable_assignment_scope_hook] and resets the flag.
//! The VM main loop does this for variable assignments.
//!
//! It is essential that *all* code paths within a prefixable command
//!     request the assignment scope, even if they don't use the result!
//! For example `\gdef` always creates a macro in the global scope,
//!     but it still needs to clear the flag.
//! Otherwise `\global` would leak into the next assignment.
//! Unit tests verify this with the `\assertGlobalIsFalse` command.
//!
//! Finally, execution commands which can be prefixed are registered by tag
//!     in the sets inside the [Component].

use crate::{alias, chardef, def, expansion, font, registers, variableops};
use std::collections::HashSet;
use texweave::command::{self, Command};
use texweave::error;
use texweave::group::Scope;
use texweave::prelude as txl;
use texweave::token::{Token, Value};
use texweave::traits::*;
use texweave::vm;

/// Component for the prefix commands.
pub struct Component {
    global: bool,
    long: bool,
    outer: bool,
    prefixable_with_global: HashSet<command::Tag>,
    prefixable_with_any: HashSet<command::Tag>,
}

impl Default for Component {
    fn default() -> Self {
        Component {
            global: false,
            long: false,
            outer: false,
            prefixable_with_global: [
                alias::LET_TAG.get(),
                chardef::CHARDEF_TAG.get(),
                font::FONT_TAG.get(),
                registers::REGISTER_DEF_TAG.get(),
                variableops::VARIABLE_OP_TAG.get(),
            ]
            .into_iter()
            .collect(),
            prefixable_with_any: [def::DEF_TAG.get()].into_iter().collect(),
        }
    }
}

impl Component {
    /// Get the value of the global flag and reset the flag to false.
    ///
    /// See the module documentation for correct usage of this method.
    pub fn take_global(&mut self) -> bool {
        std::mem::take(&mut self.global)
    }

    /// Get the value of the long flag and reset the flag to false.
    pub fn take_long(&mut self) -> bool {
        std::mem::take(&mut self.long)
    }

    /// Get the value of the outer flag and reset the flag to false.
    pub fn take_outer(&mut self) -> bool {
        std::mem::take(&mut self.outer)
    }
}

/// Variable assignment scope hook for the `\global` prefix.
///
/// States using this module must configure
///     [TexweaveState::variable_assignment_scope_hook] to invoke this function.
#[inline]
pub fn variable_assignment_scope_hook<S: HasComponent<Component>>(state: &mut S) -> Scope {
    if state.component_mut().take_global() {
        Scope::Global
    } else {
        Scope::Local
    }
}

static GLOBAL_TAG: command::StaticTag = command::StaticTag::new();
static LONG_TAG: command::StaticTag = command::StaticTag::new();
static OUTER_TAG: command::StaticTag = command::StaticTag::new();

/// Get the `\global` command.
pub fn get_global<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(global_primitive_fn)
        .with_tag(GLOBAL_TAG.get())
        .with_doc("Make the following assignment global")
}

/// Get the `\long` command.
pub fn get_long<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(long_primitive_fn)
        .with_tag(LONG_TAG.get())
        .with_doc("Allow the arguments of the following macro definition to contain \\par")
}

/// Get the `\outer` command.
pub fn get_outer<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(outer_primitive_fn)
        .with_tag(OUTER_TAG.get())
        .with_doc("Forbid the following macro from appearing in arguments and definitions")
}

#[derive(Default, Clone, Copy)]
struct Prefix {
    global: Option<Token>,
    long: Option<Token>,
    outer: Option<Token>,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Global,
    Long,
    Outer,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Global => write!(f, "\\global"),
            Kind::Long => write!(f, "\\long"),
            Kind::Outer => write!(f, "\\outer"),
        }
    }
}

impl Prefix {
    fn kind(&self) -> Kind {
        if self.global.is_some() {
            Kind::Global
        } else if self.long.is_some() {
            Kind::Long
        } else {
            Kind::Outer
        }
    }
}

fn global_primitive_fn<S: HasComponent<Component>>(
    global_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    process_prefixes(
        Prefix {
            global: Some(global_token),
            ..Default::default()
        },
        input,
    )
}

fn long_primitive_fn<S: HasComponent<Component>>(
    long_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    process_prefixes(
        Prefix {
            long: Some(long_token),
            ..Default::default()
        },
        input,
    )
}

fn outer_primitive_fn<S: HasComponent<Component>>(
    outer_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    process_prefixes(
        Prefix {
            outer: Some(outer_token),
            ..Default::default()
        },
        input,
    )
}

enum Target {
    Any,
    GlobalOnly,
    Invalid,
}

fn process_prefixes<S: HasComponent<Component>>(
    mut prefix: Prefix,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    complete_prefix(&mut prefix, input)?;
    let token = match input.peek()? {
        None => {
            return Err(error::SimpleEndOfInputError::new(
                input.vm(),
                format!("end of input after the prefix command {}", prefix.kind()),
            )
            .with_note(r"prefix commands must be followed by an assignment like \def or \count 1 = 2")
            .into());
        }
        Some(&token) => token,
    };
    let target = match token.value() {
        Value::CommandRef(command_ref) => match input.vm().chain().command(&command_ref) {
            Some(Command::Variable(_)) | Some(Command::Font(_)) => Target::GlobalOnly,
            Some(Command::Execution(_, Some(tag))) => {
                let component = input.state().component();
                if component.prefixable_with_any.contains(tag) {
                    Target::Any
                } else if component.prefixable_with_global.contains(tag) {
                    Target::GlobalOnly
                } else {
                    Target::Invalid
                }
            }
            _ => Target::Invalid,
        },
        _ => Target::Invalid,
    };
    match target {
        Target::Any => {
            let component = input.state_mut().component_mut();
            component.global = prefix.global.is_some();
            component.long = prefix.long.is_some();
            component.outer = prefix.outer.is_some();
        }
        Target::GlobalOnly => {
            if let Some(bad_token) = prefix.long.or(prefix.outer) {
                let kind = if prefix.long.is_some() {
                    Kind::Long
                } else {
                    Kind::Outer
                };
                input.vm().error(
                    error::SimpleTokenError::new(
                        input.vm(),
                        bad_token,
                        format!("the prefix {kind} cannot be used with this command"),
                    )
                    .with_note(r"the \long and \outer prefixes can only be used with \def, \gdef, \edef and \xdef (or their aliases)"),
                )?;
            }
            input.state_mut().component_mut().global = prefix.global.is_some();
        }
        Target::Invalid => {
            // The prefixes are dropped and the token is processed as usual.
            let title = match token.value() {
                Value::CommandRef(_) => format!("this command cannot be prefixed with {}", prefix.kind()),
                _ => format!("character tokens cannot be prefixed with {}", prefix.kind()),
            };
            input.vm().error(
                error::SimpleTokenError::new(input.vm(), token, title)
                    .with_note(r"prefixes can only be used with assignments like \def, \let or \count 1 = 2"),
            )?;
        }
    }
    Ok(())
}

/// Reads any further prefixes.
///
/// Spaces and `\relax` commands between prefixes are skipped.
///
/// TeX.2021.1211.
fn complete_prefix<S: TexweaveState>(
    prefix: &mut Prefix,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    loop {
        let token = match input.peek()? {
            None => return Ok(()),
            Some(&token) => token,
        };
        match token.value() {
            Value::Space(_) => {}
            Value::CommandRef(command_ref) => {
                let tag = input
                    .vm()
                    .chain()
                    .command(&command_ref)
                    .and_then(|cmd| cmd.tag());
                match tag {
                    Some(tag) if tag == GLOBAL_TAG.get() => prefix.global = Some(token),
                    Some(tag) if tag == LONG_TAG.get() => prefix.long = Some(token),
                    Some(tag) if tag == OUTER_TAG.get() => prefix.outer = Some(token),
                    Some(tag) if tag == expansion::RELAX_TAG.get() => {}
                    _ => return Ok(()),
                }
            }
            _ => return Ok(()),
        }
        input.consume()?;
    }
}

/// Get an execution command that checks that the global flag is off.
///
/// Commands that can be prefixed with `\global` must reset the flag.
/// Tests check this with snippets like
/// ```tex
/// \global \command <input to command> \assertGlobalIsFalse
/// ```
#[cfg(test)]
pub fn get_assert_global_is_false<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    fn assert_global_is_false_fn<S: HasComponent<Component>>(
        token: Token,
        input: &mut vm::ExecutionInput<S>,
    ) -> txl::Result<()> {
        let component = input.state_mut().component_mut();
        if component.take_global() || component.take_long() || component.take_outer() {
            Err(error::SimpleTokenError::new(input.vm(), token, "assertion failed: a prefix flag is set").into())
        } else {
            Ok(())
        }
    }
    command::BuiltIn::new_execution(assert_global_is_false_fn)
}
