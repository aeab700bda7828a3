//! Primitives for creating user-defined macros (`\def` and friends).

use crate::prefix;
use std::rc::Rc;
use texweave::command::{self, Command};
use texweave::error;
use texweave::group::{Address, IntegerParameter, Scope};
use texweave::parse;
use texweave::prelude as txl;
use texweave::texmacro::{self, Macro};
use texweave::token::{CommandRef, Token, Value};
use texweave::traits::*;
use texweave::vm;

pub const DEF_DOC: &str = "Define a custom macro";
pub const GDEF_DOC: &str = "Define a custom macro globally";
pub const EDEF_DOC: &str = "Define a custom macro, expanding the replacement text first";
pub const XDEF_DOC: &str = "Define a custom macro globally, expanding the replacement text first";

pub(crate) static DEF_TAG: command::StaticTag = command::StaticTag::new();

/// Get the `\def` command.
pub fn get_def<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(def_primitive_fn)
        .with_tag(DEF_TAG.get())
        .with_doc(DEF_DOC)
}

/// Get the `\gdef` command.
pub fn get_gdef<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(gdef_primitive_fn)
        .with_tag(DEF_TAG.get())
        .with_doc(GDEF_DOC)
}

/// Get the `\edef` command.
pub fn get_edef<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(edef_primitive_fn)
        .with_tag(DEF_TAG.get())
        .with_doc(EDEF_DOC)
}

/// Get the `\xdef` command.
pub fn get_xdef<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(xdef_primitive_fn)
        .with_tag(DEF_TAG.get())
        .with_doc(XDEF_DOC)
}

#[derive(Debug, Clone, Copy)]
struct Kind {
    global: bool,
    expanded: bool,
}

fn def_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    parse_and_set_macro(
        def_token,
        input,
        Kind {
            global: false,
            expanded: false,
        },
    )
}

fn gdef_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    parse_and_set_macro(
        def_token,
        input,
        Kind {
            global: true,
            expanded: false,
        },
    )
}

fn edef_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    parse_and_set_macro(
        def_token,
        input,
        Kind {
            global: false,
            expanded: true,
        },
    )
}

fn xdef_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    parse_and_set_macro(
        def_token,
        input,
        Kind {
            global: true,
            expanded: true,
        },
    )
}

fn parse_and_set_macro<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
    kind: Kind,
) -> txl::Result<()> {
    // The scope is always requested so that the \global flag is cleared.
    let mut scope = input.assignment_scope();
    let global_defs = input
        .vm()
        .chain()
        .integer(Address::Integer(IntegerParameter::GlobalDefs));
    if kind.global && global_defs >= 0 {
        scope = Scope::Global;
    }
    let component = input.state_mut().component_mut();
    let long = component.take_long();
    let outer = component.take_outer();

    let target = CommandRef::parse(input)?;
    let mut parameter_text = vec![];
    let begin_group = loop {
        let token = input.unexpanded().next_or_err(DefinitionEndOfInputError {
            doing: "reading the parameter text of a macro definition",
        })?;
        match token.value() {
            Value::BeginGroup(_) => break token,
            Value::EndGroup(_) => {
                return Err(error::SimpleTokenError::new(
                    input.vm(),
                    token,
                    "unexpected end group token in the parameter text of a macro",
                )
                .with_note("the replacement text of a macro starts with a begin group token like {")
                .into());
            }
            _ => {
                check_not_outer(input.vm(), token)?;
                parameter_text.push(token);
            }
        }
    };
    let (prefix, parameters, brace_suffix) =
        texmacro::parse_parameter_text(input.vm(), parameter_text, begin_group)?;

    let mut replacement_text = vec![];
    let complete = if kind.expanded {
        parse::parse_balanced_tokens(input, &mut replacement_text)?
    } else {
        parse::parse_balanced_tokens(input.unexpanded(), &mut replacement_text)?
    };
    if !complete {
        return Err(error::SimpleEndOfInputError::new(
            input.vm(),
            "unexpected end of input while reading the replacement text of a macro",
        )
        .with_note(format!(
            "the definition started at {}",
            input.vm().trace(def_token).value
        ))
        .into());
    }
    if !kind.expanded {
        for token in &replacement_text {
            check_not_outer(input.vm(), *token)?;
        }
    }
    if let Some(brace) = brace_suffix {
        replacement_text.push(brace);
    }
    let replacements =
        texmacro::parse_replacement_text(input.vm(), replacement_text, parameters.len())?;

    let tex_macro = Macro::new(prefix, parameters, replacements)
        .with_long(long)
        .with_outer(outer);
    log::trace!(
        "defining {} as {} ({scope:?})",
        target.to_string(input.vm().cs_name_interner()),
        tex_macro.meaning(input.vm().cs_name_interner()),
    );
    input
        .chain_mut()
        .set_command(target, Command::Macro(Rc::new(tex_macro)), scope);
    Ok(())
}

/// `\outer` macros may not appear in the text of a definition.
///
/// TeX.2021.336.
fn check_not_outer<S>(vm: &vm::VM<S>, token: Token) -> txl::Result<()> {
    if let Value::CommandRef(command_ref) = token.value() {
        if let Some(Command::Macro(tex_macro)) = vm.chain().command(&command_ref) {
            if tex_macro.is_outer() {
                return Err(error::SimpleTokenError::new(
                    vm,
                    token,
                    "forbidden control sequence found while scanning a definition",
                )
                .with_note(r"macros defined with \outer cannot appear inside definitions")
                .into());
            }
        }
    }
    Ok(())
}

#[derive(Debug)]
struct DefinitionEndOfInputError {
    doing: &'static str,
}

impl error::EndOfInputError for DefinitionEndOfInputError {
    fn doing(&self) -> String {
        self.doing.into()
    }
}
