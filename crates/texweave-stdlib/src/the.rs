//! `\the` and `\meaning`
//!
//! Both expand to a list of character tokens.
//! Every character is an other token, except spaces which are space tokens.
//! The exception is `\the` applied to a token list variable, which expands to the list itself.

use texweave::command::{self, Command};
use texweave::error;
use texweave::group::Address;
use texweave::prelude as txl;
use texweave::token::{CsNameInterner, Token, Value};
use texweave::traits::*;
use texweave::variable;
use texweave::vm;

pub const THE_DOC: &str = "Output the value of a variable or character command";
pub const MEANING_DOC: &str = "Output a description of the next token";

/// Get the `\the` command.
pub fn get_the<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(the_primitive_fn).with_doc(THE_DOC)
}

#[derive(Debug)]
struct TheEndOfInputError;

impl error::EndOfInputError for TheEndOfInputError {
    fn doing(&self) -> String {
        "reading the argument of \\the".into()
    }
}

fn the_primitive_fn<S: TexweaveState>(
    the_token: Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let token = input.next_or_err(TheEndOfInputError)?;
    let command = match token.value() {
        Value::CommandRef(command_ref) => input.vm().chain().command(&command_ref).cloned(),
        _ => None,
    };
    let s = match command {
        Some(Command::Variable(cmd)) => match cmd.value(token, input.expanded())? {
            variable::Value::TokenList(list) => {
                input.expansions_mut().extend(list.iter().rev().copied());
                return Ok(());
            }
            value => value.display(input.vm()),
        },
        Some(Command::Character(c)) => (c as u32).to_string(),
        Some(Command::MathCharacter(code)) => code.to_string(),
        Some(Command::Font(id)) => input.vm().font_identifier(id),
        Some(Command::Execution(_, Some(tag))) if tag == crate::font::FONT_TAG.get() => {
            let id = input.vm().chain().font(Address::CurrentFont);
            input.vm().font_identifier(id)
        }
        _ => {
            let meaning = meaning(input.vm(), token);
            return Err(error::SimpleTokenError::new(
                input.vm(),
                token,
                format!("you can't use `{meaning}` after \\the"),
            )
            .with_note("\\the applies to variables like \\count 1 and to characters defined by \\chardef")
            .into());
        }
    };
    input.push_string_tokens(the_token, &s);
    Ok(())
}

/// Get the `\meaning` command.
pub fn get_meaning<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(meaning_primitive_fn).with_doc(MEANING_DOC)
}

#[derive(Debug)]
struct MeaningEndOfInputError;

impl error::EndOfInputError for MeaningEndOfInputError {
    fn doing(&self) -> String {
        "reading the argument of \\meaning".into()
    }
}

fn meaning_primitive_fn<S: TexweaveState>(
    meaning_token: Token,
    input: &mut vm::ExpansionInput<S>,
) -> txl::Result<()> {
    let token = input.unexpanded().next_or_err(MeaningEndOfInputError)?;
    let s = meaning(input.vm(), token);
    input.push_string_tokens(meaning_token, &s);
    Ok(())
}

/// Describes a token the way `\meaning` does.
///
/// Primitives are described by the name of the token that refers to them.
pub fn meaning<S>(vm: &vm::VM<S>, token: Token) -> String {
    let command_ref = match token.value() {
        Value::CommandRef(command_ref) => command_ref,
        value => return character_meaning(value),
    };
    let interner: &CsNameInterner = vm.cs_name_interner();
    match vm.chain().command(&command_ref) {
        None => "undefined".into(),
        Some(Command::Macro(tex_macro)) => tex_macro.meaning(interner),
        Some(Command::CharacterTokenAlias(value)) => character_meaning(*value),
        Some(Command::Character(c)) => format!("\\char\"{:X}", *c as u32),
        Some(Command::MathCharacter(code)) => format!("\\mathchar\"{code:X}"),
        Some(Command::Font(id)) => format!("select font {}", vm.fonts.get(*id).name()),
        Some(Command::Expansion(..) | Command::Execution(..) | Command::Variable(_)) => {
            command_ref.to_string(interner)
        }
    }
}

fn character_meaning(value: Value) -> String {
    match value {
        Value::BeginGroup(c) => format!("begin-group character {c}"),
        Value::EndGroup(c) => format!("end-group character {c}"),
        Value::MathShift(c) => format!("math shift character {c}"),
        Value::AlignmentTab(c) => format!("alignment tab character {c}"),
        Value::Parameter(c) => format!("macro parameter character {c}"),
        Value::Superscript(c) => format!("superscript character {c}"),
        Value::Subscript(c) => format!("subscript character {c}"),
        Value::Space(c) => format!("blank space {c}"),
        Value::Letter(c) => format!("the letter {c}"),
        Value::Other(c) => format!("the character {c}"),
        Value::CommandRef(_) => "undefined".into(),
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::*;

    test_suite![
        expansion_equality_tests(
            (the_count, r"\count1=123 \the\count1", "123"),
            (the_negative_count, r"\count1=-5 \the\count1", "-5"),
            (the_catcode, r"\the\catcode`\%", "14"),
            (the_parameter, r"\the\mag", "1000"),
            (the_toks_keeps_cat_codes, r"\toks1={a#b}\the\toks1", r"a#b"),
            (the_toks_empty, r"\toks1={}x\the\toks1 y", "xy"),
            (the_chardef, r"\chardef\c=97 \the\c", "97"),
            (the_mathchardef, r#"\mathchardef\c="7161 \the\c"#, "29025"),
            (the_expands_its_argument, r"\def\a{\count1}\count1=4 \the\a", "4"),
            (the_in_edef, r"\count1=42 \edef\a{\the\count1}\a", "42"),
            (the_dimen, r"\dimen1=-0.5pt \the\dimen1", the_output("-0.5pt")),
            (meaning_letter, r"\meaning a", the_output("the letter a")),
            (meaning_other, r"\meaning 1", the_output("the character 1")),
            (meaning_begin_group, r"\meaning{", the_output("begin-group character {")),
            (
                meaning_macro,
                r"\def\A{abc}\meaning\A",
                the_output("macro:->abc")
            ),
            (
                meaning_macro_with_parameters,
                r"\def\A#1#2{x#2}\meaning\A",
                the_output("macro:#1#2->x#2")
            ),
            (
                meaning_long_macro,
                r"\long\def\A{a}\meaning\A",
                the_output(r"\long macro:->a")
            ),
            (meaning_undefined, r"\meaning\undefined", the_output("undefined")),
            (meaning_primitive, r"\meaning\count", the_output(r"\count")),
            (meaning_let_character, r"\let\B=a\meaning\B", the_output("the letter a")),
            (
                meaning_chardef,
                r#"\chardef\c="41 \meaning\c"#,
                the_output(r#"\char"41"#)
            ),
            (
                meaning_does_not_expand,
                r"\def\A{\B}\meaning\A",
                the_output(r"macro:->\B ")
            ),
        ),
        failure_tests(
            (the_letter, r"\the a"),
            (the_macro, r"\def\A{}\the\A"),
            (the_undefined, r"\the\undefined"),
            (the_end_of_input, r"\the"),
            (meaning_end_of_input, r"\meaning"),
        ),
    ];
}
