//! Fonts: `\font`, `\nullfont` and the math family fonts
//!
//! `\font\x=name` loads a font through the VM's font factory and binds `\x` to it.
//! Executing `\x` selects the font.
//! The family fonts `\textfont`, `\scriptfont` and `\scriptscriptfont` are font variables
//!     indexed by a family number between 0 and 15.

use common::Scaled;
use font::FontId;
use texweave::command::{self, Command};
use texweave::error;
use texweave::group::{Address, MathSize};
use texweave::parse::{self, OptionalEquals};
use texweave::prelude as txl;
use texweave::token::{CommandRef, Token, Value};
use texweave::traits::*;
use texweave::variable;
use texweave::vm;

pub(crate) static FONT_TAG: command::StaticTag = command::StaticTag::new();

/// Number of math families.
pub const NUM_FAMILIES: usize = 16;

/// Get the `\font` command.
pub fn get_font<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(font_primitive_fn)
        .with_tag(FONT_TAG.get())
        .with_doc("Load a font and bind it to a control sequence")
}

/// Get the `\nullfont` command.
pub fn get_nullfont<S: TexweaveState>() -> command::BuiltIn<S> {
    Command::Font(FontId::NULL_FONT).into()
}

/// Get the `\textfont` command.
pub fn get_textfont<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_dynamic(textfont_address))
        .with_doc("The text size font of a math family")
}

/// Get the `\scriptfont` command.
pub fn get_scriptfont<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_dynamic(scriptfont_address))
        .with_doc("The script size font of a math family")
}

/// Get the `\scriptscriptfont` command.
pub fn get_scriptscriptfont<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(variable::Command::new_dynamic(scriptscriptfont_address))
        .with_doc("The script-script size font of a math family")
}

fn textfont_address<S: TexweaveState>(
    _: Token,
    input: &mut vm::ExpandedStream<S>,
) -> txl::Result<Address> {
    family_address(input, MathSize::Text)
}

fn scriptfont_address<S: TexweaveState>(
    _: Token,
    input: &mut vm::ExpandedStream<S>,
) -> txl::Result<Address> {
    family_address(input, MathSize::Script)
}

fn scriptscriptfont_address<S: TexweaveState>(
    _: Token,
    input: &mut vm::ExpandedStream<S>,
) -> txl::Result<Address> {
    family_address(input, MathSize::ScriptScript)
}

fn family_address<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    size: MathSize,
) -> txl::Result<Address> {
    let family = parse::Uint::<NUM_FAMILIES>::parse(input)?;
    Ok(Address::FamilyFont(size, family.0 as u8))
}

/// Reads a file name: a sequence of character tokens ended by a space or a non-character token.
///
/// TeX.2021.526.
fn parse_file_name<S: TexweaveState>(input: &mut vm::ExecutionInput<S>) -> txl::Result<String> {
    let mut name = String::new();
    loop {
        let token = match input.next()? {
            None if name.is_empty() => {
                return Err(error::SimpleEndOfInputError::new(
                    input.vm(),
                    "unexpected end of input while reading a font name",
                )
                .into())
            }
            None => return Ok(name),
            Some(token) => token,
        };
        match token.value() {
            Value::Space(_) if name.is_empty() => continue,
            Value::Space(_) => return Ok(name),
            Value::CommandRef(_) | Value::BeginGroup(_) | Value::EndGroup(_) => {
                input.back(token);
                if name.is_empty() {
                    return Err(parse::Error::new(
                        input.vm(),
                        "a font name",
                        Some(token),
                        "a font name is a sequence of characters like cmr10",
                    )
                    .into());
                }
                return Ok(name);
            }
            _ => {
                if let Some(c) = token.char() {
                    name.push(c);
                }
            }
        }
    }
}

/// Scaling requested after the font name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Size {
    Design,
    At(Scaled),
    Scaled(i32),
}

fn parse_size<S: TexweaveState>(input: &mut vm::ExecutionInput<S>) -> txl::Result<Size> {
    if parse::parse_keyword(input.as_mut(), "at")? {
        let token = input.peek()?.copied();
        let size = Scaled::parse(input)?;
        if size <= Scaled::ZERO || size >= Scaled(2048 * Scaled::ONE.0) {
            let title = format!("improper `at` size ({size}), replaced by the design size");
            report_size_error(input, token, title, "the size must be positive and less than 2048pt")?;
            return Ok(Size::Design);
        }
        return Ok(Size::At(size));
    }
    if parse::parse_keyword(input.as_mut(), "scaled")? {
        let token = input.peek()?.copied();
        let n = i32::parse(input)?;
        if n <= 0 || n > 32768 {
            let title = format!("illegal magnification {n}, replaced by 1000");
            report_size_error(input, token, title, "the magnification must be between 1 and 32768")?;
            return Ok(Size::Design);
        }
        return Ok(Size::Scaled(n));
    }
    Ok(Size::Design)
}

fn report_size_error<S: TexweaveState>(
    input: &mut vm::ExecutionInput<S>,
    token: Option<Token>,
    title: String,
    note: &str,
) -> txl::Result<()> {
    match token {
        Some(token) => input
            .vm()
            .error(error::SimpleTokenError::new(input.vm(), token, title).with_note(note)),
        None => input
            .vm()
            .error(error::SimpleFailedPreconditionError::new(title).with_note(note)),
    }
}

fn font_primitive_fn<S: TexweaveState>(
    font_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let scope = input.assignment_scope();
    let (target, _) = <(CommandRef, OptionalEquals)>::parse(input)?;
    // The identifier is null while the font loads, in case loading fails.
    input
        .chain_mut()
        .set_command(target, Command::Font(FontId::NULL_FONT), scope);
    let name = parse_file_name(input)?;
    let size = parse_size(input)?;
    let parts = input.vm_parts();
    let loaded = match size {
        Size::Design => parts.font_factory.load(&name, None),
        Size::At(size) => parts.font_factory.load(&name, Some(size)),
        Size::Scaled(n) => parts.font_factory.load(&name, None).and_then(|font| {
            if n == 1000 {
                return Ok(font);
            }
            match font.design_size().xn_over_d(n, 1000) {
                Ok((size, _)) => parts.font_factory.load(&name, Some(size)),
                Err(_) => Err(font::LoadError::InvalidSize(name.clone(), font.design_size())),
            }
        }),
    };
    let id = match loaded {
        Ok(font) => {
            let id = parts.fonts.insert(font);
            log::debug!("loaded font `{name}` ({size:?}) as {id:?}");
            id
        }
        Err(err) => {
            input.vm().error(
                error::SimpleTokenError::new(input.vm(), font_token, err.to_string())
                    .with_category(error::Category::Resource)
                    .with_note("the identifier is bound to \\nullfont instead"),
            )?;
            return Ok(());
        }
    };
    input
        .chain_mut()
        .set_command(target, Command::Font(id), scope);
    Ok(())
}
