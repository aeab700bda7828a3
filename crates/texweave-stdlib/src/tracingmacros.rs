//! Macro tracing
//!
//! When `\tracingmacros` is positive every macro expansion is written to the log file,
//!     together with the arguments, the replacement text and the result.

use colored::*;
use std::io::Write;
use texweave::group::{Address, IntegerParameter};
use texweave::texmacro;
use texweave::token::{write_tokens, Token};
use texweave::traits::*;
use texweave::vm;

/// Hook that writes the macro expansion trace.
///
/// States call this from [TexweaveState::post_macro_expansion_hook].
pub fn hook<S: TexweaveState>(
    token: Token,
    input: &vm::ExpansionInput<S>,
    tex_macro: &texmacro::Macro,
    arguments: &[&[Token]],
    reversed_expansion: &[Token],
) {
    let vm = input.vm();
    if vm
        .chain()
        .integer(Address::Integer(IntegerParameter::TracingMacros))
        <= 0
    {
        return;
    }
    let interner = vm.cs_name_interner();
    let trace = vm.trace(token);
    let mut s = format!(
        "{}{}\n{}:{}: {}\n",
        "Macro expansion trace of ".bold(),
        trace.value.bold(),
        trace.origin,
        trace.line_number,
        trace.line_content.trim_end(),
    );
    s.push_str("                        ┌──\n");
    s.push_str("              arguments ");
    if arguments.is_empty() {
        s.push_str("│ (none)\n                        ");
    }
    for (i, argument) in arguments.iter().enumerate() {
        s.push_str(&format!(
            "│ {}{}={}\n                        ",
            "#".bright_yellow(),
            (i + 1).to_string().bright_yellow(),
            write_tokens(*argument, interner).bright_yellow()
        ));
    }
    s.push_str("├──\n replacement definition │ ");
    for replacement in tex_macro.replacements() {
        match replacement {
            texmacro::Replacement::Tokens(tokens) => {
                s.push_str(&write_tokens(tokens.iter().rev(), interner))
            }
            texmacro::Replacement::Parameter(i) => s.push_str(&format!(
                "{}{}",
                "#".bright_yellow(),
                (i + 1).to_string().bright_yellow()
            )),
        }
    }
    s.push_str(&format!(
        "\n                        ├──\n              expansion │ {}\n                        └──\n",
        write_tokens(reversed_expansion.iter().rev(), interner)
    ));
    // The trace is diagnostic output; a failing log writer must not stop the job.
    if let Err(err) = vm.log_file.borrow_mut().write_all(s.as_bytes()) {
        log::warn!("failed to write the macro trace to the log file: {err}");
    }
}
