//! Terminal rendering of errors.
//!
//! An error is printed as a heading with its category, the source line that contains
//!     the offending token with a caret underneath, the notes,
//!     and then one line for each command the error propagated through, innermost first:
//!
//! ```text
//! error[arithmetic]: arithmetic overflow
//!  --> doc.tex:4:1
//!   |
//! 4 | \divide\count1 by 0
//!   | ^^^^^^^ control sequence
//!   = note: the divisor is zero; the variable is left unchanged
//!   while expanding this command at doc.tex:7:3 \halve
//! ```

use crate::error;
use crate::token::trace::SourceCodeTrace;
use colored::*;
use std::fmt::{Formatter, Result, Write};

/// A note attached to an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note(String);

impl<T: Into<String>> From<T> for Note {
    fn from(value: T) -> Self {
        Note(value.into())
    }
}

impl std::fmt::Display for Note {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "{}", self.0)
    }
}

fn category_name(category: error::Category) -> &'static str {
    match category {
        error::Category::Syntax => "syntax",
        error::Category::Scope => "scope",
        error::Category::Arithmetic => "arithmetic",
        error::Category::Resource => "resource",
    }
}

pub fn format_error(f: &mut Formatter<'_>, err: &error::Error) -> Result {
    let (stack, root) = err.stack_view();
    writeln!(
        f,
        "{}{}: {}",
        "error".bright_red().bold(),
        format!("[{}]", category_name(root.category())).bright_red(),
        root.title().bold()
    )?;
    // Errors that are not tied to a token are located at the innermost command, if any.
    let location = match root.kind() {
        error::Kind::Token(trace) | error::Kind::EndOfInput(trace) => Some(trace),
        error::Kind::FailedPrecondition => stack.last().map(|p| &p.trace),
    };
    let gutter = location
        .map(|trace| trace.line_number.to_string().len() + 1)
        .unwrap_or(1);
    if let Some(trace) = location {
        write_snippet(f, trace, gutter, &root.source_annotation())?;
    }
    for note in root.notes() {
        let note = note.to_string();
        let mut lines = note.trim_end().lines();
        if let Some(first) = lines.next() {
            writeln!(f, "{} {} {first}", pad(gutter, "="), "note:".bold())?;
        }
        for line in lines {
            writeln!(f, "{}       {line}", " ".repeat(gutter + 1))?;
        }
    }
    for propagated in stack.iter().rev() {
        let trace = &propagated.trace;
        writeln!(
            f,
            "  {} at {}:{}:{} {}",
            format!("while {}", propagated.context.action()).yellow(),
            trace.origin,
            trace.line_number,
            trace.index + 1,
            trace.value.bold(),
        )?;
    }
    Ok(())
}

fn pad(gutter: usize, separator: &str) -> ColoredString {
    format!("{}{separator}", " ".repeat(gutter)).bright_cyan()
}

fn write_snippet(
    f: &mut Formatter<'_>,
    trace: &SourceCodeTrace,
    gutter: usize,
    annotation: &str,
) -> Result {
    writeln!(
        f,
        "{}{} {}:{}:{}",
        " ".repeat(gutter.saturating_sub(1)),
        "-->".bright_cyan(),
        trace.origin,
        trace.line_number,
        trace.index + 1
    )?;
    writeln!(f, "{}", pad(gutter, "|"))?;
    let line_number = format!("{:>width$} |", trace.line_number, width = gutter - 1);
    writeln!(
        f,
        "{} {}",
        line_number.bright_cyan(),
        emphasize(&trace.line_content, trace.index, trace.value.chars().count())
    )?;
    let mut underline = " ".repeat(trace.index);
    write!(underline, "{}", "^".repeat(trace.value.chars().count().max(1)))?;
    writeln!(
        f,
        "{} {} {}",
        pad(gutter, "|"),
        underline.bright_red().bold(),
        annotation.bright_red()
    )
}

/// Bolds the characters in `[start, start+len)`; positions count characters, not bytes.
fn emphasize(line: &str, start: usize, len: usize) -> String {
    let line = line.trim_end();
    let mut out = String::with_capacity(line.len());
    let mut run = String::new();
    for (i, c) in line.chars().enumerate() {
        if i >= start && i < start + len {
            run.push(c);
            continue;
        }
        if !run.is_empty() {
            out.push_str(&run.as_str().bold().to_string());
            run.clear();
        }
        out.push(c);
    }
    if !run.is_empty() {
        out.push_str(&run.as_str().bold().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::trace::Origin;

    fn trace() -> SourceCodeTrace {
        SourceCodeTrace {
            origin: Origin::File("doc.tex".into()),
            line_content: "a \\bad b\n".into(),
            line_number: 3,
            index: 2,
            value: "\\bad".into(),
            token: None,
        }
    }

    #[test]
    fn emphasize_counts_characters() {
        colored::control::set_override(false);
        assert_eq!(emphasize("héllo \\x", 6, 2), "héllo \\x");
        assert_eq!(emphasize("ab", 1, 5), "ab");
    }

    #[test]
    fn token_error() {
        colored::control::set_override(false);
        let err: Box<error::Error> = error::UndefinedCommandError {
            trace: trace(),
            close_names: vec![],
        }
        .into();
        let output = format!("{err}");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "error[syntax]: undefined control sequence \\bad");
        assert_eq!(lines[1], " --> doc.tex:3:3");
        assert_eq!(lines[3], "3 | a \\bad b");
        assert!(lines[4].starts_with("  |   ^^^^ "), "{output}");
    }

    #[test]
    fn failed_precondition_without_location() {
        colored::control::set_override(false);
        let err: Box<error::Error> =
            error::SimpleFailedPreconditionError::new("the font cmr99 does not exist")
                .with_note("check the font list in the configuration")
                .into();
        let output = format!("{err}");
        assert_eq!(
            output,
            "error[resource]: the font cmr99 does not exist\n \
             = note: check the font list in the configuration\n"
        );
    }
}
