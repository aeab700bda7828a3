//! Errors.
//!
//! An error records the source location of its token when it is created.
//! Each command it passes through on the way out wraps it in a [PropagatedError],
//!     so the final error carries the chain of commands that led to it.

use crate::token;
use crate::token::trace;
use crate::vm;

pub mod display;

#[derive(Debug)]
pub enum Error {
    Tex(Box<dyn TexError + 'static>),
    Propagated(PropagatedError),
    /// An error that has already been reported to the user.
    ///
    /// Processed errors are never wrapped again and never reported twice.
    Processed(Box<Error>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display::format_error(f, self)
    }
}

impl Error {
    pub fn new_propagated<S>(
        vm: &vm::VM<S>,
        context: OperationKind,
        token: token::Token,
        error: Box<Error>,
    ) -> Box<Error> {
        if error.is_processed() {
            return error;
        }
        Box::new(Error::Propagated(PropagatedError {
            context,
            token,
            trace: vm.trace(token),
            error,
        }))
    }

    /// Marks this error as reported.
    pub fn mark_processed(self: Box<Self>) -> Box<Error> {
        if self.is_processed() {
            return self;
        }
        Box::new(Error::Processed(self))
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Error::Processed(_))
    }

    /// Returns the propagation stack, outermost first, and the root error.
    pub fn stack_view(&self) -> (Vec<&PropagatedError>, &dyn TexError) {
        let mut stack = vec![];
        let mut current = self;
        let root = loop {
            current = match current {
                Error::Tex(root) => break root.as_ref(),
                Error::Propagated(propagated) => {
                    stack.push(propagated);
                    propagated.error.as_ref()
                }
                Error::Processed(inner) => inner.as_ref(),
            };
        };
        (stack, root)
    }

    /// Category of the root error.
    pub fn category(&self) -> Category {
        self.stack_view().1.category()
    }

    /// Title of the root error.
    pub fn title(&self) -> String {
        self.stack_view().1.title()
    }
}

impl<T: TexError + 'static> From<T> for Box<Error> {
    fn from(err: T) -> Self {
        Box::new(Error::Tex(Box::new(err)))
    }
}

#[derive(Debug)]
pub struct PropagatedError {
    pub context: OperationKind,
    pub token: token::Token,
    pub trace: trace::SourceCodeTrace,
    pub error: Box<Error>,
}

/// Where an error happened.
#[derive(Debug)]
pub enum Kind<'a> {
    /// At a token, like a letter where a number was expected.
    Token(&'a trace::SourceCodeTrace),
    /// At the end of the input.
    EndOfInput(&'a trace::SourceCodeTrace),
    /// Nowhere in the input, like a font file that does not exist.
    FailedPrecondition,
}

/// Broad class of an error.
///
/// The category does not change how the error is reported,
///     but callers use it to decide on recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Malformed input: bad units, unmatched braces, macro use not matching its definition.
    Syntax,
    /// Misuse of groups and math structures, like closing the outermost group.
    Scope,
    /// Overflow or division by zero in register arithmetic.
    Arithmetic,
    /// A missing font, font dimension or configuration resource.
    Resource,
}

/// A root error.
pub trait TexError: std::fmt::Debug {
    fn kind(&self) -> Kind;

    fn title(&self) -> String;

    fn category(&self) -> Category {
        Category::Syntax
    }

    fn notes(&self) -> Vec<display::Note> {
        vec![]
    }

    fn source_annotation(&self) -> String {
        TexError::default_source_annotation(self)
    }

    fn default_source_annotation(&self) -> String {
        match TexError::kind(self) {
            Kind::Token(s) => match s.token.map(|t| (t.char(), t.cat_code())) {
                Some((Some(c), Some(code))) => {
                    format!["character token with value {c} and category code {code}",]
                }
                _ => "control sequence".to_string(),
            },
            Kind::EndOfInput(_) => "input ended here".into(),
            Kind::FailedPrecondition => {
                "failed precondition error while running this command".into()
            }
        }
    }
}

/// What was being read when the input ended; see [crate::vm::TokenStream::next_or_err].
pub trait EndOfInputError: std::fmt::Debug + 'static {
    fn doing(&self) -> String;
    fn notes(&self) -> Vec<String> {
        vec![]
    }
}

#[derive(Debug)]
pub(crate) struct EofError {
    trace: trace::SourceCodeTrace,
    doing: String,
    notes: Vec<String>,
}

impl EofError {
    pub(crate) fn new<S, E: EndOfInputError>(vm: &vm::VM<S>, err: E) -> Self {
        Self {
            trace: vm.trace_end_of_input(),
            doing: err.doing(),
            notes: err.notes(),
        }
    }
}

impl TexError for EofError {
    fn kind(&self) -> Kind {
        Kind::EndOfInput(&self.trace)
    }

    fn title(&self) -> String {
        format!("unexpected end of input while {}", self.doing)
    }

    fn notes(&self) -> Vec<display::Note> {
        self.notes.iter().map(|n| n.into()).collect()
    }
}

/// What the engine was doing with a token when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Expansion,
    Execution,
    VariableAssignment,
    MathMode,
}

impl OperationKind {
    pub fn action(&self) -> &'static str {
        match self {
            OperationKind::Expansion => "expanding this command",
            OperationKind::Execution => "executing this command",
            OperationKind::VariableAssignment => {
                "determining the value to assign to this variable"
            }
            OperationKind::MathMode => "building this math formula",
        }
    }
}

/// Title, category and notes shared by the simple error types.
#[derive(Debug)]
struct Message {
    title: String,
    category: Category,
    notes: Vec<String>,
}

impl Message {
    fn new(title: &str, category: Category) -> Self {
        Message {
            title: title.into(),
            category,
            notes: vec![],
        }
    }
}

macro_rules! simple_error {
    ( $type: ident, $kind: ident $( ( $trace: ident ) )? ) => {
        impl $type {
            pub fn with_note<T: Into<String>>(mut self, note: T) -> Self {
                self.message.notes.push(note.into());
                self
            }

            pub fn with_category(mut self, category: Category) -> Self {
                self.message.category = category;
                self
            }
        }

        impl TexError for $type {
            fn kind(&self) -> Kind {
                Kind::$kind $( (&self.$trace) )?
            }

            fn title(&self) -> String {
                self.message.title.clone()
            }

            fn category(&self) -> Category {
                self.message.category
            }

            fn notes(&self) -> Vec<display::Note> {
                self.message.notes.iter().map(|note| note.into()).collect()
            }
        }
    };
}

/// An error at a token. The category defaults to [Category::Syntax].
#[derive(Debug)]
pub struct SimpleTokenError {
    pub token: token::Token,
    pub trace: trace::SourceCodeTrace,
    message: Message,
}

impl SimpleTokenError {
    pub fn new<S, T: AsRef<str>>(vm: &vm::VM<S>, token: token::Token, title: T) -> Self {
        SimpleTokenError {
            token,
            trace: vm.trace(token),
            message: Message::new(title.as_ref(), Category::Syntax),
        }
    }
}

simple_error!(SimpleTokenError, Token(trace));

/// The input ended early. The category defaults to [Category::Syntax].
#[derive(Debug)]
pub struct SimpleEndOfInputError {
    pub trace: trace::SourceCodeTrace,
    message: Message,
}

impl SimpleEndOfInputError {
    pub fn new<S, T: AsRef<str>>(vm: &vm::VM<S>, title: T) -> Self {
        SimpleEndOfInputError {
            trace: vm.trace_end_of_input(),
            message: Message::new(title.as_ref(), Category::Syntax),
        }
    }
}

simple_error!(SimpleEndOfInputError, EndOfInput(trace));

/// An error not tied to the input, like a missing font.
/// The category defaults to [Category::Resource].
#[derive(Debug)]
pub struct SimpleFailedPreconditionError {
    message: Message,
}

impl SimpleFailedPreconditionError {
    pub fn new<T: AsRef<str>>(title: T) -> Self {
        SimpleFailedPreconditionError {
            message: Message::new(title.as_ref(), Category::Resource),
        }
    }
}

simple_error!(SimpleFailedPreconditionError, FailedPrecondition);

/// Error returned when a control sequence or active character is not defined.
#[derive(Debug)]
pub struct UndefinedCommandError {
    pub trace: trace::SourceCodeTrace,
    pub close_names: Vec<String>,
}

impl UndefinedCommandError {
    pub fn new<S>(vm: &vm::VM<S>, token: token::Token) -> UndefinedCommandError {
        let trace = vm.trace(token);
        let name = trace.value.trim_start_matches('\\');
        let close_names = find_close_names(vm.command_names(), name);
        UndefinedCommandError { trace, close_names }
    }
}

impl TexError for UndefinedCommandError {
    fn kind(&self) -> Kind {
        Kind::Token(&self.trace)
    }

    fn title(&self) -> String {
        format!["undefined control sequence {}", &self.trace.value]
    }

    fn notes(&self) -> Vec<display::Note> {
        use colored::Colorize;
        match self.close_names.first() {
            None => vec![],
            Some(close_name) => vec![format!["did you mean \\{}?", close_name.bold()].into()],
        }
    }
}

/// Returns the names within edit distance 2 of the target, closest first.
fn find_close_names(names: Vec<String>, target: &str) -> Vec<String> {
    let mut scored: Vec<(usize, String)> = names
        .into_iter()
        .map(|name| (edit_distance(&name, target), name))
        .filter(|(d, _)| *d <= 2)
        .collect();
    scored.sort();
    scored.into_iter().map(|(_, name)| name).collect()
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(row[j + 1] + 1);
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_distances() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("def", "def"), 0);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn close_names_sorted_by_distance() {
        let names = vec!["count".to_string(), "countdef".to_string(), "cont".to_string()];
        assert_eq!(
            find_close_names(names, "coun"),
            vec!["count".to_string(), "cont".to_string()]
        );
    }

    #[test]
    fn processed_errors_are_not_wrapped() {
        let err: Box<Error> = SimpleFailedPreconditionError::new("font not found").into();
        assert_eq!(err.category(), Category::Resource);
        let err = err.mark_processed();
        assert!(err.is_processed());
        assert_eq!(err.title(), "font not found");
        let err = err.mark_processed();
        assert!(matches!(*err, Error::Processed(ref inner) if !inner.is_processed()));
    }
}
