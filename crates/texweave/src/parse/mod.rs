//! Parsers for the elements of the TeX grammar.
//!
//! Each element is a Rust type implementing [Parsable]:
//!     `i32` for `<number>`, [common::Scaled] for `<dimen>`, [common::Glue] for `<glue>`.
//! Tuples of parsable types are parsable, so `\advance` can read
//!     `<variable><optional by><number>` with a single call.

#[macro_use]
mod helpers;

mod dimen;
mod glue;
mod keyword;
mod number;
#[cfg(test)]
mod testing;
mod variable;

pub use dimen::FilDimen;
pub use dimen::MuDimen;
pub use glue::MuGlue;
pub use keyword::parse_keyword;
pub use keyword::OptionalBy;
pub use keyword::To;
pub use number::Uint;
pub use variable::OptionalEquals;
pub use variable::OptionalEqualsUnexpanded;
pub use variable::TokenListValue;

pub(crate) use number::parse_optional_signs;

use crate::error;
use crate::prelude as txl;
use crate::token;
use crate::token::trace;
use crate::traits::*;
use crate::vm;

/// An element of the TeX grammar that can be read from expanded input.
pub trait Parsable<S: TexweaveState>: Sized {
    /// Reads the element from any of the expanded input types.
    #[inline]
    fn parse<I>(input: &mut I) -> txl::Result<Self>
    where
        I: AsMut<vm::ExpandedStream<S>>,
    {
        Parsable::parse_impl(input.as_mut())
    }

    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self>;
}

/// The input did not contain the grammar element that was expected.
///
/// The title has the form `expected <expected>, instead <found>`.
#[derive(Debug)]
pub struct Error {
    pub expected: String,
    pub got: trace::SourceCodeTrace,
    found: Option<String>,
    annotation: Option<String>,
    notes: Vec<String>,
}

impl Error {
    /// The `guidance` becomes the first note, unless it is empty.
    pub fn new<S, T: Into<String>, R: Into<String>>(
        vm: &vm::VM<S>,
        expected: T,
        got: Option<token::Token>,
        guidance: R,
    ) -> Self {
        let guidance = guidance.into();
        Error {
            expected: expected.into(),
            got: got.map_or_else(|| vm.trace_end_of_input(), |token| vm.trace(token)),
            found: None,
            annotation: None,
            notes: if guidance.is_empty() {
                vec![]
            } else {
                vec![guidance]
            },
        }
    }

    /// Replaces the description of what was found, for example `got the integer 300`.
    pub fn with_got_override<T: Into<String>>(mut self, found: T) -> Self {
        self.found = Some(found.into());
        self
    }

    pub fn with_annotation_override<T: Into<String>>(mut self, annotation: T) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_note<T: Into<String>>(mut self, note: T) -> Self {
        self.notes.push(note.into());
        self
    }

    fn describe_found(&self) -> String {
        let Some(token) = self.got.token else {
            return "the input ended".into();
        };
        match (token.value(), token.cat_code()) {
            (token::Value::Letter(c), _) => format!("found the letter {c}"),
            (token::Value::Other(c), _) => format!("found a non-letter character {c}"),
            (_, Some(code)) => format!(
                "found a token with value {} and category code {code}",
                token.char().unwrap_or(' ')
            ),
            (_, None) => format!("found the control sequence {}", self.got.value),
        }
    }
}

impl error::TexError for Error {
    fn kind(&self) -> error::Kind {
        if self.got.token.is_some() {
            error::Kind::Token(&self.got)
        } else {
            error::Kind::EndOfInput(&self.got)
        }
    }

    fn title(&self) -> String {
        let found = self.found.clone().unwrap_or_else(|| self.describe_found());
        format!("expected {}, instead {found}", self.expected)
    }

    fn notes(&self) -> Vec<error::display::Note> {
        self.notes.iter().map(|note| note.into()).collect()
    }

    fn source_annotation(&self) -> String {
        match &self.annotation {
            Some(annotation) => annotation.clone(),
            None => error::TexError::default_source_annotation(self),
        }
    }
}

macro_rules! generate_tuple_impls {
    ( $first: ident ) => {};
    ( $first: ident, $( $name: ident ),+ ) => {
        generate_tuple_impls![ $( $name ),+];

        impl<S: TexweaveState, $first : Parsable<S>, $( $name : Parsable<S> ),+> Parsable<S> for ($first, $( $name ),+) {
            fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
                Ok(($first::parse(input)?, $( $name::parse(input)? ),+))
            }
        }
    };
}

generate_tuple_impls![T1, T2, T3, T4, T5];

impl<S: TexweaveState> Parsable<S> for token::CommandRef {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let stream = input.unexpanded();
        let token = loop {
            match stream.next()? {
                Some(token) if matches!(token.value(), token::Value::Space(_)) => continue,
                token => break token,
            }
        };
        if let Some(token::Value::CommandRef(command_ref)) = token.map(|t| t.value()) {
            return Ok(command_ref);
        }
        Err(Error::new(
            stream.vm(),
            "a control sequence or active character",
            token,
            "a command must be a control sequence or an active character",
        )
        .into())
    }
}

/// Skips one space token, if the next token is a space.
pub struct OptionalSpace;

impl<S: TexweaveState> Parsable<S> for OptionalSpace {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        let next = input.peek()?.map(|token| token.value());
        if matches!(next, Some(token::Value::Space(_))) {
            input.consume()?;
        }
        Ok(OptionalSpace)
    }
}

/// Reads tokens up to the `}` matching an already consumed `{`.
///
/// The final `}` is consumed and dropped.
/// Returns false if the input ends first.
pub fn parse_balanced_tokens<S: vm::TokenStream>(
    stream: &mut S,
    result: &mut Vec<token::Token>,
) -> txl::Result<bool> {
    let mut depth = 0_usize;
    while let Some(token) = stream.next()? {
        match token.value() {
            token::Value::BeginGroup(_) => depth += 1,
            token::Value::EndGroup(_) if depth == 0 => return Ok(true),
            token::Value::EndGroup(_) => depth -= 1,
            _ => {}
        }
        result.push(token);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::testing::*;

    parse_success_tests![
        (tuple_of_integers, "1 2 3", (1_i32, 2_i32, 3_i32)),
        (
            integer_and_dimen,
            "4 by 2pt",
            (4_i32, OptionalBy, common::Scaled::TWO)
        ),
    ];

    #[test]
    fn balanced_tokens() {
        let mut vm = vm::VM::<()>::new(Default::default());
        vm.set_plain_tex_cat_codes();
        vm.push_source("", "a{b}c}d");
        let input = vm::ExecutionInput::new(&mut vm);
        let mut result = vec![];
        assert!(parse_balanced_tokens(input.unexpanded(), &mut result).unwrap());
        let s = token::write_tokens(result.iter(), input.vm().cs_name_interner());
        assert_eq!(s, "a{b}c");
    }

    #[test]
    fn unbalanced_tokens() {
        let mut vm = vm::VM::<()>::new(Default::default());
        vm.set_plain_tex_cat_codes();
        vm.push_source("", "a{b");
        let input = vm::ExecutionInput::new(&mut vm);
        let mut result = vec![];
        assert!(!parse_balanced_tokens(input.unexpanded(), &mut result).unwrap());
    }
}
