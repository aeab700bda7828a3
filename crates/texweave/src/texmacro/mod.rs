//! User defined macros.
//!
//! A macro has a parameter text and a replacement text.
//! The parameter text is a prefix of literal tokens followed by up to nine parameters;
//!     each parameter is either undelimited or delimited by the literal tokens that follow it.
//! When the macro is expanded the parameter text is matched against the input,
//!     the arguments are substituted into the replacement text,
//!     and the result is pushed onto the front of the input so that it is read
//!     before anything that followed the macro invocation.

use crate::error;
use crate::prelude as txl;
use crate::token::{self, CommandRef, Token, Value};
use crate::traits::*;
use crate::vm;

mod matcher;

pub use matcher::Matcher;

/// A TeX macro.
#[derive(Debug, Clone)]
pub struct Macro {
    prefix: Vec<Token>,
    parameters: Vec<Parameter>,
    replacements: Vec<Replacement>,
    long: bool,
    outer: bool,
}

/// A token list or parameter in a replacement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// A list of tokens, stored in reverse order.
    Tokens(Vec<Token>),

    /// A parameter, indexed from 0.
    Parameter(usize),
}

/// How the argument for a parameter is delimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    Undelimited,
    Delimited(Matcher<Value>),
}

impl Macro {
    pub fn new(prefix: Vec<Token>, parameters: Vec<Parameter>, replacements: Vec<Replacement>) -> Macro {
        Macro {
            prefix,
            parameters,
            replacements,
            long: false,
            outer: false,
        }
    }

    /// Marks the macro as `\long`: its arguments may contain `\par`.
    pub fn with_long(mut self, long: bool) -> Macro {
        self.long = long;
        self
    }

    /// Marks the macro as `\outer`: it may not appear inside arguments or definitions.
    pub fn with_outer(mut self, outer: bool) -> Macro {
        self.outer = outer;
        self
    }

    pub fn is_long(&self) -> bool {
        self.long
    }

    pub fn is_outer(&self) -> bool {
        self.outer
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    /// Whether two macros have the same meaning, as tested by `\ifx`.
    ///
    /// The long and outer flags, the parameter texts and the replacement texts must all agree.
    pub fn compare(&self, other: &Macro) -> bool {
        self.long == other.long
            && self.outer == other.outer
            && self.prefix == other.prefix
            && self.parameters == other.parameters
            && self.replacements == other.replacements
    }

    /// Expands the macro.
    ///
    /// The arguments are read from the unexpanded input
    ///     and the result is pushed onto the front of the input.
    pub fn call<S: TexweaveState>(
        &self,
        token: Token,
        input: &mut vm::ExpansionInput<S>,
    ) -> txl::Result<()> {
        let scanner = Scanner {
            macro_token: token,
            long: self.long,
            par: input
                .vm()
                .cs_name_interner()
                .get("par")
                .map(|cs_name| Value::CommandRef(CommandRef::ControlSequence(cs_name))),
        };
        for prefix_token in &self.prefix {
            let next = scanner.read(input.unexpanded(), 0)?;
            if next.value() == prefix_token.value() {
                continue;
            }
            scanner.check_par(input.vm(), next)?;
            input.vm().error(ArgumentError {
                kind: ArgumentErrorKind::UseMismatch,
                trace: input.vm().trace(next),
                macro_name: scanner.macro_name(input.vm()),
            })?;
            return Ok(());
        }

        let mut argument_indices: Vec<(usize, usize)> = Vec::with_capacity(self.parameters.len());
        let mut argument_tokens = input.checkout_token_buffer();
        for (i, parameter) in self.parameters.iter().enumerate() {
            let start = argument_tokens.len();
            let strip_braces = match parameter {
                Parameter::Undelimited => {
                    scanner.read_undelimited(input.unexpanded(), i + 1, &mut argument_tokens)?
                }
                Parameter::Delimited(matcher) => scanner.read_delimited(
                    input.unexpanded(),
                    matcher,
                    i + 1,
                    &mut argument_tokens,
                )?,
            };
            let end = argument_tokens.len();
            argument_indices.push(if strip_braces {
                (start + 1, end - 1)
            } else {
                (start, end)
            });
        }
        let arguments: Vec<&[Token]> = argument_indices
            .iter()
            .map(|(i, j)| &argument_tokens[*i..*j])
            .collect();

        let num_tokens =
            Macro::perform_replacement(&self.replacements, &arguments, input.expansions_mut());
        let expansions = input.expansions();
        let reversed_expansion = &expansions[expansions.len() - num_tokens..];
        log::trace!(
            "expanded macro {} to {} tokens",
            scanner.macro_name(input.vm()),
            num_tokens
        );
        S::post_macro_expansion_hook(token, input, self, &arguments, reversed_expansion);

        drop(arguments);
        input.return_token_buffer(argument_tokens);
        Ok(())
    }

    fn perform_replacement(
        replacements: &[Replacement],
        arguments: &[&[Token]],
        result: &mut Vec<Token>,
    ) -> usize {
        let argument = |i: &usize| arguments.get(*i).copied().unwrap_or(&[]);
        let output_size: usize = replacements
            .iter()
            .map(|replacement| match replacement {
                Replacement::Tokens(tokens) => tokens.len(),
                Replacement::Parameter(i) => argument(i).len(),
            })
            .sum();
        result.reserve(output_size);
        for replacement in replacements.iter().rev() {
            match replacement {
                Replacement::Tokens(tokens) => {
                    result.extend(tokens);
                }
                Replacement::Parameter(i) => {
                    result.extend(argument(i).iter().rev().copied());
                }
            }
        }
        output_size
    }

    /// Returns the macro's meaning in the format of `\meaning`, e.g. `macro:#1,->[#1]`.
    pub fn meaning(&self, interner: &token::CsNameInterner) -> String {
        let mut s = String::new();
        if self.long {
            s.push_str("\\long ");
        }
        if self.outer {
            s.push_str("\\outer ");
        }
        s.push_str("macro:");
        s.push_str(&token::write_tokens(&self.prefix, interner));
        for (i, parameter) in self.parameters.iter().enumerate() {
            s.push_str(&format!("#{}", i + 1));
            if let Parameter::Delimited(matcher) = parameter {
                let tokens: Vec<Token> = matcher
                    .delimiter()
                    .iter()
                    .map(|v| Token::new_from_value(*v, token::trace::Key::dummy()))
                    .collect();
                s.push_str(&token::write_tokens(&tokens, interner));
            }
        }
        s.push_str("->");
        for replacement in &self.replacements {
            match replacement {
                Replacement::Tokens(tokens) => {
                    s.push_str(&token::write_tokens(tokens.iter().rev(), interner))
                }
                Replacement::Parameter(i) => s.push_str(&format!("#{}", i + 1)),
            }
        }
        s
    }
}

/// Reads arguments for one macro invocation.
struct Scanner {
    macro_token: Token,
    long: bool,
    par: Option<Value>,
}

impl Scanner {
    fn macro_name<S>(&self, vm: &vm::VM<S>) -> String {
        vm.trace(self.macro_token).value
    }

    fn is_par(&self, token: Token) -> bool {
        Some(token.value()) == self.par
    }

    /// Fails if the token is `\par` and the macro is not long.
    fn check_par<S>(&self, vm: &vm::VM<S>, token: Token) -> txl::Result<()> {
        if !self.long && self.is_par(token) {
            return Err(ArgumentError {
                kind: ArgumentErrorKind::Runaway,
                trace: vm.trace(token),
                macro_name: self.macro_name(vm),
            }
            .into());
        }
        Ok(())
    }

    /// Reads the next token, rejecting outer macros.
    fn read<S: TexweaveState>(
        &self,
        stream: &mut vm::UnexpandedStream<S>,
        param_num: usize,
    ) -> txl::Result<Token> {
        let token = match stream.next()? {
            Some(token) => token,
            None => {
                return Err(error::EofError::new(
                    stream.vm(),
                    ArgumentEndOfInputError {
                        macro_name: self.macro_name(stream.vm()),
                        param_num,
                    },
                )
                .into())
            }
        };
        if let Value::CommandRef(command_ref) = token.value() {
            if let Some(crate::command::Command::Macro(m)) =
                stream.vm().chain().command(&command_ref)
            {
                if m.is_outer() {
                    return Err(ArgumentError {
                        kind: ArgumentErrorKind::ForbiddenControlSequence,
                        trace: stream.vm().trace(token),
                        macro_name: self.macro_name(stream.vm()),
                    }
                    .into());
                }
            }
        }
        Ok(token)
    }

    fn extra_close_brace<S>(&self, vm: &vm::VM<S>, token: Token) -> Box<error::Error> {
        ArgumentError {
            kind: ArgumentErrorKind::ExtraCloseBrace,
            trace: vm.trace(token),
            macro_name: self.macro_name(vm),
        }
        .into()
    }

    /// Reads an undelimited argument: one token, or a braced group.
    ///
    /// Returns true if the argument is a braced group whose braces must be stripped.
    fn read_undelimited<S: TexweaveState>(
        &self,
        stream: &mut vm::UnexpandedStream<S>,
        param_num: usize,
        result: &mut Vec<Token>,
    ) -> txl::Result<bool> {
        let first = loop {
            let token = self.read(stream, param_num)?;
            if !matches!(token.value(), Value::Space(_)) {
                break token;
            }
        };
        self.check_par(stream.vm(), first)?;
        match first.value() {
            Value::BeginGroup(_) => {}
            Value::EndGroup(_) => return Err(self.extra_close_brace(stream.vm(), first)),
            _ => {
                result.push(first);
                return Ok(false);
            }
        }
        result.push(first);
        let mut depth = 1_usize;
        while depth > 0 {
            let token = self.read(stream, param_num)?;
            self.check_par(stream.vm(), token)?;
            match token.value() {
                Value::BeginGroup(_) => depth += 1,
                Value::EndGroup(_) => depth -= 1,
                _ => {}
            }
            result.push(token);
        }
        Ok(true)
    }

    /// Reads a delimited argument.
    ///
    /// The delimiter is consumed but not included in the argument.
    /// Returns true if the argument is exactly one braced group, whose braces must be stripped.
    fn read_delimited<S: TexweaveState>(
        &self,
        stream: &mut vm::UnexpandedStream<S>,
        matcher: &Matcher<Value>,
        param_num: usize,
        result: &mut Vec<Token>,
    ) -> txl::Result<bool> {
        let mut search = matcher.start();
        // With a `#{` parameter the delimiter ends in a begin group token,
        //     which is matched at depth 1.
        let closing_depth = match matcher.delimiter().last() {
            Some(Value::BeginGroup(_)) => 1,
            _ => 0,
        };
        let start = result.len();
        let mut depth = 0_usize;
        loop {
            let token = self.read(stream, param_num)?;
            match token.value() {
                Value::BeginGroup(_) => depth += 1,
                Value::EndGroup(_) => {
                    if depth == 0 {
                        return Err(self.extra_close_brace(stream.vm(), token));
                    }
                    depth -= 1;
                }
                _ => {}
            }
            let matches_delimiter = search.next(&token.value());
            result.push(token);
            if depth == closing_depth && matches_delimiter {
                for _ in 0..matcher.delimiter().len() {
                    result.pop();
                }
                return Ok(is_single_group(&result[start..]));
            }
            self.check_par(stream.vm(), token)?;
        }
    }
}

/// Whether the tokens are a single braced group like `{a{b}c}`.
fn is_single_group(tokens: &[Token]) -> bool {
    if tokens.len() < 2 {
        return false;
    }
    if !matches!(tokens[0].value(), Value::BeginGroup(_)) {
        return false;
    }
    let mut depth = 0_usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == tokens.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Builds the parameters of a macro from its parameter text.
///
/// The parameter text is everything between the control sequence being defined and
///     the begin group token of the replacement text.
/// If the parameter text ends with a parameter token, as in `\def\a#1#{...}`,
///     the begin group token is both the final delimiter and the last token of the
///     replacement; in this case the begin group token is returned so that the caller can
///     append it to the replacement text.
pub fn parse_parameter_text<S>(
    vm: &vm::VM<S>,
    mut tokens: Vec<Token>,
    begin_group: Token,
) -> txl::Result<(Vec<Token>, Vec<Parameter>, Option<Token>)> {
    let mut brace_suffix = None;
    if let Some(last) = tokens.last() {
        if matches!(last.value(), Value::Parameter(_)) {
            tokens.pop();
            tokens.push(begin_group);
            brace_suffix = Some(begin_group);
        }
    }
    let mut prefix: Vec<Token> = vec![];
    let mut delimiters: Vec<Vec<Value>> = vec![];
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        if !matches!(token.value(), Value::Parameter(_)) {
            match delimiters.last_mut() {
                None => prefix.push(token),
                Some(delimiter) => delimiter.push(token.value()),
            }
            continue;
        }
        let expected = delimiters.len() + 1;
        let number = iter.next();
        let valid = match number.map(|t| t.value()) {
            Some(Value::Other(c)) => c.to_digit(10) == Some(expected as u32),
            _ => false,
        };
        if !valid || expected > 9 {
            let title = if expected > 9 {
                "a macro may have at most nine parameters".to_string()
            } else {
                format!("parameters must be numbered consecutively: expected #{expected}")
            };
            return Err(error::SimpleTokenError::new(vm, number.unwrap_or(token), title)
                .with_note("the parameter text of a macro contains #1, #2, ... in order")
                .into());
        }
        delimiters.push(vec![]);
    }
    let parameters = delimiters
        .into_iter()
        .map(|delimiter| match Matcher::new(delimiter) {
            None => Parameter::Undelimited,
            Some(matcher) => Parameter::Delimited(matcher),
        })
        .collect();
    Ok((prefix, parameters, brace_suffix))
}

/// Builds the replacement of a macro from its replacement text.
///
/// `#n` refers to parameter `n` and `##` stands for a single parameter token.
pub fn parse_replacement_text<S>(
    vm: &vm::VM<S>,
    tokens: Vec<Token>,
    num_parameters: usize,
) -> txl::Result<Vec<Replacement>> {
    let mut replacements: Vec<Replacement> = vec![];
    let mut current: Vec<Token> = vec![];
    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        if !matches!(token.value(), Value::Parameter(_)) {
            current.push(token);
            continue;
        }
        let next = iter.next();
        match next.map(|t| t.value()) {
            Some(Value::Parameter(_)) => {
                if let Some(next) = next {
                    current.push(next);
                }
            }
            Some(Value::Other(c))
                if c.to_digit(10)
                    .is_some_and(|d| d >= 1 && d as usize <= num_parameters) =>
            {
                if !current.is_empty() {
                    current.reverse();
                    replacements.push(Replacement::Tokens(std::mem::take(&mut current)));
                }
                let d = c.to_digit(10).unwrap_or(1) as usize;
                replacements.push(Replacement::Parameter(d - 1));
            }
            _ => {
                return Err(error::SimpleTokenError::new(
                    vm,
                    next.unwrap_or(token),
                    "illegal parameter number in the replacement text of a macro",
                )
                .with_note(format!(
                    "the macro has {num_parameters} parameter(s); \
                     use ## for a literal parameter token"
                ))
                .into());
            }
        }
    }
    if !current.is_empty() {
        current.reverse();
        replacements.push(Replacement::Tokens(current));
    }
    Ok(replacements)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgumentErrorKind {
    UseMismatch,
    Runaway,
    ExtraCloseBrace,
    ForbiddenControlSequence,
}

#[derive(Debug)]
struct ArgumentError {
    kind: ArgumentErrorKind,
    trace: crate::token::trace::SourceCodeTrace,
    macro_name: String,
}

impl error::TexError for ArgumentError {
    fn kind(&self) -> error::Kind {
        error::Kind::Token(&self.trace)
    }

    fn title(&self) -> String {
        match self.kind {
            ArgumentErrorKind::UseMismatch => {
                format!("use of {} doesn't match its definition", self.macro_name)
            }
            ArgumentErrorKind::Runaway => format!(
                "runaway argument: paragraph ended before {} was complete",
                self.macro_name
            ),
            ArgumentErrorKind::ExtraCloseBrace => {
                format!("argument of {} has an extra }}", self.macro_name)
            }
            ArgumentErrorKind::ForbiddenControlSequence => format!(
                "forbidden control sequence {} found while scanning use of {}",
                self.trace.value, self.macro_name
            ),
        }
    }

    fn notes(&self) -> Vec<error::display::Note> {
        match self.kind {
            ArgumentErrorKind::Runaway => {
                vec!["only macros defined with \\long may have \\par in their arguments".into()]
            }
            ArgumentErrorKind::UseMismatch => vec![
                "the tokens before the first parameter must appear verbatim after the macro".into(),
            ],
            _ => vec![],
        }
    }
}

#[derive(Debug)]
struct ArgumentEndOfInputError {
    macro_name: String,
    param_num: usize,
}

impl error::EndOfInputError for ArgumentEndOfInputError {
    fn doing(&self) -> String {
        format!("scanning use of {}", self.macro_name)
    }

    fn notes(&self) -> Vec<String> {
        if self.param_num == 0 {
            vec!["the input ended while matching the prefix of the macro".into()]
        } else {
            vec![format!("this is argument number {} for this macro", self.param_num)]
        }
    }
}
