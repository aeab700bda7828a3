//! The math list builder.
//!
//! The builder reads tokens after an opening math shift and turns them into a [MathList].
//! Nesting is tracked with an explicit stack of [MathMemento] frames:
//!     a frame is pushed by `{` and by `\left` and popped by the matching `}` and `\right`.
//! The bottom frame is the formula itself and is closed by `$` (or `$$`).
//! The fields of superscripts and subscripts are scanned by running
//!     a fresh builder recursively.
//!
//! TeX.2021 part 48.

use crate::noad::*;
use crate::Component;
use boxworks::node::Horizontal;
use common::Scaled;
use texweave::command::Command;
use texweave::error::{self, OperationKind};
use texweave::group::{Address, GroupKind, IntegerParameter, Scope, TokenListParameter};
use texweave::parse::{MuDimen, MuGlue};
use texweave::prelude as txl;
use texweave::token::{Token, Value};
use texweave::traits::*;
use texweave::vm::ExecutionInput;

/// What opened a frame, and hence what closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The formula itself, closed by `$` or `$$`.
    Formula { display: bool },
    /// A brace group, closed by `}`.
    Block,
    /// A `\left` group, closed by `\right`.
    LeftRight(Delimiter),
    /// The field of a script that was given as a single command.
    ///
    /// This frame is closed as soon as the command has finished.
    Script,
}

/// Numerator of a generalized fraction whose denominator is still being built.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingFraction {
    numerator: MathList,
    thickness: Option<Scaled>,
}

/// One level of nesting in the math list builder.
#[derive(Debug)]
pub struct MathMemento {
    kind: FrameKind,
    token: Token,
    list: MathList,
    fraction: Option<PendingFraction>,
}

impl MathMemento {
    fn new(kind: FrameKind, token: Token) -> MathMemento {
        MathMemento {
            kind,
            token,
            list: vec![],
            fraction: None,
        }
    }

    /// Returns the list built in this frame, wrapping it in a fraction if `\over` was seen.
    fn finish(self) -> MathList {
        match self.fraction {
            None => self.list,
            Some(fraction) => vec![Noad::Fraction(Fraction {
                numerator: fraction.numerator,
                denominator: self.list,
                thickness: fraction.thickness,
                left: Delimiter::NULL,
                right: Delimiter::NULL,
            })],
        }
    }

    /// Like [MathMemento::finish], but keeps the frame open.
    fn finish_in_place(&mut self) {
        if let Some(fraction) = self.fraction.take() {
            let denominator = std::mem::take(&mut self.list);
            self.list.push(Noad::Fraction(Fraction {
                numerator: fraction.numerator,
                denominator,
                thickness: fraction.thickness,
                left: Delimiter::NULL,
                right: Delimiter::NULL,
            }));
        }
    }
}

/// Converts the list inside a brace group to a field.
///
/// A group containing a single ordinary atom without scripts collapses to the atom's nucleus,
///     so `{x}^2` and `x^2` build the same noads.
///
/// TeX.2021.1186.
pub fn list_to_field(mut list: MathList) -> Field {
    if list.len() == 1 {
        if let Some(Noad::Atom(atom)) = list.first() {
            if atom.class == MathClass::Ord && !atom.has_scripts() {
                if let Some(Noad::Atom(atom)) = list.pop() {
                    return atom.nucleus;
                }
            }
        }
    }
    Field::List(list)
}

#[derive(Debug)]
struct EndOfFormulaError;

impl error::EndOfInputError for EndOfFormulaError {
    fn doing(&self) -> String {
        "building a math formula".into()
    }

    fn notes(&self) -> Vec<String> {
        vec!["a math formula must be closed by a math shift character like $".into()]
    }
}

fn in_semi_simple_group<S: HasComponent<Component>>(input: &ExecutionInput<S>) -> bool {
    input.vm().chain().current().kind() == GroupKind::SemiSimple
}

/// Closes the `\begingroup` groups still open when a math group ends,
///     reporting a missing `\endgroup` for each.
///
/// TeX.2021.1064-1065.
fn close_semi_simple_groups<S: HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> txl::Result<()> {
    while in_semi_simple_group(input) {
        let mut err = error::SimpleTokenError::new(input.vm(), token, "missing \\endgroup inserted")
            .with_category(error::Category::Scope);
        if let Some(start) = input.vm().chain().current().start() {
            err = err.with_note(format!(
                "the unclosed group was opened by {}",
                input.vm().trace(start).value
            ));
        }
        input.vm().error(err)?;
        input.end_group(GroupKind::SemiSimple, token)?;
    }
    Ok(())
}

/// Reads a math formula.
///
/// The opening math shift token has already been consumed.
/// If the next token is also a math shift, the formula is a display formula.
/// Returns the math list and whether the formula is a display.
pub fn scan_formula<S: HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> txl::Result<(MathList, bool)> {
    let display = match input.unexpanded().peek()? {
        Some(next) => matches!(next.value(), Value::MathShift(_)),
        None => false,
    };
    if display {
        input.unexpanded().consume()?;
    }
    input.begin_group(GroupKind::MathShift, token);
    input
        .chain_mut()
        .set_integer(Address::Integer(IntegerParameter::Fam), -1, Scope::Local);
    let every = if display {
        TokenListParameter::EveryDisplay
    } else {
        TokenListParameter::EveryMath
    };
    push_token_list(input, Address::TokenList(every));
    log::debug!("entering {} math mode", if display { "display" } else { "inline" });
    input.state_mut().component_mut().depth += 1;
    let mut builder = Builder::new(MathMemento::new(FrameKind::Formula { display }, token));
    let result = builder.run(input);
    let component = input.state_mut().component_mut();
    component.depth -= 1;
    component.pending.clear();
    Ok((result?, display))
}

fn push_token_list<S: TexweaveState>(input: &mut ExecutionInput<S>, address: Address) {
    let tokens = input.vm().chain().token_list(address);
    input.expansions_mut().extend(tokens.iter().rev().copied());
}

struct Builder {
    stack: Vec<MathMemento>,
    every_math_end_inserted: bool,
}

impl Builder {
    fn new(bottom: MathMemento) -> Builder {
        Builder {
            stack: vec![bottom],
            every_math_end_inserted: false,
        }
    }

    fn top(&mut self) -> &mut MathMemento {
        // The bottom frame is only popped when the builder finishes.
        let i = self.stack.len() - 1;
        &mut self.stack[i]
    }

    fn push(&mut self, noad: Noad) {
        self.top().list.push(noad)
    }

    /// Runs the builder until the bottom frame is closed.
    fn run<S: HasComponent<Component>>(
        &mut self,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<MathList> {
        loop {
            let token = input.next_or_err(EndOfFormulaError)?;
            if let Some(list) = self.step(token, input)? {
                return Ok(list);
            }
        }
    }

    /// Runs the builder for a single command, and anything the command opens.
    fn run_single<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<MathList> {
        if let Some(list) = self.step(token, input)? {
            return Ok(list);
        }
        while self.stack.len() > 1 {
            let token = input.next_or_err(EndOfFormulaError)?;
            if let Some(list) = self.step(token, input)? {
                return Ok(list);
            }
        }
        Ok(self.pop_frame())
    }

    /// Handles one token.
    ///
    /// Returns the finished list when the bottom frame is closed.
    fn step<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<Option<MathList>> {
        match token.value() {
            Value::Space(_) => {}
            Value::Letter(c) | Value::Other(c) => {
                let code = input.vm().chain().integer(Address::MathCode(c));
                self.add_math_code(token, c, code as u32, input)?;
            }
            Value::MathShift(_) => return self.math_shift(token, input),
            Value::BeginGroup(_) => {
                input.begin_group(GroupKind::Math, token);
                self.stack.push(MathMemento::new(FrameKind::Block, token));
            }
            Value::EndGroup(_) => return self.end_group(token, input),
            Value::Superscript(_) => self.script(token, Script::Superscript, input)?,
            Value::Subscript(_) => self.script(token, Script::Subscript, input)?,
            Value::AlignmentTab(_) => {
                input.vm().error(error::SimpleTokenError::new(
                    input.vm(),
                    token,
                    "misplaced alignment tab character",
                ))?;
            }
            Value::Parameter(_) => {
                input.vm().error(error::SimpleTokenError::new(
                    input.vm(),
                    token,
                    "you can't use a macro parameter character in math mode",
                ))?;
            }
            Value::CommandRef(command_ref) => {
                let command = input.vm().chain().command(&command_ref).cloned();
                match command {
                    None => {
                        return Err(error::UndefinedCommandError::new(input.vm(), token).into())
                    }
                    Some(Command::Execution(cmd, tag)) => {
                        return self.execute(token, cmd, tag, input);
                    }
                    Some(Command::Variable(cmd)) => {
                        let scope = input.assignment_scope();
                        cmd.set_value_using_input(token, input, scope)?;
                    }
                    Some(Command::Font(id)) => {
                        let scope = input.assignment_scope();
                        input.chain_mut().set_font(Address::CurrentFont, id, scope);
                    }
                    Some(Command::CharacterTokenAlias(value)) => {
                        return self.step(Token::new_from_value(value, token.trace_key()), input);
                    }
                    Some(Command::Character(c)) => {
                        let code = input.vm().chain().integer(Address::MathCode(c));
                        self.add_math_code(token, c, code as u32, input)?;
                    }
                    Some(Command::MathCharacter(code)) => {
                        self.add_math_code(token, '\0', code, input)?;
                    }
                    // Expansion commands only get here after \noexpand.
                    Some(Command::Expansion(..)) | Some(Command::Macro(_)) => {}
                }
            }
        }
        Ok(None)
    }

    /// Adds an atom for a math code.
    ///
    /// TeX.2021.1151 and TeX.2021.1155.
    fn add_math_code<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        c: char,
        code: u32,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<()> {
        if code == 0x8000 {
            input.back(Token::new_active_character(c, token.trace_key()));
            return Ok(());
        }
        let noad = Noad::Atom(Atom::new(
            MathClass::from_math_code(code),
            Field::Char(math_char(code, input)),
        ));
        self.push(noad);
        Ok(())
    }

    fn math_shift<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<Option<MathList>> {
        close_semi_simple_groups(token, input)?;
        match self.top().kind {
            FrameKind::Formula { display } => {
                if !self.every_math_end_inserted {
                    self.every_math_end_inserted = true;
                    let tokens = input
                        .vm()
                        .chain()
                        .token_list(Address::TokenList(TokenListParameter::EveryMathEnd));
                    if !tokens.is_empty() {
                        input.back(token);
                        push_token_list(
                            input,
                            Address::TokenList(TokenListParameter::EveryMathEnd),
                        );
                        return Ok(None);
                    }
                }
                if display {
                    let closed = match input.unexpanded().peek()? {
                        Some(next) => matches!(next.value(), Value::MathShift(_)),
                        None => false,
                    };
                    if closed {
                        input.unexpanded().consume()?;
                    } else {
                        input.vm().error(
                            error::SimpleTokenError::new(
                                input.vm(),
                                token,
                                "display math should end with $$",
                            )
                            .with_category(error::Category::Scope),
                        )?;
                    }
                }
                let list = self.pop_frame();
                input.end_group(GroupKind::MathShift, token)?;
                Ok(Some(list))
            }
            FrameKind::Block => {
                self.missing_close(token, "missing } inserted", input)?;
                input.back(token);
                self.close_block(token, input)
            }
            FrameKind::LeftRight(_) => {
                self.missing_close(token, "missing \\right. inserted", input)?;
                input.back(token);
                self.close_left_right(token, Delimiter::NULL, input)?;
                Ok(None)
            }
            FrameKind::Script => {
                input.back(token);
                Ok(Some(self.pop_frame()))
            }
        }
    }

    fn end_group<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<Option<MathList>> {
        match self.top().kind {
            FrameKind::Block if in_semi_simple_group(input) => {
                // The brace is dropped and the math group stays open.
                input.end_group(GroupKind::Math, token)?;
                Ok(None)
            }
            FrameKind::Block => self.close_block(token, input),
            FrameKind::Formula { .. } | FrameKind::LeftRight(_) => {
                // The group kinds differ, so this reports the mismatch and ignores the token.
                input.end_group(GroupKind::Simple, token)?;
                Ok(None)
            }
            FrameKind::Script => {
                input.back(token);
                Ok(Some(self.pop_frame()))
            }
        }
    }

    /// Reports a missing closing token which is then inserted before `token`.
    fn missing_close<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        title: &str,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<()> {
        let start = self.top().token;
        input.vm().error(
            error::SimpleTokenError::new(input.vm(), token, title)
                .with_category(error::Category::Scope)
                .with_note(format!(
                    "the unclosed group was opened by {}",
                    input.vm().trace(start).value
                )),
        )
    }

    fn pop_frame(&mut self) -> MathList {
        self.stack
            .pop()
            .map(MathMemento::finish)
            .unwrap_or_default()
    }

    fn close_block<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<Option<MathList>> {
        let list = self.pop_frame();
        input.end_group(GroupKind::Math, token)?;
        if self.stack.is_empty() {
            return Ok(Some(list));
        }
        self.push(Noad::Atom(Atom::new(MathClass::Ord, list_to_field(list))));
        Ok(None)
    }

    fn close_left_right<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        right: Delimiter,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<()> {
        let Some(frame) = self.stack.pop() else {
            return Ok(());
        };
        let left = match frame.kind {
            FrameKind::LeftRight(left) => left,
            _ => Delimiter::NULL,
        };
        let mut list = vec![Noad::Left(left)];
        list.extend(frame.finish());
        list.push(Noad::Right(right));
        close_semi_simple_groups(token, input)?;
        input.end_group(GroupKind::MathLeft, token)?;
        self.push(Noad::Atom(Atom::new(MathClass::Inner, Field::List(list))));
        Ok(())
    }

    /// Attaches a superscript or subscript to the last atom.
    ///
    /// If the list does not end in an atom, or the atom already has this script,
    ///     a new empty ordinary atom is created.
    ///
    /// TeX.2021.1176.
    fn script<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        script: Script,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<()> {
        let needs_new_atom = match self.top().list.last() {
            Some(Noad::Atom(atom)) => {
                if atom.script(script).is_empty() {
                    false
                } else {
                    input.vm().error(
                        error::SimpleTokenError::new(
                            input.vm(),
                            token,
                            format!("double {}", script.name()),
                        )
                        .with_category(error::Category::Scope)
                        .with_note(format!(
                            "an atom can only have one {}; use braces to group them",
                            script.name()
                        )),
                    )?;
                    true
                }
            }
            _ => true,
        };
        if needs_new_atom {
            self.push(Noad::Atom(Atom::new(MathClass::Ord, Field::Empty)));
        }
        let field = scan_field(input)?;
        let rejected = match self.top().list.last_mut().and_then(Noad::as_atom_mut) {
            Some(atom) => atom.set_script(script, field).err(),
            None => Some(field),
        };
        if let Some(field) = rejected {
            let mut atom = Atom::new(MathClass::Ord, Field::Empty);
            match script {
                Script::Superscript => atom.superscript = field,
                Script::Subscript => atom.subscript = field,
            }
            self.push(Noad::Atom(atom));
        }
        Ok(())
    }

    fn execute<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        cmd: texweave::command::ExecutionFn<S>,
        tag: Option<texweave::command::Tag>,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<Option<MathList>> {
        let Some(tag) = tag else {
            self.execute_other(token, cmd, input)?;
            return Ok(None);
        };
        if tag == crate::LEFT_TAG.get() {
            let delimiter = scan_delimiter(token, input)?;
            input.begin_group(GroupKind::MathLeft, token);
            self.stack
                .push(MathMemento::new(FrameKind::LeftRight(delimiter), token));
        } else if tag == crate::RIGHT_TAG.get() {
            match self.top().kind {
                FrameKind::LeftRight(_) => {
                    let delimiter = scan_delimiter(token, input)?;
                    self.close_left_right(token, delimiter, input)?;
                }
                FrameKind::Formula { .. } => {
                    scan_delimiter(token, input)?;
                    input.vm().error(
                        error::SimpleTokenError::new(input.vm(), token, "extra \\right")
                            .with_category(error::Category::Scope)
                            .with_note("there is no matching \\left; the delimiter is ignored"),
                    )?;
                }
                FrameKind::Block => {
                    self.missing_close(token, "missing } inserted", input)?;
                    input.back(token);
                    return self.close_block(token, input);
                }
                FrameKind::Script => {
                    input.back(token);
                    return Ok(Some(self.pop_frame()));
                }
            }
        } else if tag == crate::MIDDLE_TAG.get() {
            let delimiter = scan_delimiter(token, input)?;
            match self.top().kind {
                FrameKind::LeftRight(_) => {
                    self.top().finish_in_place();
                    self.push(Noad::Middle(delimiter));
                }
                _ => {
                    input.vm().error(
                        error::SimpleTokenError::new(input.vm(), token, "extra \\middle")
                            .with_category(error::Category::Scope)
                            .with_note("\\middle may only appear between \\left and \\right"),
                    )?;
                }
            }
        } else if tag == crate::OVER_TAG.get() {
            self.fraction(token, Some(None), input)?;
        } else if tag == crate::ATOP_TAG.get() {
            self.fraction(token, Some(Some(Scaled::ZERO)), input)?;
        } else if tag == crate::ABOVE_TAG.get() {
            self.fraction(token, None, input)?;
        } else if tag == crate::MKERN_TAG.get() {
            let MuDimen(width) = MuDimen::parse(input)?;
            self.push(Noad::MuKern(width));
        } else if tag == crate::MSKIP_TAG.get() {
            let MuGlue(glue) = MuGlue::parse(input)?;
            self.push(Noad::MuGlue(glue));
        } else {
            self.execute_other(token, cmd, input)?;
        }
        Ok(None)
    }

    /// Runs a command that is not specific to math mode.
    ///
    /// Nodes the command appends, like the kern from `\kern`, are added to the current list.
    fn execute_other<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        cmd: texweave::command::ExecutionFn<S>,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<()> {
        if let Err(err) = cmd(token, input) {
            return Err(error::Error::new_propagated(
                input.vm(),
                OperationKind::Execution,
                token,
                err,
            ));
        }
        let pending: Vec<Horizontal> =
            std::mem::take(&mut input.state_mut().component_mut().pending);
        for node in pending {
            self.push(Noad::Node(node));
        }
        Ok(())
    }

    /// Starts a generalized fraction.
    ///
    /// The thickness is [None] for `\above`, in which case it is read from the input.
    ///
    /// TeX.2021.1181.
    fn fraction<S: HasComponent<Component>>(
        &mut self,
        token: Token,
        thickness: Option<Option<Scaled>>,
        input: &mut ExecutionInput<S>,
    ) -> txl::Result<()> {
        let thickness = match thickness {
            Some(thickness) => thickness,
            None => Some(Scaled::parse(input)?),
        };
        if self.top().fraction.is_some() {
            return input.vm().error(
                error::SimpleTokenError::new(
                    input.vm(),
                    token,
                    "ambiguous; you need another { and }",
                )
                .with_category(error::Category::Scope)
                .with_note("a list can contain at most one fraction; the second is ignored"),
            );
        }
        let numerator = std::mem::take(&mut self.top().list);
        self.top().fraction = Some(PendingFraction {
            numerator,
            thickness,
        });
        Ok(())
    }
}

/// Returns the family and character for a math code.
///
/// Codes of class 7 use the family in `\fam`, if it is a valid family.
fn math_char<S: TexweaveState>(code: u32, input: &ExecutionInput<S>) -> MathChar {
    let mut family = ((code >> 8) & 0xF) as u8;
    if (code >> 12) & 7 == 7 {
        let fam = input
            .vm()
            .chain()
            .integer(Address::Integer(IntegerParameter::Fam));
        if (0..16).contains(&fam) {
            family = fam as u8;
        }
    }
    MathChar {
        family,
        char: char::from_u32(code & 0xFF).unwrap_or('\0'),
    }
}

/// Scans the field of a superscript or subscript.
///
/// The field is a single character, a brace group,
///     or the output of a single command like `\mkern`.
///
/// TeX.2021.1151.
fn scan_field<S: HasComponent<Component>>(input: &mut ExecutionInput<S>) -> txl::Result<Field> {
    loop {
        let token = input.next_or_err(EndOfFormulaError)?;
        let value = match token.value() {
            Value::CommandRef(command_ref) => {
                match input.vm().chain().command(&command_ref) {
                    Some(Command::CharacterTokenAlias(value)) => *value,
                    Some(Command::Character(c)) => {
                        let c = *c;
                        let code = input.vm().chain().integer(Address::MathCode(c));
                        return Ok(Field::Char(math_char(code as u32, input)));
                    }
                    Some(Command::MathCharacter(code)) => {
                        let code = *code;
                        return Ok(Field::Char(math_char(code, input)));
                    }
                    _ => {
                        let mut builder =
                            Builder::new(MathMemento::new(FrameKind::Script, token));
                        let list = builder.run_single(token, input)?;
                        return Ok(list_to_field(list));
                    }
                }
            }
            value => value,
        };
        match value {
            Value::Space(_) => continue,
            Value::Letter(c) | Value::Other(c) => {
                let code = input.vm().chain().integer(Address::MathCode(c)) as u32;
                if code == 0x8000 {
                    input.back(Token::new_active_character(c, token.trace_key()));
                    continue;
                }
                return Ok(Field::Char(math_char(code, input)));
            }
            Value::BeginGroup(_) => {
                input.begin_group(GroupKind::Math, token);
                let mut builder = Builder::new(MathMemento::new(FrameKind::Block, token));
                let list = builder.run(input)?;
                return Ok(list_to_field(list));
            }
            _ => {
                input.vm().error(
                    error::SimpleTokenError::new(input.vm(), token, "missing { inserted")
                        .with_note("a superscript or subscript must be followed by a character or a group"),
                )?;
                input.back(token);
                return Ok(Field::Empty);
            }
        }
    }
}

#[derive(Debug)]
struct EndOfDelimiterError;

impl error::EndOfInputError for EndOfDelimiterError {
    fn doing(&self) -> String {
        "scanning a delimiter".into()
    }
}

/// Scans a delimiter using the `\delcode` of the next non-blank character.
///
/// TeX.2021.1160.
pub fn scan_delimiter<S: HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> txl::Result<Delimiter> {
    loop {
        let next = input.next_or_err(EndOfDelimiterError)?;
        let value = match next.value() {
            Value::CommandRef(command_ref) => match input.vm().chain().command(&command_ref) {
                Some(Command::CharacterTokenAlias(value)) => *value,
                _ => next.value(),
            },
            value => value,
        };
        let code = match value {
            Value::Space(_) => continue,
            Value::Letter(c) | Value::Other(c) => input.vm().chain().integer(Address::DelCode(c)),
            _ => -1,
        };
        if code < 0 {
            input.back(next);
            input.vm().error(
                error::SimpleTokenError::new(input.vm(), token, "missing delimiter (. inserted)")
                    .with_note(
                        "a delimiter must be a character with a non-negative \\delcode, like ( or .",
                    ),
            )?;
            return Ok(Delimiter::NULL);
        }
        return Ok(Delimiter::from_code(code as u32));
    }
}
