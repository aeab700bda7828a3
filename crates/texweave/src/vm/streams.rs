//! Views of the VM as token streams.
//!
//! Commands never see the [VM](vm::VM) directly.
//! Expansion commands get an [ExpansionInput], which can read the input and push tokens
//!     back onto it but cannot change the group chain.
//! Execution commands get an [ExecutionInput], which can also mutate state.
//! Both wrap the VM with `#[repr(transparent)]` so that a `&mut VM` converts to either for free.
//!
//! Pushed back tokens live in a stack per input source.
//! The next token is the top of the stack; only when the stack is empty does the lexer run.

use super::TexweaveState;
use crate::group::{self, Address, GroupKind, IntegerParameter, Scope};
use crate::prelude as txl;
use crate::token::trace;
use crate::token::Token;
use crate::*;

/// A source of tokens.
///
/// Input is lexed lazily, one token at a time,
///     because commands can change category codes while the input is being read:
///     in `\catcode`\@=11 \x@` the second control sequence is `\x@`, not `\x` followed by `@`.
pub trait TokenStream {
    /// The state type of the VM.
    type S;

    /// Removes and returns the next token, or [None] if the input is exhausted.
    fn next(&mut self) -> txl::Result<Option<Token>>;

    /// Returns the next token without removing it.
    ///
    /// This takes `&mut self` because finding the next token may lex input
    ///     or, for expanded streams, run expansions.
    fn peek(&mut self) -> txl::Result<Option<&Token>>;

    /// Removes the next token; used after a [peek](TokenStream::peek).
    fn consume(&mut self) -> txl::Result<()> {
        self.next().map(|_| ())
    }

    /// Puts a token back so that it is returned next.
    fn back(&mut self, token: Token);

    fn vm(&self) -> &vm::VM<Self::S>;

    #[inline]
    fn state(&self) -> &Self::S {
        &self.vm().state
    }

    /// Returns the next token, or an end of input error built from `err`.
    fn next_or_err<E: error::EndOfInputError>(&mut self, err: E) -> txl::Result<Token> {
        match self.next()? {
            Some(token) => Ok(token),
            None => Err(error::EofError::new(self.vm(), err).into()),
        }
    }

    fn trace(&self, token: Token) -> trace::SourceCodeTrace {
        self.vm().trace(token)
    }
}

/// Stream that runs expansion commands and macros before returning tokens.
#[repr(transparent)]
pub struct ExpandedStream<S>(UnexpandedStream<S>);

/// Stream that returns tokens as they are, for example when reading the body of `\def`.
#[repr(transparent)]
pub struct UnexpandedStream<S>(vm::VM<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExpandedStream<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        self
    }
}

impl<S> ExpandedStream<S> {
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0
    }

    /// Takes an empty token vector from the pool of reusable buffers.
    ///
    /// Hand it back with [return_token_buffer](ExpandedStream::return_token_buffer) when done.
    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0 .0.internal.token_buffers.pop().unwrap_or_default()
    }

    pub fn return_token_buffer(&mut self, mut token_buffer: Vec<Token>) {
        token_buffer.clear();
        self.0 .0.internal.token_buffers.push(token_buffer)
    }

    /// The stack of pushed back tokens for the current source; the next token is last.
    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        self.0 .0.internal.expansions_mut()
    }
}

impl<S: TexweaveState> ExpandedStream<S> {
    /// Expands the next token once, without expanding the result.
    ///
    /// Returns false if the next token is not expandable.
    pub fn expand_once(&mut self) -> txl::Result<bool> {
        Ok(match expand_front(&mut self.0 .0)? {
            Front::Expanded | Front::Overridden => true,
            Front::Unexpandable | Front::Exhausted => false,
        })
    }
}

impl<S: TexweaveState> TokenStream for ExpandedStream<S> {
    type S = S;

    fn next(&mut self) -> txl::Result<Option<Token>> {
        let vm = &mut self.0 .0;
        loop {
            match expand_front(vm)? {
                Front::Expanded => continue,
                Front::Exhausted => return Ok(None),
                Front::Unexpandable | Front::Overridden => return next_unexpanded(vm),
            }
        }
    }

    fn peek(&mut self) -> txl::Result<Option<&Token>> {
        let vm = &mut self.0 .0;
        loop {
            match expand_front(vm)? {
                Front::Expanded => continue,
                Front::Exhausted => return Ok(None),
                Front::Unexpandable | Front::Overridden => return peek_unexpanded(vm),
            }
        }
    }

    #[inline]
    fn back(&mut self, token: Token) {
        self.expansions_mut().push(token)
    }

    #[inline]
    fn vm(&self) -> &vm::VM<Self::S> {
        &self.0 .0
    }
}

impl<S: TexweaveState> TokenStream for UnexpandedStream<S> {
    type S = S;

    #[inline]
    fn next(&mut self) -> txl::Result<Option<Token>> {
        next_unexpanded(&mut self.0)
    }

    #[inline]
    fn peek(&mut self) -> txl::Result<Option<&Token>> {
        peek_unexpanded(&mut self.0)
    }

    #[inline]
    fn back(&mut self, token: Token) {
        self.0.internal.expansions_mut().push(token)
    }

    #[inline]
    fn vm(&self) -> &vm::VM<S> {
        &self.0
    }
}

/// Input handed to expansion commands.
///
/// Reading through the [TokenStream] impl expands; use [unexpanded](ExpansionInput::unexpanded)
///     to read raw tokens.
/// The VM is only available immutably, so parsers written against this type
///     can be shared by expansion and execution commands.
#[repr(transparent)]
pub struct ExpansionInput<S>(ExpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExpansionInput<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }
}

impl<S: TexweaveState> TokenStream for ExpansionInput<S> {
    type S = S;

    fn next(&mut self) -> txl::Result<Option<Token>> {
        self.0.next()
    }

    fn peek(&mut self) -> txl::Result<Option<&Token>> {
        self.0.peek()
    }

    fn back(&mut self, token: Token) {
        self.0.back(token)
    }

    fn vm(&self) -> &vm::VM<Self::S> {
        self.0.vm()
    }
}

impl<S> ExpansionInput<S> {
    #[inline]
    pub fn new(vm: &mut vm::VM<S>) -> &mut ExpansionInput<S> {
        // SAFETY: ExpansionInput, ExpandedStream and UnexpandedStream are all
        // #[repr(transparent)] wrappers around the VM.
        unsafe { &mut *(vm as *mut vm::VM<S> as *mut ExpansionInput<S>) }
    }

    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0 .0
    }

    #[inline]
    pub fn expanded(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }

    /// Pushes the characters of a string onto the front of the input.
    ///
    /// Spaces become space tokens and every other character an other token,
    ///     which is what `\the` and `\meaning` produce.
    pub fn push_string_tokens(&mut self, token: Token, s: &str) {
        let trace_key = token.trace_key();
        let expansions = self.expansions_mut();
        expansions.extend(s.chars().rev().map(|c| match c {
            ' ' => Token::new_space(' ', trace_key),
            _ => Token::new_other(c, trace_key),
        }));
    }

    #[inline]
    pub fn expansions(&self) -> &Vec<Token> {
        self.0 .0 .0.internal.expansions()
    }

    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        self.0 .0 .0.internal.expansions_mut()
    }

    /// Takes an empty token vector from the pool of reusable buffers.
    ///
    /// Macro expansions can nest, so each expansion checks out its own buffer.
    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0.checkout_token_buffer()
    }

    pub fn return_token_buffer(&mut self, token_buffer: Vec<Token>) {
        self.0.return_token_buffer(token_buffer)
    }
}

/// Input handed to execution commands.
///
/// Like [ExpansionInput], but with mutable access to the state and the group chain.
#[repr(transparent)]
pub struct ExecutionInput<S>(ExpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExecutionInput<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }
}

impl<S: TexweaveState> TokenStream for ExecutionInput<S> {
    type S = S;

    fn next(&mut self) -> txl::Result<Option<Token>> {
        self.0.next()
    }

    fn peek(&mut self) -> txl::Result<Option<&Token>> {
        self.0.peek()
    }

    fn back(&mut self, token: Token) {
        self.0.back(token)
    }

    fn vm(&self) -> &vm::VM<Self::S> {
        self.0.vm()
    }
}

impl<S> ExecutionInput<S> {
    #[inline]
    pub fn new(vm: &mut vm::VM<S>) -> &mut ExecutionInput<S> {
        // SAFETY: see ExpansionInput::new.
        unsafe { &mut *(vm as *mut vm::VM<S> as *mut ExecutionInput<S>) }
    }

    #[inline]
    fn vm_mut(&mut self) -> &mut vm::VM<S> {
        &mut self.0 .0 .0
    }

    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0 .0
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.vm_mut().state
    }

    #[inline]
    pub fn chain_mut(&mut self) -> &mut group::Chain<S> {
        &mut self.vm_mut().internal.chain
    }

    /// Splits the VM into disjoint mutable borrows.
    pub fn vm_parts(&mut self) -> vm::Parts<'_, S> {
        let vm = self.vm_mut();
        vm::Parts {
            state: &mut vm.state,
            chain: &mut vm.internal.chain,
            fonts: &mut vm.fonts,
            font_factory: vm.font_factory.as_ref(),
            cs_name_interner: &mut vm.internal.cs_name_interner,
        }
    }

    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        self.0.expansions_mut()
    }

    pub fn begin_group(&mut self, kind: GroupKind, token: Token) {
        self.vm_mut().begin_group(kind, token)
    }

    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0.checkout_token_buffer()
    }

    pub fn return_token_buffer(&mut self, token_buffer: Vec<Token>) {
        self.0.return_token_buffer(token_buffer)
    }

    /// Discards all remaining input; the main loop stops after the current command.
    pub fn end_input(&mut self) {
        self.vm_mut().clear_sources()
    }
}

impl<S: TexweaveState> ExecutionInput<S> {
    /// Closes the current group, which must be of the given kind.
    ///
    /// Observers run before the `\aftergroup` tokens are put back into the input,
    ///     and the tokens come back in the order they were saved.
    pub fn end_group(&mut self, kind: GroupKind, token: Token) -> txl::Result<()> {
        self.vm_mut().end_group(kind, token)
    }

    /// Scope of the assignment being made.
    ///
    /// A positive `\globaldefs` forces global and a negative one forces local;
    ///     otherwise [TexweaveState::variable_assignment_scope_hook] decides (`\global`).
    pub fn assignment_scope(&mut self) -> Scope {
        let requested = S::variable_assignment_scope_hook(self.state_mut());
        let global_defs = self
            .vm()
            .chain()
            .integer(Address::Integer(IntegerParameter::GlobalDefs));
        match global_defs.cmp(&0) {
            std::cmp::Ordering::Greater => Scope::Global,
            std::cmp::Ordering::Less => Scope::Local,
            std::cmp::Ordering::Equal => requested,
        }
    }
}

fn next_unexpanded<S>(vm: &mut vm::VM<S>) -> txl::Result<Option<Token>> {
    if peek_unexpanded(vm)?.is_none() {
        return Ok(None);
    }
    Ok(vm.internal.expansions_mut().pop())
}

/// Makes sure the next token, if any, is on top of the current source's stack.
fn peek_unexpanded<S>(vm: &mut vm::VM<S>) -> txl::Result<Option<&Token>> {
    while vm.internal.expansions().is_empty() {
        let internal = &mut vm.internal;
        let lexed = internal
            .current_source
            .root
            .next(&internal.chain, &mut internal.cs_name_interner);
        match lexed {
            Ok(Some(token)) => internal.expansions_mut().push(token),
            Ok(None) => {
                if !internal.pop_source() {
                    return Ok(None);
                }
            }
            Err(err) => return Err(lexer_error(vm, err)),
        }
    }
    Ok(vm.internal.expansions().last())
}

fn lexer_error<S>(vm: &vm::VM<S>, err: token::lexer::Error) -> Box<error::Error> {
    let (token, title) = match err {
        token::lexer::Error::InvalidCharacter(c, key) => (
            Token::new_other(c, key),
            format!("invalid character {c:?} in the input"),
        ),
        token::lexer::Error::EmptyControlSequence(key) => (
            Token::new_other('\\', key),
            "the input ended after an escape character".to_string(),
        ),
    };
    error::SimpleTokenError::new(vm, token, title)
        .with_note("invalid characters have category code 15")
        .into()
}

/// Outcome of trying to expand the front of the input.
enum Front {
    /// The input is exhausted.
    Exhausted,
    /// The next token is not expandable and is on top of the stack.
    Unexpandable,
    /// The override hook replaced the expansion; its token is on top of the stack
    ///     and must not be expanded again.
    Overridden,
    /// The next token was expanded and its expansion pushed back onto the input.
    Expanded,
}

fn expand_front<S: TexweaveState>(vm: &mut vm::VM<S>) -> txl::Result<Front> {
    let Some(&token) = peek_unexpanded(vm)? else {
        return Ok(Front::Exhausted);
    };
    let token::Value::CommandRef(command_ref) = token.value() else {
        return Ok(Front::Unexpandable);
    };
    let result = match vm.internal.chain.command(&command_ref) {
        Some(command::Command::Expansion(f, tag)) => {
            let (f, tag) = (*f, *tag);
            vm.internal.expansions_mut().pop();
            match S::expansion_override_hook(token, ExpansionInput::new(vm), tag) {
                Ok(Some(replacement)) => {
                    vm.internal.expansions_mut().push(replacement);
                    return Ok(Front::Overridden);
                }
                Ok(None) => f(token, ExpansionInput::new(vm)),
                Err(err) => Err(err),
            }
        }
        Some(command::Command::Macro(tex_macro)) => {
            let tex_macro = tex_macro.clone();
            vm.internal.expansions_mut().pop();
            tex_macro.call(token, ExpansionInput::new(vm))
        }
        _ => return Ok(Front::Unexpandable),
    };
    match result {
        Ok(()) => Ok(Front::Expanded),
        Err(err) => Err(error::Error::new_propagated(
            vm,
            error::OperationKind::Expansion,
            token,
            err,
        )),
    }
}
