//! The virtual machine that runs TeX input.
//!
//! The [VM] owns the input sources, the group chain and the fonts.
//! Its main loop reads expanded tokens and dispatches each one,
//!     either to the command bound to it or to one of the [Handlers].

use crate::command::{self, BuiltIn, Command};
use crate::error;
use crate::group::{self, Address, GroupKind, Scope};
use crate::prelude as txl;
use crate::texmacro;
use crate::token::{self, lexer, trace, CatCode, CsNameInterner, Token, Value};
use font::{FontFactory, FontId, FontRepo};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

mod streams;
pub use streams::*;

/// Engine specific behavior of the main loop.
///
/// The loop handles these tokens itself:
///
/// | token | example | action |
/// | -- | -- | -- |
/// | execution command | `\def` | run it |
/// | variable | `\count1` | parse `=value` and assign |
/// | font identifier | `\cmr10` | make it the current font |
/// | `{` or `}` | | open or close a simple group |
///
/// Everything else goes to a handler.
pub trait Handlers<S: TexweaveState> {
    /// Character tokens, other than begin group and end group characters.
    fn character_handler(token: Token, input: &mut ExecutionInput<S>) -> txl::Result<()> {
        _ = (token, input);
        Ok(())
    }

    /// A `\mathchardef` command outside of math mode.
    fn math_character_handler(
        token: Token,
        input: &mut ExecutionInput<S>,
        math_code: u32,
    ) -> txl::Result<()> {
        _ = math_code;
        Err(error::SimpleTokenError::new(
            input.vm(),
            token,
            "math characters may only appear in math mode",
        )
        .into())
    }

    /// A control sequence or active character with no meaning.
    fn undefined_command_handler(token: Token, input: &mut ExecutionInput<S>) -> txl::Result<()> {
        Err(error::UndefinedCommandError::new(input.vm(), token).into())
    }

    /// An expandable command that reached the main loop unexpanded, like `\the` in `\noexpand\the`.
    fn unexpanded_expansion_command(token: Token, input: &mut ExecutionInput<S>) -> txl::Result<()> {
        _ = (token, input);
        Ok(())
    }
}

pub struct DefaultHandlers;

impl<S: TexweaveState> Handlers<S> for DefaultHandlers {}

impl<S: TexweaveState> VM<S> {
    /// Runs until every pushed source is exhausted.
    pub fn run<H: Handlers<S>>(&mut self) -> txl::Result<()> {
        let input = ExecutionInput::new(self);
        while let Some(token) = input.next()? {
            match token.value() {
                Value::CommandRef(command_ref) => dispatch::<S, H>(token, command_ref, input)?,
                Value::BeginGroup(_) => input.begin_group(GroupKind::Simple, token),
                Value::EndGroup(_) => input.end_group(GroupKind::Simple, token)?,
                _ => H::character_handler(token, input)?,
            }
        }
        let level = self.chain().level();
        if level > 0 {
            log::warn!("input ended inside a group at level {level}");
            let mut terminal_out = self.terminal_out.borrow_mut();
            _ = writeln!(terminal_out, "(end occurred inside a group at level {level})");
        }
        Ok(())
    }

    /// Reports a recoverable error.
    ///
    /// On [Ok] the caller carries on with TeX's recovery value;
    ///     [TexweaveState::recoverable_error_hook] decides which.
    pub fn error<E: error::TexError + 'static>(&self, err: E) -> txl::Result<()> {
        S::recoverable_error_hook(self, err.into())
    }

    fn end_group(&mut self, kind: GroupKind, token: Token) -> txl::Result<()> {
        let current = self.internal.chain.current().kind();
        if current != kind {
            let title = match (kind, current) {
                (_, GroupKind::Bottom) => "there is no group to end".to_string(),
                (GroupKind::Simple | GroupKind::Math, GroupKind::SemiSimple) => {
                    "extra }, or forgotten \\endgroup".to_string()
                }
                (GroupKind::SemiSimple, _) => "extra \\endgroup".to_string(),
                (_, GroupKind::MathShift) => "extra }, or forgotten $".to_string(),
                (_, GroupKind::MathLeft) => "extra }, or forgotten \\right".to_string(),
                _ => format!("this token cannot end the current {current}"),
            };
            let mut err = error::SimpleTokenError::new(self, token, title)
                .with_category(error::Category::Scope);
            if let Some(start) = self.internal.chain.current().start() {
                err = err.with_note(format!(
                    "the current group was opened by {}",
                    self.trace(start).value
                ));
            }
            self.error(err)?;
            return Ok(());
        }
        let closed = match self.internal.chain.close() {
            Ok(closed) => closed,
            Err(group::NoGroupToEnd) => {
                return Err(error::SimpleTokenError::new(self, token, "there is no group to end")
                    .with_category(error::Category::Scope)
                    .into())
            }
        };
        for observer in closed.after_group_observers {
            observer(&mut self.state);
        }
        self.internal
            .expansions_mut()
            .extend(closed.after_group_tokens.into_iter().rev());
        Ok(())
    }
}

fn dispatch<S: TexweaveState, H: Handlers<S>>(
    token: Token,
    command_ref: token::CommandRef,
    input: &mut ExecutionInput<S>,
) -> txl::Result<()> {
    let Some(command) = input.vm().chain().command(&command_ref) else {
        return H::undefined_command_handler(token, input);
    };
    match command {
        Command::Execution(f, _) => {
            let f = *f;
            f(token, input).map_err(|err| {
                error::Error::new_propagated(input.vm(), error::OperationKind::Execution, token, err)
            })
        }
        Command::Variable(variable) => {
            let variable = variable.clone();
            let scope = input.assignment_scope();
            variable.set_value_using_input(token, input, scope)
        }
        Command::Font(id) => {
            let id = *id;
            let scope = input.assignment_scope();
            input.chain_mut().set_font(Address::CurrentFont, id, scope);
            Ok(())
        }
        Command::CharacterTokenAlias(value) => {
            let aliased = Token::new_from_value(*value, token.trace_key());
            match aliased.value() {
                Value::BeginGroup(_) => {
                    input.begin_group(GroupKind::Simple, aliased);
                    Ok(())
                }
                Value::EndGroup(_) => input.end_group(GroupKind::Simple, aliased),
                _ => H::character_handler(aliased, input),
            }
        }
        Command::Character(c) => {
            let other = Token::new_other(*c, token.trace_key());
            H::character_handler(other, input)
        }
        Command::MathCharacter(code) => {
            let code = *code;
            H::math_character_handler(token, input, code)
        }
        Command::Expansion(_, _) | Command::Macro(_) => {
            H::unexpanded_expansion_command(token, input)
        }
    }
}

/// The virtual machine.
pub struct VM<S> {
    /// Engine state; a struct of components in the standard library.
    pub state: S,

    /// Fonts that have been loaded.
    pub fonts: FontRepo,

    /// Factory used by `\font` to load new fonts.
    pub font_factory: Box<dyn FontFactory>,

    /// Terminal output, standard error by default.
    pub terminal_out: Rc<RefCell<dyn std::io::Write>>,

    /// Log file output. Discarded by default.
    pub log_file: Rc<RefCell<dyn std::io::Write>>,

    /// Root of relative file paths, if it could be determined.
    pub working_directory: Option<std::path::PathBuf>,

    internal: Internal<S>,
}

/// Disjoint mutable borrows of the VM.
pub struct Parts<'a, S> {
    pub state: &'a mut S,
    pub chain: &'a mut group::Chain<S>,
    pub fonts: &'a mut FontRepo,
    pub font_factory: &'a dyn FontFactory,
    pub cs_name_interner: &'a mut CsNameInterner,
}

/// State of a VM.
///
/// Every method has a default, so any type can be a state:
/// ```
/// # use texweave::traits::TexweaveState;
/// struct SomeNewType;
///
/// impl TexweaveState for SomeNewType {}
/// ```
///
/// The methods are hooks called by the VM at fixed points.
pub trait TexweaveState: Sized {
    /// Called after a macro has been expanded; used for `\tracingmacros`.
    fn post_macro_expansion_hook(
        token: Token,
        input: &ExpansionInput<Self>,
        tex_macro: &texmacro::Macro,
        arguments: &[&[Token]],
        reversed_expansion: &[Token],
    ) {
        _ = (token, input, tex_macro, arguments, reversed_expansion);
    }

    /// Called before an expansion command runs; used for `\noexpand`.
    ///
    /// A returned token replaces the expansion and is itself left unexpanded.
    fn expansion_override_hook(
        token: Token,
        input: &mut ExpansionInput<Self>,
        tag: Option<command::Tag>,
    ) -> txl::Result<Option<Token>> {
        _ = (token, input, tag);
        Ok(None)
    }

    /// Called with each recoverable error.
    ///
    /// [Ok] means the error was reported and the run continues.
    /// By default every error is fatal.
    fn recoverable_error_hook(vm: &VM<Self>, error: Box<error::Error>) -> txl::Result<()> {
        _ = vm;
        Err(error)
    }

    /// Scope requested for the next assignment; used for `\global`.
    ///
    /// `\globaldefs` is applied on top by [ExecutionInput::assignment_scope].
    fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
        _ = state;
        Scope::Local
    }
}

impl TexweaveState for () {}

impl<S: Default> VM<S> {
    /// Builds a VM with INITEX values and the given primitives bound globally.
    pub fn new(initial_built_ins: HashMap<&str, BuiltIn<S>>) -> Box<VM<S>> {
        let mut internal: Internal<S> = Internal::new();
        for (name, built_in) in initial_built_ins {
            let cs_name = internal.cs_name_interner.get_or_intern(name);
            internal.chain.set_command(
                token::CommandRef::ControlSequence(cs_name),
                built_in.cmd().clone(),
                Scope::Global,
            );
        }
        Box::new(VM {
            state: Default::default(),
            fonts: Default::default(),
            font_factory: Box::<font::MetricFactory>::default(),
            terminal_out: Rc::new(RefCell::new(std::io::stderr())),
            log_file: Rc::new(RefCell::new(std::io::sink())),
            working_directory: match std::env::current_dir() {
                Ok(path_buf) => Some(path_buf),
                Err(err) => {
                    log::warn!("failed to determine the working directory: {err}");
                    None
                }
            },
            internal,
        })
    }
}

impl<S> VM<S> {
    /// Pushes a source; it is read before every source pushed earlier.
    pub fn push_source<T1: Into<PathBuf>, T2: Into<String>>(
        &mut self,
        file_name: T1,
        source_code: T2,
    ) {
        self.internal
            .push_source(None, file_name.into(), source_code.into())
    }

    /// Drops all pending input.
    pub fn clear_sources(&mut self) {
        self.internal.clear_sources()
    }

    /// Sets the category codes of plain TeX at the outermost level.
    ///
    /// The VM starts with the INITEX category codes, in which only `\`, `%`,
    ///     letters, spaces and the end of line have special meaning.
    pub fn set_plain_tex_cat_codes(&mut self) {
        for c in (0_u32..128).filter_map(char::from_u32) {
            let plain = CatCode::plain_tex_default(c);
            if plain != CatCode::initex_default(c) {
                self.internal.chain.set_cat_code(c, plain, Scope::Global);
            }
        }
    }

    /// Resolves [token::CsName] values to strings.
    #[inline]
    pub fn cs_name_interner(&self) -> &CsNameInterner {
        &self.internal.cs_name_interner
    }

    /// The group chain, which holds every binding.
    #[inline]
    pub fn chain(&self) -> &group::Chain<S> {
        &self.internal.chain
    }

    /// Used to set up bindings, like the math families, before running.
    #[inline]
    pub fn chain_mut(&mut self) -> &mut group::Chain<S> {
        &mut self.internal.chain
    }

    /// Sorted names of every defined control sequence. Slow; for error messages.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .internal
            .chain
            .command_refs()
            .into_iter()
            .filter_map(|command_ref| match command_ref {
                token::CommandRef::ControlSequence(cs_name) => self
                    .internal
                    .cs_name_interner
                    .resolve(cs_name)
                    .map(String::from),
                token::CommandRef::ActiveCharacter(_) => None,
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Returns the identifier `\the` prints for a font, like `\tenrm`.
    pub fn font_identifier(&self, id: FontId) -> String {
        format!("\\{}", self.fonts.get(id).name())
    }

    pub fn trace(&self, token: Token) -> trace::SourceCodeTrace {
        self.internal
            .tracer
            .trace(token, &self.internal.cs_name_interner)
    }

    pub fn trace_end_of_input(&self) -> trace::SourceCodeTrace {
        self.internal.tracer.trace_end_of_input()
    }

    fn begin_group(&mut self, kind: GroupKind, token: Token) {
        self.internal.chain.open(kind, Some(token));
    }
}

struct Internal<S> {
    // Stack of input sources; the innermost one is kept out of the vector.
    current_source: Source,
    sources: Vec<Source>,

    cs_name_interner: CsNameInterner,

    tracer: trace::Tracer,

    token_buffers: Vec<Vec<Token>>,

    chain: group::Chain<S>,
}

impl<S> Internal<S> {
    fn new() -> Self {
        Internal {
            current_source: Default::default(),
            sources: Default::default(),
            cs_name_interner: Default::default(),
            tracer: Default::default(),
            token_buffers: Default::default(),
            chain: Default::default(),
        }
    }

    fn push_source(&mut self, token: Option<Token>, file_name: PathBuf, source_code: String) {
        let trace_key_range =
            self.tracer
                .register_source_code(token, trace::Origin::File(file_name), &source_code);
        let mut new_source = Source::new(&source_code, trace_key_range);
        std::mem::swap(&mut new_source, &mut self.current_source);
        self.sources.push(new_source);
    }

    fn clear_sources(&mut self) {
        self.current_source = Default::default();
        self.sources.clear();
    }

    #[inline]
    fn expansions(&self) -> &Vec<Token> {
        &self.current_source.expansions
    }

    #[inline]
    fn expansions_mut(&mut self) -> &mut Vec<Token> {
        &mut self.current_source.expansions
    }

    fn pop_source(&mut self) -> bool {
        match self.sources.pop() {
            None => false,
            Some(source) => {
                self.current_source = source;
                true
            }
        }
    }
}

struct Source {
    expansions: Vec<Token>,
    root: lexer::Lexer,
}

impl Source {
    fn new(source_code: &str, trace_key_range: trace::KeyRange) -> Source {
        Source {
            expansions: Vec::with_capacity(32),
            root: lexer::Lexer::new(source_code, trace_key_range),
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Source::new("", trace::KeyRange::empty())
    }
}

/// Access to a component of the state.
///
/// Commands keep their private state in a component type next to them,
///     like the interaction mode beside `\batchmode`,
///     and are generic over any state that has the component.
pub trait HasComponent<C>: TexweaveState {
    fn component(&self) -> &C;

    fn component_mut(&mut self) -> &mut C;
}

/// Implements [HasComponent] for components stored as fields of a struct.
///
/// ```
/// # mod mylibrary1{
/// #   pub struct Component;
/// # }
/// # mod mylibrary2{
/// #   pub struct Component;
/// # }
/// # use texweave::vm::implement_has_component;
/// # use texweave::traits::*;
/// #
/// struct MyState {
///     component_1: mylibrary1::Component,
///     component_2: mylibrary2::Component,
/// }
///
/// impl TexweaveState for MyState {}
///
/// implement_has_component![
///     MyState,
///     (mylibrary1::Component, component_1),
///     (mylibrary2::Component, component_2),
/// ];
/// ```
#[macro_export]
macro_rules! implement_has_component {
    ( $type: path, $component: path, $field: ident ) => {
        implement_has_component![$type, ($component, $field),];
    };
    ( $type: path, $(($component: path, $field: ident),)+) => {
        $(
            impl ::texweave::vm::HasComponent<$component> for $type {
                #[inline]
                fn component(&self) -> &$component {
                    &self.$field
                }
                #[inline]
                fn component_mut(&mut self) -> &mut $component {
                    &mut self.$field
                }
            }
        )*
    };
}

pub use implement_has_component;
