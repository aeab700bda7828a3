//! Commands: the values bound to control sequences and active characters.
//!
//! Commands come in two broad flavors.
//! Expansion commands (like `\the` or a user defined macro) read tokens and push
//!     new tokens back onto the front of the input; they never touch the group chain.
//! Execution commands (like `\def` or `\advance`) may read tokens and
//!     change the state, including the group chain.
//!
//! |                                          | Expansion | Execution
//! |------------------------------------------|-----------|-----------
//! Can read tokens from the input stream?     | Yes       | Yes
//! Can add tokens to the input stream?        | Yes       | Rarely
//! Can change the state?                      | No        | Yes
//! Evaluated when only expanding, as in `\edef`? | Yes    | No

use crate::prelude as txl;
use crate::texmacro;
use crate::token;
use crate::variable;
use crate::vm;
use font::FontId;
use std::num;
use std::rc::Rc;
use std::sync;

/// Signature of expansion primitives.
pub type ExpansionFn<S> =
    fn(token: token::Token, input: &mut vm::ExpansionInput<S>) -> txl::Result<()>;

/// Signature of execution primitives.
pub type ExecutionFn<S> =
    fn(token: token::Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()>;

/// The meaning of a control sequence or active character.
pub enum Command<S> {
    /// Expansion primitive, like `\the` or `\ifx`.
    Expansion(ExpansionFn<S>, Option<Tag>),
    /// Macro defined with `\def`.
    Macro(Rc<texmacro::Macro>),
    /// Execution primitive, like `\def` or `\advance`.
    Execution(ExecutionFn<S>, Option<Tag>),
    /// Register or parameter, like `\count` or `\mathsurround`.
    Variable(Rc<variable::Command<S>>),
    /// `\let\cmd=<character>`.
    CharacterTokenAlias(token::Value),
    /// `\chardef`: typeset in the main loop, a number when scanning numbers.
    Character(char),
    /// `\mathchardef`.
    MathCharacter(u32),
    /// Font identifier created by `\font`.
    Font(FontId),
}

impl<S> std::fmt::Display for Command<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let description = match self {
            Command::Expansion(..) => "an expansion command",
            Command::Macro(_) => "a user-defined macro",
            Command::Execution(..) => "an execution command",
            Command::Variable(_) => "a variable command",
            Command::CharacterTokenAlias(_) => "a character token alias",
            Command::Character(_) => "a character command",
            Command::MathCharacter(_) => "a math character command",
            Command::Font(_) => "a font command",
        };
        f.write_str(description)
    }
}

impl<S> Clone for Command<S> {
    fn clone(&self) -> Self {
        match self {
            Command::Expansion(f, tag) => Command::Expansion(*f, *tag),
            Command::Macro(m) => Command::Macro(Rc::clone(m)),
            Command::Execution(f, tag) => Command::Execution(*f, *tag),
            Command::Variable(v) => Command::Variable(Rc::clone(v)),
            Command::CharacterTokenAlias(value) => Command::CharacterTokenAlias(*value),
            Command::Character(c) => Command::Character(*c),
            Command::MathCharacter(code) => Command::MathCharacter(*code),
            Command::Font(id) => Command::Font(*id),
        }
    }
}

impl<S> Command<S> {
    /// Tag of a primitive; other commands never have one.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            Command::Expansion(_, tag) | Command::Execution(_, tag) => *tag,
            _ => None,
        }
    }

    /// Whether `\ifx` considers the two commands equal.
    ///
    /// Primitives match when they are the same function with the same tag,
    ///     or the same variable command.
    pub fn same_meaning(&self, other: &Command<S>) -> bool {
        match (self, other) {
            (Command::Expansion(a, s), Command::Expansion(b, t)) => {
                *a as usize == *b as usize && s == t
            }
            (Command::Execution(a, s), Command::Execution(b, t)) => {
                *a as usize == *b as usize && s == t
            }
            (Command::Variable(a), Command::Variable(b)) => Rc::ptr_eq(a, b),
            (Command::Macro(a), Command::Macro(b)) => a.compare(b),
            (Command::CharacterTokenAlias(a), Command::CharacterTokenAlias(b)) => a == b,
            (Command::Character(a), Command::Character(b)) => a == b,
            (Command::MathCharacter(a), Command::MathCharacter(b)) => a == b,
            (Command::Font(a), Command::Font(b)) => a == b,
            _ => false,
        }
    }
}

/// A primitive installed when the VM is built, with an optional description.
pub struct BuiltIn<S> {
    cmd: Command<S>,
    doc: Option<&'static str>,
}

impl<S> Clone for BuiltIn<S> {
    fn clone(&self) -> Self {
        BuiltIn {
            cmd: self.cmd.clone(),
            doc: self.doc,
        }
    }
}

impl<S> BuiltIn<S> {
    pub fn new_expansion(f: ExpansionFn<S>) -> BuiltIn<S> {
        Command::Expansion(f, None).into()
    }

    pub fn new_execution(f: ExecutionFn<S>) -> BuiltIn<S> {
        Command::Execution(f, None).into()
    }

    pub fn new_variable(cmd: variable::Command<S>) -> BuiltIn<S> {
        Command::Variable(Rc::new(cmd)).into()
    }

    /// Tags the primitive so that other commands can recognize it.
    pub fn with_tag(mut self, tag: Tag) -> BuiltIn<S> {
        match &mut self.cmd {
            Command::Expansion(_, t) | Command::Execution(_, t) => *t = Some(tag),
            other => log::warn!("ignoring a tag for {other}"),
        }
        self
    }

    pub fn with_doc(mut self, doc: &'static str) -> BuiltIn<S> {
        self.doc = Some(doc);
        self
    }

    pub fn cmd(&self) -> &Command<S> {
        &self.cmd
    }

    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }
}

impl<S> From<Command<S>> for BuiltIn<S> {
    fn from(cmd: Command<S>) -> Self {
        BuiltIn { cmd, doc: None }
    }
}

impl<S> From<ExpansionFn<S>> for BuiltIn<S> {
    fn from(f: ExpansionFn<S>) -> Self {
        BuiltIn::new_expansion(f)
    }
}

impl<S> From<ExecutionFn<S>> for BuiltIn<S> {
    fn from(f: ExecutionFn<S>) -> Self {
        BuiltIn::new_execution(f)
    }
}

impl<S> From<variable::Command<S>> for BuiltIn<S> {
    fn from(cmd: variable::Command<S>) -> Self {
        BuiltIn::new_variable(cmd)
    }
}

/// Identifies a primitive independently of the names bound to it.
///
/// `\else` and `\fi` are found by tag when a conditional skips tokens,
///     so they still work after `\let\myfi=\fi`.
#[derive(PartialEq, Eq, Clone, Copy, Debug, PartialOrd, Ord, Hash)]
pub struct Tag(num::NonZeroU32);

static TAG_COUNTER: sync::atomic::AtomicU32 = sync::atomic::AtomicU32::new(0);

impl Tag {
    /// Returns a tag different from every tag returned before.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Tag {
        let n = TAG_COUNTER.fetch_add(1, sync::atomic::Ordering::Relaxed);
        Tag(num::NonZeroU32::MIN.saturating_add(n))
    }
}

/// A [Tag] that can live in a `static` and is allocated on first use.
///
/// ```
/// # use texweave::command::StaticTag;
/// static FI_TAG: StaticTag = StaticTag::new();
///
/// assert_eq!(FI_TAG.get(), FI_TAG.get());
/// ```
#[derive(Default)]
pub struct StaticTag(sync::OnceLock<Tag>);

impl StaticTag {
    pub const fn new() -> StaticTag {
        StaticTag(sync::OnceLock::new())
    }

    pub fn get(&self) -> Tag {
        *self.0.get_or_init(Tag::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ELSE: StaticTag = StaticTag::new();
    static FI: StaticTag = StaticTag::new();

    #[test]
    fn static_tags_are_stable_and_distinct() {
        let (else_tag, fi_tag) = (ELSE.get(), FI.get());
        assert_eq!(ELSE.get(), else_tag);
        assert_eq!(FI.get(), fi_tag);
        assert_ne!(else_tag, fi_tag);
        assert_ne!(Tag::new(), Tag::new());
    }

    #[test]
    fn optional_tags_are_four_bytes() {
        assert_eq!(std::mem::size_of::<Option<Tag>>(), 4);
    }

    #[test]
    fn tags_only_attach_to_primitives() {
        let tag = Tag::new();
        let primitive = BuiltIn::<()>::new_execution(noop).with_tag(tag);
        assert_eq!(primitive.cmd().tag(), Some(tag));
        let alias = BuiltIn::<()>::from(Command::Character('a')).with_tag(tag);
        assert_eq!(alias.cmd().tag(), None);
    }

    fn noop(_: token::Token, _: &mut vm::ExecutionInput<()>) -> txl::Result<()> {
        Ok(())
    }

    fn other_noop(_: token::Token, _: &mut vm::ExecutionInput<()>) -> txl::Result<()> {
        Ok(())
    }

    #[test]
    fn same_meaning() {
        let a: Command<()> = Command::Execution(noop, None);
        let b: Command<()> = Command::Execution(other_noop, Some(Tag::new()));
        assert!(a.same_meaning(&a.clone()));
        assert!(!a.same_meaning(&b));
        assert!(Command::<()>::Character('x').same_meaning(&Command::Character('x')));
        assert!(!Command::<()>::Character('x').same_meaning(&Command::MathCharacter(120)));
    }
}
