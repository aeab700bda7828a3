//! The group chain: scoped storage for every register, parameter, code table and command.
//!
//! TeX assignments are local to the current group unless they are global.
//! Here each group is a frame holding sparse overrides, and frames form a chain
//!     from the innermost group out to the root.
//! Reading a value walks the chain outward until some frame binds it;
//!     if no frame does, the documented default for the family is returned.
//! A local assignment writes into the innermost frame only,
//!     so closing the group discards it.
//! A global assignment writes into the root frame and clears every shadowing
//!     copy in between, so the new value is visible immediately and survives all group ends.
//!
//! Frames live in an arena and refer to their parent by index.

use crate::command::Command;
use crate::token::lexer::CatCodeFn;
use crate::token::{CatCode, CommandRef, Token};
use common::{Glue, Scaled};
use font::FontId;
use std::collections::HashMap;
use std::rc::Rc;

/// Scope of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    Global,
}

/// What opened a group.
///
/// Groups must be closed by the matching kind of token;
///     a mismatch is an error like "Extra }, or forgotten \endgroup".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// The root of the chain, which is never closed.
    Bottom,
    /// A group opened by a begin group character.
    Simple,
    /// A group opened by `\begingroup`.
    SemiSimple,
    /// A group opened by a begin group character in math mode.
    Math,
    /// A group opened by a math shift character.
    MathShift,
    /// A group opened by `\left`.
    MathLeft,
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GroupKind::Bottom => "bottom level",
            GroupKind::Simple => "simple group",
            GroupKind::SemiSimple => "semi simple group",
            GroupKind::Math => "math group",
            GroupKind::MathShift => "math shift group",
            GroupKind::MathLeft => "math left group",
        };
        write!(f, "{s}")
    }
}

/// Integer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerParameter {
    Mag,
    TracingMacros,
    GlobalDefs,
    DelimiterFactor,
    BinOpPenalty,
    RelPenalty,
    Fam,
    Time,
    Day,
    Month,
    Year,
}

/// Dimension parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimenParameter {
    MathSurround,
    DelimiterShortfall,
    NullDelimiterSpace,
    ScriptSpace,
}

/// Math glue parameters, measured in mu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MuGlueParameter {
    ThinMuSkip,
    MedMuSkip,
    ThickMuSkip,
}

/// Token list parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenListParameter {
    EveryMath,
    EveryDisplay,
    EveryMathEnd,
}

macro_rules! parameter_names {
    ( $type: ident, $( ($variant: ident, $name: expr), )+ ) => {
        impl $type {
            pub const ALL: &'static [$type] = &[ $( $type::$variant, )+ ];

            /// Name of the control sequence for this parameter, without the escape character.
            pub fn name(&self) -> &'static str {
                match self {
                    $( $type::$variant => $name, )+
                }
            }
        }
    };
}

parameter_names![
    IntegerParameter,
    (Mag, "mag"),
    (TracingMacros, "tracingmacros"),
    (GlobalDefs, "globaldefs"),
    (DelimiterFactor, "delimiterfactor"),
    (BinOpPenalty, "binoppenalty"),
    (RelPenalty, "relpenalty"),
    (Fam, "fam"),
    (Time, "time"),
    (Day, "day"),
    (Month, "month"),
    (Year, "year"),
];

parameter_names![
    DimenParameter,
    (MathSurround, "mathsurround"),
    (DelimiterShortfall, "delimitershortfall"),
    (NullDelimiterSpace, "nulldelimiterspace"),
    (ScriptSpace, "scriptspace"),
];

parameter_names![
    MuGlueParameter,
    (ThinMuSkip, "thinmuskip"),
    (MedMuSkip, "medmuskip"),
    (ThickMuSkip, "thickmuskip"),
];

parameter_names![
    TokenListParameter,
    (EveryMath, "everymath"),
    (EveryDisplay, "everydisplay"),
    (EveryMathEnd, "everymathend"),
];

/// Math font sizes, as selected by `\textfont`, `\scriptfont` and `\scriptscriptfont`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MathSize {
    Text,
    Script,
    ScriptScript,
}

/// Name of a binding in the chain.
///
/// Register numbers are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    Count(u32),
    Dimen(u32),
    Skip(u32),
    MuSkip(u32),
    Toks(u32),
    Integer(IntegerParameter),
    Dimension(DimenParameter),
    MuGlue(MuGlueParameter),
    TokenList(TokenListParameter),
    CatCode(char),
    LcCode(char),
    UcCode(char),
    SfCode(char),
    MathCode(char),
    DelCode(char),
    CurrentFont,
    FamilyFont(MathSize, u8),
    Command(CommandRef),
}

/// The type of value stored at an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Integer,
    Dimen,
    Glue,
    MuGlue,
    TokenList,
    CatCode,
    Font,
    Command,
}

impl Address {
    pub fn value_type(&self) -> ValueType {
        match self {
            Address::Count(_)
            | Address::Integer(_)
            | Address::LcCode(_)
            | Address::UcCode(_)
            | Address::SfCode(_)
            | Address::MathCode(_)
            | Address::DelCode(_) => ValueType::Integer,
            Address::Dimen(_) | Address::Dimension(_) => ValueType::Dimen,
            Address::Skip(_) => ValueType::Glue,
            Address::MuSkip(_) | Address::MuGlue(_) => ValueType::MuGlue,
            Address::Toks(_) | Address::TokenList(_) => ValueType::TokenList,
            Address::CatCode(_) => ValueType::CatCode,
            Address::CurrentFont | Address::FamilyFont(..) => ValueType::Font,
            Address::Command(_) => ValueType::Command,
        }
    }

    /// Value of this address when no frame binds it.
    ///
    /// These are the values INITEX starts with; TeX.2021.222-240.
    pub fn default_integer(&self) -> i32 {
        match *self {
            Address::Integer(IntegerParameter::Mag) => 1000,
            Address::LcCode(c) => {
                if c.is_ascii_alphabetic() {
                    c.to_ascii_lowercase() as i32
                } else {
                    0
                }
            }
            Address::UcCode(c) => {
                if c.is_ascii_alphabetic() {
                    c.to_ascii_uppercase() as i32
                } else {
                    0
                }
            }
            Address::SfCode(c) => {
                if c.is_ascii_uppercase() {
                    999
                } else {
                    1000
                }
            }
            Address::MathCode(c) => {
                if c.is_ascii_digit() {
                    0x7000 + c as i32
                } else if c.is_ascii_alphabetic() {
                    0x7100 + c as i32
                } else {
                    c as i32
                }
            }
            Address::DelCode(c) => {
                if c == '.' {
                    0
                } else {
                    -1
                }
            }
            _ => 0,
        }
    }
}

/// A value bound in a frame.
pub enum Binding<S> {
    Integer(i32),
    Dimen(Scaled),
    Glue(Glue),
    TokenList(Rc<Vec<Token>>),
    CatCode(CatCode),
    Font(FontId),
    Command(Command<S>),
    /// Shadows outer bindings without providing a value.
    Undefined,
}

// Implemented manually because the derived implementation requires S to be Clone.
impl<S> Clone for Binding<S> {
    fn clone(&self) -> Self {
        match self {
            Binding::Integer(i) => Binding::Integer(*i),
            Binding::Dimen(d) => Binding::Dimen(*d),
            Binding::Glue(g) => Binding::Glue(*g),
            Binding::TokenList(t) => Binding::TokenList(t.clone()),
            Binding::CatCode(c) => Binding::CatCode(*c),
            Binding::Font(f) => Binding::Font(*f),
            Binding::Command(c) => Binding::Command(c.clone()),
            Binding::Undefined => Binding::Undefined,
        }
    }
}

impl<S> std::fmt::Debug for Binding<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Integer(i) => write!(f, "Integer({i})"),
            Binding::Dimen(d) => write!(f, "Dimen({d})"),
            Binding::Glue(g) => write!(f, "Glue({g})"),
            Binding::TokenList(t) => write!(f, "TokenList({} tokens)", t.len()),
            Binding::CatCode(c) => write!(f, "CatCode({c})"),
            Binding::Font(id) => write!(f, "Font({})", id.0),
            Binding::Command(c) => write!(f, "Command({c})"),
            Binding::Undefined => write!(f, "Undefined"),
        }
    }
}

/// Action run when a group closes.
pub type Observer<S> = Box<dyn FnOnce(&mut S)>;

/// One frame of the chain.
pub struct Group<S> {
    kind: GroupKind,
    level: usize,
    parent: Option<usize>,
    start: Option<Token>,
    bindings: HashMap<Address, Binding<S>>,
    after_group_tokens: Vec<Token>,
    after_group_observers: Vec<Observer<S>>,
}

impl<S> Group<S> {
    fn new(kind: GroupKind, level: usize, parent: Option<usize>, start: Option<Token>) -> Self {
        Group {
            kind,
            level,
            parent,
            start,
            bindings: Default::default(),
            after_group_tokens: vec![],
            after_group_observers: vec![],
        }
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// The token that opened this group, if any.
    pub fn start(&self) -> Option<Token> {
        self.start
    }
}

/// A group that has been closed.
///
/// The caller must run the observers and then put the tokens back into the input,
///     in this order.
pub struct ClosedGroup<S> {
    pub kind: GroupKind,
    pub start: Option<Token>,
    pub after_group_tokens: Vec<Token>,
    pub after_group_observers: Vec<Observer<S>>,
}

/// Error returned when closing the root frame.
#[derive(Debug, PartialEq, Eq)]
pub struct NoGroupToEnd;

/// The chain of groups.
pub struct Chain<S> {
    groups: Vec<Group<S>>,
    current: usize,
}

impl<S> Default for Chain<S> {
    fn default() -> Self {
        Chain {
            groups: vec![Group::new(GroupKind::Bottom, 0, None, None)],
            current: 0,
        }
    }
}

impl<S> Chain<S> {
    /// Number of open groups, not counting the root.
    pub fn level(&self) -> usize {
        self.groups[self.current].level
    }

    pub fn current(&self) -> &Group<S> {
        &self.groups[self.current]
    }

    /// Returns the binding for the address, walking from the innermost group outward.
    pub fn get(&self, address: &Address) -> Option<&Binding<S>> {
        let mut i = Some(self.current);
        while let Some(j) = i {
            let group = &self.groups[j];
            if let Some(binding) = group.bindings.get(address) {
                return Some(binding);
            }
            i = group.parent;
        }
        None
    }

    pub fn integer(&self, address: Address) -> i32 {
        match self.get(&address) {
            Some(Binding::Integer(i)) => *i,
            _ => address.default_integer(),
        }
    }

    pub fn dimen(&self, address: Address) -> Scaled {
        match self.get(&address) {
            Some(Binding::Dimen(d)) => *d,
            _ => Scaled::ZERO,
        }
    }

    pub fn glue(&self, address: Address) -> Glue {
        match self.get(&address) {
            Some(Binding::Glue(g)) => *g,
            _ => Glue::ZERO,
        }
    }

    pub fn token_list(&self, address: Address) -> Rc<Vec<Token>> {
        match self.get(&address) {
            Some(Binding::TokenList(t)) => t.clone(),
            _ => Default::default(),
        }
    }

    pub fn cat_code(&self, c: char) -> CatCode {
        match self.get(&Address::CatCode(c)) {
            Some(Binding::CatCode(code)) => *code,
            _ => CatCode::initex_default(c),
        }
    }

    pub fn font(&self, address: Address) -> FontId {
        match self.get(&address) {
            Some(Binding::Font(id)) => *id,
            _ => FontId::NULL_FONT,
        }
    }

    pub fn command(&self, command_ref: &CommandRef) -> Option<&Command<S>> {
        match self.get(&Address::Command(*command_ref)) {
            Some(Binding::Command(command)) => Some(command),
            _ => None,
        }
    }

    /// Binds a value.
    ///
    /// A local binding goes into the innermost group.
    /// A global binding goes into the root and removes every shadowing binding.
    pub fn set(&mut self, address: Address, binding: Binding<S>, scope: Scope) {
        match scope {
            Scope::Local => {
                self.groups[self.current].bindings.insert(address, binding);
            }
            Scope::Global => {
                let mut i = Some(self.current);
                while let Some(j) = i {
                    let group = &mut self.groups[j];
                    if group.parent.is_none() {
                        group.bindings.insert(address, binding);
                        return;
                    }
                    group.bindings.remove(&address);
                    i = group.parent;
                }
            }
        }
    }

    /// Makes the command undefined in the given scope.
    ///
    /// Locally this shadows any outer definition until the group ends.
    pub fn undefine(&mut self, command_ref: CommandRef, scope: Scope) {
        self.set(Address::Command(command_ref), Binding::Undefined, scope)
    }

    pub fn set_integer(&mut self, address: Address, value: i32, scope: Scope) {
        self.set(address, Binding::Integer(value), scope)
    }

    pub fn set_dimen(&mut self, address: Address, value: Scaled, scope: Scope) {
        self.set(address, Binding::Dimen(value), scope)
    }

    pub fn set_glue(&mut self, address: Address, value: Glue, scope: Scope) {
        self.set(address, Binding::Glue(value), scope)
    }

    pub fn set_token_list(&mut self, address: Address, value: Rc<Vec<Token>>, scope: Scope) {
        self.set(address, Binding::TokenList(value), scope)
    }

    pub fn set_cat_code(&mut self, c: char, value: CatCode, scope: Scope) {
        self.set(Address::CatCode(c), Binding::CatCode(value), scope)
    }

    pub fn set_font(&mut self, address: Address, value: FontId, scope: Scope) {
        self.set(address, Binding::Font(value), scope)
    }

    pub fn set_command(&mut self, command_ref: CommandRef, command: Command<S>, scope: Scope) {
        self.set(Address::Command(command_ref), Binding::Command(command), scope)
    }

    /// Opens a new group with no bindings.
    pub fn open(&mut self, kind: GroupKind, start: Option<Token>) {
        let level = self.level() + 1;
        log::debug!("opening {kind} at level {level}");
        let parent = self.current;
        self.groups
            .push(Group::new(kind, level, Some(parent), start));
        self.current = self.groups.len() - 1;
    }

    /// Closes the innermost group.
    ///
    /// Its bindings are discarded; its after group actions are returned in registration order.
    pub fn close(&mut self) -> Result<ClosedGroup<S>, NoGroupToEnd> {
        let parent = match self.groups[self.current].parent {
            None => return Err(NoGroupToEnd),
            Some(parent) => parent,
        };
        let group = match self.groups.pop() {
            None => return Err(NoGroupToEnd),
            Some(group) => group,
        };
        self.current = parent;
        log::debug!(
            "closing {} at level {} ({} local bindings discarded)",
            group.kind,
            group.level,
            group.bindings.len()
        );
        Ok(ClosedGroup {
            kind: group.kind,
            start: group.start,
            after_group_tokens: group.after_group_tokens,
            after_group_observers: group.after_group_observers,
        })
    }

    /// Queues a token to be inserted into the input when the current group closes.
    ///
    /// At the root this does nothing, like `\aftergroup` at the outer level of TeX.
    pub fn add_after_group_token(&mut self, token: Token) {
        if self.current != 0 {
            self.groups[self.current].after_group_tokens.push(token);
        }
    }

    /// Registers an action to run when the current group closes.
    pub fn add_after_group_observer(&mut self, observer: Observer<S>) {
        if self.current != 0 {
            self.groups[self.current].after_group_observers.push(observer);
        }
    }

    /// All command references that are currently bound.
    ///
    /// Slow; intended for error paths.
    pub fn command_refs(&self) -> Vec<CommandRef> {
        let mut refs: Vec<CommandRef> = vec![];
        for group in &self.groups {
            for (address, binding) in &group.bindings {
                if let (Address::Command(command_ref), Binding::Command(_)) = (address, binding) {
                    refs.push(*command_ref);
                }
            }
        }
        refs
    }
}

impl<S> CatCodeFn for Chain<S> {
    #[inline]
    fn cat_code(&self, c: char) -> CatCode {
        Chain::cat_code(self, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::trace;

    const X: Address = Address::Count(0);

    #[test]
    fn unset_registers_have_defaults() {
        let chain: Chain<()> = Default::default();
        assert_eq!(chain.integer(X), 0);
        assert_eq!(chain.integer(Address::Integer(IntegerParameter::Mag)), 1000);
        assert_eq!(chain.integer(Address::MathCode('a')), 0x7161);
        assert_eq!(chain.integer(Address::DelCode('.')), 0);
        assert_eq!(chain.integer(Address::DelCode('(')), -1);
        assert_eq!(chain.integer(Address::LcCode('Q')), 'q' as i32);
        assert_eq!(chain.dimen(Address::Dimen(7)), Scaled::ZERO);
        assert_eq!(chain.cat_code('\\'), CatCode::Escape);
        assert_eq!(chain.font(Address::CurrentFont), FontId::NULL_FONT);
        assert!(chain.token_list(Address::Toks(3)).is_empty());
    }

    #[test]
    fn scope_isolation() {
        let mut chain: Chain<()> = Default::default();
        chain.open(GroupKind::Simple, None);
        chain.set_integer(X, 5, Scope::Local);
        assert_eq!(chain.integer(X), 5);
        chain.close().unwrap();
        assert_eq!(chain.integer(X), 0);
    }

    #[test]
    fn nested_local_assignments() {
        let mut chain: Chain<()> = Default::default();
        chain.open(GroupKind::Simple, None);
        chain.set_integer(X, 5, Scope::Local);
        chain.open(GroupKind::Simple, None);
        chain.set_integer(X, 9, Scope::Local);
        assert_eq!(chain.integer(X), 9);
        chain.close().unwrap();
        assert_eq!(chain.integer(X), 5);
        chain.close().unwrap();
        assert_eq!(chain.integer(X), 0);
    }

    #[test]
    fn global_promotion() {
        let mut chain: Chain<()> = Default::default();
        chain.open(GroupKind::Simple, None);
        chain.set_integer(X, 3, Scope::Local);
        chain.open(GroupKind::SemiSimple, None);
        chain.set_integer(X, 7, Scope::Global);
        assert_eq!(chain.integer(X), 7);
        chain.close().unwrap();
        assert_eq!(chain.integer(X), 7);
        chain.close().unwrap();
        assert_eq!(chain.integer(X), 7);
    }

    #[test]
    fn local_after_global_is_undone() {
        let mut chain: Chain<()> = Default::default();
        chain.open(GroupKind::Simple, None);
        chain.set_integer(X, 7, Scope::Global);
        chain.set_integer(X, 2, Scope::Local);
        chain.close().unwrap();
        assert_eq!(chain.integer(X), 7);
    }

    #[test]
    fn closing_root_fails() {
        let mut chain: Chain<()> = Default::default();
        assert_eq!(chain.close().err(), Some(NoGroupToEnd));
        chain.open(GroupKind::Simple, None);
        assert!(chain.close().is_ok());
        assert_eq!(chain.close().err(), Some(NoGroupToEnd));
    }

    #[test]
    fn after_group_actions_in_registration_order() {
        let mut chain: Chain<Vec<i32>> = Default::default();
        let k = trace::Key::dummy();
        chain.add_after_group_token(Token::new_letter('z', k));
        chain.open(GroupKind::Simple, Some(Token::new_begin_group('{', k)));
        assert_eq!(chain.current().kind(), GroupKind::Simple);
        assert_eq!(chain.level(), 1);
        chain.add_after_group_token(Token::new_letter('a', k));
        chain.add_after_group_token(Token::new_letter('b', k));
        chain.add_after_group_observer(Box::new(|s: &mut Vec<i32>| s.push(1)));
        chain.add_after_group_observer(Box::new(|s: &mut Vec<i32>| s.push(2)));
        let closed = chain.close().unwrap();
        assert_eq!(closed.kind, GroupKind::Simple);
        assert_eq!(
            closed.after_group_tokens,
            vec![Token::new_letter('a', k), Token::new_letter('b', k)]
        );
        let mut state = vec![];
        for observer in closed.after_group_observers {
            observer(&mut state);
        }
        assert_eq!(state, vec![1, 2]);
    }

    #[test]
    fn cat_codes_are_scoped() {
        let mut chain: Chain<()> = Default::default();
        chain.open(GroupKind::Simple, None);
        chain.set_cat_code('@', CatCode::Letter, Scope::Local);
        assert_eq!(CatCodeFn::cat_code(&chain, '@'), CatCode::Letter);
        chain.close().unwrap();
        assert_eq!(CatCodeFn::cat_code(&chain, '@'), CatCode::Other);
    }

    #[test]
    fn parameter_names() {
        assert_eq!(DimenParameter::MathSurround.name(), "mathsurround");
        assert_eq!(MuGlueParameter::ALL.len(), 3);
        assert_eq!(TokenListParameter::EveryMathEnd.name(), "everymathend");
    }
}
