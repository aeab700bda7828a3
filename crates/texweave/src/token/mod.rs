//! TeX tokens and category codes.

mod catcode;
pub mod lexer;
pub mod trace;

pub use catcode::CatCode;
use std::collections::HashMap;
use std::num;
use std::rc::Rc;

/// Interned name of a control sequence.
///
/// The value is opaque; use a [CsNameInterner] to recover the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CsName(num::NonZeroU32);

impl CsName {
    #[inline]
    pub fn to_usize(&self) -> usize {
        self.0.get() as usize
    }
}

/// String interner for control sequence names.
///
/// Interned names are never deallocated.
#[derive(Debug, Default)]
pub struct CsNameInterner {
    names: Vec<Rc<str>>,
    keys: HashMap<Rc<str>, CsName>,
}

impl CsNameInterner {
    /// Returns the key for the provided name, interning the name if needed.
    pub fn get_or_intern(&mut self, name: &str) -> CsName {
        if let Some(key) = self.keys.get(name) {
            return *key;
        }
        let name: Rc<str> = name.into();
        self.names.push(name.clone());
        let raw = u32::try_from(self.names.len()).unwrap_or(u32::MAX);
        let key = CsName(num::NonZeroU32::new(raw).unwrap_or(num::NonZeroU32::MAX));
        self.keys.insert(name, key);
        key
    }

    /// Returns the key for the provided name, if it has been interned.
    pub fn get(&self, name: &str) -> Option<CsName> {
        self.keys.get(name).copied()
    }

    pub fn resolve(&self, key: CsName) -> Option<&str> {
        self.names.get(key.to_usize() - 1).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The value of a token.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub enum Value {
    BeginGroup(char),
    EndGroup(char),
    MathShift(char),
    AlignmentTab(char),
    Parameter(char),
    Superscript(char),
    Subscript(char),
    Space(char),
    Letter(char),
    Other(char),
    CommandRef(CommandRef),
}

/// The value of a token that references a command.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub enum CommandRef {
    ControlSequence(CsName),
    ActiveCharacter(char),
}

impl CommandRef {
    pub fn to_string(&self, cs_name_interner: &CsNameInterner) -> String {
        match self {
            CommandRef::ControlSequence(cs_name) => {
                format!("\\{}", cs_name_interner.resolve(*cs_name).unwrap_or(""))
            }
            CommandRef::ActiveCharacter(c) => format!("{c}"),
        }
    }
}

impl Value {
    /// Builds the value of a character token.
    ///
    /// Returns [None] for the category codes that never leave the lexer.
    pub fn try_new(c: char, cat_code: CatCode) -> Option<Value> {
        Some(match cat_code {
            CatCode::BeginGroup => Value::BeginGroup(c),
            CatCode::EndGroup => Value::EndGroup(c),
            CatCode::MathShift => Value::MathShift(c),
            CatCode::AlignmentTab => Value::AlignmentTab(c),
            CatCode::Parameter => Value::Parameter(c),
            CatCode::Superscript => Value::Superscript(c),
            CatCode::Subscript => Value::Subscript(c),
            CatCode::Space => Value::Space(c),
            CatCode::Letter => Value::Letter(c),
            CatCode::Other => Value::Other(c),
            CatCode::Active => Value::CommandRef(CommandRef::ActiveCharacter(c)),
            CatCode::Escape
            | CatCode::EndOfLine
            | CatCode::Ignored
            | CatCode::Comment
            | CatCode::Invalid => return None,
        })
    }
}

/// A TeX token.
///
/// Equality only considers the value; the trace key is ignored.
#[derive(Debug, Eq, Clone, Copy)]
pub struct Token {
    value: Value,
    trace_key: trace::Key,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state)
    }
}

macro_rules! token_constructor {
    ($name: ident, $value: expr) => {
        pub fn $name(c: char, trace_key: trace::Key) -> Token {
            Token {
                value: $value(c),
                trace_key,
            }
        }
    };
}

impl Token {
    token_constructor!(new_begin_group, Value::BeginGroup);
    token_constructor!(new_end_group, Value::EndGroup);
    token_constructor!(new_math_shift, Value::MathShift);
    token_constructor!(new_alignment_tab, Value::AlignmentTab);
    token_constructor!(new_parameter, Value::Parameter);
    token_constructor!(new_superscript, Value::Superscript);
    token_constructor!(new_subscript, Value::Subscript);
    token_constructor!(new_space, Value::Space);
    token_constructor!(new_letter, Value::Letter);
    token_constructor!(new_other, Value::Other);

    pub fn new_active_character(c: char, trace_key: trace::Key) -> Token {
        Token {
            value: Value::CommandRef(CommandRef::ActiveCharacter(c)),
            trace_key,
        }
    }

    pub fn new_control_sequence(name: CsName, trace_key: trace::Key) -> Token {
        Token {
            value: Value::CommandRef(CommandRef::ControlSequence(name)),
            trace_key,
        }
    }

    pub fn new_from_value(value: Value, trace_key: trace::Key) -> Token {
        Token { value, trace_key }
    }

    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    #[inline]
    pub fn trace_key(&self) -> trace::Key {
        self.trace_key
    }

    pub fn char(&self) -> Option<char> {
        match self.value {
            Value::BeginGroup(c)
            | Value::EndGroup(c)
            | Value::MathShift(c)
            | Value::AlignmentTab(c)
            | Value::Parameter(c)
            | Value::Superscript(c)
            | Value::Subscript(c)
            | Value::Space(c)
            | Value::Letter(c)
            | Value::Other(c) => Some(c),
            Value::CommandRef(CommandRef::ActiveCharacter(c)) => Some(c),
            Value::CommandRef(CommandRef::ControlSequence(_)) => None,
        }
    }

    pub fn cat_code(&self) -> Option<CatCode> {
        match self.value {
            Value::BeginGroup(_) => Some(CatCode::BeginGroup),
            Value::EndGroup(_) => Some(CatCode::EndGroup),
            Value::MathShift(_) => Some(CatCode::MathShift),
            Value::AlignmentTab(_) => Some(CatCode::AlignmentTab),
            Value::Parameter(_) => Some(CatCode::Parameter),
            Value::Superscript(_) => Some(CatCode::Superscript),
            Value::Subscript(_) => Some(CatCode::Subscript),
            Value::Space(_) => Some(CatCode::Space),
            Value::Letter(_) => Some(CatCode::Letter),
            Value::Other(_) => Some(CatCode::Other),
            Value::CommandRef(CommandRef::ActiveCharacter(_)) => Some(CatCode::Active),
            Value::CommandRef(CommandRef::ControlSequence(_)) => None,
        }
    }
}

/// Writes tokens the way TeX displays token lists in diagnostics.
///
/// A control word (one made of letters) is followed by a space;
///     a control symbol like `\%` is not.
/// Parameter characters are doubled, as in `\showthe`.
///
/// TeX.2021.292-294.
pub fn write_tokens<'a, T>(tokens: T, interner: &CsNameInterner) -> String
where
    T: IntoIterator<Item = &'a Token>,
{
    let mut s = String::new();
    for token in tokens {
        match token.value() {
            Value::CommandRef(CommandRef::ControlSequence(cs_name)) => {
                let name = interner.resolve(cs_name).unwrap_or("");
                s.push('\\');
                s.push_str(name);
                let mut chars = name.chars();
                let is_control_word = match (chars.next(), chars.next()) {
                    (Some(c), None) => c.is_alphabetic(),
                    (None, _) => false,
                    (Some(_), Some(_)) => true,
                };
                if is_control_word {
                    s.push(' ');
                }
            }
            Value::Parameter(c) => {
                s.push(c);
                s.push(c);
            }
            _ => {
                if let Some(c) = token.char() {
                    s.push(c);
                }
            }
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner() {
        let mut interner = CsNameInterner::default();
        let a = interner.get_or_intern("alpha");
        let b = interner.get_or_intern("beta");
        assert_eq!(interner.get_or_intern("alpha"), a);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(b), Some("beta"));
        assert_eq!(interner.get("gamma"), None);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn equality_ignores_trace_key() {
        let k = trace::Key::dummy();
        assert_eq!(Token::new_letter('a', k), Token::new_letter('a', trace::Key::dummy()));
        assert_ne!(Token::new_letter('a', k), Token::new_other('a', k));
    }

    #[test]
    fn write_tokens_like_tex() {
        let mut interner = CsNameInterner::default();
        let k = trace::Key::dummy();
        let tokens = vec![
            Token::new_control_sequence(interner.get_or_intern("def"), k),
            Token::new_control_sequence(interner.get_or_intern("%"), k),
            Token::new_parameter('#', k),
            Token::new_other('1', k),
            Token::new_begin_group('{', k),
            Token::new_letter('x', k),
            Token::new_end_group('}', k),
        ];
        assert_eq!(write_tokens(&tokens, &interner), "\\def \\%##1{x}");
    }

    #[test]
    fn raw_cat_codes_have_no_value() {
        assert_eq!(Value::try_new('\\', CatCode::Escape), None);
        assert_eq!(
            Value::try_new('a', CatCode::Letter),
            Some(Value::Letter('a'))
        );
    }
}
