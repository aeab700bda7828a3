//! Tracing system for determining the origin of a token.
//!
//! Each token carries a 32-bit [Key] rather than a file name and line number.
//! When source code is pushed onto the input, the [Tracer] allocates a contiguous
//!     range of keys large enough to give each character a unique key,
//!     and remembers which source code the range belongs to.
//! Tracing a token then means finding the range its key falls in and
//!     counting lines up to the key's offset.
//! This keeps tokens small, which matters in the expansion loop,
//!     while still supporting diagnostics that point at the offending character.

use crate::token::{CommandRef, CsNameInterner, Token, Value};
use std::collections::BTreeMap;
use std::ops::Bound::Included;
use std::path::PathBuf;

/// Key attached to tokens to enable tracing them.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Key(u32);

impl Key {
    /// A key that traces to nothing.
    ///
    /// Used for tokens that are synthesized by primitives.
    pub fn dummy() -> Key {
        Key(u32::MAX)
    }
}

/// Range of free keys that may be assigned to tokens.
#[derive(Debug)]
pub struct KeyRange {
    next: u32,
    limit: u32,
}

impl KeyRange {
    /// Get the next trace [Key].
    ///
    /// Once the range is exhausted the dummy key is returned.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Key {
        if self.next >= self.limit {
            return Key::dummy();
        }
        let n = self.next;
        self.next += 1;
        Key(n)
    }

    /// Peek at the next trace [Key].
    pub fn peek(&self) -> Key {
        if self.next >= self.limit {
            return Key::dummy();
        }
        Key(self.next)
    }

    pub fn empty() -> KeyRange {
        KeyRange { next: 0, limit: 0 }
    }

    #[cfg(test)]
    pub fn for_testing() -> KeyRange {
        KeyRange {
            next: 0,
            limit: u32::MAX - 1,
        }
    }
}

/// Where source code came from.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Origin {
    File(PathBuf),
    Terminal,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::File(path) => write!(f, "{}", path.display()),
            Origin::Terminal => write!(f, "<terminal>"),
        }
    }
}

/// A token trace.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SourceCodeTrace {
    /// Origin of the source code this token came from.
    pub origin: Origin,
    /// Content of the line this token came from.
    pub line_content: String,
    /// Number of the line within the file, starting at 1.
    pub line_number: usize,
    /// Index within the line that the token starts.
    pub index: usize,
    /// Value of the token as it appears in the source.
    pub value: String,
    /// If this is for a token, the token.
    /// Otherwise this is an end of input snippet.
    pub token: Option<Token>,
}

/// Data structure that records information for token tracing.
#[derive(Debug, Default)]
pub struct Tracer {
    checkpoints: BTreeMap<u32, Checkpoint>,
    next_key: u32,
    last_external_input: Option<u32>,
}

#[derive(Debug)]
struct Checkpoint {
    origin: Origin,
    content: String,
}

impl Tracer {
    /// Registers source code with the tracer.
    ///
    /// The first key in the returned range must be assigned to the first character
    ///     of the source code, the second key to the second character, and so on.
    /// The token is [None] when the source code is not being added by a primitive
    ///     like `\input`; end of input errors are traced to the last such source.
    pub fn register_source_code(
        &mut self,
        token: Option<Token>,
        origin: Origin,
        source_code: &str,
    ) -> KeyRange {
        // One extra key so that end of input can be traced even for empty input.
        let len = u32::try_from(source_code.chars().count())
            .unwrap_or(u32::MAX / 2)
            .saturating_add(1);
        let range = KeyRange {
            next: self.next_key,
            limit: self.next_key.saturating_add(len).min(u32::MAX - 1),
        };
        self.checkpoints.insert(
            range.next,
            Checkpoint {
                origin,
                content: source_code.to_string(),
            },
        );
        if token.is_none() {
            self.last_external_input = Some(self.next_key);
        }
        self.next_key = range.limit;
        range
    }

    /// Return a trace for the provided token.
    pub fn trace(&self, token: Token, cs_name_interner: &CsNameInterner) -> SourceCodeTrace {
        let value = match token.value() {
            Value::CommandRef(CommandRef::ControlSequence(cs_name)) => {
                format!["\\{}", cs_name_interner.resolve(cs_name).unwrap_or("")]
            }
            _ => token.char().map(String::from).unwrap_or_default(),
        };
        let key = token.trace_key().0;
        let checkpoint = if token.trace_key() == Key::dummy() {
            None
        } else {
            self.checkpoints
                .range((Included(&0), Included(&key)))
                .next_back()
        };
        let (first_key, checkpoint) = match checkpoint {
            None => {
                return SourceCodeTrace {
                    origin: Origin::Terminal,
                    line_content: value.clone(),
                    line_number: 1,
                    index: 0,
                    value,
                    token: Some(token),
                }
            }
            Some((first_key, checkpoint)) => (*first_key, checkpoint),
        };
        let char_offset = (key - first_key) as usize;
        let mut line_number = 1;
        let mut byte_line_start = 0;
        let mut char_line_start = 0;
        for (char_index, (byte_index, c)) in checkpoint.content.char_indices().enumerate() {
            if char_index == char_offset {
                break;
            }
            if c == '\n' {
                byte_line_start = byte_index + 1;
                char_line_start = char_index + 1;
                line_number += 1;
            }
        }
        let tail = &checkpoint.content[byte_line_start..];
        let line_content = match tail.split_once('\n') {
            None => tail.to_string(),
            Some((line, _)) => line.to_string(),
        };
        SourceCodeTrace {
            origin: checkpoint.origin.clone(),
            line_content,
            line_number,
            index: char_offset.saturating_sub(char_line_start),
            value,
            token: Some(token),
        }
    }

    /// Return a trace pointing just after the last non-blank character of the input.
    pub fn trace_end_of_input(&self) -> SourceCodeTrace {
        let checkpoint = self
            .last_external_input
            .and_then(|key| self.checkpoints.get(&key));
        let checkpoint = match checkpoint {
            None => {
                return SourceCodeTrace {
                    origin: Origin::Terminal,
                    line_content: String::new(),
                    line_number: 1,
                    index: 0,
                    value: " ".to_string(),
                    token: None,
                }
            }
            Some(checkpoint) => checkpoint,
        };
        let mut line_number = 0;
        let mut line_start = 0;
        let mut last_non_empty_line = (0, 0);
        for (i, c) in checkpoint.content.char_indices() {
            if !c.is_whitespace() {
                last_non_empty_line = (line_number, line_start);
            } else if c == '\n' {
                line_number += 1;
                line_start = i + 1;
            }
        }
        let line = checkpoint.content[last_non_empty_line.1..]
            .lines()
            .next()
            .unwrap_or("")
            .trim_end();
        SourceCodeTrace {
            origin: checkpoint.origin.clone(),
            line_content: line.to_string(),
            line_number: last_non_empty_line.0 + 1,
            index: line.chars().count(),
            value: " ".to_string(),
            token: None,
        }
    }
}
