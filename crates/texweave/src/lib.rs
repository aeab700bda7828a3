//! # Texweave: the interpreter core of a TeX-compatible typesetting engine.
//!
//! This crate contains the parts of the engine that every primitive builds on:
//!     tokens and the lexer, the group chain that gives every register its scoping,
//!     the macro engine, the virtual machine with its token streams,
//!     and the scanners for the numbers, dimensions and glue of the TeX grammar.
//! The primitives themselves live in the `texweave-stdlib` crate
//!     and math typesetting in `texweave-math`.

pub mod command;
pub mod config;
pub mod error;
pub mod group;
pub mod parse;
pub mod prelude;
pub mod texmacro;
pub mod token;
pub mod variable;
pub mod vm;

/// Module that re-exports all of the crate's traits.
///
/// This is useful for getting all of the traits in scope in a Rust module:
/// ```
/// use texweave::traits::*;
/// ```
pub mod traits {
    pub use super::parse::Parsable;
    pub use super::vm::HasComponent;
    pub use super::vm::TexweaveState;
    pub use super::vm::TokenStream;
}
