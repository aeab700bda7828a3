//! # Boxworks
//!
//! Node lists produced by the Texweave typesetting engine.
//! The lists are independent of the TeX language:
//!     they are built by the interpreter and the math typesetter,
//!     and then handed to an output backend.

pub mod node;
pub mod pack;
pub mod show;
