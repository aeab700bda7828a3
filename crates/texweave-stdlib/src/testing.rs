//! Unit testing helpers shared by the modules of this crate.

use std::collections::HashMap;

use crate::{conditional, errormode, job, prefix, typeset};
use texweave::command;
use texweave::config::EngineConfig;
use texweave::group::Scope;
use texweave::prelude as txl;
use texweave::token::Token;
use texweave::traits::*;
use texweave::vm::{self, implement_has_component, VM};
pub use texweave_testing::*;

/// State with every standard library component, for use in unit tests.
///
/// Recoverable errors are handled by the [TestingComponent] rather than the interaction mode.
#[derive(Default)]
pub struct State {
    pub conditional: conditional::Component,
    pub errormode: errormode::Component,
    pub job: job::Component,
    pub math: texweave_math::Component,
    pub prefix: prefix::Component,
    pub typeset: typeset::Component,
    pub testing: TestingComponent,
}

impl TexweaveState for State {
    fn post_macro_expansion_hook(
        token: Token,
        input: &vm::ExpansionInput<Self>,
        tex_macro: &texweave::texmacro::Macro,
        arguments: &[&[Token]],
        reversed_expansion: &[Token],
    ) {
        crate::tracingmacros::hook(token, input, tex_macro, arguments, reversed_expansion)
    }

    fn expansion_override_hook(
        token: Token,
        input: &mut vm::ExpansionInput<Self>,
        tag: Option<command::Tag>,
    ) -> txl::Result<Option<Token>> {
        crate::expansion::noexpand_hook(token, input, tag)
    }

    fn recoverable_error_hook(
        vm: &VM<Self>,
        recoverable_error: Box<texweave::error::Error>,
    ) -> txl::Result<()> {
        TestingComponent::recoverable_error_hook(vm, recoverable_error)
    }

    fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
        prefix::variable_assignment_scope_hook(state)
    }
}

implement_has_component![
    State,
    (conditional::Component, conditional),
    (errormode::Component, errormode),
    (job::Component, job),
    (texweave_math::Component, math),
    (prefix::Component, prefix),
    (typeset::Component, typeset),
    (TestingComponent, testing),
];

/// All of the built-in commands, plus `\assertGlobalIsFalse`.
pub fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
    let mut m = crate::all_built_ins();
    m.insert("assertGlobalIsFalse", prefix::get_assert_global_is_false());
    m
}

/// Returns source code that produces the same tokens as `\the` or `\meaning` would for the string.
///
/// Every character other than a space becomes an other token.
/// The helper macro `\!` is invoked with a control symbol so that it keeps working
///     after the category codes of letters change.
/// The escape character is changed last.
/// A letter is followed by a space so that its control word does not run into `s`.
pub fn the_output(s: &str) -> String {
    let mut source = String::from(r"\def\!#1{\catcode`#1=12 }");
    let mut seen = std::collections::HashSet::new();
    for c in s.chars() {
        if c == ' ' || c == '\\' || !seen.insert(c) {
            continue;
        }
        source.push_str(r"\!\");
        source.push(c);
        if c.is_ascii_alphabetic() {
            // ends the control word before the next letter
            source.push(' ');
        }
    }
    if s.contains('\\') {
        source.push_str(r"\!\\");
    }
    source.push_str(s);
    source
}

/// Uses the fonts of the default configuration: cmr10, cmmi10, cmsy10 and cmex10.
pub fn with_default_fonts(vm: &mut VM<State>) {
    vm.font_factory = EngineConfig::default().font_factory();
}

#[cfg(test)]
mod tests {
    use super::*;

    test_suite![
        expansion_equality_tests(
            (the_output_letters, r"\the\count1 \meaning a", the_output("0the letter a")),
            (the_output_starting_with_a_letter, r"\meaning a", the_output("the letter a")),
            (the_output_escape, r"\meaning\relax", the_output(r"\relax")),
        ),
    ];
}
