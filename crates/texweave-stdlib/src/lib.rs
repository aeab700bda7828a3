//! # The Texweave standard library
//!
//! This crate contains implementations of TeX primitives for Texweave,
//!     a state type that is compatible with all of them,
//!     and the handlers that connect the VM to the typesetter.

use std::collections::HashMap;
use std::io::Write;

use texweave::command;
use texweave::config::EngineConfig;
use texweave::group::{Address, IntegerParameter, Scope};
use texweave::prelude as txl;
use texweave::token::Token;
use texweave::traits::*;
use texweave::vm;
use texweave::vm::implement_has_component;

pub mod alias;
pub mod backend;
pub mod chardef;
pub mod codes;
pub mod conditional;
pub mod def;
pub mod errormode;
pub mod expansion;
pub mod font;
pub mod format;
pub mod grouping;
pub mod job;
pub mod parameters;
pub mod prefix;
pub mod registers;
pub mod the;
pub mod time;
pub mod tracingmacros;
pub mod typeset;
pub mod variableops;

#[cfg(test)]
mod testing;

/// States that have every component the standard library needs.
pub trait StdLibComponents:
    HasComponent<conditional::Component>
    + HasComponent<errormode::Component>
    + HasComponent<job::Component>
    + HasComponent<prefix::Component>
    + typeset::TypesetState
{
}

impl<S> StdLibComponents for S where
    S: HasComponent<conditional::Component>
        + HasComponent<errormode::Component>
        + HasComponent<job::Component>
        + HasComponent<prefix::Component>
        + typeset::TypesetState
{
}

/// Returns all of the primitives in the standard library.
pub fn all_built_ins<S: StdLibComponents>() -> HashMap<&'static str, command::BuiltIn<S>> {
    let mut m = HashMap::from([
        ("advance", variableops::get_advance()),
        ("aftergroup", grouping::get_aftergroup()),
        ("batchmode", errormode::get_batchmode()),
        ("begingroup", grouping::get_begingroup()),
        //
        ("catcode", codes::get_catcode()),
        ("chardef", chardef::get_chardef()),
        ("count", registers::get_count()),
        ("countdef", registers::get_countdef()),
        //
        ("def", def::get_def()),
        ("delcode", codes::get_delcode()),
        ("dimen", registers::get_dimen()),
        ("dimendef", registers::get_dimendef()),
        ("divide", variableops::get_divide()),
        ("dump", job::get_dump()),
        //
        ("edef", def::get_edef()),
        ("else", conditional::get_else()),
        ("endgroup", grouping::get_endgroup()),
        ("errorstopmode", errormode::get_errorstopmode()),
        ("expandafter", expansion::get_expandafter()),
        //
        ("fi", conditional::get_fi()),
        ("font", font::get_font()),
        //
        ("gdef", def::get_gdef()),
        ("global", prefix::get_global()),
        //
        ("hskip", typeset::get_hskip()),
        //
        ("ifcase", conditional::get_if_case()),
        ("iffalse", conditional::get_if_false()),
        ("ifnum", conditional::get_if_num()),
        ("ifodd", conditional::get_if_odd()),
        ("iftrue", conditional::get_if_true()),
        ("ifx", conditional::get_if_x()),
        //
        ("jobname", job::get_jobname()),
        //
        ("kern", typeset::get_kern()),
        //
        ("lccode", codes::get_lccode()),
        ("let", alias::get_let()),
        ("long", prefix::get_long()),
        //
        ("mathchardef", chardef::get_mathchardef()),
        ("mathcode", codes::get_mathcode()),
        ("meaning", the::get_meaning()),
        ("multiply", variableops::get_multiply()),
        ("muskip", registers::get_muskip()),
        ("muskipdef", registers::get_muskipdef()),
        //
        ("noexpand", expansion::get_noexpand()),
        ("nonstopmode", errormode::get_nonstopmode()),
        ("nullfont", font::get_nullfont()),
        //
        ("or", conditional::get_or()),
        ("outer", prefix::get_outer()),
        //
        ("par", typeset::get_par()),
        ("penalty", typeset::get_penalty()),
        //
        ("relax", expansion::get_relax()),
        //
        ("scriptfont", font::get_scriptfont()),
        ("scriptscriptfont", font::get_scriptscriptfont()),
        ("scrollmode", errormode::get_scrollmode()),
        ("sfcode", codes::get_sfcode()),
        ("skip", registers::get_skip()),
        ("skipdef", registers::get_skipdef()),
        //
        ("textfont", font::get_textfont()),
        ("the", the::get_the()),
        ("toks", registers::get_toks()),
        ("toksdef", registers::get_toksdef()),
        //
        ("uccode", codes::get_uccode()),
        //
        ("xdef", def::get_xdef()),
        //
        ("above", texweave_math::get_above()),
        ("atop", texweave_math::get_atop()),
        ("left", texweave_math::get_left()),
        ("middle", texweave_math::get_middle()),
        ("mkern", texweave_math::get_mkern()),
        ("mskip", texweave_math::get_mskip()),
        ("over", texweave_math::get_over()),
        ("right", texweave_math::get_right()),
    ]);
    m.extend(parameters::get_all());
    m
}

/// A state struct that is compatible with every primitive in the standard library.
#[derive(Default)]
pub struct StdLibState {
    pub conditional: conditional::Component,
    pub errormode: errormode::Component,
    pub job: job::Component,
    pub math: texweave_math::Component,
    pub prefix: prefix::Component,
    pub typeset: typeset::Component,
}

impl TexweaveState for StdLibState {
    #[inline]
    fn post_macro_expansion_hook(
        token: Token,
        input: &vm::ExpansionInput<Self>,
        tex_macro: &texweave::texmacro::Macro,
        arguments: &[&[Token]],
        reversed_expansion: &[Token],
    ) {
        tracingmacros::hook(token, input, tex_macro, arguments, reversed_expansion)
    }

    #[inline]
    fn expansion_override_hook(
        token: Token,
        input: &mut vm::ExpansionInput<Self>,
        tag: Option<command::Tag>,
    ) -> txl::Result<Option<Token>> {
        expansion::noexpand_hook(token, input, tag)
    }

    fn recoverable_error_hook(
        vm: &vm::VM<Self>,
        recoverable_error: Box<texweave::error::Error>,
    ) -> txl::Result<()> {
        errormode::recoverable_error_hook(vm, recoverable_error)
    }

    #[inline]
    fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
        prefix::variable_assignment_scope_hook(state)
    }
}

implement_has_component![
    StdLibState,
    (conditional::Component, conditional),
    (errormode::Component, errormode),
    (job::Component, job),
    (texweave_math::Component, math),
    (prefix::Component, prefix),
    (typeset::Component, typeset),
];

/// Handlers that send characters to the typesetter.
pub struct StdLibHandlers;

impl<S: StdLibComponents> vm::Handlers<S> for StdLibHandlers {
    fn character_handler(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
        typeset::character_handler(token, input)
    }

    fn math_character_handler(
        token: Token,
        input: &mut vm::ExecutionInput<S>,
        _: u32,
    ) -> txl::Result<()> {
        typeset::math_character_handler(token, input)
    }
}

/// Creates a VM configured by the engine configuration.
///
/// Finished lists are shipped to the configured backend, which writes to `out`.
pub fn new_vm(config: &EngineConfig, out: Box<dyn Write>) -> Box<vm::VM<StdLibState>> {
    let mut vm = vm::VM::<StdLibState>::new(all_built_ins());
    vm.set_plain_tex_cat_codes();
    vm.font_factory = config.font_factory();
    vm.state.errormode = errormode::Component::new(config.interaction);
    vm.state
        .typeset
        .set_backend(backend::new_backend(config.backend, out));
    vm.chain_mut().set_integer(
        Address::Integer(IntegerParameter::Mag),
        config.magnification,
        Scope::Global,
    );
    time::initialize(&mut vm, time::Timestamp::now());
    vm
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use texweave::config::{BackendKind, InteractionMode};

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn run(config: &EngineConfig, source: &str) -> (txl::Result<()>, String) {
        let out = SharedBuffer::default();
        let mut vm = new_vm(config, Box::new(out.clone()));
        vm.push_source("input.tex", format!("{}{source}", format::PLAIN));
        let result = vm
            .run::<StdLibHandlers>()
            .and_then(|()| typeset::finish(&mut vm));
        let output = String::from_utf8(out.0.borrow().clone()).unwrap();
        (result, output)
    }

    #[test]
    fn all_built_ins_contents() {
        let built_ins = all_built_ins::<StdLibState>();
        assert!(built_ins.contains_key("def"));
        assert!(built_ins.contains_key("mathsurround"));
        assert!(built_ins.contains_key("tracingmacros"));
        assert!(!built_ins.contains_key("undefined"));
    }

    #[test]
    fn text_backend_end_to_end() {
        let (result, output) = run(&EngineConfig::default(), r"Hello $x+1$\par world");
        result.unwrap();
        assert!(output.starts_with("Completed list 1:\n\\vbox("), "{output}");
        assert!(output.contains("\\mathon"), "{output}");
        assert!(output.contains("Completed list 2:"), "{output}");
        assert!(!output.contains("Completed list 3:"), "{output}");
    }

    #[test]
    fn json_backend_end_to_end() {
        let config = EngineConfig {
            backend: BackendKind::Json,
            ..Default::default()
        };
        let (result, output) = run(&config, r"a$$x$$b");
        result.unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2]["index"], 3);
        assert_eq!(lines[0]["fonts"]["1"], "cmr10");
    }

    #[test]
    fn interaction_mode_from_config() {
        let config = EngineConfig {
            interaction: InteractionMode::Batch,
            ..Default::default()
        };
        let (result, _) = run(&config, r"\divide\count1 by 0 a");
        result.unwrap();
        let (result, _) = run(&EngineConfig::default(), r"\divide\count1 by 0 a");
        assert!(result.is_err());
    }

    #[test]
    fn magnification_from_config() {
        let config = EngineConfig {
            magnification: 2000,
            ..Default::default()
        };
        let out = SharedBuffer::default();
        let vm = new_vm(&config, Box::new(out));
        assert_eq!(
            vm.chain().integer(Address::Integer(IntegerParameter::Mag)),
            2000
        );
    }
}
