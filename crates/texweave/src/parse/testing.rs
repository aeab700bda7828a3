use crate::command::{BuiltIn, Command};
use crate::group::{Address, IntegerParameter, Scope};
use crate::prelude as txl;
use crate::token::{trace, Token};
use crate::traits::*;
use crate::{error, variable, vm};
use common::{Glue, GlueComponent, Scaled};
use font::{FontId, MetricFont};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::rc::Rc;

/// Commands available in parsing tests, and the values they start with:
///
/// - `\testcount`: the integer `\mag`, 1000.
/// - `\testdimen`: 2.5pt.
/// - `\testskip`: 1pt plus 2fil minus 3pt.
/// - `\testmuskip`: 3mu.
/// - `\testtoks`: the tokens `xyz`.
/// - `\testchar` and `\testmathchar`: `A` and `"7161`.
/// - `\testfont`: the current font, with an x-height of 4pt and a quad of 10pt.
fn built_ins<S: TexweaveState>() -> HashMap<&'static str, BuiltIn<S>> {
    let static_variable = |address| BuiltIn::new_variable(variable::Command::new_static(address));
    HashMap::from([
        ("testcount", static_variable(Address::Integer(IntegerParameter::Mag))),
        ("testdimen", static_variable(Address::Dimen(0))),
        ("testskip", static_variable(Address::Skip(0))),
        ("testmuskip", static_variable(Address::MuSkip(0))),
        ("testtoks", static_variable(Address::Toks(0))),
        ("testchar", Command::Character('A').into()),
        ("testmathchar", Command::MathCharacter(0x7161).into()),
        ("testfont", Command::Font(FontId(1)).into()),
    ])
}

pub fn new_vm_with_state<S: TexweaveState + Default>(source: &str) -> Box<vm::VM<S>> {
    let mut vm = vm::VM::<S>::new(built_ins());
    vm.set_plain_tex_cat_codes();
    let font = MetricFont::new("testfont", Scaled::ONE * 10).with_params(vec![
        Scaled::ZERO,
        Scaled::ZERO,
        Scaled::ZERO,
        Scaled::ZERO,
        Scaled::ONE * 4,
        Scaled::ONE * 10,
    ]);
    let font_id = vm.fonts.insert(Rc::new(font));
    let k = trace::Key::dummy();
    let chain = vm::ExecutionInput::new(&mut vm).chain_mut();
    chain.set_font(Address::CurrentFont, font_id, Scope::Global);
    chain.set_dimen(Address::Dimen(0), Scaled(163840), Scope::Global);
    chain.set_glue(
        Address::Skip(0),
        Glue {
            width: GlueComponent::finite(Scaled::ONE),
            stretch: GlueComponent::new(Scaled::TWO.0 as i64, 1),
            shrink: GlueComponent::finite(Scaled::ONE * 3),
        },
        Scope::Global,
    );
    chain.set_glue(Address::MuSkip(0), Glue::rigid(Scaled::ONE * 3), Scope::Global);
    chain.set_token_list(
        Address::Toks(0),
        Rc::new(vec![
            Token::new_letter('x', k),
            Token::new_letter('y', k),
            Token::new_letter('z', k),
        ]),
        Scope::Global,
    );
    vm.push_source("", source);
    vm
}

pub fn new_vm(source: &str) -> Box<vm::VM<()>> {
    new_vm_with_state(source)
}

pub fn run_parse_success_test<T: Parsable<()> + Debug + Eq>(source: &str, want: T) {
    let mut vm = new_vm(source);
    let input = vm::ExecutionInput::new(&mut vm);
    let got = T::parse(input).unwrap();
    assert_eq!(got, want);
}

pub fn run_parse_failure_test<T: Parsable<()> + Debug>(source: &str) {
    let mut vm = new_vm(source);
    let input = vm::ExecutionInput::new(&mut vm);
    let result = T::parse(input);
    if let Ok(value) = result {
        panic![
            "Successfully parsed a value '{value:?}' of type '{}' from invalid input '{source}'",
            std::any::type_name::<T>()
        ];
    }
}

/// State that recovers from every error and counts them.
#[derive(Default)]
pub struct RecoveringState {
    errors: Cell<usize>,
}

impl TexweaveState for RecoveringState {
    fn recoverable_error_hook(vm: &vm::VM<Self>, _: Box<error::Error>) -> txl::Result<()> {
        vm.state.errors.set(vm.state.errors.get() + 1);
        Ok(())
    }
}

/// Parses the value and returns it together with the number of recoverable errors.
pub fn run_parse_recovery_test<T: Parsable<RecoveringState>>(source: &str) -> (T, usize) {
    let mut vm = new_vm_with_state::<RecoveringState>(source);
    let input = vm::ExecutionInput::new(&mut vm);
    let got = T::parse(input).unwrap();
    (got, vm.state.errors.get())
}

macro_rules! parse_success_tests {
    ($( ($name: ident, $input: expr, $expected: expr $(,)? ) ),+ $(,)? ) => {
        $(
        #[test]
        fn $name() {
            let source = $input;
            let want = $expected;
            run_parse_success_test(&source, want);
        }
        )+
    };
}

pub(crate) use parse_success_tests;

macro_rules! parse_failure_tests {
    ( $parsable_type: ty, $( ($name: ident, $input: expr) ),+ $(,)? ) => {
        $(
        #[test]
        fn $name() {
            let input = $input;
            run_parse_failure_test::<$parsable_type>(&input);
        }
        )+
    };
}

pub(crate) use parse_failure_tests;
