//! Test harness for Texweave primitives.
//!
//! Tests run a TeX snippet in a fresh VM and check the outcome.
//! The VM starts with the plain TeX category codes,
//!     and character tokens that reach the main loop are recorded as the output.
//!
//! The state type of a test needs three things:
//! it is [Default], it holds a [TestingComponent],
//!     and its `recoverable_error_hook` calls [TestingComponent::recoverable_error_hook].
//! The [State] in this crate is the smallest such type.
//!
//! There are four kinds of test, usually written with [test_suite]:
//!
//! - expansion equality: two snippets produce the same output,
//!     for example `\def\a{xy}\a\a` and `xyxy`.
//! - failure: the snippet fails with an error.
//! - recoverable failure: the snippet reports a recoverable error;
//!     with recovery on it produces a given output, with recovery off it fails.
//! - state: the snippet runs and a closure inspects the final state.

use std::cell::Cell;
use std::collections::HashMap;

use texweave::token::{CommandRef, Token, Value};
use texweave::traits::*;
use texweave::vm::{self, VM};
use texweave::prelude as txl;
use texweave::*;

/// Component that every testing state holds.
#[derive(Default)]
pub struct TestingComponent {
    allow_undefined_command: bool,
    recover_from_errors: bool,
    num_recovered_errors: Cell<usize>,
    tokens: Vec<Token>,
}

impl TestingComponent {
    /// Error hook for testing states: counts the error when recovery is on, fails otherwise.
    pub fn recoverable_error_hook<S: HasComponent<Self>>(
        vm: &VM<S>,
        recoverable_error: Box<error::Error>,
    ) -> Result<(), Box<error::Error>> {
        let component = vm.state.component();
        if !component.recover_from_errors {
            return Err(recoverable_error);
        }
        println!("recovered from error: {}", recoverable_error.title());
        component
            .num_recovered_errors
            .set(component.num_recovered_errors.get() + 1);
        Ok(())
    }

    /// Adds a token to the test output; for handlers that produce something other than characters.
    pub fn push_token(&mut self, token: Token) {
        self.tokens.push(token);
    }
}

/// Minimal testing state.
#[derive(Default)]
pub struct State {
    testing: TestingComponent,
}

impl TexweaveState for State {
    fn recoverable_error_hook(
        vm: &VM<Self>,
        recoverable_error: Box<error::Error>,
    ) -> Result<(), Box<error::Error>> {
        TestingComponent::recoverable_error_hook(vm, recoverable_error)
    }
}

implement_has_component![State, TestingComponent, testing];

/// Configuration of a test. Later options win over earlier ones.
pub enum TestOption<S> {
    /// Primitives to build the VM with. Defaults to none.
    BuiltInCommands(fn() -> HashMap<&'static str, command::BuiltIn<S>>),
    /// Called on the new VM before the snippet is pushed.
    CustomVMInitialization(fn(&mut VM<S>)),
    /// Record undefined control sequences in the output instead of failing.
    AllowUndefinedCommands(bool),
    /// Let [TestingComponent::recoverable_error_hook] recover.
    RecoverFromErrors(bool),
}

struct Options<S> {
    built_in_commands: fn() -> HashMap<&'static str, command::BuiltIn<S>>,
    initialize: fn(&mut VM<S>),
    allow_undefined_commands: bool,
    recover_from_errors: bool,
}

impl<S> Options<S> {
    fn new(options: &[TestOption<S>]) -> Self {
        let mut resolved = Options {
            built_in_commands: HashMap::new,
            initialize: |_| {},
            allow_undefined_commands: false,
            recover_from_errors: false,
        };
        for option in options {
            match option {
                TestOption::BuiltInCommands(f) => resolved.built_in_commands = *f,
                TestOption::CustomVMInitialization(f) => resolved.initialize = *f,
                TestOption::AllowUndefinedCommands(b) => resolved.allow_undefined_commands = *b,
                TestOption::RecoverFromErrors(b) => resolved.recover_from_errors = *b,
            }
        }
        resolved
    }
}

/// Output of one snippet.
struct Run<S> {
    vm: Box<VM<S>>,
    result: Result<Vec<Token>, Box<error::Error>>,
    num_recovered_errors: usize,
}

impl<S> Run<S> {
    fn render(&self, tokens: &[Token]) -> String {
        token::write_tokens(tokens, self.vm.cs_name_interner())
    }
}

fn run<S, H>(source: &str, options: &Options<S>) -> Run<S>
where
    S: Default + HasComponent<TestingComponent>,
    H: vm::Handlers<S>,
{
    let mut vm = VM::<S>::new((options.built_in_commands)());
    vm.set_plain_tex_cat_codes();
    (options.initialize)(&mut vm);
    vm.push_source("testing.tex", source);
    let component = vm.state.component_mut();
    component.allow_undefined_command = options.allow_undefined_commands;
    component.recover_from_errors = options.recover_from_errors;
    let result = vm
        .run::<H>()
        .map(|()| std::mem::take(&mut vm.state.component_mut().tokens));
    let num_recovered_errors = vm.state.component().num_recovered_errors.get();
    Run {
        vm,
        result,
        num_recovered_errors,
    }
}

/// Checks that `lhs` and `rhs` produce the same output, ignoring a trailing space.
///
/// Control sequences are compared by name since the two VMs have separate interners.
pub fn run_expansion_equality_test<S, H>(
    lhs: &str,
    rhs: &str,
    expect_recoverable_errors: bool,
    options: &[TestOption<S>],
) where
    S: Default + HasComponent<TestingComponent>,
    H: vm::Handlers<S>,
{
    let options = Options::new(options);
    let left = run::<S, H>(lhs, &options);
    let right = run::<S, H>(rhs, &options);
    let (left_tokens, right_tokens) = match (&left.result, &right.result) {
        (Ok(l), Ok(r)) => (trim_trailing_space(l), trim_trailing_space(r)),
        (Err(err), _) | (_, Err(err)) => panic!("snippet failed:\n{err}"),
    };
    let same = left_tokens.len() == right_tokens.len()
        && left_tokens
            .iter()
            .zip(right_tokens)
            .all(|(l, r)| same_token(l, &left.vm, r, &right.vm));
    if !same {
        panic!(
            "outputs differ\n  lhs: '{}'\n  rhs: '{}'",
            left.render(left_tokens),
            right.render(right_tokens)
        );
    }
    match (expect_recoverable_errors, left.num_recovered_errors) {
        (true, 0) => panic!("expected recoverable errors but there were none"),
        (false, n) if n > 0 => panic!("expected no recoverable errors but there were {n}"),
        _ => {}
    }
}

fn trim_trailing_space(tokens: &[Token]) -> &[Token] {
    match tokens.split_last() {
        Some((last, rest)) if matches!(last.value(), Value::Space(_)) => rest,
        _ => tokens,
    }
}

fn same_token<S>(l: &Token, l_vm: &VM<S>, r: &Token, r_vm: &VM<S>) -> bool {
    match (l.value(), r.value()) {
        (
            Value::CommandRef(CommandRef::ControlSequence(a)),
            Value::CommandRef(CommandRef::ControlSequence(b)),
        ) => l_vm.cs_name_interner().resolve(a) == r_vm.cs_name_interner().resolve(b),
        _ => l == r,
    }
}

/// Checks that running `input` returns an error.
pub fn run_failure_test<S, H>(input: &str, options: &[TestOption<S>])
where
    S: Default + HasComponent<TestingComponent>,
    H: vm::Handlers<S>,
{
    let outcome = run::<S, H>(input, &Options::new(options));
    match &outcome.result {
        Ok(tokens) => panic!(
            "expected an error but the snippet produced '{}'",
            outcome.render(tokens)
        ),
        Err(err) => println!("{err}"),
    }
}

/// Runs `input` and hands the final state to `f`.
pub fn run_state_test<S, H, F>(input: &str, options: &[TestOption<S>], f: F)
where
    S: Default + HasComponent<TestingComponent>,
    H: vm::Handlers<S>,
    F: Fn(&S),
{
    let outcome = run::<S, H>(input, &Options::new(options));
    if let Err(err) = &outcome.result {
        panic!("snippet failed:\n{err}");
    }
    f(&outcome.vm.state);
}

/// Handlers that write every token reaching the main loop to the test output.
///
/// `\mathchardef` commands are written as the letters of `MathCode(n)`.
pub struct TestingHandlers;

impl<S: HasComponent<TestingComponent>> vm::Handlers<S> for TestingHandlers {
    fn character_handler(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
        input.state_mut().component_mut().push_token(token);
        Ok(())
    }

    fn math_character_handler(
        token: Token,
        input: &mut vm::ExecutionInput<S>,
        math_code: u32,
    ) -> txl::Result<()> {
        let key = token.trace_key();
        let component = input.state_mut().component_mut();
        for c in format!("MathCode({math_code})").chars() {
            component.push_token(match c {
                'A'..='Z' | 'a'..='z' => Token::new_letter(c, key),
                _ => Token::new_other(c, key),
            });
        }
        Ok(())
    }

    fn undefined_command_handler(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
        if !input.state().component().allow_undefined_command {
            return Err(error::UndefinedCommandError::new(input.vm(), token).into());
        }
        input.state_mut().component_mut().push_token(token);
        Ok(())
    }

    fn unexpanded_expansion_command(
        token: Token,
        input: &mut vm::ExecutionInput<S>,
    ) -> txl::Result<()> {
        input.state_mut().component_mut().push_token(token);
        Ok(())
    }
}

/// Generates `#[test]` functions.
///
/// ```
/// # use texweave_testing::*;
/// # use std::collections::HashMap;
/// # fn built_in_commands() -> HashMap<&'static str, texweave::command::BuiltIn<State>> {
/// #     HashMap::new()
/// # }
/// test_suite![
///     state(State),
///     options(TestOption::BuiltInCommands(built_in_commands)),
///     expansion_equality_tests(
///         (letters, "abc", "abc"),
///     ),
///     failure_tests(
///         (undefined, r"\undefined"),
///     ),
/// ];
/// ```
///
/// The leading arguments are optional and, when present, appear in this order:
///
/// - `@handlers(H)`: the [vm::Handlers]; [TestingHandlers] by default.
/// - `state(S)`: the state type; `State` from the calling scope by default.
/// - `options(...)`: [TestOption] values;
///     `TestOption::BuiltInCommands(built_in_commands)` by default,
///     so the calling module usually defines a `built_in_commands` function.
///
/// After those come any number of test lists, each a parenthesized list of cases:
///
/// - `expansion_equality_tests((name, lhs, rhs), ...)`
/// - `failure_tests((name, input), ...)`
/// - `recoverable_failure_tests((name, input, output after recovery), ...)`,
///     which generates a module with one test with recovery and one without
/// - `state_tests((name, input, closure), ...)`
#[macro_export]
macro_rules! test_suite {
    ( @handlers($handlers: ty), state($state: ty), options $options: tt, expansion_equality_tests ( $( ($name: ident, $lhs: expr, $rhs: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let lhs = $lhs;
                let rhs = $rhs;
                let options = vec! $options;
                texweave_testing::run_expansion_equality_test::<$state, $handlers>(&lhs, &rhs, false, &options);
            }
        )*
    );
    ( @handlers($handlers: ty), state($state: ty), options $options: tt, expansion_equality_tests $test_body: tt $(,)? ) => (
        compile_error!("Invalid test cases for expansion_equality_tests: must be a list of tuples (name, lhs, rhs)");
    );
    ( @handlers($handlers: ty), state($state: ty), options $options: tt, failure_tests ( $( ($name: ident, $input: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let input = $input;
                let options = vec! $options;
                texweave_testing::run_failure_test::<$state, $handlers>(&input, &options);
            }
        )*
    );
    ( @handlers($handlers: ty), state($state: ty), options $options: tt, recoverable_failure_tests ( $( ($name: ident, $lhs: expr, $rhs: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            mod $name {
                use super::*;
                #[test]
                fn error_recovery_enabled() {
                    let lhs = $lhs;
                    let rhs = $rhs;
                    let mut options = vec! $options;
                    options.push(texweave_testing::TestOption::RecoverFromErrors(true));
                    texweave_testing::run_expansion_equality_test::<$state, $handlers>(&lhs, &rhs, true, &options);
                }
                #[test]
                fn error_recovery_disabled() {
                    let input = $lhs;
                    let mut options = vec! $options;
                    options.push(texweave_testing::TestOption::RecoverFromErrors(false));
                    texweave_testing::run_failure_test::<$state, $handlers>(&input, &options);
                }
            }
        )*
    );
    ( @handlers($handlers: ty), state($state: ty), options $options: tt, state_tests ( $( ($name: ident, $input: expr, $f: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let input = $input;
                let options = vec! $options;
                texweave_testing::run_state_test::<$state, $handlers, _>(&input, &options, $f);
            }
        )*
    );
    ( @handlers($handlers: ty), state($state: ty), options $options: tt, $test_kind: ident $test_cases: tt $(,)? ) => (
        compile_error!("Invalid keyword: test_suite! only accepts the following keywords: `state`, `options`, `expansion_equality_tests`, `failure_tests`, `recoverable_failure_tests`, `state_tests`");
    );
    ( @handlers($handlers: ty), state($state: ty), options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        $(
            texweave_testing::test_suite![@handlers($handlers), state($state), options $options, $test_kind $test_cases,];
        )+
    );
    ( @handlers($handlers: ty), options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        texweave_testing::test_suite![@handlers($handlers), state(State), options $options, $( $test_kind $test_cases, )+ ];
    );
    ( @handlers($handlers: ty), state($state: ty), $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        texweave_testing::test_suite![@handlers($handlers), state($state), options (texweave_testing::TestOption::BuiltInCommands(built_in_commands)), $( $test_kind $test_cases, )+ ];
    );
    ( @handlers($handlers: ty), $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        texweave_testing::test_suite![@handlers($handlers), options (texweave_testing::TestOption::BuiltInCommands(built_in_commands)), $( $test_kind $test_cases, )+ ];
    );
    ( state($state: ty), $( $rest: tt )+ ) => (
        texweave_testing::test_suite![@handlers(texweave_testing::TestingHandlers), state($state), $( $rest )+ ];
    );
    ( options $options: tt, $( $rest: tt )+ ) => (
        texweave_testing::test_suite![@handlers(texweave_testing::TestingHandlers), options $options, $( $rest )+ ];
    );
    ( $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        texweave_testing::test_suite![@handlers(texweave_testing::TestingHandlers), $( $test_kind $test_cases, )+ ];
    );
}
