//! Math mode for the Texweave engine.
//!
//! Math mode has two halves.
//! The [builder] reads tokens after a math shift and produces a list of [noad::Noad]s.
//! The [mlist] module then converts that list into ordinary horizontal material,
//!     choosing sizes, placing scripts and fractions, and inserting the spaces between atoms.
//!
//! Engines integrate math mode by adding the [Component] to their state,
//!     calling [math_shift] from their character handler when a math shift token is seen,
//!     and adding the commands returned by the `get_*` functions to their built-ins.
//! Commands that append nodes, like `\kern`, should first offer the node
//!     to [Component::append_node]; it is accepted if a formula is being built.

use boxworks::node::{self, HList, Horizontal};
use boxworks::pack::hpack;
use std::io::Write;
use texweave::command;
use texweave::error;
use texweave::group::{Address, DimenParameter};
use texweave::prelude as txl;
use texweave::token::Token;
use texweave::traits::*;
use texweave::vm::{ExecutionInput, VM};

pub mod builder;
pub mod mlist;
pub mod noad;
pub mod style;

use noad::Noad;
use style::Style;

/// Component that tracks whether a formula is being built.
#[derive(Default)]
pub struct Component {
    depth: usize,
    pending: Vec<Horizontal>,
}

impl Component {
    pub fn in_math_mode(&self) -> bool {
        self.depth > 0
    }

    /// Appends an already typeset node to the formula being built.
    ///
    /// Returns false, and drops the node, if no formula is being built.
    pub fn append_node(&mut self, node: Horizontal) -> bool {
        if !self.in_math_mode() {
            return false;
        }
        self.pending.push(node);
        true
    }
}

/// A typeset formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    /// Material to append to the current paragraph.
    ///
    /// The material is bracketed by math nodes whose width is `\mathsurround`.
    Inline(Vec<Horizontal>),
    /// A display, packed into a box.
    Display(HList),
}

/// Builds and typesets the formula that starts with the math shift token.
pub fn math_shift<S: HasComponent<Component>>(
    token: Token,
    input: &mut ExecutionInput<S>,
) -> txl::Result<Formula> {
    let (list, display) = builder::scan_formula(token, input)?;
    complete(input.vm(), &list, display)
}

/// Typesets a math list using the fonts and parameters currently in effect.
///
/// If the math fonts are not sufficient, a recoverable error is raised and
///     the formula is deleted.
///
/// TeX.2021.1194 and TeX.2021.1199.
pub fn complete<S: TexweaveState>(
    vm: &VM<S>,
    list: &[Noad],
    display: bool,
) -> txl::Result<Formula> {
    let mut ctx = mlist::Context::new(vm);
    if let Err(insufficient) = ctx.check_fonts() {
        let which = if insufficient.family == 2 {
            "symbol"
        } else {
            "extension"
        };
        vm.error(
            error::SimpleFailedPreconditionError::new(format!(
                "math formula deleted: insufficient {which} fonts"
            ))
            .with_note(insufficient.to_string()),
        )?;
        return Ok(if display {
            Formula::Display(HList::default())
        } else {
            Formula::Inline(vec![])
        });
    }
    let formula = if display {
        let nodes = mlist::mlist_to_hlist(&mut ctx, list, Style::DISPLAY, false);
        Formula::Display(hpack(nodes))
    } else {
        let surround = vm
            .chain()
            .dimen(Address::Dimension(DimenParameter::MathSurround));
        let mut nodes = vec![Horizontal::Math(node::Math {
            kind: node::MathKind::Before,
            width: surround,
        })];
        nodes.extend(mlist::mlist_to_hlist(&mut ctx, list, Style::TEXT, true));
        nodes.push(Horizontal::Math(node::Math {
            kind: node::MathKind::After,
            width: surround,
        }));
        Formula::Inline(nodes)
    };
    let mut log_file = vm.log_file.borrow_mut();
    for (font, c) in &ctx.missing_characters {
        _ = writeln!(log_file, "Missing character: There is no {c} in font {font}!");
    }
    Ok(formula)
}

static LEFT_TAG: command::StaticTag = command::StaticTag::new();
static MIDDLE_TAG: command::StaticTag = command::StaticTag::new();
static RIGHT_TAG: command::StaticTag = command::StaticTag::new();
static OVER_TAG: command::StaticTag = command::StaticTag::new();
static ATOP_TAG: command::StaticTag = command::StaticTag::new();
static ABOVE_TAG: command::StaticTag = command::StaticTag::new();
static MKERN_TAG: command::StaticTag = command::StaticTag::new();
static MSKIP_TAG: command::StaticTag = command::StaticTag::new();

/// Body of every math-only command.
///
/// Inside a formula the builder recognizes these commands by their tags,
///     so this only runs outside of math mode.
fn math_only<S: TexweaveState>(token: Token, input: &mut ExecutionInput<S>) -> txl::Result<()> {
    Err(
        error::SimpleTokenError::new(input.vm(), token, "this command is only allowed in math mode")
            .with_category(error::Category::Scope)
            .into(),
    )
}

fn math_only_command<S: TexweaveState>(tag: &command::StaticTag, doc: &'static str) -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(math_only)
        .with_tag(tag.get())
        .with_doc(doc)
}

/// Get the `\left` command.
pub fn get_left<S: TexweaveState>() -> command::BuiltIn<S> {
    math_only_command(&LEFT_TAG, "Open a group bracketed by delimiters that grow to fit it")
}

/// Get the `\middle` command.
pub fn get_middle<S: TexweaveState>() -> command::BuiltIn<S> {
    math_only_command(&MIDDLE_TAG, "Add a growing delimiter inside a \\left group")
}

/// Get the `\right` command.
pub fn get_right<S: TexweaveState>() -> command::BuiltIn<S> {
    math_only_command(&RIGHT_TAG, "Close a group opened by \\left")
}

/// Get the `\over` command.
pub fn get_over<S: TexweaveState>() -> command::BuiltIn<S> {
    math_only_command(&OVER_TAG, "Make a fraction of the current list and what follows")
}

/// Get the `\atop` command.
pub fn get_atop<S: TexweaveState>() -> command::BuiltIn<S> {
    math_only_command(&ATOP_TAG, "Like \\over, but without a fraction rule")
}

/// Get the `\above` command.
pub fn get_above<S: TexweaveState>() -> command::BuiltIn<S> {
    math_only_command(&ABOVE_TAG, "Like \\over, with a fraction rule of the given thickness")
}

/// Get the `\mkern` command.
pub fn get_mkern<S: TexweaveState>() -> command::BuiltIn<S> {
    math_only_command(&MKERN_TAG, "Add a kern measured in mu")
}

/// Get the `\mskip` command.
pub fn get_mskip<S: TexweaveState>() -> command::BuiltIn<S> {
    math_only_command(&MSKIP_TAG, "Add glue measured in mu")
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{GlueComponent, Scaled};
    use noad::*;
    use std::collections::HashMap;
    use texweave::config::EngineConfig;
    use texweave::group::{GroupKind, MathSize, Scope};
    use texweave::token::Value;
    use texweave_testing::*;

    #[derive(Default)]
    struct State {
        testing: TestingComponent,
        math: Component,
        lists: Vec<MathList>,
        formulas: Vec<Formula>,
    }

    impl TexweaveState for State {
        fn recoverable_error_hook(
            vm: &VM<Self>,
            recoverable_error: Box<error::Error>,
        ) -> Result<(), Box<error::Error>> {
            TestingComponent::recoverable_error_hook(vm, recoverable_error)
        }
    }

    texweave::vm::implement_has_component![
        State,
        (TestingComponent, testing),
        (Component, math),
    ];

    struct Handlers;

    impl texweave::vm::Handlers<State> for Handlers {
        fn character_handler(token: Token, input: &mut ExecutionInput<State>) -> txl::Result<()> {
            if let Value::MathShift(_) = token.value() {
                let (list, display) = builder::scan_formula(token, input)?;
                let formula = complete(input.vm(), &list, display)?;
                input.state_mut().lists.push(list);
                input.state_mut().formulas.push(formula);
                return Ok(());
            }
            input.state_mut().testing.push_token(token);
            Ok(())
        }
    }

    fn kern(token: Token, input: &mut ExecutionInput<State>) -> txl::Result<()> {
        let node = Horizontal::Kern(node::Kern::new(Scaled::ONE * 2));
        let state = input.state_mut();
        if !state.math.append_node(node) {
            state.testing.push_token(token);
        }
        Ok(())
    }

    fn begingroup(token: Token, input: &mut ExecutionInput<State>) -> txl::Result<()> {
        input.begin_group(GroupKind::SemiSimple, token);
        Ok(())
    }

    fn endgroup(token: Token, input: &mut ExecutionInput<State>) -> txl::Result<()> {
        input.end_group(GroupKind::SemiSimple, token)
    }

    /// Writes the current group level to the output.
    fn level(token: Token, input: &mut ExecutionInput<State>) -> txl::Result<()> {
        let level = input.vm().chain().level();
        for c in level.to_string().chars() {
            let digit = Token::new_other(c, token.trace_key());
            input.state_mut().testing.push_token(digit);
        }
        Ok(())
    }

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("left", get_left()),
            ("middle", get_middle()),
            ("right", get_right()),
            ("over", get_over()),
            ("atop", get_atop()),
            ("above", get_above()),
            ("mkern", get_mkern()),
            ("mskip", get_mskip()),
            ("kern", command::BuiltIn::new_execution(kern)),
            ("begingroup", command::BuiltIn::new_execution(begingroup)),
            ("endgroup", command::BuiltIn::new_execution(endgroup)),
            ("level", command::BuiltIn::new_execution(level)),
        ])
    }

    fn load_math_fonts(vm: &mut VM<State>) {
        let factory = EngineConfig::default().font_factory();
        for (family, name) in ["cmr10", "cmmi10", "cmsy10", "cmex10"].into_iter().enumerate() {
            let Ok(font) = factory.load(name, None) else {
                panic!("font {name} is not in the built-in configuration");
            };
            let id = vm.fonts.insert(font);
            for size in [MathSize::Text, MathSize::Script, MathSize::ScriptScript] {
                vm.chain_mut().set_font(
                    Address::FamilyFont(size, family as u8),
                    id,
                    Scope::Global,
                );
            }
        }
        let codes = [
            (Address::MathCode('+'), 0x202B),
            (Address::MathCode('='), 0x303D),
            (Address::DelCode('('), 0x028300),
            (Address::DelCode(')'), 0x029301),
            (Address::DelCode('|'), 0x26A30C),
        ];
        for (address, code) in codes {
            vm.chain_mut().set_integer(address, code, Scope::Global);
        }
    }

    fn char_field(family: u8, char: char) -> Field {
        Field::Char(MathChar { family, char })
    }

    fn only_list(state: &State) -> &MathList {
        assert_eq!(state.lists.len(), 1);
        &state.lists[0]
    }

    fn only_atom(state: &State) -> &Atom {
        match only_list(state).as_slice() {
            [Noad::Atom(atom)] => atom,
            other => panic!("expected a single atom, got {other:?}"),
        }
    }

    test_suite![
        @handlers(Handlers),
        state(State),
        options(
            TestOption::BuiltInCommands(built_in_commands),
            TestOption::CustomVMInitialization(load_math_fonts),
        ),
        expansion_equality_tests(
            (text_around_formula, "a$x$b", "ab"),
            (display_formula, "a$$x$$b", "ab"),
            (kern_outside_math_is_not_captured, r"\kern", r"\kern"),
            (balanced_begingroup_in_math, r"$a\begingroup b\endgroup$\level", "0"),
        ),
        state_tests(
            (
                both_scripts,
                "$a^b_c$",
                |state: &State| {
                    let atom = only_atom(state);
                    assert_eq!(atom.class, MathClass::Ord);
                    assert_eq!(atom.nucleus, char_field(1, 'a'));
                    assert_eq!(atom.superscript, char_field(1, 'b'));
                    assert_eq!(atom.subscript, char_field(1, 'c'));
                }
            ),
            (
                braces_around_single_atom_unwrap,
                "${x}^2$",
                |state: &State| {
                    let atom = only_atom(state);
                    assert_eq!(atom.nucleus, char_field(1, 'x'));
                    assert_eq!(atom.superscript, char_field(0, '2'));
                }
            ),
            (
                braces_around_several_atoms_make_a_list,
                "${xy}$",
                |state: &State| {
                    let atom = only_atom(state);
                    let Field::List(list) = &atom.nucleus else {
                        panic!("expected a list nucleus, got {:?}", atom.nucleus);
                    };
                    assert_eq!(list.len(), 2);
                }
            ),
            (
                script_without_nucleus,
                "$^2$",
                |state: &State| {
                    let atom = only_atom(state);
                    assert_eq!(atom.nucleus, Field::Empty);
                    assert_eq!(atom.superscript, char_field(0, '2'));
                }
            ),
            (
                binary_and_relation_classes,
                "$a+b=c$",
                |state: &State| {
                    let classes: Vec<MathClass> = only_list(state)
                        .iter()
                        .filter_map(|n| match n {
                            Noad::Atom(atom) => Some(atom.class),
                            _ => None,
                        })
                        .collect();
                    assert_eq!(
                        classes,
                        vec![
                            MathClass::Ord,
                            MathClass::Bin,
                            MathClass::Ord,
                            MathClass::Rel,
                            MathClass::Ord
                        ]
                    );
                }
            ),
            (
                fraction,
                r"$a \over b$",
                |state: &State| {
                    let [Noad::Fraction(fraction)] = only_list(state).as_slice() else {
                        panic!("expected a fraction");
                    };
                    assert_eq!(fraction.numerator.len(), 1);
                    assert_eq!(fraction.denominator.len(), 1);
                    assert_eq!(fraction.thickness, None);
                }
            ),
            (
                atop_has_no_rule,
                r"$a \atop b$",
                |state: &State| {
                    let [Noad::Fraction(fraction)] = only_list(state).as_slice() else {
                        panic!("expected a fraction");
                    };
                    assert_eq!(fraction.thickness, Some(Scaled::ZERO));
                }
            ),
            (
                above_reads_thickness,
                r"$a \above 2pt b$",
                |state: &State| {
                    let [Noad::Fraction(fraction)] = only_list(state).as_slice() else {
                        panic!("expected a fraction");
                    };
                    assert_eq!(fraction.thickness, Some(Scaled::ONE * 2));
                }
            ),
            (
                fraction_inside_braces,
                r"$x{a \over b}$",
                |state: &State| {
                    let list = only_list(state);
                    assert_eq!(list.len(), 2);
                    let Noad::Atom(atom) = &list[1] else {
                        panic!("expected an atom");
                    };
                    let Field::List(inner) = &atom.nucleus else {
                        panic!("expected a list nucleus");
                    };
                    assert!(matches!(inner.as_slice(), [Noad::Fraction(_)]));
                }
            ),
            (
                left_right_make_inner_atom,
                r"$\left( x \right)$",
                |state: &State| {
                    let atom = only_atom(state);
                    assert_eq!(atom.class, MathClass::Inner);
                    let Field::List(inner) = &atom.nucleus else {
                        panic!("expected a list nucleus");
                    };
                    assert_eq!(inner.len(), 3);
                    assert_eq!(inner[0], Noad::Left(Delimiter::from_code(0x028300)));
                    assert_eq!(inner[2], Noad::Right(Delimiter::from_code(0x029301)));
                }
            ),
            (
                middle_splits_fraction,
                r"$\left( a \over b \middle| c \right.$",
                |state: &State| {
                    let atom = only_atom(state);
                    let Field::List(inner) = &atom.nucleus else {
                        panic!("expected a list nucleus");
                    };
                    assert!(matches!(inner[1], Noad::Fraction(_)));
                    assert_eq!(inner[2], Noad::Middle(Delimiter::from_code(0x26A30C)));
                    assert_eq!(inner[4], Noad::Right(Delimiter::NULL));
                }
            ),
            (
                mkern_and_mskip,
                r"$a\mkern 3mu \mskip 4mu plus 2mu b$",
                |state: &State| {
                    let list = only_list(state);
                    assert_eq!(list[1], Noad::MuKern(Scaled::ONE * 3));
                    let Noad::MuGlue(glue) = &list[2] else {
                        panic!("expected mu glue");
                    };
                    assert_eq!(glue.width(), Scaled::ONE * 4);
                    assert_eq!(glue.stretch, GlueComponent::from(Scaled::ONE * 2));
                }
            ),
            (
                nodes_from_other_commands,
                r"$a\kern b$",
                |state: &State| {
                    let list = only_list(state);
                    assert_eq!(list.len(), 3);
                    assert_eq!(
                        list[1],
                        Noad::Node(Horizontal::Kern(node::Kern::new(Scaled::ONE * 2)))
                    );
                }
            ),
            (
                inline_formula_is_bracketed_by_math_nodes,
                "$x$",
                |state: &State| {
                    let Formula::Inline(nodes) = &state.formulas[0] else {
                        panic!("expected an inline formula");
                    };
                    assert!(matches!(nodes.first(), Some(Horizontal::Math(_))));
                    assert!(matches!(nodes.last(), Some(Horizontal::Math(_))));
                    assert!(nodes.iter().any(|n| matches!(n, Horizontal::Char(_))));
                }
            ),
            (
                display_formula_is_packed,
                "$$x$$",
                |state: &State| {
                    let Formula::Display(hlist) = &state.formulas[0] else {
                        panic!("expected a display formula");
                    };
                    assert!(hlist.width > Scaled::ZERO);
                }
            ),
        ),
        recoverable_failure_tests(
            (double_superscript, "$a^b^c$", "$a^b{}^c$"),
            (double_subscript, "$a_b_c$", "$a_b{}_c$"),
            (ambiguous_fraction, r"$a \over b \over c$", r"$a \over b c$"),
            (extra_right, r"$a \right)$", "$a$"),
            (extra_middle, r"$a \middle| b$", "$ab$"),
            (missing_close_brace, "${a$", "${a}$"),
            (missing_right, r"$\left(a$", r"$\left(a\right.$"),
            (extra_close_brace, "$a}$", "$a$"),
            (display_must_end_with_two_shifts, "$$a$b", "$$a$$b"),
            (
                math_shift_closes_open_begingroup,
                r"$a\begingroup b$\level",
                "0"
            ),
            (
                nested_begingroups_are_all_closed,
                r"$a\begingroup\begingroup b$\level",
                "0"
            ),
            (
                right_closes_open_begingroup,
                r"$\left(a\begingroup b\right)$\level",
                "0"
            ),
            (
                close_brace_inside_begingroup_is_dropped,
                r"${a\begingroup b}\endgroup}$\level",
                "0"
            ),
            (missing_delimiter, r"$\left a\right.$", r"$\left.a\right.$"),
        ),
        failure_tests(
            (left_outside_math, r"\left("),
            (over_outside_math, r"\over"),
            (unterminated_formula, "$a"),
            (undefined_command_in_math, r"$\undefined$"),
        ),
    ];

    fn no_math_fonts(_: &mut VM<State>) {}

    test_suite![
        @handlers(Handlers),
        state(State),
        options(
            TestOption::BuiltInCommands(built_in_commands),
            TestOption::CustomVMInitialization(no_math_fonts),
        ),
        recoverable_failure_tests(
            (insufficient_fonts, "a$x$b", "ab"),
        ),
    ];
}
