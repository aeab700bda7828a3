use super::dimen::{self, Units};
use super::keyword::parse_keyword;
use super::number::{self, InternalQuantity};
use crate::prelude as txl;
use crate::token::Value;
use crate::traits::*;
use crate::*;
use common::{Glue, GlueComponent, Scaled};

impl<S: TexweaveState> Parsable<S> for Glue {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        scan_glue(input, Units::Physical)
    }
}

/// Glue measured in math units, as in `\mskip 3mu plus 1fil`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct MuGlue(pub Glue);

impl<S: TexweaveState> Parsable<S> for MuGlue {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        Ok(MuGlue(scan_glue(input, Units::Mu)?))
    }
}

/// TeX.2021.461
fn scan_glue<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    units: Units,
) -> txl::Result<Glue> {
    let negative = number::parse_optional_signs(input)?.is_some();
    let first_token = input.next_or_err(GlueEndOfInputError {})?;
    let width: GlueComponent = match first_token.value() {
        Value::CommandRef(command_ref) => {
            match number::parse_internal_quantity(input, first_token, command_ref)? {
                Some(InternalQuantity::Integer(i)) => dimen::finish_dimen(
                    input,
                    first_token,
                    negative,
                    i,
                    Scaled::ZERO,
                    units,
                    false,
                )?,
                Some(InternalQuantity::Dimen(d)) => {
                    if units == Units::Mu {
                        incompatible_units(input, first_token)?;
                    }
                    GlueComponent::finite(if negative { -d } else { d })
                }
                Some(InternalQuantity::Glue(g)) => {
                    if units == Units::Mu {
                        incompatible_units(input, first_token)?;
                    }
                    return Ok(if negative { g.negate() } else { g });
                }
                Some(InternalQuantity::MuGlue(g)) => {
                    if units == Units::Physical {
                        incompatible_units(input, first_token)?;
                    }
                    return Ok(if negative { g.negate() } else { g });
                }
                None => {
                    number::missing_number_error(input, first_token, command_ref)?;
                    dimen::finish_dimen(
                        input,
                        first_token,
                        negative,
                        0,
                        Scaled::ZERO,
                        units,
                        false,
                    )?
                }
            }
        }
        _ => {
            input.back(first_token);
            dimen::scan_dimen_after_signs(input, negative, units, false)?
        }
    };
    let mut g = Glue {
        width,
        ..Default::default()
    };
    if parse_keyword(input, "plus")? {
        g.stretch = dimen::scan_dimen(input, units, true)?;
    }
    if parse_keyword(input, "minus")? {
        g.shrink = dimen::scan_dimen(input, units, true)?;
    }
    Ok(g)
}

fn incompatible_units<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    token: token::Token,
) -> txl::Result<()> {
    input.vm().error(
        error::SimpleTokenError::new(input.vm(), token, "incompatible glue units")
            .with_note("math glue and ordinary glue cannot be mixed"),
    )
}

#[derive(Debug)]
struct GlueEndOfInputError;

impl error::EndOfInputError for GlueEndOfInputError {
    fn doing(&self) -> String {
        "parsing a glue".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::testing::*;

    fn glue(width: i32, stretch: (i32, i32), shrink: (i32, i32)) -> Glue {
        Glue {
            width: GlueComponent::finite(Scaled::ONE * width),
            stretch: GlueComponent::new((Scaled::ONE * stretch.0).0 as i64, stretch.1),
            shrink: GlueComponent::new((Scaled::ONE * shrink.0).0 as i64, shrink.1),
        }
    }

    parse_success_tests![
        (width_1, "0pt", Glue::ZERO),
        (width_2, "1pt", glue(1, (0, 0), (0, 0))),
        (width_3, "-1pt", glue(-1, (0, 0), (0, 0))),
        (stretch_1, "1pt plus 1pt", glue(1, (1, 0), (0, 0))),
        (stretch_fil, "1pt plus 1fil", glue(1, (1, 1), (0, 0))),
        (stretch_fill, "1pt plus 1fill", glue(1, (1, 2), (0, 0))),
        (stretch_filll, "1pt plus 1filll", glue(1, (1, 3), (0, 0))),
        (stretch_fillll, "1pt plus 2fillll", glue(1, (2, 4), (0, 0))),
        (shrink_1, "1pt minus 3pt", glue(1, (0, 0), (3, 0))),
        (
            stretch_and_shrink,
            "1pt plus -2fil minus 3fill",
            glue(1, (-2, 1), (3, 2))
        ),
        (
            spaces_before_plus_and_minus,
            "1pt   plus   2pt   minus   3fil",
            glue(1, (2, 0), (3, 1))
        ),
        (internal_glue, r"\testskip", glue(1, (2, 1), (3, 0))),
        (internal_glue_negated, r"-\testskip", glue(-1, (-2, 1), (-3, 0))),
        (
            internal_glue_ignores_plus,
            r"\testskip plus 5pt",
            glue(1, (2, 1), (3, 0))
        ),
        (
            internal_dimen_width,
            r"\testdimen plus 1pt",
            Glue {
                width: GlueComponent::finite(Scaled(163840)),
                stretch: GlueComponent::finite(Scaled::ONE),
                shrink: GlueComponent::ZERO,
            }
        ),
        (internal_integer_width, r"\testcount sp", Glue::rigid(Scaled(1000))),
        (mu_glue, "3mu plus 1fill", MuGlue(glue(3, (1, 2), (0, 0)))),
        (internal_mu_glue, r"\testmuskip", MuGlue(glue(3, (0, 0), (0, 0)))),
    ];

    parse_failure_tests!(
        Glue,
        (stretch_overflow, "1pt plus 30000fil"),
        (mu_units_in_glue, "1mu"),
        (internal_mu_glue_in_glue, r"\testmuskip"),
    );

    parse_failure_tests!(MuGlue, (internal_glue_in_mu_glue, r"\testskip"),);

    #[test]
    fn stretch_overflow_is_clamped() {
        let (got, errors) = run_parse_recovery_test::<Glue>("1pt plus 30000fil");
        assert_eq!(
            got.stretch,
            GlueComponent::new(Scaled::MAX_DIMEN.0 as i64, 1)
        );
        assert_eq!(errors, 1);
    }
}
