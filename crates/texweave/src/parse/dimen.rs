use super::keyword::parse_keyword;
use super::number::{self, InternalQuantity};
use crate::group::{Address, IntegerParameter};
use crate::prelude as txl;
use crate::token::{self, Value};
use crate::traits::*;
use crate::*;
use common::{ArithmeticError, GlueComponent, Scaled, ScaledUnit};

impl<S: TexweaveState> Parsable<S> for Scaled {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        Ok(scan_dimen(input, Units::Physical, false)?.scaled())
    }
}

/// A dimension that may be measured in the infinite units `fil`, `fill`, `filll`, ...
///
/// This is how the stretch and shrink components of glue are written.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct FilDimen(pub GlueComponent);

impl<S: TexweaveState> Parsable<S> for FilDimen {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        Ok(FilDimen(scan_dimen(input, Units::Physical, true)?))
    }
}

/// A dimension measured in math units, as in `\mkern 3mu`.
///
/// The value is stored in scaled points, where 1mu is represented by [Scaled::ONE].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MuDimen(pub Scaled);

impl<S: TexweaveState> Parsable<S> for MuDimen {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> txl::Result<Self> {
        Ok(MuDimen(scan_dimen(input, Units::Mu, false)?.scaled()))
    }
}

/// The family of units accepted after the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Units {
    /// `true`, the physical units, `em` and `ex`.
    Physical,
    /// Only `mu`.
    Mu,
}

/// TeX.2021.448.
pub(crate) fn scan_dimen<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    units: Units,
    allow_fil: bool,
) -> txl::Result<GlueComponent> {
    let negative = number::parse_optional_signs(input)?.is_some();
    scan_dimen_after_signs(input, negative, units, allow_fil)
}

pub(crate) fn scan_dimen_after_signs<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    negative: bool,
    units: Units,
    allow_fil: bool,
) -> txl::Result<GlueComponent> {
    let first_token = input.next_or_err(DimenEndOfInputError {})?;
    let (integer, fraction) = match first_token.value() {
        Value::CommandRef(command_ref) => {
            match number::parse_internal_quantity(input, first_token, command_ref)? {
                Some(InternalQuantity::Integer(i)) => (i, Scaled::ZERO),
                Some(quantity) => {
                    let d = coerce(input, first_token, quantity, units)?;
                    return Ok(GlueComponent::finite(if negative { -d } else { d }));
                }
                None => {
                    number::missing_number_error(input, first_token, command_ref)?;
                    (0, Scaled::ZERO)
                }
            }
        }
        Value::Other(',' | '.') => (0, scan_decimal_fraction(input)?),
        _ => {
            let (i, radix) = number::parse_constant(input, first_token)?;
            // Only decimal constants may have a fractional part.
            let has_fractional_part = radix == 10
                && match input.next()? {
                    Some(next) => match next.value() {
                        Value::Other(',' | '.') => true,
                        _ => {
                            input.back(next);
                            false
                        }
                    },
                    None => false,
                };
            let fraction = if has_fractional_part {
                scan_decimal_fraction(input)?
            } else {
                Scaled::ZERO
            };
            (i, fraction)
        }
    };
    finish_dimen(
        input,
        first_token,
        negative,
        integer,
        fraction,
        units,
        allow_fil,
    )
}

/// Scans the units of a dimension whose number has already been read and attaches the sign.
///
/// An overflow is reported as a recoverable error and the result is clamped to [Scaled::MAX_DIMEN].
pub(crate) fn finish_dimen<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    first_token: token::Token,
    mut negative: bool,
    integer: i32,
    fraction: Scaled,
    units: Units,
    allow_fil: bool,
) -> txl::Result<GlueComponent> {
    // A negative integer can only come from an internal integer, and then the fraction is 0.
    let integer = if integer < 0 {
        negative = !negative;
        integer.checked_neg().unwrap_or(i32::MAX)
    } else {
        integer
    };
    let c = match scan_and_apply_units(input, integer, fraction.0, units, allow_fil)? {
        Ok(c) => c,
        Err(Overflow { order }) => {
            let err = parse::Error::new(
                input.vm(),
                "a dimension in the range (-2^14pt,2^14pt)",
                Some(first_token),
                "",
            )
            .with_got_override("a dimension that's too large");
            input.vm().error(err)?;
            GlueComponent::new(Scaled::MAX_DIMEN.0 as i64, order)
        }
    };
    Ok(if negative { c.negate() } else { c })
}

/// A dimension that does not fit, together with the order of its unit.
struct Overflow {
    order: i32,
}

impl From<ArithmeticError> for Overflow {
    fn from(_: ArithmeticError) -> Self {
        Overflow { order: 0 }
    }
}

/// TeX.2021.453-460.
fn scan_and_apply_units<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    mut integer: i32,
    mut fraction: i32,
    units: Units,
    allow_fil: bool,
) -> txl::Result<Result<GlueComponent, Overflow>> {
    if units == Units::Physical && parse_keyword(input, "true")? {
        let mag = prepare_mag(input)?;
        if mag != 1000 {
            let (i, f) = match common::rescale(integer, fraction, 1000, mag) {
                Ok(r) => r,
                Err(err) => return Ok(Err(err.into())),
            };
            let Ok(i) = i32::try_from(i) else {
                return Ok(Err(Overflow { order: 0 }));
            };
            integer = i;
            fraction = f as i32;
        }
    }
    match units {
        Units::Physical => {
            for unit in ScaledUnit::ALL {
                if parse_keyword(input, unit.keyword())? {
                    super::OptionalSpace::parse(input)?;
                    return Ok(apply_unit(unit, integer, fraction).map_err(Overflow::from));
                }
            }
            for (keyword, number) in [("ex", font::dimen::X_HEIGHT), ("em", font::dimen::QUAD)] {
                if parse_keyword(input, keyword)? {
                    super::OptionalSpace::parse(input)?;
                    let v = current_font_dimen(input.vm(), number);
                    return Ok(apply_internal_unit(v, integer, fraction).map_err(Overflow::from));
                }
            }
        }
        Units::Mu => {
            if parse_keyword(input, "mu")? {
                super::OptionalSpace::parse(input)?;
                return Ok(common::attach_fraction(integer as i64, fraction as i64)
                    .map(GlueComponent::finite)
                    .map_err(Overflow::from));
            }
        }
    }
    if allow_fil && parse_keyword(input, "fil")? {
        let mut order = 1;
        while parse_keyword(input, "l")? {
            order += 1;
        }
        super::OptionalSpace::parse(input)?;
        return Ok(common::attach_fraction(integer as i64, fraction as i64)
            .map(|s| GlueComponent::new(s.0 as i64, order))
            .map_err(|_| Overflow { order }));
    }
    // An internal quantity may be used as the unit, as in `2\dimen0`.
    if let Some(next) = input.next()? {
        if let Value::CommandRef(command_ref) = next.value() {
            if let Some(quantity) = number::parse_internal_quantity(input, next, command_ref)? {
                let v = match quantity {
                    InternalQuantity::Integer(i) => Scaled(i),
                    quantity => coerce(input, next, quantity, units)?,
                };
                return Ok(apply_internal_unit(v, integer, fraction).map_err(Overflow::from));
            }
        }
        input.back(next);
    }
    let got = input.peek()?.copied();
    let (expected, inserted) = match units {
        Units::Physical => ("a unit of measure", "pt"),
        Units::Mu => ("the unit mu", "mu"),
    };
    let err = parse::Error::new(
        input.vm(),
        expected,
        got,
        "the units are pt, pc, in, bp, cm, mm, dd, cc, sp, em and ex",
    )
    .with_note(format!["the unit {inserted} will be used instead"]);
    input.vm().error(err)?;
    Ok(common::attach_fraction(integer as i64, fraction as i64)
        .map(GlueComponent::finite)
        .map_err(Overflow::from))
}

fn apply_unit(unit: ScaledUnit, integer: i32, fraction: i32) -> Result<GlueComponent, ArithmeticError> {
    let s = unit.apply(integer, fraction)?;
    if s.abs() > Scaled::MAX_DIMEN {
        return Err(ArithmeticError::Overflow);
    }
    Ok(GlueComponent::finite(s))
}

/// Multiplies an internal dimension by the number `integer + fraction/2^16`.
///
/// TeX.2021.455.
fn apply_internal_unit(
    v: Scaled,
    integer: i32,
    fraction: i32,
) -> Result<GlueComponent, ArithmeticError> {
    let (f, _) = v.xn_over_d(fraction, 1 << 16)?;
    Ok(GlueComponent::finite(v.nx_plus_y(integer, f)?))
}

/// Converts an internal dimension or glue to a dimension.
///
/// Mixing math units and physical units is an error; the value is used unchanged.
fn coerce<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
    token: token::Token,
    quantity: InternalQuantity,
    units: Units,
) -> txl::Result<Scaled> {
    let (value, is_mu) = match quantity {
        InternalQuantity::Integer(i) => (Scaled(i), false),
        InternalQuantity::Dimen(d) => (d, false),
        InternalQuantity::Glue(g) => (g.width(), false),
        InternalQuantity::MuGlue(g) => (g.width(), true),
    };
    if is_mu != (units == Units::Mu) {
        input.vm().error(
            error::SimpleTokenError::new(input.vm(), token, "incompatible glue units")
                .with_note("math glue and ordinary glue cannot be mixed"),
        )?;
    }
    Ok(value)
}

fn current_font_dimen<S>(vm: &vm::VM<S>, number: usize) -> Scaled {
    let id = vm.chain().font(Address::CurrentFont);
    vm.fonts.get(id).dimen(number).unwrap_or(Scaled::ZERO)
}

/// Returns the magnification ratio, checking that it is in the range `[1, 32768]`.
///
/// TeX.2021.288.
fn prepare_mag<S: TexweaveState>(input: &mut vm::ExpandedStream<S>) -> txl::Result<i32> {
    let mag = input
        .vm()
        .chain()
        .integer(Address::Integer(IntegerParameter::Mag));
    if mag <= 0 || mag > 32768 {
        input.vm().error(
            error::SimpleFailedPreconditionError::new(format![
                "illegal magnification {mag}: the magnification ratio must be between 1 and 32768"
            ])
            .with_category(error::Category::Arithmetic)
            .with_note("the magnification 1000 will be used instead"),
        )?;
        return Ok(1000);
    }
    Ok(mag)
}

/// TeX.2021.452
fn scan_decimal_fraction<S: TexweaveState>(
    input: &mut vm::ExpandedStream<S>,
) -> txl::Result<Scaled> {
    // Only 17 digits can affect the result, because the smallest scaled number is 2^(-16).
    let mut digits = [0_u8; 17];
    let mut i = 0_usize;
    while let Some(token) = input.next()? {
        let d = match token.value() {
            Value::Other(c @ '0'..='9') => c as u8 - b'0',
            Value::Space(_) => {
                break;
            }
            _ => {
                input.back(token);
                break;
            }
        };
        if let Some(digit) = digits.get_mut(i) {
            *digit = d;
            i += 1;
        }
    }
    Ok(Scaled::from_decimal_fraction(&digits[0..i]))
}

#[derive(Debug)]
struct DimenEndOfInputError;

impl error::EndOfInputError for DimenEndOfInputError {
    fn doing(&self) -> String {
        "parsing a dimension".into()
    }
}
