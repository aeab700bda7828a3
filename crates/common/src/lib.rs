//! Scaled arithmetic shared by the Texweave crates.
//!
//! All lengths in TeX are stored as integer multiples of the scaled point,
//!     where 65536 scaled points make up one printer's point.
//! This crate contains the [Scaled] type used for finite dimensions,
//!     the [GlueComponent] type used for glue with infinite stretch orders,
//!     and the exact unit conversions that TeX performs when scanning lengths.
//! Every function here reproduces TeX's integer arithmetic bit for bit;
//!     floating point is never used.

mod glue;

pub use glue::Glue;
pub use glue::GlueComponent;

use std::fmt::Write;

/// Scaled numbers.
///
/// This is a fixed-width numeric type used throughout TeX.
/// The inner value is the number multiplied by 2^16.
/// See part 7 "arithmetic with scaled dimensions" of TeX.2021.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scaled(pub i32);

impl Scaled {
    /// Representation of the number 0 as a [Scaled].
    pub const ZERO: Scaled = Scaled(0);

    /// Representation of the number 1 as a [Scaled].
    pub const ONE: Scaled = Scaled(1 << 16);

    /// Representation of the number 2 as a [Scaled].
    pub const TWO: Scaled = Scaled(1 << 17);

    /// Maximum possible dimension in TeX, which is (2^30-1)/2^16.
    ///
    /// TeX.2021.421.
    pub const MAX_DIMEN: Scaled = Scaled((1 << 30) - 1);

    /// Create a scaled number corresponding to the provided integer.
    ///
    /// The integer must be in the range `(-2^14, 2^14)`.
    pub fn from_integer(i: i32) -> Result<Scaled, ArithmeticError> {
        if i >= (1 << 14) || i <= -(1 << 14) {
            Err(ArithmeticError::Overflow)
        } else {
            Ok(Scaled(Scaled::ONE.0 * i))
        }
    }

    /// Creates a scaled number from the digits of a decimal fraction.
    ///
    /// Exactly 17 digits take part in the rounding.
    /// Digits past the 17th are ignored and missing digits count as zero.
    ///
    /// TeX.2021.102 and TeX.2021.452.
    pub fn from_decimal_fraction(digits: &[u8]) -> Scaled {
        let mut buffer = [0_u8; 17];
        for (slot, digit) in buffer.iter_mut().zip(digits) {
            *slot = *digit;
        }
        let mut a: i32 = 0;
        for d in buffer.iter().rev() {
            a = (a + (*d as i32) * Scaled::TWO.0) / 10;
        }
        Scaled((a + 1) / 2)
    }

    /// Calculates _xn/d_ and the remainder, where _x_ is this scaled number.
    ///
    /// TeX.2021.107 works hard to avoid 32-bit overflow; here 64-bit integers are used.
    pub fn xn_over_d(&self, n: i32, d: i32) -> Result<(Scaled, Scaled), ArithmeticError> {
        let (quotient, remainder) = xn_over_d(self.0 as i64, n, d)?;
        if quotient.abs() > Scaled::MAX_DIMEN.0 as i64 {
            return Err(ArithmeticError::Overflow);
        }
        Ok((Scaled(quotient as i32), Scaled(remainder as i32)))
    }

    /// Calculates _nx+y_, where _x_ is this scaled number.
    ///
    /// TeX.2021.105.
    pub fn nx_plus_y(self, mut n: i32, y: Scaled) -> Result<Scaled, ArithmeticError> {
        if n == 0 {
            return Ok(y);
        }
        let mut x = self;
        if n < 0 {
            n = -n;
            x = -x;
        }
        let max_answer = Scaled::MAX_DIMEN;
        if x.0 <= (max_answer.0 - y.0) / n && -x.0 <= (max_answer.0 + y.0) / n {
            Ok(Scaled(x.0 * n + y.0))
        } else {
            Err(ArithmeticError::Overflow)
        }
    }

    /// Divides this number by an integer, truncating towards zero.
    ///
    /// TeX.2021.106.
    pub fn x_over_n(self, n: i32) -> Result<(Scaled, Scaled), ArithmeticError> {
        if n == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        Ok((Scaled(self.0 / n), Scaled(self.0 % n)))
    }

    /// Adds two numbers and fails if the result is larger than [Scaled::MAX_DIMEN].
    pub fn checked_add(self, rhs: Scaled) -> Result<Scaled, ArithmeticError> {
        let sum = self.0 as i64 + rhs.0 as i64;
        if sum.abs() > Scaled::MAX_DIMEN.0 as i64 {
            return Err(ArithmeticError::Overflow);
        }
        Ok(Scaled(sum as i32))
    }

    pub fn integer_part(self) -> i32 {
        self.0 / Scaled::ONE.0
    }

    pub fn fractional_part(self) -> Scaled {
        Scaled(self.0 % Scaled::ONE.0)
    }

    pub fn abs(self) -> Scaled {
        Scaled(self.0.abs())
    }

    /// Half of this number, rounded the way TeX rounds.
    ///
    /// TeX.2021.100.
    pub fn half(self) -> Scaled {
        if self.0 % 2 != 0 {
            Scaled((self.0 + 1).div_euclid(2))
        } else {
            Scaled(self.0 / 2)
        }
    }
}

/// Calculates _xn/d_ and the remainder using wide integers.
///
/// The quotient and remainder are truncated towards zero, matching TeX.2021.107.
pub fn xn_over_d(x: i64, n: i32, d: i32) -> Result<(i64, i64), ArithmeticError> {
    if d == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    let b = x as i128 * n as i128;
    let quotient = b / d as i128;
    let remainder = b % d as i128;
    if quotient.abs() > i64::MAX as i128 {
        return Err(ArithmeticError::Overflow);
    }
    Ok((quotient as i64, remainder as i64))
}

/// Error returned when scaled arithmetic leaves the representable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    Overflow,
    DivisionByZero,
}

impl std::fmt::Display for ArithmeticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArithmeticError::Overflow => write!(f, "arithmetic overflow"),
            ArithmeticError::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

impl std::error::Error for ArithmeticError {}

/// Writes a scaled value in TeX's canonical decimal form, without units.
///
/// The integer part has no leading zeros, there is always a decimal point,
///     and the fractional part has the fewest digits that still
///     read back to the same scaled value.
///
/// TeX.2021.103.
pub fn write_scaled<W: Write>(w: &mut W, value: i64) -> std::fmt::Result {
    let unity = Scaled::ONE.0 as i64;
    let mut s = value;
    if s < 0 {
        w.write_char('-')?;
        s = -s;
    }
    write!(w, "{}.", s / unity)?;
    s = 10 * (s % unity) + 5;
    let mut delta: i64 = 10;
    loop {
        if delta > unity {
            // round the last digit
            s += 0o100000 - 50000;
        }
        let digit = (s / unity) as u32;
        w.write_char(char::from_digit(digit, 10).unwrap_or('0'))?;
        s = 10 * (s % unity);
        delta *= 10;
        if s <= delta {
            break;
        }
    }
    Ok(())
}

impl std::fmt::Display for Scaled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_scaled(f, self.0 as i64)?;
        write!(f, "pt")
    }
}

impl std::ops::Add<Scaled> for Scaled {
    type Output = Scaled;
    fn add(self, rhs: Scaled) -> Self::Output {
        Scaled(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign<Scaled> for Scaled {
    fn add_assign(&mut self, rhs: Scaled) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub<Scaled> for Scaled {
    type Output = Scaled;
    fn sub(self, rhs: Scaled) -> Self::Output {
        Scaled(self.0 - rhs.0)
    }
}

impl std::ops::Mul<i32> for Scaled {
    type Output = Scaled;
    fn mul(self, rhs: i32) -> Self::Output {
        Scaled(self.0 * rhs)
    }
}

impl std::ops::Div<i32> for Scaled {
    type Output = Scaled;
    fn div(self, rhs: i32) -> Self::Output {
        Scaled(self.0 / rhs)
    }
}

impl std::ops::Neg for Scaled {
    type Output = Scaled;
    fn neg(self) -> Self::Output {
        Scaled(-self.0)
    }
}

/// Unit of measure that may follow a number when a length is scanned.
///
/// TeX.2021.458.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaledUnit {
    Point,
    Pica,
    Inch,
    BigPoint,
    Centimeter,
    Millimeter,
    DidotPoint,
    Cicero,
    ScaledPoint,
}

impl ScaledUnit {
    /// All units in the order they are tried by the scanner.
    pub const ALL: [ScaledUnit; 9] = [
        ScaledUnit::Point,
        ScaledUnit::ScaledPoint,
        ScaledUnit::Millimeter,
        ScaledUnit::Centimeter,
        ScaledUnit::Inch,
        ScaledUnit::Pica,
        ScaledUnit::BigPoint,
        ScaledUnit::DidotPoint,
        ScaledUnit::Cicero,
    ];

    /// Parses a unit from its two-letter abbreviation.
    pub fn parse(s: &str) -> Option<Self> {
        ScaledUnit::ALL.into_iter().find(|unit| unit.keyword() == s)
    }

    /// The keyword used for this unit in TeX source code.
    pub fn keyword(&self) -> &'static str {
        match self {
            ScaledUnit::Point => "pt",
            ScaledUnit::Pica => "pc",
            ScaledUnit::Inch => "in",
            ScaledUnit::BigPoint => "bp",
            ScaledUnit::Centimeter => "cm",
            ScaledUnit::Millimeter => "mm",
            ScaledUnit::DidotPoint => "dd",
            ScaledUnit::Cicero => "cc",
            ScaledUnit::ScaledPoint => "sp",
        }
    }

    /// The exact ratio between this unit and the printer's point.
    pub fn conversion_fraction(&self) -> (i32, i32) {
        match self {
            ScaledUnit::Point => (1, 1),
            ScaledUnit::Pica => (12, 1),
            ScaledUnit::Inch => (7227, 100),
            ScaledUnit::BigPoint => (7227, 7200),
            ScaledUnit::Centimeter => (7227, 254),
            ScaledUnit::Millimeter => (7227, 2540),
            ScaledUnit::DidotPoint => (1238, 1157),
            ScaledUnit::Cicero => (14856, 1157),
            ScaledUnit::ScaledPoint => (1, 65536),
        }
    }

    /// Applies this unit to a number split into its integer part and
    ///     its fractional part (in units of 2^-16).
    ///
    /// Both parts must be non-negative; the caller attaches the sign.
    /// For scaled points the fractional part is discarded.
    pub fn apply(&self, integer: i32, fraction: i32) -> Result<Scaled, ArithmeticError> {
        if *self == ScaledUnit::ScaledPoint {
            return Ok(Scaled(integer));
        }
        let (n, d) = self.conversion_fraction();
        let (integer, fraction) = if (n, d) == (1, 1) {
            (integer as i64, fraction as i64)
        } else {
            rescale(integer, fraction, n, d)?
        };
        attach_fraction(integer, fraction)
    }
}

/// Multiplies a number, split into integer and fractional parts, by _n/d_.
///
/// The remainder of the integer division is carried into the fractional part
///     exactly as TeX.2021.458 does for physical units
///     and as TeX.2021.457 does for `true` magnification.
pub fn rescale(integer: i32, fraction: i32, n: i32, d: i32) -> Result<(i64, i64), ArithmeticError> {
    let (mut integer, remainder) = xn_over_d(integer as i64, n, d)?;
    let mut fraction = (n as i64 * fraction as i64 + 65536 * remainder) / d as i64;
    integer += fraction / 65536;
    fraction %= 65536;
    Ok((integer, fraction))
}

/// Joins an integer part and a fractional part into a scaled number.
///
/// TeX.2021.461 reports an overflow once the integer part reaches 2^14.
pub fn attach_fraction(integer: i64, fraction: i64) -> Result<Scaled, ArithmeticError> {
    if integer >= 1 << 14 {
        return Err(ArithmeticError::Overflow);
    }
    Ok(Scaled((integer * 65536 + fraction) as i32))
}

/// Error returned when a length literal cannot be parsed by [Scaled::from_str].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseScaledError(pub String);

impl std::fmt::Display for ParseScaledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid length literal `{}`", self.0)
    }
}

impl std::error::Error for ParseScaledError {}

impl std::str::FromStr for Scaled {
    type Err = ParseScaledError;

    /// Parses a plain length literal like `-3.25pt` or `1in`.
    ///
    /// This is used for lengths that appear in configuration files.
    /// It applies the same rounding and unit conversions as the TeX scanner,
    ///     but does not support `true`, font-relative units or internal quantities.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseScaledError(s.to_string());
        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let unit_start = rest
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(err)?;
        let (number, unit) = rest.split_at(unit_start);
        let unit = ScaledUnit::parse(unit).ok_or_else(err)?;
        let (integer, fraction) = match number.find(|c| c == '.' || c == ',') {
            None => (number, ""),
            Some(i) => (&number[..i], &number[i + 1..]),
        };
        if integer.is_empty() && fraction.is_empty() {
            return Err(err());
        }
        let integer: i32 = if integer.is_empty() {
            0
        } else {
            integer.parse().map_err(|_| err())?
        };
        let digits: Vec<u8> = fraction
            .chars()
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(err)?;
        let fraction = if unit == ScaledUnit::ScaledPoint {
            0
        } else {
            Scaled::from_decimal_fraction(&digits).0
        };
        let value = unit.apply(integer, fraction).map_err(|_| err())?;
        Ok(if negative { -value } else { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_sizes() {
        assert_eq!(std::mem::size_of::<Scaled>(), 4);
    }

    #[test]
    fn decimal_fraction_rounding() {
        assert_eq!(Scaled::from_decimal_fraction(&[5]), Scaled(32768));
        assert_eq!(Scaled::from_decimal_fraction(&[]), Scaled(0));
        assert_eq!(Scaled::from_decimal_fraction(&[1]), Scaled(6554));
        assert_eq!(
            Scaled::from_decimal_fraction(&[9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9]),
            Scaled(65536)
        );
    }

    #[test]
    fn digits_past_the_seventeenth_are_ignored() {
        let seventeen = [1, 2, 3, 4, 5, 6, 7, 8, 9, 1, 2, 3, 4, 5, 6, 7, 8];
        let mut longer = seventeen.to_vec();
        longer.extend([9, 9, 9]);
        assert_eq!(
            Scaled::from_decimal_fraction(&seventeen),
            Scaled::from_decimal_fraction(&longer)
        );
    }

    #[test]
    fn point_with_fraction() {
        let f = Scaled::from_decimal_fraction(&[5]).0;
        assert_eq!(ScaledUnit::Point.apply(123, f), Ok(Scaled(8093696)));
    }

    #[test]
    fn one_inch() {
        assert_eq!(ScaledUnit::Inch.apply(1, 0), Ok(Scaled(4736286)));
    }

    #[test]
    fn scaled_points_discard_fraction() {
        assert_eq!(ScaledUnit::ScaledPoint.apply(7, 1000), Ok(Scaled(7)));
    }

    #[test]
    fn large_integer_part_overflows() {
        assert_eq!(
            ScaledUnit::Point.apply(16384, 0),
            Err(ArithmeticError::Overflow)
        );
        assert_eq!(ScaledUnit::Point.apply(16383, 0), Ok(Scaled(16383 * 65536)));
    }

    #[test]
    fn print_scaled() {
        let cases = vec![
            (Scaled(8093696), "123.5pt"),
            (Scaled::ONE, "1.0pt"),
            (Scaled::ZERO, "0.0pt"),
            (Scaled(4736286), "72.26999pt"),
            (Scaled(-32768), "-0.5pt"),
            (Scaled(1), "0.00002pt"),
        ];
        for (value, want) in cases {
            assert_eq!(format!("{value}"), want);
        }
    }

    #[test]
    fn printing_reparses_to_the_same_value() {
        for raw in [0, 1, 7, 100, 4736286, 8093696, 123456789, 65535, 98304] {
            let printed = format!("{}", Scaled(raw));
            let reparsed: Scaled = printed.parse().unwrap();
            assert_eq!(reparsed, Scaled(raw), "printed form {printed}");
        }
    }

    #[test]
    fn from_str() {
        assert_eq!("123.5pt".parse::<Scaled>(), Ok(Scaled(8093696)));
        assert_eq!("1in".parse::<Scaled>(), Ok(Scaled(4736286)));
        assert_eq!("-.5pt".parse::<Scaled>(), Ok(Scaled(-32768)));
        assert_eq!("12sp".parse::<Scaled>(), Ok(Scaled(12)));
        assert!("12".parse::<Scaled>().is_err());
        assert!("12qq".parse::<Scaled>().is_err());
    }

    #[test]
    fn half() {
        assert_eq!(Scaled(5).half(), Scaled(3));
        assert_eq!(Scaled(-5).half(), Scaled(-2));
        assert_eq!(Scaled(4).half(), Scaled(2));
    }

    #[test]
    fn nx_plus_y() {
        assert_eq!(Scaled(10).nx_plus_y(3, Scaled(1)), Ok(Scaled(31)));
        assert_eq!(Scaled(10).nx_plus_y(-3, Scaled(1)), Ok(Scaled(-29)));
        assert_eq!(
            Scaled::MAX_DIMEN.nx_plus_y(2, Scaled(0)),
            Err(ArithmeticError::Overflow)
        );
    }
}
