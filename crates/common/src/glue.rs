use super::*;

/// One dimension of a glue: its natural width, its stretch or its shrink.
///
/// The order is 0 for finite lengths and `n > 0` for the infinite
///     orders `fil`, `fill`, `filll` and so on.
/// When the order is positive the value is a coefficient of that order of infinity
///     rather than an absolute length.
///
/// Components with different orders never mix:
///     comparisons look at the order first,
///     and addition keeps only the component with the larger order.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlueComponent {
    /// The value in scaled points, or the coefficient of the infinite order.
    pub value: i64,
    /// 0 for finite components; the number of `l`s in `fil`, `fill`, ... otherwise.
    pub order: i32,
}

impl GlueComponent {
    pub const ZERO: GlueComponent = GlueComponent { value: 0, order: 0 };

    pub fn new(value: i64, order: i32) -> GlueComponent {
        GlueComponent { value, order }
    }

    /// Returns a finite component with the provided length.
    pub fn finite(scaled: Scaled) -> GlueComponent {
        GlueComponent {
            value: scaled.0 as i64,
            order: 0,
        }
    }

    /// Returns the value of this component as a [Scaled] number.
    ///
    /// Values outside the range of a dimension are clamped to [Scaled::MAX_DIMEN].
    pub fn scaled(&self) -> Scaled {
        let max = Scaled::MAX_DIMEN.0 as i64;
        Scaled(self.value.clamp(-max, max) as i32)
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Order-aware accumulation.
    ///
    /// Equal orders are summed, a larger order replaces this component entirely,
    ///     and a smaller order leaves this component unchanged.
    pub fn add(self, other: GlueComponent) -> GlueComponent {
        match self.order.cmp(&other.order) {
            std::cmp::Ordering::Equal => GlueComponent {
                value: self.value + other.value,
                order: self.order,
            },
            std::cmp::Ordering::Less => other,
            std::cmp::Ordering::Greater => self,
        }
    }

    /// Order-aware accumulation that reports results larger than [Scaled::MAX_DIMEN].
    pub fn checked_add(self, other: GlueComponent) -> Result<GlueComponent, ArithmeticError> {
        let sum = self.add(other);
        check_range(sum)
    }

    /// Accumulation as performed by `\advance` on a stretch or shrink.
    ///
    /// A zero component has no order,
    ///     and a component of larger order only takes over when its value is nonzero.
    ///
    /// TeX.2021.1239.
    pub fn checked_advance(self, other: GlueComponent) -> Result<GlueComponent, ArithmeticError> {
        let lhs = if self.value == 0 {
            GlueComponent::ZERO
        } else {
            self
        };
        if lhs.order < other.order && other.value == 0 {
            return Ok(lhs);
        }
        lhs.checked_add(other)
    }

    /// Multiplies the value by _nominator/denominator_ using truncating integer division.
    ///
    /// The product is computed with 128-bit intermediates so it never wraps;
    ///     a result whose magnitude exceeds [Scaled::MAX_DIMEN] is an overflow error.
    pub fn multiply(
        self,
        nominator: i64,
        denominator: i64,
    ) -> Result<GlueComponent, ArithmeticError> {
        if denominator == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        let product = self.value as i128 * nominator as i128 / denominator as i128;
        if product.abs() > Scaled::MAX_DIMEN.0 as i128 {
            return Err(ArithmeticError::Overflow);
        }
        Ok(GlueComponent {
            value: product as i64,
            order: self.order,
        })
    }

    pub fn negate(self) -> GlueComponent {
        GlueComponent {
            value: -self.value,
            order: self.order,
        }
    }

    /// Writes this component in TeX's canonical form.
    ///
    /// Finite components are followed by the provided unit;
    ///     infinite components are followed by `fi` and one `l` per order.
    pub fn write_with_unit<W: Write>(&self, w: &mut W, unit: &str) -> std::fmt::Result {
        write_scaled(w, self.value)?;
        if self.order <= 0 {
            w.write_str(unit)
        } else {
            w.write_str("fi")?;
            for _ in 0..self.order {
                w.write_char('l')?;
            }
            Ok(())
        }
    }
}

fn check_range(c: GlueComponent) -> Result<GlueComponent, ArithmeticError> {
    if c.value.abs() > Scaled::MAX_DIMEN.0 as i64 {
        Err(ArithmeticError::Overflow)
    } else {
        Ok(c)
    }
}

impl From<Scaled> for GlueComponent {
    fn from(value: Scaled) -> Self {
        GlueComponent::finite(value)
    }
}

impl PartialOrd for GlueComponent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GlueComponent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl std::fmt::Display for GlueComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_with_unit(f, "pt")
    }
}

/// A glue specification: a natural width together with a stretch and a shrink.
///
/// The width is always finite.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Glue {
    pub width: GlueComponent,
    pub stretch: GlueComponent,
    pub shrink: GlueComponent,
}

impl Glue {
    pub const ZERO: Glue = Glue {
        width: GlueComponent::ZERO,
        stretch: GlueComponent::ZERO,
        shrink: GlueComponent::ZERO,
    };

    /// Returns a rigid glue with the provided width.
    pub fn rigid(width: Scaled) -> Glue {
        Glue {
            width: width.into(),
            ..Default::default()
        }
    }

    pub fn width(&self) -> Scaled {
        self.width.scaled()
    }

    /// Component-wise order-aware addition, as performed by `\advance`.
    pub fn checked_add(self, rhs: Glue) -> Result<Glue, ArithmeticError> {
        Ok(Glue {
            width: self.width.checked_add(rhs.width)?,
            stretch: self.stretch.checked_advance(rhs.stretch)?,
            shrink: self.shrink.checked_advance(rhs.shrink)?,
        })
    }

    /// Multiplies every component by _n/d_.
    pub fn multiply(self, n: i64, d: i64) -> Result<Glue, ArithmeticError> {
        Ok(Glue {
            width: self.width.multiply(n, d)?,
            stretch: self.stretch.multiply(n, d)?,
            shrink: self.shrink.multiply(n, d)?,
        })
    }

    pub fn negate(self) -> Glue {
        Glue {
            width: self.width.negate(),
            stretch: self.stretch.negate(),
            shrink: self.shrink.negate(),
        }
    }

    /// Writes this glue in TeX's canonical form, e.g. `3.0pt plus 1.0fil minus 2.0pt`.
    ///
    /// The stretch and shrink are omitted when they are zero.
    pub fn write_with_unit<W: Write>(&self, w: &mut W, unit: &str) -> std::fmt::Result {
        self.width.write_with_unit(w, unit)?;
        if !self.stretch.is_zero() {
            w.write_str(" plus ")?;
            self.stretch.write_with_unit(w, unit)?;
        }
        if !self.shrink.is_zero() {
            w.write_str(" minus ")?;
            self.shrink.write_with_unit(w, unit)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Glue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_with_unit(f, "pt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(value: i64, order: i32) -> GlueComponent {
        GlueComponent::new(value, order)
    }

    #[test]
    fn add_same_order_sums() {
        assert_eq!(c(3, 1).add(c(4, 1)), c(7, 1));
        assert_eq!(c(3, 0).add(c(-4, 0)), c(-1, 0));
    }

    #[test]
    fn higher_order_dominates() {
        let a = c(5 * 65536, 0);
        let b = c(65536, 1);
        assert_eq!(a.add(b), b);
        assert_eq!(b.add(a), b);
    }

    #[test]
    fn higher_order_replaces_even_when_smaller() {
        assert_eq!(c(100, 2).add(c(1, 3)), c(1, 3));
        assert_eq!(c(1, 3).add(c(100, 2)), c(1, 3));
    }

    #[test]
    fn advance_keeps_order_when_higher_order_is_zero() {
        assert_eq!(c(3, 1).checked_advance(c(0, 2)), Ok(c(3, 1)));
        assert_eq!(c(3, 0).checked_advance(c(0, 1)), Ok(c(3, 0)));
    }

    #[test]
    fn advance_switches_order_for_nonzero_higher_order() {
        assert_eq!(c(3, 1).checked_advance(c(2, 2)), Ok(c(2, 2)));
        assert_eq!(c(3, 2).checked_advance(c(2, 1)), Ok(c(3, 2)));
        assert_eq!(c(3, 2).checked_advance(c(-1, 2)), Ok(c(2, 2)));
    }

    #[test]
    fn advance_drops_the_order_of_a_zero_component() {
        assert_eq!(c(0, 3).checked_advance(c(5, 1)), Ok(c(5, 1)));
        assert_eq!(c(0, 3).checked_advance(c(5, 0)), Ok(c(5, 0)));
    }

    #[test]
    fn glue_advance_ignores_zero_infinite_stretch() {
        let lhs = Glue {
            width: c(65536, 0),
            stretch: c(2 * 65536, 0),
            shrink: c(65536, 1),
        };
        let rhs = Glue {
            width: c(65536, 0),
            stretch: c(0, 2),
            shrink: c(0, 0),
        };
        let want = Glue {
            width: c(2 * 65536, 0),
            stretch: c(2 * 65536, 0),
            shrink: c(65536, 1),
        };
        assert_eq!(lhs.checked_add(rhs), Ok(want));
    }

    #[test]
    fn comparison_uses_order_first() {
        assert!(c(1, 1) > c(1_000_000, 0));
        assert!(c(5, 1) > c(4, 1));
        assert!(c(5, 1) >= c(5, 1));
        assert!(c(-5, 2) > c(5, 1));
        assert!(c(4, 0) < c(5, 0));
        assert_eq!(c(4, 0).cmp(&c(4, 0)), std::cmp::Ordering::Equal);
    }

    #[test]
    fn multiply_truncates() {
        assert_eq!(c(10, 0).multiply(1, 3), Ok(c(3, 0)));
        assert_eq!(c(-10, 0).multiply(1, 3), Ok(c(-3, 0)));
        assert_eq!(c(10, 2).multiply(3, 2), Ok(c(15, 2)));
    }

    #[test]
    fn multiply_overflow_is_reported() {
        assert_eq!(
            c(Scaled::MAX_DIMEN.0 as i64, 0).multiply(2, 1),
            Err(ArithmeticError::Overflow)
        );
        assert_eq!(c(1, 0).multiply(1, 0), Err(ArithmeticError::DivisionByZero));
    }

    #[test]
    fn print() {
        assert_eq!(format!("{}", c(8093696, 0)), "123.5pt");
        assert_eq!(format!("{}", c(65536, 1)), "1.0fil");
        assert_eq!(format!("{}", c(2 * 65536, 3)), "2.0filll");
        assert_eq!(format!("{}", c(-32768, 2)), "-0.5fill");
    }

    #[test]
    fn print_glue() {
        let glue = Glue {
            width: c(3 * 65536, 0),
            stretch: c(65536, 1),
            shrink: GlueComponent::ZERO,
        };
        assert_eq!(format!("{glue}"), "3.0pt plus 1.0fil");
        let mut mu = String::new();
        glue.write_with_unit(&mut mu, "mu").unwrap();
        assert_eq!(mu, "3.0mu plus 1.0fil");
    }
}
