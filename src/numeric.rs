/// Integer and floating point to digit conversion.
///
/// Nothing in this module calls into a platform formatter. Integers are
/// rendered by repeated division, doubles are split into an integral and a
/// decimal fractional magnitude that the format engine prints as two
/// integers. Scientific form estimates `floor(log10(x))` with a short Taylor
/// series and checks it against a rational approximation of `10^n`, so the
/// results carry the same small extended-precision error as the estimates.

/// Digits rendered into a stack buffer before falling back to the heap.
pub const STACK_CACHE_SIZE: usize = 16;

/// Largest magnitude the fixed (`%f`) path accepts.
pub const FIXED_RANGE_MAX: f64 = 1.0e18;

/// Precision used when a float directive does not give one.
pub const DEFAULT_PRECISION: usize = 6;

/// Highest precision computed from the value; further digits print as `0`.
pub const MAX_PRECISION: usize = POWERS_OF_10.len() - 1;

const DBL_EXP_OFFSET: i32 = 1023;
const DBL_MAX_10_EXP: i32 = 308;
const DBL_MIN_POW10: f64 = 1.0e-308;
const SUBNORMAL_SCALE: f64 = 1.0e18;
const SUBNORMAL_SCALE_EXP: i32 = 18;

static POWERS_OF_10: [f64; 19] = [
    1e00, 1e01, 1e02, 1e03, 1e04, 1e05, 1e06, 1e07, 1e08, 1e09, 1e10, 1e11, 1e12, 1e13, 1e14,
    1e15, 1e16, 1e17, 1e18,
];

static SMALL_DIGITS: [u8; 16] = *b"0123456789abcdef";
static LARGE_DIGITS: [u8; 16] = *b"0123456789ABCDEF";

/// Radix of an integer conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Binary = 2,
    Octal = 8,
    Decimal = 10,
    Hex = 16,
}

impl Base {
    #[inline(always)]
    pub const fn radix(self) -> u64 {
        self as u64
    }
}

/// Glyph table for digit values 0..16.
#[inline(always)]
pub fn digit_glyphs(uppercase: bool) -> &'static [u8; 16] {
    if uppercase {
        &LARGE_DIGITS
    } else {
        &SMALL_DIGITS
    }
}

/// Number of digits `n` needs in `base`. Zero still takes one digit.
pub fn digit_count(mut n: u64, base: Base) -> usize {
    let mut count = 0;
    loop {
        n /= base.radix();
        count += 1;
        if n == 0 {
            return count;
        }
    }
}

/// Fills `out` with the digits of `n`, most significant first.
///
/// `out` should be exactly [`digit_count`] long; a shorter buffer keeps the
/// low-order digits.
pub fn write_digits(mut n: u64, base: Base, uppercase: bool, out: &mut [u8]) {
    let glyphs = digit_glyphs(uppercase);
    for slot in out.iter_mut().rev() {
        *slot = glyphs[(n % base.radix()) as usize];
        n /= base.radix();
    }
}

/// Renders `n` and hands the digits to `f`.
///
/// Up to [`STACK_CACHE_SIZE`] digits live on the stack; longer renderings
/// (binary and octal of large values) allocate once and free on return.
pub fn with_digits<R>(n: u64, base: Base, uppercase: bool, f: impl FnOnce(&[u8]) -> R) -> R {
    let count = digit_count(n, base);
    let mut stack = [0u8; STACK_CACHE_SIZE];
    let mut heap: Vec<u8>;
    let buf: &mut [u8] = if count > STACK_CACHE_SIZE {
        heap = vec![0u8; count];
        &mut heap[..]
    } else {
        &mut stack[..count]
    };
    write_digits(n, base, uppercase, buf);
    f(buf)
}

/// Parses digits in `base`, either glyph case. Rejects empty input,
/// foreign characters and values that overflow `u64`.
pub fn parse_digits(text: &[u8], base: Base) -> Option<u64> {
    if text.is_empty() {
        return None;
    }
    text.iter().try_fold(0u64, |acc, &byte| {
        let digit = (byte as char).to_digit(base.radix() as u32)? as u64;
        acc.checked_mul(base.radix())?.checked_add(digit)
    })
}

/// Field accessors over the IEEE-754 bits of a double.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleBits(u64);

impl DoubleBits {
    const MANTISSA_MASK: u64 = (1 << 52) - 1;
    const EXPONENT_MASK: u64 = 0x7FF;
    const EXPONENT_SHIFT: u32 = 52;

    #[inline(always)]
    pub fn new(value: f64) -> Self {
        Self(value.to_bits())
    }

    #[inline(always)]
    pub const fn from_raw(bits: u64) -> Self {
        Self(bits)
    }

    #[inline(always)]
    pub const fn sign(self) -> bool {
        self.0 >> 63 == 1
    }

    #[inline(always)]
    pub const fn biased_exponent(self) -> u16 {
        ((self.0 >> Self::EXPONENT_SHIFT) & Self::EXPONENT_MASK) as u16
    }

    #[inline(always)]
    pub const fn exponent(self) -> i32 {
        self.biased_exponent() as i32 - DBL_EXP_OFFSET
    }

    #[inline(always)]
    pub const fn mantissa(self) -> u64 {
        self.0 & Self::MANTISSA_MASK
    }

    /// Same sign and mantissa with the exponent field replaced.
    #[inline(always)]
    pub const fn with_biased_exponent(self, exponent: u16) -> Self {
        let cleared = self.0 & !(Self::EXPONENT_MASK << Self::EXPONENT_SHIFT);
        Self(cleared | ((exponent as u64 & Self::EXPONENT_MASK) << Self::EXPONENT_SHIFT))
    }

    #[inline(always)]
    pub fn to_f64(self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// Floor of `x` as an `i32`, without going through `f64::floor`.
pub fn floor_to_int(x: f64) -> i32 {
    if x >= 0.0 {
        return x as i32;
    }
    let n = x as i32;
    if n as f64 == x {
        n
    } else {
        n - 1
    }
}

/// Approximates `10^exp10`.
///
/// The power of two comes straight from the exponent bits; the leftover
/// factor `e^z` with `|z| < ln(2)/2` uses a continued-fraction approximant.
pub fn pow10_of_int(exp10: i32) -> f64 {
    if exp10 == -DBL_MAX_10_EXP {
        return DBL_MIN_POW10;
    }
    let exp2 = floor_to_int(exp10 as f64 * 3.321928094887362 + 0.5);
    let z = exp10 as f64 * 2.302585092994046 - exp2 as f64 * 0.6931471805599453;
    let z2 = z * z;
    let biased = ((exp2 + DBL_EXP_OFFSET) & 0x7FF) as u16;
    let power_of_two = DoubleBits::from_raw(0).with_biased_exponent(biased).to_f64();
    power_of_two * (1.0 + 2.0 * z / (2.0 - z + (z2 / (6.0 + (z2 / (10.0 + z2 / 14.0))))))
}

/// Approximates `log10(x)` for a positive, normal `x`.
///
/// The mantissa is moved into `[1, 2)` and expanded around 1.5 to four
/// terms; the binary exponent contributes `exp2 * log10(2)` exactly.
pub fn log10_of_positive(x: f64) -> f64 {
    let bits = DoubleBits::new(x);
    let exp2 = bits.exponent();
    let z = bits.with_biased_exponent(DBL_EXP_OFFSET as u16).to_f64() - 1.5;
    0.1760912590556812420
        + z * 0.2895296546021678851
        - z * z * 0.0965098848673892950
        + z * z * z * 0.0428932821632841311
        + exp2 as f64 * 0.30102999566398119521
}

/// "value × raw_factor" when `multiply`, otherwise "value / raw_factor".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingFactor {
    pub raw_factor: f64,
    pub multiply: bool,
}

impl ScalingFactor {
    #[inline(always)]
    pub fn apply(self, value: f64) -> f64 {
        if self.multiply {
            value * self.raw_factor
        } else {
            value / self.raw_factor
        }
    }

    #[inline(always)]
    pub fn unapply(self, scaled: f64) -> f64 {
        if self.multiply {
            scaled / self.raw_factor
        } else {
            scaled * self.raw_factor
        }
    }

    /// Folds an extra multiplicative factor in, keeping the stored factor
    /// as close to 1 as the two exponents allow.
    pub fn combine(self, extra: f64) -> Self {
        if self.multiply {
            return Self {
                raw_factor: self.raw_factor * extra,
                multiply: true,
            };
        }
        let factor_exp2 = DoubleBits::new(self.raw_factor).exponent();
        let extra_exp2 = DoubleBits::new(extra).exponent();
        if factor_exp2.abs() > extra_exp2.abs() {
            Self {
                raw_factor: self.raw_factor / extra,
                multiply: false,
            }
        } else {
            Self {
                raw_factor: extra / self.raw_factor,
                multiply: true,
            }
        }
    }
}

/// A double split for printing.
///
/// `fractional` holds the first `precision` decimal digits as an integer
/// and is always below `10^precision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumberComponents {
    pub integral: u64,
    pub fractional: u64,
    pub negative: bool,
}

/// Mantissa components plus the decimal exponent of scientific form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScientificComponents {
    pub components: NumberComponents,
    pub exponent: i32,
}

/// Splits `value` for fixed notation, or `None` when the magnitude is
/// outside [`FIXED_RANGE_MAX`] (NaN included).
pub fn decompose_fixed(value: f64, precision: usize) -> Option<NumberComponents> {
    if !(-FIXED_RANGE_MAX..=FIXED_RANGE_MAX).contains(&value) {
        return None;
    }
    Some(split_decimal(value, precision))
}

fn split_decimal(value: f64, precision: usize) -> NumberComponents {
    let negative = DoubleBits::new(value).sign();
    let abs = value.abs();
    let precision = precision.min(MAX_PRECISION);
    let power = POWERS_OF_10[precision];

    let mut integral = abs as u64;
    let scaled = (abs - integral as f64) * power;
    let mut fractional = scaled as u64;
    let remainder = scaled - fractional as f64;

    if precision == 0 {
        let remainder = abs - integral as f64;
        if remainder > 0.5 || (remainder == 0.5 && integral & 1 == 1) {
            integral += 1;
        }
    } else if remainder > 0.5 || (remainder == 0.5 && fractional & 1 == 1) {
        fractional += 1;
        if fractional as f64 >= power {
            fractional = 0;
            integral += 1;
        }
    }

    NumberComponents {
        integral,
        fractional,
        negative,
    }
}

/// Splits `value` as `m × 10^e` with `1 <= m < 10` (zero gives `0 × 10^0`).
pub fn decompose_scientific(value: f64, precision: usize) -> ScientificComponents {
    let negative = DoubleBits::new(value).sign();
    let abs = value.abs();
    let precision = precision.min(MAX_PRECISION);

    if abs == 0.0 {
        return ScientificComponents {
            components: NumberComponents {
                negative,
                ..NumberComponents::default()
            },
            exponent: 0,
        };
    }

    // Subnormals lack the implicit leading bit the estimate relies on.
    if DoubleBits::new(abs).biased_exponent() == 0 {
        let mut parts = decompose_scientific(value * SUBNORMAL_SCALE, precision);
        parts.exponent -= SUBNORMAL_SCALE_EXP;
        return parts;
    }

    let mut exponent = floor_to_int(log10_of_positive(abs));
    let mut p10 = pow10_of_int(exponent);
    if abs < p10 {
        exponent -= 1;
        p10 /= 10.0;
    } else if abs >= p10 * 10.0 {
        exponent += 1;
        p10 *= 10.0;
    }

    let in_table = (exponent.unsigned_abs() as usize) < POWERS_OF_10.len();
    let normalization = ScalingFactor {
        raw_factor: if in_table {
            POWERS_OF_10[exponent.unsigned_abs() as usize]
        } else {
            p10
        },
        multiply: exponent < 0 && in_table,
    };

    let mut components = split_normalized(abs, negative, precision, normalization, exponent);
    // 9.9996 at precision 3 rounds to 10.000
    if components.integral >= 10 {
        components.integral = 1;
        components.fractional = 0;
        exponent += 1;
    }

    ScientificComponents {
        components,
        exponent,
    }
}

fn split_normalized(
    abs: f64,
    negative: bool,
    precision: usize,
    normalization: ScalingFactor,
    exponent: i32,
) -> NumberComponents {
    let scaled = normalization.apply(abs);

    // A factor that also shifts `precision` digits into the mantissa would
    // not be representable this close to the exponent limit.
    if precision as i32 - exponent >= DBL_MAX_10_EXP - 1 {
        return NumberComponents {
            negative,
            ..split_decimal(scaled, precision)
        };
    }

    let mut integral = scaled as u64;
    let remainder = abs - normalization.unapply(integral as f64);
    let power = POWERS_OF_10[precision];
    let mut scaled_remainder = normalization.combine(power).apply(remainder);
    let mut fractional = scaled_remainder as u64;
    scaled_remainder -= fractional as f64;

    if precision == 0 {
        if scaled_remainder > 0.5 || (scaled_remainder == 0.5 && integral & 1 == 1) {
            integral += 1;
        }
    } else {
        if scaled_remainder >= 0.5 {
            fractional += 1;
        }
        if scaled_remainder == 0.5 {
            fractional &= !1;
        }
        if fractional as f64 >= power {
            fractional = 0;
            integral += 1;
        }
    }

    NumberComponents {
        integral,
        fractional,
        negative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_bits_fields() {
        let bits = DoubleBits::new(-1.5);
        assert!(bits.sign());
        assert_eq!(bits.biased_exponent(), 1023);
        assert_eq!(bits.exponent(), 0);
        assert_eq!(bits.mantissa(), 1 << 51);

        let doubled = bits.with_biased_exponent(1024).to_f64();
        assert_eq!(doubled, -3.0);
    }

    #[test]
    fn test_floor_to_int() {
        assert_eq!(floor_to_int(2.7), 2);
        assert_eq!(floor_to_int(-2.0), -2);
        assert_eq!(floor_to_int(-2.1), -3);
        assert_eq!(floor_to_int(0.0), 0);
    }

    #[test]
    fn test_pow10_approximation() {
        for exp in -300..=300 {
            let approx = pow10_of_int(exp);
            let exact: f64 = format!("1e{}", exp).parse().unwrap();
            let relative = ((approx - exact) / exact).abs();
            assert!(relative < 1e-9, "10^{} approximated as {}", exp, approx);
        }
        assert_eq!(pow10_of_int(-308), 1.0e-308);
    }

    #[test]
    fn test_log10_floor_close_to_exact() {
        for &x in &[1.0, 2.0, 9.5, 12.0, 123.456, 0.001234, 5.0e-200, 7.7e250] {
            let estimate = log10_of_positive(x);
            assert!((estimate - x.log10()).abs() < 0.01, "log10({}) ~ {}", x, estimate);
        }
    }

    #[test]
    fn test_combine_keeps_factor_small() {
        let divide_by_100 = ScalingFactor { raw_factor: 100.0, multiply: false };
        let combined = divide_by_100.combine(1000.0);
        assert!(combined.multiply);
        assert_eq!(combined.raw_factor, 10.0);

        let divide_by_huge = ScalingFactor { raw_factor: 1e40, multiply: false };
        let combined = divide_by_huge.combine(1000.0);
        assert!(!combined.multiply);
        assert!((combined.raw_factor - 1e37).abs() / 1e37 < 1e-15);
    }

    #[test]
    fn test_digit_buffer_spills_to_heap() {
        let rendered = with_digits(u64::MAX, Base::Binary, false, |digits| digits.to_vec());
        assert_eq!(rendered.len(), 64);
        assert!(rendered.iter().all(|&d| d == b'1'));

        let rendered = with_digits(0xBEEF, Base::Hex, true, |digits| digits.to_vec());
        assert_eq!(rendered, b"BEEF");
    }
}
