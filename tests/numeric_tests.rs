use dbg_logger::numeric::{
    decompose_fixed, decompose_scientific, parse_digits, with_digits, Base, FIXED_RANGE_MAX,
};
use dbg_logger::{args, snprintf, sprintf};
use proptest::prelude::*;

fn any_base() -> impl Strategy<Value = Base> {
    prop_oneof![
        Just(Base::Binary),
        Just(Base::Octal),
        Just(Base::Decimal),
        Just(Base::Hex),
    ]
}

proptest! {
    #[test]
    fn integer_digits_decode_back(
        value in any::<u64>(),
        base in any_base(),
        upper in any::<bool>(),
    ) {
        let decoded = with_digits(value, base, upper, |digits| parse_digits(digits, base));
        prop_assert_eq!(decoded, Some(value));
    }

    #[test]
    fn formatted_hex_decodes_back(value in any::<u64>()) {
        let text = sprintf("%llx", &args![value]);
        prop_assert_eq!(u64::from_str_radix(&text, 16).ok(), Some(value));
    }

    #[test]
    fn fixed_form_within_rounding_bound(value in -1.0e6f64..1.0e6, precision in 0usize..=17) {
        let text = sprintf("%.*f", &args![precision, value]);
        let parsed: f64 = text.parse().unwrap();
        let bound = 0.5 * 10f64.powi(-(precision as i32)) + 1e-9;
        prop_assert!((parsed - value).abs() <= bound, "{} -> {}", value, text);
    }

    #[test]
    fn integral_ties_round_to_even(whole in 0u32..1_000_000) {
        let text = sprintf("%.0f", &args![whole as f64 + 0.5]);
        let rounded: u64 = text.parse().unwrap();
        prop_assert_eq!(rounded % 2, 0);
        prop_assert!(rounded == whole as u64 || rounded == whole as u64 + 1);
    }

    #[test]
    fn scientific_agrees_with_fixed(value in 1.0f64..1.0e12) {
        let fixed: f64 = sprintf("%.6f", &args![value]).parse().unwrap();
        let scientific: f64 = sprintf("%.9e", &args![value]).parse().unwrap();
        let relative = (fixed - scientific).abs() / value;
        prop_assert!(relative < 1e-6, "{} vs {}", fixed, scientific);
    }

    #[test]
    fn scientific_mantissa_is_normalized(value in prop::num::f64::NORMAL) {
        let parts = decompose_scientific(value, 6);
        prop_assert!((1..10).contains(&parts.components.integral));
        prop_assert!(parts.components.fractional < 1_000_000);
        prop_assert_eq!(parts.components.negative, value < 0.0);
    }

    #[test]
    fn subnormal_mantissa_is_normalized(value in prop::num::f64::SUBNORMAL) {
        let parts = decompose_scientific(value, 6);
        prop_assert!((1..10).contains(&parts.components.integral));
        prop_assert!((-324..=-308).contains(&parts.exponent), "{:e}", value);

        let parsed: f64 = sprintf("%e", &args![value]).parse().unwrap();
        prop_assert!((parsed - value).abs() <= 2e-6 * value.abs(), "{:e}", value);
    }

    #[test]
    fn memory_sink_never_overflows(
        size in 0usize..48,
        width in 0usize..40,
        precision in 0usize..20,
        value in any::<f64>(),
        text in "[a-z]{0,30}",
    ) {
        let mut buf = vec![0xa5u8; size + 16];
        let (target, guard) = buf.split_at_mut(size);
        snprintf(
            target,
            "%*.*f|%-*s|%*.*x",
            &args![width, precision, value, width, text.as_str(), width, precision, 0xabcdu32],
        );
        prop_assert!(guard.iter().all(|&byte| byte == 0xa5));
        if size > 0 {
            prop_assert!(target.contains(&0));
        }
    }
}

#[test]
fn test_fixed_range_limit() {
    assert!(decompose_fixed(FIXED_RANGE_MAX, 2).is_some());
    assert!(decompose_fixed(-FIXED_RANGE_MAX * 10.0, 2).is_none());
    assert!(decompose_fixed(f64::NAN, 2).is_none());
}

#[test]
fn test_fraction_rollover() {
    let parts = decompose_fixed(0.9999, 3).unwrap();
    assert_eq!((parts.integral, parts.fractional), (1, 0));

    let parts = decompose_fixed(-41.5, 0).unwrap();
    assert_eq!(parts.integral, 42);
    assert!(parts.negative);
}

#[test]
fn test_scientific_extremes() {
    let tiny = decompose_scientific(2.5e-300, 2);
    assert_eq!(tiny.exponent, -300);
    assert_eq!(tiny.components.integral, 2);
    assert_eq!(tiny.components.fractional, 50);

    let huge = decompose_scientific(f64::MAX, 3);
    assert_eq!(huge.exponent, 308);
    assert_eq!(huge.components.integral, 1);
    assert_eq!(huge.components.fractional, 798);
}

#[test]
fn test_subnormal_scientific() {
    assert_eq!(sprintf("%e", &args![1.0e-310]), "1.000000e-310");
    assert_eq!(sprintf("%e", &args![2.0e-320]), "1.999978e-320");
    assert_eq!(sprintf("%.3E", &args![-f64::from_bits(1)]), "-4.941E-324");

    let smallest = decompose_scientific(f64::from_bits(1), 6);
    assert_eq!(smallest.exponent, -324);
    assert_eq!(smallest.components.integral, 4);
    assert_eq!(smallest.components.fractional, 940656);
}

#[test]
fn test_every_base_renders_zero() {
    for base in [Base::Binary, Base::Octal, Base::Decimal, Base::Hex] {
        with_digits(0, base, false, |digits| assert_eq!(digits, b"0"));
    }
}
