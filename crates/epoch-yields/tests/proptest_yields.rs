//! Property-based tests for the yield algebra.

use epoch_yields::{YieldCategory, YieldMode, YieldStack, Yields};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

/// Amounts on a 1/4 grid so sums stay exact in f64.
fn arb_amount() -> impl Strategy<Value = f64> {
    (-400i32..400).prop_map(|q| f64::from(q) / 4.0)
}

fn arb_yields() -> impl Strategy<Value = Yields> {
    proptest::collection::vec(arb_amount(), YieldCategory::PRIMARY.len()).prop_map(|amounts| {
        let mut y = Yields::base();
        for (c, v) in YieldCategory::PRIMARY.iter().zip(amounts) {
            y.set(*c, v);
        }
        y
    })
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// null + x == x, both by total and category by category.
    #[test]
    fn null_is_additive_identity(x in arb_yields()) {
        let mut n = Yields::null();
        n.add(&x);
        prop_assert!(n == x);
        for c in YieldCategory::PRIMARY {
            prop_assert_eq!(n.get(c), x.get(c));
        }
    }

    /// Mutating a clone never reaches the original.
    #[test]
    fn clone_has_value_semantics(x in arb_yields(), y in arb_yields()) {
        let before = x.clone();
        let mut copy = x.clone();
        copy.add(&y).multiply(&y).subtract(&y);
        prop_assert!(x.same_values(&before));
    }

    /// Subtract undoes add on the 1/4 grid.
    #[test]
    fn subtract_inverts_add(x in arb_yields(), y in arb_yields()) {
        let mut z = x.clone();
        z.add(&y).subtract(&y);
        prop_assert!(z.same_values(&x));
    }

    /// Multiplying by an all-sentinel record changes nothing.
    #[test]
    fn sentinel_multiply_is_noop(x in arb_yields(), picks in proptest::collection::vec(0usize..3, 7)) {
        let sentinels = [0.0, 1.0, -1.0];
        let mut modifier = Yields::base();
        for (c, p) in YieldCategory::PRIMARY.iter().zip(picks) {
            modifier.set(*c, sentinels[p]);
        }
        let mut z = x.clone();
        z.multiply(&modifier);
        prop_assert!(z.same_values(&x));
        z.divide(&modifier);
        prop_assert!(z.same_values(&x));
    }

    /// calculate always yields whole numbers and matches the closed form.
    #[test]
    fn calculate_matches_formula(
        base in arb_yields(),
        add in arb_yields(),
        pa in arb_yields(),
        pc in arb_yields(),
    ) {
        let mut out = base.clone();
        out.calculate(Some(&add), Some(&pa), Some(&pc));
        for c in YieldCategory::PRIMARY {
            let expected = ((base.get(c) + add.get(c)) * (1.0 + pa.get(c)) * (1.0 + pc.get(c)))
                .round_ties_even();
            prop_assert_eq!(out.get(c), expected);
            prop_assert_eq!(out.get(c).fract(), 0.0);
        }
    }

    /// A stack with one contribution per stage resolves like calculate.
    #[test]
    fn stack_agrees_with_calculate(base in arb_yields(), add in arb_yields(), pa in arb_yields()) {
        let mut stack = YieldStack::new();
        stack.push(base.clone());
        stack.push(add.clone().with_mode(YieldMode::Additive));
        stack.push(pa.clone().with_mode(YieldMode::PercentageAdditive));

        let mut direct = base.clone();
        direct.calculate(Some(&add), Some(&pa), None);
        prop_assert!(stack.resolve().same_values(&direct));
    }
}
