//! Properties of the Moser density split.

use proptest::prelude::*;
use riemannscore_losses::split_density;

proptest! {
    #[test]
    fn positive_part_respects_the_floor(mu in -1e6..1e6_f64, eps in 1e-8..1.0_f64) {
        let (plus, _) = split_density(mu, eps);
        prop_assert!(plus >= eps);
    }

    #[test]
    fn negative_part_is_non_negative(mu in -1e6..1e6_f64, eps in 1e-8..1.0_f64) {
        let (_, minus) = split_density(mu, eps);
        prop_assert!(minus >= 0.0);
    }

    #[test]
    fn parts_recombine(mu in -1e3..1e3_f64, eps in 1e-8..1.0_f64) {
        // max(eps, mu) + min(eps, mu) = eps + mu
        let (plus, minus) = split_density(mu, eps);
        prop_assert!((plus - minus - mu).abs() <= 1e-9 * mu.abs().max(1.0));
    }

    #[test]
    fn only_one_side_is_active(mu in -1e3..1e3_f64, eps in 1e-8..1.0_f64) {
        let (plus, minus) = split_density(mu, eps);
        prop_assert!(plus == eps || minus == 0.0);
    }
}

#[test]
fn infinite_densities_keep_their_sign() {
    assert_eq!(split_density(f64::INFINITY, 1e-5), (f64::INFINITY, 0.0));
    let (plus, minus) = split_density(f64::NEG_INFINITY, 1e-5);
    assert_eq!(plus, 1e-5);
    assert_eq!(minus, f64::INFINITY);
}
