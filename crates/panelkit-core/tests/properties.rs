//! Property-based tests for panelkit-core control primitives.
//!
//! Covers filter convergence, catch-up hold/bounds behaviour and CV mapping
//! identities using proptest for randomized input generation.

use proptest::prelude::*;
use panelkit_core::{
    CATCH_THRESHOLD, CatchUp, CatchUpPolicy, CatchUpState, ChannelFilter, CvMapping, MAX_SKEW,
    MOVEMENT_THRESHOLD, resolve,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// For any coefficient in (0, 1] and constant input, the filter approaches
    /// the input monotonically and, once within epsilon, stays there.
    #[test]
    fn filter_converges_monotonically(
        coeff in 0.001f32..=1.0f32,
        start in 0.0f32..=1.0f32,
        target in 0.0f32..=1.0f32,
    ) {
        let mut filter = ChannelFilter::new(coeff);
        filter.reset(start);

        let eps = 1e-3;
        let mut prev_dist = (filter.filtered() - target).abs();
        let mut settled = false;

        for _ in 0..20_000 {
            let out = filter.update(target);
            let dist = (out - target).abs();
            prop_assert!(
                dist <= prev_dist + 1e-6,
                "distance grew: {} -> {} (coeff={}, start={}, target={})",
                prev_dist, dist, coeff, start, target
            );
            if settled {
                prop_assert!(dist < eps, "left the epsilon band after settling");
            }
            if dist < eps {
                settled = true;
            }
            prev_dist = dist;
        }
        prop_assert!(settled, "never settled (coeff={})", coeff);
    }

    /// After `on_page_change(s)`, every reading within the movement threshold
    /// of the baseline returns exactly `s`.
    #[test]
    fn waiting_holds_exact_value(
        stored in 0.0f32..=1.0f32,
        jitter in prop::collection::vec(-0.029f32..=0.029f32, 1..64),
        skew in any::<bool>(),
    ) {
        let policy = if skew { CatchUpPolicy::Skew } else { CatchUpPolicy::Immediate };
        let mut c = CatchUp::new(policy);
        c.on_page_change(stored);

        for j in jitter {
            let out = c.process(stored + j);
            prop_assert_eq!(out, stored);
            prop_assert_eq!(c.state(), CatchUpState::Waiting);
        }

        // First reading past the threshold leaves Waiting.
        let moved = if stored > 0.5 { stored - 0.05 } else { stored + 0.05 };
        c.process(moved);
        prop_assert_ne!(c.state(), CatchUpState::Waiting);
    }

    /// Skew catch-up under an arbitrary bounded random walk never leaves
    /// [0, 1] and never moves the output by more than the clamped skew
    /// ratio times the knob travel since the last accepted reading.
    #[test]
    fn skew_output_is_bounded(
        stored in 0.0f32..=1.0f32,
        baseline in 0.0f32..=1.0f32,
        steps in prop::collection::vec(-0.02f32..=0.02f32, 1..400),
    ) {
        let mut c = CatchUp::new(CatchUpPolicy::Skew);
        c.arm(stored, baseline);

        let mut knob = baseline;
        let mut prev = c.value();
        for step in steps {
            knob = (knob + step).clamp(0.0, 1.0);
            let travel = (knob - c.baseline()).abs();
            let out = c.process(knob);
            prop_assert!((0.0..=1.0).contains(&out), "output {} out of range", out);
            prop_assert!((0.0..=1.0).contains(&c.stored()));
            let bound = MAX_SKEW * travel + CATCH_THRESHOLD + 1e-5;
            prop_assert!(
                (out - prev).abs() <= bound,
                "output jumped {} -> {} (bound {})", prev, out, bound
            );
            prev = out;
        }
    }

    /// Armed where the knob rests, any ramp of small steps that leaves the
    /// movement threshold picks the parameter up within two readings.
    #[test]
    fn skew_ramp_from_rest_position_tracks(
        start in 0.05f32..=0.5f32,
        step in 0.006f32..=0.02f32,
    ) {
        let mut c = CatchUp::new(CatchUpPolicy::Skew);
        c.on_page_change(start);

        let mut knob = start;
        let mut moved = 0;
        while knob < 0.95 && c.state() != CatchUpState::Tracking {
            knob += step;
            c.process(knob);
            prop_assert!((0.0..=1.0).contains(&c.stored()));
            if c.state() != CatchUpState::Waiting {
                moved += 1;
            }
        }
        prop_assert_eq!(c.state(), CatchUpState::Tracking);
        prop_assert!(moved <= 2, "took {} readings after leaving Waiting", moved);
        prop_assert!((c.stored() - knob).abs() < CATCH_THRESHOLD);
    }

    /// With depth 0 the mapping returns exactly its origin, and with a centred
    /// CV reading it returns exactly its origin for any depth.
    #[test]
    fn cv_mapping_identities(
        base in 0.0f32..=1.0f32,
        origin in 0.0f32..=1.0f32,
        reading in 0.0f32..=1.0f32,
        depth in -1.0f32..=1.0f32,
    ) {
        let mut m = CvMapping::unmapped();
        m.arm(0, origin);

        m.set_attenuverter(0.0);
        prop_assert_eq!(resolve(base, reading, &m), origin);

        m.set_attenuverter(depth);
        prop_assert_eq!(resolve(base, 0.5, &m), origin);

        let out = resolve(base, reading, &m);
        prop_assert!((0.0..=1.0).contains(&out));
    }
}

/// Movement exactly at the threshold does not count as movement.
#[test]
fn threshold_is_exclusive() {
    let mut c = CatchUp::new(CatchUpPolicy::Immediate);
    c.arm(0.1, 0.5);
    c.process(0.5 + MOVEMENT_THRESHOLD * 0.99);
    assert_eq!(c.state(), CatchUpState::Waiting);
}
