//! Property tests for the control-law building blocks and controllers.

use std::sync::Arc;

use proptest::prelude::*;

use smc_tune::domain::models::control::{
    AdaptationConfig, AdaptationLaw, ControlHistory, SlidingSurface, SwitchingFunction,
};
use smc_tune::domain::models::{ControllerKind, ControllerSettings, GainBounds, State};
use smc_tune::infrastructure::plant::DoublePendulum;
use smc_tune::services::controllers::validate_sta_gains;
use smc_tune::services::ControllerBuilder;

fn switching() -> impl Strategy<Value = SwitchingFunction> {
    prop_oneof![
        Just(SwitchingFunction::Sign),
        Just(SwitchingFunction::Saturation),
        Just(SwitchingFunction::Tanh),
    ]
}

fn kind() -> impl Strategy<Value = ControllerKind> {
    prop_oneof![
        Just(ControllerKind::Classical),
        Just(ControllerKind::SuperTwisting),
        Just(ControllerKind::Adaptive),
        Just(ControllerKind::Hybrid),
    ]
}

fn near_upright() -> impl Strategy<Value = State> {
    (
        -1.0..1.0f64,
        -0.4..0.4f64,
        -0.4..0.4f64,
        -1.0..1.0f64,
        -2.0..2.0f64,
        -2.0..2.0f64,
    )
        .prop_map(|(x, t1, t2, xd, t1d, t2d)| State::new(x, t1, t2, xd, t1d, t2d))
}

proptest! {
    /// Property: switching output is bounded and odd
    #[test]
    fn prop_switching_bounded_and_odd(
        function in switching(),
        s in -1.0e3..1.0e3f64,
        phi in 1.0e-4..10.0f64,
    ) {
        let value = function.compute(s, phi).unwrap();
        prop_assert!((-1.0..=1.0).contains(&value));
        let mirrored = function.compute(-s, phi).unwrap();
        prop_assert!((value + mirrored).abs() < 1e-12);
    }

    /// Property: smooth switching rejects a non-positive boundary layer
    #[test]
    fn prop_smooth_switching_rejects_non_positive_layer(
        s in -10.0..10.0f64,
        phi in -10.0..=0.0f64,
    ) {
        prop_assert!(SwitchingFunction::Saturation.compute(s, phi).is_err());
        prop_assert!(SwitchingFunction::Tanh.compute(s, phi).is_err());
    }

    /// Property: the surface is linear in the state
    #[test]
    fn prop_surface_is_linear(
        gains in prop::array::uniform4(0.1..20.0f64),
        a in near_upright(),
        b in near_upright(),
        scale in -3.0..3.0f64,
    ) {
        let surface = SlidingSurface::from_angle_gains(gains[0], gains[1], gains[2], gains[3]).unwrap();
        let mut combined = a;
        for i in 0..6 {
            combined.0[i] = a.0[i] + scale * b.0[i];
        }
        let lhs = surface.evaluate(&combined);
        let rhs = surface.evaluate(&a) + scale * surface.evaluate(&b);
        prop_assert!((lhs - rhs).abs() < 1e-9 * (1.0 + lhs.abs()));
    }

    /// Property: the adapted gain never leaves its bounds
    #[test]
    fn prop_adaptive_gain_stays_bounded(
        surfaces in prop::collection::vec(-50.0..50.0f64, 1..200),
        dt in 1.0e-4..0.05f64,
        margin in prop::option::of(0.1..5.0f64),
        uncertainty in prop::option::of(0.0..20.0f64),
    ) {
        let config = AdaptationConfig {
            projection_margin: margin,
            ..AdaptationConfig::default()
        };
        let mut law = AdaptationLaw::new(config).unwrap();
        for s in surfaces {
            let record = law.update(s, dt, uncertainty);
            prop_assert!(record.new_gain >= config.k_min && record.new_gain <= config.k_max);
            prop_assert!(record.rate.abs() <= config.rate_limit + 1e-12);
        }
    }

    /// Property: every controller's force is finite and within the actuator limit
    #[test]
    fn prop_controller_force_saturated(
        kind in kind(),
        states in prop::collection::vec(near_upright(), 1..20),
    ) {
        let settings = ControllerSettings::for_kind(kind);
        let max_force = settings.max_force;
        let builder = ControllerBuilder::new(kind, settings)
            .with_model(Arc::new(DoublePendulum::default()));
        let mut controller = builder.build(&kind.reference_gains()).unwrap();
        let mut history = ControlHistory::disabled();
        for state in &states {
            let output = controller.compute_control(state, 0.01, &mut history).unwrap();
            prop_assert!(output.force.is_finite());
            prop_assert!(output.force.abs() <= max_force);
        }
    }

    /// Property: raising K2 never breaks super-twisting feasibility
    #[test]
    fn prop_sta_feasibility_monotone_in_k2(
        k1 in 0.1..100.0f64,
        k2 in 0.1..100.0f64,
        extra in 0.0..50.0f64,
        lipschitz in 0.0..10.0f64,
    ) {
        let base = validate_sta_gains(k1, k2, lipschitz);
        let raised = validate_sta_gains(k1, k2 + extra, lipschitz);
        if base.is_feasible() {
            prop_assert!(raised.is_feasible());
        }
        prop_assert_eq!(base.proportional_ok(), k1 > 2.0 * lipschitz);
    }

    /// Property: clamping always lands inside the bounds
    #[test]
    fn prop_clamp_lands_inside_bounds(
        position in prop::collection::vec(-1.0e3..1.0e3f64, 4),
    ) {
        let bounds: GainBounds = ControllerKind::Hybrid.default_bounds();
        let mut clamped = position;
        bounds.clamp_in_place(&mut clamped);
        prop_assert!(bounds.contains(&clamped));
    }
}
